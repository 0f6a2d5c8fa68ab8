//! Song requests from chat, paid for with points

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::application::context::CommandContext;
use crate::application::errors::{BotError, ConfigError};
use crate::domain::entities::{Command, CommandHandler, SongInfo, SongRequest};
use crate::modules::settings::check_range;
use crate::modules::trait_def::Module;

pub const ID: &str = "songrequest";

const COMMAND_NAME: &str = "songrequest";
const YOUTUBE_ID_LEN: usize = 11;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SongRequestSettings {
    /// Allow song requests through chat
    pub songrequest_command: bool,
    /// Seconds
    pub max_song_length: u32,
    pub max_songs_per_user: u32,
    pub point_cost: i64,
}

impl Default for SongRequestSettings {
    fn default() -> Self {
        Self {
            songrequest_command: false,
            max_song_length: 600,
            max_songs_per_user: 2,
            point_cost: 500,
        }
    }
}

impl SongRequestSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_song_length", self.max_song_length, 1, 3600)?;
        check_range("max_songs_per_user", self.max_songs_per_user, 1, 3600)?;
        check_range("point_cost", self.point_cost, 0, 250_000)?;
        Ok(())
    }
}

/// Pull a video id out of a bare id, a `youtu.be` link or a `youtube.com/watch?v=` link
pub fn find_youtube_id(input: &str) -> Option<String> {
    let len = input.chars().count();
    if len < YOUTUBE_ID_LEN {
        return None;
    }
    if len == YOUTUBE_ID_LEN {
        return Some(input.to_string());
    }

    let lower = input.to_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        input.to_string()
    } else {
        format!("http://{}", input)
    };

    let url = Url::parse(&with_scheme).ok()?;
    let host = url.host_str()?;

    let id = if host == "youtu.be" {
        url.path().trim_start_matches('/').to_string()
    } else if host.ends_with("youtube.com") {
        url.query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())?
    } else {
        return None;
    };

    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

struct SongRequestCommand {
    settings: Arc<SongRequestSettings>,
}

#[async_trait]
impl CommandHandler for SongRequestCommand {
    async fn handle(&self, ctx: CommandContext) -> Result<(), BotError> {
        let Some(argument) = ctx.args().first().map(|s| s.to_string()) else {
            return Ok(());
        };

        let Some(youtube_id) = find_youtube_id(&argument) else {
            return Err(BotError::Refused(
                "Could not find a valid youtube ID in your argument.".to_string(),
            ));
        };

        let Some(stream_id) = ctx.bot.store.current_stream_id().await? else {
            return Err(BotError::Refused(
                "You cannot request songs while the stream is offline.".to_string(),
            ));
        };

        add_song(&self.settings, &ctx, stream_id, &youtube_id).await
    }
}

async fn add_song(
    settings: &SongRequestSettings,
    ctx: &CommandContext,
    stream_id: i64,
    youtube_id: &str,
) -> Result<(), BotError> {
    let bot = &ctx.bot;

    let song = match bot.store.find_song_info(youtube_id).await? {
        Some(song) => song,
        None => match fetch_song_info(ctx, youtube_id).await? {
            Some(song) => {
                bot.store.save_song_info(&song).await?;
                song
            }
            None => {
                let text = "Invalid song given (or the YouTube API is down)";
                return bot.replies.whisper(&ctx.source, text).await;
            }
        },
    };

    let active = bot.store.count_unplayed_songs(stream_id, &ctx.source.id).await?;
    if active >= settings.max_songs_per_user {
        let text = format!(
            "You can only request {} songs at the same time!",
            settings.max_songs_per_user
        );
        return bot.replies.whisper(&ctx.source, &text).await;
    }

    let request = build_request(settings, stream_id, &song, &ctx.source.id);
    let id = bot.store.add_song_request(&request).await?;
    debug!("Queued song request {} ({}) for {}", id, youtube_id, ctx.source.login);

    let text = format!(
        "{} just requested the song \"{}\" to be played KKona",
        ctx.source.name, song.title
    );
    bot.replies.say(&text).await
}

/// Songs longer than the limit are queued with an auto-skip
fn build_request(settings: &SongRequestSettings, stream_id: i64, song: &SongInfo, user_id: &str) -> SongRequest {
    let mut request = SongRequest::new(stream_id, song.youtube_id.clone(), user_id);
    if song.duration > settings.max_song_length {
        request.skip_after = Some(settings.max_song_length);
    }
    request
}

async fn fetch_song_info(ctx: &CommandContext, youtube_id: &str) -> Result<Option<SongInfo>, BotError> {
    match &ctx.bot.songs {
        Some(provider) => provider.fetch(youtube_id).await,
        None => {
            error!("No song info provider set up");
            Err(BotError::UpstreamUnavailable("no song info provider set up".to_string()))
        }
    }
}

pub struct SongRequestModule {
    settings: Arc<SongRequestSettings>,
}

impl SongRequestModule {
    pub fn new(settings: SongRequestSettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }
}

#[async_trait]
impl Module for SongRequestModule {
    fn id(&self) -> &str {
        ID
    }

    fn name(&self) -> &str {
        "Song requests"
    }

    fn description(&self) -> &str {
        "Lets chatters queue YouTube songs for the stream"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()
    }

    fn commands(&self) -> Vec<Command> {
        if !self.settings.songrequest_command {
            return Vec::new();
        }

        let handler = SongRequestCommand {
            settings: self.settings.clone(),
        };
        vec![Command::new(COMMAND_NAME, handler)
            .with_description("Request a song to be played on stream")
            .with_cooldowns(Duration::ZERO, Duration::from_secs(3))
            .with_cost(self.settings.point_cost)
            .deferred()]
    }

    fn metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert(
            "max_songs_per_user".to_string(),
            self.settings.max_songs_per_user.to_string(),
        );
        meta.insert("point_cost".to_string(), self.settings.point_cost.to_string());
        meta
    }
}
