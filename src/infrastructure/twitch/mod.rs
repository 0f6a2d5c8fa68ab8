//! Helix API client - user lookups, follow dates and commercials

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::application::errors::{BotError, ConfigError};
use crate::domain::entities::User;
use crate::domain::traits::{CommercialOutcome, PlatformApi};

/// Helix API endpoint
pub const API_BASE: &str = "https://api.twitch.tv/helix";

/// Helix client holding the bot's and the streamer's access tokens
pub struct HelixClient {
    client: Client,
    base: Url,
    client_id: String,
    bot_token: String,
    streamer_token: Option<String>,
}

impl HelixClient {
    pub fn new(
        api_base: &str,
        client_id: impl Into<String>,
        bot_token: impl Into<String>,
        streamer_token: Option<String>,
    ) -> Result<Self, ConfigError> {
        // Trailing slash so joins append instead of replacing the last segment
        let normalized = format!("{}/", api_base.trim_end_matches('/'));
        let base = Url::parse(&normalized)
            .map_err(|e| ConfigError::invalid("twitch.api-base", e.to_string()))?;

        Ok(Self {
            client: Client::new(),
            base,
            client_id: client_id.into(),
            bot_token: bot_token.into(),
            streamer_token,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BotError> {
        self.base
            .join(path)
            .map_err(|e| BotError::Unexpected(format!("bad endpoint {}: {}", path, e)))
    }

    fn authorized(&self, request: RequestBuilder, token: &str) -> RequestBuilder {
        request
            .header("Client-Id", &self.client_id)
            .header("Authorization", format!("Bearer {}", token))
    }

    /// Map auth failures and other bad statuses onto the error taxonomy
    async fn check(response: Response, what: &str) -> Result<Response, BotError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = error_message(status, &response.text().await.unwrap_or_default());
        if status == StatusCode::UNAUTHORIZED {
            info!("{} unauthorized: {}", what, body);
            return Err(BotError::PermissionDenied(format!("{} unauthorized", what)));
        }
        Err(BotError::UpstreamUnavailable(format!(
            "{} failed, status: {}, body: {}",
            what, status, body
        )))
    }
}

/// The `message` of a Helix error body, or the raw body when it is not one
fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<HelixErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() => parsed.message,
        _ if body.trim().is_empty() => status.to_string(),
        _ => body.trim().to_string(),
    }
}

#[derive(Deserialize, Debug)]
struct DataResponse<T> {
    data: Vec<T>,
}

#[derive(Deserialize, Debug)]
struct HelixUser {
    id: String,
    login: String,
    display_name: String,
}

#[derive(Deserialize, Debug)]
struct HelixFollower {
    followed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CommercialRequest<'a> {
    broadcaster_id: &'a str,
    length: u32,
}

#[derive(Deserialize, Debug)]
struct HelixCommercial {
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct HelixErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl PlatformApi for HelixClient {
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>, BotError> {
        let mut url = self.endpoint("users")?;
        url.query_pairs_mut().append_pair("login", login);

        let response = self.authorized(self.client.get(url), &self.bot_token).send().await?;
        let body: DataResponse<HelixUser> = Self::check(response, "user lookup").await?.json().await?;

        Ok(body
            .data
            .into_iter()
            .next()
            .map(|u| User::new(u.id, u.login).with_name(u.display_name)))
    }

    async fn get_follow_since(
        &self,
        broadcaster_id: &str,
        user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, BotError> {
        let mut url = self.endpoint("channels/followers")?;
        url.query_pairs_mut()
            .append_pair("broadcaster_id", broadcaster_id)
            .append_pair("user_id", user_id);

        let response = self.authorized(self.client.get(url), &self.bot_token).send().await?;
        let body: DataResponse<HelixFollower> =
            Self::check(response, "follow lookup").await?.json().await?;

        Ok(body.data.into_iter().next().map(|f| f.followed_at))
    }

    async fn start_commercial(
        &self,
        broadcaster_id: &str,
        length: u32,
    ) -> Result<CommercialOutcome, BotError> {
        let Some(token) = self.streamer_token.as_deref() else {
            return Err(BotError::PermissionDenied(
                "no streamer token configured for commercials".to_string(),
            ));
        };

        let url = self.endpoint("channels/commercial")?;
        let request = CommercialRequest { broadcaster_id, length };
        let response = self
            .authorized(self.client.post(url), token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(BotError::PermissionDenied("commercial unauthorized".to_string()));
        }
        if !status.is_success() {
            // Rejections such as "channel is not live" come back as 4xx with a message
            let message = error_message(status, &response.text().await.unwrap_or_default());
            debug!("Commercial refused with {}: {}", status, message);
            return Ok(CommercialOutcome {
                message,
                success: false,
            });
        }

        let body: DataResponse<HelixCommercial> = response.json().await?;
        let message = body.data.into_iter().next().map(|c| c.message).unwrap_or_default();
        Ok(CommercialOutcome { message, success: true })
    }
}

/// Stand-in used when no platform credentials are configured.
/// Knows no users, no follows, and refuses commercials.
#[derive(Debug, Default)]
pub struct OfflinePlatform;

#[async_trait]
impl PlatformApi for OfflinePlatform {
    async fn get_user_by_login(&self, _login: &str) -> Result<Option<User>, BotError> {
        Ok(None)
    }

    async fn get_follow_since(
        &self,
        _broadcaster_id: &str,
        _user_id: &str,
    ) -> Result<Option<DateTime<Utc>>, BotError> {
        Ok(None)
    }

    async fn start_commercial(
        &self,
        _broadcaster_id: &str,
        _length: u32,
    ) -> Result<CommercialOutcome, BotError> {
        Ok(CommercialOutcome {
            message: "no platform configured".to_string(),
            success: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_extend_base_path() {
        let client = HelixClient::new("https://api.twitch.tv/helix/", "id", "token", None).unwrap();
        assert_eq!(
            client.endpoint("channels/followers").unwrap().as_str(),
            "https://api.twitch.tv/helix/channels/followers"
        );
    }

    #[test]
    fn invalid_base_is_a_config_error() {
        assert!(HelixClient::new("not a url", "id", "token", None).is_err());
    }

    #[test]
    fn follower_payload_parses() {
        let body: DataResponse<HelixFollower> = serde_json::from_str(
            r#"{"data":[{"user_id":"11","user_login":"nightnacht","followed_at":"2015-03-04T07:02:01Z"}],"total":1}"#,
        )
        .unwrap();
        assert_eq!(body.data[0].followed_at.to_rfc3339(), "2015-03-04T07:02:01+00:00");
    }

    #[test]
    fn error_bodies_yield_their_message() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"Bad Request","status":400,"message":"To start a commercial, the broadcaster must be streaming live."}"#
            ),
            "To start a commercial, the broadcaster must be streaming live."
        );
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "502 Bad Gateway");
    }

    #[tokio::test]
    async fn commercial_without_streamer_token_is_refused() {
        let client = HelixClient::new(API_BASE, "id", "token", None).unwrap();
        let err = client.start_commercial("1", 60).await.unwrap_err();
        assert!(matches!(err, BotError::PermissionDenied(_)));
    }
}
