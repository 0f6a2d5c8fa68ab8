//! Song request integration tests
//! Run with: cargo test --test songrequest_test

mod common;

use chatmod_bot::application::messaging::DispatchOutcome;
use chatmod_bot::domain::entities::{SongRequest, User};
use chatmod_bot::domain::traits::Store;
use chatmod_bot::modules::{ModuleManager, SongRequestModule, SongRequestSettings};

use common::Harness;

const SONG: &str = "dQw4w9WgXcQ";

async fn enable(h: &Harness) -> ModuleManager {
    let mut manager = h.manager();
    manager
        .register(SongRequestModule::new(SongRequestSettings {
            songrequest_command: true,
            ..SongRequestSettings::default()
        }))
        .unwrap();
    manager.enable("songrequest").await.unwrap();
    manager
}

async fn viewer_with_points(h: &Harness, points: i64) -> User {
    let user = User::new("5", "pajlada").with_points(points);
    h.store.save_user(&user).await.unwrap();
    user
}

#[tokio::test]
async fn request_is_queued_and_announced() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.songs.add(SONG, "Never Gonna Give You Up", 213);
    let stream = h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;

    let outcome = h
        .send(&user, &format!("!songrequest https://www.youtube.com/watch?v={}", SONG))
        .await;
    assert_eq!(outcome, DispatchOutcome::Deferred);
    h.settle().await;

    assert_eq!(
        h.says(),
        vec!["pajlada just requested the song \"Never Gonna Give You Up\" to be played KKona".to_string()]
    );
    assert_eq!(h.store.count_unplayed_songs(stream, "5").await.unwrap(), 1);
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 500);
    assert!(h.store.find_song_info(SONG).await.unwrap().is_some());
}

#[tokio::test]
async fn cost_is_checked_before_the_handler_runs() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.songs.add(SONG, "Never Gonna Give You Up", 213);
    let stream = h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 100).await;

    h.send(&user, &format!("!songrequest {}", SONG)).await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["You do not have the required 500 points to execute this command. (You have 100 points)".to_string()]
    );
    assert_eq!(h.store.count_unplayed_songs(stream, "5").await.unwrap(), 0);
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 100);
}

#[tokio::test]
async fn offline_stream_refuses_requests() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    let user = viewer_with_points(&h, 1000).await;

    h.send(&user, &format!("!songrequest {}", SONG)).await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["You cannot request songs while the stream is offline.".to_string()]
    );
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 1000);
}

#[tokio::test]
async fn garbage_argument_is_rejected() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;

    h.send(&user, "!songrequest https://vimeo.com/123456789").await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Could not find a valid youtube ID in your argument.".to_string()]
    );
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 1000);
}

#[tokio::test]
async fn per_user_limit_is_enforced() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.songs.add(SONG, "Never Gonna Give You Up", 213);
    let stream = h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;
    for _ in 0..2 {
        h.store
            .add_song_request(&SongRequest::new(stream, SONG, "5"))
            .await
            .unwrap();
    }

    h.send(&user, &format!("!songrequest {}", SONG)).await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["You can only request 2 songs at the same time!".to_string()]
    );
    assert_eq!(h.store.count_unplayed_songs(stream, "5").await.unwrap(), 2);
}

#[tokio::test]
async fn unknown_song_is_reported() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;

    h.send(&user, "!songrequest https://youtu.be/aaaaaaaaaaa").await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Invalid song given (or the YouTube API is down)".to_string()]
    );
}

#[tokio::test]
async fn missing_provider_gives_a_generic_reply() {
    let h = Harness::without_song_provider().await;
    let _manager = enable(&h).await;
    h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;

    h.send(&user, &format!("!songrequest {}", SONG)).await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Something went wrong, please try again later.".to_string()]
    );
}

#[tokio::test]
async fn per_user_cooldown_blocks_rapid_requests() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.songs.add(SONG, "Never Gonna Give You Up", 213);
    h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 5000).await;

    assert_eq!(
        h.send(&user, &format!("!songrequest {}", SONG)).await,
        DispatchOutcome::Deferred
    );
    assert!(matches!(
        h.send(&user, &format!("!songrequest {}", SONG)).await,
        DispatchOutcome::Refused(_)
    ));
    h.settle().await;
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 4500);
}

#[tokio::test]
async fn songrequest_runs_off_the_ingestion_path() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    let user = viewer_with_points(&h, 1000).await;

    assert_eq!(
        h.send(&user, "!songrequest https://vimeo.com/123456789").await,
        DispatchOutcome::Deferred
    );
    h.settle().await;
    assert_eq!(h.whispers_to("pajlada").len(), 1);
}

#[tokio::test]
async fn refused_requests_keep_the_balance_but_failed_lookups_do_not() {
    let h = Harness::new().await;
    let _manager = enable(&h).await;
    h.store.start_stream("Music").await.unwrap();
    let user = viewer_with_points(&h, 1000).await;
    let other = User::new("6", "nymn").with_points(1000);
    h.store.save_user(&other).await.unwrap();

    h.send(&user, "!songrequest nope").await;
    h.settle().await;
    assert_eq!(h.store.get_user("5").await.unwrap().unwrap().points, 1000);

    // The song lookup happens after the request is accepted
    h.send(&other, "!songrequest https://youtu.be/aaaaaaaaaaa").await;
    h.settle().await;
    assert_eq!(h.store.get_user("6").await.unwrap().unwrap().points, 500);
    assert_eq!(
        h.whispers_to("nymn"),
        vec!["Invalid song given (or the YouTube API is down)".to_string()]
    );
}
