//! Followage integration tests
//! Run with: cargo test --test followage_test

mod common;

use chrono::{Duration, TimeZone, Utc};

use chatmod_bot::application::errors::CooldownAxis;
use chatmod_bot::application::messaging::{DispatchOutcome, MiddlewareError};
use chatmod_bot::application::reply::MessageAction;
use chatmod_bot::domain::entities::User;
use chatmod_bot::modules::{FollowAgeModule, FollowAgeSettings, ModuleManager};

use common::{streamer, Harness};

async fn enable(h: &Harness, settings: FollowAgeSettings) -> ModuleManager {
    let mut manager = h.manager();
    manager.register(FollowAgeModule::new(settings)).unwrap();
    manager.enable("followage").await.unwrap();
    manager
}

fn no_cooldowns() -> FollowAgeSettings {
    FollowAgeSettings {
        global_cd: 0,
        user_cd: 0,
        ..FollowAgeSettings::default()
    }
}

#[tokio::test]
async fn own_followage_is_said_in_chat() {
    let h = Harness::new().await;
    let _manager = enable(&h, no_cooldowns()).await;

    let source = User::new("1", "pajlada");
    h.platform.add_user(source.clone());
    h.platform.add_follow(
        &streamer(),
        &source,
        Utc::now() - Duration::days(2) - Duration::hours(5),
    );

    assert_eq!(h.send(&source, "!followage").await, DispatchOutcome::Deferred);
    h.settle().await;

    assert_eq!(
        h.says(),
        vec!["pajlada, you have been following Forsen for 2 days and 5 hours".to_string()]
    );
}

#[tokio::test]
async fn someone_else_not_following_uses_configured_method() {
    let h = Harness::new().await;
    let _manager = enable(
        &h,
        FollowAgeSettings {
            action_followage: MessageAction::Whisper,
            ..no_cooldowns()
        },
    ).await;

    let source = User::new("1", "pajlada");
    h.platform.add_user(User::new("7", "nightnacht").with_name("NightNacht"));

    h.send(&source, "!followage @NightNacht").await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["NightNacht is not following Forsen".to_string()]
    );
}

#[tokio::test]
async fn followsince_for_another_broadcaster() {
    let h = Harness::new().await;
    let _manager = enable(&h, no_cooldowns()).await;

    let source = User::new("1", "pajlada");
    let nightnacht = User::new("7", "nightnacht").with_name("NightNacht");
    let other = User::new("33", "karl_kons").with_name("Karl_Kons");
    h.platform.add_user(nightnacht.clone());
    h.platform.add_user(other.clone());
    h.platform
        .add_follow(&other, &nightnacht, Utc.with_ymd_and_hms(2014, 7, 3, 4, 12, 42).unwrap());

    h.send(&source, "!followsince NightNacht karl_kons").await;
    h.settle().await;

    assert_eq!(
        h.says(),
        vec!["pajlada, nightNacht has been following Karl_Kons since 03 July 2014, 04:12:42 UTC".to_string()]
    );
}

#[tokio::test]
async fn unknown_user_is_reported() {
    let h = Harness::new().await;
    let _manager = enable(
        &h,
        FollowAgeSettings {
            action_followage: MessageAction::Whisper,
            ..no_cooldowns()
        },
    ).await;

    h.send(&User::new("1", "pajlada"), "!followage nobody").await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["User \"nobody\" could not be found".to_string()]
    );
}

#[tokio::test]
async fn unauthorized_lookup_names_the_streamer() {
    let h = Harness::new().await;
    let _manager = enable(
        &h,
        FollowAgeSettings {
            action_followage: MessageAction::Whisper,
            ..no_cooldowns()
        },
    ).await;
    h.platform.deny_follows();

    h.send(&User::new("1", "pajlada"), "!followage").await;
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Bot does not have permission to check follow age for streamer forsen".to_string()]
    );
}

#[tokio::test]
async fn global_cooldown_applies_across_users() {
    let h = Harness::new().await;
    let _manager = enable(&h, FollowAgeSettings::default()).await;

    assert_eq!(
        h.send(&User::new("1", "pajlada"), "!followage").await,
        DispatchOutcome::Deferred
    );
    match h.send(&User::new("2", "nightnacht"), "!followage").await {
        DispatchOutcome::Refused(MiddlewareError::RateLimited { axis, .. }) => {
            assert_eq!(axis, CooldownAxis::Global)
        }
        other => panic!("expected a cooldown refusal, got {:?}", other),
    }

    // The other command keeps its own cooldown state
    assert_eq!(
        h.send(&User::new("2", "nightnacht"), "!followsince").await,
        DispatchOutcome::Deferred
    );
    h.settle().await;
}

#[tokio::test]
async fn followage_works_in_whispers() {
    let h = Harness::new().await;
    let _manager = enable(
        &h,
        FollowAgeSettings {
            action_followage: MessageAction::Reply,
            ..no_cooldowns()
        },
    ).await;

    h.whisper(&User::new("1", "pajlada"), "!followage").await;
    h.settle().await;

    assert_eq!(h.whispers_to("pajlada"), vec!["You are not following Forsen".to_string()]);
}
