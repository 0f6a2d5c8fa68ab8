//! Auto ads integration tests
//! Run with: cargo test --test auto_ads_test

mod common;

use chatmod_bot::application::messaging::{DispatchOutcome, MiddlewareError};
use chatmod_bot::domain::entities::User;
use chatmod_bot::domain::traits::{Scheduler, Store};
use chatmod_bot::modules::{AdsSettings, AutoAdsModule, ModuleManager, ModuleState};

use common::Harness;

fn manager_with_ads(h: &Harness) -> ModuleManager {
    let mut manager = h.manager();
    manager.register(AutoAdsModule::new(AdsSettings::default())).unwrap();
    manager
}

#[tokio::test]
async fn toggling_never_duplicates_jobs() {
    let h = Harness::new().await;
    let mut manager = manager_with_ads(&h);
    assert_eq!(h.scheduler.active_jobs().await, 0);

    manager.enable("auto_ads").await.unwrap();
    assert_eq!(h.scheduler.active_jobs().await, 2);
    assert_eq!(manager.state("auto_ads"), Some(ModuleState::Enabled));
    assert!(h.registry.resolve("ads").is_some());

    // Enabling twice re-creates instead of stacking
    manager.enable("auto_ads").await.unwrap();
    assert_eq!(h.scheduler.active_jobs().await, 2);
    assert_eq!(h.registry.len(), 1);

    manager.disable("auto_ads").await.unwrap();
    assert_eq!(h.scheduler.active_jobs().await, 0);
    assert!(h.registry.resolve("ads").is_none());

    manager.disable("auto_ads").await.unwrap();
    assert_eq!(manager.state("auto_ads"), Some(ModuleState::Disabled));

    manager.enable("auto_ads").await.unwrap();
    assert_eq!(h.scheduler.active_jobs().await, 2);
}

#[tokio::test]
async fn ads_command_refuses_while_offline() {
    let h = Harness::new().await;
    let mut manager = manager_with_ads(&h);
    manager.enable("auto_ads").await.unwrap();

    let editor = User::new("1", "pajlada").with_level(500);
    assert_eq!(h.send(&editor, "!ads").await, DispatchOutcome::Deferred);
    h.settle().await;

    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Ads run was unsuccessful. Twitch responded with `stream is offline`.".to_string()]
    );
    assert!(h.platform.commercials().is_empty());
}

#[tokio::test]
async fn ads_command_runs_commercial_when_live() {
    let h = Harness::new().await;
    let mut manager = manager_with_ads(&h);
    manager.enable("auto_ads").await.unwrap();
    h.store.start_stream("Just chatting").await.unwrap();

    let editor = User::new("1", "pajlada").with_level(500);
    h.send(&editor, "!ads").await;
    h.settle().await;

    assert_eq!(h.platform.commercials(), vec![("22".to_string(), 60)]);
    assert_eq!(
        h.whispers_to("pajlada"),
        vec!["Ads run was successful. Twitch didn't send back a bad response so we assume the ads ran."
            .to_string()]
    );
}

#[tokio::test]
async fn ads_command_needs_its_level() {
    let h = Harness::new().await;
    let mut manager = manager_with_ads(&h);
    manager.enable("auto_ads").await.unwrap();

    let viewer = User::new("2", "nightnacht");
    assert!(matches!(
        h.send(&viewer, "!ads").await,
        DispatchOutcome::Refused(MiddlewareError::PermissionDenied(_))
    ));
}

#[tokio::test]
async fn invalid_settings_refuse_to_load() {
    let h = Harness::new().await;
    let mut manager = h.manager();

    let result = manager.register(AutoAdsModule::new(AdsSettings {
        ads_length: 45,
        ..AdsSettings::default()
    }));

    assert!(result.is_err());
    assert!(!manager.has_module("auto_ads"));
    assert_eq!(h.scheduler.active_jobs().await, 0);
}

#[tokio::test]
async fn unknown_module_is_not_found() {
    let h = Harness::new().await;
    let mut manager = h.manager();
    assert!(manager.enable("nope").await.is_err());
    assert!(manager.disable("nope").await.is_err());
}
