//! Configuration loading tests
//! Run with: cargo test --test config_test

use std::io::Write;

use chatmod_bot::application::errors::ConfigError;
use chatmod_bot::application::reply::MessageAction;
use chatmod_bot::infrastructure::config::Config;

#[test]
fn loads_yaml_file_with_module_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
bot:
  channel: forsen
  trigger: "?"
  streamer:
    id: "22"
    login: forsen
  levels:
    pajlada: 1000
executor:
  workers: 2
modules:
  auto-ads:
    enabled: true
    ads-length: 180
  followage:
    enabled: true
    action-followsince: whisper
  songrequest:
    songrequest-command: true
    point-cost: 0
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();

    assert_eq!(config.bot.trigger, '?');
    assert_eq!(config.executor.workers, 2);
    assert_eq!(config.level_for("pajlada"), 1000);
    assert!(config.twitch.is_none());

    assert!(config.modules.auto_ads.enabled);
    assert_eq!(config.modules.auto_ads.settings.ads_length, 180);
    assert_eq!(config.modules.auto_ads.settings.command_name, "ads");
    assert_eq!(
        config.modules.followage.settings.action_followsince,
        MessageAction::Whisper
    );
    assert!(!config.modules.songrequest.enabled);
    assert!(config.modules.songrequest.settings.songrequest_command);
    assert_eq!(config.modules.songrequest.settings.point_cost, 0);
    assert!(!config.modules.masspoints.enabled);
}

#[test]
fn out_of_range_settings_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "modules:\n  masspoints:\n    last-active-minutes: 5000\n").unwrap();

    match Config::load(file.path()) {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "last_active_minutes"),
        other => panic!("expected an invalid value, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn alphanumeric_trigger_is_rejected() {
    let err = Config::from_yaml("bot:\n  trigger: a\n").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn missing_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
