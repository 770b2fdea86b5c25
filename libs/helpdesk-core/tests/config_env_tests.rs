//! Environment variable handling for configuration
//!
//! These tests mutate the process environment and therefore run serially.

use helpdesk_core::{ConfigLoader, HelpdeskConfig, HelpdeskError};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

const VARS: &[&str] = &[
    "HELPDESK_TASK_OWNER_ROLE",
    "HELPDESK_UNKNOWN_USER",
    "HELPDESK_DEFAULT_CATEGORY",
    "HELPDESK_TITLE_MAX_LEN",
    "HELPDESK_MAX_RESPONSE_HOURS",
    "HELPDESK_TREND_WINDOW_DAYS",
    "HELPDESK_WEEK_WINDOW_DAYS",
    "HELPDESK_ACTIVE_WINDOW_HOURS",
    "HELPDESK_MEMO_TTL_SECS",
    "HELPDESK_SEEN_CAPACITY",
    "HELPDESK_LOG_LEVEL",
    "HELPDESK_JSON_LOGS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_from_env_without_variables_is_default() {
    clear_env();
    assert_eq!(HelpdeskConfig::from_env().unwrap(), HelpdeskConfig::default());
}

#[test]
#[serial]
fn test_from_env_reads_every_section() {
    clear_env();
    env::set_var("HELPDESK_TASK_OWNER_ROLE", "responsable");
    env::set_var("HELPDESK_TITLE_MAX_LEN", "80");
    env::set_var("HELPDESK_MAX_RESPONSE_HOURS", "240.5");
    env::set_var("HELPDESK_TREND_WINDOW_DAYS", "7");
    env::set_var("HELPDESK_SEEN_CAPACITY", "16");
    env::set_var("HELPDESK_LOG_LEVEL", "DEBUG");
    env::set_var("HELPDESK_JSON_LOGS", "true");

    let config = HelpdeskConfig::from_env().unwrap();
    clear_env();

    assert_eq!(config.normalizer.task_owner_role, "responsable");
    assert_eq!(config.normalizer.title_max_len, 80);
    assert_eq!(config.metrics.max_response_hours, 240.5);
    assert_eq!(config.metrics.trend_window_days, 7);
    assert_eq!(config.diagnostics.seen_capacity, 16);
    assert_eq!(config.logging.log_level, "debug");
    assert!(config.logging.json_logs);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_from_env_rejects_unparseable_numbers() {
    clear_env();
    env::set_var("HELPDESK_TREND_WINDOW_DAYS", "fortnight");
    let result = HelpdeskConfig::from_env();
    clear_env();

    assert!(matches!(result, Err(HelpdeskError::Configuration { .. })));
}

#[test]
#[serial]
fn test_from_env_rejects_bad_boolean() {
    clear_env();
    env::set_var("HELPDESK_JSON_LOGS", "maybe");
    let result = HelpdeskConfig::from_env();
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_environment_overrides_files() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("helpdesk.yaml");
    std::fs::write(
        &path,
        "normalizer:\n  default_category: inbox\nmetrics:\n  week_window_days: 5\n",
    )
    .unwrap();
    env::set_var("HELPDESK_WEEK_WINDOW_DAYS", "3");

    let config = ConfigLoader::new()
        .with_config_paths(vec![&path])
        .load()
        .unwrap();
    clear_env();

    assert_eq!(config.normalizer.default_category, "inbox");
    assert_eq!(config.metrics.week_window_days, 3);
}

#[test]
#[serial]
fn test_invalid_environment_fails_validation() {
    clear_env();
    env::set_var("HELPDESK_LOG_LEVEL", "chatty");
    let result = ConfigLoader::new()
        .with_config_paths(Vec::<PathBuf>::new())
        .load();
    clear_env();

    assert!(result.is_err());
}
