//! Configuration for ticket normalization, metrics and logging

use crate::error::{HelpdeskError, Result};
use crate::observability::ObservabilityConfig;
use helpdesk_common::{
    ACTIVE_WINDOW_HOURS, DEFAULT_CATEGORY, DEFAULT_SEEN_CAPACITY, DEFAULT_TITLE_MAX_LEN,
    MAX_RESPONSE_HOURS, TASK_OWNER_ROLE, TREND_WINDOW_DAYS, UNKNOWN_USER_PLACEHOLDER,
    UNTITLED_PLACEHOLDER, WEEK_WINDOW_DAYS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HelpdeskConfig {
    pub normalizer: NormalizerConfig,
    pub metrics: MetricsConfig,
    pub diagnostics: DiagnosticsConfig,
    pub logging: ObservabilityConfig,
}

/// Defaults used when turning raw tasks into tickets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Participant role that marks the assignee
    pub task_owner_role: String,
    /// Display name for users without a usable name
    pub unknown_user_placeholder: String,
    /// Title for tasks with empty detail text
    pub untitled_placeholder: String,
    /// Category for tasks that arrive without one
    pub default_category: String,
    /// Maximum title length in characters
    pub title_max_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            task_owner_role: TASK_OWNER_ROLE.to_string(),
            unknown_user_placeholder: UNKNOWN_USER_PLACEHOLDER.to_string(),
            untitled_placeholder: UNTITLED_PLACEHOLDER.to_string(),
            default_category: DEFAULT_CATEGORY.to_string(),
            title_max_len: DEFAULT_TITLE_MAX_LEN,
        }
    }
}

/// Windows and thresholds for dashboard metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Response times above this are excluded as data errors
    pub max_response_hours: f64,
    pub trend_window_days: i64,
    pub week_window_days: i64,
    pub active_window_hours: i64,
    /// How long a memoized result stays valid for the same snapshot
    pub memo_ttl_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_response_hours: MAX_RESPONSE_HOURS,
            trend_window_days: TREND_WINDOW_DAYS,
            week_window_days: WEEK_WINDOW_DAYS,
            active_window_hours: ACTIVE_WINDOW_HOURS,
            memo_ttl_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Distinct anomalies remembered before the oldest is forgotten
    pub seen_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            seen_capacity: DEFAULT_SEEN_CAPACITY,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| HelpdeskError::configuration(format!("Invalid {name} value: {value}"))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl HelpdeskConfig {
    /// Load configuration from a JSON or YAML file, chosen by extension
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HelpdeskError::Io(std::io::Error::other(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        })?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| {
                HelpdeskError::configuration(format!("Failed to parse YAML config: {e}"))
            }),
            _ => serde_json::from_str(&content).map_err(|e| {
                HelpdeskError::configuration(format!("Failed to parse JSON config: {e}"))
            }),
        }
    }

    /// Save configuration in the given format ("json" or "yaml")
    ///
    /// # Errors
    /// Returns an error if the format is unsupported or the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| {
                HelpdeskError::configuration(format!("Failed to serialize YAML: {e}"))
            })?,
            "json" => serde_json::to_string_pretty(self)?,
            _ => {
                return Err(HelpdeskError::configuration(format!(
                    "Unsupported format: {format}"
                )))
            }
        };

        std::fs::write(path, content).map_err(|e| {
            HelpdeskError::Io(std::io::Error::other(format!(
                "Failed to write config file {}: {e}",
                path.display()
            )))
        })
    }

    /// Build a configuration from `HELPDESK_*` environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(role) = std::env::var("HELPDESK_TASK_OWNER_ROLE") {
            config.normalizer.task_owner_role = role;
        }
        if let Ok(placeholder) = std::env::var("HELPDESK_UNKNOWN_USER") {
            config.normalizer.unknown_user_placeholder = placeholder;
        }
        if let Ok(category) = std::env::var("HELPDESK_DEFAULT_CATEGORY") {
            config.normalizer.default_category = category;
        }
        if let Some(len) = env_parse("HELPDESK_TITLE_MAX_LEN")? {
            config.normalizer.title_max_len = len;
        }

        if let Some(hours) = env_parse("HELPDESK_MAX_RESPONSE_HOURS")? {
            config.metrics.max_response_hours = hours;
        }
        if let Some(days) = env_parse("HELPDESK_TREND_WINDOW_DAYS")? {
            config.metrics.trend_window_days = days;
        }
        if let Some(days) = env_parse("HELPDESK_WEEK_WINDOW_DAYS")? {
            config.metrics.week_window_days = days;
        }
        if let Some(hours) = env_parse("HELPDESK_ACTIVE_WINDOW_HOURS")? {
            config.metrics.active_window_hours = hours;
        }
        if let Some(secs) = env_parse("HELPDESK_MEMO_TTL_SECS")? {
            config.metrics.memo_ttl_secs = secs;
        }

        if let Some(capacity) = env_parse("HELPDESK_SEEN_CAPACITY")? {
            config.diagnostics.seen_capacity = capacity;
        }

        if let Ok(level) = std::env::var("HELPDESK_LOG_LEVEL") {
            config.logging.log_level = level.to_lowercase();
        }
        if let Ok(json) = std::env::var("HELPDESK_JSON_LOGS") {
            config.logging.json_logs = parse_bool(&json).ok_or_else(|| {
                HelpdeskError::configuration(format!("Invalid HELPDESK_JSON_LOGS value: {json}"))
            })?;
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        if self.normalizer.task_owner_role.trim().is_empty() {
            return Err(HelpdeskError::configuration(
                "Task owner role cannot be empty",
            ));
        }
        if self.normalizer.unknown_user_placeholder.trim().is_empty() {
            return Err(HelpdeskError::configuration(
                "Unknown user placeholder cannot be empty",
            ));
        }
        if self.normalizer.title_max_len < 4 {
            return Err(HelpdeskError::configuration(
                "Title max length must be at least 4",
            ));
        }

        let metrics = &self.metrics;
        if !metrics.max_response_hours.is_finite() || metrics.max_response_hours <= 0.0 {
            return Err(HelpdeskError::configuration(
                "Max response hours must be a positive number",
            ));
        }
        if metrics.trend_window_days <= 0
            || metrics.week_window_days <= 0
            || metrics.active_window_hours <= 0
        {
            return Err(HelpdeskError::configuration(
                "Metric windows must be greater than 0",
            ));
        }

        if self.diagnostics.seen_capacity == 0 {
            return Err(HelpdeskError::configuration(
                "Diagnostic cache capacity must be greater than 0",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.log_level.as_str()) {
            return Err(HelpdeskError::configuration(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.log_level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }

    /// Overlay every setting of `other` that differs from the defaults
    pub fn merge_with(&mut self, other: &HelpdeskConfig) {
        let defaults = HelpdeskConfig::default();

        macro_rules! overlay {
            ($($section:ident . $field:ident),* $(,)?) => {
                $(
                    if other.$section.$field != defaults.$section.$field {
                        self.$section.$field = other.$section.$field.clone();
                    }
                )*
            };
        }

        overlay!(
            normalizer.task_owner_role,
            normalizer.unknown_user_placeholder,
            normalizer.untitled_placeholder,
            normalizer.default_category,
            normalizer.title_max_len,
            metrics.max_response_hours,
            metrics.trend_window_days,
            metrics.week_window_days,
            metrics.active_window_hours,
            metrics.memo_ttl_secs,
            diagnostics.seen_capacity,
            logging.log_level,
            logging.json_logs,
            logging.service_name,
        );
    }
}
