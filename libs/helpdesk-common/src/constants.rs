//! Constants shared by the helpdesk crates

/// Display name used when a user reference carries no usable name
pub const UNKNOWN_USER_PLACEHOLDER: &str = "Unknown user";

/// Title used when a task has no detail text
pub const UNTITLED_PLACEHOLDER: &str = "(untitled)";

/// Role label marking the participant that owns a task
pub const TASK_OWNER_ROLE: &str = "task_owner";

/// Category label for tasks that arrive without one
pub const DEFAULT_CATEGORY: &str = "general";

/// Category label stamped on fallback tickets built from malformed records
pub const ERROR_CATEGORY: &str = "error";

/// Maximum title length, in characters, before truncation
pub const DEFAULT_TITLE_MAX_LEN: usize = 120;

/// Response times above this many hours are treated as data errors
pub const MAX_RESPONSE_HOURS: f64 = 720.0;

/// Width of each response-time trend window, in days
pub const TREND_WINDOW_DAYS: i64 = 14;

/// Width of the "resolved this week" window, in days
pub const WEEK_WINDOW_DAYS: i64 = 7;

/// Tickets updated within this many hours count their participants as active
pub const ACTIVE_WINDOW_HOURS: i64 = 24;

/// Capacity of the "already reported" diagnostic cache
pub const DEFAULT_SEEN_CAPACITY: usize = 1024;

/// Supported naive datetime formats, interpreted as UTC
pub const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
];

/// Date-only format, read as midnight UTC
pub const DATE_FORMAT: &str = "%Y-%m-%d";
