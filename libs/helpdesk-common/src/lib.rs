//! Helpdesk Common - Shared constants and helpers for the helpdesk ticket core
//!
//! # Examples
//!
//! ```
//! use helpdesk_common::{compose_display_name, percentage, UNKNOWN_USER_PLACEHOLDER};
//!
//! let name = compose_display_name(Some("Ana"), None, UNKNOWN_USER_PLACEHOLDER);
//! assert_eq!(name, "Ana");
//!
//! assert_eq!(percentage(1, 3), 33.3);
//! assert_eq!(percentage(1, 0), 0.0);
//! ```

pub mod constants;
pub mod utils;

pub use constants::*;
pub use utils::*;
