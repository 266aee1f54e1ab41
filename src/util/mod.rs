//! Small helpers shared by commands and ingestion.
//!
//! - **Intervals**: `"1h30m"` style strings for `agg`
//! - **URL validation**: scheme and local-address checks for `addfeed`
//! - **Text**: entity decoding and terminal-escape stripping for feed text

mod duration;
mod text;
mod url_validator;

pub use duration::{parse_interval, DurationError};
pub use text::{decode_feed_text, strip_terminal_escapes};
pub use url_validator::{validate_feed_url, UrlValidationError};
