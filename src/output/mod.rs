//! Output formatters for duplicate scan results.
//!
//! This module provides two renderings of a scan:
//! - Plain text for people reading a terminal
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use dupecleaner::output::TextOutput;
//! # fn demo(set: &dupecleaner::duplicates::DuplicateSet) {
//! let groups = set.groups();
//! TextOutput::new(&groups).write_to(&mut std::io::stdout()).unwrap();
//! # }
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
