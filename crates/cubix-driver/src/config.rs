//! Module for elaboration configuration options.

use serde::Deserialize;

/// Options for controlling the driver's behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DriverOptions {
    /// Whether to keep elaborating the remaining roots after a root failed
    pub continue_on_error: bool,

    /// Maximum number of errors to report
    pub error_limit: Option<usize>,

    /// Whether to emit warnings
    pub warnings: bool,

    /// Whether to treat warnings as errors
    pub warnings_as_errors: bool,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            error_limit: Some(20),
            warnings: true,
            warnings_as_errors: false,
        }
    }
}
