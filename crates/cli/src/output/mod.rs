//! Output formatting utilities
//!
//! Human-readable and JSON output, plus the spinner shown while a move runs.

mod formatter;
mod spinner;

pub use formatter::Formatter;
pub use spinner::Spinner;

/// Output configuration derived from CLI flags and `[defaults]`
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress spinner
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
