//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output formatting across all commands.

use console::style;
use serde::Serialize;

use super::OutputConfig;

/// Formatter for CLI output
///
/// Handles both human-readable and JSON output formats based on configuration.
/// When JSON mode is enabled, all output is strict JSON without colors or progress.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Check if JSON output mode is enabled
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.config.quiet
    }

    /// Check if colors are enabled
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Output a success message
    pub fn success(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{} {message}", self.mark("✓", Mark::Success));
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "error": message }));
        } else {
            eprintln!("{} {message}", self.mark("✗", Mark::Error));
        }
    }

    /// Output a warning message
    ///
    /// Printed in quiet mode too; warnings here are about data left behind.
    pub fn warning(&self, message: &str) {
        if self.config.json {
            eprintln!("{}", serde_json::json!({ "warning": message }));
        } else {
            eprintln!("{} {message}", self.mark("⚠", Mark::Warning));
        }
    }

    /// Output one JSON document on a single line
    pub fn json_line<T: Serialize>(&self, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }

    /// Style a path for human output
    pub fn path(&self, path: &str) -> String {
        if self.colors_enabled() {
            style(path).cyan().to_string()
        } else {
            path.to_string()
        }
    }

    fn mark(&self, symbol: &str, kind: Mark) -> String {
        if !self.colors_enabled() {
            return symbol.to_string();
        }
        let styled = style(symbol);
        match kind {
            Mark::Success => styled.green(),
            Mark::Error => styled.red(),
            Mark::Warning => styled.yellow(),
        }
        .to_string()
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Success,
    Error,
    Warning,
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}
