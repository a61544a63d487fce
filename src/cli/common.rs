//! Shared CLI plumbing: error type, exit codes and the loaded session.

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use tracing::debug;

use crate::config::Config;
use crate::error::LayoutError;
use crate::services::persistence::StateService;
use crate::state::AppState;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Command succeeded
    Success = 0,
    /// File system or serialization failure
    IoError = 1,
    /// Invalid input, missing layout or rejected import
    ValidationError = 2,
}

impl ExitCode {
    /// Numeric code passed to `std::process::exit`.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Error returned by a CLI command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    /// Exit code to terminate with
    pub kind: ExitCode,
    /// Message printed to stderr
    pub message: String,
}

impl CliError {
    /// I/O failure.
    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ExitCode::IoError,
            message: message.into(),
        }
    }

    /// Validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ExitCode::ValidationError,
            message: message.into(),
        }
    }

    /// Exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<LayoutError> for CliError {
    fn from(err: LayoutError) -> Self {
        Self::validation(err.to_string())
    }
}

/// Result alias for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Options shared by every command.
#[derive(Debug, Clone, Default, Args)]
pub struct GlobalArgs {
    /// Directory holding layouts.json and ranks.json (overrides config)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Class tag for a new data directory (overrides config)
    #[arg(long, global = true, value_name = "TAG")]
    pub class: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalArgs {
    /// Loads the configuration these options point at.
    pub fn load_config(&self) -> CliResult<Config> {
        let result = match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        };
        result.map_err(|e| CliError::validation(format!("Failed to load configuration: {e:#}")))
    }
}

/// Loaded state plus where to save it.
pub struct Session {
    /// Application state
    pub state: AppState,
    /// Data directory the state was loaded from
    pub data_dir: PathBuf,
}

impl Session {
    /// Loads state for the given options.
    pub fn open(global: &GlobalArgs, config: &Config) -> CliResult<Self> {
        let data_dir = match &global.data_dir {
            Some(dir) => dir.clone(),
            None => config
                .data_dir()
                .map_err(|e| CliError::io(format!("Failed to resolve data directory: {e}")))?,
        };
        let class_tag = global
            .class
            .clone()
            .unwrap_or_else(|| config.character.class_tag.clone());

        debug!(data_dir = %data_dir.display(), "Loading state");
        let state = StateService::load(&data_dir, &class_tag)
            .map_err(|e| CliError::io(format!("Failed to load state: {e:#}")))?
            .with_debounce(config.capture.debounce());
        Ok(Self { state, data_dir })
    }

    /// Writes the state back to the data directory.
    pub fn save(&self) -> CliResult<()> {
        StateService::save(&self.state, &self.data_dir)
            .map_err(|e| CliError::io(format!("Failed to save state: {e:#}")))
    }
}

/// Serializes a value as pretty JSON for `--json` output.
pub fn to_json<T: serde::Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("Failed to serialize JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_errors_are_validation_errors() {
        let err: CliError = LayoutError::NotFound { spec: 1, level: 3 }.into();
        assert_eq!(err.kind, ExitCode::ValidationError);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("level 3"));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.code(), 0);
        assert_eq!(CliError::io("disk").exit_code(), 1);
        assert_eq!(CliError::validation("bad").exit_code(), 2);
    }
}
