//! CLI command handlers for LazyBars.
//!
//! Each command loads the persisted state, runs one operation and saves the
//! state back when something changed.

pub mod common;
pub mod keyframe;
pub mod push;
pub mod show;
pub mod templates;
pub mod transfer;

// Re-export types used by main.rs and tests
pub use common::{CliError, CliResult, ExitCode, GlobalArgs, Session};
pub use keyframe::KeyframeArgs;
pub use push::PushArgs;
pub use show::{DiffArgs, ShowArgs};
pub use templates::TemplatesArgs;
pub use transfer::{ExportArgs, ImportArgs};
