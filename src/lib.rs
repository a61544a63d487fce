//! LazyBars Library
//!
//! This library keeps level-keyed snapshots of 120 action slots per spec,
//! derives layouts for unsaved levels from keyframes, diffs and pushes
//! layouts across level ranges with bounded undo, and encodes layouts as
//! shareable export strings.

// Module declarations
pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod services;
pub mod state;

pub use error::{LayoutError, LayoutResult};
pub use state::AppState;
