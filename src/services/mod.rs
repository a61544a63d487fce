//! Service layer for layout business logic.
//!
//! This module contains the store, derivation, diff, propagation and undo
//! services that operate on [`crate::state::AppState`].

pub mod clipboard;
pub mod derivation;
pub mod diff;
pub mod layout_store;
pub mod live;
pub mod operations;
pub mod persistence;
pub mod propagation;
pub mod scheduler;
pub mod undo;

// Re-export commonly used types and functions
pub use derivation::{adjust_rank, derive, resolve, RankAdjustment};
pub use diff::{diff, ChangeKind, LayoutDiff, SlotChange};
pub use layout_store::{LayoutStore, SpecLayouts};
pub use live::{LiveState, MemoryLiveState};
pub use persistence::StateService;
pub use propagation::{push_changes, push_to_targets, Direction};
pub use undo::{UndoEntry, UndoStack};
