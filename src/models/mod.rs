//! Data models for slot layouts, snapshots, templates and rank availability.
//!
//! This module contains all the core data structures used throughout the application.
//! Models are designed to be independent of storage and business logic.

pub mod rank_cache;
pub mod slot;
pub mod snapshot;
pub mod template;

// Re-export all model types
pub use rank_cache::{ClassRanks, RankAvailabilityCache, RankEntry, RankObservation, SourceKind};
pub use slot::{SlotAssignment, SlotIdentity, SlotKind};
pub use snapshot::{LayoutKey, Snapshot};
pub use template::Template;
