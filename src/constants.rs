//! Application-wide constants.
//!
//! This module defines the fixed bounds of the layout key space and the
//! export wire format, along with the application name.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "LazyBars";

/// The binary name of the application (used in command examples, lowercase with hyphens).
pub const APP_BINARY_NAME: &str = "lazybars";

/// Number of assignable slots in one snapshot (indices are 1-based).
pub const SLOT_COUNT: u8 = 120;

/// Highest progression level a snapshot can be stored at.
pub const MAX_LEVEL: u8 = 80;

/// Number of specs a character can keep separate layouts for.
pub const SPEC_COUNT: u8 = 5;

/// Maximum number of entries kept on the undo stack.
pub const UNDO_DEPTH: usize = 20;

/// Maximum nesting depth accepted by the value tree printer and parser.
pub const MAX_VALUE_DEPTH: usize = 20;

/// Prefix of every export string (`LAZYBARS:v1:...`).
pub const EXPORT_PREFIX: &str = "LAZYBARS";

/// Highest export format version this build can read and the version it writes.
pub const EXPORT_VERSION: u32 = 1;

/// Export strings longer than this are rejected before decoding.
pub const MAX_EXPORT_LEN: usize = 1024 * 1024;

/// Class tag used when neither `--class` nor the config names one.
pub const DEFAULT_CLASS_TAG: &str = "UNKNOWN";
