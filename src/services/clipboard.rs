//! Clipboard for whole-layout copy/paste between levels and specs.
//!
//! Holds a single copied snapshot for the session. Copying again
//! overwrites it; pasting keeps it so it can be pasted repeatedly.

use crate::models::Snapshot;

/// Content stored in the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardContent {
    /// The copied layout
    pub snapshot: Snapshot,
    /// Level it was copied from
    pub source_level: u8,
    /// Spec it was copied from
    pub source_spec: u8,
}

/// Session clipboard for layouts.
#[derive(Debug, Clone, Default)]
pub struct LayoutClipboard {
    content: Option<ClipboardContent>,
}

impl LayoutClipboard {
    /// Create a new empty clipboard.
    #[must_use]
    pub const fn new() -> Self {
        Self { content: None }
    }

    /// Copy a layout to the clipboard.
    ///
    /// Returns a description of what was copied for status message.
    pub fn copy(&mut self, snapshot: Snapshot, source_spec: u8, source_level: u8) -> String {
        let configured = snapshot.configured_slots();
        self.content = Some(ClipboardContent {
            snapshot,
            source_level,
            source_spec,
        });
        format!("Copied level {source_level} (spec {source_spec}, {configured} slots)")
    }

    /// Check if there is content to paste.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Get the clipboard content for pasting.
    #[must_use]
    pub fn get_content(&self) -> Option<&ClipboardContent> {
        self.content.as_ref()
    }

    /// Clear the clipboard.
    pub fn clear(&mut self) {
        self.content = None;
    }
}
