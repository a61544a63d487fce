//! Single-key layout operations: copy/paste, templates, save, delete.
//!
//! Every mutation goes through [`AppState::write`] or [`AppState::delete`],
//! so each written key gets exactly one undo entry.

use tracing::info;

use crate::error::{LayoutError, LayoutResult};
use crate::models::{LayoutKey, Snapshot, Template};
use crate::services::derivation::derive;
use crate::state::AppState;

/// Re-derives `snapshot` for `level` if it came from a different level.
fn for_level(state: &AppState, snapshot: &Snapshot, level: u8) -> Snapshot {
    if snapshot.level == level {
        snapshot.saved_at(level)
    } else {
        derive(state.class_ranks(), snapshot, level).saved_at(level)
    }
}

/// Returns the effective layout or [`LayoutError::EmptySource`].
fn require_source(state: &AppState, spec: u8, level: u8) -> LayoutResult<Snapshot> {
    state.resolve_fresh(spec, level)?.ok_or_else(|| {
        LayoutError::EmptySource(format!("no layout at level {level} of spec {spec}"))
    })
}

/// Copies the effective layout at (spec, level) to the clipboard.
pub fn copy_level(state: &mut AppState, spec: u8, level: u8) -> LayoutResult<String> {
    let snapshot = require_source(state, spec, level)?;
    Ok(state.clipboard.copy(snapshot, spec, level))
}

/// Pastes the clipboard into (spec, level), re-deriving ranks for that level.
///
/// Returns true if the stored layout changed.
pub fn paste_level(state: &mut AppState, spec: u8, level: u8) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    let content = state
        .clipboard
        .get_content()
        .cloned()
        .ok_or_else(|| LayoutError::EmptySource("clipboard is empty".to_string()))?;

    let snapshot = for_level(state, &content.snapshot, level);
    let description = format!(
        "Paste level {} (spec {}) into level {level}",
        content.source_level, content.source_spec
    );
    state.write(key, snapshot, description)
}

/// Stores the effective layout of a level, turning a derived layout into a saved one.
pub fn save_resolved(state: &mut AppState, spec: u8, level: u8) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    let snapshot = state.resolve_fresh(spec, level)?.ok_or(LayoutError::NotFound {
        spec,
        level,
    })?;
    state.write(key, snapshot.saved_at(level), format!("Save level {level}"))
}

/// Marks or unmarks a level as keyframe. Returns true if the flag changed.
pub fn set_keyframe(state: &mut AppState, spec: u8, level: u8, keyframe: bool) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    let changed = state.store.set_keyframe(key, keyframe)?;
    if changed {
        info!(spec, level, keyframe, "Keyframe flag changed");
    }
    Ok(changed)
}

/// Deletes the stored layout of a level.
pub fn delete_level(state: &mut AppState, spec: u8, level: u8) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    state.delete(key, format!("Delete level {level}"))
}

/// Deletes every stored layout and keyframe of a spec.
///
/// Each deleted level gets its own undo entry; only the most recent ones
/// fit on the bounded stack. Returns the number of deleted levels.
pub fn clear_spec(state: &mut AppState, spec: u8) -> LayoutResult<usize> {
    let levels = state.store.levels(spec)?;
    let mut deleted = 0;
    for level in levels {
        if state.delete(LayoutKey { spec, level }, format!("Clear spec {spec}"))? {
            deleted += 1;
        }
    }
    state.store.replace_keyframes(spec, Default::default())?;
    info!(spec, deleted, "Cleared spec");
    Ok(deleted)
}

/// Saves the effective layout of a level as a named template.
pub fn save_template(
    state: &mut AppState,
    spec: u8,
    level: u8,
    name: &str,
    description: &str,
) -> LayoutResult<()> {
    let snapshot = require_source(state, spec, level)?;
    let template = Template::new(name, description, &snapshot, Some(level))?;
    let replaced = state.store.put_template(spec, template)?;
    info!(spec, level, name, replaced = replaced.is_some(), "Saved template");
    Ok(())
}

/// Writes a template into (spec, level), re-deriving ranks for that level.
pub fn apply_template(state: &mut AppState, spec: u8, name: &str, level: u8) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    let source = state
        .store
        .template(spec, name)
        .map(|template| template.layout.clone())
        .ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))?;

    let snapshot = for_level(state, &source, level);
    state.write(key, snapshot, format!("Apply template '{name}' to level {level}"))
}

/// Deletes a template.
pub fn delete_template(state: &mut AppState, spec: u8, name: &str) -> LayoutResult<()> {
    state.store.remove_template(spec, name)?;
    Ok(())
}
