//! State file I/O service.
//!
//! This module centralizes loading and saving the persisted parts of
//! [`AppState`]: the per-character layout store and the account-wide rank
//! cache. Undo history, clipboard and the session overlay are not persisted.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::DEFAULT_CLASS_TAG;
use crate::models::RankAvailabilityCache;
use crate::services::layout_store::LayoutStore;
use crate::state::AppState;

/// File name of the per-character layout store.
pub const LAYOUTS_FILE: &str = "layouts.json";

/// File name of the account-wide rank cache.
pub const RANKS_FILE: &str = "ranks.json";

/// On-disk shape of the per-character file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutsFile {
    /// Class of the character the layouts belong to
    pub class_tag: String,
    /// Stored layouts, keyframes, templates and slot masks
    pub store: LayoutStore,
}

/// Service for loading and saving persisted state.
pub struct StateService;

impl StateService {
    /// Loads state from a data directory.
    ///
    /// Missing files yield empty state; `class_tag` is used when no layout
    /// file exists yet. A layout file always keeps its own class, with a
    /// warning when an explicit `class_tag` differs from it. Stored layouts are checked
    /// against the key-space bounds before anything is returned.
    pub fn load(data_dir: &Path, class_tag: &str) -> Result<AppState> {
        let layouts_path = data_dir.join(LAYOUTS_FILE);
        let layouts: Option<LayoutsFile> = read_json(&layouts_path)?;
        let ranks: RankAvailabilityCache =
            read_json(&data_dir.join(RANKS_FILE))?.unwrap_or_default();

        let (class_tag, store) = match layouts {
            Some(file) => {
                file.store
                    .validate()
                    .with_context(|| format!("Invalid state file: {}", layouts_path.display()))?;
                if file.class_tag != class_tag && class_tag != DEFAULT_CLASS_TAG {
                    warn!(
                        stored = %file.class_tag,
                        requested = %class_tag,
                        "Data directory belongs to another class, using the stored class"
                    );
                }
                (file.class_tag, file.store)
            }
            None => (class_tag.to_string(), LayoutStore::new()),
        };
        Ok(AppState::with_parts(class_tag, store, ranks))
    }

    /// Saves state into a data directory, creating it if needed.
    pub fn save(state: &AppState, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir).with_context(|| {
            format!("Failed to create data directory: {}", data_dir.display())
        })?;

        let layouts = LayoutsFile {
            class_tag: state.class_tag.clone(),
            store: state.store.clone(),
        };
        write_json_atomic(&data_dir.join(LAYOUTS_FILE), &layouts)?;
        write_json_atomic(&data_dir.join(RANKS_FILE), &state.ranks)?;
        Ok(())
    }
}

/// Reads a JSON file, `None` if it does not exist.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
    Ok(Some(value))
}

/// Writes JSON using temp file + rename so the file is never left half written.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).context("Failed to serialize state")?;
    let temp_path: PathBuf = path.with_extension("json.tmp");

    fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write temp state file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
