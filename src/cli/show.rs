//! Read-only commands: show a level and diff two levels.

use clap::Args;
use serde::Serialize;

use crate::cli::common::{to_json, CliResult, Session};
use crate::error::LayoutError;
use crate::models::{LayoutKey, Snapshot};
use crate::services::diff::diff;
use crate::state::AppState;

/// Show a stored or derived level, or list stored levels
#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Level to show (omit to list stored levels)
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub level: Option<u8>,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Stored level summary for listings
#[derive(Debug, Clone, Serialize)]
pub struct LevelInfo {
    /// Level
    pub level: u8,
    /// Whether the level is a keyframe
    pub keyframe: bool,
    /// Number of non-empty slots
    pub configured_slots: usize,
}

/// Level listing response
#[derive(Debug, Clone, Serialize)]
pub struct LevelListResponse {
    /// Spec index
    pub spec: u8,
    /// Stored levels, ascending
    pub levels: Vec<LevelInfo>,
    /// Total number of stored levels
    pub count: usize,
}

impl ShowArgs {
    /// Execute the show command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        match self.level {
            Some(level) => self.show_level(&mut session.state, level),
            None => self.list_levels(&session.state),
        }
    }

    fn show_level(&self, state: &mut AppState, level: u8) -> CliResult<()> {
        let snapshot = state
            .resolve(self.spec, level)?
            .ok_or(LayoutError::NotFound {
                spec: self.spec,
                level,
            })?;

        if self.json {
            println!("{}", to_json(&snapshot)?);
            return Ok(());
        }

        let key = LayoutKey::new(self.spec, level)?;
        let origin = match snapshot.source_level {
            Some(source) if snapshot.is_derived => format!("derived from keyframe {source}"),
            _ if state.store.is_keyframe(key) => "keyframe".to_string(),
            _ => "saved".to_string(),
        };
        println!("Level {level} (spec {}): {origin}", self.spec);
        print_slots(&snapshot);
        Ok(())
    }

    fn list_levels(&self, state: &AppState) -> CliResult<()> {
        let levels: Vec<LevelInfo> = state
            .store
            .spec(self.spec)?
            .snapshots
            .iter()
            .map(|(level, snapshot)| LevelInfo {
                level: *level,
                keyframe: state.store.is_keyframe(LayoutKey {
                    spec: self.spec,
                    level: *level,
                }),
                configured_slots: snapshot.configured_slots(),
            })
            .collect();
        let count = levels.len();
        let response = LevelListResponse {
            spec: self.spec,
            levels,
            count,
        };

        if self.json {
            println!("{}", to_json(&response)?);
        } else if count == 0 {
            println!("No levels saved for spec {}.", self.spec);
        } else {
            println!("Saved levels for spec {} ({count}):\n", self.spec);
            for info in &response.levels {
                let marker = if info.keyframe { " [keyframe]" } else { "" };
                println!(
                    "  {:>2}  {} slot(s){marker}",
                    info.level, info.configured_slots
                );
            }
        }
        Ok(())
    }
}

fn print_slots(snapshot: &Snapshot) {
    println!("{} slot(s) configured", snapshot.configured_slots());
    for (slot, assignment) in snapshot.iter() {
        println!("  {slot:>3}  {}", assignment.label());
    }
    if !snapshot.unavailable.is_empty() {
        println!("Not yet available at this level:");
        for (slot, name) in &snapshot.unavailable {
            println!("  {slot:>3}  {name}");
        }
    }
}

/// Show what changed between two levels
#[derive(Debug, Clone, Args)]
pub struct DiffArgs {
    /// Spec index (1-5)
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub spec: u8,

    /// Old side level
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub from: u8,

    /// New side level
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=80))]
    pub to: u8,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Diff response for JSON output
#[derive(Debug, Clone, Serialize)]
pub struct DiffResponse {
    /// Old side level
    pub from: u8,
    /// New side level
    pub to: u8,
    /// Same spell, higher rank
    pub rank_upgrades: usize,
    /// Same spell, rank not higher
    pub rank_downgrades: usize,
    /// Empty slots that became assigned
    pub new_assignments: usize,
    /// Assigned slots that became empty
    pub removed_assignments: usize,
    /// Slots holding something different
    pub replaced_slots: usize,
    /// Sum of all categories
    pub total_changes: usize,
    /// Human-readable summary
    pub summary: Vec<String>,
}

impl DiffArgs {
    /// Execute the diff command
    pub fn execute(&self, session: &mut Session) -> CliResult<()> {
        let state = &mut session.state;
        let from = state.resolve(self.spec, self.from)?;
        let to = state.resolve(self.spec, self.to)?;
        let changes = diff(from.as_ref(), to.as_ref());

        if self.json {
            let response = DiffResponse {
                from: self.from,
                to: self.to,
                rank_upgrades: changes.rank_upgrades.len(),
                rank_downgrades: changes.rank_downgrades.len(),
                new_assignments: changes.new_assignments.len(),
                removed_assignments: changes.removed_assignments.len(),
                replaced_slots: changes.replaced_slots.len(),
                total_changes: changes.total_changes(),
                summary: changes.summary(),
            };
            println!("{}", to_json(&response)?);
        } else {
            println!("Level {} -> {} (spec {}):", self.from, self.to, self.spec);
            for line in changes.summary() {
                println!("{line}");
            }
        }
        Ok(())
    }
}
