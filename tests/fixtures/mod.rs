//! Shared test fixtures for integration and CLI tests.
#![allow(dead_code)] // Not every test file uses every fixture

use lazybars::models::{LayoutKey, RankObservation, SlotAssignment, Snapshot};
use lazybars::services::persistence::StateService;
use lazybars::AppState;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Class tag used by the fixtures.
pub const CLASS: &str = "MAGE";

/// Path to the lazybars binary.
pub fn lazybars_bin() -> &'static str {
    env!("CARGO_BIN_EXE_lazybars")
}

/// Builds a spell assignment.
pub fn spell(name: &str, rank: &str) -> SlotAssignment {
    SlotAssignment::spell(name, rank)
}

/// Builds an item assignment.
pub fn item(id: u32, name: &str) -> SlotAssignment {
    SlotAssignment::item(id, name)
}

/// Builds a snapshot from (slot, assignment) pairs.
pub fn snapshot(level: u8, slots: &[(u8, SlotAssignment)]) -> Snapshot {
    Snapshot::from_slots(level, slots.iter().cloned()).expect("fixture slots are in range")
}

/// Key in spec 1.
pub fn key(level: u8) -> LayoutKey {
    LayoutKey::new(1, level).expect("fixture key is in range")
}

/// Mage state with a small rank cache:
///
/// - Fireball: Rank 1 at 10, Rank 2 at 20, Rank 3 at 30
/// - Frostbolt: Rank 1 at 4, Rank 2 at 8
/// - Blizzard: Rank 1 at 20
pub fn mage_state() -> AppState {
    let mut state = AppState::new(CLASS);
    for (name, rank, level) in [
        ("Fireball", "Rank 1", 10),
        ("Fireball", "Rank 2", 20),
        ("Fireball", "Rank 3", 30),
        ("Frostbolt", "Rank 1", 4),
        ("Frostbolt", "Rank 2", 8),
        ("Blizzard", "Rank 1", 20),
    ] {
        state.observe(RankObservation::new(name, rank, level));
    }
    state
}

/// Mage state with keyframe 10 (Fireball in slot 5, Frostbolt in slot 6),
/// stored levels 12 and 15, and keyframe 18.
pub fn leveling_state() -> AppState {
    let mut state = mage_state();
    let keyframe = snapshot(
        10,
        &[(5, spell("Fireball", "Rank 1")), (6, spell("Frostbolt", "Rank 2"))],
    );
    state.write(key(10), keyframe, "capture").expect("write");
    state
        .write(key(12), snapshot(12, &[(3, item(2512, "Rough Arrow"))]), "capture")
        .expect("write");
    state
        .write(key(15), snapshot(15, &[(3, item(2512, "Rough Arrow"))]), "capture")
        .expect("write");
    state
        .write(key(18), snapshot(18, &[(1, item(6948, "Hearthstone"))]), "capture")
        .expect("write");
    state.store.set_keyframe(key(10), true).expect("keyframe");
    state.store.set_keyframe(key(18), true).expect("keyframe");
    state.undo.clear();
    state
}

/// Saves a state into a fresh temp data directory.
pub fn data_dir_with(state: &AppState) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    StateService::save(state, dir.path()).expect("save fixture state");
    dir
}

/// Loads the state a CLI run left behind.
pub fn load_state(dir: &Path) -> AppState {
    StateService::load(dir, CLASS).expect("load state")
}

/// Runs the binary against a data directory with an isolated config file.
pub fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(lazybars_bin())
        .arg("--data-dir")
        .arg(dir)
        .arg("--config")
        .arg(dir.join("config.toml"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command")
}

/// Stdout of a run as a string.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr of a run as a string.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
