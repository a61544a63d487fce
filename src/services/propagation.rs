//! Pushing layout changes across a bounded range of levels.
//!
//! A push never creates levels: only levels that already have a stored
//! snapshot are targets. The range stops before the nearest keyframe in the
//! push direction unless an explicit limit is given, and keyframes are never
//! written by a push.

use tracing::{debug, info};

use crate::constants::MAX_LEVEL;
use crate::error::{LayoutError, LayoutResult};
use crate::models::snapshot::validate_level;
use crate::models::{LayoutKey, SlotAssignment, Snapshot};
use crate::services::derivation::adjust_assignment;
use crate::services::diff::{diff, LayoutDiff};
use crate::services::layout_store::LayoutStore;
use crate::state::AppState;

/// Direction of a push relative to the source level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Towards higher levels
    Up,
    /// Towards lower levels
    Down,
}

impl Direction {
    /// Lowercase name for messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

/// Levels a push from `source_level` would write, nearest first.
///
/// Upward the range runs from `source_level + 1` to `limit_level` if given,
/// else to just below the nearest keyframe above, else to the maximum level.
/// Downward is symmetric. Only stored, non-keyframe levels are returned.
///
/// An explicit limit widens the range past keyframes but never makes one a
/// target, including a keyframe sitting exactly on the limit. Keyframes only
/// change through an explicit write at their own level.
pub fn push_targets(
    store: &LayoutStore,
    spec: u8,
    source_level: u8,
    direction: Direction,
    limit_level: Option<u8>,
) -> LayoutResult<Vec<u8>> {
    LayoutKey::new(spec, source_level)?;
    if let Some(limit) = limit_level {
        validate_level(limit)?;
    }

    let (low, high) = match direction {
        Direction::Up => {
            let high = limit_level.unwrap_or_else(|| {
                store
                    .keyframe_above(spec, source_level)
                    .map_or(MAX_LEVEL, |keyframe| keyframe - 1)
            });
            (source_level.saturating_add(1), high)
        }
        Direction::Down => {
            let low = limit_level.unwrap_or_else(|| {
                store
                    .keyframe_below(spec, source_level)
                    .map_or(1, |keyframe| keyframe + 1)
            });
            (low, source_level.saturating_sub(1))
        }
    };

    if low > high {
        return Ok(Vec::new());
    }

    let mut targets: Vec<u8> = store
        .levels(spec)?
        .into_iter()
        .filter(|level| (low..=high).contains(level))
        .filter(|level| {
            !store.is_keyframe(LayoutKey {
                spec,
                level: *level,
            })
        })
        .collect();
    if direction == Direction::Down {
        targets.reverse();
    }
    Ok(targets)
}

/// Applies `source` to one target, re-deriving spell ranks for the target level.
///
/// With `overwrite` false, slots that are empty in the source (or whose spell
/// has no rank available at the target level) are left as they are.
fn apply_source(
    state: &AppState,
    target: &Snapshot,
    source: &Snapshot,
    overwrite: bool,
) -> Snapshot {
    let mut changes = diff(Some(target), Some(source));
    if !overwrite {
        changes = changes.without_removals();
    }

    let ranks = state.class_ranks();
    let mut result = target.clone();
    for change in changes.changes() {
        let value = match &change.to {
            spell @ SlotAssignment::Spell { .. } => {
                adjust_assignment(ranks, spell, target.level).into_assignment()
            }
            other => other.clone(),
        };
        if value.is_empty() && !overwrite {
            continue;
        }
        // Slot indices come from a diff over 1..=120
        let _ = result.set(change.slot, value);
    }
    result
}

/// Pushes `source` to every target level in range, diffing each target separately.
///
/// All target snapshots are computed before anything is written; each
/// modified target gets one undo entry. Returns the number of targets that
/// actually changed.
pub fn push_to_targets(
    state: &mut AppState,
    source: &Snapshot,
    source_level: u8,
    direction: Direction,
    limit_level: Option<u8>,
    spec: u8,
    overwrite: bool,
) -> LayoutResult<usize> {
    let targets = push_targets(&state.store, spec, source_level, direction, limit_level)?;

    let mut planned = Vec::new();
    for level in targets {
        let key = LayoutKey { spec, level };
        let Some(target) = state.store.get(key) else {
            continue;
        };
        let updated = apply_source(state, target, source, overwrite);
        if updated.same_slots(target) {
            debug!(level, "Push target already up to date");
            continue;
        }
        planned.push((key, updated));
    }

    let mut affected = 0;
    for (key, updated) in planned {
        let description = format!(
            "Push {} from level {source_level} to level {}",
            direction.as_str(),
            key.level
        );
        if state.write(key, updated, description)? {
            affected += 1;
        }
    }

    info!(
        spec,
        source_level,
        direction = direction.as_str(),
        overwrite,
        affected,
        "Pushed layout"
    );
    Ok(affected)
}

/// Pushes the stored or effective layout at `source_level` to its range.
pub fn push_level(
    state: &mut AppState,
    spec: u8,
    source_level: u8,
    direction: Direction,
    limit_level: Option<u8>,
    overwrite: bool,
) -> LayoutResult<usize> {
    let source = state.resolve_fresh(spec, source_level)?.ok_or_else(|| {
        LayoutError::EmptySource(format!("no layout at level {source_level} of spec {spec}"))
    })?;
    push_to_targets(
        state,
        &source,
        source_level,
        direction,
        limit_level,
        spec,
        overwrite,
    )
}

/// Legacy push: diffs `before` against `after` once and applies that same
/// diff to every target in range, without re-deriving ranks per target.
///
/// Prefer [`push_to_targets`]; this only serves callers that hold a
/// before/after pair from an edit at the source level.
pub fn push_changes(
    state: &mut AppState,
    before: &Snapshot,
    after: &Snapshot,
    source_level: u8,
    direction: Direction,
    limit_level: Option<u8>,
    spec: u8,
    overwrite: bool,
) -> LayoutResult<usize> {
    let mut changes: LayoutDiff = diff(Some(before), Some(after));
    if !overwrite {
        changes = changes.without_removals();
    }
    if changes.is_empty() {
        return Ok(0);
    }

    let targets = push_targets(&state.store, spec, source_level, direction, limit_level)?;
    let planned: Vec<(LayoutKey, Snapshot)> = targets
        .into_iter()
        .filter_map(|level| {
            let key = LayoutKey { spec, level };
            let target = state.store.get(key)?;
            let updated = changes.apply_to(target);
            (!updated.same_slots(target)).then_some((key, updated))
        })
        .collect();

    let mut affected = 0;
    for (key, updated) in planned {
        let description = format!(
            "Push {} changes from level {source_level} to level {}",
            changes.total_changes(),
            key.level
        );
        if state.write(key, updated, description)? {
            affected += 1;
        }
    }

    info!(spec, source_level, affected, "Pushed fixed changes");
    Ok(affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RankObservation;

    fn key(level: u8) -> LayoutKey {
        LayoutKey::new(1, level).unwrap()
    }

    fn store_level(state: &mut AppState, level: u8, slots: Vec<(u8, SlotAssignment)>) {
        let snapshot = Snapshot::from_slots(level, slots).unwrap();
        state.store.put(key(level), snapshot).unwrap();
    }

    #[test]
    fn test_push_targets_stop_before_keyframe() {
        let mut state = AppState::new("MAGE");
        for level in [10, 12, 18, 20] {
            store_level(&mut state, level, vec![]);
        }
        state.store.set_keyframe(key(18), true).unwrap();

        let up = push_targets(&state.store, 1, 10, Direction::Up, None).unwrap();
        assert_eq!(up, vec![12]);

        let down = push_targets(&state.store, 1, 20, Direction::Down, None).unwrap();
        assert_eq!(down, Vec::<u8>::new());

        let down = push_targets(&state.store, 1, 17, Direction::Down, None).unwrap();
        assert_eq!(down, vec![12, 10]);
    }

    #[test]
    fn test_push_targets_explicit_limit() {
        let mut state = AppState::new("MAGE");
        for level in [10, 12, 18, 20, 30] {
            store_level(&mut state, level, vec![]);
        }
        state.store.set_keyframe(key(18), true).unwrap();

        // Limit replaces the keyframe bound, but keyframes are still skipped
        let up = push_targets(&state.store, 1, 10, Direction::Up, Some(25)).unwrap();
        assert_eq!(up, vec![12, 20]);

        // A keyframe on the limit itself is not a target either
        let up = push_targets(&state.store, 1, 10, Direction::Up, Some(18)).unwrap();
        assert_eq!(up, vec![12]);
        let down = push_targets(&state.store, 1, 30, Direction::Down, Some(18)).unwrap();
        assert_eq!(down, vec![20]);

        // Limit on the wrong side gives nothing
        let up = push_targets(&state.store, 1, 10, Direction::Up, Some(5)).unwrap();
        assert!(up.is_empty());
    }

    #[test]
    fn test_push_targets_validate_bounds() {
        let state = AppState::new("MAGE");
        assert!(push_targets(&state.store, 1, 0, Direction::Up, None).is_err());
        assert!(push_targets(&state.store, 1, 10, Direction::Up, Some(81)).is_err());
        assert!(push_targets(&state.store, 6, 10, Direction::Up, None).is_err());
    }

    #[test]
    fn test_push_adjusts_spell_rank_per_target() {
        let mut state = AppState::new("MAGE");
        state.observe(RankObservation::new("Fireball", "Rank 1", 1));
        state.observe(RankObservation::new("Fireball", "Rank 2", 20));
        store_level(&mut state, 15, vec![]);
        store_level(&mut state, 25, vec![]);

        let source =
            Snapshot::from_slots(10, [(1, SlotAssignment::spell("Fireball", "Rank 1"))]).unwrap();
        let affected =
            push_to_targets(&mut state, &source, 10, Direction::Up, None, 1, false).unwrap();
        assert_eq!(affected, 2);
        assert_eq!(state.store.get(key(15)).unwrap().get(1).rank(), Some("Rank 1"));
        assert_eq!(state.store.get(key(25)).unwrap().get(1).rank(), Some("Rank 2"));
        assert_eq!(state.undo.len(), 2);
    }

    #[test]
    fn test_push_is_idempotent() {
        let mut state = AppState::new("MAGE");
        store_level(&mut state, 12, vec![]);
        let source = Snapshot::from_slots(10, [(5, SlotAssignment::item(1, "ItemX"))]).unwrap();

        assert_eq!(
            push_to_targets(&mut state, &source, 10, Direction::Up, None, 1, true).unwrap(),
            1
        );
        assert_eq!(
            push_to_targets(&mut state, &source, 10, Direction::Up, None, 1, true).unwrap(),
            0
        );
        assert_eq!(state.undo.len(), 1);
        assert_eq!(state.store.get(key(12)).unwrap().configured_slots(), 1);
    }

    #[test]
    fn test_push_unavailable_spell_kept_without_overwrite() {
        let mut state = AppState::new("MAGE");
        state.observe(RankObservation::new("Blizzard", "Rank 1", 20));
        store_level(&mut state, 8, vec![(2, SlotAssignment::item(1, "Rock"))]);

        let source =
            Snapshot::from_slots(20, [(2, SlotAssignment::spell("Blizzard", "Rank 1"))]).unwrap();
        let affected =
            push_to_targets(&mut state, &source, 20, Direction::Down, None, 1, false).unwrap();
        assert_eq!(affected, 0);
        assert_eq!(state.store.get(key(8)).unwrap().get(2).label(), "Rock");
    }

    #[test]
    fn test_push_level_requires_source() {
        let mut state = AppState::new("MAGE");
        assert!(matches!(
            push_level(&mut state, 1, 10, Direction::Up, None, false),
            Err(LayoutError::EmptySource(_))
        ));
    }

    #[test]
    fn test_push_changes_applies_fixed_diff() {
        let mut state = AppState::new("MAGE");
        store_level(&mut state, 12, vec![(1, SlotAssignment::item(1, "Rock"))]);
        store_level(&mut state, 14, vec![(1, SlotAssignment::item(1, "Rock"))]);

        let before = Snapshot::from_slots(10, [(1, SlotAssignment::item(1, "Rock"))]).unwrap();
        let after = Snapshot::from_slots(
            10,
            [
                (1, SlotAssignment::item(1, "Rock")),
                (2, SlotAssignment::spell("Fireball", "Rank 9")),
            ],
        )
        .unwrap();

        let affected =
            push_changes(&mut state, &before, &after, 10, Direction::Up, None, 1, false).unwrap();
        assert_eq!(affected, 2);
        // No per-target re-derivation: rank is copied verbatim
        assert_eq!(state.store.get(key(14)).unwrap().get(2).rank(), Some("Rank 9"));
    }
}
