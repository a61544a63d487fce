//! Keyframe derivation.
//!
//! Rewrites a stored snapshot for a different level by swapping every spell
//! rank for the best rank available at that level, and resolves the
//! effective layout of a level from the nearest keyframe below it.

use crate::models::slot::rank_number;
use crate::models::{ClassRanks, LayoutKey, SlotAssignment, Snapshot};
use crate::services::layout_store::LayoutStore;
use tracing::debug;

/// Outcome of adjusting one spell to a target level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankAdjustment {
    /// The cache knows nothing about the spell; the input is kept as is
    Unknown(SlotAssignment),
    /// A rank is available at the target level
    Available(SlotAssignment),
    /// The spell is known but no rank is available yet at the target level
    Unavailable {
        /// Spell name, kept for diagnostics
        name: String,
    },
}

impl RankAdjustment {
    /// Returns the assignment to place in the slot.
    #[must_use]
    pub fn into_assignment(self) -> SlotAssignment {
        match self {
            Self::Unknown(assignment) | Self::Available(assignment) => assignment,
            Self::Unavailable { .. } => SlotAssignment::Empty,
        }
    }
}

/// Picks the rank of `name` to use at `target_level`.
///
/// Known ranks are ordered by the level they became available, highest
/// first (ties broken by the higher rank number), and the first one
/// available at or below `target_level` wins.
///
/// # Examples
///
/// ```
/// use lazybars::models::{RankAvailabilityCache, RankObservation, SlotAssignment};
/// use lazybars::services::derivation::adjust_rank;
///
/// let mut cache = RankAvailabilityCache::new();
/// cache.observe("MAGE", RankObservation::new("Fireball", "Rank 1", 10));
/// cache.observe("MAGE", RankObservation::new("Fireball", "Rank 2", 20));
///
/// let adjusted = adjust_rank(cache.class("MAGE"), "Fireball", "Rank 1", 0, 25);
/// assert_eq!(adjusted.into_assignment(), SlotAssignment::spell("Fireball", "Rank 2"));
/// ```
#[must_use]
pub fn adjust_rank(
    ranks: Option<&ClassRanks>,
    name: &str,
    rank: &str,
    icon: u32,
    target_level: u8,
) -> RankAdjustment {
    let Some(known) = ranks.and_then(|ranks| ranks.ranks(name)) else {
        return RankAdjustment::Unknown(SlotAssignment::Spell {
            name: name.to_string(),
            rank: rank.to_string(),
            icon,
        });
    };

    let mut candidates: Vec<_> = known.iter().collect();
    candidates.sort_by(|(rank_a, a), (rank_b, b)| {
        b.lowest_level
            .cmp(&a.lowest_level)
            .then_with(|| rank_number(rank_b).cmp(&rank_number(rank_a)))
    });

    match candidates
        .into_iter()
        .find(|(_, entry)| entry.lowest_level <= target_level)
    {
        Some((selected, entry)) => RankAdjustment::Available(SlotAssignment::Spell {
            name: name.to_string(),
            rank: selected.clone(),
            icon: if entry.icon != 0 { entry.icon } else { icon },
        }),
        None => RankAdjustment::Unavailable {
            name: name.to_string(),
        },
    }
}

/// Adjusts any assignment for a target level; only spells change.
#[must_use]
pub fn adjust_assignment(
    ranks: Option<&ClassRanks>,
    assignment: &SlotAssignment,
    target_level: u8,
) -> RankAdjustment {
    match assignment {
        SlotAssignment::Spell { name, rank, icon } => {
            adjust_rank(ranks, name, rank, *icon, target_level)
        }
        other => RankAdjustment::Unknown(other.clone()),
    }
}

/// Synthesizes a snapshot for `target_level` from `source`.
///
/// Empty slots stay empty, non-spell slots are copied verbatim and spell
/// slots go through [`adjust_rank`]. The result is marked derived and
/// records the source level; spells blanked for lack of an available rank
/// are listed in [`Snapshot::unavailable`].
#[must_use]
pub fn derive(ranks: Option<&ClassRanks>, source: &Snapshot, target_level: u8) -> Snapshot {
    let mut derived = Snapshot::with_created(target_level, source.created);
    derived.is_derived = true;
    derived.source_level = Some(source.level);

    for (slot, assignment) in source.iter() {
        match adjust_assignment(ranks, assignment, target_level) {
            RankAdjustment::Unavailable { name } => {
                debug!(slot, spell = %name, level = target_level, "No rank available yet");
                derived.unavailable.insert(slot, name);
            }
            adjusted => {
                // Slot indices come from a valid snapshot
                let _ = derived.set(slot, adjusted.into_assignment());
            }
        }
    }

    derived
}

/// Returns the effective layout of `key`.
///
/// 1. A keyframe with a stored snapshot is returned as is.
/// 2. Otherwise the greatest keyframe `k <= level` with a snapshot is used,
///    directly when `k == level`, derived for `level` otherwise.
/// 3. Otherwise any snapshot stored at the level is returned.
/// 4. Otherwise `None`.
#[must_use]
pub fn resolve(store: &LayoutStore, ranks: Option<&ClassRanks>, key: LayoutKey) -> Option<Snapshot> {
    if store.is_keyframe(key) {
        if let Some(snapshot) = store.get(key) {
            return Some(snapshot.clone());
        }
    }

    if let Some((keyframe, snapshot)) = store.keyframe_at_or_below(key.spec, key.level) {
        if keyframe == key.level {
            return Some(snapshot.clone());
        }
        return Some(derive(ranks, snapshot, key.level));
    }

    store.get(key).cloned()
}
