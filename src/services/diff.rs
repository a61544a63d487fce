//! Structural per-slot diff between two snapshots.
//!
//! Every slot in 1..=120 is compared independently and lands in at most one
//! category. A missing snapshot compares as all-empty.

use crate::constants::SLOT_COUNT;
use crate::models::slot::rank_number;
use crate::models::{SlotAssignment, SlotIdentity, Snapshot};

/// Category a changed slot falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    /// Same spell, higher rank on the new side
    RankUpgrade,
    /// Same spell, rank not higher on the new side
    RankDowngrade,
    /// Empty slot became assigned
    NewAssignment,
    /// Assigned slot became empty
    Removed,
    /// Slot holds a different thing
    Replaced,
}

impl ChangeKind {
    /// Human-readable name of the category.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::RankUpgrade => "Rank upgrades",
            Self::RankDowngrade => "Rank downgrades",
            Self::NewAssignment => "New",
            Self::Removed => "Removed",
            Self::Replaced => "Replaced",
        }
    }
}

/// One changed slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    /// Slot index (1-based)
    pub slot: u8,
    /// Category of the change
    pub kind: ChangeKind,
    /// Assignment on the old side
    pub from: SlotAssignment,
    /// Assignment on the new side
    pub to: SlotAssignment,
}

impl SlotChange {
    /// True when the new side is a spell (used to split new assignments for display).
    #[must_use]
    pub const fn is_spell(&self) -> bool {
        self.to.is_spell()
    }

    /// Identity on the old side.
    #[must_use]
    pub fn from_identity(&self) -> Option<SlotIdentity> {
        self.from.identity()
    }

    /// Identity on the new side.
    #[must_use]
    pub fn to_identity(&self) -> Option<SlotIdentity> {
        self.to.identity()
    }

    /// One-line description for summaries.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.kind {
            ChangeKind::RankUpgrade | ChangeKind::RankDowngrade => format!(
                "slot {}: {} {} -> {}",
                self.slot,
                self.to.identity().map_or_else(String::new, |id| id.name),
                self.from.rank().unwrap_or_default(),
                self.to.rank().unwrap_or_default()
            ),
            ChangeKind::NewAssignment => format!("slot {}: + {}", self.slot, self.to.label()),
            ChangeKind::Removed => format!("slot {}: - {}", self.slot, self.from.label()),
            ChangeKind::Replaced => {
                format!("slot {}: {} -> {}", self.slot, self.from.label(), self.to.label())
            }
        }
    }
}

/// Classified differences between an old and a new snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LayoutDiff {
    /// Same spell, higher rank
    pub rank_upgrades: Vec<SlotChange>,
    /// Same spell, rank not higher
    pub rank_downgrades: Vec<SlotChange>,
    /// Empty -> assigned
    pub new_assignments: Vec<SlotChange>,
    /// Assigned -> empty
    pub removed_assignments: Vec<SlotChange>,
    /// Different identity
    pub replaced_slots: Vec<SlotChange>,
}

impl LayoutDiff {
    /// Sum of all category sizes.
    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.rank_upgrades.len()
            + self.rank_downgrades.len()
            + self.new_assignments.len()
            + self.removed_assignments.len()
            + self.replaced_slots.len()
    }

    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_changes() == 0
    }

    /// All changes ordered by slot.
    #[must_use]
    pub fn changes(&self) -> Vec<&SlotChange> {
        let mut all: Vec<&SlotChange> = self
            .rank_upgrades
            .iter()
            .chain(&self.rank_downgrades)
            .chain(&self.new_assignments)
            .chain(&self.removed_assignments)
            .chain(&self.replaced_slots)
            .collect();
        all.sort_by_key(|change| change.slot);
        all
    }

    /// Drops removals, leaving targets' assigned slots untouched when applied.
    #[must_use]
    pub fn without_removals(mut self) -> Self {
        self.removed_assignments.clear();
        self
    }

    /// Returns a copy of `target` with every change's new side written in.
    ///
    /// Applying the same diff twice gives the same snapshot as applying it once.
    #[must_use]
    pub fn apply_to(&self, target: &Snapshot) -> Snapshot {
        let mut result = target.clone();
        for change in self.changes() {
            // Slot indices come from a diff over 1..=120
            let _ = result.set(change.slot, change.to.clone());
        }
        result
    }

    /// New assignments split into (spells, other).
    #[must_use]
    pub fn new_assignments_split(&self) -> (Vec<&SlotChange>, Vec<&SlotChange>) {
        self.new_assignments.iter().partition(|change| change.is_spell())
    }

    /// Human-readable "what changed" lines.
    #[must_use]
    pub fn summary(&self) -> Vec<String> {
        if self.is_empty() {
            return vec!["No changes".to_string()];
        }

        let mut lines = Vec::new();
        let (new_spells, new_other) = self.new_assignments_split();
        let sections: [(&str, Vec<&SlotChange>); 6] = [
            (
                ChangeKind::RankUpgrade.display_name(),
                self.rank_upgrades.iter().collect(),
            ),
            (
                ChangeKind::RankDowngrade.display_name(),
                self.rank_downgrades.iter().collect(),
            ),
            ("New spells", new_spells),
            ("New other", new_other),
            (
                ChangeKind::Removed.display_name(),
                self.removed_assignments.iter().collect(),
            ),
            (
                ChangeKind::Replaced.display_name(),
                self.replaced_slots.iter().collect(),
            ),
        ];

        for (title, changes) in sections {
            if changes.is_empty() {
                continue;
            }
            lines.push(format!("{title} ({}):", changes.len()));
            lines.extend(changes.iter().map(|change| format!("  {}", change.describe())));
        }
        lines.push(format!("Total: {} change(s)", self.total_changes()));
        lines
    }

    fn push(&mut self, change: SlotChange) {
        match change.kind {
            ChangeKind::RankUpgrade => self.rank_upgrades.push(change),
            ChangeKind::RankDowngrade => self.rank_downgrades.push(change),
            ChangeKind::NewAssignment => self.new_assignments.push(change),
            ChangeKind::Removed => self.removed_assignments.push(change),
            ChangeKind::Replaced => self.replaced_slots.push(change),
        }
    }
}

/// Classifies the change of one slot, `None` if it did not change.
#[must_use]
pub fn classify(from: &SlotAssignment, to: &SlotAssignment) -> Option<ChangeKind> {
    match (from, to) {
        (SlotAssignment::Empty, SlotAssignment::Empty) => None,
        (SlotAssignment::Empty, _) => Some(ChangeKind::NewAssignment),
        (_, SlotAssignment::Empty) => Some(ChangeKind::Removed),
        (
            SlotAssignment::Spell {
                name: from_name,
                rank: from_rank,
                ..
            },
            SlotAssignment::Spell {
                name: to_name,
                rank: to_rank,
                ..
            },
        ) if from_name == to_name && from_rank != to_rank => {
            if rank_number(to_rank) > rank_number(from_rank) {
                Some(ChangeKind::RankUpgrade)
            } else {
                Some(ChangeKind::RankDowngrade)
            }
        }
        _ if from.identity() != to.identity() => Some(ChangeKind::Replaced),
        _ => None,
    }
}

/// Computes the structural diff from `a` (old) to `b` (new).
///
/// # Examples
///
/// ```
/// use lazybars::models::{SlotAssignment, Snapshot};
/// use lazybars::services::diff::diff;
///
/// let old = Snapshot::from_slots(10, [(1, SlotAssignment::spell("Fireball", "Rank 1"))]).unwrap();
/// let new = Snapshot::from_slots(20, [(1, SlotAssignment::spell("Fireball", "Rank 2"))]).unwrap();
///
/// let changes = diff(Some(&old), Some(&new));
/// assert_eq!(changes.rank_upgrades.len(), 1);
/// assert_eq!(changes.total_changes(), 1);
/// ```
#[must_use]
pub fn diff(a: Option<&Snapshot>, b: Option<&Snapshot>) -> LayoutDiff {
    const EMPTY: &SlotAssignment = &SlotAssignment::Empty;
    let mut result = LayoutDiff::default();

    for slot in 1..=SLOT_COUNT {
        let from = a.map_or(EMPTY, |snapshot| snapshot.get(slot));
        let to = b.map_or(EMPTY, |snapshot| snapshot.get(slot));
        if let Some(kind) = classify(from, to) {
            result.push(SlotChange {
                slot,
                kind,
                from: from.clone(),
                to: to.clone(),
            });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(slots: Vec<(u8, SlotAssignment)>) -> Snapshot {
        Snapshot::from_slots(10, slots).unwrap()
    }

    #[test]
    fn test_classify_rules() {
        let fb1 = SlotAssignment::spell("Fireball", "Rank 1");
        let fb2 = SlotAssignment::spell("Fireball", "Rank 2");
        let water = SlotAssignment::item(5350, "Conjured Water");

        assert_eq!(classify(&SlotAssignment::Empty, &SlotAssignment::Empty), None);
        assert_eq!(
            classify(&SlotAssignment::Empty, &fb1),
            Some(ChangeKind::NewAssignment)
        );
        assert_eq!(classify(&fb1, &SlotAssignment::Empty), Some(ChangeKind::Removed));
        assert_eq!(classify(&fb1, &fb2), Some(ChangeKind::RankUpgrade));
        assert_eq!(classify(&fb2, &fb1), Some(ChangeKind::RankDowngrade));
        assert_eq!(classify(&fb1, &water), Some(ChangeKind::Replaced));
        assert_eq!(classify(&fb1, &fb1), None);
    }

    #[test]
    fn test_rank_without_number_parses_as_zero() {
        let unranked = SlotAssignment::spell("Attack", "");
        let ranked = SlotAssignment::spell("Attack", "Rank 1");
        assert_eq!(classify(&unranked, &ranked), Some(ChangeKind::RankUpgrade));
        assert_eq!(classify(&ranked, &unranked), Some(ChangeKind::RankDowngrade));
    }

    #[test]
    fn test_icon_only_change_is_not_a_change() {
        let a = SlotAssignment::Item {
            id: 1,
            name: "Rock".to_string(),
            icon: 1,
        };
        let b = SlotAssignment::Item {
            id: 1,
            name: "Rock".to_string(),
            icon: 2,
        };
        assert_eq!(classify(&a, &b), None);
    }

    #[test]
    fn test_absent_snapshots_are_empty() {
        let b = snap(vec![(3, SlotAssignment::item(1, "Rock"))]);
        assert!(diff(None, None).is_empty());

        let added = diff(None, Some(&b));
        assert_eq!(added.new_assignments.len(), 1);

        let removed = diff(Some(&b), None);
        assert_eq!(removed.removed_assignments.len(), 1);
    }

    #[test]
    fn test_diff_categories_and_total() {
        let a = snap(vec![
            (1, SlotAssignment::spell("Fireball", "Rank 1")),
            (2, SlotAssignment::spell("Frostbolt", "Rank 3")),
            (3, SlotAssignment::item(1, "Rock")),
            (4, SlotAssignment::item(2, "Stone")),
        ]);
        let b = snap(vec![
            (1, SlotAssignment::spell("Fireball", "Rank 2")),
            (2, SlotAssignment::spell("Frostbolt", "Rank 2")),
            (4, SlotAssignment::spell("Blink", "")),
            (5, SlotAssignment::item(3, "Water")),
        ]);

        let changes = diff(Some(&a), Some(&b));
        assert_eq!(changes.rank_upgrades.len(), 1);
        assert_eq!(changes.rank_downgrades.len(), 1);
        assert_eq!(changes.removed_assignments.len(), 1);
        assert_eq!(changes.replaced_slots.len(), 1);
        assert_eq!(changes.new_assignments.len(), 1);
        assert_eq!(changes.total_changes(), 5);

        let replaced = &changes.replaced_slots[0];
        assert_eq!(replaced.slot, 4);
        assert_eq!(replaced.from_identity().unwrap().name, "Stone");
        assert_eq!(replaced.to_identity().unwrap().name, "Blink");

        let slots: Vec<u8> = changes.changes().iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let a = snap(vec![
            (1, SlotAssignment::item(1, "Rock")),
            (2, SlotAssignment::item(2, "Stone")),
        ]);
        let b = snap(vec![(2, SlotAssignment::item(9, "Gem"))]);

        let changes = diff(Some(&a), Some(&b));
        let once = changes.apply_to(&a);
        let twice = changes.apply_to(&once);
        assert!(once.same_slots(&b));
        assert!(once.same_slots(&twice));
        assert_eq!(twice.configured_slots(), 1);
    }

    #[test]
    fn test_without_removals_keeps_target_slots() {
        let target = snap(vec![(3, SlotAssignment::item(1, "ItemY"))]);
        let source = snap(vec![]);

        let changes = diff(Some(&target), Some(&source)).without_removals();
        assert!(changes.is_empty());
        assert!(changes.apply_to(&target).same_slots(&target));
    }

    #[test]
    fn test_summary_lines() {
        let a = snap(vec![]);
        let b = snap(vec![
            (1, SlotAssignment::spell("Fireball", "Rank 1")),
            (2, SlotAssignment::item(1, "Rock")),
        ]);
        let summary = diff(Some(&a), Some(&b)).summary();
        assert!(summary.iter().any(|line| line.starts_with("New spells (1)")));
        assert!(summary.iter().any(|line| line.starts_with("New other (1)")));
        assert_eq!(summary.last().unwrap(), "Total: 2 change(s)");

        assert_eq!(diff(Some(&a), Some(&a)).summary(), vec!["No changes"]);
    }
}
