//! Snapshot and layout key data structures.

use crate::constants::{MAX_LEVEL, SLOT_COUNT, SPEC_COUNT};
use crate::error::{LayoutError, LayoutResult};
use crate::models::slot::SlotAssignment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Address of one stored snapshot: (spec, level).
///
/// # Validation
///
/// - spec must be in 1..=5
/// - level must be in 1..=80
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LayoutKey {
    /// Spec index (1-based)
    pub spec: u8,
    /// Progression level
    pub level: u8,
}

impl LayoutKey {
    /// Creates a validated key.
    pub fn new(spec: u8, level: u8) -> LayoutResult<Self> {
        validate_spec(spec)?;
        validate_level(level)?;
        Ok(Self { spec, level })
    }
}

/// Checks that a spec index is within 1..=5.
pub fn validate_spec(spec: u8) -> LayoutResult<()> {
    if spec == 0 || spec > SPEC_COUNT {
        return Err(LayoutError::invalid_target(format!(
            "spec {spec} is outside 1..={SPEC_COUNT}"
        )));
    }
    Ok(())
}

/// Checks that a level is within 1..=80.
pub fn validate_level(level: u8) -> LayoutResult<()> {
    if level == 0 || level > MAX_LEVEL {
        return Err(LayoutError::invalid_target(format!(
            "level {level} is outside 1..={MAX_LEVEL}"
        )));
    }
    Ok(())
}

/// Checks that a slot index is within 1..=120.
pub fn validate_slot(slot: u8) -> LayoutResult<()> {
    if slot == 0 || slot > SLOT_COUNT {
        return Err(LayoutError::invalid_target(format!(
            "slot {slot} is outside 1..={SLOT_COUNT}"
        )));
    }
    Ok(())
}

/// Full 120-slot assignment for one level of one spec.
///
/// Only non-empty slots are held; every other index in 1..=120 reads as
/// [`SlotAssignment::Empty`]. Writing `Empty` removes the entry, so
/// [`Snapshot::configured_slots`] is always the number of held entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Level this snapshot describes
    pub level: u8,
    /// Creation timestamp
    pub created: DateTime<Utc>,
    /// True for snapshots synthesized by keyframe derivation
    #[serde(default)]
    pub is_derived: bool,
    /// Keyframe level a derived snapshot was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_level: Option<u8>,
    /// Non-empty slots keyed by 1-based index
    slots: BTreeMap<u8, SlotAssignment>,
    /// Spells blanked by derivation because no rank is available yet (slot -> name)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub unavailable: BTreeMap<u8, String>,
}

impl Snapshot {
    /// Creates an empty snapshot for a level.
    pub fn new(level: u8) -> Self {
        Self::with_created(level, Utc::now())
    }

    /// Creates an empty snapshot with an explicit creation time.
    pub fn with_created(level: u8, created: DateTime<Utc>) -> Self {
        Self {
            level,
            created,
            is_derived: false,
            source_level: None,
            slots: BTreeMap::new(),
            unavailable: BTreeMap::new(),
        }
    }

    /// Builds a snapshot from (slot, assignment) pairs, validating slot indices.
    pub fn from_slots<I>(level: u8, slots: I) -> LayoutResult<Self>
    where
        I: IntoIterator<Item = (u8, SlotAssignment)>,
    {
        let mut snapshot = Self::new(level);
        for (slot, assignment) in slots {
            snapshot.set(slot, assignment)?;
        }
        Ok(snapshot)
    }

    /// Returns the assignment at a slot, `Empty` if nothing is held there.
    #[must_use]
    pub fn get(&self, slot: u8) -> &SlotAssignment {
        const EMPTY: &SlotAssignment = &SlotAssignment::Empty;
        self.slots.get(&slot).unwrap_or(EMPTY)
    }

    /// Writes an assignment into a slot. Writing `Empty` clears it.
    pub fn set(&mut self, slot: u8, assignment: SlotAssignment) -> LayoutResult<()> {
        validate_slot(slot)?;
        self.unavailable.remove(&slot);
        if assignment.is_empty() {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, assignment);
        }
        Ok(())
    }

    /// Clears a slot, returning what was there.
    pub fn clear(&mut self, slot: u8) -> SlotAssignment {
        self.unavailable.remove(&slot);
        self.slots.remove(&slot).unwrap_or_default()
    }

    /// Checks a snapshot that did not come through [`Snapshot::set`], such as
    /// one read from a state file.
    ///
    /// The level, source level and every held or unavailable slot index must
    /// be in range, and no held entry may be `Empty`.
    pub fn validate(&self) -> LayoutResult<()> {
        validate_level(self.level)?;
        if let Some(source) = self.source_level {
            validate_level(source)?;
        }
        for (slot, assignment) in &self.slots {
            validate_slot(*slot)?;
            if assignment.is_empty() {
                return Err(LayoutError::Validation(format!(
                    "level {} holds an empty entry for slot {slot}",
                    self.level
                )));
            }
        }
        for slot in self.unavailable.keys() {
            validate_slot(*slot)?;
        }
        Ok(())
    }

    /// Number of non-empty slots.
    #[must_use]
    pub fn configured_slots(&self) -> usize {
        self.slots.len()
    }

    /// Iterates non-empty slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &SlotAssignment)> {
        self.slots.iter().map(|(slot, assignment)| (*slot, assignment))
    }

    /// True when no slot is assigned.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.slots.is_empty()
    }

    /// True when both snapshots hold the same assignments, ignoring metadata.
    #[must_use]
    pub fn same_slots(&self, other: &Self) -> bool {
        self.slots == other.slots
    }

    /// Returns a stored (non-derived) copy relabelled for `level`.
    #[must_use]
    pub fn saved_at(&self, level: u8) -> Self {
        let mut copy = self.clone();
        copy.level = level;
        copy.is_derived = false;
        copy.source_level = None;
        copy.unavailable.clear();
        copy.created = Utc::now();
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_key_bounds() {
        assert!(LayoutKey::new(1, 1).is_ok());
        assert!(LayoutKey::new(5, 80).is_ok());
        assert!(matches!(
            LayoutKey::new(0, 10),
            Err(LayoutError::InvalidTarget(_))
        ));
        assert!(matches!(
            LayoutKey::new(6, 10),
            Err(LayoutError::InvalidTarget(_))
        ));
        assert!(matches!(
            LayoutKey::new(1, 81),
            Err(LayoutError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_unset_slots_read_empty() {
        let snapshot = Snapshot::new(10);
        assert!(snapshot.get(1).is_empty());
        assert!(snapshot.get(120).is_empty());
        assert_eq!(snapshot.configured_slots(), 0);
    }

    #[test]
    fn test_configured_slots_tracks_writes() {
        let mut snapshot = Snapshot::new(10);
        snapshot.set(1, SlotAssignment::spell("Fireball", "Rank 1")).unwrap();
        snapshot.set(2, SlotAssignment::item(1, "Water")).unwrap();
        assert_eq!(snapshot.configured_slots(), 2);

        // Overwrite does not double count
        snapshot.set(2, SlotAssignment::item(2, "Bread")).unwrap();
        assert_eq!(snapshot.configured_slots(), 2);

        snapshot.set(1, SlotAssignment::Empty).unwrap();
        assert_eq!(snapshot.configured_slots(), 1);
    }

    #[test]
    fn test_set_rejects_out_of_range_slot() {
        let mut snapshot = Snapshot::new(10);
        assert!(snapshot.set(0, SlotAssignment::item(1, "x")).is_err());
        assert!(snapshot.set(121, SlotAssignment::item(1, "x")).is_err());
    }

    #[test]
    fn test_clear_drops_unavailable_note() {
        let mut snapshot = Snapshot::new(10);
        snapshot.set(4, SlotAssignment::item(1, "Water")).unwrap();
        snapshot.unavailable.insert(4, "Blizzard".to_string());
        snapshot.unavailable.insert(9, "Cone of Cold".to_string());

        assert_eq!(snapshot.clear(4), SlotAssignment::item(1, "Water"));
        assert!(!snapshot.unavailable.contains_key(&4));

        // Clearing an unheld slot still drops its note
        assert!(snapshot.clear(9).is_empty());
        assert!(snapshot.unavailable.is_empty());
    }

    #[test]
    fn test_validate_rejects_out_of_range_file_content() {
        let parse = |json: &str| serde_json::from_str::<Snapshot>(json).unwrap();

        let valid = parse(
            r#"{"level":10,"created":"2024-01-01T00:00:00Z","slots":{"3":{"type":"item","id":1,"name":"Water"}}}"#,
        );
        assert!(valid.validate().is_ok());

        let bad_level = parse(r#"{"level":200,"created":"2024-01-01T00:00:00Z","slots":{}}"#);
        assert!(matches!(
            bad_level.validate(),
            Err(LayoutError::InvalidTarget(_))
        ));

        let bad_slot = parse(
            r#"{"level":10,"created":"2024-01-01T00:00:00Z","slots":{"250":{"type":"item","id":1,"name":"Water"}}}"#,
        );
        assert!(matches!(
            bad_slot.validate(),
            Err(LayoutError::InvalidTarget(_))
        ));

        let explicit_empty =
            parse(r#"{"level":10,"created":"2024-01-01T00:00:00Z","slots":{"1":{"type":"empty"}}}"#);
        assert!(matches!(
            explicit_empty.validate(),
            Err(LayoutError::Validation(_))
        ));
    }

    #[test]
    fn test_saved_at_strips_derived_flag() {
        let mut snapshot = Snapshot::new(10);
        snapshot.is_derived = true;
        snapshot.source_level = Some(10);
        let saved = snapshot.saved_at(15);
        assert_eq!(saved.level, 15);
        assert!(!saved.is_derived);
        assert_eq!(saved.source_level, None);
    }
}
