//! Sparse (spec, level) -> snapshot store with keyframes and templates.
//!
//! The store is the only place snapshots live. Writes never happen implicitly:
//! every key is created by an explicit put and destroyed by an explicit
//! remove or clear.

use crate::constants::{SLOT_COUNT, SPEC_COUNT};
use crate::error::{LayoutError, LayoutResult};
use crate::models::snapshot::{validate_level, validate_slot, validate_spec};
use crate::models::{LayoutKey, Snapshot, Template};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything persisted for one spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecLayouts {
    /// Per-slot enable flags (index 0 is slot 1)
    #[serde(default = "default_enabled_slots")]
    pub enabled_slots: Vec<bool>,
    /// Stored snapshots by level
    #[serde(default)]
    pub snapshots: BTreeMap<u8, Snapshot>,
    /// Levels marked canonical
    #[serde(default)]
    pub keyframes: BTreeSet<u8>,
    /// Named templates
    #[serde(default)]
    pub templates: BTreeMap<String, Template>,
}

fn default_enabled_slots() -> Vec<bool> {
    vec![true; usize::from(SLOT_COUNT)]
}

impl Default for SpecLayouts {
    fn default() -> Self {
        Self {
            enabled_slots: default_enabled_slots(),
            snapshots: BTreeMap::new(),
            keyframes: BTreeSet::new(),
            templates: BTreeMap::new(),
        }
    }
}

/// Layout store for all specs plus the non-persistent session overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutStore {
    specs: BTreeMap<u8, SpecLayouts>,
    /// Derived resolutions computed this session, dropped on any write to the spec
    #[serde(skip)]
    session: BTreeMap<LayoutKey, Snapshot>,
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutStore {
    /// Creates a store with an empty section for every spec.
    #[must_use]
    pub fn new() -> Self {
        let specs = (1..=SPEC_COUNT)
            .map(|spec| (spec, SpecLayouts::default()))
            .collect();
        Self {
            specs,
            session: BTreeMap::new(),
        }
    }

    /// Checks a store read from disk.
    ///
    /// Spec indices, snapshot levels, keyframes and slot indices must be in
    /// range, every snapshot must be filed under its own level, every template
    /// under its own name, and each enable mask must cover all 120 slots.
    pub fn validate(&self) -> LayoutResult<()> {
        for (spec, section) in &self.specs {
            validate_spec(*spec)?;
            if section.enabled_slots.len() != usize::from(SLOT_COUNT) {
                return Err(LayoutError::Validation(format!(
                    "spec {spec}: enabled slot mask has {} entries, expected {SLOT_COUNT}",
                    section.enabled_slots.len()
                )));
            }
            for (level, snapshot) in &section.snapshots {
                validate_level(*level)?;
                if snapshot.level != *level {
                    return Err(LayoutError::Validation(format!(
                        "spec {spec}: snapshot for level {} is filed under level {level}",
                        snapshot.level
                    )));
                }
                snapshot.validate()?;
            }
            for level in &section.keyframes {
                validate_level(*level)?;
            }
            for (name, template) in &section.templates {
                if template.name != *name {
                    return Err(LayoutError::Validation(format!(
                        "spec {spec}: template '{}' is filed under '{name}'",
                        template.name
                    )));
                }
                template.validate()?;
            }
        }
        Ok(())
    }

    /// Returns the section for a spec.
    pub fn spec(&self, spec: u8) -> LayoutResult<&SpecLayouts> {
        validate_spec(spec)?;
        self.specs
            .get(&spec)
            .ok_or_else(|| LayoutError::invalid_target(format!("spec {spec} is not initialized")))
    }

    fn spec_mut(&mut self, spec: u8) -> LayoutResult<&mut SpecLayouts> {
        validate_spec(spec)?;
        self.invalidate_session(spec);
        Ok(self.specs.entry(spec).or_default())
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Returns the stored snapshot at a key.
    #[must_use]
    pub fn get(&self, key: LayoutKey) -> Option<&Snapshot> {
        self.specs.get(&key.spec)?.snapshots.get(&key.level)
    }

    /// Returns the stored snapshot or [`LayoutError::NotFound`].
    pub fn require(&self, key: LayoutKey) -> LayoutResult<&Snapshot> {
        self.get(key).ok_or(LayoutError::NotFound {
            spec: key.spec,
            level: key.level,
        })
    }

    /// True if a snapshot is stored at the key.
    #[must_use]
    pub fn contains(&self, key: LayoutKey) -> bool {
        self.get(key).is_some()
    }

    /// Stores a snapshot, returning the one it replaced.
    ///
    /// The stored copy always carries the key's level and is never marked derived.
    pub fn put(&mut self, key: LayoutKey, snapshot: Snapshot) -> LayoutResult<Option<Snapshot>> {
        validate_level(key.level)?;
        let mut snapshot = snapshot;
        if snapshot.is_derived || snapshot.level != key.level {
            snapshot = snapshot.saved_at(key.level);
        }
        let section = self.spec_mut(key.spec)?;
        Ok(section.snapshots.insert(key.level, snapshot))
    }

    /// Removes the snapshot at a key.
    pub fn remove(&mut self, key: LayoutKey) -> LayoutResult<Option<Snapshot>> {
        let section = self.spec_mut(key.spec)?;
        Ok(section.snapshots.remove(&key.level))
    }

    /// Removes every snapshot and keyframe for a spec, returning the removed snapshots.
    pub fn clear_spec(&mut self, spec: u8) -> LayoutResult<BTreeMap<u8, Snapshot>> {
        let section = self.spec_mut(spec)?;
        section.keyframes.clear();
        Ok(std::mem::take(&mut section.snapshots))
    }

    /// Levels with a stored snapshot, ascending.
    pub fn levels(&self, spec: u8) -> LayoutResult<Vec<u8>> {
        Ok(self.spec(spec)?.snapshots.keys().copied().collect())
    }

    // ------------------------------------------------------------------
    // Keyframes
    // ------------------------------------------------------------------

    /// True if the level is marked as a keyframe.
    #[must_use]
    pub fn is_keyframe(&self, key: LayoutKey) -> bool {
        self.specs
            .get(&key.spec)
            .is_some_and(|section| section.keyframes.contains(&key.level))
    }

    /// Marks or unmarks a keyframe. Returns true if the flag changed.
    pub fn set_keyframe(&mut self, key: LayoutKey, keyframe: bool) -> LayoutResult<bool> {
        validate_level(key.level)?;
        let section = self.spec_mut(key.spec)?;
        Ok(if keyframe {
            section.keyframes.insert(key.level)
        } else {
            section.keyframes.remove(&key.level)
        })
    }

    /// Replaces the whole keyframe set of a spec.
    pub fn replace_keyframes(&mut self, spec: u8, levels: BTreeSet<u8>) -> LayoutResult<()> {
        for level in &levels {
            validate_level(*level)?;
        }
        self.spec_mut(spec)?.keyframes = levels;
        Ok(())
    }

    /// Keyframe levels of a spec, ascending.
    pub fn keyframes(&self, spec: u8) -> LayoutResult<Vec<u8>> {
        Ok(self.spec(spec)?.keyframes.iter().copied().collect())
    }

    /// Nearest keyframe strictly above `level`.
    #[must_use]
    pub fn keyframe_above(&self, spec: u8, level: u8) -> Option<u8> {
        let section = self.specs.get(&spec)?;
        section
            .keyframes
            .range(level.saturating_add(1)..)
            .next()
            .copied()
    }

    /// Nearest keyframe strictly below `level`.
    #[must_use]
    pub fn keyframe_below(&self, spec: u8, level: u8) -> Option<u8> {
        let section = self.specs.get(&spec)?;
        section.keyframes.range(..level).next_back().copied()
    }

    /// Greatest keyframe `<= level` that has a stored snapshot.
    #[must_use]
    pub fn keyframe_at_or_below(&self, spec: u8, level: u8) -> Option<(u8, &Snapshot)> {
        let section = self.specs.get(&spec)?;
        section
            .keyframes
            .range(..=level)
            .rev()
            .find_map(|k| section.snapshots.get(k).map(|snapshot| (*k, snapshot)))
    }

    // ------------------------------------------------------------------
    // Enabled slots
    // ------------------------------------------------------------------

    /// True if the slot is enabled for the spec.
    #[must_use]
    pub fn is_slot_enabled(&self, spec: u8, slot: u8) -> bool {
        self.specs
            .get(&spec)
            .and_then(|section| section.enabled_slots.get(usize::from(slot).wrapping_sub(1)))
            .copied()
            .unwrap_or(true)
    }

    /// Enables or disables one slot.
    pub fn set_slot_enabled(&mut self, spec: u8, slot: u8, enabled: bool) -> LayoutResult<()> {
        validate_slot(slot)?;
        let section = self.spec_mut(spec)?;
        section.enabled_slots.resize(usize::from(SLOT_COUNT), true);
        section.enabled_slots[usize::from(slot) - 1] = enabled;
        Ok(())
    }

    /// Replaces the whole enable mask of a spec.
    pub fn replace_enabled_slots(&mut self, spec: u8, mask: Vec<bool>) -> LayoutResult<()> {
        if mask.len() != usize::from(SLOT_COUNT) {
            return Err(LayoutError::invalid_target(format!(
                "enabled slot mask has {} entries, expected {SLOT_COUNT}",
                mask.len()
            )));
        }
        self.spec_mut(spec)?.enabled_slots = mask;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Returns a template by name.
    #[must_use]
    pub fn template(&self, spec: u8, name: &str) -> Option<&Template> {
        self.specs.get(&spec)?.templates.get(name)
    }

    /// Stores a template, returning the one it replaced.
    pub fn put_template(&mut self, spec: u8, template: Template) -> LayoutResult<Option<Template>> {
        // Templates do not affect resolution, so the overlay stays valid
        validate_spec(spec)?;
        let section = self.specs.entry(spec).or_default();
        Ok(section.templates.insert(template.name.clone(), template))
    }

    /// Removes a template.
    pub fn remove_template(&mut self, spec: u8, name: &str) -> LayoutResult<Template> {
        validate_spec(spec)?;
        self.specs
            .get_mut(&spec)
            .and_then(|section| section.templates.remove(name))
            .ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))
    }

    /// Templates of a spec, ordered by name.
    pub fn templates(&self, spec: u8) -> LayoutResult<Vec<&Template>> {
        Ok(self.spec(spec)?.templates.values().collect())
    }

    // ------------------------------------------------------------------
    // Session overlay
    // ------------------------------------------------------------------

    /// Returns a memoized resolution.
    #[must_use]
    pub fn session_get(&self, key: LayoutKey) -> Option<&Snapshot> {
        self.session.get(&key)
    }

    /// Memoizes a resolution for the rest of the session.
    pub fn session_put(&mut self, key: LayoutKey, snapshot: Snapshot) {
        self.session.insert(key, snapshot);
    }

    /// Drops memoized resolutions of one spec.
    pub fn invalidate_session(&mut self, spec: u8) {
        self.session.retain(|key, _| key.spec != spec);
    }

    /// Drops every memoized resolution.
    pub fn clear_session(&mut self) {
        self.session.clear();
    }

    /// Number of memoized resolutions.
    #[must_use]
    pub fn session_len(&self) -> usize {
        self.session.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotAssignment;

    fn key(spec: u8, level: u8) -> LayoutKey {
        LayoutKey::new(spec, level).unwrap()
    }

    #[test]
    fn test_put_get_remove() {
        let mut store = LayoutStore::new();
        let snapshot = Snapshot::from_slots(10, [(1, SlotAssignment::item(1, "Water"))]).unwrap();

        assert_eq!(store.put(key(1, 10), snapshot).unwrap(), None);
        assert!(store.contains(key(1, 10)));
        assert!(!store.contains(key(2, 10)));
        assert_eq!(store.levels(1).unwrap(), vec![10]);

        let removed = store.remove(key(1, 10)).unwrap();
        assert!(removed.is_some());
        assert!(matches!(
            store.require(key(1, 10)),
            Err(LayoutError::NotFound { spec: 1, level: 10 })
        ));
    }

    #[test]
    fn test_put_relabels_and_strips_derived() {
        let mut store = LayoutStore::new();
        let mut snapshot = Snapshot::new(10);
        snapshot.is_derived = true;
        snapshot.source_level = Some(10);

        store.put(key(1, 14), snapshot).unwrap();
        let stored = store.get(key(1, 14)).unwrap();
        assert_eq!(stored.level, 14);
        assert!(!stored.is_derived);
    }

    #[test]
    fn test_keyframe_neighbors() {
        let mut store = LayoutStore::new();
        for level in [10, 20, 30] {
            store.set_keyframe(key(1, level), true).unwrap();
        }

        assert_eq!(store.keyframe_above(1, 10), Some(20));
        assert_eq!(store.keyframe_above(1, 15), Some(20));
        assert_eq!(store.keyframe_above(1, 30), None);
        assert_eq!(store.keyframe_below(1, 20), Some(10));
        assert_eq!(store.keyframe_below(1, 10), None);
    }

    #[test]
    fn test_keyframe_at_or_below_needs_snapshot() {
        let mut store = LayoutStore::new();
        store.set_keyframe(key(1, 10), true).unwrap();
        store.set_keyframe(key(1, 20), true).unwrap();
        store.put(key(1, 10), Snapshot::new(10)).unwrap();

        // Keyframe 20 has no snapshot, so 10 is the nearest usable one
        assert_eq!(store.keyframe_at_or_below(1, 25).map(|(k, _)| k), Some(10));
        assert_eq!(store.keyframe_at_or_below(1, 9).map(|(k, _)| k), None);
    }

    #[test]
    fn test_clear_spec_only_touches_one_spec() {
        let mut store = LayoutStore::new();
        store.put(key(1, 10), Snapshot::new(10)).unwrap();
        store.put(key(2, 10), Snapshot::new(10)).unwrap();
        store.set_keyframe(key(1, 10), true).unwrap();

        let removed = store.clear_spec(1).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(store.keyframes(1).unwrap().is_empty());
        assert!(store.contains(key(2, 10)));
    }

    #[test]
    fn test_enabled_slots() {
        let mut store = LayoutStore::new();
        assert!(store.is_slot_enabled(1, 5));
        store.set_slot_enabled(1, 5, false).unwrap();
        assert!(!store.is_slot_enabled(1, 5));
        assert!(store.is_slot_enabled(2, 5));
        assert!(store.set_slot_enabled(1, 121, false).is_err());
        assert!(store.replace_enabled_slots(1, vec![true; 3]).is_err());
    }

    #[test]
    fn test_writes_invalidate_session_overlay() {
        let mut store = LayoutStore::new();
        store.session_put(key(1, 15), Snapshot::new(15));
        store.session_put(key(2, 15), Snapshot::new(15));

        store.put(key(1, 10), Snapshot::new(10)).unwrap();
        assert!(store.session_get(key(1, 15)).is_none());
        assert!(store.session_get(key(2, 15)).is_some());
    }

    #[test]
    fn test_templates() {
        let mut store = LayoutStore::new();
        let template = Template::new("Dungeon", "", &Snapshot::new(1), None).unwrap();
        store.put_template(1, template).unwrap();

        assert!(store.template(1, "Dungeon").is_some());
        assert_eq!(store.templates(1).unwrap().len(), 1);
        assert!(store.remove_template(1, "Dungeon").is_ok());
        assert!(matches!(
            store.remove_template(1, "Dungeon"),
            Err(LayoutError::UnknownTemplate(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_content() {
        let mut store = LayoutStore::new();
        store.put(key(1, 10), Snapshot::new(10)).unwrap();
        store.set_keyframe(key(1, 10), true).unwrap();
        assert!(store.validate().is_ok());

        let mut bad_keyframe = store.clone();
        bad_keyframe.specs.get_mut(&1).unwrap().keyframes.insert(90);
        assert!(matches!(
            bad_keyframe.validate(),
            Err(LayoutError::InvalidTarget(_))
        ));

        let mut short_mask = store.clone();
        short_mask.specs.get_mut(&2).unwrap().enabled_slots.truncate(7);
        assert!(matches!(
            short_mask.validate(),
            Err(LayoutError::Validation(_))
        ));

        let mut misfiled = store.clone();
        misfiled
            .specs
            .get_mut(&1)
            .unwrap()
            .snapshots
            .insert(30, Snapshot::new(31));
        assert!(matches!(misfiled.validate(), Err(LayoutError::Validation(_))));

        let mut bad_spec = store;
        bad_spec.specs.insert(9, SpecLayouts::default());
        assert!(matches!(
            bad_spec.validate(),
            Err(LayoutError::InvalidTarget(_))
        ));
    }
}
