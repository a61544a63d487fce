//! Rank availability cache.
//!
//! Records, per class, the lowest level at which each (spell, rank) pair has
//! been observed. Observations only ever lower the recorded level.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How an observation was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Seen in the spellbook
    #[default]
    Spellbook,
    /// Offered by a trainer
    Trainer,
    /// Seen placed on a live slot
    ActionSlot,
    /// Came in through an import
    Import,
}

/// Lowest-level record for one (spell, rank) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankEntry {
    /// Lowest level the rank was observed at
    pub lowest_level: u8,
    /// Spell school or tab the rank belongs to
    #[serde(default)]
    pub group_tag: String,
    /// Icon texture id
    #[serde(default)]
    pub icon: u32,
    /// Where the lowest observation came from
    #[serde(default)]
    pub source_kind: SourceKind,
}

/// Known ranks for one class: spell name -> rank label -> entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassRanks {
    spells: BTreeMap<String, BTreeMap<String, RankEntry>>,
}

impl ClassRanks {
    /// Returns every known rank of a spell, `None` if the spell was never seen.
    #[must_use]
    pub fn ranks(&self, name: &str) -> Option<&BTreeMap<String, RankEntry>> {
        self.spells.get(name).filter(|ranks| !ranks.is_empty())
    }

    /// Number of spells with at least one known rank.
    #[must_use]
    pub fn len(&self) -> usize {
        self.spells.len()
    }

    /// True when nothing has been observed for this class.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

/// A single observation fed in by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankObservation {
    /// Spell name
    pub name: String,
    /// Rank label
    pub rank: String,
    /// Level the rank was seen at
    pub level: u8,
    /// Spell school or tab
    pub group_tag: String,
    /// Icon texture id
    pub icon: u32,
    /// Where it was seen
    pub source_kind: SourceKind,
}

impl RankObservation {
    /// Creates an observation with empty group tag and no icon.
    pub fn new(name: impl Into<String>, rank: impl Into<String>, level: u8) -> Self {
        Self {
            name: name.into(),
            rank: rank.into(),
            level,
            group_tag: String::new(),
            icon: 0,
            source_kind: SourceKind::default(),
        }
    }

    /// Sets the icon.
    #[must_use]
    pub const fn with_icon(mut self, icon: u32) -> Self {
        self.icon = icon;
        self
    }

    /// Sets the source kind.
    #[must_use]
    pub const fn with_source(mut self, source_kind: SourceKind) -> Self {
        self.source_kind = source_kind;
        self
    }

    /// Sets the group tag.
    pub fn with_group(mut self, group_tag: impl Into<String>) -> Self {
        self.group_tag = group_tag.into();
        self
    }
}

/// Account-wide rank availability cache, partitioned by class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankAvailabilityCache {
    classes: BTreeMap<String, ClassRanks>,
}

impl RankAvailabilityCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an observation for a class.
    ///
    /// Returns true if the cache changed (new rank, or a lower level for a known one).
    pub fn observe(&mut self, class: &str, observation: RankObservation) -> bool {
        let ranks = self
            .classes
            .entry(class.to_string())
            .or_default()
            .spells
            .entry(observation.name)
            .or_default();

        match ranks.get_mut(&observation.rank) {
            Some(entry) if entry.lowest_level <= observation.level => {
                // Fill in an icon learned later without touching the level
                if entry.icon == 0 && observation.icon != 0 {
                    entry.icon = observation.icon;
                    return true;
                }
                false
            }
            Some(entry) => {
                entry.lowest_level = observation.level;
                entry.source_kind = observation.source_kind;
                if observation.icon != 0 {
                    entry.icon = observation.icon;
                }
                if !observation.group_tag.is_empty() {
                    entry.group_tag = observation.group_tag;
                }
                true
            }
            None => {
                ranks.insert(
                    observation.rank,
                    RankEntry {
                        lowest_level: observation.level,
                        group_tag: observation.group_tag,
                        icon: observation.icon,
                        source_kind: observation.source_kind,
                    },
                );
                true
            }
        }
    }

    /// Returns the ranks known for a class.
    #[must_use]
    pub fn class(&self, class: &str) -> Option<&ClassRanks> {
        self.classes.get(class)
    }

    /// Returns the entry for one (class, spell, rank).
    #[must_use]
    pub fn entry(&self, class: &str, name: &str, rank: &str) -> Option<&RankEntry> {
        self.class(class)?.ranks(name)?.get(rank)
    }

    /// Names of all classes with observations.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}
