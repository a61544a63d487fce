//! Slot assignment data structures.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Trailing integer of a rank label ("Rank 12" -> 12).
static RANK_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*$").expect("rank number pattern is valid"));

/// What is placed into a single slot.
///
/// Identity for diffing is the variant plus its name or id, see
/// [`SlotAssignment::identity`]. `rank` only matters for [`SlotAssignment::Spell`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotAssignment {
    /// Nothing assigned
    #[default]
    Empty,
    /// A ranked spell or ability
    Spell {
        /// Spell name (e.g., "Fireball")
        name: String,
        /// Rank label (e.g., "Rank 3"), may be empty for unranked spells
        rank: String,
        /// Icon texture id (0 when unknown)
        #[serde(default)]
        icon: u32,
    },
    /// An inventory item
    Item {
        /// Item id
        id: u32,
        /// Item name
        name: String,
        /// Icon texture id (0 when unknown)
        #[serde(default)]
        icon: u32,
    },
    /// A user macro
    Macro {
        /// Macro slot id
        id: u32,
        /// Macro name
        name: String,
        /// Macro text
        body: String,
        /// Icon texture id (0 when unknown)
        #[serde(default)]
        icon: u32,
    },
    /// A mount or pet
    Companion {
        /// Creature id
        id: u32,
        /// Companion kind (e.g., "MOUNT", "CRITTER")
        kind: String,
        /// Icon texture id (0 when unknown)
        #[serde(default)]
        icon: u32,
    },
    /// A saved equipment set
    EquipmentSet {
        /// Set name
        name: String,
        /// Icon texture id (0 when unknown)
        #[serde(default)]
        icon: u32,
    },
}

/// Variant tag of a [`SlotAssignment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// [`SlotAssignment::Empty`]
    Empty,
    /// [`SlotAssignment::Spell`]
    Spell,
    /// [`SlotAssignment::Item`]
    Item,
    /// [`SlotAssignment::Macro`]
    Macro,
    /// [`SlotAssignment::Companion`]
    Companion,
    /// [`SlotAssignment::EquipmentSet`]
    EquipmentSet,
}

impl SlotKind {
    /// Human-readable name for summaries.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Spell => "spell",
            Self::Item => "item",
            Self::Macro => "macro",
            Self::Companion => "companion",
            Self::EquipmentSet => "equipment set",
        }
    }
}

/// Identity of a non-empty assignment: (kind, name, id).
///
/// Two assignments with equal identity occupy the slot with "the same thing";
/// icons, macro bodies and spell ranks are not part of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotIdentity {
    /// Variant tag
    pub kind: SlotKind,
    /// Name (spell, macro, equipment set) or companion kind
    pub name: String,
    /// Numeric id where the variant has one
    pub id: Option<u32>,
}

impl fmt::Display for SlotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.id) {
            (SlotKind::Item, Some(id)) if self.name.is_empty() => write!(f, "item #{id}"),
            (SlotKind::Companion, Some(id)) => write!(f, "{} #{id}", self.name.to_lowercase()),
            _ => write!(f, "{} '{}'", self.kind.display_name(), self.name),
        }
    }
}

impl SlotAssignment {
    /// Creates a spell assignment without icon.
    pub fn spell(name: impl Into<String>, rank: impl Into<String>) -> Self {
        Self::Spell {
            name: name.into(),
            rank: rank.into(),
            icon: 0,
        }
    }

    /// Creates an item assignment without icon.
    pub fn item(id: u32, name: impl Into<String>) -> Self {
        Self::Item {
            id,
            name: name.into(),
            icon: 0,
        }
    }

    /// Returns true for [`SlotAssignment::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns true for [`SlotAssignment::Spell`].
    #[must_use]
    pub const fn is_spell(&self) -> bool {
        matches!(self, Self::Spell { .. })
    }

    /// Returns the variant tag.
    #[must_use]
    pub const fn kind(&self) -> SlotKind {
        match self {
            Self::Empty => SlotKind::Empty,
            Self::Spell { .. } => SlotKind::Spell,
            Self::Item { .. } => SlotKind::Item,
            Self::Macro { .. } => SlotKind::Macro,
            Self::Companion { .. } => SlotKind::Companion,
            Self::EquipmentSet { .. } => SlotKind::EquipmentSet,
        }
    }

    /// Returns the identity used for diffing, `None` for empty slots.
    #[must_use]
    pub fn identity(&self) -> Option<SlotIdentity> {
        let (name, id) = match self {
            Self::Empty => return None,
            Self::Spell { name, .. } | Self::EquipmentSet { name, .. } => (name.clone(), None),
            Self::Item { id, name, .. } | Self::Macro { id, name, .. } => {
                (name.clone(), Some(*id))
            }
            Self::Companion { id, kind, .. } => (kind.clone(), Some(*id)),
        };
        Some(SlotIdentity {
            kind: self.kind(),
            name,
            id,
        })
    }

    /// Returns the rank label for spells.
    #[must_use]
    pub fn rank(&self) -> Option<&str> {
        match self {
            Self::Spell { rank, .. } => Some(rank),
            _ => None,
        }
    }

    /// Returns the icon texture id (0 for empty slots).
    #[must_use]
    pub const fn icon(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Spell { icon, .. }
            | Self::Item { icon, .. }
            | Self::Macro { icon, .. }
            | Self::Companion { icon, .. }
            | Self::EquipmentSet { icon, .. } => *icon,
        }
    }

    /// Short label for status lines and listings.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Empty => "-".to_string(),
            Self::Spell { name, rank, .. } if rank.is_empty() => name.clone(),
            Self::Spell { name, rank, .. } => format!("{name} ({rank})"),
            Self::Item { id, name, .. } if name.is_empty() => format!("item #{id}"),
            Self::Item { name, .. } | Self::Macro { name, .. } => name.clone(),
            Self::Companion { id, kind, .. } => format!("{} #{id}", kind.to_lowercase()),
            Self::EquipmentSet { name, .. } => format!("[{name}]"),
        }
    }
}

/// Parses the trailing integer of a rank label.
///
/// Labels without a trailing number parse as 0.
///
/// # Examples
///
/// ```
/// use lazybars::models::slot::rank_number;
///
/// assert_eq!(rank_number("Rank 3"), 3);
/// assert_eq!(rank_number("Rank 12 "), 12);
/// assert_eq!(rank_number(""), 0);
/// assert_eq!(rank_number("Summon"), 0);
/// ```
#[must_use]
pub fn rank_number(label: &str) -> u32 {
    RANK_NUMBER
        .captures(label)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_rank_and_icon() {
        let a = SlotAssignment::Spell {
            name: "Fireball".to_string(),
            rank: "Rank 1".to_string(),
            icon: 10,
        };
        let b = SlotAssignment::Spell {
            name: "Fireball".to_string(),
            rank: "Rank 4".to_string(),
            icon: 99,
        };
        assert_eq!(a.identity(), b.identity());
        assert_eq!(SlotAssignment::Empty.identity(), None);
    }

    #[test]
    fn test_identity_distinguishes_kinds() {
        let spell = SlotAssignment::spell("Hearthstone", "");
        let item = SlotAssignment::item(6948, "Hearthstone");
        assert_ne!(spell.identity(), item.identity());
    }

    #[test]
    fn test_macro_identity_ignores_body() {
        let a = SlotAssignment::Macro {
            id: 3,
            name: "Pull".to_string(),
            body: "/cast Frostbolt".to_string(),
            icon: 0,
        };
        let b = SlotAssignment::Macro {
            id: 3,
            name: "Pull".to_string(),
            body: "/cast Fireball".to_string(),
            icon: 0,
        };
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn test_rank_number() {
        assert_eq!(rank_number("Rank 1"), 1);
        assert_eq!(rank_number("Rank 10"), 10);
        assert_eq!(rank_number("Rank"), 0);
        assert_eq!(rank_number("7"), 7);
    }

    #[test]
    fn test_label() {
        assert_eq!(SlotAssignment::Empty.label(), "-");
        assert_eq!(
            SlotAssignment::spell("Fireball", "Rank 2").label(),
            "Fireball (Rank 2)"
        );
        assert_eq!(SlotAssignment::spell("Attack", "").label(), "Attack");
        assert_eq!(SlotAssignment::item(42, "").label(), "item #42");
    }
}
