//! Typed export payloads and their strip/restore value tree mapping.
//!
//! Strip keeps only non-empty slots and uses short field keys per variant:
//!
//! | variant        | `t`   | fields              |
//! |----------------|-------|---------------------|
//! | spell          | `"s"` | `n`, `r`, `i`       |
//! | item           | `"i"` | `id`, `n`, `i`      |
//! | macro          | `"m"` | `id`, `n`, `b`, `i` |
//! | companion      | `"c"` | `id`, `k`, `i`      |
//! | equipment set  | `"e"` | `n`, `i`            |
//!
//! `i` (icon) is omitted when 0. Restore validates every field and bound, so a
//! decoded [`ExportPayload`] is always safe to apply.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::constants::SLOT_COUNT;
use crate::error::{LayoutError, LayoutResult};
use crate::models::snapshot::{validate_level, validate_slot};
use crate::models::template::validate_template_name;
use crate::models::{SlotAssignment, Snapshot, Template};

use super::value::{Key, Table, Value};

/// Export payload kind, the `type` field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// One level
    Layout,
    /// Every keyframe of a spec
    Keyframes,
    /// Every stored level, keyframe flag and the slot mask of a spec
    Full,
    /// One named template
    Template,
}

impl PayloadKind {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Keyframes => "keyframes",
            Self::Full => "full",
            Self::Template => "template",
        }
    }

    fn parse(s: &str) -> LayoutResult<Self> {
        match s {
            "layout" => Ok(Self::Layout),
            "keyframes" => Ok(Self::Keyframes),
            "full" => Ok(Self::Full),
            "template" => Ok(Self::Template),
            other => Err(LayoutError::decode(format!("unknown payload type '{other}'"))),
        }
    }
}

/// Type-specific payload content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadData {
    /// One snapshot, imported at its own level unless a target is given
    Layout(Snapshot),
    /// Keyframe snapshots; their levels become the spec's keyframe set
    Keyframes(Vec<Snapshot>),
    /// Whole spec
    Full {
        /// Every stored snapshot
        snapshots: Vec<Snapshot>,
        /// Keyframe levels
        keyframes: BTreeSet<u8>,
        /// Per-slot enabled mask, `SLOT_COUNT` entries
        enabled_slots: Vec<bool>,
    },
    /// A named template
    Template(Template),
}

impl PayloadData {
    /// Kind of this data.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::Layout(_) => PayloadKind::Layout,
            Self::Keyframes(_) => PayloadKind::Keyframes,
            Self::Full { .. } => PayloadKind::Full,
            Self::Template(_) => PayloadKind::Template,
        }
    }
}

/// A complete export payload before framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    /// Format version
    pub version: u32,
    /// Class of the exporting character
    pub class_tag: String,
    /// Content
    pub data: PayloadData,
}

impl ExportPayload {
    /// Converts the payload into its value tree.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let data = match &self.data {
            PayloadData::Layout(snapshot) => strip_snapshot(snapshot),
            PayloadData::Keyframes(snapshots) => Value::list(snapshots.iter().map(strip_snapshot)),
            PayloadData::Full {
                snapshots,
                keyframes,
                enabled_slots,
            } => {
                let disabled = enabled_slots
                    .iter()
                    .zip(1_u8..)
                    .filter(|(enabled, _)| !**enabled)
                    .map(|(_, slot)| Value::from(slot));
                table([
                    ("snapshots", Value::list(snapshots.iter().map(strip_snapshot))),
                    ("keyframes", Value::list(keyframes.iter().copied().map(Value::from))),
                    ("disabled", Value::list(disabled)),
                ])
            }
            PayloadData::Template(template) => {
                let mut t = table([
                    ("name", Value::from(template.name.as_str())),
                    ("created", Value::Int(template.created.timestamp())),
                    ("layout", strip_snapshot(&template.layout)),
                ]);
                insert_if(&mut t, "description", !template.description.is_empty(), || {
                    Value::from(template.description.as_str())
                });
                if let Some(level) = template.source_level {
                    insert_if(&mut t, "sourceLevel", true, || Value::from(level));
                }
                t
            }
        };

        table([
            ("version", Value::from(self.version)),
            ("classTag", Value::from(self.class_tag.as_str())),
            ("type", Value::from(self.data.kind().as_str())),
            ("data", data),
        ])
    }

    /// Restores a payload from its value tree, validating everything.
    pub fn from_value(value: &Value) -> LayoutResult<Self> {
        let version = u32::try_from(int_field(value, "version")?)
            .map_err(|_| LayoutError::decode("version out of range"))?;
        let class_tag = str_field(value, "classTag")?.to_string();
        let kind = PayloadKind::parse(str_field(value, "type")?)?;
        let data = field(value, "data")?;

        let data = match kind {
            PayloadKind::Layout => PayloadData::Layout(restore_snapshot(data)?),
            PayloadKind::Keyframes => {
                let snapshots = list_items(data)?
                    .into_iter()
                    .map(restore_snapshot)
                    .collect::<LayoutResult<Vec<_>>>()?;
                ensure_distinct_levels(&snapshots)?;
                PayloadData::Keyframes(snapshots)
            }
            PayloadKind::Full => restore_full(data)?,
            PayloadKind::Template => PayloadData::Template(restore_template(data)?),
        };

        Ok(Self {
            version,
            class_tag,
            data,
        })
    }
}

// ============================================================================
// Strip
// ============================================================================

fn table<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::Table(
        entries
            .into_iter()
            .map(|(key, value)| (Key::from(key), value))
            .collect(),
    )
}

fn insert_if(value: &mut Value, key: &str, condition: bool, make: impl FnOnce() -> Value) {
    if let (true, Value::Table(t)) = (condition, value) {
        t.insert(Key::from(key), make());
    }
}

/// Strips one assignment to its short-key table.
#[must_use]
pub fn strip_assignment(assignment: &SlotAssignment) -> Value {
    let mut stripped = match assignment {
        SlotAssignment::Empty => return Value::Nil,
        SlotAssignment::Spell { name, rank, .. } => table([
            ("t", Value::from("s")),
            ("n", Value::from(name.as_str())),
            ("r", Value::from(rank.as_str())),
        ]),
        SlotAssignment::Item { id, name, .. } => table([
            ("t", Value::from("i")),
            ("id", Value::from(*id)),
            ("n", Value::from(name.as_str())),
        ]),
        SlotAssignment::Macro { id, name, body, .. } => table([
            ("t", Value::from("m")),
            ("id", Value::from(*id)),
            ("n", Value::from(name.as_str())),
            ("b", Value::from(body.as_str())),
        ]),
        SlotAssignment::Companion { id, kind, .. } => table([
            ("t", Value::from("c")),
            ("id", Value::from(*id)),
            ("k", Value::from(kind.as_str())),
        ]),
        SlotAssignment::EquipmentSet { name, .. } => table([
            ("t", Value::from("e")),
            ("n", Value::from(name.as_str())),
        ]),
    };
    let icon = assignment.icon();
    insert_if(&mut stripped, "i", icon != 0, || Value::from(icon));
    stripped
}

/// Strips a snapshot: level, creation time and non-empty slots only.
#[must_use]
pub fn strip_snapshot(snapshot: &Snapshot) -> Value {
    let slots: Table = snapshot
        .iter()
        .map(|(slot, assignment)| (Key::Int(i64::from(slot)), strip_assignment(assignment)))
        .collect();
    table([
        ("level", Value::from(snapshot.level)),
        ("created", Value::Int(snapshot.created.timestamp())),
        ("slots", Value::Table(slots)),
    ])
}

// ============================================================================
// Restore
// ============================================================================

fn field<'a>(value: &'a Value, key: &str) -> LayoutResult<&'a Value> {
    if value.as_table().is_none() {
        return Err(LayoutError::decode(format!(
            "expected a table holding '{key}'"
        )));
    }
    value
        .get(key)
        .ok_or_else(|| LayoutError::decode(format!("missing field '{key}'")))
}

fn int_field(value: &Value, key: &str) -> LayoutResult<i64> {
    field(value, key)?
        .as_int()
        .ok_or_else(|| LayoutError::decode(format!("field '{key}' must be an integer")))
}

fn str_field<'a>(value: &'a Value, key: &str) -> LayoutResult<&'a str> {
    field(value, key)?
        .as_str()
        .ok_or_else(|| LayoutError::decode(format!("field '{key}' must be a string")))
}

fn opt_str_field<'a>(value: &'a Value, key: &str) -> LayoutResult<Option<&'a str>> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => v
            .as_str()
            .map(Some)
            .ok_or_else(|| LayoutError::decode(format!("field '{key}' must be a string"))),
    }
}

fn u32_field(value: &Value, key: &str) -> LayoutResult<u32> {
    u32::try_from(int_field(value, key)?)
        .map_err(|_| LayoutError::decode(format!("field '{key}' is out of range")))
}

fn opt_u32_field(value: &Value, key: &str) -> LayoutResult<u32> {
    if value.get(key).is_none() {
        return Ok(0);
    }
    u32_field(value, key)
}

fn level_value(n: i64) -> LayoutResult<u8> {
    let level = u8::try_from(n).map_err(|_| LayoutError::invalid_target(format!("level {n} is out of range")))?;
    validate_level(level)?;
    Ok(level)
}

fn created_field(value: &Value) -> LayoutResult<DateTime<Utc>> {
    match value.get("created") {
        None => Ok(Utc::now()),
        Some(v) => v
            .as_int()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .ok_or_else(|| LayoutError::decode("field 'created' is not a valid timestamp")),
    }
}

/// Returns the values of a positional table in order; any other key fails.
fn list_items(value: &Value) -> LayoutResult<Vec<&Value>> {
    let table = value
        .as_table()
        .ok_or_else(|| LayoutError::decode("expected a list"))?;
    table
        .iter()
        .zip(1_i64..)
        .map(|((key, item), index)| match key {
            Key::Int(n) if *n == index => Ok(item),
            _ => Err(LayoutError::decode("list has non-sequential keys")),
        })
        .collect()
}

/// Restores one assignment from its short-key table.
pub fn restore_assignment(value: &Value) -> LayoutResult<SlotAssignment> {
    let icon = opt_u32_field(value, "i")?;
    let assignment = match str_field(value, "t")? {
        "s" => SlotAssignment::Spell {
            name: str_field(value, "n")?.to_string(),
            rank: opt_str_field(value, "r")?.unwrap_or_default().to_string(),
            icon,
        },
        "i" => SlotAssignment::Item {
            id: u32_field(value, "id")?,
            name: opt_str_field(value, "n")?.unwrap_or_default().to_string(),
            icon,
        },
        "m" => SlotAssignment::Macro {
            id: u32_field(value, "id")?,
            name: str_field(value, "n")?.to_string(),
            body: opt_str_field(value, "b")?.unwrap_or_default().to_string(),
            icon,
        },
        "c" => SlotAssignment::Companion {
            id: u32_field(value, "id")?,
            kind: str_field(value, "k")?.to_string(),
            icon,
        },
        "e" => SlotAssignment::EquipmentSet {
            name: str_field(value, "n")?.to_string(),
            icon,
        },
        other => {
            return Err(LayoutError::decode(format!(
                "unknown slot type '{other}'"
            )))
        }
    };
    Ok(assignment)
}

/// Restores a snapshot; every slot not listed reads as empty.
pub fn restore_snapshot(value: &Value) -> LayoutResult<Snapshot> {
    let level = level_value(int_field(value, "level")?)?;
    let mut snapshot = Snapshot::with_created(level, created_field(value)?);

    let Some(slots) = value.get("slots") else {
        return Ok(snapshot);
    };
    let slots = slots
        .as_table()
        .ok_or_else(|| LayoutError::decode("field 'slots' must be a table"))?;
    for (key, item) in slots {
        let slot = match key {
            Key::Int(n) => u8::try_from(*n)
                .map_err(|_| LayoutError::invalid_target(format!("slot {n} is out of range")))?,
            Key::Str(s) => return Err(LayoutError::decode(format!("slot key '{s}' is not a number"))),
        };
        validate_slot(slot)?;
        snapshot.set(slot, restore_assignment(item)?)?;
    }
    Ok(snapshot)
}

fn ensure_distinct_levels(snapshots: &[Snapshot]) -> LayoutResult<()> {
    let mut seen = BTreeSet::new();
    for snapshot in snapshots {
        if !seen.insert(snapshot.level) {
            return Err(LayoutError::decode(format!(
                "level {} appears twice",
                snapshot.level
            )));
        }
    }
    Ok(())
}

fn restore_full(data: &Value) -> LayoutResult<PayloadData> {
    let snapshots = list_items(field(data, "snapshots")?)?
        .into_iter()
        .map(restore_snapshot)
        .collect::<LayoutResult<Vec<_>>>()?;
    ensure_distinct_levels(&snapshots)?;

    let keyframes = match data.get("keyframes") {
        None => BTreeSet::new(),
        Some(list) => list_items(list)?
            .into_iter()
            .map(|v| {
                v.as_int()
                    .ok_or_else(|| LayoutError::decode("keyframe levels must be integers"))
                    .and_then(level_value)
            })
            .collect::<LayoutResult<BTreeSet<_>>>()?,
    };

    let mut enabled_slots = vec![true; usize::from(SLOT_COUNT)];
    if let Some(list) = data.get("disabled") {
        for v in list_items(list)? {
            let slot = v
                .as_int()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| LayoutError::decode("disabled slots must be slot numbers"))?;
            validate_slot(slot)?;
            enabled_slots[usize::from(slot - 1)] = false;
        }
    }

    Ok(PayloadData::Full {
        snapshots,
        keyframes,
        enabled_slots,
    })
}

fn restore_template(data: &Value) -> LayoutResult<Template> {
    let name = str_field(data, "name")?;
    validate_template_name(name)?;
    let description = opt_str_field(data, "description")?.unwrap_or_default();
    let source_level = match data.get("sourceLevel") {
        None => None,
        Some(v) => Some(level_value(v.as_int().ok_or_else(|| {
            LayoutError::decode("field 'sourceLevel' must be an integer")
        })?)?),
    };
    let layout = restore_snapshot(field(data, "layout")?)?;

    let mut template = Template::new(name, description, &layout, source_level)?;
    template.created = created_field(data)?;
    Ok(template)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::value::from_text;

    fn created() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn sample_snapshot(level: u8) -> Snapshot {
        let mut snapshot = Snapshot::with_created(level, created());
        snapshot
            .set(
                5,
                SlotAssignment::Spell {
                    name: "Fireball".to_string(),
                    rank: "Rank 1".to_string(),
                    icon: 135_812,
                },
            )
            .unwrap();
        snapshot.set(12, SlotAssignment::item(6948, "Hearthstone")).unwrap();
        snapshot
            .set(
                61,
                SlotAssignment::Macro {
                    id: 3,
                    name: "Pull".to_string(),
                    body: "/cast [@focus] Polymorph\n/p Sheeping \"skull\"".to_string(),
                    icon: 0,
                },
            )
            .unwrap();
        snapshot
            .set(
                72,
                SlotAssignment::Companion {
                    id: 458,
                    kind: "MOUNT".to_string(),
                    icon: 132_261,
                },
            )
            .unwrap();
        snapshot
            .set(
                120,
                SlotAssignment::EquipmentSet {
                    name: "Fishing".to_string(),
                    icon: 0,
                },
            )
            .unwrap();
        snapshot
    }

    #[test]
    fn test_strip_uses_short_keys_and_skips_empty() {
        let stripped = strip_snapshot(&sample_snapshot(10));
        let slots = stripped.get("slots").unwrap().as_table().unwrap();
        assert_eq!(slots.len(), 5);

        let spell = &slots[&Key::Int(5)];
        assert_eq!(spell.get("t").and_then(Value::as_str), Some("s"));
        assert_eq!(spell.get("n").and_then(Value::as_str), Some("Fireball"));
        assert_eq!(spell.get("i").and_then(Value::as_int), Some(135_812));

        let item = &slots[&Key::Int(12)];
        assert_eq!(item.get("id").and_then(Value::as_int), Some(6948));
        assert!(item.get("i").is_none());
    }

    #[test]
    fn test_snapshot_restore_matches_original() {
        let snapshot = sample_snapshot(10);
        let restored = restore_snapshot(&strip_snapshot(&snapshot)).unwrap();
        assert_eq!(restored, snapshot);
        assert_eq!(restored.configured_slots(), 5);
        assert!(restored.get(1).is_empty());
    }

    #[test]
    fn test_payload_value_round_trip() {
        let mut mask = vec![true; 120];
        mask[2] = false;
        mask[119] = false;
        let payload = ExportPayload {
            version: 1,
            class_tag: "MAGE".to_string(),
            data: PayloadData::Full {
                snapshots: vec![sample_snapshot(10), sample_snapshot(20)],
                keyframes: [10].into_iter().collect(),
                enabled_slots: mask,
            },
        };
        assert_eq!(ExportPayload::from_value(&payload.to_value()).unwrap(), payload);
    }

    #[test]
    fn test_template_payload_round_trip() {
        let mut template =
            Template::new("Leveling", "early game", &sample_snapshot(10), Some(10)).unwrap();
        template.created = created();
        let payload = ExportPayload {
            version: 1,
            class_tag: "MAGE".to_string(),
            data: PayloadData::Template(template),
        };
        assert_eq!(ExportPayload::from_value(&payload.to_value()).unwrap(), payload);
    }

    #[test]
    fn test_restore_rejects_out_of_bounds() {
        let bad_slot = from_text(r#"{level=10,slots={[121]={t="i",id=1}}}"#).unwrap();
        assert!(matches!(
            restore_snapshot(&bad_slot),
            Err(LayoutError::InvalidTarget(_))
        ));

        let bad_level = from_text(r#"{level=81}"#).unwrap();
        assert!(matches!(
            restore_snapshot(&bad_level),
            Err(LayoutError::InvalidTarget(_))
        ));

        let huge_level = from_text(r#"{level=300}"#).unwrap();
        assert!(restore_snapshot(&huge_level).is_err());
    }

    #[test]
    fn test_restore_rejects_ill_typed_fields() {
        for text in [
            r#"{level="10"}"#,
            r#"{level=10,slots={[1]={t="x"}}}"#,
            r#"{level=10,slots={[1]={t="i",id=-1}}}"#,
            r#"{level=10,slots={[1]={t="s"}}}"#,
            r#"{level=10,slots={a={t="s",n="x"}}}"#,
            r#"{level=10,slots=5}"#,
            r#"{level=10,created=99999999999999999}"#,
        ] {
            let value = from_text(text).unwrap();
            assert!(restore_snapshot(&value).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_payload_requires_known_type() {
        let value =
            from_text(r#"{version=1,classTag="MAGE",type="everything",data={}}"#).unwrap();
        assert!(matches!(
            ExportPayload::from_value(&value),
            Err(LayoutError::DecodeFailed(_))
        ));
    }

    #[test]
    fn test_keyframes_reject_duplicate_levels() {
        let value = from_text(
            r#"{version=1,classTag="MAGE",type="keyframes",data={{level=10},{level=10}}}"#,
        )
        .unwrap();
        assert!(ExportPayload::from_value(&value).is_err());
    }

    #[test]
    fn test_template_name_validated_on_restore() {
        let value = from_text(
            r#"{version=1,classTag="MAGE",type="template",data={name="../etc",layout={level=1}}}"#,
        )
        .unwrap();
        assert!(matches!(
            ExportPayload::from_value(&value),
            Err(LayoutError::Validation(_))
        ));
    }
}
