//! Export and import of layouts as shareable strings.

use std::collections::BTreeSet;

use tracing::{info, warn};

use crate::constants::EXPORT_VERSION;
use crate::error::{LayoutError, LayoutResult};
use crate::models::snapshot::{validate_level, validate_spec};
use crate::models::{LayoutKey, Snapshot};
use crate::services::derivation::derive;
use crate::state::AppState;

use super::payload::{ExportPayload, PayloadData, PayloadKind};
use super::transport::{decode_wire, encode_wire};
use super::value::{from_text, to_text};

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Kind of the imported payload
    pub kind: PayloadKind,
    /// Levels (or templates) written
    pub written: usize,
    /// Levels deleted by a full import
    pub deleted: usize,
    /// Non-fatal problems, such as a class mismatch
    pub warnings: Vec<String>,
}

/// Encodes a payload into an export string.
pub fn encode_payload(payload: &ExportPayload) -> LayoutResult<String> {
    let text = to_text(&payload.to_value())?;
    Ok(encode_wire(&text))
}

/// Decodes and validates an export string.
pub fn decode_payload(input: &str) -> LayoutResult<ExportPayload> {
    let text = decode_wire(input)?;
    let value = from_text(&text)?;
    let payload = ExportPayload::from_value(&value)?;
    if payload.version > EXPORT_VERSION {
        return Err(LayoutError::VersionUnsupported {
            found: payload.version,
            supported: EXPORT_VERSION,
        });
    }
    Ok(payload)
}

fn payload(state: &AppState, data: PayloadData) -> ExportPayload {
    ExportPayload {
        version: EXPORT_VERSION,
        class_tag: state.class_tag.clone(),
        data,
    }
}

/// Exports the effective layout of one level.
pub fn export_layout(state: &AppState, spec: u8, level: u8) -> LayoutResult<String> {
    let snapshot = state.resolve_fresh(spec, level)?.ok_or_else(|| {
        LayoutError::EmptySource(format!("no layout at level {level} of spec {spec}"))
    })?;
    encode_payload(&payload(state, PayloadData::Layout(snapshot.saved_at(level))))
}

/// Exports every keyframe of a spec.
pub fn export_keyframes(state: &AppState, spec: u8) -> LayoutResult<String> {
    let snapshots: Vec<Snapshot> = state
        .store
        .keyframes(spec)?
        .into_iter()
        .filter_map(|level| state.store.get(LayoutKey { spec, level }).cloned())
        .collect();
    if snapshots.is_empty() {
        return Err(LayoutError::EmptySource(format!(
            "spec {spec} has no stored keyframes"
        )));
    }
    encode_payload(&payload(state, PayloadData::Keyframes(snapshots)))
}

/// Exports every stored level, the keyframe set and the slot mask of a spec.
pub fn export_full(state: &AppState, spec: u8) -> LayoutResult<String> {
    let section = state.store.spec(spec)?;
    let data = PayloadData::Full {
        snapshots: section.snapshots.values().cloned().collect(),
        keyframes: section.keyframes.clone(),
        enabled_slots: section.enabled_slots.clone(),
    };
    encode_payload(&payload(state, data))
}

/// Exports a named template.
pub fn export_template(state: &AppState, spec: u8, name: &str) -> LayoutResult<String> {
    validate_spec(spec)?;
    let template = state
        .store
        .template(spec, name)
        .cloned()
        .ok_or_else(|| LayoutError::UnknownTemplate(name.to_string()))?;
    encode_payload(&payload(state, PayloadData::Template(template)))
}

/// Decodes an export string and applies it to a spec.
pub fn import_string(
    state: &mut AppState,
    input: &str,
    spec: u8,
    target_level: Option<u8>,
) -> LayoutResult<ImportReport> {
    let payload = decode_payload(input)?;
    apply_payload(state, payload, spec, target_level)
}

/// Applies a decoded payload to a spec.
///
/// `target_level` only applies to `layout` payloads; the snapshot is
/// re-derived for it when it differs from the exported level. The payload is
/// fully validated before anything is written, and every written or deleted
/// level gets one undo entry. Importing the same payload twice changes
/// nothing the second time.
pub fn apply_payload(
    state: &mut AppState,
    payload: ExportPayload,
    spec: u8,
    target_level: Option<u8>,
) -> LayoutResult<ImportReport> {
    validate_spec(spec)?;
    if let Some(level) = target_level {
        validate_level(level)?;
    }
    if payload.version > EXPORT_VERSION {
        return Err(LayoutError::VersionUnsupported {
            found: payload.version,
            supported: EXPORT_VERSION,
        });
    }

    let kind = payload.data.kind();
    let mut report = ImportReport {
        kind,
        written: 0,
        deleted: 0,
        warnings: Vec::new(),
    };
    if payload.class_tag != state.class_tag {
        warn!(
            expected = %state.class_tag,
            found = %payload.class_tag,
            "Importing layout exported by a different class"
        );
        report.warnings.push(format!(
            "Exported by a {} character, current class is {}",
            payload.class_tag, state.class_tag
        ));
    }

    match payload.data {
        PayloadData::Layout(snapshot) => {
            let level = target_level.unwrap_or(snapshot.level);
            let snapshot = if level == snapshot.level {
                snapshot
            } else {
                derive(state.class_ranks(), &snapshot, level)
            };
            if write(state, spec, level, snapshot)? {
                report.written += 1;
            }
        }
        PayloadData::Keyframes(snapshots) => {
            let levels: BTreeSet<u8> = snapshots.iter().map(|s| s.level).collect();
            for snapshot in snapshots {
                if write(state, spec, snapshot.level, snapshot)? {
                    report.written += 1;
                }
            }
            state.store.replace_keyframes(spec, levels)?;
        }
        PayloadData::Full {
            snapshots,
            keyframes,
            enabled_slots,
        } => {
            let incoming: BTreeSet<u8> = snapshots.iter().map(|s| s.level).collect();
            for level in state.store.levels(spec)? {
                if !incoming.contains(&level)
                    && state.delete(LayoutKey { spec, level }, format!("Import: remove level {level}"))?
                {
                    report.deleted += 1;
                }
            }
            for snapshot in snapshots {
                if write(state, spec, snapshot.level, snapshot)? {
                    report.written += 1;
                }
            }
            state.store.replace_keyframes(spec, keyframes)?;
            state.store.replace_enabled_slots(spec, enabled_slots)?;
        }
        PayloadData::Template(template) => {
            let unchanged = state
                .store
                .template(spec, &template.name)
                .is_some_and(|existing| {
                    existing.description == template.description
                        && existing.source_level == template.source_level
                        && existing.layout.same_slots(&template.layout)
                });
            if !unchanged {
                state.store.put_template(spec, template)?;
                report.written += 1;
            }
        }
    }

    info!(
        spec,
        kind = kind.as_str(),
        written = report.written,
        deleted = report.deleted,
        "Imported layout string"
    );
    Ok(report)
}

fn write(state: &mut AppState, spec: u8, level: u8, snapshot: Snapshot) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    state.write(key, snapshot, format!("Import level {level}"))
}
