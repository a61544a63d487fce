//! Capturing from and applying to the live slot state of the host.
//!
//! The host is reached only through [`LiveState`]. Captures are debounced
//! and applies are held back while the host is in lockdown, both through
//! single-slot deferrals owned by [`AppState`].

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::constants::SLOT_COUNT;
use crate::error::{LayoutError, LayoutResult};
use crate::models::{LayoutKey, RankObservation, SlotAssignment, Snapshot, SourceKind};
use crate::services::scheduler::GateDecision;
use crate::state::AppState;

/// Read/write access to the host's live slots.
pub trait LiveState {
    /// Returns what is currently placed in a slot.
    fn read_assignment(&self, slot: u8) -> SlotAssignment;

    /// Places an assignment into a slot. `Empty` clears it.
    ///
    /// Returns a reason on failure (e.g., item not in bags).
    fn write_assignment(&mut self, slot: u8, assignment: &SlotAssignment) -> Result<(), String>;
}

/// In-memory live state, for shells without a host and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLiveState {
    slots: BTreeMap<u8, SlotAssignment>,
    /// Slots that refuse writes, with the reason returned
    pub locked_slots: BTreeMap<u8, String>,
}

impl MemoryLiveState {
    /// Creates an empty live state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a live state holding a snapshot's assignments.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            slots: snapshot
                .iter()
                .map(|(slot, assignment)| (slot, assignment.clone()))
                .collect(),
            locked_slots: BTreeMap::new(),
        }
    }
}

impl LiveState for MemoryLiveState {
    fn read_assignment(&self, slot: u8) -> SlotAssignment {
        self.slots.get(&slot).cloned().unwrap_or_default()
    }

    fn write_assignment(&mut self, slot: u8, assignment: &SlotAssignment) -> Result<(), String> {
        if let Some(reason) = self.locked_slots.get(&slot) {
            return Err(reason.clone());
        }
        if assignment.is_empty() {
            self.slots.remove(&slot);
        } else {
            self.slots.insert(slot, assignment.clone());
        }
        Ok(())
    }
}

/// Deferred "capture this level" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Spec to capture into
    pub spec: u8,
    /// Level to capture into
    pub level: u8,
}

/// Deferred "apply this level" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyRequest {
    /// Spec to apply from
    pub spec: u8,
    /// Level to apply
    pub level: u8,
}

/// Outcome of applying a layout to the live state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Slots written
    pub placed: Vec<u8>,
    /// Slots already matching
    pub unchanged: usize,
    /// Disabled slots left alone
    pub skipped: Vec<u8>,
    /// Slots the host refused, with the reason
    pub failed: Vec<(u8, String)>,
}

/// Reads all live slots into a snapshot for `level`.
pub fn read_live<L: LiveState + ?Sized>(live: &L, level: u8) -> Snapshot {
    let mut snapshot = Snapshot::new(level);
    for slot in 1..=SLOT_COUNT {
        // Slot range is 1..=120
        let _ = snapshot.set(slot, live.read_assignment(slot));
    }
    snapshot
}

/// Captures the live slots into (spec, level).
///
/// Spells seen on the slots are fed to the rank cache as observations at
/// this level. Returns true if the stored layout changed.
pub fn capture<L: LiveState + ?Sized>(
    state: &mut AppState,
    live: &L,
    spec: u8,
    level: u8,
) -> LayoutResult<bool> {
    let key = LayoutKey::new(spec, level)?;
    let snapshot = read_live(live, level);

    for (_, assignment) in snapshot.iter() {
        if let SlotAssignment::Spell { name, rank, icon } = assignment {
            state.observe(
                RankObservation::new(name.clone(), rank.clone(), level)
                    .with_icon(*icon)
                    .with_source(SourceKind::ActionSlot),
            );
        }
    }

    let configured = snapshot.configured_slots();
    let changed = state.write(key, snapshot, format!("Capture level {level}"))?;
    info!(spec, level, configured, changed, "Captured live layout");
    Ok(changed)
}

/// Schedules a debounced capture; an earlier pending capture is superseded.
pub fn request_capture(state: &mut AppState, now: Instant, spec: u8, level: u8) -> LayoutResult<()> {
    LayoutKey::new(spec, level)?;
    if let Some(old) = state
        .capture_debounce
        .schedule(now, CaptureRequest { spec, level })
    {
        debug!(spec = old.spec, level = old.level, "Superseded pending capture");
    }
    Ok(())
}

/// Runs the pending capture if its debounce window has passed.
///
/// Returns `None` if nothing was due.
pub fn poll_capture<L: LiveState + ?Sized>(
    state: &mut AppState,
    live: &L,
    now: Instant,
) -> LayoutResult<Option<bool>> {
    match state.capture_debounce.poll(now) {
        Some(request) => capture(state, live, request.spec, request.level).map(Some),
        None => Ok(None),
    }
}

/// Writes the effective layout of (spec, level) into the live state.
///
/// Disabled slots are skipped; slots already holding an identical assignment
/// (including macro body and icon) are not rewritten.
pub fn apply_level<L: LiveState + ?Sized>(
    state: &mut AppState,
    live: &mut L,
    spec: u8,
    level: u8,
) -> LayoutResult<ApplyReport> {
    let snapshot = state.resolve(spec, level)?.ok_or_else(|| {
        LayoutError::EmptySource(format!("no layout at level {level} of spec {spec}"))
    })?;

    let mut report = ApplyReport::default();
    for slot in 1..=SLOT_COUNT {
        if !state.store.is_slot_enabled(spec, slot) {
            report.skipped.push(slot);
            continue;
        }
        let desired = snapshot.get(slot);
        let current = live.read_assignment(slot);
        if current == *desired {
            report.unchanged += 1;
            continue;
        }
        match live.write_assignment(slot, desired) {
            Ok(()) => report.placed.push(slot),
            Err(reason) => {
                warn!(slot, %reason, "Failed to place assignment");
                report.failed.push((slot, reason));
            }
        }
    }

    info!(
        spec,
        level,
        placed = report.placed.len(),
        failed = report.failed.len(),
        "Applied layout"
    );
    Ok(report)
}

/// Applies (spec, level) now, or holds it until the host lockdown lifts.
///
/// Returns `None` when the request was deferred.
pub fn request_apply<L: LiveState + ?Sized>(
    state: &mut AppState,
    live: &mut L,
    spec: u8,
    level: u8,
) -> LayoutResult<Option<ApplyReport>> {
    LayoutKey::new(spec, level)?;
    match state.apply_gate.submit(ApplyRequest { spec, level }) {
        GateDecision::Ready(request) => {
            apply_level(state, live, request.spec, request.level).map(Some)
        }
        GateDecision::Deferred => {
            debug!(spec, level, "Apply deferred until lockdown ends");
            Ok(None)
        }
    }
}

/// Host entered lockdown.
pub fn enter_lockdown(state: &mut AppState) {
    state.apply_gate.lock();
}

/// Host left lockdown; runs the held apply request, if any.
pub fn leave_lockdown<L: LiveState + ?Sized>(
    state: &mut AppState,
    live: &mut L,
) -> LayoutResult<Option<ApplyReport>> {
    match state.apply_gate.unlock() {
        Some(request) => apply_level(state, live, request.spec, request.level).map(Some),
        None => Ok(None),
    }
}
