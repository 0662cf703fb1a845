//! Interrupt dispatch table
//!
//! Maps a peripheral identity to the one registered handler per event
//! kind, so the transmit pipeline and the timeout registry never name
//! concrete interrupt vectors. The raw vectors in the port layer
//! acknowledge their hardware flags and resolve through this table.

use crate::config::CFG_DISPATCH_SLOTS;
use crate::critical::{critical_section, CsCell};
use crate::error::{OsError, OsResult};
use crate::types::{EventFn, EventKind, PeripheralId};

/// One dispatch entry: an identity and its per-event callbacks
#[derive(Clone, Copy)]
struct DispatchEntry {
    id: Option<PeripheralId>,
    on_completion: Option<EventFn>,
    on_elapsed: Option<EventFn>,
}

impl DispatchEntry {
    const fn vacant() -> Self {
        DispatchEntry {
            id: None,
            on_completion: None,
            on_elapsed: None,
        }
    }
}

/// Statically sized identity -> callback table
///
/// Entries are addressed by linear scan; a later registration for the
/// same (identity, event kind) silently overwrites the earlier one.
/// There is no removal primitive beyond overwriting with `None`.
pub struct DispatchTable {
    entries: [DispatchEntry; CFG_DISPATCH_SLOTS],
}

impl DispatchTable {
    pub const fn new() -> Self {
        DispatchTable {
            entries: [DispatchEntry::vacant(); CFG_DISPATCH_SLOTS],
        }
    }

    /// Store a callback for an (identity, event kind) pair.
    ///
    /// `None` clears the pair. A `None` registration for an identity the
    /// table does not know is a no-op rather than a claimed entry.
    ///
    /// # Returns
    /// * `Ok(())` - Stored (or cleared)
    /// * `Err(OsError::DispatchFull)` - New identity, no vacant entry
    pub fn register(
        &mut self,
        id: PeripheralId,
        kind: EventKind,
        callback: Option<EventFn>,
    ) -> OsResult<()> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == Some(id)) {
            Self::store(entry, kind, callback);
            return Ok(());
        }

        if callback.is_none() {
            return Ok(());
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id.is_none())
            .ok_or(OsError::DispatchFull)?;

        entry.id = Some(id);
        Self::store(entry, kind, callback);

        Ok(())
    }

    /// Invoke the registered callback for an (identity, event kind) pair.
    ///
    /// No-op when nothing is registered. Returns whether a handler ran.
    pub fn dispatch(&self, id: PeripheralId, kind: EventKind) -> bool {
        let callback = self
            .entries
            .iter()
            .find(|e| e.id == Some(id))
            .and_then(|e| match kind {
                EventKind::Completion => e.on_completion,
                EventKind::Elapsed => e.on_elapsed,
            });

        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    #[inline]
    fn store(entry: &mut DispatchEntry, kind: EventKind, callback: Option<EventFn>) {
        match kind {
            EventKind::Completion => entry.on_completion = callback,
            EventKind::Elapsed => entry.on_elapsed = callback,
        }
    }

    /// Number of claimed entries
    pub fn claimed(&self) -> usize {
        self.entries.iter().filter(|e| e.id.is_some()).count()
    }
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Global Instance ============

/// Global dispatch table the raw vectors resolve through
static DISPATCH: CsCell<DispatchTable> = CsCell::new(DispatchTable::new());

/// Register a transfer-completion callback for a peripheral instance
pub fn os_dispatch_register_completion(
    id: PeripheralId,
    callback: Option<EventFn>,
) -> OsResult<()> {
    critical_section(|cs| DISPATCH.get(cs).register(id, EventKind::Completion, callback))
}

/// Register an elapsed callback for a timer instance
pub fn os_dispatch_register_elapsed(id: PeripheralId, callback: Option<EventFn>) -> OsResult<()> {
    critical_section(|cs| DISPATCH.get(cs).register(id, EventKind::Elapsed, callback))
}

/// Resolve a completion interrupt to its registered handler.
///
/// Entry point for the raw vectors; runs in interrupt context.
pub fn os_dispatch_completion(id: PeripheralId) -> bool {
    unsafe { DISPATCH.get_unchecked().dispatch(id, EventKind::Completion) }
}

/// Resolve an elapsed interrupt to its registered handler.
///
/// Entry point for the raw vectors; runs in interrupt context.
pub fn os_dispatch_elapsed(id: PeripheralId) -> bool {
    unsafe { DISPATCH.get_unchecked().dispatch(id, EventKind::Elapsed) }
}
