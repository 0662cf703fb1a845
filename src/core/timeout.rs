//! One-shot timeout registry
//!
//! A fixed table of countdown slots decremented once per tick interrupt.
//! Each slot that reaches zero invokes its registered callback exactly
//! once, still inside the tick interrupt, and frees itself.

use portable_atomic::{AtomicU32, Ordering};

use crate::config::{CFG_TICK_PERIOD_MS, CFG_TIMEOUT_SLOTS};
use crate::critical::{critical_section, is_isr_context, CsCell};
use crate::dispatch;
use crate::error::{OsError, OsResult};
use crate::types::{OsMs, OsTick, PeripheralId, TimeoutFn, TimeoutHandle};

/// One countdown slot
///
/// `remaining == 0` is the free sentinel; an armed slot always counts
/// at least 1, so a free slot never carries a live callback.
#[derive(Clone, Copy)]
struct TimeoutSlot {
    callback: Option<TimeoutFn>,
    remaining: OsTick,
}

impl TimeoutSlot {
    const fn free() -> Self {
        TimeoutSlot {
            callback: None,
            remaining: 0,
        }
    }

    #[inline(always)]
    fn is_free(&self) -> bool {
        self.remaining == 0
    }
}

/// Fixed-size registry of one-shot countdown timers
pub struct TimeoutTable {
    slots: [TimeoutSlot; CFG_TIMEOUT_SLOTS],
}

impl TimeoutTable {
    pub const fn new() -> Self {
        TimeoutTable {
            slots: [TimeoutSlot::free(); CFG_TIMEOUT_SLOTS],
        }
    }

    /// Arm the first free slot with a callback due after `delay_ms`.
    ///
    /// The delay is rounded down to whole tick periods but never below
    /// one tick: a sub-tick count would equal the free-slot sentinel and
    /// the slot could never fire.
    ///
    /// # Returns
    /// * `Ok(handle)` - Slot armed; the handle stays stable until the
    ///   slot fires or is unregistered
    /// * `Err(OsError::NoFreeSlot)` - Every slot is armed
    pub fn register(&mut self, callback: TimeoutFn, delay_ms: OsMs) -> OsResult<TimeoutHandle> {
        let ticks = (delay_ms / CFG_TICK_PERIOD_MS).max(1);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_free() {
                slot.callback = Some(callback);
                slot.remaining = ticks;
                return Ok(TimeoutHandle::new(index));
            }
        }

        Err(OsError::NoFreeSlot)
    }

    /// Disarm a slot before it fires.
    ///
    /// Clearing an already-free slot is not an error; the operation is
    /// idempotent.
    ///
    /// # Returns
    /// * `Ok(())` - Slot is free
    /// * `Err(OsError::InvalidHandle)` - Handle is out of range
    pub fn unregister(&mut self, handle: TimeoutHandle) -> OsResult<()> {
        let slot = self
            .slots
            .get_mut(handle.index())
            .ok_or(OsError::InvalidHandle)?;

        slot.callback = None;
        slot.remaining = 0;

        Ok(())
    }

    /// Advance every armed slot by one tick.
    ///
    /// Invoked only from the tick interrupt. Slots that reach zero fire
    /// synchronously in ascending slot-index order; the callback is taken
    /// out of the slot first so it can fire at most once.
    pub fn on_tick(&mut self) {
        for slot in self.slots.iter_mut() {
            if slot.remaining == 0 {
                continue;
            }

            slot.remaining -= 1;
            if slot.remaining == 0 {
                if let Some(callback) = slot.callback.take() {
                    callback();
                }
            }
        }
    }

    /// Number of currently armed slots
    pub fn armed(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }

    /// Remaining ticks for a slot, `None` if free or out of range
    pub fn remaining(&self, handle: TimeoutHandle) -> Option<OsTick> {
        self.slots
            .get(handle.index())
            .filter(|s| !s.is_free())
            .map(|s| s.remaining)
    }
}

impl Default for TimeoutTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============ Global Instance ============

/// Global timeout registry
static TIMEOUTS: CsCell<TimeoutTable> = CsCell::new(TimeoutTable::new());

/// Monotonic tick counter, advanced by the tick handler
static TICK_COUNT: AtomicU32 = AtomicU32::new(0);

/// Wire the global registry to its tick source.
///
/// Registers the tick handler in the dispatch table under the given
/// timer identity; the raw timer vector then reaches the registry
/// through [`dispatch::os_dispatch_elapsed`].
pub fn os_timeout_init(tick_source: PeripheralId) -> OsResult<()> {
    dispatch::os_dispatch_register_elapsed(tick_source, Some(os_tick_handler))?;
    crate::info!("timeout registry armed on tick source {=u32:x}", tick_source.raw());
    Ok(())
}

/// Register a one-shot timeout on the global registry.
///
/// # Returns
/// * `Ok(handle)` - Armed
/// * `Err(OsError::RegisterIsr)` - Called from interrupt context
/// * `Err(OsError::NoFreeSlot)` - Registry is full
pub fn os_timeout_register(callback: TimeoutFn, delay_ms: OsMs) -> OsResult<TimeoutHandle> {
    if is_isr_context() {
        return Err(OsError::RegisterIsr);
    }

    critical_section(|cs| TIMEOUTS.get(cs).register(callback, delay_ms))
}

/// Cancel a one-shot timeout on the global registry.
///
/// Single-core assumption: the tick handler runs to completion relative
/// to normal-context code, so a cancel can never interleave with the
/// slot firing.
///
/// # Returns
/// * `Ok(())` - Slot is free
/// * `Err(OsError::UnregisterIsr)` - Called from interrupt context
/// * `Err(OsError::InvalidHandle)` - Handle out of range
pub fn os_timeout_unregister(handle: TimeoutHandle) -> OsResult<()> {
    if is_isr_context() {
        return Err(OsError::UnregisterIsr);
    }

    critical_section(|cs| TIMEOUTS.get(cs).unregister(handle))
}

/// Get current tick count
#[inline]
pub fn os_time_get() -> OsTick {
    TICK_COUNT.load(Ordering::Relaxed)
}

/// Tick handler
///
/// Runs in the tick interrupt, resolved through the dispatch table.
pub fn os_tick_handler() {
    TICK_COUNT.fetch_add(1, Ordering::Relaxed);

    // The tick interrupt cannot be preempted by normal-context code, and
    // registration paths mask interrupts; direct access is safe here.
    unsafe {
        TIMEOUTS.get_unchecked().on_tick();
    }
}
