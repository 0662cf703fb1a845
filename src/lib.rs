//! txtick - interrupt-driven serial transmit and timeout dispatch
//!
//! Firmware services for bare-metal targets:
//! - An asynchronous serial transmit pipeline: a single-producer ring
//!   buffer drained to a DMA-driven UART in bounded bursts, re-armed
//!   from the completion interrupt
//! - A one-shot timeout registry driven by a periodic tick interrupt
//! - A dispatch table decoupling raw interrupt vectors from the
//!   components that registered interest
//!
//! No dynamic memory, no blocking waits; everything is fixed-capacity
//! and safe under ISR preemption on a single core.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

// ============ Critical Section ============

#[cfg(target_arch = "arm")]
mod cs_impl {
    use cortex_m::interrupt;
    use cortex_m::register::primask;
    use critical_section::{set_impl, Impl, RawRestoreState};

    struct SingleCoreCriticalSection;
    set_impl!(SingleCoreCriticalSection);

    unsafe impl Impl for SingleCoreCriticalSection {
        unsafe fn acquire() -> RawRestoreState {
            let was_active = primask::read().is_active();
            interrupt::disable();
            was_active
        }

        unsafe fn release(was_active: RawRestoreState) {
            if was_active {
                unsafe { interrupt::enable() }
            }
        }
    }
}

// ============ Modules ============

pub mod log;
mod lang_items;

pub mod core;
pub mod port;

// ============ Re-exports ============

pub use core::config;
pub use core::config::*;
pub use core::critical;
pub use core::dispatch;
pub use core::dispatch::{
    os_dispatch_completion, os_dispatch_elapsed, os_dispatch_register_completion,
    os_dispatch_register_elapsed, DispatchTable,
};
pub use core::error;
pub use core::error::{OsError, OsResult};
pub use core::ring;
pub use core::ring::TxRing;
pub use core::serial;
pub use core::serial::{SerialTx, TxSink};
pub use core::timeout;
pub use core::timeout::{
    os_tick_handler, os_time_get, os_timeout_init, os_timeout_register, os_timeout_unregister,
    TimeoutTable,
};
pub use core::types;
pub use core::types::*;

#[cfg(feature = "pac")]
pub use stm32_metapac as pac;
