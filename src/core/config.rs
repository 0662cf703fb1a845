//! Compile-time configuration for txtick
//!
//! These constants control the resource limits of the transmit pipeline
//! and the timeout registry.

/// Transmit ring buffer capacity in bytes
///
/// One slot is always left open so a full buffer never makes `head`
/// catch up with `tail`.
pub const CFG_TX_RING_CAPACITY: usize = 1000;

/// Maximum number of bytes handed to the hardware in one DMA burst
pub const CFG_TX_BURST_MAX: usize = 100;

/// Period of the timeout tick interrupt in milliseconds
pub const CFG_TICK_PERIOD_MS: u32 = 10;

/// Number of one-shot timeout slots
pub const CFG_TIMEOUT_SLOTS: usize = 16;

/// Number of entries in the interrupt dispatch table
pub const CFG_DISPATCH_SLOTS: usize = 8;
