//! Port layer - CPU and board-specific bindings
//!
//! Wires the portable core to concrete hardware: the DMA transmit sink,
//! the tick timer, and the raw interrupt vectors that resolve through
//! the dispatch table.

#[cfg(all(target_arch = "arm", feature = "pac"))]
pub mod cortex_m4;

#[cfg(all(target_arch = "arm", feature = "pac"))]
pub use cortex_m4::*;

// Stub implementations for non-ARM targets (for testing)
#[cfg(not(all(target_arch = "arm", feature = "pac")))]
pub mod stub {
    use crate::error::OsResult;
    use crate::serial::TxSink;

    /// Sink that accepts every burst and discards it.
    ///
    /// Stands in for the DMA channel on targets without one; a
    /// completion must be delivered by hand.
    pub struct NullSink;

    impl TxSink for NullSink {
        fn start_transfer(&mut self, _bytes: &[u8]) -> OsResult<()> {
            Ok(())
        }
    }
}

#[cfg(not(all(target_arch = "arm", feature = "pac")))]
pub use stub::*;
