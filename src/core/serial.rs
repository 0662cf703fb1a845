//! Asynchronous serial transmit pipeline
//!
//! Couples the transmit ring to a hardware DMA channel. Callers hand
//! byte spans to [`SerialTx::submit`] and return immediately; the bytes
//! drain to the hardware in bounded bursts, re-armed from the transfer
//! completion interrupt.
//!
//! Context contract: `submit` runs in normal execution only and
//! `on_transfer_complete` only from the completion interrupt. `submit`
//! must be wrapped in a critical section by its caller (the port layer
//! wrapper does this) so the completion interrupt cannot observe a
//! half-updated ring.

use crate::config::CFG_TX_BURST_MAX;
use crate::error::OsResult;
use crate::ring::TxRing;

/// Hardware seam: one bounded asynchronous transfer at a time.
///
/// `start_transfer` must return without waiting for completion; the
/// hardware signals completion through the interrupt that ends up in
/// [`SerialTx::on_transfer_complete`]. The borrowed bytes stay valid and
/// unchanged until that completion fires.
pub trait TxSink {
    fn start_transfer(&mut self, bytes: &[u8]) -> OsResult<()>;
}

/// DMA-fed serial transmitter
///
/// Owns the ring, the burst staging area the hardware reads from, and
/// the sink. Overflow and hardware faults are counted rather than
/// propagated across the interrupt boundary.
pub struct SerialTx<S: TxSink> {
    ring: TxRing,
    staging: [u8; CFG_TX_BURST_MAX],
    sink: S,
    dropped: u32,
    faults: u32,
}

impl<S: TxSink> SerialTx<S> {
    pub const fn new(sink: S) -> Self {
        SerialTx {
            ring: TxRing::new(),
            staging: [0; CFG_TX_BURST_MAX],
            sink,
            dropped: 0,
            faults: 0,
        }
    }

    /// Queue bytes for transmission and return immediately.
    ///
    /// Copies as many bytes as fit into the ring; the rest is dropped
    /// and counted. If no burst is in flight, the first burst is primed
    /// here; otherwise the completion interrupt picks the bytes up.
    ///
    /// # Returns
    /// * `Ok(accepted)` - Number of bytes queued (may be < `bytes.len()`)
    /// * `Err(OsError::TransferFailed)` - Hardware refused the burst; the
    ///   accepted bytes stay queued and a later submit retries them
    pub fn submit(&mut self, bytes: &[u8]) -> OsResult<usize> {
        let accepted = self.ring.push(bytes);

        if accepted < bytes.len() {
            self.dropped = self.dropped.saturating_add((bytes.len() - accepted) as u32);
            crate::warn!("serial tx overflow: {} bytes dropped", bytes.len() - accepted);
        }

        self.start_next_burst()?;

        Ok(accepted)
    }

    /// Handle a completed hardware transfer.
    ///
    /// Invoked only from the completion interrupt. Retires the in-flight
    /// burst and primes the next one, or marks the channel idle.
    ///
    /// # Returns
    /// `true` when the channel went idle (nothing left to send) - used
    /// upstream to drive an activity indicator.
    pub fn on_transfer_complete(&mut self) -> bool {
        if !self.ring.is_busy() {
            // Spurious completion; nothing was in flight
            return true;
        }

        if !self.ring.retire() {
            return true;
        }

        if self.start_next_burst().is_err() {
            // Never stall the interrupt: drop back to idle and leave the
            // bytes pending for the next submit to retry.
            self.faults = self.faults.saturating_add(1);
            crate::error!("serial tx burst failed in completion handler");
            return true;
        }

        false
    }

    /// Prime a burst if the channel is idle and bytes are pending.
    fn start_next_burst(&mut self) -> OsResult<()> {
        if let Some(w) = self.ring.prime() {
            self.staging[..w.len].copy_from_slice(self.ring.window(&w));

            if let Err(e) = self.sink.start_transfer(&self.staging[..w.len]) {
                self.ring.abort();
                self.faults = self.faults.saturating_add(1);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Check if a burst is in flight
    #[inline(always)]
    pub fn is_busy(&self) -> bool {
        self.ring.is_busy()
    }

    /// Check if all submitted bytes have been handed to the hardware
    #[inline(always)]
    pub fn is_idle(&self) -> bool {
        self.ring.is_empty()
    }

    /// Pending bytes, the in-flight burst included
    #[inline(always)]
    pub fn pending(&self) -> usize {
        self.ring.pending()
    }

    /// Total bytes dropped to overflow since construction
    #[inline(always)]
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Total hardware transfer failures since construction
    #[inline(always)]
    pub fn faults(&self) -> u32 {
        self.faults
    }

    /// Access the sink (hardware re-configuration, tests)
    #[inline(always)]
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}
