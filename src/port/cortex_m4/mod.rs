//! Cortex-M4/STM32F429 port
//!
//! Serial transmit over USART2 fed by DMA1 stream 6 (channel 4), tick
//! source on TIM7. The raw vectors acknowledge their hardware flags and
//! resolve through the dispatch table; pin multiplexing and clock-tree
//! setup stay with the board bring-up code.

use portable_atomic::{AtomicBool, Ordering};
use stm32_metapac as pac;

use crate::config::CFG_TICK_PERIOD_MS;
use crate::critical::{critical_section, is_isr_context, CsCell};
use crate::dispatch;
use crate::error::{OsError, OsResult};
use crate::serial::{SerialTx, TxSink};
use crate::types::PeripheralId;

/// Identity of the serial transmit channel (USART2 register base)
pub const SERIAL_TX: PeripheralId = PeripheralId::new(0x4000_4400);

/// Identity of the tick timer (TIM7 register base)
pub const TICK_TIMER: PeripheralId = PeripheralId::new(0x4000_1400);

// ============ DMA Transmit Sink ============

/// `TxSink` over USART2-TX on DMA1 stream 6, channel 4
pub struct DmaTxSink {
    _private: (),
}

impl DmaTxSink {
    const fn new() -> Self {
        DmaTxSink { _private: () }
    }
}

impl TxSink for DmaTxSink {
    fn start_transfer(&mut self, bytes: &[u8]) -> OsResult<()> {
        if bytes.is_empty() || bytes.len() > u16::MAX as usize {
            return Err(OsError::TransferFailed);
        }

        let stream = pac::DMA1.st(6);

        // The stream must be disabled while it is reprogrammed
        stream.cr().modify(|w| w.set_en(false));
        while stream.cr().read().en() {}

        // Stream 6 flags live in the high half (ifcr index 1, slot 2)
        pac::DMA1.ifcr(1).write(|w| {
            w.set_tcif(2, true);
            w.set_htif(2, true);
            w.set_teif(2, true);
            w.set_dmeif(2, true);
            w.set_feif(2, true);
        });

        stream.par().write_value(pac::USART2.dr().as_ptr() as u32);
        stream.m0ar().write_value(bytes.as_ptr() as u32);
        stream.ndtr().write(|w| w.set_ndt(bytes.len() as u16));

        // Clear TC so the first DMA write restarts the shifter cleanly
        pac::USART2.sr().modify(|w| w.set_tc(false));

        stream.cr().write(|w| {
            w.set_chsel(4);
            w.set_dir(pac::dma::vals::Dir::MEMORYTOPERIPHERAL);
            w.set_minc(true);
            w.set_tcie(true);
            w.set_en(true);
        });

        Ok(())
    }
}

// ============ Global Serial Instance ============

/// Global transmit pipeline bound to the DMA sink
static SERIAL: CsCell<SerialTx<DmaTxSink>> = CsCell::new(SerialTx::new(DmaTxSink::new()));

/// Transmit activity flag for an upstream indicator
static TX_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Completion handler resolved through the dispatch table
fn serial_complete_handler() {
    let idle = unsafe { SERIAL.get_unchecked().on_transfer_complete() };
    TX_ACTIVE.store(!idle, Ordering::Relaxed);
}

// ============ Bring-up ============

/// Initialize the serial transmit path.
///
/// Enables the USART2 and DMA1 clocks, configures the UART for 8N1 at
/// `baud` against the given APB1 clock, enables DMA-on-transmit, and
/// registers the completion handler in the dispatch table. The TX pin
/// must already be muxed by board setup.
pub fn serial_init(apb1_hz: u32, baud: u32) -> OsResult<()> {
    pac::RCC.ahb1enr().modify(|w| w.set_dma1en(true));
    pac::RCC.apb1enr().modify(|w| w.set_usart2en(true));

    // Oversampling by 16: BRR holds mantissa/fraction as clock/baud
    pac::USART2.brr().write(|w| w.0 = apb1_hz / baud);
    pac::USART2.cr3().modify(|w| w.set_dmat(true));
    pac::USART2.cr1().modify(|w| {
        w.set_te(true);
        w.set_ue(true);
    });

    dispatch::os_dispatch_register_completion(SERIAL_TX, Some(serial_complete_handler))?;

    unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::DMA1_STREAM6) };

    crate::info!("serial tx ready at {=u32} baud", baud);
    Ok(())
}

/// Initialize the tick timer.
///
/// Runs TIM7 from the given APB1 timer clock at the configured tick
/// period and enables its update interrupt. Call
/// [`crate::timeout::os_timeout_init`] with [`TICK_TIMER`] to route the
/// ticks into the timeout registry.
pub fn tick_init(apb1_timer_hz: u32) -> OsResult<()> {
    pac::RCC.apb1enr().modify(|w| w.set_tim7en(true));

    let tim = pac::TIM7;

    // 10 kHz counter; one update every CFG_TICK_PERIOD_MS
    tim.psc().write(|w| w.0 = apb1_timer_hz / 10_000 - 1);
    tim.arr().write(|w| w.0 = CFG_TICK_PERIOD_MS * 10 - 1);
    tim.egr().write(|w| w.set_ug(true));
    tim.sr().modify(|w| w.set_uif(false));
    tim.dier().modify(|w| w.set_uie(true));
    tim.cr1().modify(|w| w.set_cen(true));

    unsafe { cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM7) };

    crate::info!("tick timer running at {=u32} ms period", CFG_TICK_PERIOD_MS);
    Ok(())
}

// ============ Upstream API ============

/// Queue bytes on the global transmit pipeline.
///
/// Returns immediately; the accepted bytes drain in DMA bursts. Bytes
/// beyond the free ring capacity are dropped and counted.
///
/// # Returns
/// * `Ok(accepted)` - Number of bytes queued
/// * `Err(OsError::SubmitIsr)` - Called from interrupt context
/// * `Err(OsError::TransferFailed)` - Hardware refused the first burst
pub fn os_serial_submit(bytes: &[u8]) -> OsResult<usize> {
    if is_isr_context() {
        return Err(OsError::SubmitIsr);
    }

    critical_section(|cs| {
        let serial = SERIAL.get(cs);
        let accepted = serial.submit(bytes)?;
        TX_ACTIVE.store(!serial.is_idle(), Ordering::Relaxed);
        Ok(accepted)
    })
}

/// Check whether transmit activity is in flight (activity indicator)
#[inline]
pub fn os_serial_active() -> bool {
    TX_ACTIVE.load(Ordering::Relaxed)
}

/// Total bytes dropped to ring overflow
pub fn os_serial_dropped() -> u32 {
    critical_section(|cs| SERIAL.get(cs).dropped())
}

/// Total hardware transfer faults
pub fn os_serial_faults() -> u32 {
    critical_section(|cs| SERIAL.get(cs).faults())
}

// ============ Raw Vectors ============

/// DMA1 stream 6 interrupt vector (USART2 TX transfer complete)
#[no_mangle]
pub extern "C" fn DMA1_STREAM6() {
    if pac::DMA1.isr(1).read().tcif(2) {
        pac::DMA1.ifcr(1).write(|w| w.set_tcif(2, true));
        dispatch::os_dispatch_completion(SERIAL_TX);
    }
}

/// TIM7 interrupt vector (timeout tick)
#[no_mangle]
pub extern "C" fn TIM7() {
    pac::TIM7.sr().modify(|w| w.set_uif(false));
    dispatch::os_dispatch_elapsed(TICK_TIMER);
}
