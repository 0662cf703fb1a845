//! Unit tests for the transmit pipeline and timeout/dispatch services
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

#[cfg(test)]
mod serial_tests {
    use txtick::config::{CFG_TX_BURST_MAX, CFG_TX_RING_CAPACITY};
    use txtick::error::{OsError, OsResult};
    use txtick::serial::{SerialTx, TxSink};

    /// Records every burst the pipeline hands to the hardware.
    struct MockSink {
        bursts: Vec<Vec<u8>>,
        fail_next: bool,
    }

    impl MockSink {
        fn new() -> Self {
            MockSink {
                bursts: Vec::new(),
                fail_next: false,
            }
        }

        fn transmitted(&self) -> Vec<u8> {
            self.bursts.concat()
        }
    }

    impl TxSink for MockSink {
        fn start_transfer(&mut self, bytes: &[u8]) -> OsResult<()> {
            if self.fail_next {
                self.fail_next = false;
                return Err(OsError::TransferFailed);
            }
            self.bursts.push(bytes.to_vec());
            Ok(())
        }
    }

    /// Deliver completions until the channel goes idle.
    fn run_to_idle(serial: &mut SerialTx<MockSink>) {
        while serial.is_busy() {
            serial.on_transfer_complete();
        }
    }

    #[test]
    fn test_bytes_flow_in_order() {
        let mut serial = SerialTx::new(MockSink::new());

        let payload: Vec<u8> = (0..=255u8).cycle().take(250).collect();
        assert_eq!(serial.submit(&payload).unwrap(), 250);

        // First burst primed immediately, bounded at the burst maximum
        assert!(serial.is_busy());
        assert_eq!(serial.sink_mut().bursts[0].len(), CFG_TX_BURST_MAX);

        run_to_idle(&mut serial);

        assert!(serial.is_idle());
        assert_eq!(serial.sink_mut().transmitted(), payload);
        assert_eq!(serial.sink_mut().bursts.len(), 3);
    }

    #[test]
    fn test_submit_while_burst_in_flight() {
        let mut serial = SerialTx::new(MockSink::new());

        assert_eq!(serial.submit(b"first,").unwrap(), 6);
        assert!(serial.is_busy());

        // Second payload lands while the first burst is still in flight
        assert_eq!(serial.submit(b"second").unwrap(), 6);

        run_to_idle(&mut serial);
        assert_eq!(serial.sink_mut().transmitted(), b"first,second");
    }

    #[test]
    fn test_overflow_drops_exactly_the_excess() {
        let mut serial = SerialTx::new(MockSink::new());
        let usable = CFG_TX_RING_CAPACITY - 1;

        let first = vec![0x11u8; 500];
        assert_eq!(serial.submit(&first).unwrap(), 500);

        // 100 bytes are in flight but not yet retired, so free space is
        // still measured against all 500 pending bytes
        let second = vec![0x22u8; 600];
        let accepted = serial.submit(&second).unwrap();
        assert_eq!(accepted, usable - 500);
        assert_eq!(serial.dropped() as usize, 600 - accepted);

        run_to_idle(&mut serial);

        let mut expected = first.clone();
        expected.extend_from_slice(&second[..accepted]);
        assert_eq!(serial.sink_mut().transmitted(), expected);
    }

    #[test]
    fn test_zero_length_submit() {
        let mut serial = SerialTx::new(MockSink::new());
        assert_eq!(serial.submit(&[]).unwrap(), 0);
        assert!(serial.is_idle());
        assert!(serial.sink_mut().bursts.is_empty());
    }

    #[test]
    fn test_transfer_failure_surfaces_and_recovers() {
        let mut serial = SerialTx::new(MockSink::new());

        serial.sink_mut().fail_next = true;
        assert_eq!(serial.submit(b"lost?"), Err(OsError::TransferFailed));
        assert_eq!(serial.faults(), 1);

        // The burst never started; the bytes stay pending and the next
        // submit retries them in order
        assert!(!serial.is_busy());
        assert_eq!(serial.pending(), 5);

        assert_eq!(serial.submit(b" no").unwrap(), 3);
        run_to_idle(&mut serial);
        assert_eq!(serial.sink_mut().transmitted(), b"lost? no");
    }

    #[test]
    fn test_failure_inside_completion_goes_idle() {
        let mut serial = SerialTx::new(MockSink::new());

        let payload = vec![0x33u8; 150];
        serial.submit(&payload).unwrap();

        // Completion of the first burst tries to prime the second and
        // the hardware refuses; the handler must not stall
        serial.sink_mut().fail_next = true;
        assert!(serial.on_transfer_complete());
        assert_eq!(serial.faults(), 1);
        assert!(!serial.is_busy());
        assert_eq!(serial.pending(), 50);
    }

    #[test]
    fn test_spurious_completion_is_noop() {
        let mut serial = SerialTx::new(MockSink::new());
        assert!(serial.on_transfer_complete());
        assert!(serial.is_idle());
    }

    #[test]
    fn test_ring_wraps_across_many_submissions() {
        let mut serial = SerialTx::new(MockSink::new());
        let mut expected = Vec::new();

        for round in 0..40u32 {
            let chunk: Vec<u8> = (0..97u8).map(|i| i.wrapping_add(round as u8)).collect();
            assert_eq!(serial.submit(&chunk).unwrap(), chunk.len());
            expected.extend_from_slice(&chunk);
            run_to_idle(&mut serial);
        }

        assert_eq!(serial.sink_mut().transmitted(), expected);
    }
}

#[cfg(test)]
mod timeout_tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use txtick::config::{CFG_TICK_PERIOD_MS, CFG_TIMEOUT_SLOTS};
    use txtick::error::OsError;
    use txtick::timeout::TimeoutTable;

    fn nop() {}

    #[test]
    fn test_fires_exactly_once_after_three_ticks() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn cb() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = TimeoutTable::new();
        table.register(cb, 3 * CFG_TICK_PERIOD_MS).unwrap();

        table.on_tick();
        table.on_tick();
        assert_eq!(FIRED.load(Ordering::SeqCst), 0);

        table.on_tick();
        assert_eq!(FIRED.load(Ordering::SeqCst), 1);

        // The slot is free again; further ticks never re-fire it
        table.on_tick();
        table.on_tick();
        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        assert_eq!(table.armed(), 0);
    }

    #[test]
    fn test_unregister_before_fire() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn cb() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = TimeoutTable::new();
        let handle = table.register(cb, 2 * CFG_TICK_PERIOD_MS).unwrap();
        table.unregister(handle).unwrap();

        for _ in 0..10 {
            table.on_tick();
        }
        assert_eq!(FIRED.load(Ordering::SeqCst), 0);

        // Unregistering a freed slot stays Ok
        table.unregister(handle).unwrap();
    }

    #[test]
    fn test_distinct_delays_fire_in_delay_order() {
        static SEQ: AtomicU32 = AtomicU32::new(0);
        static AT_30: AtomicU32 = AtomicU32::new(0);
        static AT_10: AtomicU32 = AtomicU32::new(0);
        static AT_20: AtomicU32 = AtomicU32::new(0);

        fn cb_30() {
            AT_30.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
        }
        fn cb_10() {
            AT_10.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
        }
        fn cb_20() {
            AT_20.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
        }

        let mut table = TimeoutTable::new();
        // Registration order deliberately differs from delay order
        table.register(cb_30, 30).unwrap();
        table.register(cb_10, 10).unwrap();
        table.register(cb_20, 20).unwrap();

        for _ in 0..4 {
            table.on_tick();
        }

        let (t10, t20, t30) = (
            AT_10.load(Ordering::SeqCst),
            AT_20.load(Ordering::SeqCst),
            AT_30.load(Ordering::SeqCst),
        );
        assert!(t10 != 0 && t20 != 0 && t30 != 0);
        assert!(t10 < t20 && t20 < t30);
    }

    #[test]
    fn test_equal_delays_fire_same_tick_in_slot_order() {
        static SEQ: AtomicU32 = AtomicU32::new(0);
        static FIRST: AtomicU32 = AtomicU32::new(0);
        static SECOND: AtomicU32 = AtomicU32::new(0);

        fn cb_first() {
            FIRST.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
        }
        fn cb_second() {
            SECOND.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
        }

        let mut table = TimeoutTable::new();
        let a = table.register(cb_first, 20).unwrap();
        let b = table.register(cb_second, 20).unwrap();
        assert!(a.index() < b.index());

        table.on_tick();
        assert_eq!(SEQ.load(Ordering::SeqCst), 0);

        table.on_tick();
        // Both fired on this tick, lower slot index first
        assert_eq!(FIRST.load(Ordering::SeqCst), 1);
        assert_eq!(SECOND.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_full_table_fails_closed() {
        let mut table = TimeoutTable::new();

        let mut handles = Vec::new();
        for _ in 0..CFG_TIMEOUT_SLOTS {
            handles.push(table.register(nop, 100).unwrap());
        }
        assert_eq!(table.register(nop, 100), Err(OsError::NoFreeSlot));

        table.unregister(handles[7]).unwrap();
        let reused = table.register(nop, 100).unwrap();
        assert_eq!(reused.index(), handles[7].index());
    }

    #[test]
    fn test_sub_tick_delay_arms_for_next_tick() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn cb() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = TimeoutTable::new();
        // Shorter than one tick period: still arms rather than aliasing
        // with the free-slot sentinel
        let handle = table.register(cb, CFG_TICK_PERIOD_MS / 2).unwrap();
        assert_eq!(table.remaining(handle), Some(1));

        table.on_tick();
        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_recycling_keeps_handles_stable() {
        let mut table = TimeoutTable::new();

        let a = table.register(nop, 50).unwrap();
        let b = table.register(nop, 50).unwrap();
        assert_ne!(a.index(), b.index());
        assert_eq!(table.armed(), 2);

        table.unregister(a).unwrap();
        assert_eq!(table.armed(), 1);
        assert_eq!(table.remaining(a), None);
        assert_eq!(table.remaining(b), Some(5));
    }
}

#[cfg(test)]
mod dispatch_tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use txtick::config::CFG_DISPATCH_SLOTS;
    use txtick::dispatch::DispatchTable;
    use txtick::error::OsError;
    use txtick::types::{EventKind, PeripheralId};

    const UART: PeripheralId = PeripheralId::new(0x4000_4400);
    const TIMER: PeripheralId = PeripheralId::new(0x4000_1400);

    fn nop() {}

    #[test]
    fn test_unregistered_identity_is_noop() {
        let table = DispatchTable::new();
        assert!(!table.dispatch(UART, EventKind::Completion));
        assert!(!table.dispatch(TIMER, EventKind::Elapsed));
    }

    #[test]
    fn test_completion_and_elapsed_are_independent() {
        static COMPLETIONS: AtomicU32 = AtomicU32::new(0);
        static ELAPSED: AtomicU32 = AtomicU32::new(0);

        fn on_completion() {
            COMPLETIONS.fetch_add(1, Ordering::SeqCst);
        }
        fn on_elapsed() {
            ELAPSED.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = DispatchTable::new();
        table
            .register(UART, EventKind::Completion, Some(on_completion))
            .unwrap();
        table
            .register(UART, EventKind::Elapsed, Some(on_elapsed))
            .unwrap();

        // Both kinds share one table entry
        assert_eq!(table.claimed(), 1);

        assert!(table.dispatch(UART, EventKind::Completion));
        assert_eq!(COMPLETIONS.load(Ordering::SeqCst), 1);
        assert_eq!(ELAPSED.load(Ordering::SeqCst), 0);

        assert!(table.dispatch(UART, EventKind::Elapsed));
        assert_eq!(ELAPSED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_later_registration_overwrites() {
        static OLD: AtomicU32 = AtomicU32::new(0);
        static NEW: AtomicU32 = AtomicU32::new(0);

        fn old_handler() {
            OLD.fetch_add(1, Ordering::SeqCst);
        }
        fn new_handler() {
            NEW.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = DispatchTable::new();
        table
            .register(TIMER, EventKind::Elapsed, Some(old_handler))
            .unwrap();
        table
            .register(TIMER, EventKind::Elapsed, Some(new_handler))
            .unwrap();

        assert!(table.dispatch(TIMER, EventKind::Elapsed));
        assert_eq!(OLD.load(Ordering::SeqCst), 0);
        assert_eq!(NEW.load(Ordering::SeqCst), 1);
        assert_eq!(table.claimed(), 1);
    }

    #[test]
    fn test_none_clears_a_registration() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn handler() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let mut table = DispatchTable::new();
        table
            .register(UART, EventKind::Completion, Some(handler))
            .unwrap();
        table.register(UART, EventKind::Completion, None).unwrap();

        assert!(!table.dispatch(UART, EventKind::Completion));
        assert_eq!(FIRED.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_table_fails_closed_when_full() {
        let mut table = DispatchTable::new();

        for i in 0..CFG_DISPATCH_SLOTS {
            table
                .register(
                    PeripheralId::new(0x4000_0000 + i as u32 * 0x400),
                    EventKind::Completion,
                    Some(nop),
                )
                .unwrap();
        }

        let extra = PeripheralId::new(0x5000_0000);
        assert_eq!(
            table.register(extra, EventKind::Completion, Some(nop)),
            Err(OsError::DispatchFull)
        );

        // Clearing an identity the table never knew is a harmless no-op
        table.register(extra, EventKind::Completion, None).unwrap();
    }
}

#[cfg(test)]
mod service_tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use txtick::types::PeripheralId;
    use txtick::{os_dispatch_elapsed, os_time_get, os_timeout_init, os_timeout_register};

    // The one test that exercises the global service instances: a raw
    // vector's elapsed event routed through the dispatch table into the
    // timeout registry.
    #[test]
    fn test_tick_routing_through_dispatch() {
        static FIRED: AtomicU32 = AtomicU32::new(0);
        fn cb() {
            FIRED.fetch_add(1, Ordering::SeqCst);
        }

        let tick_source = PeripheralId::new(0x4000_1400);
        os_timeout_init(tick_source).unwrap();
        os_timeout_register(cb, 20).unwrap();

        let before = os_time_get();
        assert!(os_dispatch_elapsed(tick_source));
        assert!(os_dispatch_elapsed(tick_source));

        assert_eq!(FIRED.load(Ordering::SeqCst), 1);
        assert_eq!(os_time_get() - before, 2);
    }
}

#[cfg(test)]
mod error_tests {
    use txtick::error::OsError;

    #[test]
    fn test_error_variants() {
        assert!(OsError::None.is_ok());
        assert!(!OsError::None.is_err());

        assert!(!OsError::NoFreeSlot.is_ok());
        assert!(OsError::NoFreeSlot.is_err());

        assert_eq!(OsError::None, OsError::None);
        assert_ne!(OsError::TransferFailed, OsError::NoFreeSlot);
    }

    #[test]
    fn test_error_debug() {
        // Ensure errors can be formatted for debugging
        let err = OsError::SubmitIsr;
        let _ = format!("{:?}", err);
    }
}

#[cfg(test)]
mod config_tests {
    use txtick::config::*;

    #[test]
    fn test_config_values() {
        assert!(CFG_TX_BURST_MAX >= 1, "Burst must carry at least a byte");
        assert!(
            CFG_TX_BURST_MAX < CFG_TX_RING_CAPACITY,
            "Burst cannot exceed the ring"
        );
        assert!(
            CFG_TX_RING_CAPACITY <= u16::MAX as usize,
            "DMA counter is 16 bits"
        );

        assert!(CFG_TICK_PERIOD_MS >= 1, "Tick period too short");
        assert!(CFG_TICK_PERIOD_MS <= 1000, "Tick period too long");

        assert!(CFG_TIMEOUT_SLOTS >= 1);
        assert!(CFG_TIMEOUT_SLOTS <= u8::MAX as usize, "Handles are u8");

        assert!(CFG_DISPATCH_SLOTS >= 2, "Need at least UART + tick timer");
    }
}
