//! Heartbeat Example - one-shot timeouts re-armed from normal context

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use portable_atomic::{AtomicBool, Ordering};
use stm32_metapac as pac;

use txtick::port::{tick_init, TICK_TIMER};
use txtick::{os_timeout_init, os_timeout_register};

/// APB1 timer clock after reset (HSI, no prescalers)
const APB1_TIMER_HZ: u32 = 16_000_000;

/// Beat period in milliseconds
const BEAT_MS: u32 = 500;

/// Set from the timeout callback, consumed by the main loop
static BEAT: AtomicBool = AtomicBool::new(false);

fn on_beat() {
    // Interrupt context: just flag the beat; re-arming happens outside
    BEAT.store(true, Ordering::Relaxed);
}

// ============ Heartbeat LED (PG14 on the F429 Discovery) ============

fn led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpiogen(true));
    pac::GPIOG.moder().modify(|w| w.set_moder(14, pac::gpio::vals::Moder::OUTPUT));
}

fn led_set(on: bool) {
    pac::GPIOG.bsrr().write(|w| {
        if on {
            w.set_bs(14, true);
        } else {
            w.set_br(14, true);
        }
    });
}

// ============ Main ============

#[entry]
fn main() -> ! {
    led_init();

    tick_init(APB1_TIMER_HZ).expect("tick init failed");
    os_timeout_init(TICK_TIMER).expect("timeout init failed");

    os_timeout_register(on_beat, BEAT_MS).expect("arm failed");
    txtick::info!("heartbeat running");

    let mut led = false;
    loop {
        if BEAT.swap(false, Ordering::Relaxed) {
            led = !led;
            led_set(led);

            // Slots are one-shot; arm the next beat from normal context
            os_timeout_register(on_beat, BEAT_MS).expect("re-arm failed");
        }

        cortex_m::asm::wfi();
    }
}
