//! Serial Hello Example - DMA-driven UART transmit on STM32F429

#![no_std]
#![no_main]

use cortex_m_rt::entry;
use stm32_metapac as pac;

use txtick::port::{os_serial_active, os_serial_submit, serial_init};

/// APB1 clock after reset (HSI, no prescalers)
const APB1_HZ: u32 = 16_000_000;

// ============ Activity LED (PG13 on the F429 Discovery) ============

fn led_init() {
    pac::RCC.ahb1enr().modify(|w| w.set_gpiogen(true));
    pac::GPIOG.moder().modify(|w| w.set_moder(13, pac::gpio::vals::Moder::OUTPUT));
}

fn led_set(on: bool) {
    pac::GPIOG.bsrr().write(|w| {
        if on {
            w.set_bs(13, true);
        } else {
            w.set_br(13, true);
        }
    });
}

// ============ Main ============

#[entry]
fn main() -> ! {
    led_init();

    serial_init(APB1_HZ, 115_200).expect("serial init failed");

    os_serial_submit(b"txtick serial up\r\n").expect("submit failed");

    let mut n: u32 = 0;
    loop {
        let mut line = *b"tick 0\r\n";
        line[5] = b'0' + (n % 10) as u8;
        // Returns immediately; the pipeline drains in 100-byte bursts
        let _ = os_serial_submit(&line);
        n = n.wrapping_add(1);

        // Activity indicator mirrors the in-flight state
        led_set(os_serial_active());

        cortex_m::asm::delay(APB1_HZ / 4);
    }
}
