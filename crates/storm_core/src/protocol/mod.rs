/*
    Storm
    68k bus bridge and peripheral emulator

    Copyright 2025 The Storm Authors

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    protocol/mod.rs

    Bus transaction engine

*/

//! The bus transaction engine bit-bangs the peer's multiplexed protocol. Every cycle
//! presents a register select plus the low address half on the first write strobe,
//! the high address half on the second, then either a data word on a third strobe
//! (writes) or an output-enable handshake (reads). Completion is paced entirely by
//! the peer on AUX0; there is no timeout.
//!
//! The engine is not reentrant and must be driven from a single thread.

pub mod clock;
pub mod pins;
pub mod sim;
pub mod status;
pub mod window;

use std::hint::spin_loop;

use crate::{
    bus::PeerBus,
    protocol::{
        clock::setup_gpclk,
        pins::*,
        status::{STATUS_BIT_INIT, STATUS_BIT_RESET},
        window::PeripheralWindow,
    },
};

pub const INIT_HOLD_US: u64 = 1500;
pub const INIT_SETTLE_US: u64 = 100;
pub const RESET_SETTLE_US: u64 = 100_000;

/// Pins we drive as outputs besides the data lines.
const CONTROL_PINS: [u32; 5] = [PIN_SA2, PIN_SA1, PIN_SA0, PIN_SOE, PIN_SWE];

pub struct Protocol<W: PeripheralWindow> {
    window: W,
    sd_output: DirectionSnapshot,
    sd_input: DirectionSnapshot,
    initialized: bool,
}

impl<W: PeripheralWindow> Protocol<W> {
    pub fn new(window: W) -> Self {
        Self {
            window,
            sd_output: DirectionSnapshot::default(),
            sd_input: DirectionSnapshot::default(),
            initialized: false,
        }
    }

    /// Start the peer clock, configure pin directions and precompute the two data line
    /// direction snapshots. Must be called before any transaction.
    pub fn init(&mut self) {
        setup_gpclk(&mut self.window);

        set_pin_mode(&mut self.window, PIN_AUX0, PinMode::Input);
        set_pin_mode(&mut self.window, PIN_AUX1, PinMode::Input);

        for pin in CONTROL_PINS {
            set_pin_mode(&mut self.window, pin, PinMode::Output);
        }

        for i in 0..SD_COUNT {
            set_pin_mode(&mut self.window, pin_sd(i), PinMode::Output);
        }
        self.sd_output = DirectionSnapshot::capture(&self.window);

        for i in 0..SD_COUNT {
            set_pin_mode(&mut self.window, pin_sd(i), PinMode::Input);
        }
        self.sd_input = DirectionSnapshot::capture(&self.window);

        // Idle: select parked on read16, both strobes deasserted.
        self.window.gpio_clear((1 << PIN_SA2) | (1 << PIN_SA1));
        self.window.gpio_set(1 << PIN_SA0);
        self.window.gpio_set(SOE_BIT | SWE_BIT);

        self.initialized = true;
        log::debug!("Bus protocol initialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn output_snapshot(&self) -> &DirectionSnapshot {
        &self.sd_output
    }

    pub fn input_snapshot(&self) -> &DirectionSnapshot {
        &self.sd_input
    }

    #[inline]
    fn drive_data_lines(&mut self) {
        self.sd_output.apply(&mut self.window);
    }

    #[inline]
    fn release_data_lines(&mut self) {
        self.sd_input.apply(&mut self.window);
    }

    #[inline]
    fn strobe_write(&mut self) {
        self.window.gpio_clear(SWE_BIT);
        self.window.gpio_set(SWE_BIT);
    }

    /// Present the select and both address halves. Leaves the data lines driven.
    #[inline]
    fn begin_cycle(&mut self, select: Select, address: u32) {
        self.drive_data_lines();

        self.window.gpio_clear(SD_MASK | SA_MASK);
        self.window.gpio_set(((address & 0xFFFF) << SD_SHIFT) | select.pins());
        self.strobe_write();

        self.window.gpio_clear(SD_MASK);
        self.window.gpio_set(((address >> 16) & 0xFFFF) << SD_SHIFT);
        self.strobe_write();
    }

    #[inline]
    fn write_cycle(&mut self, select: Select, address: u32, data: u16) {
        self.begin_cycle(select, address);

        self.window.gpio_clear(SD_MASK);
        self.window.gpio_set((data as u32) << SD_SHIFT);
        self.strobe_write();

        self.release_data_lines();

        while self.window.gpio_level() & AUX0_BIT != 0 {
            spin_loop();
        }
    }

    #[inline]
    fn read_cycle(&mut self, select: Select, address: u32) -> u16 {
        self.begin_cycle(select, address);
        self.release_data_lines();

        self.window.gpio_clear(SOE_BIT);
        while self.window.gpio_level() & AUX0_BIT == 0 {
            spin_loop();
        }
        // Second assert is a settle delay before sampling.
        self.window.gpio_clear(SOE_BIT);
        let levels = self.window.gpio_level();
        self.window.gpio_set(SOE_BIT);

        ((levels >> SD_SHIFT) & 0xFFFF) as u16
    }

    /// Write the status pseudo-register. Only INIT and RESET are meaningful.
    pub fn write_status_reg(&mut self, value: u16) {
        self.drive_data_lines();

        self.window.gpio_clear(SD_MASK | SA_MASK);
        self.window.gpio_set(((value as u32) << SD_SHIFT) | Select::Status.pins());

        // Doubled accesses stretch the strobe.
        self.window.gpio_clear(SWE_BIT);
        self.window.gpio_clear(SWE_BIT);
        self.window.gpio_set(SWE_BIT);
        self.window.gpio_set(SWE_BIT);

        self.release_data_lines();
    }

    /// Read the status pseudo-register. Data lines are already released between cycles.
    pub fn read_status_reg(&mut self) -> u16 {
        self.window.gpio_clear(SA_MASK);
        self.window.gpio_set(Select::Status.pins());

        for _ in 0..4 {
            self.window.gpio_clear(SOE_BIT);
        }
        let levels = self.window.gpio_level();
        self.window.gpio_set(SOE_BIT);

        ((levels >> SD_SHIFT) & 0xFFFF) as u16
    }

    /// Synchronize the peer's protocol state machine. Run once after init().
    pub fn reset_state_machine(&mut self) {
        self.write_status_reg(STATUS_BIT_INIT);
        self.window.delay_us(INIT_HOLD_US);
        self.write_status_reg(0);
        self.window.delay_us(INIT_SETTLE_US);
    }

    /// Drop all status bits, wait out a power-on style settle, then assert RESET and
    /// leave it asserted. Transactions continue to work while RESET is asserted.
    pub fn pulse_reset(&mut self) {
        self.write_status_reg(0);
        self.window.delay_us(RESET_SETTLE_US);
        self.write_status_reg(STATUS_BIT_RESET);
    }

    /// Whether another bus master currently holds the 68k bus (AUX1).
    #[inline]
    pub fn aux1(&self) -> bool {
        self.window.gpio_level() & AUX1_BIT != 0
    }
}

impl<W: PeripheralWindow> PeerBus for Protocol<W> {
    #[inline]
    fn read_u8(&mut self, address: u32) -> u8 {
        let word = self.read_cycle(Select::Read8, address);
        // Even addresses come back on the upper lane (UDS), odd on the lower (LDS).
        if address & 1 == 0 {
            (word >> 8) as u8
        }
        else {
            word as u8
        }
    }

    #[inline]
    fn read_u16(&mut self, address: u32) -> u16 {
        self.read_cycle(Select::Read16, address)
    }

    #[inline]
    fn write_u8(&mut self, address: u32, data: u8) {
        // Both lanes carry the byte; A0 tells the peer which one to latch.
        let word = u16::from_be_bytes([data, data]);
        self.write_cycle(Select::Write8, address, word);
    }

    #[inline]
    fn write_u16(&mut self, address: u32, data: u16) {
        self.write_cycle(Select::Write16, address, data);
    }

    fn read_status(&mut self) -> u16 {
        self.read_status_reg()
    }

    fn write_status(&mut self, value: u16) {
        self.write_status_reg(value)
    }

    fn bus_arbitration(&mut self) -> bool {
        self.aux1()
    }
}
