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

    protocol/sim.rs

    Simulated peer. Decodes engine pin activity the way the peer's protocol logic does.

*/

//! [SimulatedPeer] stands in for the mapped peripheral block. It tracks the pin levels
//! the engine drives, reacts to strobe edges as the peer's protocol logic would, and
//! answers from a sparse big-endian memory. It backs the test suite and the headless
//! front end's simulated backend.

use fxhash::FxHashMap;

use crate::{
    protocol::{
        clock::{CLK_CTL_BUSY, CLK_CTL_ENAB, CLK_CTL_KILL, CLK_GP0_CTL, CLK_GP0_DIV, CLK_PASSWD, CLK_PASSWD_MASK},
        pins::*,
        status::{StatusRegister, STATUS_BIT_INIT, STATUS_BIT_RESET},
        window::{PeripheralWindow, GPCLK_BASE_WORD, GPIO_BASE_WORD},
    },
    ADDRESS_MASK,
};

const GPFSEL_COUNT: usize = 6;

/// One completed data cycle as seen by the peer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PeerCycle {
    pub select: Select,
    pub address: u32,
    pub data: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    AddressHigh,
    Data,
    AwaitOutputEnable,
}

pub struct SimulatedPeer {
    fsel: [u32; GPFSEL_COUNT],
    latch: u32,
    pull: [u32; 2],
    clk_ctl: u32,
    clk_div: u32,

    phase: Phase,
    select: Select,
    address: u32,
    presented: Option<u16>,
    ack: bool,
    aux1: bool,
    status: u16,
    ipl: u8,

    memory: FxHashMap<u32, u8>,

    trace: bool,
    cycles: Vec<PeerCycle>,
    status_writes: Vec<u16>,
    faults: u32,
    elapsed_us: u64,
}

impl Default for SimulatedPeer {
    fn default() -> Self {
        Self {
            fsel: [0; GPFSEL_COUNT],
            // Strobes idle high.
            latch: SOE_BIT | SWE_BIT,
            pull: [0; 2],
            clk_ctl: 0,
            clk_div: 0,
            phase: Phase::Idle,
            select: Select::Read16,
            address: 0,
            presented: None,
            ack: false,
            aux1: false,
            status: 0,
            ipl: 0,
            memory: FxHashMap::default(),
            trace: false,
            cycles: Vec::new(),
            status_writes: Vec::new(),
            faults: 0,
            elapsed_us: 0,
        }
    }
}

impl SimulatedPeer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the IPL lines the peer reports in the status register.
    pub fn set_ipl(&mut self, ipl: u8) {
        self.ipl = ipl & 0x07;
    }

    /// Drive the bus arbitration line (AUX1).
    pub fn set_bus_arbitration(&mut self, state: bool) {
        self.aux1 = state;
    }

    /// Record completed data cycles. Off by default.
    pub fn set_trace(&mut self, state: bool) {
        self.trace = state;
    }

    pub fn cycles(&self) -> &[PeerCycle] {
        &self.cycles
    }

    pub fn status_writes(&self) -> &[u16] {
        &self.status_writes
    }

    /// The status value the peer would present right now.
    pub fn status(&self) -> u16 {
        u16::from(StatusRegister::from(self.status).with_ipl(self.ipl))
    }

    /// Protocol violations observed: strobes with released data lines, output enable
    /// with driven data lines, or strobes outside a cycle.
    pub fn faults(&self) -> u32 {
        self.faults
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    pub fn clock_running(&self) -> bool {
        self.clk_ctl & CLK_CTL_ENAB != 0 && self.clk_ctl & CLK_CTL_KILL == 0
    }

    pub fn clock_divisor(&self) -> u32 {
        self.clk_div
    }

    pub fn peek_u8(&self, address: u32) -> u8 {
        self.memory.get(&(address & ADDRESS_MASK)).copied().unwrap_or(0)
    }

    pub fn peek_u16(&self, address: u32) -> u16 {
        let address = address & ADDRESS_MASK & !1;
        u16::from_be_bytes([self.peek_u8(address), self.peek_u8(address + 1)])
    }

    pub fn poke_u8(&mut self, address: u32, data: u8) {
        self.memory.insert(address & ADDRESS_MASK, data);
    }

    pub fn poke_u16(&mut self, address: u32, data: u16) {
        let address = address & ADDRESS_MASK & !1;
        let [hi, lo] = data.to_be_bytes();
        self.poke_u8(address, hi);
        self.poke_u8(address + 1, lo);
    }

    fn data_lines_driven(&self) -> bool {
        let fsel = [self.fsel[0], self.fsel[1], self.fsel[2]];
        (0..SD_COUNT).all(|i| pin_mode_bits(&fsel, pin_sd(i)) == PinMode::Output as u32)
    }

    fn levels(&self) -> u32 {
        let mut levels = self.latch & !(AUX0_BIT | AUX1_BIT | SD_MASK);

        if self.data_lines_driven() {
            levels |= self.latch & SD_MASK;
        }
        else if let Some(data) = self.presented {
            levels |= (data as u32) << SD_SHIFT;
        }
        if self.ack {
            levels |= AUX0_BIT;
        }
        if self.aux1 {
            levels |= AUX1_BIT;
        }
        levels
    }

    fn latch_changed(&mut self, old: u32) {
        let rising = !old & self.latch;
        let falling = old & !self.latch;

        if falling & SOE_BIT != 0 {
            self.output_enable();
        }
        if rising & SOE_BIT != 0 {
            self.output_disable();
        }
        if rising & SWE_BIT != 0 {
            self.write_strobe();
        }
    }

    fn write_strobe(&mut self) {
        if !self.data_lines_driven() {
            self.faults += 1;
            return;
        }
        let data = ((self.latch & SD_MASK) >> SD_SHIFT) as u16;

        match self.phase {
            Phase::Idle => match Select::from_pins(self.latch) {
                Some(Select::Status) => self.write_status(data),
                Some(select) => {
                    self.select = select;
                    self.address = data as u32;
                    self.phase = Phase::AddressHigh;
                }
                None => self.faults += 1,
            },
            Phase::AddressHigh => {
                self.address |= ((data & 0xFF) as u32) << 16;
                self.phase = if self.select.is_write() {
                    Phase::Data
                }
                else {
                    Phase::AwaitOutputEnable
                };
            }
            Phase::Data => {
                self.complete_write(data);
                self.phase = Phase::Idle;
            }
            Phase::AwaitOutputEnable => self.faults += 1,
        }
    }

    fn output_enable(&mut self) {
        match self.phase {
            Phase::AwaitOutputEnable => {
                if self.data_lines_driven() {
                    self.faults += 1;
                }
                let data = self.complete_read();
                self.presented = Some(data);
                self.ack = true;
            }
            Phase::Idle if Select::from_pins(self.latch) == Some(Select::Status) => {
                self.presented = Some(self.status());
            }
            _ => self.faults += 1,
        }
    }

    fn output_disable(&mut self) {
        self.presented = None;
        self.ack = false;
        if self.phase == Phase::AwaitOutputEnable {
            self.phase = Phase::Idle;
        }
    }

    fn write_status(&mut self, data: u16) {
        self.status_writes.push(data);
        self.status = data & (STATUS_BIT_INIT | STATUS_BIT_RESET);
        if data & STATUS_BIT_INIT != 0 {
            self.phase = Phase::Idle;
            self.presented = None;
            self.ack = false;
        }
    }

    fn complete_write(&mut self, data: u16) {
        let address = self.address & ADDRESS_MASK;
        match self.select {
            Select::Write16 => self.poke_u16(address, data),
            Select::Write8 => {
                let [hi, lo] = data.to_be_bytes();
                self.poke_u8(address, if address & 1 == 0 { hi } else { lo });
            }
            _ => {
                self.faults += 1;
                return;
            }
        }
        self.record(data);
    }

    fn complete_read(&mut self) -> u16 {
        let address = self.address & ADDRESS_MASK;
        let data = match self.select {
            Select::Read16 => self.peek_u16(address),
            Select::Read8 => {
                let byte = self.peek_u8(address) as u16;
                if address & 1 == 0 {
                    byte << 8
                }
                else {
                    byte
                }
            }
            _ => {
                self.faults += 1;
                0
            }
        };
        self.record(data);
        data
    }

    fn record(&mut self, data: u16) {
        if self.trace {
            self.cycles.push(PeerCycle {
                select: self.select,
                address: self.address,
                data,
            });
        }
    }
}

impl PeripheralWindow for SimulatedPeer {
    fn read(&self, word: usize) -> u32 {
        const FSEL_END: usize = GPIO_BASE_WORD + GPFSEL0 + GPFSEL_COUNT;
        match word {
            w if (GPIO_BASE_WORD + GPFSEL0..FSEL_END).contains(&w) => self.fsel[w - GPIO_BASE_WORD - GPFSEL0],
            w if w == GPIO_BASE_WORD + GPLEV0 => self.levels(),
            w if w == GPIO_BASE_WORD + GPPUD => self.pull[0],
            w if w == GPIO_BASE_WORD + GPPUDCLK0 => self.pull[1],
            w if w == GPCLK_BASE_WORD + CLK_GP0_CTL => {
                if self.clock_running() {
                    self.clk_ctl | CLK_CTL_BUSY
                }
                else {
                    self.clk_ctl
                }
            }
            w if w == GPCLK_BASE_WORD + CLK_GP0_DIV => self.clk_div,
            _ => 0,
        }
    }

    fn write(&mut self, word: usize, value: u32) {
        const FSEL_END: usize = GPIO_BASE_WORD + GPFSEL0 + GPFSEL_COUNT;
        match word {
            w if (GPIO_BASE_WORD + GPFSEL0..FSEL_END).contains(&w) => {
                self.fsel[w - GPIO_BASE_WORD - GPFSEL0] = value;
            }
            w if w == GPIO_BASE_WORD + GPSET0 => {
                let old = self.latch;
                self.latch |= value;
                self.latch_changed(old);
            }
            w if w == GPIO_BASE_WORD + GPCLR0 => {
                let old = self.latch;
                self.latch &= !value;
                self.latch_changed(old);
            }
            w if w == GPIO_BASE_WORD + GPPUD => self.pull[0] = value,
            w if w == GPIO_BASE_WORD + GPPUDCLK0 => self.pull[1] = value,
            w if w == GPCLK_BASE_WORD + CLK_GP0_CTL => {
                if value & CLK_PASSWD_MASK == CLK_PASSWD {
                    self.clk_ctl = value & !CLK_PASSWD_MASK;
                }
            }
            w if w == GPCLK_BASE_WORD + CLK_GP0_DIV => {
                if value & CLK_PASSWD_MASK == CLK_PASSWD {
                    self.clk_div = value & !CLK_PASSWD_MASK;
                }
            }
            _ => {}
        }
    }

    fn delay_us(&mut self, us: u64) {
        self.elapsed_us += us;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::clock::{setup_gpclk, CLK_DIVI};

    #[test]
    fn clock_manager_requires_password() {
        let mut peer = SimulatedPeer::new();
        peer.clock_write(CLK_GP0_CTL, CLK_CTL_ENAB);
        assert!(!peer.clock_running());

        setup_gpclk(&mut peer);
        assert!(peer.clock_running());
        assert_eq!(peer.clock_divisor(), CLK_DIVI);
        assert!(peer.elapsed_us() >= 220);
    }

    #[test]
    fn strobe_with_released_data_lines_is_a_fault() {
        let mut peer = SimulatedPeer::new();
        peer.gpio_clear(SWE_BIT);
        peer.gpio_set(SWE_BIT);
        assert_eq!(peer.faults(), 1);
    }

    #[test]
    fn memory_is_big_endian() {
        let mut peer = SimulatedPeer::new();
        peer.poke_u16(0x10, 0xABCD);
        assert_eq!(peer.peek_u8(0x10), 0xAB);
        assert_eq!(peer.peek_u8(0x11), 0xCD);
        assert_eq!(peer.peek_u16(0x11), 0xABCD);
        assert_eq!(peer.peek_u8(0x1_000_010), 0xAB);
    }

    #[test]
    fn status_carries_ipl() {
        let mut peer = SimulatedPeer::new();
        peer.set_ipl(3);
        assert_eq!(peer.status(), 0x6000);
        peer.set_ipl(0xFF);
        assert_eq!(peer.status(), 0xE000);
    }
}
