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

    interrupt.rs

    Interrupt synthesis: INTENA shadow, virtual INT2 sources and IPL computation

*/

//! The peer reports the live IPL in its status register. On top of that, emulated
//! devices raise INT2 ("external ports") without any hardware behind them. The
//! [InterruptController] merges the two: it mirrors INTENA so it knows whether PORTS
//! interrupts are enabled, folds pending virtual sources into INTREQR reads, and
//! computes the level pushed to the CPU engine once per quantum.
//!
//! Virtual sources are polled, not latched: a source must hold its request until a
//! quantum observes it.

use std::{cell::RefCell, rc::Rc};

use thiserror::Error;

use crate::{bus::PeerBus, cpu::CpuEngine, protocol::status::StatusRegister};

pub const INTENAR: u32 = 0xDFF01C;
pub const INTREQR: u32 = 0xDFF01E;
pub const INTENA: u32 = 0xDFF09A;

pub const INTF_SETCLR: u16 = 0x8000;
pub const INTF_INTEN: u16 = 0x4000;
pub const INTF_PORTS: u16 = 0x0008;

pub const INT2_LEVEL: u8 = 2;
pub const MAX_INT2_SOURCES: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IrqError {
    #[error("no more slots left for INT2 interrupt sources, max={0}")]
    Int2CapacityExceeded(usize),
}

/// An emulated device that can request INT2.
pub trait Int2Source {
    fn check_irq(&self) -> bool;
}

impl<T: Int2Source> Int2Source for Rc<RefCell<T>> {
    fn check_irq(&self) -> bool {
        // A device mid-access cannot be asked; treat it as quiet until the next poll.
        self.try_borrow().map(|source| source.check_irq()).unwrap_or(false)
    }
}

/// Apply a write to INTENA to the shadow copy.
#[inline]
pub fn update_intena_shadow(shadow: u16, value: u16) -> u16 {
    if value & INTF_SETCLR != 0 {
        shadow | (value & !INTF_SETCLR)
    }
    else {
        shadow & !value
    }
}

/// Raise `base` to INT2 when a virtual source is pending and enabled. Never lowers it.
#[inline]
pub fn resolve_ipl(base: u8, int2_enabled: bool, int2_pending: bool) -> u8 {
    if base < INT2_LEVEL && int2_enabled && int2_pending {
        INT2_LEVEL
    }
    else {
        base
    }
}

#[derive(Default)]
pub struct InterruptController {
    intena_shadow: u16,
    sources: Vec<Box<dyn Int2Source>>,
    last_ipl: u8,
}

impl InterruptController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a virtual INT2 source. Boot phase only; fails once the registry is full.
    pub fn add_int2_source(&mut self, source: Box<dyn Int2Source>) -> Result<usize, IrqError> {
        if self.sources.len() == MAX_INT2_SOURCES {
            return Err(IrqError::Int2CapacityExceeded(MAX_INT2_SOURCES));
        }
        self.sources.push(source);
        Ok(self.sources.len() - 1)
    }

    pub fn int2_source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn intena_shadow(&self) -> u16 {
        self.intena_shadow
    }

    pub fn last_ipl(&self) -> u8 {
        self.last_ipl
    }

    /// Both the master enable and PORTS are set in the shadow.
    pub fn int2_enabled(&self) -> bool {
        self.intena_shadow & (INTF_INTEN | INTF_PORTS) == (INTF_INTEN | INTF_PORTS)
    }

    pub fn int2_pending(&self) -> bool {
        self.sources.iter().any(|source| source.check_irq())
    }

    /// Read INTENAR from the bus and refresh the shadow from it.
    pub fn read_intenar(&mut self, bus: &mut dyn PeerBus) -> u16 {
        let value = bus.read_u16(INTENAR);
        self.intena_shadow = value;
        value
    }

    /// Read INTREQR from the bus, with PORTS set while any virtual source is pending.
    pub fn read_intreqr(&self, bus: &mut dyn PeerBus) -> u16 {
        let value = bus.read_u16(INTREQR);
        if self.int2_pending() {
            value | INTF_PORTS
        }
        else {
            value
        }
    }

    /// Write INTENA through to the bus and apply it to the shadow.
    pub fn write_intena(&mut self, bus: &mut dyn PeerBus, value: u16) {
        bus.write_u16(INTENA, value);
        self.intena_shadow = update_intena_shadow(self.intena_shadow, value);
    }

    /// Compute the effective IPL and push it to the CPU engine. Called once per quantum.
    pub fn compute_irq_level(&mut self, bus: &mut dyn PeerBus, cpu: &mut dyn CpuEngine) -> u8 {
        let base = if !bus.bus_arbitration() {
            StatusRegister::from(bus.read_status()).ipl()
        }
        else {
            0
        };

        let ipl = resolve_ipl(base, self.int2_enabled(), self.int2_pending());
        if ipl != self.last_ipl {
            log::trace!("IPL {} -> {}", self.last_ipl, ipl);
            self.last_ipl = ipl;
        }
        cpu.set_irq(ipl);
        ipl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cpu::CpuMemory,
        protocol::{sim::SimulatedPeer, Protocol},
    };
    use std::cell::Cell;

    struct Flag(Rc<Cell<bool>>);

    impl Int2Source for Flag {
        fn check_irq(&self) -> bool {
            self.0.get()
        }
    }

    fn flag() -> (Rc<Cell<bool>>, Box<Flag>) {
        let state = Rc::new(Cell::new(false));
        (state.clone(), Box::new(Flag(state)))
    }

    #[derive(Default)]
    struct IplRecorder {
        levels: Vec<u8>,
    }

    impl CpuEngine for IplRecorder {
        fn execute(&mut self, cycles: u32, _memory: &mut dyn CpuMemory) -> u32 {
            cycles
        }
        fn set_irq(&mut self, level: u8) {
            self.levels.push(level);
        }
    }

    fn bus() -> Protocol<SimulatedPeer> {
        let mut bus = Protocol::new(SimulatedPeer::new());
        bus.init();
        bus
    }

    #[test]
    fn shadow_update_law() {
        let values = [0x0000, 0x0008, 0x4000, 0x4008, 0x7FFF, 0x8000, 0x8008, 0xC008, 0xFFFF, 0x1234, 0x9234];
        for shadow in values {
            for v in values {
                let expected = if v & INTF_SETCLR != 0 {
                    shadow | (v & !INTF_SETCLR)
                }
                else {
                    shadow & !v
                };
                assert_eq!(update_intena_shadow(shadow, v), expected);
                // SETCLR itself never lands in the shadow through a set.
                if v & INTF_SETCLR != 0 {
                    assert_eq!(update_intena_shadow(shadow, v) & INTF_SETCLR, shadow & INTF_SETCLR);
                }
            }
        }
        assert_eq!(update_intena_shadow(0, INTF_SETCLR | INTF_INTEN | INTF_PORTS), 0x4008);
        assert_eq!(update_intena_shadow(0x4008, INTF_PORTS), 0x4000);
    }

    #[test]
    fn ipl_resolution() {
        for base in 0..=7u8 {
            for enabled in [false, true] {
                for pending in [false, true] {
                    let ipl = resolve_ipl(base, enabled, pending);
                    assert!(ipl >= base);
                    if enabled && pending && base < 2 {
                        assert_eq!(ipl, 2);
                    }
                    else {
                        assert_eq!(ipl, base);
                    }
                }
            }
        }
    }

    #[test]
    fn registry_capacity() {
        let mut irq = InterruptController::new();
        for i in 0..MAX_INT2_SOURCES {
            assert_eq!(irq.add_int2_source(flag().1), Ok(i));
        }
        assert_eq!(
            irq.add_int2_source(flag().1),
            Err(IrqError::Int2CapacityExceeded(MAX_INT2_SOURCES))
        );
        assert_eq!(irq.int2_source_count(), MAX_INT2_SOURCES);
    }

    #[test]
    fn intenar_refreshes_shadow() {
        let mut bus = bus();
        let mut irq = InterruptController::new();
        bus.window_mut().poke_u16(INTENAR, 0x4008);

        assert_eq!(irq.read_intenar(&mut bus), 0x4008);
        assert_eq!(irq.intena_shadow(), 0x4008);
        assert!(irq.int2_enabled());
    }

    #[test]
    fn intena_write_passes_through() {
        let mut bus = bus();
        let mut irq = InterruptController::new();

        irq.write_intena(&mut bus, INTF_SETCLR | INTF_INTEN | INTF_PORTS);
        assert_eq!(bus.window().peek_u16(INTENA), 0xC008);
        assert!(irq.int2_enabled());

        irq.write_intena(&mut bus, INTF_PORTS);
        assert_eq!(irq.intena_shadow(), INTF_INTEN);
        assert!(!irq.int2_enabled());
    }

    #[test]
    fn intreqr_merge() {
        let mut bus = bus();
        let mut irq = InterruptController::new();
        bus.window_mut().poke_u16(INTREQR, 0x0020);

        // Empty registry: raw value exactly.
        assert_eq!(irq.read_intreqr(&mut bus), 0x0020);

        let (state, source) = flag();
        irq.add_int2_source(source).unwrap();
        assert_eq!(irq.read_intreqr(&mut bus), 0x0020);
        state.set(true);
        assert_eq!(irq.read_intreqr(&mut bus), 0x0020 | INTF_PORTS);
    }

    #[test]
    fn irq_level_from_status_and_sources() {
        let mut bus = bus();
        let mut irq = InterruptController::new();
        let mut cpu = IplRecorder::default();
        let (state, source) = flag();
        irq.add_int2_source(source).unwrap();

        bus.window_mut().set_ipl(1);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 1);

        // Pending but not enabled.
        state.set(true);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 1);

        irq.write_intena(&mut bus, INTF_SETCLR | INTF_INTEN | INTF_PORTS);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 2);

        // A higher hardware level wins.
        bus.window_mut().set_ipl(4);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 4);

        // Bus held by another master: the status register is not consulted.
        bus.window_mut().set_bus_arbitration(true);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 2);
        state.set(false);
        assert_eq!(irq.compute_irq_level(&mut bus, &mut cpu), 0);

        assert_eq!(cpu.levels, vec![1, 1, 2, 4, 2, 0]);
        assert_eq!(irq.last_ipl(), 0);
    }

    #[test]
    fn shared_source_reads_through_cell() {
        struct Drive {
            pending: bool,
        }
        impl Int2Source for Drive {
            fn check_irq(&self) -> bool {
                self.pending
            }
        }

        let drive = Rc::new(RefCell::new(Drive { pending: false }));
        let mut irq = InterruptController::new();
        irq.add_int2_source(Box::new(drive.clone())).unwrap();
        assert!(!irq.int2_pending());

        drive.borrow_mut().pending = true;
        assert!(irq.int2_pending());

        let _busy = drive.borrow_mut();
        assert!(!irq.int2_pending());
    }
}
