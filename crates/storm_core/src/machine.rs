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

    machine.rs

    Machine context

*/

//! The [Machine] owns everything the control process touches at run time: the bus
//! engine, the address router with its devices, and the interrupt controller. It is
//! the [CpuMemory] an instruction engine runs against.

use crate::{
    bus::{AddressRouter, DeviceId, MemRangeDescriptor, MemoryMappedDevice, PeerBus, RouterError},
    cpu::{CpuEngine, CpuMemory},
    interrupt::{Int2Source, InterruptController, IrqError},
    protocol::{window::PeripheralWindow, Protocol},
    ADDRESS_MASK,
};

pub const DEFAULT_QUANTUM_CYCLES: u32 = 300;
/// Settle time after reset before the CPU engine is started.
pub const BOOT_SETTLE_US: u64 = 1500;

pub struct Machine<W: PeripheralWindow> {
    bus: Protocol<W>,
    router: AddressRouter,
    irq: InterruptController,
    quantum_cycles: u32,
    cycles: u64,
    quanta: u64,
}

impl<W: PeripheralWindow> Machine<W> {
    pub fn new(window: W, quantum_cycles: u32) -> Self {
        Self {
            bus: Protocol::new(window),
            router: AddressRouter::new(),
            irq: InterruptController::new(),
            quantum_cycles,
            cycles: 0,
            quanta: 0,
        }
    }

    /// Bring up the bus: configure the interface, synchronize the peer's state machine
    /// and reset the peer.
    pub fn boot(&mut self) {
        self.bus.init();
        self.bus.reset_state_machine();
        self.bus.pulse_reset();
        self.bus.window_mut().delay_us(BOOT_SETTLE_US);
        log::info!("Machine booted, quantum is {} cycles", self.quantum_cycles);
    }

    /// Register a device and claim each of its ranges on the router.
    pub fn install_device(
        &mut self,
        device: Box<dyn MemoryMappedDevice>,
        ranges: &[MemRangeDescriptor],
    ) -> Result<DeviceId, RouterError> {
        let name = device.name();
        let id = self.router.register_device(device);
        for range in ranges {
            self.router.register_range(id, range.address, range.size)?;
            log::debug!("Installed {} ({}) at {}", name, id, range);
        }
        Ok(id)
    }

    pub fn add_int2_source(&mut self, source: Box<dyn Int2Source>) -> Result<usize, IrqError> {
        self.irq.add_int2_source(source)
    }

    pub fn bus(&self) -> &Protocol<W> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Protocol<W> {
        &mut self.bus
    }

    pub fn router(&self) -> &AddressRouter {
        &self.router
    }

    pub fn irq(&self) -> &InterruptController {
        &self.irq
    }

    pub fn quantum_cycles(&self) -> u32 {
        self.quantum_cycles
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn quanta(&self) -> u64 {
        self.quanta
    }

    /// Run the CPU engine for one quantum, then present the resulting interrupt level.
    /// Returns the IPL presented.
    pub fn run_quantum(&mut self, cpu: &mut dyn CpuEngine) -> u8 {
        let cycles = self.quantum_cycles;
        let ran = cpu.execute(cycles, self);
        self.cycles += ran as u64;
        self.quanta += 1;
        self.compute_irq_level(cpu)
    }

    pub fn compute_irq_level(&mut self, cpu: &mut dyn CpuEngine) -> u8 {
        self.irq.compute_irq_level(&mut self.bus, cpu)
    }
}

impl<W: PeripheralWindow> CpuMemory for Machine<W> {
    fn read_u8(&mut self, address: u32) -> u8 {
        self.router.read_u8(address & ADDRESS_MASK, &mut self.bus, &mut self.irq)
    }

    fn read_u16(&mut self, address: u32) -> u16 {
        self.router.read_u16(address & ADDRESS_MASK, &mut self.bus, &mut self.irq)
    }

    fn read_u32(&mut self, address: u32) -> u32 {
        self.router.read_u32(address & ADDRESS_MASK, &mut self.bus, &mut self.irq)
    }

    fn write_u8(&mut self, address: u32, data: u8) {
        self.router.write_u8(address & ADDRESS_MASK, data, &mut self.bus, &mut self.irq)
    }

    fn write_u16(&mut self, address: u32, data: u16) {
        self.router.write_u16(address & ADDRESS_MASK, data, &mut self.bus, &mut self.irq)
    }

    fn write_u32(&mut self, address: u32, data: u32) {
        self.router.write_u32(address & ADDRESS_MASK, data, &mut self.bus, &mut self.irq)
    }

    fn pulse_reset(&mut self) {
        log::debug!("CPU reset, pulsing peer reset");
        self.bus.pulse_reset();
    }
}
