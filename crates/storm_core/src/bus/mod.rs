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

    bus/mod.rs

    Bus contracts: raw peer transactions, memory mapped devices and dispatch context

*/

pub mod router;

use std::{cell::RefCell, fmt, rc::Rc};

use crate::interrupt::InterruptController;

pub use router::{AddressRouter, RouterError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusWidth {
    Byte,
    Word,
    Long,
}

/// Raw transactions against the peer CPU's bus. 32-bit accesses are two 16-bit
/// accesses, high half first, at `address` and `address + 2`.
pub trait PeerBus {
    fn read_u8(&mut self, address: u32) -> u8;
    fn read_u16(&mut self, address: u32) -> u16;
    fn write_u8(&mut self, address: u32, data: u8);
    fn write_u16(&mut self, address: u32, data: u16);

    fn read_u32(&mut self, address: u32) -> u32 {
        let hi = self.read_u16(address) as u32;
        let lo = self.read_u16(address.wrapping_add(2)) as u32;
        (hi << 16) | lo
    }

    fn write_u32(&mut self, address: u32, data: u32) {
        self.write_u16(address, (data >> 16) as u16);
        self.write_u16(address.wrapping_add(2), data as u16);
    }

    fn read_status(&mut self) -> u16;
    fn write_status(&mut self, value: u16);

    /// True while another master holds the 68k bus.
    fn bus_arbitration(&mut self) -> bool;

    fn read(&mut self, address: u32, width: BusWidth) -> u32 {
        match width {
            BusWidth::Byte => self.read_u8(address) as u32,
            BusWidth::Word => self.read_u16(address) as u32,
            BusWidth::Long => self.read_u32(address),
        }
    }

    fn write(&mut self, address: u32, data: u32, width: BusWidth) {
        match width {
            BusWidth::Byte => self.write_u8(address, data as u8),
            BusWidth::Word => self.write_u16(address, data as u16),
            BusWidth::Long => self.write_u32(address, data),
        }
    }
}

/// What a device handler can reach while servicing an access.
pub struct BusContext<'a> {
    pub bus: &'a mut dyn PeerBus,
    pub irq: &'a mut InterruptController,
}

/// A register-level device claimed over one or more address ranges.
pub trait MemoryMappedDevice {
    fn mmio_read_u8(&mut self, address: u32, ctx: &mut BusContext) -> u8;
    fn mmio_read_u16(&mut self, address: u32, ctx: &mut BusContext) -> u16;
    fn mmio_read_u32(&mut self, address: u32, ctx: &mut BusContext) -> u32;
    fn mmio_write_u8(&mut self, address: u32, data: u8, ctx: &mut BusContext);
    fn mmio_write_u16(&mut self, address: u32, data: u16, ctx: &mut BusContext);
    fn mmio_write_u32(&mut self, address: u32, data: u32, ctx: &mut BusContext);

    fn name(&self) -> &'static str;
}

/// Devices that must stay reachable from elsewhere (an interrupt source, say) are
/// registered as shared cells.
impl<T: MemoryMappedDevice> MemoryMappedDevice for Rc<RefCell<T>> {
    fn mmio_read_u8(&mut self, address: u32, ctx: &mut BusContext) -> u8 {
        self.borrow_mut().mmio_read_u8(address, ctx)
    }
    fn mmio_read_u16(&mut self, address: u32, ctx: &mut BusContext) -> u16 {
        self.borrow_mut().mmio_read_u16(address, ctx)
    }
    fn mmio_read_u32(&mut self, address: u32, ctx: &mut BusContext) -> u32 {
        self.borrow_mut().mmio_read_u32(address, ctx)
    }
    fn mmio_write_u8(&mut self, address: u32, data: u8, ctx: &mut BusContext) {
        self.borrow_mut().mmio_write_u8(address, data, ctx)
    }
    fn mmio_write_u16(&mut self, address: u32, data: u16, ctx: &mut BusContext) {
        self.borrow_mut().mmio_write_u16(address, data, ctx)
    }
    fn mmio_write_u32(&mut self, address: u32, data: u32, ctx: &mut BusContext) {
        self.borrow_mut().mmio_write_u32(address, data, ctx)
    }
    fn name(&self) -> &'static str {
        self.borrow().name()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub(crate) usize);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemRangeDescriptor {
    pub address: u32,
    pub size: u32,
}

impl MemRangeDescriptor {
    pub fn new(address: u32, size: u32) -> Self {
        Self { address, size }
    }

    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && address - self.address < self.size
    }

    #[inline]
    pub fn end(&self) -> u64 {
        self.address as u64 + self.size as u64
    }

    pub fn overlaps(&self, other: &MemRangeDescriptor) -> bool {
        (self.address as u64) < other.end() && (other.address as u64) < self.end()
    }
}

impl fmt::Display for MemRangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:06X}-{:06X})", self.address, self.end())
    }
}
