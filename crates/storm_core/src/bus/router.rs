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

    bus/router.rs

    Address space router

*/

//! The [AddressRouter] maps 24-bit address ranges to registered [MemoryMappedDevice]s.
//! Lookups go through a page map at 64K granularity; addresses no device claims go
//! straight to the raw bus.

use thiserror::Error;

use crate::{
    bus::{BusContext, DeviceId, MemRangeDescriptor, MemoryMappedDevice, PeerBus},
    interrupt::InterruptController,
    ADDRESS_MASK,
    ADDRESS_SPACE_SIZE,
};

pub const MAP_PAGE_SHIFT: u32 = 16;
pub const MAP_PAGE_SIZE: u32 = 1 << MAP_PAGE_SHIFT;
const MAP_PAGES: usize = (ADDRESS_SPACE_SIZE >> MAP_PAGE_SHIFT) as usize;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("no device registered with id {0}")]
    UnknownDevice(DeviceId),
    #[error("range at {0:06X} has zero length")]
    ZeroLength(u32),
    #[error("range {0} extends past the 24-bit address space")]
    OutOfRange(MemRangeDescriptor),
    #[error("range {0} is not aligned to 64K pages")]
    Misaligned(MemRangeDescriptor),
    #[error("range {0} overlaps {1} claimed by {2}")]
    Overlap(MemRangeDescriptor, MemRangeDescriptor, DeviceId),
}

pub struct AddressRouter {
    devices: Vec<Box<dyn MemoryMappedDevice>>,
    ranges: Vec<(MemRangeDescriptor, DeviceId)>,
    page_map: Box<[Option<DeviceId>; MAP_PAGES]>,
}

impl Default for AddressRouter {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            ranges: Vec::new(),
            page_map: Box::new([None; MAP_PAGES]),
        }
    }
}

impl AddressRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a device. It handles nothing until a range is registered for it.
    pub fn register_device(&mut self, device: Box<dyn MemoryMappedDevice>) -> DeviceId {
        let id = DeviceId(self.devices.len());
        log::debug!("register_device: {} as {}", device.name(), id);
        self.devices.push(device);
        id
    }

    /// Check that a range is non-empty, page aligned and inside the 24-bit address space.
    pub fn validate_range(base: u32, length: u32) -> Result<MemRangeDescriptor, RouterError> {
        if length == 0 {
            return Err(RouterError::ZeroLength(base));
        }
        let range = MemRangeDescriptor::new(base, length);
        if range.end() > ADDRESS_SPACE_SIZE as u64 {
            return Err(RouterError::OutOfRange(range));
        }
        if base % MAP_PAGE_SIZE != 0 || length % MAP_PAGE_SIZE != 0 {
            return Err(RouterError::Misaligned(range));
        }
        Ok(range)
    }

    pub fn register_range(&mut self, id: DeviceId, base: u32, length: u32) -> Result<(), RouterError> {
        if id.0 >= self.devices.len() {
            return Err(RouterError::UnknownDevice(id));
        }
        let range = Self::validate_range(base, length)?;
        if let Some((claimed, owner)) = self.ranges.iter().find(|(r, _)| r.overlaps(&range)) {
            return Err(RouterError::Overlap(range, *claimed, *owner));
        }

        log::debug!(
            "register_range: {} claims {} ({} pages)",
            self.devices[id.0].name(),
            range,
            length >> MAP_PAGE_SHIFT
        );
        let first = (base >> MAP_PAGE_SHIFT) as usize;
        let last = first + (length >> MAP_PAGE_SHIFT) as usize;
        for page in &mut self.page_map[first..last] {
            *page = Some(id);
        }
        self.ranges.push((range, id));
        Ok(())
    }

    pub fn ranges(&self) -> &[(MemRangeDescriptor, DeviceId)] {
        &self.ranges
    }

    #[inline]
    pub fn lookup(&self, address: u32) -> Option<DeviceId> {
        self.page_map[((address & ADDRESS_MASK) >> MAP_PAGE_SHIFT) as usize]
    }

    pub fn read_u8(&mut self, address: u32, bus: &mut dyn PeerBus, irq: &mut InterruptController) -> u8 {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_read_u8(address, &mut BusContext { bus, irq }),
            None => bus.read_u8(address),
        }
    }

    pub fn read_u16(&mut self, address: u32, bus: &mut dyn PeerBus, irq: &mut InterruptController) -> u16 {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_read_u16(address, &mut BusContext { bus, irq }),
            None => bus.read_u16(address),
        }
    }

    pub fn read_u32(&mut self, address: u32, bus: &mut dyn PeerBus, irq: &mut InterruptController) -> u32 {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_read_u32(address, &mut BusContext { bus, irq }),
            None => bus.read_u32(address),
        }
    }

    pub fn write_u8(&mut self, address: u32, data: u8, bus: &mut dyn PeerBus, irq: &mut InterruptController) {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_write_u8(address, data, &mut BusContext { bus, irq }),
            None => bus.write_u8(address, data),
        }
    }

    pub fn write_u16(&mut self, address: u32, data: u16, bus: &mut dyn PeerBus, irq: &mut InterruptController) {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_write_u16(address, data, &mut BusContext { bus, irq }),
            None => bus.write_u16(address, data),
        }
    }

    pub fn write_u32(&mut self, address: u32, data: u32, bus: &mut dyn PeerBus, irq: &mut InterruptController) {
        match self.lookup(address) {
            Some(id) => self.devices[id.0].mmio_write_u32(address, data, &mut BusContext { bus, irq }),
            None => bus.write_u32(address, data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bus::PeerBus,
        protocol::{sim::SimulatedPeer, Protocol},
    };

    /// Answers every read with its own marker and counts writes.
    struct Marker {
        value: u8,
        writes: usize,
    }

    impl MemoryMappedDevice for Marker {
        fn mmio_read_u8(&mut self, _address: u32, _ctx: &mut BusContext) -> u8 {
            self.value
        }
        fn mmio_read_u16(&mut self, _address: u32, _ctx: &mut BusContext) -> u16 {
            self.value as u16
        }
        fn mmio_read_u32(&mut self, _address: u32, _ctx: &mut BusContext) -> u32 {
            self.value as u32
        }
        fn mmio_write_u8(&mut self, _address: u32, _data: u8, _ctx: &mut BusContext) {
            self.writes += 1;
        }
        fn mmio_write_u16(&mut self, _address: u32, _data: u16, _ctx: &mut BusContext) {
            self.writes += 1;
        }
        fn mmio_write_u32(&mut self, _address: u32, _data: u32, _ctx: &mut BusContext) {
            self.writes += 1;
        }
        fn name(&self) -> &'static str {
            "marker"
        }
    }

    fn marker(value: u8) -> Box<Marker> {
        Box::new(Marker { value, writes: 0 })
    }

    fn bus() -> Protocol<SimulatedPeer> {
        let mut bus = Protocol::new(SimulatedPeer::new());
        bus.init();
        bus
    }

    #[test]
    fn dispatches_claimed_ranges() {
        let mut router = AddressRouter::new();
        let mut bus = bus();
        let mut irq = InterruptController::new();

        let a = router.register_device(marker(0xAA));
        let b = router.register_device(marker(0xBB));
        router.register_range(a, 0xD8_0000, 0x4_0000).unwrap();
        router.register_range(a, 0xDD_0000, 0x2_0000).unwrap();
        router.register_range(b, 0xDF_0000, 0x1_0000).unwrap();

        assert_eq!(router.read_u8(0xDA_2000, &mut bus, &mut irq), 0xAA);
        assert_eq!(router.read_u8(0xDE_1000, &mut bus, &mut irq), 0xAA);
        assert_eq!(router.read_u16(0xDF_F01C, &mut bus, &mut irq), 0xBB);
        assert_eq!(router.lookup(0xDC_0000), None);
        assert_eq!(router.ranges().len(), 3);
    }

    #[test]
    fn unclaimed_addresses_pass_through() {
        let mut router = AddressRouter::new();
        let mut bus = bus();
        let mut irq = InterruptController::new();
        let id = router.register_device(marker(0xAA));
        router.register_range(id, 0x20_0000, 0x10_0000).unwrap();

        router.write_u32(0x00_0400, 0x1234_5678, &mut bus, &mut irq);
        assert_eq!(bus.read_u32(0x00_0400), 0x1234_5678);
        assert_eq!(router.read_u16(0x00_0402, &mut bus, &mut irq), 0x5678);
        router.write_u8(0x00_0401, 0xFF, &mut bus, &mut irq);
        assert_eq!(router.read_u8(0x00_0401, &mut bus, &mut irq), 0xFF);
    }

    #[test]
    fn range_errors() {
        let mut router = AddressRouter::new();
        let id = router.register_device(marker(0));

        assert_eq!(
            router.register_range(DeviceId(7), 0, MAP_PAGE_SIZE),
            Err(RouterError::UnknownDevice(DeviceId(7)))
        );
        assert_eq!(router.register_range(id, 0x1_0000, 0), Err(RouterError::ZeroLength(0x1_0000)));
        assert!(matches!(
            router.register_range(id, 0xFF_0000, 0x2_0000),
            Err(RouterError::OutOfRange(_))
        ));
        assert!(matches!(
            router.register_range(id, 0x1_8000, 0x1_0000),
            Err(RouterError::Misaligned(_))
        ));

        router.register_range(id, 0x10_0000, 0x10_0000).unwrap();
        let other = router.register_device(marker(1));
        assert!(matches!(
            router.register_range(other, 0x1F_0000, 0x2_0000),
            Err(RouterError::Overlap(_, _, owner)) if owner == id
        ));
    }
}
