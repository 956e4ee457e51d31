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

    devices/fastmem.rs

    Pi-side fast memory

*/

//! A block of RAM held on the Pi and mapped into the 68k address space. Accesses never
//! reach the peer bus. Contents are big-endian, as the 68k sees them.

use crate::bus::{AddressRouter, BusContext, MemRangeDescriptor, MemoryMappedDevice, RouterError};

pub struct FastMemory {
    base: u32,
    mem: Vec<u8>,
}

impl FastMemory {
    /// The range is checked against the router's rules before anything is allocated.
    pub fn new(base: u32, size: u32) -> Result<Self, RouterError> {
        AddressRouter::validate_range(base, size)?;
        log::debug!("FastMemory: {} KiB at {:06X}", size / 1024, base);
        Ok(Self {
            base,
            mem: vec![0; size as usize],
        })
    }

    pub fn mapping(&self) -> MemRangeDescriptor {
        MemRangeDescriptor::new(self.base, self.mem.len() as u32)
    }

    fn slice<const N: usize>(&self, address: u32) -> Option<[u8; N]> {
        let offset = address.wrapping_sub(self.base) as usize;
        self.mem.get(offset..offset.checked_add(N)?)?.try_into().ok()
    }

    fn slice_mut(&mut self, address: u32, len: usize) -> Option<&mut [u8]> {
        let offset = address.wrapping_sub(self.base) as usize;
        self.mem.get_mut(offset..offset.checked_add(len)?)
    }

    pub fn read_u8(&self, address: u32) -> u8 {
        self.slice::<1>(address).map(|b| b[0]).unwrap_or_else(|| {
            log::warn!("FastMemory: byte read outside block: {:06X}", address);
            0xFF
        })
    }

    pub fn read_u16(&self, address: u32) -> u16 {
        self.slice::<2>(address).map(u16::from_be_bytes).unwrap_or_else(|| {
            log::warn!("FastMemory: word read outside block: {:06X}", address);
            0xFFFF
        })
    }

    pub fn read_u32(&self, address: u32) -> u32 {
        self.slice::<4>(address).map(u32::from_be_bytes).unwrap_or_else(|| {
            log::warn!("FastMemory: long read outside block: {:06X}", address);
            0xFFFF_FFFF
        })
    }

    fn write_bytes(&mut self, address: u32, bytes: &[u8]) {
        match self.slice_mut(address, bytes.len()) {
            Some(dst) => dst.copy_from_slice(bytes),
            None => log::warn!("FastMemory: write outside block: {:06X}", address),
        }
    }

    pub fn write_u8(&mut self, address: u32, data: u8) {
        self.write_bytes(address, &[data]);
    }

    pub fn write_u16(&mut self, address: u32, data: u16) {
        self.write_bytes(address, &data.to_be_bytes());
    }

    pub fn write_u32(&mut self, address: u32, data: u32) {
        self.write_bytes(address, &data.to_be_bytes());
    }
}

impl MemoryMappedDevice for FastMemory {
    fn mmio_read_u8(&mut self, address: u32, _ctx: &mut BusContext) -> u8 {
        self.read_u8(address)
    }

    fn mmio_read_u16(&mut self, address: u32, _ctx: &mut BusContext) -> u16 {
        self.read_u16(address)
    }

    fn mmio_read_u32(&mut self, address: u32, _ctx: &mut BusContext) -> u32 {
        self.read_u32(address)
    }

    fn mmio_write_u8(&mut self, address: u32, data: u8, _ctx: &mut BusContext) {
        self.write_u8(address, data)
    }

    fn mmio_write_u16(&mut self, address: u32, data: u16, _ctx: &mut BusContext) {
        self.write_u16(address, data)
    }

    fn mmio_write_u32(&mut self, address: u32, data: u32, _ctx: &mut BusContext) {
        self.write_u32(address, data)
    }

    fn name(&self) -> &'static str {
        "Fast Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_endian_access() {
        let mut mem = FastMemory::new(0x20_0000, 0x1_0000).unwrap();
        mem.write_u32(0x20_0010, 0x1122_3344);
        assert_eq!(mem.read_u8(0x20_0010), 0x11);
        assert_eq!(mem.read_u8(0x20_0013), 0x44);
        assert_eq!(mem.read_u16(0x20_0012), 0x3344);

        mem.write_u8(0x20_0011, 0xAA);
        assert_eq!(mem.read_u32(0x20_0010), 0x11AA_3344);
    }

    #[test]
    fn outside_block() {
        let mut mem = FastMemory::new(0x20_0000, 0x1_0000).unwrap();
        assert_eq!(mem.read_u32(0x20_FFFE), 0xFFFF_FFFF);
        assert_eq!(mem.read_u8(0x1F_FFFF), 0xFF);
        mem.write_u16(0x21_0000, 0x1234);
        assert_eq!(mem.read_u16(0x20_FFFE), 0x0000);
        assert_eq!(mem.mapping(), MemRangeDescriptor::new(0x20_0000, 0x1_0000));
    }

    #[test]
    fn bad_ranges_rejected_before_allocation() {
        assert!(matches!(
            FastMemory::new(0x20_0000, 0xFFFF_0000),
            Err(RouterError::OutOfRange(_))
        ));
        assert!(matches!(FastMemory::new(0x20_0000, 0x1_8000), Err(RouterError::Misaligned(_))));
        assert!(matches!(FastMemory::new(0x20_0000, 0), Err(RouterError::ZeroLength(0x20_0000))));
    }
}
