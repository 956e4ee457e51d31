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

    devices/custom_chips.rs

    Custom chip register routing

*/

//! The custom chip window stays on the real hardware. The only reason to claim it is
//! so that interrupt enable and request traffic passes through the
//! [InterruptController](crate::interrupt::InterruptController), which keeps the INTENA
//! shadow current and merges virtual INT2 requests into INTREQR.

use crate::{
    bus::{BusContext, MemRangeDescriptor, MemoryMappedDevice},
    interrupt::{INTENA, INTENAR, INTREQR},
};

pub const CUSTOM_CHIPS_BASE: u32 = 0xDF_0000;
pub const CUSTOM_CHIPS_SIZE: u32 = 0x1_0000;

#[derive(Default)]
pub struct CustomChips;

impl CustomChips {
    pub fn new() -> Self {
        Self
    }

    pub fn mapping() -> MemRangeDescriptor {
        MemRangeDescriptor::new(CUSTOM_CHIPS_BASE, CUSTOM_CHIPS_SIZE)
    }
}

impl MemoryMappedDevice for CustomChips {
    fn mmio_read_u8(&mut self, address: u32, ctx: &mut BusContext) -> u8 {
        ctx.bus.read_u8(address)
    }

    fn mmio_read_u16(&mut self, address: u32, ctx: &mut BusContext) -> u16 {
        match address {
            INTENAR => ctx.irq.read_intenar(ctx.bus),
            INTREQR => ctx.irq.read_intreqr(ctx.bus),
            _ => ctx.bus.read_u16(address),
        }
    }

    fn mmio_read_u32(&mut self, address: u32, ctx: &mut BusContext) -> u32 {
        let hi = self.mmio_read_u16(address, ctx) as u32;
        let lo = self.mmio_read_u16(address.wrapping_add(2), ctx) as u32;
        (hi << 16) | lo
    }

    fn mmio_write_u8(&mut self, address: u32, data: u8, ctx: &mut BusContext) {
        ctx.bus.write_u8(address, data)
    }

    fn mmio_write_u16(&mut self, address: u32, data: u16, ctx: &mut BusContext) {
        match address {
            INTENA => ctx.irq.write_intena(ctx.bus, data),
            _ => ctx.bus.write_u16(address, data),
        }
    }

    fn mmio_write_u32(&mut self, address: u32, data: u32, ctx: &mut BusContext) {
        self.mmio_write_u16(address, (data >> 16) as u16, ctx);
        self.mmio_write_u16(address.wrapping_add(2), data as u16, ctx);
    }

    fn name(&self) -> &'static str {
        "Custom Chips"
    }
}
