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

    protocol/status.rs

    Peer status register

*/

use modular_bitfield::prelude::*;

pub const STATUS_BIT_INIT: u16 = 0x0001;
pub const STATUS_BIT_RESET: u16 = 0x0002;

/// The 16-bit status pseudo-register of the peer's protocol logic.
/// INIT and RESET are commands written by us; IPL is the interrupt level
/// the peer observes on the 68k's IPL lines.
#[bitfield]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StatusRegister {
    pub init: bool,
    pub reset: bool,
    #[skip]
    __: B11,
    pub ipl: B3,
}

impl From<u16> for StatusRegister {
    fn from(value: u16) -> Self {
        StatusRegister::from_bytes(value.to_le_bytes())
    }
}

impl From<StatusRegister> for u16 {
    fn from(reg: StatusRegister) -> Self {
        u16::from_le_bytes(reg.into_bytes())
    }
}
