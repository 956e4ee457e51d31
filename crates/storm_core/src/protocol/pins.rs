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

    protocol/pins.rs

    GPIO pin assignments, register offsets and function select helpers

*/

use crate::protocol::window::PeripheralWindow;

pub const PIN_AUX0: u32 = 0; // Transaction ready / acknowledge
pub const PIN_AUX1: u32 = 1; // Bus arbitration
pub const PIN_CLK: u32 = 4; // GPCLK0 output

pub const PIN_SA2: u32 = 2;
pub const PIN_SA1: u32 = 3;
pub const PIN_SA0: u32 = 5;

pub const PIN_SOE: u32 = 6; // Output enable, active low
pub const PIN_SWE: u32 = 7; // Write enable, active low

pub const SD_SHIFT: u32 = 8;
pub const SD_COUNT: u32 = 16;

#[inline]
pub const fn pin_sd(x: u32) -> u32 {
    SD_SHIFT + x
}

pub const AUX0_BIT: u32 = 1 << PIN_AUX0;
pub const AUX1_BIT: u32 = 1 << PIN_AUX1;
pub const SOE_BIT: u32 = 1 << PIN_SOE;
pub const SWE_BIT: u32 = 1 << PIN_SWE;
pub const SD_MASK: u32 = 0xFFFF << SD_SHIFT;
pub const SA_MASK: u32 = (1 << PIN_SA2) | (1 << PIN_SA1) | (1 << PIN_SA0);

// GPIO register word offsets, relative to the GPIO block.
pub const GPFSEL0: usize = 0;
pub const GPSET0: usize = 7;
pub const GPCLR0: usize = 10;
pub const GPLEV0: usize = 13;
pub const GPPUD: usize = 37;
pub const GPPUDCLK0: usize = 38;

/// Number of GPFSEL registers covering the pins we drive (0-29).
pub const FSEL_REGS: usize = 3;

/// The 3-bit register select presented on SA2..SA0 with the first strobe of every cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Select {
    Write16 = 0,
    Read16 = 1,
    Write8 = 2,
    Read8 = 3,
    Status = 4,
}

impl Select {
    /// The GPIO level bits that present this select on SA2..SA0.
    #[inline]
    pub const fn pins(self) -> u32 {
        let v = self as u32;
        ((v & 1) << PIN_SA0) | (((v >> 1) & 1) << PIN_SA1) | (((v >> 2) & 1) << PIN_SA2)
    }

    /// Decode a select from GPIO level bits. Unused patterns (5-7) yield None.
    pub fn from_pins(levels: u32) -> Option<Select> {
        let v = ((levels >> PIN_SA0) & 1) | (((levels >> PIN_SA1) & 1) << 1) | (((levels >> PIN_SA2) & 1) << 2);
        match v {
            0 => Some(Select::Write16),
            1 => Some(Select::Read16),
            2 => Some(Select::Write8),
            3 => Some(Select::Read8),
            4 => Some(Select::Status),
            _ => None,
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, Select::Write16 | Select::Write8)
    }
}

/// GPIO function select codes as laid out in GPFSELn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum PinMode {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

#[inline]
fn fsel_position(pin: u32) -> (usize, u32) {
    ((pin / 10) as usize, (pin % 10) * 3)
}

/// Set the function of a single pin with a read-modify-write of its GPFSEL register.
pub fn set_pin_mode<W: PeripheralWindow + ?Sized>(window: &mut W, pin: u32, mode: PinMode) {
    let (reg, shift) = fsel_position(pin);
    let fsel = window.gpio_read(GPFSEL0 + reg);
    window.gpio_write(GPFSEL0 + reg, (fsel & !(0b111 << shift)) | ((mode as u32) << shift));
}

pub fn pin_mode_bits(fsel: &[u32; FSEL_REGS], pin: u32) -> u32 {
    let (reg, shift) = fsel_position(pin);
    (fsel[reg] >> shift) & 0b111
}

/// A precomputed GPFSEL0..2 configuration. The engine keeps two of these (data lines
/// driven and data lines released) and swaps between them with three register writes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectionSnapshot {
    fsel: [u32; FSEL_REGS],
}

impl DirectionSnapshot {
    pub fn capture<W: PeripheralWindow + ?Sized>(window: &W) -> Self {
        let mut fsel = [0; FSEL_REGS];
        for (i, reg) in fsel.iter_mut().enumerate() {
            *reg = window.gpio_read(GPFSEL0 + i);
        }
        Self { fsel }
    }

    #[inline]
    pub fn apply<W: PeripheralWindow + ?Sized>(&self, window: &mut W) {
        window.gpio_write(GPFSEL0, self.fsel[0]);
        window.gpio_write(GPFSEL0 + 1, self.fsel[1]);
        window.gpio_write(GPFSEL0 + 2, self.fsel[2]);
    }

    pub fn mode(&self, pin: u32) -> u32 {
        pin_mode_bits(&self.fsel, pin)
    }

    pub fn registers(&self) -> &[u32; FSEL_REGS] {
        &self.fsel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_pins_match_register_map() {
        assert_eq!(Select::Write16.pins(), 0);
        assert_eq!(Select::Read16.pins(), 1 << PIN_SA0);
        assert_eq!(Select::Write8.pins(), 1 << PIN_SA1);
        assert_eq!(Select::Read8.pins(), (1 << PIN_SA1) | (1 << PIN_SA0));
        assert_eq!(Select::Status.pins(), 1 << PIN_SA2);
    }

    #[test]
    fn select_decodes_from_levels() {
        for select in [Select::Write16, Select::Read16, Select::Write8, Select::Read8, Select::Status] {
            // Surrounding data and strobe bits must not disturb the decode.
            let levels = select.pins() | SD_MASK | SOE_BIT | SWE_BIT;
            assert_eq!(Select::from_pins(levels), Some(select));
        }
        assert_eq!(Select::from_pins((1 << PIN_SA2) | (1 << PIN_SA0)), None);
    }

    #[test]
    fn fsel_positions() {
        assert_eq!(fsel_position(PIN_CLK), (0, 12));
        assert_eq!(fsel_position(pin_sd(0)), (0, 24));
        assert_eq!(fsel_position(pin_sd(2)), (1, 0));
        assert_eq!(fsel_position(pin_sd(15)), (2, 9));
    }
}
