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

    protocol/clock.rs

    GPCLK0 setup. The peer's protocol logic is clocked from GPIO4.

*/

use std::hint::spin_loop;

use crate::protocol::{
    pins::{set_pin_mode, PinMode, PIN_CLK},
    window::PeripheralWindow,
};

pub const CLK_PASSWD: u32 = 0x5A00_0000;
pub const CLK_PASSWD_MASK: u32 = 0xFF00_0000;

// Word offsets within the clock manager block.
pub const CLK_GP0_CTL: usize = 0x070 / 4;
pub const CLK_GP0_DIV: usize = 0x074 / 4;

pub const CLK_CTL_SRC_PLLC: u32 = 5;
pub const CLK_CTL_ENAB: u32 = 1 << 4;
pub const CLK_CTL_KILL: u32 = 1 << 5;
pub const CLK_CTL_BUSY: u32 = 1 << 7;

/// Integer divisor 6 of PLLC, 200MHz on a pi3.
pub const CLK_DIVI: u32 = 6 << 12;

/// Stop GPCLK0, program the divisor, restart it from PLLC and route it to GPIO4.
pub fn setup_gpclk<W: PeripheralWindow + ?Sized>(window: &mut W) {
    window.clock_write(CLK_GP0_CTL, CLK_PASSWD | CLK_CTL_KILL);
    window.delay_us(10);
    while window.clock_read(CLK_GP0_CTL) & CLK_CTL_BUSY != 0 {
        spin_loop();
    }
    window.delay_us(100);

    window.clock_write(CLK_GP0_DIV, CLK_PASSWD | CLK_DIVI);
    window.delay_us(10);
    window.clock_write(CLK_GP0_CTL, CLK_PASSWD | CLK_CTL_SRC_PLLC | CLK_CTL_ENAB);
    window.delay_us(10);
    while window.clock_read(CLK_GP0_CTL) & CLK_CTL_BUSY == 0 {
        spin_loop();
    }
    window.delay_us(100);

    set_pin_mode(window, PIN_CLK, PinMode::Alt0);
}
