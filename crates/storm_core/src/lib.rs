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

    lib.rs

    Storm core library

*/

//! The Storm core drives a 68k CPU bus through the GPIO header of a Raspberry Pi and
//! emulates, at register level, the peripherals that software running on that CPU
//! expects to find at fixed addresses.
//!
//! The crate is organized leaves first:
//! - [protocol]: the bus transaction engine, its register window and a simulated peer.
//! - [bus]: the [bus::PeerBus] transaction contract, device traits and the address router.
//! - [interrupt]: interrupt-enable shadowing and virtual INT2 sources.
//! - [devices]: the Gayle disk controller bridge, custom chip routing and fast memory.
//! - [machine]: the process-owned context tying all of the above together.

pub mod bus;
pub mod cpu;
pub mod devices;
pub mod interrupt;
pub mod machine;
pub mod protocol;

/// The peer CPU has a 24-bit address space.
pub const ADDRESS_SPACE_SIZE: u32 = 0x0100_0000;
pub const ADDRESS_MASK: u32 = ADDRESS_SPACE_SIZE - 1;
