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

    cpu.rs

    Contract between the core and a 68k instruction engine

*/

//! No instruction engine ships with the core. An engine implements [CpuEngine] and
//! talks to the 68k address space through [CpuMemory], which the
//! [Machine](crate::machine::Machine) provides.

/// A 68k instruction engine.
pub trait CpuEngine {
    /// Run for roughly `cycles` cycles and return the number actually executed.
    fn execute(&mut self, cycles: u32, memory: &mut dyn CpuMemory) -> u32;
    /// Present an interrupt priority level (0-7) to the engine.
    fn set_irq(&mut self, level: u8);
}

/// The 68k address space as seen by an instruction engine.
pub trait CpuMemory {
    fn read_u8(&mut self, address: u32) -> u8;
    fn read_u16(&mut self, address: u32) -> u16;
    fn read_u32(&mut self, address: u32) -> u32;
    fn write_u8(&mut self, address: u32, data: u8);
    fn write_u16(&mut self, address: u32, data: u16);
    fn write_u32(&mut self, address: u32, data: u32);

    /// Called by the engine whenever the emulated CPU itself resets (RESET instruction),
    /// so the peer's reset state follows it.
    fn pulse_reset(&mut self);
}
