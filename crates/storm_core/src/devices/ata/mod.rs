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

    devices/ata/mod.rs

    ATA drive abstraction

*/

//! The drive side of the Gayle IDE interface. [IdeDrive] exposes the task file by
//! register slot; [AtaDrive] implements it over a raw disk image.

pub mod ata_drive;
pub mod ata_error;
pub mod ata_identification;
pub mod ata_string;
pub mod geometry;

pub use ata_drive::AtaDrive;
pub use ata_error::AtaError;

pub const SECTOR_SIZE: usize = 512;

/// Task file register slots. Some addresses carry a different register for reads and
/// writes; these are listed separately.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum IdeRegister {
    Data,
    Error,
    Feature,
    SectorCount,
    SectorNumber,
    CylinderLow,
    CylinderHigh,
    DeviceHead,
    Status,
    Command,
    AltStatus,
    DeviceControl,
}

pub trait IdeDrive {
    fn read_register(&mut self, reg: IdeRegister) -> u8;
    fn write_register(&mut self, reg: IdeRegister, value: u8);
    fn read_data(&mut self) -> u16;
    fn write_data(&mut self, value: u16);
    /// The INTRQ line.
    fn intrq(&self) -> bool;
    fn reset(&mut self);
}
