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

    devices/ata/ata_drive.rs

    ATA drive over a raw disk image

*/

//! [AtaDrive] is a single master ATA drive over a raw image. All commands complete
//! immediately; BSY is only ever visible while SRST is held.
//!
//! Data register words are formed big-endian from the sector buffer: byte 0 of a
//! sector travels on the high lane, which is how the 68k sees it through Gayle.

use std::{
    fs::{File, OpenOptions},
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};

use binrw::BinWrite;
use modular_bitfield::bitfield;

use crate::devices::ata::{
    ata_error::AtaError,
    ata_identification::AtaDriveIdentification,
    geometry::{DiskChs, DriveGeometry},
    IdeDrive,
    IdeRegister,
    SECTOR_SIZE,
};

const DEVICE_HEAD_DEV: u8 = 0x10;
const DEVICE_HEAD_LBA: u8 = 0x40;
const DEVICE_CONTROL_NIEN: u8 = 0x02;
const DEVICE_CONTROL_SRST: u8 = 0x04;

/// Error register value after reset or diagnostics: device 0 passed.
const DIAGNOSTIC_PASSED: u8 = 0x01;
pub const MAX_MULTIPLE: u8 = 16;
const MAX_LBA28: u64 = 0x0FFF_FFFF;

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct AtaStatusRegister {
    pub err:   bool, // Error
    pub idx:   bool, // Index
    pub corr:  bool, // Corrected Data
    pub drq:   bool, // Data Request
    pub dsc:   bool, // Disk Seek Complete
    pub dwf:   bool, // Drive Write Failure
    pub ready: bool, // Drive Ready
    pub busy:  bool, // Drive Busy
}

#[bitfield]
#[derive(Copy, Clone, Debug)]
pub struct AtaErrorRegister {
    pub amnf: bool, // Address Mark Not Found
    pub tk0:  bool, // Track 0 Not Found
    pub abrt: bool, // Command Aborted
    pub mcr:  bool, // Media Change Request
    pub idnf: bool, // ID Not Found
    pub mc:   bool, // Media changed
    pub unc:  bool, // Unrecoverable
    pub bbk:  bool, // Bad Block
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AtaCommand {
    Recalibrate = 0x10,
    ReadSectorsRetry = 0x20,
    ReadSectors = 0x21,
    WriteSectorsRetry = 0x30,
    WriteSectors = 0x31,
    ReadVerifyRetry = 0x40,
    ReadVerify = 0x41,
    Seek = 0x70,
    InitializeDeviceParameters = 0x91,
    ReadMultiple = 0xC4,
    WriteMultiple = 0xC5,
    SetMultipleMode = 0xC6,
    StandbyImmediate = 0xE0,
    IdleImmediate = 0xE1,
    Standby = 0xE2,
    Idle = 0xE3,
    CheckPowerMode = 0xE5,
    Sleep = 0xE6,
    FlushCache = 0xE7,
    IdentifyDevice = 0xEC,
    SetFeatures = 0xEF,
}

impl TryFrom<u8> for AtaCommand {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        use AtaCommand::*;
        let command = match byte {
            0x10..=0x1F => Recalibrate,
            0x20 => ReadSectorsRetry,
            0x21 => ReadSectors,
            0x30 => WriteSectorsRetry,
            0x31 => WriteSectors,
            0x40 => ReadVerifyRetry,
            0x41 => ReadVerify,
            0x70..=0x7F => Seek,
            0x91 => InitializeDeviceParameters,
            0xC4 => ReadMultiple,
            0xC5 => WriteMultiple,
            0xC6 => SetMultipleMode,
            0xE0 => StandbyImmediate,
            0xE1 => IdleImmediate,
            0xE2 => Standby,
            0xE3 => Idle,
            0xE5 => CheckPowerMode,
            0xE6 => Sleep,
            0xE7 => FlushCache,
            0xEC => IdentifyDevice,
            0xEF => SetFeatures,
            _ => return Err(byte),
        };
        Ok(command)
    }
}

/// A PIO transfer in progress. `block_left` counts the sectors still to move in the
/// current DRQ block, including the one in the buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Transfer {
    None,
    /// Device to host. `lba` is the sector currently in the buffer.
    PioIn { lba: u32, remaining: u32, block_left: u32 },
    /// Host to device. `lba` is the sector the buffer will be written to.
    PioOut { lba: u32, remaining: u32, block_left: u32 },
}

pub struct AtaDrive<S> {
    image: S,
    default_geometry: DriveGeometry,
    geometry: DriveGeometry,
    total_sectors: u32,

    status: AtaStatusRegister,
    error: AtaErrorRegister,
    feature: u8,
    sector_count: u8,
    sector_number: u8,
    cylinder_low: u8,
    cylinder_high: u8,
    device_head: u8,
    device_control: u8,
    multiple: u8,
    block_size: u32,

    buffer: Vec<u8>,
    buffer_pos: usize,
    transfer: Transfer,
    intrq: bool,
}

impl AtaDrive<File> {
    /// Open a raw image read-write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AtaError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Self::new(file)
    }
}

impl<S: Read + Write + Seek> AtaDrive<S> {
    pub fn new(mut image: S) -> Result<Self, AtaError> {
        let size = image.seek(SeekFrom::End(0))?;
        let geometry = DriveGeometry::from_image_size(size)?;
        let total_sectors = (size / SECTOR_SIZE as u64).min(MAX_LBA28) as u32;

        log::debug!(
            "AtaDrive: {} byte image, {} sectors, geometry {}",
            size,
            total_sectors,
            geometry
        );

        let mut drive = Self {
            image,
            default_geometry: geometry,
            geometry,
            total_sectors,
            status: AtaStatusRegister::new(),
            error: AtaErrorRegister::new(),
            feature: 0,
            sector_count: 0,
            sector_number: 0,
            cylinder_low: 0,
            cylinder_high: 0,
            device_head: 0,
            device_control: 0,
            multiple: 0,
            block_size: 1,
            buffer: vec![0; SECTOR_SIZE],
            buffer_pos: SECTOR_SIZE,
            transfer: Transfer::None,
            intrq: false,
        };
        drive.reset();
        Ok(drive)
    }

    pub fn geometry(&self) -> DriveGeometry {
        self.geometry
    }

    pub fn default_geometry(&self) -> DriveGeometry {
        self.default_geometry
    }

    pub fn total_sectors(&self) -> u32 {
        self.total_sectors
    }

    pub fn image(&self) -> &S {
        &self.image
    }

    pub fn into_inner(self) -> S {
        self.image
    }

    #[inline]
    fn device1_selected(&self) -> bool {
        self.device_head & DEVICE_HEAD_DEV != 0
    }

    #[inline]
    fn status_byte(&self) -> u8 {
        self.status.into_bytes()[0]
    }

    #[inline]
    fn raise_intrq(&mut self) {
        if self.device_control & DEVICE_CONTROL_NIEN == 0 {
            self.intrq = true;
        }
    }

    fn sector_count_value(&self) -> u32 {
        match self.sector_count {
            0 => 256,
            n => n as u32,
        }
    }

    fn cylinder(&self) -> u16 {
        (self.cylinder_high as u16) << 8 | self.cylinder_low as u16
    }

    /// The first sector addressed by the task file, in LBA or CHS form.
    fn command_lba(&self) -> Option<u32> {
        if self.device_head & DEVICE_HEAD_LBA != 0 {
            Some(
                ((self.device_head & 0x0F) as u32) << 24
                    | (self.cylinder_high as u32) << 16
                    | (self.cylinder_low as u32) << 8
                    | self.sector_number as u32,
            )
        }
        else {
            let chs = DiskChs::new(self.cylinder(), self.device_head & 0x0F, self.sector_number);
            self.geometry.lba(chs)
        }
    }

    /// Resolve the task file to a sector range lying wholly inside the image.
    fn command_range(&self) -> Option<(u32, u32)> {
        let lba = self.command_lba()?;
        let count = self.sector_count_value();
        if lba as u64 + count as u64 > self.total_sectors as u64 {
            None
        }
        else {
            Some((lba, count))
        }
    }

    fn complete(&mut self) {
        self.status.set_busy(false);
        self.status.set_ready(true);
        self.status.set_dsc(true);
        self.status.set_drq(false);
        self.raise_intrq();
    }

    fn abort(&mut self) {
        self.transfer = Transfer::None;
        self.error.set_abrt(true);
        self.status.set_err(true);
        self.complete();
    }

    fn id_not_found(&mut self) {
        log::debug!("AtaDrive: sector address out of range");
        self.transfer = Transfer::None;
        self.error.set_idnf(true);
        self.status.set_err(true);
        self.complete();
    }

    fn media_error(&mut self, e: io::Error) {
        log::error!("AtaDrive: image I/O error: {}", e);
        self.transfer = Transfer::None;
        self.error.set_unc(true);
        self.status.set_err(true);
        self.complete();
    }

    fn load_sector(&mut self, lba: u32) -> io::Result<()> {
        self.image.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))?;
        self.image.read_exact(&mut self.buffer)?;
        self.buffer_pos = 0;
        Ok(())
    }

    fn store_sector(&mut self, lba: u32) -> io::Result<()> {
        self.image.seek(SeekFrom::Start(lba as u64 * SECTOR_SIZE as u64))?;
        self.image.write_all(&self.buffer)?;
        Ok(())
    }

    /// Handle a write to the command register.
    fn execute(&mut self, byte: u8) {
        self.error = AtaErrorRegister::new();
        self.status.set_err(false);
        self.transfer = Transfer::None;

        let command = match AtaCommand::try_from(byte) {
            Ok(command) => command,
            Err(byte) => {
                log::warn!("AtaDrive: unsupported command {:02X}", byte);
                return self.abort();
            }
        };

        match command {
            AtaCommand::ReadSectorsRetry | AtaCommand::ReadSectors => self.command_read_sectors(),
            AtaCommand::WriteSectorsRetry | AtaCommand::WriteSectors => self.command_write_sectors(),
            AtaCommand::ReadVerifyRetry | AtaCommand::ReadVerify => self.command_read_verify(),
            AtaCommand::Recalibrate => {
                log::debug!("Recalibrate command received");
                self.cylinder_low = 0;
                self.cylinder_high = 0;
                self.complete();
            }
            AtaCommand::Seek => {
                log::debug!("Seek command received");
                match self.command_lba() {
                    Some(lba) if lba < self.total_sectors => self.complete(),
                    _ => self.id_not_found(),
                }
            }
            AtaCommand::InitializeDeviceParameters => self.command_initialize_device_parameters(),
            AtaCommand::ReadMultiple => self.command_read_multiple(),
            AtaCommand::WriteMultiple => self.command_write_multiple(),
            AtaCommand::SetMultipleMode => self.command_set_multiple_mode(),
            AtaCommand::StandbyImmediate
            | AtaCommand::IdleImmediate
            | AtaCommand::Standby
            | AtaCommand::Idle
            | AtaCommand::Sleep => {
                log::debug!("Power management command {:02X} received", byte);
                self.complete();
            }
            AtaCommand::CheckPowerMode => {
                // Always active.
                self.sector_count = 0xFF;
                self.complete();
            }
            AtaCommand::FlushCache => match self.image.flush() {
                Ok(()) => self.complete(),
                Err(e) => self.media_error(e),
            },
            AtaCommand::IdentifyDevice => self.command_identify_device(),
            AtaCommand::SetFeatures => {
                log::debug!("Set Features command received: feature {:02X}", self.feature);
                self.complete();
            }
        }
    }

    /// Begin a device-to-host transfer in DRQ blocks of `block` sectors.
    fn start_pio_in(&mut self, block: u32) {
        let Some((lba, count)) = self.command_range()
        else {
            return self.id_not_found();
        };
        log::trace!("start_pio_in(): lba: {} count: {} block: {}", lba, count, block);

        if let Err(e) = self.load_sector(lba) {
            return self.media_error(e);
        }
        self.block_size = block;
        self.transfer = Transfer::PioIn {
            lba,
            remaining: count,
            block_left: count.min(block),
        };
        self.status.set_ready(true);
        self.status.set_drq(true);
        self.raise_intrq();
    }

    /// Begin a host-to-device transfer in DRQ blocks of `block` sectors.
    fn start_pio_out(&mut self, block: u32) {
        let Some((lba, count)) = self.command_range()
        else {
            return self.id_not_found();
        };
        log::trace!("start_pio_out(): lba: {} count: {} block: {}", lba, count, block);

        // The first block is requested without an interrupt.
        self.block_size = block;
        self.buffer_pos = 0;
        self.transfer = Transfer::PioOut {
            lba,
            remaining: count,
            block_left: count.min(block),
        };
        self.status.set_ready(true);
        self.status.set_drq(true);
    }

    /// ATA command 0x20/0x21: Read Sector(s)
    fn command_read_sectors(&mut self) {
        self.start_pio_in(1);
    }

    /// ATA command 0x30/0x31: Write Sector(s)
    fn command_write_sectors(&mut self) {
        self.start_pio_out(1);
    }

    /// ATA command 0xC4: Read Multiple
    fn command_read_multiple(&mut self) {
        match self.multiple {
            0 => {
                log::debug!("command_read_multiple(): multiple mode not enabled");
                self.abort();
            }
            n => self.start_pio_in(n as u32),
        }
    }

    /// ATA command 0xC5: Write Multiple
    fn command_write_multiple(&mut self) {
        match self.multiple {
            0 => {
                log::debug!("command_write_multiple(): multiple mode not enabled");
                self.abort();
            }
            n => self.start_pio_out(n as u32),
        }
    }

    /// ATA command 0x40/0x41: Read Verify Sector(s)
    fn command_read_verify(&mut self) {
        match self.command_range() {
            Some(_) => self.complete(),
            None => self.id_not_found(),
        }
    }

    /// ATA command 0x91: Initialize Device Parameters
    fn command_initialize_device_parameters(&mut self) {
        let heads = (self.device_head & 0x0F) + 1;
        match DriveGeometry::translated(self.total_sectors as u64, heads, self.sector_count) {
            Some(geometry) => {
                log::debug!("Initialize Device Parameters: translation {}", geometry);
                self.geometry = geometry;
                self.complete();
            }
            None => self.abort(),
        }
    }

    /// ATA command 0xC6: Set Multiple Mode
    fn command_set_multiple_mode(&mut self) {
        match self.sector_count {
            0 => {
                self.multiple = 0;
                self.complete();
            }
            n if n.is_power_of_two() && n <= MAX_MULTIPLE => {
                self.multiple = n;
                self.complete();
            }
            _ => self.abort(),
        }
    }

    /// ATA command 0xEC: Identify Device
    fn command_identify_device(&mut self) {
        let id_blob = AtaDriveIdentification::new(
            &self.default_geometry,
            &self.geometry,
            self.total_sectors,
            MAX_MULTIPLE,
            self.multiple,
        );
        self.buffer.fill(0);
        let mut cursor = Cursor::new(self.buffer.as_mut_slice());
        match id_blob.write(&mut cursor) {
            Ok(_) => {
                self.buffer_pos = 0;
                self.transfer = Transfer::PioIn {
                    lba: 0,
                    remaining: 1,
                    block_left: 1,
                };
                self.status.set_ready(true);
                self.status.set_drq(true);
                self.raise_intrq();
            }
            Err(e) => {
                log::error!("Error writing Drive Identification block to sector buffer: {}", e);
                self.abort();
            }
        }
    }

    /// Advance past a finished sector. Starting a new block raises INTRQ.
    fn next_block_left(&mut self, block_left: u32, remaining: u32) -> u32 {
        if block_left > 1 {
            block_left - 1
        }
        else {
            self.raise_intrq();
            remaining.min(self.block_size)
        }
    }

    fn data_in(&mut self) -> u16 {
        let Transfer::PioIn {
            lba,
            remaining,
            block_left,
        } = self.transfer
        else {
            log::warn!("AtaDrive: data register read with no transfer pending");
            return 0xFFFF;
        };

        let word = u16::from_be_bytes([self.buffer[self.buffer_pos], self.buffer[self.buffer_pos + 1]]);
        self.buffer_pos += 2;

        if self.buffer_pos >= SECTOR_SIZE {
            if remaining > 1 {
                let next = lba + 1;
                if let Err(e) = self.load_sector(next) {
                    self.media_error(e);
                    return word;
                }
                let block_left = self.next_block_left(block_left, remaining - 1);
                self.transfer = Transfer::PioIn {
                    lba: next,
                    remaining: remaining - 1,
                    block_left,
                };
            }
            else {
                self.transfer = Transfer::None;
                self.status.set_drq(false);
            }
        }
        word
    }

    fn data_out(&mut self, value: u16) {
        let Transfer::PioOut {
            lba,
            remaining,
            block_left,
        } = self.transfer
        else {
            log::warn!("AtaDrive: data register write with no transfer pending");
            return;
        };

        self.buffer[self.buffer_pos..self.buffer_pos + 2].copy_from_slice(&value.to_be_bytes());
        self.buffer_pos += 2;

        if self.buffer_pos >= SECTOR_SIZE {
            if let Err(e) = self.store_sector(lba) {
                return self.media_error(e);
            }
            if remaining > 1 {
                self.buffer_pos = 0;
                let block_left = self.next_block_left(block_left, remaining - 1);
                self.transfer = Transfer::PioOut {
                    lba: lba + 1,
                    remaining: remaining - 1,
                    block_left,
                };
            }
            else {
                self.transfer = Transfer::None;
                self.complete();
            }
        }
    }

    fn device_control_write(&mut self, byte: u8) {
        let was_resetting = self.device_control & DEVICE_CONTROL_SRST != 0;
        self.device_control = byte;

        if byte & DEVICE_CONTROL_SRST != 0 {
            if !was_resetting {
                log::debug!("AtaDrive: software reset");
                self.reset();
            }
            self.status.set_busy(true);
        }
        else if was_resetting {
            self.status.set_busy(false);
        }
    }
}

impl<S: Read + Write + Seek> IdeDrive for AtaDrive<S> {
    fn read_register(&mut self, reg: IdeRegister) -> u8 {
        match reg {
            IdeRegister::Status => {
                if self.device1_selected() {
                    return 0;
                }
                self.intrq = false;
                self.status_byte()
            }
            IdeRegister::AltStatus => {
                if self.device1_selected() {
                    return 0;
                }
                self.status_byte()
            }
            IdeRegister::Error => self.error.into_bytes()[0],
            IdeRegister::SectorCount => self.sector_count,
            IdeRegister::SectorNumber => self.sector_number,
            IdeRegister::CylinderLow => self.cylinder_low,
            IdeRegister::CylinderHigh => self.cylinder_high,
            IdeRegister::DeviceHead => self.device_head,
            IdeRegister::Data | IdeRegister::Feature | IdeRegister::Command | IdeRegister::DeviceControl => {
                log::warn!("AtaDrive: byte read of {} register", reg);
                0xFF
            }
        }
    }

    fn write_register(&mut self, reg: IdeRegister, value: u8) {
        match reg {
            IdeRegister::Feature => self.feature = value,
            IdeRegister::SectorCount => self.sector_count = value,
            IdeRegister::SectorNumber => self.sector_number = value,
            IdeRegister::CylinderLow => self.cylinder_low = value,
            IdeRegister::CylinderHigh => self.cylinder_high = value,
            IdeRegister::DeviceHead => self.device_head = value,
            IdeRegister::Command => {
                if self.device1_selected() {
                    log::debug!("AtaDrive: command {:02X} for absent device 1 ignored", value);
                    return;
                }
                self.intrq = false;
                self.execute(value);
            }
            IdeRegister::DeviceControl => self.device_control_write(value),
            IdeRegister::Data | IdeRegister::Error | IdeRegister::Status | IdeRegister::AltStatus => {
                log::warn!("AtaDrive: byte write of {} register", reg);
            }
        }
    }

    fn read_data(&mut self) -> u16 {
        self.data_in()
    }

    fn write_data(&mut self, value: u16) {
        self.data_out(value)
    }

    fn intrq(&self) -> bool {
        self.intrq
    }

    fn reset(&mut self) {
        self.status = AtaStatusRegister::new().with_ready(true).with_dsc(true);
        self.error = AtaErrorRegister::from_bytes([DIAGNOSTIC_PASSED]);
        self.sector_count = 1;
        self.sector_number = 1;
        self.cylinder_low = 0;
        self.cylinder_high = 0;
        self.device_head = 0;
        self.transfer = Transfer::None;
        self.buffer_pos = SECTOR_SIZE;
        self.intrq = false;
    }
}
