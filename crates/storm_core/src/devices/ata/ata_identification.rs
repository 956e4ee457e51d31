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

    devices/ata/ata_identification.rs

    IDENTIFY DEVICE data block

*/

//! An implementation of the ATA Drive Identification structure. Only the first 64
//! words are modelled; the rest of the 512 byte block stays zero.

use std::str::FromStr;

use binrw::binrw;

use crate::devices::ata::{ata_string::AtaString, geometry::DriveGeometry};

pub const GENERAL_FIXED_DISK: u16 = 0x0040;
pub const CAPABILITIES_LBA: u16 = 0x0200;
pub const FIELD_VALIDITY_CURRENT: u16 = 0x0001;
pub const MULTIPLE_SECTOR_VALID: u16 = 0x0100;
pub const MAX_MULTIPLE_MARKER: u8 = 0x80;

pub const MODEL_NUMBER: &str = "STORM GAYLE IDE";
pub const FIRMWARE_REVISION: &str = "0.1.0";
pub const SERIAL_NUMBER: &str = "STORM00000001";

#[binrw]
#[brw(big)]
#[derive(Default)]
pub struct AtaDriveIdentification {
    pub general: u16,
    pub cylinders: u16,
    pub specific_configuration: u16,
    pub num_heads: u16,
    pub unformatted_bytes_per_track: u16,
    pub unformatted_bytes_per_sector: u16,
    pub sectors_per_track: u16,
    pub vendor_unique: [u16; 3],
    pub serial_no: AtaString<20>,
    pub buffer_type: u16,
    pub buffer_size: u16,
    pub long_cmd_bytes: u16,
    pub firmware_revision: AtaString<8>,
    pub model_number: AtaString<40>,
    // Word 47: marker in the high byte, maximum multiple count in the low byte.
    pub max_multiple_marker: u8,
    pub maximum_block_transfer: u8,
    pub double_word_io: u16,
    pub capabilities: u16,
    pub reserved: u16,
    pub pio_timing: u16,
    pub dma_timing: u16,
    pub field_validity: u16,
    pub current_cylinders: u16,
    pub current_heads: u16,
    pub current_sectors_per_track: u16,
    pub current_capacity_low: u16,
    pub current_capacity_high: u16,
    pub multiple_sector: u16,
    pub user_addressable_sectors_low: u16,
    pub user_addressable_sectors_high: u16,
    pub single_word_dma: u16,
    pub multi_word_dma: u16,
}

impl AtaDriveIdentification {
    pub fn new(
        default: &DriveGeometry,
        current: &DriveGeometry,
        total_sectors: u32,
        max_multiple: u8,
        current_multiple: u8,
    ) -> Self {
        let current_capacity = current.total_sectors();
        let sector_size = crate::devices::ata::SECTOR_SIZE as u16;

        let multiple_sector = if current_multiple > 0 {
            MULTIPLE_SECTOR_VALID | current_multiple as u16
        }
        else {
            0
        };

        AtaDriveIdentification {
            general: GENERAL_FIXED_DISK,
            cylinders: default.c(),
            num_heads: default.h() as u16,
            unformatted_bytes_per_track: sector_size * default.s() as u16,
            unformatted_bytes_per_sector: sector_size,
            sectors_per_track: default.s() as u16,
            serial_no: AtaString::from_str(SERIAL_NUMBER).unwrap_or_default(),
            firmware_revision: AtaString::from_str(FIRMWARE_REVISION).unwrap_or_default(),
            model_number: AtaString::from_str(MODEL_NUMBER).unwrap_or_default(),
            max_multiple_marker: MAX_MULTIPLE_MARKER,
            maximum_block_transfer: max_multiple,
            capabilities: CAPABILITIES_LBA,
            field_validity: FIELD_VALIDITY_CURRENT,
            current_cylinders: current.c(),
            current_heads: current.h() as u16,
            current_sectors_per_track: current.s() as u16,
            current_capacity_low: current_capacity as u16,
            current_capacity_high: (current_capacity >> 16) as u16,
            multiple_sector,
            user_addressable_sectors_low: total_sectors as u16,
            user_addressable_sectors_high: (total_sectors >> 16) as u16,
            ..Default::default()
        }
    }
}
