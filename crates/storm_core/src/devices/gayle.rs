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

    devices/gayle.rs

    Gayle IDE controller bridge

*/

//! Gayle as seen by the 68k: the ATA task file at 0xDA2000, the card-control, IRQ,
//! interrupt-enable and config registers, and the serial ident port at 0xDE1000 that
//! Kickstart shifts eight bits from to detect the chip.
//!
//! Every register is byte wide except the data port, which only takes word accesses.
//! Accesses to anything else in the Gayle windows are logged and read back as
//! open bus.

use crate::{
    bus::{BusContext, MemRangeDescriptor, MemoryMappedDevice},
    devices::ata::{IdeDrive, IdeRegister},
    interrupt::Int2Source,
};

pub const GDATA: u32 = 0xDA2000;
pub const GERROR: u32 = 0xDA2004;
pub const GFEAT: u32 = GERROR;
pub const GSECTCNT: u32 = 0xDA2008;
pub const GSECTNUM: u32 = 0xDA200C;
pub const GCYLLOW: u32 = 0xDA2010;
pub const GCYLHIGH: u32 = 0xDA2014;
pub const GDEVHEAD: u32 = 0xDA2018;
pub const GSTATUS: u32 = 0xDA201C;
pub const GCMD: u32 = GSTATUS;
pub const GCTRL: u32 = 0xDA3018;

pub const GIDENT: u32 = 0xDE1000;
pub const GCS: u32 = 0xDA8000;
pub const GIRQ: u32 = 0xDA9000;
pub const GINT: u32 = 0xDAA000;
// Corrected from 0xDAB00, which fell outside both Gayle windows.
pub const GCONF: u32 = 0xDAB000;

pub const GAYLE_IRQ_BERR: u8 = 0x01;
pub const GAYLE_IRQ_RESET: u8 = 0x02;
pub const GAYLE_IRQ_IDE: u8 = 0x80;
pub const GAYLE_INT_IDE: u8 = 0x80;

/// Card control bits that are kept apart from the write mask.
const GAYLE_CS_BITS: u8 = 0x03;
/// GIRQ always reads back with the IDE bit set.
const GIRQ_READ_VALUE: u8 = GAYLE_IRQ_IDE;
const GAYLE_CFG_MASK: u8 = 0x0F;

const OPEN_BUS_BYTE: u8 = 0xFF;
const OPEN_BUS_WORD: u16 = 0x8000;

pub const GAYLE_RANGES: [(u32, u32); 2] = [(0xD8_0000, 0x4_0000), (0xDD_0000, 0x2_0000)];

#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum GayleRegister {
    Data,
    ErrorFeature,
    SectorCount,
    SectorNumber,
    CylinderLow,
    CylinderHigh,
    DeviceHead,
    StatusCommand,
    AltStatusControl,
    Ident,
    CardControl,
    Irq,
    IntEnable,
    Config,
}

const REGISTER_MAP: [(u32, GayleRegister); 14] = [
    (GDATA, GayleRegister::Data),
    (GERROR, GayleRegister::ErrorFeature),
    (GSECTCNT, GayleRegister::SectorCount),
    (GSECTNUM, GayleRegister::SectorNumber),
    (GCYLLOW, GayleRegister::CylinderLow),
    (GCYLHIGH, GayleRegister::CylinderHigh),
    (GDEVHEAD, GayleRegister::DeviceHead),
    (GSTATUS, GayleRegister::StatusCommand),
    (GCTRL, GayleRegister::AltStatusControl),
    (GIDENT, GayleRegister::Ident),
    (GCS, GayleRegister::CardControl),
    (GIRQ, GayleRegister::Irq),
    (GINT, GayleRegister::IntEnable),
    (GCONF, GayleRegister::Config),
];

impl GayleRegister {
    pub fn decode(address: u32) -> Option<Self> {
        REGISTER_MAP
            .iter()
            .find(|(reg_address, _)| *reg_address == address)
            .map(|(_, reg)| *reg)
    }

    /// The task file register read through this address, if any.
    pub fn ide_read_target(self) -> Option<IdeRegister> {
        match self {
            GayleRegister::Data => Some(IdeRegister::Data),
            GayleRegister::ErrorFeature => Some(IdeRegister::Error),
            GayleRegister::SectorCount => Some(IdeRegister::SectorCount),
            GayleRegister::SectorNumber => Some(IdeRegister::SectorNumber),
            GayleRegister::CylinderLow => Some(IdeRegister::CylinderLow),
            GayleRegister::CylinderHigh => Some(IdeRegister::CylinderHigh),
            GayleRegister::DeviceHead => Some(IdeRegister::DeviceHead),
            GayleRegister::StatusCommand => Some(IdeRegister::Status),
            GayleRegister::AltStatusControl => Some(IdeRegister::AltStatus),
            _ => None,
        }
    }

    /// The task file register written through this address, if any.
    pub fn ide_write_target(self) -> Option<IdeRegister> {
        match self {
            GayleRegister::ErrorFeature => Some(IdeRegister::Feature),
            GayleRegister::StatusCommand => Some(IdeRegister::Command),
            GayleRegister::AltStatusControl => Some(IdeRegister::DeviceControl),
            other => other.ide_read_target(),
        }
    }
}

pub struct GayleController {
    drive: Box<dyn IdeDrive>,
    ident_counter: u8,
    irq: u8,
    int: u8,
    cs: u8,
    cs_mask: u8,
    cfg: u8,
}

impl GayleController {
    pub fn new(mut drive: Box<dyn IdeDrive>) -> Self {
        drive.reset();
        Self {
            drive,
            ident_counter: 0,
            irq: 0,
            int: 0,
            cs: 0,
            cs_mask: 0,
            cfg: 0,
        }
    }

    /// The address ranges Gayle claims on the router.
    pub fn mapping() -> Vec<MemRangeDescriptor> {
        GAYLE_RANGES
            .iter()
            .map(|&(address, size)| MemRangeDescriptor::new(address, size))
            .collect()
    }

    pub fn drive(&self) -> &dyn IdeDrive {
        self.drive.as_ref()
    }

    pub fn read_byte(&mut self, address: u32) -> u8 {
        let Some(reg) = GayleRegister::decode(address)
        else {
            log::warn!("Gayle: byte read from unmapped address {:06X}", address);
            return OPEN_BUS_BYTE;
        };

        match reg {
            GayleRegister::Ident => {
                let value = match self.ident_counter {
                    0 | 1 | 3 => 0x80,
                    _ => 0x00,
                };
                self.ident_counter = self.ident_counter.saturating_add(1);
                value
            }
            GayleRegister::Irq => GIRQ_READ_VALUE,
            GayleRegister::CardControl => self.cs_mask | self.cs,
            GayleRegister::IntEnable => self.int,
            GayleRegister::Config => self.cfg & GAYLE_CFG_MASK,
            GayleRegister::Data => {
                log::warn!("Gayle: byte read of data port");
                OPEN_BUS_BYTE
            }
            _ => match reg.ide_read_target() {
                Some(ide_reg) => self.drive.read_register(ide_reg),
                None => OPEN_BUS_BYTE,
            },
        }
    }

    pub fn write_byte(&mut self, address: u32, value: u8) {
        let Some(reg) = GayleRegister::decode(address)
        else {
            log::warn!("Gayle: byte write to unmapped address {:06X}: {:02X}", address, value);
            return;
        };

        match reg {
            GayleRegister::Ident => self.ident_counter = 0,
            GayleRegister::Irq => {
                self.irq = (self.irq & value) | (value & (GAYLE_IRQ_RESET | GAYLE_IRQ_BERR));
            }
            GayleRegister::CardControl => {
                log::debug!("Gayle: card control write: {:02X}", value);
                self.cs_mask = value & !GAYLE_CS_BITS;
                self.cs = (self.cs & !GAYLE_CS_BITS) | (value & GAYLE_CS_BITS);
            }
            GayleRegister::IntEnable => {
                log::debug!("Gayle: interrupt enable write: {:02X}", value);
                self.int = value;
            }
            GayleRegister::Config => {
                log::debug!("Gayle: config write: {:02X}", value);
                self.cfg = value;
            }
            GayleRegister::Data => log::warn!("Gayle: byte write of data port: {:02X}", value),
            _ => {
                if let Some(ide_reg) = reg.ide_write_target() {
                    self.drive.write_register(ide_reg, value);
                }
            }
        }
    }

    pub fn read_word(&mut self, address: u32) -> u16 {
        if address == GDATA {
            return self.drive.read_data();
        }
        log::warn!("Gayle: word read from {:06X}", address);
        OPEN_BUS_WORD
    }

    pub fn write_word(&mut self, address: u32, value: u16) {
        if address == GDATA {
            return self.drive.write_data(value);
        }
        log::warn!("Gayle: word write to {:06X}: {:04X}", address, value);
    }

    pub fn irq_latch(&self) -> u8 {
        self.irq
    }
}

impl MemoryMappedDevice for GayleController {
    fn mmio_read_u8(&mut self, address: u32, _ctx: &mut BusContext) -> u8 {
        self.read_byte(address)
    }

    fn mmio_read_u16(&mut self, address: u32, _ctx: &mut BusContext) -> u16 {
        self.read_word(address)
    }

    fn mmio_read_u32(&mut self, address: u32, _ctx: &mut BusContext) -> u32 {
        log::warn!("Gayle: long read from {:06X}", address);
        OPEN_BUS_WORD as u32
    }

    fn mmio_write_u8(&mut self, address: u32, data: u8, _ctx: &mut BusContext) {
        self.write_byte(address, data)
    }

    fn mmio_write_u16(&mut self, address: u32, data: u16, _ctx: &mut BusContext) {
        self.write_word(address, data)
    }

    fn mmio_write_u32(&mut self, address: u32, data: u32, _ctx: &mut BusContext) {
        log::warn!("Gayle: long write to {:06X}: {:08X}", address, data);
    }

    fn name(&self) -> &'static str {
        "Gayle"
    }
}

impl Int2Source for GayleController {
    fn check_irq(&self) -> bool {
        self.int & GAYLE_INT_IDE != 0 && self.drive.intrq()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::{
        interrupt::InterruptController,
        protocol::{sim::SimulatedPeer, Protocol},
    };

    #[derive(Default)]
    struct DriveState {
        registers: Vec<(IdeRegister, u8)>,
        data: Vec<u16>,
        intrq: bool,
        resets: u32,
    }

    /// A drive that records what reaches it.
    #[derive(Clone, Default)]
    struct RecordingDrive(Rc<RefCell<DriveState>>);

    impl IdeDrive for RecordingDrive {
        fn read_register(&mut self, reg: IdeRegister) -> u8 {
            match reg {
                IdeRegister::Status => 0x50,
                IdeRegister::AltStatus => 0x51,
                IdeRegister::Error => 0x01,
                _ => 0x00,
            }
        }
        fn write_register(&mut self, reg: IdeRegister, value: u8) {
            self.0.borrow_mut().registers.push((reg, value));
        }
        fn read_data(&mut self) -> u16 {
            0xA55A
        }
        fn write_data(&mut self, value: u16) {
            self.0.borrow_mut().data.push(value);
        }
        fn intrq(&self) -> bool {
            self.0.borrow().intrq
        }
        fn reset(&mut self) {
            self.0.borrow_mut().resets += 1;
        }
    }

    fn gayle() -> (GayleController, RecordingDrive) {
        let drive = RecordingDrive::default();
        (GayleController::new(Box::new(drive.clone())), drive)
    }

    #[test]
    fn drive_reset_on_attach() {
        let (_gayle, drive) = gayle();
        assert_eq!(drive.0.borrow().resets, 1);
    }

    #[test]
    fn ident_sequence() {
        let (mut gayle, _) = gayle();
        let bits: Vec<u8> = (0..8).map(|_| gayle.read_byte(GIDENT)).collect();
        assert_eq!(bits, [0x80, 0x80, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00]);

        gayle.write_byte(GIDENT, 0x00);
        assert_eq!(gayle.read_byte(GIDENT), 0x80);
    }

    #[test]
    fn ident_counter_saturates() {
        let (mut gayle, _) = gayle();
        for _ in 0..1000 {
            gayle.read_byte(GIDENT);
        }
        assert_eq!(gayle.read_byte(GIDENT), 0x00);
    }

    #[test]
    fn card_control() {
        let (mut gayle, _) = gayle();
        gayle.write_byte(GCS, 0b101);
        assert_eq!(gayle.read_byte(GCS), 0b101);
        gayle.write_byte(GCS, 0b10);
        assert_eq!(gayle.read_byte(GCS), 0b10);
        gayle.write_byte(GCS, 0xF1);
        assert_eq!(gayle.read_byte(GCS), 0xF1);
    }

    #[test]
    fn irq_register() {
        let (mut gayle, _) = gayle();
        gayle.write_byte(GIRQ, 0xFF);
        assert_eq!(gayle.irq_latch(), GAYLE_IRQ_RESET | GAYLE_IRQ_BERR);
        gayle.write_byte(GIRQ, GAYLE_IRQ_BERR);
        assert_eq!(gayle.irq_latch(), GAYLE_IRQ_BERR);
        gayle.write_byte(GIRQ, 0x00);
        assert_eq!(gayle.irq_latch(), 0);
        assert_eq!(gayle.read_byte(GIRQ), 0x80);
    }

    #[test]
    fn int_enable_and_config() {
        let (mut gayle, _) = gayle();
        gayle.write_byte(GINT, 0x83);
        assert_eq!(gayle.read_byte(GINT), 0x83);
        gayle.write_byte(GCONF, 0xA5);
        assert_eq!(gayle.read_byte(GCONF), 0x05);
    }

    #[test]
    fn task_file_routing() {
        let (mut gayle, drive) = gayle();
        gayle.write_byte(GFEAT, 0x01);
        gayle.write_byte(GSECTCNT, 0x02);
        gayle.write_byte(GSECTNUM, 0x03);
        gayle.write_byte(GCYLLOW, 0x04);
        gayle.write_byte(GCYLHIGH, 0x05);
        gayle.write_byte(GDEVHEAD, 0xA0);
        gayle.write_byte(GCMD, 0xEC);
        gayle.write_byte(GCTRL, 0x02);

        assert_eq!(
            drive.0.borrow().registers,
            [
                (IdeRegister::Feature, 0x01),
                (IdeRegister::SectorCount, 0x02),
                (IdeRegister::SectorNumber, 0x03),
                (IdeRegister::CylinderLow, 0x04),
                (IdeRegister::CylinderHigh, 0x05),
                (IdeRegister::DeviceHead, 0xA0),
                (IdeRegister::Command, 0xEC),
                (IdeRegister::DeviceControl, 0x02),
            ]
        );

        assert_eq!(gayle.read_byte(GSTATUS), 0x50);
        assert_eq!(gayle.read_byte(GCTRL), 0x51);
        assert_eq!(gayle.read_byte(GERROR), 0x01);
    }

    #[test]
    fn data_port_is_word_only() {
        let (mut gayle, drive) = gayle();
        assert_eq!(gayle.read_word(GDATA), 0xA55A);
        gayle.write_word(GDATA, 0x1234);
        assert_eq!(drive.0.borrow().data, [0x1234]);

        assert_eq!(gayle.read_byte(GDATA), 0xFF);
        gayle.write_byte(GDATA, 0x12);
        assert_eq!(drive.0.borrow().data.len(), 1);
    }

    #[test]
    fn open_bus_fallbacks() {
        let (mut gayle, drive) = gayle();
        assert_eq!(gayle.read_byte(0xDA4000), 0xFF);
        assert_eq!(gayle.read_word(GSTATUS), 0x8000);
        gayle.write_byte(0xDA4000, 0x00);
        assert!(drive.0.borrow().registers.is_empty());
    }

    #[test]
    fn long_access_falls_back() {
        let (mut gayle, drive) = gayle();
        let mut bus = Protocol::new(SimulatedPeer::new());
        bus.init();
        bus.window_mut().set_trace(true);
        let mut irq = InterruptController::new();
        let mut ctx = BusContext { bus: &mut bus, irq: &mut irq };

        assert_eq!(gayle.mmio_read_u32(GIDENT, &mut ctx), 0x8000);
        assert_eq!(gayle.read_byte(GIDENT), 0x80);
        assert_eq!(gayle.read_byte(GIDENT), 0x80);
        assert_eq!(gayle.read_byte(GIDENT), 0x00);

        gayle.write_byte(GCS, 0b101);
        gayle.mmio_write_u32(GCS, 0xFFFF_FFFF, &mut ctx);
        assert_eq!(gayle.read_byte(GCS), 0b101);
        gayle.mmio_write_u32(GDATA, 0x1234_5678, &mut ctx);
        assert!(drive.0.borrow().data.is_empty());
        assert!(bus.window().cycles().is_empty());
    }

    #[test]
    fn int2_requires_enable_and_intrq() {
        let (mut gayle, drive) = gayle();
        drive.0.borrow_mut().intrq = true;
        assert!(!gayle.check_irq());
        gayle.write_byte(GINT, GAYLE_INT_IDE);
        assert!(gayle.check_irq());
        drive.0.borrow_mut().intrq = false;
        assert!(!gayle.check_irq());
    }

    #[test]
    fn mapping_is_page_aligned() {
        let mapping = GayleController::mapping();
        assert_eq!(mapping.len(), 2);
        for range in mapping {
            assert_eq!(range.address & 0xFFFF, 0);
            assert_eq!(range.size & 0xFFFF, 0);
        }
        assert!(GayleController::mapping()[1].contains(GIDENT));
        assert!(GayleController::mapping()[0].contains(GCONF));
    }
}
