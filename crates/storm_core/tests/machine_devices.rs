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

    tests::machine_devices.rs

    Machine level tests: devices installed on the router, driven through CpuMemory.

*/

use std::{cell::RefCell, io::Cursor, rc::Rc};

use storm_core::{
    cpu::{CpuEngine, CpuMemory},
    devices::{
        ata::{AtaDrive, SECTOR_SIZE},
        custom_chips::CustomChips,
        gayle::*,
    },
    interrupt::{IrqError, INTENA, INTENAR, INTF_INTEN, INTF_PORTS, INTF_SETCLR, INTREQR, MAX_INT2_SOURCES},
    machine::{Machine, DEFAULT_QUANTUM_CYCLES},
    protocol::sim::SimulatedPeer,
};

const ST_DRQ: u8 = 0x08;
const ST_ERR: u8 = 0x01;

struct IdleCpu {
    ipl: u8,
}

impl CpuEngine for IdleCpu {
    fn execute(&mut self, cycles: u32, _memory: &mut dyn CpuMemory) -> u32 {
        cycles
    }

    fn set_irq(&mut self, level: u8) {
        self.ipl = level;
    }
}

/// Two cylinders at 16x63; every byte of sector n holds n as u8.
fn image() -> Cursor<Vec<u8>> {
    let mut image = vec![0u8; 2 * 16 * 63 * SECTOR_SIZE];
    for (n, sector) in image.chunks_mut(SECTOR_SIZE).enumerate() {
        sector.fill(n as u8);
    }
    Cursor::new(image)
}

fn machine() -> (Machine<SimulatedPeer>, Rc<RefCell<GayleController>>) {
    let mut machine = Machine::new(SimulatedPeer::new(), DEFAULT_QUANTUM_CYCLES);
    machine
        .install_device(Box::new(CustomChips::new()), &[CustomChips::mapping()])
        .unwrap();

    let drive = AtaDrive::new(image()).unwrap();
    let gayle = Rc::new(RefCell::new(GayleController::new(Box::new(drive))));
    machine
        .install_device(Box::new(gayle.clone()), &GayleController::mapping())
        .unwrap();
    machine.add_int2_source(Box::new(gayle.clone())).unwrap();

    machine.boot();
    (machine, gayle)
}

fn select_lba(machine: &mut Machine<SimulatedPeer>, lba: u32, count: u8) {
    machine.write_u8(GDEVHEAD, 0xE0 | ((lba >> 24) as u8 & 0x0F));
    machine.write_u8(GCYLHIGH, (lba >> 16) as u8);
    machine.write_u8(GCYLLOW, (lba >> 8) as u8);
    machine.write_u8(GSECTNUM, lba as u8);
    machine.write_u8(GSECTCNT, count);
}

#[test]
fn gayle_ident_through_router() {
    let (mut machine, _) = machine();
    machine.write_u8(GIDENT, 0);
    let ident: u8 = (0..8).fold(0, |acc, _| (acc << 1) | (machine.read_u8(GIDENT) >> 7));
    assert_eq!(ident, 0b1101_0000);
    // Nothing reached the peer.
    assert_eq!(machine.bus().window().peek_u8(GIDENT), 0);
}

#[test]
fn gayle_card_control_through_router() {
    let (mut machine, _) = machine();
    machine.write_u8(GCS, 0b101);
    machine.write_u8(GCS, 0b10);
    assert_eq!(machine.read_u8(GCS), 0b10);
    assert_eq!(machine.read_u16(GCS), 0x8000);
}

#[test]
fn identify_through_router() {
    let (mut machine, _) = machine();
    machine.write_u8(GDEVHEAD, 0xA0);
    machine.write_u8(GCMD, 0xEC);
    assert_eq!(machine.read_u8(GSTATUS) & ST_DRQ, ST_DRQ);

    let words: Vec<u16> = (0..256).map(|_| machine.read_u16(GDATA)).collect();
    assert_eq!(words[1], 2);
    assert_eq!(words[3], 16);
    assert_eq!(words[6], 63);
    assert_eq!(machine.read_u8(GSTATUS) & ST_DRQ, 0);
}

#[test]
fn sector_write_then_read_back() {
    let (mut machine, _) = machine();

    select_lba(&mut machine, 100, 1);
    machine.write_u8(GCMD, 0x30);
    for i in 0..256u16 {
        machine.write_u16(GDATA, i.wrapping_mul(0x0101) ^ 0x5A00);
    }
    assert_eq!(machine.read_u8(GSTATUS) & (ST_DRQ | ST_ERR), 0);

    select_lba(&mut machine, 99, 3);
    machine.write_u8(GCMD, 0x20);
    let words: Vec<u16> = (0..768).map(|_| machine.read_u16(GDATA)).collect();
    assert_eq!(words[0], 0x6363);
    for i in 0..256u16 {
        assert_eq!(words[256 + i as usize], i.wrapping_mul(0x0101) ^ 0x5A00);
    }
    assert_eq!(words[512], 0x6565);
    assert_eq!(machine.read_u8(GSTATUS) & ST_DRQ, 0);
}

#[test]
fn int2_follows_gayle_and_intena() {
    let (mut machine, _) = machine();
    let mut cpu = IdleCpu { ipl: 0xFF };

    // Drive interrupt pending, but not yet enabled anywhere.
    machine.write_u8(GCMD, 0xEC);
    assert_eq!(machine.run_quantum(&mut cpu), 0);

    machine.write_u8(GINT, GAYLE_INT_IDE);
    assert_eq!(machine.run_quantum(&mut cpu), 0);

    machine.write_u16(INTENA, INTF_SETCLR | INTF_INTEN | INTF_PORTS);
    assert_eq!(machine.irq().intena_shadow(), INTF_INTEN | INTF_PORTS);
    assert_eq!(machine.run_quantum(&mut cpu), 2);
    assert_eq!(cpu.ipl, 2);
    assert_eq!(machine.read_u16(INTREQR) & INTF_PORTS, INTF_PORTS);

    // A higher hardware level wins.
    machine.bus_mut().window_mut().set_ipl(5);
    assert_eq!(machine.run_quantum(&mut cpu), 5);

    // While another master holds the bus the hardware level is not sampled.
    machine.bus_mut().window_mut().set_bus_arbitration(true);
    assert_eq!(machine.run_quantum(&mut cpu), 2);
    machine.bus_mut().window_mut().set_bus_arbitration(false);
    machine.bus_mut().window_mut().set_ipl(0);

    // Reading status acknowledges the drive.
    machine.read_u8(GSTATUS);
    assert_eq!(machine.run_quantum(&mut cpu), 0);
    assert_eq!(cpu.ipl, 0);
}

#[test]
fn intenar_read_resyncs_shadow() {
    let (mut machine, _) = machine();
    machine.write_u16(INTENA, INTF_SETCLR | INTF_INTEN | INTF_PORTS);
    machine.bus_mut().window_mut().poke_u16(INTENAR, INTF_INTEN);
    assert_eq!(machine.read_u16(INTENAR), INTF_INTEN);
    assert!(!machine.irq().int2_enabled());
}

#[test]
fn int2_registry_is_bounded() {
    let (mut machine, gayle) = machine();
    for _ in 1..MAX_INT2_SOURCES {
        machine.add_int2_source(Box::new(gayle.clone())).unwrap();
    }
    assert_eq!(
        machine.add_int2_source(Box::new(gayle.clone())).err(),
        Some(IrqError::Int2CapacityExceeded(MAX_INT2_SOURCES))
    );
}
