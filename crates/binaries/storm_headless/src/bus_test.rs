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

    bus_test.rs

    Raw bus self-test.

*/


//! Walks a range of peer memory with word and byte patterns, straight over the bus
//! engine. Every address is written before any is read back, so address line faults
//! show up as aliasing.

use storm_config::BusTest;
use storm_core::{
    bus::{BusWidth, PeerBus},
    machine::Machine,
    protocol::window::PeripheralWindow,
};

/// Mismatches past this many are counted but not logged.
const MAX_LOGGED_ERRORS: u64 = 32;

/// Longs first, bytes last.
const WIDTHS: [BusWidth; 3] = [BusWidth::Long, BusWidth::Word, BusWidth::Byte];

fn word_pattern(address: u32, pass: u32) -> u16 {
    ((address >> 1) as u16) ^ (pass as u16).wrapping_mul(0x3C5A)
}

fn byte_pattern(address: u32, pass: u32) -> u8 {
    (address as u8) ^ (address >> 8) as u8 ^ (pass as u8).wrapping_mul(0x5B)
}

fn pattern(address: u32, pass: u32, width: BusWidth) -> u32 {
    match width {
        BusWidth::Byte => byte_pattern(address, pass) as u32,
        BusWidth::Word => word_pattern(address, pass) as u32,
        BusWidth::Long => (word_pattern(address, pass) as u32) << 16 | !word_pattern(address, pass) as u32,
    }
}

fn stride(width: BusWidth) -> u32 {
    match width {
        BusWidth::Byte => 1,
        BusWidth::Word => 2,
        BusWidth::Long => 4,
    }
}

/// Write every slot of `width` in [base, end), then read them all back.
fn walk(bus: &mut dyn PeerBus, base: u32, end: u32, width: BusWidth, pass: u32, errors: &mut u64) {
    let step = stride(width);
    let slots = move || {
        (base..end)
            .step_by(step as usize)
            .take_while(move |a| a.saturating_add(step) <= end)
    };

    for address in slots() {
        bus.write(address, pattern(address, pass, width), width);
    }
    for address in slots() {
        let expected = pattern(address, pass, width);
        let actual = bus.read(address, width);
        if actual != expected {
            *errors += 1;
            if *errors <= MAX_LOGGED_ERRORS {
                log::error!(
                    "{:?} mismatch at {:06X}: wrote {:08X}, read {:08X}",
                    width,
                    address,
                    expected,
                    actual
                );
            }
        }
    }
}

pub fn run_bus_test<W: PeripheralWindow>(machine: &mut Machine<W>, params: &BusTest) -> anyhow::Result<()> {
    let base = params.base & !1;
    let end = base.saturating_add(params.size & !1);
    log::info!(
        "Bus test: {:06X}-{:06X}, {} pass(es)",
        base,
        end,
        params.passes
    );

    let bus = machine.bus_mut();
    let mut errors = 0u64;

    for pass in 0..params.passes {
        for width in WIDTHS {
            walk(bus, base, end, width, pass, &mut errors);
        }
        log::info!("Bus test pass {} complete, {} error(s) so far", pass + 1, errors);
    }

    if errors > 0 {
        anyhow::bail!("bus test failed with {} mismatch(es)", errors);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use storm_core::protocol::sim::SimulatedPeer;

    use super::*;

    #[test]
    fn passes_on_healthy_bus() {
        let mut machine = Machine::new(SimulatedPeer::new(), 300);
        machine.boot();
        let params = BusTest {
            base: 0x1000,
            size: 0x200,
            passes: 2,
        };
        run_bus_test(&mut machine, &params).unwrap();
        assert_eq!(machine.bus().window().peek_u8(0x1000), byte_pattern(0x1000, 1));
        assert_eq!(machine.bus().window().faults(), 0);
    }

    #[test]
    fn patterns_vary_between_passes() {
        assert_ne!(word_pattern(0x1000, 0), word_pattern(0x1000, 1));
        assert_ne!(byte_pattern(0x1000, 0), byte_pattern(0x1000, 1));
        assert_ne!(word_pattern(0x1000, 0), word_pattern(0x1002, 0));
        assert_eq!(pattern(0x1000, 0, BusWidth::Long) >> 16, word_pattern(0x1000, 0) as u32);
    }

    #[test]
    fn long_slots_stay_inside_range() {
        let mut machine = Machine::new(SimulatedPeer::new(), 300);
        machine.boot();
        machine.bus_mut().write_u16(0x2006, 0x4242);
        let mut errors = 0;
        walk(machine.bus_mut(), 0x2000, 0x2006, BusWidth::Long, 0, &mut errors);
        assert_eq!(errors, 0);
        assert_eq!(machine.bus().window().peek_u16(0x2006), 0x4242);
    }
}
