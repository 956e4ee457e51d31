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

    monitor.rs

    Interrupt monitor loop.

*/


//! With no instruction engine attached, the monitor stands in for one: it idles for
//! the wall-clock length of each quantum and reports every change of the presented
//! interrupt level. This keeps the interrupt path live against real hardware.

use std::{thread, time::Duration};

use storm_core::{
    cpu::{CpuEngine, CpuMemory},
    machine::Machine,
    protocol::window::PeripheralWindow,
};

/// PAL 68000 clock.
pub const CPU_CLOCK_HZ: u64 = 7_093_790;

#[derive(Default)]
pub struct MonitorCpu {
    ipl: u8,
    ipl_changes: u64,
}

impl MonitorCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ipl(&self) -> u8 {
        self.ipl
    }

    pub fn ipl_changes(&self) -> u64 {
        self.ipl_changes
    }
}

impl CpuEngine for MonitorCpu {
    fn execute(&mut self, cycles: u32, _memory: &mut dyn CpuMemory) -> u32 {
        thread::sleep(Duration::from_nanos(cycles as u64 * 1_000_000_000 / CPU_CLOCK_HZ));
        cycles
    }

    fn set_irq(&mut self, level: u8) {
        if level != self.ipl {
            log::info!("IPL {} -> {}", self.ipl, level);
            self.ipl = level;
            self.ipl_changes += 1;
        }
    }
}

/// Run quanta until `quanta` have elapsed, or forever if no limit is given.
pub fn run_monitor<W: PeripheralWindow>(machine: &mut Machine<W>, quanta: Option<u64>) -> anyhow::Result<()> {
    let mut cpu = MonitorCpu::new();
    log::info!("Monitoring interrupts, {} cycles per quantum", machine.quantum_cycles());

    while quanta.map_or(true, |limit| machine.quanta() < limit) {
        machine.run_quantum(&mut cpu);
    }

    log::info!(
        "Monitor stopped after {} quanta, {} IPL change(s)",
        machine.quanta(),
        cpu.ipl_changes()
    );
    Ok(())
}
