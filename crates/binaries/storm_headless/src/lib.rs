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

    Storm headless front-end main library component.

*/


//! Storm headless front-end main library component.

#![forbid(unsafe_code)]

mod bus_test;
mod monitor;

use std::{cell::RefCell, rc::Rc};

use anyhow::Context;

use storm_config::{Backend, ConfigFileParams, RunMode};
use storm_core::{
    devices::{ata::AtaDrive, custom_chips::CustomChips, fastmem::FastMemory, gayle::GayleController},
    machine::Machine,
    protocol::{
        sim::SimulatedPeer,
        window::{MappedWindow, PeripheralWindow},
    },
};

pub use bus_test::run_bus_test;
pub use monitor::{run_monitor, MonitorCpu};

pub fn run() -> anyhow::Result<()> {
    env_logger::init();

    // Resolve the configuration by parsing the configuration toml and merging it with
    // command line arguments.
    let config = match storm_config::read_config_file("./storm.toml") {
        Ok(config) => config,
        Err(e) => match e.downcast_ref::<std::io::Error>() {
            Some(e) if e.kind() == std::io::ErrorKind::NotFound => {
                anyhow::bail!(
                    "Configuration file not found! Please create storm.toml in the working directory \
                     or provide the path to configuration file with --configfile."
                );
            }
            Some(e) => {
                anyhow::bail!("Unknown IO error reading configuration file:\n{}", e);
            }
            None => {
                anyhow::bail!(
                    "Failed to parse configuration file. There may be a typo or otherwise invalid toml:\n{}",
                    e
                );
            }
        },
    };

    let window: Box<dyn PeripheralWindow> = match config.emulator.backend {
        Backend::Hardware => {
            let window = MappedWindow::open(config.emulator.pi_model)
                .with_context(|| format!("mapping peripherals for {}", config.emulator.pi_model))?;
            log::info!("Mapped {} peripheral window", config.emulator.pi_model);
            Box::new(window)
        }
        Backend::Simulated => {
            log::info!("Using simulated peer");
            Box::new(SimulatedPeer::new())
        }
    };

    let mut machine = Machine::new(window, config.emulator.quantum_cycles);
    install_devices(&mut machine, &config)?;
    machine.boot();

    match config.emulator.mode {
        RunMode::BusTest => run_bus_test(&mut machine, &config.bus_test),
        RunMode::Monitor => run_monitor(&mut machine, config.emulator.quanta),
    }
}

/// Register the emulated peripherals the configuration asks for.
pub fn install_devices<W: PeripheralWindow>(machine: &mut Machine<W>, config: &ConfigFileParams) -> anyhow::Result<()> {
    machine.install_device(Box::new(CustomChips::new()), &[CustomChips::mapping()])?;

    if config.gayle.enabled {
        let image = &config.gayle.image;
        let drive =
            AtaDrive::open(image).with_context(|| format!("HDD image {} failed to open", image.display()))?;
        log::info!("HDD image {} attached: {}", image.display(), drive.geometry());

        let gayle = Rc::new(RefCell::new(GayleController::new(Box::new(drive))));
        machine.install_device(Box::new(gayle.clone()), &GayleController::mapping())?;
        machine.add_int2_source(Box::new(gayle))?;
    }
    else {
        log::info!("Gayle emulation disabled");
    }

    if let Some(fastmem) = config.fastmem {
        let mem = FastMemory::new(fastmem.base, fastmem.size)
            .with_context(|| format!("bad fast memory range {:06X}+{:X}", fastmem.base, fastmem.size))?;
        let range = mem.mapping();
        machine
            .install_device(Box::new(mem), &[range])
            .with_context(|| format!("installing fast memory at {}", range))?;
    }

    Ok(())
}
