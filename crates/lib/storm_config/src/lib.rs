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

    Configuration file and command line handling

*/


//! The `storm_config` crate parses Storm's configuration file and overlays command line
//! arguments on top of it. Command line arguments always take priority over the
//! configuration file.
//!
//! Features:
//! - `use_bpaf`: Enable BPAF support for command line argument parsing.

mod args;

use std::{path::Path, path::PathBuf, str::FromStr};

use cfg_if::cfg_if;
use serde_derive::Deserialize;

#[cfg(feature = "use_bpaf")]
pub use args::cli_args;
pub use args::CmdLineArgs;
pub use storm_core::protocol::window::PiModel;

const fn _default_true() -> bool {
    true
}
const fn _default_quantum_cycles() -> u32 {
    storm_core::machine::DEFAULT_QUANTUM_CYCLES
}
fn _default_image() -> PathBuf {
    PathBuf::from("hd0.img")
}
const fn _default_bus_test_size() -> u32 {
    0x1_0000
}
const fn _default_bus_test_passes() -> u32 {
    1
}

/// Where bus transactions go.
#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// The real GPIO block through /dev/mem.
    #[default]
    Hardware,
    /// The in-process simulated peer.
    Simulated,
}

impl FromStr for Backend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "hardware" => Ok(Backend::Hardware),
            "simulated" => Ok(Backend::Simulated),
            _ => Err("Bad value for backend".to_string()),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    #[default]
    Monitor,
    BusTest,
}

impl FromStr for RunMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, String>
    where
        Self: Sized,
    {
        match s.to_lowercase().as_str() {
            "monitor" => Ok(RunMode::Monitor),
            "bus_test" | "bustest" => Ok(RunMode::BusTest),
            _ => Err("Bad value for mode".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Emulator {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default)]
    pub pi_model: PiModel,
    #[serde(default = "_default_quantum_cycles")]
    pub quantum_cycles: u32,
    #[serde(default)]
    pub mode: RunMode,
    /// Stop the monitor loop after this many quanta.
    pub quanta: Option<u64>,
}

impl Default for Emulator {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            pi_model: PiModel::default(),
            quantum_cycles: _default_quantum_cycles(),
            mode: RunMode::default(),
            quanta: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Gayle {
    #[serde(default = "_default_true")]
    pub enabled: bool,
    #[serde(default = "_default_image")]
    pub image: PathBuf,
}

impl Default for Gayle {
    fn default() -> Self {
        Self {
            enabled: true,
            image: _default_image(),
        }
    }
}

#[derive(Copy, Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct FastMem {
    pub base: u32,
    pub size: u32,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct BusTest {
    #[serde(default)]
    pub base: u32,
    #[serde(default = "_default_bus_test_size")]
    pub size: u32,
    #[serde(default = "_default_bus_test_passes")]
    pub passes: u32,
}

impl Default for BusTest {
    fn default() -> Self {
        Self {
            base: 0,
            size: _default_bus_test_size(),
            passes: _default_bus_test_passes(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileParams {
    #[serde(default)]
    pub emulator: Emulator,
    #[serde(default)]
    pub gayle: Gayle,
    pub fastmem: Option<FastMem>,
    #[serde(default)]
    pub bus_test: BusTest,
}

impl ConfigFileParams {
    pub fn overlay(&mut self, shell_args: CmdLineArgs) {
        if let Some(image) = shell_args.image {
            self.gayle.image = image;
        }
        self.gayle.enabled &= !shell_args.disable_gayle;

        if shell_args.simulate {
            self.emulator.backend = Backend::Simulated;
        }
        if shell_args.bus_test {
            self.emulator.mode = RunMode::BusTest;
        }
        if let Some(pi_model) = shell_args.pi_model {
            self.emulator.pi_model = pi_model;
        }
        if let Some(quanta) = shell_args.quanta {
            self.emulator.quanta = Some(quanta);
        }
    }
}

pub fn read_config(toml_string: impl AsRef<str>, shell_args: CmdLineArgs) -> Result<ConfigFileParams, anyhow::Error> {
    let mut toml_args: ConfigFileParams = toml::from_str(toml_string.as_ref())?;

    // Command line arguments override config file arguments
    toml_args.overlay(shell_args);

    Ok(toml_args)
}

/// Read the TOML configuration from a file path, parse and overlay command line arguments.
pub fn read_config_file<P>(default_path: P) -> Result<ConfigFileParams, anyhow::Error>
where
    P: AsRef<Path>,
{
    let shell_args: CmdLineArgs;

    cfg_if! {
        if #[cfg(feature = "use_bpaf")] {
            log::debug!("Reading command line arguments...");
            shell_args = cli_args().run();
        } else {
            log::debug!("Argument reading disabled...");
            shell_args = CmdLineArgs::default();
        }
    }

    // Allow configuration file path to be overridden by command line argument 'config_file'
    let toml_string = if let Some(configfile_path) = shell_args.config_file.as_ref() {
        std::fs::read_to_string(configfile_path)?
    }
    else {
        std::fs::read_to_string(default_path)?
    };

    read_config(toml_string, shell_args)
}
