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

    args/mod.rs

    Command line arguments

*/


use std::path::PathBuf;

use storm_core::protocol::window::PiModel;

#[cfg(feature = "use_bpaf")]
use bpaf::Bpaf;

#[cfg_attr(feature = "use_bpaf", derive(Bpaf))]
#[cfg_attr(feature = "use_bpaf", bpaf(options, version, generate(cli_args)))]
#[derive(Debug, Default)]
pub struct CmdLineArgs {
    #[cfg_attr(feature = "use_bpaf", bpaf(long("config_file"), long("configfile")))]
    pub config_file: Option<PathBuf>,

    #[cfg_attr(feature = "use_bpaf", bpaf(long("disable_gayle"), long("disable-gayle"), switch))]
    pub disable_gayle: bool,

    /// Hard disk image attached to the Gayle IDE port
    #[cfg_attr(feature = "use_bpaf", bpaf(long))]
    pub image: Option<PathBuf>,

    /// Run against the simulated peer instead of /dev/mem
    #[cfg_attr(feature = "use_bpaf", bpaf(long, switch))]
    pub simulate: bool,

    #[cfg_attr(feature = "use_bpaf", bpaf(long("bus_test"), long("bustest"), switch))]
    pub bus_test: bool,

    #[cfg_attr(feature = "use_bpaf", bpaf(long("pi_model"), long("pimodel")))]
    pub pi_model: Option<PiModel>,

    #[cfg_attr(feature = "use_bpaf", bpaf(long))]
    pub quanta: Option<u64>,
}
