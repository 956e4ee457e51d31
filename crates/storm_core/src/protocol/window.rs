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

    protocol/window.rs

    Peripheral register window. All raw register access lives here.

*/

//! [PeripheralWindow] is the narrow register-access seam between the bus engine and
//! the SoC peripheral block. Everything above it deals in named, word-sized register
//! operations; only [MappedWindow] touches raw memory.

use std::{io, ptr::NonNull, thread, time::Duration};

use cfg_if::cfg_if;
use serde_derive::Deserialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::protocol::pins::{GPCLR0, GPLEV0, GPSET0};

pub const PERI_SIZE: usize = 0x0100_0000;
pub const GPIO_OFFSET: usize = 0x20_0000;
pub const GPCLK_OFFSET: usize = 0x10_1000;

/// Word index of the GPIO block within the peripheral window.
pub const GPIO_BASE_WORD: usize = GPIO_OFFSET / 4;
/// Word index of the general purpose clock block within the peripheral window.
pub const GPCLK_BASE_WORD: usize = GPCLK_OFFSET / 4;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("unable to open {path}: {source}. Run as root?")]
    Open { path: &'static str, source: io::Error },
    #[error("mmap of peripheral block at {base:#010X} failed: {source}")]
    Map { base: u64, source: io::Error },
    #[error("direct peripheral access is not supported on this platform")]
    Unsupported,
}

/// Board model, which selects the physical base of the peripheral block.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PiModel {
    Pi0,
    Pi1,
    #[default]
    Pi3,
    Pi4,
}

impl PiModel {
    pub fn peripheral_base(&self) -> u64 {
        match self {
            PiModel::Pi0 | PiModel::Pi1 => 0x2000_0000,
            PiModel::Pi3 => 0x3F00_0000,
            PiModel::Pi4 => 0xFE00_0000,
        }
    }
}

pub trait PeripheralWindow {
    /// Read the 32-bit register at `word` (a word index from the peripheral base).
    fn read(&self, word: usize) -> u32;
    /// Write the 32-bit register at `word` (a word index from the peripheral base).
    fn write(&mut self, word: usize, value: u32);

    /// Block for at least `us` microseconds.
    fn delay_us(&mut self, us: u64) {
        thread::sleep(Duration::from_micros(us));
    }

    #[inline]
    fn gpio_read(&self, reg: usize) -> u32 {
        self.read(GPIO_BASE_WORD + reg)
    }
    #[inline]
    fn gpio_write(&mut self, reg: usize, value: u32) {
        self.write(GPIO_BASE_WORD + reg, value)
    }
    #[inline]
    fn gpio_set(&mut self, bits: u32) {
        self.write(GPIO_BASE_WORD + GPSET0, bits)
    }
    #[inline]
    fn gpio_clear(&mut self, bits: u32) {
        self.write(GPIO_BASE_WORD + GPCLR0, bits)
    }
    #[inline]
    fn gpio_level(&self) -> u32 {
        self.read(GPIO_BASE_WORD + GPLEV0)
    }
    #[inline]
    fn clock_read(&self, reg: usize) -> u32 {
        self.read(GPCLK_BASE_WORD + reg)
    }
    #[inline]
    fn clock_write(&mut self, reg: usize, value: u32) {
        self.write(GPCLK_BASE_WORD + reg, value)
    }
}

impl<W: PeripheralWindow + ?Sized> PeripheralWindow for Box<W> {
    #[inline]
    fn read(&self, word: usize) -> u32 {
        (**self).read(word)
    }
    #[inline]
    fn write(&mut self, word: usize, value: u32) {
        (**self).write(word, value)
    }
    fn delay_us(&mut self, us: u64) {
        (**self).delay_us(us)
    }
}

/// The peripheral block mapped from `/dev/mem`. Unmapped on drop.
#[derive(Debug)]
pub struct MappedWindow {
    base: NonNull<u32>,
    words: usize,
}

impl MappedWindow {
    pub fn open(model: PiModel) -> Result<Self, WindowError> {
        cfg_if! {
            if #[cfg(target_os = "linux")] {
                use std::{fs::OpenOptions, os::unix::{fs::OpenOptionsExt, io::AsRawFd}};

                const DEV_MEM: &str = "/dev/mem";
                let base = model.peripheral_base();

                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .custom_flags(libc::O_SYNC)
                    .open(DEV_MEM)
                    .map_err(|source| WindowError::Open { path: DEV_MEM, source })?;

                // SAFETY: a fresh shared mapping of a device file; the kernel validates the
                // offset and length and we check for MAP_FAILED below.
                let map = unsafe {
                    libc::mmap(
                        std::ptr::null_mut(),
                        PERI_SIZE,
                        libc::PROT_READ | libc::PROT_WRITE,
                        libc::MAP_SHARED,
                        file.as_raw_fd(),
                        base as libc::off_t,
                    )
                };
                // The mapping outlives the descriptor.
                drop(file);

                if map == libc::MAP_FAILED {
                    return Err(WindowError::Map { base, source: io::Error::last_os_error() });
                }
                let base_ptr = NonNull::new(map as *mut u32).ok_or_else(|| WindowError::Map {
                    base,
                    source: io::Error::from(io::ErrorKind::InvalidData),
                })?;

                log::debug!("Mapped peripheral block at {:#010X} for {}", base, model);
                Ok(Self {
                    base: base_ptr,
                    words: PERI_SIZE / 4,
                })
            }
            else {
                let _ = model;
                Err(WindowError::Unsupported)
            }
        }
    }
}

impl PeripheralWindow for MappedWindow {
    #[inline]
    fn read(&self, word: usize) -> u32 {
        debug_assert!(word < self.words);
        // SAFETY: `word` is within the mapping established in open().
        unsafe { self.base.as_ptr().add(word).read_volatile() }
    }

    #[inline]
    fn write(&mut self, word: usize, value: u32) {
        debug_assert!(word < self.words);
        // SAFETY: `word` is within the mapping established in open().
        unsafe { self.base.as_ptr().add(word).write_volatile(value) }
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        cfg_if! {
            if #[cfg(target_os = "linux")] {
                // SAFETY: base/len are exactly what mmap returned in open().
                unsafe {
                    libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.words * 4);
                }
            }
        }
    }
}
