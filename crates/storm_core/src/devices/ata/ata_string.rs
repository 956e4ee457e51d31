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

    devices/ata/ata_string.rs

    Space padded ATA identification strings

*/

//! [AtaString] formats strings used in the ATA device identification structure.
//!
//! ATA strings put the first character of each pair in the high byte of its word.
//! The identification block is serialized big-endian, so the characters are stored
//! in plain order here.

use binrw::binrw;
use std::{convert::Infallible, str::FromStr};

#[binrw]
#[derive(Clone, Debug, Default)]
pub struct AtaString<const N: usize> {
    #[br(count = N)]
    #[bw(assert(raw.len() == N, "raw length must be N"))]
    raw: Vec<u8>,
}

impl<const N: usize> FromStr for AtaString<N> {
    type Err = Infallible;

    /// Pad with spaces or truncate to exactly N bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut raw = vec![b' '; N];
        let bytes = s.as_bytes();
        let len = bytes.len().min(N);
        raw[..len].copy_from_slice(&bytes[..len]);
        Ok(Self { raw })
    }
}

impl<const N: usize> AtaString<N> {
    pub fn as_str(&self) -> String {
        String::from_utf8_lossy(&self.raw).trim_end().to_string()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_and_truncates() {
        let s = AtaString::<8>::from_str("STORM").unwrap();
        assert_eq!(s.as_bytes(), b"STORM   ");
        assert_eq!(s.as_str(), "STORM");

        let s = AtaString::<4>::from_str("TOOLONG").unwrap();
        assert_eq!(s.as_bytes(), b"TOOL");
    }
}
