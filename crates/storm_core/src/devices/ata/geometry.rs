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

    devices/ata/geometry.rs

    Cylinder/head/sector drive geometry

*/

//! Define a [DriveGeometry] that represents cylinder, head, and sector based
//! drive geometry, and a [DiskChs] sector address within it.

use std::fmt::Display;

use crate::devices::ata::{AtaError, SECTOR_SIZE};

pub const DEFAULT_HEADS: u8 = 16;
pub const DEFAULT_SECTORS: u8 = 63;
pub const MAX_CYLINDERS: u32 = 65535;

/// A cylinder, head and sector id. Sector ids start at 1.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct DiskChs {
    pub c: u16,
    pub h: u8,
    pub s: u8,
}

impl Display for DiskChs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[c:{:5} h:{:2} s:{:2}]", self.c, self.h, self.s)
    }
}

impl DiskChs {
    pub fn new(c: u16, h: u8, s: u8) -> Self {
        Self { c, h, s }
    }
}

/// Cylinder count (c), head count (h) and sectors per track (s).
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq)]
pub struct DriveGeometry {
    pub(crate) c: u16,
    pub(crate) h: u8,
    pub(crate) s: u8,
}

impl Display for DriveGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[c:{} h:{} s:{}]", self.c, self.h, self.s)
    }
}

impl DriveGeometry {
    pub fn new(c: u16, h: u8, s: u8) -> Self {
        Self { c, h, s }
    }

    /// Derive the default 16 head, 63 sector geometry for an image of `size` bytes.
    pub fn from_image_size(size: u64) -> Result<Self, AtaError> {
        if size % SECTOR_SIZE as u64 != 0 {
            return Err(AtaError::BadImageSize(size));
        }
        let cylinders = Self::cylinders_for(size / SECTOR_SIZE as u64, DEFAULT_HEADS, DEFAULT_SECTORS);
        if cylinders == 0 {
            return Err(AtaError::ImageTooSmall(size));
        }
        Ok(Self::new(cylinders, DEFAULT_HEADS, DEFAULT_SECTORS))
    }

    /// Derive a translated geometry with `h` heads and `s` sectors per track.
    pub fn translated(total_sectors: u64, h: u8, s: u8) -> Option<Self> {
        if h == 0 || s == 0 {
            return None;
        }
        match Self::cylinders_for(total_sectors, h, s) {
            0 => None,
            c => Some(Self::new(c, h, s)),
        }
    }

    fn cylinders_for(total_sectors: u64, h: u8, s: u8) -> u16 {
        let per_cylinder = h as u64 * s as u64;
        (total_sectors / per_cylinder).min(MAX_CYLINDERS as u64) as u16
    }

    #[inline]
    pub fn c(&self) -> u16 {
        self.c
    }
    #[inline]
    pub fn h(&self) -> u8 {
        self.h
    }
    #[inline]
    pub fn s(&self) -> u8 {
        self.s
    }

    /// Number of sectors addressable through CHS.
    pub fn total_sectors(&self) -> u32 {
        self.c as u32 * self.h as u32 * self.s as u32
    }

    /// Convert a CHS address to an LBA, or None if it falls outside the geometry.
    pub fn lba(&self, chs: DiskChs) -> Option<u32> {
        if chs.c >= self.c || chs.h >= self.h || chs.s == 0 || chs.s > self.s {
            return None;
        }
        Some((chs.c as u32 * self.h as u32 + chs.h as u32) * self.s as u32 + (chs.s as u32 - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYLINDER_BYTES: u64 = 16 * 63 * 512;

    #[test]
    fn geometry_from_size() {
        let g = DriveGeometry::from_image_size(CYLINDER_BYTES * 20).unwrap();
        assert_eq!((g.c(), g.h(), g.s()), (20, 16, 63));
        assert_eq!(g.total_sectors(), 20 * 16 * 63);

        // Partial trailing cylinders are not addressable through CHS.
        let g = DriveGeometry::from_image_size(CYLINDER_BYTES * 2 + 512).unwrap();
        assert_eq!(g.c(), 2);

        assert!(matches!(DriveGeometry::from_image_size(1000), Err(AtaError::BadImageSize(1000))));
        assert!(matches!(
            DriveGeometry::from_image_size(CYLINDER_BYTES - 512),
            Err(AtaError::ImageTooSmall(_))
        ));
    }

    #[test]
    fn cylinders_clamp() {
        let g = DriveGeometry::from_image_size(CYLINDER_BYTES * 70000).unwrap();
        assert_eq!(g.c(), 65535);
    }

    #[test]
    fn chs_lba_conversion() {
        let g = DriveGeometry::new(10, 16, 63);
        assert_eq!(g.lba(DiskChs::new(0, 0, 1)), Some(0));
        assert_eq!(g.lba(DiskChs::new(0, 1, 1)), Some(63));
        assert_eq!(g.lba(DiskChs::new(1, 0, 1)), Some(1008));
        assert_eq!(g.lba(DiskChs::new(0, 0, 0)), None);
        assert_eq!(g.lba(DiskChs::new(0, 16, 1)), None);
        assert_eq!(g.lba(DiskChs::new(10, 0, 1)), None);
        assert_eq!(g.lba(DiskChs::new(9, 15, 63)), Some(10079));
    }

    #[test]
    fn translation() {
        let g = DriveGeometry::translated(20 * 16 * 63, 8, 32).unwrap();
        assert_eq!((g.c(), g.h(), g.s()), (78, 8, 32));
        assert_eq!(DriveGeometry::translated(100, 0, 32), None);
        assert_eq!(DriveGeometry::translated(10, 16, 63), None);
    }
}
