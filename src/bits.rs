// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Little-endian packed bit streams.
//!
//! Element `k` of width `w` occupies bits `k*w .. k*w + w`, least
//! significant bit first. Byte-aligned widths (8, 16, 32) are therefore
//! plain little-endian integers, so one writer covers every output format.

#[inline]
const fn mask(width: u8) -> u64 {
    (1u64 << width) - 1
}

/// Bytes needed to hold `count` elements of `width` bits.
#[inline]
pub(crate) fn bytes_for(count: usize, width: u8) -> usize {
    (count * width as usize).div_ceil(8)
}

/// Read element `index` from a packed stream. Bits past the end read as 0.
#[inline]
pub(crate) fn read(src: &[u8], width: u8, index: usize) -> u32 {
    let bit = index * width as usize;
    let byte = bit / 8;
    let shift = bit % 8;
    let span = (shift + width as usize).div_ceil(8);

    let mut acc = 0u64;
    for i in 0..span {
        let b = src.get(byte + i).copied().unwrap_or(0);
        acc |= (b as u64) << (8 * i);
    }
    ((acc >> shift) & mask(width)) as u32
}

/// Test bit `index` of a bit-vector.
#[inline]
pub(crate) fn test(src: &[u8], index: usize) -> bool {
    src.get(index / 8).is_some_and(|&b| (b >> (index % 8)) & 1 == 1)
}

/// Appends fixed-width values to a byte buffer.
///
/// Bytes are cleared the first time the writer touches them, so stale
/// content past the previous write is never OR-ed into the output.
pub(crate) struct BitWriter<'a> {
    dst: &'a mut [u8],
    bit_pos: usize,
}

impl<'a> BitWriter<'a> {
    pub(crate) fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, bit_pos: 0 }
    }

    /// True if another `width`-bit value fits.
    #[inline]
    pub(crate) fn has_room(&self, width: u8) -> bool {
        self.bit_pos + width as usize <= self.dst.len() * 8
    }

    /// Append `value`. Returns false, writing nothing, when it does not fit.
    pub(crate) fn push(&mut self, value: u32, width: u8) -> bool {
        if !self.has_room(width) {
            return false;
        }
        let mut v = value as u64 & mask(width);
        let mut remaining = width as usize;
        while remaining > 0 {
            let byte = self.bit_pos / 8;
            let offset = self.bit_pos % 8;
            if offset == 0 {
                self.dst[byte] = 0;
            }
            let take = (8 - offset).min(remaining);
            self.dst[byte] |= ((v & ((1u64 << take) - 1)) << offset) as u8;
            v >>= take;
            remaining -= take;
            self.bit_pos += take;
        }
        true
    }

    /// Bytes touched so far, counting a partial trailing byte.
    #[inline]
    pub(crate) fn bytes_written(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}
