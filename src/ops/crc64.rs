// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Table-driven CRC64 with arbitrary polynomial.

use super::{mismatch, Crc64Params, Operation, Outcome};
use crate::error::Result;

pub(crate) fn run(op: &Operation<'_>, input: &[u8], _output: &mut [u8]) -> Result<Outcome> {
    let Operation::Crc64(p) = op else {
        return Err(mismatch(op, "software"));
    };
    Ok(Outcome {
        consumed: input.len(),
        crc64: checksum(p, input),
        ..Outcome::default()
    })
}

/// CRC64 of `data` under `params`.
pub fn checksum(params: &Crc64Params, data: &[u8]) -> u64 {
    let table = build_table(params.poly, params.big_endian);
    let mut crc = if params.inverse { !0 } else { 0 };
    if params.big_endian {
        for &b in data {
            crc = (crc << 8) ^ table[((crc >> 56) as u8 ^ b) as usize];
        }
    } else {
        for &b in data {
            crc = (crc >> 8) ^ table[(crc as u8 ^ b) as usize];
        }
    }
    if params.inverse {
        !crc
    } else {
        crc
    }
}

fn build_table(poly: u64, big_endian: bool) -> [u64; 256] {
    let mut table = [0u64; 256];
    if big_endian {
        for (i, slot) in table.iter_mut().enumerate() {
            let mut crc = (i as u64) << 56;
            for _ in 0..8 {
                crc = if crc & (1 << 63) != 0 {
                    (crc << 1) ^ poly
                } else {
                    crc << 1
                };
            }
            *slot = crc;
        }
    } else {
        let reflected = poly.reverse_bits();
        for (i, slot) in table.iter_mut().enumerate() {
            let mut crc = i as u64;
            for _ in 0..8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ reflected
                } else {
                    crc >> 1
                };
            }
            *slot = crc;
        }
    }
    table
}
