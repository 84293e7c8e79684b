// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Software extract, scan and select over packed little-endian streams.

use super::{mismatch, Operation, Outcome, OutputWidth};
use crate::bits::{self, BitWriter};
use crate::error::Result;

pub(crate) fn extract(op: &Operation<'_>, input: &[u8], output: &mut [u8]) -> Result<Outcome> {
    let Operation::Extract(p) = op else {
        return Err(mismatch(op, "software"));
    };
    let n = p.num_input_elements as usize;
    let width = p.src1_bit_width;
    let out_width = p.out_bit_width.bits(width);

    let mut writer = BitWriter::new(output);
    let mut truncated = false;
    let low = p.param_low as usize;
    if low < n {
        let high = (p.param_high as usize).min(n - 1);
        for index in low..=high {
            if !writer.push(bits::read(input, width, index), out_width) {
                truncated = true;
                break;
            }
        }
    }

    Ok(Outcome {
        consumed: bits::bytes_for(n, width),
        written: writer.bytes_written(),
        truncated,
        ..Outcome::default()
    })
}

pub(crate) fn scan(op: &Operation<'_>, input: &[u8], output: &mut [u8]) -> Result<Outcome> {
    let Operation::Scan(p) = op else {
        return Err(mismatch(op, "software"));
    };
    let n = p.num_input_elements as usize;
    let width = p.src1_bit_width;
    let (low, high, invert) = p.predicate.bounds(width);

    let mut writer = BitWriter::new(output);
    let mut truncated = false;
    for index in 0..n {
        let value = bits::read(input, width, index);
        let hit = (low <= value && value <= high) != invert;
        let fits = match p.out_bit_width {
            OutputWidth::Nominal => writer.push(hit as u32, 1),
            wide if hit => writer.push(index as u32, wide.bits(width)),
            _ => true,
        };
        if !fits {
            truncated = true;
            break;
        }
    }

    Ok(Outcome {
        consumed: bits::bytes_for(n, width),
        written: writer.bytes_written(),
        truncated,
        ..Outcome::default()
    })
}

pub(crate) fn select(op: &Operation<'_>, input: &[u8], output: &mut [u8]) -> Result<Outcome> {
    let Operation::Select(p) = op else {
        return Err(mismatch(op, "software"));
    };
    let n = p.num_input_elements as usize;
    let width = p.src1_bit_width;
    let out_width = p.out_bit_width.bits(width);

    let mut writer = BitWriter::new(output);
    let mut truncated = false;
    for index in (0..n).filter(|&i| bits::test(p.mask, i)) {
        if !writer.push(bits::read(input, width, index), out_width) {
            truncated = true;
            break;
        }
    }

    Ok(Outcome {
        consumed: bits::bytes_for(n, width),
        written: writer.bytes_written(),
        truncated,
        ..Outcome::default()
    })
}
