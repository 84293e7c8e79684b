// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Translation between jobs and IAA descriptors.
//!
//! Encoders fill an [`IaaHwDesc`] from an [`Operation`] and the job's spans.
//! [`outcome`] reads a finished completion record back into the same
//! [`Outcome`] a software handler returns, and [`emulate`] executes a
//! descriptor with the software handlers, which is how
//! [`EmulatedQueue`](crate::wq::EmulatedQueue) stands in for a device.
//!
//! `filter_flags` layout:
//!
//! | Bits | Meaning |
//! |------|---------|
//! | 0-4 | source element width - 1 |
//! | 5-6 | output width (0 nominal, 1 = 8, 2 = 16, 3 = 32 bits) |
//! | 7 | invert scan range |
//! | 8 | CRC64 MSB-first |
//! | 9 | CRC64 inverse |

use crate::descriptor::{CompletionStatus, IaaCompletionRecord, IaaHwDesc};
use crate::error::{Error, Result};
use crate::opcode::OpKind;
use crate::ops::{
    self, Crc64Params, DecompressParams, DeflateFormat, ExtractParams, Operation, Outcome,
    OutputWidth, ScanParams, ScanPredicate, SelectParams,
};

const WIDTH_MASK: u32 = 0x1F;
const OUT_WIDTH_SHIFT: u32 = 5;
const SCAN_INVERT: u32 = 1 << 7;
const CRC64_BIG_ENDIAN: u32 = 1 << 8;
const CRC64_INVERSE: u32 = 1 << 9;

const DECOMPRESS_ENABLE: u16 = 1 << 0;
const DECOMPRESS_ZLIB: u16 = 1 << 1;

/// Error code reported with `AnalyticsError` for undecodable input.
const ERROR_CORRUPT_INPUT: u8 = 0x01;

fn size_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::InvalidParameter(format!("{what} of {len} bytes exceeds 4 GiB")))
}

fn spans(desc: &mut IaaHwDesc, kind: OpKind, input: &[u8], output: &mut [u8]) -> Result<()> {
    desc.set_opcode(kind);
    desc.src1_addr = input.as_ptr() as u64;
    desc.src1_size = size_u32(input.len(), "input")?;
    desc.dst_addr = output.as_mut_ptr() as u64;
    desc.max_dst_size = size_u32(output.len(), "output")?;
    Ok(())
}

fn parse_flags(width: u8, out: OutputWidth) -> u32 {
    ((width as u32 - 1) & WIDTH_MASK) | (out.code() << OUT_WIDTH_SHIFT)
}

#[inline]
fn immediate(low: u32, high: u32) -> u64 {
    ((high as u64) << 32) | low as u64
}

pub(crate) fn encode_extract(
    op: &Operation<'_>,
    input: &[u8],
    output: &mut [u8],
    desc: &mut IaaHwDesc,
) -> Result<()> {
    let Operation::Extract(p) = op else {
        return Err(ops::mismatch(op, "hardware"));
    };
    spans(desc, OpKind::Extract, input, output)?;
    desc.filter_flags = parse_flags(p.src1_bit_width, p.out_bit_width);
    desc.num_inputs = p.num_input_elements;
    desc.src2_addr = immediate(p.param_low, p.param_high);
    Ok(())
}

pub(crate) fn encode_scan(
    op: &Operation<'_>,
    input: &[u8],
    output: &mut [u8],
    desc: &mut IaaHwDesc,
) -> Result<()> {
    let Operation::Scan(p) = op else {
        return Err(ops::mismatch(op, "hardware"));
    };
    let (low, high, invert) = p.predicate.bounds(p.src1_bit_width);
    spans(desc, OpKind::Scan, input, output)?;
    desc.filter_flags = parse_flags(p.src1_bit_width, p.out_bit_width);
    if invert {
        desc.filter_flags |= SCAN_INVERT;
    }
    desc.num_inputs = p.num_input_elements;
    desc.src2_addr = immediate(low, high);
    Ok(())
}

pub(crate) fn encode_select(
    op: &Operation<'_>,
    input: &[u8],
    output: &mut [u8],
    desc: &mut IaaHwDesc,
) -> Result<()> {
    let Operation::Select(p) = op else {
        return Err(ops::mismatch(op, "hardware"));
    };
    spans(desc, OpKind::Select, input, output)?;
    desc.filter_flags = parse_flags(p.src1_bit_width, p.out_bit_width);
    desc.num_inputs = p.num_input_elements;
    desc.src2_addr = p.mask.as_ptr() as u64;
    desc.src2_size = size_u32(p.mask.len(), "mask")?;
    Ok(())
}

pub(crate) fn encode_crc64(
    op: &Operation<'_>,
    input: &[u8],
    output: &mut [u8],
    desc: &mut IaaHwDesc,
) -> Result<()> {
    let Operation::Crc64(p) = op else {
        return Err(ops::mismatch(op, "hardware"));
    };
    spans(desc, OpKind::Crc64, input, output)?;
    desc.src2_addr = p.poly;
    if p.big_endian {
        desc.filter_flags |= CRC64_BIG_ENDIAN;
    }
    if p.inverse {
        desc.filter_flags |= CRC64_INVERSE;
    }
    Ok(())
}

pub(crate) fn encode_decompress(
    op: &Operation<'_>,
    input: &[u8],
    output: &mut [u8],
    desc: &mut IaaHwDesc,
) -> Result<()> {
    let Operation::Decompress(p) = op else {
        return Err(ops::mismatch(op, "hardware"));
    };
    spans(desc, OpKind::Decompress, input, output)?;
    desc.codec_flags = DECOMPRESS_ENABLE;
    if p.format == DeflateFormat::Zlib {
        desc.codec_flags |= DECOMPRESS_ZLIB;
    }
    Ok(())
}

/// Interpret a terminal completion record.
pub(crate) fn outcome(record: &IaaCompletionRecord) -> Result<Outcome> {
    let done = Outcome {
        consumed: record.bytes_completed as usize,
        written: record.output_size as usize,
        crc: record.crc,
        crc64: record.crc64,
        truncated: false,
    };
    match CompletionStatus::from(record.status) {
        CompletionStatus::Success => Ok(done),
        CompletionStatus::OutputOverflow => Ok(Outcome {
            truncated: true,
            ..done
        }),
        CompletionStatus::PageFault => Err(Error::PageFault {
            fault_addr: record.fault_addr,
            bytes_completed: record.bytes_completed,
        }),
        _ => Err(Error::OperationFailed {
            status: record.status,
            error_code: record.error_code,
        }),
    }
}

unsafe fn slice<'x>(addr: u64, len: u32) -> &'x [u8] {
    if len == 0 || addr == 0 {
        &[]
    } else {
        std::slice::from_raw_parts(addr as *const u8, len as usize)
    }
}

unsafe fn slice_mut<'x>(addr: u64, len: u32) -> &'x mut [u8] {
    if len == 0 || addr == 0 {
        &mut []
    } else {
        std::slice::from_raw_parts_mut(addr as *mut u8, len as usize)
    }
}

/// Rebuild the operation a descriptor encodes.
fn decode<'x>(desc: &IaaHwDesc, kind: OpKind, mask: &'x [u8]) -> Operation<'x> {
    let width = ((desc.filter_flags & WIDTH_MASK) + 1) as u8;
    let out_bit_width = OutputWidth::from_code(desc.filter_flags >> OUT_WIDTH_SHIFT);
    let low = desc.src2_addr as u32;
    let high = (desc.src2_addr >> 32) as u32;
    match kind {
        OpKind::Extract => Operation::Extract(ExtractParams {
            src1_bit_width: width,
            num_input_elements: desc.num_inputs,
            param_low: low,
            param_high: high,
            out_bit_width,
        }),
        OpKind::Scan => Operation::Scan(ScanParams {
            src1_bit_width: width,
            num_input_elements: desc.num_inputs,
            predicate: if desc.filter_flags & SCAN_INVERT != 0 {
                ScanPredicate::NotRange { low, high }
            } else {
                ScanPredicate::Range { low, high }
            },
            out_bit_width,
        }),
        OpKind::Select => Operation::Select(SelectParams {
            src1_bit_width: width,
            num_input_elements: desc.num_inputs,
            mask,
            out_bit_width,
        }),
        OpKind::Crc64 => Operation::Crc64(Crc64Params {
            poly: desc.src2_addr,
            big_endian: desc.filter_flags & CRC64_BIG_ENDIAN != 0,
            inverse: desc.filter_flags & CRC64_INVERSE != 0,
        }),
        OpKind::Decompress | OpKind::Compress => {
            let format = if desc.codec_flags & DECOMPRESS_ZLIB != 0 {
                DeflateFormat::Zlib
            } else {
                DeflateFormat::Raw
            };
            Operation::Decompress(DecompressParams { format })
        }
    }
}

/// Execute a descriptor on the CPU and build the record a device would write.
///
/// # Safety
///
/// Every address in `desc` must be valid for the size the descriptor gives
/// it, and the destination must not be accessed by anyone else until the
/// returned record has been published.
pub(crate) unsafe fn emulate(desc: &IaaHwDesc) -> IaaCompletionRecord {
    let mut record = IaaCompletionRecord::new();
    let kind = match OpKind::from_u8(desc.opcode()) {
        Some(kind) if ops::offloadable(kind) => kind,
        _ => {
            record.status = CompletionStatus::UnsupportedOp.as_u8();
            return record;
        }
    };

    let input = slice(desc.src1_addr, desc.src1_size);
    let output = slice_mut(desc.dst_addr, desc.max_dst_size);
    let mask: &[u8] = if kind == OpKind::Select {
        slice(desc.src2_addr, desc.src2_size)
    } else {
        &[]
    };
    let op = decode(desc, kind, mask);

    let result = op
        .validate(input)
        .and_then(|()| (ops::handler(kind).software)(&op, input, output));
    match result {
        Ok(done) => {
            record.status = if done.truncated {
                CompletionStatus::OutputOverflow
            } else {
                CompletionStatus::Success
            }
            .as_u8();
            record.bytes_completed = done.consumed as u32;
            record.output_size = done.written as u32;
            record.crc = done.crc;
            record.crc64 = done.crc64;
        }
        Err(Error::CorruptInput { written, .. }) => {
            record.status = CompletionStatus::AnalyticsError.as_u8();
            record.error_code = ERROR_CORRUPT_INPUT;
            record.output_size = written as u32;
        }
        Err(_) => {
            record.status = CompletionStatus::InvalidFlags.as_u8();
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ExtractParams;

    #[test]
    fn test_encode_extract() {
        let input = [0u8; 100];
        let mut output = [0u8; 50];
        let op = Operation::Extract(ExtractParams {
            src1_bit_width: 8,
            num_input_elements: 100,
            param_low: 80,
            param_high: 99,
            out_bit_width: OutputWidth::Bits32,
        });
        let mut desc = IaaHwDesc::new();
        encode_extract(&op, &input, &mut output, &mut desc).unwrap();

        assert_eq!(desc.opcode(), 0x52);
        assert_eq!(desc.src1_addr, input.as_ptr() as u64);
        assert_eq!(desc.src1_size, 100);
        assert_eq!(desc.max_dst_size, 50);
        assert_eq!(desc.num_inputs, 100);
        assert_eq!(desc.filter_flags, 7 | (3 << 5));
        assert_eq!(desc.src2_addr, (99u64 << 32) | 80);
        assert_eq!(decode(&desc, OpKind::Extract, &[]), op);
    }

    #[test]
    fn test_encode_rejects_other_kind() {
        let op = Operation::Crc64(Crc64Params {
            poly: 1,
            big_endian: false,
            inverse: false,
        });
        let mut desc = IaaHwDesc::new();
        assert!(encode_scan(&op, &[], &mut [], &mut desc).is_err());
    }

    #[test]
    fn test_crc64_flags_survive_decode() {
        let p = Crc64Params {
            poly: 0x42F0_E1EB_A9EA_3693,
            big_endian: true,
            inverse: true,
        };
        let mut desc = IaaHwDesc::new();
        encode_crc64(&Operation::Crc64(p), b"abc", &mut [], &mut desc).unwrap();
        assert_eq!(decode(&desc, OpKind::Crc64, &[]), Operation::Crc64(p));
    }

    #[test]
    fn test_outcome_maps_statuses() {
        let mut record = IaaCompletionRecord::new();
        record.status = CompletionStatus::Success.as_u8();
        record.output_size = 12;
        record.bytes_completed = 40;
        let done = outcome(&record).unwrap();
        assert_eq!((done.written, done.consumed, done.truncated), (12, 40, false));

        record.status = CompletionStatus::OutputOverflow.as_u8();
        assert!(outcome(&record).unwrap().truncated);

        record.status = CompletionStatus::PageFault.as_u8();
        record.fault_addr = 0x7000;
        assert!(matches!(
            outcome(&record),
            Err(Error::PageFault { fault_addr: 0x7000, .. })
        ));

        record.status = CompletionStatus::HardwareError.as_u8();
        assert!(matches!(
            outcome(&record),
            Err(Error::OperationFailed { status: 0x1F, .. })
        ));
    }

    #[test]
    fn test_emulate_rejects_compress() {
        let mut desc = IaaHwDesc::new();
        desc.set_opcode(OpKind::Compress);
        let record = unsafe { emulate(&desc) };
        assert_eq!(
            CompletionStatus::from(record.status),
            CompletionStatus::UnsupportedOp
        );
    }
}
