// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Operations, their parameters, and the handler dispatch table.
//!
//! Each [`Operation`] variant carries only the parameters its handler reads,
//! so a job cannot be configured with fields that would be silently ignored.
//! Parameter ranges are checked once, in [`Operation::validate`], when the
//! job is configured; handlers assume validated input.

mod analytics;
pub(crate) mod crc64;
mod deflate;

use crate::descriptor::IaaHwDesc;
use crate::error::{Error, Result};
use crate::opcode::OpKind;
use crate::translate;

/// Width of emitted elements for extract, scan and select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputWidth {
    /// Extract/select: same width as the input elements.
    /// Scan: one bit per input element.
    #[default]
    Nominal,
    /// 8-bit little-endian integers.
    Bits8,
    /// 16-bit little-endian integers.
    Bits16,
    /// 32-bit little-endian integers.
    Bits32,
}

impl OutputWidth {
    /// Width in bits, resolving `Nominal` to `nominal`.
    #[inline]
    pub const fn bits(self, nominal: u8) -> u8 {
        match self {
            Self::Nominal => nominal,
            Self::Bits8 => 8,
            Self::Bits16 => 16,
            Self::Bits32 => 32,
        }
    }

    pub(crate) const fn code(self) -> u32 {
        match self {
            Self::Nominal => 0,
            Self::Bits8 => 1,
            Self::Bits16 => 2,
            Self::Bits32 => 3,
        }
    }

    pub(crate) const fn from_code(code: u32) -> Self {
        match code & 0b11 {
            1 => Self::Bits8,
            2 => Self::Bits16,
            3 => Self::Bits32,
            _ => Self::Nominal,
        }
    }
}

/// Copy the elements whose index lies in `[param_low, param_high]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractParams {
    /// Width of each packed input element, 1..=32.
    pub src1_bit_width: u8,
    /// Number of elements in the input.
    pub num_input_elements: u32,
    /// First index to copy.
    pub param_low: u32,
    /// Last index to copy, inclusive.
    pub param_high: u32,
    pub out_bit_width: OutputWidth,
}

/// Comparison applied to every element by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPredicate {
    Eq(u32),
    Ne(u32),
    Lt(u32),
    Le(u32),
    Gt(u32),
    Ge(u32),
    /// `low <= x <= high`.
    Range { low: u32, high: u32 },
    /// `x < low || x > high`.
    NotRange { low: u32, high: u32 },
}

impl ScanPredicate {
    /// Reduce to an inclusive range and an invert bit for `width`-bit values.
    ///
    /// An element matches when `(low <= x && x <= high) != invert`.
    pub fn bounds(self, width: u8) -> (u32, u32, bool) {
        let max = ((1u64 << width) - 1) as u32;
        match self {
            Self::Eq(v) => (v, v, false),
            Self::Ne(v) => (v, v, true),
            Self::Lt(0) => (0, max, true),
            Self::Lt(v) => (0, v - 1, false),
            Self::Le(v) => (0, v, false),
            Self::Gt(v) if v >= max => (0, max, true),
            Self::Gt(v) => (v + 1, max, false),
            Self::Ge(v) => (v, max, false),
            Self::Range { low, high } => (low, high, false),
            Self::NotRange { low, high } => (low, high, true),
        }
    }
}

/// Compare every element against a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParams {
    pub src1_bit_width: u8,
    pub num_input_elements: u32,
    pub predicate: ScanPredicate,
    /// `Nominal` emits a bit-vector; wider outputs emit matching indices.
    pub out_bit_width: OutputWidth,
}

/// Copy the elements whose bit is set in `mask`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectParams<'a> {
    pub src1_bit_width: u8,
    pub num_input_elements: u32,
    /// Bit-vector with one bit per input element, LSB first.
    pub mask: &'a [u8],
    pub out_bit_width: OutputWidth,
}

/// CRC64 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc64Params {
    /// Polynomial in MSB-first notation without the leading x^64 term.
    pub poly: u64,
    /// Process bits MSB first; otherwise the reflected (LSB first) form is used.
    pub big_endian: bool,
    /// Start from all ones and invert the result.
    pub inverse: bool,
}

/// Compression effort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    #[default]
    Default,
    High,
}

/// Stream framing around the DEFLATE blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeflateFormat {
    /// Bare DEFLATE blocks.
    #[default]
    Raw,
    /// RFC 1950 header and Adler-32 trailer.
    Zlib,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressParams {
    pub level: CompressionLevel,
    pub format: DeflateFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecompressParams {
    pub format: DeflateFormat,
}

/// The work a job performs, with its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
    Extract(ExtractParams),
    Scan(ScanParams),
    Select(SelectParams<'a>),
    Crc64(Crc64Params),
    Compress(CompressParams),
    Decompress(DecompressParams),
}

impl Operation<'_> {
    /// Operation kind (and hardware opcode).
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Extract(_) => OpKind::Extract,
            Self::Scan(_) => OpKind::Scan,
            Self::Select(_) => OpKind::Select,
            Self::Crc64(_) => OpKind::Crc64,
            Self::Compress(_) => OpKind::Compress,
            Self::Decompress(_) => OpKind::Decompress,
        }
    }

    /// Check parameter ranges against the input the job will read.
    pub fn validate(&self, input: &[u8]) -> Result<()> {
        match self {
            Self::Extract(p) => {
                check_elements(p.src1_bit_width, p.num_input_elements, input)?;
                check_output_width(p.src1_bit_width, p.out_bit_width)?;
                if p.param_low > p.param_high {
                    return Err(Error::InvalidParameter(format!(
                        "param_low {} exceeds param_high {}",
                        p.param_low, p.param_high
                    )));
                }
                Ok(())
            }
            Self::Scan(p) => {
                check_elements(p.src1_bit_width, p.num_input_elements, input)?;
                if let ScanPredicate::Range { low, high } | ScanPredicate::NotRange { low, high } =
                    p.predicate
                {
                    if low > high {
                        return Err(Error::InvalidParameter(format!(
                            "scan range low {low} exceeds high {high}"
                        )));
                    }
                }
                if p.out_bit_width != OutputWidth::Nominal && p.num_input_elements > 0 {
                    let bits = p.out_bit_width.bits(1);
                    let last_index = p.num_input_elements as u64 - 1;
                    if last_index > (1u64 << bits) - 1 {
                        return Err(Error::InvalidParameter(format!(
                            "index {last_index} does not fit a {bits}-bit output"
                        )));
                    }
                }
                Ok(())
            }
            Self::Select(p) => {
                check_elements(p.src1_bit_width, p.num_input_elements, input)?;
                check_output_width(p.src1_bit_width, p.out_bit_width)?;
                if (p.mask.len() as u64) * 8 < p.num_input_elements as u64 {
                    return Err(Error::InvalidParameter(format!(
                        "mask of {} bytes covers fewer than {} elements",
                        p.mask.len(),
                        p.num_input_elements
                    )));
                }
                Ok(())
            }
            Self::Crc64(_) | Self::Compress(_) | Self::Decompress(_) => Ok(()),
        }
    }
}

fn check_elements(width: u8, count: u32, input: &[u8]) -> Result<()> {
    if !(1..=32).contains(&width) {
        return Err(Error::InvalidParameter(format!(
            "src1_bit_width {width} outside 1..=32"
        )));
    }
    let needed = (count as u64 * width as u64).div_ceil(8);
    if (input.len() as u64) < needed {
        return Err(Error::InvalidParameter(format!(
            "{count} elements of {width} bits need {needed} bytes, input has {}",
            input.len()
        )));
    }
    Ok(())
}

fn check_output_width(width: u8, out: OutputWidth) -> Result<()> {
    if out.bits(width) < width {
        return Err(Error::InvalidParameter(format!(
            "{}-bit output cannot hold {width}-bit elements",
            out.bits(width)
        )));
    }
    Ok(())
}

/// What a handler did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Outcome {
    /// Input bytes consumed.
    pub consumed: usize,
    /// Output bytes written.
    pub written: usize,
    /// CRC-32 of the uncompressed data (compress/decompress).
    pub crc: u32,
    /// CRC64 result.
    pub crc64: u64,
    /// Output filled up before the operation finished.
    pub truncated: bool,
}

/// Runs an operation on the CPU.
pub(crate) type SoftwareHandler = fn(&Operation<'_>, &[u8], &mut [u8]) -> Result<Outcome>;

/// Encodes an operation into a hardware descriptor.
pub(crate) type HardwareTranslator =
    fn(&Operation<'_>, &[u8], &mut [u8], &mut IaaHwDesc) -> Result<()>;

/// Both execution paths for one operation kind.
#[derive(Clone, Copy)]
pub(crate) struct HandlerEntry {
    pub software: SoftwareHandler,
    /// `None` when the operation cannot be offloaded.
    pub hardware: Option<HardwareTranslator>,
}

/// Dispatch table.
pub(crate) fn handler(kind: OpKind) -> HandlerEntry {
    match kind {
        OpKind::Extract => HandlerEntry {
            software: analytics::extract,
            hardware: Some(translate::encode_extract),
        },
        OpKind::Scan => HandlerEntry {
            software: analytics::scan,
            hardware: Some(translate::encode_scan),
        },
        OpKind::Select => HandlerEntry {
            software: analytics::select,
            hardware: Some(translate::encode_select),
        },
        OpKind::Crc64 => HandlerEntry {
            software: crc64::run,
            hardware: Some(translate::encode_crc64),
        },
        // Hardware compression needs Huffman tables in an AECS block,
        // which this crate does not build.
        OpKind::Compress => HandlerEntry {
            software: deflate::compress,
            hardware: None,
        },
        OpKind::Decompress => HandlerEntry {
            software: deflate::decompress,
            hardware: Some(translate::encode_decompress),
        },
    }
}

/// True if `kind` has a hardware translator.
#[inline]
pub(crate) fn offloadable(kind: OpKind) -> bool {
    handler(kind).hardware.is_some()
}

/// Error for a handler invoked with another kind's parameters.
pub(crate) fn mismatch(op: &Operation<'_>, path: &'static str) -> Error {
    Error::UnsupportedOperation {
        kind: op.kind(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(width: u8, n: u32, low: u32, high: u32, out: OutputWidth) -> Operation<'static> {
        Operation::Extract(ExtractParams {
            src1_bit_width: width,
            num_input_elements: n,
            param_low: low,
            param_high: high,
            out_bit_width: out,
        })
    }

    #[test]
    fn test_validate_bit_width() {
        let input = [0u8; 64];
        assert!(extract(0, 1, 0, 0, OutputWidth::Nominal).validate(&input).is_err());
        assert!(extract(33, 1, 0, 0, OutputWidth::Nominal).validate(&input).is_err());
        assert!(extract(32, 16, 0, 0, OutputWidth::Nominal).validate(&input).is_ok());
    }

    #[test]
    fn test_validate_input_covers_elements() {
        let input = [0u8; 3];
        assert!(extract(5, 4, 0, 3, OutputWidth::Nominal).validate(&input).is_ok());
        let err = extract(5, 5, 0, 3, OutputWidth::Nominal)
            .validate(&input)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn test_validate_rejects_narrow_output() {
        let input = [0u8; 64];
        assert!(extract(12, 8, 0, 7, OutputWidth::Bits8).validate(&input).is_err());
        assert!(extract(12, 8, 0, 7, OutputWidth::Bits16).validate(&input).is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let input = [0u8; 16];
        assert!(extract(8, 16, 9, 3, OutputWidth::Nominal).validate(&input).is_err());
    }

    #[test]
    fn test_validate_scan_index_width() {
        let input = [0u8; 512];
        let scan = |n, out| {
            Operation::Scan(ScanParams {
                src1_bit_width: 8,
                num_input_elements: n,
                predicate: ScanPredicate::Eq(0),
                out_bit_width: out,
            })
        };
        assert!(scan(256, OutputWidth::Bits8).validate(&input).is_ok());
        assert!(scan(257, OutputWidth::Bits8).validate(&input).is_err());
        assert!(scan(512, OutputWidth::Bits16).validate(&input).is_ok());
    }

    #[test]
    fn test_validate_select_mask_length() {
        let input = [0u8; 32];
        let mask = [0xFFu8; 3];
        let select = |n| {
            Operation::Select(SelectParams {
                src1_bit_width: 8,
                num_input_elements: n,
                mask: &mask,
                out_bit_width: OutputWidth::Nominal,
            })
        };
        assert!(select(24).validate(&input).is_ok());
        assert!(select(25).validate(&input).is_err());
    }

    #[test]
    fn test_predicate_bounds() {
        assert_eq!(ScanPredicate::Lt(0).bounds(8), (0, 255, true));
        assert_eq!(ScanPredicate::Lt(10).bounds(8), (0, 9, false));
        assert_eq!(ScanPredicate::Gt(255).bounds(8), (0, 255, true));
        assert_eq!(ScanPredicate::Gt(7).bounds(4), (8, 15, false));
        assert_eq!(ScanPredicate::Ge(3).bounds(32), (3, u32::MAX, false));
        assert_eq!(ScanPredicate::Ne(4).bounds(8), (4, 4, true));
    }

    #[test]
    fn test_only_compress_stays_on_cpu() {
        for kind in OpKind::ALL {
            assert_eq!(offloadable(kind), kind != OpKind::Compress, "{kind}");
        }
    }
}
