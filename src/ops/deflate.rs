// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Software DEFLATE path.
//!
//! Each job is one complete stream: compress ends with a final block and
//! decompress expects one. `crc` is the CRC-32 of the uncompressed bytes,
//! the value IAA reports in its completion record.

use super::{mismatch, CompressionLevel, DeflateFormat, Operation, Outcome};
use crate::error::{Error, Result};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress};

impl From<CompressionLevel> for Compression {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::Default => Compression::default(),
            CompressionLevel::High => Compression::best(),
        }
    }
}

pub(crate) fn compress(op: &Operation<'_>, input: &[u8], output: &mut [u8]) -> Result<Outcome> {
    let Operation::Compress(p) = op else {
        return Err(mismatch(op, "software"));
    };
    let mut stream = Compress::new(p.level.into(), p.format == DeflateFormat::Zlib);
    let result = stream.compress(input, output, FlushCompress::Finish);
    let status = result.map_err(|e| Error::CorruptInput {
        reason: format!("deflate: {e}"),
        written: stream.total_out() as usize,
    })?;

    let consumed = stream.total_in() as usize;
    Ok(Outcome {
        consumed,
        written: stream.total_out() as usize,
        crc: crc32fast::hash(&input[..consumed]),
        truncated: status != flate2::Status::StreamEnd,
        ..Outcome::default()
    })
}

pub(crate) fn decompress(op: &Operation<'_>, input: &[u8], output: &mut [u8]) -> Result<Outcome> {
    let Operation::Decompress(p) = op else {
        return Err(mismatch(op, "software"));
    };
    let mut stream = Decompress::new(p.format == DeflateFormat::Zlib);
    let result = stream.decompress(input, output, FlushDecompress::Finish);
    // Bytes inflated before a failure stay in `output` and are reported.
    let written = stream.total_out() as usize;
    let status = result.map_err(|e| Error::CorruptInput {
        reason: format!("inflate: {e}"),
        written,
    })?;

    let finished = status == flate2::Status::StreamEnd;
    if !finished && written < output.len() {
        return Err(Error::CorruptInput {
            reason: "inflate: stream ended before the final block".into(),
            written,
        });
    }
    Ok(Outcome {
        consumed: stream.total_in() as usize,
        written,
        crc: crc32fast::hash(&output[..written]),
        truncated: !finished,
        ..Outcome::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{CompressParams, DecompressParams};

    fn round_trip(data: &[u8], level: CompressionLevel, format: DeflateFormat) -> Vec<u8> {
        let mut packed = vec![0u8; data.len() + 64];
        let op = Operation::Compress(CompressParams { level, format });
        let c = compress(&op, data, &mut packed).unwrap();
        assert!(!c.truncated);
        assert_eq!(c.consumed, data.len());
        assert_eq!(c.crc, crc32fast::hash(data));

        let mut unpacked = vec![0u8; data.len() + 1];
        let op = Operation::Decompress(DecompressParams { format });
        let d = decompress(&op, &packed[..c.written], &mut unpacked).unwrap();
        assert!(!d.truncated);
        assert_eq!(d.crc, c.crc);
        unpacked.truncate(d.written);
        unpacked
    }

    #[test]
    fn test_round_trip_lengths() {
        for len in [0usize, 1, 2, 63, 64, 1000, 4096, 70_000] {
            let data: Vec<u8> = (0..len).map(|i| (i * 31 % 251) as u8).collect();
            assert_eq!(
                round_trip(&data, CompressionLevel::Default, DeflateFormat::Raw),
                data,
                "len {len}"
            );
        }
    }

    #[test]
    fn test_round_trip_zlib_high() {
        let data = b"the quick brown fox jumps over the lazy dog ".repeat(50);
        assert_eq!(
            round_trip(&data, CompressionLevel::High, DeflateFormat::Zlib),
            data
        );
    }

    #[test]
    fn test_compress_into_small_buffer_truncates() {
        let data: Vec<u8> = (0..4096u32).map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8).collect();
        let mut packed = [0u8; 16];
        let op = Operation::Compress(CompressParams::default());
        let c = compress(&op, &data, &mut packed).unwrap();
        assert!(c.truncated);
        assert!(c.written <= packed.len());
    }

    #[test]
    fn test_decompress_into_small_buffer_truncates() {
        let data = vec![7u8; 1000];
        let mut packed = vec![0u8; 1100];
        let c = compress(&Operation::Compress(CompressParams::default()), &data, &mut packed).unwrap();

        let mut unpacked = [0u8; 100];
        let op = Operation::Decompress(DecompressParams::default());
        let d = decompress(&op, &packed[..c.written], &mut unpacked).unwrap();
        assert!(d.truncated);
        assert_eq!(d.written, 100);
        assert!(unpacked.iter().all(|&b| b == 7));
    }

    #[test]
    fn test_decompress_rejects_reserved_block_type() {
        // BFINAL=1, BTYPE=11 is reserved.
        let garbage = [0xFFu8; 16];
        let mut out = [0u8; 64];
        let op = Operation::Decompress(DecompressParams::default());
        let err = decompress(&op, &garbage, &mut out).unwrap_err();
        assert!(matches!(err, Error::CorruptInput { .. }));
        assert_eq!(err.written(), Some(0));
    }

    #[test]
    fn test_decompress_rejects_truncated_stream() {
        let data: Vec<u8> = (0..20_000u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 24) as u8)
            .collect();
        let mut packed = vec![0u8; 21_000];
        let c = compress(&Operation::Compress(CompressParams::default()), &data, &mut packed).unwrap();

        let mut out = vec![0xAAu8; 40_000];
        let op = Operation::Decompress(DecompressParams::default());
        let err = decompress(&op, &packed[..c.written / 2], &mut out).unwrap_err();
        let Error::CorruptInput { written, .. } = err else {
            panic!("unexpected {err:?}");
        };
        assert!(written > 0);
        assert_eq!(&out[..written], &data[..written]);
        assert!(out[written..].iter().all(|&b| b == 0xAA));
    }
}
