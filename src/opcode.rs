// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Operation kinds and their IAA opcodes.
//!
//! Opcode values match the Linux kernel's `include/uapi/linux/idxd.h`
//! `IAX_OPCODE_*` definitions.

/// Operations a job can carry.
///
/// The discriminant is the 8-bit opcode placed in the descriptor's
/// opcode field when the job runs on the hardware path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpKind {
    /// DEFLATE decompression.
    Decompress = 0x42,

    /// DEFLATE compression.
    Compress = 0x43,

    /// 64-bit CRC with caller-supplied polynomial.
    Crc64 = 0x44,

    /// Predicate scan producing a bit-vector or index list.
    Scan = 0x50,

    /// Copy elements in an index range.
    Extract = 0x52,

    /// Copy elements selected by a bit-vector mask.
    Select = 0x53,
}

impl OpKind {
    /// Every operation kind, in opcode order.
    pub const ALL: [OpKind; 6] = [
        Self::Decompress,
        Self::Compress,
        Self::Crc64,
        Self::Scan,
        Self::Extract,
        Self::Select,
    ];

    /// Returns the opcode as a u8 value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode an opcode read back from a descriptor.
    pub const fn from_u8(opcode: u8) -> Option<Self> {
        match opcode {
            0x42 => Some(Self::Decompress),
            0x43 => Some(Self::Compress),
            0x44 => Some(Self::Crc64),
            0x50 => Some(Self::Scan),
            0x52 => Some(Self::Extract),
            0x53 => Some(Self::Select),
            _ => None,
        }
    }

    /// Returns a human-readable name for the opcode.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Decompress => "DECOMPRESS",
            Self::Compress => "COMPRESS",
            Self::Crc64 => "CRC64",
            Self::Scan => "SCAN",
            Self::Extract => "EXTRACT",
            Self::Select => "SELECT",
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_values() {
        assert_eq!(OpKind::Decompress.as_u8(), 0x42);
        assert_eq!(OpKind::Compress.as_u8(), 0x43);
        assert_eq!(OpKind::Crc64.as_u8(), 0x44);
        assert_eq!(OpKind::Scan.as_u8(), 0x50);
        assert_eq!(OpKind::Extract.as_u8(), 0x52);
        assert_eq!(OpKind::Select.as_u8(), 0x53);
    }

    #[test]
    fn test_opcode_decode() {
        for kind in OpKind::ALL {
            assert_eq!(OpKind::from_u8(kind.as_u8()), Some(kind));
        }
        assert_eq!(OpKind::from_u8(0x04), None);
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(format!("{}", OpKind::Crc64), "CRC64 (0x44)");
        assert_eq!(format!("{}", OpKind::Extract), "EXTRACT (0x52)");
    }
}
