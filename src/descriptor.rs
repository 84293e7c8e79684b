// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! IAA hardware descriptor and completion record structures.
//!
//! These structures follow the layout of `struct iax_hw_desc` and
//! `struct iax_completion_record` in the Linux kernel's
//! `include/uapi/linux/idxd.h`.

use crate::opcode::OpKind;
use bitflags::bitflags;
use std::sync::atomic::{fence, Ordering};

bitflags! {
    /// Descriptor flags (bits 0-23 of the flags/opcode field).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DescriptorFlags: u32 {
        /// Fence - wait for previous descriptors.
        const FENCE = 1 << 0;
        /// Block on fault - don't return partial completion on page fault.
        const BLOCK_ON_FAULT = 1 << 1;
        /// Completion record address is valid.
        const CR_ADDR_VALID = 1 << 2;
        /// Request completion record.
        const REQUEST_COMPLETION = 1 << 3;
        /// Request completion interrupt.
        const COMPLETION_INTERRUPT = 1 << 4;
        /// Cache control - allocate destination writes in cache.
        const CACHE_CTRL = 1 << 8;
        /// Destination readback.
        const DEST_READBACK = 1 << 14;
        /// Read source 2 as an accelerator configuration state block.
        const READ_SRC2_AECS = 1 << 16;
    }
}

/// 64-byte IAA hardware descriptor.
///
/// Submitted via MOVDIR64B or ENQCMD. Must be 64-byte aligned.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct IaaHwDesc {
    /// PASID and privilege level.
    pub pasid: u32,

    /// Flags (bits [23:0]) and opcode (bits [31:24]).
    pub flags_opcode: u32,

    /// Address of completion record (must be 64-byte aligned).
    pub completion_addr: u64,

    /// Primary source address.
    pub src1_addr: u64,

    /// Destination address.
    pub dst_addr: u64,

    /// Primary source size in bytes.
    pub src1_size: u32,

    /// Interrupt handle for completion interrupts.
    pub int_handle: u16,

    /// Compression/decompression flags.
    pub codec_flags: u16,

    /// Secondary source address, or an immediate for scan/extract/crc64.
    /// - Scan/Extract: `high << 32 | low`
    /// - Select: mask bit-vector address
    /// - Crc64: polynomial
    pub src2_addr: u64,

    /// Destination capacity in bytes.
    pub max_dst_size: u32,

    /// Secondary source size in bytes.
    pub src2_size: u32,

    /// Analytics parse/output flags.
    pub filter_flags: u32,

    /// Number of input elements for analytics operations.
    pub num_inputs: u32,
}

impl IaaHwDesc {
    /// Create a new zeroed descriptor.
    #[inline]
    pub const fn new() -> Self {
        Self {
            pasid: 0,
            flags_opcode: 0,
            completion_addr: 0,
            src1_addr: 0,
            dst_addr: 0,
            src1_size: 0,
            int_handle: 0,
            codec_flags: 0,
            src2_addr: 0,
            max_dst_size: 0,
            src2_size: 0,
            filter_flags: 0,
            num_inputs: 0,
        }
    }

    /// Set the opcode for this descriptor.
    #[inline]
    pub fn set_opcode(&mut self, kind: OpKind) {
        self.flags_opcode = (self.flags_opcode & 0x00FFFFFF) | ((kind.as_u8() as u32) << 24);
    }

    /// Get the raw opcode from this descriptor.
    #[inline]
    pub fn opcode(&self) -> u8 {
        (self.flags_opcode >> 24) as u8
    }

    /// Set descriptor flags.
    #[inline]
    pub fn set_flags(&mut self, flags: DescriptorFlags) {
        self.flags_opcode = (self.flags_opcode & 0xFF000000) | (flags.bits() & 0x00FFFFFF);
    }

    /// Get descriptor flags, dropping bits this crate does not define.
    #[inline]
    pub fn flags(&self) -> DescriptorFlags {
        DescriptorFlags::from_bits_truncate(self.flags_opcode & 0x00FFFFFF)
    }

    /// Add descriptor flags (OR with existing).
    #[inline]
    pub fn add_flags(&mut self, flags: DescriptorFlags) {
        self.flags_opcode |= flags.bits() & 0x00FFFFFF;
    }

    /// Point the descriptor at a completion record and request a write-back.
    #[inline]
    pub fn set_completion(&mut self, record: &mut IaaCompletionRecord) {
        self.set_completion_addr(record);
    }

    /// Same as [`set_completion`](Self::set_completion) for a record reached
    /// through a raw pointer.
    #[inline]
    pub fn set_completion_addr(&mut self, record: *mut IaaCompletionRecord) {
        self.completion_addr = record as u64;
        self.add_flags(DescriptorFlags::REQUEST_COMPLETION | DescriptorFlags::CR_ADDR_VALID);
    }
}

impl Default for IaaHwDesc {
    fn default() -> Self {
        Self::new()
    }
}

/// 64-byte IAA completion record.
///
/// The device writes this structure when an operation completes. The
/// `status` byte is written last and must be read with volatile semantics.
///
/// | Offset | Size | Field |
/// |--------|------|-------|
/// | 0 | 1 | status |
/// | 1 | 1 | error_code |
/// | 2 | 1 | fault_info |
/// | 4 | 4 | bytes_completed |
/// | 8 | 8 | fault_addr |
/// | 16 | 4 | invalid_flags |
/// | 24 | 4 | output_size |
/// | 28 | 1 | output_bits |
/// | 32 | 4 | crc |
/// | 36 | 12 | min / max / sum |
/// | 48 | 8 | crc64 |
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct IaaCompletionRecord {
    /// Completion status (non-zero when complete).
    pub status: u8,

    /// Operation-specific error code.
    pub error_code: u8,

    /// Fault information flags.
    pub fault_info: u8,

    reserved1: u8,

    /// Number of source bytes consumed.
    pub bytes_completed: u32,

    /// Fault address (if page fault occurred).
    pub fault_addr: u64,

    /// Descriptor flags the device rejected.
    pub invalid_flags: u32,

    reserved2: u32,

    /// Number of destination bytes written.
    pub output_size: u32,

    /// Valid bits in the last output byte (0 means all 8).
    pub output_bits: u8,

    reserved3: u8,

    /// XOR checksum of the uncompressed data.
    pub xor_checksum: u16,

    /// CRC-32 of the uncompressed data.
    pub crc: u32,

    /// Aggregates produced by analytics operations.
    pub min: u32,
    pub max: u32,
    pub sum: u32,

    /// CRC64 result.
    pub crc64: u64,

    reserved4: u64,
}

impl IaaCompletionRecord {
    /// Create a new zeroed completion record.
    #[inline]
    pub const fn new() -> Self {
        Self {
            status: 0,
            error_code: 0,
            fault_info: 0,
            reserved1: 0,
            bytes_completed: 0,
            fault_addr: 0,
            invalid_flags: 0,
            reserved2: 0,
            output_size: 0,
            output_bits: 0,
            reserved3: 0,
            xor_checksum: 0,
            crc: 0,
            min: 0,
            max: 0,
            sum: 0,
            crc64: 0,
            reserved4: 0,
        }
    }

    /// Reset the completion record for reuse.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Check if the operation has completed (volatile read).
    #[inline]
    pub fn is_complete(&self) -> bool {
        // SAFETY: `self.status` is a valid, aligned u8.
        let complete = unsafe { std::ptr::read_volatile(&self.status) != 0 };
        if complete {
            fence(Ordering::Acquire);
        }
        complete
    }

    /// Get the completion status (volatile read).
    #[inline]
    pub fn get_status(&self) -> CompletionStatus {
        // SAFETY: `self.status` is a valid, aligned u8.
        let status = unsafe { std::ptr::read_volatile(&self.status) };
        CompletionStatus::from(status)
    }

    /// Publish a finished record to `dst`, writing the status byte last.
    ///
    /// # Safety
    ///
    /// `dst` must point to a live, writable completion record that nobody
    /// else writes concurrently.
    pub unsafe fn publish(dst: *mut IaaCompletionRecord, record: &IaaCompletionRecord) {
        let status = record.status;
        let mut body = *record;
        body.status = 0;
        std::ptr::write_volatile(dst, body);
        fence(Ordering::Release);
        std::ptr::write_volatile(std::ptr::addr_of_mut!((*dst).status), status);
    }
}

impl Default for IaaCompletionRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Completion status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Operation not yet complete.
    Pending,
    /// Operation completed successfully.
    Success,
    /// Page fault occurred.
    PageFault,
    /// Analytics or decompression input error; see `error_code`.
    AnalyticsError,
    /// Destination buffer filled before the operation finished.
    OutputOverflow,
    /// Unsupported operation.
    UnsupportedOp,
    /// Invalid flags in descriptor.
    InvalidFlags,
    /// Invalid transfer size.
    InvalidSize,
    /// Invalid completion record address.
    InvalidCompletionAddr,
    /// Hardware error.
    HardwareError,
    /// Unknown status code.
    Unknown(u8),
}

impl CompletionStatus {
    /// Raw status byte as written to the completion record.
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0x00,
            Self::Success => 0x01,
            Self::PageFault => 0x03,
            Self::AnalyticsError => 0x0A,
            Self::OutputOverflow => 0x0B,
            Self::UnsupportedOp => 0x10,
            Self::InvalidFlags => 0x11,
            Self::InvalidSize => 0x13,
            Self::InvalidCompletionAddr => 0x19,
            Self::HardwareError => 0x1F,
            Self::Unknown(status) => status,
        }
    }

    /// Returns true if this status indicates success.
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns true if this status indicates the operation is still pending.
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true if this status indicates an error.
    #[inline]
    pub fn is_error(&self) -> bool {
        !matches!(self, Self::Pending | Self::Success)
    }
}

impl From<u8> for CompletionStatus {
    fn from(status: u8) -> Self {
        match status {
            0x00 => Self::Pending,
            0x01 => Self::Success,
            0x03 => Self::PageFault,
            0x0A => Self::AnalyticsError,
            0x0B => Self::OutputOverflow,
            0x10 => Self::UnsupportedOp,
            0x11 => Self::InvalidFlags,
            0x13 => Self::InvalidSize,
            0x19 => Self::InvalidCompletionAddr,
            0x1F => Self::HardwareError,
            _ => Self::Unknown(status),
        }
    }
}

// Layout checks against idxd.h
const _: () = assert!(std::mem::size_of::<IaaHwDesc>() == 64);
const _: () = assert!(std::mem::align_of::<IaaHwDesc>() == 64);
const _: () = assert!(std::mem::size_of::<IaaCompletionRecord>() == 64);
const _: () = assert!(std::mem::align_of::<IaaCompletionRecord>() == 64);
