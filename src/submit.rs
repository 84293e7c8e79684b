// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Portal writes: MOVDIR64B for dedicated queues, ENQCMD for shared queues.
//!
//! A dedicated queue has a single owner that tracks queue depth itself, so a
//! posted write is enough. A shared queue is admitted by the device, which
//! answers every ENQCMD with accept or retry; that answer is the only
//! back-pressure signal the engine gets.
//!
//! Both functions are one-shot. Retrying is the caller's business.

use crate::descriptor::IaaHwDesc;

/// Outcome of one portal write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitResult {
    /// Descriptor accepted by the device.
    Accepted,
    /// Shared queue refused the descriptor; try again later.
    Retry,
}

/// Instruction used to reach the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// MOVDIR64B, for Dedicated Work Queues.
    Dedicated,
    /// ENQCMD, for Shared Work Queues.
    Shared,
}

/// Write `desc` to `portal` with the instruction matching `mode`.
///
/// # Safety
///
/// - `portal` must be a mapped IAA portal page (64-byte aligned)
/// - every address inside `desc` must stay valid until the completion
///   record it names reports a terminal status
/// - in `Shared` mode the process must have a PASID bound to the device
#[inline]
#[cfg(target_arch = "x86_64")]
pub unsafe fn write_portal(portal: *mut u8, desc: &IaaHwDesc, mode: SubmitMode) -> SubmitResult {
    match mode {
        SubmitMode::Dedicated => {
            movdir64b(portal, desc);
            SubmitResult::Accepted
        }
        SubmitMode::Shared => {
            if enqcmd(portal, desc) {
                SubmitResult::Accepted
            } else {
                SubmitResult::Retry
            }
        }
    }
}

/// `MOVDIR64B r64, m512` (66 0F 38 F8 /r): 64-byte direct store of `[rdx]`
/// to the address in `rax`. Posted, so device errors are not reported.
#[inline]
#[cfg(target_arch = "x86_64")]
unsafe fn movdir64b(portal: *mut u8, desc: &IaaHwDesc) {
    // ModR/M 0x02: reg = rax (destination), r/m = [rdx] (source)
    core::arch::asm!(
        ".byte 0x66, 0x0f, 0x38, 0xf8, 0x02",
        in("rax") portal,
        in("rdx") desc as *const IaaHwDesc,
        options(nostack, preserves_flags)
    );
}

/// `ENQCMD r64, m512` (F3 0F 38 F8 /r): non-posted store with the PASID
/// taken from `IA32_PASID`. ZF=1 means the queue refused the descriptor.
#[inline]
#[cfg(target_arch = "x86_64")]
unsafe fn enqcmd(portal: *mut u8, desc: &IaaHwDesc) -> bool {
    let refused: u8;
    core::arch::asm!(
        ".byte 0xf3, 0x0f, 0x38, 0xf8, 0x02",
        "setz {refused}",
        in("rax") portal,
        in("rdx") desc as *const IaaHwDesc,
        refused = out(reg_byte) refused,
        options(nostack)
    );
    refused == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_result() {
        assert_ne!(SubmitResult::Accepted, SubmitResult::Retry);
    }

    #[test]
    fn test_submit_mode() {
        assert_ne!(SubmitMode::Dedicated, SubmitMode::Shared);
    }

    // Portal writes need a mapped work queue and are exercised only on
    // hosts with IAA hardware.
}
