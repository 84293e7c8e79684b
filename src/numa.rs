// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! NUMA node of the calling thread.
//!
//! Linux stores `(node << 12) | cpu` in `IA32_TSC_AUX`, which RDTSCP
//! returns alongside the timestamp. The value describes the CPU the thread
//! was running on at the instant of the read.

/// Node the calling thread is currently running on, if it can be determined.
#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub fn current_node() -> Option<u32> {
    use std::arch::x86_64::{__cpuid, __rdtscp};

    const EXT_FEATURES: u32 = 0x8000_0001;
    const RDTSCP_BIT: u32 = 1 << 27;

    let max_ext = __cpuid(0x8000_0000).eax;
    if max_ext < EXT_FEATURES {
        return None;
    }
    if __cpuid(EXT_FEATURES).edx & RDTSCP_BIT == 0 {
        return None;
    }

    let mut aux = 0u32;
    // SAFETY: RDTSCP support checked above.
    unsafe { __rdtscp(&mut aux) };
    Some(aux >> 12)
}

/// Node the calling thread is currently running on, if it can be determined.
#[cfg(not(all(target_os = "linux", target_arch = "x86_64")))]
pub fn current_node() -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_node_does_not_panic() {
        if let Some(node) = current_node() {
            println!("Running on NUMA node {node}");
        }
    }
}
