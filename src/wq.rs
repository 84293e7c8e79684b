// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Work queue portals.
//!
//! A work queue is the interface through which jobs reach an IAA device.
//! Each queue exposes a portal where 64-byte descriptors are written; the
//! device answers by writing the completion record the descriptor names.
//!
//! [`Portal`] abstracts over the two implementations:
//!
//! - [`WorkQueue`]: a `/dev/iax/wqN.M` character device with its portal page
//!   mapped into the process (Linux, x86_64).
//! - [`EmulatedQueue`]: executes descriptors on the CPU with the software
//!   handlers and writes a completion record exactly as a device would.

use crate::descriptor::{DescriptorFlags, IaaCompletionRecord, IaaHwDesc};
use crate::submit::SubmitResult;
use crate::translate;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Something descriptors can be written to.
pub trait Portal: Send + Sync {
    /// Write one descriptor.
    ///
    /// # Safety
    ///
    /// Every address inside `desc`, including its completion record, must
    /// stay valid until that record reports a terminal status.
    unsafe fn enqueue(&self, desc: &IaaHwDesc) -> SubmitResult;

    /// Queue name, e.g. `wq1.0`.
    fn name(&self) -> &str;
}

/// Work queue type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkQueueType {
    /// Dedicated Work Queue - single user, uses MOVDIR64B.
    Dedicated,
    /// Shared Work Queue - multiple users, uses ENQCMD with PASID.
    Shared,
}

/// Information about a work queue (from sysfs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkQueueInfo {
    /// Work queue name (e.g., "wq0.0").
    pub name: String,
    /// State ("enabled", "disabled", etc.).
    pub state: String,
    /// Work queue type.
    pub wq_type: WorkQueueType,
    /// Queue size (number of entries).
    pub size: u32,
    /// Threshold for shared WQ.
    pub threshold: u32,
    /// Bound to the user-space character device driver.
    pub is_user: bool,
}

impl WorkQueueInfo {
    /// True if user-space can submit to this queue.
    pub fn is_usable(&self) -> bool {
        self.state == "enabled" && self.is_user
    }
}

// ============================================================================
// Linux Implementation
// ============================================================================

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
mod linux_impl {
    use super::*;
    use crate::error::{Error, Result};
    use crate::submit::{write_portal, SubmitMode};
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use std::path::Path;

    /// Portal size for mmap (one page).
    const PORTAL_SIZE: usize = 4096;

    /// Handle to an open work queue.
    ///
    /// Owns the character device and the mapped portal page; both are
    /// released on drop.
    pub struct WorkQueue {
        #[allow(dead_code)]
        file: File,
        name: String,
        portal: *mut u8,
        wq_type: WorkQueueType,
    }

    // SAFETY: the portal is a device page. Writes to it are single 64-byte
    // instructions the device admits atomically, and the mapping lives
    // until drop.
    unsafe impl Send for WorkQueue {}
    unsafe impl Sync for WorkQueue {}

    impl WorkQueue {
        /// Open a work queue device and map its portal.
        ///
        /// # Errors
        ///
        /// `PermissionDenied` when the device node is not accessible to this
        /// user, `Io` when it cannot be opened, `MmapFailed` when the portal
        /// cannot be mapped.
        pub fn open(path: &Path, wq_type: WorkQueueType) -> Result<Self> {
            let file = File::options()
                .read(true)
                .write(true)
                .open(path)
                .map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        Error::PermissionDenied(path.display().to_string())
                    } else {
                        Error::Io(e)
                    }
                })?;

            // SAFETY: fresh shared mapping of an open fd; the result is checked.
            let portal = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    PORTAL_SIZE,
                    libc::PROT_WRITE,
                    libc::MAP_SHARED | libc::MAP_POPULATE,
                    file.as_raw_fd(),
                    0,
                )
            };
            if portal == libc::MAP_FAILED {
                return Err(Error::MmapFailed(format!(
                    "{}: {}",
                    path.display(),
                    std::io::Error::last_os_error()
                )));
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            log::debug!("Mapped {:?} work queue portal {}", wq_type, path.display());

            Ok(Self {
                file,
                name,
                portal: portal as *mut u8,
                wq_type,
            })
        }

        /// Get the work queue type.
        pub fn wq_type(&self) -> WorkQueueType {
            self.wq_type
        }
    }

    impl Portal for WorkQueue {
        unsafe fn enqueue(&self, desc: &IaaHwDesc) -> SubmitResult {
            let mode = match self.wq_type {
                WorkQueueType::Dedicated => SubmitMode::Dedicated,
                WorkQueueType::Shared => SubmitMode::Shared,
            };
            write_portal(self.portal, desc, mode)
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    impl Drop for WorkQueue {
        fn drop(&mut self) {
            // SAFETY: `portal` came from a successful mmap of PORTAL_SIZE bytes.
            unsafe {
                libc::munmap(self.portal as *mut libc::c_void, PORTAL_SIZE);
            }
        }
    }
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub use linux_impl::WorkQueue;

// ============================================================================
// Emulated queue
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Immediate,
    Deferred { depth: usize },
}

/// Work queue executed on the CPU.
///
/// In immediate mode a descriptor is executed inside [`Portal::enqueue`] and
/// its completion record is written before the call returns. In deferred
/// mode descriptors wait in a bounded queue until
/// [`process_pending`](Self::process_pending) runs them; a full queue
/// answers [`SubmitResult::Retry`] like a shared hardware queue.
pub struct EmulatedQueue {
    name: String,
    mode: Mode,
    pending: Mutex<VecDeque<IaaHwDesc>>,
    submitted: AtomicU64,
}

impl EmulatedQueue {
    /// Queue that completes every descriptor on submission.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_mode(name.into(), Mode::Immediate)
    }

    /// Queue that holds up to `depth` descriptors until processed.
    pub fn deferred(name: impl Into<String>, depth: usize) -> Self {
        Self::with_mode(name.into(), Mode::Deferred { depth })
    }

    fn with_mode(name: String, mode: Mode) -> Self {
        Self {
            name,
            mode,
            pending: Mutex::new(VecDeque::new()),
            submitted: AtomicU64::new(0),
        }
    }

    /// Execute every queued descriptor in submission order.
    ///
    /// Returns the number of descriptors completed.
    pub fn process_pending(&self) -> usize {
        let batch: Vec<IaaHwDesc> = {
            let mut queue = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain(..).collect()
        };
        for desc in &batch {
            // SAFETY: enqueue's contract keeps every address alive until the
            // record is terminal, which happens here.
            unsafe { complete(desc) };
        }
        batch.len()
    }

    /// Descriptors waiting for [`process_pending`](Self::process_pending).
    pub fn pending(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Descriptors accepted since creation.
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for EmulatedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmulatedQueue")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Run `desc` and write its completion record, if one was requested.
unsafe fn complete(desc: &IaaHwDesc) {
    let record = translate::emulate(desc);
    let flags = desc.flags();
    if flags.contains(DescriptorFlags::REQUEST_COMPLETION | DescriptorFlags::CR_ADDR_VALID)
        && desc.completion_addr != 0
    {
        IaaCompletionRecord::publish(desc.completion_addr as *mut IaaCompletionRecord, &record);
    }
}

impl Portal for EmulatedQueue {
    unsafe fn enqueue(&self, desc: &IaaHwDesc) -> SubmitResult {
        match self.mode {
            Mode::Immediate => complete(desc),
            Mode::Deferred { depth } => {
                let mut queue = self.pending.lock().unwrap_or_else(|e| e.into_inner());
                if queue.len() >= depth {
                    log::trace!("{}: queue full ({depth} entries)", self.name);
                    return SubmitResult::Retry;
                }
                queue.push_back(*desc);
            }
        }
        self.submitted.fetch_add(1, Ordering::Relaxed);
        SubmitResult::Accepted
    }

    fn name(&self) -> &str {
        &self.name
    }
}
