// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Error types and the status code set returned by every fallible job operation.

use crate::opcode::OpKind;
use thiserror::Error;

/// Closed set of completion codes.
///
/// Every [`Error`] maps onto exactly one of these through [`Error::status`],
/// so callers that prefer numeric codes never have to match on error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Status {
    /// Operation completed successfully.
    Ok = 0,
    /// Hardware submission accepted, result not yet available.
    Pending = 1,
    /// The requested execution path is not available on this system.
    UnsupportedPath = 2,
    /// The execution path could not be recognised.
    InvalidPath = 3,
    /// The operation cannot run on the job's execution path.
    UnsupportedOperation = 4,
    /// An operation parameter is out of range.
    InvalidParameter = 5,
    /// The call is not valid in the job's current state.
    InvalidState = 6,
    /// Storage handed to job initialization is too small.
    AllocationTooSmall = 7,
    /// The work queue rejected the descriptor; retry after backoff.
    QueueFull = 8,
    /// No device could accept the submission.
    DeviceUnavailable = 9,
    /// Output was truncated; `total_out` holds the bytes actually written.
    InsufficientOutputBuffer = 10,
    /// Hardware fault or corrupt input.
    OperationError = 11,
    /// Device discovery itself failed.
    ProbeFailed = 12,
}

impl Status {
    /// Returns the status as its numeric code.
    #[inline]
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Returns true for the terminal success code.
    #[inline]
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Errors that can occur while creating, configuring, or running a job.
#[derive(Debug, Error)]
pub enum Error {
    /// The execution path is not available (e.g. hardware without devices).
    #[error("execution path not available: {0}")]
    UnsupportedPath(&'static str),

    /// Text did not name a known execution path.
    #[error("invalid execution path: {0:?}")]
    InvalidPath(String),

    /// Operation has no implementation on the requested path.
    #[error("operation {kind} not supported on {path} path")]
    UnsupportedOperation { kind: OpKind, path: &'static str },

    /// Invalid argument provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Lifecycle call made in the wrong state.
    #[error("invalid job state: expected {expected}, found {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Job storage is smaller than `Engine::job_size` requires.
    #[error("allocation too small: required {required} bytes, got {provided}")]
    AllocationTooSmall { required: usize, provided: usize },

    /// Work queue is full (ENQCMD returned retry).
    #[error("work queue full")]
    QueueFull,

    /// No device could accept the submission.
    #[error("no capable IAA device available")]
    DeviceUnavailable,

    /// Output buffer too small; a partial result of `written` bytes was produced.
    #[error("insufficient output buffer: wrote {written} bytes")]
    InsufficientOutputBuffer { written: usize },

    /// IAA operation failed with hardware error.
    #[error("IAA operation failed: status={status:#04x}, error_code={error_code:#04x}")]
    OperationFailed { status: u8, error_code: u8 },

    /// Page fault during IAA operation.
    #[error("page fault at address {fault_addr:#018x}, completed {bytes_completed} bytes")]
    PageFault {
        fault_addr: u64,
        bytes_completed: u32,
    },

    /// Input could not be decoded; the first `written` output bytes were
    /// produced before the failure.
    #[error("corrupt input: {reason} (wrote {written} bytes)")]
    CorruptInput { reason: String, written: usize },

    /// Device discovery failed.
    #[error("device probe failed: {0}")]
    ProbeFailed(String),

    /// I/O error from system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Platform has no userspace accelerator interface.
    #[error("platform not supported: IAA requires Linux with IDXD driver")]
    PlatformNotSupported,

    /// Permission denied accessing an IAA work queue.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Memory mapping failed.
    #[error("mmap failed: {0}")]
    MmapFailed(String),
}

impl Error {
    /// Maps the error onto the closed status code set.
    pub fn status(&self) -> Status {
        match self {
            Self::UnsupportedPath(_) | Self::PlatformNotSupported => Status::UnsupportedPath,
            Self::InvalidPath(_) => Status::InvalidPath,
            Self::UnsupportedOperation { .. } => Status::UnsupportedOperation,
            Self::InvalidParameter(_) => Status::InvalidParameter,
            Self::InvalidState { .. } => Status::InvalidState,
            Self::AllocationTooSmall { .. } => Status::AllocationTooSmall,
            Self::QueueFull => Status::QueueFull,
            Self::DeviceUnavailable | Self::PermissionDenied(_) | Self::MmapFailed(_) => {
                Status::DeviceUnavailable
            }
            Self::InsufficientOutputBuffer { .. } => Status::InsufficientOutputBuffer,
            Self::OperationFailed { .. } | Self::PageFault { .. } | Self::CorruptInput { .. } => {
                Status::OperationError
            }
            Self::ProbeFailed(_) | Self::Io(_) => Status::ProbeFailed,
        }
    }

    /// Output bytes produced before the error, when the error leaves a
    /// partial result behind.
    pub fn written(&self) -> Option<usize> {
        match self {
            Self::InsufficientOutputBuffer { written } | Self::CorruptInput { written, .. } => {
                Some(*written)
            }
            _ => None,
        }
    }

    /// Returns true if resubmitting the same job may succeed.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull)
    }
}

// `io::Error` is not `Clone`; its copy keeps the kind and the message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Self::UnsupportedPath(path) => Self::UnsupportedPath(*path),
            Self::InvalidPath(text) => Self::InvalidPath(text.clone()),
            Self::UnsupportedOperation { kind, path } => Self::UnsupportedOperation {
                kind: *kind,
                path: *path,
            },
            Self::InvalidParameter(msg) => Self::InvalidParameter(msg.clone()),
            Self::InvalidState { expected, actual } => Self::InvalidState {
                expected: *expected,
                actual: *actual,
            },
            Self::AllocationTooSmall { required, provided } => Self::AllocationTooSmall {
                required: *required,
                provided: *provided,
            },
            Self::QueueFull => Self::QueueFull,
            Self::DeviceUnavailable => Self::DeviceUnavailable,
            Self::InsufficientOutputBuffer { written } => {
                Self::InsufficientOutputBuffer { written: *written }
            }
            Self::OperationFailed { status, error_code } => Self::OperationFailed {
                status: *status,
                error_code: *error_code,
            },
            Self::PageFault {
                fault_addr,
                bytes_completed,
            } => Self::PageFault {
                fault_addr: *fault_addr,
                bytes_completed: *bytes_completed,
            },
            Self::CorruptInput { reason, written } => Self::CorruptInput {
                reason: reason.clone(),
                written: *written,
            },
            Self::ProbeFailed(msg) => Self::ProbeFailed(msg.clone()),
            Self::Io(e) => Self::Io(std::io::Error::new(e.kind(), e.to_string())),
            Self::PlatformNotSupported => Self::PlatformNotSupported,
            Self::PermissionDenied(msg) => Self::PermissionDenied(msg.clone()),
            Self::MmapFailed(msg) => Self::MmapFailed(msg.clone()),
        }
    }
}

/// Result type alias for IAA operations.
pub type Result<T> = std::result::Result<T, Error>;
