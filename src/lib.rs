// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! # Intel IAA (In-Memory Analytics Accelerator) Rust Bindings
//!
//! This crate runs compression and analytics jobs either on the CPU or on
//! Intel's In-Memory Analytics Accelerator, available on Intel Xeon Scalable
//! processors (4th Gen "Sapphire Rapids" and later). The same job runs on
//! either path and produces the same bytes.
//!
//! ## Supported Operations
//!
//! | Operation | Software | Hardware |
//! |-----------|----------|----------|
//! | Extract (index range of packed elements) | yes | yes |
//! | Scan (predicate to bit-vector or index list) | yes | yes |
//! | Select (elements under a bit-vector mask) | yes | yes |
//! | CRC64 (any polynomial) | yes | yes |
//! | Decompress (DEFLATE, zlib) | yes | yes |
//! | Compress (DEFLATE, zlib) | yes | no |
//!
//! ## Execution Paths
//!
//! - [`ExecutionPath::Software`]: always on the CPU.
//! - [`ExecutionPath::Hardware`]: always on a device; fails when none exists.
//! - [`ExecutionPath::Auto`]: on a device when one can take the job, on the
//!   CPU otherwise. A full work queue also sends the job to the CPU.
//!
//! ## Platform Support
//!
//! | Platform | Hardware IAA | Software |
//! |----------|--------------|----------|
//! | Linux x86_64 | Supported | Supported |
//! | Windows  | Not available (devices are only enumerated) | Supported |
//! | Others   | Not available | Supported |
//!
//! ## Example
//!
//! ```rust
//! use iaa_rust::{Crc64Params, Engine, ExecutionPath, Operation};
//!
//! let mut no_output = [0u8; 0];
//! let engine = Engine::system();
//! let mut job = engine.new_job(ExecutionPath::Auto)?;
//! job.configure(
//!     Operation::Crc64(Crc64Params {
//!         poly: 0x42F0_E1EB_A9EA_3693,
//!         big_endian: false,
//!         inverse: true,
//!     }),
//!     b"123456789",
//!     &mut no_output,
//! )?;
//! job.execute()?;
//! assert_eq!(job.crc64(), 0x995D_C9BB_DF19_39FA);
//! # Ok::<(), iaa_rust::Error>(())
//! ```
//!
//! ## Requirements
//!
//! ### Hardware path (Linux)
//! - Intel Xeon Scalable 4th Gen (Sapphire Rapids) or later
//! - Linux kernel 5.18+ with the IDXD driver enabled
//! - IAA work queues configured as `user` queues via `accel-config`
//!
//! On virtual machines the accelerator's NUMA node is often unknown; such
//! devices serve jobs from every node.

mod bits;
pub mod descriptor;
pub mod device;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod job;
pub mod numa;
pub mod opcode;
pub mod ops;
pub mod submit;
mod translate;
pub mod wq;

pub use descriptor::{CompletionStatus, IaaCompletionRecord, IaaHwDesc};
pub use device::{
    discover_devices, is_iaa_available, is_iaa_configured, Capabilities, Device, DeviceProber,
    SystemProber,
};
pub use dispatcher::Dispatcher;
pub use engine::{
    choose_path, EffectivePath, Engine, EngineConfig, ExecutionPath, WaitMode,
};
pub use error::{Error, Result, Status};
pub use job::{Job, JobState};
pub use opcode::OpKind;
pub use ops::{
    CompressParams, CompressionLevel, Crc64Params, DecompressParams, DeflateFormat, ExtractParams,
    Operation, OutputWidth, ScanParams, ScanPredicate, SelectParams,
};
pub use wq::{EmulatedQueue, Portal, WorkQueueInfo, WorkQueueType};

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
pub use wq::WorkQueue;
