// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Job engine: execution paths, routing policy and job creation.

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::job::{CompletionSlot, Job};
use crate::opcode::OpKind;
use crate::ops;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Default number of enqueue attempts before a submission reports `QueueFull`.
pub const DEFAULT_MAX_RETRIES: u32 = 1000;

/// Where a job is allowed to run. Fixed when the job is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionPath {
    /// Always on the CPU.
    Software,
    /// Always on an accelerator; fails if none can take the job.
    Hardware,
    /// Accelerator when one can take the job, CPU otherwise.
    Auto,
}

impl ExecutionPath {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Hardware => "hardware",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExecutionPath {
    type Err = Error;

    /// Accepts `software`, `hardware` and `auto`, optionally suffixed with
    /// `_path`, and the short forms `sw` and `hw`. Case-insensitive.
    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.strip_suffix("_path").unwrap_or(&lower) {
            "software" | "sw" => Ok(Self::Software),
            "hardware" | "hw" => Ok(Self::Hardware),
            "auto" => Ok(Self::Auto),
            _ => Err(Error::InvalidPath(s.to_string())),
        }
    }
}

/// Where a submission actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectivePath {
    Software,
    Hardware,
}

impl EffectivePath {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Software => "software",
            Self::Hardware => "hardware",
        }
    }
}

/// Routing policy for one submission.
///
/// `capable_devices` is the number of devices that support `kind`.
pub fn choose_path(
    requested: ExecutionPath,
    kind: OpKind,
    capable_devices: usize,
) -> Result<EffectivePath> {
    let offloadable = ops::offloadable(kind);
    match requested {
        ExecutionPath::Software => Ok(EffectivePath::Software),
        ExecutionPath::Hardware if !offloadable => Err(Error::UnsupportedOperation {
            kind,
            path: "hardware",
        }),
        ExecutionPath::Hardware if capable_devices == 0 => Err(Error::DeviceUnavailable),
        ExecutionPath::Hardware => Ok(EffectivePath::Hardware),
        ExecutionPath::Auto if offloadable && capable_devices > 0 => Ok(EffectivePath::Hardware),
        ExecutionPath::Auto => Ok(EffectivePath::Software),
    }
}

/// How `wait` polls a hardware completion record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WaitMode {
    /// Busy-poll with a spin hint. Lowest latency, occupies the core.
    #[default]
    Spin,
    /// Yield the thread between polls.
    Yield,
}

/// Tunables applied to every job an engine creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub wait_mode: WaitMode,
    /// Enqueue attempts per submission.
    pub max_retries: u32,
    /// NUMA node to prefer; the calling thread's node when `None`.
    pub numa_node: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wait_mode: WaitMode::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            numa_node: None,
        }
    }
}

impl EngineConfig {
    pub fn with_wait_mode(mut self, wait_mode: WaitMode) -> Self {
        self.wait_mode = wait_mode;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_numa_node(mut self, node: u32) -> Self {
        self.numa_node = Some(node);
        self
    }
}

/// Creates jobs bound to a device registry.
///
/// # Example
///
/// ```rust
/// use iaa_rust::{Engine, ExecutionPath, ExtractParams, Operation, OutputWidth};
///
/// let input: Vec<u8> = (0..1000).map(|i| (i % 256) as u8).collect();
/// let mut output = vec![0u8; 1000];
///
/// let engine = Engine::system();
/// let mut job = engine.new_job(ExecutionPath::Auto)?;
/// job.configure(
///     Operation::Extract(ExtractParams {
///         src1_bit_width: 8,
///         num_input_elements: 1000,
///         param_low: 80,
///         param_high: 123,
///         out_bit_width: OutputWidth::Nominal,
///     }),
///     &input,
///     &mut output,
/// )?;
/// job.execute()?;
/// assert_eq!(job.total_out(), 44);
/// # Ok::<(), iaa_rust::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            config: EngineConfig::default(),
        }
    }

    /// Engine over the process-wide system registry.
    pub fn system() -> Self {
        Self::new(Dispatcher::global())
    }

    /// Engine without devices; every job runs on the CPU.
    pub fn software_only() -> Self {
        Self::new(Arc::new(Dispatcher::from_devices(Vec::new())))
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn hardware_present(&self, path: ExecutionPath) -> Result<bool> {
        match self.dispatcher.devices() {
            Ok(devices) => Ok(!devices.is_empty()),
            Err(e) if path == ExecutionPath::Hardware => Err(e),
            Err(_) => Ok(false),
        }
    }

    /// Bytes of job state needed for `path`.
    ///
    /// # Errors
    ///
    /// `UnsupportedPath` for `Hardware` when no device exists, `ProbeFailed`
    /// for `Hardware` when discovery failed. `Auto` never fails.
    pub fn job_size(&self, path: ExecutionPath) -> Result<usize> {
        let software = std::mem::size_of::<Job<'static>>();
        let hardware = software + std::mem::size_of::<CompletionSlot>();
        match path {
            ExecutionPath::Software => Ok(software),
            ExecutionPath::Hardware if self.hardware_present(path)? => Ok(hardware),
            ExecutionPath::Hardware => Err(Error::UnsupportedPath("hardware")),
            ExecutionPath::Auto if self.hardware_present(path)? => Ok(hardware),
            ExecutionPath::Auto => Ok(software),
        }
    }

    /// Create a job for `path`, given `capacity` bytes of budget.
    ///
    /// # Errors
    ///
    /// `AllocationTooSmall` when `capacity` is below [`job_size`](Self::job_size),
    /// plus the errors of `job_size`.
    pub fn init_job<'a>(&self, path: ExecutionPath, capacity: usize) -> Result<Job<'a>> {
        let required = self.job_size(path)?;
        if capacity < required {
            return Err(Error::AllocationTooSmall {
                required,
                provided: capacity,
            });
        }
        let hardware = path != ExecutionPath::Software && self.hardware_present(path)?;
        log::trace!("New {path} job ({required} bytes)");
        Ok(Job::new(path, self.dispatcher.clone(), self.config, hardware))
    }

    /// Create a job with exactly the storage `path` needs.
    pub fn new_job<'a>(&self, path: ExecutionPath) -> Result<Job<'a>> {
        self.init_job(path, self.job_size(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use crate::error::Status;

    fn emulated_engine() -> Engine {
        Engine::new(Arc::new(Dispatcher::from_devices(vec![Device::emulated(
            "iax0",
            Some(0),
        )])))
    }

    #[test]
    fn test_parse_execution_path() {
        assert_eq!("software".parse::<ExecutionPath>().unwrap(), ExecutionPath::Software);
        assert_eq!("hardware_path".parse::<ExecutionPath>().unwrap(), ExecutionPath::Hardware);
        assert_eq!("HW".parse::<ExecutionPath>().unwrap(), ExecutionPath::Hardware);
        assert_eq!(" Auto ".parse::<ExecutionPath>().unwrap(), ExecutionPath::Auto);

        let err = "gpu".parse::<ExecutionPath>().unwrap_err();
        assert_eq!(err.status(), Status::InvalidPath);
    }

    #[test]
    fn test_choose_path() {
        use EffectivePath::{Hardware, Software};
        let auto = ExecutionPath::Auto;
        let hw = ExecutionPath::Hardware;

        assert_eq!(choose_path(auto, OpKind::Extract, 0).unwrap(), Software);
        assert_eq!(choose_path(auto, OpKind::Extract, 2).unwrap(), Hardware);
        assert_eq!(choose_path(auto, OpKind::Compress, 2).unwrap(), Software);
        assert_eq!(
            choose_path(ExecutionPath::Software, OpKind::Crc64, 4).unwrap(),
            Software
        );
        assert_eq!(choose_path(hw, OpKind::Crc64, 1).unwrap(), Hardware);
        assert!(matches!(
            choose_path(hw, OpKind::Crc64, 0),
            Err(Error::DeviceUnavailable)
        ));
        assert!(matches!(
            choose_path(hw, OpKind::Compress, 1),
            Err(Error::UnsupportedOperation { .. })
        ));
    }

    #[test]
    fn test_job_size_without_devices() {
        let engine = Engine::software_only();
        let software = engine.job_size(ExecutionPath::Software).unwrap();
        assert!(software > 0);
        assert_eq!(engine.job_size(ExecutionPath::Auto).unwrap(), software);
        assert!(matches!(
            engine.job_size(ExecutionPath::Hardware),
            Err(Error::UnsupportedPath(_))
        ));
        assert!(engine.new_job(ExecutionPath::Hardware).is_err());
    }

    #[test]
    fn test_job_size_with_devices() {
        let engine = emulated_engine();
        let software = engine.job_size(ExecutionPath::Software).unwrap();
        let hardware = engine.job_size(ExecutionPath::Hardware).unwrap();
        assert!(hardware > software);
        assert_eq!(engine.job_size(ExecutionPath::Auto).unwrap(), hardware);
    }

    #[test]
    fn test_init_job_checks_capacity() {
        let engine = emulated_engine();
        let required = engine.job_size(ExecutionPath::Hardware).unwrap();

        let err = engine
            .init_job(ExecutionPath::Hardware, required - 1)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AllocationTooSmall { required: r, provided } if r == required && provided == required - 1
        ));
        assert!(engine.init_job(ExecutionPath::Hardware, required).is_ok());
        assert!(engine.init_job(ExecutionPath::Software, usize::MAX).is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = EngineConfig::default()
            .with_wait_mode(WaitMode::Yield)
            .with_max_retries(3)
            .with_numa_node(1);
        assert_eq!(config.wait_mode, WaitMode::Yield);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.numa_node, Some(1));
        assert_eq!(EngineConfig::default().max_retries, DEFAULT_MAX_RETRIES);

        let engine = Engine::software_only().with_config(config);
        assert_eq!(engine.config(), &config);
    }
}
