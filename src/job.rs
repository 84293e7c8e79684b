// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Jobs: one unit of work and its lifecycle.
//!
//! ```text
//! Initialized --configure--> Configured --submit--> Completed | Failed
//!                                  \                    ^
//!                                   +--submit--> Submitted --wait/check--+
//! ```
//!
//! A job borrows its input and output for `'a` and never copies them.
//! Hardware submissions write into the output after `submit` returns, so a
//! job in flight is drained (waited on) before it is reconfigured, finalized
//! or dropped.

use crate::descriptor::{DescriptorFlags, IaaCompletionRecord, IaaHwDesc};
use crate::device::{Capabilities, Device};
use crate::dispatcher::Dispatcher;
use crate::engine::{choose_path, EffectivePath, EngineConfig, ExecutionPath, WaitMode};
use crate::error::{Error, Result, Status};
use crate::numa;
use crate::opcode::OpKind;
use crate::ops::{self, Operation, Outcome};
use crate::submit::SubmitResult;
use crate::translate;
use std::cell::UnsafeCell;
use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

/// Lifecycle state of a [`Job`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Initialized,
    Configured,
    /// Hardware submission accepted, completion record not yet written.
    Submitted,
    Completed,
    Failed,
    Finalized,
}

impl JobState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Configured => "configured",
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Finalized => "finalized",
        }
    }

    /// True once a result (success or failure) is recorded.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Completion record written by a device behind the job's back.
pub(crate) struct CompletionSlot {
    record: UnsafeCell<IaaCompletionRecord>,
}

impl CompletionSlot {
    fn new() -> Box<Self> {
        Box::new(Self {
            record: UnsafeCell::new(IaaCompletionRecord::new()),
        })
    }

    fn as_ptr(&self) -> *mut IaaCompletionRecord {
        self.record.get()
    }

    /// Clear the record. Only valid while nothing is in flight.
    fn reset(&self) {
        // SAFETY: no device holds this address between submissions.
        unsafe { std::ptr::write_volatile(self.as_ptr(), IaaCompletionRecord::new()) }
    }

    fn is_complete(&self) -> bool {
        // SAFETY: aligned, live; the device writes the status byte last.
        let status = unsafe { std::ptr::read_volatile(std::ptr::addr_of!((*self.as_ptr()).status)) };
        if status != 0 {
            fence(Ordering::Acquire);
        }
        status != 0
    }

    /// Copy of the record. Call after `is_complete` returned true.
    fn snapshot(&self) -> IaaCompletionRecord {
        // SAFETY: the device no longer writes a completed record.
        unsafe { std::ptr::read_volatile(self.as_ptr()) }
    }
}

/// One unit of work, reusable across submissions.
///
/// Created by [`Engine::init_job`](crate::Engine::init_job).
pub struct Job<'a> {
    path: ExecutionPath,
    state: JobState,
    operation: Option<Operation<'a>>,
    input: &'a [u8],
    output: &'a mut [u8],
    total_in: usize,
    total_out: usize,
    crc: u32,
    crc64: u64,
    status: Status,
    failure: Option<Error>,
    executed: Option<EffectivePath>,
    dispatcher: Arc<Dispatcher>,
    config: EngineConfig,
    slot: Option<Box<CompletionSlot>>,
    in_flight: Option<Device>,
}

impl<'a> Job<'a> {
    pub(crate) fn new(
        path: ExecutionPath,
        dispatcher: Arc<Dispatcher>,
        config: EngineConfig,
        hardware: bool,
    ) -> Self {
        Self {
            path,
            state: JobState::Initialized,
            operation: None,
            input: &[],
            output: Default::default(),
            total_in: 0,
            total_out: 0,
            crc: 0,
            crc64: 0,
            status: Status::Ok,
            failure: None,
            executed: None,
            dispatcher,
            config,
            slot: hardware.then(CompletionSlot::new),
            in_flight: None,
        }
    }

    /// Set the operation and buffers for the next submissions.
    ///
    /// Resets counters and results. Callable again after a terminal state to
    /// reuse the job.
    ///
    /// # Errors
    ///
    /// - `InvalidState` while a hardware submission is in flight
    /// - `UnsupportedOperation` if the job is pinned to hardware and `op`
    ///   cannot be offloaded
    /// - `InvalidParameter` if `op` does not fit `input`
    pub fn configure(
        &mut self,
        op: Operation<'a>,
        input: &'a [u8],
        output: &'a mut [u8],
    ) -> Result<()> {
        if self.state == JobState::Submitted {
            return Err(self.wrong_state("not submitted"));
        }
        let kind = op.kind();
        if self.path == ExecutionPath::Hardware && !ops::offloadable(kind) {
            return Err(Error::UnsupportedOperation {
                kind,
                path: "hardware",
            });
        }
        op.validate(input)?;

        self.operation = Some(op);
        self.input = input;
        self.output = output;
        self.reset_results();
        self.state = JobState::Configured;
        Ok(())
    }

    /// Run the configured operation.
    ///
    /// Software runs complete before this returns. A hardware run returns
    /// `Status::Pending`; collect its result with [`wait`](Self::wait) or
    /// [`check`](Self::check). Resubmitting a finished job runs the same
    /// configuration again from fresh counters.
    ///
    /// # Errors
    ///
    /// `InvalidState` before `configure` or while in flight. Otherwise the
    /// error of the run, which is also recorded in [`status`](Self::status).
    pub fn submit(&mut self) -> Result<Status> {
        let op = match (self.state, self.operation) {
            (JobState::Configured | JobState::Completed | JobState::Failed, Some(op)) => op,
            _ => return Err(self.wrong_state("configured")),
        };
        self.reset_results();

        let path = match self.route(op.kind()) {
            Ok(path) => path,
            Err(e) => return self.fail(e),
        };
        match path {
            EffectivePath::Software => self.run_software(&op),
            EffectivePath::Hardware => match self.submit_hardware(&op) {
                Ok(()) => Ok(Status::Pending),
                Err(e) if self.path == ExecutionPath::Auto && software_takes_over(&e) =>
                {
                    log::debug!("{} falls back to software: {e}", op.kind());
                    self.run_software(&op)
                }
                Err(e) => self.fail(e),
            },
        }
    }

    /// Block until the current submission has a result.
    ///
    /// A job that already finished reports its result again: `Ok` after a
    /// completed run, the error of the run after a failed one.
    ///
    /// # Errors
    ///
    /// `InvalidState` if nothing was submitted, otherwise the error the run
    /// failed with.
    pub fn wait(&mut self) -> Result<Status> {
        match self.state {
            JobState::Submitted => {
                self.spin_until_complete();
                self.harvest()
            }
            JobState::Completed => Ok(self.status),
            JobState::Failed => Err(self
                .failure
                .clone()
                .unwrap_or_else(|| self.wrong_state("completed"))),
            _ => Err(self.wrong_state("submitted")),
        }
    }

    /// Non-blocking [`wait`](Self::wait): `Ok(Status::Pending)` while in flight.
    pub fn check(&mut self) -> Result<Status> {
        match self.state {
            JobState::Submitted if self.slot_complete() => self.harvest(),
            JobState::Submitted => Ok(Status::Pending),
            _ => self.wait(),
        }
    }

    /// [`wait`](Self::wait) that yields to the async runtime between polls.
    #[cfg(feature = "async")]
    pub async fn wait_async(&mut self) -> Result<Status> {
        loop {
            match self.check() {
                Ok(Status::Pending) => tokio::task::yield_now().await,
                other => return other,
            }
        }
    }

    /// Submit and wait.
    pub fn execute(&mut self) -> Result<Status> {
        match self.submit()? {
            Status::Pending => self.wait(),
            status => Ok(status),
        }
    }

    /// Release the job, draining any submission still in flight.
    ///
    /// Returns the last recorded status.
    pub fn finalize(mut self) -> Status {
        self.drain();
        self.state = JobState::Finalized;
        self.status
    }

    pub fn path(&self) -> ExecutionPath {
        self.path
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn operation(&self) -> Option<&Operation<'a>> {
        self.operation.as_ref()
    }

    /// Input bytes the job may consume.
    pub fn available_in(&self) -> usize {
        self.input.len()
    }

    /// Output bytes the job may produce.
    pub fn available_out(&self) -> usize {
        self.output.len()
    }

    /// Input bytes consumed by the last run.
    pub fn total_in(&self) -> usize {
        self.total_in
    }

    /// Output bytes written by the last run, exact even when truncated.
    pub fn total_out(&self) -> usize {
        self.total_out
    }

    /// CRC-32 of the uncompressed data (compress and decompress).
    pub fn crc(&self) -> u32 {
        self.crc
    }

    /// CRC64 result.
    pub fn crc64(&self) -> u64 {
        self.crc64
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Path the last submission ran on.
    pub fn executed_path(&self) -> Option<EffectivePath> {
        self.executed
    }

    /// Bytes produced by the last run. Empty while in flight.
    pub fn output(&self) -> &[u8] {
        &self.output[..self.total_out]
    }

    fn wrong_state(&self, expected: &'static str) -> Error {
        Error::InvalidState {
            expected,
            actual: self.state.name(),
        }
    }

    fn reset_results(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.crc = 0;
        self.crc64 = 0;
        self.status = Status::Ok;
        self.failure = None;
        self.executed = None;
    }

    fn route(&self, kind: OpKind) -> Result<EffectivePath> {
        let required = Capabilities::for_op(kind);
        let capable = match self.dispatcher.devices() {
            Ok(devices) => devices.iter().filter(|d| d.supports(required)).count(),
            Err(e) if self.path == ExecutionPath::Hardware => return Err(e),
            Err(_) => 0,
        };
        let path = choose_path(self.path, kind, capable)?;
        log::debug!(
            "{kind} on {} path ({} requested, {capable} capable device(s))",
            path.name(),
            self.path
        );
        Ok(path)
    }

    fn run_software(&mut self, op: &Operation<'_>) -> Result<Status> {
        let handler = ops::handler(op.kind()).software;
        match handler(op, self.input, self.output) {
            Ok(outcome) => self.finish(outcome, EffectivePath::Software),
            Err(e) => {
                self.executed = Some(EffectivePath::Software);
                self.total_out = e.written().unwrap_or(0);
                self.fail(e)
            }
        }
    }

    fn submit_hardware(&mut self, op: &Operation<'_>) -> Result<()> {
        let kind = op.kind();
        let encode = ops::handler(kind)
            .hardware
            .ok_or_else(|| ops::mismatch(op, "hardware"))?;
        let preferred = self.config.numa_node.or_else(numa::current_node);
        let device = self
            .dispatcher
            .select_device(preferred, Capabilities::for_op(kind))
            .ok_or(Error::DeviceUnavailable)?
            .clone();

        let slot = self.slot.get_or_insert_with(CompletionSlot::new);
        slot.reset();
        let mut desc = IaaHwDesc::new();
        encode(op, self.input, self.output, &mut desc)?;
        desc.set_completion_addr(slot.as_ptr());
        desc.add_flags(DescriptorFlags::BLOCK_ON_FAULT);

        for _ in 0..self.config.max_retries.max(1) {
            // SAFETY: input, output and mask are borrowed for 'a and the
            // slot is boxed. The job is drained before any of them can be
            // released or reconfigured.
            match unsafe { device.portal().enqueue(&desc) } {
                SubmitResult::Accepted => {
                    log::trace!("{kind} submitted to {}", device.portal().name());
                    self.in_flight = Some(device);
                    self.executed = Some(EffectivePath::Hardware);
                    self.status = Status::Pending;
                    self.state = JobState::Submitted;
                    return Ok(());
                }
                SubmitResult::Retry => std::hint::spin_loop(),
            }
        }
        log::debug!(
            "{}: {kind} refused after {} attempt(s)",
            device.name,
            self.config.max_retries.max(1)
        );
        Err(Error::QueueFull)
    }

    fn slot_complete(&self) -> bool {
        self.slot.as_ref().is_some_and(|slot| slot.is_complete())
    }

    fn spin_until_complete(&self) {
        while !self.slot_complete() {
            match self.config.wait_mode {
                WaitMode::Spin => std::hint::spin_loop(),
                WaitMode::Yield => std::thread::yield_now(),
            }
        }
    }

    /// Collect the result of a completed hardware run.
    fn harvest(&mut self) -> Result<Status> {
        let Some(record) = self.slot.as_ref().map(|slot| slot.snapshot()) else {
            return Err(self.wrong_state("submitted"));
        };
        self.in_flight = None;
        match translate::outcome(&record) {
            Ok(outcome) => self.finish(outcome, EffectivePath::Hardware),
            Err(e) => {
                self.total_in = record.bytes_completed as usize;
                self.total_out = record.output_size as usize;
                self.fail(e)
            }
        }
    }

    fn finish(&mut self, outcome: Outcome, path: EffectivePath) -> Result<Status> {
        self.total_in = outcome.consumed;
        self.total_out = outcome.written;
        self.crc = outcome.crc;
        self.crc64 = outcome.crc64;
        self.executed = Some(path);
        if outcome.truncated {
            return self.fail(Error::InsufficientOutputBuffer {
                written: outcome.written,
            });
        }
        self.status = Status::Ok;
        self.state = JobState::Completed;
        Ok(Status::Ok)
    }

    fn fail(&mut self, error: Error) -> Result<Status> {
        self.status = error.status();
        self.failure = Some(error.clone());
        self.state = JobState::Failed;
        Err(error)
    }

    fn drain(&mut self) {
        if self.state == JobState::Submitted {
            self.spin_until_complete();
            let _ = self.harvest();
        }
    }
}

/// Hardware submission errors that send an `Auto` job to the CPU instead.
///
/// `InvalidParameter` comes from descriptor encoding (a span too large for
/// the 32-bit size fields); the software handlers have no such limit.
fn software_takes_over(error: &Error) -> bool {
    matches!(
        error,
        Error::QueueFull | Error::DeviceUnavailable | Error::InvalidParameter(_)
    )
}

impl Drop for Job<'_> {
    fn drop(&mut self) {
        if self.state == JobState::Submitted {
            log::warn!("Job dropped while in flight; waiting for completion");
            self.drain();
        }
    }
}

impl std::fmt::Debug for Job<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("operation", &self.operation)
            .field("available_in", &self.input.len())
            .field("available_out", &self.output.len())
            .field("total_out", &self.total_out)
            .field("status", &self.status)
            .field("device", &self.in_flight.as_ref().map(|d| &d.name))
            .finish()
    }
}
