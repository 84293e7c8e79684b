// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! Device registry and selection.
//!
//! A [`Dispatcher`] probes once, on first use, and keeps the result for its
//! whole lifetime. Concurrent first uses block until the single probe has
//! finished; afterwards every query is a lock-free read.

use crate::device::{Capabilities, Device, DeviceProber, SystemProber};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

pub struct Dispatcher {
    prober: Box<dyn DeviceProber>,
    devices: OnceLock<std::result::Result<Vec<Device>, String>>,
    cursor: AtomicUsize,
}

impl Dispatcher {
    /// Registry that probes with `prober` on first use.
    pub fn with_prober(prober: impl DeviceProber + 'static) -> Self {
        Self {
            prober: Box::new(prober),
            devices: OnceLock::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Registry holding exactly `devices`.
    pub fn from_devices(devices: Vec<Device>) -> Self {
        let dispatcher = Self::with_prober(Vec::<Device>::new());
        let _ = dispatcher.devices.set(Ok(devices));
        dispatcher
    }

    /// Registry backed by operating-system discovery.
    pub fn system() -> Self {
        Self::with_prober(SystemProber)
    }

    /// Process-wide system registry.
    pub fn global() -> Arc<Dispatcher> {
        static GLOBAL: OnceLock<Arc<Dispatcher>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::system())).clone()
    }

    fn registry(&self) -> &std::result::Result<Vec<Device>, String> {
        self.devices.get_or_init(|| match self.prober.probe() {
            Ok(devices) => {
                log::debug!("Registry holds {} device(s)", devices.len());
                Ok(devices)
            }
            Err(e) => {
                log::warn!("{e}");
                Err(match e {
                    Error::ProbeFailed(message) => message,
                    other => other.to_string(),
                })
            }
        })
    }

    /// All devices in discovery order.
    ///
    /// # Errors
    ///
    /// `ProbeFailed` if discovery failed; the failure is remembered.
    pub fn devices(&self) -> Result<&[Device]> {
        match self.registry() {
            Ok(devices) => Ok(devices),
            Err(message) => Err(Error::ProbeFailed(message.clone())),
        }
    }

    /// Iterate devices in discovery order; empty if discovery failed.
    pub fn iter(&self) -> std::slice::Iter<'_, Device> {
        self.devices().unwrap_or(&[]).iter()
    }

    pub fn device_count(&self) -> usize {
        self.iter().len()
    }

    /// Devices on `node`, including devices whose node is unknown.
    pub fn count_on_node(&self, node: u32) -> usize {
        self.iter().filter(|d| local_to(d, node)).count()
    }

    /// Devices supporting every capability in `required`.
    pub fn capable_count(&self, required: Capabilities) -> usize {
        self.iter().filter(|d| d.supports(required)).count()
    }

    /// Pick a device supporting `required`.
    ///
    /// Devices local to `preferred` are used in turn; when none qualifies
    /// the first capable device anywhere is returned.
    pub fn select_device(&self, preferred: Option<u32>, required: Capabilities) -> Option<&Device> {
        if let Some(node) = preferred {
            let local: Vec<&Device> = self
                .iter()
                .filter(|d| d.supports(required) && local_to(d, node))
                .collect();
            if !local.is_empty() {
                let turn = self.cursor.fetch_add(1, Ordering::Relaxed);
                return Some(local[turn % local.len()]);
            }
        }
        self.iter().find(|d| d.supports(required))
    }

    pub fn is_hardware_available(&self) -> bool {
        self.device_count() > 0
    }

    /// Known NUMA nodes with at least one device, ascending.
    pub fn nodes(&self) -> Vec<u32> {
        let mut nodes: Vec<u32> = self.iter().filter_map(|d| d.numa_node).collect();
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }
}

fn local_to(device: &Device, node: u32) -> bool {
    device.numa_node.map_or(true, |n| n == node)
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("devices", &self.devices.get())
            .finish()
    }
}
