// Intel In-Memory Analytics Accelerator (IAA) Rust Bindings
// Copyright 2025 Henk-Jan Lebbink
// SPDX-License-Identifier: MIT

//! IAA device discovery.
//!
//! # Platform Support
//!
//! ## Linux
//! IAA devices appear in `/sys/bus/dsa/devices/` next to DSA devices:
//! - `iax1`, `iax3`, ... - IAA device instances
//! - `wq1.0`, `wq1.1`, ... - Work queues on device 1
//!
//! Work queue character devices appear at `/dev/iax/wq1.0`, etc.
//!
//! ## Windows
//! IAA functions are enumerated through SetupDi and logged, but Windows has
//! no userspace portal interface, so no device is usable.
//!
//! Zero devices is a normal result everywhere. Only a failure of the
//! discovery mechanism itself is an error.

use crate::error::Result;
use crate::opcode::OpKind;
use crate::ops;
use crate::wq::{EmulatedQueue, Portal, WorkQueueInfo};
use bitflags::bitflags;
use std::path::PathBuf;
use std::sync::Arc;

bitflags! {
    /// Operations a device can execute.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        const DECOMPRESS = 1 << 0;
        const COMPRESS = 1 << 1;
        const CRC64 = 1 << 2;
        const SCAN = 1 << 3;
        const EXTRACT = 1 << 4;
        const SELECT = 1 << 5;
    }
}

impl Capabilities {
    /// The capability an operation kind requires.
    pub const fn for_op(kind: OpKind) -> Self {
        match kind {
            OpKind::Decompress => Self::DECOMPRESS,
            OpKind::Compress => Self::COMPRESS,
            OpKind::Crc64 => Self::CRC64,
            OpKind::Scan => Self::SCAN,
            OpKind::Extract => Self::EXTRACT,
            OpKind::Select => Self::SELECT,
        }
    }

    /// Capabilities for every operation this crate can offload.
    pub fn offloadable() -> Self {
        OpKind::ALL
            .into_iter()
            .filter(|&kind| ops::offloadable(kind))
            .fold(Self::empty(), |caps, kind| caps | Self::for_op(kind))
    }

    /// Parse the sysfs `op_cap` bitmap.
    ///
    /// The bitmap is a list of hex words, most significant first, where bit
    /// `n` of the whole bitmap is set when opcode `n` is supported. Returns
    /// `None` if a word is not valid hex.
    pub fn from_op_cap(text: &str) -> Option<Self> {
        let mut caps = Self::empty();
        let mut offset = 0u32;
        let words = text
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|w| !w.is_empty());
        for word in words.rev() {
            let digits = word.trim_start_matches("0x");
            let value = u64::from_str_radix(digits, 16).ok()?;
            let width = digits.len() as u32 * 4;
            for kind in OpKind::ALL {
                let bit = kind.as_u8() as u32;
                if (offset..offset + width).contains(&bit) && (value >> (bit - offset)) & 1 == 1 {
                    caps |= Self::for_op(kind);
                }
            }
            offset += width;
        }
        Some(caps)
    }
}

/// A discovered IAA device and the queue jobs are submitted to.
#[derive(Clone)]
pub struct Device {
    /// Device name (e.g., "iax1").
    pub name: String,
    /// Sysfs path for this device; empty for emulated devices.
    pub sysfs_path: PathBuf,
    /// NUMA node, `None` when the platform does not report one.
    pub numa_node: Option<u32>,
    pub capabilities: Capabilities,
    /// Work queues found on this device.
    pub work_queues: Vec<WorkQueueInfo>,
    portal: Arc<dyn Portal>,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        numa_node: Option<u32>,
        capabilities: Capabilities,
        portal: Arc<dyn Portal>,
    ) -> Self {
        Self {
            name: name.into(),
            sysfs_path: PathBuf::new(),
            numa_node,
            capabilities,
            work_queues: Vec::new(),
            portal,
        }
    }

    /// A device backed by an immediate [`EmulatedQueue`] that supports
    /// every offloadable operation.
    pub fn emulated(name: impl Into<String>, numa_node: Option<u32>) -> Self {
        let name = name.into();
        let queue = EmulatedQueue::new(format!("{name}/wq0.0"));
        Self::new(name, numa_node, Capabilities::offloadable(), Arc::new(queue))
    }

    pub fn with_sysfs_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sysfs_path = path.into();
        self
    }

    pub fn with_work_queues(mut self, work_queues: Vec<WorkQueueInfo>) -> Self {
        self.work_queues = work_queues;
        self
    }

    /// True if every capability in `required` is present.
    #[inline]
    pub fn supports(&self, required: Capabilities) -> bool {
        self.capabilities.contains(required)
    }

    /// The portal jobs are submitted to.
    pub fn portal(&self) -> &Arc<dyn Portal> {
        &self.portal
    }

    /// Get the number of available work queues.
    pub fn wq_count(&self) -> usize {
        self.work_queues.len()
    }

    /// Get the number of enabled work queues.
    pub fn enabled_wq_count(&self) -> usize {
        self.work_queues
            .iter()
            .filter(|wq| wq.state == "enabled")
            .count()
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("numa_node", &self.numa_node)
            .field("capabilities", &self.capabilities)
            .field("portal", &self.portal.name())
            .finish()
    }
}

/// Source of devices for a [`Dispatcher`](crate::Dispatcher).
pub trait DeviceProber: Send + Sync {
    /// Enumerate usable devices. Zero devices is `Ok(vec![])`.
    fn probe(&self) -> Result<Vec<Device>>;
}

/// Discovery through the operating system's device interface.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProber;

impl DeviceProber for SystemProber {
    fn probe(&self) -> Result<Vec<Device>> {
        discover_devices()
    }
}

/// A fixed device list, handed out on every probe.
impl DeviceProber for Vec<Device> {
    fn probe(&self) -> Result<Vec<Device>> {
        Ok(self.clone())
    }
}

// ============================================================================
// Linux Implementation
// ============================================================================

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use crate::error::Error;
    use crate::wq::WorkQueueType;
    use std::fs;
    use std::io::ErrorKind;
    use std::path::Path;

    /// Sysfs base path for IDXD devices.
    pub const SYSFS_IDXD_PATH: &str = "/sys/bus/dsa/devices";

    /// Device node base path for IAA work queues.
    pub const DEV_IAX_PATH: &str = "/dev/iax";

    /// What sysfs says about one device, before any queue is opened.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Topology {
        pub name: String,
        pub sysfs_path: PathBuf,
        pub numa_node: Option<u32>,
        pub capabilities: Capabilities,
        pub work_queues: Vec<WorkQueueInfo>,
    }

    /// Discovery from a sysfs tree and a device node directory.
    #[derive(Debug, Clone)]
    pub struct SysfsProber {
        pub sysfs_root: PathBuf,
        pub dev_root: PathBuf,
    }

    impl Default for SysfsProber {
        fn default() -> Self {
            Self {
                sysfs_root: PathBuf::from(SYSFS_IDXD_PATH),
                dev_root: PathBuf::from(DEV_IAX_PATH),
            }
        }
    }

    impl SysfsProber {
        pub fn new(sysfs_root: impl Into<PathBuf>, dev_root: impl Into<PathBuf>) -> Self {
            Self {
                sysfs_root: sysfs_root.into(),
                dev_root: dev_root.into(),
            }
        }

        fn open(&self, topology: Topology) -> Option<Device> {
            let Some(wq) = submission_queue(&topology.name, &topology.work_queues) else {
                log::warn!(
                    "Skipping {}: no enabled shared user work queue ({} configured)",
                    topology.name,
                    topology.work_queues.len()
                );
                return None;
            };
            match open_portal(&self.dev_root.join(&wq.name), wq.wq_type) {
                Ok(portal) => Some(
                    Device::new(
                        topology.name,
                        topology.numa_node,
                        topology.capabilities,
                        portal,
                    )
                    .with_sysfs_path(topology.sysfs_path)
                    .with_work_queues(topology.work_queues),
                ),
                Err(e) => {
                    log::warn!("Skipping {}: cannot open {}: {}", topology.name, wq.name, e);
                    None
                }
            }
        }
    }

    impl DeviceProber for SysfsProber {
        fn probe(&self) -> Result<Vec<Device>> {
            let devices: Vec<Device> = read_topology(&self.sysfs_root)?
                .into_iter()
                .filter_map(|topology| self.open(topology))
                .collect();
            log::info!("Found {} usable IAA device(s)", devices.len());
            Ok(devices)
        }
    }

    /// First enabled shared user queue of a device.
    ///
    /// Dedicated queues are left out: MOVDIR64B gets no admission answer, so
    /// a full dedicated queue drops descriptors without telling the
    /// submitter, and jobs from other threads sharing the device would
    /// wait forever.
    pub(crate) fn submission_queue<'q>(
        device: &str,
        queues: &'q [WorkQueueInfo],
    ) -> Option<&'q WorkQueueInfo> {
        for wq in queues.iter().filter(|wq| wq.is_usable()) {
            match wq.wq_type {
                WorkQueueType::Shared => return Some(wq),
                WorkQueueType::Dedicated => {
                    log::info!("{device}: not using dedicated work queue {}", wq.name)
                }
            }
        }
        None
    }

    #[cfg(target_arch = "x86_64")]
    fn open_portal(path: &Path, wq_type: WorkQueueType) -> Result<Arc<dyn Portal>> {
        Ok(Arc::new(crate::wq::WorkQueue::open(path, wq_type)?))
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn open_portal(_path: &Path, _wq_type: WorkQueueType) -> Result<Arc<dyn Portal>> {
        Err(Error::PlatformNotSupported)
    }

    /// Read every `iax<N>` device under `sysfs_root`, sorted by name.
    ///
    /// A missing `sysfs_root` means no IDXD driver, which yields no devices.
    pub fn read_topology(sysfs_root: &Path) -> Result<Vec<Topology>> {
        let entries = match fs::read_dir(sysfs_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("{} not present, no IAA devices", sysfs_root.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::ProbeFailed(format!(
                    "{}: {}",
                    sysfs_root.display(),
                    e
                )))
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| Error::ProbeFailed(format!("{}: {}", sysfs_root.display(), e)))?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        let mut devices = Vec::new();
        for name in names.iter().filter(|n| device_number(n).is_some()) {
            let path = sysfs_root.join(name);
            let numa_node = read_numa_node(&path.join("numa_node"));
            let capabilities = match read_string(&path.join("op_cap")) {
                Some(text) => Capabilities::from_op_cap(&text).unwrap_or_else(|| {
                    log::warn!("{name}: unparseable op_cap {text:?}, assuming none");
                    Capabilities::empty()
                }),
                None => Capabilities::all(),
            };
            let work_queues = read_work_queues(sysfs_root, name, &names);
            log::debug!(
                "{name}: node {numa_node:?}, {} work queue(s), {capabilities:?}",
                work_queues.len()
            );
            devices.push(Topology {
                name: name.clone(),
                sysfs_path: path,
                numa_node,
                capabilities,
                work_queues,
            });
        }
        Ok(devices)
    }

    fn device_number(name: &str) -> Option<u32> {
        name.strip_prefix("iax")?.parse().ok()
    }

    fn read_work_queues(sysfs_root: &Path, device: &str, names: &[String]) -> Vec<WorkQueueInfo> {
        let Some(number) = device_number(device) else {
            return Vec::new();
        };
        let prefix = format!("wq{number}.");
        names
            .iter()
            .filter(|n| n.starts_with(&prefix))
            .map(|n| read_wq_info(n, &sysfs_root.join(n)))
            .collect()
    }

    fn read_wq_info(name: &str, path: &Path) -> WorkQueueInfo {
        let state = read_string(&path.join("state")).unwrap_or_else(|| "unknown".to_string());
        let mode = read_string(&path.join("mode")).unwrap_or_default();
        let kind = read_string(&path.join("type")).unwrap_or_default();

        WorkQueueInfo {
            name: name.to_string(),
            state,
            wq_type: match mode.as_str() {
                "dedicated" => WorkQueueType::Dedicated,
                _ => WorkQueueType::Shared,
            },
            size: read_u32(&path.join("size")).unwrap_or(0),
            threshold: read_u32(&path.join("threshold")).unwrap_or(0),
            is_user: kind == "user",
        }
    }

    fn read_string(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn read_u32(path: &Path) -> Option<u32> {
        read_string(path)?.parse().ok()
    }

    /// `-1` (or anything negative) means the node is unknown.
    fn read_numa_node(path: &Path) -> Option<u32> {
        let node: i64 = read_string(path)?.parse().ok()?;
        u32::try_from(node).ok()
    }

    pub fn discover_devices() -> Result<Vec<Device>> {
        SysfsProber::default().probe()
    }

    pub fn is_iaa_available() -> bool {
        fs::read_dir(SYSFS_IDXD_PATH)
            .map(|entries| {
                entries
                    .flatten()
                    .any(|e| device_number(&e.file_name().to_string_lossy()).is_some())
            })
            .unwrap_or(false)
    }

    pub fn is_iaa_configured() -> bool {
        Path::new(DEV_IAX_PATH).exists()
    }
}

#[cfg(target_os = "linux")]
pub use linux_impl::{read_topology, SysfsProber, Topology};

// ============================================================================
// Windows Implementation
// ============================================================================

#[cfg(target_os = "windows")]
mod windows_impl {
    use super::*;
    use crate::error::Error;
    use windows::core::PCWSTR;
    use windows::Win32::Devices::DeviceAndDriverInstallation::{
        SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInfo, SetupDiGetClassDevsW,
        SetupDiGetDeviceRegistryPropertyW, DIGCF_ALLCLASSES, DIGCF_PRESENT, HDEVINFO,
        SPDRP_DEVICEDESC, SPDRP_HARDWAREID, SP_DEVINFO_DATA, SETUP_DI_REGISTRY_PROPERTY,
    };
    use windows::Win32::Foundation::ERROR_NO_MORE_ITEMS;

    /// Intel IAA PCI Vendor and Device IDs.
    const INTEL_IAA_HARDWARE_ID_PREFIX: &str = "PCI\\VEN_8086&DEV_0CFE";

    fn registry_string(
        dev_info: HDEVINFO,
        data: &SP_DEVINFO_DATA,
        property: SETUP_DI_REGISTRY_PROPERTY,
    ) -> Option<String> {
        let mut buffer = vec![0u8; 512];
        let mut required = 0u32;
        // SAFETY: `dev_info` is live for the duration of the enumeration and
        // `buffer` outlives the call.
        unsafe {
            SetupDiGetDeviceRegistryPropertyW(
                dev_info,
                data,
                property,
                None,
                Some(&mut buffer),
                Some(&mut required),
            )
        }
        .ok()?;
        let wide: Vec<u16> = buffer
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .take_while(|&c| c != 0)
            .collect();
        Some(String::from_utf16_lossy(&wide))
    }

    /// Hardware IDs and descriptions of the IAA functions present.
    pub fn enumerate() -> Result<Vec<(String, String)>> {
        // SAFETY: plain FFI call; the handle is released by the guard below.
        let dev_info = unsafe {
            SetupDiGetClassDevsW(None, PCWSTR::null(), None, DIGCF_ALLCLASSES | DIGCF_PRESENT)
        }
        .map_err(|e| Error::ProbeFailed(format!("SetupDiGetClassDevsW: {e}")))?;
        let dev_info = scopeguard::guard(dev_info, |h| {
            // SAFETY: `h` came from SetupDiGetClassDevsW and is released once.
            unsafe {
                let _ = SetupDiDestroyDeviceInfoList(h);
            }
        });

        let mut data = SP_DEVINFO_DATA {
            cbSize: std::mem::size_of::<SP_DEVINFO_DATA>() as u32,
            ..Default::default()
        };
        let mut found = Vec::new();
        let mut index = 0u32;
        loop {
            // SAFETY: `data.cbSize` is initialized as the API requires.
            if unsafe { SetupDiEnumDeviceInfo(*dev_info, index, &mut data) }.is_err() {
                let err = std::io::Error::last_os_error();
                if err.raw_os_error() == Some(ERROR_NO_MORE_ITEMS.0 as i32) {
                    break;
                }
                index += 1;
                continue;
            }
            index += 1;

            let Some(hardware_id) = registry_string(*dev_info, &data, SPDRP_HARDWAREID) else {
                continue;
            };
            if hardware_id
                .to_uppercase()
                .contains(INTEL_IAA_HARDWARE_ID_PREFIX)
            {
                let description = registry_string(*dev_info, &data, SPDRP_DEVICEDESC)
                    .unwrap_or_else(|| "Intel IAA".to_string());
                found.push((hardware_id, description));
            }
        }
        Ok(found)
    }

    pub fn discover_devices() -> Result<Vec<Device>> {
        for (hardware_id, description) in enumerate()? {
            log::info!(
                "Found Intel IAA function: {} ({}); no userspace portal on Windows",
                description,
                hardware_id
            );
        }
        Ok(Vec::new())
    }

    pub fn is_iaa_available() -> bool {
        enumerate().map(|found| !found.is_empty()).unwrap_or(false)
    }

    pub fn is_iaa_configured() -> bool {
        false
    }
}

// ============================================================================
// Unsupported Platform Stub
// ============================================================================

#[cfg(not(any(target_os = "linux", target_os = "windows")))]
mod stub_impl {
    use super::*;

    pub fn discover_devices() -> Result<Vec<Device>> {
        log::debug!("No IAA userspace interface on this platform");
        Ok(Vec::new())
    }

    pub fn is_iaa_available() -> bool {
        false
    }

    pub fn is_iaa_configured() -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
use linux_impl as platform;
#[cfg(not(any(target_os = "linux", target_os = "windows")))]
use stub_impl as platform;
#[cfg(target_os = "windows")]
use windows_impl as platform;

// ============================================================================
// Public API
// ============================================================================

/// Discover all usable IAA devices on the system.
///
/// # Platform Support
///
/// - **Linux**: Scans `/sys/bus/dsa/devices/` and maps a portal for each
///   device with an enabled user work queue
/// - **Windows**: Logs IAA PCI functions; returns no devices
/// - **Others**: Returns no devices
///
/// # Errors
///
/// `ProbeFailed` if the discovery interface exists but cannot be read.
///
/// # Example
///
/// ```rust,no_run
/// use iaa_rust::discover_devices;
///
/// for device in discover_devices()? {
///     println!("{} on node {:?}", device.name, device.numa_node);
/// }
/// # Ok::<(), iaa_rust::Error>(())
/// ```
pub fn discover_devices() -> Result<Vec<Device>> {
    platform::discover_devices()
}

/// Check if IAA hardware is present on this system.
///
/// This performs a quick check without opening any work queue.
pub fn is_iaa_available() -> bool {
    platform::is_iaa_available()
}

/// Check if IAA work queues are configured for userspace.
pub fn is_iaa_configured() -> bool {
    platform::is_iaa_configured()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_for_op() {
        assert_eq!(Capabilities::for_op(OpKind::Crc64), Capabilities::CRC64);
        assert!(!Capabilities::offloadable().contains(Capabilities::COMPRESS));
        assert!(Capabilities::offloadable().contains(Capabilities::DECOMPRESS | Capabilities::SELECT));
    }

    #[test]
    fn test_op_cap_parsing() {
        // Opcodes 0x42-0x44 and 0x50, 0x52, 0x53 live in bits 64..96.
        let text = "00000000,00000000,00000000,00000000,00000000,000d001c,00000000,00000000";
        let caps = Capabilities::from_op_cap(text).unwrap();
        assert_eq!(caps, Capabilities::all());

        let crc_only = "0000000000000010 0000000000000000";
        assert_eq!(Capabilities::from_op_cap(crc_only), Some(Capabilities::CRC64));

        assert_eq!(Capabilities::from_op_cap(""), Some(Capabilities::empty()));
        assert_eq!(Capabilities::from_op_cap("zz,00"), None);
    }

    #[test]
    fn test_emulated_device() {
        let device = Device::emulated("emu0", Some(1));
        assert_eq!(device.numa_node, Some(1));
        assert!(device.supports(Capabilities::EXTRACT | Capabilities::CRC64));
        assert!(!device.supports(Capabilities::COMPRESS));
        assert_eq!(device.portal().name(), "emu0/wq0.0");
        assert_eq!(device.wq_count(), 0);
    }

    #[test]
    fn test_discovery_does_not_panic() {
        let _ = is_iaa_available();
        let _ = is_iaa_configured();
        if let Ok(devices) = discover_devices() {
            println!("Found {} IAA devices", devices.len());
        }
    }

    #[cfg(target_os = "linux")]
    mod sysfs {
        use super::*;
        use crate::device::linux_impl::submission_queue;
        use crate::wq::WorkQueueType;
        use std::fs;
        use std::path::Path;
        use tempfile::TempDir;

        struct TempTree(TempDir);

        impl TempTree {
            fn new() -> Self {
                Self(TempDir::new().expect("Failed to create temp directory"))
            }

            fn file(&self, rel: &str, contents: &str) {
                let path = self.0.path().join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }

            fn path(&self) -> &Path {
                self.0.path()
            }
        }

        fn sample_tree() -> TempTree {
            let tree = TempTree::new();
            tree.file("iax1/numa_node", "0\n");
            tree.file(
                "iax1/op_cap",
                "00000000,00000000,00000000,00000000,00000000,000d001c,00000000,00000000\n",
            );
            tree.file("wq1.0/state", "enabled\n");
            tree.file("wq1.0/mode", "shared\n");
            tree.file("wq1.0/type", "user\n");
            tree.file("wq1.0/size", "128\n");
            tree.file("wq1.0/threshold", "64\n");
            tree.file("iax3/numa_node", "-1\n");
            tree.file("wq3.0/state", "disabled\n");
            tree.file("wq3.0/mode", "dedicated\n");
            tree.file("dsa0/numa_node", "0\n");
            tree.file("wq0.0/state", "enabled\n");
            tree
        }

        #[test]
        fn test_read_topology() {
            let tree = sample_tree();
            let devices = read_topology(tree.path()).unwrap();
            assert_eq!(devices.len(), 2);

            let iax1 = &devices[0];
            assert_eq!(iax1.name, "iax1");
            assert_eq!(iax1.numa_node, Some(0));
            assert_eq!(iax1.capabilities, Capabilities::all());
            assert_eq!(iax1.work_queues.len(), 1);
            let wq = &iax1.work_queues[0];
            assert_eq!(wq.name, "wq1.0");
            assert_eq!(wq.wq_type, WorkQueueType::Shared);
            assert_eq!((wq.size, wq.threshold), (128, 64));
            assert!(wq.is_usable());

            let iax3 = &devices[1];
            assert_eq!(iax3.numa_node, None);
            assert_eq!(iax3.work_queues[0].wq_type, WorkQueueType::Dedicated);
            assert!(!iax3.work_queues[0].is_usable());
        }

        #[test]
        fn test_missing_sysfs_is_zero_devices() {
            let tree = TempTree::new();
            let devices = read_topology(&tree.path().join("absent")).unwrap();
            assert!(devices.is_empty());
        }

        #[test]
        fn test_unopenable_queues_are_skipped() {
            let tree = sample_tree();
            let prober = SysfsProber::new(tree.path(), tree.path().join("no-dev"));
            assert!(prober.probe().unwrap().is_empty());
        }

        fn queue(name: &str, wq_type: WorkQueueType, state: &str) -> WorkQueueInfo {
            WorkQueueInfo {
                name: name.to_string(),
                state: state.to_string(),
                wq_type,
                size: 16,
                threshold: 0,
                is_user: true,
            }
        }

        #[test]
        fn test_dedicated_queues_are_not_used() {
            let queues = [
                queue("wq1.0", WorkQueueType::Dedicated, "enabled"),
                queue("wq1.1", WorkQueueType::Shared, "disabled"),
                queue("wq1.2", WorkQueueType::Shared, "enabled"),
            ];
            assert_eq!(submission_queue("iax1", &queues).unwrap().name, "wq1.2");
            assert!(submission_queue("iax1", &queues[..2]).is_none());
        }

        #[test]
        fn test_device_with_only_dedicated_queues_is_skipped() {
            let tree = TempTree::new();
            tree.file("iax2/numa_node", "0\n");
            tree.file("wq2.0/state", "enabled\n");
            tree.file("wq2.0/mode", "dedicated\n");
            tree.file("wq2.0/type", "user\n");
            tree.file("wq2.0/size", "32\n");
            let prober = SysfsProber::new(tree.path(), tree.path());
            assert!(prober.probe().unwrap().is_empty());
        }
    }
}
