//! Centralized host path configuration.
//!
//! Every sysfs access goes through a [`HostPaths`] so the whole device tree
//! can be relocated under a scratch directory for tests.

use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};

/// Default sysfs directory holding one entry per PCI function.
pub const PCI_DEVICES_PATH: &str = "/sys/bus/pci/devices";

/// Default sysfs directory holding one entry per PCI driver.
pub const PCI_DRIVERS_PATH: &str = "/sys/bus/pci/drivers";

/// Environment variable overriding [`PCI_DEVICES_PATH`].
pub const DEVICES_PATH_ENV: &str = "SRIOV_PCI_DEVICES_PATH";

/// Environment variable overriding [`PCI_DRIVERS_PATH`].
pub const DRIVERS_PATH_ENV: &str = "SRIOV_PCI_DRIVERS_PATH";

// Per-device entries
pub(crate) const TOTAL_VFS: &str = "sriov_totalvfs";
pub(crate) const CONFIGURED_VFS: &str = "sriov_numvfs";
pub(crate) const VIRTFN_PREFIX: &str = "virtfn";
pub(crate) const NET_DIR: &str = "net";
pub(crate) const IOMMU_GROUP: &str = "iommu_group";
pub(crate) const DRIVER_LINK: &str = "driver";
pub(crate) const DRIVER_OVERRIDE: &str = "driver_override";

// Per-driver entries
pub(crate) const UNBIND: &str = "unbind";
pub(crate) const BIND: &str = "bind";

static SYSTEM: Lazy<HostPaths> = Lazy::new(HostPaths::from_env);

/// Host path root: where device and driver metadata live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    devices_root: PathBuf,
    drivers_root: PathBuf,
}

impl Default for HostPaths {
    fn default() -> Self {
        Self {
            devices_root: PathBuf::from(PCI_DEVICES_PATH),
            drivers_root: PathBuf::from(PCI_DRIVERS_PATH),
        }
    }
}

impl HostPaths {
    /// Explicit device and driver roots.
    pub fn new(devices_root: impl Into<PathBuf>, drivers_root: impl Into<PathBuf>) -> Self {
        Self { devices_root: devices_root.into(), drivers_root: drivers_root.into() }
    }

    /// Lay out `root/devices` and `root/drivers`, mirroring `/sys/bus/pci`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("devices"), root.join("drivers"))
    }

    /// Resolve from the environment.
    ///
    /// Resolution order per root:
    /// 1. `SRIOV_PCI_DEVICES_PATH` / `SRIOV_PCI_DRIVERS_PATH`
    /// 2. `/sys/bus/pci/devices` / `/sys/bus/pci/drivers`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            devices_root: std::env::var(DEVICES_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.devices_root),
            drivers_root: std::env::var(DRIVERS_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.drivers_root),
        }
    }

    /// Process-wide paths, resolved from the environment on first use.
    pub fn system() -> &'static HostPaths {
        &SYSTEM
    }

    pub fn devices_root(&self) -> &Path {
        &self.devices_root
    }

    pub fn drivers_root(&self) -> &Path {
        &self.drivers_root
    }

    /// Directory of a single PCI function.
    pub fn device_dir(&self, address: &str) -> PathBuf {
        self.devices_root.join(address)
    }

    /// Directory of a single PCI driver.
    pub fn driver_dir(&self, driver: &str) -> PathBuf {
        self.drivers_root.join(driver)
    }
}
