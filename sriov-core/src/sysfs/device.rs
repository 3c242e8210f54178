//! PCI function handle backed by sysfs.

use crate::address::validate_pci_address;
use crate::error::{BindStage, Result, SriovError};
use crate::function::{BindablePciFunction, PciFunction};
use crate::observability::metrics;
use crate::paths::{self, HostPaths};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A single PCI function, physical or virtual, addressed under a [`HostPaths`].
///
/// Holds no device state of its own: every query goes to the host.
#[derive(Debug, Clone)]
pub struct SysfsFunction {
    address: String,
    paths: Arc<HostPaths>,
}

impl SysfsFunction {
    /// Open a function that must already exist under the devices root.
    pub fn open(address: &str, paths: Arc<HostPaths>) -> Result<Self> {
        validate_pci_address(address)?;

        let function = Self::new(address.to_string(), paths);
        if !function.device_dir().exists() {
            return Err(SriovError::NotFound {
                address: address.to_string(),
                resource: "PCI device",
            });
        }

        Ok(function)
    }

    /// Handle for an address already known to resolve (e.g., a VF link target).
    pub(crate) fn new(address: String, paths: Arc<HostPaths>) -> Self {
        Self { address, paths }
    }

    /// Sysfs directory of this function.
    pub fn device_dir(&self) -> PathBuf {
        self.paths.device_dir(&self.address)
    }

    pub(crate) fn host_paths(&self) -> &Arc<HostPaths> {
        &self.paths
    }

    pub(crate) fn device_path(&self, entry: &str) -> PathBuf {
        self.device_dir().join(entry)
    }

    pub(crate) fn io_error(&self, path: &Path, source: std::io::Error) -> SriovError {
        SriovError::Io { address: self.address.clone(), path: path.to_path_buf(), source }
    }

    /// Read a trimmed value from a sysfs file.
    pub(crate) fn read_value(&self, entry: &str) -> Result<String> {
        let path = self.device_path(entry);
        fs::read_to_string(&path)
            .map(|s| s.trim().to_string())
            .map_err(|e| self.io_error(&path, e))
    }

    /// Read an unsigned integer from a sysfs file.
    pub(crate) fn read_u32(&self, entry: &str) -> Result<u32> {
        let content = self.read_value(entry)?;
        content.parse().map_err(|_| SriovError::Parse {
            address: self.address.clone(),
            path: self.device_path(entry),
            content,
        })
    }

    /// Last path component of a symlink target.
    fn read_link_name(&self, link: &Path) -> Result<String> {
        let target = fs::read_link(link).map_err(|e| SriovError::Resolution {
            address: self.address.clone(),
            path: link.to_path_buf(),
            reason: e.to_string(),
        })?;

        target
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| SriovError::Resolution {
                address: self.address.clone(),
                path: link.to_path_buf(),
                reason: format!("link target {:?} has no usable name", target),
            })
    }

    fn write_bind_file(
        &self,
        path: &Path,
        content: &str,
        driver: &str,
        stage: BindStage,
        previous: Option<&str>,
    ) -> Result<()> {
        debug!(address = %self.address, path = %path.display(), %stage, "Writing driver file");

        fs::write(path, content).map_err(|e| SriovError::BindFailure {
            address: self.address.clone(),
            driver: driver.to_string(),
            stage,
            previous: previous.map(str::to_string),
            source: e,
        })
    }

    fn clear_driver_override(&self, path: &Path) {
        if let Err(e) = fs::write(path, "\n") {
            warn!(address = %self.address, error = %e, "Failed to clear driver_override");
        }
    }
}

/// Driver names become a single directory under the drivers root.
fn is_valid_driver_name(driver: &str) -> bool {
    !driver.is_empty() && driver != "." && driver != ".." && !driver.contains(['/', '\0'])
}

impl PciFunction for SysfsFunction {
    fn pci_address(&self) -> &str {
        &self.address
    }

    fn net_interface_name(&self) -> Result<String> {
        let net_dir = self.device_path(paths::NET_DIR);
        let not_found =
            || SriovError::NotFound { address: self.address.clone(), resource: "network interface" };

        let entries = match fs::read_dir(&net_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(self.io_error(&net_dir, e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io_error(&net_dir, e))?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        let name = names.into_iter().next().ok_or_else(not_found)?;
        debug!(address = %self.address, interface = %name, "Read network interface");
        Ok(name)
    }

    fn iommu_group_id(&self) -> Result<u32> {
        let link = self.device_path(paths::IOMMU_GROUP);
        let name = self.read_link_name(&link)?;

        name.parse().map_err(|_| SriovError::Resolution {
            address: self.address.clone(),
            path: link,
            reason: format!("IOMMU group {:?} is not a number", name),
        })
    }

    fn bound_driver(&self) -> Result<Option<String>> {
        let link = self.device_path(paths::DRIVER_LINK);

        match fs::symlink_metadata(&link) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(&link, e)),
        }

        self.read_link_name(&link).map(Some)
    }
}

impl BindablePciFunction for SysfsFunction {
    fn bind_driver(&self, driver: &str) -> Result<()> {
        if !is_valid_driver_name(driver) {
            return Err(SriovError::BindFailure {
                address: self.address.clone(),
                driver: driver.to_string(),
                stage: BindStage::Bind,
                previous: None,
                source: std::io::Error::new(ErrorKind::InvalidInput, "invalid driver name"),
            });
        }

        let current = self.bound_driver()?;
        if current.as_deref() == Some(driver) {
            debug!(address = %self.address, driver = %driver, "Device already bound");
            return Ok(());
        }

        // Unbind from current driver
        if let Some(current) = &current {
            let unbind_path = self.paths.driver_dir(current).join(paths::UNBIND);
            self.write_bind_file(&unbind_path, &self.address, driver, BindStage::Unbind, None)?;
            debug!(address = %self.address, driver = %current, "Unbound from driver");
        }
        let unbound = current.as_deref();

        // Older kernels lack driver_override; bind then relies on device IDs alone.
        let override_path = self.device_path(paths::DRIVER_OVERRIDE);
        let has_override = override_path.exists();
        if has_override {
            self.write_bind_file(&override_path, driver, driver, BindStage::Override, unbound)?;
        }

        let bind_path = self.paths.driver_dir(driver).join(paths::BIND);
        let bound = self.write_bind_file(&bind_path, &self.address, driver, BindStage::Bind, unbound);

        if let Err(e) = bound {
            // The kernel may have probed the device on its own after the override.
            if self.bound_driver().ok().flatten().as_deref() == Some(driver) {
                debug!(address = %self.address, driver = %driver, "Device auto-bound");
            } else {
                if has_override {
                    self.clear_driver_override(&override_path);
                }
                return Err(e);
            }
        }

        if has_override {
            self.clear_driver_override(&override_path);
        }

        metrics::record_driver_bind(driver);
        info!(
            address = %self.address,
            previous = ?current,
            driver = %driver,
            "Device bound to driver"
        );

        Ok(())
    }
}
