//! SR-IOV physical function backed by sysfs.
//!
//! Capacity and configured counts come from `sriov_totalvfs` and
//! `sriov_numvfs`; each provisioned VF appears as a `virtfnN` symlink to its
//! own device directory.

use crate::error::{Result, SriovError};
use crate::function::{
    BindablePciFunction, ConfigurablePhysicalFunction, PciFunction, PhysicalFunction,
    VirtualFunctions,
};
use crate::observability::metrics;
use crate::paths::{self, HostPaths};
use crate::sysfs::SysfsFunction;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Physical function: a [`SysfsFunction`] plus VF capacity, enumeration and
/// provisioning.
#[derive(Debug, Clone)]
pub struct SysfsPhysicalFunction {
    device: SysfsFunction,
}

impl SysfsPhysicalFunction {
    /// Open a physical function that must already exist under the devices root.
    pub fn open(address: &str, paths: Arc<HostPaths>) -> Result<Self> {
        Ok(Self { device: SysfsFunction::open(address, paths)? })
    }

    /// Underlying device handle.
    pub fn device(&self) -> &SysfsFunction {
        &self.device
    }

    /// Resolve one `virtfnN` entry to a VF handle. Only symlinks qualify.
    fn resolve_virtfn(&self, link: &Path) -> std::result::Result<SysfsFunction, String> {
        let meta = fs::symlink_metadata(link).map_err(|e| e.to_string())?;
        if !meta.file_type().is_symlink() {
            return Err("entry is not a symlink".to_string());
        }

        let target = fs::canonicalize(link).map_err(|e| e.to_string())?;
        let address = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| format!("target {:?} has no usable name", target))?;

        Ok(SysfsFunction::new(address.to_string(), self.device.host_paths().clone()))
    }

    fn write_configured(&self, count: u32) -> Result<()> {
        let path = self.device.device_path(paths::CONFIGURED_VFS);
        fs::write(&path, count.to_string()).map_err(|e| self.device.io_error(&path, e))
    }
}

impl PciFunction for SysfsPhysicalFunction {
    fn pci_address(&self) -> &str {
        self.device.pci_address()
    }

    fn net_interface_name(&self) -> Result<String> {
        self.device.net_interface_name()
    }

    fn iommu_group_id(&self) -> Result<u32> {
        self.device.iommu_group_id()
    }

    fn bound_driver(&self) -> Result<Option<String>> {
        self.device.bound_driver()
    }
}

impl BindablePciFunction for SysfsPhysicalFunction {
    fn bind_driver(&self, driver: &str) -> Result<()> {
        self.device.bind_driver(driver)
    }
}

impl PhysicalFunction for SysfsPhysicalFunction {
    fn virtual_functions_capacity(&self) -> Result<u32> {
        self.device.read_u32(paths::TOTAL_VFS)
    }

    fn configured_virtual_functions(&self) -> Result<u32> {
        self.device.read_u32(paths::CONFIGURED_VFS)
    }

    fn virtual_functions(&self) -> Result<VirtualFunctions> {
        let dir = self.device.device_dir();
        let entries = fs::read_dir(&dir).map_err(|e| self.device.io_error(&dir, e))?;

        let mut resolved: Vec<(u32, SysfsFunction)> = Vec::new();
        let mut skipped = 0;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(address = %self.pci_address(), error = %e, "Unreadable device entry");
                    metrics::record_vf_entry_skipped();
                    skipped += 1;
                    continue;
                }
            };

            let name = entry.file_name();
            let index = match name
                .to_str()
                .and_then(|n| n.strip_prefix(paths::VIRTFN_PREFIX))
                .and_then(|i| i.parse::<u32>().ok())
            {
                Some(index) => index,
                None => continue,
            };

            match self.resolve_virtfn(&entry.path()) {
                Ok(vf) => resolved.push((index, vf)),
                Err(reason) => {
                    warn!(
                        address = %self.pci_address(),
                        entry = ?name,
                        reason = %reason,
                        "Skipping unresolvable virtual function"
                    );
                    metrics::record_vf_entry_skipped();
                    skipped += 1;
                }
            }
        }

        resolved.sort_by_key(|(index, _)| *index);

        debug!(
            address = %self.pci_address(),
            resolved = resolved.len(),
            skipped,
            "Enumerated virtual functions"
        );

        Ok(VirtualFunctions {
            functions: resolved
                .into_iter()
                .map(|(_, vf)| Box::new(vf) as Box<dyn BindablePciFunction>)
                .collect(),
            skipped,
        })
    }
}

impl ConfigurablePhysicalFunction for SysfsPhysicalFunction {
    fn create_virtual_functions(&self, count: u32) -> Result<()> {
        let address = self.pci_address();
        let configured = self.configured_virtual_functions()?;

        if configured == count {
            debug!(address = %address, count, "Virtual functions already provisioned");
            return Ok(());
        }

        // The kernel only accepts a new non-zero count after a reset to 0.
        if configured != 0 && count != 0 {
            return Err(SriovError::AlreadyProvisioned {
                address: address.to_string(),
                configured,
                requested: count,
            });
        }

        self.write_configured(count)?;

        metrics::record_vfs_provisioned(count);
        info!(address = %address, previous = configured, count, "Provisioned virtual functions");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    const PF: &str = "0000:01:00.0";

    fn setup(total: &str, configured: &str) -> (TempDir, SysfsPhysicalFunction) {
        let dir = TempDir::new().unwrap();
        let paths = Arc::new(HostPaths::with_root(dir.path()));
        let pf_dir = paths.device_dir(PF);
        fs::create_dir_all(&pf_dir).unwrap();
        fs::write(pf_dir.join("sriov_totalvfs"), total).unwrap();
        fs::write(pf_dir.join("sriov_numvfs"), configured).unwrap();
        let pf = SysfsPhysicalFunction::open(PF, paths).unwrap();
        (dir, pf)
    }

    fn add_vf(pf: &SysfsPhysicalFunction, index: u32, address: &str) {
        let paths = pf.device().host_paths();
        fs::create_dir_all(paths.device_dir(address)).unwrap();
        symlink(
            paths.device_dir(address),
            pf.device().device_dir().join(format!("virtfn{}", index)),
        )
        .unwrap();
    }

    #[test]
    fn test_capacity() {
        let (_dir, pf) = setup("8\n", "0\n");
        assert_eq!(pf.virtual_functions_capacity().unwrap(), 8);
        assert_eq!(pf.configured_virtual_functions().unwrap(), 0);
    }

    #[test]
    fn test_capacity_not_numeric() {
        let (_dir, pf) = setup("eight", "0");
        match pf.virtual_functions_capacity() {
            Err(SriovError::Parse { address, content, .. }) => {
                assert_eq!(address, PF);
                assert_eq!(content, "eight");
            }
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_capacity_missing_file() {
        let (_dir, pf) = setup("8", "0");
        fs::remove_file(pf.device().device_dir().join("sriov_totalvfs")).unwrap();
        assert!(matches!(pf.virtual_functions_capacity(), Err(SriovError::Io { .. })));
    }

    #[test]
    fn test_create_virtual_functions() {
        let (_dir, pf) = setup("8", "0");
        pf.create_virtual_functions(4).unwrap();

        let written = fs::read_to_string(pf.device().device_dir().join("sriov_numvfs")).unwrap();
        assert_eq!(written, "4");
        assert_eq!(pf.configured_virtual_functions().unwrap(), 4);
    }

    #[test]
    fn test_create_missing_configured_file() {
        let (_dir, pf) = setup("8", "0");
        let path = pf.device().device_dir().join("sriov_numvfs");
        fs::remove_file(&path).unwrap();

        match pf.create_virtual_functions(4) {
            Err(SriovError::Io { address, path: failed, .. }) => {
                assert_eq!(address, PF);
                assert_eq!(failed, path);
            }
            other => panic!("Expected Io error, got {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_write_configured_failure_carries_address() {
        let (_dir, pf) = setup("8", "0");
        // Device directory gone between the count check and the write.
        fs::remove_dir_all(pf.device().device_dir()).unwrap();

        match pf.write_configured(4) {
            Err(SriovError::Io { address, path, .. }) => {
                assert_eq!(address, PF);
                assert!(path.ends_with("sriov_numvfs"));
            }
            other => panic!("Expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_same_count_is_noop() {
        let (_dir, pf) = setup("8", "4\n");
        pf.create_virtual_functions(4).unwrap();

        let content = fs::read_to_string(pf.device().device_dir().join("sriov_numvfs")).unwrap();
        assert_eq!(content, "4\n");
    }

    #[test]
    fn test_create_rejects_reprovisioning() {
        let (_dir, pf) = setup("8", "4");
        match pf.create_virtual_functions(2) {
            Err(SriovError::AlreadyProvisioned { configured, requested, .. }) => {
                assert_eq!(configured, 4);
                assert_eq!(requested, 2);
            }
            other => panic!("Expected AlreadyProvisioned, got {:?}", other),
        }

        // Writing 0 is the reset path and always goes through.
        pf.create_virtual_functions(0).unwrap();
        pf.create_virtual_functions(2).unwrap();
        assert_eq!(pf.configured_virtual_functions().unwrap(), 2);
    }

    #[test]
    fn test_enumerate_orders_by_index() {
        let (_dir, pf) = setup("16", "0");
        for i in 0..12 {
            add_vf(&pf, i, &format!("0000:01:{:02x}.0", 0x10 + i));
        }

        let vfs = pf.virtual_functions().unwrap();
        assert_eq!(vfs.len(), 12);
        assert_eq!(vfs.skipped, 0);
        assert_eq!(vfs.addresses()[0], "0000:01:10.0");
        assert_eq!(vfs.addresses()[10], "0000:01:1a.0");
        assert_eq!(vfs.addresses()[11], "0000:01:1b.0");
    }

    #[test]
    fn test_enumerate_skips_dangling_link() {
        let (dir, pf) = setup("8", "2");
        add_vf(&pf, 0, "0000:01:10.0");
        symlink(dir.path().join("missing"), pf.device().device_dir().join("virtfn1")).unwrap();

        let vfs = pf.virtual_functions().unwrap();
        assert_eq!(vfs.addresses(), vec!["0000:01:10.0"]);
        assert_eq!(vfs.skipped, 1);
    }

    #[test]
    fn test_enumerate_skips_non_symlink_entries() {
        let (_dir, pf) = setup("8", "2");
        let pf_dir = pf.device().device_dir();
        fs::write(pf_dir.join("virtfn0"), "x").unwrap();
        fs::create_dir(pf_dir.join("virtfn1")).unwrap();
        add_vf(&pf, 2, "0000:01:10.4");

        let vfs = pf.virtual_functions().unwrap();
        assert_eq!(vfs.addresses(), vec!["0000:01:10.4"]);
        assert_eq!(vfs.skipped, 2);
    }

    #[test]
    fn test_enumerate_ignores_unrelated_entries() {
        let (_dir, pf) = setup("8", "0");
        fs::write(pf.device().device_dir().join("virtfn_note"), "x").unwrap();

        let vfs = pf.virtual_functions().unwrap();
        assert!(vfs.is_empty());
        assert_eq!(vfs.skipped, 0);
    }

    #[test]
    fn test_enumerate_missing_directory_fails() {
        let (_dir, pf) = setup("8", "0");
        fs::remove_dir_all(pf.device().device_dir()).unwrap();
        assert!(matches!(pf.virtual_functions(), Err(SriovError::Io { .. })));
    }
}
