//! Factory for sysfs-backed physical functions.

use crate::error::Result;
use crate::function::{ConfigurableFactory, ConfigurablePhysicalFunction, Factory, PhysicalFunction};
use crate::paths::HostPaths;
use crate::sysfs::{SysfsFunction, SysfsPhysicalFunction};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Builds PCI function handles rooted at one [`HostPaths`].
#[derive(Debug, Clone)]
pub struct SysfsFactory {
    paths: Arc<HostPaths>,
}

impl Default for SysfsFactory {
    /// Factory over the process-wide host paths.
    fn default() -> Self {
        Self::new(HostPaths::system().clone())
    }
}

impl SysfsFactory {
    pub fn new(paths: HostPaths) -> Self {
        Self { paths: Arc::new(paths) }
    }

    pub fn host_paths(&self) -> &HostPaths {
        &self.paths
    }

    /// Plain device handle, for functions that are not SR-IOV capable.
    #[instrument(skip(self))]
    pub fn new_function(&self, address: &str) -> Result<SysfsFunction> {
        SysfsFunction::open(address, self.paths.clone())
    }

    #[instrument(skip(self))]
    fn open_physical(&self, address: &str) -> Result<SysfsPhysicalFunction> {
        let pf = SysfsPhysicalFunction::open(address, self.paths.clone())?;
        debug!(
            address = %address,
            path = %pf.device().device_dir().display(),
            "Opened physical function"
        );
        Ok(pf)
    }
}

impl Factory for SysfsFactory {
    fn new_physical_function(&self, address: &str) -> Result<Box<dyn PhysicalFunction>> {
        Ok(Box::new(self.open_physical(address)?))
    }
}

impl ConfigurableFactory for SysfsFactory {
    fn new_configurable_physical_function(
        &self,
        address: &str,
    ) -> Result<Box<dyn ConfigurablePhysicalFunction>> {
        Ok(Box::new(self.open_physical(address)?))
    }
}
