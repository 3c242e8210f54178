//! Capability traits for PCI functions.
//!
//! Capabilities are layered so callers can depend on exactly what they need:
//!
//! ```text
//! PciFunction                    address, net interface, IOMMU group, driver
//! └── BindablePciFunction        + driver rebind
//!     └── PhysicalFunction       + VF capacity and enumeration
//!         └── ConfigurablePhysicalFunction
//!                                + VF provisioning
//! ```
//!
//! The same split applies to construction: a [`Factory`] only hands out
//! discovery-capable physical functions, a [`ConfigurableFactory`] can also
//! hand out ones able to provision hardware.

use crate::error::Result;
use std::fmt;

/// Read-only queries on a single PCI function.
pub trait PciFunction: fmt::Debug + Send + Sync {
    /// PCI address (e.g., "0000:01:00.0").
    fn pci_address(&self) -> &str;

    /// Name of the network interface backed by this function.
    ///
    /// Fails with `NotFound` if no interface is attached (e.g., the device
    /// is bound to a pass-through driver).
    fn net_interface_name(&self) -> Result<String>;

    /// Numeric IOMMU group the function belongs to.
    fn iommu_group_id(&self) -> Result<u32>;

    /// Currently bound kernel driver, `None` when unbound.
    fn bound_driver(&self) -> Result<Option<String>>;
}

/// A PCI function whose kernel driver can be changed.
pub trait BindablePciFunction: PciFunction {
    /// Rebind the function to `driver`, unbinding the current one first.
    ///
    /// No retry is attempted. A failure after the unbind step leaves the
    /// function without any driver; the error's stage says where it stopped.
    fn bind_driver(&self, driver: &str) -> Result<()>;
}

/// A physical function able to report its virtual functions.
pub trait PhysicalFunction: BindablePciFunction {
    /// Maximum number of VFs the hardware/driver can provision.
    fn virtual_functions_capacity(&self) -> Result<u32>;

    /// Number of VFs currently provisioned.
    fn configured_virtual_functions(&self) -> Result<u32>;

    /// Enumerate provisioned VFs, resolved fresh on every call.
    ///
    /// Entries that cannot be resolved are skipped and counted rather than
    /// failing the whole enumeration.
    fn virtual_functions(&self) -> Result<VirtualFunctions>;
}

/// A physical function that can also provision virtual functions.
pub trait ConfigurablePhysicalFunction: PhysicalFunction {
    /// Provision `count` virtual functions.
    ///
    /// Not safe to race: at most one provisioning call per physical function
    /// should be in flight, which the caller must guarantee.
    fn create_virtual_functions(&self, count: u32) -> Result<()>;
}

/// Builds discovery-only physical functions from a PCI address.
pub trait Factory: Send + Sync {
    fn new_physical_function(&self, address: &str) -> Result<Box<dyn PhysicalFunction>>;
}

/// Builds physical functions that can provision hardware.
pub trait ConfigurableFactory: Factory {
    fn new_configurable_physical_function(
        &self,
        address: &str,
    ) -> Result<Box<dyn ConfigurablePhysicalFunction>>;
}

/// Result of a best-effort VF enumeration.
#[derive(Debug, Default)]
pub struct VirtualFunctions {
    /// Resolved VFs, ordered by VF index.
    pub functions: Vec<Box<dyn BindablePciFunction>>,
    /// Number of `virtfn*` entries that could not be resolved.
    pub skipped: usize,
}

impl VirtualFunctions {
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// PCI addresses of the resolved VFs, in enumeration order.
    pub fn addresses(&self) -> Vec<&str> {
        self.functions.iter().map(|f| f.pci_address()).collect()
    }
}

impl IntoIterator for VirtualFunctions {
    type Item = Box<dyn BindablePciFunction>;
    type IntoIter = std::vec::IntoIter<Box<dyn BindablePciFunction>>;

    fn into_iter(self) -> Self::IntoIter {
        self.functions.into_iter()
    }
}
