//! SR-IOV core library.
//!
//! Discovers SR-IOV physical functions, provisions virtual functions from
//! them and rebinds PCI drivers, all through the host's sysfs PCI tree.
//!
//! ```rust,ignore
//! use sriov_core::{ConfigurableFactory, SysfsFactory};
//!
//! let factory = SysfsFactory::default();
//! let pf = factory.new_configurable_physical_function("0000:01:00.0")?;
//!
//! let capacity = pf.virtual_functions_capacity()?;
//! pf.create_virtual_functions(capacity.min(4))?;
//!
//! for vf in pf.virtual_functions()? {
//!     vf.bind_driver("vfio-pci")?;
//! }
//! ```
//!
//! Nothing here serializes concurrent provisioning of the same physical
//! function; callers allocating VFs must hold their own per-address lock.

pub mod address;
pub mod config;
pub mod error;
pub mod function;
pub mod observability;
pub mod paths;
pub mod stub;
pub mod sysfs;

// Re-export commonly used items
pub use error::{BindStage, Result, SriovError};
pub use function::{
    BindablePciFunction, ConfigurableFactory, ConfigurablePhysicalFunction, Factory, PciFunction,
    PhysicalFunction, VirtualFunctions,
};
pub use observability::init as init_observability;
pub use paths::HostPaths;
pub use sysfs::{SysfsFactory, SysfsFunction, SysfsPhysicalFunction};
