//! Host-backed PCI functions.
//!
//! Everything in here reads and writes the sysfs PCI tree:
//!
//! ```text
//! <devices>/<address>/sriov_totalvfs      VF capacity
//! <devices>/<address>/sriov_numvfs        configured VF count
//! <devices>/<address>/virtfnN  ->         one link per provisioned VF
//! <devices>/<address>/net/<ifname>        bound network interface
//! <devices>/<address>/iommu_group  ->     .../iommu_groups/<id>
//! <devices>/<address>/driver  ->          <drivers>/<name>
//! <drivers>/<name>/{bind,unbind}          driver binding
//! ```

mod device;
mod factory;
mod physical;

pub use device::SysfsFunction;
pub use factory::SysfsFactory;
pub use physical::SysfsPhysicalFunction;
