//! In-memory PCI functions for tests that run without hardware.
//!
//! A [`StubFactory`] is keyed by PCI address and returns handles backed by
//! pre-populated [`StubDevice`] records. Rebinding and provisioning mutate
//! the shared records, so a later query through any handle sees the change.

use crate::address::validate_pci_address;
use crate::error::{Result, SriovError};
use crate::function::{
    BindablePciFunction, ConfigurableFactory, ConfigurablePhysicalFunction, Factory, PciFunction,
    PhysicalFunction, VirtualFunctions,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Pre-populated state of one stub device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StubDevice {
    pub net_interface: Option<String>,
    pub iommu_group: Option<u32>,
    pub driver: Option<String>,
    pub capacity: u32,
    pub configured: u32,
    /// Addresses reported as VFs; ones with no registered device are skipped.
    pub virtual_functions: Vec<String>,
}

type Devices = Arc<Mutex<HashMap<String, StubDevice>>>;

/// Factory over an in-memory device table.
#[derive(Debug, Clone, Default)]
pub struct StubFactory {
    devices: Devices,
}

impl StubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a device.
    pub fn with_device(self, address: &str, device: StubDevice) -> Self {
        lock(&self.devices).insert(address.to_string(), device);
        self
    }

    /// Snapshot of a device's current state.
    pub fn device(&self, address: &str) -> Option<StubDevice> {
        lock(&self.devices).get(address).cloned()
    }

    fn open(&self, address: &str) -> Result<StubFunction> {
        validate_pci_address(address)?;
        if !lock(&self.devices).contains_key(address) {
            return Err(SriovError::NotFound {
                address: address.to_string(),
                resource: "PCI device",
            });
        }
        Ok(StubFunction { address: address.to_string(), devices: self.devices.clone() })
    }
}

impl Factory for StubFactory {
    fn new_physical_function(&self, address: &str) -> Result<Box<dyn PhysicalFunction>> {
        Ok(Box::new(self.open(address)?))
    }
}

impl ConfigurableFactory for StubFactory {
    fn new_configurable_physical_function(
        &self,
        address: &str,
    ) -> Result<Box<dyn ConfigurablePhysicalFunction>> {
        Ok(Box::new(self.open(address)?))
    }
}

/// Handle onto one entry of a [`StubFactory`] table.
#[derive(Debug, Clone)]
pub struct StubFunction {
    address: String,
    devices: Devices,
}

impl StubFunction {
    fn update<T>(&self, f: impl FnOnce(&mut StubDevice) -> Result<T>) -> Result<T> {
        let mut devices = lock(&self.devices);
        let device = devices.get_mut(&self.address).ok_or_else(|| SriovError::NotFound {
            address: self.address.clone(),
            resource: "PCI device",
        })?;
        f(device)
    }
}

fn lock(devices: &Devices) -> MutexGuard<'_, HashMap<String, StubDevice>> {
    devices.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl PciFunction for StubFunction {
    fn pci_address(&self) -> &str {
        &self.address
    }

    fn net_interface_name(&self) -> Result<String> {
        self.update(|d| {
            d.net_interface.clone().ok_or_else(|| SriovError::NotFound {
                address: self.address.clone(),
                resource: "network interface",
            })
        })
    }

    fn iommu_group_id(&self) -> Result<u32> {
        self.update(|d| {
            d.iommu_group.ok_or_else(|| SriovError::Resolution {
                address: self.address.clone(),
                path: "iommu_group".into(),
                reason: "no IOMMU group".to_string(),
            })
        })
    }

    fn bound_driver(&self) -> Result<Option<String>> {
        self.update(|d| Ok(d.driver.clone()))
    }
}

impl BindablePciFunction for StubFunction {
    fn bind_driver(&self, driver: &str) -> Result<()> {
        self.update(|d| {
            d.driver = Some(driver.to_string());
            Ok(())
        })
    }
}

impl PhysicalFunction for StubFunction {
    fn virtual_functions_capacity(&self) -> Result<u32> {
        self.update(|d| Ok(d.capacity))
    }

    fn configured_virtual_functions(&self) -> Result<u32> {
        self.update(|d| Ok(d.configured))
    }

    fn virtual_functions(&self) -> Result<VirtualFunctions> {
        let vf_addresses = self.update(|d| Ok(d.virtual_functions.clone()))?;
        let devices = lock(&self.devices);

        let mut result = VirtualFunctions::default();
        for address in vf_addresses {
            if devices.contains_key(&address) {
                result.functions.push(Box::new(StubFunction {
                    address,
                    devices: self.devices.clone(),
                }));
            } else {
                result.skipped += 1;
            }
        }
        Ok(result)
    }
}

impl ConfigurablePhysicalFunction for StubFunction {
    fn create_virtual_functions(&self, count: u32) -> Result<()> {
        self.update(|d| {
            if d.configured != count && d.configured != 0 && count != 0 {
                return Err(SriovError::AlreadyProvisioned {
                    address: self.address.clone(),
                    configured: d.configured,
                    requested: count,
                });
            }
            d.configured = count;
            Ok(())
        })
    }
}
