//! Resource pool and endpoint descriptors.
//!
//! Both are YAML documents loaded wholesale; there is no partial update.
//!
//! ```yaml
//! # resource pool
//! physicalFunctions:
//!   - registryDomainName: worker.domain
//!     capability: 10G
//!     devicePciAddress: "0000:01:00.0"
//!     connectedToPort: switch-1/port-3
//!
//! # endpoint
//! hostName: worker-1
//! pciDevices:
//!   - pciAddress: "0000:01:00.0"
//!     capability: 10G
//!     labels: { zone: a }
//!     target:
//!       macAddress: "52:54:00:12:34:56"
//!       labels: { role: uplink }
//! ```

use crate::address::is_valid_pci_address;
use crate::error::{Result, SriovError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Physical functions offered to the resource pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    #[serde(default)]
    pub physical_functions: Vec<ResourceDomain>,
}

/// One physical function entry of the resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDomain {
    pub registry_domain_name: String,
    pub capability: String,
    pub device_pci_address: String,
    #[serde(default)]
    pub connected_to_port: String,
}

/// PCI devices exposed by one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    pub host_name: String,
    #[serde(default)]
    pub pci_devices: Vec<PciDeviceConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PciDeviceConfig {
    pub pci_address: String,
    pub capability: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub target: Option<TargetConfig>,
}

/// Where a device's traffic is expected to land.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub labels: HashMap<String, String>,
}

impl ResourceConfig {
    /// Parse and validate a resource pool descriptor.
    #[instrument(skip(content))]
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = parse_yaml(content)?;

        for pf in &config.physical_functions {
            require(&pf.registry_domain_name, "registryDomainName", &pf.device_pci_address)?;
            require(&pf.capability, "capability", &pf.device_pci_address)?;
            require_address(&pf.device_pci_address)?;
        }

        info!(physical_functions = config.physical_functions.len(), "Loaded resource config");
        Ok(config)
    }

    #[instrument]
    pub fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        Self::from_yaml(&read_file(path.as_ref())?)
    }
}

impl EndpointConfig {
    /// Parse and validate an endpoint descriptor.
    #[instrument(skip(content))]
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = parse_yaml(content)?;

        if config.host_name.trim().is_empty() {
            return Err(SriovError::InvalidConfig {
                reason: "endpoint hostName must not be empty".to_string(),
            });
        }
        for device in &config.pci_devices {
            require_address(&device.pci_address)?;
            require(&device.capability, "capability", &device.pci_address)?;
        }

        info!(
            host = %config.host_name,
            pci_devices = config.pci_devices.len(),
            "Loaded endpoint config"
        );
        Ok(config)
    }

    #[instrument]
    pub fn from_file<P: AsRef<Path> + std::fmt::Debug>(path: P) -> Result<Self> {
        Self::from_yaml(&read_file(path.as_ref())?)
    }
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T> {
    serde_yaml::from_str(content).map_err(|e| SriovError::InvalidConfig {
        reason: format!("Failed to parse YAML: {}", e),
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| SriovError::InvalidConfig {
        reason: format!("Failed to read {}: {}", path.display(), e),
    })
}

fn require(value: &str, field: &str, address: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SriovError::InvalidConfig {
            reason: format!("{} must not be empty for device {}", field, address),
        });
    }
    Ok(())
}

fn require_address(address: &str) -> Result<()> {
    if !is_valid_pci_address(address) {
        return Err(SriovError::InvalidConfig {
            reason: format!("Invalid PCI address: {} (expected: 0000:01:00.0)", address),
        });
    }
    Ok(())
}
