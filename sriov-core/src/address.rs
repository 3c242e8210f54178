//! PCI address validation.

use crate::error::{Result, SriovError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Regular expression to validate PCI address format: 0000:01:00.0
static PCI_ADDRESS_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{4}:[0-9a-fA-F]{2}:[0-9a-fA-F]{2}\.[0-7]$")
        .expect("Invalid PCI address regex")
});

/// Validate PCI address format (domain:bus:device.function).
pub fn is_valid_pci_address(address: &str) -> bool {
    PCI_ADDRESS_REGEX.is_match(address)
}

/// Like [`is_valid_pci_address`], as a `Result`.
pub fn validate_pci_address(address: &str) -> Result<()> {
    if is_valid_pci_address(address) {
        Ok(())
    } else {
        Err(SriovError::InvalidAddress { address: address.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pci_address_validation() {
        assert!(is_valid_pci_address("0000:01:00.0"));
        assert!(is_valid_pci_address("0000:3b:02.7"));
        assert!(is_valid_pci_address("ABCD:12:34.5"));

        assert!(!is_valid_pci_address("01:00.0")); // Missing domain
        assert!(!is_valid_pci_address("0000:01:00")); // Missing function
        assert!(!is_valid_pci_address("0000:01:00.8")); // Function is 0-7
        assert!(!is_valid_pci_address("../0000:01:00.0"));
    }

    #[test]
    fn test_validate_returns_invalid_address() {
        match validate_pci_address("eth0") {
            Err(SriovError::InvalidAddress { address }) => assert_eq!(address, "eth0"),
            other => panic!("Expected InvalidAddress, got {:?}", other),
        }
    }
}
