//! Device management metrics.
//!
//! Counter names follow Prometheus conventions (`_total` suffix).

use metrics::{counter, describe_counter};

pub const VFS_PROVISIONED: &str = "sriov_vfs_provisioned_total";
pub const DRIVER_BINDS: &str = "sriov_driver_binds_total";
pub const VF_ENTRIES_SKIPPED: &str = "sriov_vf_entries_skipped_total";

/// Register all metrics with descriptions.
pub fn register_metrics() {
    describe_counter!(VFS_PROVISIONED, "Virtual functions requested through sriov_numvfs writes");
    describe_counter!(DRIVER_BINDS, "Successful driver rebinds (by driver)");
    describe_counter!(
        VF_ENTRIES_SKIPPED,
        "virtfn entries skipped during enumeration because they were unreadable or did not resolve"
    );
}

pub fn record_vfs_provisioned(count: u32) {
    counter!(VFS_PROVISIONED).increment(u64::from(count));
}

pub fn record_driver_bind(driver: &str) {
    counter!(DRIVER_BINDS, "driver" => driver.to_string()).increment(1);
}

pub fn record_vf_entry_skipped() {
    counter!(VF_ENTRIES_SKIPPED).increment(1);
}
