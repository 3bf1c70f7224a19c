//! Device identity.
//!
//! The appliance identifies itself by the MAC address of its wifi
//! interface, read from sysfs and uppercased.

use std::path::Path;

use anyhow::{bail, Context};
use shared_types::DeviceId;

/// sysfs directory holding one entry per network interface.
pub const NET_CLASS_ROOT: &str = "/sys/class/net";

/// Read `<net_root>/<interface>/address`.
pub fn read_interface_mac(net_root: &Path, interface: &str) -> anyhow::Result<DeviceId> {
    let path = net_root.join(interface).join("address");
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading MAC address from {}", path.display()))?;
    if raw.trim().is_empty() {
        bail!("{} is empty", path.display());
    }
    Ok(DeviceId::new(raw))
}

/// Explicit override wins over the interface MAC.
pub fn resolve_device_id(
    explicit: Option<&str>,
    net_root: &Path,
    interface: &str,
) -> anyhow::Result<DeviceId> {
    match explicit {
        Some(id) if !id.trim().is_empty() => Ok(DeviceId::new(id)),
        _ => read_interface_mac(net_root, interface),
    }
}
