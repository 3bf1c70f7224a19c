//! Provisioning channel configuration.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProvisioningConfig {
    /// Serial device bound to the wireless channel.
    pub rfcomm_device: PathBuf,
    /// Delay before reopening the device after the peer goes away.
    pub reopen_delay: Duration,
    /// Largest partial request kept while waiting for the rest.
    pub max_buffer: usize,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            rfcomm_device: PathBuf::from("/dev/rfcomm0"),
            reopen_delay: Duration::from_secs(1),
            max_buffer: 64 * 1024,
        }
    }
}

/// Where and how network credentials are applied.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub wpa_conf_path: PathBuf,
    pub country: String,
    pub interface: String,
    /// Control program invoked as `<program> -i <interface> reconfigure`.
    pub control_program: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wpa_conf_path: PathBuf::from("/etc/wpa_supplicant/wpa_supplicant.conf"),
            country: "IN".to_string(),
            interface: "wlan0".to_string(),
            control_program: "wpa_cli".to_string(),
        }
    }
}
