//! Network configuration file contents.

use super::request::WirelessCredentials;

/// wpa_supplicant configuration for a single WPA-PSK network.
pub fn render_wpa_conf(country: &str, credentials: &WirelessCredentials) -> String {
    format!(
        "ctrl_interface=DIR=/var/run/wpa_supplicant GROUP=netdev\n\
         update_config=1\n\
         country={}\n\
         \n\
         network={{\n\
         \tssid=\"{}\"\n\
         \tpsk=\"{}\"\n\
         \tkey_mgmt=WPA-PSK\n\
         }}\n",
        country, credentials.ssid, credentials.passphrase
    )
}
