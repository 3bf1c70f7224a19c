//! wpa_supplicant-backed network configurator.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::info;

use crate::config::NetworkConfig;
use crate::domain::{render_wpa_conf, WirelessCredentials};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::ports::NetworkConfigurator;

pub struct WpaSupplicantConfigurator {
    config: NetworkConfig,
}

impl WpaSupplicantConfigurator {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    async fn write_conf(&self, contents: &str) -> std::io::Result<()> {
        let target = &self.config.wpa_conf_path;
        let mut tmp = target.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(contents.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, target).await
    }
}

fn network_error(err: impl std::fmt::Display) -> ProvisioningError {
    ProvisioningError::NetworkConfig {
        reason: err.to_string(),
    }
}

#[async_trait]
impl NetworkConfigurator for WpaSupplicantConfigurator {
    async fn apply(&self, credentials: &WirelessCredentials) -> ProvisioningResult<()> {
        let contents = render_wpa_conf(&self.config.country, credentials);
        self.write_conf(&contents).await.map_err(network_error)?;

        let status = Command::new(&self.config.control_program)
            .args(["-i", self.config.interface.as_str(), "reconfigure"])
            .status()
            .await
            .map_err(network_error)?;
        if !status.success() {
            return Err(network_error(format!(
                "{} reconfigure exited with {}",
                self.config.control_program, status
            )));
        }

        info!(ssid = %credentials.ssid, "[qr-04] network reconfigured");
        Ok(())
    }
}
