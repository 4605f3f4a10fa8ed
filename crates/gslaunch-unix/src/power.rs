use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use gslaunch_core::{LaunchError, PowerControl};

/// Sleep-on-exit through `systemctl suspend`.
pub struct UnixPowerControl;

#[async_trait]
impl PowerControl for UnixPowerControl {
    async fn suspend(&self) -> Result<(), LaunchError> {
        info!("suspending the system");
        let output = Command::new("systemctl").arg("suspend").output().await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "systemctl suspend failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
