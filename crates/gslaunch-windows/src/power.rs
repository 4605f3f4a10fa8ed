use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use gslaunch_core::{LaunchError, PowerControl};

/// Sleep-on-exit through the stock powrprof entry point.
pub struct WindowsPowerControl;

#[async_trait]
impl PowerControl for WindowsPowerControl {
    async fn suspend(&self) -> Result<(), LaunchError> {
        info!("suspending the system");
        let output = Command::new("rundll32.exe")
            .args(["powrprof.dll,SetSuspendState", "0,1,0"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "SetSuspendState failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}
