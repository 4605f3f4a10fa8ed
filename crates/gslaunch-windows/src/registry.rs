use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use sysinfo::System;
use tokio::process::Command;
use tracing::{debug, info, warn};

use gslaunch_core::{LaunchError, ProcessAccessError, ProcessRegistry};

/// Process enumeration via sysinfo, termination via `taskkill /F /IM`.
pub struct WindowsProcessRegistry {
    system: Mutex<System>,
}

impl WindowsProcessRegistry {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_all()),
        }
    }

    fn refresh(&self) -> std::sync::MutexGuard<'_, System> {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes_specifics(
            sysinfo::ProcessesToUpdate::All,
            true,
            sysinfo::ProcessRefreshKind::everything(),
        );
        system
    }
}

impl Default for WindowsProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRegistry for WindowsProcessRegistry {
    async fn running_names(&self) -> Result<Vec<Result<String, ProcessAccessError>>, LaunchError> {
        let system = self.refresh();
        Ok(system
            .processes()
            .iter()
            .map(|(pid, process)| match process.name().to_str() {
                Some(name) if !name.is_empty() => Ok(name.to_string()),
                // Protected system processes surface without a readable
                // name; callers treat these as non-matching.
                _ => Err(ProcessAccessError::NameUnavailable(pid.as_u32())),
            })
            .collect())
    }

    async fn kill_by_name(&self, name: &str) -> Result<u32, LaunchError> {
        let matching = {
            let system = self.refresh();
            system
                .processes()
                .values()
                .filter(|process| {
                    process
                        .name()
                        .to_str()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .count() as u32
        };
        if matching == 0 {
            return Ok(0);
        }

        let output = Command::new("taskkill")
            .args(["/F", "/IM", name])
            .output()
            .await?;
        if output.status.success() {
            info!(name, count = matching, "killed processes");
            Ok(matching)
        } else {
            // taskkill races against processes exiting on their own.
            debug!(
                name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "taskkill reported failure"
            );
            Ok(0)
        }
    }

    async fn spawn(&self, path: &Path) -> Result<(), LaunchError> {
        let child = Command::new(path)
            .spawn()
            .map_err(|err| LaunchError::Spawn {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        match child.id() {
            Some(pid) => info!(path = %path.display(), pid, "spawned process"),
            None => warn!(path = %path.display(), "spawned process but PID is not available"),
        }
        // Fire-and-forget: the child is never awaited.
        drop(child);
        Ok(())
    }
}
