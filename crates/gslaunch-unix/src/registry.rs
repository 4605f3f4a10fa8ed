use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use sysinfo::System;
use tokio::process::Command;
use tracing::{debug, info, warn};

use gslaunch_core::{LaunchError, ProcessAccessError, ProcessRegistry};

/// Process enumeration and by-name termination backed by sysinfo.
pub struct UnixProcessRegistry {
    system: Mutex<System>,
}

impl UnixProcessRegistry {
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

impl Default for UnixProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessRegistry for UnixProcessRegistry {
    async fn running_names(&self) -> Result<Vec<Result<String, ProcessAccessError>>, LaunchError> {
        let system = self.refresh();
        Ok(system
            .processes()
            .iter()
            .map(|(pid, process)| match process.name().to_str() {
                Some(name) if !name.is_empty() => Ok(name.to_string()),
                _ => Err(ProcessAccessError::NameUnavailable(pid.as_u32())),
            })
            .collect())
    }

    async fn kill_by_name(&self, name: &str) -> Result<u32, LaunchError> {
        let pids: Vec<u32> = {
            let system = self.refresh();
            system
                .processes()
                .iter()
                .filter(|(_, process)| {
                    process
                        .name()
                        .to_str()
                        .is_some_and(|n| n.eq_ignore_ascii_case(name))
                })
                .map(|(pid, _)| pid.as_u32())
                .collect()
        };

        let mut killed = 0;
        for pid in pids {
            match signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                Ok(()) => {
                    info!(name, pid, "killed process");
                    killed += 1;
                }
                // The process may have exited on its own, or belong to
                // another user; either way it no longer matters to us.
                Err(err) => debug!(name, pid, %err, "kill skipped"),
            }
        }
        Ok(killed)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_running_names_include_this_process() {
        let registry = UnixProcessRegistry::new();
        let names = registry.running_names().await.unwrap();
        assert!(!names.is_empty());
        // Every entry is either a usable name or a recoverable access error.
        assert!(names
            .iter()
            .all(|entry| entry.as_ref().map(|n| !n.is_empty()).unwrap_or(true)));
    }

    #[tokio::test]
    async fn test_kill_by_name_missing_is_noop() {
        let registry = UnixProcessRegistry::new();
        let killed = registry
            .kill_by_name("gslaunch-no-such-process")
            .await
            .unwrap();
        assert_eq!(killed, 0);
    }

    #[tokio::test]
    async fn test_spawn_missing_binary_reports_path() {
        let registry = UnixProcessRegistry::new();
        let err = registry
            .spawn(Path::new("/nonexistent/gslaunch-tool"))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }
}
