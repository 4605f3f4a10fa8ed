use std::sync::Arc;

use tracing::{debug, info, warn};

use gslaunch_core::{ProcessEntry, ProcessRegistry};

/// Launches and terminates named groups of auxiliary programs.
///
/// Group operations never fail the session: absent programs are skipped,
/// inaccessible processes are treated as not running, and spawn or kill
/// failures are logged and swallowed. One broken tool must not block
/// orchestration.
pub struct ProcessGroupController {
    registry: Arc<dyn ProcessRegistry>,
}

impl ProcessGroupController {
    pub fn new(registry: Arc<dyn ProcessRegistry>) -> Self {
        Self { registry }
    }

    /// Launch every entry whose path exists, killing any running process
    /// with the same executable name first so at most one instance per
    /// name survives the launch. Returns the number of programs started.
    pub async fn launch_group(&self, entries: &[ProcessEntry]) -> usize {
        let mut launched = 0;
        for entry in entries {
            if !entry.resolved.exists() {
                debug!(path = %entry.resolved.display(), "skipping absent program");
                continue;
            }
            let Some(name) = entry.executable_name() else {
                warn!(path = %entry.resolved.display(), "entry has no executable name");
                continue;
            };
            if self.is_running(&name).await {
                info!(name, "killing existing instance before launch");
                if let Err(err) = self.registry.kill_by_name(&name).await {
                    warn!(name, %err, "failed to kill existing instance");
                }
            }
            match self.registry.spawn(&entry.resolved).await {
                Ok(()) => {
                    info!(path = %entry.resolved.display(), "launched");
                    launched += 1;
                }
                Err(err) => warn!(path = %entry.resolved.display(), %err, "failed to launch"),
            }
        }
        launched
    }

    /// Terminate every entry of the group by executable name. A group
    /// that is empty or already stopped is a no-op.
    pub async fn kill_group(&self, entries: &[ProcessEntry]) {
        for entry in entries {
            if !entry.resolved.exists() {
                continue;
            }
            let Some(name) = entry.executable_name() else {
                continue;
            };
            self.kill_if_running(&name).await;
        }
    }

    /// Terminate by bare executable names, for pre-launch family cleanup
    /// and stream-host teardown.
    pub async fn kill_names(&self, names: &[String]) {
        for name in names {
            self.kill_if_running(name).await;
        }
    }

    async fn kill_if_running(&self, name: &str) {
        if self.is_running(name).await {
            info!(name, "terminating");
            if let Err(err) = self.registry.kill_by_name(name).await {
                warn!(name, %err, "failed to terminate");
            }
        }
    }

    /// Whether a process with this executable name is currently running.
    /// Per-process access errors count as "not matching".
    pub async fn is_running(&self, name: &str) -> bool {
        match self.registry.running_names().await {
            Ok(entries) => entries
                .iter()
                .any(|entry| matches!(entry, Ok(n) if n.eq_ignore_ascii_case(name))),
            Err(err) => {
                warn!(%err, "process enumeration failed; assuming not running");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProcessRegistry;
    use gslaunch_core::ProcessCategory;

    fn entry_for(path: &std::path::Path) -> ProcessEntry {
        ProcessEntry::new(path.to_string_lossy(), ProcessCategory::Background)
    }

    #[tokio::test]
    async fn test_launch_kills_existing_instance_first() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool.exe");
        std::fs::write(&tool, b"").unwrap();

        let registry = FakeProcessRegistry::new();
        registry.insert_running("tool.exe");

        let controller = ProcessGroupController::new(registry.clone());
        let launched = controller.launch_group(&[entry_for(&tool)]).await;

        assert_eq!(launched, 1);
        assert_eq!(registry.kills(), vec!["tool.exe".to_string()]);
        // Exactly one instance remains after the kill-then-spawn cycle.
        assert!(registry.is_running("tool.exe"));
        assert_eq!(registry.spawned().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_paths_silently_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.exe");
        std::fs::write(&present, b"").unwrap();

        let registry = FakeProcessRegistry::new();
        let controller = ProcessGroupController::new(registry.clone());

        let entries = vec![
            entry_for(&dir.path().join("ghost-one.exe")),
            entry_for(&present),
            entry_for(&dir.path().join("ghost-two.exe")),
        ];
        let launched = controller.launch_group(&entries).await;

        assert_eq!(launched, 1);
        assert_eq!(registry.spawned(), vec![present]);
    }

    #[tokio::test]
    async fn test_kill_group_of_stopped_processes_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("tool.exe");
        std::fs::write(&tool, b"").unwrap();

        let registry = FakeProcessRegistry::new();
        let controller = ProcessGroupController::new(registry.clone());
        controller.kill_group(&[entry_for(&tool)]).await;

        assert!(registry.kills().is_empty());
    }

    #[tokio::test]
    async fn test_inaccessible_processes_count_as_not_running() {
        let registry = FakeProcessRegistry::new();
        registry.insert_inaccessible(4242);

        let controller = ProcessGroupController::new(registry.clone());
        assert!(!controller.is_running("tool.exe").await);
    }

    #[tokio::test]
    async fn test_kill_names_only_touches_running() {
        let registry = FakeProcessRegistry::new();
        registry.insert_running("Playnite.DesktopApp.exe");

        let controller = ProcessGroupController::new(registry.clone());
        controller
            .kill_names(&[
                "Playnite.FullscreenApp.exe".to_string(),
                "Playnite.DesktopApp.exe".to_string(),
            ])
            .await;

        assert_eq!(registry.kills(), vec!["Playnite.DesktopApp.exe".to_string()]);
    }
}
