use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{expand_env_vars, LaunchError, ProcessAccessError};

/// Which lifecycle boundary an auxiliary program belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessCategory {
    /// Started at session begin, force-killed at session end.
    Background,
    /// Fired once at session begin, never tracked afterwards.
    SessionStart,
    /// Fired once at session end, never tracked afterwards.
    SessionEnd,
}

/// One configured auxiliary program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    /// The path exactly as configured, before expansion.
    pub path: String,
    /// The path with environment variables expanded.
    pub resolved: PathBuf,
    pub category: ProcessCategory,
}

impl ProcessEntry {
    pub fn new(path: impl Into<String>, category: ProcessCategory) -> Self {
        let path = path.into();
        let resolved = PathBuf::from(expand_env_vars(&path));
        Self {
            path,
            resolved,
            category,
        }
    }

    /// Executable file name used for existing-instance checks and kills.
    pub fn executable_name(&self) -> Option<String> {
        executable_name(&self.resolved)
    }
}

/// File name component of a path, as used for by-name process matching.
pub fn executable_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

/// Platform primitives for process enumeration and control.
///
/// Name lookups are fallible per process: an inaccessible process yields an
/// `Err` entry which callers map to "not matching" instead of failing the
/// whole enumeration.
#[async_trait]
pub trait ProcessRegistry: Send + Sync {
    /// Snapshot of the names of all running processes.
    async fn running_names(&self) -> Result<Vec<Result<String, ProcessAccessError>>, LaunchError>;

    /// Terminate every process with the given executable name. Returns the
    /// number of processes killed; killing nothing is not an error.
    async fn kill_by_name(&self, name: &str) -> Result<u32, LaunchError>;

    /// Start a program, fire-and-forget. The child is never awaited.
    async fn spawn(&self, path: &Path) -> Result<(), LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_executable_name() {
        let path = Path::new("tools").join("JoyToKey.exe");
        let entry = ProcessEntry::new(path.to_string_lossy(), ProcessCategory::Background);
        assert_eq!(entry.executable_name().as_deref(), Some("JoyToKey.exe"));
    }

    #[test]
    fn test_entry_expands_env_vars() {
        std::env::set_var("GSLAUNCH_TEST_TOOLS", "/opt/tools");
        let entry = ProcessEntry::new("$GSLAUNCH_TEST_TOOLS/overlay", ProcessCategory::SessionStart);
        assert_eq!(entry.resolved, PathBuf::from("/opt/tools/overlay"));
        assert_eq!(entry.path, "$GSLAUNCH_TEST_TOOLS/overlay");
    }

    #[test]
    fn test_executable_name_of_bare_dir() {
        assert_eq!(executable_name(Path::new("/")), None);
    }
}
