use thiserror::Error;

/// Core error types for session orchestration
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("No primary display found at position (0, 0)")]
    NoPrimaryDisplay,

    #[error("Display not found: {0}")]
    DisplayNotFound(String),

    #[error("Display rejected mode {width}x{height}: {reason}")]
    ModeChange {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Launcher window \"{title}\" did not appear within {waited_secs}s")]
    LauncherStartTimeout { title: String, waited_secs: u64 },

    #[error("Failed to start {path}: {reason}")]
    Spawn { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl LaunchError {
    /// Errors that abort the run before the display mode has been touched.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            LaunchError::Configuration(_)
                | LaunchError::NoPrimaryDisplay
                | LaunchError::DisplayNotFound(_)
                | LaunchError::ModeChange { .. }
        )
    }

    /// Errors raised after the mode was applied. The teardown sequence
    /// (background kill, mode restore) must still run for these.
    pub fn needs_teardown(&self) -> bool {
        !self.is_startup_failure()
    }
}

/// Per-process enumeration failure. Recovered locally by treating the
/// process as "not matching"; never propagated out of the controllers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessAccessError {
    #[error("Access denied for pid {0}")]
    AccessDenied(u32),

    #[error("Process name unavailable for pid {0}")]
    NameUnavailable(u32),
}
