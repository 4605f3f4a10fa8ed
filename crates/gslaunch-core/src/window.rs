use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LaunchError;

/// Opaque top-level window identifier (HWND on Windows, X11 window id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// How to show a window when bringing it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    /// Show at its current size (SW_SHOW).
    Show,
    /// Show maximized (SW_MAXIMIZE).
    Maximize,
}

/// How window titles are compared against the configured pattern.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    #[default]
    Substring,
    Prefix,
}

/// Case-insensitive window title matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatcher {
    pub pattern: String,
    pub mode: MatchMode,
}

impl TitleMatcher {
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::Substring,
        }
    }

    pub fn prefix(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            mode: MatchMode::Prefix,
        }
    }

    pub fn matches(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        let pattern = self.pattern.to_lowercase();
        match self.mode {
            MatchMode::Substring => title.contains(&pattern),
            MatchMode::Prefix => title.starts_with(&pattern),
        }
    }
}

/// Platform primitives for top-level window enumeration and focus.
#[async_trait]
pub trait WindowSystem: Send + Sync {
    /// One pass over all visible top-level windows with their titles.
    async fn enumerate_windows(&self) -> Result<Vec<(WindowHandle, String)>, LaunchError>;

    /// Bring a window to the foreground.
    async fn focus(&self, handle: WindowHandle) -> Result<(), LaunchError>;

    /// Show or maximize a window.
    async fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), LaunchError>;

    /// Move the cursor into the far bottom-right corner to pseudo-hide it.
    async fn park_cursor(&self) -> Result<(), LaunchError>;

    /// Minimize all windows to clear the desktop before the session.
    async fn minimize_all(&self) -> Result<(), LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_match_is_case_insensitive() {
        let matcher = TitleMatcher::substring("playnite");
        assert!(matcher.matches("Playnite"));
        assert!(matcher.matches("PLAYNITE - Fullscreen"));
        assert!(!matcher.matches("Steam Big Picture"));
    }

    #[test]
    fn test_prefix_match() {
        let matcher = TitleMatcher::prefix("Playnite");
        assert!(matcher.matches("playnite fullscreen"));
        assert!(!matcher.matches("My Playnite"));
    }
}
