use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LaunchError;

/// A display mode as requested or captured from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// Refresh rate in Hz. `None` keeps the display's current rate.
    pub refresh_rate: Option<u32>,
    /// Top-left position of the display in the virtual desktop.
    pub position: (i32, i32),
}

impl DisplayMode {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            refresh_rate: None,
            position: (0, 0),
        }
    }

    pub fn with_refresh_rate(mut self, rate: Option<u32>) -> Self {
        self.refresh_rate = rate;
        self
    }

    /// Rebase the mode onto another display position. Used when applying a
    /// requested resolution to a display that is not at the origin.
    pub fn at_position(mut self, position: (i32, i32)) -> Self {
        self.position = position;
        self
    }
}

impl std::fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.refresh_rate {
            Some(rate) => write!(f, "{}x{}@{}", self.width, self.height, rate),
            None => write!(f, "{}x{}", self.width, self.height),
        }
    }
}

/// A connected display as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayDescriptor {
    /// Platform identifier (device name on Windows, output name under X11).
    pub id: String,
    /// Human-readable name for `--list-displays` output.
    pub name: String,
    pub position: (i32, i32),
    pub primary: bool,
}

impl DisplayDescriptor {
    /// The primary display is the one sitting at the origin of the virtual
    /// desktop, regardless of what the platform flags as primary.
    pub fn is_at_origin(&self) -> bool {
        self.position == (0, 0)
    }
}

/// Platform primitives for display mode enumeration and changes.
#[async_trait]
pub trait DisplayControl: Send + Sync {
    /// List all connected displays.
    async fn enumerate(&self) -> Result<Vec<DisplayDescriptor>, LaunchError>;

    /// Read the current mode of a display.
    async fn current_mode(&self, display: &DisplayDescriptor) -> Result<DisplayMode, LaunchError>;

    /// Apply a mode to a display. Fails with `LaunchError::ModeChange` when
    /// the platform rejects the mode.
    async fn set_mode(
        &self,
        display: &DisplayDescriptor,
        mode: &DisplayMode,
        make_primary: bool,
    ) -> Result<(), LaunchError>;

    /// Reapply the platform's persisted default layout for a display.
    async fn restore_default(&self, display: &DisplayDescriptor) -> Result<(), LaunchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display_format() {
        assert_eq!(DisplayMode::new(1920, 1080).to_string(), "1920x1080");
        assert_eq!(
            DisplayMode::new(1280, 720)
                .with_refresh_rate(Some(60))
                .to_string(),
            "1280x720@60"
        );
    }

    #[test]
    fn test_primary_is_at_origin() {
        let primary = DisplayDescriptor {
            id: r"\\.\DISPLAY1".into(),
            name: "DISPLAY1".into(),
            position: (0, 0),
            primary: true,
        };
        let secondary = DisplayDescriptor {
            id: r"\\.\DISPLAY2".into(),
            name: "DISPLAY2".into(),
            position: (1920, 0),
            primary: false,
        };
        assert!(primary.is_at_origin());
        assert!(!secondary.is_at_origin());
    }

    #[test]
    fn test_at_position_preserves_mode() {
        let mode = DisplayMode::new(1920, 1080)
            .with_refresh_rate(Some(120))
            .at_position((2560, 0));
        assert_eq!(mode.width, 1920);
        assert_eq!(mode.refresh_rate, Some(120));
        assert_eq!(mode.position, (2560, 0));
    }
}
