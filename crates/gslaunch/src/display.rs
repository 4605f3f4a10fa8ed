use std::sync::Arc;

use tracing::{debug, info, warn};

use gslaunch_core::{DisplayControl, DisplayDescriptor, DisplayMode, LaunchError};

/// Applies a display mode and hands back a guard that restores the
/// original mode on every exit path.
pub struct DisplayModeController {
    control: Arc<dyn DisplayControl>,
    skip_restore: bool,
}

impl DisplayModeController {
    pub fn new(control: Arc<dyn DisplayControl>, skip_restore: bool) -> Self {
        Self {
            control,
            skip_restore,
        }
    }

    /// Resolve the target display, capture its current mode, and apply the
    /// requested one. The captured mode is the only value ever used for
    /// restoration.
    pub async fn apply(
        &self,
        requested: &DisplayMode,
        selector: Option<&str>,
    ) -> Result<ModeGuard, LaunchError> {
        let displays = self.control.enumerate().await?;
        let display = match selector {
            Some(selector) => displays
                .into_iter()
                .find(|d| {
                    d.id.eq_ignore_ascii_case(selector) || d.name.eq_ignore_ascii_case(selector)
                })
                .ok_or_else(|| LaunchError::DisplayNotFound(selector.to_string()))?,
            None => displays
                .into_iter()
                .find(|d| d.is_at_origin())
                .ok_or(LaunchError::NoPrimaryDisplay)?,
        };

        let original = self.control.current_mode(&display).await?;
        // The requested resolution applies at the display's own position.
        let target = requested.at_position(original.position);
        self.control.set_mode(&display, &target, false).await?;
        let display_id = &display.id;
        info!(display = %display_id, from = %original, to = %target, "switched display mode");

        Ok(ModeGuard {
            control: self.control.clone(),
            display,
            original,
            restored: false,
            skip_restore: self.skip_restore,
        })
    }
}

/// Scoped ownership of the display mode. One guard exists per successful
/// `apply`; restoring it releases the session's exclusive claim on the
/// display.
pub struct ModeGuard {
    control: Arc<dyn DisplayControl>,
    display: DisplayDescriptor,
    original: DisplayMode,
    restored: bool,
    skip_restore: bool,
}

impl std::fmt::Debug for ModeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModeGuard")
            .field("display", &self.display)
            .field("original", &self.original)
            .field("restored", &self.restored)
            .field("skip_restore", &self.skip_restore)
            .finish()
    }
}

impl ModeGuard {
    /// Reapply the captured original mode. Idempotent: the second and
    /// later calls are no-ops.
    pub async fn restore(&mut self) -> Result<(), LaunchError> {
        if self.restored {
            debug!("display mode already restored");
            return Ok(());
        }
        self.restored = true;
        if self.skip_restore {
            info!("leaving display mode in place (--no-restore)");
            return Ok(());
        }
        self.control
            .set_mode(&self.display, &self.original, false)
            .await?;
        info!(mode = %self.original, "restored original display mode");
        Ok(())
    }

    pub fn original(&self) -> &DisplayMode {
        &self.original
    }

    pub fn display(&self) -> &DisplayDescriptor {
        &self.display
    }
}

impl Drop for ModeGuard {
    fn drop(&mut self) {
        if !self.restored {
            warn!(
                display = %self.display.id,
                "mode guard dropped without restoring the display"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDisplayControl;

    fn controller(fake: &Arc<FakeDisplayControl>) -> DisplayModeController {
        DisplayModeController::new(fake.clone(), false)
    }

    #[tokio::test]
    async fn test_apply_restore_round_trip() {
        let fake = FakeDisplayControl::single(DisplayMode::new(2560, 1440));
        let mut guard = controller(&fake)
            .apply(&DisplayMode::new(1920, 1080), None)
            .await
            .unwrap();
        assert_eq!(fake.current(), DisplayMode::new(1920, 1080));

        guard.restore().await.unwrap();
        assert_eq!(fake.current(), DisplayMode::new(2560, 1440));
    }

    #[tokio::test]
    async fn test_restore_is_idempotent() {
        let fake = FakeDisplayControl::single(DisplayMode::new(2560, 1440));
        let mut guard = controller(&fake)
            .apply(&DisplayMode::new(1280, 720), None)
            .await
            .unwrap();
        guard.restore().await.unwrap();
        guard.restore().await.unwrap();

        // One apply plus exactly one restore.
        assert_eq!(fake.applied_modes().len(), 2);
        assert_eq!(fake.current(), DisplayMode::new(2560, 1440));
    }

    #[tokio::test]
    async fn test_rejected_mode_is_fatal() {
        let fake = FakeDisplayControl::single(DisplayMode::new(2560, 1440));
        fake.reject_changes();
        let err = controller(&fake)
            .apply(&DisplayMode::new(1920, 1080), None)
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::ModeChange { .. }));
        assert!(err.is_startup_failure());
    }

    #[tokio::test]
    async fn test_unknown_selector() {
        let fake = FakeDisplayControl::single(DisplayMode::new(2560, 1440));
        let err = controller(&fake)
            .apply(&DisplayMode::new(1920, 1080), Some("DP-9"))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::DisplayNotFound(_)));
    }

    #[tokio::test]
    async fn test_skip_restore_leaves_mode() {
        let fake = FakeDisplayControl::single(DisplayMode::new(2560, 1440));
        let controller = DisplayModeController::new(fake.clone(), true);
        let mut guard = controller
            .apply(&DisplayMode::new(1920, 1080), None)
            .await
            .unwrap();
        guard.restore().await.unwrap();
        assert_eq!(fake.current(), DisplayMode::new(1920, 1080));
    }
}
