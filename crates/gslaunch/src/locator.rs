use std::sync::Arc;

use tracing::info;

use gslaunch_core::{LaunchError, ShowCommand, TitleMatcher, WindowHandle, WindowSystem};

/// Finds and focuses the launcher's top-level window.
pub struct WindowLocator {
    windows: Arc<dyn WindowSystem>,
}

impl WindowLocator {
    pub fn new(windows: Arc<dyn WindowSystem>) -> Self {
        Self { windows }
    }

    /// One enumeration pass; the first window whose title matches wins.
    pub async fn find(&self, matcher: &TitleMatcher) -> Result<Option<WindowHandle>, LaunchError> {
        let windows = self.windows.enumerate_windows().await?;
        Ok(windows
            .into_iter()
            .find(|(_, title)| matcher.matches(title))
            .map(|(handle, _)| handle))
    }

    /// Bring the window up, optionally maximized, and give it focus.
    pub async fn focus(&self, handle: WindowHandle, maximize: bool) -> Result<(), LaunchError> {
        let command = if maximize {
            ShowCommand::Maximize
        } else {
            ShowCommand::Show
        };
        self.windows.show(handle, command).await?;
        self.windows.focus(handle).await?;
        info!(window = handle.0, maximize, "focused launcher window");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeWindowSystem;

    #[tokio::test]
    async fn test_find_first_matching_window() {
        let windows = FakeWindowSystem::new();
        windows.script_frames(vec![vec![
            (WindowHandle(1), "Task Manager".to_string()),
            (WindowHandle(2), "Playnite - Library".to_string()),
            (WindowHandle(3), "Playnite Settings".to_string()),
        ]]);

        let locator = WindowLocator::new(windows);
        let found = locator
            .find(&TitleMatcher::substring("playnite"))
            .await
            .unwrap();
        assert_eq!(found, Some(WindowHandle(2)));
    }

    #[tokio::test]
    async fn test_find_none_when_absent() {
        let windows = FakeWindowSystem::new();
        windows.script_frames(vec![vec![(WindowHandle(1), "Notepad".to_string())]]);

        let locator = WindowLocator::new(windows);
        let found = locator
            .find(&TitleMatcher::substring("playnite"))
            .await
            .unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_focus_shows_then_foregrounds() {
        let windows = FakeWindowSystem::new();
        let locator = WindowLocator::new(windows.clone());
        locator.focus(WindowHandle(7), true).await.unwrap();

        assert_eq!(windows.shown(), vec![(WindowHandle(7), ShowCommand::Maximize)]);
        assert_eq!(windows.focused(), vec![WindowHandle(7)]);
    }
}
