use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use gslaunch_core::{
    CloseWatch, LaunchError, ProcessRegistry, SessionSignal, TitleMatcher,
};

use crate::locator::WindowLocator;

/// Fixed poll interval while watching for the launcher window to vanish.
pub const WINDOW_POLL: Duration = Duration::from_secs(3);
/// Fixed poll interval while watching for the launcher process to exit.
pub const PROCESS_POLL: Duration = Duration::from_secs(3);
/// Fixed retry interval while waiting for the session primitive to appear.
pub const SIGNAL_POLL: Duration = Duration::from_millis(500);

/// Poll intervals for the detection strategies. Tunable constants, not
/// computed at runtime.
#[derive(Debug, Clone, Copy)]
pub struct WatchIntervals {
    pub window_poll: Duration,
    pub process_poll: Duration,
    pub signal_poll: Duration,
}

impl Default for WatchIntervals {
    fn default() -> Self {
        Self {
            window_poll: WINDOW_POLL,
            process_poll: PROCESS_POLL,
            signal_poll: SIGNAL_POLL,
        }
    }
}

/// What each strategy watches for.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    pub matcher: TitleMatcher,
    pub process_name: String,
    pub mutex_name: String,
}

/// Source of explicit human acknowledgments, for the manual strategy and
/// the debug pause.
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn acknowledge(&self, prompt: &str) -> Result<(), LaunchError>;
}

/// Reads a line from standard input.
pub struct StdinConfirmation;

#[async_trait]
impl Confirmation for StdinConfirmation {
    async fn acknowledge(&self, prompt: &str) -> Result<(), LaunchError> {
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut stdout = std::io::stdout();
            write!(stdout, "{prompt} ")?;
            stdout.flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok::<_, std::io::Error>(())
        })
        .await
        .map_err(|err| LaunchError::Other(anyhow::anyhow!("confirmation task failed: {err}")))??;
        Ok(())
    }
}

/// Watches for the end of the launcher session.
///
/// All strategies are exhaustive loops with no fatal-error exit: transient
/// failures are logged and the loop keeps polling. Detection is the only
/// way out, and none of the waits carries a timeout; sessions are
/// user-paced and have no natural upper bound.
pub struct TerminationDetector {
    locator: WindowLocator,
    registry: Arc<dyn ProcessRegistry>,
    signal: Arc<dyn SessionSignal>,
    confirm: Arc<dyn Confirmation>,
    intervals: WatchIntervals,
}

impl TerminationDetector {
    pub fn new(
        locator: WindowLocator,
        registry: Arc<dyn ProcessRegistry>,
        signal: Arc<dyn SessionSignal>,
        confirm: Arc<dyn Confirmation>,
        intervals: WatchIntervals,
    ) -> Self {
        Self {
            locator,
            registry,
            signal,
            confirm,
            intervals,
        }
    }

    /// Block until the configured strategy detects session termination.
    pub async fn await_termination(&self, strategy: CloseWatch, target: &WatchTarget) {
        info!(?strategy, "watching for session termination");
        match strategy {
            CloseWatch::WindowClose => self.watch_window(&target.matcher).await,
            CloseWatch::ProcessExit => self.watch_process(&target.process_name).await,
            CloseWatch::MutexHandshake => self.watch_signal(&target.mutex_name).await,
            CloseWatch::ManualConfirm => self.watch_confirmation().await,
        }
        info!(?strategy, "session termination detected");
    }

    async fn watch_window(&self, matcher: &TitleMatcher) {
        loop {
            match self.locator.find(matcher).await {
                Ok(None) => return,
                Ok(Some(_)) => {}
                Err(err) => warn!(%err, "window enumeration failed; retrying"),
            }
            sleep(self.intervals.window_poll).await;
        }
    }

    async fn watch_process(&self, name: &str) {
        loop {
            match self.registry.running_names().await {
                Ok(entries) => {
                    let present = entries
                        .iter()
                        .any(|entry| matches!(entry, Ok(n) if n.eq_ignore_ascii_case(name)));
                    if !present {
                        return;
                    }
                }
                Err(err) => warn!(%err, "process enumeration failed; retrying"),
            }
            sleep(self.intervals.process_poll).await;
        }
    }

    async fn watch_signal(&self, name: &str) {
        loop {
            match self.signal.try_open(name).await {
                Ok(Some(waiter)) => {
                    if let Err(err) = waiter.wait_released().await {
                        // An abandoned primitive means the holder is gone,
                        // which also ends the session.
                        warn!(%err, "session primitive wait failed; treating as released");
                    }
                    return;
                }
                Ok(None) => {}
                Err(err) => warn!(%err, "opening session primitive failed; retrying"),
            }
            sleep(self.intervals.signal_poll).await;
        }
    }

    async fn watch_confirmation(&self) {
        if let Err(err) = self
            .confirm
            .acknowledge("Session running. Press Enter to end it.")
            .await
        {
            warn!(%err, "confirmation failed; treating session as ended");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeConfirmation, FakeProcessRegistry, FakeSessionSignal, FakeWindowSystem,
    };
    use gslaunch_core::WindowHandle;

    fn fast_intervals() -> WatchIntervals {
        WatchIntervals {
            window_poll: Duration::from_millis(5),
            process_poll: Duration::from_millis(5),
            signal_poll: Duration::from_millis(5),
        }
    }

    struct Fixture {
        windows: Arc<FakeWindowSystem>,
        registry: Arc<FakeProcessRegistry>,
        signal: Arc<FakeSessionSignal>,
        confirm: Arc<FakeConfirmation>,
        detector: TerminationDetector,
    }

    fn fixture() -> Fixture {
        let windows = FakeWindowSystem::new();
        let registry = FakeProcessRegistry::new();
        let signal = FakeSessionSignal::new();
        let confirm = FakeConfirmation::new();
        let detector = TerminationDetector::new(
            WindowLocator::new(windows.clone()),
            registry.clone(),
            signal.clone(),
            confirm.clone(),
            fast_intervals(),
        );
        Fixture {
            windows,
            registry,
            signal,
            confirm,
            detector,
        }
    }

    fn target() -> WatchTarget {
        WatchTarget {
            matcher: TitleMatcher::substring("playnite"),
            process_name: "Playnite.FullscreenApp.exe".to_string(),
            mutex_name: "GameStreamLaunchpadSession".to_string(),
        }
    }

    #[tokio::test]
    async fn test_window_close_detected_when_window_vanishes() {
        let f = fixture();
        let playnite = vec![(WindowHandle(1), "Playnite".to_string())];
        f.windows
            .script_frames(vec![playnite.clone(), playnite, vec![]]);

        f.detector
            .await_termination(CloseWatch::WindowClose, &target())
            .await;
        // Two passes saw the window, the third saw it gone.
        assert_eq!(f.windows.enumerations(), 3);
    }

    #[tokio::test]
    async fn test_process_exit_detected_at_poll_after_vanish() {
        let f = fixture();
        f.registry.insert_running("Playnite.FullscreenApp.exe");
        f.registry.vanish_after("Playnite.FullscreenApp.exe", 4);

        f.detector
            .await_termination(CloseWatch::ProcessExit, &target())
            .await;
        // Observed in polls 1..=4, detected exactly at poll 5.
        assert_eq!(f.registry.snapshots(), 5);
    }

    #[tokio::test]
    async fn test_process_exit_ignores_other_processes() {
        let f = fixture();
        f.registry.insert_running("explorer.exe");
        f.registry.insert_inaccessible(1234);

        // The launcher never ran, so the first poll already detects.
        f.detector
            .await_termination(CloseWatch::ProcessExit, &target())
            .await;
        assert_eq!(f.registry.snapshots(), 1);
    }

    #[tokio::test]
    async fn test_mutex_handshake_retries_until_present() {
        let f = fixture();
        f.signal.present_after(3);

        f.detector
            .await_termination(CloseWatch::MutexHandshake, &target())
            .await;
        assert_eq!(f.signal.attempts(), 4);
        assert_eq!(f.signal.waits(), 1);
    }

    #[tokio::test]
    async fn test_manual_confirm_blocks_on_acknowledgment() {
        let f = fixture();
        f.detector
            .await_termination(CloseWatch::ManualConfirm, &target())
            .await;
        assert_eq!(f.confirm.prompts().len(), 1);
    }
}
