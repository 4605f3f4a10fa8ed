use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use gslaunch_core::{
    CloseWatch, LaunchError, LauncherSpec, Platform, ProcessEntry, SessionConfig, SessionState,
    WindowHandle,
};

use crate::display::{DisplayModeController, ModeGuard};
use crate::groups::ProcessGroupController;
use crate::locator::WindowLocator;
use crate::watch::{
    Confirmation, StdinConfirmation, TerminationDetector, WatchIntervals, WatchTarget,
};

/// Budget for the launcher window to appear after its process starts.
pub const FOCUS_TIMEOUT: Duration = Duration::from_secs(60);
/// Poll interval inside the focus-wait loop.
pub const FOCUS_POLL: Duration = Duration::from_secs(1);

/// Sequences one full session: mode change, auxiliary processes, launcher
/// focus, termination watch, and teardown.
///
/// Teardown is unconditional once the display mode has been applied; every
/// failure after that point still travels through it before surfacing.
pub struct SessionOrchestrator {
    config: SessionConfig,
    platform: Platform,
    confirm: Arc<dyn Confirmation>,
    intervals: WatchIntervals,
    focus_timeout: Duration,
    focus_poll: Duration,
    state: SessionState,
}

impl SessionOrchestrator {
    pub fn new(config: SessionConfig, platform: Platform) -> Self {
        Self {
            config,
            platform,
            confirm: Arc::new(StdinConfirmation),
            intervals: WatchIntervals::default(),
            focus_timeout: FOCUS_TIMEOUT,
            focus_poll: FOCUS_POLL,
            state: SessionState::Idle,
        }
    }

    /// Replace the stdin confirmation source (used by tests and callers
    /// embedding the orchestrator).
    pub fn with_confirmation(mut self, confirm: Arc<dyn Confirmation>) -> Self {
        self.confirm = confirm;
        self
    }

    /// Override the polling cadence.
    pub fn with_timing(
        mut self,
        intervals: WatchIntervals,
        focus_timeout: Duration,
        focus_poll: Duration,
    ) -> Self {
        self.intervals = intervals;
        self.focus_timeout = focus_timeout;
        self.focus_poll = focus_poll;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Run the full session. On success and on every post-mode-change
    /// failure the terminal state is `Restored`; only a failure to apply
    /// the mode in the first place aborts without teardown.
    pub async fn run(&mut self) -> Result<(), LaunchError> {
        let controller =
            DisplayModeController::new(self.platform.display.clone(), self.config.skip_restore);
        let target = self.config.target;
        info!(mode = %target, "starting session");

        let mut guard = match controller
            .apply(&target, self.config.display.as_deref())
            .await
        {
            Ok(guard) => guard,
            Err(err) => {
                self.transition(SessionState::Aborted);
                return Err(err);
            }
        };
        self.transition(SessionState::ModeApplied);

        let outcome = self.run_session().await;

        self.transition(SessionState::TearingDown);
        self.teardown(&mut guard).await;
        self.transition(SessionState::Restored);
        info!("session complete");

        outcome
    }

    /// Steps between mode change and teardown. Any error propagates to
    /// `run`, which tears down regardless.
    async fn run_session(&mut self) -> Result<(), LaunchError> {
        if let Err(err) = self.platform.windows.minimize_all().await {
            warn!(%err, "failed to minimize windows");
        }

        let groups = ProcessGroupController::new(self.platform.processes.clone());
        let mut startup: Vec<ProcessEntry> = self.config.background.clone();
        startup.extend(self.config.session_start.iter().cloned());
        groups.launch_group(&startup).await;
        self.transition(SessionState::BackgroundStarted);

        let launcher = self.config.launcher.clone();
        let Some(path) = launcher.path.clone() else {
            info!("launcher disabled; session runs until manually confirmed");
            self.transition(SessionState::AwaitingTermination);
            self.detector()
                .await_termination(CloseWatch::ManualConfirm, &self.watch_target(&launcher))
                .await;
            return Ok(());
        };

        // A family member already running in another mode would swallow
        // the fresh instance, so clear the whole family first.
        let mut cleanup: Vec<String> = Vec::new();
        if let Some(name) = launcher.executable_name() {
            cleanup.push(name);
        }
        for name in &launcher.prelaunch_kill {
            if !cleanup.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                cleanup.push(name.clone());
            }
        }
        groups.kill_names(&cleanup).await;

        info!(path = %path.display(), "starting launcher");
        self.platform.processes.spawn(&path).await?;
        self.transition(SessionState::LauncherStarted);

        if let Err(err) = self.platform.windows.park_cursor().await {
            warn!(%err, "failed to park cursor");
        }

        let locator = WindowLocator::new(self.platform.windows.clone());
        let handle = self.wait_for_window(&locator, &launcher).await?;
        if let Err(err) = locator.focus(handle, launcher.wants_maximize()).await {
            warn!(%err, "failed to focus launcher window");
        }
        self.transition(SessionState::LauncherFocused);

        self.transition(SessionState::AwaitingTermination);
        self.detector()
            .await_termination(launcher.close_watch, &self.watch_target(&launcher))
            .await;
        Ok(())
    }

    /// Bounded retry loop for the launcher window. This is the only wait
    /// in the whole run that carries a timeout.
    async fn wait_for_window(
        &self,
        locator: &WindowLocator,
        launcher: &LauncherSpec,
    ) -> Result<WindowHandle, LaunchError> {
        let deadline = tokio::time::Instant::now() + self.focus_timeout;
        loop {
            match locator.find(&launcher.matcher).await {
                Ok(Some(handle)) => return Ok(handle),
                Ok(None) => {}
                Err(err) => warn!(%err, "window enumeration failed; retrying"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LaunchError::LauncherStartTimeout {
                    title: launcher.matcher.pattern.clone(),
                    waited_secs: self.focus_timeout.as_secs(),
                });
            }
            sleep(self.focus_poll).await;
        }
    }

    /// Always runs once the mode was applied. Every step is best-effort;
    /// a failing step is logged and the remaining steps still execute.
    async fn teardown(&mut self, guard: &mut ModeGuard) {
        info!("tearing down session");
        let groups = ProcessGroupController::new(self.platform.processes.clone());

        groups.kill_group(&self.config.background).await;
        groups.launch_group(&self.config.session_end).await;

        if self.config.kill_host {
            groups.kill_names(&self.config.host_kill).await;
        } else {
            debug!("leaving stream host running (--keep-host)");
        }

        if let Err(err) = guard.restore().await {
            warn!(%err, "failed to restore the original display mode");
        }

        if self.config.sleep_on_exit {
            if let Err(err) = self.platform.power.suspend().await {
                warn!(%err, "failed to suspend the system");
            }
        }
    }

    fn detector(&self) -> TerminationDetector {
        TerminationDetector::new(
            WindowLocator::new(self.platform.windows.clone()),
            self.platform.processes.clone(),
            self.platform.signal.clone(),
            self.confirm.clone(),
            self.intervals,
        )
    }

    fn watch_target(&self, launcher: &LauncherSpec) -> WatchTarget {
        WatchTarget {
            matcher: launcher.matcher.clone(),
            process_name: launcher.executable_name().unwrap_or_default(),
            mutex_name: self.config.mutex_name.clone(),
        }
    }
}
