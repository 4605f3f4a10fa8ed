//! In-memory fakes of the platform primitives.
//!
//! Every fake records the calls it receives so tests can assert on the
//! orchestration sequence without touching a real display, process table,
//! or window manager.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gslaunch_core::{
    DisplayControl, DisplayDescriptor, DisplayMode, LaunchError, Platform, PowerControl,
    ProcessAccessError, ProcessRegistry, SessionSignal, ShowCommand, SignalWaiter, WindowHandle,
    WindowSystem,
};

use crate::watch::Confirmation;

/// One primary display whose mode can be read back and scripted to reject
/// changes.
pub struct FakeDisplayControl {
    inner: Mutex<DisplayState>,
}

struct DisplayState {
    descriptor: DisplayDescriptor,
    current: DisplayMode,
    reject_changes: bool,
    applied: Vec<DisplayMode>,
}

impl FakeDisplayControl {
    pub fn single(current: DisplayMode) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(DisplayState {
                descriptor: DisplayDescriptor {
                    id: "FAKE-1".into(),
                    name: "Fake Display".into(),
                    position: (0, 0),
                    primary: true,
                },
                current,
                reject_changes: false,
                applied: Vec::new(),
            }),
        })
    }

    /// Make every subsequent `set_mode` fail, as a display rejecting the
    /// requested mode would.
    pub fn reject_changes(&self) {
        self.inner.lock().unwrap().reject_changes = true;
    }

    pub fn current(&self) -> DisplayMode {
        self.inner.lock().unwrap().current
    }

    /// Every mode passed to `set_mode`, in order.
    pub fn applied_modes(&self) -> Vec<DisplayMode> {
        self.inner.lock().unwrap().applied.clone()
    }
}

#[async_trait]
impl DisplayControl for FakeDisplayControl {
    async fn enumerate(&self) -> Result<Vec<DisplayDescriptor>, LaunchError> {
        Ok(vec![self.inner.lock().unwrap().descriptor.clone()])
    }

    async fn current_mode(&self, display: &DisplayDescriptor) -> Result<DisplayMode, LaunchError> {
        let state = self.inner.lock().unwrap();
        if display.id != state.descriptor.id {
            return Err(LaunchError::DisplayNotFound(display.id.clone()));
        }
        Ok(state.current)
    }

    async fn set_mode(
        &self,
        display: &DisplayDescriptor,
        mode: &DisplayMode,
        _make_primary: bool,
    ) -> Result<(), LaunchError> {
        let mut state = self.inner.lock().unwrap();
        if display.id != state.descriptor.id {
            return Err(LaunchError::DisplayNotFound(display.id.clone()));
        }
        if state.reject_changes {
            return Err(LaunchError::ModeChange {
                width: mode.width,
                height: mode.height,
                reason: "rejected by fake display".into(),
            });
        }
        state.current = *mode;
        state.applied.push(*mode);
        Ok(())
    }

    async fn restore_default(&self, _display: &DisplayDescriptor) -> Result<(), LaunchError> {
        Ok(())
    }
}

/// A scriptable process table. `spawn` adds the executable name to the
/// running set; `kill_by_name` removes it. A name can be scheduled to
/// vanish on its own after a number of snapshots, for exit-detection
/// tests.
pub struct FakeProcessRegistry {
    inner: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    running: Vec<Result<String, ProcessAccessError>>,
    spawned: Vec<PathBuf>,
    kills: Vec<String>,
    snapshots: usize,
    vanish: Option<(String, usize)>,
}

impl FakeProcessRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(RegistryState::default()),
        })
    }

    pub fn insert_running(&self, name: &str) {
        self.inner.lock().unwrap().running.push(Ok(name.to_string()));
    }

    pub fn insert_inaccessible(&self, pid: u32) {
        self.inner
            .lock()
            .unwrap()
            .running
            .push(Err(ProcessAccessError::AccessDenied(pid)));
    }

    /// Remove `name` from the running set after it has been observed in
    /// `snapshots` more snapshots.
    pub fn vanish_after(&self, name: &str, snapshots: usize) {
        let mut state = self.inner.lock().unwrap();
        let at = state.snapshots + snapshots;
        state.vanish = Some((name.to_string(), at));
    }

    pub fn spawned(&self) -> Vec<PathBuf> {
        self.inner.lock().unwrap().spawned.clone()
    }

    pub fn kills(&self) -> Vec<String> {
        self.inner.lock().unwrap().kills.clone()
    }

    pub fn snapshots(&self) -> usize {
        self.inner.lock().unwrap().snapshots
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.inner
            .lock()
            .unwrap()
            .running
            .iter()
            .any(|entry| matches!(entry, Ok(n) if n.eq_ignore_ascii_case(name)))
    }
}

#[async_trait]
impl ProcessRegistry for FakeProcessRegistry {
    async fn running_names(&self) -> Result<Vec<Result<String, ProcessAccessError>>, LaunchError> {
        let mut state = self.inner.lock().unwrap();
        state.snapshots += 1;
        if let Some((name, at)) = state.vanish.clone() {
            if state.snapshots > at {
                state
                    .running
                    .retain(|entry| !matches!(entry, Ok(n) if n.eq_ignore_ascii_case(&name)));
                state.vanish = None;
            }
        }
        Ok(state.running.clone())
    }

    async fn kill_by_name(&self, name: &str) -> Result<u32, LaunchError> {
        let mut state = self.inner.lock().unwrap();
        state.kills.push(name.to_string());
        let before = state.running.len();
        state
            .running
            .retain(|entry| !matches!(entry, Ok(n) if n.eq_ignore_ascii_case(name)));
        Ok((before - state.running.len()) as u32)
    }

    async fn spawn(&self, path: &Path) -> Result<(), LaunchError> {
        let mut state = self.inner.lock().unwrap();
        state.spawned.push(path.to_path_buf());
        if let Some(name) = path.file_name() {
            state.running.push(Ok(name.to_string_lossy().into_owned()));
        }
        Ok(())
    }
}

/// A window list scripted as a sequence of frames. Each enumeration pass
/// consumes one frame; the last frame repeats forever.
pub struct FakeWindowSystem {
    inner: Mutex<WindowState>,
}

#[derive(Default)]
struct WindowState {
    frames: VecDeque<Vec<(WindowHandle, String)>>,
    enumerations: usize,
    focused: Vec<WindowHandle>,
    shown: Vec<(WindowHandle, ShowCommand)>,
    cursor_parks: usize,
    minimize_alls: usize,
}

impl FakeWindowSystem {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(WindowState::default()),
        })
    }

    /// Script the window list over time. The final frame is sticky.
    pub fn script_frames(&self, frames: Vec<Vec<(WindowHandle, String)>>) {
        self.inner.lock().unwrap().frames = frames.into();
    }

    pub fn enumerations(&self) -> usize {
        self.inner.lock().unwrap().enumerations
    }

    pub fn focused(&self) -> Vec<WindowHandle> {
        self.inner.lock().unwrap().focused.clone()
    }

    pub fn shown(&self) -> Vec<(WindowHandle, ShowCommand)> {
        self.inner.lock().unwrap().shown.clone()
    }

    pub fn cursor_parks(&self) -> usize {
        self.inner.lock().unwrap().cursor_parks
    }

    pub fn minimize_alls(&self) -> usize {
        self.inner.lock().unwrap().minimize_alls
    }
}

#[async_trait]
impl WindowSystem for FakeWindowSystem {
    async fn enumerate_windows(&self) -> Result<Vec<(WindowHandle, String)>, LaunchError> {
        let mut state = self.inner.lock().unwrap();
        state.enumerations += 1;
        let frame = if state.frames.len() > 1 {
            state.frames.pop_front().unwrap()
        } else {
            state.frames.front().cloned().unwrap_or_default()
        };
        Ok(frame)
    }

    async fn focus(&self, handle: WindowHandle) -> Result<(), LaunchError> {
        self.inner.lock().unwrap().focused.push(handle);
        Ok(())
    }

    async fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), LaunchError> {
        self.inner.lock().unwrap().shown.push((handle, command));
        Ok(())
    }

    async fn park_cursor(&self) -> Result<(), LaunchError> {
        self.inner.lock().unwrap().cursor_parks += 1;
        Ok(())
    }

    async fn minimize_all(&self) -> Result<(), LaunchError> {
        self.inner.lock().unwrap().minimize_alls += 1;
        Ok(())
    }
}

/// A session primitive that appears after a configurable number of open
/// attempts and whose wait completes immediately.
pub struct FakeSessionSignal {
    inner: Mutex<SignalState>,
}

#[derive(Default)]
struct SignalState {
    attempts_before_present: usize,
    attempts: usize,
    waits: Arc<Mutex<usize>>,
}

impl FakeSessionSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(SignalState::default()),
        })
    }

    /// The primitive does not exist for the first `attempts` open calls.
    pub fn present_after(&self, attempts: usize) {
        self.inner.lock().unwrap().attempts_before_present = attempts;
    }

    pub fn attempts(&self) -> usize {
        self.inner.lock().unwrap().attempts
    }

    pub fn waits(&self) -> usize {
        *self.inner.lock().unwrap().waits.lock().unwrap()
    }
}

#[async_trait]
impl SessionSignal for FakeSessionSignal {
    async fn try_open(&self, _name: &str) -> Result<Option<Box<dyn SignalWaiter>>, LaunchError> {
        let mut state = self.inner.lock().unwrap();
        state.attempts += 1;
        if state.attempts <= state.attempts_before_present {
            return Ok(None);
        }
        Ok(Some(Box::new(FakeSignalWaiter {
            waits: state.waits.clone(),
        })))
    }
}

struct FakeSignalWaiter {
    waits: Arc<Mutex<usize>>,
}

#[async_trait]
impl SignalWaiter for FakeSignalWaiter {
    async fn wait_released(self: Box<Self>) -> Result<(), LaunchError> {
        *self.waits.lock().unwrap() += 1;
        Ok(())
    }
}

/// Confirmation source that acknowledges immediately and records prompts.
pub struct FakeConfirmation {
    prompts: Mutex<Vec<String>>,
}

impl FakeConfirmation {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Confirmation for FakeConfirmation {
    async fn acknowledge(&self, prompt: &str) -> Result<(), LaunchError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(())
    }
}

/// Suspend-call counter.
pub struct FakePowerControl {
    suspends: Mutex<usize>,
}

impl FakePowerControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            suspends: Mutex::new(0),
        })
    }

    pub fn suspends(&self) -> usize {
        *self.suspends.lock().unwrap()
    }
}

#[async_trait]
impl PowerControl for FakePowerControl {
    async fn suspend(&self) -> Result<(), LaunchError> {
        *self.suspends.lock().unwrap() += 1;
        Ok(())
    }
}

/// The full fake platform, with every fake accessible for assertions.
pub struct FakePlatform {
    pub display: Arc<FakeDisplayControl>,
    pub processes: Arc<FakeProcessRegistry>,
    pub windows: Arc<FakeWindowSystem>,
    pub signal: Arc<FakeSessionSignal>,
    pub power: Arc<FakePowerControl>,
    pub confirm: Arc<FakeConfirmation>,
}

impl FakePlatform {
    pub fn new(current_mode: DisplayMode) -> Self {
        Self {
            display: FakeDisplayControl::single(current_mode),
            processes: FakeProcessRegistry::new(),
            windows: FakeWindowSystem::new(),
            signal: FakeSessionSignal::new(),
            power: FakePowerControl::new(),
            confirm: FakeConfirmation::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform::new(
            self.display.clone(),
            self.processes.clone(),
            self.windows.clone(),
            self.signal.clone(),
            self.power.clone(),
        )
    }
}
