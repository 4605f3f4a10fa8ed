//! Windows implementation of the gslaunch platform primitives.
//!
//! Display modes go through `ChangeDisplaySettingsExW`, windows through the
//! `EnumWindows`/`SetForegroundWindow` family, process control through
//! sysinfo plus `taskkill`, and the session handshake through a named
//! mutex.

#[cfg(windows)]
mod display;
#[cfg(windows)]
mod power;
#[cfg(windows)]
mod registry;
#[cfg(windows)]
mod signal;
#[cfg(windows)]
mod window;

#[cfg(windows)]
pub use display::WindowsDisplayControl;
#[cfg(windows)]
pub use power::WindowsPowerControl;
#[cfg(windows)]
pub use registry::WindowsProcessRegistry;
#[cfg(windows)]
pub use signal::NamedMutexSessionSignal;
#[cfg(windows)]
pub use window::Win32WindowSystem;

/// Assemble the full Windows platform bundle.
#[cfg(windows)]
pub fn windows_platform() -> gslaunch_core::Platform {
    use std::sync::Arc;

    gslaunch_core::Platform::new(
        Arc::new(WindowsDisplayControl::new()),
        Arc::new(WindowsProcessRegistry::new()),
        Arc::new(Win32WindowSystem::new()),
        Arc::new(NamedMutexSessionSignal),
        Arc::new(WindowsPowerControl),
    )
}
