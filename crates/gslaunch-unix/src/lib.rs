//! Unix implementation of the gslaunch platform primitives.
//!
//! Display and window control shell out to the standard X11 session tools
//! (`xrandr`, `wmctrl`, `xdotool`); process enumeration uses sysinfo with
//! signal-based termination; the session handshake is an exclusive lock on
//! a well-known file.

#[cfg(unix)]
mod display;
#[cfg(unix)]
mod power;
#[cfg(unix)]
mod registry;
#[cfg(unix)]
mod signal;
#[cfg(unix)]
mod window;

#[cfg(unix)]
pub use display::XrandrDisplayControl;
#[cfg(unix)]
pub use power::UnixPowerControl;
#[cfg(unix)]
pub use registry::UnixProcessRegistry;
#[cfg(unix)]
pub use signal::FileLockSessionSignal;
#[cfg(unix)]
pub use window::WmctrlWindowSystem;

/// Assemble the full Unix platform bundle.
#[cfg(unix)]
pub fn unix_platform() -> gslaunch_core::Platform {
    use std::sync::Arc;

    gslaunch_core::Platform::new(
        Arc::new(XrandrDisplayControl::new()),
        Arc::new(UnixProcessRegistry::new()),
        Arc::new(WmctrlWindowSystem::new()),
        Arc::new(FileLockSessionSignal::new()),
        Arc::new(UnixPowerControl),
    )
}
