use async_trait::async_trait;
use tracing::{info, warn};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, ERROR_FILE_NOT_FOUND, WAIT_ABANDONED, WAIT_OBJECT_0};
use windows::Win32::System::Threading::{
    OpenMutexW, ReleaseMutex, WaitForSingleObject, INFINITE,
};

use gslaunch_core::{LaunchError, SessionSignal, SignalWaiter};

// SYNCHRONIZE | MUTEX_MODIFY_STATE: enough to wait on and release the mutex.
const MUTEX_ACCESS: u32 = 0x0010_0000 | 0x0000_0001;

/// Session handshake over a named Win32 mutex created by the launcher.
pub struct NamedMutexSessionSignal;

#[async_trait]
impl SessionSignal for NamedMutexSessionSignal {
    async fn try_open(&self, name: &str) -> Result<Option<Box<dyn SignalWaiter>>, LaunchError> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let handle = unsafe { OpenMutexW(MUTEX_ACCESS, false, PCWSTR(wide.as_ptr())) };
        match handle {
            Ok(handle) => Ok(Some(Box::new(NamedMutexWaiter {
                raw: handle.0 as isize,
                name: name.to_string(),
            }))),
            Err(err) if err.code() == ERROR_FILE_NOT_FOUND.to_hresult() => Ok(None),
            Err(err) => Err(LaunchError::Other(anyhow::anyhow!(
                "OpenMutexW({name}) failed: {err}"
            ))),
        }
    }
}

struct NamedMutexWaiter {
    raw: isize,
    name: String,
}

#[async_trait]
impl SignalWaiter for NamedMutexWaiter {
    async fn wait_released(self: Box<Self>) -> Result<(), LaunchError> {
        let raw = self.raw;
        let name = self.name;
        info!(name, "waiting for session mutex to be released");
        tokio::task::spawn_blocking(move || {
            use windows::Win32::Foundation::HANDLE;
            let handle = HANDLE(raw as *mut std::ffi::c_void);
            let wait = unsafe { WaitForSingleObject(handle, INFINITE) };
            // WAIT_ABANDONED means the launcher exited while holding the
            // mutex, which also ends the session.
            if wait != WAIT_OBJECT_0 && wait != WAIT_ABANDONED {
                warn!(name, event = wait.0, "unexpected wait result on session mutex");
            }
            unsafe {
                if let Err(err) = ReleaseMutex(handle) {
                    warn!(name, %err, "failed to release session mutex");
                }
                if let Err(err) = CloseHandle(handle) {
                    warn!(name, %err, "failed to close session mutex handle");
                }
            }
        })
        .await
        .map_err(|err| LaunchError::Other(anyhow::anyhow!("mutex wait task failed: {err}")))?;
        Ok(())
    }
}
