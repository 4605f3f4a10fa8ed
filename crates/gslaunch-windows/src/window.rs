use async_trait::async_trait;
use tracing::debug;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    keybd_event, KEYBD_EVENT_FLAGS, KEYEVENTF_KEYUP, VK_D, VK_LWIN,
};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GetWindowTextW, IsWindowVisible, SetCursorPos, SetForegroundWindow, ShowWindow,
    SW_MAXIMIZE, SW_SHOW,
};

use gslaunch_core::{LaunchError, ShowCommand, WindowHandle, WindowSystem};

/// Window enumeration and focus through the Win32 window manager.
pub struct Win32WindowSystem;

impl Win32WindowSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Win32WindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

unsafe extern "system" fn enumerate_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let windows = &mut *(lparam.0 as *mut Vec<(WindowHandle, String)>);
    if IsWindowVisible(hwnd).as_bool() {
        let mut buffer = [0u16; 512];
        let len = GetWindowTextW(hwnd, &mut buffer);
        if len > 0 {
            let title = String::from_utf16_lossy(&buffer[..len as usize]);
            windows.push((WindowHandle(hwnd.0 as u64), title));
        }
    }
    BOOL(1)
}

#[async_trait]
impl WindowSystem for Win32WindowSystem {
    async fn enumerate_windows(&self) -> Result<Vec<(WindowHandle, String)>, LaunchError> {
        let mut windows: Vec<(WindowHandle, String)> = Vec::new();
        unsafe {
            EnumWindows(
                Some(enumerate_callback),
                LPARAM(&mut windows as *mut _ as isize),
            )
            .map_err(|err| LaunchError::Other(anyhow::anyhow!("EnumWindows failed: {err}")))?;
        }
        Ok(windows)
    }

    async fn focus(&self, handle: WindowHandle) -> Result<(), LaunchError> {
        let hwnd = HWND(handle.0 as *mut std::ffi::c_void);
        let ok = unsafe { SetForegroundWindow(hwnd) };
        if !ok.as_bool() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "SetForegroundWindow refused window {:#x}",
                handle.0
            )));
        }
        Ok(())
    }

    async fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), LaunchError> {
        let hwnd = HWND(handle.0 as *mut std::ffi::c_void);
        let mode = match command {
            ShowCommand::Show => SW_SHOW,
            ShowCommand::Maximize => SW_MAXIMIZE,
        };
        unsafe {
            let _ = ShowWindow(hwnd, mode);
        }
        Ok(())
    }

    async fn park_cursor(&self) -> Result<(), LaunchError> {
        unsafe {
            SetCursorPos(9999, 9999)
                .map_err(|err| LaunchError::Other(anyhow::anyhow!("SetCursorPos failed: {err}")))?;
        }
        debug!("parked cursor in the bottom-right corner");
        Ok(())
    }

    async fn minimize_all(&self) -> Result<(), LaunchError> {
        // Win+D, the same chord a user would press to clear the desktop.
        unsafe {
            keybd_event(VK_LWIN.0 as u8, 0, KEYBD_EVENT_FLAGS(0), 0);
            keybd_event(VK_D.0 as u8, 0, KEYBD_EVENT_FLAGS(0), 0);
            keybd_event(VK_D.0 as u8, 0, KEYEVENTF_KEYUP, 0);
            keybd_event(VK_LWIN.0 as u8, 0, KEYEVENTF_KEYUP, 0);
        }
        Ok(())
    }
}
