use async_trait::async_trait;
use tracing::info;
use windows::core::PCWSTR;
use windows::Win32::Graphics::Gdi::{
    ChangeDisplaySettingsExW, EnumDisplayDevicesW, EnumDisplaySettingsW, CDS_SET_PRIMARY,
    CDS_TYPE, CDS_UPDATEREGISTRY, DEVMODEW, DISPLAY_DEVICEW, DISP_CHANGE_SUCCESSFUL,
    DM_DISPLAYFREQUENCY, DM_PELSHEIGHT, DM_PELSWIDTH, DM_POSITION, ENUM_CURRENT_SETTINGS,
};

use gslaunch_core::{DisplayControl, DisplayDescriptor, DisplayMode, LaunchError};

const DISPLAY_DEVICE_ATTACHED_TO_DESKTOP: u32 = 0x0000_0001;
const DISPLAY_DEVICE_PRIMARY_DEVICE: u32 = 0x0000_0004;

/// Display control through the Win32 display-settings API.
pub struct WindowsDisplayControl;

impl WindowsDisplayControl {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsDisplayControl {
    fn default() -> Self {
        Self::new()
    }
}

fn wide(value: &str) -> Vec<u16> {
    value.encode_utf16().chain(std::iter::once(0)).collect()
}

fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}

fn read_devmode(device: &str) -> Result<DEVMODEW, LaunchError> {
    let name = wide(device);
    let mut devmode = DEVMODEW {
        dmSize: std::mem::size_of::<DEVMODEW>() as u16,
        ..Default::default()
    };
    let ok = unsafe {
        EnumDisplaySettingsW(PCWSTR(name.as_ptr()), ENUM_CURRENT_SETTINGS, &mut devmode)
    };
    if !ok.as_bool() {
        return Err(LaunchError::DisplayNotFound(device.to_string()));
    }
    Ok(devmode)
}

#[async_trait]
impl DisplayControl for WindowsDisplayControl {
    async fn enumerate(&self) -> Result<Vec<DisplayDescriptor>, LaunchError> {
        let mut displays = Vec::new();
        let mut index = 0u32;
        loop {
            let mut device = DISPLAY_DEVICEW {
                cb: std::mem::size_of::<DISPLAY_DEVICEW>() as u32,
                ..Default::default()
            };
            let ok = unsafe { EnumDisplayDevicesW(PCWSTR::null(), index, &mut device, 0) };
            if !ok.as_bool() {
                break;
            }
            index += 1;

            if device.StateFlags & DISPLAY_DEVICE_ATTACHED_TO_DESKTOP == 0 {
                continue;
            }
            let id = from_wide(&device.DeviceName);
            let devmode = read_devmode(&id)?;
            let position = unsafe {
                let point = devmode.Anonymous1.Anonymous2.dmPosition;
                (point.x, point.y)
            };
            displays.push(DisplayDescriptor {
                name: from_wide(&device.DeviceString),
                id,
                position,
                primary: device.StateFlags & DISPLAY_DEVICE_PRIMARY_DEVICE != 0,
            });
        }
        Ok(displays)
    }

    async fn current_mode(&self, display: &DisplayDescriptor) -> Result<DisplayMode, LaunchError> {
        let devmode = read_devmode(&display.id)?;
        let position = unsafe {
            let point = devmode.Anonymous1.Anonymous2.dmPosition;
            (point.x, point.y)
        };
        Ok(DisplayMode {
            width: devmode.dmPelsWidth,
            height: devmode.dmPelsHeight,
            refresh_rate: (devmode.dmDisplayFrequency > 1).then_some(devmode.dmDisplayFrequency),
            position,
        })
    }

    async fn set_mode(
        &self,
        display: &DisplayDescriptor,
        mode: &DisplayMode,
        make_primary: bool,
    ) -> Result<(), LaunchError> {
        let mut devmode = DEVMODEW {
            dmSize: std::mem::size_of::<DEVMODEW>() as u16,
            dmPelsWidth: mode.width,
            dmPelsHeight: mode.height,
            dmFields: DM_PELSWIDTH | DM_PELSHEIGHT | DM_POSITION,
            ..Default::default()
        };
        devmode.Anonymous1.Anonymous2.dmPosition.x = mode.position.0;
        devmode.Anonymous1.Anonymous2.dmPosition.y = mode.position.1;
        if let Some(rate) = mode.refresh_rate {
            devmode.dmDisplayFrequency = rate;
            devmode.dmFields |= DM_DISPLAYFREQUENCY;
        }

        let mut flags = CDS_UPDATEREGISTRY;
        if make_primary {
            flags |= CDS_SET_PRIMARY;
        }

        let name = wide(&display.id);
        let result = unsafe {
            ChangeDisplaySettingsExW(
                PCWSTR(name.as_ptr()),
                Some(&devmode),
                None,
                flags,
                None,
            )
        };
        if result != DISP_CHANGE_SUCCESSFUL {
            return Err(LaunchError::ModeChange {
                width: mode.width,
                height: mode.height,
                reason: format!("ChangeDisplaySettingsExW returned {}", result.0),
            });
        }
        info!(device = %display.id, mode = %mode, "applied display mode");
        Ok(())
    }

    async fn restore_default(&self, display: &DisplayDescriptor) -> Result<(), LaunchError> {
        // A null DEVMODE reapplies the mode persisted in the registry.
        let name = wide(&display.id);
        let result = unsafe {
            ChangeDisplaySettingsExW(
                PCWSTR(name.as_ptr()),
                None,
                None,
                CDS_TYPE(0),
                None,
            )
        };
        if result != DISP_CHANGE_SUCCESSFUL {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "failed to restore default mode for {}: ChangeDisplaySettingsExW returned {}",
                display.id,
                result.0
            )));
        }
        Ok(())
    }
}
