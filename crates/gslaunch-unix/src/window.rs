use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use gslaunch_core::{LaunchError, ShowCommand, WindowHandle, WindowSystem};

/// Window enumeration and focus through `wmctrl`, cursor parking through
/// `xdotool`.
pub struct WmctrlWindowSystem;

impl WmctrlWindowSystem {
    pub fn new() -> Self {
        Self
    }

    async fn wmctrl(&self, args: &[String]) -> Result<String, LaunchError> {
        let output = Command::new("wmctrl").args(args).output().await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "wmctrl {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for WmctrlWindowSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowSystem for WmctrlWindowSystem {
    async fn enumerate_windows(&self) -> Result<Vec<(WindowHandle, String)>, LaunchError> {
        let listing = self.wmctrl(&["-l".to_string()]).await?;
        Ok(parse_window_list(&listing))
    }

    async fn focus(&self, handle: WindowHandle) -> Result<(), LaunchError> {
        self.wmctrl(&[
            "-i".to_string(),
            "-a".to_string(),
            format!("{:#x}", handle.0),
        ])
        .await?;
        Ok(())
    }

    async fn show(&self, handle: WindowHandle, command: ShowCommand) -> Result<(), LaunchError> {
        match command {
            // Activation through `focus` already raises the window.
            ShowCommand::Show => Ok(()),
            ShowCommand::Maximize => {
                self.wmctrl(&[
                    "-i".to_string(),
                    "-r".to_string(),
                    format!("{:#x}", handle.0),
                    "-b".to_string(),
                    "add,maximized_vert,maximized_horz".to_string(),
                ])
                .await?;
                Ok(())
            }
        }
    }

    async fn park_cursor(&self) -> Result<(), LaunchError> {
        let output = Command::new("xdotool")
            .args(["mousemove", "9999", "9999"])
            .output()
            .await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "xdotool mousemove failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        debug!("parked cursor in the bottom-right corner");
        Ok(())
    }

    async fn minimize_all(&self) -> Result<(), LaunchError> {
        self.wmctrl(&["-k".to_string(), "on".to_string()]).await?;
        Ok(())
    }
}

/// Parse `wmctrl -l` output: `0x04a00007  0 hostname Window Title ...`.
fn parse_window_list(listing: &str) -> Vec<(WindowHandle, String)> {
    listing.lines().filter_map(parse_window_line).collect()
}

fn parse_window_line(line: &str) -> Option<(WindowHandle, String)> {
    let (id_field, rest) = line.trim_start().split_once(char::is_whitespace)?;
    let id = u64::from_str_radix(id_field.trim_start_matches("0x"), 16).ok()?;
    // Desktop number, then host name, then the title.
    let (_desktop, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let title = match rest.trim_start().split_once(char::is_whitespace) {
        Some((_host, title)) => title,
        None => "",
    };
    Some((WindowHandle(id), title.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_list() {
        let listing = "\
0x04a00007  0 host Playnite
0x03c00003 -1 host xfce4-panel
0x05600001  1 host Firefox - Mozilla Firefox
";
        let windows = parse_window_list(listing);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0], (WindowHandle(0x04a00007), "Playnite".to_string()));
        assert_eq!(
            windows[2],
            (
                WindowHandle(0x05600001),
                "Firefox - Mozilla Firefox".to_string()
            )
        );
    }

    #[test]
    fn test_parse_window_list_skips_garbage() {
        assert!(parse_window_list("not a window line\n").is_empty());
        assert!(parse_window_list("").is_empty());
    }
}
