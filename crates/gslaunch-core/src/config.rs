use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{executable_name, DisplayMode, ProcessEntry, TitleMatcher};

/// How the end of the launcher session is detected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseWatch {
    /// Poll until the launcher window disappears.
    WindowClose,
    /// Poll until the launcher executable leaves the process set.
    #[default]
    ProcessExit,
    /// Wait on the named session primitive until the launcher releases it.
    MutexHandshake,
    /// Block on an explicit human acknowledgment.
    ManualConfirm,
}

/// The primary launcher application for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSpec {
    /// `None` is the disabled sentinel: nothing is launched and the
    /// orchestrator blocks on manual confirmation instead.
    pub path: Option<PathBuf>,
    pub matcher: TitleMatcher,
    pub close_watch: CloseWatch,
    /// Process names force-killed before the launcher starts, so a family
    /// member already running in a different mode cannot shadow the fresh
    /// instance.
    pub prelaunch_kill: Vec<String>,
    pub maximize: bool,
}

impl LauncherSpec {
    pub fn disabled() -> Self {
        Self {
            path: None,
            matcher: TitleMatcher::substring(""),
            close_watch: CloseWatch::ManualConfirm,
            prelaunch_kill: Vec::new(),
            maximize: false,
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.path.is_none()
    }

    pub fn executable_name(&self) -> Option<String> {
        self.path.as_deref().and_then(executable_name)
    }

    /// Launchers whose file name advertises a full-screen mode manage their
    /// own window size; maximizing them fights their startup sequence.
    pub fn starts_fullscreen(&self) -> bool {
        self.executable_name()
            .map(|name| name.to_lowercase().contains("fullscreen"))
            .unwrap_or(false)
    }

    /// Whether the focus step should maximize the window.
    pub fn wants_maximize(&self) -> bool {
        self.maximize && !self.starts_fullscreen()
    }
}

/// Fully resolved configuration for one session run.
#[derive(Debug, Clone, PartialEq, Builder)]
#[builder(setter(into, strip_option))]
pub struct SessionConfig {
    pub launcher: LauncherSpec,
    #[builder(default)]
    pub background: Vec<ProcessEntry>,
    #[builder(default)]
    pub session_start: Vec<ProcessEntry>,
    #[builder(default)]
    pub session_end: Vec<ProcessEntry>,
    pub target: DisplayMode,
    /// Explicit display selector; `None` resolves to the display at (0, 0).
    #[builder(default)]
    pub display: Option<String>,
    /// Name of the session primitive for the mutex handshake.
    #[builder(default = "default_mutex_name()")]
    pub mutex_name: String,
    /// Stream-host process names killed at teardown.
    #[builder(default = "default_host_kill()")]
    pub host_kill: Vec<String>,
    /// Cleared by `--keep-host` to leave the stream host running.
    #[builder(default = "true")]
    pub kill_host: bool,
    /// Set by `--no-restore` to leave the applied mode in place at exit.
    #[builder(default)]
    pub skip_restore: bool,
    #[builder(default)]
    pub debug: bool,
    #[builder(default)]
    pub sleep_on_exit: bool,
}

impl SessionConfig {
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

pub fn default_mutex_name() -> String {
    "GameStreamLaunchpadSession".to_string()
}

pub fn default_host_kill() -> Vec<String> {
    vec!["nvstreamer.exe".to_string()]
}

/// Expand environment variables in a configured path.
///
/// Supports the Windows `%NAME%` form used by the on-disk config as well as
/// Unix `$NAME` and `${NAME}`. Unset variables are left verbatim.
pub fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '%' => {
                if let Some(end) = input[idx + 1..].find('%') {
                    let name = &input[idx + 1..idx + 1 + end];
                    if !name.is_empty() {
                        if let Ok(value) = std::env::var(name) {
                            out.push_str(&value);
                        } else {
                            out.push('%');
                            out.push_str(name);
                            out.push('%');
                        }
                        // Skip past the closing '%'.
                        for _ in 0..name.chars().count() + 1 {
                            chars.next();
                        }
                        continue;
                    }
                }
                out.push('%');
            }
            '$' => {
                let braced = matches!(chars.peek(), Some((_, '{')));
                if braced {
                    chars.next();
                }
                let mut name = String::new();
                while let Some((_, c)) = chars.peek().copied() {
                    let part_of_name = if braced {
                        c != '}'
                    } else {
                        c.is_ascii_alphanumeric() || c == '_'
                    };
                    if !part_of_name {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                if braced {
                    chars.next();
                }
                if name.is_empty() {
                    out.push('$');
                } else if let Ok(value) = std::env::var(&name) {
                    out.push_str(&value);
                } else if braced {
                    out.push_str(&format!("${{{name}}}"));
                } else {
                    out.push('$');
                    out.push_str(&name);
                }
            }
            _ => out.push(ch),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProcessCategory;

    #[test]
    fn test_expand_windows_style() {
        std::env::set_var("GSLAUNCH_LOCALAPPDATA", r"C:\Users\host\AppData\Local");
        assert_eq!(
            expand_env_vars(r"%GSLAUNCH_LOCALAPPDATA%\Playnite\Playnite.FullscreenApp.exe"),
            r"C:\Users\host\AppData\Local\Playnite\Playnite.FullscreenApp.exe"
        );
    }

    #[test]
    fn test_expand_unix_style() {
        std::env::set_var("GSLAUNCH_HOME", "/home/host");
        assert_eq!(expand_env_vars("$GSLAUNCH_HOME/bin/tool"), "/home/host/bin/tool");
        assert_eq!(
            expand_env_vars("${GSLAUNCH_HOME}/bin/tool"),
            "/home/host/bin/tool"
        );
    }

    #[test]
    fn test_unset_vars_left_verbatim() {
        std::env::remove_var("GSLAUNCH_MISSING");
        assert_eq!(
            expand_env_vars("%GSLAUNCH_MISSING%/x"),
            "%GSLAUNCH_MISSING%/x"
        );
        assert_eq!(expand_env_vars("$GSLAUNCH_MISSING/x"), "$GSLAUNCH_MISSING/x");
    }

    #[test]
    fn test_literal_text_untouched() {
        assert_eq!(
            expand_env_vars(r"C:\Program Files (x86)\JoyToKey\JoyToKey.exe"),
            r"C:\Program Files (x86)\JoyToKey\JoyToKey.exe"
        );
        assert_eq!(expand_env_vars("100%"), "100%");
    }

    #[test]
    fn test_fullscreen_launcher_skips_maximize() {
        let spec = LauncherSpec {
            path: Some(PathBuf::from(r"C:\Playnite\Playnite.FullscreenApp.exe")),
            matcher: TitleMatcher::substring("playnite"),
            close_watch: CloseWatch::ProcessExit,
            prelaunch_kill: Vec::new(),
            maximize: true,
        };
        assert!(spec.starts_fullscreen());
        assert!(!spec.wants_maximize());

        let desktop = LauncherSpec {
            path: Some(PathBuf::from(r"C:\Playnite\Playnite.DesktopApp.exe")),
            ..spec
        };
        assert!(!desktop.starts_fullscreen());
        assert!(desktop.wants_maximize());
    }

    #[test]
    fn test_disabled_sentinel() {
        let spec = LauncherSpec::disabled();
        assert!(spec.is_disabled());
        assert_eq!(spec.executable_name(), None);
    }

    #[test]
    fn test_builder_defaults() {
        let config = SessionConfig::builder()
            .launcher(LauncherSpec::disabled())
            .target(DisplayMode::new(1920, 1080))
            .background(vec![ProcessEntry::new(
                "/usr/bin/overlay",
                ProcessCategory::Background,
            )])
            .build()
            .unwrap();
        assert!(config.kill_host);
        assert!(!config.skip_restore);
        assert_eq!(config.host_kill, vec!["nvstreamer.exe".to_string()]);
        assert_eq!(config.mutex_name, "GameStreamLaunchpadSession");
    }
}
