use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use gslaunch_core::{
    default_host_kill, default_mutex_name, CloseWatch, DisplayMode, LaunchError, LauncherSpec,
    MatchMode, ProcessCategory, ProcessEntry, SessionConfig, TitleMatcher,
};

/// Default configuration file, written next to the binary on first run.
pub const DEFAULT_CONFIG_PATH: &str = "gslaunch.toml";

/// Written verbatim when no configuration file exists yet.
pub const DEFAULT_CONFIG: &str = r#"[launcher]
# Path to the launcher application. Set to "disabled" to run the session
# without a launcher and end it with a keypress instead.
path = '%LOCALAPPDATA%\Playnite\Playnite.FullscreenApp.exe'
# Window title to wait for and focus once the launcher is up.
window_title = "playnite"
# "substring" or "prefix"
title_match = "substring"
# How the end of the session is detected:
# "window-close", "process-exit", "mutex-handshake", or "manual-confirm".
close_watch = "process-exit"
# Process names killed before the launcher starts, so a stale instance in
# the wrong mode cannot shadow the fresh one.
prelaunch_kill = ["Playnite.FullscreenApp.exe", "Playnite.DesktopApp.exe"]
maximize = true

[processes]
# Programs started at session begin and killed at session end.
background = ['C:\Program Files (x86)\JoyToKey\JoyToKey.exe']
# One-shot programs run at the session boundaries; never tracked.
session_start = []
session_end = []

[session]
# Name of the synchronization primitive for the mutex-handshake watch.
mutex_name = "GameStreamLaunchpadSession"
# Stream host processes terminated at session end.
host_kill = ["nvstreamer.exe"]
# Keep the console around after the session for error review.
debug = false
# Put the machine to sleep once the session ends.
sleep_on_exit = false
"#;

/// On-disk configuration. Every field has a default so a partial file is
/// valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub launcher: LauncherSection,
    pub processes: ProcessesSection,
    pub session: SessionSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSection {
    pub path: String,
    pub window_title: String,
    pub title_match: MatchMode,
    pub close_watch: CloseWatch,
    pub prelaunch_kill: Vec<String>,
    pub maximize: bool,
}

impl Default for LauncherSection {
    fn default() -> Self {
        Self {
            path: r"%LOCALAPPDATA%\Playnite\Playnite.FullscreenApp.exe".to_string(),
            window_title: "playnite".to_string(),
            title_match: MatchMode::Substring,
            close_watch: CloseWatch::ProcessExit,
            prelaunch_kill: vec![
                "Playnite.FullscreenApp.exe".to_string(),
                "Playnite.DesktopApp.exe".to_string(),
            ],
            maximize: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessesSection {
    pub background: Vec<String>,
    pub session_start: Vec<String>,
    pub session_end: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub mutex_name: String,
    pub host_kill: Vec<String>,
    pub debug: bool,
    pub sleep_on_exit: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            mutex_name: default_mutex_name(),
            host_kill: default_host_kill(),
            debug: false,
            sleep_on_exit: false,
        }
    }
}

/// Command-line values folded into the file configuration.
#[derive(Debug, Clone)]
pub struct Overrides {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: Option<u32>,
    pub display: Option<String>,
    pub skip_restore: bool,
    pub keep_host: bool,
}

/// Load the configuration file, writing the default one first if none
/// exists.
pub fn load_or_create(path: &Path) -> Result<FileConfig, LaunchError> {
    if !path.exists() {
        info!(path = %path.display(), "writing default configuration");
        fs::write(path, DEFAULT_CONFIG)?;
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|err| LaunchError::Configuration(format!("{}: {err}", path.display())))
}

impl FileConfig {
    /// Resolve into the session configuration, applying CLI overrides.
    pub fn resolve(self, overrides: Overrides) -> Result<SessionConfig, LaunchError> {
        let launcher = self.launcher.resolve()?;
        let target = DisplayMode::new(overrides.width, overrides.height)
            .with_refresh_rate(overrides.refresh_rate);

        let config = SessionConfig::builder()
            .launcher(launcher)
            .background(entries(&self.processes.background, ProcessCategory::Background))
            .session_start(entries(
                &self.processes.session_start,
                ProcessCategory::SessionStart,
            ))
            .session_end(entries(&self.processes.session_end, ProcessCategory::SessionEnd))
            .target(target)
            .mutex_name(self.session.mutex_name)
            .host_kill(self.session.host_kill)
            .kill_host(!overrides.keep_host)
            .skip_restore(overrides.skip_restore)
            .debug(self.session.debug)
            .sleep_on_exit(self.session.sleep_on_exit)
            .build()
            .map_err(|err| LaunchError::Configuration(err.to_string()))?;

        Ok(match overrides.display {
            Some(display) => SessionConfig {
                display: Some(display),
                ..config
            },
            None => config,
        })
    }
}

impl LauncherSection {
    fn resolve(self) -> Result<LauncherSpec, LaunchError> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("disabled") {
            return Ok(LauncherSpec::disabled());
        }

        if self.window_title.trim().is_empty() {
            return Err(LaunchError::Configuration(
                "launcher.window_title must not be empty when a launcher is configured".into(),
            ));
        }

        let matcher = TitleMatcher {
            pattern: self.window_title,
            mode: self.title_match,
        };
        Ok(LauncherSpec {
            path: Some(PathBuf::from(gslaunch_core::expand_env_vars(trimmed))),
            matcher,
            close_watch: self.close_watch,
            prelaunch_kill: self.prelaunch_kill,
            maximize: self.maximize,
        })
    }
}

fn entries(paths: &[String], category: ProcessCategory) -> Vec<ProcessEntry> {
    paths
        .iter()
        .map(|path| ProcessEntry::new(path.clone(), category))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> Overrides {
        Overrides {
            width: 1920,
            height: 1080,
            refresh_rate: None,
            display: None,
            skip_restore: false,
            keep_host: false,
        }
    }

    #[test]
    fn test_default_config_parses_to_defaults() {
        let parsed: FileConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(parsed.launcher, LauncherSection::default());
        assert_eq!(parsed.session, SessionSection::default());
        assert_eq!(parsed.processes.background.len(), 1);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gslaunch.toml");

        let first = load_or_create(&path).unwrap();
        assert!(path.exists());
        let second = load_or_create(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: FileConfig = toml::from_str(
            r#"
[launcher]
path = "disabled"
"#,
        )
        .unwrap();
        assert_eq!(config.launcher.path, "disabled");
        assert_eq!(config.launcher.close_watch, CloseWatch::ProcessExit);
        assert_eq!(config.session.host_kill, vec!["nvstreamer.exe".to_string()]);
    }

    #[test]
    fn test_disabled_sentinel_resolves() {
        let mut file = FileConfig::default();
        file.launcher.path = "Disabled".to_string();
        let config = file.resolve(overrides()).unwrap();
        assert!(config.launcher.is_disabled());
    }

    #[test]
    fn test_resolve_applies_cli_overrides() {
        let file = FileConfig::default();
        let config = file
            .resolve(Overrides {
                refresh_rate: Some(120),
                display: Some("DP-2".to_string()),
                skip_restore: true,
                keep_host: true,
                ..overrides()
            })
            .unwrap();

        assert_eq!(config.target, DisplayMode {
            width: 1920,
            height: 1080,
            refresh_rate: Some(120),
            position: (0, 0),
        });
        assert_eq!(config.display.as_deref(), Some("DP-2"));
        assert!(config.skip_restore);
        assert!(!config.kill_host);
        assert_eq!(
            config.launcher.prelaunch_kill,
            vec![
                "Playnite.FullscreenApp.exe".to_string(),
                "Playnite.DesktopApp.exe".to_string()
            ]
        );
    }

    #[test]
    fn test_empty_title_with_launcher_rejected() {
        let mut file = FileConfig::default();
        file.launcher.window_title = "  ".to_string();
        let err = file.resolve(overrides()).unwrap_err();
        assert!(matches!(err, LaunchError::Configuration(_)));
    }

    #[test]
    fn test_bad_close_watch_value_rejected() {
        let result: Result<FileConfig, _> = toml::from_str(
            r#"
[launcher]
close_watch = "coin-flip"
"#,
        );
        assert!(result.is_err());
    }
}
