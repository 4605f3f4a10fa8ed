use std::path::PathBuf;

use clap::Parser;

/// Pin the display to a fixed mode, start the configured programs, focus
/// the launcher, and restore everything once the session ends.
#[derive(Parser, Debug)]
#[command(name = "gslaunch")]
#[command(about = "Session launchpad for GameStream-style remote display hosts")]
#[command(version)]
pub struct Cli {
    /// Session width in pixels
    #[arg(value_name = "WIDTH", required_unless_present = "list_displays")]
    pub width: Option<u32>,

    /// Session height in pixels
    #[arg(value_name = "HEIGHT", required_unless_present = "list_displays")]
    pub height: Option<u32>,

    /// Refresh rate in Hz (defaults to the display's current rate)
    #[arg(short, long, value_name = "HZ")]
    pub refresh_rate: Option<u32>,

    /// Target display (defaults to the display at position 0,0)
    #[arg(short, long, value_name = "NAME")]
    pub display: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = crate::loader::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// List connected displays and exit
    #[arg(long)]
    pub list_displays: bool,

    /// Leave the applied mode in place at exit
    #[arg(long)]
    pub no_restore: bool,

    /// Leave the stream host process running at exit
    #[arg(long)]
    pub keep_host: bool,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_and_height_positional() {
        let cli = Cli::try_parse_from(["gslaunch", "1920", "1080"]).unwrap();
        assert_eq!(cli.width, Some(1920));
        assert_eq!(cli.height, Some(1080));
        assert_eq!(cli.refresh_rate, None);
        assert!(!cli.no_restore);
    }

    #[test]
    fn test_resolution_required_without_list_displays() {
        assert!(Cli::try_parse_from(["gslaunch"]).is_err());
        assert!(Cli::try_parse_from(["gslaunch", "--list-displays"]).is_ok());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "gslaunch",
            "1280",
            "720",
            "--refresh-rate",
            "120",
            "--display",
            "DP-2",
            "--no-restore",
            "--keep-host",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.refresh_rate, Some(120));
        assert_eq!(cli.display.as_deref(), Some("DP-2"));
        assert!(cli.no_restore);
        assert!(cli.keep_host);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_non_numeric_resolution_rejected() {
        assert!(Cli::try_parse_from(["gslaunch", "wide", "1080"]).is_err());
    }
}
