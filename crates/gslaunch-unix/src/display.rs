use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use gslaunch_core::{DisplayControl, DisplayDescriptor, DisplayMode, LaunchError};

/// Display control through `xrandr`.
pub struct XrandrDisplayControl;

impl XrandrDisplayControl {
    pub fn new() -> Self {
        Self
    }

    async fn query(&self) -> Result<String, LaunchError> {
        let output = Command::new("xrandr").arg("--query").output().await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "xrandr --query failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for XrandrDisplayControl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplayControl for XrandrDisplayControl {
    async fn enumerate(&self) -> Result<Vec<DisplayDescriptor>, LaunchError> {
        let query = self.query().await?;
        Ok(parse_outputs(&query)
            .into_iter()
            .map(|output| output.descriptor)
            .collect())
    }

    async fn current_mode(&self, display: &DisplayDescriptor) -> Result<DisplayMode, LaunchError> {
        let query = self.query().await?;
        parse_outputs(&query)
            .into_iter()
            .find(|output| output.descriptor.id == display.id)
            .map(|output| output.mode)
            .ok_or_else(|| LaunchError::DisplayNotFound(display.id.clone()))
    }

    async fn set_mode(
        &self,
        display: &DisplayDescriptor,
        mode: &DisplayMode,
        make_primary: bool,
    ) -> Result<(), LaunchError> {
        let mut cmd = Command::new("xrandr");
        cmd.arg("--output")
            .arg(&display.id)
            .arg("--mode")
            .arg(format!("{}x{}", mode.width, mode.height))
            .arg("--pos")
            .arg(format!("{}x{}", mode.position.0, mode.position.1));
        if let Some(rate) = mode.refresh_rate {
            cmd.arg("--rate").arg(rate.to_string());
        }
        if make_primary {
            cmd.arg("--primary");
        }

        let output = cmd.output().await?;
        if !output.status.success() {
            return Err(LaunchError::ModeChange {
                width: mode.width,
                height: mode.height,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let display_id = &display.id;
        info!(output = %display_id, mode = %mode, "applied display mode");
        Ok(())
    }

    async fn restore_default(&self, display: &DisplayDescriptor) -> Result<(), LaunchError> {
        let output = Command::new("xrandr")
            .arg("--output")
            .arg(&display.id)
            .arg("--auto")
            .output()
            .await?;
        if !output.status.success() {
            return Err(LaunchError::Other(anyhow::anyhow!(
                "xrandr --auto failed for {}: {}",
                display.id,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

struct ParsedOutput {
    descriptor: DisplayDescriptor,
    mode: DisplayMode,
}

/// Parse the connected outputs of an `xrandr --query` listing.
///
/// Geometry comes from the output header (`1920x1080+0+0`); the active
/// refresh rate from the mode line carrying the `*` marker.
fn parse_outputs(query: &str) -> Vec<ParsedOutput> {
    let mut outputs = Vec::new();
    let mut lines = query.lines().peekable();

    while let Some(line) = lines.next() {
        if line.starts_with(char::is_whitespace) || !line.contains(" connected") {
            continue;
        }
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else { continue };
        // "connected"
        fields.next();
        let mut rest: Vec<&str> = fields.collect();
        let primary = rest.first() == Some(&"primary");
        if primary {
            rest.remove(0);
        }
        let Some(geometry) = rest.first().and_then(|g| parse_geometry(g)) else {
            // Connected but inactive output (no current mode).
            continue;
        };
        let (width, height, x, y) = geometry;

        let mut refresh_rate = None;
        while let Some(mode_line) = lines.peek() {
            if !mode_line.starts_with(char::is_whitespace) {
                break;
            }
            if refresh_rate.is_none() {
                refresh_rate = parse_active_rate(mode_line);
            }
            lines.next();
        }

        outputs.push(ParsedOutput {
            descriptor: DisplayDescriptor {
                id: name.to_string(),
                name: name.to_string(),
                position: (x, y),
                primary,
            },
            mode: DisplayMode {
                width,
                height,
                refresh_rate,
                position: (x, y),
            },
        });
    }

    outputs
}

/// Parse a `WxH+X+Y` geometry field.
fn parse_geometry(field: &str) -> Option<(u32, u32, i32, i32)> {
    let (size, position) = field.split_once('+')?;
    let (width, height) = size.split_once('x')?;
    let (x, y) = position.split_once('+')?;
    Some((
        width.parse().ok()?,
        height.parse().ok()?,
        x.parse().ok()?,
        y.parse().ok()?,
    ))
}

/// Pull the starred (active) rate out of an indented mode line, e.g.
/// `   1920x1080     60.00*+  59.94`.
fn parse_active_rate(line: &str) -> Option<u32> {
    line.split_whitespace()
        .skip(1)
        .find(|rate| rate.contains('*'))
        .and_then(|rate| {
            rate.trim_end_matches(['*', '+'])
                .parse::<f64>()
                .ok()
                .map(|hz| hz.round() as u32)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUERY: &str = "\
Screen 0: minimum 320 x 200, current 3840 x 1080, maximum 16384 x 16384
DP-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+  59.94    50.00
   1280x720      60.00    59.94
HDMI-1 connected 1920x1080+1920+0 (normal left inverted right x axis y axis) 509mm x 286mm
   1920x1080     60.00 +  74.97*
   1680x1050     59.95
DP-2 disconnected (normal left inverted right x axis y axis)
";

    #[test]
    fn test_parse_connected_outputs() {
        let outputs = parse_outputs(QUERY);
        assert_eq!(outputs.len(), 2);

        let first = &outputs[0];
        assert_eq!(first.descriptor.id, "DP-1");
        assert!(first.descriptor.primary);
        assert_eq!(first.descriptor.position, (0, 0));
        assert_eq!(first.mode.width, 1920);
        assert_eq!(first.mode.height, 1080);
        assert_eq!(first.mode.refresh_rate, Some(60));

        let second = &outputs[1];
        assert_eq!(second.descriptor.id, "HDMI-1");
        assert!(!second.descriptor.primary);
        assert_eq!(second.descriptor.position, (1920, 0));
        assert_eq!(second.mode.refresh_rate, Some(75));
    }

    #[test]
    fn test_disconnected_outputs_skipped() {
        let outputs = parse_outputs(QUERY);
        assert!(outputs.iter().all(|o| o.descriptor.id != "DP-2"));
    }

    #[test]
    fn test_parse_geometry() {
        assert_eq!(parse_geometry("1920x1080+0+0"), Some((1920, 1080, 0, 0)));
        assert_eq!(
            parse_geometry("2560x1440+1920+0"),
            Some((2560, 1440, 1920, 0))
        );
        assert_eq!(parse_geometry("garbage"), None);
    }

    #[test]
    fn test_inactive_connected_output_skipped() {
        let query = "eDP-1 connected (normal left inverted right x axis y axis)\n   1920x1080  60.00\n";
        assert!(parse_outputs(query).is_empty());
    }
}
