use clap::Parser;
use std::path::PathBuf;

/// night_dimd: mirrors the night display setting onto the panel night dim node
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Detach from the terminal and run in the background
    #[arg(short = 'd', long = "daemonize", default_value = "false")]
    pub daemonize: bool,

    /// Settings store directory (default: /data/system/night_dimd)
    #[arg(long = "settings-dir", env = "NIGHT_DIMD_SETTINGS_DIR")]
    pub settings_dir: Option<PathBuf>,

    /// Sensor class directory used for panel detection (default: /sys/class/sensors)
    #[arg(long = "sensors-dir", env = "NIGHT_DIMD_SENSORS_DIR")]
    pub sensors_dir: Option<PathBuf>,

    /// Night dim node of the main panel
    #[arg(long = "panel-node")]
    pub panel_node: Option<PathBuf>,

    /// Night dim node used on foldables
    #[arg(long = "foldable-panel-node")]
    pub foldable_panel_node: Option<PathBuf>,

    /// Touchscreen controller class directory (default: /sys/class/sec/tsp)
    #[arg(long = "tsp-dir", env = "NIGHT_DIMD_TSP_DIR")]
    pub tsp_dir: Option<PathBuf>,

    /// Fingerprint sensor position attribute
    #[arg(long = "fingerprint-position")]
    pub fingerprint_position: Option<PathBuf>,

    /// Panel resolution as WIDTHxHEIGHT, used for the fingerprint touch area
    #[arg(long = "display-size", value_parser = parse_display_size)]
    pub display_size: Option<DisplaySize>,

    /// Horizontal panel density in dots per inch
    #[arg(long = "display-xdpi")]
    pub display_xdpi: Option<f64>,

    /// Apply the current setting once and exit
    #[arg(long = "once")]
    pub once: bool,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Panel resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

fn parse_display_size(s: &str) -> Result<DisplaySize, String> {
    let (width, height) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let dimension = |v: &str| {
        v.trim()
            .parse::<u32>()
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("invalid dimension '{v}'"))
    };

    Ok(DisplaySize {
        width: dimension(width)?,
        height: dimension(height)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_size_parsing() {
        assert_eq!(
            parse_display_size("1080x2340"),
            Ok(DisplaySize {
                width: 1080,
                height: 2340,
            })
        );
        assert!(parse_display_size("1080").is_err());
        assert!(parse_display_size("0x2340").is_err());
        assert!(parse_display_size("widex2340").is_err());
    }

    #[test]
    fn bad_display_size_is_a_usage_error() {
        assert!(Cli::try_parse_from(["night_dimd", "--display-size", "1080*2340"]).is_err());
    }
}
