//! Runtime configuration for the night_dimd daemon.
//!
//! There is no configuration file: every value has a compiled-in default
//! that can be overridden from the command line or the environment.

use std::path::PathBuf;

use crate::{
    capability::DEFAULT_SENSORS_DIR,
    cli::Cli,
    night_dim::PanelNodes,
    settings::DEFAULT_SETTINGS_DIR,
    tsp::DEFAULT_TSP_DIR,
    udfps::{DEFAULT_FINGERPRINT_POSITION, DisplayGeometry},
};

/// Effective daemon configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory of the file backed settings store.
    pub settings_dir: PathBuf,

    /// Sensor class directory enumerated for panel detection.
    pub sensors_dir: PathBuf,

    /// Candidate night dim nodes.
    pub nodes: PanelNodes,

    /// Touchscreen controller class directory.
    pub tsp_dir: PathBuf,

    /// Fingerprint sensor position attribute.
    pub fingerprint_position: PathBuf,

    /// Panel geometry for the fingerprint touch rectangle, if known.
    pub display: Option<DisplayGeometry>,

    /// Apply once and exit instead of watching.
    pub once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings_dir: PathBuf::from(DEFAULT_SETTINGS_DIR),
            sensors_dir: PathBuf::from(DEFAULT_SENSORS_DIR),
            nodes: PanelNodes::default(),
            tsp_dir: PathBuf::from(DEFAULT_TSP_DIR),
            fingerprint_position: PathBuf::from(DEFAULT_FINGERPRINT_POSITION),
            display: None,
            once: false,
        }
    }
}

impl Config {
    /// Builds the configuration from parsed command line arguments.
    ///
    /// Unset options keep their compiled-in defaults. The display geometry is
    /// only set when both the size and the density are given.
    pub fn from_cli(cli: &Cli) -> Self {
        let defaults = Self::default();

        Self {
            settings_dir: cli.settings_dir.clone().unwrap_or(defaults.settings_dir),
            sensors_dir: cli.sensors_dir.clone().unwrap_or(defaults.sensors_dir),
            nodes: PanelNodes {
                single: cli.panel_node.clone().unwrap_or(defaults.nodes.single),
                dual: cli
                    .foldable_panel_node
                    .clone()
                    .unwrap_or(defaults.nodes.dual),
            },
            tsp_dir: cli.tsp_dir.clone().unwrap_or(defaults.tsp_dir),
            fingerprint_position: cli
                .fingerprint_position
                .clone()
                .unwrap_or(defaults.fingerprint_position),
            display: cli
                .display_size
                .zip(cli.display_xdpi)
                .map(|(size, xdpi)| DisplayGeometry {
                    width: size.width,
                    height: size.height,
                    xdpi,
                }),
            once: cli.once,
        }
    }
}
