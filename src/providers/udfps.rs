use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};

use crate::{
    config::Config,
    providers::traits::ServiceProvider,
    sysfs::{Filesystem, ReadOutcome, SysfsReader},
    task_manager::TaskManager,
    tsp::SecTspCommandManager,
    udfps::{FodRect, SET_FOD_RECT, SensorArea},
};

/// Under-display fingerprint service.
///
/// Reads the sensor placement published by the fingerprint driver and
/// programs the matching touch rectangle into the touchscreen controller,
/// once at startup. The panel geometry is not discoverable from sysfs, so
/// nothing is sent unless it is configured.
///
/// # Priority and Criticality
///
/// - **Priority**: 6 (after the touchscreen service)
/// - **Critical**: No
#[derive(Clone)]
pub struct UdfpsServiceProvider {
    config: Arc<Config>,
    tsp: Arc<SecTspCommandManager>,
    fs: Arc<dyn Filesystem>,
}

impl UdfpsServiceProvider {
    pub fn new(
        config: Arc<Config>,
        tsp: Arc<SecTspCommandManager>,
        fs: Arc<dyn Filesystem>,
    ) -> Self {
        Self { config, tsp, fs }
    }

    /// Sensor placement from the driver, or the built-in defaults when the
    /// attribute is missing or malformed.
    pub fn sensor_area(&self) -> SensorArea {
        let path = &self.config.fingerprint_position;
        let raw = match SysfsReader::new(Arc::clone(&self.fs)).read(path) {
            Ok(ReadOutcome::Read(raw)) => raw,
            Ok(ReadOutcome::Skipped(reason)) => {
                warn!("Fingerprint position {} {reason}, using defaults", path.display());
                return SensorArea::default();
            }
            Err(e) => {
                warn!("{e}, using default fingerprint position");
                return SensorArea::default();
            }
        };

        match raw.parse() {
            Ok(area) => area,
            Err(e) => {
                warn!("Ignoring fingerprint position '{raw}': {e}");
                SensorArea::default()
            }
        }
    }

    /// Computes the touch rectangle and sends it to the touchscreen.
    ///
    /// Returns `None` when no display geometry is configured.
    pub fn program_fod_rect(&self) -> Result<Option<FodRect>> {
        let area = self.sensor_area();
        info!("Fingerprint sensor area: {area}");

        let Some(display) = self.config.display else {
            info!("Display geometry not configured, not programming the fingerprint rectangle");
            return Ok(None);
        };

        if !self.tsp.supports(SET_FOD_RECT) {
            warn!("Touchscreen does not list '{SET_FOD_RECT}', sending it anyway");
        }

        let rect = FodRect::compute(&area, &display);
        let command = rect.command();
        let result = self
            .tsp
            .execute(&command)
            .with_context(|| format!("Failed to send '{command}'"))?;
        info!("Programmed fingerprint rectangle {rect:?}, controller answered '{result}'");
        Ok(Some(rect))
    }
}

#[async_trait]
impl ServiceProvider for UdfpsServiceProvider {
    async fn start(&self, _task_manager: &mut TaskManager) -> Result<()> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.program_fod_rect()).await??;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "UdfpsService"
    }

    fn priority(&self) -> i32 {
        6
    }
}
