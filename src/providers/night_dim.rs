use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

use crate::{
    capability::SensorDirectoryRegistry,
    config::Config,
    night_dim::{ApplyOutcome, NightDimWatcher},
    providers::traits::ServiceProvider,
    settings::FileSettingsStore,
    sysfs::SysFs,
    task_manager::TaskManager,
};

/// Night dim mirroring service.
///
/// Wires the sensor directory registry, the file backed settings store and
/// the real sysfs into a [`NightDimWatcher`]. The service is not critical:
/// a device without the night dim node keeps the rest of the daemon alive.
///
/// # Priority and Criticality
///
/// - **Priority**: 10
/// - **Critical**: No
pub struct NightDimServiceProvider {
    config: Arc<Config>,
}

impl NightDimServiceProvider {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    fn watcher(&self) -> NightDimWatcher<SysFs> {
        NightDimWatcher::new(
            Box::new(SensorDirectoryRegistry::new(&self.config.sensors_dir)),
            Arc::new(FileSettingsStore::new(&self.config.settings_dir)),
            SysFs,
            self.config.nodes.clone(),
        )
    }

    /// Runs a single detect + apply cycle without observing the setting.
    pub fn apply_once(&self) -> Result<ApplyOutcome> {
        let outcome = self.watcher().run_once()?;
        info!("One-shot night dim apply finished: {outcome:?}");
        Ok(outcome)
    }
}

#[async_trait]
impl ServiceProvider for NightDimServiceProvider {
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
        info!(
            "Starting night dim watcher (settings: {}, sensors: {})",
            self.config.settings_dir.display(),
            self.config.sensors_dir.display()
        );

        self.watcher()
            .start(task_manager)
            .await
            .context("Failed to start night dim watcher")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NightDimService"
    }

    fn priority(&self) -> i32 {
        10
    }
}
