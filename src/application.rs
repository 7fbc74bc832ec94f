//! Application entry point and builder.

use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::{config::Config, coordinator::SystemCoordinator, providers::NightDimServiceProvider};

/// Top-level runner holding the coordinator for the process lifetime.
///
/// # Example
///
/// ```no_run
/// use night_dimd::{application::Application, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let mut app = Application::builder()
///     .with_config(Config::default())
///     .build()?;
///
/// app.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Application {
    pub coordinator: SystemCoordinator,
    config: Arc<Config>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Starts all services and runs until a termination signal arrives.
    ///
    /// With `once` set, applies the setting a single time and returns.
    pub async fn run(&mut self) -> Result<()> {
        if self.config.once {
            NightDimServiceProvider::new(self.config.clone()).apply_once()?;
            return Ok(());
        }

        self.coordinator.initialize(self.config.clone());
        self.coordinator.start_all_services().await?;
        self.coordinator.run_main_loop().await
    }
}

pub struct ApplicationBuilder {
    config: Option<Config>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Application> {
        let config = self
            .config
            .ok_or_else(|| anyhow!("Configuration is required"))?;

        Ok(Application {
            coordinator: SystemCoordinator::new(),
            config: Arc::new(config),
        })
    }
}
