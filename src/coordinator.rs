//! Service lifecycle: registration, ordered startup, signal-driven shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::signal::unix::{SignalKind, signal};

use crate::{
    config::Config,
    providers::{
        NightDimServiceProvider, SecTspServiceProvider, ServiceProvider, UdfpsServiceProvider,
    },
    sysfs::{Filesystem, SysFs},
    task_manager::TaskManager,
    tsp::SecTspCommandManager,
};

/// Owns the task manager and every registered service for the lifetime of
/// the process.
pub struct SystemCoordinator {
    task_manager: TaskManager,
    service_providers: Vec<Box<dyn ServiceProvider>>,
}

impl Default for SystemCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemCoordinator {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            service_providers: Vec::new(),
        }
    }

    /// Registers the daemon's services for `config`.
    ///
    /// The touchscreen services share one command manager.
    pub fn initialize(&mut self, config: Arc<Config>) {
        info!("Initializing SystemCoordinator...");
        let fs: Arc<dyn Filesystem> = Arc::new(SysFs);
        let tsp = Arc::new(SecTspCommandManager::new(Arc::clone(&fs), &config.tsp_dir));

        self.register(Box::new(NightDimServiceProvider::new(Arc::clone(&config))));
        self.register(Box::new(SecTspServiceProvider::new(Arc::clone(&tsp))));
        self.register(Box::new(UdfpsServiceProvider::new(config, tsp, fs)));
    }

    /// Adds a service, keeping the list in descending priority order.
    pub fn register(&mut self, provider: Box<dyn ServiceProvider>) {
        self.service_providers.push(provider);
        self.service_providers
            .sort_by_key(|p| std::cmp::Reverse(p.priority()));
    }

    /// Starts every registered service in priority order.
    ///
    /// Only a critical service failing to start is an error.
    pub async fn start_all_services(&mut self) -> Result<()> {
        info!("Starting {} service(s)...", self.service_providers.len());

        for provider in &self.service_providers {
            match provider.start(&mut self.task_manager).await {
                Ok(()) => info!(
                    "Service '{}' started (priority: {}, critical: {})",
                    provider.name(),
                    provider.priority(),
                    provider.is_critical()
                ),
                Err(e) if provider.is_critical() => {
                    return Err(e).with_context(|| {
                        format!("Critical service '{}' failed to start", provider.name())
                    });
                }
                Err(e) => warn!(
                    "Non-critical service '{}' failed to start: {e:#}",
                    provider.name()
                ),
            }
        }

        Ok(())
    }

    /// Blocks until SIGINT or SIGTERM, then shuts everything down.
    pub async fn run_main_loop(&mut self) -> Result<()> {
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        info!(
            "Running with {} background task(s)",
            self.task_manager.active_count()
        );

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for SIGINT")?;
                info!("Received SIGINT, shutting down...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
            }
        }

        self.shutdown().await;
        Ok(())
    }

    async fn shutdown(&mut self) {
        if let Err(e) = self.task_manager.shutdown_all().await {
            log::error!("Error during task shutdown: {e:#}");
        }
        info!("Shutdown complete");
    }

    pub fn running_services(&self) -> Vec<&'static str> {
        self.service_providers.iter().map(|p| p.name()).collect()
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }
}
