use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;

use crate::{
    providers::traits::ServiceProvider, task_manager::TaskManager, tsp::SecTspCommandManager,
};

/// Touchscreen command service.
///
/// Checks at startup that the controller's command nodes answer and logs the
/// commands it supports. The manager itself is shared with the services that
/// issue commands.
///
/// # Priority and Criticality
///
/// - **Priority**: 8
/// - **Critical**: No
pub struct SecTspServiceProvider {
    tsp: Arc<SecTspCommandManager>,
}

impl SecTspServiceProvider {
    pub fn new(tsp: Arc<SecTspCommandManager>) -> Self {
        Self { tsp }
    }
}

#[async_trait]
impl ServiceProvider for SecTspServiceProvider {
    async fn start(&self, _task_manager: &mut TaskManager) -> Result<()> {
        let tsp = Arc::clone(&self.tsp);
        let commands = tokio::task::spawn_blocking(move || tsp.available_commands())
            .await?
            .with_context(|| {
                format!("Touchscreen controller at {} unavailable", self.tsp.root().display())
            })?;

        info!(
            "Touchscreen controller supports {} command(s): {}",
            commands.len(),
            commands.join(", ")
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "SecTspService"
    }

    fn priority(&self) -> i32 {
        8
    }
}
