//! Named background tasks sharing one cancellation tree.

use std::{future::Future, time::Duration};

use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Host context for long-lived work such as settings change delivery.
///
/// Every task gets a child of [`TaskManager::global_token`]; cancelling the
/// global token (directly or through [`TaskManager::shutdown_all`]) stops all
/// of them.
pub struct TaskManager {
    tasks: Vec<(String, JoinHandle<Result<()>>)>,
    pub global_token: CancellationToken,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            global_token: CancellationToken::new(),
        }
    }

    /// Spawns `task_fn` on the runtime under `name`.
    pub async fn spawn_task<F, Fut>(&mut self, name: String, task_fn: F) -> Result<()>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.global_token.is_cancelled() {
            return Err(anyhow!("cannot spawn '{name}': task manager is shutting down"));
        }

        let token = self.global_token.child_token();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            debug!("Task '{task_name}' running");
            let result = task_fn(token).await;
            match &result {
                Ok(()) => debug!("Task '{task_name}' finished"),
                Err(e) => error!("Task '{task_name}' failed: {e:#}"),
            }
            result
        });

        info!("Task '{name}' spawned");
        self.tasks.push((name, handle));
        Ok(())
    }

    /// Cancels every task and waits for each one, up to a fixed timeout.
    ///
    /// All tasks are awaited even when some fail; the first failure is
    /// returned.
    pub async fn shutdown_all(&mut self) -> Result<()> {
        info!("Stopping {} task(s)", self.tasks.len());
        self.global_token.cancel();

        let mut first_error = None;
        for (name, handle) in self.tasks.drain(..) {
            let error = match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(Ok(()))) => continue,
                Ok(Ok(Err(e))) => e.context(format!("task '{name}' failed")),
                Ok(Err(join_error)) => anyhow!("task '{name}' panicked: {join_error}"),
                Err(_) => anyhow!("task '{name}' did not stop within {SHUTDOWN_TIMEOUT:?}"),
            };
            warn!("{error:#}");
            if first_error.is_none() {
                first_error = Some(error);
            }
        }

        match first_error {
            Some(error) => Err(error).context("one or more tasks failed during shutdown"),
            None => {
                info!("All tasks stopped");
                Ok(())
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.tasks
            .iter()
            .any(|(task, handle)| task == name && !handle.is_finished())
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}
