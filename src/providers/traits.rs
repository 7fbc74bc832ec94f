use anyhow::Result;
use async_trait::async_trait;

use crate::task_manager::TaskManager;

/// A unit of daemon functionality started by the coordinator.
///
/// Services are started in descending [`priority`](ServiceProvider::priority)
/// order. A critical service that fails to start aborts startup; any other
/// failure is logged and the daemon keeps running.
///
/// # Example
///
/// ```no_run
/// use night_dimd::providers::traits::ServiceProvider;
/// use night_dimd::task_manager::TaskManager;
/// use anyhow::Result;
///
/// struct Heartbeat;
///
/// #[async_trait::async_trait]
/// impl ServiceProvider for Heartbeat {
///     async fn start(&self, task_manager: &mut TaskManager) -> Result<()> {
///         task_manager.spawn_task("heartbeat".to_string(), |token| async move {
///             token.cancelled().await;
///             Ok(())
///         }).await
///     }
///
///     fn name(&self) -> &'static str { "Heartbeat" }
/// }
/// ```
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// Starts the service, spawning any long-lived work on `task_manager`.
    async fn start(&self, task_manager: &mut TaskManager) -> Result<()>;

    fn name(&self) -> &'static str;

    /// Startup priority; higher starts first.
    fn priority(&self) -> i32 {
        0
    }

    fn is_critical(&self) -> bool {
        false
    }
}
