//! # night_dimd
//!
//! A device daemon that mirrors the night display setting onto the display
//! panel's `night_dim` sysfs node.
//!
//! ## Features
//!
//! - **Panel detection**: foldables are recognised once at startup by the
//!   presence of a fold-state sensor, and the secondary panel node is used
//! - **Event-driven**: the settings store is observed through inotify and
//!   every change is written to the panel
//! - **Tolerant**: a missing or read-only node skips the write and the daemon
//!   keeps running
//! - **Fingerprint touch area**: the under-display sensor rectangle is
//!   programmed into the touchscreen controller at boot
//!
//! ## Architecture
//!
//! - [`NightDimWatcher`](night_dim::NightDimWatcher) - detection, observation and apply cycles
//! - [`SysfsWriter`](sysfs::SysfsWriter) / [`SysfsReader`](sysfs::SysfsReader) - guarded
//!   access to control nodes
//! - [`SettingsStore`](settings::SettingsStore) /
//!   [`CapabilityRegistry`](capability::CapabilityRegistry) - external collaborators
//! - [`SecTspCommandManager`](tsp::SecTspCommandManager) - touchscreen command channel
//! - [`FodRect`](udfps::FodRect) - fingerprint touch rectangle geometry
//! - [`SystemCoordinator`](coordinator::SystemCoordinator) - service lifecycle and shutdown
//!
//! ## Example
//!
//! ```no_run
//! use night_dimd::{application::Application, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Application::builder()
//!         .with_config(Config::default())
//!         .build()?
//!         .run()
//!         .await
//! }
//! ```

pub mod application;
pub mod capability;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod night_dim;
pub mod providers;
pub mod settings;
pub mod sysfs;
pub mod task_manager;
pub mod tsp;
pub mod udfps;
