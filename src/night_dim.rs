//! Night dim mirroring: keeps the panel's `night_dim` node in sync with the
//! night display setting.
//!
//! [`NightDimWatcher::start`] detects the panel topology once, registers a
//! change callback for [`NIGHT_DISPLAY_ACTIVATED`] and applies the current
//! value immediately. Every later change notification runs one more apply
//! cycle with the topology detected at startup. Failures end the current
//! cycle only.

use std::{
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, OnceLock, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{error, info, warn};
use thiserror::Error;

use crate::{
    capability::{self, CapabilityRegistry, PanelTopology},
    settings::{ChangeCallback, SettingsStore},
    sysfs::{Filesystem, SkipReason, SysfsWriter, WriteOutcome},
    task_manager::TaskManager,
};

/// Settings key holding the night display flag.
pub const NIGHT_DISPLAY_ACTIVATED: &str = "night_display_activated";

/// Night dim control node of the main panel.
pub const PANEL_NODE: &str = "/sys/class/lcd/panel/night_dim";

/// Night dim control node used on foldables.
pub const FOLDABLE_PANEL_NODE: &str = "/sys/class/lcd/panel1/night_dim";

/// The two candidate control nodes, one per topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelNodes {
    pub single: PathBuf,
    pub dual: PathBuf,
}

impl PanelNodes {
    /// The node to write for `topology`. There is no fallback to the other one.
    pub fn for_topology(&self, topology: PanelTopology) -> &Path {
        match topology {
            PanelTopology::Single => &self.single,
            PanelTopology::Dual => &self.dual,
        }
    }
}

impl Default for PanelNodes {
    fn default() -> Self {
        Self {
            single: PathBuf::from(PANEL_NODE),
            dual: PathBuf::from(FOLDABLE_PANEL_NODE),
        }
    }
}

/// Result of one apply cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Written { path: PathBuf, enabled: bool },
    MissingTarget { path: PathBuf, reason: SkipReason },
    WriteFailure { path: PathBuf },
    SettingUnavailable,
    NotStarted,
}

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("night dim watcher already started")]
    AlreadyStarted,
}

/// Mirrors the night display setting onto the night dim node.
///
/// Cheap to clone; clones share the detected topology.
pub struct NightDimWatcher<F: Filesystem> {
    inner: Arc<Inner<F>>,
}

impl<F: Filesystem> Clone for NightDimWatcher<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<F: Filesystem> {
    registry: Box<dyn CapabilityRegistry>,
    store: Arc<dyn SettingsStore>,
    writer: SysfsWriter<F>,
    nodes: PanelNodes,
    started: AtomicBool,
    topology: OnceLock<PanelTopology>,
    // Serializes apply cycles so the last read value is the last one written.
    apply_lock: Mutex<()>,
}

impl<F: Filesystem + 'static> NightDimWatcher<F> {
    pub fn new(
        registry: Box<dyn CapabilityRegistry>,
        store: Arc<dyn SettingsStore>,
        fs: F,
        nodes: PanelNodes,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                store,
                writer: SysfsWriter::new(fs),
                nodes,
                started: AtomicBool::new(false),
                topology: OnceLock::new(),
                apply_lock: Mutex::new(()),
            }),
        }
    }

    /// Detected topology, or `None` before startup.
    pub fn topology(&self) -> Option<PanelTopology> {
        self.inner.topology.get().copied()
    }

    /// Detects the topology, starts observing the setting and applies it once.
    ///
    /// Only the first call has any effect. A failure to register the observer
    /// is logged and the initial apply still happens. The initial apply runs
    /// on the blocking pool and is serialized with change callbacks, so a
    /// change delivered during startup is never overwritten by a stale value.
    pub async fn start(
        &self,
        task_manager: &mut TaskManager,
    ) -> Result<PanelTopology, WatcherError> {
        let topology = self.inner.detect_once()?;

        let inner = Arc::clone(&self.inner);
        let callback: ChangeCallback = Box::new(move || {
            inner.apply();
        });
        if let Err(e) = self
            .inner
            .store
            .observe(NIGHT_DISPLAY_ACTIVATED, callback, task_manager)
            .await
        {
            error!(
                "Failed to observe '{NIGHT_DISPLAY_ACTIVATED}', \
                 later changes will not be mirrored: {e:#}"
            );
        }

        let inner = Arc::clone(&self.inner);
        if let Err(e) = tokio::task::spawn_blocking(move || inner.apply()).await {
            error!("Initial night dim apply did not complete: {e}");
        }
        Ok(topology)
    }

    /// Detects the topology and applies the setting once, without observing.
    pub fn run_once(&self) -> Result<ApplyOutcome, WatcherError> {
        self.inner.detect_once()?;
        Ok(self.inner.apply())
    }

    /// Runs one apply cycle with the topology detected at startup.
    pub fn apply(&self) -> ApplyOutcome {
        self.inner.apply()
    }
}

impl<F: Filesystem> Inner<F> {
    fn detect_once(&self) -> Result<PanelTopology, WatcherError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(WatcherError::AlreadyStarted);
        }

        let topology = capability::detect(self.registry.as_ref());
        info!("Device panel topology: {topology}");
        Ok(*self.topology.get_or_init(|| topology))
    }

    fn apply(&self) -> ApplyOutcome {
        let Some(&topology) = self.topology.get() else {
            warn!("Night dim apply requested before startup, ignoring");
            return ApplyOutcome::NotStarted;
        };

        let _guard = self.apply_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let enabled = match self.store.read_bool(NIGHT_DISPLAY_ACTIVATED) {
            Ok(enabled) => enabled,
            Err(e) => {
                error!("Skipping night dim update: {e}");
                return ApplyOutcome::SettingUnavailable;
            }
        };

        let path = self.nodes.for_topology(topology);
        let value = if enabled { "1" } else { "0" };

        match self.writer.write(path, value) {
            Ok(WriteOutcome::Written) => {
                info!("Applied night dim {value} to {topology} node {}", path.display());
                ApplyOutcome::Written {
                    path: path.to_path_buf(),
                    enabled,
                }
            }
            Ok(WriteOutcome::Skipped(reason)) => {
                warn!("Night dim node {} {reason}, skipping write", path.display());
                ApplyOutcome::MissingTarget {
                    path: path.to_path_buf(),
                    reason,
                }
            }
            Err(e) => {
                error!("{e}");
                ApplyOutcome::WriteFailure {
                    path: path.to_path_buf(),
                }
            }
        }
    }
}
