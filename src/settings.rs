//! System settings store access.
//!
//! The daemon only ever reads one boolean key and observes it for changes.
//! [`FileSettingsStore`] keeps one file per key inside a directory and uses
//! inotify (through `notify`) to deliver change callbacks.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, info, warn};
use notify::{
    Event, EventHandler, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher,
};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::task_manager::TaskManager;

/// Default directory of the file backed settings store.
pub const DEFAULT_SETTINGS_DIR: &str = "/data/system/night_dimd";

/// Change notification handler. Carries no payload; the handler reads the
/// current value itself.
pub type ChangeCallback = Box<dyn FnMut() + Send + 'static>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("setting '{key}' has malformed value '{value}'")]
    Malformed { key: String, value: String },

    #[error("failed to read setting '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Persistent, observable key-value store for system settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads `key` as a flag that is set when its integer value is `1`.
    fn read_bool(&self, key: &str) -> Result<bool, SettingsError>;

    /// Registers `callback` to run on every change of `key`.
    ///
    /// Callbacks are delivered one at a time, in change order, from a task
    /// spawned on `task_manager`. Duplicate deliveries are possible.
    async fn observe(
        &self,
        key: &str,
        callback: ChangeCallback,
        task_manager: &mut TaskManager,
    ) -> anyhow::Result<()>;
}

/// Settings store keeping each key in its own file under `root`.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    root: PathBuf,
}

impl FileSettingsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, SettingsError> {
    let value = raw.trim();
    value
        .parse::<i64>()
        .map(|v| v == 1)
        .map_err(|_| SettingsError::Malformed {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    fn read_bool(&self, key: &str) -> Result<bool, SettingsError> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(raw) => parse_flag(key, &raw),
            // An unset key reads as its default.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SettingsError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn observe(
        &self,
        key: &str,
        callback: ChangeCallback,
        task_manager: &mut TaskManager,
    ) -> anyhow::Result<()> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut watcher = recommended_watcher(ForwardingHandler { sender: event_tx })?;

        // Watch the directory so atomic replacements of the key file are seen.
        watcher.watch(&self.root, RecursiveMode::NonRecursive)?;
        info!("Observing setting '{key}' in {}", self.root.display());

        let key_path = self.key_path(key);
        task_manager
            .spawn_task(format!("SettingsObserver[{key}]"), move |cancel_token| {
                deliver_changes(watcher, event_rx, key_path, callback, cancel_token)
            })
            .await
    }
}

/// Forwards raw filesystem events from notify's thread into the runtime.
struct ForwardingHandler {
    sender: mpsc::UnboundedSender<notify::Result<Event>>,
}

impl EventHandler for ForwardingHandler {
    fn handle_event(&mut self, event: notify::Result<Event>) {
        if self.sender.send(event).is_err() {
            debug!("Settings delivery loop is gone, dropping filesystem event");
        }
    }
}

/// A removed key reads as its default, so removal is a change too.
fn is_key_change(event: &Event, key_path: &Path) -> bool {
    (event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove())
        && event
            .paths
            .iter()
            .any(|p| p == key_path || p.file_name() == key_path.file_name())
}

async fn deliver_changes(
    watcher: RecommendedWatcher,
    mut event_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    key_path: PathBuf,
    mut callback: ChangeCallback,
    cancel_token: tokio_util::sync::CancellationToken,
) -> anyhow::Result<()> {
    // Dropping the watcher stops notifications, so it lives as long as the loop.
    let _watcher = watcher;

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                debug!("Settings observer for {} cancelled", key_path.display());
                break;
            }

            event = event_rx.recv() => match event {
                Some(Ok(event)) if is_key_change(&event, &key_path) => {
                    debug!("Setting changed: {:?}", event.kind);
                    // Callbacks do blocking sysfs I/O; keep them off the runtime workers.
                    callback = tokio::task::spawn_blocking(move || {
                        callback();
                        callback
                    })
                    .await?;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => warn!("Settings watcher error: {e}"),
                None => {
                    warn!("Settings event channel closed");
                    break;
                }
            },
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::{sleep, timeout};

    const KEY: &str = "night_display_activated";

    #[test]
    fn missing_key_reads_as_false() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path());
        assert!(!store.read_bool(KEY).unwrap());
    }

    #[test]
    fn only_one_is_true() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path());

        let cases = [
            ("1", true),
            ("1\n", true),
            ("0\n", false),
            ("2", false),
            ("-1", false),
        ];
        for (raw, expected) in cases {
            fs::write(dir.path().join(KEY), raw).unwrap();
            assert_eq!(store.read_bool(KEY).unwrap(), expected, "value {raw:?}");
        }
    }

    #[test]
    fn garbage_is_malformed() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KEY), "on\n").unwrap();

        let err = FileSettingsStore::new(dir.path()).read_bool(KEY).unwrap_err();
        match err {
            SettingsError::Malformed { key, value } => {
                assert_eq!(key, KEY);
                assert_eq!(value, "on");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn unreadable_key_is_io_error() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the key file cannot be read as text.
        fs::create_dir(dir.path().join(KEY)).unwrap();

        let err = FileSettingsStore::new(dir.path()).read_bool(KEY).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn key_change_filter() {
        let key_path = PathBuf::from("/data/system/night_dimd").join(KEY);
        let other = PathBuf::from("/data/system/night_dimd/screen_brightness");

        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(key_path.clone());
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(key_path.clone());
        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path(key_path.clone());
        let unrelated = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(other);

        assert!(is_key_change(&modify, &key_path));
        assert!(is_key_change(&create, &key_path));
        assert!(is_key_change(&remove, &key_path));
        assert!(!is_key_change(&unrelated, &key_path));
    }

    #[tokio::test]
    async fn observe_delivers_callback_on_write() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path());
        let mut task_manager = TaskManager::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store
            .observe(
                KEY,
                Box::new(move || {
                    let _ = tx.send(());
                }),
                &mut task_manager,
            )
            .await
            .unwrap();
        assert_eq!(task_manager.active_count(), 1);

        sleep(Duration::from_millis(200)).await;
        fs::write(dir.path().join(KEY), "1\n").unwrap();

        let delivered = timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(delivered, Ok(Some(()))), "no change callback delivered");
        assert!(store.read_bool(KEY).unwrap());

        task_manager.shutdown_all().await.unwrap();
        assert_eq!(task_manager.active_count(), 0);
    }

    #[tokio::test]
    async fn observe_delivers_callback_on_removal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(KEY), "1\n").unwrap();
        let store = FileSettingsStore::new(dir.path());
        let mut task_manager = TaskManager::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store
            .observe(
                KEY,
                Box::new(move || {
                    let _ = tx.send(());
                }),
                &mut task_manager,
            )
            .await
            .unwrap();

        sleep(Duration::from_millis(200)).await;
        fs::remove_file(dir.path().join(KEY)).unwrap();

        let delivered = timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(delivered, Ok(Some(()))), "no callback for removed key");
        assert!(!store.read_bool(KEY).unwrap());

        task_manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn observe_ignores_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path());
        let mut task_manager = TaskManager::new();

        let (tx, mut rx) = mpsc::unbounded_channel();
        store
            .observe(
                KEY,
                Box::new(move || {
                    let _ = tx.send(());
                }),
                &mut task_manager,
            )
            .await
            .unwrap();

        sleep(Duration::from_millis(200)).await;
        fs::write(dir.path().join("screen_brightness"), "128\n").unwrap();

        let delivered = timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(delivered.is_err(), "callback fired for an unrelated key");

        task_manager.shutdown_all().await.unwrap();
    }

    #[tokio::test]
    async fn observe_fails_for_missing_directory() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path().join("absent"));
        let mut task_manager = TaskManager::new();

        let result = store.observe(KEY, Box::new(|| {}), &mut task_manager).await;
        assert!(result.is_err());
        assert_eq!(task_manager.active_count(), 0);
    }
}
