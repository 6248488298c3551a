//! Hot reload of the configuration file.
//!
//! # Design Decisions
//! - The parent directory is watched, not the file: editors and ConfigMap
//!   volumes replace the file by rename, which orphans a watch on its inode
//! - Bursts of events are debounced into one reload
//! - A reload whose content equals the last applied content is skipped
//! - Invalid files are logged and dropped; the running rules stay in place

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::GatewayConfig;

/// Quiet period after the last file event before the file is read.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Kubernetes ConfigMap volumes publish updates by swapping this symlink.
const CONFIGMAP_DATA_LINK: &str = "..data";

/// Watches one configuration file and emits every new valid config.
pub struct ConfigWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

/// Live watch. Dropping it stops the watch and its reload task.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    reloader: tokio::task::JoinHandle<()>,
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.reloader.abort();
    }
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            debounce: DEFAULT_DEBOUNCE,
            update_tx,
        };
        (watcher, update_rx)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a Tokio runtime.
    pub fn run(self) -> Result<WatchHandle, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsStr::to_os_string)
            .ok_or_else(|| notify::Error::generic("config path has no file name"))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_reload_trigger(&event.kind) && touches(&event, &file_name) {
                    let _ = trigger_tx.send(());
                }
            }
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let applied = std::fs::read_to_string(&self.path).ok();
        let reloader = tokio::spawn(reload_loop(
            self.path.clone(),
            self.debounce,
            applied,
            trigger_rx,
            self.update_tx,
        ));

        tracing::info!(
            path = %self.path.display(),
            dir = %dir.display(),
            "Config watcher started"
        );
        Ok(WatchHandle {
            _watcher: watcher,
            reloader,
        })
    }
}

/// Content changes and renames onto the file. Metadata and access events
/// (touch, chmod, reads) never reload.
fn is_reload_trigger(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => true,
        EventKind::Modify(ModifyKind::Name(mode)) => {
            matches!(mode, RenameMode::To | RenameMode::Both | RenameMode::Any)
        }
        _ => false,
    }
}

fn touches(event: &Event, file_name: &OsString) -> bool {
    event.paths.iter().any(|p| {
        p.file_name()
            .map(|name| name == file_name.as_os_str() || name == CONFIGMAP_DATA_LINK)
            .unwrap_or(false)
    })
}

async fn reload_loop(
    path: PathBuf,
    debounce: Duration,
    mut applied: Option<String>,
    mut triggers: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GatewayConfig>,
) {
    while triggers.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while triggers.try_recv().is_ok() {}

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                // Mid-replace; the rename-to event triggers another pass.
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Config file unreadable, skipping reload"
                );
                continue;
            }
        };
        if applied.as_deref() == Some(content.as_str()) {
            tracing::debug!(path = %path.display(), "Config content unchanged");
            continue;
        }

        match parse_config(&content) {
            Ok(config) => {
                tracing::info!(
                    path = %path.display(),
                    rules = config.rules.len(),
                    "Config file changed, reloading rules"
                );
                applied = Some(content);
                if updates.send(config).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current rules");
            }
        }
    }
}
