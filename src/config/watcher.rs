//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself: editors and
//! config management tools usually replace the file through a rename, which
//! would silently detach a watch placed on the old inode.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::ProxyConfig;

/// Sends a freshly validated [`ProxyConfig`] every time the file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ProxyConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ProxyConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Dropping the returned handle stops the watch.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = watch_dir(&self.path);
        let file_name = self.path.file_name().map(OsString::from);
        let path = self.path;
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            {
                let path = path.clone();
                move |res: notify::Result<Event>| match res {
                    Ok(event) if touches_file(&event, file_name.as_deref()) => reload(&path, &tx),
                    Ok(_) => {}
                    Err(e) => tracing::error!(path = %path.display(), error = %e, "Config watch error"),
                }
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` wrote or created the watched file.
fn touches_file(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let writes = event.kind.is_modify() || event.kind.is_create();
    writes && file_name.is_some() && event.paths.iter().any(|p| p.file_name() == file_name)
}

/// Load `path` and forward it. Rejected files leave the running config in place.
fn reload(path: &Path, tx: &mpsc::UnboundedSender<ProxyConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config file changed, reloading");
            if tx.send(config).is_err() {
                tracing::debug!(path = %path.display(), "Config receiver closed, update dropped");
            }
        }
        Err(ConfigError::Validation(errors)) => {
            for error in &errors {
                tracing::error!(path = %path.display(), error = %error, "Reloaded config failed validation");
            }
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Failed to reload config, keeping current configuration");
        }
    }
}
