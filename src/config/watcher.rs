//! Hot reload of the configuration file.
//!
//! Editors usually produce several modify events per save; only a parsed,
//! valid configuration that differs from the last one delivered is sent on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::CheckerConfig;

/// Watches one configuration file and delivers validated changes.
pub struct ConfigWatcher {
    path: PathBuf,
    current: CheckerConfig,
    update_tx: mpsc::UnboundedSender<CheckerConfig>,
}

impl ConfigWatcher {
    /// `current` is the configuration already in effect.
    pub fn new(path: &Path, current: CheckerConfig) -> (Self, mpsc::UnboundedReceiver<CheckerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Reloads stop when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut current,
            update_tx,
        } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    if let Some(config) = reload(&path, &mut current) {
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watched, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and return it if valid and different from `current`.
fn reload(path: &Path, current: &mut CheckerConfig) -> Option<CheckerConfig> {
    match load_config(path) {
        Ok(config) if config == *current => {
            tracing::debug!(path = ?path, "Config file touched without changes");
            None
        }
        Ok(config) => {
            tracing::info!(path = ?path, endpoints = config.endpoints.len(), "Config file changed");
            *current = config.clone();
            Some(config)
        }
        Err(e) => {
            tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current configuration");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(file: &mut tempfile::NamedTempFile, content: &str) {
        let f = file.as_file_mut();
        f.set_len(0).unwrap();
        std::io::Seek::rewind(f).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
    }

    #[test]
    fn test_reload_only_delivers_changes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write(&mut file, "[[endpoints]]\nhost = \"a\"\nport = 80\n");
        let mut current = load_config(file.path()).unwrap();

        assert!(reload(file.path(), &mut current).is_none());

        write(&mut file, "[[endpoints]]\nhost = \"a\"\nport = 81\n");
        let changed = reload(file.path(), &mut current).unwrap();
        assert_eq!(changed.endpoints[0].port, 81);
        assert_eq!(current, changed);
    }

    #[test]
    fn test_invalid_reload_keeps_current() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write(&mut file, "[[endpoints]]\nhost = \"a\"\nport = 80\n");
        let mut current = load_config(file.path()).unwrap();

        write(&mut file, "[health_check]\nhealthy_threshold = 0\n");
        assert!(reload(file.path(), &mut current).is_none());
        assert_eq!(current.endpoints[0].port, 80);
    }
}
