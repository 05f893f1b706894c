use crate::schema::Config;
use arc_swap::ArcSwap;
use std::{path::PathBuf, sync::Arc};

/// Watches a configuration file and swaps in a fresh [`Config`] whenever it
/// changes. Readers never block: each request takes its own snapshot.
pub struct ConfigWatcher {
    current: Arc<ArcSwap<Config>>,
    path: PathBuf,
}

impl ConfigWatcher {
    /// Loads the initial configuration (file + environment) immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the configuration cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn new(path: PathBuf) -> Result<Self, figment::Error> {
        let config = Config::load(Some(&path))?;
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(config)),
            path,
        })
    }

    /// Returns a snapshot of the current configuration.
    #[must_use]
    pub fn load(&self) -> arc_swap::Guard<Arc<Config>> {
        self.current.load()
    }

    /// Returns the shared handle stored in the proxy's `AppState`.
    #[must_use]
    pub fn arc(&self) -> Arc<ArcSwap<Config>> {
        Arc::clone(&self.current)
    }

    /// Re-reads the file. On error the previous snapshot stays in place.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the configuration cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn reload(&self) -> Result<(), figment::Error> {
        let new_config = Config::load(Some(&self.path))?;
        self.current.store(Arc::new(new_config));
        Ok(())
    }

    /// Spawns a blocking task that reloads the configuration on every file
    /// event. Watcher setup failures are logged and disable hot reload.
    pub fn watch(self: Arc<Self>) {
        use notify::{RecursiveMode, Watcher as _};

        tokio::task::spawn_blocking(move || {
            let (tx, rx) = std::sync::mpsc::channel();
            let mut watcher =
                match notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
                    if res.is_ok() {
                        let _ = tx.send(());
                    }
                }) {
                    Ok(w) => w,
                    Err(e) => {
                        tracing::warn!(error = %e, "cannot create config watcher, hot reload disabled");
                        return;
                    }
                };

            if let Err(e) = watcher.watch(&self.path, RecursiveMode::NonRecursive) {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot watch config file");
                return;
            }

            for () in rx {
                match self.reload() {
                    Ok(()) => tracing::info!(path = %self.path.display(), "config reloaded"),
                    Err(e) => tracing::warn!(error = %e, "config reload failed, keeping previous"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(path: &std::path::Path, content: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_watcher_initial_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write_config(&path, "port: 9999\n");
        let watcher = ConfigWatcher::new(path).unwrap();
        assert_eq!(watcher.load().port, 9999);
    }

    #[test]
    fn test_watcher_reload_picks_up_new_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write_config(&path, "access:\n  codes:\n    abc: null\n");
        let watcher = ConfigWatcher::new(path.clone()).unwrap();
        assert!(watcher.load().access.codes.contains_key("abc"));

        write_config(&path, "access:\n  codes:\n    xyz: null\n");
        watcher.reload().unwrap();
        let snapshot = watcher.load();
        assert!(snapshot.access.codes.contains_key("xyz"));
        assert!(!snapshot.access.codes.contains_key("abc"));
    }

    #[test]
    fn test_watcher_reload_error_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write_config(&path, "port: 8317\n");
        let watcher = ConfigWatcher::new(path.clone()).unwrap();

        write_config(&path, "port: [not a port\n");
        assert!(watcher.reload().is_err());
        assert_eq!(watcher.load().port, 8317);
    }

    #[test]
    fn test_watcher_arc_shared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        write_config(&path, "port: 1111\n");
        let watcher = ConfigWatcher::new(path).unwrap();
        let arc = watcher.arc();
        assert_eq!(arc.load().port, 1111);
    }
}
