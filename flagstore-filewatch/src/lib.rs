//! Flagstore Filewatch - Reload Trigger
//!
//! Watches a set of data files and invokes a reload callback whenever one of
//! them changes, so a file-backed store can refresh itself. Each file's
//! containing directory is resolved through symlinks and missing files are
//! tolerated: the file is picked up when it appears. Change detection polls
//! (mtime, size) fingerprints of the resolved paths, which also coalesces a
//! burst of changes into a single reload.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// How often watched paths are checked for changes (default: 500 ms)
    pub poll_interval: Duration,

    /// How long to wait before retrying a failed watch setup (default: 1 s)
    pub retry_delay: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl WatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the setup retry delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}

/// Watch `paths` and invoke `reload` when any of them changes.
///
/// The spawned task invokes `reload` once up front, after fingerprinting but
/// before watching begins, so a change that lands while the initial load runs
/// is seen as a difference on the next poll rather than lost. After that,
/// `reload` fires once per coalesced batch of changes. Setup errors such as
/// an unresolvable symlink are logged and retried after
/// [`WatchConfig::retry_delay`]; they never terminate the task.
///
/// The task exits when `shutdown` observes `true` or its sender is dropped.
pub fn watch_files<F>(
    paths: Vec<PathBuf>,
    config: WatchConfig,
    reload: F,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    F: Fn() + Send + Sync + 'static,
{
    tokio::spawn(run_watcher(paths, config, reload, shutdown))
}

async fn run_watcher<F>(
    paths: Vec<PathBuf>,
    config: WatchConfig,
    reload: F,
    mut shutdown: watch::Receiver<bool>,
) where
    F: Fn() + Send + Sync + 'static,
{
    tracing::info!(paths = paths.len(), "file watcher started");

    loop {
        let (watched, setup_complete) = resolve_watched_paths(&paths).await;
        let retry_at = (!setup_complete).then(|| Instant::now() + config.retry_delay);

        // Fingerprint before reloading: a change that lands while the reload
        // callback runs shows up as a difference on the next poll instead of
        // being lost.
        let baseline = fingerprint_paths(&watched).await;
        reload();

        let mut ticker = interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    match changed {
                        Ok(()) if !*shutdown.borrow() => continue,
                        _ => {
                            tracing::info!("file watcher shutting down");
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    if retry_at.is_some_and(|at| Instant::now() >= at) {
                        // re-run setup for directories that failed to resolve
                        break;
                    }
                    if fingerprint_paths(&watched).await != baseline {
                        // re-setup reloads once for the whole batch
                        break;
                    }
                }
            }
        }
    }
}

/// Resolve each path's containing directory through symlinks.
///
/// A file that does not exist yet is fine: its directory still resolves and
/// the file is fingerprinted as absent until it appears. Returns the resolved
/// paths and whether every directory resolved.
async fn resolve_watched_paths(paths: &[PathBuf]) -> (Vec<PathBuf>, bool) {
    let mut watched = Vec::with_capacity(paths.len());
    let mut complete = true;
    for path in paths {
        let dir = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let Some(file_name) = path.file_name() else {
            tracing::warn!(path = %path.display(), "watched path has no file name");
            complete = false;
            continue;
        };
        match tokio::fs::canonicalize(&dir).await {
            Ok(real_dir) => watched.push(real_dir.join(file_name)),
            Err(error) => {
                tracing::warn!(
                    dir = %dir.display(),
                    %error,
                    "unable to resolve watch directory, will retry"
                );
                complete = false;
                watched.push(path.clone());
            }
        }
    }
    (watched, complete)
}

/// (mtime, size) per path; `None` for a path that is currently absent.
async fn fingerprint_paths(paths: &[PathBuf]) -> Vec<Option<(SystemTime, u64)>> {
    let mut prints = Vec::with_capacity(paths.len());
    for path in paths {
        let print = match tokio::fs::metadata(path).await {
            Ok(meta) => Some((
                meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                meta.len(),
            )),
            Err(_) => None,
        };
        prints.push(print);
    }
    prints
}
