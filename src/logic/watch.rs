//! Config File Watcher
//!
//! Requests a refresh when config.json or the whitelist changes on disk.
//! Watches the parent directories so editors that replace the file are seen too.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::logic::control::LoopControl;

/// A watched file: canonical parent + file name
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    dir: PathBuf,
    file_name: std::ffi::OsString,
}

impl Target {
    fn new(path: &Path) -> Option<Self> {
        let file_name = path.file_name()?.to_os_string();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let dir = parent.canonicalize().ok()?;
        Some(Self { dir, file_name })
    }

    fn matches(&self, path: &Path) -> bool {
        if path.file_name() != Some(self.file_name.as_os_str()) {
            return false;
        }
        match path.parent() {
            Some(parent) => parent == self.dir || parent.canonicalize().map(|p| p == self.dir).unwrap_or(false),
            None => false,
        }
    }
}

fn is_relevant(event: &Event, targets: &[Target]) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|path| targets.iter().any(|target| target.matches(path)))
}

/// Start watching. Files whose directory does not exist are skipped.
/// Dropping the returned watcher stops it.
pub fn watch_files(paths: &[PathBuf], control: Arc<LoopControl>) -> notify::Result<RecommendedWatcher> {
    let targets: Vec<Target> = paths
        .iter()
        .filter_map(|path| {
            let target = Target::new(path);
            if target.is_none() {
                log::debug!("Not watching {:?}: directory missing", path);
            }
            target
        })
        .collect();

    let handler_targets = targets.clone();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event, &handler_targets) {
                log::info!("Change detected in {:?}, scheduling reload", event.paths);
                control.request_refresh();
            }
        }
        Err(e) => log::warn!("File watch error: {}", e),
    })?;

    let mut watched: Vec<&Path> = Vec::new();
    for target in &targets {
        if watched.contains(&target.dir.as_path()) {
            continue;
        }
        watcher.watch(&target.dir, RecursiveMode::NonRecursive)?;
        log::debug!("Watching {:?}", target.dir);
        watched.push(&target.dir);
    }

    Ok(watcher)
}

/// Watches config.json plus the current whitelist, and moves to a new
/// whitelist location when the config points somewhere else
pub struct ConfigWatcher {
    config_path: PathBuf,
    whitelist_path: PathBuf,
    control: Arc<LoopControl>,
    watcher: Option<RecommendedWatcher>,
}

impl ConfigWatcher {
    pub fn new(config_path: PathBuf, whitelist_path: PathBuf, control: Arc<LoopControl>) -> Self {
        let watcher = match watch_files(&[config_path.clone(), whitelist_path.clone()], control.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                log::warn!("File watching unavailable: {} - use 'reload' after edits", e);
                None
            }
        };
        Self { config_path, whitelist_path, control, watcher }
    }

    /// Re-target the whitelist. Returns true when a new watcher took over.
    pub fn update_whitelist(&mut self, path: PathBuf) -> bool {
        if path == self.whitelist_path {
            return false;
        }
        log::info!("Whitelist moved to {:?}, re-targeting file watch", path);
        self.whitelist_path = path;

        match watch_files(&[self.config_path.clone(), self.whitelist_path.clone()], self.control.clone()) {
            Ok(watcher) => {
                // old one stops on drop
                self.watcher = Some(watcher);
                true
            }
            Err(e) => {
                log::warn!("Cannot watch {:?}: {} - keeping the previous watch", self.whitelist_path, e);
                false
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};
    use std::fs;
    use std::time::{Duration, Instant};

    #[test]
    fn test_relevance_filter() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        let targets = vec![Target::new(&config).unwrap()];

        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(config.clone());
        assert!(is_relevant(&modify, &targets));

        let other = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(dir.path().join("other.txt"));
        assert!(!is_relevant(&other, &targets));

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(config);
        assert!(!is_relevant(&access, &targets));
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope").join("whitelist.txt");
        assert!(Target::new(&missing).is_none());

        let control = Arc::new(LoopControl::new());
        assert!(watch_files(&[missing], control).is_ok());
    }

    fn wait_for_refresh(control: &LoopControl) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if control.take_refresh() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn test_watcher_follows_moved_whitelist() {
        let config_dir = tempfile::tempdir().unwrap();
        let old_dir = tempfile::tempdir().unwrap();
        let new_dir = tempfile::tempdir().unwrap();
        let config = config_dir.path().join("config.json");
        let old_list = old_dir.path().join("whitelist.txt");
        let new_list = new_dir.path().join("whitelist.txt");
        fs::write(&config, "{}").unwrap();
        fs::write(&old_list, "game.exe\n").unwrap();

        let control = Arc::new(LoopControl::new());
        let mut watcher = ConfigWatcher::new(config, old_list.clone(), control.clone());
        assert!(watcher.watcher.is_some());

        assert!(!watcher.update_whitelist(old_list));
        assert!(watcher.update_whitelist(new_list.clone()));

        fs::write(&new_list, "[cse] Netflix\n").unwrap();
        assert!(wait_for_refresh(&control));
    }

    #[test]
    fn test_write_requests_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = dir.path().join("whitelist.txt");
        fs::write(&whitelist, "game.exe\n").unwrap();

        let control = Arc::new(LoopControl::new());
        let _watcher = watch_files(&[whitelist.clone()], control.clone()).unwrap();

        fs::write(&whitelist, "game.exe\n[cse] Netflix\n").unwrap();
        assert!(wait_for_refresh(&control));
    }
}
