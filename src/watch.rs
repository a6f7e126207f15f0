use std::{
    fs,
    path::{Path, PathBuf},
    sync::{mpsc, Arc},
    thread,
};

use chrono::{DateTime, Utc};
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::platform::PlatformAutoLaunch;
use crate::AutoLaunch;

/// What happened to an application's auto-launch entry file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryChangeKind {
    Created,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryEvent {
    pub app_name: String,
    pub path: PathBuf,
    pub kind: EntryChangeKind,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum WatchError {
    /// The backend registers the app somewhere other than a file (registry, login items).
    #[error("auto-launch entry for {0} is not backed by a file")]
    NotFileBacked(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Notify(#[from] notify::Error),
}

/// Receives entry events on the watcher's worker thread.
pub trait EntryEventSink: Send + Sync + 'static {
    fn handle(&self, event: EntryEvent);
}

/// Keeps a platform watcher on the directory holding one app's entry file alive.
/// Dropping it stops delivery.
pub struct EntryWatcher {
    entry: PathBuf,
    _watcher: RecommendedWatcher,
    _worker: thread::JoinHandle<()>,
}

impl EntryWatcher {
    /// Start watching the file `backend` uses to register `app`.
    ///
    /// The parent directory is created if needed, since autostart directories
    /// often do not exist until the first entry is written.
    pub fn start<S: EntryEventSink>(
        backend: &dyn PlatformAutoLaunch,
        app: &AutoLaunch,
        sink: Arc<S>,
    ) -> Result<Self, WatchError> {
        let entry = backend
            .entry_path(app)
            .ok_or_else(|| WatchError::NotFileBacked(app.app_name().to_string()))?;
        let dir = entry
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::NotFileBacked(app.app_name().to_string()))?;
        fs::create_dir_all(&dir)?;

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        debug!(path = %entry.display(), "watching auto-launch entry");

        let app_name = app.app_name().to_string();
        let worker_entry = entry.clone();
        let worker = thread::spawn(move || {
            for res in rx {
                match res {
                    Ok(event) => {
                        if let Some(event) = classify(&app_name, &worker_entry, &event) {
                            sink.handle(event);
                        }
                    }
                    Err(e) => warn!(error = %e, "entry watcher error"),
                }
            }
        });

        Ok(Self {
            entry,
            _watcher: watcher,
            _worker: worker,
        })
    }

    pub fn entry_path(&self) -> &Path {
        &self.entry
    }
}

/// Map a raw notify event to an entry event, if it touches `entry`.
fn classify(app_name: &str, entry: &Path, event: &Event) -> Option<EntryEvent> {
    if !event.paths.iter().any(|p| p.file_name() == entry.file_name()) {
        return None;
    }
    let kind = match &event.kind {
        EventKind::Create(_) => EntryChangeKind::Created,
        EventKind::Remove(_) => EntryChangeKind::Removed,
        // Renames report both ends; which end is ours decides the direction.
        EventKind::Modify(ModifyKind::Name(_)) => {
            if entry.exists() {
                EntryChangeKind::Created
            } else {
                EntryChangeKind::Removed
            }
        }
        EventKind::Modify(_) => EntryChangeKind::Modified,
        _ => return None,
    };
    Some(EntryEvent {
        app_name: app_name.to_string(),
        path: entry.to_path_buf(),
        kind,
        occurred_at: Utc::now(),
    })
}

/// Sink that forwards into a channel; handy for tests and event loops.
pub struct ChannelSink {
    pub sender: mpsc::Sender<EntryEvent>,
}

impl EntryEventSink for ChannelSink {
    fn handle(&self, event: EntryEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{LinuxAutoLaunch, WindowsAutoLaunch};
    use crate::AutoLaunchError;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use std::time::{Duration, Instant};
    use tempfile::{tempdir, NamedTempFile};

    /// Drain events until one of `kind` arrives or the deadline passes.
    fn wait_for(
        rx: &mpsc::Receiver<EntryEvent>,
        kind: EntryChangeKind,
        seen: &mut Vec<EntryEvent>,
    ) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(event) => {
                    let hit = event.kind == kind;
                    seen.push(event);
                    if hit {
                        return true;
                    }
                }
                Err(_) => return false,
            }
        }
        false
    }

    fn sample_app(bin: &NamedTempFile) -> AutoLaunch {
        AutoLaunch::builder()
            .app_name("Everything")
            .app_file(bin.path())
            .build()
            .unwrap()
    }

    #[test]
    fn classifies_events_for_entry_only() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("Everything.desktop");
        let other = dir.path().join("Other.desktop");

        let created = Event::new(EventKind::Create(CreateKind::File)).add_path(entry.clone());
        let event = classify("Everything", &entry, &created).unwrap();
        assert_eq!(event.kind, EntryChangeKind::Created);
        assert_eq!(event.path, entry);
        assert_eq!(event.app_name, "Everything");

        let modified = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(entry.clone());
        assert_eq!(
            classify("Everything", &entry, &modified).unwrap().kind,
            EntryChangeKind::Modified
        );

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(entry.clone());
        assert_eq!(
            classify("Everything", &entry, &removed).unwrap().kind,
            EntryChangeKind::Removed
        );

        let unrelated = Event::new(EventKind::Create(CreateKind::File)).add_path(other);
        assert!(classify("Everything", &entry, &unrelated).is_none());

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(entry.clone());
        assert!(classify("Everything", &entry, &access).is_none());
    }

    #[test]
    fn rename_direction_follows_entry_presence() {
        let dir = tempdir().unwrap();
        let entry = dir.path().join("Everything.desktop");
        let renamed = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Any)))
            .add_path(entry.clone());

        assert_eq!(
            classify("Everything", &entry, &renamed).unwrap().kind,
            EntryChangeKind::Removed
        );
        fs::write(&entry, "x").unwrap();
        assert_eq!(
            classify("Everything", &entry, &renamed).unwrap().kind,
            EntryChangeKind::Created
        );
    }

    #[test]
    fn start_creates_missing_directory() {
        let home = tempdir().unwrap();
        let bin = NamedTempFile::new().unwrap();
        let app = sample_app(&bin);
        let backend = LinuxAutoLaunch::for_home(home.path());
        let (tx, _rx) = mpsc::channel();

        let watcher =
            EntryWatcher::start(&backend, &app, Arc::new(ChannelSink { sender: tx })).unwrap();
        assert!(backend.autostart_dir().is_dir());
        assert_eq!(
            watcher.entry_path(),
            backend.autostart_dir().join("Everything.desktop")
        );
    }

    #[test]
    fn registry_backend_is_not_watchable() {
        struct NoHive;
        impl crate::platform::RegistryHive for NoHive {
            fn get_string(&self, _: &str, _: &str) -> Result<Option<String>, AutoLaunchError> {
                Ok(None)
            }
            fn set_string(&self, _: &str, _: &str, _: &str) -> Result<(), AutoLaunchError> {
                Ok(())
            }
            fn get_binary(&self, _: &str, _: &str) -> Result<Option<Vec<u8>>, AutoLaunchError> {
                Ok(None)
            }
            fn set_binary(&self, _: &str, _: &str, _: &[u8]) -> Result<(), AutoLaunchError> {
                Ok(())
            }
            fn delete_value(&self, _: &str, _: &str) -> Result<(), AutoLaunchError> {
                Ok(())
            }
        }

        let bin = NamedTempFile::new().unwrap();
        let app = sample_app(&bin);
        let (tx, _rx) = mpsc::channel();
        let err = EntryWatcher::start(
            &WindowsAutoLaunch::new(NoHive),
            &app,
            Arc::new(ChannelSink { sender: tx }),
        )
        .err()
        .unwrap();
        assert!(matches!(err, WatchError::NotFileBacked(name) if name == "Everything"));
    }

    #[test]
    fn delivers_enable_and_disable_to_sink() {
        let home = tempdir().unwrap();
        let bin = NamedTempFile::new().unwrap();
        let app = sample_app(&bin);
        let backend = LinuxAutoLaunch::for_home(home.path());
        let (tx, rx) = mpsc::channel();
        let _watcher =
            EntryWatcher::start(&backend, &app, Arc::new(ChannelSink { sender: tx })).unwrap();

        let mut seen = Vec::new();
        backend.enable(&app).unwrap();
        assert!(
            wait_for(&rx, EntryChangeKind::Created, &mut seen),
            "no Created event, got {seen:?}"
        );
        backend.disable(&app).unwrap();
        assert!(
            wait_for(&rx, EntryChangeKind::Removed, &mut seen),
            "no Removed event, got {seen:?}"
        );

        let entry = backend.entry_path(&app).unwrap();
        assert!(seen.iter().all(|e| e.app_name == "Everything"));
        assert!(seen.iter().all(|e| e.path == entry));
    }

    #[test]
    fn entry_event_serializes_with_timestamp() {
        let event = EntryEvent {
            app_name: "Everything".into(),
            path: PathBuf::from("/tmp/Everything.desktop"),
            kind: EntryChangeKind::Removed,
            occurred_at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "Removed");
        assert!(json["occurred_at"].is_string());
        let back: EntryEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
