use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::PlatformAutoLaunch;
use crate::{AutoLaunch, AutoLaunchError};

/// XDG autostart backend: one `.desktop` file per application.
#[derive(Debug, Clone)]
pub struct LinuxAutoLaunch {
    autostart_dir: PathBuf,
}

impl LinuxAutoLaunch {
    /// Use `autostart_dir` in place of `~/.config/autostart`.
    pub fn new(autostart_dir: impl Into<PathBuf>) -> Self {
        Self {
            autostart_dir: autostart_dir.into(),
        }
    }

    pub fn for_home(home: &Path) -> Self {
        Self::new(home.join(".config").join("autostart"))
    }

    pub fn autostart_dir(&self) -> &Path {
        &self.autostart_dir
    }

    fn entry_file(&self, app: &AutoLaunch) -> PathBuf {
        self.autostart_dir.join(format!("{}.desktop", app.app_name()))
    }
}

/// Render the desktop entry launched by the session manager.
pub fn desktop_entry(app: &AutoLaunch) -> String {
    let name = app.app_name();
    [
        "[Desktop Entry]".to_string(),
        "Type=Application".to_string(),
        "Version=1.0".to_string(),
        format!("Name={name}"),
        format!("Comment={name} startup script"),
        format!("Exec={}", app.startup_command_with(false)),
        "StartupNotify=false".to_string(),
        "Terminal=false".to_string(),
    ]
    .join("\n")
}

impl PlatformAutoLaunch for LinuxAutoLaunch {
    fn enable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        fs::create_dir_all(&self.autostart_dir)?;
        let file = self.entry_file(app);
        match OpenOptions::new().write(true).create_new(true).open(&file) {
            Ok(mut handle) => handle.write_all(desktop_entry(app).as_bytes())?,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %file.display(), "desktop entry already present");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        info!(app = app.app_name(), path = %file.display(), "enabled auto-launch");
        Ok(())
    }

    fn disable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        let file = self.entry_file(app);
        match fs::remove_file(&file) {
            Ok(()) => {
                info!(app = app.app_name(), path = %file.display(), "disabled auto-launch");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn is_enabled(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError> {
        Ok(self.entry_file(app).try_exists()?)
    }

    fn entry_path(&self, app: &AutoLaunch) -> Option<PathBuf> {
        Some(self.entry_file(app))
    }
}
