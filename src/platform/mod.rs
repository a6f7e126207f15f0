//! OS-specific auto-launch backends.
//!
//! Every backend is compiled on every target so its logic can be tested anywhere;
//! only the pieces that touch native APIs (the Windows registry hive) are gated.

use std::path::PathBuf;

use crate::{AutoLaunch, AutoLaunchError, Platform};

pub mod linux;
pub mod macos;
pub mod windows;

pub use linux::LinuxAutoLaunch;
pub use macos::{MacOsAutoLaunch, Osascript, ScriptOutput, ScriptRunner};
pub use self::windows::{RegistryHive, WindowsAutoLaunch};

/// Operating-system-dependent operations behind [`AutoLaunch`].
pub trait PlatformAutoLaunch: Send + Sync {
    /// Register `app` to start at login. No effect if it is already registered.
    fn enable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError>;

    /// Remove the registration for `app`. No effect if it is not registered.
    fn disable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError>;

    fn is_enabled(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError>;

    /// Flip the registration and return the new state.
    fn toggle(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError> {
        if self.is_enabled(app)? {
            self.disable(app)?;
            Ok(false)
        } else {
            self.enable(app)?;
            Ok(true)
        }
    }

    /// File that backs the registration, if the backend uses one.
    fn entry_path(&self, _app: &AutoLaunch) -> Option<PathBuf> {
        None
    }
}

/// Backend for the platform this binary runs on.
pub fn current() -> Result<Box<dyn PlatformAutoLaunch>, AutoLaunchError> {
    for_platform(Platform::current())
}

/// Backend for `platform`, rooted at the current user's home directory.
pub fn for_platform(platform: Platform) -> Result<Box<dyn PlatformAutoLaunch>, AutoLaunchError> {
    match platform {
        Platform::Linux => Ok(Box::new(LinuxAutoLaunch::for_home(&home_dir()?))),
        Platform::MacOs => Ok(Box::new(MacOsAutoLaunch::for_home(&home_dir()?))),
        #[cfg(windows)]
        Platform::Windows => Ok(Box::new(WindowsAutoLaunch::new(
            self::windows::CurrentUserHive,
        ))),
        #[cfg(not(windows))]
        Platform::Windows => Err(AutoLaunchError::UnsupportedPlatform(
            "windows registry is only reachable from windows targets".into(),
        )),
        Platform::Unknown => Err(AutoLaunchError::UnsupportedPlatform(
            std::env::consts::OS.into(),
        )),
    }
}

pub(crate) fn home_dir() -> Result<PathBuf, AutoLaunchError> {
    dirs::home_dir().ok_or(AutoLaunchError::NoHomeDir)
}
