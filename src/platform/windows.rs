use tracing::{debug, info, warn};

use super::PlatformAutoLaunch;
use crate::{AutoLaunch, AutoLaunchError};

#[cfg(windows)]
mod hive;
#[cfg(windows)]
pub use hive::CurrentUserHive;

pub const RUN_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run";
/// Task Manager's per-entry enable/disable override.
pub const STARTUP_APPROVED_KEY: &str =
    r"SOFTWARE\Microsoft\Windows\CurrentVersion\Explorer\StartupApproved\Run";
pub const STARTUP_APPROVED_ENABLED: [u8; 12] = [
    0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Value access on a single registry hive. Missing values read as `None`.
pub trait RegistryHive: Send + Sync {
    fn get_string(&self, key: &str, name: &str) -> Result<Option<String>, AutoLaunchError>;
    fn set_string(&self, key: &str, name: &str, value: &str) -> Result<(), AutoLaunchError>;
    fn get_binary(&self, key: &str, name: &str) -> Result<Option<Vec<u8>>, AutoLaunchError>;
    fn set_binary(&self, key: &str, name: &str, value: &[u8]) -> Result<(), AutoLaunchError>;
    fn delete_value(&self, key: &str, name: &str) -> Result<(), AutoLaunchError>;
}

/// Registry backend: a `Run` value for the command plus a `StartupApproved` value
/// so Task Manager shows the entry as enabled.
pub struct WindowsAutoLaunch<H> {
    hive: H,
}

impl<H: RegistryHive> WindowsAutoLaunch<H> {
    pub fn new(hive: H) -> Self {
        Self { hive }
    }

    fn approved_in_task_manager(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError> {
        let value = self.hive.get_binary(STARTUP_APPROVED_KEY, app.app_name())?;
        Ok(value.is_some_and(|bytes| last_eight_bytes_zero(&bytes)))
    }
}

impl<H: RegistryHive> PlatformAutoLaunch for WindowsAutoLaunch<H> {
    fn enable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        let command = app.startup_command();
        debug!(app = app.app_name(), command = %command, "writing run value");
        self.hive.set_string(RUN_KEY, app.app_name(), &command)?;
        self.hive
            .set_binary(STARTUP_APPROVED_KEY, app.app_name(), &STARTUP_APPROVED_ENABLED)?;
        info!(app = app.app_name(), "enabled auto-launch");
        Ok(())
    }

    fn disable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        // Usually means the value never existed.
        if let Err(e) = self.hive.delete_value(RUN_KEY, app.app_name()) {
            warn!(app = app.app_name(), error = %e, "could not delete run value");
            return Ok(());
        }
        info!(app = app.app_name(), "disabled auto-launch");
        Ok(())
    }

    fn is_enabled(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError> {
        let registered = match self.hive.get_string(RUN_KEY, app.app_name()) {
            Ok(value) => value.is_some(),
            Err(e) => {
                debug!(app = app.app_name(), error = %e, "run value lookup failed");
                false
            }
        };
        if !registered {
            return Ok(false);
        }
        Ok(self.approved_in_task_manager(app).unwrap_or_else(|e| {
            debug!(app = app.app_name(), error = %e, "startup approval lookup failed");
            false
        }))
    }
}

/// Task Manager marks disabled entries by writing a timestamp into the trailing bytes.
fn last_eight_bytes_zero(bytes: &[u8]) -> bool {
    bytes.len() >= 8 && bytes[bytes.len() - 8..].iter().all(|b| *b == 0)
}
