use std::path::PathBuf;

use thiserror::Error;

use crate::watch::WatchError;

/// Errors raised while building an [`AutoLaunch`](crate::AutoLaunch) or talking to the
/// platform's start-up registry.
#[derive(Debug, Error)]
pub enum AutoLaunchError {
    #[error("application name is required")]
    MissingAppName,
    #[error("application name cannot be empty")]
    EmptyAppName,
    #[error("application name {0:?} must not contain path separators or control characters")]
    InvalidAppName(String),
    #[error("application file is required")]
    MissingAppFile,
    #[error("file {0} does not exist")]
    AppFileNotFound(PathBuf),
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),
    #[error("cannot determine home directory")]
    NoHomeDir,
    #[error("AppleScript failed with exit code {code:?}: {stderr}")]
    AppleScript { code: Option<i32>, stderr: String },
    #[error("registry operation on {key}\\{value} failed: {message}")]
    Registry {
        key: String,
        value: String,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Watch(#[from] WatchError),
}
