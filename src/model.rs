use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::platform::{self, PlatformAutoLaunch};
use crate::watch::{EntryEventSink, EntryWatcher};
use crate::AutoLaunchError;

/// Operating systems with a known auto-launch mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    Linux,
    Windows,
    MacOs,
    Unknown,
}

impl Platform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classify an OS name such as `"Linux"`, `"Windows 11"` or `"Mac OS X"`.
    pub fn from_os_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        if name.starts_with("linux") {
            Self::Linux
        } else if name.starts_with("win") {
            Self::Windows
        } else if name.starts_with("mac os x")
            || name.starts_with("macos")
            || name.starts_with("darwin")
        {
            Self::MacOs
        } else {
            Self::Unknown
        }
    }
}

/// An application that can be registered to start when the user logs in.
///
/// Instances are immutable once built and hold no OS state, so they can be shared
/// freely across threads. Each call to [`enable`](Self::enable) and friends resolves
/// the backend for the running platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AutoLaunchBuilder")]
pub struct AutoLaunch {
    /// Identifier key for the registration. On Windows this is the name shown in
    /// Task Manager's Startup tab; elsewhere it names the entry file or login item.
    app_name: String,
    /// Absolute path of the binary to start.
    app_file: PathBuf,
    args: Vec<String>,
    /// macOS only: register through a LaunchAgent plist instead of AppleScript.
    use_launch_agent: bool,
}

impl AutoLaunch {
    pub fn builder() -> AutoLaunchBuilder {
        AutoLaunchBuilder::default()
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn app_file(&self) -> &Path {
        &self.app_file
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn use_launch_agent(&self) -> bool {
        self.use_launch_agent
    }

    /// The quoted application path followed by the arguments, space separated.
    pub fn startup_command(&self) -> String {
        self.startup_command_with(true)
    }

    pub fn startup_command_with(&self, quoted: bool) -> String {
        let path = self.app_file.display();
        let mut command = if quoted {
            format!("\"{path}\"")
        } else {
            path.to_string()
        };
        if !self.args.is_empty() {
            command.push(' ');
            command.push_str(&self.args.join(" "));
        }
        command
    }

    /// Enable auto-launching. No effect if already enabled.
    pub fn enable(&self) -> Result<(), AutoLaunchError> {
        platform::current()?.enable(self)
    }

    /// Disable auto-launching. No effect if already disabled.
    pub fn disable(&self) -> Result<(), AutoLaunchError> {
        platform::current()?.disable(self)
    }

    pub fn is_enabled(&self) -> Result<bool, AutoLaunchError> {
        platform::current()?.is_enabled(self)
    }

    /// Flip the registration and return the new state.
    pub fn toggle(&self) -> Result<bool, AutoLaunchError> {
        platform::current()?.toggle(self)
    }

    /// Watch this application's entry file for changes made outside the process,
    /// e.g. a user removing it through their desktop's session settings.
    pub fn watch<S: EntryEventSink>(&self, sink: Arc<S>) -> Result<EntryWatcher, AutoLaunchError> {
        let backend = platform::current()?;
        Ok(EntryWatcher::start(backend.as_ref(), self, sink)?)
    }
}

/// Builder for [`AutoLaunch`]. Also the deserialization shape of an `AutoLaunch`, so
/// configs loaded from disk pass the same validation as ones built in code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoLaunchBuilder {
    app_name: Option<String>,
    app_file: Option<PathBuf>,
    args: Vec<String>,
    use_launch_agent: bool,
}

impl AutoLaunchBuilder {
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// The binary to start. It must exist by the time [`build`](Self::build) is called.
    pub fn app_file(mut self, app_file: impl Into<PathBuf>) -> Self {
        self.app_file = Some(app_file.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// (macOS only) Use a LaunchAgent plist rather than an AppleScript login item.
    pub fn use_launch_agent(mut self) -> Self {
        self.use_launch_agent = true;
        self
    }

    pub fn build(self) -> Result<AutoLaunch, AutoLaunchError> {
        let app_name = self.app_name.ok_or(AutoLaunchError::MissingAppName)?;
        if app_name.is_empty() {
            return Err(AutoLaunchError::EmptyAppName);
        }
        if app_name.contains(['/', '\\']) || app_name.chars().any(char::is_control) {
            return Err(AutoLaunchError::InvalidAppName(app_name));
        }

        let app_file = self.app_file.ok_or(AutoLaunchError::MissingAppFile)?;
        if !app_file.exists() {
            return Err(AutoLaunchError::AppFileNotFound(app_file));
        }
        let app_file = std::path::absolute(&app_file)?;

        Ok(AutoLaunch {
            app_name,
            app_file,
            args: self.args,
            use_launch_agent: self.use_launch_agent,
        })
    }
}

impl TryFrom<AutoLaunchBuilder> for AutoLaunch {
    type Error = AutoLaunchError;

    fn try_from(builder: AutoLaunchBuilder) -> Result<Self, Self::Error> {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn app_with_args(file: &Path, args: &[&str]) -> AutoLaunch {
        AutoLaunch::builder()
            .app_name("Everything")
            .app_file(file)
            .args(args.iter().copied())
            .build()
            .unwrap()
    }

    #[test]
    fn classifies_os_names() {
        assert_eq!(Platform::from_os_name("Linux"), Platform::Linux);
        assert_eq!(Platform::from_os_name("linux"), Platform::Linux);
        assert_eq!(Platform::from_os_name("Windows 11"), Platform::Windows);
        assert_eq!(Platform::from_os_name("windows"), Platform::Windows);
        assert_eq!(Platform::from_os_name("Mac OS X"), Platform::MacOs);
        assert_eq!(Platform::from_os_name("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os_name("FreeBSD"), Platform::Unknown);
        assert_eq!(Platform::from_os_name(""), Platform::Unknown);
    }

    #[test]
    fn current_platform_matches_target() {
        let current = Platform::current();
        if cfg!(target_os = "linux") {
            assert_eq!(current, Platform::Linux);
        } else if cfg!(target_os = "windows") {
            assert_eq!(current, Platform::Windows);
        } else if cfg!(target_os = "macos") {
            assert_eq!(current, Platform::MacOs);
        }
    }

    #[test]
    fn builds_with_defaults() {
        let file = NamedTempFile::new().unwrap();
        let app = AutoLaunch::builder()
            .app_name("Everything")
            .app_file(file.path())
            .build()
            .unwrap();
        assert_eq!(app.app_name(), "Everything");
        assert!(app.app_file().is_absolute());
        assert!(app.args().is_empty());
        assert!(!app.use_launch_agent());
    }

    #[test]
    fn rejects_missing_or_empty_name() {
        let file = NamedTempFile::new().unwrap();
        let err = AutoLaunch::builder().app_file(file.path()).build().unwrap_err();
        assert!(matches!(err, AutoLaunchError::MissingAppName));

        let err = AutoLaunch::builder()
            .app_name("")
            .app_file(file.path())
            .build()
            .unwrap_err();
        assert!(matches!(err, AutoLaunchError::EmptyAppName));
    }

    #[test]
    fn rejects_names_with_separators() {
        let file = NamedTempFile::new().unwrap();
        let err = AutoLaunch::builder()
            .app_name("../escape")
            .app_file(file.path())
            .build()
            .unwrap_err();
        assert!(matches!(err, AutoLaunchError::InvalidAppName(_)));
    }

    #[test]
    fn rejects_names_with_control_characters() {
        let file = NamedTempFile::new().unwrap();
        for name in ["App\nExec=/bin/evil", "App\r", "Tab\tbed", "Nul\0"] {
            let err = AutoLaunch::builder()
                .app_name(name)
                .app_file(file.path())
                .build()
                .unwrap_err();
            assert!(
                matches!(err, AutoLaunchError::InvalidAppName(ref n) if n == name),
                "{name:?} was accepted"
            );
        }
    }

    #[test]
    fn rejects_missing_file() {
        let err = AutoLaunch::builder().app_name("App").build().unwrap_err();
        assert!(matches!(err, AutoLaunchError::MissingAppFile));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.exe");
        let err = AutoLaunch::builder()
            .app_name("App")
            .app_file(&missing)
            .build()
            .unwrap_err();
        assert!(matches!(err, AutoLaunchError::AppFileNotFound(p) if p == missing));
    }

    #[test]
    fn startup_command_quotes_path() {
        let file = NamedTempFile::new().unwrap();
        let app = app_with_args(file.path(), &["--minimized", "--tray"]);
        let path = file.path().display().to_string();
        assert_eq!(
            app.startup_command(),
            format!("\"{path}\" --minimized --tray")
        );
        assert_eq!(
            app.startup_command_with(false),
            format!("{path} --minimized --tray")
        );
    }

    #[test]
    fn startup_command_without_args_has_no_trailing_space() {
        let file = NamedTempFile::new().unwrap();
        let app = app_with_args(file.path(), &[]);
        assert_eq!(
            app.startup_command_with(false),
            file.path().display().to_string()
        );
    }

    #[test]
    fn deserializes_through_builder_validation() {
        let file = NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "app_name": "Everything",
            "app_file": file.path(),
            "args": ["--hidden"],
            "use_launch_agent": true,
        });
        let app: AutoLaunch = serde_json::from_value(json).unwrap();
        assert_eq!(app.args(), ["--hidden".to_string()]);
        assert!(app.use_launch_agent());

        let bad = serde_json::json!({ "app_name": "", "app_file": file.path() });
        assert!(serde_json::from_value::<AutoLaunch>(bad).is_err());
    }

    #[test]
    fn serializes_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let app = app_with_args(file.path(), &["-q"]);
        let json = serde_json::to_string(&app).unwrap();
        let back: AutoLaunch = serde_json::from_str(&json).unwrap();
        assert_eq!(app, back);
    }
}
