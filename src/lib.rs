//! Start applications automatically when the user logs in.
//!
//! Describe the application once with [`AutoLaunch::builder`], then enable, disable
//! or toggle its registration. The mechanism depends on the platform:
//!
//! - Linux: an XDG `.desktop` file in `~/.config/autostart`.
//! - macOS: a System Events login item, or a LaunchAgent plist in
//!   `~/Library/LaunchAgents` when [`AutoLaunchBuilder::use_launch_agent`] is set.
//! - Windows: a value under `HKCU\...\CurrentVersion\Run`, approved for Task Manager.
//!
//! ```no_run
//! use autolaunch::AutoLaunch;
//!
//! # fn main() -> Result<(), autolaunch::AutoLaunchError> {
//! let app = AutoLaunch::builder()
//!     .app_name("Everything")
//!     .app_file("C:/Program Files/Everything/Everything.exe")
//!     .args(["--minimized"])
//!     .use_launch_agent()
//!     .build()?;
//!
//! app.enable()?;
//! assert!(app.is_enabled()?);
//! app.toggle()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod model;
pub mod platform;
pub mod watch;

pub use error::AutoLaunchError;
pub use model::*;
pub use platform::PlatformAutoLaunch;
pub use watch::{
    ChannelSink, EntryChangeKind, EntryEvent, EntryEventSink, EntryWatcher, WatchError,
};
