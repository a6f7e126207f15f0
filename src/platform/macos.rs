use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use super::PlatformAutoLaunch;
use crate::{AutoLaunch, AutoLaunchError};

/// Captured result of running an AppleScript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes AppleScript source. Abstracted so login-item logic can be exercised
/// without a macOS session.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &str) -> Result<ScriptOutput, AutoLaunchError>;
}

/// Runs scripts through `osascript -e`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Osascript;

impl ScriptRunner for Osascript {
    fn run(&self, script: &str) -> Result<ScriptOutput, AutoLaunchError> {
        debug!(script, "running osascript");
        let output = Command::new("osascript").arg("-e").arg(script).output()?;
        Ok(ScriptOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// macOS backend. Apps that opt into [`use_launch_agent`](AutoLaunch::use_launch_agent)
/// get a LaunchAgent plist; everything else becomes a System Events login item.
pub struct MacOsAutoLaunch<R = Osascript> {
    launch_agents_dir: PathBuf,
    runner: R,
}

impl MacOsAutoLaunch<Osascript> {
    pub fn for_home(home: &Path) -> Self {
        Self::new(home.join("Library").join("LaunchAgents"), Osascript)
    }
}

impl<R: ScriptRunner> MacOsAutoLaunch<R> {
    pub fn new(launch_agents_dir: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            launch_agents_dir: launch_agents_dir.into(),
            runner,
        }
    }

    pub fn launch_agents_dir(&self) -> &Path {
        &self.launch_agents_dir
    }

    fn plist_file(&self, app: &AutoLaunch) -> PathBuf {
        self.launch_agents_dir
            .join(format!("{}.plist", app.app_name()))
    }

    fn run_checked(&self, script: &str) -> Result<ScriptOutput, AutoLaunchError> {
        let output = self.runner.run(script)?;
        if !output.success() {
            return Err(AutoLaunchError::AppleScript {
                code: output.code,
                stderr: output.stderr,
            });
        }
        Ok(output)
    }

    fn enable_launch_agent(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        fs::create_dir_all(&self.launch_agents_dir)?;
        let file = self.plist_file(app);
        match OpenOptions::new().write(true).create_new(true).open(&file) {
            Ok(mut handle) => handle.write_all(launch_agent_plist(app).as_bytes())?,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %file.display(), "launch agent already present");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
        info!(app = app.app_name(), path = %file.display(), "installed launch agent");
        Ok(())
    }
}

impl<R: ScriptRunner> PlatformAutoLaunch for MacOsAutoLaunch<R> {
    fn enable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        if app.use_launch_agent() {
            return self.enable_launch_agent(app);
        }
        if self.is_enabled(app)? {
            debug!(app = app.app_name(), "login item already present");
            return Ok(());
        }
        self.run_checked(&system_events(&format!(
            "make login item at end with properties {}",
            login_item_properties(app)
        )))?;
        info!(app = app.app_name(), "added login item");
        Ok(())
    }

    fn disable(&self, app: &AutoLaunch) -> Result<(), AutoLaunchError> {
        if app.use_launch_agent() {
            let file = self.plist_file(app);
            return match fs::remove_file(&file) {
                Ok(()) => {
                    info!(app = app.app_name(), path = %file.display(), "removed launch agent");
                    Ok(())
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }
        self.run_checked(&system_events(&format!(
            "delete login item \"{}\"",
            escape_applescript(app.app_name())
        )))?;
        info!(app = app.app_name(), "deleted login item");
        Ok(())
    }

    fn is_enabled(&self, app: &AutoLaunch) -> Result<bool, AutoLaunchError> {
        if app.use_launch_agent() {
            return Ok(self.plist_file(app).try_exists()?);
        }
        let output = self
            .runner
            .run(&system_events("get the name of every login item"))?;
        if !output.success() {
            debug!(code = ?output.code, stderr = %output.stderr, "login item query failed");
            return Ok(false);
        }
        Ok(output
            .stdout
            .split(',')
            .map(str::trim)
            .any(|name| name == app.app_name()))
    }

    fn entry_path(&self, app: &AutoLaunch) -> Option<PathBuf> {
        app.use_launch_agent().then(|| self.plist_file(app))
    }
}

fn system_events(command: &str) -> String {
    format!("tell application \"System Events\" to {command}")
}

/// `{name:"..", path:"..", hidden:..}` record for `make login item`.
pub fn login_item_properties(app: &AutoLaunch) -> String {
    let hidden = app
        .args()
        .iter()
        .any(|a| a == "--hidden" || a == "--minimized");
    format!(
        "{{name:\"{}\", path:\"{}\", hidden:{}}}",
        escape_applescript(app.app_name()),
        escape_applescript(&app.app_file().display().to_string()),
        hidden
    )
}

/// Render the LaunchAgent property list for `app`.
pub fn launch_agent_plist(app: &AutoLaunch) -> String {
    let program_arguments: String = std::iter::once(app.app_file().display().to_string())
        .chain(app.args().iter().cloned())
        .map(|arg| format!("<string>{}</string>", escape_xml(&arg)))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
         <plist version=\"1.0\">\n\
         \x20   <dict>\n\
         \x20       <key>Label</key>\n\
         \x20       <string>{label}</string>\n\
         \x20       <key>ProgramArguments</key>\n\
         \x20       <array>{program_arguments}</array>\n\
         \x20       <key>RunAtLoad</key>\n\
         \x20       <true/>\n\
         \x20   </dict>\n\
         </plist>",
        label = escape_xml(app.app_name()),
    )
}

/// Escape text for use inside an AppleScript string literal.
pub fn escape_applescript(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
