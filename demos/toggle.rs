//! Register a binary to start at login, then walk it through every state.
//!
//! ```text
//! RUST_LOG=autolaunch=debug cargo run --example toggle -- /path/to/app --minimized
//! ```

use std::env;
use std::process::ExitCode;

use autolaunch::{AutoLaunch, AutoLaunchError};
use tracing_subscriber::EnvFilter;

fn run() -> Result<(), AutoLaunchError> {
    let mut argv = env::args().skip(1);
    let app_file = argv.next().ok_or(AutoLaunchError::MissingAppFile)?;

    let app = AutoLaunch::builder()
        .app_name("autolaunch-demo")
        .app_file(app_file)
        .args(argv)
        // macOS: use a LaunchAgent instead of AppleScript
        .use_launch_agent()
        .build()?;

    app.enable()?;
    println!("enabled: {}", app.is_enabled()?);

    app.disable()?;
    println!("after disable: {}", app.is_enabled()?);

    let state = app.toggle()?;
    println!("after toggle: {state}");

    app.disable()?;
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
