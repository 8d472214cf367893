//! Linux-specific implementation for attendlink
//!
//! This crate hands URLs to the desktop's default handler through `xdg-open`.

#![cfg(target_os = "linux")]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::process::{Command, Stdio};

/// Program used to open URLs with the user's preferred application.
const OPENER: &str = "xdg-open";

/// Get platform name
#[must_use]
pub fn platform_name() -> &'static str {
    "Linux"
}

/// Open a URL with the desktop's default handler.
///
/// # Errors
///
/// Returns an error if `xdg-open` cannot be spawned (no desktop session,
/// not installed) or exits with a failure status.
pub fn open_url(url: &str) -> io::Result<()> {
    tracing::debug!(opener = OPENER, "Handing URL to desktop handler");
    let status = Command::new(OPENER)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{OPENER} exited with {status}")))
    }
}
