//! macOS-specific implementation for attendlink.
//!
//! This crate hands URLs to Launch Services via `/usr/bin/open`, which routes
//! `https://` links to the default browser and custom schemes to the app that
//! registered them.

#![cfg(target_os = "macos")]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io;
use std::process::{Command, Stdio};

/// Launch Services command-line front end.
const OPENER: &str = "/usr/bin/open";

/// Get the platform name.
#[must_use]
pub fn platform_name() -> &'static str {
    "macOS"
}

/// Open a URL with the default handler.
///
/// # Errors
///
/// Returns an error if `open` cannot be spawned or reports that no
/// application could handle the URL.
pub fn open_url(url: &str) -> io::Result<()> {
    tracing::debug!(opener = OPENER, "Handing URL to Launch Services");
    let status = Command::new(OPENER)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;

    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("open exited with {status}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_name() {
        assert_eq!(platform_name(), "macOS");
    }
}
