//! Outbound message channel.
//!
//! The channel is whatever the desktop opens for a message-app deep link.
//! Opening it is the only step of a notification attempt that leaves the
//! process; a handler that fails to launch is a reportable condition.

use std::io::Write;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};

#[cfg(target_os = "linux")]
use attendlink_linux as platform;

#[cfg(target_os = "macos")]
use attendlink_mac as platform;

/// Handlers that return this quickly have usually just forwarded the URL to
/// an already-running application. Logged only; never used to decide
/// whether a message was sent.
const QUICK_RETURN: Duration = Duration::from_millis(50);

/// Something that can open a message-app deep link.
#[async_trait]
pub trait ChannelOpener: Send + Sync {
    /// Open `url` in the external message channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelUnavailable`] when the channel could not be
    /// opened.
    async fn open(&self, url: &str) -> Result<()>;
}

/// Opens deep links with the desktop's default URL handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    /// Name of the platform the handler runs on.
    #[must_use]
    pub fn platform_name() -> &'static str {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            platform::platform_name()
        }
        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            "unsupported"
        }
    }
}

#[async_trait]
impl ChannelOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        let started = Instant::now();

        tokio::task::spawn_blocking(move || open_with_platform(&url))
            .await
            .map_err(|e| Error::internal(format!("URL handler task failed: {e}")))??;

        let elapsed = started.elapsed();
        if elapsed < QUICK_RETURN {
            debug!(?elapsed, "URL handler returned immediately");
        }
        info!(platform = Self::platform_name(), "Opened message channel");
        Ok(())
    }
}

#[cfg(any(target_os = "linux", target_os = "macos"))]
fn open_with_platform(url: &str) -> Result<()> {
    platform::open_url(url).map_err(|e| Error::channel_unavailable(e.to_string()))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn open_with_platform(_url: &str) -> Result<()> {
    Err(Error::channel_unavailable(
        "no URL handler for this platform",
    ))
}

/// Prints deep links instead of opening them.
///
/// Used by `notify --no-open` and wherever no desktop session exists; the
/// operator pastes the printed link by hand. The link goes to stderr so
/// stdout stays a single report.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintChannel;

#[async_trait]
impl ChannelOpener for PrintChannel {
    async fn open(&self, url: &str) -> Result<()> {
        write_link(&mut std::io::stderr().lock(), url)
    }
}

fn write_link(out: &mut impl Write, url: &str) -> Result<()> {
    writeln!(out, "{url}")
        .map_err(|e| Error::channel_unavailable(format!("could not print link: {e}")))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Opener that records URLs and optionally refuses them.
    #[derive(Debug, Default)]
    pub struct RecordingOpener {
        pub opened: Mutex<Vec<String>>,
        pub refuse: bool,
    }

    impl RecordingOpener {
        pub fn refusing() -> Self {
            Self {
                refuse: true,
                ..Self::default()
            }
        }

        pub fn count(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChannelOpener for RecordingOpener {
        async fn open(&self, url: &str) -> Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            if self.refuse {
                return Err(Error::channel_unavailable("popup blocked"));
            }
            Ok(())
        }
    }
}
