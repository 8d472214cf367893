//! Configuration management for attendlink.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::fmt;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::link::LinkBuilder;
use crate::message::MessageComposer;
use crate::phone::PhoneValidator;
use crate::signature::{SignatureScheme, Signer};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "attendlink";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "attendance.db";

/// Prefix for environment variable overrides.
const ENV_PREFIX: &str = "ATTENDLINK_";

/// Placeholder printed instead of the shared secret.
const REDACTED: &str = "********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `ATTENDLINK_`, sections split by `__`)
/// 2. TOML config file at `~/.config/attendlink/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Link signing configuration.
    pub signing: SigningConfig,
    /// Capability link configuration.
    pub links: LinkConfig,
    /// Guardian phone number rules.
    pub phone: PhoneConfig,
    /// Outbound message channel configuration.
    pub channel: ChannelConfig,
    /// Message template configuration.
    pub message: MessageConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Link signing configuration.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Shared secret bound into every link signature.
    /// Must be set before links can be built or verified.
    pub secret: Option<String>,
    /// How the secret and student id are combined.
    pub scheme: SignatureScheme,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Capability link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Origin used when the caller has no ambient origin of its own.
    pub default_origin: String,
    /// Path of the read-only student page.
    pub path: String,
}

/// National mobile-number rules for guardian phones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhoneConfig {
    /// Number of digits in a national mobile number.
    pub national_length: usize,
    /// Required leading digits of a national mobile number.
    pub mobile_prefix: String,
    /// Country calling code replacing the trunk `0`.
    pub country_code: String,
}

/// Outbound message channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Base of the message-app deep link.
    pub base_url: String,
    /// Hand deep links to the desktop's default handler.
    /// When false the link is only printed.
    pub open_in_browser: bool,
}

/// Message template configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Name on the closing signature line.
    pub sign_off: String,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/attendlink/attendance.db`
    pub database_path: Option<PathBuf>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            default_origin: "http://localhost:3000".to_string(),
            path: "/student-info".to_string(),
        }
    }
}

impl Default for PhoneConfig {
    fn default() -> Self {
        Self {
            national_length: 11,
            mobile_prefix: "01".to_string(),
            country_code: "20".to_string(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://wa.me".to_string(),
            open_in_browser: true,
        }
    }
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            sign_off: "Mrs. Sara Atef".to_string(),
        }
    }
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `ATTENDLINK_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// An unset secret is accepted here; commands that sign or verify links
    /// fail later through [`Config::signer`].
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if let Some(secret) = &self.signing.secret {
            if secret.trim().is_empty() {
                return Err(invalid("signing.secret must not be empty when set"));
            }
        }

        let origin = &self.links.default_origin;
        if !(origin.starts_with("http://") || origin.starts_with("https://")) {
            return Err(invalid(format!(
                "links.default_origin must start with http:// or https://, got {origin:?}"
            )));
        }

        if !self.links.path.starts_with('/') {
            return Err(invalid(format!(
                "links.path must start with '/', got {:?}",
                self.links.path
            )));
        }

        // Validate phone rules
        let phone = &self.phone;
        if !all_digits(&phone.mobile_prefix) || !phone.mobile_prefix.starts_with('0') {
            return Err(invalid(format!(
                "phone.mobile_prefix must be digits starting with 0, got {:?}",
                phone.mobile_prefix
            )));
        }
        if phone.national_length <= phone.mobile_prefix.len() {
            return Err(invalid(format!(
                "phone.national_length ({}) must be greater than the prefix length ({})",
                phone.national_length,
                phone.mobile_prefix.len()
            )));
        }
        if !all_digits(&phone.country_code) {
            return Err(invalid(format!(
                "phone.country_code must be digits, got {:?}",
                phone.country_code
            )));
        }

        if self.channel.base_url.trim().is_empty() {
            return Err(invalid("channel.base_url must not be empty"));
        }

        Ok(())
    }

    /// Build the link signer from the configured secret and scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if no shared secret is configured.
    pub fn signer(&self) -> Result<Signer> {
        match self.signing.secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => {
                Ok(Signer::new(secret, self.signing.scheme))
            }
            _ => Err(invalid(format!(
                "signing.secret is not set; add it to the config file or set {ENV_PREFIX}SIGNING__SECRET"
            ))),
        }
    }

    /// Build the capability link builder.
    ///
    /// # Errors
    ///
    /// Returns an error if no shared secret is configured.
    pub fn link_builder(&self) -> Result<LinkBuilder> {
        Ok(LinkBuilder::new(self.signer()?, &self.links))
    }

    /// Build the message composer.
    ///
    /// # Errors
    ///
    /// Returns an error if no shared secret is configured.
    pub fn composer(&self) -> Result<MessageComposer> {
        Ok(MessageComposer::new(
            self.link_builder()?,
            &self.channel,
            &self.message,
        ))
    }

    /// Build the guardian phone validator.
    #[must_use]
    pub fn phone_validator(&self) -> PhoneValidator {
        PhoneValidator::new(&self.phone)
    }

    /// A copy of this configuration that is safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.signing.secret.is_some() {
            copy.signing.secret = Some(REDACTED.to_string());
        }
        copy
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
