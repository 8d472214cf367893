//! `attendlink` - signed guardian links and attendance follow-up notifications
//!
//! This library mints tamper-evident capability links that give a guardian
//! read-only access to one student's page, and runs the workflow that sends
//! the weekly follow-up message and records whether it got through.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod channel;
pub mod cli;
pub mod config;
pub mod delivery;
pub mod error;
pub mod link;
pub mod logging;
pub mod message;
pub mod notify;
pub mod phone;
pub mod record;
pub mod signature;
pub mod storage;

pub use channel::{ChannelOpener, PrintChannel, SystemBrowser};
pub use config::Config;
pub use delivery::{DeliveryRecorder, DeliveryStore, Persistence};
pub use error::{Error, Result, ValidationError};
pub use link::{parse_link, CapabilityLink, LinkBuilder};
pub use logging::init_logging;
pub use message::{ComposedMessage, MessageComposer};
pub use notify::{FailureReason, Notifier, NotifyReport, Outcome};
pub use phone::{NormalizedPhone, PhoneValidator};
pub use record::{HomeworkStatus, StudentRecord, WeekNumber, WeekRecord};
pub use signature::{SignatureScheme, Signer};
pub use storage::{Storage, StorageStats};
