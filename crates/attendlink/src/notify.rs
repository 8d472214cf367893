//! The guardian notification workflow.
//!
//! One attempt runs straight through:
//!
//! ```text
//! validate phone -> check name -> compose -> open channel -> record outcome
//! ```
//!
//! Any failure short-circuits to recording a failed delivery. Every attempt
//! ends with exactly one delivery-state write and nothing is retried.

use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::channel::ChannelOpener;
use crate::config::Config;
use crate::delivery::{DeliveryRecorder, DeliveryStore, Persistence};
use crate::error::{Error, ValidationError};
use crate::message::{ComposedMessage, MessageComposer};
use crate::phone::PhoneValidator;
use crate::record::{StudentRecord, WeekNumber};

/// Shown when the channel opened and the flag was recorded.
pub const MSG_SENT: &str = "Message channel opened successfully!";
/// Shown when the channel opened but the flag could not be recorded.
pub const MSG_SENT_NOT_RECORDED: &str = "Message sent but failed to update status";
/// Shown when the channel could not be opened.
pub const MSG_CHANNEL_UNAVAILABLE: &str =
    "Could not open the message channel - check that a browser is available and try again";
/// Shown when no link could be built for the student.
pub const MSG_LINK_FAILED: &str = "Could not generate the student link";
/// Shown for anything else.
pub const MSG_UNEXPECTED: &str = "Error occurred while opening the message channel";

/// Why an attempt did not get through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Student data failed validation.
    Validation(ValidationError),
    /// No capability link could be built.
    LinkGeneration(String),
    /// The message channel could not be opened.
    ChannelUnavailable(String),
    /// Anything else.
    Unexpected(String),
}

impl From<Error> for FailureReason {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(kind) => Self::Validation(kind),
            Error::InvalidArgument(msg) => Self::LinkGeneration(msg),
            Error::ChannelUnavailable(msg) => Self::ChannelUnavailable(msg),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(kind) => write!(f, "{kind}"),
            Self::LinkGeneration(msg) => write!(f, "link generation failed: {msg}"),
            Self::ChannelUnavailable(msg) => write!(f, "channel unavailable: {msg}"),
            Self::Unexpected(msg) => write!(f, "unexpected error: {msg}"),
        }
    }
}

/// Result of the notification itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    /// The message channel was opened with the composed message.
    Sent,
    /// The attempt stopped before the message went out.
    Failed(FailureReason),
}

impl Outcome {
    /// Whether the message went out.
    #[must_use]
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Everything the caller needs to know about one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotifyReport {
    /// Student the attempt was for.
    pub student_id: String,
    /// Week the message was about.
    pub week: WeekNumber,
    /// Notification result.
    pub outcome: Outcome,
    /// Result of the delivery-state write.
    pub persistence: Persistence,
    /// The composed message, if composition got that far.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<ComposedMessage>,
}

impl NotifyReport {
    /// The one-line status to show the operator.
    #[must_use]
    pub fn user_message(&self) -> String {
        match (&self.outcome, &self.persistence) {
            (Outcome::Sent, Persistence::Persisted) => MSG_SENT.to_string(),
            (Outcome::Sent, Persistence::Failed { .. }) => MSG_SENT_NOT_RECORDED.to_string(),
            (Outcome::Failed(reason), _) => match reason {
                FailureReason::Validation(kind) => kind.to_string(),
                FailureReason::LinkGeneration(_) => MSG_LINK_FAILED.to_string(),
                FailureReason::ChannelUnavailable(_) => MSG_CHANNEL_UNAVAILABLE.to_string(),
                FailureReason::Unexpected(_) => MSG_UNEXPECTED.to_string(),
            },
        }
    }

    /// Whether a cached copy of the record may mark the week delivered.
    ///
    /// Only when the message went out and the flag is durably stored, so a
    /// local view never disagrees with the database.
    #[must_use]
    pub fn should_apply_local_update(&self) -> bool {
        self.outcome.is_sent() && self.persistence.is_persisted()
    }
}

/// Runs notification attempts.
#[derive(Debug)]
pub struct Notifier<O, S> {
    validator: PhoneValidator,
    /// `Err` holds why no capability link can be built; attempts still run
    /// and record a failed delivery.
    composer: std::result::Result<MessageComposer, String>,
    opener: O,
    recorder: DeliveryRecorder<S>,
}

impl<O: ChannelOpener, S: DeliveryStore> Notifier<O, S> {
    /// Create a notifier.
    pub fn new(validator: PhoneValidator, composer: MessageComposer, opener: O, store: S) -> Self {
        Self {
            validator,
            composer: Ok(composer),
            opener,
            recorder: DeliveryRecorder::new(store),
        }
    }

    /// Create a notifier from configuration.
    ///
    /// A configuration that cannot sign links (no shared secret) still
    /// yields a notifier; each attempt then fails with
    /// [`FailureReason::LinkGeneration`] and is recorded as not delivered.
    pub fn from_config(config: &Config, opener: O, store: S) -> Self {
        let composer = config.composer().map_err(|e| {
            warn!(error = %e, "Capability links unavailable");
            e.to_string()
        });
        Self {
            validator: config.phone_validator(),
            composer,
            opener,
            recorder: DeliveryRecorder::new(store),
        }
    }

    /// The delivery store.
    pub fn store(&self) -> &S {
        self.recorder.store()
    }

    /// Run one notification attempt for a student's week.
    ///
    /// Never fails: every outcome, including a failed delivery-state write,
    /// is described by the returned report.
    pub async fn notify(
        &self,
        student: &StudentRecord,
        week: WeekNumber,
        ambient_origin: Option<&str>,
    ) -> NotifyReport {
        let student_id = student.id.trim().to_string();
        let (outcome, message) = self.attempt(student, week, ambient_origin).await;

        match &outcome {
            Outcome::Sent => info!(%student_id, %week, outcome = "sent", "Notification sent"),
            Outcome::Failed(reason) => {
                warn!(%student_id, %week, outcome = "failed", %reason, "Notification failed");
            }
        }

        let persistence = self.recorder.record(&student_id, week, outcome.is_sent()).await;

        NotifyReport {
            student_id,
            week,
            outcome,
            persistence,
            message,
        }
    }

    async fn attempt(
        &self,
        student: &StudentRecord,
        week: WeekNumber,
        ambient_origin: Option<&str>,
    ) -> (Outcome, Option<ComposedMessage>) {
        let phone = match self.validator.validate(student.guardian_phone.as_deref()) {
            Ok(phone) => phone,
            Err(kind) => return (Outcome::Failed(FailureReason::Validation(kind)), None),
        };
        debug!(student_id = %student.id, %phone, "Guardian number validated");

        if student.first_name().is_none() {
            let reason = FailureReason::Validation(ValidationError::MissingName);
            return (Outcome::Failed(reason), None);
        }

        let composer = match &self.composer {
            Ok(composer) => composer,
            Err(msg) => {
                return (Outcome::Failed(FailureReason::LinkGeneration(msg.clone())), None);
            }
        };

        let message = match composer.compose(student, week, &phone, ambient_origin) {
            Ok(message) => message,
            Err(e) => return (Outcome::Failed(e.into()), None),
        };

        match self.opener.open(&message.target_url).await {
            Ok(()) => (Outcome::Sent, Some(message)),
            Err(e) => (Outcome::Failed(e.into()), Some(message)),
        }
    }
}
