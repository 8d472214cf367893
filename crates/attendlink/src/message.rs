//! Guardian follow-up messages.
//!
//! Builds the weekly progress message for one student and the message-app
//! deep link that carries it. Composition is pure apart from minting the
//! capability link.

use serde::Serialize;
use tracing::debug;

use crate::config::{ChannelConfig, MessageConfig};
use crate::error::{Result, ValidationError};
use crate::link::LinkBuilder;
use crate::phone::NormalizedPhone;
use crate::record::{StudentRecord, WeekNumber, WeekRecord};

/// Stored comments that are really a serialized `undefined` from the web UI.
const PLACEHOLDER_COMMENT: &str = "undefined";

/// A message ready to hand to the outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComposedMessage {
    /// Human-readable message text.
    pub body: String,
    /// Deep link that opens the message app with `body` pre-filled.
    pub target_url: String,
    /// The capability link embedded in `body`.
    pub capability_url: String,
}

/// Composes follow-up messages.
#[derive(Debug, Clone)]
pub struct MessageComposer {
    links: LinkBuilder,
    channel_base: String,
    sign_off: String,
}

impl MessageComposer {
    /// Create a composer.
    #[must_use]
    pub fn new(links: LinkBuilder, channel: &ChannelConfig, message: &MessageConfig) -> Self {
        Self {
            links,
            channel_base: channel.base_url.trim().trim_end_matches('/').to_string(),
            sign_off: message.sign_off.clone(),
        }
    }

    /// The link builder used for the embedded capability link.
    #[must_use]
    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Compose the message for one student and week.
    ///
    /// Homework and quiz lines only appear for weeks the student attended.
    /// A week the term has not reached yet reads as an absence.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingName`] if the student has no name,
    /// or an invalid-argument error if no link can be built for the id.
    pub fn compose(
        &self,
        student: &StudentRecord,
        week: WeekNumber,
        phone: &NormalizedPhone,
        ambient_origin: Option<&str>,
    ) -> Result<ComposedMessage> {
        let first_name = student.first_name().ok_or(ValidationError::MissingName)?;
        let link = self.links.link(&student.id, ambient_origin)?;
        let absent = WeekRecord::default();
        let record = student.week(week).unwrap_or(&absent);

        let mut lines = vec![
            "Follow up Message:".to_string(),
            String::new(),
            format!("Dear, {first_name}'s Parent"),
            "We want to inform you that we are in:".to_string(),
            String::new(),
            format!("  • Week: {week}"),
        ];

        if record.attended {
            let at = non_blank(record.last_attendance.as_deref()).unwrap_or("N/A");
            lines.push(format!("  • Attendance Info: {at}"));
            lines.push(format!("  • Homework: {}", record.homework_status));
            if let Some(score) = non_blank(record.quiz_score.as_deref()) {
                lines.push(format!("  • Quiz Degree: {score}"));
            }
        } else {
            lines.push("  • Attendance Info: Absent".to_string());
        }

        if let Some(comment) = non_blank(record.comment.as_deref())
            .filter(|c| *c != PLACEHOLDER_COMMENT)
        {
            lines.push(format!("  • Comment: {comment}"));
        }

        let capability_url = link.url();
        lines.extend([
            String::new(),
            format!("Please visit the following link to check {first_name}'s grades and progress: ⬇️"),
            String::new(),
            format!("🖇️ {capability_url}"),
            String::new(),
            "Note :-".to_string(),
            format!("  • {first_name}'s ID: {}", student.id),
            String::new(),
            "We are always happy to stay in touch 😊❤".to_string(),
            String::new(),
            format!("– {}", self.sign_off),
        ]);

        let body = lines.join("\n");
        let target_url = format!(
            "{}/{}?text={}",
            self.channel_base,
            phone,
            urlencoding::encode(&body)
        );

        debug!(student_id = %student.id, %week, attended = record.attended, "Composed message");
        Ok(ComposedMessage {
            body,
            target_url,
            capability_url,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
