//! Student and week records.
//!
//! Records arrive from the web front end's document store with loosely typed
//! fields (numeric ids, boolean-or-string homework flags, numeric quiz
//! scores). They are normalized once, here, so the rest of the crate deals
//! only in typed optional fields.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

/// Homework outcome for one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "Value")]
pub enum HomeworkStatus {
    /// Homework handed in.
    Done,
    /// Homework missing.
    #[default]
    NotDone,
    /// No homework was set that week.
    NoHomework,
    /// Homework handed in partially.
    NotCompleted,
}

impl HomeworkStatus {
    /// Stable storage key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::NotDone => "not_done",
            Self::NoHomework => "no_homework",
            Self::NotCompleted => "not_completed",
        }
    }

    /// Parse a stored or imported value. Returns `None` when unrecognized.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "done" | "true" => Some(Self::Done),
            "not done" | "not_done" | "false" => Some(Self::NotDone),
            "no homework" | "no_homework" => Some(Self::NoHomework),
            "not completed" | "not_completed" => Some(Self::NotCompleted),
            _ => None,
        }
    }

    /// Parse a stored value, degrading anything unrecognized to `NotDone`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            warn!("Unknown homework status: {value:?}, defaulting to not done");
            Self::NotDone
        })
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "Done"),
            Self::NotDone => write!(f, "Not Done"),
            Self::NoHomework => write!(f, "No Homework"),
            Self::NotCompleted => write!(f, "Not Completed"),
        }
    }
}

impl From<Value> for HomeworkStatus {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => Self::Done,
            Value::String(s) => Self::parse_lenient(&s),
            _ => Self::NotDone,
        }
    }
}

/// One week of a student's term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WeekRecord {
    /// Whether the student attended the session.
    pub attended: bool,
    /// When the student was checked in; meaningful only when attended.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attendance: Option<String>,
    /// Homework outcome.
    #[serde(alias = "hwDone")]
    pub homework_status: HomeworkStatus,
    /// Quiz result as entered by staff (`8/10`, `17`, ...).
    #[serde(
        alias = "quizDegree",
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub quiz_score: Option<String>,
    /// Free-text remark for the guardian.
    #[serde(
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub comment: Option<String>,
    /// Whether the latest notification for this week counts as delivered.
    #[serde(alias = "message_state")]
    pub message_state: bool,
}

/// A student as seen by the notification workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Stable identifier; integers are held as their decimal text.
    #[serde(deserialize_with = "required_text")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Guardian contact number, formatted however it was typed.
    #[serde(
        default,
        alias = "parents_phone",
        deserialize_with = "optional_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub guardian_phone: Option<String>,
    /// Weeks of the term; index 0 is week 1.
    #[serde(default)]
    pub weeks: Vec<WeekRecord>,
}

impl StudentRecord {
    /// Create a record with no weeks.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            guardian_phone: None,
            weeks: Vec::new(),
        }
    }

    /// First token of the display name, used as an informal salutation.
    #[must_use]
    pub fn first_name(&self) -> Option<&str> {
        self.name.split_whitespace().next()
    }

    /// The record for a given week, if the term has reached it.
    #[must_use]
    pub fn week(&self, week: WeekNumber) -> Option<&WeekRecord> {
        self.weeks.get(week.index())
    }

    /// Parse a list of records from a JSON document.
    ///
    /// Accepts either a single object or an array of objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON or a record has no
    /// usable id.
    pub fn parse_many(json: &str) -> Result<Vec<Self>> {
        let value: Value = serde_json::from_str(json)?;
        let records = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        Ok(records)
    }
}

/// A one-based week number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WeekNumber(NonZeroU32);

impl WeekNumber {
    /// Week 1, used when no week is selected.
    pub const FIRST: Self = Self(NonZeroU32::MIN);

    /// Highest week a term can reach.
    pub const MAX: u32 = 52;

    /// Create a week number.
    ///
    /// # Errors
    ///
    /// Returns an error for week 0 or a week past [`WeekNumber::MAX`].
    pub fn new(week: u32) -> Result<Self> {
        if week > Self::MAX {
            return Err(Error::invalid_argument(format!(
                "week {week} is past the end of the term (max {})",
                Self::MAX
            )));
        }
        NonZeroU32::new(week)
            .map(Self)
            .ok_or_else(|| Error::invalid_argument("week numbers start at 1"))
    }

    /// The week as a plain number.
    #[must_use]
    pub fn get(self) -> u32 {
        self.0.get()
    }

    /// Zero-based position in [`StudentRecord::weeks`].
    #[must_use]
    pub fn index(self) -> usize {
        usize::try_from(self.0.get() - 1).unwrap_or(usize::MAX)
    }
}

impl Default for WeekNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for WeekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for WeekNumber {
    type Error = Error;

    fn try_from(week: u32) -> Result<Self> {
        Self::new(week)
    }
}

impl From<WeekNumber> for u32 {
    fn from(week: WeekNumber) -> Self {
        week.get()
    }
}

impl FromStr for WeekNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let week: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_argument(format!("not a week number: {s:?}")))?;
        Self::new(week)
    }
}

/// Text from a JSON string or number; blank and null become `None`.
fn optional_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Text from a JSON string or number, rejecting anything else.
fn required_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {other}"
        ))),
    }
}
