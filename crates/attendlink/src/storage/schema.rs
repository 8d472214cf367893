//! `SQLite` schema definitions for attendlink.
//!
//! Students and their weeks live in two tables; a week row is keyed by
//! `(student_id, week_number)` so delivery-state writes are plain upserts.

/// SQL statement to create the students table.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    guardian_phone TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create the weeks table.
///
/// `week_number` is one-based. `homework_status` holds the storage key of a
/// homework status; unknown keys are tolerated on read.
pub const CREATE_WEEKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS weeks (
    student_id TEXT NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    week_number INTEGER NOT NULL CHECK (week_number >= 1),
    attended INTEGER NOT NULL DEFAULT 0,
    last_attendance TEXT,
    homework_status TEXT NOT NULL DEFAULT 'not_done',
    quiz_score TEXT,
    comment TEXT,
    message_state INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT,
    PRIMARY KEY (student_id, week_number)
)
";

/// SQL statement to create an index for delivery counts.
pub const CREATE_MESSAGE_STATE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_weeks_message_state ON weeks(message_state)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_STUDENTS_TABLE,
    CREATE_WEEKS_TABLE,
    CREATE_MESSAGE_STATE_INDEX,
    CREATE_METADATA_TABLE,
];
