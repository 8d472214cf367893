//! Storage layer for attendlink.
//!
//! `SQLite`-backed record store for students, their weekly records and the
//! per-week delivery flag written after every notification attempt.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::delivery::DeliveryStore;
use crate::error::{Error, Result};
use crate::record::{HomeworkStatus, StudentRecord, WeekNumber, WeekRecord};

/// Storage engine for student records.
///
/// The connection sits behind a mutex so one `Storage` can be shared by the
/// async notification workflow.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Mutex<Connection>,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(conn),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::internal("database connection mutex poisoned"))
    }

    /// Insert or replace a student together with all of their weeks.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is blank or the database operation fails.
    pub fn upsert_student(&self, student: &StudentRecord) -> Result<()> {
        let id = student.id.trim();
        if id.is_empty() {
            return Err(Error::invalid_argument("student id must not be empty"));
        }
        if student.weeks.len() > WeekNumber::MAX as usize {
            return Err(Error::invalid_argument(format!(
                "student {id} has {} weeks; a term has at most {}",
                student.weeks.len(),
                WeekNumber::MAX
            )));
        }

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r"
            INSERT INTO students (id, name, guardian_phone) VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                guardian_phone = excluded.guardian_phone
            ",
            params![id, student.name, student.guardian_phone],
        )?;
        tx.execute("DELETE FROM weeks WHERE student_id = ?1", [id])?;

        {
            let mut stmt = tx.prepare(
                r"
                INSERT INTO weeks (student_id, week_number, attended, last_attendance,
                    homework_status, quiz_score, comment, message_state, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )?;
            for (number, week) in (1_i64..).zip(&student.weeks) {
                stmt.execute(params![
                    id,
                    number,
                    week.attended,
                    week.last_attendance,
                    week.homework_status.as_str(),
                    week.quiz_score,
                    week.comment,
                    week.message_state,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        debug!(student_id = id, weeks = student.weeks.len(), "Upserted student");
        Ok(())
    }

    /// Get a student by id.
    ///
    /// Weeks come back as a dense sequence: any gap left by out-of-band
    /// writes is filled with a default (absent) week.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_student(&self, id: &str) -> Result<Option<StudentRecord>> {
        let id = id.trim();
        let conn = self.conn()?;

        let student = conn
            .query_row(
                "SELECT id, name, guardian_phone FROM students WHERE id = ?1",
                [id],
                |row| {
                    Ok(StudentRecord {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        guardian_phone: row.get(2)?,
                        weeks: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut student) = student else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r"
            SELECT week_number, attended, last_attendance, homework_status,
                   quiz_score, comment, message_state
            FROM weeks WHERE student_id = ?1 ORDER BY week_number ASC
            ",
        )?;
        let rows = stmt
            .query_map([id], Self::row_to_week)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (number, week) in rows {
            let Some(week_number) = u32::try_from(number).ok().and_then(|n| WeekNumber::new(n).ok())
            else {
                warn!(student_id = id, week_number = number, "Skipping out-of-range week row");
                continue;
            };
            let index = week_number.index();
            if student.weeks.len() <= index {
                student.weeks.resize_with(index + 1, WeekRecord::default);
            }
            student.weeks[index] = week;
        }

        Ok(Some(student))
    }

    /// List every student with a summary of their weeks.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_students(&self) -> Result<Vec<StudentSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r"
            SELECT s.id, s.name, s.guardian_phone,
                   COUNT(w.week_number), COALESCE(SUM(w.message_state), 0)
            FROM students s LEFT JOIN weeks w ON w.student_id = s.id
            GROUP BY s.id ORDER BY s.name ASC, s.id ASC
            ",
        )?;

        let students = stmt
            .query_map([], |row| {
                Ok(StudentSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    guardian_phone: row.get(2)?,
                    weeks: row.get(3)?,
                    delivered: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(students)
    }

    /// Set the delivery flag of one week.
    ///
    /// Creates the week row if the term had not reached it yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudentNotFound`] if the student does not exist, or an
    /// error if the database operation fails.
    pub fn write_message_state(
        &self,
        student_id: &str,
        week: WeekNumber,
        delivered: bool,
    ) -> Result<()> {
        let student_id = student_id.trim();
        let conn = self.conn()?;

        let exists: i64 = conn.query_row(
            "SELECT COUNT(*) FROM students WHERE id = ?1",
            [student_id],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(Error::student_not_found(student_id));
        }

        conn.execute(
            r"
            INSERT INTO weeks (student_id, week_number, message_state, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(student_id, week_number) DO UPDATE SET
                message_state = excluded.message_state,
                updated_at = excluded.updated_at
            ",
            params![student_id, week.get(), delivered, Utc::now().to_rfc3339()],
        )?;

        debug!(student_id, %week, delivered, "Updated message state");
        Ok(())
    }

    /// Get the delivery flag of one week and when it was last written.
    ///
    /// Returns `None` if no row exists for that week.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delivery_state(&self, student_id: &str, week: WeekNumber) -> Result<Option<DeliveryState>> {
        let conn = self.conn()?;
        let state = conn
            .query_row(
                "SELECT message_state, updated_at FROM weeks WHERE student_id = ?1 AND week_number = ?2",
                params![student_id.trim(), week.get()],
                |row| {
                    let delivered: bool = row.get(0)?;
                    let updated_at: Option<String> = row.get(1)?;
                    Ok(DeliveryState {
                        delivered,
                        updated_at: updated_at.as_deref().and_then(parse_timestamp),
                    })
                },
            )
            .optional()?;
        Ok(state)
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;

        let students: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |row| row.get(0))?;
        let (weeks, delivered): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(message_state), 0) FROM weeks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let last_update: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM weeks WHERE updated_at IS NOT NULL ORDER BY updated_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            students,
            weeks,
            delivered,
            last_update: last_update.as_deref().and_then(parse_timestamp),
            db_size_bytes,
        })
    }

    fn row_to_week(row: &rusqlite::Row) -> rusqlite::Result<(i64, WeekRecord)> {
        let number: i64 = row.get(0)?;
        let homework: String = row.get(3)?;
        Ok((
            number,
            WeekRecord {
                attended: row.get(1)?,
                last_attendance: row.get(2)?,
                homework_status: HomeworkStatus::parse_lenient(&homework),
                quiz_score: row.get(4)?,
                comment: row.get(5)?,
                message_state: row.get(6)?,
            },
        ))
    }
}

#[async_trait]
impl DeliveryStore for Storage {
    async fn set_message_state(
        &self,
        student_id: &str,
        week: WeekNumber,
        delivered: bool,
    ) -> Result<()> {
        self.write_message_state(student_id, week, delivered)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// One row of `student list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentSummary {
    /// Student id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Guardian number as stored.
    pub guardian_phone: Option<String>,
    /// Number of stored weeks.
    pub weeks: i64,
    /// Weeks whose latest notification counts as delivered.
    pub delivered: i64,
}

/// Delivery flag of one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryState {
    /// Whether the latest attempt counts as delivered.
    pub delivered: bool,
    /// When the row was last written.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Statistics about the storage database.
#[derive(Debug, Clone, Serialize)]
pub struct StorageStats {
    /// Number of students.
    pub students: i64,
    /// Number of stored week rows.
    pub weeks: i64,
    /// Week rows flagged as delivered.
    pub delivered: i64,
    /// Most recent week write.
    pub last_update: Option<DateTime<Utc>>,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
