//! Event Store
//!
//! The persistent calendar is an external collaborator. The orchestrator
//! only reads through this trait; writes happen when a caller confirms a
//! draft.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{CalendarEvent, EventDraft, TimeWindow};

/// Storage format for timestamps; sorts lexicographically
const TS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Calendar storage keyed by user
pub trait EventStore {
    /// Events fully inside `window`, ordered by start time ascending
    fn read(&self, user_id: &str, window: &TimeWindow) -> StoreResult<Vec<CalendarEvent>>;

    /// Persist a confirmed draft
    fn write(&self, user_id: &str, draft: &EventDraft) -> StoreResult<CalendarEvent>;
}

// ============================================================================
// In-Memory Store
// ============================================================================

/// Process-local store, mainly for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: Mutex<HashMap<String, Vec<CalendarEvent>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventStore for MemoryEventStore {
    fn read(&self, user_id: &str, window: &TimeWindow) -> StoreResult<Vec<CalendarEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| StoreError::Unavailable("event map poisoned".to_string()))?;

        let mut found: Vec<CalendarEvent> = events
            .get(user_id)
            .map(|list| {
                list.iter()
                    .filter(|e| window.contains(e.start_time, e.end_time))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        found.sort_by_key(|e| e.start_time);
        Ok(found)
    }

    fn write(&self, user_id: &str, draft: &EventDraft) -> StoreResult<CalendarEvent> {
        let event = CalendarEvent::from_draft(Uuid::new_v4().to_string(), draft);
        self.events
            .lock()
            .map_err(|_| StoreError::Unavailable("event map poisoned".to_string()))?
            .entry(user_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(event)
    }
}

// ============================================================================
// SQLite Store
// ============================================================================

/// SQLite-backed store (one `meetings` table)
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

/// Raw row before timestamp/attendee decoding
type MeetingRow = (
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    Option<String>,
    bool,
);

impl SqliteEventStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "opening event store");
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS meetings (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                title       TEXT NOT NULL,
                description TEXT,
                start_time  TEXT NOT NULL,
                end_time    TEXT NOT NULL,
                attendees   TEXT NOT NULL DEFAULT '[]',
                location    TEXT,
                is_virtual  INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_meetings_user_start
                ON meetings (user_id, start_time);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection poisoned".to_string()))
    }
}

impl EventStore for SqliteEventStore {
    fn read(&self, user_id: &str, window: &TimeWindow) -> StoreResult<Vec<CalendarEvent>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, description, start_time, end_time, attendees, location, is_virtual
             FROM meetings
             WHERE user_id = ?1 AND start_time >= ?2 AND end_time <= ?3
             ORDER BY start_time ASC",
        )?;

        let rows = stmt
            .query_map(
                params![
                    user_id,
                    window.start.format(TS_FORMAT).to_string(),
                    window.end.format(TS_FORMAT).to_string()
                ],
                |row| -> rusqlite::Result<MeetingRow> {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )?
            .collect::<rusqlite::Result<Vec<MeetingRow>>>()?;

        rows.into_iter().map(decode_row).collect()
    }

    fn write(&self, user_id: &str, draft: &EventDraft) -> StoreResult<CalendarEvent> {
        let event = CalendarEvent::from_draft(Uuid::new_v4().to_string(), draft);
        let attendees = serde_json::to_string(&event.attendees).map_err(|e| StoreError::Corrupt {
            id: event.id.clone(),
            reason: e.to_string(),
        })?;
        let created_at = chrono::Local::now().naive_local().format(TS_FORMAT).to_string();

        self.lock()?.execute(
            "INSERT INTO meetings
                (id, user_id, title, description, start_time, end_time, attendees, location, is_virtual, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                event.id,
                user_id,
                event.title,
                event.description,
                event.start_time.format(TS_FORMAT).to_string(),
                event.end_time.format(TS_FORMAT).to_string(),
                attendees,
                event.location,
                event.is_virtual,
                created_at,
            ],
        )?;
        debug!(id = %event.id, "stored event");
        Ok(event)
    }
}

fn decode_row(row: MeetingRow) -> StoreResult<CalendarEvent> {
    let (id, title, description, start, end, attendees, location, is_virtual) = row;
    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    let start_time = parse_ts(&start).map_err(|e| corrupt(format!("start_time: {}", e)))?;
    let end_time = parse_ts(&end).map_err(|e| corrupt(format!("end_time: {}", e)))?;
    let attendees: Vec<String> =
        serde_json::from_str(&attendees).map_err(|e| corrupt(format!("attendees: {}", e)))?;

    Ok(CalendarEvent {
        id,
        title,
        start_time,
        end_time,
        attendees,
        description,
        location,
        is_virtual,
    })
}

fn parse_ts(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
}
