//! Domain models for the calendar assistant
//!
//! This module contains the core types used throughout the pipeline, including:
//! - Intents and their extracted parameters
//! - Time windows, drafts and persisted calendar events
//! - The request/response contract exchanged with callers

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Intents
// ============================================================================

/// Intent kinds recognized by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    CreateEvent,
    ListEvents,
    Query,
}

impl IntentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::CreateEvent => "create_event",
            IntentKind::ListEvents => "list_events",
            IntentKind::Query => "query",
        }
    }
}

/// Calendar period requested by a list_events turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Tomorrow,
    Week,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Today => "today",
            Period::Tomorrow => "tomorrow",
            Period::Week => "week",
        }
    }

    /// Human phrasing used in replies ("today", "tomorrow", "this week")
    pub fn describe(period: Option<Period>) -> &'static str {
        match period {
            Some(Period::Today) => "today",
            Some(Period::Tomorrow) => "tomorrow",
            Some(Period::Week) | None => "this week",
        }
    }
}

/// Parameters extracted from user text. Absent hints are omitted, never null.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_hint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_hint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl IntentParams {
    pub fn is_empty(&self) -> bool {
        *self == IntentParams::default()
    }
}

/// A classified chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "params", rename_all = "snake_case")]
pub enum Intent {
    CreateEvent(IntentParams),
    ListEvents(IntentParams),
    Query(IntentParams),
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::CreateEvent(_) => IntentKind::CreateEvent,
            Intent::ListEvents(_) => IntentKind::ListEvents,
            Intent::Query(_) => IntentKind::Query,
        }
    }

    pub fn params(&self) -> &IntentParams {
        match self {
            Intent::CreateEvent(p) | Intent::ListEvents(p) | Intent::Query(p) => p,
        }
    }
}

// ============================================================================
// Calendar Models
// ============================================================================

/// Inclusive time range bounding a calendar query; `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct TimeWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Unchecked wire form of [`TimeWindow`]
#[derive(Deserialize)]
struct RawWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<RawWindow> for TimeWindow {
    type Error = String;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        if raw.start > raw.end {
            return Err(format!("window start {} is after end {}", raw.start, raw.end));
        }
        Ok(Self {
            start: raw.start,
            end: raw.end,
        })
    }
}

impl TimeWindow {
    /// Build a window, swapping the bounds if given out of order
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self { start: end, end: start }
        }
    }

    /// True when the event lies entirely inside the window
    pub fn contains(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        start >= self.start && end <= self.end
    }
}

/// Proposed event awaiting user confirmation. Not persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl EventDraft {
    /// Draft with the given title starting at `start`. Non-positive
    /// durations are clamped to one minute so that start < end holds.
    pub fn new(title: impl Into<String>, start: NaiveDateTime, duration: Duration) -> Self {
        let duration = if duration <= Duration::zero() {
            Duration::minutes(1)
        } else {
            duration
        };
        Self {
            title: title.into(),
            start_time: start,
            end_time: start + duration,
            attendees: Vec::new(),
            description: None,
            is_virtual: false,
            location: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// A persisted calendar event as returned by the event store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub is_virtual: bool,
}

impl CalendarEvent {
    /// Promote a confirmed draft to a stored event with the given id
    pub fn from_draft(id: impl Into<String>, draft: &EventDraft) -> Self {
        Self {
            id: id.into(),
            title: draft.title.clone(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            attendees: draft.attendees.clone(),
            description: draft.description.clone(),
            location: draft.location.clone(),
            is_virtual: draft.is_virtual,
        }
    }

    /// "09:00 AM - 10:00 AM"
    pub fn time_range(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%I:%M %p"),
            self.end_time.format("%I:%M %p")
        )
    }

    /// "Monday, Oct 19"
    pub fn display_date(&self) -> String {
        self.start_time.format("%A, %b %-d").to_string()
    }
}

/// Display-ready meeting entry carried in list_events calendar data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingSummary {
    pub title: String,
    pub time: String,
    pub date: String,
    pub is_virtual: bool,
}

impl From<&CalendarEvent> for MeetingSummary {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            title: event.title.clone(),
            time: event.time_range(),
            date: event.display_date(),
            is_virtual: event.is_virtual,
        }
    }
}

// ============================================================================
// Request / Response Contract
// ============================================================================

/// Inbound chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub user_id: String,
}

/// Structured action returned alongside the reply text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum CalendarData {
    #[serde(rename_all = "camelCase")]
    CreateEvent {
        proposed_details: IntentParams,
        draft: EventDraft,
    },
    #[serde(rename_all = "camelCase")]
    ListEvents {
        period: String,
        window: TimeWindow,
        meetings: Vec<MeetingSummary>,
    },
}

/// Advisory kind surfaced when the generative backend could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Quota or rate limit hit; callers show a persistent notice
    QuotaExceeded,
    /// Connectivity or upstream failure; callers show a transient notice
    ApiError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub kind: ErrorType,
    pub message: String,
}

/// Successful chat response. `response` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub calendar_data: Option<CalendarData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Body of a request-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_params_skip_absent_fields() {
        let params = IntentParams {
            date_hint: Some("for tomorrow".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"dateHint":"for tomorrow"}"#);
        assert!(!json.contains("null"));
    }

    #[test]
    fn test_intent_serializes_tagged() {
        let intent = Intent::ListEvents(IntentParams {
            period: Some(Period::Week),
            ..Default::default()
        });
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["intent"], "list_events");
        assert_eq!(json["params"]["period"], "week");
    }

    #[test]
    fn test_window_orders_bounds() {
        let a = at(2026, 10, 19, 0, 0);
        let b = at(2026, 10, 18, 0, 0);
        let window = TimeWindow::new(a, b);
        assert!(window.start <= window.end);
        assert_eq!(window.start, b);
    }

    #[test]
    fn test_window_deserialize_rejects_inverted_bounds() {
        let ok: TimeWindow = serde_json::from_str(
            r#"{"start":"2026-10-18T00:00:00","end":"2026-10-18T23:59:59.999"}"#,
        )
        .unwrap();
        assert_eq!(ok.start, at(2026, 10, 18, 0, 0));

        let inverted = serde_json::from_str::<TimeWindow>(
            r#"{"start":"2026-10-19T00:00:00","end":"2026-10-18T00:00:00"}"#,
        );
        assert!(inverted.is_err());
    }

    #[test]
    fn test_draft_clamps_non_positive_duration() {
        let start = at(2026, 10, 19, 9, 0);
        let draft = EventDraft::new("Standup", start, Duration::zero());
        assert!(draft.start_time < draft.end_time);
    }

    #[test]
    fn test_meeting_summary_formatting() {
        let draft = EventDraft::new("Review", at(2026, 10, 19, 14, 0), Duration::minutes(30));
        let event = CalendarEvent::from_draft("e1", &draft);
        let summary = MeetingSummary::from(&event);
        assert_eq!(summary.time, "02:00 PM - 02:30 PM");
        assert_eq!(summary.date, "Monday, Oct 19");
    }

    #[test]
    fn test_response_error_type_field() {
        let response = ChatResponse {
            response: "hi".to_string(),
            calendar_data: None,
            error: Some(ErrorInfo {
                kind: ErrorType::QuotaExceeded,
                message: "quota".to_string(),
            }),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["type"], "quota_exceeded");
        assert!(json["calendarData"].is_null());
    }
}
