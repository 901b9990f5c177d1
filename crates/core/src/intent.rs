//! Heuristic Intent Classification
//!
//! Keyword rules evaluated top to bottom (first match wins) followed by
//! regex-based hint extraction for the winning intent.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::{Intent, IntentKind, IntentParams, Period};

/// A classification rule: predicate over the lowercased text
type Rule = (fn(&str) -> bool, IntentKind);

/// Ordered rule table. Query is the implicit fallback.
const RULES: &[Rule] = &[
    (is_create_event, IntentKind::CreateEvent),
    (is_list_events, IntentKind::ListEvents),
];

fn is_create_event(t: &str) -> bool {
    t.contains("schedule")
        || t.contains("create meeting")
        || t.contains("add event")
        || (t.contains("set up") && (t.contains("meeting") || t.contains("call")))
}

fn is_list_events(t: &str) -> bool {
    (t.contains("show") && t.contains("calendar"))
        || (t.contains("list") && t.contains("events"))
        || (t.contains("what") && (t.contains("schedule") || t.contains("meetings")))
        || (t.contains("events")
            && (t.contains("today") || t.contains("tomorrow") || t.contains("this week")))
}

/// Kind of the first matching rule
pub fn classify_kind(text: &str) -> IntentKind {
    let t = text.to_lowercase();
    RULES
        .iter()
        .find(|(matches, _)| matches(&t))
        .map(|(_, kind)| *kind)
        .unwrap_or(IntentKind::Query)
}

/// Classify user text and extract the parameters for its intent
pub fn classify(text: &str) -> Intent {
    match classify_kind(text) {
        IntentKind::CreateEvent => Intent::CreateEvent(extract_event_params(text)),
        IntentKind::ListEvents => Intent::ListEvents(IntentParams {
            period: extract_period(&text.to_lowercase()),
            ..Default::default()
        }),
        IntentKind::Query => Intent::Query(IntentParams::default()),
    }
}

// ============================================================================
// Hint Extraction
// ============================================================================

fn date_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:on|for)\s+(?:tomorrow|today|monday|tuesday|wednesday|thursday|friday|saturday|sunday|january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sep|oct|nov|dec)\b(?:\s+\d{1,2}(?:st|nd|rd|th)?\b)?",
        )
        .expect("Invalid date hint regex")
    })
}

fn time_hint_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(?:at|from)\s+\d{1,2}(?::\d{2})?(?:\s*(?:am|pm))?")
            .expect("Invalid time hint regex")
    })
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)about\s+([^,.]+)").expect("Invalid title regex"))
}

/// Date, time and title hints for a create_event turn
fn extract_event_params(text: &str) -> IntentParams {
    let date_hint = date_hint_re().find(text).map(|m| m.as_str().to_string());
    let time_hint = time_hint_re().find(text).map(|m| m.as_str().to_string());
    let title = title_re()
        .captures(text)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    IntentParams {
        date_hint,
        time_hint,
        title,
        period: None,
    }
}

fn extract_period(lower_text: &str) -> Option<Period> {
    if lower_text.contains("today") {
        Some(Period::Today)
    } else if lower_text.contains("tomorrow") {
        Some(Period::Tomorrow)
    } else if lower_text.contains("this week") {
        Some(Period::Week)
    } else {
        None
    }
}
