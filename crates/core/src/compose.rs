//! Reply Composition
//!
//! Local templates are functionally complete on their own. A generative
//! backend can optionally enrich replies; any failure there falls back to
//! the templates exactly once.

use chrono::NaiveDateTime;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::Phrasing;
use crate::llm::{Generation, GenerationRequest, GenerativeBackend};
use crate::types::{CalendarEvent, ErrorInfo, ErrorType, Intent, Period};

/// Fixed system instruction for the generative backend
pub const SYSTEM_INSTRUCTION: &str = "You are a friendly scheduling assistant inside a calendar app. \
Reply in plain text using at most four sentences. Only mention calendar events that are listed in \
the request, and never claim an event was saved: the user confirms drafts separately.";

const CREATE_PHRASES: &[&str] = &[
    "I'd be happy to help you schedule {title}. I see you want it {date} {time}. Let me set that up for you. Can you confirm this works for you, or would you like to adjust any details?",
    "Sure! I can put {title} on your calendar {date} {time}. Does that look right, or should I change anything before you confirm?",
    "Got it: {title}, {date} {time}. Please confirm the details and I'll get it ready for your calendar.",
];

const EMPTY_PHRASES: &[&str] = &[
    "Looking at your calendar, you don't have any events scheduled for {period}. Your schedule is clear!",
    "Good news: nothing is on your calendar for {period}, so your schedule is clear.",
    "Your calendar is clear for {period}. There are no events scheduled.",
];

const QUOTA_NOTICE: &str =
    "The AI service quota has been exceeded. Replies are using built-in templates for now.";

const API_NOTICE: &str = "The AI service is temporarily unavailable. Using built-in replies.";

/// Reply text plus an optional advisory about the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub text: String,
    pub notice: Option<ErrorInfo>,
}

/// Rng for one reply: seeded when a fixed seed is configured
pub fn phrase_rng(phrasing: &Phrasing) -> StdRng {
    match phrasing.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn pick<'a, R: Rng + ?Sized>(phrases: &[&'a str], rng: &mut R) -> &'a str {
    phrases.choose(rng).copied().unwrap_or_default()
}

// ============================================================================
// Local Templates
// ============================================================================

/// Compose a reply from local templates only
pub fn compose_local<R: Rng + ?Sized>(
    intent: &Intent,
    message: &str,
    events: &[CalendarEvent],
    now: NaiveDateTime,
    rng: &mut R,
) -> String {
    match intent {
        Intent::CreateEvent(params) => {
            let date = params.date_hint.as_deref().unwrap_or("tomorrow");
            let time = params.time_hint.as_deref().unwrap_or("in the morning");
            let title = params.title.as_deref().unwrap_or("your event");
            pick(CREATE_PHRASES, rng)
                .replace("{title}", title)
                .replace("{date}", date)
                .replace("{time}", time)
        }
        Intent::ListEvents(params) => {
            let period = Period::describe(params.period);
            if events.is_empty() {
                pick(EMPTY_PHRASES, rng).replace("{period}", period)
            } else {
                let mut response = format!("Here's what you have scheduled for {}:\n\n", period);
                response.push_str(&event_lines(events));
                response
            }
        }
        Intent::Query(_) => query_reply(message, now),
    }
}

/// One numbered line per event, in the given order
fn event_lines(events: &[CalendarEvent]) -> String {
    events
        .iter()
        .enumerate()
        .map(|(idx, event)| {
            format!(
                "{}. \"{}\" at {} on {}\n",
                idx + 1,
                event.title,
                event.time_range(),
                event.display_date()
            )
        })
        .collect()
}

fn query_reply(message: &str, now: NaiveDateTime) -> String {
    let t = message.to_lowercase();
    let date = now.format("%A, %B %-d, %Y");
    let time = now.format("%I:%M %p");

    let is_greeting = t
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "hello" | "hi" | "hey"));

    if is_greeting {
        format!(
            "Hello! I'm your scheduling assistant. Today is {} and the current time is {}. How can I help you with your calendar today?",
            date, time
        )
    } else if t.contains("time") {
        format!("The current time is {} on {}.", time, date)
    } else if t.contains("weather") {
        "I'm a scheduling assistant and don't have access to current weather data. I can help you manage your calendar though!".to_string()
    } else if t.contains("help") {
        "I can help you manage your schedule! You can ask me to:\n\
         - Schedule meetings or events\n\
         - Show your calendar for today, tomorrow, or this week\n\
         - Check specific time slots\n\
         - Manage your appointments\n\n\
         Just let me know what you need!"
            .to_string()
    } else if t.contains("thank") {
        "You're welcome! Let me know if there's anything else I can do for your calendar.".to_string()
    } else if t.contains("who are you") || t.contains("your name") || t.contains("what are you") {
        "I'm your scheduling assistant. I can schedule meetings, show what's on your calendar for today, tomorrow or this week, and help you keep track of your events.".to_string()
    } else {
        "I'm your scheduling assistant, ready to help with your calendar! You can ask me to schedule meetings, check your agenda, or manage your events. What would you like to do today?".to_string()
    }
}

// ============================================================================
// Remote Augmentation
// ============================================================================

/// Build the task-specific instruction sent to the backend
pub fn build_generation_request(
    intent: &Intent,
    message: &str,
    events: &[CalendarEvent],
    now: NaiveDateTime,
) -> GenerationRequest {
    let input = match intent {
        Intent::CreateEvent(params) => format!(
            "The user wrote: \"{}\". Offer to schedule {} {} {} and ask them to confirm or adjust the details.",
            message,
            params.title.as_deref().unwrap_or("their event"),
            params.date_hint.as_deref().unwrap_or("tomorrow"),
            params.time_hint.as_deref().unwrap_or("in the morning"),
        ),
        Intent::ListEvents(params) => {
            let listing = if events.is_empty() {
                "(no events)\n".to_string()
            } else {
                event_lines(events)
            };
            format!(
                "The user wrote: \"{}\". Their calendar for {} contains:\n{}Summarize it for them, keeping the events in this order.",
                message,
                Period::describe(params.period),
                listing
            )
        }
        Intent::Query(_) => format!(
            "Current date and time: {}. The user wrote: \"{}\". Reply helpfully.",
            now.format("%A, %B %-d, %Y %I:%M %p"),
            message
        ),
    };

    GenerationRequest {
        instructions: SYSTEM_INSTRUCTION.to_string(),
        input,
    }
}

/// Compose a reply, trying the backend first when one is provided.
///
/// Every non-text outcome falls back to `compose_local` once. Quota failures
/// are reported as `quota_exceeded`, everything else as `api_error`.
pub fn compose<R: Rng + ?Sized>(
    intent: &Intent,
    message: &str,
    events: &[CalendarEvent],
    now: NaiveDateTime,
    backend: Option<&dyn GenerativeBackend>,
    rng: &mut R,
) -> Composed {
    let Some(backend) = backend else {
        return Composed {
            text: compose_local(intent, message, events, now, rng),
            notice: None,
        };
    };

    let request = build_generation_request(intent, message, events, now);
    let notice = match backend.generate(&request) {
        Generation::Text(text) if !text.trim().is_empty() => {
            debug!(intent = intent.kind().as_str(), "using generated reply");
            return Composed {
                text: text.trim().to_string(),
                notice: None,
            };
        }
        Generation::Text(_) => {
            warn!("generative backend returned empty text, using local templates");
            None
        }
        Generation::QuotaExceeded(reason) => {
            warn!(%reason, "generative backend quota exceeded, using local templates");
            Some(ErrorInfo {
                kind: ErrorType::QuotaExceeded,
                message: QUOTA_NOTICE.to_string(),
            })
        }
        Generation::TransientFailure(reason) => {
            warn!(%reason, "generative backend failed, using local templates");
            Some(ErrorInfo {
                kind: ErrorType::ApiError,
                message: API_NOTICE.to_string(),
            })
        }
    };

    Composed {
        text: compose_local(intent, message, events, now, rng),
        notice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventDraft, IntentParams};
    use chrono::{Duration, NaiveDate};
    use std::cell::RefCell;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 21)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn event(title: &str, day: u32, hour: u32) -> CalendarEvent {
        let start = NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        CalendarEvent::from_draft(title, &EventDraft::new(title, start, Duration::minutes(60)))
    }

    fn list(period: Period) -> Intent {
        Intent::ListEvents(IntentParams {
            period: Some(period),
            ..Default::default()
        })
    }

    fn query() -> Intent {
        Intent::Query(IntentParams::default())
    }

    fn numbered_lines(text: &str) -> Vec<&str> {
        text.lines()
            .filter(|l| l.split_once(". ").map_or(false, |(n, _)| n.parse::<usize>().is_ok()))
            .collect()
    }

    struct FakeBackend {
        outcome: Generation,
        seen: RefCell<Vec<GenerationRequest>>,
    }

    impl FakeBackend {
        fn new(outcome: Generation) -> Self {
            Self {
                outcome,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl GenerativeBackend for FakeBackend {
        fn generate(&self, request: &GenerationRequest) -> Generation {
            self.seen.borrow_mut().push(request.clone());
            self.outcome.clone()
        }
    }

    #[test]
    fn test_create_mentions_hints() {
        let intent = Intent::CreateEvent(IntentParams {
            date_hint: Some("on friday".to_string()),
            time_hint: Some("at 3pm".to_string()),
            title: Some("budget review".to_string()),
            period: None,
        });
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let text = compose_local(&intent, "", &[], now(), &mut rng);
            assert!(text.contains("on friday"));
            assert!(text.contains("at 3pm"));
            assert!(text.contains("budget review"));
        }
    }

    #[test]
    fn test_create_defaults() {
        let intent = Intent::CreateEvent(IntentParams::default());
        let text = compose_local(&intent, "", &[], now(), &mut rng());
        assert!(text.contains("tomorrow"));
        assert!(text.contains("in the morning"));
        assert!(text.contains("your event"));
    }

    #[test]
    fn test_seeded_phrasing_is_deterministic() {
        let intent = list(Period::Today);
        let a = compose_local(&intent, "", &[], now(), &mut rng());
        let b = compose_local(&intent, "", &[], now(), &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_list_is_clear() {
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let text = compose_local(&list(Period::Today), "", &[], now(), &mut rng);
            assert!(text.contains("today"));
            assert!(text.contains("clear"));
            assert!(numbered_lines(&text).is_empty());
        }
    }

    #[test]
    fn test_list_keeps_input_order() {
        // deliberately not chronological
        let events = vec![event("Retro", 23, 15), event("Standup", 22, 9)];
        let text = compose_local(&list(Period::Week), "", &events, now(), &mut rng());
        let lines = numbered_lines(&text);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. \"Retro\""));
        assert!(lines[1].starts_with("2. \"Standup\""));
        assert!(lines[1].contains("09:00 AM - 10:00 AM"));
        assert!(lines[1].contains("Thursday, Oct 22"));
        assert!(text.contains("this week"));
    }

    #[test]
    fn test_query_branches() {
        let reply = |msg: &str| compose_local(&query(), msg, &[], now(), &mut rng());
        assert!(reply("Hi!").contains("Wednesday, October 21, 2026"));
        assert!(reply("what time is it").contains("10:30 AM"));
        assert!(reply("is it going to rain? weather?").contains("weather"));
        assert!(reply("help").contains("Schedule meetings"));
        assert!(reply("thanks a lot").contains("welcome"));
        assert!(reply("who are you").contains("scheduling assistant"));
        assert!(reply("blorp").contains("What would you like to do"));
    }

    #[test]
    fn test_greeting_requires_whole_word() {
        let text = compose_local(&query(), "this thing", &[], now(), &mut rng());
        assert!(!text.starts_with("Hello"));
    }

    #[test]
    fn test_backend_text_is_used() {
        let backend = FakeBackend::new(Generation::Text("  Generated reply  ".to_string()));
        let intent = list(Period::Week);
        let composed = compose(&intent, "show calendar", &[], now(), Some(&backend), &mut rng());
        assert_eq!(composed.text, "Generated reply");
        assert!(composed.notice.is_none());

        let seen = backend.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].instructions, SYSTEM_INSTRUCTION);
        assert!(seen[0].input.contains("(no events)"));
    }

    #[test]
    fn test_quota_falls_back_with_notice() {
        let backend = FakeBackend::new(Generation::QuotaExceeded("429".to_string()));
        let composed = compose(&list(Period::Today), "", &[], now(), Some(&backend), &mut rng());
        assert!(composed.text.contains("clear"));
        assert_eq!(composed.notice.unwrap().kind, ErrorType::QuotaExceeded);
    }

    #[test]
    fn test_transient_falls_back_with_api_error() {
        let backend = FakeBackend::new(Generation::TransientFailure("timeout".to_string()));
        let intent = Intent::CreateEvent(IntentParams::default());
        let composed = compose(&intent, "", &[], now(), Some(&backend), &mut rng());
        assert!(composed.text.contains("your event"));
        assert_eq!(composed.notice.unwrap().kind, ErrorType::ApiError);
    }

    #[test]
    fn test_blank_backend_text_falls_back_silently() {
        let backend = FakeBackend::new(Generation::Text("   ".to_string()));
        let composed = compose(&query(), "help", &[], now(), Some(&backend), &mut rng());
        assert!(composed.text.contains("Schedule meetings"));
        assert!(composed.notice.is_none());
    }

    #[test]
    fn test_no_backend_is_local() {
        let composed = compose(&query(), "hello", &[], now(), None, &mut rng());
        assert!(composed.text.starts_with("Hello!"));
        assert!(composed.notice.is_none());
    }
}
