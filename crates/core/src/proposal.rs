//! Event proposals built from create_event turns

use chrono::{Duration, NaiveDateTime};

use crate::dates::resolve_relative_date;
use crate::types::{EventDraft, Intent};

pub const DEFAULT_TITLE: &str = "New Meeting";

pub const DEFAULT_DURATION_MINUTES: i64 = 60;

const DEFAULT_DATE_HINT: &str = "tomorrow";

/// Build a draft for a create_event intent; any other intent yields `None`.
///
/// The draft always starts at 09:00 on the resolved date. A time hint, if
/// one was extracted, only appears in the reply text.
pub fn build_draft(intent: &Intent, now: NaiveDateTime) -> Option<EventDraft> {
    let Intent::CreateEvent(params) = intent else {
        return None;
    };

    let hint = params.date_hint.as_deref().unwrap_or(DEFAULT_DATE_HINT);
    let start = resolve_relative_date(hint, now);
    let title = params.title.as_deref().unwrap_or(DEFAULT_TITLE);

    Some(EventDraft::new(
        title,
        start,
        Duration::minutes(DEFAULT_DURATION_MINUTES),
    ))
}
