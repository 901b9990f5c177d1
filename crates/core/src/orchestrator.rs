//! Conversation Orchestrator
//!
//! Sequences classification, window/draft computation, store reads and reply
//! composition for one inbound message. It never writes to the store on its
//! own; persistence happens through [`Assistant::confirm_draft`] once the
//! caller has the user's confirmation.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::compose::{compose, phrase_rng};
use crate::config::Phrasing;
use crate::dates::window_for;
use crate::error::{ChatError, StoreResult};
use crate::intent::classify;
use crate::llm::GenerativeBackend;
use crate::proposal::build_draft;
use crate::store::EventStore;
use crate::types::{
    CalendarData, CalendarEvent, ChatRequest, ChatResponse, EventDraft, FailureBody, Intent,
    MeetingSummary,
};

/// `calendarData.period` when the message named no period
const UNSET_PERIOD: &str = "this week";

const GENERIC_FAILURE: &str = "An unexpected error occurred";

const APOLOGY: &str = "I'm sorry, but something went wrong. Please try again later.";

/// Processing stage of a single message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Classifying,
    Querying,
    Proposing,
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Classifying => "classifying",
            Stage::Querying => "querying",
            Stage::Proposing => "proposing",
            Stage::Responding => "responding",
        };
        f.write_str(name)
    }
}

/// Outcome class of a handled request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyStatus {
    Ok,
    BadRequest,
    Failed,
}

impl ReplyStatus {
    /// HTTP-style status code
    pub fn code(&self) -> u16 {
        match self {
            ReplyStatus::Ok => 200,
            ReplyStatus::BadRequest => 400,
            ReplyStatus::Failed => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyBody {
    Chat(ChatResponse),
    Failure(FailureBody),
}

/// Status plus body for the external boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: ReplyStatus,
    pub body: ReplyBody,
}

impl Reply {
    fn failure(status: ReplyStatus, error: &str, response: Option<&str>) -> Self {
        Self {
            status,
            body: ReplyBody::Failure(FailureBody {
                error: error.to_string(),
                response: response.map(str::to_string),
            }),
        }
    }
}

impl ChatRequest {
    /// Parse a JSON request body
    pub fn from_json(body: &str) -> Result<Self, ChatError> {
        serde_json::from_str(body)
            .map_err(|_| ChatError::InvalidInput("Failed to parse request body".to_string()))
    }

    /// Reject requests with a missing or blank message
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.message.trim().is_empty() {
            return Err(ChatError::InvalidInput("Message is required".to_string()));
        }
        Ok(())
    }
}

/// The calendar assistant: one instance serves any number of users; each
/// call is independent and carries its own user id.
pub struct Assistant<S: EventStore> {
    store: S,
    backend: Option<Box<dyn GenerativeBackend>>,
    phrasing: Phrasing,
}

impl<S: EventStore> Assistant<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            backend: None,
            phrasing: Phrasing::default(),
        }
    }

    /// Enable remote augmentation of replies
    pub fn with_backend(mut self, backend: Box<dyn GenerativeBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_phrasing(mut self, phrasing: Phrasing) -> Self {
        self.phrasing = phrasing;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one message at the given reference time
    pub fn respond(
        &self,
        request: &ChatRequest,
        now: NaiveDateTime,
    ) -> Result<ChatResponse, ChatError> {
        request.validate()?;
        let user_id = request.user_id.as_str();
        let message = request.message.trim();

        debug!(stage = %Stage::Classifying, user = %user_id);
        let intent = classify(message);
        info!(user = %user_id, intent = intent.kind().as_str(), "classified message");

        let (events, calendar_data) = match &intent {
            Intent::ListEvents(params) => {
                debug!(stage = %Stage::Querying, user = %user_id);
                let window = window_for(params.period, now);
                let events = self.store.read(user_id, &window).map_err(|e| {
                    warn!(user = %user_id, error = %e, "event store read failed");
                    ChatError::UpstreamRead(e)
                })?;
                let data = CalendarData::ListEvents {
                    period: params
                        .period
                        .map_or(UNSET_PERIOD, |p| p.as_str())
                        .to_string(),
                    window,
                    meetings: events.iter().map(MeetingSummary::from).collect(),
                };
                (events, Some(data))
            }
            Intent::CreateEvent(params) => {
                debug!(stage = %Stage::Proposing, user = %user_id);
                let data = build_draft(&intent, now).map(|draft| CalendarData::CreateEvent {
                    proposed_details: params.clone(),
                    draft,
                });
                (Vec::new(), data)
            }
            Intent::Query(_) => (Vec::new(), None),
        };

        debug!(stage = %Stage::Responding, user = %user_id);
        let mut rng = phrase_rng(&self.phrasing);
        let composed = compose(
            &intent,
            message,
            &events,
            now,
            self.backend.as_deref(),
            &mut rng,
        );

        debug!(stage = %Stage::Idle, user = %user_id);
        Ok(ChatResponse {
            response: composed.text,
            calendar_data,
            error: composed.notice,
        })
    }

    /// Persist a draft the user has confirmed
    pub fn confirm_draft(&self, user_id: &str, draft: &EventDraft) -> StoreResult<CalendarEvent> {
        let event = self.store.write(user_id, draft)?;
        info!(user = %user_id, id = %event.id, title = %event.title, "draft confirmed");
        Ok(event)
    }

    /// External boundary for a raw JSON body
    pub fn handle_json(&self, body: &str, now: NaiveDateTime) -> Reply {
        match ChatRequest::from_json(body) {
            Ok(request) => self.handle(&request, now),
            Err(e) => reply_for_error(e),
        }
    }

    /// External boundary: process and map every failure to a reply.
    /// Internal details are logged and never returned.
    pub fn handle(&self, request: &ChatRequest, now: NaiveDateTime) -> Reply {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.respond(request, now)))
            .unwrap_or_else(|_| {
                Err(ChatError::Internal("panic while handling request".to_string()))
            });

        match outcome {
            Ok(response) => Reply {
                status: ReplyStatus::Ok,
                body: ReplyBody::Chat(response),
            },
            Err(e) => reply_for_error(e),
        }
    }
}

fn reply_for_error(err: ChatError) -> Reply {
    match err {
        ChatError::InvalidInput(reason) => Reply::failure(ReplyStatus::BadRequest, &reason, None),
        ChatError::UpstreamRead(_) => {
            Reply::failure(ReplyStatus::Failed, "Failed to fetch calendar data", None)
        }
        e @ ChatError::Internal(_) => {
            error!(error = %e, "request failed");
            Reply::failure(ReplyStatus::Failed, GENERIC_FAILURE, Some(APOLOGY))
        }
    }
}
