//! Conversational Calendar Assistant Core Library
//!
//! This crate provides the core functionality for the calendar assistant:
//! - Intent classification (create_event, list_events, query)
//! - Relative date resolution and calendar query windows
//! - Event draft proposals awaiting user confirmation
//! - Reply composition (local templates, optional generative backend)
//! - Event storage (in-memory and SQLite)

pub mod types;

pub mod compose;
pub mod config;
pub mod conversation;
pub mod dates;
pub mod error;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod proposal;
pub mod store;

// Re-export commonly used types at crate root
pub use types::{
    CalendarData, CalendarEvent, ChatRequest, ChatResponse, ErrorInfo, ErrorType, EventDraft,
    FailureBody, Intent, IntentKind, IntentParams, MeetingSummary, Period, TimeWindow,
};

pub use config::{AssistantConfig, BackendConfig, Phrasing};
pub use conversation::{Message, MessageRole, Transcript};
pub use dates::{resolve_relative_date, window_for};
pub use error::{ChatError, StoreError};
pub use intent::classify;
pub use llm::{Generation, GenerativeBackend, HttpBackend};
pub use orchestrator::{Assistant, Reply, ReplyBody, ReplyStatus};
pub use proposal::build_draft;
pub use store::{EventStore, MemoryEventStore, SqliteEventStore};
