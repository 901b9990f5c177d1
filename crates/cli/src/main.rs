//! Calendar Assistant CLI
//!
//! A thin wrapper around chatcal-core that provides the command-line interface.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use chatcal_core::{
    Assistant, AssistantConfig, CalendarData, ChatRequest, ChatResponse, ErrorType, EventDraft,
    HttpBackend, Phrasing, ReplyBody, ReplyStatus, SqliteEventStore, Transcript,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "chatcal")]
#[command(about = "Chat with your calendar: list your schedule and propose new events")]
struct Args {
    /// Message in natural language (omit to start an interactive session)
    message: Option<String>,

    /// User whose calendar is read and written
    #[arg(long, default_value = "local")]
    user: String,

    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the SQLite calendar database
    #[arg(long)]
    db: Option<PathBuf>,

    /// Use the generative backend for replies
    #[arg(long = "use-llm")]
    use_llm: bool,

    /// Fixed seed for reply phrasing
    #[arg(long)]
    seed: Option<u64>,

    /// Save a proposed event without asking (one-shot mode)
    #[arg(long)]
    confirm: bool,

    /// Enable verbose debug output
    #[arg(long, short = 'v')]
    verbose: bool,
}

// ============================================================================
// Setup
// ============================================================================

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_assistant(args: &Args) -> Result<Assistant<SqliteEventStore>> {
    let mut config = AssistantConfig::load(args.config.as_deref())?;

    if args.use_llm {
        config.backend.enabled = true;
    }
    if let Some(ref db) = args.db {
        config.store.path = Some(db.clone());
    }

    let db_path = config.store.resolved_path();
    let store = SqliteEventStore::open(&db_path)
        .with_context(|| format!("Failed to open calendar database: {}", db_path.display()))?;

    let phrasing = Phrasing {
        seed: args.seed.or(config.phrasing.seed),
    };
    let mut assistant = Assistant::new(store).with_phrasing(phrasing);

    if config.backend.enabled {
        debug!(
            url = %config.backend.base_url,
            model = %config.backend.model,
            "generative backend enabled"
        );
        let backend = HttpBackend::from_config(&config.backend)
            .context("Failed to create generative backend client")?;
        assistant = assistant.with_backend(Box::new(backend));
    }

    Ok(assistant)
}

// ============================================================================
// Output Helpers
// ============================================================================

fn describe_draft(draft: &EventDraft) -> String {
    format!(
        "\"{}\" on {} from {} to {}",
        draft.title,
        draft.start_time.format("%A, %b %-d"),
        draft.start_time.format("%I:%M %p"),
        draft.end_time.format("%I:%M %p")
    )
}

fn proposed_draft(response: &ChatResponse) -> Option<&EventDraft> {
    match &response.calendar_data {
        Some(CalendarData::CreateEvent { draft, .. }) => Some(draft),
        _ => None,
    }
}

fn prompt_yes_no(input: &mut impl BufRead, question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;
    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

// ============================================================================
// Modes
// ============================================================================

fn run_once(assistant: &Assistant<SqliteEventStore>, args: &Args, message: &str) -> Result<()> {
    let request = ChatRequest {
        message: message.to_string(),
        user_id: args.user.clone(),
    };
    let reply = assistant.handle(&request, Local::now().naive_local());

    println!("{}", serde_json::to_string_pretty(&reply.body)?);

    if reply.status != ReplyStatus::Ok {
        return Err(anyhow!("request failed with status {}", reply.status.code()));
    }

    if args.confirm {
        if let ReplyBody::Chat(ref response) = reply.body {
            if let Some(draft) = proposed_draft(response) {
                let event = assistant.confirm_draft(&args.user, draft)?;
                println!("{}", serde_json::to_string_pretty(&event)?);
            }
        }
    }

    Ok(())
}

fn run_interactive(assistant: &Assistant<SqliteEventStore>, args: &Args) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut transcript = Transcript::with_welcome();
    let mut quota_exhausted = false;

    for message in transcript.messages() {
        println!("{}", message.content);
    }

    loop {
        if quota_exhausted {
            println!("[AI quota exceeded: replies use built-in templates]");
        }
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }

        transcript.push_user(text);
        transcript.begin_typing();
        print!("...");
        io::stdout().flush()?;

        let request = ChatRequest {
            message: text.to_string(),
            user_id: args.user.clone(),
        };
        let reply = assistant.handle(&request, Local::now().naive_local());
        print!("\r   \r");

        let response = match reply.body {
            ReplyBody::Chat(response) => response,
            ReplyBody::Failure(failure) => {
                transcript.clear_typing();
                println!("{}", failure.response.unwrap_or(failure.error));
                continue;
            }
        };

        transcript.push_assistant(response.response.as_str());
        println!("{}", response.response);

        if let Some(ref notice) = response.error {
            match notice.kind {
                ErrorType::QuotaExceeded => quota_exhausted = true,
                ErrorType::ApiError => println!("[temporary] {}", notice.message),
            }
        }

        if let Some(draft) = proposed_draft(&response) {
            println!("Proposed: {}", describe_draft(draft));
            if prompt_yes_no(&mut input, "Add this event to your calendar?")? {
                match assistant.confirm_draft(&args.user, draft) {
                    Ok(event) => println!("Saved \"{}\".", event.title),
                    Err(e) => {
                        warn!(error = %e, "failed to save event");
                        println!("Sorry, I couldn't save that event. Please try again.");
                    }
                }
            } else {
                println!("Okay, I won't add it.");
            }
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(args.verbose);

    let assistant = build_assistant(&args)?;

    match args.message.as_deref() {
        Some(message) => run_once(&assistant, &args, message),
        None => run_interactive(&assistant, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_describe_draft() {
        let start = NaiveDate::from_ymd_opt(2026, 10, 22)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let draft = EventDraft::new("New Meeting", start, Duration::minutes(60));
        assert_eq!(
            describe_draft(&draft),
            "\"New Meeting\" on Thursday, Oct 22 from 09:00 AM to 10:00 AM"
        );
    }

    #[test]
    fn test_prompt_yes_no() {
        let mut yes = io::Cursor::new("Yes\n");
        assert!(prompt_yes_no(&mut yes, "Save?").unwrap());
        let mut empty = io::Cursor::new("\n");
        assert!(!prompt_yes_no(&mut empty, "Save?").unwrap());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "chatcal",
            "--user",
            "alice",
            "--seed",
            "3",
            "show my calendar",
        ]);
        assert_eq!(args.user, "alice");
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.message.as_deref(), Some("show my calendar"));
        assert!(!args.confirm);
    }
}
