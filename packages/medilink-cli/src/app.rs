//! Interactive chat session.
//!
//! Reads lines from stdin and redraws the transcript whenever the synchronizer
//! publishes a new snapshot. Lines starting with `/` are commands; anything
//! else is sent as the current role.

use anyhow::Result;
use medilink_core::{Conversation, Draft, Outcome, Role, SkipReason, Summary, SUPPORTED_LANGUAGES};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::render;

const HELP: &str = "\
Commands:
  /role [doctor|patient]     switch role (toggles when no role is given)
  /lang <role> <language>    set the language a role speaks
  /languages                 list supported languages
  /search [text]             filter the transcript (no text clears it)
  /retry                     resend the message that failed to send
  /summary                   generate a consultation summary
  /clear                     delete every message for both parties
  /refresh                   refetch now
  /help                      show this help
  /quit                      leave
Anything else is sent as a message. An empty line resends a failed message.";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(String),
    Role(Option<Role>),
    Language { role: Role, language: String },
    Languages,
    Search(String),
    Retry,
    Summary,
    Clear,
    Refresh,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Command::Send(line.to_string());
        };

        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest.trim_end(), ""),
        };

        match name.to_lowercase().as_str() {
            "role" | "swap" if args.is_empty() => Command::Role(None),
            "role" => match args.parse() {
                Ok(role) => Command::Role(Some(role)),
                Err(e) => Command::Unknown(e),
            },
            "lang" | "language" => match args.split_once(char::is_whitespace) {
                Some((role, language)) => match role.parse() {
                    Ok(role) => Command::Language {
                        role,
                        language: language.trim().to_string(),
                    },
                    Err(e) => Command::Unknown(e),
                },
                None => Command::Unknown("usage: /lang <role> <language>".to_string()),
            },
            "languages" => Command::Languages,
            // Only the command name is stripped; the query is kept as typed
            "search" => Command::Search(
                rest.strip_prefix(name)
                    .and_then(|q| q.strip_prefix(' '))
                    .unwrap_or("")
                    .to_string(),
            ),
            "retry" => Command::Retry,
            "summary" => Command::Summary,
            "clear" => Command::Clear,
            "refresh" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => Command::Unknown(format!("unknown command /{}", other)),
        }
    }
}

pub struct ChatApp {
    conversation: Conversation,
    draft: Draft,
    summaries: mpsc::UnboundedSender<medilink_core::Result<Outcome<Summary>>>,
    summary_rx: mpsc::UnboundedReceiver<medilink_core::Result<Outcome<Summary>>>,
}

impl ChatApp {
    pub fn new(conversation: Conversation) -> Self {
        let (summaries, summary_rx) = mpsc::unbounded_channel();
        Self {
            conversation,
            draft: Draft::new(),
            summaries,
            summary_rx,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut snapshots = self.conversation.subscribe();

        println!("{}", HELP);
        self.redraw();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if !self.handle(Command::parse(&line)).await {
                        break;
                    }
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Poll loop stopped");
                        break;
                    }
                    self.redraw();
                }
                Some(result) = self.summary_rx.recv() => {
                    match result {
                        Ok(Outcome::Done(summary)) => println!("{}", render::summary(&summary)),
                        Ok(Outcome::Skipped(_)) => {}
                        Err(e) => eprintln!("! {}", e.user_message()),
                    }
                }
            }
        }

        self.conversation.shutdown().await;
        Ok(())
    }

    /// Apply one command. Returns false when the session should end.
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Send(text) => {
                // A blank line falls through to the pending draft, if any
                if !text.trim().is_empty() {
                    self.draft.set(text);
                }
                self.send_pending().await;
            }
            Command::Retry => {
                if self.draft.is_blank() {
                    eprintln!("! Nothing to retry");
                } else {
                    self.send_pending().await;
                }
            }
            Command::Role(role) => {
                let session = self.conversation.session_mut();
                match role {
                    Some(role) => session.set_role(role),
                    None => {
                        session.toggle_role();
                    }
                }
                self.redraw();
            }
            Command::Language { role, language } => {
                if !medilink_core::types::is_supported_language(&language) {
                    tracing::warn!("Language '{}' is not in the supported list", language);
                }
                if self.conversation.session_mut().set_language(role, &language) {
                    println!("{}", render::status_line(self.conversation.session()));
                }
            }
            Command::Languages => println!("{}", SUPPORTED_LANGUAGES.join(", ")),
            Command::Search(query) => {
                self.conversation.session_mut().set_search_query(query);
                self.redraw();
            }
            Command::Summary => {
                let summaries = self.conversation.summaries().clone();
                if summaries.is_generating() {
                    eprintln!("! A summary is already being generated");
                } else {
                    println!("Generating summary...");
                    let tx = self.summaries.clone();
                    tokio::spawn(async move {
                        let _ = tx.send(summaries.request().await);
                    });
                }
            }
            Command::Clear => match self.conversation.clear().await {
                Ok(Outcome::Done(())) => println!("Conversation cleared"),
                Ok(Outcome::Skipped(_)) => {}
                Err(e) => eprintln!("! {}", e.user_message()),
            },
            Command::Refresh => {
                self.conversation.synchronizer().refresh();
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
            Command::Unknown(message) => eprintln!("! {}", message),
        }
        true
    }

    /// Send the draft. It is kept when the send fails so it can be retried.
    async fn send_pending(&mut self) {
        match self.conversation.send_draft(&mut self.draft).await {
            Ok(Outcome::Done(_)) => {}
            Ok(Outcome::Skipped(SkipReason::EmptyContent)) => {}
            Ok(Outcome::Skipped(SkipReason::InFlight)) => {
                eprintln!("! Still sending the previous message")
            }
            Err(e) => eprintln!(
                "! {}. Not sent: \"{}\" (empty line or /retry to resend)",
                e.user_message(),
                self.draft.text()
            ),
        }
    }

    fn redraw(&self) {
        let snapshot = self.conversation.snapshot();
        let session = self.conversation.session();

        println!();
        println!("{}", render::transcript(&session.transcript(&snapshot), session));
        if let Some(error) = &snapshot.last_error {
            eprintln!("! {}", error);
        }
        println!("[{}]", render::status_line(session));
    }
}
