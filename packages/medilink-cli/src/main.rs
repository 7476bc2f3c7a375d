//! MediLink CLI - terminal client for the doctor/patient translator.
//!
//! `medilink chat` is the interactive client. The other subcommands are one-shot
//! operations against the same store and print JSON where `--json` is given.

mod app;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use medilink_core::{
    search, ClientConfig, Conversation, Draft, Invalidator, MessageStore, Mutator, Outcome, Role,
    SessionContext, Snapshot, StoreClient, SummaryOrchestrator,
};
use medilink_core::types::is_supported_language;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "medilink")]
#[command(about = "MediLink - translated doctor/patient messaging")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.medilink/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store base URL, overrides the config file
    #[arg(long, global = true)]
    server: Option<String>,

    /// Role to act as (doctor or patient)
    #[arg(long, global = true)]
    role: Option<Role>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive conversation (default)
    Chat,
    /// Print the transcript each time it changes
    Watch {
        /// Only show messages containing this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Send one message as the selected role
    Send {
        /// Language the doctor speaks
        #[arg(long)]
        doctor_lang: Option<String>,
        /// Language the patient speaks
        #[arg(long)]
        patient_lang: Option<String>,
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Print the conversation once
    List {
        /// Only show messages containing this text
        #[arg(short, long)]
        search: Option<String>,
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every message in the conversation
    Clear,
    /// Generate a summary of the conversation
    Summary {
        /// Output raw JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with transcript output
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let store = Arc::new(StoreClient::from_config(&config)?);
    tracing::info!("Using message store at {}", store.base_url());

    let mut session = SessionContext::from_config(&config);
    if let Some(role) = cli.role {
        session.set_role(role);
    }

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let conversation =
                Conversation::with_session(store, config.poll_interval(), session);
            app::ChatApp::new(conversation).run().await
        }
        Commands::Watch { search } => {
            if let Some(query) = search {
                session.set_search_query(query);
            }
            watch(Conversation::with_session(store, config.poll_interval(), session)).await
        }
        Commands::Send {
            doctor_lang,
            patient_lang,
            text,
        } => {
            for (role, language) in [(Role::Doctor, doctor_lang), (Role::Patient, patient_lang)] {
                if let Some(language) = language {
                    if !is_supported_language(&language) {
                        tracing::warn!("Language '{}' is not in the supported list", language);
                    }
                    session.set_language(role, &language);
                }
            }
            send(store, session, text.join(" ")).await
        }
        Commands::List { search, json } => {
            if let Some(query) = search {
                session.set_search_query(query);
            }
            list(store, session, json).await
        }
        Commands::Clear => clear(store).await,
        Commands::Summary { json } => summary(store, json).await,
    }
}

/// File, then environment, then `--server`, validated once at the end.
fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let path = cli.config.clone().unwrap_or_else(ClientConfig::default_path);
    ClientConfig::load_with(&path, cli.server.as_deref())
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Surface the text a user should see, keeping the full chain in the logs.
fn user_facing(err: medilink_core::Error) -> anyhow::Error {
    tracing::debug!("Request failed: {:?}", err);
    anyhow::anyhow!(err.user_message())
}

async fn watch(conversation: Conversation) -> Result<()> {
    let mut snapshots = conversation.subscribe();

    loop {
        {
            let snapshot = snapshots.borrow_and_update().clone();
            let session = conversation.session();
            println!("{}", render::transcript(&session.transcript(&snapshot), session));
            if let Some(error) = &snapshot.last_error {
                eprintln!("! {}", error);
            }
            println!();
        }

        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    conversation.shutdown().await;
    Ok(())
}

async fn send(store: Arc<dyn MessageStore>, session: SessionContext, text: String) -> Result<()> {
    let mut draft = Draft::from(text);
    // No poll loop here, so nothing listens to the invalidation
    let mutator = Mutator::new(store, Invalidator::default());

    match mutator.send_draft(&mut draft, &session).await.map_err(user_facing)? {
        Outcome::Done(message) => println!("{}", serde_json::to_string_pretty(&message)?),
        Outcome::Skipped(reason) => tracing::debug!("Nothing sent: {:?}", reason),
    }
    Ok(())
}

async fn clear(store: Arc<StoreClient>) -> Result<()> {
    let mutator = Mutator::new(store, Invalidator::default());
    if mutator.clear().await.map_err(user_facing)?.is_done() {
        println!("Conversation cleared");
    }
    Ok(())
}

async fn list(
    store: Arc<StoreClient>,
    session: SessionContext,
    as_json: bool,
) -> Result<()> {
    let messages = store.list_messages().await.map_err(user_facing)?;

    if as_json {
        let matching = search::filter(&messages, session.search_query());
        println!("{}", serde_json::to_string_pretty(&matching)?);
        return Ok(());
    }

    let snapshot = Snapshot {
        messages: Arc::new(messages),
        loading: false,
        last_error: None,
        fetched_at: Some(chrono::Utc::now()),
        epoch: 0,
    };
    println!("{}", render::transcript(&session.transcript(&snapshot), &session));
    Ok(())
}

async fn summary(store: Arc<StoreClient>, as_json: bool) -> Result<()> {
    let summaries = SummaryOrchestrator::new(store);
    let Outcome::Done(summary) = summaries.request().await.map_err(user_facing)? else {
        return Ok(());
    };

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "summary": summary.text,
                "generated_at": summary.generated_at,
            }))?
        );
    } else {
        println!("{}", render::summary(&summary));
    }
    Ok(())
}
