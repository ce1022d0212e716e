use std::path::{Path, PathBuf};

use anyhow::Context;
use campaign_core::{
    completion_content, parse_topics, summarize, validate_batch, FeedbackEvent, FeedbackKind,
    FeedbackRequest, TopicDescriptor, ValidationError,
};
use campaign_db::{PgTopicStore, TopicStore};
use clap::{Parser, Subcommand};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[command(name = "campaign-cli")]
#[command(about = "Campaign topic store command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    Topics {
        #[command(subcommand)]
        command: TopicsCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Migrate,
    Ping,
}

#[derive(Debug, Subcommand)]
enum TopicsCommands {
    /// Ingest topic descriptors from a JSON file.
    Ingest {
        file: PathBuf,
        /// Treat the file as an AI reply (plain text or chat-completion JSON).
        #[arg(long)]
        raw: bool,
    },
    /// Record a like or dislike against one topic.
    Feedback {
        #[arg(long)]
        title: String,
        #[arg(long)]
        geo: String,
        #[arg(long)]
        platform: String,
        #[arg(value_parser = parse_feedback_kind)]
        kind: FeedbackKind,
    },
    /// Print one group summary per distinct topic.
    Aggregate,
    /// Print dashboard totals by vertical, platform and geo.
    Summary,
}

/// Accepted shapes for an ingest file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IngestFile {
    Wrapped { topics: Vec<TopicDescriptor> },
    Bare(Vec<TopicDescriptor>),
}

fn parse_feedback_kind(value: &str) -> Result<FeedbackKind, String> {
    value.parse::<FeedbackKind>().map_err(|e| e.to_string())
}

fn read_descriptors(text: &str, raw: bool) -> anyhow::Result<Vec<TopicDescriptor>> {
    if raw {
        let reply = serde_json::from_str::<serde_json::Value>(text).ok();
        let content = reply
            .as_ref()
            .and_then(completion_content)
            .unwrap_or(text);
        return Ok(parse_topics(content)?);
    }

    let file: IngestFile = serde_json::from_str(text)
        .context("expected {\"topics\": [...]} or a bare array of topics")?;
    Ok(match file {
        IngestFile::Wrapped { topics } | IngestFile::Bare(topics) => topics,
    })
}

/// Run CLI feedback arguments through the same checks as the HTTP API so
/// blank identity fields are rejected before touching the store.
fn feedback_event(
    title: String,
    geo: String,
    platform: String,
    kind: FeedbackKind,
) -> Result<FeedbackEvent, ValidationError> {
    FeedbackRequest {
        topic_title: Some(title),
        geo: Some(geo),
        platform: Some(platform),
        feedback: Some(kind.as_str().to_string()),
    }
    .validate()
}

async fn connect_store() -> anyhow::Result<PgTopicStore> {
    let pool = campaign_db::connect_pool_from_env().await?;
    Ok(PgTopicStore::new(pool))
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_db(command: DbCommands) -> anyhow::Result<()> {
    let pool = campaign_db::connect_pool_from_env().await?;
    match command {
        DbCommands::Migrate => {
            let applied = campaign_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Ping => {
            campaign_db::ping(&pool).await?;
            println!("database reachable");
        }
    }
    Ok(())
}

async fn run_ingest(file: &Path, raw: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let topics = validate_batch(read_descriptors(&text, raw)?)?;

    let store = connect_store().await?;
    let summary = store.insert_if_absent(&topics).await?;
    tracing::info!(
        file = %file.display(),
        inserted = summary.inserted_count,
        matched = summary.matched_count,
        "ingested topic file"
    );
    print_json(&summary)
}

async fn run_topics(command: TopicsCommands) -> anyhow::Result<()> {
    match command {
        TopicsCommands::Ingest { file, raw } => run_ingest(&file, raw).await,
        TopicsCommands::Feedback {
            title,
            geo,
            platform,
            kind,
        } => {
            let event = feedback_event(title, geo, platform, kind)?;
            let store = connect_store().await?;
            let stats = store
                .increment_counter(&event.key, event.kind)
                .await
                .with_context(|| format!("recording {} for {}", event.kind, event.key))?;
            print_json(&stats)
        }
        TopicsCommands::Aggregate => {
            let store = connect_store().await?;
            print_json(&store.group_and_aggregate().await?)
        }
        TopicsCommands::Summary => {
            let store = connect_store().await?;
            let groups = store.group_and_aggregate().await?;
            print_json(&summarize(&groups))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Db { command }) => run_db(command).await,
        Some(Commands::Topics { command }) => run_topics(command).await,
        None => {
            println!("campaign-cli ready; run with --help for commands");
            Ok(())
        }
    }
}
