//! exam-kb command-line interface
//!
//! Run with: cargo run -p exam-kb -- --help

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exam_kb::types::mime_for_filename;
use exam_kb::{Bucket, KbConfig, KnowledgeBase, OpenAiCompatibleModel, QuestionRequest};

#[derive(Parser, Debug)]
#[command(name = "exam-kb", version, about = "Session-scoped exam revision knowledge base")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Data directory (overrides config and EXAM_KB_DATA_DIR)
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an empty session
    CreateSession,
    /// Show a session summary
    Info { session: String },
    /// Upload a file into a bucket (material | question_bank)
    Upload {
        session: String,
        file: PathBuf,
        #[arg(long, default_value = "material")]
        bucket: String,
        /// Declared MIME type, guessed from the extension when omitted
        #[arg(long)]
        mime: Option<String>,
    },
    /// List both buckets
    List { session: String },
    /// Remove a file record and its stored bytes
    Remove {
        session: String,
        bucket: String,
        file_id: String,
    },
    /// Drop records whose files vanished
    Sync { session: String },
    /// Sync every persisted session
    Rescan,
    /// Register untracked files in the session's upload directory
    Import { session: String },
    /// Print parsed content of one file, or of all files
    Content {
        session: String,
        file_id: Option<String>,
    },
    /// Show the retrieval result for a query without calling the model
    Retrieve {
        session: String,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Answer a query
    Ask {
        session: String,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Generate practice questions on a topic
    Generate {
        session: String,
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
        #[arg(long, default_value_t = 5)]
        count: usize,
        #[arg(long, default_value = "medium")]
        difficulty: String,
        #[arg(long = "type", default_value = "multiple_choice")]
        question_type: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exam_kb=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = KbConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    tracing::debug!("Data directory: {}", config.storage.data_dir.display());

    let kb = KnowledgeBase::open(config)?;

    match cli.command {
        Commands::CreateSession => print_json(&kb.create_session().await?)?,
        Commands::Info { session } => print_json(&kb.session_info(&session).await?)?,
        Commands::Upload {
            session,
            file,
            bucket,
            mime,
        } => {
            let bucket: Bucket = bucket.parse()?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .context("upload path has no file name")?;
            let mime = mime.unwrap_or_else(|| mime_for_filename(&filename));

            let record = kb.upload(&session, bucket, &filename, &mime, &bytes).await?;
            print_json(&record)?;
        }
        Commands::List { session } => print_json(&kb.list(&session).await?)?,
        Commands::Remove {
            session,
            bucket,
            file_id,
        } => {
            let bucket: Bucket = bucket.parse()?;
            let removed = kb.remove(&session, bucket, &file_id).await?;
            print_json(&serde_json::json!({ "removed": removed }))?;
        }
        Commands::Sync { session } => print_json(&kb.sync(&session).await?)?,
        Commands::Rescan => print_json(&kb.rescan_all().await?)?,
        Commands::Import { session } => print_json(&kb.import_untracked(&session).await?)?,
        Commands::Content { session, file_id } => match file_id {
            Some(id) => println!("{}", kb.file_content(&session, &id).await?.content),
            None => {
                for file in kb.all_content(&session).await? {
                    println!("===== {} ({}) =====", file.record.name, file.record.bucket);
                    println!("{}\n", file.content);
                }
            }
        },
        Commands::Retrieve { session, query } => {
            print_json(&kb.retrieve(&session, &query.join(" ")).await?)?
        }
        Commands::Ask { session, query } => {
            let model = OpenAiCompatibleModel::new(&kb.config().model)?;
            let answer = kb.answer(&session, &query.join(" "), &model).await?;
            println!("{}", answer.answer);
        }
        Commands::Generate {
            session,
            topic,
            count,
            difficulty,
            question_type,
        } => {
            let model = OpenAiCompatibleModel::new(&kb.config().model)?;
            let request = QuestionRequest::new(topic.join(" "))
                .with_count(count)
                .with_difficulty(difficulty)
                .with_question_type(question_type);
            print_json(&kb.generate_questions(&session, &request, &model).await?)?;
        }
    }

    Ok(())
}
