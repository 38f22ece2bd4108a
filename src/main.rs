use std::sync::Arc;

use anyhow::{Context, bail};

use mail_triage::config::{SourceKind, TriageConfig};
use mail_triage::llm::{LlmConfig, TextCompletion, create_provider};
use mail_triage::pipeline::assistant::{Assistant, DEFAULT_TONE};
use mail_triage::pipeline::batch::run_batch;
use mail_triage::pipeline::processor::MessageProcessor;
use mail_triage::pipeline::types::{DraftRecord, MessageRecord, ProcessingMode};
use mail_triage::source::{MaildirSource, MessageSource, SnapshotSource};
use mail_triage::store::{JsonFileStore, TriageStore};

const USAGE: &str = "usage: mail-triage [process | summarize <id> | draft <id> [tone]]";

enum Command {
    Process,
    Summarize(String),
    Draft { id: String, tone: String },
}

fn parse_command(args: &[String]) -> anyhow::Result<Command> {
    match args {
        [] => Ok(Command::Process),
        [cmd] if cmd == "process" => Ok(Command::Process),
        [cmd, id] if cmd == "summarize" => Ok(Command::Summarize(id.clone())),
        [cmd, id] if cmd == "draft" => Ok(Command::Draft {
            id: id.clone(),
            tone: DEFAULT_TONE.to_string(),
        }),
        [cmd, id, tone] if cmd == "draft" => Ok(Command::Draft {
            id: id.clone(),
            tone: tone.clone(),
        }),
        _ => bail!(USAGE),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;

    let config = TriageConfig::from_env().context("Invalid MAIL_TRIAGE_* configuration")?;

    eprintln!("📬 Mail Triage v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data: {}", config.data_dir.display());
    eprintln!("   Mode: {}", config.mode.label());

    // ── Store ───────────────────────────────────────────────────────────
    let store = TriageStore::new(
        Arc::new(JsonFileStore::new(&config.data_dir)),
        config.locations.clone(),
    );
    let prompts = store
        .load_prompts()
        .await
        .context("Failed to load prompts")?;

    // ── LLM ─────────────────────────────────────────────────────────────
    let needs_llm = config.mode == ProcessingMode::Llm || !matches!(command, Command::Process);
    let llm: Option<Arc<dyn TextCompletion>> = if needs_llm {
        let llm_config = LlmConfig::from_env().context("LLM configuration required")?;
        eprintln!("   Model: {}", llm_config.model);
        Some(create_provider(&llm_config).context("Failed to create LLM provider")?)
    } else {
        None
    };

    match command {
        Command::Process => {
            // ── Source ──────────────────────────────────────────────────
            let source: Box<dyn MessageSource> = match &config.source {
                SourceKind::Snapshot => Box::new(
                    SnapshotSource::from_store(&store)
                        .await
                        .context("Failed to load inbox snapshot")?,
                ),
                SourceKind::Maildir(path) => Box::new(MaildirSource::new(path)),
            };
            eprintln!("   Source: {}\n", source.name());

            let processor = MessageProcessor::new(Some(prompts), llm);
            let report = run_batch(
                source.as_ref(),
                &processor,
                Some(&store),
                &config.batch_options(),
            )
            .await;

            let merged = store
                .merge_processed(&report.records)
                .await
                .context("Failed to save processed inbox")?;

            eprintln!(
                "Processed {} of {} messages ({} skipped, {} on record)",
                report.records.len(),
                report.listed,
                report.skipped,
                merged.len()
            );
        }
        Command::Summarize(id) => {
            let record = find_record(&store, &id).await?;
            let assistant = Assistant::new(llm.context("No LLM provider")?);
            let summary = assistant
                .summarize(&record)
                .await
                .with_context(|| format!("Failed to summarize {id}"))?;
            println!("{summary}");
        }
        Command::Draft { id, tone } => {
            let record = find_record(&store, &id).await?;
            let assistant = Assistant::new(llm.context("No LLM provider")?);
            let draft = assistant.draft_reply(&record, &prompts, &tone).await;
            println!("Subject: {}\n\n{}", draft.subject, draft.body);
            store
                .append_draft(DraftRecord::from_reply(&record, draft))
                .await
                .context("Failed to save draft")?;
        }
    }

    Ok(())
}

/// Look a message up in the processed inbox first, then the snapshot.
async fn find_record(store: &TriageStore, id: &str) -> anyhow::Result<MessageRecord> {
    let processed = store.load_processed().await.context("Failed to load processed inbox")?;
    if let Some(record) = processed.into_iter().find(|r| r.id == id) {
        return Ok(record);
    }
    store
        .load_inbox()
        .await
        .context("Failed to load inbox")?
        .into_iter()
        .find(|r| r.id == id)
        .with_context(|| format!("No message with id {id}"))
}
