use crate::classifier::ClassifierClient;
use crate::credentials::{self, Anonymous, CredentialProvider, SessionTokenFile, StaticToken};
use crate::model::{ChannelType, ClientConfig, DetectionEvent, DraftMessage, NoticeLevel};
use crate::orchestrator::{self, SubmissionController};
use crate::storage::HistoryStore;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "spam-check-cli",
    version,
    about = "Check email, SMS and social media messages for spam with an optional TUI"
)]
pub struct Cli {
    /// Base URL of the classification service (the `/predict` endpoint lives under it)
    #[arg(long, env = "SPAM_CHECK_API_URL", default_value = "http://localhost:5000/api")]
    pub base_url: String,

    /// Bearer token for the classification service
    #[arg(long, env = "SPAM_CHECK_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Read the session token from this file (re-read before every request)
    #[arg(long, conflicts_with = "token")]
    pub token_file: Option<std::path::PathBuf>,

    /// HTTP request timeout
    #[arg(long, default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Classify this message and exit (`-` reads it from stdin)
    #[arg(long, conflicts_with = "example")]
    pub message: Option<String>,

    /// Classify the built-in spam example and exit
    #[arg(long)]
    pub example: bool,

    /// Channel the message came from
    #[arg(long, value_enum, default_value_t = ChannelType::Email)]
    pub channel: ChannelType,

    /// Print JSON outcome and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Use --auto-save true or --auto-save false to override
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub auto_save: bool,

    /// Clear the draft after a message is classified
    #[arg(long)]
    pub clear_on_success: bool,

    /// Export each outcome as JSON to this path
    #[arg(long)]
    pub export_json: Option<std::path::PathBuf>,

    /// Log level for this crate (RUST_LOG overrides)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// One-shot modes print a result and exit instead of opening the TUI.
    pub fn is_one_shot(&self) -> bool {
        self.json || self.text || self.message.is_some() || self.example
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if (args.json || args.text) && args.message.is_none() && !args.example {
        return Err(anyhow::anyhow!(
            "--json and --text need a message: pass --message <TEXT> or --example"
        ));
    }

    if !args.is_one_shot() {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            return Err(anyhow::anyhow!(
                "built without TUI support: pass --message <TEXT> or --example"
            ));
        }
    }

    run_once(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_client_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from(args.timeout),
        user_agent: format!("spam-check-cli/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Pick the credential source: explicit token, then token file, then the default
/// session file.
pub fn build_credentials(args: &Cli) -> Arc<dyn CredentialProvider> {
    if let Some(token) = args.token.as_ref() {
        return Arc::new(StaticToken::new(token.clone()));
    }
    if let Some(path) = args.token_file.as_ref() {
        return Arc::new(SessionTokenFile::new(path.clone()));
    }
    match credentials::default_session_path() {
        Some(path) => Arc::new(SessionTokenFile::new(path)),
        None => Arc::new(Anonymous),
    }
}

pub(crate) fn build_controller(
    args: &Cli,
    event_tx: mpsc::UnboundedSender<DetectionEvent>,
) -> Result<SubmissionController> {
    let client = ClassifierClient::new(&build_client_config(args))?;
    Ok(SubmissionController::new(
        client,
        build_credentials(args),
        event_tx,
    ))
}

async fn resolve_message(args: &Cli) -> Result<String> {
    if args.example {
        return Ok(crate::draft::EXAMPLE_MESSAGE.to_string());
    }
    match args.message.as_deref() {
        Some("-") => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("read message from stdin")?;
            Ok(buf)
        }
        Some(m) => Ok(m.to_string()),
        None => Ok(String::new()),
    }
}

/// History store for one-shot runs; only resolved when auto-save is on.
fn one_shot_store(args: &Cli) -> Result<Option<HistoryStore>> {
    if !args.auto_save {
        return Ok(None);
    }
    HistoryStore::default_location().map(Some)
}

/// Submit a single message, print the outcome, and report failure when none is produced.
async fn run_once(args: Cli) -> Result<()> {
    let message = resolve_message(&args).await?;
    let draft = DraftMessage::new(message, args.channel);

    let (out_tx, out_handle) = spawn_output_writer();
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<DetectionEvent>();
    let mut controller = build_controller(&args, evt_tx)?;

    let outcome = controller.submit(&draft).await;
    drop(controller);

    while let Some(ev) = evt_rx.recv().await {
        if let DetectionEvent::Notice(n) = ev {
            // Success notices would only repeat the outcome itself.
            if n.level != NoticeLevel::Success {
                let _ = out_tx.send(OutputLine::Stderr(n.text));
            }
        }
    }

    let res = match outcome {
        Some(outcome) => {
            if args.json {
                let out = serde_json::to_string_pretty(&outcome)?;
                let _ = out_tx.send(OutputLine::Stdout(out));
            } else {
                let summary = crate::text_summary::build_text_summary(&outcome);
                for line in summary.lines {
                    let _ = out_tx.send(OutputLine::Stdout(line));
                }
            }

            let store = one_shot_store(&args)?;
            let processed = orchestrator::process_outcome(
                store.as_ref(),
                args.export_json.as_deref(),
                0,
                &outcome,
            );
            for msg in processed.export_messages {
                let _ = out_tx.send(OutputLine::Stderr(msg));
            }
            if let Some(p) = processed.auto_saved_path {
                let _ = out_tx.send(OutputLine::Stderr(format!("Saved: {}", p.display())));
            }
            Ok(())
        }
        None => Err(anyhow::anyhow!("message was not classified")),
    };

    drop(out_tx);
    let _ = out_handle.await;
    res
}
