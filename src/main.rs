//! paperdaily - Daily Academic Paper Digest Pipeline
//!
//! Fetches yesterday's arXiv and Crossref papers, scrapes publisher
//! abstracts, selects the relevant ones with an LLM, translates them, and
//! emails an HTML digest.
//!
//! ## Usage
//!
//! ### Fetch only
//! ```bash
//! paperdaily fetch --date 2025-08-22
//! ```
//!
//! ### Full cron run
//! ```bash
//! paperdaily run --specific-field "code generation,lint repair" --log-dir runlog
//! ```

use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use paperdaily::ingest::{self, IngestOptions};
use paperdaily::llm::{LlmClient, LlmConfig};
use paperdaily::mail::{self, MailConfig};
use paperdaily::select::{self, SelectOptions, SelectedRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Daily academic paper digest pipeline
#[derive(Parser)]
#[command(name = "paperdaily")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Also write logs to <log-dir>/<date>.log
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the day's papers into a checkpoint file
    Fetch(FetchArgs),

    /// Select relevant papers from a fetched checkpoint and email the digest
    Select(SelectArgs),

    /// Fetch, select, and email in one run (cron entrypoint)
    Run(RunArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Target date (YYYY-MM-DD); defaults to yesterday
    #[arg(long)]
    date: Option<String>,

    /// Directory receiving the checkpoint files
    #[arg(long, default_value = "papers")]
    out_dir: PathBuf,

    /// arXiv result cap
    #[arg(long, env = "ARXIV_COUNT", default_value_t = 5)]
    arxiv_count: u32,

    /// Crossref row cap
    #[arg(long, env = "CROSSREF_COUNT", default_value_t = 5)]
    crossref_count: u32,

    /// Contact address for the Crossref polite pool
    #[arg(long, env = "CROSSREF_MAILTO", default_value = "paperdaily@example.com")]
    mailto: String,
}

#[derive(Args)]
struct SelectArgs {
    /// Target date (YYYY-MM-DD); defaults to yesterday
    #[arg(long)]
    date: Option<String>,

    /// Directory holding the fetched checkpoint files
    #[arg(long, default_value = "papers")]
    out_dir: PathBuf,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    profile: ProfileArgs,

    #[command(flatten)]
    mail: MailArgs,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    fetch: FetchArgs,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    profile: ProfileArgs,

    #[command(flatten)]
    mail: MailArgs,
}

#[derive(Args)]
struct LlmArgs {
    /// LLM API base URL (OpenAI-compatible)
    #[arg(long, env = "LLM_BASE_URL")]
    llm_base_url: String,

    /// LLM API key
    #[arg(long, env = "LLM_API_KEY")]
    llm_api_key: String,

    /// LLM model name
    #[arg(long, env = "LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,
}

#[derive(Args)]
struct ProfileArgs {
    /// Broad research field for the relevance judgment
    #[arg(
        long,
        env = "BROAD_FIELD",
        default_value = "AI for Electronic Design Automation (EDA)"
    )]
    broad_field: String,

    /// Comma-separated specific research subfields
    #[arg(long, env = "SPECIFIC_FIELD")]
    specific_field: Option<String>,
}

#[derive(Args)]
struct MailArgs {
    /// SMTP server hostname
    #[arg(long, env = "SMTP_SERVER", default_value = "smtp.qq.com")]
    smtp_server: String,

    /// SMTP port (implicit TLS)
    #[arg(long, env = "SMTP_PORT", default_value_t = 465)]
    smtp_port: u16,

    /// Sender address, also used as the SMTP login
    #[arg(long, env = "SENDER_EMAIL")]
    sender_email: Option<String>,

    /// Sender password or authorization code
    #[arg(long, env = "SENDER_PASS")]
    sender_pass: Option<String>,

    /// Recipient address
    #[arg(long, env = "RECEIVER_EMAIL")]
    receiver_email: Option<String>,
}

impl LlmArgs {
    fn to_config(&self) -> LlmConfig {
        LlmConfig {
            base_url: self.llm_base_url.clone(),
            api_key: self.llm_api_key.clone(),
            model: self.llm_model.clone(),
        }
    }
}

impl ProfileArgs {
    fn to_options(&self) -> SelectOptions {
        let specific_fields = self
            .specific_field
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(|f| f.trim().to_string())
                    .filter(|f| !f.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        SelectOptions {
            broad_field: self.broad_field.clone(),
            specific_fields,
        }
    }
}

impl MailArgs {
    /// Assemble the mail config; `None` when the account settings are absent.
    fn to_config(&self) -> Option<MailConfig> {
        match (&self.sender_email, &self.sender_pass, &self.receiver_email) {
            (Some(sender), Some(password), Some(receiver)) => Some(MailConfig {
                smtp_server: self.smtp_server.clone(),
                smtp_port: self.smtp_port,
                sender: sender.clone(),
                password: password.clone(),
                receiver: receiver.clone(),
            }),
            _ => None,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let date = match &cli.command {
        Commands::Fetch(args) => resolve_date(args.date.as_deref())?,
        Commands::Select(args) => resolve_date(args.date.as_deref())?,
        Commands::Run(args) => resolve_date(args.fetch.date.as_deref())?,
    };

    init_logging(cli.debug, cli.log_dir.as_deref(), &date)?;

    match cli.command {
        Commands::Fetch(args) => run_fetch(&date, args).await,
        Commands::Select(args) => run_select_stage(&date, args).await,
        Commands::Run(args) => run_pipeline(&date, args).await,
    }
}

/// Resolve the target date to canonical `YYYY-MM-DD`: the explicit flag or
/// yesterday (local time).
fn resolve_date(date: Option<&str>) -> Result<String> {
    match date {
        Some(d) => {
            let parsed = NaiveDate::parse_from_str(d, "%Y-%m-%d")
                .with_context(|| format!("Invalid --date '{}', expected YYYY-MM-DD", d))?;
            Ok(parsed.format("%Y-%m-%d").to_string())
        }
        None => {
            let today = Local::now().date_naive();
            let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
            Ok(yesterday.format("%Y-%m-%d").to_string())
        }
    }
}

/// Initialize logging on stderr, plus a per-run file when `--log-dir` is set.
fn init_logging(debug: bool, log_dir: Option<&Path>, date: &str) -> Result<()> {
    let log_level = if debug { Level::DEBUG } else { Level::INFO };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).context("Failed to create log directory")?;
            let log_path = dir.join(format!("{}.log", date));
            let file = std::fs::File::create(&log_path)
                .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .with(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(false)
                .init();
        }
    }

    Ok(())
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_fetch(date: &str, args: FetchArgs) -> Result<()> {
    let path = ingest::run(&ingest_options(date, &args)).await?;
    println!("Fetched papers: {}", path.display());
    Ok(())
}

async fn run_select_stage(date: &str, args: SelectArgs) -> Result<()> {
    let input = ingest::paper_path(&args.out_dir, date);
    let llm = LlmClient::new(args.llm.to_config())?;

    let selected_path = select::run_select(&input, &llm, &args.profile.to_options()).await?;
    println!("Selected papers: {}", selected_path.display());

    send_digest_from_file(args.mail.to_config().as_ref(), date, &selected_path).await
}

/// The cron entrypoint: fetch, select, digest, with a failure notice wrapped
/// around the whole sequence.
async fn run_pipeline(date: &str, args: RunArgs) -> Result<()> {
    let mail_config = args.mail.to_config();

    let result = run_stages(date, &args, mail_config.as_ref()).await;

    if let Err(ref e) = result {
        let chain = format!("{:#}", e);
        error!(error = %chain, "Run failed");
        match &mail_config {
            Some(config) => {
                if let Err(mail_err) = mail::send_failure_notice(config, date, &chain).await {
                    error!(error = %mail_err, "Failed to send failure notice");
                }
            }
            None => info!("Mail not configured; skipping failure notice"),
        }
    }

    result
}

async fn run_stages(date: &str, args: &RunArgs, mail_config: Option<&MailConfig>) -> Result<()> {
    // === Stage 1: Fetch ===
    let paper_path = ingest::run(&ingest_options(date, &args.fetch)).await?;
    println!("Fetched papers: {}", paper_path.display());

    // === Stage 2: Select + Translate ===
    let llm = LlmClient::new(args.llm.to_config())?;
    let selected_path = select::run_select(&paper_path, &llm, &args.profile.to_options()).await?;
    println!("Selected papers: {}", selected_path.display());

    // === Stage 3: Digest ===
    send_digest_from_file(mail_config, date, &selected_path).await
}

fn ingest_options(date: &str, args: &FetchArgs) -> IngestOptions {
    IngestOptions {
        date: date.to_string(),
        arxiv_count: args.arxiv_count,
        crossref_count: args.crossref_count,
        mailto: args.mailto.clone(),
        out_dir: args.out_dir.clone(),
    }
}

async fn send_digest_from_file(
    config: Option<&MailConfig>,
    date: &str,
    selected_path: &Path,
) -> Result<()> {
    let config = match config {
        Some(config) => config,
        None => {
            info!("Mail not configured; skipping digest");
            return Ok(());
        }
    };

    let raw = std::fs::read_to_string(selected_path)
        .with_context(|| format!("Failed to read {}", selected_path.display()))?;
    let selected: Vec<SelectedRecord> =
        serde_json::from_str(&raw).context("Failed to parse selected papers")?;

    mail::send_digest(config, date, &selected).await?;
    println!("Digest sent: {} papers", selected.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_date_accepts_valid_date() {
        assert_eq!(resolve_date(Some("2025-08-22")).unwrap(), "2025-08-22");
    }

    #[test]
    fn test_resolve_date_rejects_malformed_date() {
        assert!(resolve_date(Some("08/22/2025")).is_err());
        assert!(resolve_date(Some("2025-13-40")).is_err());
    }

    #[test]
    fn test_resolve_date_canonicalizes_unpadded_date() {
        // chrono parses "2025-8-2" leniently; the padded form must come back
        assert_eq!(resolve_date(Some("2025-8-2")).unwrap(), "2025-08-02");
    }

    #[test]
    fn test_resolve_date_defaults_to_yesterday() {
        let resolved = resolve_date(None).unwrap();
        let expected = Local::now()
            .date_naive()
            .checked_sub_days(Days::new(1))
            .map(|d| d.format("%Y-%m-%d").to_string());
        assert_eq!(Some(resolved), expected);
    }

    #[test]
    fn test_mail_config_requires_account_settings() {
        let args = MailArgs {
            smtp_server: "smtp.qq.com".to_string(),
            smtp_port: 465,
            sender_email: Some("a@example.com".to_string()),
            sender_pass: None,
            receiver_email: Some("b@example.com".to_string()),
        };
        assert!(args.to_config().is_none());

        let args = MailArgs {
            sender_pass: Some("secret".to_string()),
            ..args
        };
        let config = args.to_config().unwrap();
        assert_eq!(config.smtp_port, 465);
        assert_eq!(config.receiver, "b@example.com");
    }

    #[test]
    fn test_specific_fields_split_on_commas() {
        let args = ProfileArgs {
            broad_field: "AI for EDA".to_string(),
            specific_field: Some("code generation, lint repair,,".to_string()),
        };
        assert_eq!(
            args.to_options().specific_fields,
            vec!["code generation".to_string(), "lint repair".to_string()]
        );

        let args = ProfileArgs {
            broad_field: "AI for EDA".to_string(),
            specific_field: None,
        };
        assert!(args.to_options().specific_fields.is_empty());
    }

    #[test]
    fn test_cli_parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "paperdaily",
            "run",
            "--date",
            "2025-08-22",
            "--llm-base-url",
            "https://api.example.com/v1",
            "--llm-api-key",
            "k",
        ])
        .unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.fetch.date.as_deref(), Some("2025-08-22"));
                assert_eq!(args.fetch.arxiv_count, 5);
                assert_eq!(args.llm.llm_model, "gpt-4o-mini");
                assert_eq!(args.mail.smtp_server, "smtp.qq.com");
            }
            _ => panic!("expected run subcommand"),
        }
    }
}
