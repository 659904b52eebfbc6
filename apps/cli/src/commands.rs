//! CLI command definitions, routing, and tracing setup.

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use glimpse_core::{GeminiClient, Pipeline, PipelineConfig, ProgressReporter, RoundSummary, RunReport};
use glimpse_shared::{
    AppConfig, CredentialStore, FileCredentialStore, PromptLocale, RevealStrategy, init_config,
    load_config,
};
use glimpse_source::{EntrySnapshot, MemorySource, PageSelectors, extract_page};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// Credential-store key holding the service API key.
const API_KEY_CREDENTIAL: &str = "api_key";

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Glimpse: AI summaries for every search result.
#[derive(Parser)]
#[command(
    name = "glimpse",
    version,
    about = "Annotate saved search result pages with AI-generated summaries.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Result listing format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Reveal strategy flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum StrategyArg {
    Chars,
    Chunks,
}

impl From<StrategyArg> for RevealStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Chars => Self::Chars,
            StrategyArg::Chunks => Self::Chunks,
        }
    }
}

/// Prompt language flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LocaleArg {
    Ja,
    En,
}

impl From<LocaleArg> for PromptLocale {
    fn from(arg: LocaleArg) -> Self {
        match arg {
            LocaleArg::Ja => Self::Japanese,
            LocaleArg::En => Self::English,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Summarize every result of a saved search result page.
    Annotate(AnnotateArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `glimpse annotate`.
#[derive(Args, Debug)]
pub(crate) struct AnnotateArgs {
    /// Saved result page (HTML), or `-` for stdin.
    pub page: String,

    /// Search query the page was produced by, added to every prompt.
    #[arg(short, long)]
    pub query: Option<String>,

    /// Base URL for resolving relative result links.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Reveal strategy (overrides `[reveal] strategy`).
    #[arg(long)]
    pub strategy: Option<StrategyArg>,

    /// Start offset between tasks of a round, in milliseconds.
    #[arg(long)]
    pub stagger_ms: Option<u64>,

    /// Upper bound on scan rounds.
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Prompt language (overrides `[prompt] locale`).
    #[arg(long)]
    pub locale: Option<LocaleArg>,

    /// Result listing format.
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl AnnotateArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut AppConfig) {
        if let Some(strategy) = self.strategy {
            config.reveal.strategy = strategy.into();
        }
        if let Some(stagger) = self.stagger_ms {
            config.schedule.stagger_interval_ms = stagger;
        }
        if let Some(rounds) = self.max_rounds {
            config.schedule.max_rounds = rounds;
        }
        if let Some(locale) = self.locale {
            config.prompt.locale = locale.into();
        }
    }

    fn reads_stdin(&self) -> bool {
        self.page == "-"
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "glimpse=info",
        1 => "glimpse=debug",
        _ => "glimpse=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    // Logs go to stderr so the result listing on stdout stays clean.
    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Annotate(args) => cmd_annotate(&args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// annotate
// ---------------------------------------------------------------------------

async fn cmd_annotate(args: &AnnotateArgs) -> Result<()> {
    let mut config = load_config()?;
    args.apply(&mut config);

    let html = read_page(&args.page)?;
    let base = args
        .base_url
        .as_deref()
        .map(|raw| Url::parse(raw).map_err(|e| eyre!("invalid base URL '{raw}': {e}")))
        .transpose()?;

    let selectors = PageSelectors::from_config(&config.source)?;
    let source = Arc::new(extract_page(&html, &selectors, base.as_ref()));
    if source.is_empty() {
        println!("No results found in {}", args.page);
        return Ok(());
    }
    info!(page = %args.page, results = source.len(), "page loaded");

    let env_value = std::env::var(&config.service.api_key_env).ok();
    let store = FileCredentialStore::open_default()?;
    let api_key = resolve_api_key(env_value, &store, || {
        if args.reads_stdin() {
            return Err(eyre!(
                "no API key found: set {} when reading the page from stdin",
                config.service.api_key_env
            ));
        }
        ask_api_key()
    })?;

    let client = GeminiClient::new(&config.service, api_key)?;
    debug!(url = %client.url(), "summarization endpoint");

    let mut pipeline_config = PipelineConfig::from(&config);
    pipeline_config.prompt = pipeline_config.prompt.with_query(args.query.clone());

    let pipeline = Pipeline::new(pipeline_config, Arc::new(client), source.clone());
    let indicator = spawn_indicator(pipeline.activity().subscribe());

    let report = pipeline.run(&CliProgress).await;

    // Dropping the pipeline closes the activity channel and ends the indicator.
    drop(pipeline);
    let _ = indicator.await;

    print_results(&report, &source.snapshot(), args.format)
}

fn read_page(page: &str) -> Result<String> {
    if page == "-" {
        let mut html = String::new();
        std::io::stdin()
            .read_to_string(&mut html)
            .wrap_err("failed to read page from stdin")?;
        return Ok(html);
    }
    std::fs::read_to_string(Path::new(page)).wrap_err_with(|| format!("failed to read {page}"))
}

/// Environment value first, then the credential store, then the operator.
/// A key obtained from the operator is persisted.
fn resolve_api_key(
    env_value: Option<String>,
    store: &dyn CredentialStore,
    ask: impl FnOnce() -> Result<String>,
) -> Result<String> {
    if let Some(key) = env_value.filter(|k| !k.trim().is_empty()) {
        return Ok(key);
    }
    if let Some(key) = store.get(API_KEY_CREDENTIAL)? {
        return Ok(key);
    }

    let key = ask()?;
    if key.is_empty() {
        return Err(eyre!("an API key is required to contact the summarization service"));
    }
    store.set(API_KEY_CREDENTIAL, &key)?;
    info!("API key saved");
    Ok(key)
}

fn ask_api_key() -> Result<String> {
    eprint!("Summarization service API key: ");
    std::io::stderr().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .wrap_err("failed to read API key")?;
    Ok(line.trim().to_string())
}

// ---------------------------------------------------------------------------
// Activity indicator and progress
// ---------------------------------------------------------------------------

fn activity_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.magenta} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["✦", "✧", "✦", "✧", "✦"]);
    spinner.set_style(style);
    spinner.enable_steady_tick(Duration::from_millis(250));
    spinner
}

fn activity_message(count: usize) -> String {
    match count {
        1 => "summarizing 1 result".to_string(),
        n => format!("summarizing {n} results"),
    }
}

/// Show a spinner while the activity count is positive.
fn spawn_indicator(mut activity: watch::Receiver<usize>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut spinner: Option<ProgressBar> = None;
        loop {
            let count = *activity.borrow_and_update();
            if count == 0 {
                if let Some(bar) = spinner.take() {
                    bar.finish_and_clear();
                }
            } else {
                spinner
                    .get_or_insert_with(activity_spinner)
                    .set_message(activity_message(count));
            }

            if activity.changed().await.is_err() {
                break;
            }
        }
        if let Some(bar) = spinner {
            bar.finish_and_clear();
        }
    })
}

/// Logs round boundaries; the spinner covers in-flight work.
struct CliProgress;

impl ProgressReporter for CliProgress {
    fn round_started(&self, round: u32, items: usize) {
        info!(round, items, "round started");
    }

    fn round_finished(&self, summary: &RoundSummary) {
        info!(
            round = summary.round,
            annotated = summary.annotated,
            skipped = summary.skipped,
            failed = summary.failed,
            "round finished"
        );
    }

    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct AnnotateOutput<'a> {
    report: &'a RunReport,
    items: &'a [EntrySnapshot],
}

fn print_results(report: &RunReport, items: &[EntrySnapshot], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = AnnotateOutput { report, items };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => print!("{}", render_text(report, items)),
    }
    Ok(())
}

fn render_text(report: &RunReport, items: &[EntrySnapshot]) -> String {
    let mut out = String::new();
    out.push('\n');
    for item in items {
        out.push_str(&format!(
            "  {} {}\n",
            item.handle,
            item.title.as_deref().unwrap_or("(untitled)")
        ));
        if let Some(url) = &item.url {
            out.push_str(&format!("     {url}\n"));
        }
        if let Some(text) = &item.text {
            for line in text.lines() {
                out.push_str(&format!("     {line}\n"));
            }
        }
        out.push('\n');
    }
    out.push_str(&format!(
        "  Annotated: {}  Skipped: {}  Failed: {}  Rounds: {}  Time: {:.1}s\n",
        report.annotated(),
        report.skipped(),
        report.failed(),
        report.rounds.len(),
        report.elapsed.as_secs_f64()
    ));
    out
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use glimpse_shared::{MemoryCredentialStore, Region, RevealStep};

    use super::*;

    #[test]
    fn parses_annotate_with_overrides() {
        let cli = Cli::try_parse_from([
            "glimpse",
            "annotate",
            "results.html",
            "--query",
            "rust async",
            "--strategy",
            "chunks",
            "--stagger-ms",
            "250",
            "--locale",
            "en",
            "--format",
            "json",
        ])
        .expect("parse");

        let Command::Annotate(args) = cli.command else {
            panic!("expected annotate");
        };
        assert_eq!(args.page, "results.html");
        assert_eq!(args.format, OutputFormat::Json);

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.reveal.strategy, RevealStrategy::Chunks);
        assert_eq!(config.schedule.stagger_interval_ms, 250);
        assert_eq!(config.schedule.max_rounds, 30);
        assert_eq!(config.prompt.locale, PromptLocale::English);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["glimpse", "config", "show", "-vv", "--log-format", "json"])
            .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.log_format, LogFormat::Json));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }

    #[test]
    fn rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["glimpse", "annotate", "p.html", "--strategy", "wipe"]).is_err());
    }

    #[test]
    fn api_key_prefers_environment() {
        let store = MemoryCredentialStore::default();
        store.set(API_KEY_CREDENTIAL, "stored").expect("set");
        let key = resolve_api_key(Some("from-env".into()), &store, || panic!("not asked"))
            .expect("key");
        assert_eq!(key, "from-env");
    }

    #[test]
    fn api_key_falls_back_to_store() {
        let store = MemoryCredentialStore::default();
        store.set(API_KEY_CREDENTIAL, "stored").expect("set");
        let key = resolve_api_key(Some("  ".into()), &store, || panic!("not asked")).expect("key");
        assert_eq!(key, "stored");
    }

    #[test]
    fn asked_api_key_is_persisted() {
        let store = MemoryCredentialStore::default();
        let key = resolve_api_key(None, &store, || Ok("typed".into())).expect("key");
        assert_eq!(key, "typed");
        assert_eq!(store.get(API_KEY_CREDENTIAL).expect("get"), Some("typed".into()));
    }

    #[test]
    fn empty_answer_is_an_error() {
        let store = MemoryCredentialStore::default();
        assert!(resolve_api_key(None, &store, || Ok(String::new())).is_err());
        assert_eq!(store.get(API_KEY_CREDENTIAL).expect("get"), None);
    }

    #[test]
    fn text_listing_shows_summary_lines() {
        let source = MemorySource::new();
        let (_, region) = source.push_item("Rust", "https://rust-lang.org/");
        region.apply(&RevealStep::Replace("✦ line one\nline two".into()));

        let text = render_text(&RunReport::default(), &source.snapshot());
        assert!(text.contains("#0 Rust"));
        assert!(text.contains("     https://rust-lang.org/"));
        assert!(text.contains("     ✦ line one\n     line two\n"));
        assert!(text.contains("Annotated: 0"));
    }
}
