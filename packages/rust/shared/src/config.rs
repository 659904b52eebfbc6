//! Application configuration for Glimpse.
//!
//! User config lives at `~/.glimpse/glimpse.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GlimpseError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "glimpse.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".glimpse";

// ---------------------------------------------------------------------------
// Config structs (matching glimpse.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Summarization service settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Round and task timing.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Reveal animation settings.
    #[serde(default)]
    pub reveal: RevealConfig,

    /// Prompt template selection.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Selectors used to extract items from a result page.
    #[serde(default)]
    pub source: SourceConfig,
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the model collection; `/{model}:generateContent` is appended.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,

    /// Name of the env var holding the API key (never store the key itself here).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Whole-request timeout for the HTTP client.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".into()
}
fn default_model() -> String {
    "gemini-1.5-pro-latest".into()
}
fn default_api_key_env() -> String {
    "GLIMPSE_API_KEY".into()
}
fn default_request_timeout() -> u64 {
    120
}

/// `[schedule]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Start offset multiplier between tasks of one round.
    #[serde(default = "default_stagger")]
    pub stagger_interval_ms: u64,

    /// Upper bound on scan rounds.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Settle delay before the first scan.
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Delay between two scan rounds.
    #[serde(default)]
    pub round_delay_ms: u64,

    /// Cool-down a failed task waits before it returns.
    #[serde(default = "default_cooldown")]
    pub failure_cooldown_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            stagger_interval_ms: default_stagger(),
            max_rounds: default_max_rounds(),
            initial_delay_ms: default_initial_delay(),
            round_delay_ms: 0,
            failure_cooldown_ms: default_cooldown(),
        }
    }
}

fn default_stagger() -> u64 {
    1000
}
fn default_max_rounds() -> u32 {
    30
}
fn default_initial_delay() -> u64 {
    1000
}
fn default_cooldown() -> u64 {
    5000
}

/// How a summary is written into its region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealStrategy {
    /// One character per step with a trailing cursor glyph.
    #[default]
    Chars,
    /// Fixed-size chunks appended as fading segments.
    Chunks,
}

/// `[reveal]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Reveal strategy.
    #[serde(default)]
    pub strategy: RevealStrategy,

    /// Delay between characters (char strategy).
    #[serde(default = "default_char_delay")]
    pub char_delay_ms: u64,

    /// Characters per chunk (chunk strategy).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Delay between chunks (chunk strategy).
    #[serde(default = "default_chunk_delay")]
    pub chunk_delay_ms: u64,

    /// Fade-in duration attached to each chunk segment.
    #[serde(default = "default_fade")]
    pub fade_ms: u64,

    /// Cursor glyph trailing the text while typing.
    #[serde(default = "default_cursor")]
    pub cursor: String,

    /// Prefix written ahead of every summary.
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Upper bound on a single interaction pause. Unset waits indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pause_ms: Option<u64>,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            strategy: RevealStrategy::default(),
            char_delay_ms: default_char_delay(),
            chunk_size: default_chunk_size(),
            chunk_delay_ms: default_chunk_delay(),
            fade_ms: default_fade(),
            cursor: default_cursor(),
            marker: default_marker(),
            max_pause_ms: None,
        }
    }
}

fn default_char_delay() -> u64 {
    2
}
fn default_chunk_size() -> usize {
    20
}
fn default_chunk_delay() -> u64 {
    100
}
fn default_fade() -> u64 {
    1000
}
fn default_cursor() -> String {
    "●".into()
}
fn default_marker() -> String {
    "✦ ".into()
}

/// Language of the summarization prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptLocale {
    #[default]
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "en")]
    English,
}

impl std::str::FromStr for PromptLocale {
    type Err = GlimpseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ja" => Ok(Self::Japanese),
            "en" => Ok(Self::English),
            other => Err(GlimpseError::config(format!(
                "unknown prompt locale '{other}': expected 'ja' or 'en'"
            ))),
        }
    }
}

/// `[prompt]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Template language.
    #[serde(default)]
    pub locale: PromptLocale,

    /// Approximate summary length, in characters.
    #[serde(default = "default_summary_length")]
    pub summary_length: u32,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            locale: PromptLocale::default(),
            summary_length: default_summary_length(),
        }
    }
}

fn default_summary_length() -> u32 {
    300
}

/// `[source]` section: CSS selectors for result page extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// One match per result block.
    #[serde(default = "default_result_selector")]
    pub result_selector: String,

    /// The result link inside a block.
    #[serde(default = "default_link_selector")]
    pub link_selector: String,

    /// The title inside the link.
    #[serde(default = "default_title_selector")]
    pub title_selector: String,

    /// Snippet spans inside a block; the second match wins over the first.
    #[serde(default = "default_snippet_selector")]
    pub snippet_selector: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            result_selector: default_result_selector(),
            link_selector: default_link_selector(),
            title_selector: default_title_selector(),
            snippet_selector: default_snippet_selector(),
        }
    }
}

fn default_result_selector() -> String {
    "#rso>div".into()
}
fn default_link_selector() -> String {
    "span>a".into()
}
fn default_title_selector() -> String {
    "h3".into()
}
fn default_snippet_selector() -> String {
    "div>span".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.glimpse/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GlimpseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.glimpse/glimpse.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GlimpseError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| GlimpseError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GlimpseError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| GlimpseError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GlimpseError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
