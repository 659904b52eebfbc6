//! Test doubles shared by the unit tests in this crate.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use tokio::time::Instant;

use glimpse_shared::{ItemSource, PromptLocale, Result};

use crate::activity::ActivityIndicator;
use crate::prompt::PromptBuilder;
use crate::provider::{ServiceResponse, Summarizer};
use crate::reveal::{RevealAnimator, RevealSettings};
use crate::signal::InteractionSignal;
use crate::task::TaskContext;

#[derive(Debug, Clone)]
enum Script {
    Body(String),
    Status(u16),
}

/// Summarizer that answers by matching the item URL inside the prompt.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSummarizer {
    scripts: Vec<(String, Script)>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedSummarizer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with a well-formed envelope carrying `text`.
    pub(crate) fn reply(self, url: &str, text: &str) -> Self {
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        });
        self.raw(url, &body.to_string())
    }

    /// Answer `url` with a 200 and an arbitrary body.
    pub(crate) fn raw(mut self, url: &str, body: &str) -> Self {
        self.scripts.push((url.into(), Script::Body(body.into())));
        self
    }

    /// Answer `url` with an empty body and the given status.
    pub(crate) fn status(mut self, url: &str, status: u16) -> Self {
        self.scripts.push((url.into(), Script::Status(status)));
        self
    }

    /// URLs requested so far, with the (virtual) instant of each request.
    pub(crate) fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn generate(&self, prompt: &str) -> Result<ServiceResponse> {
        let (url, script) = self
            .scripts
            .iter()
            .find(|(url, _)| prompt.contains(url.as_str()))
            .cloned()
            .unwrap_or_else(|| (String::new(), Script::Status(404)));

        self.calls.lock().unwrap().push((url, Instant::now()));

        Ok(match script {
            // Three-byte chunks so multi-byte text crosses chunk boundaries.
            Script::Body(body) => ServiceResponse::from_chunks(
                StatusCode::OK,
                body.as_bytes()
                    .chunks(3)
                    .map(Bytes::copy_from_slice)
                    .collect(),
            ),
            Script::Status(code) => ServiceResponse::from_chunks(
                StatusCode::from_u16(code).unwrap(),
                Vec::new(),
            ),
        })
    }
}

/// Task context with default reveal settings and a five-second cool-down.
pub(crate) fn context(
    summarizer: impl Summarizer + 'static,
    source: Arc<dyn ItemSource>,
) -> TaskContext {
    context_with(Arc::new(summarizer), source, InteractionSignal::new())
}

pub(crate) fn context_with(
    summarizer: Arc<dyn Summarizer>,
    source: Arc<dyn ItemSource>,
    signal: InteractionSignal,
) -> TaskContext {
    TaskContext {
        summarizer,
        source,
        prompt: PromptBuilder::new(PromptLocale::English, 300),
        animator: RevealAnimator::new(RevealSettings::default(), signal),
        activity: ActivityIndicator::new(),
        failure_cooldown: Duration::from_secs(5),
    }
}
