//! End-to-end annotation run: scan → stagger → fetch → decode → reveal, round after round.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, instrument};

use glimpse_shared::{AppConfig, ItemSource};

use crate::activity::ActivityIndicator;
use crate::prompt::PromptBuilder;
use crate::provider::Summarizer;
use crate::reveal::{RevealAnimator, RevealSettings};
use crate::scanner::{ItemScanner, ScanSettings};
use crate::scheduler::{RoundReport, Scheduler};
use crate::signal::InteractionSignal;
use crate::task::TaskContext;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub scan: ScanSettings,
    /// Start offset multiplier between tasks of one round.
    pub stagger: Duration,
    /// Wait after a failed task before it reports.
    pub failure_cooldown: Duration,
    pub reveal: RevealSettings,
    pub prompt: PromptBuilder,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            scan: ScanSettings::from(config),
            stagger: Duration::from_millis(config.schedule.stagger_interval_ms),
            failure_cooldown: Duration::from_millis(config.schedule.failure_cooldown_ms),
            reveal: RevealSettings::from(config),
            prompt: PromptBuilder::from(config),
        }
    }
}

/// Counts for one finished round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub round: u32,
    pub launched: usize,
    pub unresolved: usize,
    pub annotated: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RoundSummary {
    fn new(round: u32, report: &RoundReport) -> Self {
        Self {
            round,
            launched: report.launched,
            unresolved: report.unresolved,
            annotated: report.annotated,
            skipped: report.skipped,
            failed: report.failed,
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Scan rounds performed, including a final empty one.
    pub scans: u32,
    /// Rounds that launched a batch.
    pub rounds: Vec<RoundSummary>,
    /// Highest number of simultaneously in-flight requests.
    pub peak_activity: usize,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl RunReport {
    pub fn annotated(&self) -> usize {
        self.rounds.iter().map(|r| r.annotated).sum()
    }

    pub fn skipped(&self) -> usize {
        self.rounds.iter().map(|r| r.skipped).sum()
    }

    pub fn failed(&self) -> usize {
        self.rounds.iter().map(|r| r.failed).sum()
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a non-empty batch is about to launch.
    fn round_started(&self, round: u32, items: usize);
    /// Called once every task of the round settled.
    fn round_finished(&self, summary: &RoundSummary);
    /// Called when the pipeline completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn round_started(&self, _round: u32, _items: usize) {}
    fn round_finished(&self, _summary: &RoundSummary) {}
    fn done(&self, _report: &RunReport) {}
}

/// Annotation pipeline over one item source.
pub struct Pipeline {
    config: PipelineConfig,
    summarizer: Arc<dyn Summarizer>,
    source: Arc<dyn ItemSource>,
    signal: InteractionSignal,
    activity: ActivityIndicator,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        summarizer: Arc<dyn Summarizer>,
        source: Arc<dyn ItemSource>,
    ) -> Self {
        Self {
            config,
            summarizer,
            source,
            signal: InteractionSignal::new(),
            activity: ActivityIndicator::new(),
        }
    }

    /// Share an interaction signal owned by the presentation surface.
    pub fn with_signal(mut self, signal: InteractionSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn signal(&self) -> &InteractionSignal {
        &self.signal
    }

    /// Indicator the presentation surface can subscribe to.
    pub fn activity(&self) -> &ActivityIndicator {
        &self.activity
    }

    fn scheduler(&self) -> Scheduler {
        let ctx = TaskContext {
            summarizer: self.summarizer.clone(),
            source: self.source.clone(),
            prompt: self.config.prompt.clone(),
            animator: RevealAnimator::new(self.config.reveal.clone(), self.signal.clone()),
            activity: self.activity.clone(),
            failure_cooldown: self.config.failure_cooldown,
        };
        Scheduler::new(ctx, self.config.stagger)
    }

    /// Run scan rounds until the source is exhausted or the round cap is hit.
    ///
    /// Each round's batch fully settles before the next scan.
    #[instrument(skip_all, fields(max_rounds = self.config.scan.max_rounds))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> RunReport {
        let start = Instant::now();
        let scheduler = self.scheduler();
        let mut scanner = ItemScanner::new(self.source.clone(), self.config.scan);
        let mut report = RunReport::default();

        info!(stagger_ms = self.config.stagger.as_millis() as u64, "starting annotation pipeline");

        while let Some(batch) = scanner.next_batch().await {
            let round = scanner.rounds();
            progress.round_started(round, batch.len());

            let summary = RoundSummary::new(round, &scheduler.run_round(&batch).await);
            progress.round_finished(&summary);
            report.rounds.push(summary);
        }

        report.scans = scanner.rounds();
        report.peak_activity = self.activity.peak();
        report.elapsed = start.elapsed();

        info!(
            scans = report.scans,
            annotated = report.annotated(),
            skipped = report.skipped(),
            failed = report.failed(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "annotation pipeline complete"
        );
        progress.done(&report);
        report
    }
}
