//! Staggered, concurrent launch of one round's annotation tasks.
//!
//! Every task of a round is created up front and driven by a single
//! `join_all`, so tasks interleave cooperatively on the caller's task.
//! Task `k` waits `k * stagger` before its first request, which spreads
//! load on the service without serializing the round.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, instrument};

use glimpse_shared::{Item, ItemHandle};

use crate::task::{AnnotationTask, SkipReason, TaskContext, TaskOutcome, TaskReport};

/// Tallies for one round.
#[derive(Debug, Default)]
pub struct RoundReport {
    /// Tasks launched.
    pub launched: usize,
    /// Handles dropped before launch (no title or URL).
    pub unresolved: usize,
    pub annotated: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Per-task reports, in launch order.
    pub tasks: Vec<TaskReport>,
}

impl RoundReport {
    fn record(&mut self, report: TaskReport) {
        match &report.outcome {
            TaskOutcome::Annotated => self.annotated += 1,
            TaskOutcome::Skipped(_) => self.skipped += 1,
            TaskOutcome::Failed(_) => self.failed += 1,
        }
        self.tasks.push(report);
    }

    /// Tasks that ended because the item had nowhere to write.
    pub fn without_region(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, TaskOutcome::Skipped(SkipReason::NoTargetRegion)))
            .count()
    }
}

/// Launches and awaits the tasks of one batch.
#[derive(Clone)]
pub struct Scheduler {
    ctx: TaskContext,
    stagger: Duration,
}

impl Scheduler {
    pub fn new(ctx: TaskContext, stagger: Duration) -> Self {
        Self { ctx, stagger }
    }

    pub fn context(&self) -> &TaskContext {
        &self.ctx
    }

    /// Start offset of the `k`-th launched task.
    pub fn offset(&self, k: usize) -> Duration {
        self.stagger.saturating_mul(u32::try_from(k).unwrap_or(u32::MAX))
    }

    /// Resolve, launch, and await every task of `batch`.
    ///
    /// Resolves only once every launched task reached a terminal state.
    #[instrument(skip_all, fields(batch = batch.len()))]
    pub async fn run_round(&self, batch: &[ItemHandle]) -> RoundReport {
        let mut report = RoundReport::default();

        let items: Vec<Item> = batch
            .iter()
            .filter_map(|&handle| {
                let item = self.ctx.source.resolve(handle);
                if item.is_none() {
                    debug!(item = %handle, "missing title or URL, not launching");
                }
                item
            })
            .collect();
        report.unresolved = batch.len() - items.len();
        report.launched = items.len();

        let tasks = items.into_iter().enumerate().map(|(k, item)| {
            let offset = self.offset(k);
            async move {
                if !offset.is_zero() {
                    tokio::time::sleep(offset).await;
                }
                AnnotationTask::new(item).run(&self.ctx).await
            }
        });

        for task in join_all(tasks).await {
            report.record(task);
        }

        info!(
            launched = report.launched,
            unresolved = report.unresolved,
            annotated = report.annotated,
            skipped = report.skipped,
            failed = report.failed,
            "round complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glimpse_source::MemorySource;
    use glimpse_shared::{ItemSource, Region};
    use tokio::time::Instant;

    use super::*;
    use crate::signal::InteractionSignal;
    use crate::testing::{ScriptedSummarizer, context, context_with};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn staggers_three_tasks_and_waits_for_all() {
        let source = Arc::new(MemorySource::new());
        let urls = ["https://a.example/", "https://b.example/", "https://c.example/"];
        let mut summarizer = ScriptedSummarizer::new();
        for (i, url) in urls.iter().enumerate() {
            source.push_item(&format!("Item {i}"), url);
            summarizer = summarizer.reply(url, "summary");
        }
        let summarizer = Arc::new(summarizer);
        let ctx = context_with(summarizer.clone(), source.clone(), InteractionSignal::new());
        let scheduler = Scheduler::new(ctx, ms(1000));

        let start = Instant::now();
        let report = scheduler.run_round(&source.query_unannotated()).await;

        let calls = summarizer.calls();
        assert_eq!(calls.len(), 3);
        for (k, url) in urls.iter().enumerate() {
            let (_, at) = calls.iter().find(|(u, _)| u == url).expect("requested");
            let offset = at.duration_since(start);
            let expected = ms(1000 * k as u64);
            assert!(offset >= expected && offset < expected + ms(50), "{url}: {offset:?}");
        }

        assert_eq!(report.launched, 3);
        assert_eq!(report.annotated, 3);
        assert!(report.tasks.iter().all(|t| t.state.is_terminal()));
        assert!(source.query_unannotated().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_items_are_not_launched() {
        let source = Arc::new(MemorySource::new());
        source.push(None, Some("https://no-title.example/".into()), None);
        source.push(Some("No URL".into()), None, None);
        source.push_item("Ok", "https://ok.example/");

        let summarizer = Arc::new(ScriptedSummarizer::new().reply("https://ok.example/", "fine"));
        let ctx = context_with(summarizer.clone(), source.clone(), InteractionSignal::new());
        let scheduler = Scheduler::new(ctx, ms(1000));

        let start = Instant::now();
        let report = scheduler.run_round(&source.query_unannotated()).await;

        assert_eq!(report.unresolved, 2);
        assert_eq!(report.launched, 1);
        assert_eq!(report.failed, 0);
        // The only launched task is task 0: no stagger.
        let (_, at) = summarizer.calls()[0].clone();
        assert!(at.duration_since(start) < ms(50));
    }

    #[tokio::test(start_paused = true)]
    async fn one_failure_does_not_disturb_siblings() {
        let source = Arc::new(MemorySource::new());
        let (_, good_a) = source.push_item("A", "https://a.example/");
        let (bad, bad_region) = source.push_item("B", "https://b.example/");
        let (_, good_c) = source.push_item("C", "https://c.example/");

        let summarizer = ScriptedSummarizer::new()
            .reply("https://a.example/", "alpha")
            .status("https://b.example/", 500)
            .reply("https://c.example/", "gamma");
        let scheduler = Scheduler::new(context(summarizer, source.clone()), ms(1000));

        let report = scheduler.run_round(&source.query_unannotated()).await;

        assert_eq!((report.annotated, report.failed), (2, 1));
        assert_eq!(good_a.text(), "✦ alpha");
        assert_eq!(good_c.text(), "✦ gamma");
        assert_eq!(bad_region.writes(), 0);
        assert_eq!(source.query_unannotated(), vec![bad]);
        assert!(!scheduler.context().activity.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_rounds_annotate_once() {
        let source = Arc::new(MemorySource::new());
        let (_, region) = source.push_item("A", "https://a.example/");
        let summarizer = ScriptedSummarizer::new().reply("https://a.example/", "only once");
        let scheduler = Scheduler::new(context(summarizer, source.clone()), ms(1000));

        let batch = source.query_unannotated();
        let (first, second) = tokio::join!(scheduler.run_round(&batch), scheduler.run_round(&batch));

        assert_eq!(first.annotated + second.annotated, 1);
        assert_eq!(first.skipped + second.skipped, 1);
        assert_eq!(region.text(), "✦ only once");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_batch_is_a_noop() {
        let source = Arc::new(MemorySource::new());
        let scheduler = Scheduler::new(context(ScriptedSummarizer::new(), source), ms(1000));
        let report = scheduler.run_round(&[]).await;
        assert_eq!(report.launched, 0);
        assert_eq!(scheduler.context().activity.peak(), 0);
    }

    #[test]
    fn offset_scales_with_index() {
        let source: Arc<dyn ItemSource> = Arc::new(MemorySource::new());
        let scheduler = Scheduler::new(context(ScriptedSummarizer::new(), source), ms(2500));
        assert_eq!(scheduler.offset(0), Duration::ZERO);
        assert_eq!(scheduler.offset(3), ms(7500));
    }
}
