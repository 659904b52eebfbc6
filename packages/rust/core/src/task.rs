//! Per-item annotation task.
//!
//! One task walks a single item through
//! `Pending -> Requesting -> Decoding -> ResolvingTarget -> Revealing -> Done`,
//! or ends in `Failed` from one of the first three states. Errors never leave
//! the task: they are logged, followed by a fixed cool-down, and reported.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use glimpse_shared::{GlimpseError, Item, ItemHandle, ItemSource, Result, SummaryResult};

use crate::activity::ActivityIndicator;
use crate::decoder::decode;
use crate::prompt::PromptBuilder;
use crate::provider::{Summarizer, parse_envelope};
use crate::reveal::RevealAnimator;

/// Lifecycle state of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Requesting,
    Decoding,
    ResolvingTarget,
    Revealing,
    Done,
    Failed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Why a task finished without writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The item has no region to write into.
    NoTargetRegion,
    /// Another task marked the item first.
    AlreadyAnnotated,
}

/// How a task ended.
#[derive(Debug)]
pub enum TaskOutcome {
    Annotated,
    Skipped(SkipReason),
    Failed(GlimpseError),
}

/// Final report of one task.
#[derive(Debug)]
pub struct TaskReport {
    pub handle: ItemHandle,
    pub title: String,
    pub state: TaskState,
    pub outcome: TaskOutcome,
}

/// Collaborators shared by every task of a pipeline.
#[derive(Clone)]
pub struct TaskContext {
    pub summarizer: Arc<dyn Summarizer>,
    pub source: Arc<dyn ItemSource>,
    pub prompt: PromptBuilder,
    pub animator: RevealAnimator,
    pub activity: ActivityIndicator,
    pub failure_cooldown: Duration,
}

/// One item's trip through the state machine.
#[derive(Debug)]
pub struct AnnotationTask {
    item: Item,
    state: TaskState,
}

impl AnnotationTask {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            state: TaskState::Pending,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn transition(&mut self, next: TaskState) {
        debug!(item = %self.item.handle, from = ?self.state, to = ?next, "task transition");
        self.state = next;
    }

    /// Run to a terminal state. Never fails; errors are folded into the report.
    pub async fn run(mut self, ctx: &TaskContext) -> TaskReport {
        let activity = ctx.activity.raise();

        let outcome = match self.fetch_summary(ctx).await {
            Ok(summary) => {
                let outcome = self.deliver(ctx, summary).await;
                activity.lower();
                outcome
            }
            Err(e) => {
                self.transition(TaskState::Failed);
                activity.lower();
                warn!(
                    item = %self.item.handle,
                    title = %self.item.title,
                    url = %self.item.url,
                    kind = e.kind(),
                    error = %e,
                    "annotation failed"
                );
                tokio::time::sleep(ctx.failure_cooldown).await;
                TaskOutcome::Failed(e)
            }
        };

        TaskReport {
            handle: self.item.handle,
            title: self.item.title,
            state: self.state,
            outcome,
        }
    }

    async fn fetch_summary(&mut self, ctx: &TaskContext) -> Result<SummaryResult> {
        self.transition(TaskState::Requesting);
        let prompt = ctx.prompt.build(&self.item.title, &self.item.url);
        let response = ctx.summarizer.generate(&prompt).await?;

        self.transition(TaskState::Decoding);
        let body = decode(response).await?;
        let raw = parse_envelope(&body)?;
        Ok(SummaryResult::from_raw(&raw))
    }

    async fn deliver(&mut self, ctx: &TaskContext, summary: SummaryResult) -> TaskOutcome {
        self.transition(TaskState::ResolvingTarget);
        let Some(region) = self.item.region.clone() else {
            debug!(item = %self.item.handle, "no target region, skipping");
            self.transition(TaskState::Done);
            return TaskOutcome::Skipped(SkipReason::NoTargetRegion);
        };

        self.transition(TaskState::Revealing);
        if !ctx.source.mark_annotated(self.item.handle) {
            debug!(item = %self.item.handle, "already annotated by another task");
            self.transition(TaskState::Done);
            return TaskOutcome::Skipped(SkipReason::AlreadyAnnotated);
        }

        info!(item = %self.item.handle, title = %self.item.title, chars = summary.text.chars().count(), "summary ready");
        region.prepare();
        ctx.animator.reveal(region.as_ref(), &summary.text).await;

        self.transition(TaskState::Done);
        TaskOutcome::Annotated
    }
}
