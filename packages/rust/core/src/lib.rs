//! Annotation pipeline for Glimpse.
//!
//! Scans an item source for unannotated items, asks the summarization
//! service about each one in staggered concurrent rounds, and reveals the
//! answers into the items' regions.

pub mod activity;
pub mod decoder;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod reveal;
pub mod scanner;
pub mod scheduler;
pub mod signal;
pub mod task;

#[cfg(test)]
mod testing;

pub use activity::{ActivityGuard, ActivityIndicator};
pub use decoder::{Utf8StreamDecoder, decode};
pub use pipeline::{
    Pipeline, PipelineConfig, ProgressReporter, RoundSummary, RunReport, SilentProgress,
};
pub use prompt::PromptBuilder;
pub use provider::{GeminiClient, ServiceResponse, Summarizer, parse_envelope};
pub use reveal::{RevealAnimator, RevealPlan, RevealSettings, RevealStats};
pub use scanner::{ItemScanner, ScanSettings};
pub use scheduler::{RoundReport, Scheduler};
pub use signal::{InteractionSignal, Pause};
pub use task::{AnnotationTask, SkipReason, TaskContext, TaskOutcome, TaskReport, TaskState};
