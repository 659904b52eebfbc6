//! Incremental reveal of summary text into a region.
//!
//! Sequencing and timing are split: [`RevealPlan`] is a deterministic
//! generator of [`RevealStep`]s, and [`RevealAnimator`] drains it with a
//! per-step delay, waiting on the [`InteractionSignal`] before every write.

use std::time::Duration;

use tracing::{debug, warn};

use glimpse_shared::{AppConfig, Region, RevealConfig, RevealStep, RevealStrategy};

use crate::signal::{InteractionSignal, Pause};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime reveal settings, built from `[reveal]`.
#[derive(Debug, Clone)]
pub struct RevealSettings {
    pub strategy: RevealStrategy,
    pub char_delay: Duration,
    pub chunk_size: usize,
    pub chunk_delay: Duration,
    pub fade: Duration,
    pub cursor: String,
    pub marker: String,
    pub max_pause: Option<Duration>,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self::from(&RevealConfig::default())
    }
}

impl From<&RevealConfig> for RevealSettings {
    fn from(config: &RevealConfig) -> Self {
        Self {
            strategy: config.strategy,
            char_delay: Duration::from_millis(config.char_delay_ms),
            chunk_size: config.chunk_size.max(1),
            chunk_delay: Duration::from_millis(config.chunk_delay_ms),
            fade: Duration::from_millis(config.fade_ms),
            cursor: config.cursor.clone(),
            marker: config.marker.clone(),
            max_pause: config.max_pause_ms.map(Duration::from_millis),
        }
    }
}

impl From<&AppConfig> for RevealSettings {
    fn from(config: &AppConfig) -> Self {
        Self::from(&config.reveal)
    }
}

impl RevealSettings {
    /// Delay between two consecutive steps.
    pub fn step_delay(&self) -> Duration {
        match self.strategy {
            RevealStrategy::Chars => self.char_delay,
            RevealStrategy::Chunks => self.chunk_delay,
        }
    }

    /// Text a region holds once `text` is fully revealed.
    pub fn final_text(&self, text: &str) -> String {
        format!("{}{text}", self.marker)
    }
}

// ---------------------------------------------------------------------------
// RevealPlan
// ---------------------------------------------------------------------------

/// Ordered reveal steps for one text.
///
/// Chars: `Replace(marker + prefix + cursor)` per character, then a final
/// `Replace(marker + text)` without the cursor.
/// Chunks: `Replace(marker)`, then one `Append` per chunk of `chunk_size` characters.
#[derive(Debug)]
pub struct RevealPlan {
    kind: PlanKind,
}

#[derive(Debug)]
enum PlanKind {
    Chars {
        shown: String,
        rest: std::vec::IntoIter<char>,
        cursor: String,
        done: bool,
    },
    Chunks {
        head: Option<String>,
        chunks: std::vec::IntoIter<String>,
        fade: Duration,
    },
}

impl RevealPlan {
    pub fn new(settings: &RevealSettings, text: &str) -> Self {
        let kind = match settings.strategy {
            RevealStrategy::Chars => PlanKind::Chars {
                shown: settings.marker.clone(),
                rest: text.chars().collect::<Vec<_>>().into_iter(),
                cursor: settings.cursor.clone(),
                done: false,
            },
            RevealStrategy::Chunks => {
                let chars: Vec<char> = text.chars().collect();
                let chunks: Vec<String> = chars
                    .chunks(settings.chunk_size.max(1))
                    .map(|chunk| chunk.iter().collect())
                    .collect();
                PlanKind::Chunks {
                    head: Some(settings.marker.clone()),
                    chunks: chunks.into_iter(),
                    fade: settings.fade,
                }
            }
        };
        Self { kind }
    }
}

impl Iterator for RevealPlan {
    type Item = RevealStep;

    fn next(&mut self) -> Option<RevealStep> {
        match &mut self.kind {
            PlanKind::Chars {
                shown,
                rest,
                cursor,
                done,
            } => match rest.next() {
                Some(c) => {
                    shown.push(c);
                    Some(RevealStep::Replace(format!("{shown}{cursor}")))
                }
                None if !*done => {
                    *done = true;
                    Some(RevealStep::Replace(shown.clone()))
                }
                None => None,
            },
            PlanKind::Chunks { head, chunks, fade } => {
                if let Some(marker) = head.take() {
                    return Some(RevealStep::Replace(marker));
                }
                chunks.next().map(|text| RevealStep::Append { text, fade: *fade })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// RevealAnimator
// ---------------------------------------------------------------------------

/// Counters from one reveal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RevealStats {
    pub steps: usize,
    /// Steps that had to wait for the interaction signal to clear.
    pub pauses: usize,
    /// Waits that hit the configured pause limit.
    pub timeouts: usize,
}

/// Drains a [`RevealPlan`] into a region.
#[derive(Debug, Clone)]
pub struct RevealAnimator {
    settings: RevealSettings,
    signal: InteractionSignal,
}

impl RevealAnimator {
    pub fn new(settings: RevealSettings, signal: InteractionSignal) -> Self {
        Self { settings, signal }
    }

    pub fn settings(&self) -> &RevealSettings {
        &self.settings
    }

    /// Write `text` into `region`, one step at a time. Completes once the
    /// final step is applied.
    pub async fn reveal(&self, region: &dyn Region, text: &str) -> RevealStats {
        let delay = self.settings.step_delay();
        let mut stats = RevealStats::default();
        let mut plan = RevealPlan::new(&self.settings, text).peekable();

        while let Some(step) = plan.next() {
            match self.signal.wait_until_idle(self.settings.max_pause).await {
                Pause::NotPaused => {}
                Pause::Resumed => stats.pauses += 1,
                Pause::TimedOut => {
                    stats.pauses += 1;
                    stats.timeouts += 1;
                    warn!(
                        limit_ms = self.settings.max_pause.map(|d| d.as_millis() as u64),
                        "interaction pause limit reached, resuming reveal"
                    );
                }
            }

            region.apply(&step);
            stats.steps += 1;

            if plan.peek().is_some() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        debug!(
            steps = stats.steps,
            pauses = stats.pauses,
            strategy = ?self.settings.strategy,
            "reveal complete"
        );
        stats
    }
}
