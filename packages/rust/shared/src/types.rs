//! Core domain types and collaborator traits.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ItemHandle
// ---------------------------------------------------------------------------

/// Opaque, stable identifier an [`ItemSource`] hands out for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemHandle(pub u64);

impl std::fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// One unit of work for a [`Region`]. Produced in order by a reveal plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// Replace the region's whole visible content.
    Replace(String),
    /// Append a styled segment that fades from invisible to visible over `fade`.
    Append { text: String, fade: Duration },
}

/// A writable UI location associated with one item.
pub trait Region: Send + Sync {
    /// Called once before the first write (e.g. lift a line clamp).
    fn prepare(&self) {}

    /// Apply one reveal step.
    fn apply(&self, step: &RevealStep);

    /// Current visible text.
    fn text(&self) -> String;
}

/// Shared handle to a region.
pub type RegionHandle = Arc<dyn Region>;

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A resolved, annotatable item.
#[derive(Clone)]
pub struct Item {
    pub handle: ItemHandle,
    pub title: String,
    pub url: String,
    /// Where the summary is written. `None` means the item has no renderable slot.
    pub region: Option<RegionHandle>,
}

impl std::fmt::Debug for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Item")
            .field("handle", &self.handle)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("region", &self.region.is_some())
            .finish()
    }
}

/// Supplier of annotatable items. Polled repeatedly while the host content settles.
pub trait ItemSource: Send + Sync {
    /// Handles of every item not yet marked annotated, in document order.
    fn query_unannotated(&self) -> Vec<ItemHandle>;

    /// Resolve a handle. `None` when the item lacks a title or a target URL.
    fn resolve(&self, handle: ItemHandle) -> Option<Item>;

    /// Mark an item annotated. Idempotent; returns `true` only for the first call.
    fn mark_annotated(&self, handle: ItemHandle) -> bool;
}

// ---------------------------------------------------------------------------
// SummaryResult
// ---------------------------------------------------------------------------

/// Markup emphasis markers stripped from generated text.
const EMPHASIS_MARKERS: [&str; 2] = ["**", "##"];

/// A decoded, sanitized summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResult {
    pub text: String,
}

impl SummaryResult {
    /// Build a summary from raw model output, stripping emphasis markers.
    pub fn from_raw(raw: &str) -> Self {
        Self {
            text: sanitize(raw),
        }
    }
}

/// Remove markup emphasis markers (`**`, `##`).
pub fn sanitize(raw: &str) -> String {
    EMPHASIS_MARKERS
        .iter()
        .fold(raw.to_string(), |text, marker| text.replace(marker, ""))
}
