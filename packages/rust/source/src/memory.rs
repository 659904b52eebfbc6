//! In-memory item source and region.
//!
//! [`MemorySource`] keeps items in document order and owns the annotated
//! marker set. [`MemoryRegion`] records every write so callers can render
//! or inspect the final state.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;

use glimpse_shared::{Item, ItemHandle, ItemSource, Region, RegionHandle, RevealStep};

// ---------------------------------------------------------------------------
// MemoryRegion
// ---------------------------------------------------------------------------

/// A faded-in segment appended by the chunk strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub fade: Duration,
}

#[derive(Debug, Default)]
struct RegionState {
    content: String,
    segments: Vec<Segment>,
    writes: usize,
    prepared: bool,
}

/// Region that keeps its content in memory.
#[derive(Debug, Default)]
pub struct MemoryRegion {
    state: Mutex<RegionState>,
}

impl MemoryRegion {
    /// Region seeded with existing content (e.g. the original snippet).
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(RegionState {
                content: initial.into(),
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegionState> {
        // State is plain data; a panicked writer leaves it readable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of reveal steps applied so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Whether [`Region::prepare`] has run.
    pub fn is_prepared(&self) -> bool {
        self.lock().prepared
    }

    /// Segments appended since the last replace.
    pub fn segments(&self) -> Vec<Segment> {
        self.lock().segments.clone()
    }
}

impl Region for MemoryRegion {
    fn prepare(&self) {
        self.lock().prepared = true;
    }

    fn apply(&self, step: &RevealStep) {
        let mut state = self.lock();
        state.writes += 1;
        match step {
            RevealStep::Replace(text) => {
                state.content.clone_from(text);
                state.segments.clear();
            }
            RevealStep::Append { text, fade } => state.segments.push(Segment {
                text: text.clone(),
                fade: *fade,
            }),
        }
    }

    fn text(&self) -> String {
        let state = self.lock();
        let mut text = state.content.clone();
        for segment in &state.segments {
            text.push_str(&segment.text);
        }
        text
    }
}

// ---------------------------------------------------------------------------
// MemorySource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Entry {
    handle: ItemHandle,
    title: Option<String>,
    url: Option<String>,
    region: Option<Arc<MemoryRegion>>,
}

#[derive(Debug, Default)]
struct SourceState {
    entries: Vec<Entry>,
    annotated: HashSet<ItemHandle>,
    next_handle: u64,
}

/// Point-in-time view of one entry, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct EntrySnapshot {
    pub handle: ItemHandle,
    pub title: Option<String>,
    pub url: Option<String>,
    pub annotated: bool,
    /// Final region text, `None` when the entry has no region.
    pub text: Option<String>,
}

/// Item source backed by an in-memory list.
///
/// Entries may be pushed while a pipeline is polling it, which models a host
/// page that keeps loading results.
#[derive(Debug, Default)]
pub struct MemorySource {
    state: Mutex<SourceState>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an entry. Missing title or URL makes it unresolvable.
    pub fn push(
        &self,
        title: Option<String>,
        url: Option<String>,
        region: Option<Arc<MemoryRegion>>,
    ) -> ItemHandle {
        let mut state = self.lock();
        let handle = ItemHandle(state.next_handle);
        state.next_handle += 1;
        state.entries.push(Entry {
            handle,
            title,
            url,
            region,
        });
        handle
    }

    /// Convenience for a fully resolvable entry with a fresh empty region.
    pub fn push_item(&self, title: &str, url: &str) -> (ItemHandle, Arc<MemoryRegion>) {
        let region = Arc::new(MemoryRegion::default());
        let handle = self.push(Some(title.into()), Some(url.into()), Some(region.clone()));
        (handle, region)
    }

    /// The in-memory region of an entry.
    pub fn region(&self, handle: ItemHandle) -> Option<Arc<MemoryRegion>> {
        self.lock()
            .entries
            .iter()
            .find(|e| e.handle == handle)
            .and_then(|e| e.region.clone())
    }

    pub fn is_annotated(&self, handle: ItemHandle) -> bool {
        self.lock().annotated.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every entry in document order.
    pub fn snapshot(&self) -> Vec<EntrySnapshot> {
        let state = self.lock();
        state
            .entries
            .iter()
            .map(|e| EntrySnapshot {
                handle: e.handle,
                title: e.title.clone(),
                url: e.url.clone(),
                annotated: state.annotated.contains(&e.handle),
                text: e.region.as_ref().map(|r| r.text()),
            })
            .collect()
    }
}

impl ItemSource for MemorySource {
    fn query_unannotated(&self) -> Vec<ItemHandle> {
        let state = self.lock();
        state
            .entries
            .iter()
            .filter(|e| !state.annotated.contains(&e.handle))
            .map(|e| e.handle)
            .collect()
    }

    fn resolve(&self, handle: ItemHandle) -> Option<Item> {
        let state = self.lock();
        let entry = state.entries.iter().find(|e| e.handle == handle)?;
        let title = entry.title.clone().filter(|t| !t.is_empty())?;
        let url = entry.url.clone().filter(|u| !u.is_empty())?;
        Some(Item {
            handle,
            title,
            url,
            region: entry.region.clone().map(|r| r as RegionHandle),
        })
    }

    fn mark_annotated(&self, handle: ItemHandle) -> bool {
        self.lock().annotated.insert(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_replace_then_append() {
        let region = MemoryRegion::new("snippet");
        assert_eq!(region.text(), "snippet");

        region.apply(&RevealStep::Replace("✦ ".into()));
        region.apply(&RevealStep::Append {
            text: "hello ".into(),
            fade: Duration::from_millis(1000),
        });
        region.apply(&RevealStep::Append {
            text: "world".into(),
            fade: Duration::from_millis(1000),
        });

        assert_eq!(region.text(), "✦ hello world");
        assert_eq!(region.writes(), 3);
        assert_eq!(region.segments().len(), 2);

        region.apply(&RevealStep::Replace("reset".into()));
        assert_eq!(region.text(), "reset");
        assert!(region.segments().is_empty());
    }

    #[test]
    fn region_prepare_flag() {
        let region = MemoryRegion::default();
        assert!(!region.is_prepared());
        region.prepare();
        assert!(region.is_prepared());
        assert_eq!(region.writes(), 0);
    }

    #[test]
    fn query_skips_annotated() {
        let source = MemorySource::new();
        let (a, _) = source.push_item("A", "https://a.example");
        let (b, _) = source.push_item("B", "https://b.example");

        assert_eq!(source.query_unannotated(), vec![a, b]);
        assert!(source.mark_annotated(a));
        assert_eq!(source.query_unannotated(), vec![b]);
    }

    #[test]
    fn mark_annotated_is_idempotent() {
        let source = MemorySource::new();
        let (a, _) = source.push_item("A", "https://a.example");
        assert!(source.mark_annotated(a));
        assert!(!source.mark_annotated(a));
        assert!(source.is_annotated(a));
    }

    #[test]
    fn resolve_requires_title_and_url() {
        let source = MemorySource::new();
        let no_title = source.push(None, Some("https://x.example".into()), None);
        let no_url = source.push(Some("X".into()), None, None);
        let empty_url = source.push(Some("X".into()), Some(String::new()), None);
        let ok = source.push(Some("X".into()), Some("https://x.example".into()), None);

        assert!(source.resolve(no_title).is_none());
        assert!(source.resolve(no_url).is_none());
        assert!(source.resolve(empty_url).is_none());

        let item = source.resolve(ok).expect("resolvable");
        assert_eq!(item.title, "X");
        assert!(item.region.is_none());
    }

    #[test]
    fn snapshot_reports_region_text() {
        let source = MemorySource::new();
        let (a, region) = source.push_item("A", "https://a.example");
        region.apply(&RevealStep::Replace("done".into()));
        source.mark_annotated(a);

        let snap = source.snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].annotated);
        assert_eq!(snap[0].text.as_deref(), Some("done"));

        let json = serde_json::to_string(&snap).expect("serialize");
        assert!(json.contains(r#""handle":0"#));
    }
}
