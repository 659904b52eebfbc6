//! Item sources for Glimpse.
//!
//! This crate provides:
//! - [`MemorySource`] / [`MemoryRegion`]: in-memory item source and writable regions
//! - [`extract_page`]: builds a source from a saved search result page

pub mod html;
pub mod memory;

pub use html::{PageSelectors, extract_page};
pub use memory::{EntrySnapshot, MemoryRegion, MemorySource, Segment};
