//! Dictionary term mediation.
//!
//! Shields known dictionary terms from an external translation service and
//! restores the dictionary's own translations afterwards.
//!
//! # Architecture
//!
//! - `index`: Immutable per-scope snapshot of all terms, longest first
//! - `cache`: Per-scope cache of indexes with TTL and invalidation
//! - `matcher`: Greedy, whole-word, case-insensitive term detection
//! - `markers`: Wrap matched spans before translation, resolve them after
//! - `metrics`: Cache counters
//!
//! # Example
//!
//! ```rust,ignore
//! use dictionary_mediator::terms::{apply_markers, find_matches, resolve_markers};
//!
//! let index = cache.get(&scope).await?;
//! let matches = find_matches("Say Hello there", &index);
//! let wrapped = apply_markers("Say Hello there", &matches);
//! let translated = translator.translate(&wrapped, Some("en"), "es").await?;
//! let result = resolve_markers(&translated, &matches, "es", &index);
//! ```

mod cache;
mod index;
mod markers;
mod matcher;
mod metrics;

pub use cache::{CacheError, TermCache, DEFAULT_TTL};
pub use index::TermIndex;
pub use markers::{
    apply_markers, marker_for, resolve_markers, resolve_markers_with_report, MarkerResolution,
};
pub use matcher::{find_matches, TermMatch};
pub use metrics::{CacheMetrics, MetricsReport};
