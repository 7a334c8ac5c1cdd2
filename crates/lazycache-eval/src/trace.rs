//! Resolution trace recording.
//!
//! When tracing is enabled via [`LazyBuilder::trace`](crate::LazyBuilder::trace),
//! the factory records a [`TraceEntry`] for every resolution, capturing the
//! node fingerprint and where its value came from.

use std::fmt;

use lazycache_core::Fingerprint;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionKind {
    /// A literal endpoint.
    Endpoint,
    /// A value already held in the node's slot.
    Fetched,
    /// Decoded from the store.
    Loaded,
    /// Computed and written to the store.
    Saved,
    /// Computed without writing to the store.
    Evaluated,
}

impl ResolutionKind {
    /// Short label used in diagnostic output.
    pub fn label(self) -> &'static str {
        match self {
            ResolutionKind::Endpoint => "endp",
            ResolutionKind::Fetched => "fget",
            ResolutionKind::Loaded => "load",
            ResolutionKind::Saved => "save",
            ResolutionKind::Evaluated => "eval",
        }
    }
}

impl fmt::Display for ResolutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single entry in the resolution trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub fingerprint: Fingerprint,
    pub kind: ResolutionKind,
}
