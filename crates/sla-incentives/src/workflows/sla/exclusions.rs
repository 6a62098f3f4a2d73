use super::domain::{ExclusionStream, Identified};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Operator-curated identifiers removed from scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExclusionSet {
    ids: BTreeSet<String>,
}

impl ExclusionSet {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(|id| Into::<String>::into(id).trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    /// Returns `false` when the identifier was already excluded.
    pub fn insert(&mut self, id: &str) -> bool {
        let id = id.trim();
        !id.is_empty() && self.ids.insert(id.to_string())
    }

    /// Returns `false` when the identifier was never excluded.
    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id.trim())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id.trim())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Exclusion lists for one site, read once at the start of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    #[serde(default)]
    pub orders: ExclusionSet,
    #[serde(default)]
    pub receipts: ExclusionSet,
}

impl Exclusions {
    pub fn for_stream(&self, stream: ExclusionStream) -> &ExclusionSet {
        match stream {
            ExclusionStream::Orders => &self.orders,
            ExclusionStream::Receipts => &self.receipts,
        }
    }

    pub fn for_stream_mut(&mut self, stream: ExclusionStream) -> &mut ExclusionSet {
        match stream {
            ExclusionStream::Orders => &mut self.orders,
            ExclusionStream::Receipts => &mut self.receipts,
        }
    }
}

/// Partition of a stream into what continues to aggregation and what an
/// exclusion removed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterResult<T> {
    pub kept: Vec<T>,
    pub removed: Vec<T>,
}

/// Set difference by identifier. Order of the kept events is preserved.
pub fn filter_excluded<T: Identified>(events: Vec<T>, excluded: &ExclusionSet) -> FilterResult<T> {
    if excluded.is_empty() {
        return FilterResult {
            kept: events,
            removed: Vec::new(),
        };
    }

    let (removed, kept) = events
        .into_iter()
        .partition(|event| excluded.contains(event.identifier()));
    FilterResult { kept, removed }
}
