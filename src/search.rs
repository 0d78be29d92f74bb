//! Search over the memory collection.
//!
//! Display-only filtering: results borrow from the collection and never
//! mutate the store.

use crate::models::MemoryRecord;

/// True if `text` contains `query`, ignoring case. An empty query matches.
pub fn matches_query(text: &str, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    text.to_lowercase().contains(&query.to_lowercase())
}

/// Memories whose text contains `query` (case-insensitive), in collection
/// order.
pub fn filter_memories<'a>(memories: &'a [MemoryRecord], query: &str) -> Vec<&'a MemoryRecord> {
    memories
        .iter()
        .filter(|memory| matches_query(&memory.text, query))
        .collect()
}
