//! Input validation for memories.
//!
//! The store itself accepts any text; these checks run in front of it, in the
//! presentation layer (HTTP handlers), before `NoteStore::add` is called.

use crate::error::{MemoryError, MemoryResult};

pub const MAX_MEMORY_TEXT_LENGTH: usize = 100_000;
pub const MAX_SEARCH_QUERY_LENGTH: usize = 500;
pub const MAX_MEMORY_ID_LENGTH: usize = 128;

/// Validate text submitted for a new memory.
///
/// Whitespace-only text is rejected, matching the "Please enter a memory!"
/// check of the add form.
pub fn validate_memory_text(text: &str) -> MemoryResult<()> {
    if text.trim().is_empty() {
        return Err(MemoryError::validation("text", "Please enter a memory"));
    }
    if text.len() > MAX_MEMORY_TEXT_LENGTH {
        return Err(MemoryError::validation(
            "text",
            format!("must be at most {} bytes", MAX_MEMORY_TEXT_LENGTH),
        ));
    }
    Ok(())
}

/// Validate a caller-supplied memory id.
pub fn validate_memory_id(id: &str) -> MemoryResult<()> {
    if id.is_empty() {
        return Err(MemoryError::validation("id", "must not be empty"));
    }
    if id.len() > MAX_MEMORY_ID_LENGTH {
        return Err(MemoryError::validation(
            "id",
            format!("must be at most {} characters", MAX_MEMORY_ID_LENGTH),
        ));
    }
    if id.chars().any(|c| c.is_control()) {
        return Err(MemoryError::validation("id", "must not contain control characters"));
    }
    Ok(())
}

/// Validate a search query (empty is valid and matches everything).
pub fn validate_search_query(query: &str) -> MemoryResult<()> {
    if query.len() > MAX_SEARCH_QUERY_LENGTH {
        return Err(MemoryError::validation(
            "search",
            format!("must be at most {} characters", MAX_SEARCH_QUERY_LENGTH),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_memory_text_valid() {
        assert!(validate_memory_text("buy milk").is_ok());
        assert!(validate_memory_text("  padded  ").is_ok());
    }

    #[test]
    fn test_validate_memory_text_empty() {
        assert!(validate_memory_text("").is_err());
        assert!(validate_memory_text("   \n\t").is_err());
    }

    #[test]
    fn test_validate_memory_text_too_long() {
        let text = "a".repeat(MAX_MEMORY_TEXT_LENGTH + 1);
        assert!(validate_memory_text(&text).is_err());
    }

    #[test]
    fn test_validate_memory_id() {
        assert!(validate_memory_id("1700000000000").is_ok());
        assert!(validate_memory_id("custom-id").is_ok());
        assert!(validate_memory_id("").is_err());
        assert!(validate_memory_id("bad\nid").is_err());
        assert!(validate_memory_id(&"x".repeat(MAX_MEMORY_ID_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_validate_search_query() {
        assert!(validate_search_query("").is_ok());
        assert!(validate_search_query("milk").is_ok());
        assert!(validate_search_query(&"q".repeat(MAX_SEARCH_QUERY_LENGTH + 1)).is_err());
    }
}
