use chrono::{DateTime, Utc};

pub type Id = i64;

/// Vocabulary used when a term or association does not name one
pub const DEFAULT_VOCABULARY: &str = "Tags";

/// Default timestamp for records deserialized from request bodies
pub(crate) fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

pub(crate) fn default_vocabulary_name() -> String {
    DEFAULT_VOCABULARY.to_string()
}

/// Trim a user supplied string, mapping blank input to `None`
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Join an origin and a path without doubling the slash between them
pub fn join_origin(origin: &str, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!("{}{}", origin.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank("  rust "), Some("rust"));
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
    }

    #[test]
    fn test_join_origin() {
        assert_eq!(
            join_origin("https://example.com/", "/vocabulary/1"),
            "https://example.com/vocabulary/1"
        );
        assert_eq!(join_origin("", "/vocabulary/1"), "/vocabulary/1");
        assert_eq!(join_origin("https://example.com", ""), "");
    }
}
