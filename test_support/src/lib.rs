//! ABOUTME: Shared testing utilities and helper functions
//! ABOUTME: Common test fixtures for all crates

use chrono::NaiveDateTime;

/// Parse a `YYYY-MM-DD HH:MM:SS` literal, panicking on typos in the test itself
pub fn dt(value: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .unwrap_or_else(|e| panic!("bad test datetime '{}': {}", value, e))
}

/// Unique SQLite file path for a single test
pub fn temp_db_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("quill-test-{}.db", ulid::Ulid::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dt_parses() {
        assert_eq!(dt("2025-01-01 09:00:00").to_string(), "2025-01-01 09:00:00");
    }

    #[test]
    fn test_temp_db_paths_differ() {
        assert_ne!(temp_db_path(), temp_db_path());
    }
}
