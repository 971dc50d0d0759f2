//! ABOUTME: Core types, errors, IDs, and tracing utilities
//! ABOUTME: Foundation crate used by all other quill components

pub mod error;
pub mod id;
pub mod telemetry;
pub mod time;

pub use error::{Error, Result};
pub use id::Id;
pub use time::{format_datetime, local_now, parse_datetime, MonotonicTimer};

#[cfg(test)]
mod tests {
    use test_support::dt;

    #[test]
    fn test_cross_crate_usage() {
        let parsed = crate::parse_datetime("2025-01-01 09:00:00").unwrap();
        assert_eq!(parsed, dt("2025-01-01 09:00:00"));
    }
}
