//! Shared test utilities for stackrun
//!
//! Region detection and unique, valid namespaces for tests that touch AWS.

use chrono::Utc;
use stackrun_common::Namespace;

/// Get the AWS region for tests.
///
/// Checks environment variables in order:
/// 1. AWS_REGION
/// 2. AWS_DEFAULT_REGION
/// 3. Falls back to us-east-1
pub fn get_test_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| "us-east-1".to_string())
}

/// Generate a unique environment name for test resources.
///
/// Format: `t{timestamp_ms}x{counter}`, valid as a namespace segment.
pub fn test_environment() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let ts = Utc::now().timestamp_millis();
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("t{}x{}", ts, counter)
}

/// Namespace `srtest-{unique}` for integration tests
pub fn test_namespace() -> Namespace {
    Namespace::new("srtest", &test_environment()).expect("test namespace is always valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_format() {
        let env = test_environment();
        assert!(env.starts_with('t'));
        let (ts, counter) = env[1..].split_once('x').unwrap();
        ts.parse::<i64>().expect("Should be valid timestamp");
        counter.parse::<u32>().expect("Should be valid counter");
    }

    #[test]
    fn test_environment_unique() {
        let a = test_environment();
        let b = test_environment();
        assert_ne!(a, b);
    }

    #[test]
    fn test_namespace_is_valid() {
        let ns = test_namespace();
        assert!(ns.prefix().starts_with("srtest-t"));
    }
}
