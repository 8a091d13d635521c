//! Helper functions for reading environment variables in tests

use statement_engine::test_helpers::load_dotenv;

/// Get the ODBC_TEST_DSN connection string from environment
/// Returns None if not set (tests should be skipped in this case)
pub fn get_test_dsn() -> Option<String> {
    load_dotenv();
    std::env::var("ODBC_TEST_DSN")
        .ok()
        .filter(|s| !s.is_empty())
}

/// E2E tests run only when ENABLE_E2E_TESTS is truthy and a DSN is set.
pub fn should_run_e2e_tests() -> bool {
    load_dotenv();
    let enabled = std::env::var("ENABLE_E2E_TESTS")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    enabled && get_test_dsn().is_some()
}
