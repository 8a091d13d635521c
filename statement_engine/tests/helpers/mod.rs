pub mod env;
pub mod scripted;

#[allow(unused_imports)]
pub use env::{get_test_dsn, should_run_e2e_tests};
#[allow(unused_imports)]
pub use scripted::{init_logging, shared, text_rows};
