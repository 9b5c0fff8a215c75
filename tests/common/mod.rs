#![allow(dead_code)]

pub mod mocks;

/// Route engine tracing into the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
