// src/logging.rs
// =============================================================================
// Logger setup.
//
// We log through the `log` facade and let env_logger print it. RUST_LOG is
// read first, then the --log-level flag wins. Chatty dependencies are capped
// so that a debug run still shows our own messages.
// =============================================================================

use log::LevelFilter;

pub fn init(level: LevelFilter) {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("html5ever", LevelFilter::Error);
    builder.filter_module("selectors", LevelFilter::Warn);
    builder.filter_module("sqlx", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Info);
    builder.filter_module("reqwest", LevelFilter::Info);
    builder.filter_module("link_crawler", level);

    // try_init: a second call (e.g. from tests) must not panic
    if let Err(e) = builder.try_init() {
        eprintln!("Warning: logger already initialized: {}", e);
    }
}
