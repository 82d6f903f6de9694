//! Logger initialization.

use log::LevelFilter;

/// Initializes `env_logger` for the CLI binary.
///
/// `RUST_LOG` provides the default configuration; the explicit `level`
/// overrides it for this crate and the root filter.
pub fn init_logger(level: LevelFilter) {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(level);
    // hickory warns about malformed DNS responses it already handles
    builder.filter_module("hickory_proto", LevelFilter::Error);
    builder.filter_module("rustls", LevelFilter::Info);
    builder.filter_module("http_loader", level);

    // try_init() so a second initialization (tests) is a no-op instead of a
    // panic.
    let _ = builder.try_init();
}
