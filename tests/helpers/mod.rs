pub mod grammars;
pub mod tree_assertions;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Route parser logs to stderr when `RUST_LOG` is set, e.g.
/// `RUST_LOG=grove=trace cargo test incremental`
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_test_writer().with_target(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
