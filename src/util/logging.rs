//! Logging setup and target names.
//!
//! Lifecycle logs use one of the targets below so a compositor can filter
//! them with `RUST_LOG`, e.g. `RUST_LOG=dnd=debug`.

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Standardized log targets
pub const DATA_DEVICE: &str = "data_device";
pub const DND: &str = "dnd";
pub const SELECTION: &str = "selection";
pub const WAYLAND: &str = "wayland";

const DEFAULT_FILTER: &str = "info,seat_data=debug";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Install the global subscriber.
///
/// Uses `RUST_LOG` when set, otherwise `info,seat_data=debug`. Fails if a
/// global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

/// Subscriber for unit tests. Safe to call from every test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("trace"))
        .with_test_writer()
        .try_init();
}
