//! Structured logging bootstrap using `tracing`.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVES: &str = "info,tower_http=info,linfa_logistic=warn";

/// Install a global tracing subscriber.
///
/// `RUST_LOG` overrides the default directives. Setting `LOG_COMPACT=1` drops
/// file and line information, which keeps `serve` output readable.
pub fn init_tracing() -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(DEFAULT_DIRECTIVES))?;
    let compact = std::env::var("LOG_COMPACT").is_ok_and(|v| v == "1" || v == "true");

    // stdout carries command output such as `predict` JSON
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_level(true)
        .with_line_number(!compact)
        .with_file(!compact)
        .with_thread_ids(false)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(fmt_layer).try_init()?;

    tracing::debug!(compact, "tracing initialised");
    Ok(())
}
