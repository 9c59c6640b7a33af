//! Structured logging bootstrap, shared by the `smartacus` binary and by
//! integration tests that want readable output. Components log cycle,
//! stage, and batch boundaries at `info!`; per-item recoverable failures
//! (`DataNotFound`, `TransformError`) at `warn!`; and batch/stage failures
//! at `error!`, always with structured fields rather than interpolated
//! strings.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
