//! Structured logging init, mirroring the teacher's `tracing` +
//! `tracing-subscriber` wiring (env-filter layer, no JSON by default).

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub fn init(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    // Tests may init more than once across modules; ignore the error from
    // a second global subscriber installation rather than panicking.
    let _ = subscriber.try_init();
}
