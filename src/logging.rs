use eyre::{
    Context as _,
    Result,
};
use tracing_subscriber::{
    fmt,
    prelude::*,
    EnvFilter,
};

/// Log to stderr so stdout only carries the report. `RUST_LOG` takes precedence over `verbose`.
pub fn log_init(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("{level},hyper_util=warn,reqwest=warn"))
            .context("Failed to build log filter")?,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_filter(filter))
        .with(tracing_error::ErrorLayer::default())
        .try_init()
        .context("Failed to initialize tracing subscriber")
}
