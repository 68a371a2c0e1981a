use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn";

/// Loads `.env` before arguments are parsed so `TABSPLIT_*` variables reach clap.
pub fn load_env() {
    let _ = dotenvy::dotenv();
}

/// Initialize logging. An explicit directive wins over `RUST_LOG`.
pub fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive).ok(),
        None => EnvFilter::try_from_default_env().ok(),
    }
    .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
