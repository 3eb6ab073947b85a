use tracing_subscriber::EnvFilter;

/// Environment variable holding `EnvFilter` directives, e.g. `ghi=trace`.
pub const LOG_ENV: &str = "GHI_LOG";

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "ghi=debug,warn"
    } else {
        "warn"
    }
}

fn build_filter(directives: Option<String>, verbose: bool) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default_directives(verbose)))
}

/// Install the global subscriber. Logs go to stderr so table and JSON
/// output on stdout stay clean. Calling twice is harmless.
pub fn init(verbose: bool) {
    let filter = build_filter(std::env::var(LOG_ENV).ok(), verbose);
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
