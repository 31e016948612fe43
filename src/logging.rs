use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Always appended, whatever RUST_LOG says.
const NOISY_CRATE_FILTERS: &str = ",hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

/// Filter directives for the given verbosity and optional RUST_LOG value.
fn filter_directives(verbose: bool, rust_log: Option<&str>) -> String {
    let base = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => directives.to_string(),
        None if verbose => "info".to_string(),
        None => "warn".to_string(),
    };
    format!("{}{}", base, NOISY_CRATE_FILTERS)
}

/// Install the stderr subscriber. Tables and summaries stay on stdout.
pub fn init(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();
    let directives = filter_directives(verbose, rust_log.as_deref());
    let env_filter = EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbose, None)));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}
