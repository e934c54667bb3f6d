use std::io;
use tracing_subscriber::{fmt, EnvFilter};

// request spans from TraceLayer plus service events; backing store calls stay at info
const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info";
// json 输出给日志采集用，额外打开 content store 的 debug（sha、重试）
const JSON_FILTER: &str = "info,service::content=debug,service::retry=debug";

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Human-readable single-line output on stdout. `RUST_LOG` overrides the filter.
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(filter_or(DEFAULT_FILTER))
        .with_target(false)
        .compact()
        .with_writer(io::stdout)
        .try_init();
}

/// One JSON object per event, carrying the `event`, `user_id` and `path`
/// fields the services attach.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(filter_or(JSON_FILTER))
        .with_target(true)
        .json()
        .with_current_span(true)
        .with_writer(io::stdout)
        .try_init();
}

/// `LOG_FORMAT=json` selects [`init_logging_json`]; anything else is compact.
pub fn init_logging_from_env() {
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => init_logging_json(),
        _ => init_logging_default(),
    }
}
