use tracing_subscriber::EnvFilter;

use crate::config::NobusConfig;

/// Install a stderr subscriber for nobus events at `level`.
///
/// `RUST_LOG` wins when set. Returns false if a global subscriber was
/// already installed, which leaves that one in place.
pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Same as [`init`], using the `[ui] log_level` of `config`.
pub fn init_from_config(config: &NobusConfig) -> bool {
    init(&config.ui.log_level)
}

fn directive(level: &str) -> String {
    match level.trim().to_ascii_lowercase().as_str() {
        lvl @ ("error" | "warn" | "info" | "debug" | "trace" | "off") => format!("nobus={lvl}"),
        _ => "nobus=info".to_string(),
    }
}
