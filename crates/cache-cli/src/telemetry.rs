use cache_config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Args;

/// Installs the global subscriber. The command line level wins over the configured one.
pub(crate) fn init(args: &Args, configured: Option<LogLevel>) {
    let level = args.log_level.or(configured).unwrap_or(LogLevel::Info);
    let env_filter = EnvFilter::new(level.as_filter_str());

    tracing_subscriber::registry()
        .with(args.log_format())
        .with(env_filter)
        .init();
}
