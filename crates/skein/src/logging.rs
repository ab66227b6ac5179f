//! Tracing setup: human-readable console output plus a daily-rolling JSON file.

use skein_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_ENV: &str = "SKEIN_LOG";

const VERBOSE_FILTER: &str = "skein=debug,skein_config=debug,skein_llm=debug,skein_memory=debug,\
                              skein_skills=debug,skein_workflow=debug,info";

const FILE_FILTER: &str = "skein=trace,skein_config=trace,skein_llm=trace,skein_memory=trace,\
                           skein_skills=trace,skein_workflow=trace,info";

/// Console filter: `--verbose`, then `SKEIN_LOG`, then `[logging] level`.
fn console_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new(VERBOSE_FILTER);
    }
    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.is_empty() => EnvFilter::new(directive),
        _ => EnvFilter::new(&config.level),
    }
}

/// Install the global subscriber. The returned guard must outlive all logging.
///
/// Console output goes to stderr so `--json` output on stdout stays parseable.
/// If the log directory cannot be created, file logging is skipped.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<WorkerGuard> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(config, verbose));

    let appender = config.log_dir().and_then(|dir| {
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.file_name)
            .build(&dir)
            .inspect_err(|e| eprintln!("warning: file logging disabled ({}): {}", dir.display(), e))
            .ok()
    });

    let (file, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new(FILE_FILTER));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}
