use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, time::OffsetTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Initialize the logging system with daily log files under `logs_dir`
///
/// The returned guard flushes the file writer when dropped; hold it for the
/// life of the process.
pub fn init_logging(
    logs_dir: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("impersonation")
        .filename_suffix("log")
        .build(logs_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let timer = OffsetTime::local_rfc_3339().unwrap_or_else(|_| {
        // Local offset is unavailable in some multi-threaded environments
        OffsetTime::new(
            time::UtcOffset::UTC,
            time::format_description::well_known::Rfc3339,
        )
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_timer(timer.clone())
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(fmt::layer().with_timer(timer).with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Logging system initialized");
    tracing::info!("Log files are being written to: {:?}", logs_dir);

    Ok(guard)
}

/// Log application shutdown
pub fn log_shutdown() {
    tracing::info!("Impersonation server shutting down");
}
