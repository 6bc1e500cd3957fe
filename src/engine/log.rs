/// severity of an engine log line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// where the controller sends its messages. called from the controller
/// thread and, rarely, from evaluation workers, so it must be thread-safe.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(LogLevel, &str) + Send + Sync,
{
    fn log(&self, level: LogLevel, message: &str) {
        self(level, message)
    }
}

/// default sink: forward to `tracing` under the `islandtrace::engine` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "islandtrace::engine", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "islandtrace::engine", "{message}"),
            LogLevel::Error => tracing::error!(target: "islandtrace::engine", "{message}"),
        }
    }
}
