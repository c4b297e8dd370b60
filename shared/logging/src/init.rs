use slog::{Drain, Level};
use slog_scope::GlobalLoggerGuard;

pub struct LoggerBuilder {
    level: Level,
}

pub struct Logger(Level, GlobalLoggerGuard);

#[derive(Debug)]
pub enum LogError {
    BadLevel(String),
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: Level::Info,
        }
    }
}

impl LoggerBuilder {
    /// Reads `TV_LOG` (e.g. `TV_LOG=debug`) for the initial log level.
    pub fn with_env() -> Result<Self, LogError> {
        let mut builder = Self::default();

        if let Ok(env) = std::env::var("TV_LOG") {
            let level = env.parse().map_err(|_| LogError::BadLevel(env.clone()))?;
            builder = builder.level(level);
        }

        Ok(builder)
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[cfg(feature = "binary")]
    pub fn init(self) -> Result<Logger, LogError> {
        let decorator = slog_term::TermDecorator::new().stdout().build();
        let drain = slog_term::CompactFormat::new(decorator).build().fuse();
        let drain = drain.filter_level(self.level).fuse();
        let drain = slog_async::Async::new(drain)
            .thread_name("logging".to_owned())
            .chan_size(1024)
            .build_no_guard()
            .fuse();
        let logger = slog::Logger::root(drain, slog::o!());

        let guard = slog_scope::set_global_logger(logger);
        Ok(Logger(self.level, guard))
    }

    #[cfg(not(feature = "binary"))]
    pub fn init(self) -> Result<Logger, LogError> {
        let drain = slog::Discard;
        let logger = slog::Logger::root(drain, slog::o!());
        let guard = slog_scope::set_global_logger(logger);
        Ok(Logger(self.level, guard))
    }
}

impl Logger {
    pub fn level(&self) -> Level {
        self.0
    }
}
