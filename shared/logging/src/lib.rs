mod init;

pub use init::{LogError, Logger, LoggerBuilder};

pub mod prelude {
    pub use slog_scope::crit;
    pub use slog_scope::debug;
    pub use slog_scope::error;
    pub use slog_scope::info;
    pub use slog_scope::trace;
    pub use slog_scope::warn;

    pub use slog::{self, b, o, Drain as SlogDrain, Key, Level as LogLevel, Record, Serializer};

    pub use slog_scope::{self, logger};
}
