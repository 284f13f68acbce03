mod config;
mod error;
mod logger;
mod object;

pub use config::LoggerConfig;
pub use error::LoggerError;
pub use object::{LoggerFormat, LoggerLevel};

/// Installs the global tracing subscriber described by `cfg`.
///
/// After this call every `tracing` macro in the process (including the render-failure records
/// emitted by `vitals-core`) goes through the configured output.
///
/// # Examples
/// ```rust
/// use vitals_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("failed to initialize logger");
///
/// tracing::info!("logger initialized");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> Result<(), LoggerError> {
    match cfg.format {
        LoggerFormat::Text => logger::logger_text(cfg),
        LoggerFormat::Json => logger::logger_json(cfg),
    }
}
