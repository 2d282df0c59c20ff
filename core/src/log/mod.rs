//! Logger bootstrap backed by `log4rs`.
//!
//! Member crates log through the `log` facade macros re-exported at the crate root.

use self::{
    appender::AppenderSpec,
    consts::{CONSOLE_APPENDER, DEFAULT_LOGGER_ENV, ERR_LOG_FILE_APPENDER, ERR_LOG_FILE_NAME, LOG_FILE_APPENDER, LOG_FILE_NAME},
};
use log::LevelFilter;
use log4rs::config::{Config, Root};
use thiserror::Error;

mod appender;
pub mod consts;
mod logger;

#[derive(Clone, Debug, Error)]
pub enum LogError {
    #[error("Logger spec parsing error: {0}")]
    ParseLoggerSpecError(String),

    #[error("log directory {0} is not a valid UTF-8 path")]
    InvalidLogDir(String),

    #[error("cannot build log appender: {0}")]
    Appender(String),

    #[error("invalid logger configuration: {0}")]
    Config(String),

    #[error("a global logger is already installed")]
    AlreadyInitialized,
}

pub type LogResult<T> = std::result::Result<T, LogError>;

fn build_config(log_dir: Option<&str>, filters: &str) -> LogResult<Config> {
    let loggers = logger::Builder::new().root_level(LevelFilter::Info).parse_env(DEFAULT_LOGGER_ENV).parse_expression(filters).build();

    let mut appenders = vec![AppenderSpec::console(CONSOLE_APPENDER, None)];
    if let Some(log_dir) = log_dir {
        appenders.push(AppenderSpec::roller(LOG_FILE_APPENDER, None, log_dir, LOG_FILE_NAME)?);
        appenders.push(AppenderSpec::roller(ERR_LOG_FILE_APPENDER, Some(LevelFilter::Warn), log_dir, ERR_LOG_FILE_NAME)?);
    }
    let names = appenders.iter().map(|x| x.name).collect::<Vec<_>>();

    Config::builder()
        .appenders(appenders.into_iter().map(|x| x.appender()))
        .loggers(loggers.items())
        .build(Root::builder().appenders(names).build(loggers.root_level()))
        .map_err(|err| LogError::Config(err.to_string()))
}

/// Installs the global logger.
///
/// `filters` follows the `RUST_LOG` syntax (`info,tangle_tipselect=debug`) and is merged
/// on top of the `RUST_LOG` environment variable. When `log_dir` is provided, all records
/// are also written to a rolling log file and warnings to a separate error log file.
pub fn init_logger(log_dir: Option<&str>, filters: &str) -> LogResult<()> {
    let config = build_config(log_dir, filters)?;
    log4rs::init_config(config).map_err(|_| LogError::AlreadyInitialized)?;
    Ok(())
}

/// Tries to init the global logger, but does not panic if it was already setup.
/// Should be used for tests.
pub fn try_init_logger(filters: &str) {
    let _ = init_logger(None, filters);
}
