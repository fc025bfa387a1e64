use thiserror::Error;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::constants::SERVICE_NAME;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_file_logs: false,
            log_dir: "./logs".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to create rolling file appender in {dir}: {source}")]
    FileAppender {
        dir: String,
        #[source]
        source: InitError,
    },
    #[error("failed to initialize tracing: {0}")]
    Subscriber(#[from] TryInitError),
}

/// 日志统一写 stderr，stdout 留给 JSON Lines 帧报告
///
/// 全局 subscriber 已设置（如测试环境）时视为成功。
pub fn init_tracing(config: &LogConfig) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false);

    let registry = Registry::default().with(env_filter).with(stderr_layer);

    let result = if config.enable_file_logs {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(SERVICE_NAME)
            .filename_suffix("log")
            .max_log_files(30)
            .build(&config.log_dir)
            .map_err(|source| LoggingError::FileAppender {
                dir: config.log_dir.clone(),
                source,
            })?;
        let file_layer = fmt::layer()
            .with_writer(file_appender)
            .with_ansi(false)
            .json();
        registry.with(file_layer).try_init()
    } else {
        registry.try_init()
    };

    match result {
        Err(e) if !e.to_string().contains("already been set") => Err(e.into()),
        _ => Ok(()),
    }
}
