use std::io;
use std::process::ExitCode;

use blink_monitor::annotate::{JsonLinesAnnotator, LogAnnotator};
use blink_monitor::config::{Config, ReportFormat};
use blink_monitor::logging::{init_tracing, LogConfig};
use blink_monitor::pipeline::{Pipeline, PipelineSettings, RunSummary, StopSignal};
use blink_monitor::source::{CaptureError, ReplaySource};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    if let Err(e) = init_tracing(&LogConfig {
        log_level: config.log_level.clone(),
        enable_file_logs: config.enable_file_logs,
        log_dir: config.log_dir.clone(),
    }) {
        // subscriber 未就绪，只能直接写 stderr
        eprintln!("blink-monitor: {e}");
        return ExitCode::from(2);
    }
    tracing::info!(source = %config.landmark_source, format = %config.report_format, "Starting blink-monitor");

    let settings = match config.pipeline_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::from(2);
        }
    };

    let stop = StopSignal::new();
    let signal_task = tokio::spawn(shutdown_signal(stop.clone()));

    // 流水线是同步阻塞的，放到阻塞线程上运行，信号处理留在运行时中
    let location = config.landmark_source.clone();
    let format = config.report_format;
    let run_stop = stop.clone();
    let joined =
        tokio::task::spawn_blocking(move || run_pipeline(settings, &location, format, &run_stop))
            .await;
    signal_task.abort();

    let summary = match joined {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to open landmark source");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            tracing::error!(error = %e, "Pipeline task panicked");
            return ExitCode::FAILURE;
        }
    };

    if summary.stop_reason.is_failure() {
        ExitCode::FAILURE
    } else {
        tracing::info!("Shutdown complete");
        ExitCode::SUCCESS
    }
}

fn run_pipeline(
    settings: PipelineSettings,
    location: &str,
    format: ReportFormat,
    stop: &StopSignal,
) -> Result<RunSummary, CaptureError> {
    let source = ReplaySource::open(location)?;
    let summary = match format {
        ReportFormat::Log => Pipeline::new(settings, source, LogAnnotator).run(stop),
        ReportFormat::Json => {
            Pipeline::new(settings, source, JsonLinesAnnotator::new(io::stdout().lock())).run(stop)
        }
    };
    Ok(summary)
}

async fn shutdown_signal(stop: StopSignal) {
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler, listening for Ctrl-C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received, stopping at next frame boundary");
    stop.request_stop();
}
