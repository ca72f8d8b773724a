use std::sync::Arc;

use blink_monitor::clock::ManualClock;
use blink_monitor::config::Config;
use blink_monitor::error::ConfigError;
use blink_monitor::fatigue::{FatigueAlertEngine, LogNotifier};
use blink_monitor::logging::init_tracing;
use blink_monitor::pipeline::FrameProcessor;
use blink_monitor::session::{SessionAggregator, SessionData};
use blink_monitor::vision::LandmarkResult;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// One line of a landmark recording.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FrameRecord {
    timestamp_ms: i64,
    width: f64,
    height: f64,
    #[serde(default)]
    landmarks: LandmarkResult,
}

#[derive(Debug, Error)]
enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frame at line {line}: {source}")]
    Parse {
        line: usize,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();
    init_tracing(&config.log_config());
    tracing::info!("Starting blink-monitor replay");

    let path = std::env::args().nth(1).or_else(|| config.replay_path.clone());

    let result = match &path {
        Some(path) => match tokio::fs::File::open(path).await {
            Ok(file) => replay(&config, BufReader::new(file)).await,
            Err(e) => Err(ReplayError::Io(e)),
        },
        None => replay(&config, BufReader::new(tokio::io::stdin())).await,
    };

    match result {
        Ok(sessions) => match serde_json::to_string_pretty(&sessions) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize sessions");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(error = %e, path = ?path, "Replay failed");
            std::process::exit(1);
        }
    }
}

/// Feeds every frame through the pipeline. Rate samples and fatigue checks are
/// ticked from frame time, so a recording replays deterministically.
async fn replay<R>(config: &Config, reader: R) -> Result<Vec<SessionData>, ReplayError>
where
    R: AsyncBufRead + Unpin,
{
    let detector_config = config.detector_config()?;
    let fatigue_config = config.fatigue_config()?;
    let session_config = config.session_config()?;

    let clock = ManualClock::new(0);
    let mut engine =
        FatigueAlertEngine::new(fatigue_config, Arc::new(clock.clone()), Arc::new(LogNotifier))?;
    let mut processor = FrameProcessor::new(detector_config);
    let mut aggregator = SessionAggregator::new(session_config);
    aggregator.start_tracking(None);

    let eval_interval = engine.config().evaluation_interval_ms;
    let mut next_eval: Option<i64> = None;
    let mut next_rate: Option<i64> = None;
    let mut finished = Vec::new();
    let mut last_ts = 0;
    let mut frames = 0usize;

    let mut lines = reader.lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => {
                tracing::warn!(frames, "Interrupted, finalizing current session");
                break;
            }
        };
        let Some(line) = line else { break };
        frames += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record: FrameRecord = serde_json::from_str(&line).map_err(|source| {
            ReplayError::Parse {
                line: frames,
                source,
            }
        })?;
        let now = record.timestamp_ms;
        clock.set(now);
        last_ts = now;

        let outcome = processor.process(&record.landmarks, record.width, record.height, now);
        if let Some(ended) = aggregator.on_frame(&outcome, now) {
            finished.push(ended);
            engine.reset();
            next_eval = None;
            next_rate = None;
        }

        let Some(start) = aggregator.session().map(|s| s.start_time) else {
            continue;
        };

        let rate_due = next_rate.get_or_insert(start + session_config.rate_bucket_ms);
        while now >= *rate_due {
            aggregator.record_rate_sample(*rate_due);
            *rate_due += session_config.rate_bucket_ms;
        }

        // 首次评估在会话开始时立即进行，之后按固定间隔
        let eval_due = next_eval.get_or_insert(start);
        if now >= *eval_due {
            let session = aggregator.active_session();
            if engine.check_for_fatigue(session.as_ref()) {
                aggregator.record_fatigue_alert();
            }
            while now >= *eval_due {
                *eval_due += eval_interval;
            }
        }
    }

    if let Some(session) = aggregator.stop_tracking(last_ts) {
        finished.push(session);
    }
    processor.dispose();

    tracing::info!(frames, sessions = finished.len(), "Replay complete");
    Ok(finished)
}

async fn shutdown_signal() {
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
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
}
