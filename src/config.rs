use std::env;
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CONSECUTIVE_FRAMES, DEFAULT_DEBOUNCE_MS, DEFAULT_EAR_THRESHOLD, MILLIS_PER_SECOND,
};
use crate::error::ConfigError;
use crate::fatigue::FatigueConfig;
use crate::logging::LogConfig;
use crate::session::SessionAggregatorConfig;
use crate::vision::BlinkDetectorConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub replay_path: Option<String>,
    pub detector: DetectorEnvConfig,
    pub fatigue: FatigueEnvConfig,
    pub session: SessionEnvConfig,
}

#[derive(Debug, Clone)]
pub struct DetectorEnvConfig {
    pub ear_threshold: f64,
    pub consecutive_frames: u32,
    pub debounce_ms: f64,
}

#[derive(Debug, Clone)]
pub struct FatigueEnvConfig {
    pub threshold: f64,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    pub grace_period_secs: i64,
    pub window_secs: i64,
    pub face_lost_tolerance_secs: i64,
    pub cooldown_secs: i64,
    pub sustain_secs: i64,
    pub eval_interval_secs: i64,
}

#[derive(Debug, Clone)]
pub struct SessionEnvConfig {
    pub face_lost_timeout_secs: i64,
    pub rate_bucket_secs: i64,
}

impl Config {
    pub fn from_env() -> Self {
        let fatigue_defaults = FatigueConfig::default();
        let session_defaults = SessionAggregatorConfig::default();

        Self {
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            replay_path: env::var("REPLAY_PATH").ok().filter(|p| !p.trim().is_empty()),
            detector: DetectorEnvConfig {
                ear_threshold: env_or_parse("EAR_THRESHOLD", DEFAULT_EAR_THRESHOLD),
                consecutive_frames: env_or_parse(
                    "BLINK_CONSECUTIVE_FRAMES",
                    DEFAULT_CONSECUTIVE_FRAMES,
                ),
                debounce_ms: env_or_parse("BLINK_DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            },
            fatigue: FatigueEnvConfig {
                threshold: env_or_parse("FATIGUE_THRESHOLD", fatigue_defaults.fatigue_threshold),
                notifications_enabled: env_or_bool(
                    "FATIGUE_NOTIFICATIONS_ENABLED",
                    fatigue_defaults.notifications_enabled,
                ),
                sound_enabled: env_or_bool("FATIGUE_SOUND_ENABLED", fatigue_defaults.sound_enabled),
                grace_period_secs: env_or_parse(
                    "FATIGUE_GRACE_PERIOD_SECS",
                    fatigue_defaults.grace_period_ms / MILLIS_PER_SECOND,
                ),
                window_secs: env_or_parse(
                    "FATIGUE_WINDOW_SECS",
                    fatigue_defaults.window_ms / MILLIS_PER_SECOND,
                ),
                face_lost_tolerance_secs: env_or_parse(
                    "FATIGUE_FACE_LOST_TOLERANCE_SECS",
                    fatigue_defaults.face_lost_tolerance_ms / MILLIS_PER_SECOND,
                ),
                cooldown_secs: env_or_parse(
                    "FATIGUE_COOLDOWN_SECS",
                    fatigue_defaults.cooldown_ms / MILLIS_PER_SECOND,
                ),
                sustain_secs: env_or_parse(
                    "FATIGUE_SUSTAIN_SECS",
                    fatigue_defaults.sustain_ms / MILLIS_PER_SECOND,
                ),
                eval_interval_secs: env_or_parse(
                    "FATIGUE_EVAL_INTERVAL_SECS",
                    fatigue_defaults.evaluation_interval_ms / MILLIS_PER_SECOND,
                ),
            },
            session: SessionEnvConfig {
                face_lost_timeout_secs: env_or_parse(
                    "SESSION_FACE_LOST_TIMEOUT_SECS",
                    session_defaults.face_lost_timeout_ms / MILLIS_PER_SECOND,
                ),
                rate_bucket_secs: env_or_parse(
                    "SESSION_RATE_BUCKET_SECS",
                    session_defaults.rate_bucket_ms / MILLIS_PER_SECOND,
                ),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }

    pub fn detector_config(&self) -> Result<BlinkDetectorConfig, ConfigError> {
        BlinkDetectorConfig::new(
            self.detector.ear_threshold,
            self.detector.consecutive_frames,
            self.detector.debounce_ms,
        )
    }

    pub fn fatigue_config(&self) -> Result<FatigueConfig, ConfigError> {
        let f = &self.fatigue;
        let cfg = FatigueConfig {
            fatigue_threshold: f.threshold,
            notifications_enabled: f.notifications_enabled,
            sound_enabled: f.sound_enabled,
            grace_period_ms: f.grace_period_secs.saturating_mul(MILLIS_PER_SECOND),
            window_ms: f.window_secs.saturating_mul(MILLIS_PER_SECOND),
            face_lost_tolerance_ms: f.face_lost_tolerance_secs.saturating_mul(MILLIS_PER_SECOND),
            cooldown_ms: f.cooldown_secs.saturating_mul(MILLIS_PER_SECOND),
            sustain_ms: f.sustain_secs.saturating_mul(MILLIS_PER_SECOND),
            evaluation_interval_ms: f.eval_interval_secs.saturating_mul(MILLIS_PER_SECOND),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn session_config(&self) -> Result<SessionAggregatorConfig, ConfigError> {
        let s = &self.session;
        if s.face_lost_timeout_secs <= 0 {
            return Err(ConfigError::OutOfRange {
                field: "face_lost_timeout_secs",
                value: s.face_lost_timeout_secs as f64,
                expected: "> 0",
            });
        }
        if s.rate_bucket_secs <= 0 {
            return Err(ConfigError::OutOfRange {
                field: "rate_bucket_secs",
                value: s.rate_bucket_secs as f64,
                expected: "> 0",
            });
        }
        Ok(SessionAggregatorConfig {
            face_lost_timeout_ms: s.face_lost_timeout_secs.saturating_mul(MILLIS_PER_SECOND),
            rate_bucket_ms: s.rate_bucket_secs.saturating_mul(MILLIS_PER_SECOND),
        })
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
