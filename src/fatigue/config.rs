use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PLAUSIBLE_BLINK_RATE, MILLIS_PER_MINUTE, MILLIS_PER_SECOND};
use crate::error::{check_range, ConfigError};

/// 各项时长上限：24 小时
const MAX_DURATION_MS: i64 = 24 * 60 * MILLIS_PER_MINUTE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueConfig {
    /// 滚动平均眨眼频率低于该值（次/分钟）视为疲劳
    pub fatigue_threshold: f64,
    pub notifications_enabled: bool,
    pub sound_enabled: bool,
    /// 会话开始后不做评估的时长
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: i64,
    /// 滚动窗口长度
    #[serde(default = "default_window_ms")]
    pub window_ms: i64,
    /// 窗口内允许的人脸丢失总时长，超过则本次评估不可信
    #[serde(default = "default_face_lost_tolerance_ms")]
    pub face_lost_tolerance_ms: i64,
    /// 两次提醒之间的最短间隔
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: i64,
    /// 低频状态需要持续的时长，0 表示立即提醒
    #[serde(default = "default_sustain_ms")]
    pub sustain_ms: i64,
    /// 周期评估间隔
    #[serde(default = "default_evaluation_interval_ms")]
    pub evaluation_interval_ms: i64,
}

fn default_grace_period_ms() -> i64 {
    5 * MILLIS_PER_MINUTE
}
fn default_window_ms() -> i64 {
    180 * MILLIS_PER_SECOND
}
fn default_face_lost_tolerance_ms() -> i64 {
    5 * MILLIS_PER_SECOND
}
fn default_cooldown_ms() -> i64 {
    3 * MILLIS_PER_MINUTE
}
fn default_sustain_ms() -> i64 {
    60 * MILLIS_PER_SECOND
}
fn default_evaluation_interval_ms() -> i64 {
    60 * MILLIS_PER_SECOND
}

impl Default for FatigueConfig {
    fn default() -> Self {
        Self {
            fatigue_threshold: 8.0,
            notifications_enabled: true,
            sound_enabled: true,
            grace_period_ms: default_grace_period_ms(),
            window_ms: default_window_ms(),
            face_lost_tolerance_ms: default_face_lost_tolerance_ms(),
            cooldown_ms: default_cooldown_ms(),
            sustain_ms: default_sustain_ms(),
            evaluation_interval_ms: default_evaluation_interval_ms(),
        }
    }
}

impl FatigueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range(
            "fatigue_threshold",
            self.fatigue_threshold,
            0.0,
            MAX_PLAUSIBLE_BLINK_RATE,
            "[0, 60]",
        )?;
        check_duration("grace_period_ms", self.grace_period_ms, 0)?;
        check_duration("window_ms", self.window_ms, 1)?;
        check_duration("face_lost_tolerance_ms", self.face_lost_tolerance_ms, 0)?;
        check_duration("cooldown_ms", self.cooldown_ms, 0)?;
        check_duration("sustain_ms", self.sustain_ms, 0)?;
        check_duration("evaluation_interval_ms", self.evaluation_interval_ms, 1)?;
        if self.face_lost_tolerance_ms > self.window_ms {
            return Err(ConfigError::out_of_range(
                "face_lost_tolerance_ms",
                self.face_lost_tolerance_ms as f64,
                "<= window_ms",
            ));
        }
        Ok(())
    }
}

fn check_duration(field: &'static str, value: i64, min: i64) -> Result<(), ConfigError> {
    if value < min || value > MAX_DURATION_MS {
        return Err(ConfigError::out_of_range(
            field,
            value as f64,
            "a duration between the minimum and 24h",
        ));
    }
    Ok(())
}
