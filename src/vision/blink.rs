//! 眨眼检测模块
//!
//! 将连续的 EAR 信号转换为离散、去抖后的眨眼事件：
//! - EAR 连续 `consecutive_frames` 帧低于阈值才算一次眨眼（抗单帧噪声）
//! - 距上次眨眼不足 `debounce_ms` 的再次闭眼被抑制（避免一次眨眼被重复计数）
//! - EAR 回到阈值以上时复位连续帧计数与眨眼状态
//!
//! 每个检测器实例独立持有状态，不存在全局单例。

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CONSECUTIVE_FRAMES, DEFAULT_DEBOUNCE_MS, DEFAULT_EAR_THRESHOLD};
use crate::error::{check_range, ConfigError};

/// 去抖间隔上限（毫秒）；更大的值会吞掉正常眨眼
const MAX_DEBOUNCE_MS: f64 = 10_000.0;

/// 连续帧要求上限
const MAX_CONSECUTIVE_FRAMES: u32 = 120;

/// 眨眼检测器配置，构造后不可变
///
/// 反序列化同样经过 `validate`，非法配置无法被构造出来。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawBlinkDetectorConfig")]
pub struct BlinkDetectorConfig {
    ear_threshold: f64,
    consecutive_frames: u32,
    debounce_ms: f64,
}

/// 未校验的反序列化形态，缺省字段取默认值
#[derive(Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawBlinkDetectorConfig {
    ear_threshold: f64,
    consecutive_frames: u32,
    debounce_ms: f64,
}

impl Default for RawBlinkDetectorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consecutive_frames: DEFAULT_CONSECUTIVE_FRAMES,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl TryFrom<RawBlinkDetectorConfig> for BlinkDetectorConfig {
    type Error = ConfigError;

    fn try_from(raw: RawBlinkDetectorConfig) -> Result<Self, Self::Error> {
        Self::new(raw.ear_threshold, raw.consecutive_frames, raw.debounce_ms)
    }
}

impl Default for BlinkDetectorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consecutive_frames: DEFAULT_CONSECUTIVE_FRAMES,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl BlinkDetectorConfig {
    pub fn new(
        ear_threshold: f64,
        consecutive_frames: u32,
        debounce_ms: f64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            ear_threshold,
            consecutive_frames,
            debounce_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// 返回替换阈值后的新配置（用于校准结果）
    pub fn with_ear_threshold(self, ear_threshold: f64) -> Result<Self, ConfigError> {
        Self::new(ear_threshold, self.consecutive_frames, self.debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("ear_threshold", self.ear_threshold, 0.0, 1.0, "(0, 1]")?;
        if self.ear_threshold <= 0.0 {
            return Err(ConfigError::out_of_range(
                "ear_threshold",
                self.ear_threshold,
                "(0, 1]",
            ));
        }
        if self.consecutive_frames == 0 || self.consecutive_frames > MAX_CONSECUTIVE_FRAMES {
            return Err(ConfigError::out_of_range(
                "consecutive_frames",
                self.consecutive_frames as f64,
                "[1, 120]",
            ));
        }
        check_range("debounce_ms", self.debounce_ms, 0.0, MAX_DEBOUNCE_MS, "[0, 10000]")?;
        Ok(())
    }

    pub fn ear_threshold(&self) -> f64 {
        self.ear_threshold
    }

    pub fn consecutive_frames(&self) -> u32 {
        self.consecutive_frames
    }

    pub fn debounce_ms(&self) -> f64 {
        self.debounce_ms
    }
}

/// 检测器内部状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkDetectionState {
    pub consecutive_frames_below: u32,
    /// 上次眨眼时间；`None` 表示尚未眨眼
    pub last_blink_time: Option<i64>,
    pub total_blinks: u64,
    pub is_currently_blinking: bool,
}

/// 眨眼检测器
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    config: BlinkDetectorConfig,
    state: BlinkDetectionState,
    disposed: bool,
}

impl BlinkDetector {
    pub fn new(config: BlinkDetectorConfig) -> Self {
        Self {
            config,
            state: BlinkDetectionState::default(),
            disposed: false,
        }
    }

    /// 处理一帧 EAR，返回当前是否处于眨眼中
    ///
    /// 调用方不应为“无人脸”帧调用本方法：EAR=0 永远低于阈值，会被误判为持续闭眼。
    pub fn detect(&mut self, current_ear: f64, timestamp_ms: i64) -> bool {
        if self.disposed {
            return false;
        }

        if current_ear < self.config.ear_threshold {
            self.state.consecutive_frames_below =
                self.state.consecutive_frames_below.saturating_add(1);

            let debounced = match self.state.last_blink_time {
                Some(last) => (timestamp_ms - last) as f64 > self.config.debounce_ms,
                None => true,
            };

            if self.state.consecutive_frames_below >= self.config.consecutive_frames
                && !self.state.is_currently_blinking
                && debounced
            {
                self.state.is_currently_blinking = true;
                self.state.total_blinks += 1;
                self.state.last_blink_time = Some(timestamp_ms);
                tracing::trace!(
                    total_blinks = self.state.total_blinks,
                    ear = current_ear,
                    timestamp_ms,
                    "Blink detected"
                );
            }

            self.state.is_currently_blinking
        } else {
            self.state.consecutive_frames_below = 0;
            self.state.is_currently_blinking = false;
            false
        }
    }

    /// 清零全部状态
    pub fn reset_blink_counter(&mut self) {
        self.state = BlinkDetectionState::default();
    }

    pub fn blink_count(&self) -> u64 {
        self.state.total_blinks
    }

    pub fn is_blinking(&self) -> bool {
        self.state.is_currently_blinking
    }

    pub fn state(&self) -> BlinkDetectionState {
        self.state
    }

    pub fn config(&self) -> &BlinkDetectorConfig {
        &self.config
    }

    /// 释放检测器；之后的 `detect` 调用不再改变状态。可重复调用。
    pub fn dispose(&mut self) {
        if !self.disposed {
            tracing::debug!(total_blinks = self.state.total_blinks, "Blink detector disposed");
        }
        self.disposed = true;
        self.state.consecutive_frames_below = 0;
        self.state.is_currently_blinking = false;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Default for BlinkDetector {
    fn default() -> Self {
        Self::new(BlinkDetectorConfig::default())
    }
}
