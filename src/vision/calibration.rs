//! 用户校准档案
//!
//! 校准向导（外部）采集一段 EAR 序列和用户主动眨眼次数，本模块据此推导个人化的
//! EAR 阈值：取睁眼基线（中位数）与闭眼底部（5% 分位）的中点。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blink::{BlinkDetector, BlinkDetectorConfig};
use crate::error::ConfigError;

/// 阈值位于闭眼底部与睁眼基线之间的比例
const THRESHOLD_BLEND: f64 = 0.5;

/// 闭眼底部取的分位数
const FLOOR_PERCENTILE: f64 = 0.05;

/// 校准过程中采集的原始数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationData {
    pub timestamps: Vec<i64>,
    pub ear_values: Vec<f64>,
    pub blink_events: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pub id: Uuid,
    pub ear_threshold: f64,
    /// 检测到的眨眼数与期望眨眼数的吻合度 (0.0-1.0)
    pub accuracy: f64,
    pub expected_blinks: u32,
    pub detected_blinks: u32,
    pub created_at: DateTime<Utc>,
    pub data: CalibrationData,
}

impl Calibration {
    /// 从校准样本推导阈值，并用推导出的阈值回放样本统计眨眼数
    ///
    /// 样本为空、长度不一致或推导出的阈值不合法时返回错误。
    pub fn from_samples(
        timestamps: Vec<i64>,
        ear_values: Vec<f64>,
        expected_blinks: u32,
        base: BlinkDetectorConfig,
    ) -> Result<Self, ConfigError> {
        if ear_values.is_empty() || timestamps.len() != ear_values.len() {
            return Err(ConfigError::out_of_range(
                "calibration_samples",
                ear_values.len() as f64,
                "non-empty, one timestamp per EAR value",
            ));
        }

        let threshold = derive_threshold(&ear_values);
        let config = base.with_ear_threshold(threshold)?;

        let mut detector = BlinkDetector::new(config);
        let mut blink_events = Vec::new();
        let mut was_blinking = false;
        for (&ts, &ear) in timestamps.iter().zip(&ear_values) {
            let blinking = detector.detect(ear, ts);
            if blinking && !was_blinking {
                blink_events.push(ts);
            }
            was_blinking = blinking;
        }

        let detected_blinks = blink_events.len() as u32;
        let accuracy = match detected_blinks.max(expected_blinks) {
            0 => 1.0,
            max => detected_blinks.min(expected_blinks) as f64 / max as f64,
        };

        tracing::info!(
            ear_threshold = threshold,
            expected_blinks,
            detected_blinks,
            accuracy,
            "Calibration computed"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            ear_threshold: threshold,
            accuracy,
            expected_blinks,
            detected_blinks,
            created_at: Utc::now(),
            data: CalibrationData {
                timestamps,
                ear_values,
                blink_events,
            },
        })
    }

    /// 在基础配置上套用校准阈值
    pub fn detector_config(
        &self,
        base: BlinkDetectorConfig,
    ) -> Result<BlinkDetectorConfig, ConfigError> {
        base.with_ear_threshold(self.ear_threshold)
    }
}

/// 阈值 = floor + 0.5 * (baseline - floor)
pub fn derive_threshold(ear_values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = ear_values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let baseline = median(&sorted);
    let floor = percentile(&sorted, FLOOR_PERCENTILE);
    floor + THRESHOLD_BLEND * (baseline - floor)
}

fn median(sorted: &[f64]) -> f64 {
    let len = sorted.len();
    if len % 2 == 1 {
        sorted[len / 2]
    } else {
        (sorted[len / 2 - 1] + sorted[len / 2]) / 2.0
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() - 1) as f64 * q).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}
