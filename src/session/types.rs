use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkEvent {
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

/// 人脸丢失区间；`end` 为空表示当前仍未检测到人脸
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceLostPeriod {
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
}

impl FaceLostPeriod {
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// 区间时长，开放区间计到 `now`
    pub fn duration_ms(&self, now: i64) -> i64 {
        (self.end.unwrap_or(now) - self.start).max(0)
    }
}

/// 图表用的眨眼频率采样点（次/分钟）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlinkRatePoint {
    pub timestamp: i64,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionQuality {
    #[default]
    Good,
    Fair,
    Poor,
}

impl SessionQuality {
    /// 按人脸丢失时间占比分级: <5% good, <20% fair, 其余 poor
    pub fn from_face_lost_ratio(ratio: f64) -> Self {
        match ratio {
            r if r < 0.05 => Self::Good,
            r if r < 0.20 => Self::Fair,
            _ => Self::Poor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub id: Uuid,
    pub start_time: i64,
    #[serde(default)]
    pub end_time: Option<i64>,
    pub is_active: bool,
    pub total_blinks: u64,
    #[serde(default)]
    pub blink_events: Vec<BlinkEvent>,
    #[serde(default)]
    pub blink_rate_history: Vec<BlinkRatePoint>,
    #[serde(default)]
    pub quality: SessionQuality,
    #[serde(default)]
    pub fatigue_alert_count: u32,
    #[serde(default)]
    pub face_lost_periods: Vec<FaceLostPeriod>,
    #[serde(default)]
    pub calibration_id: Option<Uuid>,
}

impl SessionData {
    pub fn new(start_time: i64, calibration_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time: None,
            is_active: true,
            total_blinks: 0,
            blink_events: Vec::new(),
            blink_rate_history: Vec::new(),
            quality: SessionQuality::Good,
            fatigue_alert_count: 0,
            face_lost_periods: Vec::new(),
            calibration_id,
        }
    }

    /// 会话时长；进行中的会话计到 `now`
    pub fn duration_ms(&self, now: i64) -> i64 {
        (self.end_time.unwrap_or(now) - self.start_time).max(0)
    }

    pub fn open_face_lost_period(&self) -> Option<&FaceLostPeriod> {
        self.face_lost_periods.last().filter(|p| p.is_open())
    }

    pub fn face_lost_ms(&self, now: i64) -> i64 {
        self.face_lost_periods
            .iter()
            .map(|p| p.duration_ms(now))
            .sum()
    }

    /// 全程平均眨眼频率（次/分钟）
    pub fn average_blink_rate(&self, now: i64) -> f64 {
        super::rate::rate_for_count(self.total_blinks as usize, self.duration_ms(now))
    }
}
