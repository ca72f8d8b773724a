//! 会话聚合器
//!
//! 独占 `SessionData`：开始/结束追踪、累计眨眼事件、维护人脸丢失区间、
//! 周期性写入频率采样。疲劳引擎只读取它产出的快照。

use uuid::Uuid;

use super::rate::{bucketize, rate_for_count};
use super::types::{BlinkEvent, BlinkRatePoint, FaceLostPeriod, SessionData, SessionQuality};
use crate::constants::MILLIS_PER_SECOND;
use crate::pipeline::FrameOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAggregatorConfig {
    /// 人脸持续丢失超过该时长则自动结束会话
    pub face_lost_timeout_ms: i64,
    /// 频率采样桶大小
    pub rate_bucket_ms: i64,
}

impl Default for SessionAggregatorConfig {
    fn default() -> Self {
        Self {
            face_lost_timeout_ms: 60 * MILLIS_PER_SECOND,
            rate_bucket_ms: 60 * MILLIS_PER_SECOND,
        }
    }
}

#[derive(Debug, Default)]
pub struct SessionAggregator {
    config: SessionAggregatorConfig,
    tracking: bool,
    calibration_id: Option<Uuid>,
    session: Option<SessionData>,
}

impl SessionAggregator {
    pub fn new(config: SessionAggregatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// 开始追踪；会话在首次检测到人脸时创建
    pub fn start_tracking(&mut self, calibration_id: Option<Uuid>) {
        self.tracking = true;
        self.calibration_id = calibration_id;
        tracing::debug!(?calibration_id, "Tracking started, waiting for face");
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// 处理一帧结果；若本帧导致会话因人脸丢失超时而结束，返回结束后的会话
    pub fn on_frame(&mut self, outcome: &FrameOutcome, now: i64) -> Option<SessionData> {
        if !self.tracking {
            return None;
        }

        match *outcome {
            FrameOutcome::NoFace => {
                let session = self.session.as_mut()?;
                match session.open_face_lost_period().map(|p| p.start) {
                    None => {
                        session.face_lost_periods.push(FaceLostPeriod {
                            start: now,
                            end: None,
                        });
                        tracing::debug!(session_id = %session.id, "Face lost");
                        None
                    }
                    Some(start) if now - start > self.config.face_lost_timeout_ms => {
                        tracing::info!(
                            session_id = %session.id,
                            lost_ms = now - start,
                            "Face lost beyond timeout, ending session"
                        );
                        self.finalize(now)
                    }
                    Some(_) => None,
                }
            }
            FrameOutcome::Face {
                blink_started,
                blink_ended,
                ..
            } => {
                let calibration_id = self.calibration_id;
                let session = self.session.get_or_insert_with(|| {
                    let s = SessionData::new(now, calibration_id);
                    tracing::info!(session_id = %s.id, start_time = now, "Session started");
                    s
                });

                if let Some(open) = session.face_lost_periods.last_mut().filter(|p| p.is_open()) {
                    open.end = Some(now);
                    tracing::debug!(session_id = %session.id, lost_ms = now - open.start, "Face regained");
                }

                if let Some(duration) = blink_ended {
                    if let Some(last) = session.blink_events.last_mut() {
                        if last.duration.is_none() {
                            last.duration = Some(duration);
                        }
                    }
                }

                if blink_started {
                    session.blink_events.push(BlinkEvent {
                        timestamp: now,
                        duration: None,
                    });
                    session.total_blinks += 1;
                    tracing::debug!(
                        session_id = %session.id,
                        total_blinks = session.total_blinks,
                        "Blink recorded"
                    );
                }
                None
            }
        }
    }

    /// 写入一个频率采样点，覆盖 `[now - bucket, now]`（会话不足一个桶时按实际时长）
    pub fn record_rate_sample(&mut self, now: i64) -> Option<BlinkRatePoint> {
        let bucket = self.config.rate_bucket_ms;
        let session = self.session.as_mut().filter(|s| s.is_active)?;

        let span = bucket.min(now - session.start_time);
        if span <= 0 {
            return None;
        }
        let cutoff = now - span;
        let count = session
            .blink_events
            .iter()
            .filter(|e| e.timestamp > cutoff && e.timestamp <= now)
            .count();

        let point = BlinkRatePoint {
            timestamp: now,
            rate: rate_for_count(count, span),
        };
        session.blink_rate_history.push(point);
        Some(point)
    }

    pub fn record_fatigue_alert(&mut self) {
        if let Some(session) = self.session.as_mut().filter(|s| s.is_active) {
            session.fatigue_alert_count += 1;
        }
    }

    /// 停止追踪并结束当前会话
    pub fn stop_tracking(&mut self, now: i64) -> Option<SessionData> {
        self.tracking = false;
        self.finalize(now)
    }

    fn finalize(&mut self, now: i64) -> Option<SessionData> {
        let mut session = self.session.take()?;

        if let Some(open) = session.face_lost_periods.last_mut().filter(|p| p.is_open()) {
            open.end = Some(now);
        }
        session.is_active = false;
        session.end_time = Some(now);

        let duration = session.duration_ms(now);
        let ratio = if duration > 0 {
            session.face_lost_ms(now) as f64 / duration as f64
        } else {
            0.0
        };
        session.quality = SessionQuality::from_face_lost_ratio(ratio);

        tracing::info!(
            session_id = %session.id,
            duration_ms = duration,
            total_blinks = session.total_blinks,
            fatigue_alerts = session.fatigue_alert_count,
            quality = ?session.quality,
            "Session ended"
        );
        Some(session)
    }

    /// 当前进行中的会话快照
    pub fn active_session(&self) -> Option<SessionData> {
        self.session.as_ref().filter(|s| s.is_active).cloned()
    }

    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    /// 由原始事件派生的图表数据
    pub fn rate_points(&self, bucket_ms: i64, now: i64) -> Vec<BlinkRatePoint> {
        match &self.session {
            Some(s) => bucketize(&s.blink_events, s.start_time, s.end_time.unwrap_or(now), bucket_ms),
            None => Vec::new(),
        }
    }
}
