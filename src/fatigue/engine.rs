//! 疲劳提醒引擎
//!
//! 每次评估按固定顺序短路：
//! 会话有效 → 宽限期 → 滚动窗口平均频率 → 人脸丢失容忍 → 阈值 → 持续时长 → 冷却 → 提醒。
//!
//! 低频需要持续 `sustain_ms` 才会提醒，状态机为
//! `Normal -> PendingBelowThreshold(since) -> Alerted(at)`；
//! 频率回到阈值以上即回到 `Normal`，取消待发提醒。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::FatigueConfig;
use super::notifier::{Notification, Notifier};
use crate::clock::Clock;
use crate::error::ConfigError;
use crate::session::rate::{events_rate_in_window, face_lost_overlap_ms, rolling_average};
use crate::session::SessionData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum AlertState {
    Normal,
    PendingBelowThreshold { since: i64 },
    Alerted { at: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatigueAlert {
    pub session_id: Uuid,
    pub timestamp: i64,
    pub rolling_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoSession,
    Inactive,
    GracePeriod,
    NoData,
    FaceLost,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FatigueDecision {
    Skipped(SkipReason),
    /// 滚动平均不低于阈值
    Normal { rolling_rate: f64 },
    /// 低于阈值，但尚未持续足够长
    Pending { rolling_rate: f64, since: i64 },
    CoolingDown { rolling_rate: f64, remaining_ms: i64 },
    Alert(FatigueAlert),
}

impl FatigueDecision {
    pub fn alert(&self) -> Option<&FatigueAlert> {
        match self {
            Self::Alert(alert) => Some(alert),
            _ => None,
        }
    }
}

pub struct FatigueAlertEngine {
    config: FatigueConfig,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    last_alert_time: Option<i64>,
    state: AlertState,
}

impl FatigueAlertEngine {
    pub fn new(
        config: FatigueConfig,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            notifier,
            last_alert_time: None,
            state: AlertState::Normal,
        })
    }

    pub fn config(&self) -> &FatigueConfig {
        &self.config
    }

    /// 替换配置（用户偏好变化）；状态机与冷却时间保留
    pub fn update_config(&mut self, config: FatigueConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        tracing::info!("Fatigue config reloaded");
        Ok(())
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    pub fn last_alert_time(&self) -> Option<i64> {
        self.last_alert_time
    }

    /// 新会话开始时调用，清除状态机与冷却
    pub fn reset(&mut self) {
        self.state = AlertState::Normal;
        self.last_alert_time = None;
    }

    /// 返回是否触发了提醒；触发时同时发送通知
    pub fn check_for_fatigue(&mut self, session: Option<&SessionData>) -> bool {
        self.evaluate(session).alert().is_some()
    }

    pub fn evaluate(&mut self, session: Option<&SessionData>) -> FatigueDecision {
        let now = self.clock.now_ms();
        let decision = self.decide(session, now);

        match &decision {
            FatigueDecision::Alert(alert) => {
                tracing::info!(
                    session_id = %alert.session_id,
                    rolling_rate = alert.rolling_rate,
                    threshold = self.config.fatigue_threshold,
                    "Fatigue alert fired"
                );
                self.dispatch_notification(alert.rolling_rate);
            }
            other => tracing::debug!(decision = ?other, "Fatigue check did not alert"),
        }
        decision
    }

    fn decide(&mut self, session: Option<&SessionData>, now: i64) -> FatigueDecision {
        let Some(session) = session else {
            return FatigueDecision::Skipped(SkipReason::NoSession);
        };
        if !session.is_active {
            return FatigueDecision::Skipped(SkipReason::Inactive);
        }
        if now - session.start_time < self.config.grace_period_ms {
            return FatigueDecision::Skipped(SkipReason::GracePeriod);
        }

        let Some(rolling_rate) = self.rolling_rate(session, now) else {
            return FatigueDecision::Skipped(SkipReason::NoData);
        };

        let face_lost = face_lost_overlap_ms(&session.face_lost_periods, now, self.config.window_ms);
        if face_lost > self.config.face_lost_tolerance_ms {
            return FatigueDecision::Skipped(SkipReason::FaceLost);
        }

        if rolling_rate >= self.config.fatigue_threshold {
            if self.state != AlertState::Normal {
                tracing::debug!(rolling_rate, "Blink rate recovered");
            }
            self.state = AlertState::Normal;
            return FatigueDecision::Normal { rolling_rate };
        }

        let pending_since = match self.state {
            AlertState::Normal => {
                self.state = AlertState::PendingBelowThreshold { since: now };
                Some(now)
            }
            AlertState::PendingBelowThreshold { since } => Some(since),
            AlertState::Alerted { .. } => None,
        };
        if let Some(since) = pending_since {
            if now - since < self.config.sustain_ms {
                return FatigueDecision::Pending {
                    rolling_rate,
                    since,
                };
            }
        }

        if let Some(last) = self.last_alert_time {
            let elapsed = now - last;
            if elapsed < self.config.cooldown_ms {
                return FatigueDecision::CoolingDown {
                    rolling_rate,
                    remaining_ms: self.config.cooldown_ms - elapsed,
                };
            }
        }

        self.last_alert_time = Some(now);
        self.state = AlertState::Alerted { at: now };
        FatigueDecision::Alert(FatigueAlert {
            session_id: session.id,
            timestamp: now,
            rolling_rate,
        })
    }

    /// 优先使用频率采样历史；没有历史时由原始事件推导
    fn rolling_rate(&self, session: &SessionData, now: i64) -> Option<f64> {
        if !session.blink_rate_history.is_empty() {
            return rolling_average(&session.blink_rate_history, now, self.config.window_ms);
        }
        let window = self.config.window_ms.min(now - session.start_time);
        if window <= 0 {
            return None;
        }
        events_rate_in_window(&session.blink_events, now, window)
    }

    fn dispatch_notification(&self, rolling_rate: f64) {
        if !self.config.notifications_enabled {
            return;
        }
        let notification = Notification::fatigue(rolling_rate, self.config.sound_enabled);
        if let Err(e) = self.notifier.notify(&notification) {
            tracing::warn!(error = %e, "Fatigue notification unavailable");
        }
    }
}

impl std::fmt::Debug for FatigueAlertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatigueAlertEngine")
            .field("config", &self.config)
            .field("last_alert_time", &self.last_alert_time)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::NotificationError;
    use crate::fatigue::notifier::MemoryNotifier;
    use crate::session::{BlinkRatePoint, FaceLostPeriod};

    const MIN: i64 = 60_000;

    fn config(sustain_ms: i64) -> FatigueConfig {
        FatigueConfig {
            sustain_ms,
            ..FatigueConfig::default()
        }
    }

    fn engine(
        cfg: FatigueConfig,
        clock: &ManualClock,
        notifier: &Arc<MemoryNotifier>,
    ) -> FatigueAlertEngine {
        FatigueAlertEngine::new(cfg, Arc::new(clock.clone()), notifier.clone()).unwrap()
    }

    /// 每分钟一个采样点，前 `early` 分钟为 `early_rate`，之后为 `late_rate`
    fn session_with_rates(minutes: i64, early: i64, early_rate: f64, late_rate: f64) -> SessionData {
        let mut s = SessionData::new(0, None);
        for m in 1..=minutes {
            s.blink_rate_history.push(BlinkRatePoint {
                timestamp: m * MIN,
                rate: if m <= early { early_rate } else { late_rate },
            });
        }
        s
    }

    #[test]
    fn no_session_or_inactive_never_alerts() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        assert_eq!(e.evaluate(None), FatigueDecision::Skipped(SkipReason::NoSession));

        let mut s = session_with_rates(10, 0, 0.0, 2.0);
        s.is_active = false;
        assert_eq!(e.evaluate(Some(&s)), FatigueDecision::Skipped(SkipReason::Inactive));
    }

    #[test]
    fn grace_period_blocks_any_rate() {
        let clock = ManualClock::new(4 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let s = session_with_rates(4, 0, 0.0, 0.0);
        assert!(!e.check_for_fatigue(Some(&s)));
        assert_eq!(e.evaluate(Some(&s)), FatigueDecision::Skipped(SkipReason::GracePeriod));
    }

    #[test]
    fn window_average_beats_session_average() {
        // 前 4 分钟 15 次/分，后 6 分钟 6 次/分：全程平均 9.6 高于 8，但窗口平均为 6
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let s = session_with_rates(10, 4, 15.0, 6.0);

        let decision = e.evaluate(Some(&s));
        let alert = decision.alert().expect("alert");
        assert!((alert.rolling_rate - 6.0).abs() < 1e-9);
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].body.contains("6.0"));
    }

    #[test]
    fn recent_recovery_suppresses_alert() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let s = session_with_rates(10, 7, 3.0, 12.0);
        assert!(!e.check_for_fatigue(Some(&s)));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn cooldown_allows_one_alert_per_window() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let mut s = session_with_rates(20, 0, 0.0, 5.0);

        assert!(e.check_for_fatigue(Some(&s)));
        clock.advance(MIN);
        assert!(matches!(
            e.evaluate(Some(&s)),
            FatigueDecision::CoolingDown { remaining_ms: 120_000, .. }
        ));
        assert_eq!(notifier.sent().len(), 1);

        clock.advance(2 * MIN);
        s.blink_rate_history.push(BlinkRatePoint {
            timestamp: 13 * MIN,
            rate: 5.0,
        });
        assert!(e.check_for_fatigue(Some(&s)));
        assert_eq!(notifier.sent().len(), 2);
    }

    #[test]
    fn face_lost_over_tolerance_suppresses() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let mut s = session_with_rates(10, 0, 0.0, 4.0);

        s.face_lost_periods.push(FaceLostPeriod {
            start: 9 * MIN,
            end: Some(9 * MIN + 6_000),
        });
        assert_eq!(e.evaluate(Some(&s)), FatigueDecision::Skipped(SkipReason::FaceLost));

        s.face_lost_periods[0].end = Some(9 * MIN + 4_000);
        assert!(e.check_for_fatigue(Some(&s)));
    }

    #[test]
    fn face_lost_outside_window_is_ignored() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let mut s = session_with_rates(10, 0, 0.0, 4.0);
        s.face_lost_periods.push(FaceLostPeriod {
            start: MIN,
            end: Some(3 * MIN),
        });
        assert!(e.check_for_fatigue(Some(&s)));
    }

    #[test]
    fn sustained_low_rate_required() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(MIN), &clock, &notifier);
        let s = session_with_rates(30, 0, 0.0, 5.0);

        assert!(matches!(
            e.evaluate(Some(&s)),
            FatigueDecision::Pending { since, .. } if since == 10 * MIN
        ));
        assert_eq!(e.state(), AlertState::PendingBelowThreshold { since: 10 * MIN });

        clock.advance(30_000);
        assert!(!e.check_for_fatigue(Some(&s)));

        clock.advance(30_000);
        assert!(e.check_for_fatigue(Some(&s)));
        assert_eq!(e.state(), AlertState::Alerted { at: 11 * MIN });
    }

    #[test]
    fn recovery_cancels_pending_alert() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(MIN), &clock, &notifier);

        let low = session_with_rates(30, 0, 0.0, 5.0);
        assert!(!e.check_for_fatigue(Some(&low)));

        clock.advance(30_000);
        let high = session_with_rates(30, 0, 0.0, 12.0);
        assert!(!e.check_for_fatigue(Some(&high)));
        assert_eq!(e.state(), AlertState::Normal);

        // 重新进入低频，计时从头开始
        clock.advance(45_000);
        assert!(!e.check_for_fatigue(Some(&low)));
        assert_eq!(e.state(), AlertState::PendingBelowThreshold { since: 10 * MIN + 75_000 });
    }

    #[test]
    fn notification_failure_still_alerts() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::failing(NotificationError::PermissionDenied));
        let mut e = engine(config(0), &clock, &notifier);
        let s = session_with_rates(10, 0, 0.0, 3.0);
        assert!(e.check_for_fatigue(Some(&s)));
        assert_eq!(e.last_alert_time(), Some(10 * MIN));
    }

    #[test]
    fn disabled_notifications_are_not_dispatched() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let cfg = FatigueConfig {
            notifications_enabled: false,
            ..config(0)
        };
        let mut e = engine(cfg, &clock, &notifier);
        let s = session_with_rates(10, 0, 0.0, 3.0);
        assert!(e.check_for_fatigue(Some(&s)));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn falls_back_to_raw_events() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);

        let mut s = SessionData::new(0, None);
        // 最近 3 分钟内 9 次眨眼 = 3 次/分
        for i in 0..9 {
            s.blink_events.push(crate::session::BlinkEvent {
                timestamp: 7 * MIN + 1 + i * 20_000,
                duration: None,
            });
        }
        let decision = e.evaluate(Some(&s));
        assert!((decision.alert().expect("alert").rolling_rate - 3.0).abs() < 1e-9);
    }

    #[test]
    fn raw_events_outside_window_are_no_data() {
        let clock = ManualClock::new(10 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);

        let mut s = SessionData::new(0, None);
        s.blink_events.push(crate::session::BlinkEvent {
            timestamp: MIN,
            duration: Some(120),
        });
        assert_eq!(e.evaluate(Some(&s)), FatigueDecision::Skipped(SkipReason::NoData));
        assert!(notifier.sent().is_empty());
        assert_eq!(e.last_alert_time(), None);
    }

    #[test]
    fn empty_window_is_no_data() {
        let clock = ManualClock::new(30 * MIN);
        let notifier = Arc::new(MemoryNotifier::new());
        let mut e = engine(config(0), &clock, &notifier);
        let s = session_with_rates(10, 0, 0.0, 3.0);
        assert_eq!(e.evaluate(Some(&s)), FatigueDecision::Skipped(SkipReason::NoData));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let clock = ManualClock::new(0);
        let cfg = FatigueConfig {
            fatigue_threshold: f64::NAN,
            ..FatigueConfig::default()
        };
        assert!(FatigueAlertEngine::new(cfg, Arc::new(clock), Arc::new(MemoryNotifier::new())).is_err());
    }
}
