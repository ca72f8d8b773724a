//! 通知内容契约与平台通知能力
//!
//! 平台 API 由宿主实现 [`Notifier`]；通知失败只记录日志，不影响提醒决策。

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::constants::FATIGUE_NOTIFICATION_TAG;
use crate::error::NotificationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// 去重标签，同一标签的通知在平台侧会互相替换
    pub tag: String,
    pub sound: bool,
}

impl Notification {
    pub fn fatigue(rolling_rate: f64, sound: bool) -> Self {
        Self {
            title: "Time for a break".to_string(),
            body: format!(
                "Your blink rate has dropped to {rolling_rate:.1} blinks/min. \
                 Look away from the screen and blink a few times."
            ),
            tag: FATIGUE_NOTIFICATION_TAG.to_string(),
            sound,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

/// 只写日志的通知器，用于无桌面环境
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        tracing::info!(
            title = %notification.title,
            body = %notification.body,
            tag = %notification.tag,
            sound = notification.sound,
            "Fatigue notification"
        );
        Ok(())
    }
}

/// 记录所有通知的内存通知器；可配置为始终失败以模拟权限被拒
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<Notification>>,
    failure: Option<NotificationError>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: NotificationError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(error),
        }
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        self.sent
            .lock()
            .map_err(|e| NotificationError::Dispatch(e.to_string()))?
            .push(notification.clone());
        Ok(())
    }
}
