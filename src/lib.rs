//! 眨眼检测与视觉疲劳提醒核心库
//!
//! 输入：每帧的人脸关键点结果 + 时间戳；输出：眨眼事件、会话统计与疲劳提醒。
//!
//! ## 模块
//! - `vision`: 几何、EAR、关键点提取、眨眼状态机、校准
//! - `pipeline`: 单帧处理流水线
//! - `session`: 会话聚合与滚动窗口统计
//! - `fatigue`: 疲劳提醒引擎、通知与定时监控

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod fatigue;
pub mod logging;
pub mod pipeline;
pub mod session;
pub mod vision;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, NotificationError};
pub use fatigue::{FatigueAlert, FatigueAlertEngine, FatigueConfig, FatigueMonitor};
pub use pipeline::{FrameOutcome, FrameProcessor};
pub use session::{SessionAggregator, SessionData};
pub use vision::{BlinkDetector, BlinkDetectorConfig, LandmarkResult};
