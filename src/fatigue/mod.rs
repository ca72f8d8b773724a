//! 疲劳提醒
//!
//! - `config`: 阈值、宽限期、窗口、冷却等命名常量
//! - `notifier`: 通知内容与平台通知能力抽象
//! - `engine`: 单次评估的决策过程与持续低频状态机
//! - `monitor`: 基于 tokio 的周期评估

pub mod config;
pub mod engine;
pub mod monitor;
pub mod notifier;

pub use config::FatigueConfig;
pub use engine::{AlertState, FatigueAlert, FatigueAlertEngine, FatigueDecision, SkipReason};
pub use monitor::FatigueMonitor;
pub use notifier::{LogNotifier, MemoryNotifier, Notification, Notifier};
