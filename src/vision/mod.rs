//! 视觉信号处理
//!
//! - `geometry`: 像素坐标点与距离
//! - `ear`: EAR (Eye Aspect Ratio) 眼部纵横比计算
//! - `landmarks`: 从 face mesh 关键点中提取左右眼 6 点结构
//! - `blink`: 眨眼检测状态机
//! - `calibration`: 用户校准档案与阈值推导

pub mod blink;
pub mod calibration;
pub mod ear;
pub mod geometry;
pub mod landmarks;

pub use blink::{BlinkDetectionState, BlinkDetector, BlinkDetectorConfig};
pub use calibration::{Calibration, CalibrationData};
pub use ear::{average_ear, eye_aspect_ratio};
pub use geometry::{distance, Point2D, Point3D};
pub use landmarks::{extract_eyes, EyeLandmarks, LandmarkResult};
