//! EAR (Eye Aspect Ratio) 计算模块
//!
//! 标准 6 点公式: EAR = (|p2-p6| + |p3-p5|) / (2 * |p1-p4|)
//! - p1, p4: 眼角点（水平方向）
//! - p2, p3: 上眼睑点
//! - p5, p6: 下眼睑点
//!
//! 睁眼时 EAR 基本稳定，闭眼时迅速趋近于 0。

use super::geometry::distance;
use super::landmarks::EyeLandmarks;

/// 单眼 EAR
///
/// 水平距离为 0 说明关键点退化或损坏，此时返回 0 而不是除零。
pub fn eye_aspect_ratio(eye: &EyeLandmarks) -> f64 {
    let horizontal = distance(&eye.p1, &eye.p4);
    if horizontal == 0.0 {
        return 0.0;
    }

    let vertical1 = distance(&eye.p2, &eye.p6);
    let vertical2 = distance(&eye.p3, &eye.p5);
    (vertical1 + vertical2) / (2.0 * horizontal)
}

/// 双眼 EAR 平均值
pub fn average_ear(left: &EyeLandmarks, right: &EyeLandmarks) -> f64 {
    (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0
}
