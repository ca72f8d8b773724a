use blink_monitor::constants::FACE_MESH_MIN_POINTS;
use blink_monitor::vision::landmarks::{LEFT_EYE_INDICES, RIGHT_EYE_INDICES};
use blink_monitor::vision::Point3D;
use blink_monitor::LandmarkResult;

pub const FRAME_W: f64 = 640.0;
pub const FRAME_H: f64 = 480.0;
pub const FRAME_MS: i64 = 33;

pub const OPEN_EAR: f64 = 0.32;
pub const CLOSED_EAR: f64 = 0.12;

/// 生成双眼 EAR 均为 `ear` 的人脸网格（坐标归一化）
pub fn face_with_ear(ear: f64) -> LandmarkResult {
    let mut points = vec![Point3D::new(0.5, 0.5, 0.0); FACE_MESH_MIN_POINTS];
    // 水平跨度 0.2，像素空间里纵横比例一致，保持 640x480 下的 EAR 不变
    let half_h = ear * 0.2 * (FRAME_W / FRAME_H) / 2.0;
    for (indices, cx) in [(LEFT_EYE_INDICES, 0.3), (RIGHT_EYE_INDICES, 0.7)] {
        points[indices[0]] = Point3D::new(cx - 0.1, 0.5, 0.0);
        points[indices[1]] = Point3D::new(cx - 0.03, 0.5 - half_h, 0.0);
        points[indices[2]] = Point3D::new(cx + 0.03, 0.5 - half_h, 0.0);
        points[indices[3]] = Point3D::new(cx + 0.1, 0.5, 0.0);
        points[indices[4]] = Point3D::new(cx + 0.03, 0.5 + half_h, 0.0);
        points[indices[5]] = Point3D::new(cx - 0.03, 0.5 + half_h, 0.0);
    }
    LandmarkResult::Face(points)
}

/// 一段帧序列：`(timestamp_ms, landmarks)`
pub type Frames = Vec<(i64, LandmarkResult)>;

/// 从 `start` 开始、每 `every_ms` 眨一次眼、持续 `duration_ms` 的帧序列
///
/// 每次眨眼闭眼 4 帧（约 130ms）。
pub fn blinking(start: i64, duration_ms: i64, every_ms: i64) -> Frames {
    let mut frames = Vec::new();
    let mut ts = start;
    while ts < start + duration_ms {
        let phase = (ts - start) % every_ms;
        let ear = if phase < 4 * FRAME_MS { CLOSED_EAR } else { OPEN_EAR };
        frames.push((ts, face_with_ear(ear)));
        ts += FRAME_MS;
    }
    frames
}

pub fn no_face(start: i64, duration_ms: i64) -> Frames {
    (0..)
        .map(|i| start + i * FRAME_MS)
        .take_while(|ts| *ts < start + duration_ms)
        .map(|ts| (ts, LandmarkResult::NoFace))
        .collect()
}
