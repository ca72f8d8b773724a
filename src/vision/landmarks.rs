//! 关键点提取模块
//!
//! 从 face mesh（≥468 个归一化关键点）中按固定解剖学索引选出左右眼各 6 个点，
//! 并缩放到像素坐标。提取失败返回 `None`，表示“本帧无人脸”。

use serde::de::{Deserializer, Error as _};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::geometry::{Point2D, Point3D};
use crate::constants::FACE_MESH_MIN_POINTS;

/// 左眼 6 点索引: p1 外眼角, p2/p3 上眼睑, p4 内眼角, p5/p6 下眼睑
pub const LEFT_EYE_INDICES: [usize; 6] = [33, 160, 158, 133, 153, 144];

/// 右眼 6 点索引，顺序同左眼
pub const RIGHT_EYE_INDICES: [usize; 6] = [362, 385, 387, 263, 373, 380];

/// 单眼 6 点轮廓（像素坐标）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub p1: Point2D,
    pub p2: Point2D,
    pub p3: Point2D,
    pub p4: Point2D,
    pub p5: Point2D,
    pub p6: Point2D,
}

impl EyeLandmarks {
    fn from_indices(points: &[Point3D], indices: &[usize; 6], width: f64, height: f64) -> Self {
        let at = |i: usize| points[indices[i]].to_pixel(width, height);
        Self {
            p1: at(0),
            p2: at(1),
            p3: at(2),
            p4: at(3),
            p5: at(4),
            p6: at(5),
        }
    }
}

/// 单帧推理结果
///
/// JSON 形态: `null` 或 `[]` 为无人脸；否则为点数组，每个点为 `[x, y, z]`
/// 或 `{"x":..,"y":..,"z":..}`。
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LandmarkResult {
    #[default]
    NoFace,
    Face(Vec<Point3D>),
}

impl LandmarkResult {
    /// 取检测到的第一张人脸；集合为空时视为无人脸
    pub fn from_faces(faces: Vec<Vec<Point3D>>) -> Self {
        match faces.into_iter().next() {
            Some(points) if !points.is_empty() => Self::Face(points),
            _ => Self::NoFace,
        }
    }

    pub fn is_face(&self) -> bool {
        matches!(self, Self::Face(_))
    }
}

/// 提取左右眼关键点，返回 `(left, right)`
///
/// 无人脸、点集为空或点数不足 468 时返回 `None`。
pub fn extract_eyes(
    result: &LandmarkResult,
    width: f64,
    height: f64,
) -> Option<(EyeLandmarks, EyeLandmarks)> {
    let points = match result {
        LandmarkResult::NoFace => return None,
        LandmarkResult::Face(points) => points,
    };
    if points.len() < FACE_MESH_MIN_POINTS {
        return None;
    }

    let left = EyeLandmarks::from_indices(points, &LEFT_EYE_INDICES, width, height);
    let right = EyeLandmarks::from_indices(points, &RIGHT_EYE_INDICES, width, height);
    Some((left, right))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Seq(Vec<f64>),
    Object(Point3D),
}

impl Serialize for LandmarkResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NoFace => serializer.serialize_none(),
            Self::Face(points) => points.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LandmarkResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Vec<RawPoint>>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(Self::NoFace);
        };

        let mut points = Vec::with_capacity(raw.len());
        for p in raw {
            let point = match p {
                RawPoint::Object(p) => p,
                RawPoint::Seq(v) => match v.as_slice() {
                    [x, y] => Point3D::new(*x, *y, 0.0),
                    [x, y, z] => Point3D::new(*x, *y, *z),
                    _ => {
                        return Err(D::Error::custom(format!(
                            "landmark point must have 2 or 3 coordinates, got {}",
                            v.len()
                        )))
                    }
                },
            };
            points.push(point);
        }

        Ok(Self::from_faces(vec![points]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> Vec<Point3D> {
        (0..FACE_MESH_MIN_POINTS)
            .map(|i| Point3D::new(i as f64 / 1000.0, 0.5, 0.0))
            .collect()
    }

    #[test]
    fn extracts_scaled_eye_points() {
        let result = LandmarkResult::Face(mesh());
        let (left, right) = extract_eyes(&result, 1000.0, 200.0).expect("face");
        assert_eq!(left.p1, Point2D::new(33.0, 100.0));
        assert_eq!(left.p4, Point2D::new(133.0, 100.0));
        assert_eq!(right.p1, Point2D::new(362.0, 100.0));
        assert_eq!(right.p6, Point2D::new(380.0, 100.0));
    }

    #[test]
    fn no_face_and_short_meshes_are_none() {
        assert!(extract_eyes(&LandmarkResult::NoFace, 640.0, 480.0).is_none());

        let mut short = mesh();
        short.truncate(FACE_MESH_MIN_POINTS - 1);
        assert!(extract_eyes(&LandmarkResult::Face(short), 640.0, 480.0).is_none());
        assert!(extract_eyes(&LandmarkResult::Face(Vec::new()), 640.0, 480.0).is_none());
    }

    #[test]
    fn empty_face_collection_is_no_face() {
        assert_eq!(LandmarkResult::from_faces(Vec::new()), LandmarkResult::NoFace);
        assert_eq!(
            LandmarkResult::from_faces(vec![Vec::new()]),
            LandmarkResult::NoFace
        );
    }

    #[test]
    fn deserializes_both_point_shapes() {
        let null: LandmarkResult = serde_json::from_str("null").unwrap();
        assert_eq!(null, LandmarkResult::NoFace);

        let empty: LandmarkResult = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, LandmarkResult::NoFace);

        let mixed: LandmarkResult =
            serde_json::from_str(r#"[[0.1, 0.2, 0.3], {"x": 0.4, "y": 0.5}, [0.6, 0.7]]"#)
                .unwrap();
        assert_eq!(
            mixed,
            LandmarkResult::Face(vec![
                Point3D::new(0.1, 0.2, 0.3),
                Point3D::new(0.4, 0.5, 0.0),
                Point3D::new(0.6, 0.7, 0.0),
            ])
        );

        assert!(serde_json::from_str::<LandmarkResult>("[[0.1]]").is_err());
    }
}
