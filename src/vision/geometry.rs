use serde::{Deserialize, Serialize};

/// 像素坐标系中的二维点
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        distance(self, other)
    }
}

/// 归一化到 [0,1] 的三维关键点（模型原始输出）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Point3D {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 按帧尺寸缩放到像素坐标，丢弃深度
    pub fn to_pixel(&self, width: f64, height: f64) -> Point2D {
        Point2D::new(self.x * width, self.y * height)
    }
}

/// 欧氏距离
pub fn distance(a: &Point2D, b: &Point2D) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}
