use serde::{Deserialize, Serialize};

/// A point in the shared 3D session space, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A rigid transform: position plus unit quaternion `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3,
    pub rotation: [f32; 4],
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Point3::default(),
            rotation: [0.0, 0.0, 0.0, 1.0],
        }
    }

    pub fn at(position: Point3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
