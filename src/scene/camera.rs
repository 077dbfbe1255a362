use cgmath::{Deg, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

#[derive(Clone, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(default)]
pub struct Camera {
    #[default([3.5, 3.0, 3.5])]
    pub position: [f32; 3],

    #[default([0.0, 0.5, 0.0])]
    pub target: [f32; 3],

    #[default([0.0, 1.0, 0.0])]
    pub up_vector: [f32; 3],

    /// Vertical field of view, in degrees.
    #[default(60.0)]
    pub field_of_view: f32,

    #[default(0.01)]
    pub near_plane: f32,

    #[default(1000.0)]
    pub far_plane: f32,
}

impl Camera {
    /// Right-handed look-at view transform.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at(
            Point3::from(self.position),
            Point3::from(self.target),
            Vector3::from(self.up_vector),
        )
    }

    pub fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        cgmath::perspective(
            Deg(self.field_of_view),
            aspect,
            self.near_plane,
            self.far_plane,
        )
    }
}
