use cgmath::{Deg, InnerSpace, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// World placement of a drawn model.
#[derive(Clone, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(default)]
pub struct Placement {
    pub position: [f32; 3],
    #[default([0.0, 1.0, 0.0])]
    pub rotation_axis: [f32; 3],
    /// Rotation about `rotation_axis`, in degrees.
    pub rotation_angle: f32,
    #[default([1.75; 3])]
    pub scale: [f32; 3],
}

impl Placement {
    /// Model transform which scales, then rotates, then translates.
    pub fn model_matrix(&self) -> Matrix4<f32> {
        let [sx, sy, sz] = self.scale;

        let scale = Matrix4::from_nonuniform_scale(sx, sy, sz);
        let translation = Matrix4::from_translation(Vector3::from(self.position));

        let rotation = match Vector3::from(self.rotation_axis) {
            axis if axis == Vector3::new(0.0, 0.0, 0.0) => Matrix4::from_scale(1.0),
            axis => Matrix4::from_axis_angle(axis.normalize(), Deg(self.rotation_angle)),
        };

        translation * rotation * scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn scale_applies_before_rotation_and_translation() {
        let placement = Placement {
            position: [0.0, 0.0, 5.0],
            rotation_axis: [0.0, 1.0, 0.0],
            rotation_angle: 90.0,
            scale: [2.0; 3],
        };

        let point = placement.model_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);

        let expected = Vector4::new(0.0, 0.0, 3.0, 1.0);

        assert!((point - expected).magnitude() < 1e-5, "{:?}", point);
    }

    #[test]
    fn zero_axis_means_no_rotation() {
        let placement = Placement {
            rotation_axis: [0.0; 3],
            rotation_angle: 45.0,
            scale: [1.0; 3],
            ..Placement::default()
        };

        assert_eq!(placement.model_matrix(), Matrix4::from_scale(1.0));
    }
}
