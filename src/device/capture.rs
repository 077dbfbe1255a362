use crate::{CubeFace, VertexAttribute, VertexAttributeKind, VertexLayout};
use cgmath::{Deg, Matrix4, Point3, Vector3};
use zerocopy::{AsBytes, FromBytes};

#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy, Debug)]
pub struct CubeVertex {
    pub position: [f32; 3],
}

impl VertexLayout for CubeVertex {
    const VERTEX_LAYOUT: &'static [VertexAttribute] =
        &[VertexAttribute::new(0, 0, VertexAttributeKind::Float3)];
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy, Debug)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
}

impl VertexLayout for QuadVertex {
    const VERTEX_LAYOUT: &'static [VertexAttribute] = &[
        VertexAttribute::new(0, 0, VertexAttributeKind::Float3),
        VertexAttribute::new(1, 12, VertexAttributeKind::Float2),
    ];
}

/// The 36 vertices of the [-1, 1] cube, wound counter-clockwise outwards.
pub fn unit_cube() -> Vec<CubeVertex> {
    // two triangles per face, as (corner, corner, corner) index triples
    const CORNERS: [[f32; 3]; 8] = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ];

    const FACES: [[usize; 6]; 6] = [
        [0, 3, 2, 2, 1, 0],
        [4, 5, 6, 6, 7, 4],
        [7, 3, 0, 0, 4, 7],
        [6, 5, 1, 1, 2, 6],
        [0, 1, 5, 5, 4, 0],
        [3, 7, 6, 6, 2, 3],
    ];

    FACES
        .iter()
        .flatten()
        .map(|&corner| CubeVertex {
            position: CORNERS[corner],
        })
        .collect()
}

/// Full-screen quad drawn as a triangle strip.
pub fn unit_quad() -> [QuadVertex; 4] {
    [
        QuadVertex {
            position: [-1.0, 1.0, 0.0],
            texcoord: [0.0, 1.0],
        },
        QuadVertex {
            position: [-1.0, -1.0, 0.0],
            texcoord: [0.0, 0.0],
        },
        QuadVertex {
            position: [1.0, 1.0, 0.0],
            texcoord: [1.0, 1.0],
        },
        QuadVertex {
            position: [1.0, -1.0, 0.0],
            texcoord: [1.0, 0.0],
        },
    ]
}

/// Square projection and the six look-at views used to render cubemap faces
/// from the origin.
#[derive(Clone, Copy, Debug)]
pub struct CaptureViews {
    pub projection: Matrix4<f32>,
    views: [Matrix4<f32>; 6],
}

impl CaptureViews {
    pub fn new() -> Self {
        let origin = Point3::new(0.0, 0.0, 0.0);

        let view = |face: CubeFace| {
            let (center, up) = match face {
                CubeFace::PositiveX => ([1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
                CubeFace::NegativeX => ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
                CubeFace::PositiveY => ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
                CubeFace::NegativeY => ([0.0, -1.0, 0.0], [0.0, 0.0, -1.0]),
                CubeFace::PositiveZ => ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
                CubeFace::NegativeZ => ([0.0, 0.0, -1.0], [0.0, -1.0, 0.0]),
            };

            Matrix4::look_at(origin, Point3::from(center), Vector3::from(up))
        };

        Self {
            projection: cgmath::perspective(Deg(90.0), 1.0, 0.01, 1000.0),
            views: [
                view(CubeFace::PositiveX),
                view(CubeFace::NegativeX),
                view(CubeFace::PositiveY),
                view(CubeFace::NegativeY),
                view(CubeFace::PositiveZ),
                view(CubeFace::NegativeZ),
            ],
        }
    }

    pub fn view(&self, face: CubeFace) -> Matrix4<f32> {
        self.views[face.index()]
    }
}

impl Default for CaptureViews {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "software"))]
mod tests {
    use super::*;
    use crate::software::{cube_face_coordinates, cube_texel_direction};
    use cgmath::{InnerSpace, Matrix, Matrix3};

    #[test]
    fn captured_pixels_land_on_the_sampled_face_texel() {
        let views = CaptureViews::new();

        for &face in &CubeFace::ALL {
            let view = views.view(face);
            let rotation =
                Matrix3::from_cols(view.x.truncate(), view.y.truncate(), view.z.truncate())
                    .transpose();

            // pixel (1, 6) of an 8x8 face, unprojected through the capture camera
            let (ndc_x, ndc_y) = (2.0 * 1.5 / 8.0 - 1.0, 2.0 * 6.5 / 8.0 - 1.0);
            let direction = rotation * Vector3::new(ndc_x, ndc_y, -1.0);

            let (hit, _, _) = cube_face_coordinates(direction);
            let expected = cube_texel_direction(face, 1, 6, 8);

            assert_eq!(hit, face);
            assert!((direction.normalize() - expected.normalize()).magnitude() < 1e-5);
        }
    }

    #[test]
    fn cube_has_six_faces_of_two_triangles() {
        let cube = unit_cube();

        assert_eq!(cube.len(), 36);
        assert!(cube.iter().all(|v| v.position.iter().all(|c| c.abs() == 1.0)));
    }
}
