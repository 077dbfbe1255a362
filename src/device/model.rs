#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    AsVertexArray, Error, Gl, VertexArray, VertexArrayHandle, VertexAttribute,
    VertexAttributeKind, VertexLayout,
};
use std::f32::consts::PI;
use zerocopy::{AsBytes, FromBytes};

#[repr(C)]
#[derive(AsBytes, FromBytes, Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub texcoord: [f32; 2],
    pub tangent: [f32; 3],
}

impl VertexLayout for MeshVertex {
    const VERTEX_LAYOUT: &'static [VertexAttribute] = &[
        VertexAttribute::new(0, 0, VertexAttributeKind::Float3),
        VertexAttribute::new(1, 12, VertexAttributeKind::Float3),
        VertexAttribute::new(2, 24, VertexAttributeKind::Float2),
        VertexAttribute::new(3, 32, VertexAttributeKind::Float3),
    ];
}

/// A triangle list mesh resident on the GPU.
#[derive(Debug)]
pub struct Model {
    vertices: VertexArray<[MeshVertex]>,
}

impl Model {
    /// Uploads a non-indexed triangle list.
    pub fn new(gl: &Gl, vertices: &[MeshVertex]) -> Result<Self, Error> {
        let mut array = VertexArray::new(gl.clone());
        array.upload(vertices)?;

        debug!("uploaded model with {} triangles", vertices.len() / 3);

        Ok(Self { vertices: array })
    }

    /// Builds a sphere centered on the origin.
    pub fn uv_sphere(gl: &Gl, radius: f32, segments: u32, rings: u32) -> Result<Self, Error> {
        Self::new(gl, &uv_sphere_vertices(radius, segments, rings))
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.vertex_count()
    }
}

impl AsVertexArray for Model {
    fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertices.handle()
    }

    fn vertex_count(&self) -> usize {
        self.vertices.vertex_count()
    }
}

/// Triangle list of a latitude/longitude sphere.
///
/// Texture coordinates run bottom-up, matching textures uploaded with their
/// first row at the bottom.
pub fn uv_sphere_vertices(radius: f32, segments: u32, rings: u32) -> Vec<MeshVertex> {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let vertex = |ring: u32, segment: u32| {
        let phi = ring as f32 * PI / rings as f32;
        let theta = segment as f32 * 2.0 * PI / segments as f32;

        let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];

        MeshVertex {
            position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
            normal,
            texcoord: [
                segment as f32 / segments as f32,
                1.0 - ring as f32 / rings as f32,
            ],
            tangent: [-theta.sin(), 0.0, theta.cos()],
        }
    };

    let mut vertices = Vec::with_capacity((segments * rings * 6) as usize);

    for ring in 0..rings {
        for segment in 0..segments {
            let (a, b) = (vertex(ring, segment), vertex(ring + 1, segment));
            let (c, d) = (vertex(ring, segment + 1), vertex(ring + 1, segment + 1));

            vertices.extend_from_slice(&[a, b, c, c, b, d]);
        }
    }

    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_vertices_lie_on_the_surface() {
        let vertices = uv_sphere_vertices(2.0, 16, 8);

        assert_eq!(vertices.len(), 16 * 8 * 6);

        for vertex in &vertices {
            let [x, y, z] = vertex.position;
            let length = (x * x + y * y + z * z).sqrt();

            assert!((length - 2.0).abs() < 1e-4);
            assert!(vertex.texcoord.iter().all(|t| (0.0..=1.0).contains(t)));
        }
    }

    #[test]
    fn layout_matches_vertex_size() {
        let last = MeshVertex::VERTEX_LAYOUT.last().unwrap();

        assert_eq!(
            last.offset + 4 * last.kind.components(),
            std::mem::size_of::<MeshVertex>()
        );
    }
}
