//! CPU reference implementation of the rendering context.

mod context;
pub mod kernels;
mod storage;

pub use context::{DrawRecord, SoftwareContext};
pub use storage::{cube_face_coordinates, cube_texel_direction};
