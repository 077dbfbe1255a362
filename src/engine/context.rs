use crate::Error;
use std::fmt::Debug;
use std::num::NonZeroU32;
use std::rc::Rc;

/// Shared handle to the host rendering context.
pub type Gl = Rc<dyn Context>;

macro_rules! handle {
    ($( $(#[$meta:meta])* $name:ident ),* $(,)*) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
            pub struct $name(NonZeroU32);

            impl $name {
                pub fn new(id: u32) -> Option<Self> {
                    NonZeroU32::new(id).map(Self)
                }

                pub fn get(self) -> u32 {
                    self.0.get()
                }
            }
        )*
    };
}

handle![
    /// Opaque texture object handle.
    TextureHandle,
    /// Opaque framebuffer object handle.
    FramebufferHandle,
    /// Opaque depth renderbuffer handle.
    RenderbufferHandle,
    /// Opaque linked shader program handle.
    ProgramHandle,
    /// Opaque vertex array (with its backing buffer) handle.
    VertexArrayHandle,
    /// Location of a named uniform within a particular program.
    UniformLocation,
];

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum TextureKind {
    Flat,
    Cube,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Index of the face in the conventional +X, -X, +Y, -Y, +Z, -Z order.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A single image of a texture, i.e. the 2D image or one cubemap face.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ImageTarget {
    Flat,
    Face(CubeFace),
}

impl From<CubeFace> for ImageTarget {
    fn from(face: CubeFace) -> Self {
        Self::Face(face)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PixelFormat {
    RGB32F,
    RGBA16F,
    RG16F,
    RGBA8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            Self::RGB32F => 3,
            Self::RGBA16F | Self::RGBA8 => 4,
            Self::RG16F => 2,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::RGB32F => 12,
            Self::RGBA16F => 8,
            Self::RG16F => 4,
            Self::RGBA8 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Filter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Wrap {
    Repeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Primitive {
    Triangles,
    TriangleStrip,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DepthFunction {
    Less,
    LessEqual,
}

/// Raw texel data in the layout expected by a pixel format.
#[derive(Clone, Copy, Debug)]
pub enum TextureData<'a> {
    U8(&'a [u8]),
    F16(&'a [u16]),
    F32(&'a [f32]),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for UniformValue {
    fn from(value: bool) -> Self {
        Self::Int(value as i32)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        Self::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        Self::Vec4(value)
    }
}

impl From<cgmath::Vector3<f32>> for UniformValue {
    fn from(value: cgmath::Vector3<f32>) -> Self {
        Self::Vec3(value.into())
    }
}

impl From<cgmath::Point3<f32>> for UniformValue {
    fn from(value: cgmath::Point3<f32>) -> Self {
        Self::Vec3(value.into())
    }
}

impl From<cgmath::Matrix4<f32>> for UniformValue {
    fn from(value: cgmath::Matrix4<f32>) -> Self {
        let array: &[f32; 16] = value.as_ref();
        Self::Mat4(*array)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VertexAttributeKind {
    Float2,
    Float3,
    Float4,
}

impl VertexAttributeKind {
    pub fn components(self) -> usize {
        match self {
            Self::Float2 => 2,
            Self::Float3 => 3,
            Self::Float4 => 4,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VertexAttribute {
    pub kind: VertexAttributeKind,
    pub index: usize,
    pub offset: usize,
}

impl VertexAttribute {
    pub const fn new(index: usize, offset: usize, kind: VertexAttributeKind) -> Self {
        Self {
            kind,
            index,
            offset,
        }
    }
}

/// Host rendering runtime.
///
/// This is the complete set of GPU capabilities the environment pipeline and
/// frame renderer consume. Implementations track the usual GL binding state:
/// an active texture unit, per-unit texture bindings, a current program, a
/// bound draw framebuffer and a viewport.
pub trait Context: Debug {
    /// Version and precision preamble prepended to every shader source.
    fn shader_preamble(&self) -> &'static str;

    fn create_texture(&self) -> Result<TextureHandle, Error>;
    fn delete_texture(&self, texture: TextureHandle);

    /// Allocates immutable storage for all levels (and faces) of a texture.
    fn allocate_texture(
        &self,
        texture: TextureHandle,
        kind: TextureKind,
        format: PixelFormat,
        levels: usize,
        cols: usize,
        rows: usize,
    ) -> Result<(), Error>;

    fn upload_texture(
        &self,
        texture: TextureHandle,
        target: ImageTarget,
        level: usize,
        cols: usize,
        rows: usize,
        data: TextureData,
    ) -> Result<(), Error>;

    fn set_texture_sampling(
        &self,
        texture: TextureHandle,
        kind: TextureKind,
        min_filter: Filter,
        mag_filter: Filter,
        wrap: Wrap,
    );

    /// Reads back one texture image as tightly packed RGBA floats.
    fn read_texture(
        &self,
        texture: TextureHandle,
        target: ImageTarget,
        level: usize,
    ) -> Result<Vec<f32>, Error>;

    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, kind: TextureKind, texture: Option<TextureHandle>);
    fn texture_binding(&self, unit: u32, kind: TextureKind) -> Option<TextureHandle>;

    fn create_framebuffer(&self) -> Result<FramebufferHandle, Error>;
    fn delete_framebuffer(&self, framebuffer: FramebufferHandle);
    fn bind_framebuffer(&self, framebuffer: Option<FramebufferHandle>);

    /// Attaches a color image to the currently bound framebuffer.
    fn attach_texture(&self, texture: Option<TextureHandle>, target: ImageTarget, level: usize);

    fn create_renderbuffer(&self) -> Result<RenderbufferHandle, Error>;
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferHandle);

    /// Allocates 24-bit depth storage for a renderbuffer.
    fn allocate_renderbuffer(
        &self,
        renderbuffer: RenderbufferHandle,
        cols: usize,
        rows: usize,
    ) -> Result<(), Error>;

    /// Attaches a depth renderbuffer to the currently bound framebuffer.
    fn attach_renderbuffer(&self, renderbuffer: Option<RenderbufferHandle>);

    /// Returns an error describing why the bound framebuffer is incomplete.
    fn check_framebuffer(&self) -> Result<(), Error>;

    fn viewport(&self, x: i32, y: i32, w: i32, h: i32);
    fn clear(&self, color: [f32; 4]);

    fn set_depth_function(&self, function: DepthFunction);
    fn set_face_culling(&self, enabled: bool);

    /// Compiles and links a program, returning the build log on failure.
    fn create_program(
        &self,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) -> Result<ProgramHandle, Error>;

    fn delete_program(&self, program: ProgramHandle);
    fn use_program(&self, program: Option<ProgramHandle>);
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Sets a uniform of the program currently in use.
    fn set_uniform(&self, location: UniformLocation, value: UniformValue);
    fn uniform_value(&self, program: ProgramHandle, location: UniformLocation)
        -> Option<UniformValue>;

    fn create_vertex_array(
        &self,
        data: &[u8],
        stride: usize,
        layout: &[VertexAttribute],
    ) -> Result<VertexArrayHandle, Error>;

    fn delete_vertex_array(&self, vertex_array: VertexArrayHandle);

    fn draw(&self, vertex_array: VertexArrayHandle, primitive: Primitive, first: usize, count: usize);

    /// Reads back the default framebuffer as RGBA8, bottom row first.
    fn read_screen(&self, cols: usize, rows: usize) -> Result<Vec<u8>, Error>;
}
