#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    AsAttachment, AsBindTarget, BindTarget, Error, Filter, Gl, ImageTarget, PixelFormat,
    TextureData, TextureHandle, TextureKind, Wrap,
};
use std::marker::PhantomData;

pub trait Boolean {
    const VALUE: bool;
}

pub struct True;
pub struct False;

impl Boolean for True {
    const VALUE: bool = true;
}
impl Boolean for False {
    const VALUE: bool = false;
}

pub trait RenderTarget {}

pub struct ColorAttachment;
pub struct NotRenderable;

impl RenderTarget for ColorAttachment {}
impl RenderTarget for NotRenderable {}

/// 2D texture with a statically known pixel format.
#[derive(Debug)]
pub struct Texture<T> {
    gl: Gl,

    handle: Option<TextureHandle>,
    layout: (usize, usize),
    wrap: Wrap,
    format: PhantomData<T>,
}

impl<T> Texture<T> {
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            handle: None,
            layout: (0, 0),
            wrap: Wrap::Repeat,
            format: PhantomData,
        }
    }

    /// Sets the wrap mode used when the texture storage is next created.
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn cols(&self) -> usize {
        self.layout.0
    }

    pub fn rows(&self) -> usize {
        self.layout.1
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    pub fn is_invalid(&self) -> bool {
        self.handle.is_none()
    }

    pub fn reset(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.gl.delete_texture(handle);
        }

        self.layout = (0, 0);
    }
}

impl<T: TextureFormat> Texture<T> {
    pub fn create(&mut self, cols: usize, rows: usize) -> Result<(), Error> {
        assert!(cols > 0 && rows > 0, "invalid texture layout requested");

        if self.layout == (cols, rows) && self.handle.is_some() {
            return Ok(()); // texture already created
        }

        self.reset();

        let handle = self.gl.create_texture()?;
        self.handle = Some(handle);

        self.gl
            .allocate_texture(handle, TextureKind::Flat, T::FORMAT, 1, cols, rows)?;

        let filter = filter_mode_for_format::<T>();

        self.gl
            .set_texture_sampling(handle, TextureKind::Flat, filter, filter, self.wrap);

        self.layout = (cols, rows);

        Ok(())
    }

    pub fn upload(&mut self, cols: usize, rows: usize, data: &[T::Data]) -> Result<(), Error> {
        assert_eq!(data.len(), cols * rows * T::FORMAT.channels());

        self.create(cols, rows)?;

        if let Some(handle) = self.handle {
            self.gl.upload_texture(
                handle,
                ImageTarget::Flat,
                0,
                cols,
                rows,
                T::texture_data(data),
            )?;
        }

        Ok(())
    }

    /// Reads back the texture contents as RGBA floats, bottom row first.
    pub fn read(&self) -> Result<Vec<f32>, Error> {
        match self.handle {
            Some(handle) => self.gl.read_texture(handle, ImageTarget::Flat, 0),
            None => Ok(vec![]),
        }
    }
}

/// Cubemap texture with a statically known pixel format and a mip chain.
#[derive(Debug)]
pub struct Cubemap<T> {
    gl: Gl,

    handle: Option<TextureHandle>,
    layout: (usize, usize),
    format: PhantomData<T>,
}

impl<T> Cubemap<T> {
    pub fn new(gl: Gl) -> Self {
        Self {
            gl,
            handle: None,
            layout: (0, 0),
            format: PhantomData,
        }
    }

    pub fn size(&self) -> usize {
        self.layout.0
    }

    pub fn levels(&self) -> usize {
        self.layout.1
    }

    /// Returns the face dimension at a given mip level.
    pub fn size_at_level(&self, level: usize) -> usize {
        (self.size() >> level).max(1)
    }

    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    pub fn reset(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.gl.delete_texture(handle);
        }

        self.layout = (0, 0);
    }
}

impl<T: TextureFormat> Cubemap<T> {
    pub fn create(&mut self, size: usize, levels: usize) -> Result<(), Error> {
        assert!(size > 0 && levels > 0, "invalid cubemap layout requested");

        if self.layout == (size, levels) && self.handle.is_some() {
            return Ok(());
        }

        self.reset();

        let handle = self.gl.create_texture()?;
        self.handle = Some(handle);

        self.gl
            .allocate_texture(handle, TextureKind::Cube, T::FORMAT, levels, size, size)?;

        let mag_filter = filter_mode_for_format::<T>();

        let min_filter = if levels > 1 && T::Filterable::VALUE {
            Filter::LinearMipmapLinear
        } else {
            mag_filter
        };

        self.gl.set_texture_sampling(
            handle,
            TextureKind::Cube,
            min_filter,
            mag_filter,
            Wrap::ClampToEdge,
        );

        self.layout = (size, levels);

        Ok(())
    }

    /// Reads back one face of one mip level as RGBA floats.
    pub fn read_face(&self, face: crate::CubeFace, level: usize) -> Result<Vec<f32>, Error> {
        assert!(level < self.levels());

        match self.handle {
            Some(handle) => self.gl.read_texture(handle, face.into(), level),
            None => Ok(vec![]),
        }
    }
}

fn filter_mode_for_format<T: TextureFormat>() -> Filter {
    if T::Filterable::VALUE {
        Filter::Linear
    } else {
        Filter::Nearest
    }
}

impl<T: TextureFormat> AsAttachment for Texture<T> {
    type Target = T::Renderable;

    fn as_attachment(&self) -> Option<TextureHandle> {
        self.handle
    }

    fn attachment_dimensions(&self, level: usize) -> (usize, usize) {
        ((self.cols() >> level).max(1), (self.rows() >> level).max(1))
    }
}

impl<T: TextureFormat> AsAttachment for Cubemap<T> {
    type Target = T::Renderable;

    fn as_attachment(&self) -> Option<TextureHandle> {
        self.handle
    }

    fn attachment_dimensions(&self, level: usize) -> (usize, usize) {
        (self.size_at_level(level), self.size_at_level(level))
    }
}

impl<T: TextureFormat> AsBindTarget for Texture<T> {
    fn bind_target(&self) -> BindTarget {
        BindTarget::Texture(self.handle, TextureKind::Flat)
    }
}

impl<T: TextureFormat> AsBindTarget for Cubemap<T> {
    fn bind_target(&self) -> BindTarget {
        BindTarget::Texture(self.handle, TextureKind::Cube)
    }
}

impl<T> Drop for Texture<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.gl.delete_texture(handle);
        }
    }
}

impl<T> Drop for Cubemap<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle {
            self.gl.delete_texture(handle);
        }
    }
}

pub trait TextureFormat {
    type Data;
    type Filterable: Boolean;
    type Renderable: RenderTarget;

    const FORMAT: PixelFormat;

    fn texture_data(data: &[Self::Data]) -> TextureData;
}

#[derive(Debug)]
pub struct RGB32F;
#[derive(Debug)]
pub struct RGBA16F;
#[derive(Debug)]
pub struct RG16F;
#[derive(Debug)]
pub struct RGBA8;

impl TextureFormat for RGB32F {
    type Data = f32;
    type Filterable = False;
    type Renderable = NotRenderable;

    const FORMAT: PixelFormat = PixelFormat::RGB32F;

    fn texture_data(data: &[f32]) -> TextureData {
        TextureData::F32(data)
    }
}

impl TextureFormat for RGBA16F {
    type Data = u16;
    type Filterable = True;
    type Renderable = ColorAttachment;

    const FORMAT: PixelFormat = PixelFormat::RGBA16F;

    fn texture_data(data: &[u16]) -> TextureData {
        TextureData::F16(data)
    }
}

impl TextureFormat for RG16F {
    type Data = u16;
    type Filterable = True;
    type Renderable = ColorAttachment;

    const FORMAT: PixelFormat = PixelFormat::RG16F;

    fn texture_data(data: &[u16]) -> TextureData {
        TextureData::F16(data)
    }
}

impl TextureFormat for RGBA8 {
    type Data = u8;
    type Filterable = True;
    type Renderable = ColorAttachment;

    const FORMAT: PixelFormat = PixelFormat::RGBA8;

    fn texture_data(data: &[u8]) -> TextureData {
        TextureData::U8(data)
    }
}
