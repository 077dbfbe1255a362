#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Color, Environment, Error, Gl, MaterialChannel, Texture, RGBA8};
use image::{imageops, ImageError};
use std::path::Path;
use std::rc::Rc;

/// One shading input of a material: a constant, optionally overridden by a
/// texture.
#[derive(Debug)]
pub struct Property {
    pub color: Color,
    texture: Option<Texture<RGBA8>>,
}

impl Property {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            texture: None,
        }
    }

    /// Whether the shader samples the texture instead of the constant.
    pub fn use_bitmap(&self) -> bool {
        self.texture.is_some()
    }

    pub fn texture(&self) -> Option<&Texture<RGBA8>> {
        self.texture.as_ref()
    }
}

/// Metal/roughness material bound to an environment's PBR shader.
#[derive(Debug)]
pub struct Material {
    environment: Rc<Environment>,
    properties: [Property; 7],
}

impl Material {
    /// Creates an untextured material. The `roughness` byte is read as
    /// smoothness when drawing, so 255 gives a mirror finish and 0 a fully
    /// rough one.
    pub fn new(
        environment: &Rc<Environment>,
        albedo: Color,
        metalness: u8,
        roughness: u8,
    ) -> Self {
        let material = Self {
            environment: Rc::clone(environment),
            properties: [
                Property::new(albedo),
                Property::new(Color::new(128, 128, 255, 255)),
                Property::new(Color::new(metalness, 0, 0, 0)),
                Property::new(Color::new(roughness, 0, 0, 0)),
                Property::new(Color::WHITE),
                Property::new(Color::new(0, 0, 0, 0)),
                Property::new(Color::new(0, 0, 0, 0)),
            ],
        };

        material.assign_texture_units();
        material
    }

    fn assign_texture_units(&self) {
        let shader = &self.environment.pbr_shader;

        for &channel in &MaterialChannel::ALL {
            shader.assign_texture_unit(channel.sampler_uniform(), channel.texture_unit());
        }
    }

    pub fn environment(&self) -> &Rc<Environment> {
        &self.environment
    }

    pub fn property(&self, channel: MaterialChannel) -> &Property {
        &self.properties[channel.index()]
    }

    pub fn property_mut(&mut self, channel: MaterialChannel) -> &mut Property {
        &mut self.properties[channel.index()]
    }

    /// Attaches a texture to a channel.
    ///
    /// A previously attached texture is handed back rather than released.
    pub fn set_texture(
        &mut self,
        channel: MaterialChannel,
        texture: Texture<RGBA8>,
    ) -> Option<Texture<RGBA8>> {
        self.properties[channel.index()].texture.replace(texture)
    }

    /// Detaches and releases the texture of a channel, if any.
    pub fn unset_texture(&mut self, channel: MaterialChannel) {
        if self.properties[channel.index()].texture.take().is_some() {
            debug!("released {:?} texture", channel);
        }
    }

    /// Decodes an image file and attaches it to a channel.
    pub fn load_texture(
        &mut self,
        channel: MaterialChannel,
        path: impl AsRef<Path>,
    ) -> Result<Option<Texture<RGBA8>>, Error> {
        let path = path.as_ref();

        let bytes = std::fs::read(path)
            .map_err(|error| Error::decode(path.display(), ImageError::IoError(error)))?;

        self.load_texture_from_memory(channel, &path.display().to_string(), &bytes)
    }

    /// Decodes an in-memory image file and attaches it to a channel.
    pub fn load_texture_from_memory(
        &mut self,
        channel: MaterialChannel,
        name: &str,
        bytes: &[u8],
    ) -> Result<Option<Texture<RGBA8>>, Error> {
        let texture = decode_texture(&self.environment.gl, name, bytes)?;

        info!("loaded {:?} texture `{}'", channel, name);

        Ok(self.set_texture(channel, texture))
    }

    /// Moves the material onto another environment, keeping its textures.
    pub fn rebind(&mut self, environment: &Rc<Environment>) {
        self.environment = Rc::clone(environment);
        self.assign_texture_units();
    }
}

/// Decodes a PNG, JPEG, BMP or TGA image into a bottom-up RGBA8 texture.
pub fn decode_texture(gl: &Gl, name: &str, bytes: &[u8]) -> Result<Texture<RGBA8>, Error> {
    let image = image::load_from_memory(bytes).map_err(|error| Error::decode(name, error))?;

    let mut image = image.into_rgba8();
    imageops::flip_vertical_in_place(&mut image);

    let (cols, rows) = image.dimensions();

    let mut texture = Texture::new(gl.clone());
    texture.upload(cols as usize, rows as usize, image.as_raw())?;

    Ok(texture)
}
