#![allow(dead_code)]

use image::codecs::hdr::HdrEncoder;
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbaImage};
use solstice::{
    Camera, Environment, EnvironmentSettings, Gl, Raster, RenderScale, Scene, SoftwareContext,
};
use std::io::Cursor;
use std::rc::Rc;

/// Encodes a radiance HDR file, with `pixel(x, y)` giving row 0 at the top.
pub fn encode_hdr(width: usize, height: usize, pixel: impl Fn(usize, usize) -> [f32; 3]) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height);

    for y in 0..height {
        for x in 0..width {
            pixels.push(Rgb(pixel(x, y)));
        }
    }

    let mut bytes = vec![];

    HdrEncoder::new(&mut bytes)
        .encode(&pixels, width, height)
        .unwrap();

    bytes
}

pub fn flat_hdr(value: f32) -> Vec<u8> {
    encode_hdr(16, 8, |_, _| [value; 3])
}

/// Bright sky over a black ground, split at the horizon.
pub fn horizon_hdr(sky: f32) -> Vec<u8> {
    encode_hdr(32, 16, |_, y| if y < 8 { [sky; 3] } else { [0.0; 3] })
}

pub fn encode_png(image: RgbaImage) -> Vec<u8> {
    let mut bytes = vec![];

    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();

    bytes
}

/// Small sizes and sample counts so the CPU kernels stay quick.
pub fn fast_settings() -> EnvironmentSettings {
    EnvironmentSettings {
        cubemap_size: 16,
        irradiance_size: 8,
        prefilter_size: 16,
        brdf_size: 16,
        irradiance_sample_delta: 0.1,
        prefilter_sample_count: 64,
        brdf_sample_count: 128,
    }
}

pub fn raster(width: u32, height: u32) -> Raster {
    Raster {
        width,
        height,
        scale: RenderScale::Full,
    }
}

pub fn context(width: usize, height: usize) -> (Rc<SoftwareContext>, Gl) {
    let context = Rc::new(SoftwareContext::new(width, height));
    let gl: Gl = context.clone();

    (context, gl)
}

pub fn environment(gl: &Gl, hdr: &[u8]) -> Rc<Environment> {
    let environment = Environment::from_memory(
        gl,
        "test.hdr",
        hdr,
        &fast_settings(),
        &Camera::default(),
        &raster(32, 16),
    )
    .unwrap();

    Rc::new(environment)
}

/// Scene sized for a 32x16 software screen with quick precomputation.
pub fn scene() -> Scene {
    let mut scene = Scene::default();

    *scene.environment = fast_settings();
    *scene.raster = raster(32, 16);

    scene
}
