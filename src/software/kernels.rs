//! CPU counterparts of the precomputation, sky and post-processing fragment
//! shaders.

use super::storage::{Texel, TextureStorage};
use crate::{TextureKind, UniformValue};
use cgmath::{InnerSpace, Matrix, Matrix3, Matrix4, Vector3};
use std::collections::HashMap;
use std::f32::consts::PI;

/// Fragment programs the software context knows how to execute.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kernel {
    Equirectangular,
    Irradiance,
    Prefilter,
    Brdf,
    Skybox,
    PostFx,
}

impl Kernel {
    /// Maps a program name to its kernel, if any.
    pub fn for_program(name: &str) -> Option<Self> {
        match name {
            "equirectangular" => Some(Self::Equirectangular),
            "irradiance" => Some(Self::Irradiance),
            "prefilter" => Some(Self::Prefilter),
            "brdf" => Some(Self::Brdf),
            "skybox" => Some(Self::Skybox),
            "postfx" => Some(Self::PostFx),
            _ => None,
        }
    }
}

/// Uniforms and sampler bindings visible to a kernel during one draw.
pub struct Bindings<'a> {
    pub uniforms: &'a HashMap<String, UniformValue>,
    pub textures: &'a HashMap<u32, TextureStorage>,
    pub units: &'a HashMap<(u32, TextureKind), u32>,
}

impl<'a> Bindings<'a> {
    fn float(&self, name: &str, default: f32) -> f32 {
        match self.uniforms.get(name) {
            Some(UniformValue::Float(value)) => *value,
            _ => default,
        }
    }

    fn int(&self, name: &str, default: i32) -> i32 {
        match self.uniforms.get(name) {
            Some(UniformValue::Int(value)) => *value,
            _ => default,
        }
    }

    fn vec2(&self, name: &str, default: [f32; 2]) -> [f32; 2] {
        match self.uniforms.get(name) {
            Some(UniformValue::Vec2(value)) => *value,
            _ => default,
        }
    }

    fn mat4(&self, name: &str) -> Matrix4<f32> {
        match self.uniforms.get(name) {
            Some(UniformValue::Mat4(m)) => Matrix4::new(
                m[0], m[1], m[2], m[3], m[4], m[5], m[6], m[7], m[8], m[9], m[10], m[11], m[12],
                m[13], m[14], m[15],
            ),
            _ => Matrix4::from_scale(1.0),
        }
    }

    fn sampler(&self, name: &str, kind: TextureKind) -> Option<&'a TextureStorage> {
        let unit = self.int(name, 0) as u32;
        let handle = self.units.get(&(unit, kind))?;
        let storage = self.textures.get(handle)?;

        if storage.kind == kind {
            Some(storage)
        } else {
            None
        }
    }

    /// World-space direction through a pixel center, as seen by the cubemap
    /// and skybox vertex shaders with the view translation removed.
    fn view_ray(&self) -> impl Fn(f32, f32) -> Vector3<f32> {
        let projection = self.mat4("projection");
        let view = self.mat4("view");

        let rotation = Matrix3::from_cols(
            view.x.truncate(),
            view.y.truncate(),
            view.z.truncate(),
        )
        .transpose();

        let (sx, sy) = (projection.x.x, projection.y.y);

        move |ndc_x, ndc_y| (rotation * Vector3::new(ndc_x / sx, ndc_y / sy, -1.0)).normalize()
    }
}

/// Shades every pixel of a `cols` by `rows` target, bottom row first.
///
/// Returns `None` when a sampler required by the kernel is not bound.
pub fn shade(kernel: Kernel, bindings: &Bindings, cols: usize, rows: usize) -> Option<Vec<Texel>> {
    let ndc = |x: usize, y: usize| {
        (
            (x as f32 + 0.5) / cols as f32 * 2.0 - 1.0,
            (y as f32 + 0.5) / rows as f32 * 2.0 - 1.0,
        )
    };

    let mut output = Vec::with_capacity(cols * rows);

    match kernel {
        Kernel::Equirectangular => {
            let panorama = bindings.sampler("equirectangularMap", TextureKind::Flat)?;
            let ray = bindings.view_ray();

            for y in 0..rows {
                for x in 0..cols {
                    let (u, v) = ndc(x, y);
                    let texel = panorama.sample_2d(equirectangular_uv(ray(u, v)));
                    output.push([texel[0], texel[1], texel[2], 1.0]);
                }
            }
        }
        Kernel::Irradiance => {
            let environment = bindings.sampler("environmentMap", TextureKind::Cube)?;
            let delta = bindings.float("sampleDelta", 0.025);
            let ray = bindings.view_ray();

            for y in 0..rows {
                for x in 0..cols {
                    let (u, v) = ndc(x, y);
                    let [r, g, b] = irradiance(environment, ray(u, v), delta);
                    output.push([r, g, b, 1.0]);
                }
            }
        }
        Kernel::Prefilter => {
            let environment = bindings.sampler("environmentMap", TextureKind::Cube)?;
            let roughness = bindings.float("roughness", 0.0);
            let samples = bindings.int("sampleCount", 1024).max(1) as u32;
            let ray = bindings.view_ray();

            for y in 0..rows {
                for x in 0..cols {
                    let (u, v) = ndc(x, y);
                    let [r, g, b] = prefilter(environment, ray(u, v), roughness, samples);
                    output.push([r, g, b, 1.0]);
                }
            }
        }
        Kernel::Brdf => {
            let samples = bindings.int("sampleCount", 1024).max(1) as u32;

            for y in 0..rows {
                for x in 0..cols {
                    let n_dot_v = (x as f32 + 0.5) / cols as f32;
                    let roughness = (y as f32 + 0.5) / rows as f32;
                    let [scale, bias] = integrate_brdf(n_dot_v, roughness, samples);
                    output.push([scale, bias, 0.0, 1.0]);
                }
            }
        }
        Kernel::Skybox => {
            let environment = bindings.sampler("environmentMap", TextureKind::Cube)?;
            let lod = bindings.float("skyLod", 0.0);
            let ray = bindings.view_ray();

            for y in 0..rows {
                for x in 0..cols {
                    let (u, v) = ndc(x, y);
                    let texel = environment.sample_cube(ray(u, v), lod);
                    let color = [texel[0], texel[1], texel[2]];
                    let [r, g, b] = tone_map(color);
                    output.push([r, g, b, 1.0]);
                }
            }
        }
        Kernel::PostFx => {
            let scene = bindings.sampler("sceneTexture", TextureKind::Flat)?;
            let [width, height] = bindings.vec2("resolution", [cols as f32, rows as f32]);
            let texel = [1.0 / width.max(1.0), 1.0 / height.max(1.0)];

            let effects = PostEffects {
                fxaa: bindings.int("enabledFxaa", 0) != 0,
                bloom: bindings.int("enabledBloom", 0) != 0,
                vignette: bindings.int("enabledVignette", 0) != 0,
            };

            for y in 0..rows {
                for x in 0..cols {
                    let uv = [(x as f32 + 0.5) / cols as f32, (y as f32 + 0.5) / rows as f32];
                    let [r, g, b] = post_process(scene, uv, texel, effects);
                    output.push([r, g, b, 1.0]);
                }
            }
        }
    }

    Some(output)
}

/// Panorama coordinates of a direction, with `v = 0` at the bottom row.
pub fn equirectangular_uv(direction: Vector3<f32>) -> [f32; 2] {
    const INV_ATAN: [f32; 2] = [0.1591, 0.3183];

    let d = direction.normalize();

    [
        d.z.atan2(d.x) * INV_ATAN[0] + 0.5,
        d.y.max(-1.0).min(1.0).asin() * INV_ATAN[1] + 0.5,
    ]
}

/// Reinhard tone mapping followed by gamma encoding.
pub fn tone_map(color: [f32; 3]) -> [f32; 3] {
    let encode = |x: f32| (x / (x + 1.0)).max(0.0).powf(1.0 / 2.2);

    [encode(color[0]), encode(color[1]), encode(color[2])]
}

/// Effects toggled in the post-processing pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct PostEffects {
    pub fxaa: bool,
    pub bloom: bool,
    pub vignette: bool,
}

const FXAA_SPAN_MAX: f32 = 8.0;
const FXAA_REDUCE_MUL: f32 = 1.0 / 8.0;
const FXAA_REDUCE_MIN: f32 = 1.0 / 128.0;

const BLOOM_RADIUS: i32 = 4;
const BLOOM_THRESHOLD: f32 = 0.7;
const BLOOM_INTENSITY: f32 = 0.4;

const VIGNETTE_INNER: f32 = 0.45;
const VIGNETTE_OUTER: f32 = 0.8;
const VIGNETTE_STRENGTH: f32 = 0.5;

fn luma(color: [f32; 3]) -> f32 {
    color[0] * 0.299 + color[1] * 0.587 + color[2] * 0.114
}

fn fetch(scene: &TextureStorage, uv: [f32; 2]) -> [f32; 3] {
    let texel = scene.sample_2d(uv);
    [texel[0], texel[1], texel[2]]
}

fn mix(a: [f32; 3], b: [f32; 3], wa: f32, wb: f32) -> [f32; 3] {
    [
        a[0] * wa + b[0] * wb,
        a[1] * wa + b[1] * wb,
        a[2] * wa + b[2] * wb,
    ]
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).max(0.0).min(1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fast approximate anti-aliasing along the local luma gradient.
pub fn fxaa(scene: &TextureStorage, uv: [f32; 2], texel: [f32; 2]) -> [f32; 3] {
    let at = |dx: f32, dy: f32| fetch(scene, [uv[0] + dx * texel[0], uv[1] + dy * texel[1]]);

    let luma_nw = luma(at(-1.0, -1.0));
    let luma_ne = luma(at(1.0, -1.0));
    let luma_sw = luma(at(-1.0, 1.0));
    let luma_se = luma(at(1.0, 1.0));
    let luma_m = luma(at(0.0, 0.0));

    let luma_min = luma_m.min(luma_nw.min(luma_ne).min(luma_sw.min(luma_se)));
    let luma_max = luma_m.max(luma_nw.max(luma_ne).max(luma_sw.max(luma_se)));

    let dir = [
        -((luma_nw + luma_ne) - (luma_sw + luma_se)),
        (luma_nw + luma_sw) - (luma_ne + luma_se),
    ];

    let dir_reduce =
        ((luma_nw + luma_ne + luma_sw + luma_se) * 0.25 * FXAA_REDUCE_MUL).max(FXAA_REDUCE_MIN);
    let rcp_dir_min = 1.0 / (dir[0].abs().min(dir[1].abs()) + dir_reduce);

    let span = |d: f32| (d * rcp_dir_min).max(-FXAA_SPAN_MAX).min(FXAA_SPAN_MAX);
    let dir = [span(dir[0]), span(dir[1])];

    let along = |k: f32| at(dir[0] * k, dir[1] * k);

    let rgb_a = mix(along(1.0 / 3.0 - 0.5), along(2.0 / 3.0 - 0.5), 0.5, 0.5);
    let rgb_b = mix(rgb_a, mix(along(-0.5), along(0.5), 1.0, 1.0), 0.5, 0.25);

    let luma_b = luma(rgb_b);

    if luma_b < luma_min || luma_b > luma_max {
        rgb_a
    } else {
        rgb_b
    }
}

/// Box-filtered glow of the texels brighter than the bloom threshold.
pub fn bloom(scene: &TextureStorage, uv: [f32; 2], texel: [f32; 2]) -> [f32; 3] {
    let mut sum = [0.0f32; 3];

    for y in -BLOOM_RADIUS..=BLOOM_RADIUS {
        for x in -BLOOM_RADIUS..=BLOOM_RADIUS {
            let offset = [uv[0] + x as f32 * texel[0], uv[1] + y as f32 * texel[1]];
            let color = fetch(scene, offset);

            for c in 0..3 {
                sum[c] += (color[c] - BLOOM_THRESHOLD).max(0.0);
            }
        }
    }

    let taps = ((2 * BLOOM_RADIUS + 1) * (2 * BLOOM_RADIUS + 1)) as f32;
    let scale = BLOOM_INTENSITY / taps;

    [sum[0] * scale, sum[1] * scale, sum[2] * scale]
}

/// Radial darkening factor towards the corners of the screen.
pub fn vignette(uv: [f32; 2]) -> f32 {
    let d = ((uv[0] - 0.5).powi(2) + (uv[1] - 0.5).powi(2)).sqrt();

    1.0 - smoothstep(VIGNETTE_INNER, VIGNETTE_OUTER, d) * VIGNETTE_STRENGTH
}

pub fn post_process(
    scene: &TextureStorage,
    uv: [f32; 2],
    texel: [f32; 2],
    effects: PostEffects,
) -> [f32; 3] {
    let mut color = if effects.fxaa {
        fxaa(scene, uv, texel)
    } else {
        fetch(scene, uv)
    };

    if effects.bloom {
        color = mix(color, bloom(scene, uv, texel), 1.0, 1.0);
    }

    if effects.vignette {
        let factor = vignette(uv);
        color = [color[0] * factor, color[1] * factor, color[2] * factor];
    }

    let clamp = |x: f32| x.max(0.0).min(1.0);

    [clamp(color[0]), clamp(color[1]), clamp(color[2])]
}

pub fn radical_inverse(mut bits: u32) -> f32 {
    bits = bits.rotate_left(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xAAAA_AAAA) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xCCCC_CCCC) >> 2);
    bits = ((bits & 0x0F0F_0F0F) << 4) | ((bits & 0xF0F0_F0F0) >> 4);
    bits = ((bits & 0x00FF_00FF) << 8) | ((bits & 0xFF00_FF00) >> 8);

    bits as f32 * 2.328_306_4e-10
}

/// Point `i` of an `n` point Hammersley set.
pub fn hammersley(i: u32, n: u32) -> [f32; 2] {
    [i as f32 / n as f32, radical_inverse(i)]
}

/// Samples a GGX half vector around `n`.
pub fn importance_sample_ggx(xi: [f32; 2], n: Vector3<f32>, roughness: f32) -> Vector3<f32> {
    let a = roughness * roughness;

    let phi = 2.0 * PI * xi[0];
    let cos_theta = ((1.0 - xi[1]) / (1.0 + (a * a - 1.0) * xi[1])).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

    let h = Vector3::new(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta);

    let up = if n.z.abs() < 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_x()
    };

    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);

    (tangent * h.x + bitangent * h.y + n * h.z).normalize()
}

fn geometry_schlick_ggx(n_dot_v: f32, k: f32) -> f32 {
    n_dot_v / (n_dot_v * (1.0 - k) + k)
}

/// Hemisphere-averaged cosine-weighted radiance around a normal.
pub fn irradiance(environment: &TextureStorage, normal: Vector3<f32>, delta: f32) -> [f32; 3] {
    let normal = normal.normalize();

    let up = if normal.y.abs() < 0.999 {
        Vector3::unit_y()
    } else {
        Vector3::unit_z()
    };

    let right = up.cross(normal).normalize();
    let up = normal.cross(right);

    let mut sum = [0.0f32; 3];
    let mut samples = 0.0f32;

    let mut phi = 0.0f32;

    while phi < 2.0 * PI {
        let mut theta = 0.0f32;

        while theta < 0.5 * PI {
            let (sin_theta, cos_theta) = theta.sin_cos();
            let local = [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta];
            let direction = right * local[0] + up * local[1] + normal * local[2];

            let texel = environment.sample_cube(direction, 0.0);
            let weight = cos_theta * sin_theta;

            for c in 0..3 {
                sum[c] += texel[c] * weight;
            }

            samples += 1.0;
            theta += delta;
        }

        phi += delta;
    }

    let scale = PI / samples.max(1.0);

    [sum[0] * scale, sum[1] * scale, sum[2] * scale]
}

/// GGX-weighted radiance around a reflection direction.
pub fn prefilter(
    environment: &TextureStorage,
    normal: Vector3<f32>,
    roughness: f32,
    samples: u32,
) -> [f32; 3] {
    let n = normal.normalize();
    let v = n;

    let mut sum = [0.0f32; 3];
    let mut weight = 0.0f32;

    for i in 0..samples {
        let h = importance_sample_ggx(hammersley(i, samples), n, roughness);
        let l = (h * 2.0 * v.dot(h) - v).normalize();

        let n_dot_l = n.dot(l).max(0.0);

        if n_dot_l > 0.0 {
            let texel = environment.sample_cube(l, 0.0);

            for c in 0..3 {
                sum[c] += texel[c] * n_dot_l;
            }

            weight += n_dot_l;
        }
    }

    let weight = weight.max(0.0001);

    [sum[0] / weight, sum[1] / weight, sum[2] / weight]
}

/// Split-sum scale and bias for a view angle and roughness.
pub fn integrate_brdf(n_dot_v: f32, roughness: f32, samples: u32) -> [f32; 2] {
    let n_dot_v = n_dot_v.max(1e-4);

    let v = Vector3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);
    let n = Vector3::unit_z();

    let k = roughness * roughness / 2.0;

    let mut scale = 0.0;
    let mut bias = 0.0;

    for i in 0..samples {
        let h = importance_sample_ggx(hammersley(i, samples), n, roughness);
        let l = (h * 2.0 * v.dot(h) - v).normalize();

        let n_dot_l = l.z.max(0.0);
        let n_dot_h = h.z.max(0.0);
        let v_dot_h = v.dot(h).max(0.0);

        if n_dot_l > 0.0 {
            let g = geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v).max(1e-6);
            let fc = (1.0 - v_dot_h).powi(5);

            scale += (1.0 - fc) * g_vis;
            bias += fc * g_vis;
        }
    }

    let clamp = |x: f32| x.max(0.0).min(1.0);

    [clamp(scale / samples as f32), clamp(bias / samples as f32)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radical_inverse_reverses_bits() {
        assert_eq!(radical_inverse(0), 0.0);
        assert_eq!(radical_inverse(1), 0.5);
        assert_eq!(radical_inverse(2), 0.25);
        assert_eq!(radical_inverse(3), 0.75);
    }

    #[test]
    fn smooth_ggx_samples_collapse_onto_normal() {
        let n = Vector3::new(0.0, 1.0, 0.0);

        for i in 0..16 {
            let h = importance_sample_ggx(hammersley(i, 16), n, 0.0);
            assert!(h.dot(n) > 0.9999);
        }
    }

    #[test]
    fn brdf_lut_matches_fresnel_at_zero_roughness() {
        for &n_dot_v in &[0.2f32, 0.5, 0.9] {
            let [scale, bias] = integrate_brdf(n_dot_v, 0.0, 64);
            let fc = (1.0 - n_dot_v).powi(5);

            assert!((scale - (1.0 - fc)).abs() < 0.02, "scale {} at {}", scale, n_dot_v);
            assert!((bias - fc).abs() < 0.02, "bias {} at {}", bias, n_dot_v);
        }
    }

    fn flat_scene(value: f32) -> TextureStorage {
        use crate::{Filter, ImageTarget, PixelFormat, Wrap};

        let mut scene = TextureStorage::new(TextureKind::Flat, PixelFormat::RGBA8, 1, 8, 8);
        scene.min_filter = Filter::Linear;
        scene.mag_filter = Filter::Linear;
        scene.wrap = Wrap::ClampToEdge;
        scene
            .store(ImageTarget::Flat, 0, vec![[value, value, value, 1.0]; 64])
            .unwrap();

        scene
    }

    #[test]
    fn post_effects_keep_flat_dim_image_at_center() {
        let scene = flat_scene(0.4);
        let texel = [1.0 / 8.0; 2];

        let all = PostEffects {
            fxaa: true,
            bloom: true,
            vignette: true,
        };

        let [r, g, b] = post_process(&scene, [0.5, 0.5], texel, all);

        assert!((r - 0.4).abs() < 0.01, "{}", r);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn bloom_only_gathers_bright_texels() {
        let texel = [1.0 / 8.0; 2];

        assert_eq!(bloom(&flat_scene(0.5), [0.5, 0.5], texel), [0.0; 3]);

        let glow = bloom(&flat_scene(1.0), [0.5, 0.5], texel)[0];
        assert!((glow - 0.3 * BLOOM_INTENSITY).abs() < 0.01, "{}", glow);
    }

    #[test]
    fn vignette_darkens_corners_only() {
        assert_eq!(vignette([0.5, 0.5]), 1.0);
        assert!(vignette([0.3, 0.5]) > 0.99);

        let corner = vignette([0.0, 0.0]);
        let expected = 1.0 - VIGNETTE_STRENGTH * smoothstep(VIGNETTE_INNER, VIGNETTE_OUTER, 0.5f32.sqrt());

        assert!((corner - expected).abs() < 1e-6);
        assert!(corner < 0.6);
    }

    #[test]
    fn panorama_center_looks_down_positive_x() {
        let [u, v] = equirectangular_uv(Vector3::new(1.0, 0.0, 0.0));

        assert!((u - 0.5).abs() < 1e-6);
        assert!((v - 0.5).abs() < 1e-6);
    }
}
