use crate::{CubeFace, Error, Filter, ImageTarget, PixelFormat, TextureData, TextureKind, Wrap};
use cgmath::Vector3;
use half::f16;

pub type Texel = [f32; 4];

/// CPU-side storage of every image of a texture.
#[derive(Clone, Debug)]
pub struct TextureStorage {
    pub kind: TextureKind,
    pub format: PixelFormat,
    pub cols: usize,
    pub rows: usize,
    pub levels: usize,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub wrap: Wrap,

    // indexed by face, then level, rows stored bottom first
    images: Vec<Vec<Vec<Texel>>>,
}

fn face_count(kind: TextureKind) -> usize {
    match kind {
        TextureKind::Flat => 1,
        TextureKind::Cube => 6,
    }
}

impl TextureStorage {
    pub fn new(
        kind: TextureKind,
        format: PixelFormat,
        levels: usize,
        cols: usize,
        rows: usize,
    ) -> Self {
        let images = (0..face_count(kind))
            .map(|_| {
                (0..levels)
                    .map(|level| {
                        let (w, h) = ((cols >> level).max(1), (rows >> level).max(1));
                        vec![[0.0, 0.0, 0.0, 1.0]; w * h]
                    })
                    .collect()
            })
            .collect();

        Self {
            kind,
            format,
            cols,
            rows,
            levels,
            min_filter: Filter::Nearest,
            mag_filter: Filter::Nearest,
            wrap: Wrap::Repeat,
            images,
        }
    }

    /// Bytes of device memory the storage would occupy.
    pub fn byte_size(
        kind: TextureKind,
        format: PixelFormat,
        levels: usize,
        cols: usize,
        rows: usize,
    ) -> usize {
        let texels: usize = (0..levels)
            .map(|level| (cols >> level).max(1) * (rows >> level).max(1))
            .sum();

        texels * face_count(kind) * format.bytes_per_pixel()
    }

    pub fn level_size(&self, level: usize) -> (usize, usize) {
        ((self.cols >> level).max(1), (self.rows >> level).max(1))
    }

    fn face_index(&self, target: ImageTarget) -> Result<usize, Error> {
        match (self.kind, target) {
            (TextureKind::Flat, ImageTarget::Flat) => Ok(0),
            (TextureKind::Cube, ImageTarget::Face(face)) => Ok(face.index()),
            _ => Err(Error::ResourceExhausted(format!(
                "image target {:?} does not exist in a {:?} texture",
                target, self.kind
            ))),
        }
    }

    fn check_level(&self, level: usize) -> Result<(), Error> {
        if level < self.levels {
            Ok(())
        } else {
            Err(Error::ResourceExhausted(format!(
                "mip level {} is outside of the allocated {} levels",
                level, self.levels
            )))
        }
    }

    /// Rounds a texel through the precision of the storage format.
    pub fn quantize(&self, texel: Texel) -> Texel {
        let half = |x: f32| f16::from_f32(x).to_f32();
        let unorm = |x: f32| (x.max(0.0).min(1.0) * 255.0).round() / 255.0;

        match self.format {
            PixelFormat::RGB32F => [texel[0], texel[1], texel[2], 1.0],
            PixelFormat::RGBA16F => [
                half(texel[0]),
                half(texel[1]),
                half(texel[2]),
                half(texel[3]),
            ],
            PixelFormat::RG16F => [half(texel[0]), half(texel[1]), 0.0, 1.0],
            PixelFormat::RGBA8 => [
                unorm(texel[0]),
                unorm(texel[1]),
                unorm(texel[2]),
                unorm(texel[3]),
            ],
        }
    }

    pub fn upload(
        &mut self,
        target: ImageTarget,
        level: usize,
        cols: usize,
        rows: usize,
        data: TextureData,
    ) -> Result<(), Error> {
        let face = self.face_index(target)?;
        self.check_level(level)?;

        if (cols, rows) != self.level_size(level) {
            return Err(Error::ResourceExhausted(format!(
                "upload of {}x{} does not match level {} storage",
                cols, rows, level
            )));
        }

        let channels = self.format.channels();

        let values: Vec<f32> = match data {
            TextureData::U8(bytes) => bytes.iter().map(|&x| f32::from(x) / 255.0).collect(),
            TextureData::F16(bits) => bits.iter().map(|&x| f16::from_bits(x).to_f32()).collect(),
            TextureData::F32(values) => values.to_vec(),
        };

        if values.len() != cols * rows * channels {
            return Err(Error::ResourceExhausted(format!(
                "expected {} values, got {}",
                cols * rows * channels,
                values.len()
            )));
        }

        let mut image = Vec::with_capacity(cols * rows);

        for chunk in values.chunks(channels) {
            let mut texel = [0.0, 0.0, 0.0, 1.0];
            texel[..channels].copy_from_slice(chunk);
            image.push(self.quantize(texel));
        }

        self.images[face][level] = image;

        Ok(())
    }

    /// Overwrites a level of one image with already computed texels.
    pub fn store(&mut self, target: ImageTarget, level: usize, texels: Vec<Texel>) -> Result<(), Error> {
        let face = self.face_index(target)?;
        self.check_level(level)?;

        let (w, h) = self.level_size(level);
        assert_eq!(texels.len(), w * h);

        let quantized = texels.into_iter().map(|t| self.quantize(t)).collect();
        self.images[face][level] = quantized;

        Ok(())
    }

    pub fn image(&self, target: ImageTarget, level: usize) -> Result<&[Texel], Error> {
        let face = self.face_index(target)?;
        self.check_level(level)?;

        Ok(&self.images[face][level])
    }

    fn fetch(&self, face: usize, level: usize, x: isize, y: isize) -> Texel {
        let (w, h) = self.level_size(level);

        let (x, y) = match self.wrap {
            Wrap::Repeat => (
                x.rem_euclid(w as isize) as usize,
                y.rem_euclid(h as isize) as usize,
            ),
            Wrap::ClampToEdge => (
                x.max(0).min(w as isize - 1) as usize,
                y.max(0).min(h as isize - 1) as usize,
            ),
        };

        self.images[face][level][y * w + x]
    }

    fn sample_level(&self, face: usize, level: usize, s: f32, t: f32, filter: Filter) -> Texel {
        let (w, h) = self.level_size(level);

        if filter == Filter::Nearest {
            let x = (s * w as f32).floor() as isize;
            let y = (t * h as f32).floor() as isize;

            return self.fetch(face, level, x, y);
        }

        let u = s * w as f32 - 0.5;
        let v = t * h as f32 - 0.5;

        let (x0, y0) = (u.floor(), v.floor());
        let (fx, fy) = (u - x0, v - y0);
        let (x0, y0) = (x0 as isize, y0 as isize);

        let t00 = self.fetch(face, level, x0, y0);
        let t10 = self.fetch(face, level, x0 + 1, y0);
        let t01 = self.fetch(face, level, x0, y0 + 1);
        let t11 = self.fetch(face, level, x0 + 1, y0 + 1);

        let mut texel = [0.0; 4];

        for c in 0..4 {
            let bottom = t00[c] * (1.0 - fx) + t10[c] * fx;
            let top = t01[c] * (1.0 - fx) + t11[c] * fx;
            texel[c] = bottom * (1.0 - fy) + top * fy;
        }

        texel
    }

    fn sample_lod(&self, face: usize, s: f32, t: f32, lod: f32) -> Texel {
        if lod <= 0.0 || self.min_filter != Filter::LinearMipmapLinear {
            let filter = if lod <= 0.0 { self.mag_filter } else { self.min_filter };
            let filter = match filter {
                Filter::LinearMipmapLinear => Filter::Linear,
                other => other,
            };

            return self.sample_level(face, 0, s, t, filter);
        }

        let lod = lod.min((self.levels - 1) as f32);
        let lo = lod.floor() as usize;
        let hi = (lo + 1).min(self.levels - 1);
        let weight = lod - lo as f32;

        let a = self.sample_level(face, lo, s, t, Filter::Linear);
        let b = self.sample_level(face, hi, s, t, Filter::Linear);

        [
            a[0] + (b[0] - a[0]) * weight,
            a[1] + (b[1] - a[1]) * weight,
            a[2] + (b[2] - a[2]) * weight,
            a[3] + (b[3] - a[3]) * weight,
        ]
    }

    /// Samples a 2D texture at base level, the way `texture()` would.
    pub fn sample_2d(&self, uv: [f32; 2]) -> Texel {
        self.sample_lod(0, uv[0], uv[1], 0.0)
    }

    /// Samples a cubemap along a direction, the way `textureLod()` would.
    pub fn sample_cube(&self, direction: Vector3<f32>, lod: f32) -> Texel {
        let (face, s, t) = cube_face_coordinates(direction);

        self.sample_lod(face.index(), s, t, lod)
    }
}

/// Selects the cubemap face hit by a direction and the face coordinates.
pub fn cube_face_coordinates(d: Vector3<f32>) -> (CubeFace, f32, f32) {
    let (ax, ay, az) = (d.x.abs(), d.y.abs(), d.z.abs());

    let (face, sc, tc, ma) = if ax >= ay && ax >= az {
        if d.x >= 0.0 {
            (CubeFace::PositiveX, -d.z, -d.y, ax)
        } else {
            (CubeFace::NegativeX, d.z, -d.y, ax)
        }
    } else if ay >= az {
        if d.y >= 0.0 {
            (CubeFace::PositiveY, d.x, d.z, ay)
        } else {
            (CubeFace::NegativeY, d.x, -d.z, ay)
        }
    } else if d.z >= 0.0 {
        (CubeFace::PositiveZ, d.x, -d.y, az)
    } else {
        (CubeFace::NegativeZ, -d.x, -d.y, az)
    };

    let ma = ma.max(std::f32::MIN_POSITIVE);

    (face, 0.5 * (sc / ma + 1.0), 0.5 * (tc / ma + 1.0))
}

/// Inverse of `cube_face_coordinates` for the center of a face texel.
pub fn cube_texel_direction(face: CubeFace, x: usize, y: usize, size: usize) -> Vector3<f32> {
    let sc = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let tc = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;

    match face {
        CubeFace::PositiveX => Vector3::new(1.0, -tc, -sc),
        CubeFace::NegativeX => Vector3::new(-1.0, -tc, sc),
        CubeFace::PositiveY => Vector3::new(sc, 1.0, tc),
        CubeFace::NegativeY => Vector3::new(sc, -1.0, -tc),
        CubeFace::PositiveZ => Vector3::new(sc, -tc, 1.0),
        CubeFace::NegativeZ => Vector3::new(-sc, -tc, -1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_directions_select_their_own_face() {
        for &face in &CubeFace::ALL {
            for &(x, y) in &[(0, 0), (3, 5), (7, 7)] {
                let (hit, s, t) = cube_face_coordinates(cube_texel_direction(face, x, y, 8));

                assert_eq!(hit, face);
                assert!((s * 8.0 - (x as f32 + 0.5)).abs() < 1e-4);
                assert!((t * 8.0 - (y as f32 + 0.5)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn random_directions_land_in_nearby_texels() {
        use cgmath::InnerSpace;
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..1000 {
            let direction = Vector3::new(
                rng.gen_range(-1.0f32, 1.0),
                rng.gen_range(-1.0f32, 1.0),
                rng.gen_range(-1.0f32, 1.0),
            );

            if direction.magnitude() < 1e-3 {
                continue;
            }

            let (face, s, t) = cube_face_coordinates(direction);

            assert!((0.0..=1.0).contains(&s) && (0.0..=1.0).contains(&t));

            let (x, y) = ((s * 16.0).min(15.0) as usize, (t * 16.0).min(15.0) as usize);
            let texel = cube_texel_direction(face, x, y, 16).normalize();

            assert!(texel.dot(direction.normalize()) > 0.99);
        }
    }

    #[test]
    fn half_float_storage_rounds_values() {
        let storage = TextureStorage::new(TextureKind::Cube, PixelFormat::RGBA16F, 1, 1, 1);
        let texel = storage.quantize([0.1, 65504.0, 1.0e6, 1.0]);

        assert!((texel[0] - 0.1).abs() < 1e-4);
        assert_eq!(texel[1], 65504.0);
        assert!(texel[2].is_infinite());
    }

    #[test]
    fn trilinear_lookup_blends_mip_levels() {
        let mut storage = TextureStorage::new(TextureKind::Cube, PixelFormat::RGBA16F, 2, 2, 2);
        storage.min_filter = Filter::LinearMipmapLinear;
        storage.mag_filter = Filter::Linear;

        for &face in &CubeFace::ALL {
            storage.store(face.into(), 0, vec![[1.0; 4]; 4]).unwrap();
            storage.store(face.into(), 1, vec![[0.0; 4]; 1]).unwrap();
        }

        let texel = storage.sample_cube(Vector3::new(0.0, 0.0, 1.0), 0.5);

        assert!((texel[0] - 0.5).abs() < 1e-3);
    }
}
