#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::shaders;
use crate::{
    unit_cube, unit_quad, Camera, CaptureViews, CubeFace, CubeVertex, Cubemap,
    EnvironmentSettings, Error, Framebuffer, Gl, ImageTarget, MaterialChannel, QuadVertex, Raster,
    Shader, Texture, UniformLocation, VertexArray, Wrap, MAX_LIGHTS, MAX_MIPMAP_LEVELS, RG16F,
    RGB32F, RGBA16F,
};
use image::{imageops, ImageError, ImageFormat};
use itertools::iproduct;
use std::cell::Cell;
use std::path::Path;

const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Precomputed image-based lighting for one HDR panorama.
///
/// Holds the environment, irradiance and prefiltered specular cubemaps, the
/// BRDF lookup table and the shaders which sample them. An environment can
/// only be obtained through `load` or `from_memory`, which either complete
/// the entire precomputation or release everything they created.
#[derive(Debug)]
pub struct Environment {
    pub(crate) gl: Gl,

    pub(crate) cubemap: Cubemap<RGBA16F>,
    pub(crate) irradiance: Cubemap<RGBA16F>,
    pub(crate) prefilter: Cubemap<RGBA16F>,
    pub(crate) brdf: Texture<RG16F>,

    pub(crate) pbr_shader: Shader,
    pub(crate) sky_shader: Shader,
    equirectangular_shader: Shader,
    irradiance_shader: Shader,
    prefilter_shader: Shader,
    brdf_shader: Shader,

    pub(crate) cube: VertexArray<[CubeVertex]>,

    pub(crate) pbr_view: Option<UniformLocation>,
    pub(crate) pbr_view_matrix: Option<UniformLocation>,
    pub(crate) sky_view: Option<UniformLocation>,
    pub(crate) sky_resolution: Option<UniformLocation>,

    pub(crate) light_count: Cell<usize>,
}

impl Environment {
    /// Loads an HDR panorama from disk and precomputes its lighting data.
    pub fn load(
        gl: &Gl,
        path: impl AsRef<Path>,
        settings: &EnvironmentSettings,
        camera: &Camera,
        raster: &Raster,
    ) -> Result<Self, Error> {
        let path = path.as_ref();

        let bytes = std::fs::read(path)
            .map_err(|error| Error::decode(path.display(), ImageError::IoError(error)))?;

        Self::from_memory(gl, &path.display().to_string(), &bytes, settings, camera, raster)
    }

    /// Precomputes lighting data from an in-memory radiance HDR file.
    pub fn from_memory(
        gl: &Gl,
        name: &str,
        bytes: &[u8],
        settings: &EnvironmentSettings,
        camera: &Camera,
        raster: &Raster,
    ) -> Result<Self, Error> {
        info!(
            "loading environment `{}' (cubemap {}, irradiance {}, prefilter {}, brdf {})",
            name,
            settings.cubemap_size,
            settings.irradiance_size,
            settings.prefilter_size,
            settings.brdf_size
        );

        let (cols, rows, pixels) = decode_panorama(name, bytes)?;

        let mut panorama: Texture<RGB32F> = Texture::new(gl.clone()).with_wrap(Wrap::ClampToEdge);
        panorama.upload(cols, rows, &pixels)?;

        let mut environment = Self::allocate(gl)?;
        let mut capture = Framebuffer::new(gl.clone());
        let views = CaptureViews::new();

        gl.set_face_culling(false);

        environment.render_cubemap(&mut capture, &views, &panorama, settings)?;
        environment.render_irradiance(&mut capture, &views, settings)?;
        environment.render_prefilter(&mut capture, &views, settings)?;
        environment.render_brdf(&mut capture, settings)?;

        environment.set_projection(camera, raster);

        Ok(environment)
    }

    fn allocate(gl: &Gl) -> Result<Self, Error> {
        let mut pbr_units = vec![("irradianceMap", 0), ("prefilterMap", 1), ("brdfLUT", 2)];

        for &channel in &MaterialChannel::ALL {
            pbr_units.push((channel.sampler_uniform(), channel.texture_unit()));
        }

        let mut pbr_shader = Shader::new(gl.clone(), &shaders::VS_PBR, &shaders::FS_PBR, &pbr_units);

        pbr_shader.set_define("MAX_LIGHTS", MAX_LIGHTS);
        pbr_shader.set_define("MAX_MIPMAP_LEVELS", MAX_MIPMAP_LEVELS);

        let mut sky_shader = Shader::new(
            gl.clone(),
            &shaders::VS_SKYBOX,
            &shaders::FS_SKYBOX,
            &[("environmentMap", 0)],
        );

        let mut equirectangular_shader = Shader::new(
            gl.clone(),
            &shaders::VS_CUBEMAP,
            &shaders::FS_EQUIRECTANGULAR,
            &[("equirectangularMap", 0)],
        );

        let mut irradiance_shader = Shader::new(
            gl.clone(),
            &shaders::VS_CUBEMAP,
            &shaders::FS_IRRADIANCE,
            &[("environmentMap", 0)],
        );

        let mut prefilter_shader = Shader::new(
            gl.clone(),
            &shaders::VS_CUBEMAP,
            &shaders::FS_PREFILTER,
            &[("environmentMap", 0)],
        );

        let mut brdf_shader = Shader::new(gl.clone(), &shaders::VS_QUAD, &shaders::FS_BRDF, &[]);

        for shader in &mut [
            &mut pbr_shader,
            &mut sky_shader,
            &mut equirectangular_shader,
            &mut irradiance_shader,
            &mut prefilter_shader,
            &mut brdf_shader,
        ] {
            shader.rebuild()?;
        }

        let mut cube = VertexArray::new(gl.clone());
        cube.upload(&unit_cube())?;

        let pbr_view = pbr_shader.location("viewPos");
        let pbr_view_matrix = pbr_shader.location("view");
        let sky_view = sky_shader.location("view");
        let sky_resolution = sky_shader.location("resolution");

        Ok(Self {
            gl: gl.clone(),
            cubemap: Cubemap::new(gl.clone()),
            irradiance: Cubemap::new(gl.clone()),
            prefilter: Cubemap::new(gl.clone()),
            brdf: Texture::new(gl.clone()).with_wrap(Wrap::ClampToEdge),
            pbr_shader,
            sky_shader,
            equirectangular_shader,
            irradiance_shader,
            prefilter_shader,
            brdf_shader,
            cube,
            pbr_view,
            pbr_view_matrix,
            sky_view,
            sky_resolution,
            light_count: Cell::new(0),
        })
    }

    fn render_cubemap(
        &mut self,
        capture: &mut Framebuffer,
        views: &CaptureViews,
        panorama: &Texture<RGB32F>,
        settings: &EnvironmentSettings,
    ) -> Result<(), Error> {
        let size = settings.cubemap_size;

        debug!("converting panorama to {0}x{0} cubemap", size);

        self.cubemap.create(size, 1)?;
        capture.rebuild(size, size)?;

        let shader = &self.equirectangular_shader;
        shader.set_uniform("projection", views.projection);

        let mut command = shader.begin_draw();
        command.bind(panorama, "equirectangularMap");

        for &face in &CubeFace::ALL {
            capture.attach(&self.cubemap, face.into(), 0)?;
            capture.clear(CLEAR_COLOR);

            command.set_viewport(0, 0, size as i32, size as i32);
            command.set_uniform("view", views.view(face));
            command.draw_triangles(&self.cube);
        }

        drop(command);
        capture.unbind();

        Ok(())
    }

    fn render_irradiance(
        &mut self,
        capture: &mut Framebuffer,
        views: &CaptureViews,
        settings: &EnvironmentSettings,
    ) -> Result<(), Error> {
        let size = settings.irradiance_size;

        debug!(
            "convolving {0}x{0} irradiance map (sample delta {1})",
            size, settings.irradiance_sample_delta
        );

        self.irradiance.create(size, 1)?;
        capture.rebuild(size, size)?;

        let shader = &self.irradiance_shader;
        shader.set_uniform("projection", views.projection);
        shader.set_uniform("sampleDelta", settings.irradiance_sample_delta);

        let mut command = shader.begin_draw();
        command.bind(&self.cubemap, "environmentMap");

        for &face in &CubeFace::ALL {
            capture.attach(&self.irradiance, face.into(), 0)?;
            capture.clear(CLEAR_COLOR);

            command.set_viewport(0, 0, size as i32, size as i32);
            command.set_uniform("view", views.view(face));
            command.draw_triangles(&self.cube);
        }

        drop(command);
        capture.unbind();

        Ok(())
    }

    fn render_prefilter(
        &mut self,
        capture: &mut Framebuffer,
        views: &CaptureViews,
        settings: &EnvironmentSettings,
    ) -> Result<(), Error> {
        debug!(
            "prefiltering {0}x{0} specular map over {1} mips ({2} samples)",
            settings.prefilter_size, MAX_MIPMAP_LEVELS, settings.prefilter_sample_count
        );

        self.prefilter
            .create(settings.prefilter_size, MAX_MIPMAP_LEVELS)?;

        let shader = &self.prefilter_shader;
        shader.set_uniform("projection", views.projection);
        shader.set_uniform("sampleCount", settings.prefilter_sample_count as i32);

        let mut command = shader.begin_draw();
        command.bind(&self.cubemap, "environmentMap");

        for (level, &face) in iproduct!(0..MAX_MIPMAP_LEVELS, &CubeFace::ALL) {
            let size = self.prefilter.size_at_level(level);

            if face == CubeFace::PositiveX {
                capture.rebuild(size, size)?;

                let roughness = level as f32 / (MAX_MIPMAP_LEVELS - 1) as f32;
                command.set_uniform("roughness", roughness);
            }

            capture.attach(&self.prefilter, face.into(), level)?;
            capture.clear(CLEAR_COLOR);

            command.set_viewport(0, 0, size as i32, size as i32);
            command.set_uniform("view", views.view(face));
            command.draw_triangles(&self.cube);
        }

        drop(command);
        capture.unbind();

        Ok(())
    }

    fn render_brdf(
        &mut self,
        capture: &mut Framebuffer,
        settings: &EnvironmentSettings,
    ) -> Result<(), Error> {
        let size = settings.brdf_size;

        debug!(
            "integrating {0}x{0} BRDF lookup table ({1} samples)",
            size, settings.brdf_sample_count
        );

        self.brdf.create(size, size)?;
        capture.rebuild(size, size)?;

        let mut quad = VertexArray::<[QuadVertex]>::new(self.gl.clone());
        quad.upload(&unit_quad())?;

        capture.attach(&self.brdf, ImageTarget::Flat, 0)?;
        capture.clear(CLEAR_COLOR);

        let shader = &self.brdf_shader;
        shader.set_uniform("sampleCount", settings.brdf_sample_count as i32);

        let command = shader.begin_draw();
        command.set_viewport(0, 0, size as i32, size as i32);
        command.draw_triangle_strip(&quad);

        drop(command);
        capture.unbind();

        Ok(())
    }

    /// Pushes the camera projection to every shader and restores the default
    /// framebuffer viewport to the window size.
    pub fn set_projection(&self, camera: &Camera, raster: &Raster) {
        self.gl.bind_framebuffer(None);
        self.gl
            .viewport(0, 0, raster.width as i32, raster.height as i32);

        let projection = camera.projection_matrix(raster.aspect_ratio());

        for shader in &[
            &self.equirectangular_shader,
            &self.irradiance_shader,
            &self.prefilter_shader,
            &self.sky_shader,
            &self.pbr_shader,
        ] {
            shader.set_uniform("projection", projection);
        }
    }

    pub fn cubemap(&self) -> &Cubemap<RGBA16F> {
        &self.cubemap
    }

    pub fn irradiance(&self) -> &Cubemap<RGBA16F> {
        &self.irradiance
    }

    pub fn prefilter(&self) -> &Cubemap<RGBA16F> {
        &self.prefilter
    }

    pub fn brdf(&self) -> &Texture<RG16F> {
        &self.brdf
    }

    pub fn pbr_shader(&self) -> &Shader {
        &self.pbr_shader
    }

    pub fn sky_shader(&self) -> &Shader {
        &self.sky_shader
    }
}

/// Decodes a radiance HDR file into bottom-up linear RGB floats.
fn decode_panorama(name: &str, bytes: &[u8]) -> Result<(usize, usize, Vec<f32>), Error> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Hdr)
        .map_err(|error| Error::decode(name, error))?;

    let mut image = image.into_rgb32f();
    imageops::flip_vertical_in_place(&mut image);

    let (cols, rows) = image.dimensions();

    debug!("decoded {}x{} panorama `{}'", cols, rows, name);

    Ok((cols as usize, rows as usize, image.into_raw()))
}
