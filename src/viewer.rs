#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    Color, Dirty, Environment, Error, Gl, Light, LightDescriptor, Material, MaterialChannel,
    Model, PostProcess, Scene, MAX_LIGHTS,
};
use image::{imageops, RgbaImage};
use std::rc::Rc;

const BACKGROUND: [f32; 4] = [0.31, 0.31, 0.31, 1.0];

/// Headless frame driver tying a scene to an environment, a material and
/// the registered lights.
///
/// Frames are rendered at the scaled resolution into an offscreen target and
/// post-processed onto the screen at the window size.
#[derive(Debug)]
pub struct Viewer {
    gl: Gl,
    scene: Scene,

    hdr_name: String,
    hdr_bytes: Vec<u8>,

    environment: Rc<Environment>,
    material: Material,
    lights: Vec<Light>,
    model: Option<Model>,
    postfx: PostProcess,
}

impl Viewer {
    /// Loads the panorama, creates a white material and registers the scene
    /// lights. The first frame uploads the whole scene.
    pub fn new(gl: Gl, mut scene: Scene, hdr_name: &str, hdr_bytes: &[u8]) -> Result<Self, Error> {
        let environment = Rc::new(Environment::from_memory(
            &gl,
            hdr_name,
            hdr_bytes,
            &scene.environment,
            &scene.camera,
            &scene.raster,
        )?);

        let material = Material::new(&environment, Color::WHITE, 255, 255);
        let lights = register_lights(&environment, &scene.lights)?;
        let postfx = PostProcess::new(&gl)?;

        scene.dirty_all_fields();
        let _ = Dirty::clean(&mut scene.environment, |_| Ok::<_, Error>(()));

        Ok(Self {
            gl,
            scene,
            hdr_name: hdr_name.to_owned(),
            hdr_bytes: hdr_bytes.to_vec(),
            environment,
            material,
            lights,
            model: None,
            postfx,
        })
    }

    /// Uploads whatever changed in the scene and draws one frame.
    pub fn frame(&mut self) -> Result<(), Error> {
        if Dirty::is_dirty(&self.scene.environment) {
            let (name, bytes) = (self.hdr_name.clone(), self.hdr_bytes.clone());
            self.swap_environment(&name, &bytes)?;
        }

        let environment = &self.environment;
        let camera = &self.scene.camera;

        let camera_moved = Dirty::is_dirty(camera);
        let raster = &mut self.scene.raster;

        if camera_moved {
            Dirty::dirty(raster);
        }

        let postfx = &mut self.postfx;

        Dirty::clean(raster, |raster| {
            environment.set_projection(camera, raster);
            postfx.resize(raster.resolution())
        })?;

        Dirty::clean(&mut self.scene.display, |display| {
            environment.set_render_mode(display.render_mode);
            postfx.set_effects(display);
            Ok::<_, Error>(())
        })?;

        let lights = &mut self.lights;

        Dirty::clean(&mut self.scene.lights, |descriptors| {
            if descriptors.len() > lights.len() {
                warn!("only {} lights are registered", lights.len());
            }

            for (index, light) in lights.iter_mut().enumerate() {
                match descriptors.get(index) {
                    Some(descriptor) => light.apply(descriptor),
                    None => light.enabled = false,
                }
            }

            Ok::<_, Error>(())
        })?;

        let _ = Dirty::clean(&mut self.scene.camera, |_| Ok::<_, Error>(()));
        let _ = Dirty::clean(&mut self.scene.placement, |_| Ok::<_, Error>(()));

        for light in &self.lights {
            self.environment.update_light(light);
        }

        self.environment
            .update_values(&self.scene.camera, self.scene.raster.resolution());

        self.postfx.begin(BACKGROUND);

        if let Some(model) = &self.model {
            self.environment
                .draw_model(model, &self.material, &self.scene.placement);
        }

        if self.scene.display.draw_skybox {
            self.environment
                .draw_skybox(&self.scene.camera, self.scene.display.background);
        }

        self.postfx
            .present(self.scene.raster.width, self.scene.raster.height);

        Ok(())
    }

    /// Replaces the environment with one built from another panorama.
    ///
    /// The new environment is fully built before anything is replaced, so the
    /// current one is kept if loading fails. Lights are registered again and
    /// their count starts over from zero.
    pub fn swap_environment(&mut self, name: &str, bytes: &[u8]) -> Result<(), Error> {
        let environment = Rc::new(Environment::from_memory(
            &self.gl,
            name,
            bytes,
            &self.scene.environment,
            &self.scene.camera,
            &self.scene.raster,
        )?);

        let lights = register_lights(&environment, &self.scene.lights)?;

        self.material.rebind(&environment);
        self.environment = environment;
        self.lights = lights;

        self.hdr_name = name.to_owned();
        self.hdr_bytes = bytes.to_vec();

        info!("swapped environment to `{}'", name);

        self.scene.dirty_all_fields();
        let _ = Dirty::clean(&mut self.scene.environment, |_| Ok::<_, Error>(()));

        Ok(())
    }

    pub fn orbit_lights(&mut self, delta_degrees: f32) {
        self.scene.orbit_lights(delta_degrees);
    }

    pub fn toggle_light(&mut self, index: usize) -> bool {
        self.scene.toggle_light(index)
    }

    pub fn set_model(&mut self, model: Model) {
        self.model = Some(model);
    }

    /// Decodes an image and attaches it to a material channel, releasing any
    /// texture it replaces.
    pub fn set_texture(
        &mut self,
        channel: MaterialChannel,
        name: &str,
        bytes: &[u8],
    ) -> Result<(), Error> {
        self.material.load_texture_from_memory(channel, name, bytes)?;

        Ok(())
    }

    pub fn unset_texture(&mut self, channel: MaterialChannel) {
        self.material.unset_texture(channel);
    }

    /// Reads back the last presented frame at the window size, top row first.
    pub fn screenshot(&self) -> Result<RgbaImage, Error> {
        let (cols, rows) = (
            self.scene.raster.width as usize,
            self.scene.raster.height as usize,
        );

        let pixels = self.gl.read_screen(cols, rows)?;

        let mut image = RgbaImage::from_raw(cols as u32, rows as u32, pixels).ok_or_else(|| {
            Error::ResourceExhausted(format!("screen readback is not {}x{}", cols, rows))
        })?;

        imageops::flip_vertical_in_place(&mut image);

        for pixel in image.pixels_mut() {
            pixel.0[3] = 255;
        }

        Ok(image)
    }

    pub fn gl(&self) -> &Gl {
        &self.gl
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn environment(&self) -> &Rc<Environment> {
        &self.environment
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn material_mut(&mut self) -> &mut Material {
        &mut self.material
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn postfx(&self) -> &PostProcess {
        &self.postfx
    }
}

fn register_lights(
    environment: &Environment,
    descriptors: &[LightDescriptor],
) -> Result<Vec<Light>, Error> {
    if descriptors.len() > MAX_LIGHTS {
        warn!(
            "scene has {} lights, ignoring all but the first {}",
            descriptors.len(),
            MAX_LIGHTS
        );
    }

    descriptors
        .iter()
        .take(MAX_LIGHTS)
        .map(|descriptor| {
            let mut light = environment.create_light(
                descriptor.kind,
                descriptor.position,
                descriptor.target,
                descriptor.color,
            )?;

            light.enabled = descriptor.enabled;
            environment.update_light(&light);

            Ok(light)
        })
        .collect()
}
