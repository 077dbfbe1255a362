#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{
    AsVertexArray, BackgroundMode, Camera, DepthFunction, Environment, Material, MaterialChannel,
    Placement, RenderMode,
};
use std::rc::Rc;

/// Mip level sampled from the prefilter map for the blurred sky background.
pub const BLURRED_SKY_LOD: f32 = 1.2;

impl Environment {
    /// Draws a model with a material under this environment's lighting.
    ///
    /// Every texture unit bound here is released again before returning.
    pub fn draw_model(&self, model: &dyn AsVertexArray, material: &Material, placement: &Placement) {
        debug_assert!(
            std::ptr::eq(Rc::as_ptr(material.environment()), self),
            "material is bound to another environment"
        );

        let shader = &self.pbr_shader;
        let mut command = shader.begin_draw();

        command.set_uniform("mMatrix", placement.model_matrix());

        for &channel in &MaterialChannel::ALL {
            let property = material.property(channel);
            let mut color = property.color.to_vec3();

            // the roughness constant is a smoothness byte, 255 being a mirror
            if channel == MaterialChannel::Roughness {
                color = [1.0 - color[0], 1.0 - color[1], 1.0 - color[2]];
            }

            command.set_uniform(channel.color_uniform(), color);
            command.set_uniform(channel.use_sampler_uniform(), property.use_bitmap());
        }

        command.bind(&self.irradiance, "irradianceMap");
        command.bind(&self.prefilter, "prefilterMap");
        command.bind(&self.brdf, "brdfLUT");

        for &channel in &MaterialChannel::ALL {
            if let Some(texture) = material.property(channel).texture() {
                command.bind(texture, channel.sampler_uniform());
            }
        }

        command.draw_triangles(model);
    }

    /// Draws the background cube. Issue this after all opaque geometry.
    pub fn draw_skybox(&self, camera: &Camera, background: BackgroundMode) {
        let shader = &self.sky_shader;
        let mut command = shader.begin_draw();

        command.set_uniform_at(self.sky_view, camera.view_matrix());

        match background {
            BackgroundMode::Sky => {
                command.bind(&self.cubemap, "environmentMap");
                command.set_uniform("skyLod", 0.0f32);
            }
            BackgroundMode::BlurredSky => {
                command.bind(&self.prefilter, "environmentMap");
                command.set_uniform("skyLod", BLURRED_SKY_LOD);
            }
            BackgroundMode::Ambient => {
                command.bind(&self.irradiance, "environmentMap");
                command.set_uniform("skyLod", 0.0f32);
            }
        }

        self.gl.set_depth_function(DepthFunction::LessEqual);
        command.draw_triangles(&self.cube);
        self.gl.set_depth_function(DepthFunction::Less);
    }

    /// Uploads the per-frame camera state.
    pub fn update_values(&self, camera: &Camera, resolution: [f32; 2]) {
        self.pbr_shader.set_uniform_at(self.pbr_view, camera.position);
        self.pbr_shader
            .set_uniform_at(self.pbr_view_matrix, camera.view_matrix());

        self.sky_shader.set_uniform_at(self.sky_resolution, resolution);
    }

    pub fn set_render_mode(&self, mode: RenderMode) {
        debug!("render mode set to {:?}", mode);

        self.pbr_shader
            .set_uniform("renderMode", mode.shader_value());
    }
}
