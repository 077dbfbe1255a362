#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Gl, MaterialChannel, Model, RenderMode, RenderScale, Scene, Viewer, WebGlContext};
use js_sys::Error;
use serde::{de::DeserializeOwned, Serialize};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::WebGl2RenderingContext;

/// Name under which panoramas passed from JavaScript are logged.
const HDR_NAME: &str = "<panorama>";

/// WASM binding for a viewer.
#[wasm_bindgen]
#[derive(Debug)]
pub struct WebViewer {
    viewer: Viewer,
}

#[wasm_bindgen]
impl WebViewer {
    /// Creates a viewer over a WebGL2 context from radiance HDR file contents.
    #[wasm_bindgen(constructor)]
    pub fn new(context: &WebGl2RenderingContext, hdr_bytes: &[u8]) -> Result<WebViewer, JsValue> {
        let gl: Gl = Rc::new(WebGlContext::new(context.clone()).map_err(js_error)?);

        Ok(Self {
            viewer: Viewer::new(gl, Scene::default(), HDR_NAME, hdr_bytes).map_err(js_error)?,
        })
    }

    pub fn scene_json(&self) -> Result<JsValue, JsValue> {
        as_json(self.viewer.scene())
    }

    /// Reconfigures the scene using the provided scene JSON data.
    ///
    /// Only the parts of the scene which actually changed are dirtied, so for
    /// instance a camera move does not rebuild the environment.
    pub fn set_scene_json(&mut self, json: &JsValue) -> Result<(), JsValue> {
        let scene: Scene = from_json(json)?;

        self.viewer.scene_mut().patch_from_other(scene);

        Ok(())
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        let scene = self.viewer.scene_mut();

        if scene.raster.width != width {
            scene.raster.width = width;
        }

        if scene.raster.height != height {
            scene.raster.height = height;
        }
    }

    pub fn set_render_mode(&mut self, mode: &JsValue) -> Result<(), JsValue> {
        let mode: RenderMode = from_json(mode)?;

        self.viewer.scene_mut().display.render_mode = mode;

        Ok(())
    }

    pub fn set_render_scale(&mut self, scale: &JsValue) -> Result<(), JsValue> {
        let scale: RenderScale = from_json(scale)?;

        self.viewer.scene_mut().raster.scale = scale;

        Ok(())
    }

    pub fn set_post_effects(&mut self, fxaa: bool, bloom: bool, vignette: bool) {
        let display = &mut self.viewer.scene_mut().display;

        display.fxaa = fxaa;
        display.bloom = bloom;
        display.vignette = vignette;
    }

    pub fn orbit_lights(&mut self, delta_degrees: f32) {
        self.viewer.orbit_lights(delta_degrees);
    }

    pub fn toggle_light(&mut self, index: usize) -> bool {
        self.viewer.toggle_light(index)
    }

    /// Swaps in a new panorama, keeping the current one on failure.
    pub fn load_environment(&mut self, hdr_bytes: &[u8]) -> Result<(), JsValue> {
        self.viewer
            .swap_environment(HDR_NAME, hdr_bytes)
            .map_err(js_error)
    }

    pub fn load_texture(&mut self, channel: &JsValue, name: &str, bytes: &[u8]) -> Result<(), JsValue> {
        let channel: MaterialChannel = from_json(channel)?;

        self.viewer
            .set_texture(channel, name, bytes)
            .map_err(js_error)
    }

    pub fn unset_texture(&mut self, channel: &JsValue) -> Result<(), JsValue> {
        let channel: MaterialChannel = from_json(channel)?;

        self.viewer.unset_texture(channel);

        Ok(())
    }

    pub fn set_sphere_model(&mut self, segments: u32, rings: u32) -> Result<(), JsValue> {
        let model = Model::uv_sphere(self.viewer.gl(), 1.0, segments, rings).map_err(js_error)?;

        self.viewer.set_model(model);

        Ok(())
    }

    /// Draws one frame to the canvas.
    pub fn render(&mut self) -> Result<(), JsValue> {
        self.viewer.frame().map_err(js_error)
    }
}

fn js_error(error: crate::Error) -> JsValue {
    Error::new(&error.to_string()).into()
}

fn as_json<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    Ok(JsValue::from_serde(value).map_err(|e| Error::new(&e.to_string()))?)
}

fn from_json<T: DeserializeOwned>(json: &JsValue) -> Result<T, JsValue> {
    Ok(json.into_serde().map_err(|e| Error::new(&e.to_string()))?)
}

/// Returns a version string for the WASM module.
#[wasm_bindgen]
pub fn version() -> String {
    format!(
        "Solstice v{} ({}, WebGL2)",
        crate::built_info::PKG_VERSION,
        crate::built_info::PROFILE
    )
}

/// Configures browser logging functionality.
///
/// This function is safe to call more than once and will do nothing should it
/// be called more than once; this lets it co-exist nicely with hot reloaders.
#[wasm_bindgen]
pub fn initialize_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init();
}
