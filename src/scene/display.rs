use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Debug visualization selected in the PBR shader.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    #[default]
    Default,
    Albedo,
    Normals,
    Metalness,
    Roughness,
    AmbientOcclusion,
    Emission,
    Lighting,
    Fresnel,
    Irradiance,
    Reflection,
}

impl RenderMode {
    pub fn shader_value(self) -> i32 {
        self as i32
    }
}

/// Which environment cubemap is drawn behind the model.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundMode {
    #[default]
    Sky,
    BlurredSky,
    Ambient,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(default)]
pub struct Display {
    pub render_mode: RenderMode,
    pub background: BackgroundMode,
    #[default(true)]
    pub draw_skybox: bool,
    #[default(true)]
    pub fxaa: bool,
    #[default(true)]
    pub bloom: bool,
    #[default(true)]
    pub vignette: bool,
}
