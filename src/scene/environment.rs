use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Resolutions and quality parameters of the IBL precomputation.
#[derive(Clone, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    #[default(1024)]
    pub cubemap_size: usize,
    #[default(32)]
    pub irradiance_size: usize,
    #[default(256)]
    pub prefilter_size: usize,
    #[default(512)]
    pub brdf_size: usize,

    /// Angular step of the irradiance Riemann sum, in radians.
    #[default(0.025)]
    pub irradiance_sample_delta: f32,
    #[default(1024)]
    pub prefilter_sample_count: u32,
    #[default(1024)]
    pub brdf_sample_count: u32,
}
