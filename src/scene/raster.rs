use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// Supersampling factor applied to the window resolution.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(rename_all = "kebab-case")]
pub enum RenderScale {
    Half,
    Full,
    #[default]
    Double,
}

impl RenderScale {
    pub fn factor(self) -> f32 {
        match self {
            Self::Half => 0.5,
            Self::Full => 1.0,
            Self::Double => 2.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, SmartDefault)]
#[serde(default)]
pub struct Raster {
    #[default(1440)]
    pub width: u32,
    #[default(810)]
    pub height: u32,
    pub scale: RenderScale,
}

impl Raster {
    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }

    /// Effective shading resolution, accounting for the render scale.
    pub fn resolution(&self) -> [f32; 2] {
        let factor = self.scale.factor();

        [self.width as f32 * factor, self.height as f32 * factor]
    }
}
