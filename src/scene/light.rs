use crate::Color;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

pub const LIGHT_DISTANCE: f32 = 3.5;
pub const LIGHT_HEIGHT: f32 = 1.0;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, SmartDefault)]
#[serde(rename_all = "kebab-case")]
pub enum LightKind {
    Directional,
    #[default]
    Point,
}

impl LightKind {
    pub fn shader_value(self) -> i32 {
        match self {
            Self::Directional => 0,
            Self::Point => 1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, SmartDefault, Serialize)]
#[serde(default)]
pub struct LightDescriptor {
    pub kind: LightKind,
    pub position: [f32; 3],
    pub target: [f32; 3],
    #[default(Color::WHITE)]
    pub color: Color,
    #[default(true)]
    pub enabled: bool,
}

impl LightDescriptor {
    /// The four lights surrounding the model in the default scene.
    pub fn default_rig() -> Vec<Self> {
        let light = |kind, position, color| Self {
            kind,
            position,
            target: [0.0; 3],
            color,
            enabled: true,
        };

        vec![
            light(
                LightKind::Point,
                [LIGHT_DISTANCE, LIGHT_HEIGHT, 0.0],
                Color::new(255, 0, 0, 255),
            ),
            light(
                LightKind::Point,
                [0.0, LIGHT_HEIGHT, LIGHT_DISTANCE],
                Color::new(0, 255, 0, 255),
            ),
            light(
                LightKind::Point,
                [-LIGHT_DISTANCE, LIGHT_HEIGHT, 0.0],
                Color::new(0, 0, 255, 255),
            ),
            light(
                LightKind::Directional,
                [0.0, LIGHT_HEIGHT * 2.0, -LIGHT_DISTANCE],
                Color::new(255, 0, 255, 255),
            ),
        ]
    }
}
