use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);
    pub const BLACK: Color = Color::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_vec3(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    pub fn to_vec4(self) -> [f32; 4] {
        let [r, g, b] = self.to_vec3();

        [r, g, b, f32::from(self.a) / 255.0]
    }
}

/// The seven shading inputs of a PBR material.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialChannel {
    Albedo,
    Normals,
    Metalness,
    Roughness,
    AmbientOcclusion,
    Emission,
    Height,
}

impl MaterialChannel {
    pub const ALL: [MaterialChannel; 7] = [
        MaterialChannel::Albedo,
        MaterialChannel::Normals,
        MaterialChannel::Metalness,
        MaterialChannel::Roughness,
        MaterialChannel::AmbientOcclusion,
        MaterialChannel::Emission,
        MaterialChannel::Height,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Fixed texture unit; units 0 to 2 hold the environment maps.
    pub fn texture_unit(self) -> u32 {
        3 + self as u32
    }

    pub fn uniform_prefix(self) -> &'static str {
        match self {
            Self::Albedo => "albedo",
            Self::Normals => "normals",
            Self::Metalness => "metalness",
            Self::Roughness => "roughness",
            Self::AmbientOcclusion => "ao",
            Self::Emission => "emission",
            Self::Height => "height",
        }
    }

    pub fn color_uniform(self) -> &'static str {
        match self {
            Self::Albedo => "albedo.color",
            Self::Normals => "normals.color",
            Self::Metalness => "metalness.color",
            Self::Roughness => "roughness.color",
            Self::AmbientOcclusion => "ao.color",
            Self::Emission => "emission.color",
            Self::Height => "height.color",
        }
    }

    pub fn sampler_uniform(self) -> &'static str {
        match self {
            Self::Albedo => "albedo.sampler",
            Self::Normals => "normals.sampler",
            Self::Metalness => "metalness.sampler",
            Self::Roughness => "roughness.sampler",
            Self::AmbientOcclusion => "ao.sampler",
            Self::Emission => "emission.sampler",
            Self::Height => "height.sampler",
        }
    }

    pub fn use_sampler_uniform(self) -> &'static str {
        match self {
            Self::Albedo => "albedo.useSampler",
            Self::Normals => "normals.useSampler",
            Self::Metalness => "metalness.useSampler",
            Self::Roughness => "roughness.useSampler",
            Self::AmbientOcclusion => "ao.useSampler",
            Self::Emission => "emission.useSampler",
            Self::Height => "height.useSampler",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_units_follow_the_fixed_convention() {
        let units: Vec<u32> = MaterialChannel::ALL.iter().map(|c| c.texture_unit()).collect();

        assert_eq!(units, vec![3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(MaterialChannel::AmbientOcclusion.sampler_uniform(), "ao.sampler");
    }

    #[test]
    fn uniform_names_share_the_channel_prefix() {
        for &channel in &MaterialChannel::ALL {
            let prefix = channel.uniform_prefix();

            assert_eq!(channel.color_uniform(), format!("{}.color", prefix));
            assert_eq!(channel.sampler_uniform(), format!("{}.sampler", prefix));
            assert_eq!(channel.use_sampler_uniform(), format!("{}.useSampler", prefix));
        }
    }

    #[test]
    fn colors_normalize_to_unit_range() {
        assert_eq!(Color::new(255, 0, 51, 255).to_vec4(), [1.0, 0.0, 0.2, 1.0]);
    }
}
