#[allow(unused_imports)]
use log::{debug, info, warn};

use crate::{Color, Environment, Error, LightDescriptor, LightKind, UniformLocation, MAX_LIGHTS};

#[derive(Clone, Copy, Debug)]
struct LightLocations {
    enabled: Option<UniformLocation>,
    kind: Option<UniformLocation>,
    position: Option<UniformLocation>,
    target: Option<UniformLocation>,
    color: Option<UniformLocation>,
}

/// A light registered in one slot of an environment's PBR shader.
///
/// Fields may be freely modified, changes reach the shader on the next
/// `Environment::update_light` call.
#[derive(Clone, Debug)]
pub struct Light {
    pub kind: LightKind,
    pub enabled: bool,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub color: Color,

    index: usize,
    locations: LightLocations,
}

impl Light {
    /// Slot of this light in the shader light array.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Copies the state of a scene light description.
    pub fn apply(&mut self, descriptor: &LightDescriptor) {
        self.kind = descriptor.kind;
        self.enabled = descriptor.enabled;
        self.position = descriptor.position;
        self.target = descriptor.target;
        self.color = descriptor.color;
    }
}

/// Name of a member of a light array element, e.g. `lights[2].position`.
pub fn light_uniform_name(index: usize, member: &str) -> String {
    format!("lights[{}].{}", index, member)
}

impl Environment {
    /// Registers a new light in the next free shader slot.
    pub fn create_light(
        &self,
        kind: LightKind,
        position: [f32; 3],
        target: [f32; 3],
        color: Color,
    ) -> Result<Light, Error> {
        let index = self.light_count.get();

        if index >= MAX_LIGHTS {
            warn!("light rejected, {} lights already registered", MAX_LIGHTS);
            return Err(Error::CapacityExceeded { max: MAX_LIGHTS });
        }

        let location = |member| self.pbr_shader.location(&light_uniform_name(index, member));

        let light = Light {
            kind,
            enabled: true,
            position,
            target,
            color,
            index,
            locations: LightLocations {
                enabled: location("enabled"),
                kind: location("type"),
                position: location("position"),
                target: location("target"),
                color: location("color"),
            },
        };

        self.light_count.set(index + 1);
        self.update_light(&light);

        debug!("registered {:?} light in slot {}", kind, index);

        Ok(light)
    }

    /// Number of lights registered with this environment.
    pub fn light_count(&self) -> usize {
        self.light_count.get()
    }

    /// Uploads the current state of a light to the PBR shader.
    pub fn update_light(&self, light: &Light) {
        let shader = &self.pbr_shader;
        let locations = &light.locations;

        shader.set_uniform_at(locations.enabled, light.enabled);
        shader.set_uniform_at(locations.kind, light.kind.shader_value());
        shader.set_uniform_at(locations.position, light.position);
        shader.set_uniform_at(locations.target, light.target);
        shader.set_uniform_at(locations.color, light.color.to_vec4());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_names_index_the_light_array() {
        assert_eq!(light_uniform_name(0, "enabled"), "lights[0].enabled");
        assert_eq!(light_uniform_name(3, "color"), "lights[3].color");
    }
}
