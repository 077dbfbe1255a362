use crate::{
    Camera, Dirty, Display, EnvironmentSettings, LightDescriptor, Placement, Raster,
    LIGHT_DISTANCE,
};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

/// # Dirty Flags
///
/// The scene keeps dirty flags relative to the viewer that consumes it, so a
/// scene instance should only ever drive a single viewer.
#[derive(Debug, Deserialize, SmartDefault, Serialize)]
#[serde(default)]
pub struct Scene {
    pub camera: Dirty<Camera>,
    pub raster: Dirty<Raster>,
    pub display: Dirty<Display>,
    pub placement: Dirty<Placement>,
    pub environment: Dirty<EnvironmentSettings>,
    #[default(Dirty::new(LightDescriptor::default_rig()))]
    pub lights: Dirty<Vec<LightDescriptor>>,

    /// Orbit angle of the light rig around the vertical axis, in degrees.
    pub light_angle: f32,
}

impl Scene {
    /// Marks the entire contents of this scene as dirty.
    pub fn dirty_all_fields(&mut self) {
        Dirty::dirty(&mut self.camera);
        Dirty::dirty(&mut self.raster);
        Dirty::dirty(&mut self.display);
        Dirty::dirty(&mut self.placement);
        Dirty::dirty(&mut self.environment);
        Dirty::dirty(&mut self.lights);
    }

    /// Patches this scene to be equal to another scene.
    ///
    /// Only fields which differ between the two scenes are dirtied.
    pub fn patch_from_other(&mut self, other: Self) {
        Dirty::patch(&mut self.camera, Camera::clone(&other.camera));
        Dirty::patch(&mut self.raster, Raster::clone(&other.raster));
        Dirty::patch(&mut self.display, *other.display);
        Dirty::patch(&mut self.placement, Placement::clone(&other.placement));
        Dirty::patch(
            &mut self.environment,
            EnvironmentSettings::clone(&other.environment),
        );
        Dirty::patch(&mut self.lights, Vec::clone(&other.lights));

        self.light_angle = other.light_angle;
    }

    /// Rotates the light rig, keeping each light's height.
    ///
    /// Light `i` sits 90 degrees further along the orbit than light `i - 1`.
    pub fn orbit_lights(&mut self, delta_degrees: f32) {
        self.light_angle += delta_degrees;

        let angle = self.light_angle;

        for (index, light) in self.lights.iter_mut().enumerate() {
            let theta = (angle + 90.0 * index as f32).to_radians();

            light.position[0] = LIGHT_DISTANCE * theta.cos();
            light.position[2] = LIGHT_DISTANCE * theta.sin();
        }
    }

    /// Flips the enabled state of a light, returning false if out of range.
    pub fn toggle_light(&mut self, index: usize) -> bool {
        if index >= self.lights.len() {
            return false;
        }

        self.lights[index].enabled = !self.lights[index].enabled;

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_spaces_lights_by_quarter_turns() {
        let mut scene = Scene::default();

        scene.orbit_lights(0.0);

        let light = &scene.lights[1];

        assert!(light.position[0].abs() < 1e-5);
        assert!((light.position[2] - LIGHT_DISTANCE).abs() < 1e-5);
        assert_eq!(scene.lights[3].position[1], 2.0);
    }

    #[test]
    fn patching_an_identical_scene_dirties_nothing() {
        let mut scene = Scene::default();
        let _ = Dirty::clean(&mut scene.camera, |_| Ok::<_, ()>(()));
        let _ = Dirty::clean(&mut scene.lights, |_| Ok::<_, ()>(()));

        scene.patch_from_other(Scene::default());

        assert!(!Dirty::is_dirty(&scene.camera));
        assert!(!Dirty::is_dirty(&scene.lights));
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let scene: Scene = serde_json::from_str(r#"{ "light_angle": 45.0 }"#).unwrap();

        assert_eq!(scene.lights.len(), 4);
        assert_eq!(scene.light_angle, 45.0);
        assert_eq!(scene.camera.field_of_view, 60.0);
    }
}
