mod common;

use common::*;
use solstice::{
    BackgroundMode, DrawRecord, MaterialChannel, Model, RenderMode, RenderScale, Scene,
    SoftwareContext, UniformValue, Viewer, LIGHT_DISTANCE,
};
use std::rc::Rc;

fn viewer(hdr: &[u8]) -> (Rc<SoftwareContext>, Viewer) {
    let (context, gl) = context(32, 16);
    let viewer = Viewer::new(gl, scene(), "test.hdr", hdr).unwrap();

    (context, viewer)
}

fn last_draw_of(context: &SoftwareContext, program: &str) -> DrawRecord {
    context
        .draws()
        .into_iter()
        .rev()
        .find(|draw| draw.program == program)
        .unwrap()
}

/// Default scene, looking at the horizon from the origin.
fn horizon_viewer(width: usize, height: usize) -> (Rc<SoftwareContext>, Viewer) {
    let (context, gl) = context(width, height);

    let mut scene = Scene::default();
    *scene.environment = fast_settings();
    scene.raster.width = width as u32;
    scene.raster.height = height as u32;
    scene.camera.position = [0.0, 0.0, 0.0];
    scene.camera.target = [1.0, 0.0, 0.0];

    let viewer = Viewer::new(gl, scene, "horizon.hdr", &horizon_hdr(4.0)).unwrap();

    (context, viewer)
}

#[test]
fn viewer_registers_scene_lights() {
    let (_, viewer) = viewer(&flat_hdr(0.5));

    assert_eq!(viewer.lights().len(), 4);
    assert_eq!(viewer.environment().light_count(), 4);
    assert!(Rc::ptr_eq(viewer.material().environment(), viewer.environment()));
}

#[test]
fn frame_uploads_render_mode_and_lights() {
    let (_, mut viewer) = viewer(&flat_hdr(0.5));

    viewer.scene_mut().display.render_mode = RenderMode::Normals;
    assert!(viewer.toggle_light(1));
    assert!(!viewer.toggle_light(7));
    viewer.orbit_lights(90.0);

    viewer.frame().unwrap();

    let shader = viewer.environment().pbr_shader();

    assert_eq!(shader.uniform("renderMode"), Some(UniformValue::Int(2)));
    assert_eq!(shader.uniform("lights[1].enabled"), Some(UniformValue::Int(0)));
    assert!(!viewer.lights()[1].enabled);

    match shader.uniform("lights[0].position") {
        Some(UniformValue::Vec3([x, y, z])) => {
            assert!(x.abs() < 1e-4);
            assert_eq!(y, 1.0);
            assert!((z - LIGHT_DISTANCE).abs() < 1e-4);
        }
        other => panic!("unexpected light position {:?}", other),
    }
}

#[test]
fn frame_draws_model_before_skybox() {
    let (context, mut viewer) = viewer(&flat_hdr(0.5));

    let model = Model::uv_sphere(viewer.gl(), 1.0, 6, 3).unwrap();
    viewer.set_model(model);

    context.clear_draws();
    viewer.frame().unwrap();

    let programs: Vec<String> = context.draws().into_iter().map(|d| d.program).collect();

    assert_eq!(programs, vec!["pbr", "skybox", "postfx"]);

    viewer.scene_mut().display.draw_skybox = false;

    context.clear_draws();
    viewer.frame().unwrap();

    let programs: Vec<String> = context.draws().into_iter().map(|d| d.program).collect();

    assert_eq!(programs, vec!["pbr", "postfx"]);
}

#[test]
fn background_mode_selects_sky_texture() {
    let (context, mut viewer) = viewer(&flat_hdr(0.5));

    viewer.scene_mut().display.background = BackgroundMode::Ambient;
    viewer.frame().unwrap();

    let draw = last_draw_of(&context, "skybox");

    assert_eq!(draw.unit(0), viewer.environment().irradiance().handle());
    assert_eq!(draw.uniform("skyLod"), Some(UniformValue::Float(0.0)));

    viewer.scene_mut().display.background = BackgroundMode::BlurredSky;
    viewer.frame().unwrap();

    let draw = last_draw_of(&context, "skybox");

    assert_eq!(draw.unit(0), viewer.environment().prefilter().handle());
    assert_eq!(
        draw.uniform("skyLod"),
        Some(UniformValue::Float(solstice::BLURRED_SKY_LOD))
    );
}

#[test]
fn swapping_environment_resets_light_count() {
    let (context, mut viewer) = viewer(&flat_hdr(0.5));

    viewer
        .set_texture(MaterialChannel::Albedo, "white.png", &encode_png(image::RgbaImage::new(2, 2)))
        .unwrap();

    let old = Rc::clone(viewer.environment());

    viewer.swap_environment("brighter.hdr", &flat_hdr(2.0)).unwrap();

    assert!(!Rc::ptr_eq(&old, viewer.environment()));
    assert_eq!(viewer.environment().light_count(), 4);
    assert!(Rc::ptr_eq(viewer.material().environment(), viewer.environment()));
    assert!(viewer.material().property(MaterialChannel::Albedo).use_bitmap());

    drop(old);

    // four IBL textures plus the material texture
    assert_eq!(context.live_textures(), 5);
}

#[test]
fn failed_swap_keeps_current_environment() {
    let (_, mut viewer) = viewer(&flat_hdr(0.5));

    let old = Rc::clone(viewer.environment());

    assert!(viewer.swap_environment("broken.hdr", b"nope").is_err());
    assert!(Rc::ptr_eq(&old, viewer.environment()));
    assert_eq!(viewer.environment().light_count(), 4);

    viewer.frame().unwrap();
}

#[test]
fn changed_settings_rebuild_the_environment() {
    let (_, mut viewer) = viewer(&flat_hdr(0.5));

    let old = Rc::clone(viewer.environment());

    viewer.frame().unwrap();
    assert!(Rc::ptr_eq(&old, viewer.environment()));

    viewer.scene_mut().environment.irradiance_size = 4;
    viewer.frame().unwrap();

    assert!(!Rc::ptr_eq(&old, viewer.environment()));
    assert_eq!(viewer.environment().irradiance().size(), 4);
}

#[test]
fn screenshot_is_top_row_first() {
    let (_, gl) = context(32, 16);

    let mut scene = scene();
    scene.camera.position = [0.0, 0.0, 0.0];
    scene.camera.target = [1.0, 0.0, 0.0];

    let mut viewer = Viewer::new(gl, scene, "horizon.hdr", &horizon_hdr(4.0)).unwrap();

    viewer.frame().unwrap();

    let image = viewer.screenshot().unwrap();

    assert_eq!(image.dimensions(), (32, 16));

    let top = image.get_pixel(16, 0);
    let bottom = image.get_pixel(16, 15);

    assert!(top[0] > 200, "{:?}", top);
    assert!(bottom[0] < 10, "{:?}", bottom);
    assert_eq!(top[3], 255);
    assert_eq!(bottom[3], 255);
}

#[test]
fn default_render_scale_presents_at_window_size() {
    let (context, mut viewer) = horizon_viewer(32, 16);

    assert_eq!(viewer.scene().raster.scale, RenderScale::Double);

    context.clear_draws();
    viewer.frame().unwrap();

    let target = viewer.postfx().target();
    assert_eq!((target.cols(), target.rows()), (64, 32));

    let sky = last_draw_of(&context, "skybox");
    assert!(sky.framebuffer.is_some());
    assert_eq!(sky.uniform("resolution"), Some(UniformValue::Vec2([64.0, 32.0])));

    let present = context.last_draw().unwrap();

    assert_eq!(present.program, "postfx");
    assert_eq!(present.framebuffer, None);
    assert_eq!(present.unit(0), target.handle());
    assert_eq!(present.uniform("resolution"), Some(UniformValue::Vec2([64.0, 32.0])));
    assert_eq!(context.current_viewport(), (0, 0, 32, 16));

    let image = viewer.screenshot().unwrap();

    assert_eq!(image.dimensions(), (32, 16));
    assert!(image.get_pixel(16, 0)[0] > 200, "{:?}", image.get_pixel(16, 0));
    assert!(image.get_pixel(16, 15)[0] < 10, "{:?}", image.get_pixel(16, 15));
}

#[test]
fn resizing_the_window_resizes_the_render_target() {
    let (context, mut viewer) = horizon_viewer(32, 16);

    viewer.frame().unwrap();

    viewer.scene_mut().raster.width = 16;
    viewer.scene_mut().raster.height = 8;
    viewer.frame().unwrap();

    let target = viewer.postfx().target();
    assert_eq!((target.cols(), target.rows()), (32, 16));
    assert_eq!(context.current_viewport(), (0, 0, 16, 8));
    assert_eq!(viewer.screenshot().unwrap().dimensions(), (16, 8));

    viewer.scene_mut().raster.scale = RenderScale::Half;
    viewer.frame().unwrap();

    let target = viewer.postfx().target();
    assert_eq!((target.cols(), target.rows()), (8, 4));
    assert_eq!(
        context.last_draw().unwrap().uniform("resolution"),
        Some(UniformValue::Vec2([8.0, 4.0]))
    );
}

#[test]
fn display_toggles_reach_the_post_processing_pass() {
    let (context, mut viewer) = viewer(&flat_hdr(0.5));

    viewer.frame().unwrap();

    let present = last_draw_of(&context, "postfx");

    for name in &["enabledFxaa", "enabledBloom", "enabledVignette"] {
        assert_eq!(present.uniform(name), Some(UniformValue::Int(1)), "{}", name);
    }

    viewer.scene_mut().display.bloom = false;
    viewer.scene_mut().display.vignette = false;
    viewer.frame().unwrap();

    let present = last_draw_of(&context, "postfx");

    assert_eq!(present.uniform("enabledFxaa"), Some(UniformValue::Int(1)));
    assert_eq!(present.uniform("enabledBloom"), Some(UniformValue::Int(0)));
    assert_eq!(present.uniform("enabledVignette"), Some(UniformValue::Int(0)));
}
