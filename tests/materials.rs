mod common;

use common::*;
use image::{Rgba, RgbaImage};
use solstice::{
    Color, Context, Error, Material, MaterialChannel, Model, Placement, Texture, TextureKind,
    UniformValue, RGBA8,
};

fn checker_png() -> Vec<u8> {
    encode_png(RgbaImage::from_fn(4, 4, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([255, 255, 255, 255])
        } else {
            Rgba([0, 0, 0, 255])
        }
    }))
}

#[test]
fn new_material_uses_default_constants() {
    let (_, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let material = Material::new(&environment, Color::new(200, 10, 10, 255), 40, 90);

    let color = |channel| material.property(channel).color;

    assert_eq!(color(MaterialChannel::Albedo), Color::new(200, 10, 10, 255));
    assert_eq!(color(MaterialChannel::Normals), Color::new(128, 128, 255, 255));
    assert_eq!(color(MaterialChannel::Metalness), Color::new(40, 0, 0, 0));
    assert_eq!(color(MaterialChannel::Roughness), Color::new(90, 0, 0, 0));
    assert_eq!(color(MaterialChannel::AmbientOcclusion), Color::WHITE);
    assert_eq!(color(MaterialChannel::Emission), Color::new(0, 0, 0, 0));
    assert_eq!(color(MaterialChannel::Height), Color::new(0, 0, 0, 0));

    for &channel in &MaterialChannel::ALL {
        assert!(!material.property(channel).use_bitmap());

        assert_eq!(
            environment.pbr_shader().uniform(channel.sampler_uniform()),
            Some(UniformValue::Int(channel.texture_unit() as i32))
        );
    }

    let model = Model::uv_sphere(&gl, 1.0, 4, 2).unwrap();
    environment.draw_model(&model, &material, &Placement::default());

    match environment.pbr_shader().uniform("roughness.color") {
        Some(UniformValue::Vec3([r, g, b])) => {
            assert!((r - (1.0 - 90.0 / 255.0)).abs() < 1e-6, "{}", r);
            assert_eq!((g, b), (1.0, 1.0));
        }
        other => panic!("unexpected roughness constant {:?}", other),
    }
}

#[test]
fn smoothest_roughness_byte_uploads_a_mirror() {
    let (context, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let material = Material::new(&environment, Color::WHITE, 255, 255);
    let model = Model::uv_sphere(&gl, 1.0, 4, 2).unwrap();

    environment.draw_model(&model, &material, &Placement::default());

    let draw = context.last_draw().unwrap();

    assert_eq!(
        draw.uniform("roughness.color"),
        Some(UniformValue::Vec3([0.0, 1.0, 1.0]))
    );
}

#[test]
fn untextured_draw_uploads_constants_and_leaves_material_units_empty() {
    let (context, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let material = Material::new(&environment, Color::WHITE, 255, 0);
    let model = Model::uv_sphere(&gl, 1.0, 8, 4).unwrap();

    context.clear_draws();
    environment.draw_model(&model, &material, &Placement::default());

    let draw = context.last_draw().unwrap();

    assert_eq!(draw.program, "pbr");
    assert_eq!(draw.vertex_count, model.vertex_count());
    assert_eq!(draw.unit(0), environment.irradiance().handle());
    assert_eq!(draw.unit(1), environment.prefilter().handle());
    assert_eq!(draw.unit(2), environment.brdf().handle());

    for unit in 3..10 {
        assert_eq!(draw.unit(unit), None, "unit {}", unit);
    }

    assert_eq!(
        draw.uniform("roughness.color"),
        Some(UniformValue::Vec3([1.0, 1.0, 1.0]))
    );
    assert_eq!(
        draw.uniform("metalness.color"),
        Some(UniformValue::Vec3([1.0, 0.0, 0.0]))
    );

    for &channel in &MaterialChannel::ALL {
        assert_eq!(
            draw.uniform(channel.use_sampler_uniform()),
            Some(UniformValue::Int(0))
        );
    }

    assert_eq!(
        draw.uniform("mMatrix"),
        Some(UniformValue::from(Placement::default().model_matrix()))
    );

    // nothing stays bound once the draw returns
    for unit in 0..10 {
        assert_eq!(gl.texture_binding(unit, TextureKind::Flat), None);
        assert_eq!(gl.texture_binding(unit, TextureKind::Cube), None);
    }
}

#[test]
fn textures_bind_during_draws_until_unset() {
    let (context, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let mut material = Material::new(&environment, Color::WHITE, 0, 255);
    let model = Model::uv_sphere(&gl, 1.0, 8, 4).unwrap();

    let previous = material
        .load_texture_from_memory(MaterialChannel::Albedo, "checker.png", &checker_png())
        .unwrap();

    assert!(previous.is_none());
    assert!(material.property(MaterialChannel::Albedo).use_bitmap());

    let albedo = material
        .property(MaterialChannel::Albedo)
        .texture()
        .and_then(Texture::handle);

    let textures = context.live_textures();

    environment.draw_model(&model, &material, &Placement::default());

    let draw = context.last_draw().unwrap();

    assert_eq!(draw.unit(3), albedo);
    assert_eq!(draw.uniform("albedo.useSampler"), Some(UniformValue::Int(1)));

    material.unset_texture(MaterialChannel::Albedo);

    assert!(!material.property(MaterialChannel::Albedo).use_bitmap());
    assert_eq!(context.live_textures(), textures - 1);

    environment.draw_model(&model, &material, &Placement::default());

    let draw = context.last_draw().unwrap();

    assert_eq!(draw.unit(3), None);
    assert_eq!(draw.uniform("albedo.useSampler"), Some(UniformValue::Int(0)));
}

#[test]
fn replacing_a_texture_hands_back_the_old_one() {
    let (context, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let mut material = Material::new(&environment, Color::WHITE, 0, 255);

    let mut red = Texture::<RGBA8>::new(gl.clone());
    red.upload(1, 1, &[255, 0, 0, 255]).unwrap();
    let red_handle = red.handle();

    let mut blue = Texture::<RGBA8>::new(gl.clone());
    blue.upload(1, 1, &[0, 0, 255, 255]).unwrap();

    assert!(material.set_texture(MaterialChannel::Emission, red).is_none());

    let textures = context.live_textures();
    let previous = material.set_texture(MaterialChannel::Emission, blue).unwrap();

    assert_eq!(previous.handle(), red_handle);
    assert_eq!(context.live_textures(), textures);

    drop(previous);

    assert_eq!(context.live_textures(), textures - 1);
}

#[test]
fn uploaded_textures_are_stored_bottom_up() {
    let (_, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let mut material = Material::new(&environment, Color::WHITE, 0, 255);

    // red top row, green bottom row
    let image = RgbaImage::from_fn(2, 2, |_, y| {
        if y == 0 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 255, 0, 255])
        }
    });

    material
        .load_texture_from_memory(MaterialChannel::Albedo, "rows.png", &encode_png(image))
        .unwrap();

    let texels = material
        .property(MaterialChannel::Albedo)
        .texture()
        .unwrap()
        .read()
        .unwrap();

    assert_eq!(&texels[0..4], &[0.0, 1.0, 0.0, 1.0]);
    assert_eq!(&texels[12..16], &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn undecodable_texture_is_reported() {
    let (context, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    let mut material = Material::new(&environment, Color::WHITE, 0, 255);
    let textures = context.live_textures();

    let result =
        material.load_texture_from_memory(MaterialChannel::Normals, "broken.png", b"\x89PNG junk");

    assert!(matches!(result, Err(Error::Decode { .. })));
    assert!(!material.property(MaterialChannel::Normals).use_bitmap());
    assert_eq!(context.live_textures(), textures);

    let result = material.load_texture(MaterialChannel::Normals, "missing/normals.png");

    assert!(matches!(result, Err(Error::Decode { .. })));
}

#[test]
fn rebinding_moves_material_to_new_environment() {
    let (_, gl) = context(32, 16);
    let first = environment(&gl, &flat_hdr(0.5));
    let second = environment(&gl, &flat_hdr(1.0));

    let mut material = Material::new(&first, Color::WHITE, 0, 255);

    material
        .load_texture_from_memory(MaterialChannel::Albedo, "checker.png", &checker_png())
        .unwrap();

    material.rebind(&second);

    assert!(std::rc::Rc::ptr_eq(material.environment(), &second));
    assert!(material.property(MaterialChannel::Albedo).use_bitmap());
    assert_eq!(
        second.pbr_shader().uniform("height.sampler"),
        Some(UniformValue::Int(9))
    );
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "material is bound to another environment")]
fn drawing_with_a_foreign_material_panics() {
    let (_, gl) = context(32, 16);
    let first = environment(&gl, &flat_hdr(0.5));
    let second = environment(&gl, &flat_hdr(1.0));

    let material = Material::new(&first, Color::WHITE, 0, 255);
    let model = Model::uv_sphere(&gl, 1.0, 4, 2).unwrap();

    second.draw_model(&model, &material, &Placement::default());
}
