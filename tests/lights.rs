mod common;

use common::*;
use solstice::{Color, Error, LightKind, UniformValue, MAX_LIGHTS};

#[test]
fn fifth_light_exceeds_capacity() {
    let (_, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));

    for index in 0..MAX_LIGHTS {
        let light = environment
            .create_light(LightKind::Point, [index as f32, 1.0, 0.0], [0.0; 3], Color::WHITE)
            .unwrap();

        assert_eq!(light.index(), index);
    }

    let result = environment.create_light(LightKind::Point, [0.0; 3], [0.0; 3], Color::WHITE);

    assert!(matches!(result, Err(Error::CapacityExceeded { max: 4 })));
    assert_eq!(environment.light_count(), 4);
}

#[test]
fn light_values_read_back_from_shader() {
    let (_, gl) = context(32, 16);
    let environment = environment(&gl, &flat_hdr(0.5));
    let shader = environment.pbr_shader();

    let rig = [
        (LightKind::Point, [3.5, 1.0, 0.0], Color::new(255, 0, 0, 255)),
        (LightKind::Point, [0.0, 1.0, 3.5], Color::new(0, 255, 0, 255)),
        (LightKind::Point, [-3.5, 1.0, 0.0], Color::new(0, 0, 255, 255)),
        (LightKind::Directional, [0.0, 2.0, -3.5], Color::new(255, 0, 255, 255)),
    ];

    let lights: Vec<_> = rig
        .iter()
        .map(|&(kind, position, color)| {
            environment
                .create_light(kind, position, [0.0; 3], color)
                .unwrap()
        })
        .collect();

    assert_eq!(
        shader.uniform("lights[2].position"),
        Some(UniformValue::Vec3([-3.5, 1.0, 0.0]))
    );
    assert_eq!(shader.uniform("lights[2].type"), Some(UniformValue::Int(1)));
    assert_eq!(shader.uniform("lights[3].type"), Some(UniformValue::Int(0)));
    assert_eq!(
        shader.uniform("lights[3].color"),
        Some(UniformValue::Vec4([1.0, 0.0, 1.0, 1.0]))
    );
    assert_eq!(shader.uniform("lights[0].enabled"), Some(UniformValue::Int(1)));

    let mut moved = lights[1].clone();
    moved.position = [1.0, 2.0, 3.0];
    moved.enabled = false;

    environment.update_light(&moved);
    environment.update_light(&moved);

    assert_eq!(
        shader.uniform("lights[1].position"),
        Some(UniformValue::Vec3([1.0, 2.0, 3.0]))
    );
    assert_eq!(shader.uniform("lights[1].enabled"), Some(UniformValue::Int(0)));
    assert_eq!(
        shader.uniform("lights[0].position"),
        Some(UniformValue::Vec3([3.5, 1.0, 0.0]))
    );
}

#[test]
fn light_counters_are_per_environment() {
    let (_, gl) = context(32, 16);
    let first = environment(&gl, &flat_hdr(0.5));
    let second = environment(&gl, &flat_hdr(0.5));

    for _ in 0..MAX_LIGHTS {
        first
            .create_light(LightKind::Point, [0.0; 3], [0.0; 3], Color::WHITE)
            .unwrap();
    }

    let light = second
        .create_light(LightKind::Directional, [0.0; 3], [0.0; 3], Color::WHITE)
        .unwrap();

    assert_eq!(light.index(), 0);
    assert_eq!(first.light_count(), 4);
    assert_eq!(second.light_count(), 1);
}
