mod scene;

pub use scene::Scene;

export![
    camera,
    dirty,
    display,
    environment,
    light,
    material,
    placement,
    raster
];
