#![deny(unsafe_code)]

#[allow(unused_imports)]
use log::{debug, info, warn};

macro_rules! export {
    [$( $module:ident ),* $(,)*] => {
        $(
            mod $module;
            pub use self::$module::*;
        )*
    };
}

/// Maximum number of lights a single environment can register.
pub const MAX_LIGHTS: usize = 4;

/// Number of mip levels in the prefiltered specular cubemap.
pub const MAX_MIPMAP_LEVELS: usize = 5;

pub mod shaders {
    use crate::ShaderInfo;

    include!(concat!(env!("OUT_DIR"), "/glsl_shaders.rs"));
}

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[cfg(feature = "software")]
pub mod software;

#[cfg(feature = "software")]
pub use self::software::{DrawRecord, SoftwareContext};

export![device, engine, error, scene, viewer, web];
