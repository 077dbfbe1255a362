use thiserror::Error;

/// Errors reported by environment loading, material setup and light registration.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode `{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    #[error("light capacity exceeded ({max} lights maximum)")]
    CapacityExceeded { max: usize },

    #[error("GPU resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("shader `{name}' failed to build:\n{log}")]
    Shader { name: String, log: String },

    #[error("incomplete framebuffer: {0}")]
    IncompleteFramebuffer(String),

    #[error("extension `{0}' missing")]
    MissingExtension(&'static str),
}

impl Error {
    pub(crate) fn decode(name: impl ToString, source: image::ImageError) -> Self {
        Self::Decode {
            name: name.to_string(),
            source,
        }
    }
}
