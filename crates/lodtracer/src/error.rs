use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("texture {width}x{height} cannot hold {texels} texels")]
    InvalidTexture { width: u32, height: u32, texels: usize },

    #[error("unknown texture id {0}")]
    UnknownTexture(usize),

    #[error("unknown material id {0}")]
    UnknownMaterial(usize),

    #[error("unknown mesh id {0}")]
    UnknownMesh(usize),

    #[error("malformed mesh {label:?}: {reason}")]
    InvalidMesh { label: String, reason: String },

    #[error("g-buffer channel {channel} has {actual} texels, expected {expected}")]
    GBufferSize {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("cannot load image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot load obj file {path}")]
    Obj {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
