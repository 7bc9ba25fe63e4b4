use thiserror::Error;

#[derive(Debug, Error)]
pub enum DrawError {
    #[error("image buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("image has zero size ({width}x{height})")]
    ZeroSize { width: u32, height: u32 },

    #[error("surface is empty, nothing to encode")]
    EmptySurface,

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, DrawError>;
