pub mod codec;
pub mod resize;

use thiserror::Error;

pub use codec::{decode, encode, EncodeFormat};
pub use resize::{resize_to_width, scaled_height};

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt image data: {0}")]
    CorruptData(String),

    #[error("No encoder for extension '{0}'")]
    UnsupportedEncodeTarget(String),

    #[error("Resized image would be {width}x{height} pixels")]
    OutputTooLarge { width: u32, height: u32 },

    #[error("Image encoding failed: {0}")]
    EncodeFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
