use thiserror::Error;

#[derive(Error, Debug)]
pub enum SosDiskError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image size {size} is not a multiple of 512-byte blocks")]
    PartialBlock { size: u64 },

    #[error("DOS-ordered images must be 143360 bytes (35 tracks x 16 sectors), got {size}")]
    NotAFloppyImage { size: u64 },

    #[error("cannot infer sector order from {0}; pass --do or --po")]
    UnknownSectorOrder(String),

    #[error("volume decode failed: {0}")]
    Decode(#[from] crate::fs::DecodeError),
}
