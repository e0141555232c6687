use thiserror::Error;

use crate::image::ColorSpace;
use crate::subsample::SubsamplingMode;

/// Errors surfaced by the encode pipeline.
///
/// Nothing is recovered locally; every failure propagates to the
/// top-level encode call and from there to the CLI.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ppm: {0}")]
    InvalidPpm(String),

    #[error("invalid color space conversion: {from:?} -> {to:?}")]
    InvalidColorSpace { from: ColorSpace, to: ColorSpace },

    #[error("subsampling mode {mode} incompatible with {width}x{height} image")]
    InvalidSubsampling {
        mode: SubsamplingMode,
        width: usize,
        height: usize,
    },

    #[error("cannot build a length-limited Huffman code for {symbols} symbols")]
    CodeLengthExceeded { symbols: usize },
}

impl EncodeError {
    pub fn invalid_ppm(detail: impl Into<String>) -> Self {
        Self::InvalidPpm(detail.into())
    }
}
