//! Chroma subsampling.
//!
//! Each mode is described by a horizontal/vertical divisor, a column
//! mask and an optional averaging divisor; the sampling loop is the
//! same for every mode. Only the Cb and Cr channels are touched.

use std::fmt;

use log::debug;

use crate::channel::Channel;
use crate::error::EncodeError;
use crate::image::{Image, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsamplingMode {
    /// Full chroma resolution; no-op.
    S444,
    /// Every second pixel in a row.
    S422,
    /// Every fourth pixel in a row.
    S411,
    /// Every second pixel in every second row.
    S420,
    /// 4:2:0 averaging each 2x2 neighborhood.
    S420M,
    /// 4:2:0 averaging vertical pairs.
    S420Lm,
}

impl fmt::Display for SubsamplingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::S444 => "4:4:4",
            Self::S422 => "4:2:2",
            Self::S411 => "4:1:1",
            Self::S420 => "4:2:0",
            Self::S420M => "4:2:0m",
            Self::S420Lm => "4:2:0lm",
        };
        f.write_str(name)
    }
}

impl SubsamplingMode {
    pub fn horizontal_divisor(self) -> usize {
        match self {
            Self::S444 => 1,
            Self::S422 | Self::S420 | Self::S420M | Self::S420Lm => 2,
            Self::S411 => 4,
        }
    }

    pub fn vertical_divisor(self) -> usize {
        match self {
            Self::S444 | Self::S422 | Self::S411 => 1,
            Self::S420 | Self::S420M | Self::S420Lm => 2,
        }
    }

    fn mask(self) -> &'static [Sample] {
        match self {
            Self::S444 => &[1.0],
            Self::S422 | Self::S420 | Self::S420Lm => &[1.0, 0.0],
            Self::S411 => &[1.0, 0.0, 0.0, 0.0],
            Self::S420M => &[1.0, 1.0],
        }
    }

    /// Divisor of the accumulated sum when the mode averages in the
    /// next scanline as well.
    fn averaging_divisor(self) -> Option<Sample> {
        match self {
            Self::S420M => Some(4.0),
            Self::S420Lm => Some(2.0),
            _ => None,
        }
    }

    /// Per-component `(horizontal, vertical)` sampling factors for
    /// the SOF0 segment. Luma carries the divisors, chroma is 1x1.
    pub fn luma_sampling_factors(self) -> (u8, u8) {
        (
            self.horizontal_divisor() as u8,
            self.vertical_divisor() as u8,
        )
    }
}

/// Downsamples Cb and Cr in place. Requires the image to be padded to
/// the 8x8 block grid already; modes whose chroma planes would not be
/// block-aligned for these dimensions are rejected.
pub fn apply(image: &mut Image<Sample>, mode: SubsamplingMode) -> Result<(), EncodeError> {
    if mode == SubsamplingMode::S444 {
        return Ok(());
    }

    let hor = mode.horizontal_divisor();
    let vert = mode.vertical_divisor();
    let (width, height) = (image.width, image.height);
    let sub_w = width / hor;
    let sub_h = height / vert;
    if width % hor != 0 || height % vert != 0 || sub_w % 8 != 0 || sub_h % 8 != 0 {
        return Err(EncodeError::InvalidSubsampling {
            mode,
            width,
            height,
        });
    }

    debug!("subsampling {mode}: chroma {width}x{height} -> {sub_w}x{sub_h}");

    let cb = subsample_plane(image.channel(1), mode, sub_h, sub_w);
    let cr = subsample_plane(image.channel(2), mode, sub_h, sub_w);
    image.replace_chroma(cb, cr);
    Ok(())
}

fn subsample_plane(
    src: &Channel<Sample>,
    mode: SubsamplingMode,
    sub_h: usize,
    sub_w: usize,
) -> Channel<Sample> {
    let hor = mode.horizontal_divisor();
    let vert = mode.vertical_divisor();
    let mask = mode.mask();
    let averaging = mode.averaging_divisor();

    let mut dst = Channel::<Sample>::new(sub_h, sub_w);
    for y in (0..src.rows()).step_by(vert) {
        for x in (0..src.cols()).step_by(mask.len()) {
            let mut sum: Sample = mask
                .iter()
                .enumerate()
                .map(|(m, &w)| w * src.get(y, x + m))
                .sum();
            if let Some(divisor) = averaging {
                sum += mask
                    .iter()
                    .enumerate()
                    .map(|(m, &w)| w * src.get(y + 1, x + m))
                    .sum::<Sample>();
                sum /= divisor;
            }
            dst.set(y / vert, x / hor, sum);
        }
    }
    dst
}
