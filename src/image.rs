//! Three-plane images and color space handling.

use log::debug;

use crate::channel::Channel;
use crate::error::EncodeError;

/// Sample type carried through the transform stages.
pub type Sample = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Rgb,
    YCbCr,
}

/// A three-channel raster. Slot 0 holds Y or R, slot 1 Cb or G,
/// slot 2 Cr or B; conversions never reorder slots.
///
/// `subsample_width`/`subsample_height` are the dimensions of the two
/// chroma channels; they equal `width`/`height` until the subsampler
/// shrinks them.
#[derive(Debug, Clone)]
pub struct Image<T> {
    pub width: usize,
    pub height: usize,
    color_space: ColorSpace,
    channels: [Channel<T>; 3],
    subsample_width: usize,
    subsample_height: usize,
}

impl<T: Copy + Default> Image<T> {
    pub fn new(width: usize, height: usize, color_space: ColorSpace) -> Self {
        Self {
            width,
            height,
            color_space,
            channels: [
                Channel::new(height, width),
                Channel::new(height, width),
                Channel::new(height, width),
            ],
            subsample_width: width,
            subsample_height: height,
        }
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    pub fn channel(&self, slot: usize) -> &Channel<T> {
        &self.channels[slot]
    }

    pub fn channel_mut(&mut self, slot: usize) -> &mut Channel<T> {
        &mut self.channels[slot]
    }

    pub fn subsample_width(&self) -> usize {
        self.subsample_width
    }

    pub fn subsample_height(&self) -> usize {
        self.subsample_height
    }

    pub(crate) fn replace_chroma(&mut self, cb: Channel<T>, cr: Channel<T>) {
        debug_assert_eq!(cb.rows(), cr.rows());
        debug_assert_eq!(cb.cols(), cr.cols());
        self.subsample_height = cb.rows();
        self.subsample_width = cb.cols();
        self.channels[1] = cb;
        self.channels[2] = cr;
    }

    /// Pads width and height up to the next multiple of 8 by
    /// replicating the right and bottom border samples. Runs before
    /// subsampling, so all three channels are padded alike.
    pub fn pad_to_block_grid(&mut self) {
        let new_w = self.width.next_multiple_of(8);
        let new_h = self.height.next_multiple_of(8);
        if new_w == self.width && new_h == self.height {
            return;
        }
        debug!(
            "padding {}x{} to {}x{}",
            self.width, self.height, new_w, new_h
        );
        for channel in &mut self.channels {
            channel.resize(new_h, new_w);
        }
        self.width = new_w;
        self.height = new_h;
        self.subsample_width = new_w;
        self.subsample_height = new_h;
    }
}

/// JFIF forward matrix, applied to samples in [0, 255]. Both luma and
/// chroma come out centered around 0 for the DCT.
const LUMA: [Sample; 3] = [0.299, 0.587, 0.114];
const CB: [Sample; 3] = [-0.168736, -0.331264, 0.5];
const CR: [Sample; 3] = [0.5, -0.418688, -0.081312];
const CENTER: Sample = 128.0;

impl Image<u8> {
    /// RGB to centered YCbCr. Converting an image that is already in
    /// the target space returns an unchanged copy; any other mismatch
    /// is an error.
    pub fn to_ycbcr(&self) -> Result<Image<Sample>, EncodeError> {
        match self.color_space {
            ColorSpace::YCbCr => return Ok(self.map_samples()),
            ColorSpace::Rgb => {}
        }

        let mut out = Image::<Sample>::new(self.width, self.height, ColorSpace::YCbCr);
        for r in 0..self.height {
            for c in 0..self.width {
                let red = self.channels[0].get(r, c) as Sample;
                let green = self.channels[1].get(r, c) as Sample;
                let blue = self.channels[2].get(r, c) as Sample;

                let y = LUMA[0] * red + LUMA[1] * green + LUMA[2] * blue - CENTER;
                let cb = CB[0] * red + CB[1] * green + CB[2] * blue;
                let cr = CR[0] * red + CR[1] * green + CR[2] * blue;

                out.channels[0].set(r, c, y);
                out.channels[1].set(r, c, cb);
                out.channels[2].set(r, c, cr);
            }
        }
        Ok(out)
    }

    fn map_samples(&self) -> Image<Sample> {
        let mut out = Image::<Sample>::new(self.width, self.height, self.color_space);
        for (slot, channel) in self.channels.iter().enumerate() {
            out.channels[slot] = channel.map(|v| v as Sample);
        }
        out
    }
}

impl Image<Sample> {
    /// Inverse of [`Image::to_ycbcr`], quantizing back to bytes.
    pub fn to_rgb(&self) -> Result<Image<u8>, EncodeError> {
        if self.color_space != ColorSpace::YCbCr {
            return Err(EncodeError::InvalidColorSpace {
                from: self.color_space,
                to: ColorSpace::Rgb,
            });
        }
        let mut out = Image::<u8>::new(self.width, self.height, ColorSpace::Rgb);
        for r in 0..self.height {
            for c in 0..self.width {
                let y = self.channels[0].get(r, c) + CENTER;
                let cb = self.channels[1].get(r, c);
                let cr = self.channels[2].get(r, c);

                let red = y + 1.402 * cr;
                let green = y - 0.344136 * cb - 0.714136 * cr;
                let blue = y + 1.772 * cb;

                out.channels[0].set(r, c, quantize_byte(red));
                out.channels[1].set(r, c, quantize_byte(green));
                out.channels[2].set(r, c, quantize_byte(blue));
            }
        }
        Ok(out)
    }
}

fn quantize_byte(v: Sample) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_ycbcr_round_trip_within_one() {
        let mut img = Image::<u8>::new(16, 8, ColorSpace::Rgb);
        for r in 0..8 {
            for c in 0..16 {
                img.channel_mut(0).set(r, c, (r * 31 + c * 5) as u8);
                img.channel_mut(1).set(r, c, (255 - r * 17 - c) as u8);
                img.channel_mut(2).set(r, c, (r * c * 3 % 256) as u8);
            }
        }

        let back = img.to_ycbcr().unwrap().to_rgb().unwrap();
        for slot in 0..3 {
            for r in 0..8 {
                for c in 0..16 {
                    let a = img.channel(slot).get(r, c) as i32;
                    let b = back.channel(slot).get(r, c) as i32;
                    assert!(
                        (a - b).abs() <= 1,
                        "slot {slot} ({r},{c}): {a} vs {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn conversion_centers_samples() {
        let mut img = Image::<u8>::new(8, 8, ColorSpace::Rgb);
        for slot in 0..3 {
            for r in 0..8 {
                for c in 0..8 {
                    img.channel_mut(slot).set(r, c, 128);
                }
            }
        }
        let ycc = img.to_ycbcr().unwrap();
        assert!(ycc.channel(0).get(0, 0).abs() < 1.0);
        assert!(ycc.channel(1).get(0, 0).abs() < 1e-9);
        assert!(ycc.channel(2).get(0, 0).abs() < 1e-9);
    }

    #[test]
    fn to_rgb_rejects_rgb_input() {
        let img = Image::<Sample>::new(8, 8, ColorSpace::Rgb);
        assert!(matches!(
            img.to_rgb(),
            Err(EncodeError::InvalidColorSpace { .. })
        ));
    }

    #[test]
    fn padding_replicates_edges() {
        let mut img = Image::<u8>::new(10, 5, ColorSpace::Rgb);
        for r in 0..5 {
            for c in 0..10 {
                img.channel_mut(0).set(r, c, (r * 10 + c) as u8);
            }
        }
        img.pad_to_block_grid();
        assert_eq!(img.width, 16);
        assert_eq!(img.height, 8);
        assert_eq!(img.subsample_width(), 16);

        // right strip replicates the last column
        assert_eq!(img.channel(0).get(2, 15), img.channel(0).get(2, 9));
        // bottom strip replicates the last row
        assert_eq!(img.channel(0).get(7, 3), img.channel(0).get(4, 3));
        // corner
        assert_eq!(img.channel(0).get(7, 15), img.channel(0).get(4, 9));
    }

    #[test]
    fn padding_is_noop_on_aligned_dimensions() {
        let mut img = Image::<u8>::new(16, 24, ColorSpace::Rgb);
        img.pad_to_block_grid();
        assert_eq!((img.width, img.height), (16, 24));
    }
}
