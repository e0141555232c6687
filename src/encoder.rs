//! Baseline JPEG encode orchestration.
//!
//! `JpegEncoder` drives the stage sequence: color conversion,
//! padding, chroma subsampling, blocked DCT, quantization, DC
//! prediction, zig-zag, run-length and category coding, Huffman table
//! construction, and finally marker segment plus scan emission.

use std::io::Write;
use std::path::Path;

use log::{debug, info};

use crate::bitstream::Bitstream;
use crate::channel::Channel;
use crate::coding::{self, CategoryCode};
use crate::dct::{forward_channel, DctKernel, BLOCK_SIZE};
use crate::error::EncodeError;
use crate::huffman::HuffmanTable;
use crate::image::Image;
use crate::jpeg_stream_writer::{ComponentSpec, JpegStreamWriter, TableClass};
use crate::quantization::{
    quantize_channel, scaled_quant_table, STD_CHROMINANCE_QUANT_TABLE, STD_LUMINANCE_QUANT_TABLE,
};
use crate::subsample::{self, SubsamplingMode};
use crate::{ppm, EncodeResult};

/// APP0 default pixel density (aspect ratio 0x48:0x48).
const DEFAULT_DENSITY: u16 = 0x48;

#[derive(Debug, Clone)]
pub struct JpegEncoder {
    pub subsampling: SubsamplingMode,
    pub kernel: DctKernel,
    /// 1..=100, libjpeg quality curve; 50 keeps the Annex K tables.
    pub quality: u32,
    /// Worker threads for the DCT stage; 1 disables the pool.
    pub workers: usize,
    /// Encode the luma channel only into a single-component JPEG.
    pub grayscale: bool,
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self {
            subsampling: SubsamplingMode::S444,
            kernel: DctKernel::Arai,
            quality: 85,
            workers: 1,
            grayscale: false,
        }
    }
}

/// Entropy-coding input for one component: per block (in scan
/// emission order), the DC category code followed by the AC codes.
struct ComponentCodes {
    spec: ComponentSpec,
    blocks_per_mcu: usize,
    blocks: Vec<Vec<CategoryCode>>,
}

impl JpegEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes an RGB image into a complete JFIF byte stream.
    pub fn encode(&self, image: &Image<u8>) -> EncodeResult<Vec<u8>> {
        let mut writer = JpegStreamWriter::new(Vec::new());
        self.encode_to(image, &mut writer)?;
        Ok(writer.into_inner())
    }

    /// Loads a PPM file and writes the encoded JPEG to `output`.
    /// The output bytes are fully assembled in memory before the
    /// file is touched.
    pub fn encode_file(&self, input: &Path, output: &Path) -> EncodeResult<()> {
        let image = ppm::load(input)?;
        let bytes = self.encode(&image)?;
        std::fs::write(output, &bytes)?;
        info!(
            "wrote {} ({} bytes from {}x{} pixels)",
            output.display(),
            bytes.len(),
            image.width,
            image.height
        );
        Ok(())
    }

    fn encode_to<W: Write>(
        &self,
        image: &Image<u8>,
        writer: &mut JpegStreamWriter<W>,
    ) -> EncodeResult<()> {
        if image.width > u16::MAX as usize || image.height > u16::MAX as usize {
            return Err(EncodeError::invalid_ppm(format!(
                "{}x{} exceeds the 16-bit frame size limit",
                image.width, image.height
            )));
        }
        let (true_width, true_height) = (image.width as u16, image.height as u16);

        let mut ycc = image.to_ycbcr()?;
        ycc.pad_to_block_grid();
        if !self.grayscale {
            subsample::apply(&mut ycc, self.subsampling)?;
        }

        let luma_table = scaled_quant_table(&STD_LUMINANCE_QUANT_TABLE, self.quality);
        let chroma_table = scaled_quant_table(&STD_CHROMINANCE_QUANT_TABLE, self.quality);

        let (h, v) = if self.grayscale {
            (1, 1)
        } else {
            self.subsampling.luma_sampling_factors()
        };
        let mcu_count = (ycc.height / (BLOCK_SIZE * v as usize))
            * (ycc.width / (BLOCK_SIZE * h as usize));

        let mut components = Vec::with_capacity(3);
        let slots: &[usize] = if self.grayscale { &[0] } else { &[0, 1, 2] };
        for &slot in slots {
            let is_luma = slot == 0;
            let table = if is_luma { &luma_table } else { &chroma_table };
            let (ch, cv) = if is_luma { (h, v) } else { (1, 1) };

            let dct = forward_channel(ycc.channel(slot), self.kernel, self.workers.max(1));
            let quantized = quantize_channel(&dct, table);
            let blocks = entropy_blocks(&quantized, ch as usize, cv as usize);
            debug_assert_eq!(blocks.len(), mcu_count * (ch * cv) as usize);

            components.push(ComponentCodes {
                spec: ComponentSpec {
                    id: slot as u8 + 1,
                    horizontal_sampling: ch,
                    vertical_sampling: cv,
                    quant_table: if is_luma { 0 } else { 1 },
                    dc_table: 0,
                    ac_table: 0,
                },
                blocks_per_mcu: (ch * cv) as usize,
                blocks,
            });
        }

        let (dc_table, ac_table) = build_tables(&components)?;
        let scan = assemble_scan(&components, mcu_count, &dc_table, &ac_table);
        info!(
            "entropy-coded scan: {} mcus, {} bits",
            mcu_count,
            scan.len()
        );

        let specs: Vec<ComponentSpec> = components.iter().map(|c| c.spec).collect();
        writer.write_start_of_image()?;
        writer.write_app0_jfif(DEFAULT_DENSITY, DEFAULT_DENSITY)?;
        writer.write_dqt(0, &luma_table)?;
        if !self.grayscale {
            writer.write_dqt(1, &chroma_table)?;
        }
        writer.write_sof0(true_width, true_height, &specs)?;
        writer.write_dht(TableClass::Dc, 0, &dc_table)?;
        writer.write_dht(TableClass::Ac, 0, &ac_table)?;
        writer.write_sos(&specs)?;
        writer.write_entropy_scan(&scan)?;
        writer.write_end_of_image()?;
        Ok(())
    }
}

/// Block origins of one component in scan emission order: MCUs
/// left-to-right, top-to-bottom, and the `h x v` blocks inside each
/// MCU row-major. For 1x1 sampling this is plain row-major block
/// order.
fn block_origins(rows: usize, cols: usize, h: usize, v: usize) -> Vec<(usize, usize)> {
    let mcu_rows = rows / (BLOCK_SIZE * v);
    let mcu_cols = cols / (BLOCK_SIZE * h);
    let mut origins = Vec::with_capacity(mcu_rows * mcu_cols * h * v);
    for mr in 0..mcu_rows {
        for mc in 0..mcu_cols {
            for by in 0..v {
                for bx in 0..h {
                    origins.push(((mr * v + by) * BLOCK_SIZE, (mc * h + bx) * BLOCK_SIZE));
                }
            }
        }
    }
    origins
}

/// Runs DC prediction, zig-zag, RLE and category coding over every
/// block of a quantized plane. The DC predictor follows the same
/// emission order as the scan.
fn entropy_blocks(quantized: &Channel<i32>, h: usize, v: usize) -> Vec<Vec<CategoryCode>> {
    let mut dc_previous = 0i32;
    block_origins(quantized.rows(), quantized.cols(), h, v)
        .into_iter()
        .map(|(r0, c0)| {
            let mut zz = coding::zigzag(&quantized.block(r0, c0));
            let dc = zz[0];
            zz[0] = dc - dc_previous;
            dc_previous = dc;
            coding::encode_category(&coding::rle_ac(&zz))
        })
        .collect()
}

/// One DC and one AC table over the symbols of all components.
fn build_tables(
    components: &[ComponentCodes],
) -> Result<(HuffmanTable, HuffmanTable), EncodeError> {
    let mut dc_freqs = [0u32; 256];
    let mut ac_freqs = [0u32; 256];
    for component in components {
        for block in &component.blocks {
            dc_freqs[block[0].symbol as usize] += 1;
            for code in &block[1..] {
                ac_freqs[code.symbol as usize] += 1;
            }
        }
    }
    debug!(
        "dc symbols: {}, ac symbols: {}",
        dc_freqs.iter().filter(|&&f| f > 0).count(),
        ac_freqs.iter().filter(|&&f| f > 0).count()
    );
    Ok((
        HuffmanTable::from_frequencies(&dc_freqs)?,
        HuffmanTable::from_frequencies(&ac_freqs)?,
    ))
}

/// Interleaves the components MCU by MCU and pads the tail with
/// 1-bits to a byte boundary.
fn assemble_scan(
    components: &[ComponentCodes],
    mcu_count: usize,
    dc_table: &HuffmanTable,
    ac_table: &HuffmanTable,
) -> Bitstream<u64> {
    let mut scan = Bitstream::new();
    let mut cursors = vec![0usize; components.len()];
    for _ in 0..mcu_count {
        for (component, cursor) in components.iter().zip(cursors.iter_mut()) {
            for _ in 0..component.blocks_per_mcu {
                let block = &component.blocks[*cursor];
                *cursor += 1;

                let dc = &block[0];
                let code = dc_table.code(dc.symbol);
                scan.push_bits(code.value as u64, code.length as u32);
                scan.push_bits(dc.magnitude as u64, dc.magnitude_len as u32);

                for ac in &block[1..] {
                    let code = ac_table.code(ac.symbol);
                    scan.push_bits(code.value as u64, code.length as u32);
                    scan.push_bits(ac.magnitude as u64, ac.magnitude_len as u32);
                }
            }
        }
    }
    scan.fill_to_byte();
    scan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ColorSpace;

    fn gradient_image(width: usize, height: usize) -> Image<u8> {
        let mut img = Image::<u8>::new(width, height, ColorSpace::Rgb);
        for r in 0..height {
            for c in 0..width {
                img.channel_mut(0).set(r, c, ((r * 5 + c * 3) % 256) as u8);
                img.channel_mut(1).set(r, c, ((r * 2 + c * 7) % 256) as u8);
                img.channel_mut(2).set(r, c, ((255 + r - c) % 256) as u8);
            }
        }
        img
    }

    #[test]
    fn block_origins_interleave_luma_quads() {
        // 32x32 plane at 2x2 sampling: MCU0 covers the top-left
        // 16x16 pixels with its four blocks row-major
        let origins = block_origins(32, 32, 2, 2);
        assert_eq!(origins.len(), 16);
        assert_eq!(
            &origins[..4],
            &[(0, 0), (0, 8), (8, 0), (8, 8)]
        );
        assert_eq!(origins[4], (0, 16));
        assert_eq!(origins[8], (16, 0));
    }

    #[test]
    fn block_origins_row_major_for_full_sampling() {
        let origins = block_origins(16, 24, 1, 1);
        assert_eq!(
            origins,
            vec![
                (0, 0),
                (0, 8),
                (0, 16),
                (8, 0),
                (8, 8),
                (8, 16),
            ]
        );
    }

    #[test]
    fn dc_prediction_differences() {
        // two horizontally adjacent blocks with constant samples 40
        // and 60: second DC symbol encodes the difference
        let mut plane = Channel::<i32>::new(8, 16);
        for r in 0..8 {
            for c in 0..8 {
                plane.set(r, c, if r == 0 && c == 0 { 40 } else { 0 });
            }
        }
        plane.set(0, 8, 60);
        let blocks = entropy_blocks(&plane, 1, 1);
        assert_eq!(blocks.len(), 2);

        // first block: diff = 40 - 0
        let first_dc = blocks[0][0];
        assert_eq!(first_dc.symbol, coding::category(40));
        // second block: diff = 60 - 40 = 20
        let second_dc = blocks[1][0];
        assert_eq!(second_dc.symbol, coding::category(20));
        let (bits, len) = coding::magnitude_bits(20, coding::category(20));
        assert_eq!((second_dc.magnitude, second_dc.magnitude_len), (bits, len));
    }

    #[test]
    fn encode_produces_framed_stream() {
        let encoder = JpegEncoder::new();
        let bytes = encoder.encode(&gradient_image(24, 16)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
        // JFIF APP0 comes right after SOI
        assert_eq!(&bytes[2..4], &[0xFF, 0xE0]);
    }

    #[test]
    fn encode_is_deterministic() {
        let encoder = JpegEncoder {
            subsampling: SubsamplingMode::S420,
            ..JpegEncoder::new()
        };
        let img = gradient_image(32, 32);
        assert_eq!(encoder.encode(&img).unwrap(), encoder.encode(&img).unwrap());
    }

    #[test]
    fn kernels_produce_identical_streams() {
        // f64 DCT kernels agree far below the quantization step, so
        // the quantized coefficients and the bytes must match
        let img = gradient_image(16, 16);
        let streams: Vec<Vec<u8>> = [DctKernel::Direct, DctKernel::Matrix, DctKernel::Arai]
            .into_iter()
            .map(|kernel| {
                JpegEncoder {
                    kernel,
                    ..JpegEncoder::new()
                }
                .encode(&img)
                .unwrap()
            })
            .collect();
        assert_eq!(streams[0], streams[1]);
        assert_eq!(streams[0], streams[2]);
    }

    #[test]
    fn worker_count_does_not_change_output() {
        let img = gradient_image(48, 40);
        let single = JpegEncoder {
            workers: 1,
            ..JpegEncoder::new()
        };
        let pooled = JpegEncoder {
            workers: 4,
            ..JpegEncoder::new()
        };
        assert_eq!(single.encode(&img).unwrap(), pooled.encode(&img).unwrap());
    }

    #[test]
    fn rejects_subsampling_for_undersized_images() {
        let encoder = JpegEncoder {
            subsampling: SubsamplingMode::S411,
            ..JpegEncoder::new()
        };
        // padded width 16: 4:1:1 chroma would be 4 wide
        assert!(matches!(
            encoder.encode(&gradient_image(16, 16)),
            Err(EncodeError::InvalidSubsampling { .. })
        ));
    }

    #[test]
    fn grayscale_stream_has_one_component() {
        let encoder = JpegEncoder {
            grayscale: true,
            ..JpegEncoder::new()
        };
        let bytes = encoder.encode(&gradient_image(16, 16)).unwrap();
        // find SOF0 and read the component count byte
        let sof = bytes
            .windows(2)
            .position(|w| w == [0xFF, 0xC0])
            .expect("SOF0 missing");
        assert_eq!(bytes[sof + 9], 1);
        // single DQT in grayscale streams
        let dqt_count = bytes.windows(2).filter(|w| *w == [0xFF, 0xDB]).count();
        assert_eq!(dqt_count, 1);
    }
}
