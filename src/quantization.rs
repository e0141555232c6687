//! Quantization tables and coefficient quantization.

use crate::channel::Channel;
use crate::dct::{BLOCK_DIM, BLOCK_SIZE};
use crate::image::Sample;

/// Standard JPEG luminance quantization table (Annex K, quality 50).
pub const STD_LUMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    16, 11, 10, 16, 24, 40, 51, 61,
    12, 12, 14, 19, 26, 58, 60, 55,
    14, 13, 16, 24, 40, 57, 69, 56,
    14, 17, 22, 29, 51, 87, 80, 62,
    18, 22, 37, 56, 68, 109, 103, 77,
    24, 35, 55, 64, 81, 104, 113, 92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103, 99,
];

/// Standard JPEG chrominance quantization table (Annex K, quality 50).
pub const STD_CHROMINANCE_QUANT_TABLE: [u8; BLOCK_DIM] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// Identity table; quantization becomes plain rounding.
pub const ONES_QUANT_TABLE: [u8; BLOCK_DIM] = [1; BLOCK_DIM];

/// Scales a base table by a quality factor (1-100, 50 = unscaled),
/// using the libjpeg quality curve. Entries clamp to 1..=255.
pub fn scaled_quant_table(base_table: &[u8; BLOCK_DIM], quality: u32) -> [u8; BLOCK_DIM] {
    let quality = quality.clamp(1, 100);
    let s = if quality < 50 {
        5000 / quality
    } else {
        200 - 2 * quality
    };

    let mut scaled = [0u8; BLOCK_DIM];
    for (slot, &base) in scaled.iter_mut().zip(base_table.iter()) {
        *slot = ((base as u32 * s + 50) / 100).clamp(1, 255) as u8;
    }
    scaled
}

/// Divides one coefficient block by the table, rounding to nearest.
pub fn quantize_block(
    dct_block: &[Sample; BLOCK_DIM],
    quant_table: &[u8; BLOCK_DIM],
    output: &mut [i32; BLOCK_DIM],
) {
    for i in 0..BLOCK_DIM {
        output[i] = (dct_block[i] / quant_table[i] as Sample).round() as i32;
    }
}

/// Quantizes every 8x8 block of a DCT coefficient plane.
pub fn quantize_channel(dct: &Channel<Sample>, quant_table: &[u8; BLOCK_DIM]) -> Channel<i32> {
    debug_assert!(dct.rows() % BLOCK_SIZE == 0 && dct.cols() % BLOCK_SIZE == 0);
    let mut out = Channel::<i32>::new(dct.rows(), dct.cols());
    let mut quantized = [0i32; BLOCK_DIM];
    for r0 in (0..dct.rows()).step_by(BLOCK_SIZE) {
        for c0 in (0..dct.cols()).step_by(BLOCK_SIZE) {
            let block = dct.block(r0, c0);
            quantize_block(&block, quant_table, &mut quantized);
            out.set_block(r0, c0, &quantized);
        }
    }
    out
}
