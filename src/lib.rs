/*!
# jfifenc-rs

`jfifenc-rs` is a pure Rust baseline sequential DCT JPEG encoder. It
reads an uncompressed PPM raster (P3 or P6) and produces a
JFIF-compliant byte stream.

## Pipeline

- **Color conversion**: RGB to YCbCr (JFIF matrix), samples centered
  around zero for the DCT.
- **Padding**: width and height grow to the next multiple of 8 by
  replicating border pixels.
- **Subsampling**: optional chroma downsampling (4:4:4, 4:2:2, 4:1:1
  and three 4:2:0 variants).
- **DCT**: blocked forward 8x8 transform with three interchangeable
  kernels (direct sum, basis-matrix product, Arai-Agui-Nakajima).
- **Quantization**: Annex K tables scaled by a quality factor.
- **Entropy coding**: DC difference coding, AC run-length coding,
  category coding, and two length-limited canonical Huffman tables
  built per image with package-merge.
- **Assembly**: marker segments (SOI, APP0, DQT, SOF0, DHT, SOS) and
  the byte-stuffed entropy-coded scan.

## Example

```no_run
use jfifenc_rs::{JpegEncoder, SubsamplingMode};

let mut encoder = JpegEncoder::new();
encoder.subsampling = SubsamplingMode::S420;
encoder.quality = 90;
encoder
    .encode_file("input.ppm".as_ref(), "output.jpg".as_ref())
    .expect("encode failed");
```

## Safety

The crate contains no `unsafe` code. The DCT worker pool uses scoped
threads over disjoint destination slices.
*/

pub mod bitstream;
pub mod channel;
pub mod coding;
pub mod dct;
pub mod encoder;
pub mod error;
pub mod huffman;
pub mod image;
pub mod jpeg_marker_code;
pub mod jpeg_stream_writer;
pub mod ppm;
pub mod quantization;
pub mod subsample;

pub use dct::DctKernel;
pub use encoder::JpegEncoder;
pub use error::EncodeError;
pub use image::{ColorSpace, Image};
pub use subsample::SubsamplingMode;

/// Result alias used throughout the crate.
pub type EncodeResult<T> = Result<T, EncodeError>;
