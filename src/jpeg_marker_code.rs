use num_enum::TryFromPrimitive;

/// Marker codes emitted by the baseline encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// SOF0: Baseline sequential DCT frame.
    StartOfFrameBaseline = 0xC0,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// DQT: Defines one or more quantization tables.
    DefineQuantizationTable = 0xDB,

    /// APP0: Application data 0, used for the JFIF header.
    ApplicationData0 = 0xE0,
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        assert_eq!(JpegMarkerCode::try_from(0xD8), Ok(JpegMarkerCode::StartOfImage));
        assert_eq!(JpegMarkerCode::try_from(0xC4), Ok(JpegMarkerCode::DefineHuffmanTable));
        assert!(JpegMarkerCode::try_from(0xD0).is_err()); // restart markers unsupported
        assert_eq!(JpegMarkerCode::StartOfScan as u8, 0xDA);
    }
}
