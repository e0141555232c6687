//! JFIF marker segment emission.
//!
//! `JpegStreamWriter` produces the §byte-exact JFIF container: marker
//! segments with big-endian length fields and the byte-stuffed
//! entropy-coded scan. All segment payload knowledge lives here; the
//! encoder only decides what to write.

use std::io::Write;

use crate::bitstream::{BitBlock, Bitstream};
use crate::coding::zigzag;
use crate::error::EncodeError;
use crate::huffman::HuffmanTable;
use crate::jpeg_marker_code::{JpegMarkerCode, JPEG_MARKER_START_BYTE};

/// Huffman table class as encoded in the DHT info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// Frame layout of one component in SOF0/SOS.
#[derive(Debug, Clone, Copy)]
pub struct ComponentSpec {
    /// 1 = Y, 2 = Cb, 3 = Cr.
    pub id: u8,
    /// Horizontal sampling factor (upper SOF0 nibble).
    pub horizontal_sampling: u8,
    /// Vertical sampling factor (lower SOF0 nibble).
    pub vertical_sampling: u8,
    /// DQT destination this component dequantizes with.
    pub quant_table: u8,
    /// DC/AC DHT destinations, packed into the SOS selector byte.
    pub dc_table: u8,
    pub ac_table: u8,
}

pub struct JpegStreamWriter<W: Write> {
    sink: W,
    written: usize,
}

impl<W: Write> JpegStreamWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, written: 0 }
    }

    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), EncodeError> {
        self.sink.write_all(&[value])?;
        self.written += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, value: u16) -> Result<(), EncodeError> {
        let bytes = value.to_be_bytes();
        self.write_byte(bytes[0])?;
        self.write_byte(bytes[1])
    }

    pub fn write_marker(&mut self, marker: JpegMarkerCode) -> Result<(), EncodeError> {
        self.write_byte(JPEG_MARKER_START_BYTE)?;
        self.write_byte(marker as u8)
    }

    pub fn write_start_of_image(&mut self) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::StartOfImage)
    }

    pub fn write_end_of_image(&mut self) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::EndOfImage)
    }

    /// APP0 JFIF header: version 1.1, density unit 0 (aspect ratio
    /// only), no thumbnail.
    pub fn write_app0_jfif(&mut self, x_density: u16, y_density: u16) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::ApplicationData0)?;
        self.write_u16(16)?;
        for &byte in b"JFIF\0" {
            self.write_byte(byte)?;
        }
        self.write_byte(1)?; // major revision
        self.write_byte(1)?; // minor revision
        self.write_byte(0)?; // density unit
        self.write_u16(x_density)?;
        self.write_u16(y_density)?;
        self.write_byte(0)?; // thumbnail width
        self.write_byte(0) // thumbnail height
    }

    /// DQT with one 8-bit precision table. `table` is in natural
    /// row-major order; the segment stores it in zig-zag order.
    pub fn write_dqt(&mut self, table_id: u8, table: &[u8; 64]) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::DefineQuantizationTable)?;
        self.write_u16(2 + 1 + 64)?;
        self.write_byte(table_id & 0x0F)?; // upper nibble: precision 0 (8-bit)
        for &value in zigzag(table).iter() {
            self.write_byte(value)?;
        }
        Ok(())
    }

    pub fn write_sof0(
        &mut self,
        width: u16,
        height: u16,
        components: &[ComponentSpec],
    ) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::StartOfFrameBaseline)?;
        self.write_u16((8 + 3 * components.len()) as u16)?;
        self.write_byte(8)?; // sample precision
        self.write_u16(height)?;
        self.write_u16(width)?;
        self.write_byte(components.len() as u8)?;
        for component in components {
            self.write_byte(component.id)?;
            self.write_byte(
                (component.horizontal_sampling << 4) | (component.vertical_sampling & 0x0F),
            )?;
            self.write_byte(component.quant_table)?;
        }
        Ok(())
    }

    pub fn write_dht(
        &mut self,
        class: TableClass,
        table_id: u8,
        table: &HuffmanTable,
    ) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::DefineHuffmanTable)?;
        let symbols = table.dht_symbols();
        self.write_u16((2 + 1 + 16 + symbols.len()) as u16)?;
        self.write_byte(((class as u8) << 4) | (table_id & 0x0F))?;
        for &count in table.dht_counts() {
            self.write_byte(count)?;
        }
        for &symbol in symbols {
            self.write_byte(symbol)?;
        }
        Ok(())
    }

    pub fn write_sos(&mut self, components: &[ComponentSpec]) -> Result<(), EncodeError> {
        self.write_marker(JpegMarkerCode::StartOfScan)?;
        self.write_u16((2 + 1 + 2 * components.len() + 3) as u16)?;
        self.write_byte(components.len() as u8)?;
        for component in components {
            self.write_byte(component.id)?;
            self.write_byte((component.dc_table << 4) | (component.ac_table & 0x0F))?;
        }
        self.write_byte(0)?; // Ss: first coefficient
        self.write_byte(63)?; // Se: last coefficient
        self.write_byte(0) // Ah/Al: no successive approximation
    }

    /// Appends the entropy-coded scan. The stream must already be
    /// padded to a byte boundary; every 0xFF data byte is followed by
    /// a stuffed 0x00 so decoders cannot mistake it for a marker.
    pub fn write_entropy_scan<B: BitBlock>(
        &mut self,
        scan: &Bitstream<B>,
    ) -> Result<(), EncodeError> {
        debug_assert_eq!(scan.len() % 8, 0, "scan not byte aligned");
        for byte in scan.to_bytes() {
            self.write_byte(byte)?;
            if byte == 0xFF {
                self.write_byte(0x00)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::ZIGZAG_INDEX;

    fn writer() -> JpegStreamWriter<Vec<u8>> {
        JpegStreamWriter::new(Vec::new())
    }

    #[test]
    fn app0_layout() {
        let mut w = writer();
        w.write_app0_jfif(0x48, 0x48).unwrap();
        let bytes = w.into_inner();
        assert_eq!(
            bytes,
            vec![
                0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
                0x48, 0x00, 0x48, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn dqt_serializes_in_zigzag_order() {
        let mut table = [0u8; 64];
        for (i, cell) in table.iter_mut().enumerate() {
            *cell = i as u8;
        }
        let mut w = writer();
        w.write_dqt(1, &table).unwrap();
        let bytes = w.into_inner();
        assert_eq!(&bytes[..5], &[0xFF, 0xDB, 0x00, 0x43, 0x01]);
        let coeffs = &bytes[5..];
        assert_eq!(coeffs.len(), 64);
        // natural index 1 (value 1) sits at zig-zag position 1,
        // natural index 8 (value 8) at position 2
        assert_eq!(coeffs[ZIGZAG_INDEX[1]], 1);
        assert_eq!(coeffs[ZIGZAG_INDEX[8]], 8);
        assert_eq!(coeffs[ZIGZAG_INDEX[63]], 63);
    }

    #[test]
    fn sof0_layout_for_color() {
        let components = [
            ComponentSpec {
                id: 1,
                horizontal_sampling: 2,
                vertical_sampling: 2,
                quant_table: 0,
                dc_table: 0,
                ac_table: 1,
            },
            ComponentSpec {
                id: 2,
                horizontal_sampling: 1,
                vertical_sampling: 1,
                quant_table: 1,
                dc_table: 0,
                ac_table: 1,
            },
            ComponentSpec {
                id: 3,
                horizontal_sampling: 1,
                vertical_sampling: 1,
                quant_table: 1,
                dc_table: 0,
                ac_table: 1,
            },
        ];
        let mut w = writer();
        w.write_sof0(640, 480, &components).unwrap();
        let bytes = w.into_inner();
        assert_eq!(
            &bytes[..10],
            &[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x01, 0xE0, 0x02, 0x80, 0x03]
        );
        assert_eq!(&bytes[10..13], &[1, 0x22, 0]);
        assert_eq!(&bytes[13..16], &[2, 0x11, 1]);
        assert_eq!(&bytes[16..19], &[3, 0x11, 1]);
    }

    #[test]
    fn dht_layout() {
        let mut freqs = [0u32; 256];
        freqs[0x03] = 4;
        freqs[0x21] = 2;
        freqs[0x05] = 1;
        let table = HuffmanTable::from_frequencies(&freqs).unwrap();
        let mut w = writer();
        w.write_dht(TableClass::Ac, 0, &table).unwrap();
        let bytes = w.into_inner();

        let symbol_count = table.dht_symbols().len();
        assert_eq!(&bytes[..4], &[0xFF, 0xC4, 0x00, (2 + 1 + 16 + symbol_count) as u8]);
        assert_eq!(bytes[4], 0x10); // class AC, destination 0
        let counts = &bytes[5..21];
        assert_eq!(
            counts.iter().map(|&c| c as usize).sum::<usize>(),
            symbol_count
        );
        assert_eq!(&bytes[21..], table.dht_symbols());
    }

    #[test]
    fn sos_layout_and_trailer() {
        let components = [
            ComponentSpec {
                id: 1,
                horizontal_sampling: 1,
                vertical_sampling: 1,
                quant_table: 0,
                dc_table: 0,
                ac_table: 1,
            },
            ComponentSpec {
                id: 2,
                horizontal_sampling: 1,
                vertical_sampling: 1,
                quant_table: 1,
                dc_table: 0,
                ac_table: 1,
            },
        ];
        let mut w = writer();
        w.write_sos(&components).unwrap();
        let bytes = w.into_inner();
        assert_eq!(
            bytes,
            vec![0xFF, 0xDA, 0x00, 0x0A, 2, 1, 0x01, 2, 0x01, 0, 63, 0]
        );
    }

    #[test]
    fn entropy_scan_stuffs_ff_bytes() {
        let mut scan = Bitstream::<u64>::new();
        scan.push_bits(0xFF, 8);
        scan.push_bits(0xAB, 8);
        scan.push_bits(0xFF, 8);
        let mut w = writer();
        w.write_entropy_scan(&scan).unwrap();
        assert_eq!(w.into_inner(), vec![0xFF, 0x00, 0xAB, 0xFF, 0x00]);
    }
}
