//! PPM (P3/P6) loading.
//!
//! The header is a sequence of whitespace-separated tokens with `#`
//! starting a comment that runs to the end of the line. P3 carries
//! ASCII samples, P6 one raw byte per sample.

use std::fs;
use std::path::Path;

use log::info;

use crate::error::EncodeError;
use crate::image::{ColorSpace, Image};

struct TokenReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TokenReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.data.len() {
            let byte = self.data[self.pos];
            if byte == b'#' {
                while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else if byte.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<&'a [u8], EncodeError> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.data.len() {
            return Err(EncodeError::invalid_ppm("unexpected end of file"));
        }
        let start = self.pos;
        while self.pos < self.data.len()
            && !self.data[self.pos].is_ascii_whitespace()
            && self.data[self.pos] != b'#'
        {
            self.pos += 1;
        }
        Ok(&self.data[start..self.pos])
    }

    fn next_number(&mut self, what: &str) -> Result<u32, EncodeError> {
        let token = self.next_token()?;
        std::str::from_utf8(token)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| {
                EncodeError::InvalidPpm(format!(
                    "{what}: expected a number, got {:?}",
                    String::from_utf8_lossy(token)
                ))
            })
    }

    /// Positions the reader on raw P6 sample data: exactly one
    /// whitespace byte follows the max-color token.
    fn skip_single_whitespace(&mut self) {
        if self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn next_byte(&mut self) -> Result<u8, EncodeError> {
        if self.pos >= self.data.len() {
            return Err(EncodeError::invalid_ppm("truncated pixel data"));
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }
}

/// Parses PPM bytes into an RGB [`Image`].
pub fn parse(data: &[u8]) -> Result<Image<u8>, EncodeError> {
    let mut reader = TokenReader::new(data);

    let magic = reader.next_token()?;
    let binary = match magic {
        b"P3" => false,
        b"P6" => true,
        other => {
            return Err(EncodeError::InvalidPpm(format!(
                "unsupported magic {:?}, expected P3 or P6",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let width = reader.next_number("width")? as usize;
    let height = reader.next_number("height")? as usize;
    let max_color = reader.next_number("max color")?;
    if width == 0 || height == 0 {
        return Err(EncodeError::invalid_ppm("zero width or height"));
    }
    if max_color >= 256 {
        return Err(EncodeError::InvalidPpm(format!(
            "max color {max_color} needs more than one byte per sample"
        )));
    }

    let mut image = Image::<u8>::new(width, height, ColorSpace::Rgb);
    if binary {
        reader.skip_single_whitespace();
    }
    for r in 0..height {
        for c in 0..width {
            for slot in 0..3 {
                let sample = if binary {
                    reader.next_byte()?
                } else {
                    let v = reader.next_number("sample")?;
                    if v > max_color {
                        return Err(EncodeError::InvalidPpm(format!(
                            "sample {v} exceeds max color {max_color}"
                        )));
                    }
                    v as u8
                };
                image.channel_mut(slot).set(r, c, sample);
            }
        }
    }

    info!(
        "loaded {}x{} {} ppm",
        width,
        height,
        if binary { "binary" } else { "ascii" }
    );
    Ok(image)
}

/// Reads and parses a PPM file.
pub fn load(path: &Path) -> Result<Image<u8>, EncodeError> {
    let data = fs::read(path)?;
    parse(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_p3_with_comments() {
        let ppm = b"P3 # ascii\n# size next\n2 2\n255\n\
                    255 0 0  0 255 0\n0 0 255  10 20 30\n";
        let img = parse(ppm).unwrap();
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!(img.channel(0).get(0, 0), 255);
        assert_eq!(img.channel(1).get(0, 1), 255);
        assert_eq!(img.channel(2).get(1, 0), 255);
        assert_eq!(
            (
                img.channel(0).get(1, 1),
                img.channel(1).get(1, 1),
                img.channel(2).get(1, 1)
            ),
            (10, 20, 30)
        );
    }

    #[test]
    fn parses_p6() {
        let mut ppm = b"P6\n2 1\n255\n".to_vec();
        ppm.extend_from_slice(&[1, 2, 3, 4, 5, 6]);
        let img = parse(&ppm).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
        assert_eq!(img.channel(0).get(0, 1), 4);
        assert_eq!(img.channel(2).get(0, 0), 3);
    }

    #[test]
    fn p6_pixels_may_look_like_whitespace() {
        // only one whitespace byte separates header and data; 0x0A
        // inside the pixel payload must be read as a sample
        let mut ppm = b"P6 1 1 255\n".to_vec();
        ppm.extend_from_slice(&[0x0A, 0x20, 0x0D]);
        let img = parse(&ppm).unwrap();
        assert_eq!(img.channel(0).get(0, 0), 0x0A);
        assert_eq!(img.channel(1).get(0, 0), 0x20);
        assert_eq!(img.channel(2).get(0, 0), 0x0D);
    }

    #[test]
    fn rejects_bad_magic() {
        assert!(matches!(
            parse(b"P5 1 1 255 0"),
            Err(EncodeError::InvalidPpm(_))
        ));
    }

    #[test]
    fn rejects_wide_samples() {
        assert!(matches!(
            parse(b"P3 1 1 65535 0 0 0"),
            Err(EncodeError::InvalidPpm(_))
        ));
    }

    #[test]
    fn rejects_truncated_p6() {
        let ppm = b"P6 2 2 255 \x01\x02";
        assert!(matches!(
            parse(ppm.as_slice()),
            Err(EncodeError::InvalidPpm(_))
        ));
    }
}
