//! ASCIIHexDecode implementation.

use crate::decoders::StreamFilter;
use crate::error::{Error, Result};

/// ASCIIHexDecode filter.
///
/// Whitespace is ignored, `>` ends the data and an odd final digit is
/// padded with `0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut high: Option<u8> = None;

        for &byte in input {
            if byte == b'>' {
                break;
            }
            if byte.is_ascii_whitespace() || byte == 0 {
                continue;
            }
            let digit = (byte as char).to_digit(16).ok_or_else(|| {
                Error::Decode(format!(
                    "ASCIIHexDecode: invalid hex digit '{}'",
                    byte as char
                ))
            })? as u8;
            match high.take() {
                Some(h) => output.push((h << 4) | digit),
                None => high = Some(digit),
            }
        }

        if let Some(h) = high {
            output.push(h << 4);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        let mut output = Vec::with_capacity(input.len() * 2 + 1);
        for &byte in input {
            output.push(HEX[(byte >> 4) as usize]);
            output.push(HEX[(byte & 0x0F) as usize]);
        }
        output.push(b'>');
        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_hex_decode() {
        assert_eq!(AsciiHexFilter.decode(b"48 65\n6c6C6F>").unwrap(), b"Hello");
    }

    #[test]
    fn test_ascii_hex_odd_digit() {
        assert_eq!(AsciiHexFilter.decode(b"ABC>").unwrap(), vec![0xAB, 0xC0]);
    }

    #[test]
    fn test_ascii_hex_stops_at_marker() {
        assert_eq!(AsciiHexFilter.decode(b"41>ZZ").unwrap(), b"A");
    }

    #[test]
    fn test_ascii_hex_invalid() {
        assert!(AsciiHexFilter.decode(b"4G>").is_err());
    }

    #[test]
    fn test_ascii_hex_encode() {
        assert_eq!(AsciiHexFilter.encode(&[0x00, 0xAB, 0x7F]).unwrap(), b"00AB7F>");
        assert_eq!(AsciiHexFilter.encode(b"").unwrap(), b">");
    }
}
