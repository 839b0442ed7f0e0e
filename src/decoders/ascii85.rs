//! ASCII85Decode (Base85) implementation.
//!
//! Four bytes map to five characters in `!`..=`u`; `z` abbreviates a group
//! of four zero bytes. Data ends at `~>`; a leading `<~` is tolerated.

use crate::decoders::StreamFilter;
use crate::error::{Error, Result};

/// ASCII85Decode filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ascii85Filter;

impl StreamFilter for Ascii85Filter {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let body = input
            .iter()
            .position(|&b| !b.is_ascii_whitespace())
            .filter(|&start| input[start..].starts_with(b"<~"))
            .map_or(input, |start| &input[start + 2..]);

        let mut output = Vec::with_capacity(body.len() * 4 / 5);
        let mut group = [0u8; 5];
        let mut count = 0;

        for &byte in body {
            match byte {
                b'~' => break,
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ))
                },
                b'!'..=b'u' => {
                    group[count] = byte - b'!';
                    count += 1;
                    if count == 5 {
                        output.extend_from_slice(&group_value(&group)?.to_be_bytes());
                        count = 0;
                    }
                },
                _ if byte.is_ascii_whitespace() || byte == 0 => {},
                _ => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character '{}'",
                        byte as char
                    )))
                },
            }
        }

        match count {
            0 => {},
            1 => {
                return Err(Error::Decode(
                    "ASCII85Decode: final group has a single character".to_string(),
                ))
            },
            n => {
                // Pad with 'u' and keep n - 1 bytes
                group[n..].fill(84);
                let bytes = group_value(&group)?.to_be_bytes();
                output.extend_from_slice(&bytes[..n - 1]);
            },
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 5 / 4 + 4);
        let mut chunks = input.chunks_exact(4);

        for chunk in &mut chunks {
            let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if value == 0 {
                output.push(b'z');
            } else {
                output.extend_from_slice(&encode_group(value));
            }
        }

        let rest = chunks.remainder();
        if !rest.is_empty() {
            let mut padded = [0u8; 4];
            padded[..rest.len()].copy_from_slice(rest);
            let chars = encode_group(u32::from_be_bytes(padded));
            output.extend_from_slice(&chars[..rest.len() + 1]);
        }

        output.extend_from_slice(b"~>");
        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

fn group_value(digits: &[u8; 5]) -> Result<u32> {
    digits
        .iter()
        .try_fold(0u32, |acc, &d| acc.checked_mul(85)?.checked_add(d as u32))
        .ok_or_else(|| Error::Decode("ASCII85Decode: group value overflow".to_string()))
}

fn encode_group(mut value: u32) -> [u8; 5] {
    let mut chars = [0u8; 5];
    for slot in chars.iter_mut().rev() {
        *slot = (value % 85) as u8 + b'!';
        value /= 85;
    }
    chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii85_decode_simple() {
        let decoded = Ascii85Filter.decode(b"87cURDZ~>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_ascii85_z_group() {
        assert_eq!(Ascii85Filter.decode(b"z~>").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(Ascii85Filter.encode(&[0, 0, 0, 0]).unwrap(), b"z~>");
    }

    #[test]
    fn test_ascii85_leading_marker_and_whitespace() {
        let decoded = Ascii85Filter.decode(b"  <~87cU\nRDZ~>").unwrap();
        assert_eq!(decoded, b"Hello");
    }

    #[test]
    fn test_ascii85_encode_partial_group() {
        assert_eq!(Ascii85Filter.encode(b"Hello").unwrap(), b"87cURDZ~>");
    }

    #[test]
    fn test_ascii85_empty() {
        assert_eq!(Ascii85Filter.encode(b"").unwrap(), b"~>");
        assert!(Ascii85Filter.decode(b"~>").unwrap().is_empty());
    }

    #[test]
    fn test_ascii85_invalid() {
        assert!(Ascii85Filter.decode(b"87v~>").is_err());
        assert!(Ascii85Filter.decode(b"8z~>").is_err());
        assert!(Ascii85Filter.decode(b"8~>").is_err());
        assert!(Ascii85Filter.decode(b"uuuuu~>").is_err());
    }
}
