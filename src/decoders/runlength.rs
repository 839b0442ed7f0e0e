//! RunLengthDecode implementation.
//!
//! - Length byte 0-127: copy the next N+1 bytes literally
//! - Length byte 128: end of data
//! - Length byte 129-255: repeat the next byte 257-N times

use crate::decoders::StreamFilter;
use crate::error::{Error, Result};

const EOD: u8 = 128;
const MAX_RUN: usize = 128;

/// RunLengthDecode filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunLengthFilter;

impl StreamFilter for RunLengthFilter {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    let literal = input.get(i..i + count).ok_or_else(|| {
                        Error::Decode(format!(
                            "RunLengthDecode: literal run needs {} bytes, {} left",
                            count,
                            input.len() - i
                        ))
                    })?;
                    output.extend_from_slice(literal);
                    i += count;
                },
                EOD => break,
                129..=255 => {
                    let byte = *input.get(i).ok_or_else(|| {
                        Error::Decode("RunLengthDecode: missing byte for run".to_string())
                    })?;
                    i += 1;
                    output.resize(output.len() + 257 - length as usize, byte);
                },
            }
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() + input.len() / MAX_RUN + 2);
        let mut literal_start = 0;
        let mut i = 0;

        while i < input.len() {
            let run = input[i..]
                .iter()
                .take(MAX_RUN)
                .take_while(|&&b| b == input[i])
                .count();

            if run >= 2 {
                flush_literal(&mut output, &input[literal_start..i]);
                output.push((257 - run) as u8);
                output.push(input[i]);
                i += run;
                literal_start = i;
            } else {
                i += 1;
                if i - literal_start == MAX_RUN {
                    flush_literal(&mut output, &input[literal_start..i]);
                    literal_start = i;
                }
            }
        }
        flush_literal(&mut output, &input[literal_start..]);

        output.push(EOD);
        Ok(output)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}

fn flush_literal(output: &mut Vec<u8>, literal: &[u8]) {
    if !literal.is_empty() {
        output.push((literal.len() - 1) as u8);
        output.extend_from_slice(literal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runlength_literal_and_repeat() {
        // "ABC" literally, then 'X' four times, then EOD
        let input = [2, b'A', b'B', b'C', 253, b'X', 128];
        assert_eq!(RunLengthFilter.decode(&input).unwrap(), b"ABCXXXX");
    }

    #[test]
    fn test_runlength_missing_eod() {
        assert_eq!(RunLengthFilter.decode(&[0, b'Q']).unwrap(), b"Q");
    }

    #[test]
    fn test_runlength_truncated() {
        assert!(RunLengthFilter.decode(&[5, b'A']).is_err());
        assert!(RunLengthFilter.decode(&[200]).is_err());
    }

    #[test]
    fn test_runlength_encode() {
        let encoded = RunLengthFilter.encode(b"ABCXXXX").unwrap();
        assert_eq!(encoded, vec![2, b'A', b'B', b'C', 253, b'X', 128]);
    }

    #[test]
    fn test_runlength_long_run_splits() {
        let input = vec![7u8; 300];
        let encoded = RunLengthFilter.encode(&input).unwrap();
        // 128 + 128 + 44
        assert_eq!(encoded, vec![129, 7, 129, 7, 213, 7, 128]);
        assert_eq!(RunLengthFilter.decode(&encoded).unwrap(), input);
    }

    #[test]
    fn test_runlength_empty() {
        assert_eq!(RunLengthFilter.encode(b"").unwrap(), vec![128]);
        assert!(RunLengthFilter.decode(&[128]).unwrap().is_empty());
    }
}
