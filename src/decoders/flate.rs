//! FlateDecode (zlib/deflate) implementation using flate2.
//!
//! Decoding tolerates truncated streams (partial output is kept) and raw
//! deflate data without a zlib wrapper. Predictors from `/DecodeParms` are
//! applied after inflating and before deflating.

use crate::decoders::predictor::{decode_predictor, encode_predictor, DecodeParams};
use crate::decoders::StreamFilter;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// FlateDecode filter.
#[derive(Debug, Clone, Default)]
pub struct FlateFilter {
    params: DecodeParams,
}

impl FlateFilter {
    /// Filter with the given predictor parameters.
    pub fn new(params: DecodeParams) -> Self {
        Self { params }
    }

    fn inflate(input: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
            Ok(_) => return Ok(output),
            Err(e) if !output.is_empty() => {
                log::warn!(
                    "FlateDecode partial recovery: kept {} bytes before corruption: {}",
                    output.len(),
                    e
                );
                return Ok(output);
            },
            Err(e) => e,
        };

        log::debug!("Zlib decode failed ({}), trying raw deflate", zlib_err);
        output.clear();
        match DeflateDecoder::new(input).read_to_end(&mut output) {
            Ok(_) if !output.is_empty() || input.is_empty() => Ok(output),
            Err(_) if !output.is_empty() => {
                log::warn!("Raw deflate partial recovery: kept {} bytes", output.len());
                Ok(output)
            },
            _ => Err(Error::Decode(format!("FlateDecode decompression failed: {}", zlib_err))),
        }
    }
}

impl StreamFilter for FlateFilter {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let inflated = Self::inflate(input)?;
        decode_predictor(&inflated, &self.params)
    }

    fn encode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let predicted = encode_predictor(input, &self.params)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&predicted)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}
