//! Predictor functions for FlateDecode and LZWDecode.
//!
//! Predictor 2 is TIFF horizontal differencing; 10-15 are PNG filters where
//! every row carries its own filter-type byte. A short final row is processed
//! as-is in both directions.

use crate::error::{Error, Result};
use crate::object::{Dict, Object};

/// Parameters from a `/DecodeParms` dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Samples per row
    pub columns: usize,
    /// Color components per sample
    pub colors: usize,
    /// Bits per component
    pub bits_per_component: usize,
    /// LZW code-width switch timing (1 = one code early)
    pub early_change: i64,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
            early_change: 1,
        }
    }
}

impl DecodeParams {
    /// Read parameters, falling back to defaults for missing or invalid entries.
    pub fn from_dict(dict: &Dict) -> Self {
        let defaults = Self::default();
        let positive = |key: &str, default: usize| {
            dict.get(key)
                .and_then(Object::as_integer)
                .filter(|&v| v > 0)
                .map(|v| v as usize)
                .unwrap_or(default)
        };
        Self {
            predictor: dict
                .get("Predictor")
                .and_then(Object::as_integer)
                .unwrap_or(defaults.predictor),
            columns: positive("Columns", defaults.columns),
            colors: positive("Colors", defaults.colors),
            bits_per_component: positive("BitsPerComponent", defaults.bits_per_component),
            early_change: dict
                .get("EarlyChange")
                .and_then(Object::as_integer)
                .unwrap_or(defaults.early_change),
        }
    }

    /// Dictionary holding the entries that differ from the defaults.
    pub fn to_dict(&self) -> Dict {
        let defaults = Self::default();
        let mut dict = Dict::new();
        if self.predictor != defaults.predictor {
            dict.insert("Predictor".to_string(), Object::Integer(self.predictor));
        }
        if self.columns != defaults.columns {
            dict.insert("Columns".to_string(), Object::Integer(self.columns as i64));
        }
        if self.colors != defaults.colors {
            dict.insert("Colors".to_string(), Object::Integer(self.colors as i64));
        }
        if self.bits_per_component != defaults.bits_per_component {
            dict.insert(
                "BitsPerComponent".to_string(),
                Object::Integer(self.bits_per_component as i64),
            );
        }
        if self.early_change != defaults.early_change {
            dict.insert("EarlyChange".to_string(), Object::Integer(self.early_change));
        }
        dict
    }

    /// Bytes of sample data per row, without the PNG tag byte.
    pub fn row_bytes(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component)
            .div_ceil(8)
            .max(1)
    }

    /// Bytes per complete pixel, at least one.
    pub fn bytes_per_pixel(&self) -> usize {
        (self.colors * self.bits_per_component).div_ceil(8).max(1)
    }
}

/// Reverse the predictor named in `params`.
pub fn decode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => tiff(data, params, Direction::Decode),
        10..=15 => decode_png(data, params),
        other => Err(Error::Decode(format!("Unsupported predictor: {}", other))),
    }
}

/// Apply the predictor named in `params`. Predictor 15 encodes every row with Up.
pub fn encode_predictor(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    match params.predictor {
        1 => Ok(data.to_vec()),
        2 => tiff(data, params, Direction::Encode),
        10..=15 => Ok(encode_png(data, params)),
        other => Err(Error::Decode(format!("Unsupported predictor: {}", other))),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Direction {
    Decode,
    Encode,
}

fn tiff(data: &[u8], params: &DecodeParams, direction: Direction) -> Result<Vec<u8>> {
    if params.bits_per_component != 8 {
        return Err(Error::Decode(format!(
            "TIFF predictor with {} bits per component is not supported",
            params.bits_per_component
        )));
    }
    let colors = params.colors;
    let mut out = Vec::with_capacity(data.len());
    for row in data.chunks(params.row_bytes()) {
        let start = out.len();
        for (i, &byte) in row.iter().enumerate() {
            let value = if i < colors {
                byte
            } else {
                match direction {
                    Direction::Decode => byte.wrapping_add(out[start + i - colors]),
                    Direction::Encode => byte.wrapping_sub(row[i - colors]),
                }
            };
            out.push(value);
        }
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = left as i16 + up as i16 - up_left as i16;
    let pa = (p - left as i16).abs();
    let pb = (p - up as i16).abs();
    let pc = (p - up_left as i16).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

/// Prediction for byte `i` of a row given the already-known bytes of the row
/// and the previous row.
fn png_prediction(tag: u8, row: &[u8], prev: &[u8], i: usize, bpp: usize) -> u8 {
    let left = if i >= bpp { row[i - bpp] } else { 0 };
    let up = prev[i];
    let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
    match tag {
        1 => left,
        2 => up,
        3 => ((left as u16 + up as u16) / 2) as u8,
        4 => paeth(left, up, up_left),
        _ => 0,
    }
}

fn decode_png(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>> {
    let row_len = params.row_bytes();
    let bpp = params.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    let mut row = Vec::with_capacity(row_len);

    for chunk in data.chunks(row_len + 1) {
        let tag = chunk[0];
        if tag > 4 {
            return Err(Error::Decode(format!("Invalid PNG predictor tag: {}", tag)));
        }
        row.clear();
        for (i, &byte) in chunk[1..].iter().enumerate() {
            let predicted = png_prediction(tag, &row, &prev, i, bpp);
            row.push(byte.wrapping_add(predicted));
        }
        prev[..row.len()].copy_from_slice(&row);
        out.extend_from_slice(&row);
    }

    Ok(out)
}

fn encode_png(data: &[u8], params: &DecodeParams) -> Vec<u8> {
    let tag = match params.predictor {
        10 => 0,
        11 => 1,
        13 => 3,
        14 => 4,
        _ => 2,
    };
    let row_len = params.row_bytes();
    let bpp = params.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len() + data.len() / row_len + 1);
    let mut prev = vec![0u8; row_len];

    for row in data.chunks(row_len) {
        out.push(tag);
        for (i, &byte) in row.iter().enumerate() {
            out.push(byte.wrapping_sub(png_prediction(tag, row, &prev, i, bpp)));
        }
        prev[..row.len()].copy_from_slice(row);
    }

    out
}
