//! Stream filter pipeline.
//!
//! A stream's `/Filter` entry lists filters in decode order; `/DecodeParms`
//! supplies per-filter parameters. Every supported filter implements both
//! directions so that `decode_stream(encode_stream(x, f), f) == x`:
//!
//! - FlateDecode (zlib/deflate, with predictors)
//! - LZWDecode (with predictors and EarlyChange)
//! - ASCIIHexDecode
//! - ASCII85Decode
//! - RunLengthDecode
//!
//! Image codecs (DCT, JPX, CCITT, JBIG2) and `Crypt` are reported as
//! [`Error::UnsupportedFilter`]; such streams are still written back verbatim.

use crate::error::{Error, Result};
use crate::object::{Dict, Object};
use crate::parser_config::ParserOptions;

mod ascii85;
mod ascii_hex;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Filter;
pub use ascii_hex::AsciiHexFilter;
pub use flate::FlateFilter;
pub use lzw::LzwFilter;
pub use predictor::{decode_predictor, encode_predictor, DecodeParams};
pub use runlength::RunLengthFilter;

/// Outputs above this size are checked against the decompression ratio limit.
const RATIO_CHECK_FLOOR: usize = 1024 * 1024;

/// A reversible stream codec.
pub trait StreamFilter {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Encode the input data so that [`decode`](Self::decode) restores it.
    fn encode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Filter name as written in `/Filter` (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// One entry of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    /// Filter name as found in the file (abbreviations allowed)
    pub name: String,
    /// Parameters from the matching `/DecodeParms` entry
    pub params: Option<DecodeParams>,
}

impl FilterSpec {
    /// Filter without parameters.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: None,
        }
    }

    /// Filter with parameters.
    pub fn with_params(name: &str, params: DecodeParams) -> Self {
        Self {
            name: name.to_string(),
            params: Some(params),
        }
    }

    /// Read the filter chain declared by a stream dictionary.
    ///
    /// `/DecodeParms` may be a single dictionary (first filter) or an array
    /// aligned with `/Filter`, with `null` for filters without parameters.
    pub fn from_dict(dict: &Dict) -> Result<Vec<FilterSpec>> {
        let names: Vec<String> = match dict.get("Filter") {
            None | Some(Object::Null) => return Ok(Vec::new()),
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_name().map(str::to_string).ok_or_else(|| {
                        Error::Decode(format!("Filter entry is a {}, not a name", item.type_name()))
                    })
                })
                .collect::<Result<_>>()?,
            Some(other) => {
                return Err(Error::Decode(format!("/Filter is a {}", other.type_name())));
            },
        };

        let params: Vec<Option<DecodeParams>> = match dict.get("DecodeParms") {
            Some(Object::Dictionary(d)) => vec![Some(DecodeParams::from_dict(d))],
            Some(Object::Array(items)) => items
                .iter()
                .map(|item| item.as_dict().map(DecodeParams::from_dict))
                .collect(),
            _ => Vec::new(),
        };

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(i, name)| FilterSpec {
                name,
                params: params.get(i).cloned().flatten(),
            })
            .collect())
    }

    /// `/Filter` and optional `/DecodeParms` entries for a chain.
    pub fn to_entries(filters: &[FilterSpec]) -> (Object, Option<Object>) {
        let filter = match filters {
            [single] => Object::name(&single.name),
            many => Object::Array(many.iter().map(|f| Object::name(&f.name)).collect()),
        };
        let params = if filters.iter().all(|f| f.params.is_none()) {
            None
        } else if let [single] = filters {
            single.params.as_ref().map(|p| Object::Dictionary(p.to_dict()))
        } else {
            Some(Object::Array(
                filters
                    .iter()
                    .map(|f| match &f.params {
                        Some(p) => Object::Dictionary(p.to_dict()),
                        None => Object::Null,
                    })
                    .collect(),
            ))
        };
        (filter, params)
    }

    /// Instantiate the codec for this entry.
    pub fn filter(&self) -> Result<Box<dyn StreamFilter>> {
        let params = self.params.clone().unwrap_or_default();
        let filter: Box<dyn StreamFilter> = match self.name.as_str() {
            "FlateDecode" | "Fl" => Box::new(FlateFilter::new(params)),
            "LZWDecode" | "LZW" => Box::new(LzwFilter::new(params)),
            "ASCIIHexDecode" | "AHx" => Box::new(AsciiHexFilter),
            "ASCII85Decode" | "A85" => Box::new(Ascii85Filter),
            "RunLengthDecode" | "RL" => Box::new(RunLengthFilter),
            _ => return Err(Error::UnsupportedFilter(self.name.clone())),
        };
        Ok(filter)
    }
}

/// Decode stream data through a filter chain with default limits.
///
/// ```
/// use pdf_kiln::decoders::{decode_stream, FilterSpec};
///
/// let decoded = decode_stream(b"48656C6C6F>", &[FilterSpec::new("ASCIIHexDecode")]).unwrap();
/// assert_eq!(decoded, b"Hello");
/// ```
pub fn decode_stream(data: &[u8], filters: &[FilterSpec]) -> Result<Vec<u8>> {
    decode_stream_with_options(data, filters, &ParserOptions::default())
}

/// Decode stream data through a filter chain, enforcing the decompression
/// limits in `options`.
pub fn decode_stream_with_options(
    data: &[u8],
    filters: &[FilterSpec],
    options: &ParserOptions,
) -> Result<Vec<u8>> {
    let encoded_size = data.len().max(1);
    let mut current = data.to_vec();

    for spec in filters {
        current = spec.filter()?.decode(&current)?;

        let ratio = current.len() / encoded_size;
        if options.max_decompression_ratio > 0
            && current.len() > RATIO_CHECK_FLOOR
            && ratio > options.max_decompression_ratio as usize
        {
            return Err(Error::Decode(format!(
                "Decompression ratio {}:1 exceeds limit {}:1 ({} -> {} bytes)",
                ratio,
                options.max_decompression_ratio,
                data.len(),
                current.len()
            )));
        }
        if options.max_decompressed_size > 0 && current.len() > options.max_decompressed_size {
            return Err(Error::Decode(format!(
                "Decoded size {} bytes exceeds limit {} bytes",
                current.len(),
                options.max_decompressed_size
            )));
        }
    }

    Ok(current)
}

/// Encode data so that the chain `filters` decodes it. Encoders run in reverse
/// declared order.
pub fn encode_stream(data: &[u8], filters: &[FilterSpec]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for spec in filters.iter().rev() {
        current = spec.filter()?.encode(&current)?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<FilterSpec> {
        names.iter().map(|n| FilterSpec::new(n)).collect()
    }

    #[test]
    fn test_unknown_filter_is_unsupported() {
        let err = decode_stream(b"data", &chain(&["JBIG2Decode"])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter(name) if name == "JBIG2Decode"));
        let err = encode_stream(b"data", &chain(&["DCTDecode"])).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFilter(_)));
    }

    #[test]
    fn test_chain_order() {
        let filters = chain(&["ASCIIHexDecode", "FlateDecode"]);
        let encoded = encode_stream(b"layered content", &filters).unwrap();
        assert!(encoded.iter().all(|b| b.is_ascii_hexdigit() || *b == b'>'));
        assert_eq!(decode_stream(&encoded, &filters).unwrap(), b"layered content");
    }

    #[test]
    fn test_abbreviated_names() {
        let filters = chain(&["AHx", "Fl"]);
        let encoded = encode_stream(b"short", &filters).unwrap();
        assert_eq!(decode_stream(&encoded, &filters).unwrap(), b"short");
    }

    #[test]
    fn test_from_dict_aligns_decode_parms() {
        let mut params = Dict::new();
        params.insert("Predictor".to_string(), Object::Integer(12));
        params.insert("Columns".to_string(), Object::Integer(4));
        let mut dict = Dict::new();
        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![Object::name("ASCII85Decode"), Object::name("FlateDecode")]),
        );
        dict.insert(
            "DecodeParms".to_string(),
            Object::Array(vec![Object::Null, Object::Dictionary(params)]),
        );

        let specs = FilterSpec::from_dict(&dict).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs[0].params.is_none());
        let p = specs[1].params.as_ref().unwrap();
        assert_eq!((p.predictor, p.columns), (12, 4));
    }

    #[test]
    fn test_to_entries_round_trips_through_from_dict() {
        let specs = vec![
            FilterSpec::new("ASCII85Decode"),
            FilterSpec::with_params(
                "FlateDecode",
                DecodeParams {
                    predictor: 12,
                    columns: 5,
                    ..DecodeParams::default()
                },
            ),
        ];
        let (filter, params) = FilterSpec::to_entries(&specs);
        let mut dict = Dict::new();
        dict.insert("Filter".to_string(), filter);
        if let Some(params) = params {
            dict.insert("DecodeParms".to_string(), params);
        }
        assert_eq!(FilterSpec::from_dict(&dict).unwrap(), specs);
    }

    #[test]
    fn test_size_limit() {
        let options = ParserOptions {
            max_decompressed_size: 10,
            ..ParserOptions::default()
        };
        let filters = chain(&["FlateDecode"]);
        let encoded = encode_stream(&[7u8; 100], &filters).unwrap();
        assert!(decode_stream_with_options(&encoded, &filters, &options).is_err());
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 5] = [
            "FlateDecode",
            "LZWDecode",
            "ASCIIHexDecode",
            "ASCII85Decode",
            "RunLengthDecode",
        ];

        proptest! {
            #[test]
            fn every_filter_inverts(input in prop::collection::vec(any::<u8>(), 0..2000)) {
                for name in NAMES {
                    let filters = vec![FilterSpec::new(name)];
                    let encoded = encode_stream(&input, &filters).unwrap();
                    prop_assert_eq!(decode_stream(&encoded, &filters).unwrap(), input.clone(), "{}", name);
                }
            }

            #[test]
            fn runs_invert(byte in any::<u8>(), len in 0usize..700) {
                let input = vec![byte; len];
                for name in NAMES {
                    let filters = vec![FilterSpec::new(name)];
                    let encoded = encode_stream(&input, &filters).unwrap();
                    prop_assert_eq!(decode_stream(&encoded, &filters).unwrap(), input.clone(), "{}", name);
                }
            }

            #[test]
            fn predictors_invert(
                input in prop::collection::vec(any::<u8>(), 0..600),
                predictor in prop::sample::select(vec![2i64, 10, 11, 12, 13, 14, 15]),
                columns in 1usize..9,
                colors in 1usize..4,
            ) {
                let params = DecodeParams { predictor, columns, colors, ..DecodeParams::default() };
                let filters = vec![FilterSpec::with_params("FlateDecode", params)];
                let encoded = encode_stream(&input, &filters).unwrap();
                prop_assert_eq!(decode_stream(&encoded, &filters).unwrap(), input);
            }

            #[test]
            fn chains_invert(input in prop::collection::vec(any::<u8>(), 0..500)) {
                let filters = vec![
                    FilterSpec::new("ASCII85Decode"),
                    FilterSpec::new("LZWDecode"),
                    FilterSpec::new("RunLengthDecode"),
                ];
                let encoded = encode_stream(&input, &filters).unwrap();
                prop_assert_eq!(decode_stream(&encoded, &filters).unwrap(), input);
            }
        }
    }
}
