//! Integration tests for stream filters.
//!
//! Data produced by other encoders (flate2, weezl) must decode through the
//! filter chain, and stream objects decode according to their own
//! `/Filter` and `/DecodeParms` entries.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_kiln::decoders::{decode_stream, encode_stream, DecodeParams, FilterSpec};
use pdf_kiln::error::Error;
use pdf_kiln::{Dict, Object};
use proptest::prelude::*;
use std::io::Write;
use weezl::{encode::Encoder as LzwEncoder, BitOrder};

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn spec(name: &str) -> Vec<FilterSpec> {
    vec![FilterSpec::new(name)]
}

#[test]
fn test_flate_from_flate2() {
    let original = b"This is a test of FlateDecode compression in a PDF stream.";
    let decoded = decode_stream(&zlib(original), &spec("FlateDecode")).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_lzw_from_weezl() {
    let original = b"-----A---B TOBEORNOTTOBEORTOBEORNOT";
    let encoded = LzwEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
        .encode(original)
        .unwrap();
    assert_eq!(decode_stream(&encoded, &spec("LZWDecode")).unwrap(), original);
}

#[test]
fn test_lzw_without_early_change() {
    let original = b"abababababababababababababababababab";
    let encoded = LzwEncoder::new(BitOrder::Msb, 8).encode(original).unwrap();
    let params = DecodeParams {
        early_change: 0,
        ..DecodeParams::default()
    };
    let filters = vec![FilterSpec::with_params("LZWDecode", params)];
    assert_eq!(decode_stream(&encoded, &filters).unwrap(), original);
}

#[test]
fn test_ascii_hex_cases() {
    let cases: [(&[u8], &[u8]); 4] = [
        (b"48656C6C6F20576F726C64>", b"Hello World"),
        (b"54 65 73 74>", b"Test"),
        (b"4142434>", b"ABC@"),
        (b">", b""),
    ];
    for (input, expected) in cases {
        assert_eq!(decode_stream(input, &spec("ASCIIHexDecode")).unwrap(), expected);
    }
}

#[test]
fn test_ascii85_known_text() {
    let decoded = decode_stream(b"<~87cURD]i,\"Ebo80~>", &spec("ASCII85Decode")).unwrap();
    assert_eq!(decoded, b"Hello World");
    assert_eq!(decode_stream(b"z~>", &spec("A85")).unwrap(), vec![0u8; 4]);
}

#[test]
fn test_run_length_literal_and_repeat() {
    // two literal bytes, then 'x' repeated four times, then EOD
    let input = [1u8, b'a', b'b', 253, b'x', 128];
    assert_eq!(decode_stream(&input, &spec("RunLengthDecode")).unwrap(), b"abxxxx");
}

#[test]
fn test_invalid_hex_digit() {
    assert!(matches!(
        decode_stream(b"4G>", &spec("ASCIIHexDecode")),
        Err(Error::Decode(_))
    ));
}

#[test]
fn test_unsupported_filter_named() {
    match decode_stream(b"", &spec("CCITTFaxDecode")) {
        Err(Error::UnsupportedFilter(name)) => assert_eq!(name, "CCITTFaxDecode"),
        other => panic!("expected UnsupportedFilter, got {:?}", other),
    }
}

#[test]
fn test_stream_object_with_png_predictor() {
    // Two rows of three bytes, PNG Up predictor on the second row.
    let rows = [0u8, 10, 20, 30, 2, 1, 1, 1];
    let mut params = Dict::new();
    params.insert("Predictor".to_string(), Object::Integer(12));
    params.insert("Columns".to_string(), Object::Integer(3));
    let mut dict = Dict::new();
    dict.insert("Filter".to_string(), Object::name("FlateDecode"));
    dict.insert("DecodeParms".to_string(), Object::Dictionary(params));

    let stream = Object::stream(dict, zlib(&rows));
    assert_eq!(stream.decode_stream_data().unwrap(), vec![10, 20, 30, 11, 21, 31]);
}

#[test]
fn test_stream_object_filter_chain() {
    let content = b"BT /Helv 12 Tf (chained) Tj ET";
    let chain = vec![FilterSpec::new("ASCII85Decode"), FilterSpec::new("FlateDecode")];
    let encoded = encode_stream(content, &chain).unwrap();
    let (filter, params) = FilterSpec::to_entries(&chain);
    assert!(params.is_none());

    let mut dict = Dict::new();
    dict.insert("Filter".to_string(), filter);
    let stream = Object::stream(dict, encoded);
    assert_eq!(stream.decode_stream_data().unwrap(), content);
}

#[test]
fn test_unfiltered_stream_object() {
    let stream = Object::stream(Dict::new(), b"raw".to_vec());
    assert_eq!(stream.decode_stream_data().unwrap(), b"raw");
    assert!(Object::Integer(1).decode_stream_data().is_err());
}

proptest! {
    #[test]
    fn flate2_output_always_decodes(input in prop::collection::vec(any::<u8>(), 0..4000)) {
        prop_assert_eq!(decode_stream(&zlib(&input), &spec("FlateDecode")).unwrap(), input);
    }

    #[test]
    fn encoded_streams_decode(
        input in prop::collection::vec(any::<u8>(), 0..1500),
        name in prop::sample::select(vec!["Fl", "LZW", "AHx", "A85", "RL"]),
    ) {
        let filters = spec(name);
        let encoded = encode_stream(&input, &filters).unwrap();
        prop_assert_eq!(decode_stream(&encoded, &filters).unwrap(), input);
    }
}
