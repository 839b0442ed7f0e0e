//! Compressed object streams (PDF 1.5+).
//!
//! An object stream (`/Type /ObjStm`) packs several non-stream objects into
//! one filtered stream:
//!
//! ```text
//! 12 0 obj
//! << /Type /ObjStm /N 2 /First 9 /Filter /FlateDecode >>
//! stream
//! 10 0 11 15          % pairs: object number, offset relative to /First
//! << /Kind /A >>      % object 10
//! [1 2 3]             % object 11
//! endstream
//! endobj
//! ```
//!
//! Cross-reference type-2 entries address objects by their index in the pair
//! list, which is the position in the returned vector.

use crate::decoders::{decode_stream_with_options, FilterSpec};
use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::Object;
use crate::parser::parse_object_nested;
use crate::parser_config::ParserOptions;

/// Upper bound on `/N`.
const MAX_OBJECTS_PER_STREAM: i64 = 1_000_000;

/// Extract the objects of an object stream, in pair-list order.
///
/// Objects that fail to parse are logged and skipped; stream objects inside an
/// object stream are not allowed and are skipped as well.
pub fn parse_object_stream(stream: &Object, options: &ParserOptions) -> Result<Vec<(u32, Object)>> {
    let (dict, data) = match stream {
        Object::Stream { dict, data } => (dict, data),
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };

    if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
        if kind != "ObjStm" {
            return Err(Error::Unsupported(format!("expected /Type /ObjStm, got /{}", kind)));
        }
    }

    let n = dict
        .get("N")
        .and_then(Object::as_integer)
        .filter(|n| (0..=MAX_OBJECTS_PER_STREAM).contains(n))
        .ok_or_else(|| Error::Decode("object stream has no valid /N".to_string()))? as usize;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .filter(|&first| first >= 0)
        .ok_or_else(|| Error::Decode("object stream has no valid /First".to_string()))? as usize;

    let filters = FilterSpec::from_dict(dict)?;
    let decoded = decode_stream_with_options(data, &filters, options)?;
    if decoded.len() < first {
        return Err(Error::Decode(format!(
            "object stream data is {} bytes, /First is {}",
            decoded.len(),
            first
        )));
    }

    let (header, body) = decoded.split_at(first);
    let pairs = parse_pairs(header, n)?;
    let mut objects = Vec::with_capacity(pairs.len());

    for (id, offset) in pairs {
        let Some(input) = body.get(offset..) else {
            log::warn!("Object {} offset {} is beyond object stream data", id, offset);
            continue;
        };
        match parse_object_nested(input, 0, options.max_nesting) {
            Ok((_, Object::Stream { .. })) => {
                log::warn!("Ignoring stream object {} inside an object stream", id);
            },
            Ok((_, object)) => objects.push((id, object)),
            Err(e) => log::warn!("Failed to parse object {} in object stream: {:?}", id, e),
        }
    }

    Ok(objects)
}

/// Read `count` (object number, offset) pairs.
fn parse_pairs(mut input: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count.min(4096));
    for i in 0..count {
        let mut next = || match token(input) {
            Ok((rest, Token::Integer(n))) if n >= 0 => {
                input = rest;
                Ok(n)
            },
            _ => Err(Error::Decode(format!("object stream pair {} is malformed", i))),
        };
        let id = next()?;
        let offset = next()?;
        let id = u32::try_from(id)
            .map_err(|_| Error::Decode(format!("object number {} out of range", id)))?;
        pairs.push((id, offset as usize));
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::encode_stream;
    use crate::object::Dict;

    fn object_stream(header: &str, body: &str, flate: bool) -> Object {
        let raw = format!("{}{}", header, body).into_bytes();
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("ObjStm"));
        dict.insert("N".to_string(), Object::Integer(header.split_whitespace().count() as i64 / 2));
        dict.insert("First".to_string(), Object::Integer(header.len() as i64));
        let data = if flate {
            dict.insert("Filter".to_string(), Object::name("FlateDecode"));
            encode_stream(&raw, &[FilterSpec::new("FlateDecode")]).unwrap()
        } else {
            raw
        };
        Object::stream(dict, data)
    }

    #[test]
    fn test_parse_object_stream() {
        let stream = object_stream("10 0 11 15 ", "<< /Kind /A >> [1 2 3]", true);
        let objects = parse_object_stream(&stream, &ParserOptions::default()).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].0, 10);
        assert_eq!(objects[0].1.as_dict().unwrap().get("Kind"), Some(&Object::name("A")));
        assert_eq!(objects[1], (11, Object::Array(vec![Object::Integer(1), Object::Integer(2), Object::Integer(3)])));
    }

    #[test]
    fn test_bad_offset_is_skipped() {
        let stream = object_stream("1 0 2 500 ", "(a)", false);
        let objects = parse_object_stream(&stream, &ParserOptions::default()).unwrap();
        assert_eq!(objects, vec![(1, Object::String(b"a".to_vec()))]);
    }

    #[test]
    fn test_malformed_header() {
        let stream = object_stream("1 x ", "(a)", false);
        assert!(parse_object_stream(&stream, &ParserOptions::default()).is_err());
    }

    #[test]
    fn test_not_a_stream() {
        assert!(parse_object_stream(&Object::Null, &ParserOptions::default()).is_err());
    }
}
