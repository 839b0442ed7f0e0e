//! PDF object parser.
//!
//! Combines lexer tokens into objects with recursive descent. Composite objects
//! carry a nesting depth so hostile inputs cannot exhaust the stack.
//!
//! All parsing functions return `IResult` from nom; [`to_parse_error`] turns a
//! nom error into an [`Error::ParseError`] with a byte offset.

use crate::error::{Error, Result};
use crate::lexer::{is_whitespace, token, Token};
use crate::object::{Dict, Object, ObjectRef};
use nom::IResult;

/// Nesting limit used by [`parse_object`].
pub const DEFAULT_MAX_NESTING: usize = 100;

/// Decode escape sequences in a literal string body.
///
/// Handles `\n \r \t \b \f \( \) \\`, one to three octal digits, and a
/// backslash before an end of line (line continuation). Unknown escapes drop the
/// backslash.
///
/// ```
/// # use pdf_kiln::parser::decode_literal_string_escapes;
/// assert_eq!(decode_literal_string_escapes(b"Section \\247 1"), b"Section \xa7 1");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        let c = raw[i];
        if c == b'\r' {
            // Any EOL inside a literal string reads as a single LF
            out.push(b'\n');
            i += if raw.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
            continue;
        }
        if c != b'\\' || i + 1 >= raw.len() {
            out.push(c);
            i += 1;
            continue;
        }

        let next = raw[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(next),
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            },
            b'\n' => {},
            b'0'..=b'7' => {
                let mut code = (next - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            code = code * 8 + (d - b'0') as u32;
                            i += 1;
                            digits += 1;
                        },
                        _ => break,
                    }
                }
                out.push((code & 0xFF) as u8);
            },
            other => out.push(other),
        }
    }

    out
}

/// Decode a hex string body. Whitespace is ignored; an odd final digit is padded with 0.
///
/// ```
/// # use pdf_kiln::parser::decode_hex;
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// assert_eq!(decode_hex(b"7").unwrap(), vec![0x70]);
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    fn nibble(c: u8) -> Option<u8> {
        match c {
            b'0'..=b'9' => Some(c - b'0'),
            b'a'..=b'f' => Some(c - b'a' + 10),
            b'A'..=b'F' => Some(c - b'A' + 10),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(hex_bytes.len() / 2 + 1);
    let mut high: Option<u8> = None;
    for (pos, &c) in hex_bytes.iter().enumerate() {
        if is_whitespace(c) {
            continue;
        }
        let value = nibble(c).ok_or_else(|| Error::ParseError {
            offset: pos,
            reason: format!("invalid hex digit 0x{:02X}", c),
        })?;
        match high.take() {
            Some(h) => out.push((h << 4) | value),
            None => high = Some(value),
        }
    }
    if let Some(h) = high {
        out.push(h << 4);
    }
    Ok(out)
}

fn fail(input: &[u8], kind: nom::error::ErrorKind) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Error(nom::error::Error::new(input, kind))
}

/// Parse one object with the default nesting limit.
///
/// ```
/// use pdf_kiln::parser::parse_object;
/// use pdf_kiln::object::{Object, ObjectRef};
///
/// let (_, obj) = parse_object(b"[1 0 R 2]").unwrap();
/// assert_eq!(
///     obj,
///     Object::Array(vec![Object::Reference(ObjectRef::new(1, 0)), Object::Integer(2)])
/// );
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_nested(input, 0, DEFAULT_MAX_NESTING)
}

/// Parse one object, failing if composites nest deeper than `max_nesting`.
pub fn parse_object_nested(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Object> {
    let (rest, tok) = token(input)?;

    match tok {
        Token::Null => Ok((rest, Object::Null)),
        Token::True => Ok((rest, Object::Boolean(true))),
        Token::False => Ok((rest, Object::Boolean(false))),
        Token::Real(r) => Ok((rest, Object::Real(r))),
        Token::Name(name) => Ok((rest, Object::Name(name))),

        Token::Integer(i) => {
            // `N G R` only when the two following tokens are a generation and R
            if i >= 0 && i <= u32::MAX as i64 {
                if let Ok((after_gen, Token::Integer(gen))) = token(rest) {
                    if (0..=u16::MAX as i64).contains(&gen) {
                        if let Ok((after_r, Token::R)) = token(after_gen) {
                            return Ok((after_r, Object::Reference(ObjectRef::new(i as u32, gen as u16))));
                        }
                    }
                }
            }
            Ok((rest, Object::Integer(i)))
        },

        Token::LiteralString(raw) => Ok((rest, Object::String(decode_literal_string_escapes(raw)))),

        Token::HexString(raw) => match decode_hex(raw) {
            Ok(bytes) => Ok((rest, Object::HexString(bytes))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::HexDigit))),
        },

        Token::ArrayStart => {
            if depth >= max_nesting {
                return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
            }
            parse_array(rest, depth + 1, max_nesting)
        },

        Token::DictStart => {
            if depth >= max_nesting {
                return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
            }
            let (rest, dict) = parse_dictionary(rest, depth + 1, max_nesting)?;
            match token(rest) {
                Ok((stream_input, Token::StreamStart)) => {
                    let (rest, data) = parse_stream_data(stream_input, &dict)?;
                    Ok((rest, Object::stream(dict, data)))
                },
                _ => Ok((rest, Object::Dictionary(dict))),
            }
        },

        _ => Err(fail(input, nom::error::ErrorKind::Tag)),
    }
}

fn parse_array(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Object> {
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::ArrayEnd)) => return Ok((rest, Object::Array(items))),
            Ok(_) => {
                let (rest, item) = parse_object_nested(remaining, depth, max_nesting)?;
                items.push(item);
                remaining = rest;
            },
            // Unclosed at end of input: keep what was read
            Err(_) if is_blank(remaining) => return Ok((&remaining[remaining.len()..], Object::Array(items))),
            Err(e) => return Err(e),
        }
    }
}

fn parse_dictionary(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Dict> {
    let mut dict = Dict::new();
    let mut remaining = input;

    loop {
        match token(remaining) {
            Ok((rest, Token::DictEnd)) => return Ok((rest, dict)),
            Ok((rest, Token::Name(key))) => {
                // A key directly followed by `>>` has a null value
                if let Ok((after, Token::DictEnd)) = token(rest) {
                    log::warn!("Dictionary key /{} has no value", key);
                    return Ok((after, dict));
                }
                let (rest, value) = parse_object_nested(rest, depth, max_nesting)?;
                // Null values are equivalent to absent keys
                if !value.is_null() {
                    dict.insert(key, value);
                }
                remaining = rest;
            },
            Ok(_) => return Err(fail(remaining, nom::error::ErrorKind::Tag)),
            Err(_) if is_blank(remaining) => return Ok((&remaining[remaining.len()..], dict)),
            Err(e) => return Err(e),
        }
    }
}

fn is_blank(input: &[u8]) -> bool {
    matches!(crate::lexer::skip_ws(input), Ok((rest, _)) if rest.is_empty())
}

/// Whether `input` begins, after optional whitespace, with `endstream`.
fn at_endstream(input: &[u8]) -> bool {
    let start = input.iter().position(|&c| !is_whitespace(c)).unwrap_or(input.len());
    input[start..].starts_with(b"endstream")
}

/// Position of the first `endstream` keyword.
fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input.windows(keyword.len()).position(|window| window == keyword)
}

/// Read stream data after the `stream` keyword.
///
/// The declared `/Length` is used only when `endstream` follows it; otherwise the
/// data runs up to the actual `endstream` marker minus one end-of-line.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dict) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") {
        &input[1..]
    } else if input.starts_with(b"\r") {
        log::warn!("Stream keyword followed by CR alone");
        &input[1..]
    } else {
        log::warn!("No end-of-line after stream keyword");
        input
    };

    let declared = dict.get("Length").and_then(Object::as_integer);
    if let Some(len) = declared.filter(|&n| n >= 0).map(|n| n as usize) {
        if len <= input.len() && at_endstream(&input[len..]) {
            let (rest, _) = token(&input[len..])?;
            return Ok((rest, input[..len].to_vec()));
        }
    }

    let Some(pos) = find_endstream(input) else {
        return Err(fail(input, nom::error::ErrorKind::Eof));
    };
    let mut end = pos;
    if end > 0 && input[end - 1] == b'\n' {
        end -= 1;
    }
    if end > 0 && input[end - 1] == b'\r' {
        end -= 1;
    }
    match declared {
        Some(len) => log::warn!(
            "Stream /Length {} does not match endstream marker, using {} bytes",
            len,
            end
        ),
        None if dict.contains_key("Length") => {
            log::debug!("Indirect stream /Length, using endstream marker ({} bytes)", end)
        },
        None => log::warn!("Stream without /Length, using endstream marker ({} bytes)", end),
    }

    let rest = &input[pos + b"endstream".len()..];
    Ok((rest, input[..end].to_vec()))
}

/// An indirect object as read from the file.
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectObject {
    /// Identity declared by `N G obj`
    pub reference: ObjectRef,
    /// The object body
    pub object: Object,
    /// Whether the closing `endobj` was present
    pub terminated: bool,
}

/// Parse `N G obj ... endobj`.
pub fn parse_indirect_object(input: &[u8]) -> IResult<&[u8], IndirectObject> {
    parse_indirect_object_nested(input, DEFAULT_MAX_NESTING)
}

/// Parse `N G obj ... endobj` with a nesting limit.
pub fn parse_indirect_object_nested(input: &[u8], max_nesting: usize) -> IResult<&[u8], IndirectObject> {
    let (rest, id) = match token(input)? {
        (rest, Token::Integer(id)) if (0..=u32::MAX as i64).contains(&id) => (rest, id as u32),
        _ => return Err(fail(input, nom::error::ErrorKind::Digit)),
    };
    let (rest, gen) = match token(rest)? {
        (rest, Token::Integer(gen)) if (0..=u16::MAX as i64).contains(&gen) => (rest, gen as u16),
        _ => return Err(fail(rest, nom::error::ErrorKind::Digit)),
    };
    let rest = match token(rest)? {
        (rest, Token::ObjStart) => rest,
        _ => return Err(fail(rest, nom::error::ErrorKind::Tag)),
    };

    let (rest, object) = match token(rest) {
        Ok((after, Token::ObjEnd)) => {
            return Ok((
                after,
                IndirectObject {
                    reference: ObjectRef::new(id, gen),
                    object: Object::Null,
                    terminated: true,
                },
            ))
        },
        _ => parse_object_nested(rest, 0, max_nesting)?,
    };

    let (rest, terminated) = match token(rest) {
        Ok((after, Token::ObjEnd)) => (after, true),
        _ => (rest, false),
    };

    Ok((
        rest,
        IndirectObject {
            reference: ObjectRef::new(id, gen),
            object,
            terminated,
        },
    ))
}

/// Convert a nom error into [`Error::ParseError`], with the offset relative to `file`.
pub fn to_parse_error(file: &[u8], err: nom::Err<nom::error::Error<&[u8]>>) -> Error {
    match err {
        nom::Err::Incomplete(_) => Error::UnexpectedEof,
        nom::Err::Error(e) | nom::Err::Failure(e) => Error::ParseError {
            offset: file.len().saturating_sub(e.input.len()),
            reason: format!("{:?}", e.code),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &[u8]) -> Object {
        parse_object(input).unwrap().1
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    #[test]
    fn test_parse_primitives() {
        assert_eq!(parse(b"null"), Object::Null);
        assert_eq!(parse(b"true"), Object::Boolean(true));
        assert_eq!(parse(b"-12"), Object::Integer(-12));
        assert_eq!(parse(b"0.25"), Object::Real(0.25));
        assert_eq!(parse(b"/Helv"), Object::name("Helv"));
    }

    #[test]
    fn test_literal_string_escapes() {
        assert_eq!(parse(b"(a\\(b\\)c)"), Object::String(b"a(b)c".to_vec()));
        assert_eq!(parse(b"(\\101\\1012)"), Object::String(b"AA2".to_vec()));
        assert_eq!(parse(b"(one\\\ntwo)"), Object::String(b"onetwo".to_vec()));
        assert_eq!(parse(b"(tab\\there)"), Object::String(b"tab\there".to_vec()));
        assert_eq!(parse(b"(cr\r\nlf)"), Object::String(b"cr\nlf".to_vec()));
    }

    #[test]
    fn test_hex_string_stays_hex() {
        assert_eq!(parse(b"<48 65 6C 6C 6F>"), Object::HexString(b"Hello".to_vec()));
        assert_eq!(parse(b"<ABC>"), Object::HexString(vec![0xAB, 0xC0]));
    }

    #[test]
    fn test_decode_hex_rejects_garbage() {
        assert!(decode_hex(b"4G").is_err());
        assert!(decode_hex(b"").unwrap().is_empty());
    }

    // ========================================================================
    // References
    // ========================================================================

    #[test]
    fn test_reference_needs_trailing_r() {
        assert_eq!(parse(b"12 3 R"), Object::Reference(ObjectRef::new(12, 3)));
        let (rest, obj) = parse_object(b"12 3 4").unwrap();
        assert_eq!(obj, Object::Integer(12));
        assert_eq!(rest, b" 3 4");
    }

    #[test]
    fn test_adjacent_numbers_in_array() {
        let obj = parse(b"[0 0 612 792]");
        assert_eq!(obj, Object::numbers(&[0.0, 0.0, 612.0, 792.0]));
        let obj = parse(b"[1 0 R 2 0 R 5]");
        assert_eq!(obj.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_negative_number_is_not_reference() {
        let obj = parse(b"[-1 0 R]");
        assert_eq!(obj.as_array().unwrap()[0], Object::Integer(-1));
    }

    // ========================================================================
    // Composites
    // ========================================================================

    #[test]
    fn test_nested_dictionary() {
        let obj = parse(b"<< /Type /Page /MediaBox [0 0 612 792] /Res << /F 1 0 R >> >>");
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").and_then(Object::as_name), Some("Page"));
        let res = dict.get("Res").and_then(Object::as_dict).unwrap();
        assert_eq!(res.get("F"), Some(&Object::Reference(ObjectRef::new(1, 0))));
    }

    #[test]
    fn test_null_dictionary_values_are_dropped() {
        let obj = parse(b"<< /A null /B 1 >>");
        let dict = obj.as_dict().unwrap();
        assert!(!dict.contains_key("A"));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn test_unclosed_array_at_eof() {
        assert_eq!(parse(b"[1 2"), Object::Array(vec![Object::Integer(1), Object::Integer(2)]));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = "[".repeat(DEFAULT_MAX_NESTING + 5);
        assert!(parse_object(deep.as_bytes()).is_err());
        let ok = format!("{}{}", "[".repeat(10), "]".repeat(10));
        assert!(parse_object(ok.as_bytes()).is_ok());
    }

    #[test]
    fn test_dictionary_key_must_be_name() {
        assert!(parse_object(b"<< 1 2 >>").is_err());
    }

    // ========================================================================
    // Streams
    // ========================================================================

    #[test]
    fn test_stream_with_correct_length() {
        let obj = parse(b"<< /Length 5 >>\nstream\nHello\nendstream");
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_length_too_long_uses_marker() {
        let (rest, obj) = parse_object(b"<< /Length 50 >>\nstream\nHello\nendstream\nendobj").unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("expected stream, got {:?}", other),
        }
        assert_eq!(rest, b"\nendobj");
    }

    #[test]
    fn test_stream_length_too_short_uses_marker() {
        let obj = parse(b"<< /Length 2 >>\r\nstream\r\nHello World\r\nendstream");
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello World"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_stream_with_indirect_length() {
        let obj = parse(b"<< /Length 9 0 R >>\nstream\nabc\nendstream");
        match obj {
            Object::Stream { data, dict } => {
                assert_eq!(&data[..], b"abc");
                assert_eq!(dict.get("Length"), Some(&Object::Reference(ObjectRef::new(9, 0))));
            },
            other => panic!("expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_stream_containing_newlines() {
        let obj = parse(b"<< /Length 4 >>\nstream\n\n\r\n\nendstream");
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"\n\r\n\n"),
            other => panic!("expected stream, got {:?}", other),
        }
    }

    // ========================================================================
    // Indirect objects
    // ========================================================================

    #[test]
    fn test_indirect_object() {
        let (rest, ind) = parse_indirect_object(b"4 0 obj\n<< /Type /Catalog >>\nendobj\n5").unwrap();
        assert_eq!(ind.reference, ObjectRef::new(4, 0));
        assert!(ind.terminated);
        assert_eq!(ind.object.as_dict().unwrap().len(), 1);
        assert_eq!(rest, b"\n5");
    }

    #[test]
    fn test_indirect_object_missing_endobj() {
        let (_, ind) = parse_indirect_object(b"7 1 obj 42 8 0 obj").unwrap();
        assert_eq!(ind.reference, ObjectRef::new(7, 1));
        assert_eq!(ind.object, Object::Integer(42));
        assert!(!ind.terminated);
    }

    #[test]
    fn test_empty_indirect_object_is_null() {
        let (_, ind) = parse_indirect_object(b"3 0 obj endobj").unwrap();
        assert_eq!(ind.object, Object::Null);
    }

    #[test]
    fn test_to_parse_error_reports_offset() {
        let file = b"1 0 obj << 1 2 >> endobj";
        let err = parse_indirect_object(file).unwrap_err();
        match to_parse_error(file, err) {
            Error::ParseError { offset, .. } => assert!(offset >= 10),
            other => panic!("unexpected {:?}", other),
        }
    }
}
