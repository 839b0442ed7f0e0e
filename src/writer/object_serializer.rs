//! PDF object serialization.
//!
//! Dictionary keys are written in sorted order so output is deterministic.
//! A stream's `/Length` is always the length of the data actually written.

use crate::lexer::is_delimiter;
use crate::object::{Dict, Object, ObjectRef};

/// Serializer for PDF objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Create a new object serializer.
    pub fn new() -> Self {
        Self
    }

    /// Serialize an object to bytes.
    ///
    /// ```
    /// use pdf_kiln::object::Object;
    /// use pdf_kiln::writer::ObjectSerializer;
    ///
    /// let out = ObjectSerializer::new().serialize(&Object::Array(vec![
    ///     Object::Integer(1),
    ///     Object::Real(0.5),
    ///     Object::name("A B"),
    /// ]));
    /// assert_eq!(out, b"[1 0.5 /A#20B]");
    /// ```
    pub fn serialize(&self, obj: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj);
        buf
    }

    /// Serialize an object to a string (for debugging and tests).
    pub fn serialize_to_string(&self, obj: &Object) -> String {
        String::from_utf8_lossy(&self.serialize(obj)).into_owned()
    }

    /// Serialize an indirect object definition:
    /// `{id} {gen} obj\n{object}\nendobj\n`.
    pub fn serialize_indirect(&self, r: ObjectRef, obj: &Object) -> Vec<u8> {
        let mut buf = format!("{} {} obj\n", r.id, r.gen).into_bytes();
        self.write_object(&mut buf, obj);
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    /// Append an object to `out`.
    pub fn write_object(&self, out: &mut Vec<u8>, obj: &Object) {
        match obj {
            Object::Null => out.extend_from_slice(b"null"),
            Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
            Object::Real(r) => out.extend_from_slice(format_real(*r).as_bytes()),
            Object::String(s) => write_literal_string(out, s),
            Object::HexString(s) => write_hex_string(out, s),
            Object::Name(n) => write_name(out, n),
            Object::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.write_object(out, item);
                }
                out.push(b']');
            },
            Object::Dictionary(dict) => self.write_dictionary(out, dict, None),
            Object::Stream { dict, data } => {
                self.write_dictionary(out, dict, Some(data.len()));
                out.extend_from_slice(b"\nstream\n");
                out.extend_from_slice(data);
                out.extend_from_slice(b"\nendstream");
            },
            Object::Reference(r) => out.extend_from_slice(format!("{} {} R", r.id, r.gen).as_bytes()),
        }
    }

    /// Write a dictionary; `length` overrides `/Length` for streams.
    fn write_dictionary(&self, out: &mut Vec<u8>, dict: &Dict, length: Option<usize>) {
        out.extend_from_slice(b"<<");

        let mut keys: Vec<&String> = dict.keys().filter(|k| length.is_none() || *k != "Length").collect();
        keys.sort();

        for key in keys {
            if let Some(value) = dict.get(key) {
                if value.is_null() {
                    continue;
                }
                write_name(out, key);
                out.push(b' ');
                self.write_object(out, value);
                out.push(b' ');
            }
        }
        if let Some(length) = length {
            out.extend_from_slice(format!("/Length {}", length).as_bytes());
        } else if out.last() == Some(&b' ') {
            out.pop();
        }
        out.extend_from_slice(b">>");
    }
}

/// Format a real with at most five decimals and no trailing zeros.
///
/// Non-finite values are written as 0.
pub fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{:.5}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Write a literal string, escaping delimiters and non-printable bytes.
pub fn write_literal_string(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'(');
    for &byte in data {
        match byte {
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x20..=0x7E => out.push(byte),
            _ => out.extend_from_slice(format!("\\{:03o}", byte).as_bytes()),
        }
    }
    out.push(b')');
}

/// Write a hex string in uppercase.
pub fn write_hex_string(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'<');
    for byte in data {
        out.extend_from_slice(format!("{:02X}", byte).as_bytes());
    }
    out.push(b'>');
}

/// Write a name, escaping `#`, delimiters and bytes outside `!`..=`~` as `#XX`.
pub fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for byte in name.bytes() {
        if (b'!'..=b'~').contains(&byte) && byte != b'#' && !is_delimiter(byte) {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_object;

    fn ser(obj: &Object) -> String {
        ObjectSerializer::new().serialize_to_string(obj)
    }

    #[test]
    fn test_serialize_primitives() {
        assert_eq!(ser(&Object::Null), "null");
        assert_eq!(ser(&Object::Boolean(true)), "true");
        assert_eq!(ser(&Object::Integer(-42)), "-42");
        assert_eq!(ser(&Object::Reference(ObjectRef::new(12, 3))), "12 3 R");
    }

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(1.5), "1.5");
        assert_eq!(format_real(2.0), "2");
        assert_eq!(format_real(0.000001), "0");
        assert_eq!(format_real(-0.0000001), "0");
        assert_eq!(format_real(-3.25), "-3.25");
        assert_eq!(format_real(f64::NAN), "0");
    }

    #[test]
    fn test_serialize_strings() {
        assert_eq!(ser(&Object::String(b"a(b)c\\".to_vec())), "(a\\(b\\)c\\\\)");
        assert_eq!(ser(&Object::String(vec![0xFE, 0xFF, 0x00, 0x41])), "(\\376\\377\\000A)");
        assert_eq!(ser(&Object::HexString(vec![0x00, 0xAB])), "<00AB>");
    }

    #[test]
    fn test_serialize_names() {
        assert_eq!(ser(&Object::name("Type")), "/Type");
        assert_eq!(ser(&Object::name("A#B/C")), "/A#23B#2FC");
        assert_eq!(ser(&Object::name("")), "/");
    }

    #[test]
    fn test_dictionary_sorted_and_nulls_dropped() {
        let mut dict = Dict::new();
        dict.insert("Zeta".to_string(), Object::Integer(1));
        dict.insert("Alpha".to_string(), Object::Integer(2));
        dict.insert("Gone".to_string(), Object::Null);
        assert_eq!(ser(&Object::Dictionary(dict)), "<</Alpha 2 /Zeta 1>>");
        assert_eq!(ser(&Object::Dictionary(Dict::new())), "<<>>");
    }

    #[test]
    fn test_stream_length_is_rewritten() {
        let mut dict = Dict::new();
        dict.insert("Length".to_string(), Object::Integer(999));
        let stream = Object::stream(dict, b"abc".to_vec());
        assert_eq!(ser(&stream), "<</Length 3>>\nstream\nabc\nendstream");
    }

    #[test]
    fn test_indirect_object() {
        let out = ObjectSerializer::new().serialize_indirect(ObjectRef::new(4, 0), &Object::Integer(7));
        assert_eq!(out, b"4 0 obj\n7\nendobj\n");
    }

    #[test]
    fn test_serialized_objects_parse_back() {
        let mut dict = Dict::new();
        dict.insert("Name With Space".to_string(), Object::String(vec![0, 1, 2, 255, b'(']));
        dict.insert("Kids".to_string(), Object::Array(vec![Object::Reference(ObjectRef::new(1, 0)), Object::Real(0.25)]));
        let original = Object::Dictionary(dict);
        let bytes = ObjectSerializer::new().serialize(&original);
        let (_, parsed) = parse_object(&bytes).unwrap();
        assert_eq!(parsed, original);
    }
}
