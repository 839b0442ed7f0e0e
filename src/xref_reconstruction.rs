//! Cross-reference reconstruction for damaged files.
//!
//! When the structured cross-reference data is missing or wrong, the whole file
//! is scanned for `N G obj` headers and a table is rebuilt from what is found.
//! This is only used as a fallback by the loader, and can be called on its own.

use crate::error::{Error, Result};
use crate::lexer::{is_regular, is_whitespace};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser::{parse_indirect_object_nested, parse_object_nested, DEFAULT_MAX_NESTING};
use crate::xref::{CrossRefTable, XRefEntry};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    /// `N G obj` object headers
    static ref RE_OBJ_HEADER: Regex = Regex::new(r"(\d+)\s+(\d+)\s+obj").unwrap();

    /// `trailer <<` trailer dictionaries
    static ref RE_TRAILER: Regex = Regex::new(r"trailer\s*<<").unwrap();
}

/// Rebuild the cross-reference table and trailer by scanning `data`.
///
/// Every `N G obj` header followed by something that can start an object is
/// recorded at its offset; a later header for the same number replaces an
/// earlier one, which matches incremental-update order. Objects that parse
/// cleanly are skipped over, so headers inside their stream data are ignored.
///
/// The trailer is the last `trailer` dictionary (or xref stream dictionary)
/// whose `/Root` was found; failing that, one is synthesized from the last
/// object with `/Type /Catalog`.
///
/// Fails only if no object is found.
///
/// ```
/// use pdf_kiln::xref_reconstruction::reconstruct_xref;
///
/// let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\nxref\ngarbage";
/// let (table, trailer) = reconstruct_xref(data).unwrap();
/// assert_eq!(table.len(), 1);
/// assert!(trailer.contains_key("Root"));
/// ```
pub fn reconstruct_xref(data: &[u8]) -> Result<(CrossRefTable, Dict)> {
    log::info!("Reconstructing cross-reference table by scanning {} bytes", data.len());

    let mut table = CrossRefTable::new();
    let mut catalog: Option<ObjectRef> = None;
    let mut stream_trailer: Option<Dict> = None;
    let mut pos = 0;

    while let Some(caps) = RE_OBJ_HEADER.captures_at(data, pos) {
        let (Some(header), Some(id), Some(gen)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            break;
        };
        pos = header.end();

        let start = header.start();
        if start > 0 && is_regular(data[start - 1]) {
            continue;
        }
        if data.get(header.end()).is_some_and(|&c| is_regular(c)) {
            continue;
        }
        let (Some(id), Some(gen)) = (parse_decimal::<u32>(id.as_bytes()), parse_decimal::<u16>(gen.as_bytes())) else {
            log::debug!("Object header at {} has out-of-range numbers", start);
            continue;
        };
        if !starts_object(&data[header.end()..]) {
            log::debug!("Skipping false object header {} {} at offset {}", id, gen, start);
            continue;
        }

        table.add_entry(id, XRefEntry::uncompressed(start as u64, gen));

        if let Ok((rest, indirect)) = parse_indirect_object_nested(&data[start..], DEFAULT_MAX_NESTING) {
            match &indirect.object {
                Object::Dictionary(dict) if is_catalog(dict) => catalog = Some(ObjectRef::new(id, gen)),
                Object::Stream { dict, .. }
                    if dict.get("Type").and_then(Object::as_name) == Some("XRef") =>
                {
                    stream_trailer = Some(dict.clone());
                },
                _ => {},
            }
            pos = data.len() - rest.len();
        }
    }

    if table.is_empty() {
        return Err(Error::InvalidXref(
            "no objects found while reconstructing the cross-reference table".to_string(),
        ));
    }
    log::info!("Reconstructed cross-reference table with {} objects", table.len());

    let root_known = |dict: &Dict| {
        dict.get("Root")
            .and_then(Object::as_reference)
            .is_some_and(|root| table.get(root.id).is_some_and(|e| e.generation == root.gen))
    };

    let trailer = find_trailer(data)
        .filter(|dict| root_known(dict))
        .or_else(|| stream_trailer.filter(|dict| root_known(dict)))
        .map(|mut dict| {
            for key in ["Prev", "XRefStm", "Type", "W", "Index", "Length", "Filter", "DecodeParms"] {
                dict.remove(key);
            }
            dict
        });

    let mut trailer = match (trailer, catalog) {
        (Some(trailer), _) => trailer,
        (None, Some(root)) => {
            log::warn!("No usable trailer, using catalog {} as /Root", root);
            let mut dict = Dict::new();
            dict.insert("Root".to_string(), Object::Reference(root));
            dict
        },
        (None, None) => {
            log::warn!("No trailer and no catalog found while reconstructing");
            Dict::new()
        },
    };

    let size = table.iter().map(|(id, _)| id).max().map_or(1, |max| max as i64 + 1);
    trailer.insert("Size".to_string(), Object::Integer(size));

    Ok((table, trailer))
}

fn parse_decimal<T: std::str::FromStr>(digits: &[u8]) -> Option<T> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Whether the bytes after `obj` can begin an object (or an empty `endobj`).
fn starts_object(rest: &[u8]) -> bool {
    let body = match rest.iter().position(|&c| !is_whitespace(c)) {
        Some(i) => &rest[i..],
        None => return false,
    };
    matches!(body[0], b'<' | b'[' | b'(' | b'/' | b'+' | b'-' | b'.' | b'%')
        || body[0].is_ascii_digit()
        || [&b"true"[..], b"false", b"null", b"endobj"]
            .iter()
            .any(|word| body.starts_with(word))
}

fn is_catalog(dict: &Dict) -> bool {
    dict.get("Type").and_then(Object::as_name) == Some("Catalog")
}

/// The last `trailer` dictionary in the file that parses.
fn find_trailer(data: &[u8]) -> Option<Dict> {
    RE_TRAILER
        .find_iter(data)
        .filter_map(|m| {
            let input = &data[m.start() + b"trailer".len()..];
            match parse_object_nested(input, 0, DEFAULT_MAX_NESTING) {
                Ok((_, Object::Dictionary(dict))) => Some(dict),
                _ => {
                    log::debug!("Unparseable trailer dictionary at offset {}", m.start());
                    None
                },
            }
        })
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_finds_all_objects() {
        let data = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n\
3 0 obj\n(hello)\nendobj\n\
xref\nthis table is garbage\n";
        let (table, trailer) = reconstruct_xref(data).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(1, 0))));
        assert_eq!(trailer.get("Size"), Some(&Object::Integer(4)));

        let offset = table.get(2).unwrap().offset as usize;
        assert!(data[offset..].starts_with(b"2 0 obj"));
    }

    #[test]
    fn test_later_header_wins() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n4 0 obj\n(old)\nendobj\n4 0 obj\n(new)\nendobj\n";
        let (table, _) = reconstruct_xref(data).unwrap();
        let offset = table.get(4).unwrap().offset as usize;
        assert!(data[offset..].starts_with(b"4 0 obj\n(new)"));
    }

    #[test]
    fn test_trailer_keyword_preferred() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n2 0 obj\n<< /Title (t) >>\nendobj\n\
trailer\n<< /Size 99 /Root 1 0 R /Info 2 0 R /Prev 1234 >>\n";
        let (_, trailer) = reconstruct_xref(data).unwrap();
        assert_eq!(trailer.get("Info"), Some(&Object::Reference(ObjectRef::new(2, 0))));
        assert!(!trailer.contains_key("Prev"));
        assert_eq!(trailer.get("Size"), Some(&Object::Integer(3)));
    }

    #[test]
    fn test_trailer_with_unknown_root_is_ignored() {
        let data = b"5 0 obj\n<< /Type /Catalog >>\nendobj\ntrailer\n<< /Root 9 0 R >>\n";
        let (_, trailer) = reconstruct_xref(data).unwrap();
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(5, 0))));
    }

    #[test]
    fn test_false_headers_skipped() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n% 7 0 objection\nx8 0 obj (no)\n9 0 obj }\n";
        let (table, _) = reconstruct_xref(data).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.contains(1));
    }

    #[test]
    fn test_headers_inside_streams_ignored() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n\
2 0 obj\n<< /Length 17 >>\nstream\n1 0 obj (fake)   \nendstream\nendobj\n";
        let (table, trailer) = reconstruct_xref(data).unwrap();
        let offset = table.get(1).unwrap().offset as usize;
        assert_eq!(offset, 0);
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(1, 0))));
    }

    #[test]
    fn test_no_objects_is_an_error() {
        assert!(matches!(reconstruct_xref(b"%PDF-1.4\nnothing here"), Err(Error::InvalidXref(_))));
    }
}
