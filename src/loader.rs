//! Loading a file into a [`PdfContext`].
//!
//! Loading first follows the structured path: `startxref`, the cross-reference
//! sections, then every object at its recorded offset. Anything on that path
//! that does not check out (bad offset, garbage, a missing trailer, an entry
//! pointing at the wrong object) is a `RepairNeeded` signal, and when
//! [`ParserOptions::allow_repair`] is set the file is reloaded from a
//! brute-force scan instead.

use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::parse_indirect_object_nested;
use crate::parser_config::ParserOptions;
use crate::xref::{find_startxref, parse_xref, CrossRefTable, XRefEntryType};
use crate::xref_reconstruction::reconstruct_xref;
use std::collections::BTreeMap;

/// The header must start within this many bytes.
const HEADER_WINDOW: usize = 1024;

/// A parsed file, ready to be wrapped in a document.
#[derive(Debug)]
pub struct LoadedFile {
    /// Every object of the file at its file identity
    pub context: PdfContext,
    /// Trailer dictionary (`/Root`, `/Info`, `/ID`, ...)
    pub trailer: Dict,
    /// Header version, e.g. "1.7"
    pub version: String,
    /// Offset of the last cross-reference section, when it could be trusted
    pub startxref: Option<usize>,
    /// Whether the brute-force scan was used
    pub repaired: bool,
}

/// Why the structured path gave up.
#[derive(Debug)]
struct RepairNeeded(String);

impl From<Error> for RepairNeeded {
    fn from(err: Error) -> Self {
        RepairNeeded(err.to_string())
    }
}

/// Parse `data` into objects, repairing the cross-reference data if needed.
pub fn load(data: &[u8], options: &ParserOptions) -> Result<LoadedFile> {
    if options.max_file_size > 0 && data.len() > options.max_file_size {
        return Err(Error::Unsupported(format!(
            "file of {} bytes exceeds the {} byte limit",
            data.len(),
            options.max_file_size
        )));
    }

    let version = read_header(data)?;

    let loaded = match load_structured(data, options) {
        Ok((context, trailer, startxref)) => LoadedFile {
            context,
            trailer,
            version,
            startxref: Some(startxref),
            repaired: false,
        },
        Err(RepairNeeded(reason)) if options.allow_repair => {
            log::warn!("Cross-reference data unusable ({}), repairing", reason);
            let (context, trailer) = load_repaired(data, options)?;
            LoadedFile {
                context,
                trailer,
                version,
                startxref: None,
                repaired: true,
            }
        },
        Err(RepairNeeded(reason)) => return Err(Error::InvalidXref(reason)),
    };

    if loaded.trailer.contains_key("Encrypt") {
        return Err(Error::Unsupported("encrypted documents".to_string()));
    }

    log::debug!(
        "Loaded {} objects (PDF {}{})",
        loaded.context.len(),
        loaded.version,
        if loaded.repaired { ", repaired" } else { "" }
    );
    Ok(loaded)
}

/// Version from the `%PDF-x.y` header.
fn read_header(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_WINDOW)];
    let marker = b"%PDF-";
    let start = window
        .windows(marker.len())
        .position(|w| w == marker)
        .ok_or_else(|| {
            Error::InvalidHeader(String::from_utf8_lossy(&window[..window.len().min(8)]).into_owned())
        })?;

    let version: String = data[start + marker.len()..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == b'.')
        .map(|&c| c as char)
        .collect();
    if version.is_empty() {
        return Err(Error::InvalidHeader(
            String::from_utf8_lossy(&data[start..data.len().min(start + 8)]).into_owned(),
        ));
    }
    if start > 0 {
        log::warn!("PDF header found at offset {} instead of 0", start);
    }
    Ok(version)
}

fn load_structured(
    data: &[u8],
    options: &ParserOptions,
) -> std::result::Result<(PdfContext, Dict, usize), RepairNeeded> {
    let startxref = find_startxref(data)?;
    let table = parse_xref(data, startxref, options)?;
    let trailer = table
        .trailer()
        .cloned()
        .ok_or_else(|| RepairNeeded("no trailer dictionary".to_string()))?;

    let mut context = PdfContext::new();
    let mut compressed: BTreeMap<u32, Vec<(u32, u16)>> = BTreeMap::new();

    for (id, entry) in table.iter() {
        match entry.entry_type {
            XRefEntryType::Free => {},
            XRefEntryType::Compressed => {
                let stream_id = u32::try_from(entry.offset)
                    .map_err(|_| RepairNeeded(format!("object {} names stream {}", id, entry.offset)))?;
                compressed.entry(stream_id).or_default().push((id, entry.generation));
            },
            XRefEntryType::Uncompressed => {
                let object = read_object_at(data, entry.offset as usize, ObjectRef::new(id, entry.generation), options)?;
                context.insert(ObjectRef::new(id, entry.generation), object);
            },
        }
    }

    for (stream_id, members) in compressed {
        let stream = context
            .lookup(ObjectRef::new(stream_id, 0))
            .ok_or_else(|| RepairNeeded(format!("object stream {} is missing", stream_id)))?;
        let objects = parse_object_stream(stream, options)?;
        for (id, index) in members {
            match objects.get(index as usize) {
                Some((found, object)) if *found == id => context.insert(ObjectRef::new(id, 0), object.clone()),
                _ => {
                    return Err(RepairNeeded(format!(
                        "object {} is not at index {} of object stream {}",
                        id, index, stream_id
                    )))
                },
            }
        }
    }

    let root = trailer
        .get("Root")
        .and_then(Object::as_reference)
        .ok_or_else(|| RepairNeeded("trailer has no /Root".to_string()))?;
    if context.lookup(root).and_then(Object::as_dict).is_none() {
        return Err(RepairNeeded(format!("/Root {} is not a dictionary", root)));
    }

    Ok((context, trailer, startxref))
}

/// The object at `offset`, which must declare identity `expected`.
fn read_object_at(
    data: &[u8],
    offset: usize,
    expected: ObjectRef,
    options: &ParserOptions,
) -> std::result::Result<Object, RepairNeeded> {
    let input = data
        .get(offset..)
        .ok_or_else(|| RepairNeeded(format!("object {} offset {} beyond end of file", expected, offset)))?;
    let (_, indirect) = parse_indirect_object_nested(input, options.max_nesting)
        .map_err(|_| RepairNeeded(format!("no object {} at offset {}", expected, offset)))?;

    if indirect.reference != expected {
        return Err(RepairNeeded(format!(
            "offset {} holds {} instead of {}",
            offset, indirect.reference, expected
        )));
    }
    if !indirect.terminated {
        if !options.allow_missing_endobj {
            return Err(RepairNeeded(format!("object {} has no endobj", expected)));
        }
        log::warn!("Object {} has no endobj", expected);
    }
    Ok(indirect.object)
}

fn load_repaired(data: &[u8], options: &ParserOptions) -> Result<(PdfContext, Dict)> {
    let (table, mut trailer) = reconstruct_xref(data)?;
    let mut context = PdfContext::new();
    let mut errors = 0;

    for (id, entry) in table.iter() {
        let offset = entry.offset as usize;
        let parsed = parse_indirect_object_nested(&data[offset..], options.max_nesting);
        match parsed {
            Ok((_, indirect)) => context.insert(indirect.reference, indirect.object),
            Err(e) => {
                errors += 1;
                log::warn!("Skipping unparseable object {} at offset {}: {:?}", id, offset, e);
                if !options.should_continue(errors) {
                    return Err(Error::ParseError {
                        offset,
                        reason: format!("object {} could not be parsed", id),
                    });
                }
            },
        }
    }

    expand_object_streams(&mut context, &table, options);

    if !trailer.contains_key("Root") {
        let catalog = context
            .iter()
            .filter(|(_, object)| {
                object.as_dict().and_then(|d| d.get("Type")).and_then(Object::as_name) == Some("Catalog")
            })
            .map(|(r, _)| r)
            .last();
        match catalog {
            Some(root) => {
                trailer.insert("Root".to_string(), Object::Reference(root));
            },
            None => return Err(Error::InvalidXref("no document catalog found".to_string())),
        }
    }

    log::info!("Repaired document: {} objects recovered", context.len());
    Ok((context, trailer))
}

/// Insert the members of every object stream found by the scan, unless the
/// same number was found directly in the file.
fn expand_object_streams(context: &mut PdfContext, table: &CrossRefTable, options: &ParserOptions) {
    let streams: Vec<ObjectRef> = context
        .iter()
        .filter(|(_, object)| match object {
            Object::Stream { dict, .. } => dict.get("Type").and_then(Object::as_name) == Some("ObjStm"),
            _ => false,
        })
        .map(|(r, _)| r)
        .collect();

    for stream_ref in streams {
        let Some(stream) = context.lookup(stream_ref) else {
            continue;
        };
        let objects = match parse_object_stream(stream, options) {
            Ok(objects) => objects,
            Err(e) => {
                log::warn!("Skipping unreadable object stream {}: {}", stream_ref, e);
                continue;
            },
        };
        for (id, object) in objects {
            if !table.contains(id) && !context.contains(ObjectRef::new(id, 0)) {
                context.insert(ObjectRef::new(id, 0), object);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small file with a correct classic table.
    fn build(objects: &[&str], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.7\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(format!("trailer\n{}\nstartxref\n{}\n%%EOF\n", trailer, xref).as_bytes());
        out
    }

    fn simple() -> Vec<u8> {
        build(
            &["<< /Type /Catalog /Pages 2 0 R >>", "<< /Type /Pages /Kids [] /Count 0 >>"],
            "<< /Size 3 /Root 1 0 R >>",
        )
    }

    #[test]
    fn test_structured_load() {
        let loaded = load(&simple(), &ParserOptions::default()).unwrap();
        assert!(!loaded.repaired);
        assert_eq!(loaded.version, "1.7");
        assert_eq!(loaded.context.len(), 2);
        assert!(loaded.startxref.is_some());
        assert!(loaded.context.modified().is_empty());
    }

    #[test]
    fn test_bad_header() {
        assert!(matches!(load(b"hello world", &ParserOptions::default()), Err(Error::InvalidHeader(_))));
    }

    fn with_garbage_table() -> Vec<u8> {
        String::from_utf8(simple())
            .unwrap()
            .replacen("0000000000 65535 f", "garbage!garbage!ga", 1)
            .into_bytes()
    }

    #[test]
    fn test_garbage_xref_repairs() {
        let loaded = load(&with_garbage_table(), &ParserOptions::default()).unwrap();
        assert!(loaded.repaired);
        assert!(loaded.startxref.is_none());
        assert_eq!(loaded.context.len(), 2);
        assert_eq!(loaded.trailer.get("Root"), Some(&Object::Reference(ObjectRef::new(1, 0))));
    }

    #[test]
    fn test_strict_refuses_repair() {
        assert!(matches!(
            load(&with_garbage_table(), &ParserOptions::strict()),
            Err(Error::InvalidXref(_))
        ));
    }

    #[test]
    fn test_wrong_offset_triggers_repair() {
        let data = simple();
        let text = String::from_utf8_lossy(&data).into_owned();
        // Point object 2 at object 1
        let entry = format!("{:010} 00000 n", text.find("2 0 obj").unwrap());
        let wrong = format!("{:010} 00000 n", text.find("1 0 obj").unwrap());
        let patched = text.replacen(&entry, &wrong, 1);
        let loaded = load(patched.as_bytes(), &ParserOptions::default()).unwrap();
        assert!(loaded.repaired);
        assert!(loaded.context.contains(ObjectRef::new(2, 0)));
    }

    #[test]
    fn test_encrypted_is_unsupported() {
        let data = build(
            &["<< /Type /Catalog >>", "<< /Filter /Standard >>"],
            "<< /Size 3 /Root 1 0 R /Encrypt 2 0 R >>",
        );
        assert!(matches!(load(&data, &ParserOptions::default()), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_missing_catalog_after_repair() {
        let data = b"%PDF-1.4\n1 0 obj\n(just a string)\nendobj\n";
        assert!(matches!(load(data, &ParserOptions::default()), Err(Error::InvalidXref(_))));
    }

    #[test]
    fn test_file_size_limit() {
        let opts = ParserOptions {
            max_file_size: 10,
            ..ParserOptions::default()
        };
        assert!(load(&simple(), &opts).is_err());
    }
}
