//! Cross-reference parsing.
//!
//! The cross-reference data maps object numbers to byte offsets (or to a slot
//! in a compressed object stream). Both classic `xref` tables and PDF 1.5
//! cross-reference streams are read, and `/Prev` chains from incremental
//! updates are merged with newer sections taking precedence.
//!
//! Any error returned here makes the loader fall back to
//! [`reconstruct_xref`](crate::xref_reconstruction::reconstruct_xref).

use crate::error::{Error, Result};
use crate::lexer::{skip_ws, token, Token};
use crate::object::{Dict, Object};
use crate::parser::{parse_indirect_object_nested, parse_object_nested};
use crate::parser_config::ParserOptions;
use byteorder::{BigEndian, ByteOrder};
use std::collections::{BTreeMap, HashSet};

/// How far from the end of the file `startxref` is searched for.
const STARTXREF_WINDOW: usize = 2048;

/// Upper bound on entries in one classic subsection.
const MAX_SUBSECTION_ENTRIES: i64 = 10_000_000;

/// Cross-reference entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntryType {
    /// Entry for a free object
    Free,
    /// Object stored directly in the file at a byte offset
    Uncompressed,
    /// Object stored inside an object stream (PDF 1.5+)
    Compressed,
}

/// Cross-reference entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    /// Type of entry
    pub entry_type: XRefEntryType,
    /// Byte offset (uncompressed), object stream number (compressed) or next
    /// free object (free)
    pub offset: u64,
    /// Generation (uncompressed, free) or index within the object stream
    /// (compressed)
    pub generation: u16,
}

impl XRefEntry {
    /// Entry for an object at a byte offset.
    pub fn uncompressed(offset: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Uncompressed,
            offset,
            generation,
        }
    }

    /// Entry for an object inside an object stream.
    pub fn compressed(stream_id: u64, index: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Compressed,
            offset: stream_id,
            generation: index,
        }
    }

    /// Free entry.
    pub fn free(next_free: u64, generation: u16) -> Self {
        Self {
            entry_type: XRefEntryType::Free,
            offset: next_free,
            generation,
        }
    }

    /// Whether the entry describes a live object.
    pub fn in_use(&self) -> bool {
        self.entry_type != XRefEntryType::Free
    }
}

/// Object number to location map plus the trailer dictionary.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    entries: BTreeMap<u32, XRefEntry>,
    /// Trailer dictionary (for xref streams, the stream dictionary)
    trailer: Option<Dict>,
}

impl CrossRefTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dict) {
        self.trailer = Some(trailer);
    }

    /// The trailer dictionary, if one was read.
    pub fn trailer(&self) -> Option<&Dict> {
        self.trailer.as_ref()
    }

    /// Add or replace an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Entry for an object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Whether the table has an entry for an object number.
    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    /// Entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries.iter().map(|(n, e)| (*n, e))
    }

    /// Merge an older section into this one. Entries and trailer already
    /// present win.
    pub fn merge_from(&mut self, older: CrossRefTable) {
        for (number, entry) in older.entries {
            self.entries.entry(number).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = older.trailer;
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Offset named by the last `startxref` in the final 2048 bytes of the file.
///
/// ```
/// use pdf_kiln::xref::find_startxref;
///
/// let tail = b"...endobj\nstartxref\n1234\n%%EOF\n";
/// assert_eq!(find_startxref(tail).unwrap(), 1234);
/// ```
pub fn find_startxref(data: &[u8]) -> Result<usize> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let window = &data[window_start..];
    let keyword = b"startxref";

    let pos = window
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::InvalidXref("startxref not found".to_string()))?;

    let after = &window[pos + keyword.len()..];
    match token(after) {
        Ok((_, Token::Integer(offset))) if offset >= 0 => Ok(offset as usize),
        _ => Err(Error::InvalidXref("startxref is not followed by an offset".to_string())),
    }
}

/// Read the cross-reference section at `offset` and every section reachable
/// through `/Prev` (and `/XRefStm` for hybrid files).
///
/// The loop guard stops at the first offset seen twice; a chain longer than
/// `options.max_prev_chain` is an error.
pub fn parse_xref(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let mut table = CrossRefTable::new();
    let mut seen = HashSet::new();
    let mut next = Some(offset);
    let mut depth = 0;

    while let Some(offset) = next {
        if !seen.insert(offset) {
            log::warn!("Cross-reference /Prev chain loops back to offset {}", offset);
            break;
        }
        if depth > options.max_prev_chain {
            return Err(Error::InvalidXref(format!(
                "/Prev chain exceeds {} sections",
                options.max_prev_chain
            )));
        }

        let section = parse_section(data, offset, options)?;
        next = section
            .trailer()
            .and_then(|t| t.get("Prev"))
            .and_then(Object::as_integer)
            .filter(|&prev| prev >= 0)
            .map(|prev| prev as usize);
        log::debug!(
            "Cross-reference section at {}: {} entries, prev {:?}",
            offset,
            section.len(),
            next
        );

        table.merge_from(section);
        depth += 1;
    }

    Ok(table)
}

/// One section: a classic table (plus its `/XRefStm`) or an xref stream.
fn parse_section(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidXref(format!("offset {} beyond end of file", offset)))?;
    let (body, _) = skip_ws(input).map_err(|_| Error::InvalidXref(format!("offset {}", offset)))?;

    if body.starts_with(b"xref") {
        let mut section = parse_classic_xref(body, options)?;
        let hybrid = section
            .trailer()
            .and_then(|t| t.get("XRefStm"))
            .and_then(Object::as_integer);
        if let Some(stream_offset) = hybrid {
            match parse_xref_stream(data, stream_offset as usize, options) {
                Ok(stream) => {
                    for (number, entry) in stream.entries {
                        let table_has_live = section.get(number).is_some_and(XRefEntry::in_use);
                        if !table_has_live {
                            section.add_entry(number, entry);
                        }
                    }
                },
                Err(e) => log::warn!("Ignoring unreadable /XRefStm at {}: {}", stream_offset, e),
            }
        }
        Ok(section)
    } else {
        parse_xref_stream(data, offset, options)
    }
}

/// Object numbers `start..start + count`, if the whole range fits in `u32`.
fn subsection_range(start: i64, count: i64) -> Option<std::ops::Range<u32>> {
    if count < 0 || count > MAX_SUBSECTION_ENTRIES {
        return None;
    }
    let first = u32::try_from(start).ok()?;
    let end = start.checked_add(count).and_then(|end| u32::try_from(end).ok())?;
    Some(first..end)
}

fn next_integer(input: &[u8]) -> Option<(&[u8], i64)> {
    match token(input) {
        Ok((rest, Token::Integer(n))) => Some((rest, n)),
        _ => None,
    }
}

/// Parse a classic table starting at the `xref` keyword.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000017 00000 n
/// 0000000081 00000 n
/// trailer
/// << /Size 3 /Root 1 0 R >>
/// ```
fn parse_classic_xref(input: &[u8], options: &ParserOptions) -> Result<CrossRefTable> {
    let malformed = |what: &str| Error::InvalidXref(format!("classic table: {}", what));
    let mut rest = &input[b"xref".len()..];
    let mut table = CrossRefTable::new();

    loop {
        match token(rest) {
            Ok((after, Token::Keyword(b"trailer"))) => {
                rest = after;
                break;
            },
            Ok((_, Token::Integer(_))) => {},
            _ => return Err(malformed("expected subsection header or trailer")),
        }

        let (after, start) = next_integer(rest).ok_or_else(|| malformed("subsection start"))?;
        let (after, count) = next_integer(after).ok_or_else(|| malformed("subsection count"))?;
        let numbers =
            subsection_range(start, count).ok_or_else(|| malformed(&format!("subsection {} {}", start, count)))?;
        rest = after;

        for number in numbers {
            let (after, offset) = next_integer(rest).ok_or_else(|| malformed("entry offset"))?;
            let (after, generation) = next_integer(after).ok_or_else(|| malformed("entry generation"))?;
            let (after, kind) = match token(after) {
                Ok((after, Token::Keyword(kind))) => (after, kind),
                _ => return Err(malformed("entry type")),
            };
            rest = after;

            let generation = generation.clamp(0, u16::MAX as i64) as u16;
            let entry = match kind {
                b"n" if offset >= 0 => XRefEntry::uncompressed(offset as u64, generation),
                b"f" => XRefEntry::free(offset.max(0) as u64, generation),
                other if !options.strict => {
                    log::warn!(
                        "Invalid xref entry type {:?} for object {}, treating as free",
                        String::from_utf8_lossy(other),
                        number
                    );
                    XRefEntry::free(0, generation)
                },
                _ => return Err(malformed(&format!("entry type for object {}", number))),
            };
            table.add_entry(number, entry);
        }
    }

    let trailer = match parse_object_nested(rest, 0, options.max_nesting) {
        Ok((_, Object::Dictionary(dict))) => dict,
        _ => return Err(malformed("trailer is not a dictionary")),
    };
    table.set_trailer(trailer);
    Ok(table)
}

/// Parse a cross-reference stream (`/Type /XRef`) stored at `offset`.
fn parse_xref_stream(data: &[u8], offset: usize, options: &ParserOptions) -> Result<CrossRefTable> {
    let input = data
        .get(offset..)
        .ok_or_else(|| Error::InvalidXref(format!("offset {} beyond end of file", offset)))?;
    let (_, indirect) = parse_indirect_object_nested(input, options.max_nesting)
        .map_err(|_| Error::InvalidXref(format!("no object at offset {}", offset)))?;

    let dict = match &indirect.object {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidXref(format!(
                "object {} is a {}, not an xref stream",
                indirect.reference,
                other.type_name()
            )))
        },
    };
    if let Some(kind) = dict.get("Type").and_then(Object::as_name) {
        if kind != "XRef" {
            return Err(Error::InvalidXref(format!("expected /Type /XRef, got /{}", kind)));
        }
    }

    let malformed = |what: &str| Error::InvalidXref(format!("xref stream {}: {}", indirect.reference, what));

    let widths: Vec<usize> = dict
        .get("W")
        .and_then(Object::as_array)
        .ok_or_else(|| malformed("missing /W"))?
        .iter()
        .map(|w| w.as_integer().filter(|w| (0..=8).contains(w)).map(|w| w as usize))
        .collect::<Option<_>>()
        .ok_or_else(|| malformed("invalid /W"))?;
    if widths.len() != 3 {
        return Err(malformed("/W must have three entries"));
    }
    let entry_size: usize = widths.iter().sum();
    if entry_size == 0 {
        return Err(malformed("/W entries are all zero"));
    }

    let size = dict
        .get("Size")
        .and_then(Object::as_integer)
        .ok_or_else(|| malformed("missing /Size"))?;
    let ranges: Vec<(i64, i64)> = match dict.get("Index").and_then(Object::as_array) {
        Some(index) => index
            .chunks_exact(2)
            .map(|pair| Some((pair[0].as_integer()?, pair[1].as_integer()?)))
            .collect::<Option<_>>()
            .ok_or_else(|| malformed("invalid /Index"))?,
        None => vec![(0, size)],
    };

    let body = indirect.object.decode_stream_data()?;
    let mut records = body.chunks_exact(entry_size);
    let mut table = CrossRefTable::new();

    for (start, count) in ranges {
        let numbers =
            subsection_range(start, count).ok_or_else(|| malformed(&format!("/Index range {} {}", start, count)))?;
        for number in numbers {
            let record = records.next().ok_or_else(|| malformed("truncated data"))?;
            let (type_field, rest) = record.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);

            let field = |bytes: &[u8], default: u64| {
                if bytes.is_empty() {
                    default
                } else {
                    BigEndian::read_uint(bytes, bytes.len())
                }
            };
            let second = field(second, 0);
            let third = field(third, 0);

            let entry = match field(type_field, 1) {
                0 => XRefEntry::free(second, third as u16),
                1 => XRefEntry::uncompressed(second, third as u16),
                2 => XRefEntry::compressed(second, third as u16),
                other => {
                    log::debug!("Ignoring xref stream entry of type {} for {}", other, number);
                    continue;
                },
            };
            table.add_entry(number, entry);
        }
    }

    table.set_trailer(dict.clone());
    Ok(table)
}
