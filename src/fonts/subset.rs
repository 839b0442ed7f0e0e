//! TrueType subsetting.
//!
//! Glyph ids are preserved: glyphs that are not kept get an empty outline, and
//! `loca` is rewritten in the long format. Composite glyphs pull in their
//! components, and glyph 0 (`.notdef`) is always kept. Subset fonts carry a
//! six-letter tag prefix (`ABCDEF+FontName`).

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

/// Tables copied into the subset program.
const KEPT_TABLES: [&[u8; 4]; 11] = [
    b"OS/2", b"cmap", b"cvt ", b"fpgm", b"glyf", b"head", b"hhea", b"hmtx", b"loca", b"maxp", b"prep",
];

// Composite glyph component flags
const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
const WE_HAVE_A_SCALE: u16 = 0x0008;
const MORE_COMPONENTS: u16 = 0x0020;
const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;

/// Bound on composite nesting.
const MAX_COMPONENT_DEPTH: usize = 16;

struct TableRecord<'a> {
    tag: [u8; 4],
    data: &'a [u8],
}

fn font_error(msg: &str) -> Error {
    Error::Font(format!("malformed TrueType data: {}", msg))
}

fn read_tables(font: &[u8]) -> Result<BTreeMap<[u8; 4], TableRecord<'_>>> {
    if font.len() < 12 {
        return Err(font_error("offset table truncated"));
    }
    let num_tables = BigEndian::read_u16(&font[4..6]) as usize;
    let mut tables = BTreeMap::new();
    for i in 0..num_tables {
        let record = font
            .get(12 + i * 16..12 + (i + 1) * 16)
            .ok_or_else(|| font_error("table directory truncated"))?;
        let mut tag = [0u8; 4];
        tag.copy_from_slice(&record[0..4]);
        let offset = BigEndian::read_u32(&record[8..12]) as usize;
        let length = BigEndian::read_u32(&record[12..16]) as usize;
        let data = font
            .get(offset..offset.saturating_add(length))
            .ok_or_else(|| font_error("table outside file"))?;
        tables.insert(tag, TableRecord { tag, data });
    }
    Ok(tables)
}

fn table<'a>(tables: &BTreeMap<[u8; 4], TableRecord<'a>>, tag: &[u8; 4]) -> Result<&'a [u8]> {
    tables
        .get(tag)
        .map(|record| record.data)
        .ok_or_else(|| Error::Font(format!("required table '{}' missing", String::from_utf8_lossy(tag))))
}

/// Glyph offsets from `loca`, `num_glyphs + 1` entries.
fn read_loca(loca: &[u8], num_glyphs: usize, long_format: bool) -> Result<Vec<usize>> {
    let entry = if long_format { 4 } else { 2 };
    if loca.len() < (num_glyphs + 1) * entry {
        return Err(font_error("loca too short"));
    }
    Ok((0..=num_glyphs)
        .map(|i| {
            if long_format {
                BigEndian::read_u32(&loca[i * 4..]) as usize
            } else {
                BigEndian::read_u16(&loca[i * 2..]) as usize * 2
            }
        })
        .collect())
}

/// Component glyph ids of a composite glyph; empty for simple glyphs.
fn components(glyph: &[u8]) -> Vec<u16> {
    let mut out = Vec::new();
    if glyph.len() < 10 || BigEndian::read_i16(&glyph[0..2]) >= 0 {
        return out;
    }
    let mut pos = 10;
    while pos + 4 <= glyph.len() {
        let flags = BigEndian::read_u16(&glyph[pos..]);
        out.push(BigEndian::read_u16(&glyph[pos + 2..]));
        pos += 4;
        pos += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
        if flags & WE_HAVE_A_SCALE != 0 {
            pos += 2;
        } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
            pos += 4;
        } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
            pos += 8;
        }
        if flags & MORE_COMPONENTS == 0 {
            break;
        }
    }
    out
}

/// `glyphs` plus `.notdef` and every component reachable through composites.
pub fn glyph_closure(glyf: &[u8], offsets: &[usize], glyphs: &BTreeSet<u16>) -> BTreeSet<u16> {
    let num_glyphs = offsets.len().saturating_sub(1);
    let mut kept = BTreeSet::new();
    let mut pending: Vec<(u16, usize)> = glyphs.iter().map(|g| (*g, 0)).collect();
    pending.push((0, 0));
    while let Some((glyph, depth)) = pending.pop() {
        if glyph as usize >= num_glyphs || !kept.insert(glyph) {
            continue;
        }
        if depth >= MAX_COMPONENT_DEPTH {
            continue;
        }
        let (start, end) = (offsets[glyph as usize], offsets[glyph as usize + 1]);
        if let Some(data) = glyf.get(start..end) {
            pending.extend(components(data).into_iter().map(|c| (c, depth + 1)));
        }
    }
    kept
}

fn checksum(data: &[u8]) -> u32 {
    let mut sum = 0u32;
    for chunk in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        sum = sum.wrapping_add(u32::from_be_bytes(word));
    }
    sum
}

/// Cut a TrueType program down to `glyphs`.
pub fn subset_truetype(font: &[u8], glyphs: &BTreeSet<u16>) -> Result<Vec<u8>> {
    let tables = read_tables(font)?;
    let head = table(&tables, b"head")?;
    let maxp = table(&tables, b"maxp")?;
    let glyf = table(&tables, b"glyf")?;
    if head.len() < 54 || maxp.len() < 6 {
        return Err(font_error("head or maxp truncated"));
    }
    let long_format = BigEndian::read_i16(&head[50..52]) != 0;
    let num_glyphs = BigEndian::read_u16(&maxp[4..6]) as usize;
    let offsets = read_loca(table(&tables, b"loca")?, num_glyphs, long_format)?;

    let kept = glyph_closure(glyf, &offsets, glyphs);

    let mut new_glyf = Vec::new();
    let mut new_loca = Vec::with_capacity((num_glyphs + 1) * 4);
    for glyph in 0..num_glyphs {
        new_loca.write_u32::<BigEndian>(new_glyf.len() as u32)?;
        if kept.contains(&(glyph as u16)) {
            if let Some(data) = glyf.get(offsets[glyph]..offsets[glyph + 1]) {
                new_glyf.extend_from_slice(data);
                while new_glyf.len() % 4 != 0 {
                    new_glyf.push(0);
                }
            }
        }
    }
    new_loca.write_u32::<BigEndian>(new_glyf.len() as u32)?;

    let mut new_head = head.to_vec();
    new_head[8..12].copy_from_slice(&[0, 0, 0, 0]); // checkSumAdjustment
    new_head[50..52].copy_from_slice(&1i16.to_be_bytes());

    let mut out_tables: Vec<([u8; 4], Vec<u8>)> = Vec::new();
    for record in tables.values() {
        if !KEPT_TABLES.contains(&&record.tag) {
            continue;
        }
        let data = match &record.tag {
            b"glyf" => std::mem::take(&mut new_glyf),
            b"loca" => std::mem::take(&mut new_loca),
            b"head" => std::mem::take(&mut new_head),
            _ => record.data.to_vec(),
        };
        out_tables.push((record.tag, data));
    }

    let output = write_font(&out_tables)?;
    log::debug!(
        "Subset font: kept {} of {} glyphs, {} -> {} bytes",
        kept.len(),
        num_glyphs,
        font.len(),
        output.len()
    );
    Ok(output)
}

/// Assemble an sfnt from tables sorted by tag.
fn write_font(tables: &[([u8; 4], Vec<u8>)]) -> Result<Vec<u8>> {
    let num_tables = tables.len() as u16;
    let entry_selector = 15 - num_tables.max(1).leading_zeros() as u16;
    let search_range = (1u16 << entry_selector) * 16;
    let range_shift = num_tables * 16 - search_range;

    let mut out = Vec::new();
    out.write_u32::<BigEndian>(0x0001_0000)?;
    out.write_u16::<BigEndian>(num_tables)?;
    out.write_u16::<BigEndian>(search_range)?;
    out.write_u16::<BigEndian>(entry_selector)?;
    out.write_u16::<BigEndian>(range_shift)?;

    let mut offset = 12 + 16 * tables.len();
    let mut head_offset = None;
    for (tag, data) in tables {
        if tag == b"head" {
            head_offset = Some(offset);
        }
        out.extend_from_slice(tag);
        out.write_u32::<BigEndian>(checksum(data))?;
        out.write_u32::<BigEndian>(offset as u32)?;
        out.write_u32::<BigEndian>(data.len() as u32)?;
        offset += (data.len() + 3) & !3;
    }
    for (_, data) in tables {
        out.extend_from_slice(data);
        while out.len() % 4 != 0 {
            out.push(0);
        }
    }

    if let Some(head_offset) = head_offset {
        let adjustment = 0xB1B0_AFBAu32.wrapping_sub(checksum(&out));
        out[head_offset + 8..head_offset + 12].copy_from_slice(&adjustment.to_be_bytes());
    }
    Ok(out)
}

/// Six uppercase letters derived from the kept glyph set.
pub fn subset_tag(glyphs: &BTreeSet<u16>) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for glyph in glyphs {
        glyph.hash(&mut hasher);
    }
    let mut h = hasher.finish();
    let mut tag = String::with_capacity(6);
    for _ in 0..6 {
        tag.push(((h % 26) as u8 + b'A') as char);
        h /= 26;
    }
    tag
}

/// A ToUnicode CMap for `(code, char)` pairs; codes are one or two bytes wide.
pub fn to_unicode_cmap(mappings: &[(u16, char)], two_byte: bool) -> Vec<u8> {
    let mut cmap = String::new();
    cmap.push_str("/CIDInit /ProcSet findresource begin\n");
    cmap.push_str("12 dict begin\n");
    cmap.push_str("begincmap\n");
    cmap.push_str("/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
    cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
    cmap.push_str("/CMapType 2 def\n");
    cmap.push_str("1 begincodespacerange\n");
    cmap.push_str(if two_byte { "<0000> <FFFF>\n" } else { "<00> <FF>\n" });
    cmap.push_str("endcodespacerange\n");

    // At most 100 entries per bfchar block
    for chunk in mappings.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for &(code, ch) in chunk {
            let code = if two_byte {
                format!("{:04X}", code)
            } else {
                format!("{:02X}", code)
            };
            let mut units = [0u16; 2];
            let target: String = ch.encode_utf16(&mut units).iter().map(|u| format!("{:04X}", u)).collect();
            cmap.push_str(&format!("<{}> <{}>\n", code, target));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\n");
    cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
    cmap.push_str("end\n");
    cmap.push_str("end\n");
    cmap.into_bytes()
}
