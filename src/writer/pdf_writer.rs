//! Document writer.
//!
//! A full save writes header, body, one classic cross-reference table and a
//! trailer. An incremental save appends the modified objects, a new xref
//! section and a trailer pointing back at the previous one with `/Prev`.
//! Objects keep their identities in both modes.

use super::object_serializer::ObjectSerializer;
use crate::context::PdfContext;
use crate::decoders::{encode_stream, FilterSpec};
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

/// How a document is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Rewrite the whole file from the reachable object graph
    #[default]
    Full,
    /// Append the changes to the original bytes
    Incremental,
}

/// Options for saving a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Full rewrite or incremental update
    pub mode: SaveMode,
    /// Flate-compress streams created or replaced since load that carry no filter
    pub compress_new_streams: bool,
    /// Regenerate dirty form field appearances with the form's default font first
    pub update_field_appearances: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            mode: SaveMode::Full,
            compress_new_streams: false,
            update_field_appearances: true,
        }
    }
}

impl SaveOptions {
    /// Options for a full rewrite.
    pub fn full() -> Self {
        Self::default()
    }

    /// Options for an incremental update.
    pub fn incremental() -> Self {
        Self {
            mode: SaveMode::Incremental,
            ..Default::default()
        }
    }

    /// Enable or disable compression of new streams.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress_new_streams = compress;
        self
    }

    /// Enable or disable appearance regeneration before writing.
    pub fn with_field_appearances(mut self, update: bool) -> Self {
        self.update_field_appearances = update;
        self
    }
}

/// One line of the cross-reference table.
#[derive(Debug, Clone, Copy)]
enum XrefLine {
    InUse { offset: usize, gen: u16 },
    Free { next: u32, gen: u16 },
}

/// Serializes the objects of a context.
#[derive(Debug)]
pub struct PdfWriter<'a> {
    context: &'a PdfContext,
    options: SaveOptions,
    serializer: ObjectSerializer,
}

impl<'a> PdfWriter<'a> {
    /// Create a writer over `context`.
    pub fn new(context: &'a PdfContext, options: SaveOptions) -> Self {
        Self {
            context,
            options,
            serializer: ObjectSerializer::new(),
        }
    }

    /// Write a complete file containing every object reachable from the
    /// trailer's `/Root` and `/Info` plus `extra_roots`.
    pub fn write_full(&self, trailer: &Dict, extra_roots: &[ObjectRef], version: &str) -> Result<Vec<u8>> {
        let root = self.catalog_ref(trailer)?;

        let mut roots = vec![root];
        roots.extend(trailer.get("Info").and_then(Object::as_reference));
        roots.extend_from_slice(extra_roots);
        let mut reachable = BTreeSet::new();
        self.context.reachable(&roots, &mut reachable);
        log::debug!("Full save: {} reachable of {} objects", reachable.len(), self.context.len());

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", version)?;
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(reachable.len());
        for r in &reachable {
            if let Some(object) = self.context.lookup(*r) {
                offsets.push((*r, output.len()));
                self.write_indirect(&mut output, *r, object)?;
            }
        }

        let mut free: BTreeMap<u32, u16> = self
            .context
            .iter()
            .filter(|(r, _)| !reachable.contains(r))
            .map(|(r, _)| (r.id, 0))
            .collect();
        free.extend(self.context.freed());
        let entries = full_xref_entries(&offsets, &free);
        let size = entries.last().map_or(0, |(id, _)| *id as i64 + 1);

        let xref_start = output.len();
        write_xref_section(&mut output, &entries)?;

        let mut new_trailer = Dict::new();
        new_trailer.insert("Size".to_string(), Object::Integer(size));
        new_trailer.insert("Root".to_string(), Object::Reference(root));
        copy_trailer_keys(trailer, &mut new_trailer);
        self.finish(&mut output, &new_trailer, xref_start)?;
        Ok(output)
    }

    /// Append the modified and removed objects to `original`.
    ///
    /// `prev_startxref` is the offset of the section the original file ends with.
    pub fn write_incremental(&self, original: &[u8], prev_startxref: usize, trailer: &Dict) -> Result<Vec<u8>> {
        let root = self.catalog_ref(trailer)?;

        let mut output = Vec::with_capacity(original.len() + 4096);
        output.extend_from_slice(original);
        output.push(b'\n');

        let mut entries: Vec<(u32, XrefLine)> = Vec::new();
        for r in self.context.modified() {
            if let Some(object) = self.context.lookup(r) {
                entries.push((
                    r.id,
                    XrefLine::InUse {
                        offset: output.len(),
                        gen: r.gen,
                    },
                ));
                self.write_indirect(&mut output, r, object)?;
            }
        }
        for (id, gen) in self.context.freed() {
            entries.push((id, XrefLine::Free { next: 0, gen }));
        }
        entries.sort_by_key(|(id, _)| *id);
        log::debug!("Incremental save: {} changed entries", entries.len());

        let xref_start = output.len();
        write_xref_section(&mut output, &entries)?;

        let previous_size = trailer.get("Size").and_then(Object::as_integer).unwrap_or(0);
        let size = previous_size.max(self.context.largest_id() as i64 + 1);
        let mut new_trailer = Dict::new();
        new_trailer.insert("Size".to_string(), Object::Integer(size));
        new_trailer.insert("Root".to_string(), Object::Reference(root));
        new_trailer.insert("Prev".to_string(), Object::Integer(prev_startxref as i64));
        copy_trailer_keys(trailer, &mut new_trailer);
        self.finish(&mut output, &new_trailer, xref_start)?;
        Ok(output)
    }

    fn catalog_ref(&self, trailer: &Dict) -> Result<ObjectRef> {
        let root = trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or(Error::ObjectNotFound(0, 0))?;
        match self.context.lookup(root) {
            Some(Object::Dictionary(_)) => Ok(root),
            _ => Err(Error::ObjectNotFound(root.id, root.gen)),
        }
    }

    fn write_indirect(&self, output: &mut Vec<u8>, r: ObjectRef, object: &Object) -> Result<()> {
        let object = self.prepare(r, object)?;
        output.extend_from_slice(&self.serializer.serialize_indirect(r, &object));
        Ok(())
    }

    /// Compress unfiltered streams changed since load, when enabled.
    fn prepare<'o>(&self, r: ObjectRef, object: &'o Object) -> Result<Cow<'o, Object>> {
        match object {
            Object::Stream { dict, data }
                if self.options.compress_new_streams
                    && self.context.is_modified(r.id)
                    && !dict.contains_key("Filter") =>
            {
                let filters = [FilterSpec::new("FlateDecode")];
                let encoded = encode_stream(data, &filters)?;
                let mut dict = dict.clone();
                dict.insert("Filter".to_string(), Object::name("FlateDecode"));
                dict.remove("DecodeParms");
                Ok(Cow::Owned(Object::stream(dict, encoded)))
            },
            _ => Ok(Cow::Borrowed(object)),
        }
    }

    fn finish(&self, output: &mut Vec<u8>, trailer: &Dict, xref_start: usize) -> Result<()> {
        writeln!(output, "trailer")?;
        self.serializer
            .write_object(output, &Object::Dictionary(trailer.clone()));
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        writeln!(output, "%%EOF")?;
        Ok(())
    }
}

/// Entries for the written objects plus the free list, sorted by identity.
///
/// `free` maps the identities to list as free to the generation their next
/// use carries. Entry 0 heads the list; identities in neither set are left
/// out of the table.
fn full_xref_entries(offsets: &[(ObjectRef, usize)], free: &BTreeMap<u32, u16>) -> Vec<(u32, XrefLine)> {
    let mut entries: BTreeMap<u32, XrefLine> = offsets
        .iter()
        .map(|(r, offset)| {
            (
                r.id,
                XrefLine::InUse {
                    offset: *offset,
                    gen: r.gen,
                },
            )
        })
        .collect();

    let free_ids: Vec<u32> = free
        .keys()
        .copied()
        .filter(|id| *id != 0 && !entries.contains_key(id))
        .collect();
    entries.insert(
        0,
        XrefLine::Free {
            next: free_ids.first().copied().unwrap_or(0),
            gen: 65535,
        },
    );
    for (i, id) in free_ids.iter().enumerate() {
        entries.insert(
            *id,
            XrefLine::Free {
                next: free_ids.get(i + 1).copied().unwrap_or(0),
                gen: free.get(id).copied().unwrap_or(0),
            },
        );
    }

    entries.into_iter().collect()
}

/// Write `xref` followed by one subsection per run of consecutive identities.
///
/// `entries` must be sorted by identity.
fn write_xref_section(output: &mut Vec<u8>, entries: &[(u32, XrefLine)]) -> Result<()> {
    writeln!(output, "xref")?;
    let mut rest = entries;
    while let Some((first, _)) = rest.first() {
        let run = rest
            .windows(2)
            .take_while(|pair| pair[0].0.checked_add(1) == Some(pair[1].0))
            .count()
            + 1;
        writeln!(output, "{} {}", first, run)?;
        for (_, line) in &rest[..run] {
            write_xref_line(output, line)?;
        }
        rest = &rest[run..];
    }
    Ok(())
}

fn write_xref_line(output: &mut Vec<u8>, line: &XrefLine) -> Result<()> {
    match line {
        XrefLine::InUse { offset, gen } => writeln!(output, "{:010} {:05} n ", offset, gen)?,
        XrefLine::Free { next, gen } => writeln!(output, "{:010} {:05} f ", next, gen)?,
    }
    Ok(())
}

/// Carry `/Info` and `/ID` over from the document trailer.
fn copy_trailer_keys(from: &Dict, to: &mut Dict) {
    for key in ["Info", "ID"] {
        if let Some(value) = from.get(key) {
            to.insert(key.to_string(), value.clone());
        }
    }
}
