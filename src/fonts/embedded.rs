//! Embedded TrueType fonts.
//!
//! Text shown with an embedded font is recorded as it is encoded. When the
//! document is saved the font objects are (re)built from that usage: a subset
//! program, widths for exactly the codes in use, and a ToUnicode CMap.

use crate::context::PdfContext;
use crate::decoders::{encode_stream, FilterSpec};
use crate::error::{Error, Result};
use crate::fonts::encoding::{is_winansi_text, unicode_to_winansi};
use crate::fonts::program::FontProgram;
use crate::fonts::subset::{subset_tag, to_unicode_cmap};
use crate::object::{Dict, Object, ObjectRef};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// How text is encoded with an embedded font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingChoice {
    /// WinAnsi when the sample text is WinAnsi-only, Identity-H otherwise
    Auto(String),
    /// Single-byte simple TrueType font
    WinAnsi,
    /// Two-byte Type0 font with glyph ids as codes
    Identity,
}

/// Options for [`PdfDocument::embed_font`](crate::document::PdfDocument::embed_font).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Text encoding
    pub encoding: EncodingChoice,
    /// Embed only the glyphs that are used
    pub subset: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            encoding: EncodingChoice::Identity,
            subset: true,
        }
    }
}

/// Encoding resolved at embed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontEncoding {
    /// `/WinAnsiEncoding`, one byte per character
    WinAnsi,
    /// `/Identity-H`, two-byte glyph ids
    IdentityH,
}

impl EncodingChoice {
    fn resolve(&self) -> FontEncoding {
        match self {
            EncodingChoice::WinAnsi => FontEncoding::WinAnsi,
            EncodingChoice::Identity => FontEncoding::IdentityH,
            EncodingChoice::Auto(sample) if is_winansi_text(sample) => FontEncoding::WinAnsi,
            EncodingChoice::Auto(_) => FontEncoding::IdentityH,
        }
    }
}

/// Object identities of an embedded font, reserved at embed time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FontObjects {
    pub font: ObjectRef,
    pub descendant: Option<ObjectRef>,
    pub descriptor: ObjectRef,
    pub file: ObjectRef,
    pub to_unicode: ObjectRef,
}

/// A font program embedded in one document.
#[derive(Debug)]
pub struct EmbeddedFont {
    program: Box<dyn FontProgram>,
    encoding: FontEncoding,
    subset: bool,
    objects: FontObjects,
    /// Characters shown so far and the glyph each maps to
    used: RefCell<BTreeMap<char, u16>>,
}

impl EmbeddedFont {
    pub(crate) fn new(program: Box<dyn FontProgram>, options: &EmbedOptions, ctx: &mut PdfContext) -> Self {
        let encoding = options.encoding.resolve();
        let objects = FontObjects {
            font: ctx.reserve(),
            descendant: (encoding == FontEncoding::IdentityH).then(|| ctx.reserve()),
            descriptor: ctx.reserve(),
            file: ctx.reserve(),
            to_unicode: ctx.reserve(),
        };
        Self {
            program,
            encoding,
            subset: options.subset,
            objects,
            used: RefCell::new(BTreeMap::new()),
        }
    }

    /// PostScript name of the program.
    pub fn name(&self) -> &str {
        self.program.postscript_name()
    }

    /// Resolved encoding.
    pub fn encoding(&self) -> FontEncoding {
        self.encoding
    }

    /// The font dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.objects.font
    }

    /// The font program.
    pub fn program(&self) -> &dyn FontProgram {
        self.program.as_ref()
    }

    /// Encode `text` and record its glyphs as used.
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(text.len() * 2);
        let mut shown = Vec::with_capacity(text.len());
        for ch in text.chars() {
            let glyph = self.program.glyph_id(ch).filter(|g| *g != 0).ok_or_else(|| self.encoding_error(ch))?;
            match self.encoding {
                FontEncoding::WinAnsi => out.push(unicode_to_winansi(ch).ok_or_else(|| self.encoding_error(ch))?),
                FontEncoding::IdentityH => out.extend_from_slice(&glyph.to_be_bytes()),
            }
            shown.push((ch, glyph));
        }
        self.used.borrow_mut().extend(shown);
        Ok(out)
    }

    fn encoding_error(&self, ch: char) -> Error {
        Error::Encoding {
            font: self.name().to_string(),
            ch,
        }
    }

    /// Advance of `ch` in 1/1000 em; characters without a glyph use `.notdef`.
    pub fn char_width(&self, ch: char) -> f32 {
        let glyph = self.program.glyph_id(ch).unwrap_or(0);
        self.glyph_width(glyph)
    }

    fn glyph_width(&self, glyph: u16) -> f32 {
        let units_per_em = self.program.metrics().units_per_em.max(1) as f32;
        self.program.advance_width(glyph) as f32 * 1000.0 / units_per_em
    }

    /// Glyphs recorded so far.
    pub fn used_glyphs(&self) -> BTreeSet<u16> {
        self.used.borrow().values().copied().collect()
    }

    /// Write every object of this font into `ctx` from the usage recorded so far.
    pub(crate) fn finalize(&self, ctx: &mut PdfContext) -> Result<()> {
        let used = self.used.borrow().clone();
        let glyphs: BTreeSet<u16> = used.values().copied().collect();

        let program = if self.subset {
            self.program.subset(&glyphs)?
        } else {
            self.program.data().to_vec()
        };
        let base_font = if self.subset {
            format!("{}+{}", subset_tag(&glyphs), self.name())
        } else {
            self.name().to_string()
        };

        let mut file_dict = Dict::new();
        file_dict.insert("Length1".to_string(), Object::Integer(program.len() as i64));
        file_dict.insert("Filter".to_string(), Object::name("FlateDecode"));
        let compressed = encode_stream(&program, &[FilterSpec::new("FlateDecode")])?;
        ctx.assign(self.objects.file, Object::stream(file_dict, compressed))?;

        ctx.assign(self.objects.descriptor, self.descriptor(&base_font))?;

        let mappings: Vec<(u16, char)> = match self.encoding {
            FontEncoding::WinAnsi => {
                let mut codes: Vec<(u16, char)> = used
                    .keys()
                    .filter_map(|ch| unicode_to_winansi(*ch).map(|code| (code as u16, *ch)))
                    .collect();
                codes.sort();
                codes
            },
            FontEncoding::IdentityH => {
                // one ToUnicode entry per glyph; the first character wins
                let mut by_glyph: BTreeMap<u16, char> = BTreeMap::new();
                for (ch, glyph) in &used {
                    by_glyph.entry(*glyph).or_insert(*ch);
                }
                by_glyph.into_iter().collect()
            },
        };
        let two_byte = self.encoding == FontEncoding::IdentityH;
        let cmap = to_unicode_cmap(&mappings, two_byte);
        ctx.assign(self.objects.to_unicode, Object::stream(Dict::new(), cmap))?;

        match (self.encoding, self.objects.descendant) {
            (FontEncoding::IdentityH, Some(descendant)) => {
                ctx.assign(descendant, self.cid_font(&base_font, &glyphs))?;
                let mut font = Dict::new();
                font.insert("Type".to_string(), Object::name("Font"));
                font.insert("Subtype".to_string(), Object::name("Type0"));
                font.insert("BaseFont".to_string(), Object::name(&base_font));
                font.insert("Encoding".to_string(), Object::name("Identity-H"));
                font.insert("DescendantFonts".to_string(), Object::Array(vec![Object::Reference(descendant)]));
                font.insert("ToUnicode".to_string(), Object::Reference(self.objects.to_unicode));
                ctx.assign(self.objects.font, Object::Dictionary(font))?;
            },
            _ => {
                let font = self.simple_font(&base_font, &mappings);
                ctx.assign(self.objects.font, font)?;
            },
        }

        log::debug!("Finalized font {} with {} glyphs", base_font, glyphs.len());
        Ok(())
    }

    fn descriptor(&self, base_font: &str) -> Object {
        let metrics = self.program.metrics();
        let scale = |v: i16| (v as f64 * 1000.0 / metrics.units_per_em.max(1) as f64).round();
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("FontDescriptor"));
        dict.insert("FontName".to_string(), Object::name(base_font));
        dict.insert("Flags".to_string(), Object::Integer(metrics.flags as i64));
        dict.insert(
            "FontBBox".to_string(),
            Object::numbers(&metrics.bbox.map(scale)),
        );
        dict.insert("ItalicAngle".to_string(), Object::number(metrics.italic_angle as f64));
        dict.insert("Ascent".to_string(), Object::number(scale(metrics.ascent)));
        dict.insert("Descent".to_string(), Object::number(scale(metrics.descent)));
        dict.insert("CapHeight".to_string(), Object::number(scale(metrics.cap_height)));
        dict.insert("StemV".to_string(), Object::Integer(80));
        dict.insert("FontFile2".to_string(), Object::Reference(self.objects.file));
        Object::Dictionary(dict)
    }

    fn simple_font(&self, base_font: &str, codes: &[(u16, char)]) -> Object {
        let first = codes.first().map(|(code, _)| *code).unwrap_or(32);
        let last = codes.last().map(|(code, _)| *code).unwrap_or(32);
        let mut widths = vec![0.0; (last - first + 1) as usize];
        for (code, ch) in codes {
            widths[(code - first) as usize] = self.char_width(*ch).round() as f64;
        }

        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("Font"));
        dict.insert("Subtype".to_string(), Object::name("TrueType"));
        dict.insert("BaseFont".to_string(), Object::name(base_font));
        dict.insert("FirstChar".to_string(), Object::Integer(first as i64));
        dict.insert("LastChar".to_string(), Object::Integer(last as i64));
        dict.insert("Widths".to_string(), Object::numbers(&widths));
        dict.insert("Encoding".to_string(), Object::name("WinAnsiEncoding"));
        dict.insert("FontDescriptor".to_string(), Object::Reference(self.objects.descriptor));
        dict.insert("ToUnicode".to_string(), Object::Reference(self.objects.to_unicode));
        Object::Dictionary(dict)
    }

    fn cid_font(&self, base_font: &str, glyphs: &BTreeSet<u16>) -> Object {
        let mut system_info = Dict::new();
        system_info.insert("Registry".to_string(), Object::String(b"Adobe".to_vec()));
        system_info.insert("Ordering".to_string(), Object::String(b"Identity".to_vec()));
        system_info.insert("Supplement".to_string(), Object::Integer(0));

        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("Font"));
        dict.insert("Subtype".to_string(), Object::name("CIDFontType2"));
        dict.insert("BaseFont".to_string(), Object::name(base_font));
        dict.insert("CIDSystemInfo".to_string(), Object::Dictionary(system_info));
        dict.insert("FontDescriptor".to_string(), Object::Reference(self.objects.descriptor));
        dict.insert("DW".to_string(), Object::Integer(self.glyph_width(0).round() as i64));
        dict.insert("W".to_string(), self.cid_widths(glyphs));
        dict.insert("CIDToGIDMap".to_string(), Object::name("Identity"));
        Object::Dictionary(dict)
    }

    /// `/W` array grouping consecutive glyph ids: `[start [w1 w2 ...] ...]`.
    fn cid_widths(&self, glyphs: &BTreeSet<u16>) -> Object {
        let mut out = Vec::new();
        let mut run: Vec<Object> = Vec::new();
        let mut run_start = None;
        let mut previous: Option<u16> = None;
        for &glyph in glyphs {
            if previous.map(|p| p + 1 != glyph).unwrap_or(true) {
                if let Some(start) = run_start {
                    out.push(Object::Integer(start as i64));
                    out.push(Object::Array(std::mem::take(&mut run)));
                }
                run_start = Some(glyph);
            }
            run.push(Object::number(self.glyph_width(glyph).round() as f64));
            previous = Some(glyph);
        }
        if let Some(start) = run_start {
            out.push(Object::Integer(start as i64));
            out.push(Object::Array(run));
        }
        Object::Array(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::program::ProgramMetrics;

    /// A program with glyphs 1..=26 for 'A'..='Z', 27 for 'Ж' and 28 shared by
    /// the space and the no-break space.
    #[derive(Debug)]
    struct FakeProgram;

    impl FontProgram for FakeProgram {
        fn postscript_name(&self) -> &str {
            "FakeSans"
        }

        fn glyph_id(&self, ch: char) -> Option<u16> {
            match ch {
                'A'..='Z' => Some(ch as u16 - 'A' as u16 + 1),
                'Ж' => Some(27),
                ' ' | '\u{A0}' => Some(28),
                _ => None,
            }
        }

        fn advance_width(&self, glyph: u16) -> u16 {
            if glyph == 0 {
                500
            } else {
                1000 + glyph
            }
        }

        fn glyph_count(&self) -> u16 {
            29
        }

        fn metrics(&self) -> ProgramMetrics {
            ProgramMetrics {
                units_per_em: 2000,
                ascent: 1600,
                descent: -400,
                cap_height: 1400,
                bbox: [0, -400, 2000, 1600],
                italic_angle: 0.0,
                flags: 32,
            }
        }

        fn subset(&self, glyphs: &BTreeSet<u16>) -> Result<Vec<u8>> {
            Ok(glyphs.iter().map(|g| *g as u8).collect())
        }

        fn data(&self) -> &[u8] {
            b"full program"
        }
    }

    fn embed(encoding: EncodingChoice) -> (EmbeddedFont, PdfContext) {
        let mut ctx = PdfContext::new();
        let options = EmbedOptions {
            encoding,
            subset: true,
        };
        let font = EmbeddedFont::new(Box::new(FakeProgram), &options, &mut ctx);
        (font, ctx)
    }

    #[test]
    fn test_auto_encoding_choice() {
        assert_eq!(EncodingChoice::Auto("Hello".into()).resolve(), FontEncoding::WinAnsi);
        assert_eq!(EncodingChoice::Auto("Жук".into()).resolve(), FontEncoding::IdentityH);
    }

    #[test]
    fn test_identity_encoding_uses_glyph_ids() {
        let (font, _) = embed(EncodingChoice::Identity);
        assert_eq!(font.encode_text("AB").unwrap(), vec![0, 1, 0, 2]);
        assert_eq!(font.used_glyphs(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_missing_glyph_is_encoding_error() {
        let (font, _) = embed(EncodingChoice::Identity);
        let err = font.encode_text("A?").unwrap_err();
        assert!(matches!(err, Error::Encoding { ch: '?', .. }));
        assert!(font.used_glyphs().is_empty());
    }

    #[test]
    fn test_winansi_rejects_non_latin() {
        let (font, _) = embed(EncodingChoice::WinAnsi);
        assert_eq!(font.encode_text("AZ").unwrap(), b"AZ".to_vec());
        assert!(matches!(font.encode_text("Ж"), Err(Error::Encoding { ch: 'Ж', .. })));
    }

    #[test]
    fn test_widths_scaled_to_thousandths() {
        let (font, _) = embed(EncodingChoice::Identity);
        assert_eq!(font.char_width('A'), 500.5);
        assert_eq!(font.char_width('?'), 250.0);
    }

    #[test]
    fn test_finalize_identity_font() {
        let (font, mut ctx) = embed(EncodingChoice::Identity);
        font.encode_text("ABD").unwrap();
        font.finalize(&mut ctx).unwrap();

        let dict = ctx.lookup(font.reference()).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("Subtype"), Some(&Object::name("Type0")));
        let base = dict.get("BaseFont").and_then(Object::as_name).unwrap();
        assert!(base.ends_with("+FakeSans"));
        assert_eq!(base.find('+'), Some(6));

        let cid = ctx.lookup(font.objects.descendant.unwrap()).unwrap().as_dict().unwrap();
        let widths = cid.get("W").and_then(Object::as_array).unwrap();
        assert_eq!(widths.len(), 4);
        assert_eq!(widths[0], Object::Integer(1));
        assert_eq!(widths[2], Object::Integer(4));
    }

    #[test]
    fn test_finalize_simple_font_widths() {
        let (font, mut ctx) = embed(EncodingChoice::WinAnsi);
        font.encode_text("AC").unwrap();
        font.finalize(&mut ctx).unwrap();

        let dict = ctx.lookup(font.reference()).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("FirstChar"), Some(&Object::Integer(65)));
        assert_eq!(dict.get("LastChar"), Some(&Object::Integer(67)));
        let widths = dict.get("Widths").and_then(Object::as_array).unwrap();
        assert_eq!(widths.len(), 3);
        assert_eq!(widths[1], Object::Integer(0));

        let file = ctx.lookup(font.objects.file).unwrap();
        assert_eq!(file.decode_stream_data().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_codes_sharing_a_glyph_all_get_widths() {
        let (font, mut ctx) = embed(EncodingChoice::WinAnsi);
        assert_eq!(font.encode_text(" \u{A0}").unwrap(), vec![0x20, 0xA0]);
        assert_eq!(font.used_glyphs(), BTreeSet::from([28]));
        font.finalize(&mut ctx).unwrap();

        let dict = ctx.lookup(font.reference()).unwrap().as_dict().unwrap();
        assert_eq!(dict.get("FirstChar"), Some(&Object::Integer(0x20)));
        assert_eq!(dict.get("LastChar"), Some(&Object::Integer(0xA0)));
        let widths = dict.get("Widths").and_then(Object::as_array).unwrap();
        assert_eq!(widths.first(), Some(&Object::Integer(514)));
        assert_eq!(widths.last(), Some(&Object::Integer(514)));
    }
}
