//! Font programs.
//!
//! Embedding needs a handful of facts about a font program: the cmap, glyph
//! advances, vertical metrics for the font descriptor, and a way to cut the
//! program down to the glyphs actually shown. [`FontProgram`] is that seam;
//! [`TrueTypeProgram`] implements it for TrueType outlines with `ttf-parser`.

use crate::error::{Error, Result};
use crate::fonts::subset::subset_truetype;
use byteorder::{BigEndian, ByteOrder};
use std::collections::{BTreeSet, HashMap};
use ttf_parser::{Face, GlyphId, Tag};

/// Metrics of a font program in font units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgramMetrics {
    /// Units per em
    pub units_per_em: u16,
    /// Ascender (positive)
    pub ascent: i16,
    /// Descender (negative)
    pub descent: i16,
    /// Cap height
    pub cap_height: i16,
    /// Bounding box (x_min, y_min, x_max, y_max)
    pub bbox: [i16; 4],
    /// Italic angle in degrees
    pub italic_angle: f32,
    /// Font descriptor flags
    pub flags: u32,
}

/// Capabilities an embeddable font program provides.
pub trait FontProgram: std::fmt::Debug + Send {
    /// PostScript name.
    fn postscript_name(&self) -> &str;

    /// Glyph for a character, if the cmap maps it.
    fn glyph_id(&self, ch: char) -> Option<u16>;

    /// Advance width of a glyph in font units.
    fn advance_width(&self, glyph: u16) -> u16;

    /// Number of glyphs in the program.
    fn glyph_count(&self) -> u16;

    /// Metrics for the font descriptor.
    fn metrics(&self) -> ProgramMetrics;

    /// A program containing only `glyphs` (plus what they depend on), with
    /// glyph ids unchanged.
    fn subset(&self, glyphs: &BTreeSet<u16>) -> Result<Vec<u8>>;

    /// The complete program bytes.
    fn data(&self) -> &[u8];
}

/// A TrueType (`glyf` outline) program.
#[derive(Debug)]
pub struct TrueTypeProgram {
    data: Vec<u8>,
    postscript_name: String,
    unicode_to_glyph: HashMap<char, u16>,
    advances: Vec<u16>,
    metrics: ProgramMetrics,
}

impl TrueTypeProgram {
    /// Parse a TrueType font.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Font("font file is empty".to_string()));
        }
        let face = Face::parse(&data, 0).map_err(|e| Error::Font(format!("failed to parse font: {}", e)))?;
        if face.raw_face().table(Tag::from_bytes(b"glyf")).is_none() {
            return Err(Error::Font("only TrueType outlines (glyf) can be embedded".to_string()));
        }

        let postscript_name = face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
            .map(|name| name.chars().filter(|c| c.is_ascii_graphic()).collect::<String>())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "EmbeddedFont".to_string());

        let mut unicode_to_glyph = HashMap::new();
        for codepoint in 0..=0xFFFF_u32 {
            if let Some(ch) = char::from_u32(codepoint) {
                if let Some(glyph) = face.glyph_index(ch) {
                    unicode_to_glyph.insert(ch, glyph.0);
                }
            }
        }

        let advances = (0..face.number_of_glyphs())
            .map(|glyph| face.glyph_hor_advance(GlyphId(glyph)).unwrap_or(0))
            .collect();

        let bbox = face.global_bounding_box();
        let italic_angle = face
            .raw_face()
            .table(Tag::from_bytes(b"post"))
            .filter(|post| post.len() >= 8)
            .map(|post| BigEndian::read_i32(&post[4..8]) as f32 / 65536.0)
            .unwrap_or(0.0);

        let mut flags = 1 << 5; // Nonsymbolic
        if face.is_monospaced() {
            flags |= 1;
        }
        if face.is_italic() || italic_angle != 0.0 {
            flags |= 1 << 6;
        }

        let metrics = ProgramMetrics {
            units_per_em: face.units_per_em(),
            ascent: face.ascender(),
            descent: face.descender(),
            cap_height: face.capital_height().unwrap_or(face.ascender()),
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            italic_angle,
            flags,
        };

        log::debug!(
            "Parsed font {}: {} glyphs, {} mapped characters",
            postscript_name,
            face.number_of_glyphs(),
            unicode_to_glyph.len()
        );

        Ok(Self {
            data,
            postscript_name,
            unicode_to_glyph,
            advances,
            metrics,
        })
    }
}

impl FontProgram for TrueTypeProgram {
    fn postscript_name(&self) -> &str {
        &self.postscript_name
    }

    fn glyph_id(&self, ch: char) -> Option<u16> {
        self.unicode_to_glyph.get(&ch).copied()
    }

    fn advance_width(&self, glyph: u16) -> u16 {
        self.advances.get(glyph as usize).copied().unwrap_or(0)
    }

    fn glyph_count(&self) -> u16 {
        self.advances.len() as u16
    }

    fn metrics(&self) -> ProgramMetrics {
        self.metrics
    }

    fn subset(&self, glyphs: &BTreeSet<u16>) -> Result<Vec<u8>> {
        subset_truetype(&self.data, glyphs)
    }

    fn data(&self) -> &[u8] {
        &self.data
    }
}
