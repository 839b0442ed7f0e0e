//! Fonts for page content and form appearances.
//!
//! A [`PdfFont`] is either one of the 14 standard fonts, which only need
//! metrics, or an embedded TrueType program that is subset at save time.
//! Documents hand out [`FontHandle`]s; the font objects themselves live in the
//! document's context and are shared by reference.

mod embedded;
pub mod encoding;
mod program;
pub mod standard;
mod subset;

pub use embedded::{EmbedOptions, EmbeddedFont, EncodingChoice, FontEncoding};
pub use program::{FontProgram, ProgramMetrics, TrueTypeProgram};
pub use standard::{StandardFont, StandardMetrics};
pub use subset::{subset_tag, subset_truetype, to_unicode_cmap};

use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::object::{Dict, Object, ObjectRef};
use crate::writer::ContentBuilder;

/// Handle to a font registered with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontHandle(pub(crate) usize);

#[derive(Debug)]
enum FontSource {
    Standard(StandardFont),
    Embedded(EmbeddedFont),
}

/// A font usable in content streams.
#[derive(Debug)]
pub struct PdfFont {
    source: FontSource,
    reference: ObjectRef,
    resource_name: String,
}

impl PdfFont {
    /// Register the font dictionary of a standard font.
    pub(crate) fn standard(font: StandardFont, ctx: &mut PdfContext) -> Self {
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("Font"));
        dict.insert("Subtype".to_string(), Object::name("Type1"));
        dict.insert("BaseFont".to_string(), Object::name(font.name()));
        if !font.is_symbolic() {
            dict.insert("Encoding".to_string(), Object::name("WinAnsiEncoding"));
        }
        let reference = ctx.register(Object::Dictionary(dict));
        Self {
            source: FontSource::Standard(font),
            reference,
            resource_name: font.resource_name().to_string(),
        }
    }

    /// Base font name.
    pub fn name(&self) -> &str {
        match &self.source {
            FontSource::Standard(font) => font.name(),
            FontSource::Embedded(font) => font.name(),
        }
    }

    /// The font dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    /// Name under which the font appears in `/Resources /Font`.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// The standard font, if this is one.
    pub fn standard_font(&self) -> Option<StandardFont> {
        match &self.source {
            FontSource::Standard(font) => Some(*font),
            FontSource::Embedded(_) => None,
        }
    }

    /// The embedded font, if this is one.
    pub fn embedded_font(&self) -> Option<&EmbeddedFont> {
        match &self.source {
            FontSource::Embedded(font) => Some(font),
            FontSource::Standard(_) => None,
        }
    }

    /// Whether codes are two bytes wide (Identity-H).
    pub fn is_two_byte(&self) -> bool {
        matches!(&self.source, FontSource::Embedded(font) if font.encoding() == FontEncoding::IdentityH)
    }

    /// Encode text into character codes for this font.
    ///
    /// Fails with [`Error::Encoding`] on the first character the font cannot show.
    pub fn encode_text(&self, text: &str) -> Result<Vec<u8>> {
        match &self.source {
            FontSource::Standard(font) => text
                .chars()
                .map(|ch| {
                    font.encode_char(ch).ok_or_else(|| Error::Encoding {
                        font: font.name().to_string(),
                        ch,
                    })
                })
                .collect(),
            FontSource::Embedded(font) => font.encode_text(text),
        }
    }

    /// Append a show-text operator for `text`.
    pub fn show_text(&self, builder: &mut ContentBuilder, text: &str) -> Result<()> {
        let encoded = self.encode_text(text)?;
        if self.is_two_byte() {
            builder.show_hex_text(&encoded);
        } else {
            builder.show_text(&encoded);
        }
        Ok(())
    }

    /// Advance width of `ch` in 1/1000 em.
    pub fn char_width(&self, ch: char) -> f32 {
        match &self.source {
            FontSource::Standard(font) => font.char_width(ch) as f32,
            FontSource::Embedded(font) => font.char_width(ch),
        }
    }

    /// Width of `text` at `size` in text space units.
    ///
    /// ```
    /// use pdf_kiln::document::PdfDocument;
    /// use pdf_kiln::fonts::StandardFont;
    ///
    /// let mut doc = PdfDocument::create(Default::default());
    /// let handle = doc.standard_font(StandardFont::Courier);
    /// let font = doc.font(handle).unwrap();
    /// assert_eq!(font.measure("abc", 10.0), 18.0);
    /// ```
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|ch| self.char_width(ch)).sum::<f32>() * size / 1000.0
    }

    /// Ascent and descent in 1/1000 em.
    fn vertical_metrics(&self) -> (f32, f32) {
        match &self.source {
            FontSource::Standard(font) => {
                let metrics = font.metrics();
                (metrics.ascent, metrics.descent)
            },
            FontSource::Embedded(font) => {
                let metrics = font.program().metrics();
                let scale = 1000.0 / metrics.units_per_em.max(1) as f32;
                (metrics.ascent as f32 * scale, metrics.descent as f32 * scale)
            },
        }
    }

    /// Ascent at `size`.
    pub fn ascent(&self, size: f32) -> f32 {
        self.vertical_metrics().0 * size / 1000.0
    }

    /// Descent at `size` (negative).
    pub fn descent(&self, size: f32) -> f32 {
        self.vertical_metrics().1 * size / 1000.0
    }

    /// Distance from descent to ascent at `size`.
    pub fn height_at_size(&self, size: f32) -> f32 {
        let (ascent, descent) = self.vertical_metrics();
        (ascent - descent) * size / 1000.0
    }

    /// The size at which [`height_at_size`](Self::height_at_size) equals `height`.
    pub fn size_at_height(&self, height: f32) -> f32 {
        let (ascent, descent) = self.vertical_metrics();
        let em = (ascent - descent).max(1.0);
        height * 1000.0 / em
    }

    /// Write the embedded font objects. Standard fonts need nothing.
    pub(crate) fn finalize(&self, ctx: &mut PdfContext) -> Result<()> {
        match &self.source {
            FontSource::Embedded(font) => font.finalize(ctx),
            FontSource::Standard(_) => Ok(()),
        }
    }
}

/// Fonts registered with one document.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: Vec<PdfFont>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a standard font, registering its dictionary on first use.
    pub fn standard(&mut self, font: StandardFont, ctx: &mut PdfContext) -> FontHandle {
        if let Some(index) = self.fonts.iter().position(|f| f.standard_font() == Some(font)) {
            return FontHandle(index);
        }
        self.push(PdfFont::standard(font, ctx))
    }

    /// Parse and embed a TrueType program.
    pub fn embed(&mut self, data: Vec<u8>, options: &EmbedOptions, ctx: &mut PdfContext) -> Result<FontHandle> {
        let program = TrueTypeProgram::parse(data)?;
        Ok(self.embed_program(Box::new(program), options, ctx))
    }

    /// Embed an already decoded font program.
    pub fn embed_program(
        &mut self,
        program: Box<dyn FontProgram>,
        options: &EmbedOptions,
        ctx: &mut PdfContext,
    ) -> FontHandle {
        let font = EmbeddedFont::new(program, options, ctx);
        let resource_name = format!("F{}", font.reference().id);
        log::debug!("Embedding {} as /{} ({:?})", font.name(), resource_name, font.encoding());
        self.push(PdfFont {
            reference: font.reference(),
            source: FontSource::Embedded(font),
            resource_name,
        })
    }

    fn push(&mut self, font: PdfFont) -> FontHandle {
        self.fonts.push(font);
        FontHandle(self.fonts.len() - 1)
    }

    /// The font behind `handle`.
    pub fn get(&self, handle: FontHandle) -> Option<&PdfFont> {
        self.fonts.get(handle.0)
    }

    /// Number of registered fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether no font is registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Registered fonts with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (FontHandle, &PdfFont)> {
        self.fonts.iter().enumerate().map(|(i, font)| (FontHandle(i), font))
    }

    /// Write the objects of every embedded font.
    pub(crate) fn finalize(&self, ctx: &mut PdfContext) -> Result<()> {
        for font in &self.fonts {
            font.finalize(ctx)?;
        }
        Ok(())
    }
}
