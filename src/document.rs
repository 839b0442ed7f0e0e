//! PDF document model.

use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::fonts::{EmbedOptions, FontHandle, FontRegistry, PdfFont, StandardFont};
use crate::forms::{
    array_at_mut, array_get, inherited, AppearanceStrategy, CheckBox, ChoiceField, FieldHandle, FieldKind, FieldMut,
    PdfForm, PushButton, RadioGroup, TextField, WidgetHandle, WidgetOptions,
};
use crate::geometry::Rect;
use crate::loader::{self, LoadedFile};
use crate::object::{Dict, Object, ObjectRef};
use crate::parser_config::ParserOptions;
use crate::writer::{PdfWriter, SaveMode, SaveOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Deepest page tree walked.
const MAX_PAGE_TREE_DEPTH: usize = 64;

/// Header version of new documents.
const NEW_DOCUMENT_VERSION: &str = "1.7";

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Width in points
    pub width: f32,
    /// Height in points
    pub height: f32,
}

impl PageSize {
    /// US Letter, 612 x 792.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// ISO A4, 595.28 x 841.89.
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    /// A custom size.
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        Self::LETTER
    }
}

/// A page with its inheritable attributes resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// The page dictionary
    pub reference: ObjectRef,
    /// `/MediaBox`
    pub media_box: Rect,
    /// `/CropBox`, if any
    pub crop_box: Option<Rect>,
    /// `/Rotate` in degrees
    pub rotation: i64,
    /// `/Resources`, resolved
    pub resources: Option<Dict>,
}

/// Entries of the document information dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// `/Title`
    pub title: Option<String>,
    /// `/Author`
    pub author: Option<String>,
    /// `/Subject`
    pub subject: Option<String>,
    /// `/Creator`
    pub creator: Option<String>,
    /// `/Producer`
    pub producer: Option<String>,
}

/// PDF document.
///
/// Owns the [`PdfContext`] holding every object, the trailer, the form and
/// the fonts registered for drawing.
///
/// # Example
///
/// ```
/// use pdf_kiln::document::{PdfDocument, PageSize};
/// use pdf_kiln::forms::{FieldKind, TextFieldAppearanceOptions};
/// use pdf_kiln::geometry::Rect;
/// use pdf_kiln::writer::SaveOptions;
///
/// let mut doc = PdfDocument::create(PageSize::LETTER);
/// let page = doc.add_page(612.0, 792.0)?;
/// doc.create_field(FieldKind::Text, "name")?;
/// let mut name = doc.text_field("name")?;
/// name.set_text(Some("Ada"))?;
/// name.add_to_page(page, &TextFieldAppearanceOptions::new(Rect::new(50.0, 700.0, 200.0, 20.0)))?;
///
/// let bytes = doc.save(SaveOptions::full())?;
/// let reloaded = PdfDocument::load(&bytes)?;
/// assert_eq!(reloaded.form().len(), 1);
/// # Ok::<(), pdf_kiln::error::Error>(())
/// ```
#[derive(Debug)]
pub struct PdfDocument {
    context: PdfContext,
    trailer: Dict,
    catalog: ObjectRef,
    version: String,
    /// Bytes the document was loaded from
    original: Option<Vec<u8>>,
    startxref: Option<usize>,
    repaired: bool,
    form: PdfForm,
    fonts: FontRegistry,
}

impl PdfDocument {
    /// Parse a document with lenient options.
    pub fn load(data: &[u8]) -> Result<Self> {
        Self::load_with_options(data, &ParserOptions::default())
    }

    /// Parse a document.
    pub fn load_with_options(data: &[u8], options: &ParserOptions) -> Result<Self> {
        let LoadedFile {
            mut context,
            trailer,
            version,
            startxref,
            repaired,
        } = loader::load(data, options)?;

        let catalog = trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::InvalidXref("trailer has no /Root".to_string()))?;
        if context.lookup(catalog).and_then(Object::as_dict).is_none() {
            return Err(Error::ObjectNotFound(catalog.id, catalog.gen));
        }
        let form = PdfForm::load(&mut context, catalog);

        log::info!(
            "Loaded PDF-{} with {} objects and {} form fields{}",
            version,
            context.len(),
            form.len(),
            if repaired { " (repaired)" } else { "" }
        );
        Ok(Self {
            context,
            trailer,
            catalog,
            version,
            original: Some(data.to_vec()),
            startxref,
            repaired,
            form,
            fonts: FontRegistry::new(),
        })
    }

    /// Read and parse a file.
    ///
    /// ```no_run
    /// use pdf_kiln::document::PdfDocument;
    ///
    /// let doc = PdfDocument::open("form.pdf")?;
    /// println!("{} pages", doc.page_count());
    /// # Ok::<(), pdf_kiln::error::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::load(&data)
    }

    /// A new document with an empty page tree whose pages default to `size`.
    pub fn create(size: PageSize) -> Self {
        let mut context = PdfContext::new();

        let mut pages = Dict::new();
        pages.insert("Type".to_string(), Object::name("Pages"));
        pages.insert("Kids".to_string(), Object::Array(Vec::new()));
        pages.insert("Count".to_string(), Object::Integer(0));
        pages.insert(
            "MediaBox".to_string(),
            Rect::new(0.0, 0.0, size.width, size.height).to_object(),
        );
        let pages = context.register(Object::Dictionary(pages));

        let mut catalog = Dict::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        catalog.insert("Pages".to_string(), Object::Reference(pages));
        let catalog = context.register(Object::Dictionary(catalog));

        let mut trailer = Dict::new();
        trailer.insert("Root".to_string(), Object::Reference(catalog));

        Self {
            context,
            trailer,
            catalog,
            version: NEW_DOCUMENT_VERSION.to_string(),
            original: None,
            startxref: None,
            repaired: false,
            form: PdfForm::new(catalog),
            fonts: FontRegistry::new(),
        }
    }

    /// Header version, e.g. "1.7".
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Whether loading had to rebuild the cross-reference data.
    pub fn is_repaired(&self) -> bool {
        self.repaired
    }

    /// The object arena.
    pub fn context(&self) -> &PdfContext {
        &self.context
    }

    /// The object arena, for edits this type has no operation for.
    pub fn context_mut(&mut self) -> &mut PdfContext {
        &mut self.context
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// The document catalog.
    pub fn catalog(&self) -> ObjectRef {
        self.catalog
    }

    fn pages_root(&self) -> Option<ObjectRef> {
        self.context
            .lookup(self.catalog)?
            .as_dict()?
            .get("Pages")?
            .as_reference()
    }

    /// Page dictionaries in document order.
    pub fn page_refs(&self) -> Vec<ObjectRef> {
        let mut pages = Vec::new();
        if let Some(root) = self.pages_root() {
            let mut visited = HashSet::new();
            self.collect_pages(root, &mut visited, &mut pages, 0);
        }
        pages
    }

    fn collect_pages(&self, node: ObjectRef, visited: &mut HashSet<ObjectRef>, out: &mut Vec<ObjectRef>, depth: usize) {
        if depth > MAX_PAGE_TREE_DEPTH || !visited.insert(node) {
            log::warn!("Page tree revisits {} or is too deep, skipping", node);
            return;
        }
        let Some(dict) = self.context.lookup(node).and_then(Object::as_dict) else {
            log::debug!("Page tree node {} is missing", node);
            return;
        };
        let is_leaf = dict.get("Type").and_then(Object::as_name) == Some("Page") || !dict.contains_key("Kids");
        if is_leaf {
            out.push(node);
            return;
        }
        let kids: Vec<ObjectRef> = array_get(&self.context, node, "Kids")
            .map(|kids| kids.iter().filter_map(Object::as_reference).collect())
            .unwrap_or_default();
        for kid in kids {
            self.collect_pages(kid, visited, out, depth + 1);
        }
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_refs().len()
    }

    /// Dictionary of page `index`.
    pub fn page_ref(&self, index: usize) -> Result<ObjectRef> {
        let pages = self.page_refs();
        pages.get(index).copied().ok_or(Error::PageOutOfRange {
            index,
            count: pages.len(),
        })
    }

    /// Page `index` with `/MediaBox`, `/CropBox`, `/Rotate` and `/Resources`
    /// inherited from the page tree.
    pub fn page(&self, index: usize) -> Result<Page> {
        let reference = self.page_ref(index)?;
        let get = |key: &str| inherited(&self.context, reference, key);

        let media_box = get("MediaBox").and_then(Rect::from_object).unwrap_or_else(|| {
            log::warn!("Page {} has no usable /MediaBox, assuming Letter", index);
            Rect::new(0.0, 0.0, PageSize::LETTER.width, PageSize::LETTER.height)
        });
        Ok(Page {
            reference,
            media_box,
            crop_box: get("CropBox").and_then(Rect::from_object),
            rotation: get("Rotate").and_then(Object::as_integer).unwrap_or(0),
            resources: get("Resources").and_then(Object::as_dict).cloned(),
        })
    }

    /// Append a page of `width` x `height` points.
    pub fn add_page(&mut self, width: f32, height: f32) -> Result<ObjectRef> {
        let root = self
            .pages_root()
            .ok_or(Error::ObjectNotFound(self.catalog.id, self.catalog.gen))?;

        let mut page = Dict::new();
        page.insert("Type".to_string(), Object::name("Page"));
        page.insert("Parent".to_string(), Object::Reference(root));
        page.insert("MediaBox".to_string(), Rect::new(0.0, 0.0, width, height).to_object());
        page.insert("Resources".to_string(), Object::Dictionary(Dict::new()));
        let page = self.context.register(Object::Dictionary(page));

        array_at_mut(&mut self.context, root, "Kids")
            .ok_or(Error::ObjectNotFound(root.id, root.gen))?
            .push(Object::Reference(page));
        let count = self.page_count();
        if let Some(dict) = self.context.lookup_mut(root).and_then(Object::as_dict_mut) {
            dict.insert("Count".to_string(), Object::Integer(count as i64));
        }
        log::debug!("Added page {} ({} x {})", page, width, height);
        Ok(page)
    }

    fn info_dict(&self) -> Option<&Dict> {
        let info = self.trailer.get("Info")?;
        self.context.resolve(info)?.as_dict()
    }

    /// The document information dictionary.
    pub fn info(&self) -> DocumentInfo {
        let text = |key: &str| {
            self.info_dict()
                .and_then(|d| d.get(key))
                .and_then(|v| self.context.resolve(v))
                .and_then(Object::as_text)
        };
        DocumentInfo {
            title: text("Title"),
            author: text("Author"),
            subject: text("Subject"),
            creator: text("Creator"),
            producer: text("Producer"),
        }
    }

    fn set_info(&mut self, key: &str, value: &str) -> Result<()> {
        let info = match self.trailer.get("Info").and_then(Object::as_reference) {
            Some(info) => info,
            None => {
                let existing = self.trailer.get("Info").and_then(Object::as_dict).cloned().unwrap_or_default();
                let info = self.context.register(Object::Dictionary(existing));
                self.trailer.insert("Info".to_string(), Object::Reference(info));
                info
            },
        };
        self.context
            .lookup_mut(info)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(info.id, info.gen))?
            .insert(key.to_string(), Object::text(value));
        Ok(())
    }

    /// Set `/Title`.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        self.set_info("Title", title)
    }

    /// Set `/Author`.
    pub fn set_author(&mut self, author: &str) -> Result<()> {
        self.set_info("Author", author)
    }

    /// Set `/Producer`.
    pub fn set_producer(&mut self, producer: &str) -> Result<()> {
        self.set_info("Producer", producer)
    }

    /// Embed a TrueType font program.
    pub fn embed_font(&mut self, data: Vec<u8>, options: EmbedOptions) -> Result<FontHandle> {
        self.fonts.embed(data, &options, &mut self.context)
    }

    /// Handle for a standard 14 font.
    pub fn standard_font(&mut self, font: StandardFont) -> FontHandle {
        self.fonts.standard(font, &mut self.context)
    }

    /// Font behind `handle`.
    pub fn font(&self, handle: FontHandle) -> Option<&PdfFont> {
        self.fonts.get(handle)
    }

    /// Fonts registered with this document.
    pub fn fonts(&self) -> &FontRegistry {
        &self.fonts
    }

    /// The interactive form.
    pub fn form(&self) -> &PdfForm {
        &self.form
    }

    /// The font the form's default appearance names (Helvetica if none).
    pub fn default_form_font(&mut self) -> FontHandle {
        self.form.default_font(&mut self.context, &mut self.fonts)
    }

    /// Create a field without widgets. Dotted names create parent nodes.
    pub fn create_field(&mut self, kind: FieldKind, name: &str) -> Result<FieldHandle> {
        self.form.create_field(&mut self.context, kind, name)
    }

    /// Add a widget for `field` on page `page_index`.
    pub fn add_widget(&mut self, field: FieldHandle, page_index: usize, options: &WidgetOptions) -> Result<WidgetHandle> {
        let page = self.page_ref(page_index)?;
        let index = self
            .form
            .index_of_handle(field)
            .ok_or_else(|| Error::FieldNotFound(field.reference().to_string()))?;
        self.form.add_widget(&mut self.context, index, page, options)
    }

    /// Field by qualified name.
    pub fn field(&mut self, name: &str) -> Result<FieldMut<'_>> {
        self.form.field_mut(&mut self.context, &mut self.fonts, name)
    }

    /// Text field by qualified name.
    pub fn text_field(&mut self, name: &str) -> Result<TextField<'_>> {
        self.field(name)?.into_text()
    }

    /// Check box by qualified name.
    pub fn check_box(&mut self, name: &str) -> Result<CheckBox<'_>> {
        self.field(name)?.into_check_box()
    }

    /// Radio group by qualified name.
    pub fn radio_group(&mut self, name: &str) -> Result<RadioGroup<'_>> {
        self.field(name)?.into_radio_group()
    }

    /// Dropdown or option list by qualified name.
    pub fn choice_field(&mut self, name: &str) -> Result<ChoiceField<'_>> {
        self.field(name)?.into_choice()
    }

    /// Push button by qualified name.
    pub fn push_button(&mut self, name: &str) -> Result<PushButton<'_>> {
        self.field(name)?.into_push_button()
    }

    /// Remove a field and its widgets.
    pub fn remove_field(&mut self, name: &str) -> Result<()> {
        let pages = self.page_refs();
        self.form.remove_field(&mut self.context, name, &pages)
    }

    /// Redraw every field that needs it. See [`PdfForm`] for the state rules.
    ///
    /// Returns the number of widgets drawn; a second call draws nothing.
    pub fn update_appearances(&mut self, font: FontHandle, strategy: Option<&AppearanceStrategy<'_>>) -> Result<usize> {
        self.form
            .update_appearances(&mut self.context, &mut self.fonts, font, strategy)
    }

    /// Serialize the document.
    ///
    /// An incremental save needs the bytes of a file loaded without repair;
    /// otherwise a full file is written and a warning logged.
    pub fn save(&mut self, options: SaveOptions) -> Result<Vec<u8>> {
        if options.update_field_appearances && self.form.fields().any(|f| f.needs_appearance(&self.context)) {
            let font = self.default_form_font();
            self.form
                .update_appearances_best_effort(&mut self.context, &mut self.fonts, font)?;
        }
        self.fonts.finalize(&mut self.context)?;

        let mut roots: Vec<ObjectRef> = self.pages_root().into_iter().collect();
        roots.extend(self.form.acroform());
        roots.extend(self.context.modified());

        let writer = PdfWriter::new(&self.context, options);
        let output = match (options.mode, &self.original, self.startxref) {
            (SaveMode::Incremental, Some(original), Some(startxref)) => {
                writer.write_incremental(original, startxref, &self.trailer)?
            },
            (SaveMode::Incremental, ..) => {
                log::warn!("No trusted cross-reference data to append to, writing a full file");
                writer.write_full(&self.trailer, &roots, &self.version)?
            },
            (SaveMode::Full, ..) => writer.write_full(&self.trailer, &roots, &self.version)?,
        };
        log::debug!("Saved {} bytes ({:?})", output.len(), options.mode);
        Ok(output)
    }

    /// Serialize the document to `path`.
    pub fn save_to_file(&mut self, path: impl AsRef<Path>, options: SaveOptions) -> Result<()> {
        let bytes = self.save(options)?;
        std::fs::write(path.as_ref(), bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_has_no_pages() {
        let doc = PdfDocument::create(PageSize::A4);
        assert_eq!(doc.page_count(), 0);
        assert!(matches!(doc.page(0), Err(Error::PageOutOfRange { index: 0, count: 0 })));
    }

    #[test]
    fn test_page_inherits_media_box() {
        let mut doc = PdfDocument::create(PageSize::A4);
        let page = doc.add_page(100.0, 200.0).unwrap();
        doc.context_mut()
            .lookup_mut(page)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .remove("MediaBox");

        let resolved = doc.page(0).unwrap();
        assert_eq!(resolved.reference, page);
        assert_eq!(resolved.media_box, Rect::new(0.0, 0.0, 595.28, 841.89));
        assert_eq!(resolved.rotation, 0);
    }

    #[test]
    fn test_page_count_updates() {
        let mut doc = PdfDocument::create(PageSize::default());
        doc.add_page(612.0, 792.0).unwrap();
        doc.add_page(612.0, 792.0).unwrap();
        assert_eq!(doc.page_count(), 2);
        let root = doc.pages_root().unwrap();
        let count = doc.context().lookup(root).and_then(Object::as_dict).unwrap()["Count"].clone();
        assert_eq!(count, Object::Integer(2));
    }

    #[test]
    fn test_page_tree_cycle_terminates() {
        let mut doc = PdfDocument::create(PageSize::default());
        let root = doc.pages_root().unwrap();
        doc.context_mut()
            .lookup_mut(root)
            .and_then(Object::as_dict_mut)
            .unwrap()
            .insert("Kids".to_string(), Object::Array(vec![Object::Reference(root)]));
        assert_eq!(doc.page_count(), 0);
    }

    #[test]
    fn test_info_round_trip() {
        let mut doc = PdfDocument::create(PageSize::default());
        doc.add_page(612.0, 792.0).unwrap();
        doc.set_title("Quarterly report").unwrap();
        doc.set_author("Ops").unwrap();
        doc.set_producer("pdf_kiln").unwrap();

        let bytes = doc.save(SaveOptions::full()).unwrap();
        let reloaded = PdfDocument::load(&bytes).unwrap();
        let info = reloaded.info();
        assert_eq!(info.title.as_deref(), Some("Quarterly report"));
        assert_eq!(info.author.as_deref(), Some("Ops"));
        assert_eq!(info.producer.as_deref(), Some("pdf_kiln"));
        assert_eq!(info.subject, None);
    }

    #[test]
    fn test_incremental_on_created_document_falls_back() {
        let mut doc = PdfDocument::create(PageSize::default());
        doc.add_page(612.0, 792.0).unwrap();
        let bytes = doc.save(SaveOptions::incremental()).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(!String::from_utf8_lossy(&bytes).contains("/Prev"));
    }

    #[test]
    fn test_add_widget_rejects_missing_page() {
        let mut doc = PdfDocument::create(PageSize::default());
        let field = doc.create_field(FieldKind::Text, "t").unwrap();
        let options = WidgetOptions::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(matches!(
            doc.add_widget(field, 3, &options),
            Err(Error::PageOutOfRange { index: 3, count: 0 })
        ));
    }

    #[test]
    fn test_field_lookup_errors() {
        let mut doc = PdfDocument::create(PageSize::default());
        assert!(matches!(doc.field("missing"), Err(Error::FieldNotFound(_))));
        doc.create_field(FieldKind::PushButton, "go").unwrap();
        assert!(matches!(doc.text_field("go"), Err(Error::FieldKindMismatch { .. })));
        assert!(doc.push_button("go").is_ok());
    }
}
