//! Interactive forms (AcroForm).
//!
//! [`PdfForm`] indexes the terminal fields of the document's field tree by
//! fully qualified name. Field dictionaries stay in the [`PdfContext`]; the
//! form keeps references plus the per-field appearance state.
//!
//! Every operation that changes what a field displays moves the field to
//! [`AppearanceState::Dirty`] and sets `/NeedAppearances` on the AcroForm.
//! [`PdfForm::update_appearances`] is the one place appearances are redrawn:
//! it draws every dirty field (and every widget without a Normal appearance),
//! moves those fields back to `Clean`, and clears `/NeedAppearances` once no
//! field is dirty. The drawing itself is a strategy closure, see
//! [`AppearanceStrategy`].

pub mod appearance;
mod button;
mod choice;
mod field;
pub mod flags;
mod text;
mod widget;

pub use appearance::{default_appearance, Appearance, AppearanceStrategy, FieldAppearance};
pub use button::{CheckBox, PushButton, RadioGroup};
pub use choice::ChoiceField;
pub use field::{AppearanceState, Field, FieldHandle, FieldKind, FieldMut};
pub use flags::{ButtonFieldFlags, ChoiceFieldFlags, FieldFlags, TextAlignment, TextFieldFlags};
pub use text::TextField;
pub use widget::{TextFieldAppearanceOptions, Widget, WidgetHandle, WidgetOptions};

use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::fonts::{FontHandle, FontRegistry, PdfFont, StandardFont};
use crate::object::{Dict, Object, ObjectRef};
use appearance::DefaultAppearance;
pub(crate) use field::inherited;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Deepest field tree walked on load.
const MAX_FIELD_DEPTH: usize = 64;

/// Default appearance of a new AcroForm.
const NEW_FORM_DA: &str = "/Helv 0 Tf 0 g";

/// The document's interactive form.
#[derive(Debug, Clone, Default)]
pub struct PdfForm {
    catalog: Option<ObjectRef>,
    acroform: Option<ObjectRef>,
    pub(crate) fields: IndexMap<String, Field>,
    /// Non-terminal nodes by qualified name
    nodes: HashMap<String, ObjectRef>,
    /// On states of button widgets that have no appearance yet
    on_states: HashMap<ObjectRef, String>,
}

impl PdfForm {
    /// An empty form for the document whose catalog is `catalog`.
    pub(crate) fn new(catalog: ObjectRef) -> Self {
        Self {
            catalog: Some(catalog),
            ..Default::default()
        }
    }

    /// Read the field tree under the catalog's `/AcroForm`.
    ///
    /// A direct AcroForm dictionary is moved into its own object so later
    /// edits have an identity to write to.
    pub(crate) fn load(ctx: &mut PdfContext, catalog: ObjectRef) -> Self {
        let mut form = Self::new(catalog);

        let entry = ctx
            .lookup(catalog)
            .and_then(Object::as_dict)
            .and_then(|d| d.get("AcroForm"))
            .cloned();
        form.acroform = match entry {
            Some(Object::Reference(r)) => Some(r),
            Some(Object::Dictionary(dict)) => {
                let r = ctx.register(Object::Dictionary(dict));
                if let Some(catalog) = ctx.lookup_mut(catalog).and_then(Object::as_dict_mut) {
                    catalog.insert("AcroForm".to_string(), Object::Reference(r));
                }
                Some(r)
            },
            _ => None,
        };
        let Some(acroform) = form.acroform else {
            return form;
        };

        let roots: Vec<ObjectRef> = array_get(ctx, acroform, "Fields")
            .map(|fields| fields.iter().filter_map(Object::as_reference).collect())
            .unwrap_or_default();
        let mut visited = HashSet::new();
        for root in roots {
            form.walk(ctx, root, "", &mut visited, 0);
        }
        log::debug!("Loaded {} form fields", form.fields.len());
        form
    }

    fn walk(&mut self, ctx: &PdfContext, node: ObjectRef, parent_name: &str, visited: &mut HashSet<ObjectRef>, depth: usize) {
        if depth > MAX_FIELD_DEPTH {
            log::warn!("Field tree deeper than {} levels at {}", MAX_FIELD_DEPTH, node);
            return;
        }
        if !visited.insert(node) {
            log::warn!("Field tree revisits {}", node);
            return;
        }
        let Some(dict) = ctx.lookup(node).and_then(Object::as_dict) else {
            return;
        };

        let partial = dict.get("T").and_then(|t| ctx.resolve(t)).and_then(Object::as_text);
        let name = match partial {
            Some(partial) if parent_name.is_empty() => partial,
            Some(partial) => format!("{}.{}", parent_name, partial),
            None => parent_name.to_string(),
        };

        let kids: Vec<ObjectRef> = array_get(ctx, node, "Kids")
            .map(|kids| kids.iter().filter_map(Object::as_reference).collect())
            .unwrap_or_default();
        let (children, widgets): (Vec<ObjectRef>, Vec<ObjectRef>) =
            kids.into_iter().partition(|kid| is_field_node(ctx, *kid));

        if !children.is_empty() {
            if !name.is_empty() {
                self.nodes.entry(name.clone()).or_insert(node);
            }
            for child in children {
                self.walk(ctx, child, &name, visited, depth + 1);
            }
            return;
        }

        let Some(field_type) = inherited(ctx, node, "FT").and_then(Object::as_name) else {
            if !name.is_empty() {
                self.nodes.entry(name).or_insert(node);
            }
            return;
        };
        let flags = inherited(ctx, node, "Ff").and_then(Object::as_integer).unwrap_or(0) as u32;
        let Some(kind) = FieldKind::detect(field_type, flags) else {
            log::debug!("Skipping field '{}' of type /{}", name, field_type);
            return;
        };
        let widgets = if widgets.is_empty() && is_widget(dict) {
            vec![node]
        } else {
            widgets
        };
        if self.fields.contains_key(&name) {
            log::warn!("Duplicate field name '{}' at {}, keeping the first", name, node);
            return;
        }
        self.fields.insert(name.clone(), Field::new(node, name, kind, widgets));
    }

    /// The AcroForm dictionary, if the document has one.
    pub fn acroform(&self) -> Option<ObjectRef> {
        self.acroform
    }

    /// Number of terminal fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the form has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Terminal fields in tree order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    /// Qualified names of the terminal fields.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Field by qualified name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Field by handle.
    pub fn field_by_handle(&self, handle: FieldHandle) -> Option<&Field> {
        self.fields.values().find(|f| f.reference() == handle.0)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.get_index_of(name)
    }

    pub(crate) fn index_of_handle(&self, handle: FieldHandle) -> Option<usize> {
        self.fields.values().position(|f| f.reference() == handle.0)
    }

    /// Mutable access to the field named `name`.
    pub(crate) fn field_mut<'a>(
        &'a mut self,
        ctx: &'a mut PdfContext,
        fonts: &'a mut FontRegistry,
        name: &str,
    ) -> Result<FieldMut<'a>> {
        let index = self
            .index_of(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?;
        Ok(FieldMut::new(ctx, self, fonts, index))
    }

    fn acroform_dict<'c>(&self, ctx: &'c PdfContext) -> Option<&'c Dict> {
        ctx.lookup(self.acroform?).and_then(Object::as_dict)
    }

    /// The form-wide default appearance string.
    pub(crate) fn default_appearance(&self, ctx: &PdfContext) -> Option<String> {
        self.acroform_dict(ctx)?
            .get("DA")
            .and_then(|da| ctx.resolve(da))
            .and_then(Object::as_string)
            .map(|da| String::from_utf8_lossy(da).into_owned())
    }

    /// The form-wide `/Q`.
    pub(crate) fn default_quadding(&self, ctx: &PdfContext) -> Option<i64> {
        self.acroform_dict(ctx)?.get("Q").and_then(Object::as_integer)
    }

    /// Whether the AcroForm asks viewers to regenerate appearances.
    pub fn need_appearances(&self, ctx: &PdfContext) -> bool {
        self.acroform_dict(ctx)
            .and_then(|d| d.get("NeedAppearances"))
            .and_then(Object::as_bool)
            .unwrap_or(false)
    }

    fn set_need_appearances(&self, ctx: &mut PdfContext, need: bool) -> Result<()> {
        let Some(acroform) = self.acroform else {
            return Ok(());
        };
        if self.need_appearances(ctx) == need {
            return Ok(());
        }
        let dict = ctx
            .lookup_mut(acroform)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(acroform.id, acroform.gen))?;
        if need {
            dict.insert("NeedAppearances".to_string(), Object::Boolean(true));
        } else {
            dict.remove("NeedAppearances");
        }
        Ok(())
    }

    /// `Clean -> Dirty`.
    pub(crate) fn mark_dirty(&mut self, ctx: &mut PdfContext, index: usize) {
        if let Some((_, field)) = self.fields.get_index_mut(index) {
            field.set_state(AppearanceState::Dirty);
        }
        if let Err(e) = self.set_need_appearances(ctx, true) {
            log::warn!("Could not set /NeedAppearances: {}", e);
        }
    }

    /// The AcroForm, created with an empty field list if missing.
    fn ensure_acroform(&mut self, ctx: &mut PdfContext) -> Result<ObjectRef> {
        if let Some(acroform) = self.acroform {
            return Ok(acroform);
        }
        let catalog = self.catalog.ok_or(Error::ObjectNotFound(0, 0))?;

        let mut dr = Dict::new();
        dr.insert("Font".to_string(), Object::Dictionary(Dict::new()));
        let mut dict = Dict::new();
        dict.insert("Fields".to_string(), Object::Array(Vec::new()));
        dict.insert("DA".to_string(), Object::String(NEW_FORM_DA.as_bytes().to_vec()));
        dict.insert("DR".to_string(), Object::Dictionary(dr));
        let acroform = ctx.register(Object::Dictionary(dict));

        ctx.lookup_mut(catalog)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(catalog.id, catalog.gen))?
            .insert("AcroForm".to_string(), Object::Reference(acroform));
        self.acroform = Some(acroform);
        log::debug!("Created AcroForm {}", acroform);
        Ok(acroform)
    }

    /// Create a terminal field without widgets.
    ///
    /// Dots in `name` create (or reuse) intermediate nodes. Fails with
    /// [`Error::DuplicateField`] when the name is taken.
    pub(crate) fn create_field(&mut self, ctx: &mut PdfContext, kind: FieldKind, name: &str) -> Result<FieldHandle> {
        let segments: Vec<&str> = name.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(Error::Unsupported(format!("invalid field name '{}'", name)));
        }
        if self.fields.contains_key(name) || self.nodes.contains_key(name) {
            return Err(Error::DuplicateField(name.to_string()));
        }
        let acroform = self.ensure_acroform(ctx)?;

        let mut parent = None;
        for depth in 1..segments.len() {
            let prefix = segments[..depth].join(".");
            if self.fields.contains_key(&prefix) {
                return Err(Error::DuplicateField(prefix));
            }
            let node = match self.nodes.get(&prefix) {
                Some(node) => *node,
                None => {
                    let mut dict = Dict::new();
                    dict.insert("T".to_string(), Object::text(segments[depth - 1]));
                    dict.insert("Kids".to_string(), Object::Array(Vec::new()));
                    if let Some(parent) = parent {
                        dict.insert("Parent".to_string(), Object::Reference(parent));
                    }
                    let node = ctx.register(Object::Dictionary(dict));
                    attach(ctx, acroform, parent, node)?;
                    self.nodes.insert(prefix, node);
                    node
                },
            };
            parent = Some(node);
        }

        let mut dict = Dict::new();
        dict.insert("T".to_string(), Object::text(segments[segments.len() - 1]));
        dict.insert("FT".to_string(), Object::name(kind.field_type()));
        let flags = kind.initial_flags();
        if flags != 0 {
            dict.insert("Ff".to_string(), Object::Integer(flags as i64));
        }
        dict.insert("Kids".to_string(), Object::Array(Vec::new()));
        if let Some(parent) = parent {
            dict.insert("Parent".to_string(), Object::Reference(parent));
        }
        if matches!(kind, FieldKind::CheckBox | FieldKind::RadioGroup) {
            dict.insert("V".to_string(), Object::name("Off"));
        }
        let reference = ctx.register(Object::Dictionary(dict));
        attach(ctx, acroform, parent, reference)?;

        self.fields
            .insert(name.to_string(), Field::new(reference, name.to_string(), kind, Vec::new()));
        log::debug!("Created {} field '{}' as {}", kind.name(), name, reference);
        Ok(FieldHandle(reference))
    }

    /// Add a widget for field `index` to `page`.
    ///
    /// New check box widgets turn on with `Yes` and new radio widgets with
    /// `Option<n>` unless the options name an on state.
    pub(crate) fn add_widget(
        &mut self,
        ctx: &mut PdfContext,
        index: usize,
        page: ObjectRef,
        options: &WidgetOptions,
    ) -> Result<WidgetHandle> {
        let field = self
            .fields
            .get_index(index)
            .map(|(_, f)| f.clone())
            .ok_or_else(|| Error::FieldNotFound(format!("#{}", index)))?;
        let field_ref = field.reference();
        if field.widget_refs().contains(&field_ref) {
            return Err(Error::Unsupported(format!(
                "field '{}' shares its dictionary with its widget",
                field.name()
            )));
        }
        if ctx.lookup(page).and_then(Object::as_dict).is_none() {
            return Err(Error::ObjectNotFound(page.id, page.gen));
        }

        let mut dict = options.to_dict(page);
        dict.insert("Parent".to_string(), Object::Reference(field_ref));
        let on_state = match field.kind() {
            FieldKind::CheckBox => Some(options.on_state.clone().unwrap_or_else(|| "Yes".to_string())),
            FieldKind::RadioGroup => Some(
                options
                    .on_state
                    .clone()
                    .unwrap_or_else(|| format!("Option{}", field.widget_refs().len() + 1)),
            ),
            _ => None,
        };
        if let Some(on) = &on_state {
            let current = inherited(ctx, field_ref, "V").and_then(Object::as_name);
            let state = if current == Some(on.as_str()) { on.as_str() } else { "Off" };
            dict.insert("AS".to_string(), Object::name(state));
        }

        let widget = ctx.register(Object::Dictionary(dict));
        array_at_mut(ctx, field_ref, "Kids")
            .ok_or(Error::ObjectNotFound(field_ref.id, field_ref.gen))?
            .push(Object::Reference(widget));
        array_at_mut(ctx, page, "Annots")
            .ok_or(Error::ObjectNotFound(page.id, page.gen))?
            .push(Object::Reference(widget));

        if let Some(on) = on_state {
            self.on_states.insert(widget, on);
        }
        self.fields[index].push_widget(widget);
        self.mark_dirty(ctx, index);
        log::debug!("Added widget {} to '{}' on page {}", widget, field.name(), page);
        Ok(WidgetHandle(widget))
    }

    /// On state of a button widget: from its appearance dictionary, else the
    /// one chosen when it was added.
    pub(crate) fn widget_on_state(&self, ctx: &PdfContext, widget: ObjectRef) -> Option<String> {
        Widget::read(ctx, widget)
            .and_then(|w| w.on_state().map(str::to_string))
            .or_else(|| self.on_states.get(&widget).cloned())
    }

    /// Remove field `name`, its widgets, and their `/Annots` entries.
    ///
    /// `pages` are searched for widgets that lack a `/P` entry.
    pub(crate) fn remove_field(&mut self, ctx: &mut PdfContext, name: &str, pages: &[ObjectRef]) -> Result<()> {
        let field = self
            .fields
            .shift_remove(name)
            .ok_or_else(|| Error::FieldNotFound(name.to_string()))?;
        let field_ref = field.reference();

        for widget in field.widget_refs() {
            let page = ctx
                .lookup(*widget)
                .and_then(Object::as_dict)
                .and_then(|d| d.get("P"))
                .and_then(Object::as_reference);
            for page in page.into_iter().chain(pages.iter().copied()) {
                remove_from_array(ctx, page, "Annots", *widget);
            }
            self.on_states.remove(widget);
            if *widget != field_ref {
                ctx.remove(*widget);
            }
        }

        let parent = ctx
            .lookup(field_ref)
            .and_then(Object::as_dict)
            .and_then(|d| d.get("Parent"))
            .and_then(Object::as_reference);
        match (parent, self.acroform) {
            (Some(parent), _) => remove_from_array(ctx, parent, "Kids", field_ref),
            (None, Some(acroform)) => remove_from_array(ctx, acroform, "Fields", field_ref),
            (None, None) => {},
        }
        ctx.remove(field_ref);
        log::debug!("Removed field '{}'", name);
        Ok(())
    }

    /// The font named by the form's default appearance, falling back to
    /// Helvetica.
    pub(crate) fn default_font(&self, ctx: &mut PdfContext, fonts: &mut FontRegistry) -> FontHandle {
        let view: &PdfContext = ctx;
        let standard = self
            .default_appearance(view)
            .and_then(|da| DefaultAppearance::parse(&da).font)
            .and_then(|name| {
                let base_font = self
                    .resource_font(view, &name)
                    .and_then(|r| view.lookup(r))
                    .and_then(Object::as_dict)
                    .and_then(|d| d.get("BaseFont"))
                    .and_then(Object::as_name)
                    .and_then(StandardFont::from_name);
                base_font.or_else(|| StandardFont::from_name(&name))
            })
            .unwrap_or(StandardFont::Helvetica);
        fonts.standard(standard, ctx)
    }

    /// `/DR /Font /<name>` of the AcroForm.
    fn resource_font(&self, ctx: &PdfContext, name: &str) -> Option<ObjectRef> {
        let dr = ctx.resolve(self.acroform_dict(ctx)?.get("DR")?)?;
        let fonts = ctx.resolve_key(dr, "Font")?.as_dict()?;
        fonts.get(name)?.as_reference()
    }

    /// Make `font` available to viewers under its resource name in `/DR`.
    fn register_resource_font(&self, ctx: &mut PdfContext, font: &PdfFont) -> Result<()> {
        let Some(acroform) = self.acroform else {
            return Ok(());
        };
        if self.resource_font(ctx, font.resource_name()) == Some(font.reference()) {
            return Ok(());
        }
        dict_at_mut(ctx, acroform, &["DR", "Font"])
            .ok_or(Error::ObjectNotFound(acroform.id, acroform.gen))?
            .insert(font.resource_name().to_string(), Object::Reference(font.reference()));
        Ok(())
    }

    /// Draw the widgets of field `index`; `Dirty -> Clean`.
    ///
    /// Without `force`, a clean field whose widgets all have a Normal
    /// appearance is skipped. Check boxes and radio groups are drawn with
    /// ZapfDingbats whatever `font` is. Returns the number of widgets drawn.
    pub(crate) fn regenerate(
        &mut self,
        ctx: &mut PdfContext,
        fonts: &mut FontRegistry,
        index: usize,
        font: FontHandle,
        strategy: Option<&AppearanceStrategy<'_>>,
        force: bool,
    ) -> Result<usize> {
        let field = self
            .fields
            .get_index(index)
            .map(|(_, f)| f.clone())
            .ok_or_else(|| Error::FieldNotFound(format!("#{}", index)))?;
        if !force && !field.needs_appearance(ctx) {
            return Ok(0);
        }

        let toggle = matches!(field.kind(), FieldKind::CheckBox | FieldKind::RadioGroup);
        let handle = if toggle {
            fonts.standard(StandardFont::ZapfDingbats, ctx)
        } else {
            font
        };
        let pdf_font = fonts
            .get(handle)
            .ok_or_else(|| Error::Font(format!("unknown font handle {:?}", handle)))?;
        let fallback: &AppearanceStrategy<'_> = &default_appearance;
        let strategy = strategy.unwrap_or(fallback);
        let snapshot = FieldAppearance::capture(ctx, self, &field);

        let mut drawn = 0;
        for widget_ref in field.widget_refs() {
            let Some(mut widget) = Widget::read(ctx, *widget_ref) else {
                log::warn!("Widget {} of '{}' is missing", widget_ref, field.name());
                continue;
            };
            if widget.on_state().is_none() {
                if let Some(on) = self.on_states.get(widget_ref) {
                    widget.set_on_state(on.clone());
                }
            }

            let appearance = strategy(&snapshot, &widget, pdf_font)?;
            appearance::install(ctx, &widget, appearance, pdf_font)?;

            if toggle {
                let on = widget.on_state().unwrap_or("Yes");
                let state = if snapshot.value.as_deref() == Some(on) { on } else { "Off" };
                ctx.lookup_mut(*widget_ref)
                    .and_then(Object::as_dict_mut)
                    .ok_or(Error::ObjectNotFound(widget_ref.id, widget_ref.gen))?
                    .insert("AS".to_string(), Object::name(state));
            }
            self.on_states.remove(widget_ref);
            drawn += 1;
        }

        self.register_resource_font(ctx, pdf_font)?;
        self.fields[index].set_state(AppearanceState::Clean);
        log::debug!("Drew {} widget(s) of '{}'", drawn, field.name());
        Ok(drawn)
    }

    /// Redraw every field that needs it with `font` and `strategy` (or
    /// [`default_appearance`]). Returns the number of widgets drawn.
    ///
    /// A second call without intervening edits draws nothing.
    pub(crate) fn update_appearances(
        &mut self,
        ctx: &mut PdfContext,
        fonts: &mut FontRegistry,
        font: FontHandle,
        strategy: Option<&AppearanceStrategy<'_>>,
    ) -> Result<usize> {
        self.sweep(ctx, fonts, font, strategy, false)
    }

    /// Like [`update_appearances`](Self::update_appearances), but a field
    /// that cannot be drawn is logged and left dirty with
    /// `/NeedAppearances true` instead of failing the sweep.
    pub(crate) fn update_appearances_best_effort(
        &mut self,
        ctx: &mut PdfContext,
        fonts: &mut FontRegistry,
        font: FontHandle,
    ) -> Result<usize> {
        self.sweep(ctx, fonts, font, None, true)
    }

    fn sweep(
        &mut self,
        ctx: &mut PdfContext,
        fonts: &mut FontRegistry,
        font: FontHandle,
        strategy: Option<&AppearanceStrategy<'_>>,
        skip_failures: bool,
    ) -> Result<usize> {
        let mut drawn = 0;
        for index in 0..self.fields.len() {
            match self.regenerate(ctx, fonts, index, font, strategy, false) {
                Ok(count) => drawn += count,
                Err(e) if skip_failures => {
                    let name = self.fields.get_index(index).map(|(name, _)| name.clone()).unwrap_or_default();
                    log::warn!("Leaving field '{}' for the viewer to draw: {}", name, e);
                    self.mark_dirty(ctx, index);
                },
                Err(e) => return Err(e),
            }
        }
        if self.fields.values().all(|f| !f.needs_appearance(ctx)) {
            self.set_need_appearances(ctx, false)?;
        }
        if drawn > 0 {
            log::info!("Regenerated {} widget appearance(s)", drawn);
        }
        Ok(drawn)
    }
}

/// Append `child` to its parent's `/Kids`, or to the AcroForm's `/Fields`.
fn attach(ctx: &mut PdfContext, acroform: ObjectRef, parent: Option<ObjectRef>, child: ObjectRef) -> Result<()> {
    let (owner, key) = match parent {
        Some(parent) => (parent, "Kids"),
        None => (acroform, "Fields"),
    };
    array_at_mut(ctx, owner, key)
        .ok_or(Error::ObjectNotFound(owner.id, owner.gen))?
        .push(Object::Reference(child));
    Ok(())
}

fn is_widget(dict: &Dict) -> bool {
    dict.get("Subtype").and_then(Object::as_name) == Some("Widget") || dict.contains_key("Rect")
}

/// Kids with a partial name, or non-widget kids with kids of their own,
/// are fields; the rest are widgets.
fn is_field_node(ctx: &PdfContext, kid: ObjectRef) -> bool {
    ctx.lookup(kid)
        .and_then(Object::as_dict)
        .is_some_and(|d| d.contains_key("T") || (!is_widget(d) && d.contains_key("Kids")))
}

/// The array at `owner[key]`, following one indirect hop.
pub(crate) fn array_get<'c>(ctx: &'c PdfContext, owner: ObjectRef, key: &str) -> Option<&'c Vec<Object>> {
    let value = ctx.lookup(owner)?.as_dict()?.get(key)?;
    ctx.resolve(value)?.as_array()
}

/// The array at `owner[key]` for writing, created if missing. An indirect
/// array is written in place.
pub(crate) fn array_at_mut<'c>(ctx: &'c mut PdfContext, owner: ObjectRef, key: &str) -> Option<&'c mut Vec<Object>> {
    let indirect = ctx
        .lookup(owner)?
        .as_dict()?
        .get(key)
        .and_then(Object::as_reference);
    if let Some(r) = indirect {
        return ctx.lookup_mut(r)?.as_array_mut();
    }
    let dict = ctx.lookup_mut(owner)?.as_dict_mut()?;
    let entry = dict
        .entry(key.to_string())
        .or_insert_with(|| Object::Array(Vec::new()));
    if entry.as_array().is_none() {
        *entry = Object::Array(Vec::new());
    }
    entry.as_array_mut()
}

fn remove_from_array(ctx: &mut PdfContext, owner: ObjectRef, key: &str, value: ObjectRef) {
    let present = array_get(ctx, owner, key).is_some_and(|a| a.contains(&Object::Reference(value)));
    if present {
        if let Some(array) = array_at_mut(ctx, owner, key) {
            array.retain(|o| o.as_reference() != Some(value));
        }
    }
}

/// The dictionary reached from `owner` through `path`, creating missing
/// direct dictionaries. Indirect hops are followed and written in place.
pub(crate) fn dict_at_mut<'c>(ctx: &'c mut PdfContext, owner: ObjectRef, path: &[&str]) -> Option<&'c mut Dict> {
    let mut target = owner;
    let mut direct: Vec<&str> = Vec::new();
    for &key in path {
        let next = {
            let mut current = ctx.lookup(target)?.as_dict();
            for k in &direct {
                current = current.and_then(|d| d.get(*k)).and_then(Object::as_dict);
            }
            current.and_then(|d| d.get(key)).and_then(Object::as_reference)
        };
        match next {
            Some(r) => {
                target = r;
                direct.clear();
            },
            None => direct.push(key),
        }
    }

    let mut dict = ctx.lookup_mut(target)?.as_dict_mut()?;
    for key in direct {
        let entry = dict
            .entry(key.to_string())
            .or_insert_with(|| Object::Dictionary(Dict::new()));
        if entry.as_dict().is_none() {
            *entry = Object::Dictionary(Dict::new());
        }
        dict = entry.as_dict_mut()?;
    }
    Some(dict)
}
