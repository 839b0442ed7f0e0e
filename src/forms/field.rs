//! Field records and the capabilities every field kind shares.

use super::appearance::{AppearanceStrategy, DefaultAppearance};
use super::button::{CheckBox, PushButton, RadioGroup};
use super::choice::ChoiceField;
use super::flags::{FieldFlags, TextAlignment};
use super::text::TextField;
use super::widget::Widget;
use super::PdfForm;
use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::fonts::{FontHandle, FontRegistry};
use crate::object::{Object, ObjectRef};
use std::collections::HashSet;

/// Longest `/Parent` chain followed for inherited attributes.
const MAX_PARENT_DEPTH: usize = 64;

/// Field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Text field (`/Tx`)
    Text,
    /// Check box (`/Btn`)
    CheckBox,
    /// Radio button group (`/Btn` with the Radio flag)
    RadioGroup,
    /// Combo box (`/Ch` with the Combo flag)
    Dropdown,
    /// List box (`/Ch`)
    OptionList,
    /// Push button (`/Btn` with the Pushbutton flag)
    PushButton,
    /// Signature field (`/Sig`)
    Signature,
}

impl FieldKind {
    /// Lower-case kind name used in messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::CheckBox => "check box",
            FieldKind::RadioGroup => "radio group",
            FieldKind::Dropdown => "dropdown",
            FieldKind::OptionList => "option list",
            FieldKind::PushButton => "push button",
            FieldKind::Signature => "signature",
        }
    }

    /// The `/FT` value.
    pub fn field_type(&self) -> &'static str {
        match self {
            FieldKind::Text => "Tx",
            FieldKind::CheckBox | FieldKind::RadioGroup | FieldKind::PushButton => "Btn",
            FieldKind::Dropdown | FieldKind::OptionList => "Ch",
            FieldKind::Signature => "Sig",
        }
    }

    /// `/Ff` bits a new field of this kind starts with.
    pub(crate) fn initial_flags(&self) -> u32 {
        use super::flags::{ButtonFieldFlags, ChoiceFieldFlags};
        match self {
            FieldKind::RadioGroup => (ButtonFieldFlags::RADIO | ButtonFieldFlags::NO_TOGGLE_TO_OFF).bits(),
            FieldKind::PushButton => ButtonFieldFlags::PUSHBUTTON.bits(),
            FieldKind::Dropdown => ChoiceFieldFlags::COMBO.bits(),
            _ => 0,
        }
    }

    /// Kind from `/FT` and `/Ff`.
    ///
    /// ```
    /// use pdf_kiln::forms::FieldKind;
    ///
    /// assert_eq!(FieldKind::detect("Btn", 1 << 15), Some(FieldKind::RadioGroup));
    /// assert_eq!(FieldKind::detect("Ch", 0), Some(FieldKind::OptionList));
    /// assert_eq!(FieldKind::detect("XYZ", 0), None);
    /// ```
    pub fn detect(field_type: &str, flags: u32) -> Option<Self> {
        use super::flags::{ButtonFieldFlags, ChoiceFieldFlags};
        let kind = match field_type {
            "Tx" => FieldKind::Text,
            "Btn" => {
                let flags = ButtonFieldFlags::from_bits_retain(flags);
                if flags.contains(ButtonFieldFlags::PUSHBUTTON) {
                    FieldKind::PushButton
                } else if flags.contains(ButtonFieldFlags::RADIO) {
                    FieldKind::RadioGroup
                } else {
                    FieldKind::CheckBox
                }
            },
            "Ch" => {
                if ChoiceFieldFlags::from_bits_retain(flags).contains(ChoiceFieldFlags::COMBO) {
                    FieldKind::Dropdown
                } else {
                    FieldKind::OptionList
                }
            },
            "Sig" => FieldKind::Signature,
            _ => return None,
        };
        Some(kind)
    }
}

/// Whether a field's appearance streams match its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppearanceState {
    /// Appearances are current
    #[default]
    Clean,
    /// Displayed content changed since the last regeneration
    Dirty,
}

/// Handle to a terminal field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldHandle(pub(crate) ObjectRef);

impl FieldHandle {
    /// The field dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.0
    }
}

/// A terminal field: the node that carries a value and widgets.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    reference: ObjectRef,
    name: String,
    kind: FieldKind,
    widgets: Vec<ObjectRef>,
    state: AppearanceState,
}

impl Field {
    pub(crate) fn new(reference: ObjectRef, name: String, kind: FieldKind, widgets: Vec<ObjectRef>) -> Self {
        Self {
            reference,
            name,
            kind,
            widgets,
            state: AppearanceState::Clean,
        }
    }

    /// The field dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    /// Handle of this field.
    pub fn handle(&self) -> FieldHandle {
        FieldHandle(self.reference)
    }

    /// Fully qualified, dot-separated name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Widget annotation dictionaries. May include the field itself when the
    /// field and widget dictionaries are merged.
    pub fn widget_refs(&self) -> &[ObjectRef] {
        &self.widgets
    }

    /// Appearance state.
    pub fn state(&self) -> AppearanceState {
        self.state
    }

    pub(crate) fn push_widget(&mut self, widget: ObjectRef) {
        self.widgets.push(widget);
    }

    pub(crate) fn set_state(&mut self, state: AppearanceState) {
        self.state = state;
    }

    /// Whether regeneration would draw this field: it is dirty, or a widget
    /// lacks a Normal appearance.
    pub fn needs_appearance(&self, ctx: &PdfContext) -> bool {
        self.state == AppearanceState::Dirty
            || self
                .widgets
                .iter()
                .filter_map(|w| Widget::read(ctx, *w))
                .any(|w| !w.has_normal_appearance())
    }

    /// Widgets read from their dictionaries.
    pub fn widgets(&self, ctx: &PdfContext) -> Vec<Widget> {
        self.widgets.iter().filter_map(|w| Widget::read(ctx, *w)).collect()
    }
}

/// Look `key` up on `start` and then up its `/Parent` chain.
pub(crate) fn inherited<'c>(ctx: &'c PdfContext, start: ObjectRef, key: &str) -> Option<&'c Object> {
    let mut visited = HashSet::new();
    let mut current = Some(start);
    while let Some(r) = current {
        if !visited.insert(r) || visited.len() > MAX_PARENT_DEPTH {
            log::warn!("Stopped at {} while looking up inherited /{}", r, key);
            return None;
        }
        let dict = ctx.lookup(r)?.as_dict()?;
        if let Some(value) = dict.get(key) {
            return ctx.resolve(value);
        }
        current = dict.get("Parent").and_then(Object::as_reference);
    }
    None
}

/// Mutable access to one field of a document.
///
/// Obtained from [`PdfDocument::field`](crate::document::PdfDocument::field).
/// Kind-specific operations live on the views returned by
/// [`into_text`](Self::into_text) and its siblings.
#[derive(Debug)]
pub struct FieldMut<'a> {
    pub(crate) ctx: &'a mut PdfContext,
    pub(crate) form: &'a mut PdfForm,
    pub(crate) fonts: &'a mut FontRegistry,
    pub(crate) index: usize,
}

impl<'a> FieldMut<'a> {
    pub(crate) fn new(
        ctx: &'a mut PdfContext,
        form: &'a mut PdfForm,
        fonts: &'a mut FontRegistry,
        index: usize,
    ) -> Self {
        Self {
            ctx,
            form,
            fonts,
            index,
        }
    }

    /// The field record.
    pub fn field(&self) -> &Field {
        &self.form.fields[self.index]
    }

    /// Fully qualified name.
    pub fn name(&self) -> &str {
        self.field().name()
    }

    /// Field kind.
    pub fn kind(&self) -> FieldKind {
        self.field().kind()
    }

    /// The field dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.field().reference()
    }

    /// Appearance state.
    pub fn state(&self) -> AppearanceState {
        self.field().state()
    }

    /// Widgets of the field.
    pub fn widgets(&self) -> Vec<Widget> {
        self.field().widgets(self.ctx)
    }

    /// Set the field `Dirty` and ask viewers to regenerate appearances.
    pub fn mark_dirty(&mut self) {
        self.form.mark_dirty(self.ctx, self.index);
    }

    /// Inherited attribute of the field.
    pub(crate) fn get(&self, key: &str) -> Option<&Object> {
        inherited(self.ctx, self.reference(), key)
    }

    /// Write `key` on the terminal field dictionary.
    pub(crate) fn put(&mut self, key: &str, value: Object) -> Result<()> {
        let r = self.reference();
        let dict = self
            .ctx
            .lookup_mut(r)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        dict.insert(key.to_string(), value);
        Ok(())
    }

    /// Remove `key` from the terminal field dictionary.
    pub(crate) fn delete(&mut self, key: &str) -> Result<()> {
        let r = self.reference();
        let dict = self
            .ctx
            .lookup_mut(r)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(r.id, r.gen))?;
        dict.remove(key);
        Ok(())
    }

    /// Raw `/Ff` value.
    pub fn flags(&self) -> u32 {
        self.get("Ff").and_then(Object::as_integer).unwrap_or(0) as u32
    }

    /// Replace `/Ff`.
    pub fn set_flags(&mut self, flags: u32) -> Result<()> {
        self.put("Ff", Object::Integer(flags as i64))?;
        self.mark_dirty();
        Ok(())
    }

    /// Set and clear `/Ff` bits in one step.
    pub(crate) fn update_flags(&mut self, set: u32, clear: u32) -> Result<()> {
        let flags = (self.flags() & !clear) | set;
        self.set_flags(flags)
    }

    fn common_flags(&self) -> FieldFlags {
        FieldFlags::from_bits_truncate(self.flags())
    }

    fn set_common_flag(&mut self, flag: FieldFlags, on: bool) -> Result<()> {
        if on {
            self.update_flags(flag.bits(), 0)
        } else {
            self.update_flags(0, flag.bits())
        }
    }

    /// Whether the read-only flag is set.
    pub fn is_read_only(&self) -> bool {
        self.common_flags().contains(FieldFlags::READ_ONLY)
    }

    /// Set or clear the read-only flag.
    pub fn set_read_only(&mut self, read_only: bool) -> Result<()> {
        self.set_common_flag(FieldFlags::READ_ONLY, read_only)
    }

    /// Whether the required flag is set.
    pub fn is_required(&self) -> bool {
        self.common_flags().contains(FieldFlags::REQUIRED)
    }

    /// Set or clear the required flag.
    pub fn set_required(&mut self, required: bool) -> Result<()> {
        self.set_common_flag(FieldFlags::REQUIRED, required)
    }

    /// Whether submit actions export the field.
    pub fn is_exported(&self) -> bool {
        !self.common_flags().contains(FieldFlags::NO_EXPORT)
    }

    /// Set or clear the no-export flag.
    pub fn set_exported(&mut self, exported: bool) -> Result<()> {
        self.set_common_flag(FieldFlags::NO_EXPORT, !exported)
    }

    /// The default appearance string: the field's own or inherited `/DA`,
    /// else the form's.
    pub fn default_appearance(&self) -> Option<String> {
        self.get("DA")
            .and_then(Object::as_string)
            .map(|da| String::from_utf8_lossy(da).into_owned())
            .or_else(|| self.form.default_appearance(self.ctx))
    }

    /// Replace `/DA` on the field.
    pub fn set_default_appearance(&mut self, da: &str) -> Result<()> {
        self.put("DA", Object::String(da.as_bytes().to_vec()))?;
        self.mark_dirty();
        Ok(())
    }

    /// Font size from the `Tf` operator of the default appearance. 0 means auto.
    pub fn font_size(&self) -> Option<f32> {
        self.default_appearance()
            .and_then(|da| DefaultAppearance::parse(&da).font_size)
    }

    /// Rewrite the size operand of the default appearance's `Tf` operator.
    ///
    /// Fails with [`Error::MissingFontSizeOperator`] when there is no
    /// default appearance or it has no `Tf`.
    pub fn set_font_size(&mut self, size: f32) -> Result<()> {
        let updated = self
            .default_appearance()
            .and_then(|da| DefaultAppearance::with_font_size(&da, size))
            .ok_or_else(|| Error::MissingFontSizeOperator {
                name: self.name().to_string(),
            })?;
        self.set_default_appearance(&updated)
    }

    /// Text alignment from `/Q` (inherited, then the form's, then left).
    pub fn alignment(&self) -> TextAlignment {
        self.get("Q")
            .and_then(Object::as_integer)
            .or_else(|| self.form.default_quadding(self.ctx))
            .map(TextAlignment::from_q)
            .unwrap_or_default()
    }

    /// Set `/Q`.
    pub fn set_alignment(&mut self, alignment: TextAlignment) -> Result<()> {
        self.put("Q", Object::Integer(alignment.q_value()))?;
        self.mark_dirty();
        Ok(())
    }

    /// Whether regeneration would draw this field.
    pub fn needs_appearance(&self) -> bool {
        self.field().needs_appearance(self.ctx)
    }

    /// Redraw every widget of this field with `font`, using `strategy` or the
    /// default one. Returns the number of widgets drawn.
    pub fn update_appearances(&mut self, font: FontHandle, strategy: Option<&AppearanceStrategy<'_>>) -> Result<usize> {
        self.form.regenerate(self.ctx, self.fonts, self.index, font, strategy, true)
    }

    fn expect_kind(&self, expected: &[FieldKind], label: &'static str) -> Result<()> {
        if expected.contains(&self.kind()) {
            Ok(())
        } else {
            Err(Error::FieldKindMismatch {
                name: self.name().to_string(),
                expected: label,
                found: self.kind().name(),
            })
        }
    }

    /// View as a text field.
    pub fn into_text(self) -> Result<TextField<'a>> {
        self.expect_kind(&[FieldKind::Text], FieldKind::Text.name())?;
        Ok(TextField::new(self))
    }

    /// View as a check box.
    pub fn into_check_box(self) -> Result<CheckBox<'a>> {
        self.expect_kind(&[FieldKind::CheckBox], FieldKind::CheckBox.name())?;
        Ok(CheckBox::new(self))
    }

    /// View as a radio group.
    pub fn into_radio_group(self) -> Result<RadioGroup<'a>> {
        self.expect_kind(&[FieldKind::RadioGroup], FieldKind::RadioGroup.name())?;
        Ok(RadioGroup::new(self))
    }

    /// View as a dropdown or option list.
    pub fn into_choice(self) -> Result<ChoiceField<'a>> {
        self.expect_kind(&[FieldKind::Dropdown, FieldKind::OptionList], "choice")?;
        Ok(ChoiceField::new(self))
    }

    /// View as a push button.
    pub fn into_push_button(self) -> Result<PushButton<'a>> {
        self.expect_kind(&[FieldKind::PushButton], FieldKind::PushButton.name())?;
        Ok(PushButton::new(self))
    }

    /// Whether a signature field holds a signature (`/V`).
    pub fn is_signed(&self) -> bool {
        self.kind() == FieldKind::Signature && self.get("V").is_some_and(|v| !v.is_null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Dict;

    #[test]
    fn test_detect_kinds() {
        assert_eq!(FieldKind::detect("Tx", 0), Some(FieldKind::Text));
        assert_eq!(FieldKind::detect("Btn", 0), Some(FieldKind::CheckBox));
        assert_eq!(FieldKind::detect("Btn", 1 << 16), Some(FieldKind::PushButton));
        assert_eq!(FieldKind::detect("Ch", 1 << 17), Some(FieldKind::Dropdown));
        assert_eq!(FieldKind::detect("Sig", 0), Some(FieldKind::Signature));
    }

    #[test]
    fn test_initial_flags_detect_back() {
        for kind in [
            FieldKind::Text,
            FieldKind::CheckBox,
            FieldKind::RadioGroup,
            FieldKind::Dropdown,
            FieldKind::OptionList,
            FieldKind::PushButton,
            FieldKind::Signature,
        ] {
            assert_eq!(FieldKind::detect(kind.field_type(), kind.initial_flags()), Some(kind));
        }
    }

    #[test]
    fn test_inherited_lookup_follows_parent() {
        let mut ctx = PdfContext::new();
        let mut parent = Dict::new();
        parent.insert("FT".to_string(), Object::name("Tx"));
        parent.insert("Ff".to_string(), Object::Integer(4096));
        let parent_ref = ctx.register(Object::Dictionary(parent));
        let mut child = Dict::new();
        child.insert("Parent".to_string(), Object::Reference(parent_ref));
        child.insert("Ff".to_string(), Object::Integer(2));
        let child_ref = ctx.register(Object::Dictionary(child));

        assert_eq!(inherited(&ctx, child_ref, "FT"), Some(&Object::name("Tx")));
        assert_eq!(inherited(&ctx, child_ref, "Ff"), Some(&Object::Integer(2)));
        assert_eq!(inherited(&ctx, child_ref, "V"), None);
    }

    #[test]
    fn test_inherited_lookup_terminates_on_cycle() {
        let mut ctx = PdfContext::new();
        let a = ctx.reserve();
        let b = ctx.reserve();
        let mut da = Dict::new();
        da.insert("Parent".to_string(), Object::Reference(b));
        let mut db = Dict::new();
        db.insert("Parent".to_string(), Object::Reference(a));
        ctx.assign(a, Object::Dictionary(da)).unwrap();
        ctx.assign(b, Object::Dictionary(db)).unwrap();
        assert_eq!(inherited(&ctx, a, "FT"), None);
    }
}
