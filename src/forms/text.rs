//! Text fields.

use super::appearance::DefaultAppearance;
use super::field::FieldMut;
use super::flags::TextFieldFlags;
use super::widget::{TextFieldAppearanceOptions, WidgetHandle};
use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use std::ops::{Deref, DerefMut};

/// A text field.
///
/// Shared capabilities (flags, alignment, font size) come from [`FieldMut`]
/// through `Deref`.
#[derive(Debug)]
pub struct TextField<'a> {
    inner: FieldMut<'a>,
}

impl<'a> Deref for TextField<'a> {
    type Target = FieldMut<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for TextField<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<'a> TextField<'a> {
    pub(crate) fn new(inner: FieldMut<'a>) -> Self {
        Self { inner }
    }

    /// Text field flags.
    pub fn text_flags(&self) -> TextFieldFlags {
        TextFieldFlags::from_bits_retain(self.flags())
    }

    fn set_text_flag(&mut self, flag: TextFieldFlags, on: bool) -> Result<()> {
        if on {
            self.update_flags(flag.bits(), 0)
        } else {
            self.update_flags(0, flag.bits())
        }
    }

    fn value_len(&self) -> usize {
        self.get("V")
            .and_then(Object::as_text)
            .map(|v| v.chars().count())
            .unwrap_or(0)
    }

    /// The value: `None` when unset, `Some("")` when set to the empty string.
    ///
    /// Fails with [`Error::RichTextUnsupported`] for rich text fields.
    pub fn get_text(&self) -> Result<Option<String>> {
        if self.text_flags().contains(TextFieldFlags::RICH_TEXT) {
            return Err(Error::RichTextUnsupported {
                name: self.name().to_string(),
            });
        }
        Ok(self.get("V").and_then(Object::as_text))
    }

    /// Store a value, or remove it with `None`.
    ///
    /// Removing a value that a parent node still supplies stores the empty
    /// string instead, so `get_text` then returns `Some("")`.
    ///
    /// Fails with [`Error::MaxLengthExceeded`] when the value is longer than
    /// `/MaxLen`. Clears the rich text flag and `/RV`.
    pub fn set_text(&mut self, text: Option<&str>) -> Result<()> {
        if let (Some(text), Some(max)) = (text, self.max_length()) {
            let len = text.chars().count();
            if len > max as usize {
                return Err(Error::MaxLengthExceeded {
                    name: self.name().to_string(),
                    len,
                    max: max as usize,
                });
            }
        }

        if self.text_flags().contains(TextFieldFlags::RICH_TEXT) {
            self.update_flags(0, TextFieldFlags::RICH_TEXT.bits())?;
        }
        self.delete("RV")?;
        match text {
            Some(text) => self.put("V", Object::text(text))?,
            None => {
                self.delete("V")?;
                if self.get("V").is_some() {
                    self.put("V", Object::text(""))?;
                }
            },
        }
        self.mark_dirty();
        Ok(())
    }

    /// `/MaxLen`, if any.
    pub fn max_length(&self) -> Option<u32> {
        self.get("MaxLen")
            .and_then(Object::as_integer)
            .map(|n| n.max(0) as u32)
    }

    /// Set or remove `/MaxLen`.
    ///
    /// Fails with [`Error::InvalidMaxLength`], leaving the field unchanged,
    /// when the current value is longer than `max`.
    pub fn set_max_length(&mut self, max: Option<u32>) -> Result<()> {
        match max {
            Some(max) => {
                let len = self.value_len();
                if len > max as usize {
                    return Err(Error::InvalidMaxLength {
                        name: self.name().to_string(),
                        len,
                        max: max as usize,
                    });
                }
                self.put("MaxLen", Object::Integer(max as i64))?;
            },
            None => self.delete("MaxLen")?,
        }
        self.mark_dirty();
        Ok(())
    }

    /// Whether the comb flag is set.
    pub fn is_comb(&self) -> bool {
        self.text_flags().contains(TextFieldFlags::COMB)
    }

    /// Turn comb mode on or off.
    ///
    /// Comb fields cannot be multiline, password or file-select fields, so
    /// enabling comb clears those flags. Comb needs a max length; without
    /// one the flag is still set and a warning is logged.
    pub fn set_comb(&mut self, comb: bool) -> Result<()> {
        if !comb {
            return self.set_text_flag(TextFieldFlags::COMB, false);
        }
        if self.max_length().is_none() {
            log::warn!("Comb enabled on field '{}' without a max length", self.name());
        }
        let clear = TextFieldFlags::MULTILINE | TextFieldFlags::PASSWORD | TextFieldFlags::FILE_SELECT;
        self.update_flags(TextFieldFlags::COMB.bits(), clear.bits())
    }

    /// Whether the value may span lines.
    pub fn is_multiline(&self) -> bool {
        self.text_flags().contains(TextFieldFlags::MULTILINE)
    }

    /// Set or clear the multiline flag.
    pub fn set_multiline(&mut self, multiline: bool) -> Result<()> {
        self.set_text_flag(TextFieldFlags::MULTILINE, multiline)
    }

    /// Whether the value is masked.
    pub fn is_password(&self) -> bool {
        self.text_flags().contains(TextFieldFlags::PASSWORD)
    }

    /// Set or clear the password flag.
    pub fn set_password(&mut self, password: bool) -> Result<()> {
        self.set_text_flag(TextFieldFlags::PASSWORD, password)
    }

    /// Whether the value is a file path.
    pub fn is_file_select(&self) -> bool {
        self.text_flags().contains(TextFieldFlags::FILE_SELECT)
    }

    /// Set or clear the file-select flag.
    pub fn set_file_select(&mut self, file_select: bool) -> Result<()> {
        self.set_text_flag(TextFieldFlags::FILE_SELECT, file_select)
    }

    /// Whether viewers spell check the value.
    pub fn is_spell_checked(&self) -> bool {
        !self.text_flags().contains(TextFieldFlags::DO_NOT_SPELL_CHECK)
    }

    /// Enable or disable spell checking.
    pub fn set_spell_check(&mut self, spell_check: bool) -> Result<()> {
        self.set_text_flag(TextFieldFlags::DO_NOT_SPELL_CHECK, !spell_check)
    }

    /// Whether viewers scroll text past the visible area.
    pub fn is_scrollable(&self) -> bool {
        !self.text_flags().contains(TextFieldFlags::DO_NOT_SCROLL)
    }

    /// Enable or disable scrolling.
    pub fn set_scroll(&mut self, scroll: bool) -> Result<()> {
        self.set_text_flag(TextFieldFlags::DO_NOT_SCROLL, !scroll)
    }

    /// Whether the value is rich text.
    pub fn is_rich_text(&self) -> bool {
        self.text_flags().contains(TextFieldFlags::RICH_TEXT)
    }

    /// Add one widget on `page` and draw it right away.
    ///
    /// The field's `/DA` is rewritten to the chosen font, size and text
    /// color. The field is `Clean` afterwards.
    pub fn add_to_page(&mut self, page: ObjectRef, options: &TextFieldAppearanceOptions) -> Result<WidgetHandle> {
        let font = match options.font {
            Some(font) => font,
            None => self.inner.form.default_font(self.inner.ctx, self.inner.fonts),
        };
        let resource_name = self
            .inner
            .fonts
            .get(font)
            .map(|f| f.resource_name().to_string())
            .ok_or_else(|| Error::Font(format!("unknown font handle {:?}", font)))?;

        let da = DefaultAppearance::compose(&resource_name, options.font_size, options.text_color);
        self.set_default_appearance(&da)?;

        let inner = &mut self.inner;
        let widget = inner
            .form
            .add_widget(inner.ctx, inner.index, page, &options.widget_options())?;
        inner
            .form
            .regenerate(inner.ctx, inner.fonts, inner.index, font, None, true)?;
        Ok(widget)
    }
}
