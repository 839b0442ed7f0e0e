//! Dropdowns and option lists.

use super::appearance::option_texts;
use super::button::field_view;
use super::field::{FieldKind, FieldMut};
use super::flags::ChoiceFieldFlags;
use crate::error::{Error, Result};
use crate::object::Object;
use std::ops::{Deref, DerefMut};

/// A dropdown (combo box) or option list (list box).
#[derive(Debug)]
pub struct ChoiceField<'a> {
    inner: FieldMut<'a>,
}

field_view!(ChoiceField);

impl ChoiceField<'_> {
    /// Choice field flags.
    pub fn choice_flags(&self) -> ChoiceFieldFlags {
        ChoiceFieldFlags::from_bits_retain(self.flags())
    }

    /// Whether this is a dropdown.
    pub fn is_dropdown(&self) -> bool {
        self.kind() == FieldKind::Dropdown
    }

    /// (export value, display text) pairs from `/Opt`.
    fn option_pairs(&self) -> Vec<(String, String)> {
        self.get("Opt")
            .map(|opt| option_texts(self.inner.ctx, opt))
            .unwrap_or_default()
    }

    /// Option display texts.
    pub fn options(&self) -> Vec<String> {
        self.option_pairs().into_iter().map(|(_, display)| display).collect()
    }

    /// Replace the options.
    pub fn set_options(&mut self, options: &[&str]) -> Result<()> {
        let opt = options.iter().map(|o| Object::text(o)).collect();
        self.put("Opt", Object::Array(opt))?;
        self.mark_dirty();
        Ok(())
    }

    /// Whether a dropdown accepts typed values.
    pub fn is_editable(&self) -> bool {
        self.choice_flags().contains(ChoiceFieldFlags::EDIT)
    }

    /// Set or clear the edit flag.
    pub fn set_editable(&mut self, editable: bool) -> Result<()> {
        self.set_choice_flag(ChoiceFieldFlags::EDIT, editable)
    }

    /// Whether several options may be selected.
    pub fn is_multi_select(&self) -> bool {
        self.choice_flags().contains(ChoiceFieldFlags::MULTI_SELECT)
    }

    /// Set or clear the multi-select flag.
    pub fn set_multi_select(&mut self, multi: bool) -> Result<()> {
        self.set_choice_flag(ChoiceFieldFlags::MULTI_SELECT, multi)
    }

    fn set_choice_flag(&mut self, flag: ChoiceFieldFlags, on: bool) -> Result<()> {
        if on {
            self.update_flags(flag.bits(), 0)
        } else {
            self.update_flags(0, flag.bits())
        }
    }

    /// Selected values.
    pub fn selected(&self) -> Vec<String> {
        let text = |v: &Object| v.as_text().or_else(|| v.as_name().map(str::to_string));
        match self.get("V") {
            Some(Object::Array(values)) => values.iter().filter_map(text).collect(),
            Some(value) => text(value).into_iter().collect(),
            None => Vec::new(),
        }
    }

    /// Select `values`; an empty slice clears the selection.
    ///
    /// Every value must be an option (export value or display text) unless
    /// the field is an editable dropdown, and more than one value needs the
    /// multi-select flag. Fails with [`Error::InvalidOption`] otherwise.
    pub fn select(&mut self, values: &[&str]) -> Result<()> {
        if values.len() > 1 && !self.is_multi_select() {
            return Err(Error::InvalidOption {
                name: self.name().to_string(),
                value: values.join(", "),
            });
        }
        let pairs = self.option_pairs();
        let free_text = self.is_dropdown() && self.is_editable();
        let mut exports = Vec::with_capacity(values.len());
        for value in values {
            match pairs.iter().find(|(export, display)| export == value || display == value) {
                Some((export, _)) => exports.push(export.clone()),
                None if free_text => exports.push(value.to_string()),
                None => {
                    return Err(Error::InvalidOption {
                        name: self.name().to_string(),
                        value: value.to_string(),
                    })
                },
            }
        }

        match exports.as_slice() {
            [] => self.delete("V")?,
            [single] => self.put("V", Object::text(single))?,
            many => self.put("V", Object::Array(many.iter().map(|v| Object::text(v)).collect()))?,
        }
        self.delete("I")?;
        self.mark_dirty();
        Ok(())
    }

    /// Clear the selection.
    pub fn clear(&mut self) -> Result<()> {
        self.select(&[])
    }
}
