//! Check boxes, radio groups and push buttons.

use super::dict_at_mut;
use super::field::FieldMut;
use super::flags::ButtonFieldFlags;
use crate::error::{Error, Result};
use crate::object::Object;
use std::ops::{Deref, DerefMut};

const OFF: &str = "Off";

macro_rules! field_view {
    ($name:ident) => {
        impl<'a> Deref for $name<'a> {
            type Target = FieldMut<'a>;

            fn deref(&self) -> &Self::Target {
                &self.inner
            }
        }

        impl DerefMut for $name<'_> {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.inner
            }
        }

        impl<'a> $name<'a> {
            pub(crate) fn new(inner: FieldMut<'a>) -> Self {
                Self { inner }
            }
        }
    };
}

pub(crate) use field_view;

/// On-state names of the widgets, in widget order.
fn widget_on_states(field: &FieldMut<'_>) -> Vec<Option<String>> {
    field
        .field()
        .widget_refs()
        .iter()
        .map(|w| field.form.widget_on_state(field.ctx, *w))
        .collect()
}

/// Set `/V` and make every widget's `/AS` agree with it.
fn set_state(field: &mut FieldMut<'_>, value: Option<&str>) -> Result<()> {
    let states = widget_on_states(field);
    field.put("V", Object::name(value.unwrap_or(OFF)))?;
    let widgets = field.field().widget_refs().to_vec();
    for (widget, on_state) in widgets.into_iter().zip(states) {
        let appearance_state = match (&on_state, value) {
            (Some(on), Some(value)) if on == value => on.as_str(),
            _ => OFF,
        };
        let dict = field
            .ctx
            .lookup_mut(widget)
            .and_then(Object::as_dict_mut)
            .ok_or(Error::ObjectNotFound(widget.id, widget.gen))?;
        dict.insert("AS".to_string(), Object::name(appearance_state));
    }
    field.mark_dirty();
    Ok(())
}

fn current_state(field: &FieldMut<'_>) -> Option<String> {
    field
        .get("V")
        .and_then(Object::as_name)
        .filter(|v| *v != OFF)
        .map(str::to_string)
}

/// A check box.
#[derive(Debug)]
pub struct CheckBox<'a> {
    inner: FieldMut<'a>,
}

field_view!(CheckBox);

impl CheckBox<'_> {
    /// The state name that means checked (from the widgets, default `Yes`).
    pub fn on_state(&self) -> String {
        widget_on_states(&self.inner)
            .into_iter()
            .flatten()
            .next()
            .unwrap_or_else(|| "Yes".to_string())
    }

    /// Whether the box is checked.
    pub fn is_checked(&self) -> bool {
        current_state(&self.inner).is_some()
    }

    /// Check the box.
    pub fn check(&mut self) -> Result<()> {
        let on = self.on_state();
        set_state(&mut self.inner, Some(&on))
    }

    /// Uncheck the box.
    pub fn uncheck(&mut self) -> Result<()> {
        set_state(&mut self.inner, None)
    }
}

/// A group of radio buttons; each widget is one option.
#[derive(Debug)]
pub struct RadioGroup<'a> {
    inner: FieldMut<'a>,
}

field_view!(RadioGroup);

impl RadioGroup<'_> {
    /// Option names: the widgets' on states, without repeats.
    pub fn options(&self) -> Vec<String> {
        let mut options: Vec<String> = Vec::new();
        for state in widget_on_states(&self.inner).into_iter().flatten() {
            if !options.contains(&state) {
                options.push(state);
            }
        }
        options
    }

    /// Turn on the buttons whose on state is `option`.
    ///
    /// Fails with [`Error::InvalidOption`] for names no widget offers.
    pub fn select(&mut self, option: &str) -> Result<()> {
        if !self.options().iter().any(|o| o == option) {
            return Err(Error::InvalidOption {
                name: self.name().to_string(),
                value: option.to_string(),
            });
        }
        set_state(&mut self.inner, Some(option))
    }

    /// The selected option.
    pub fn selected(&self) -> Option<String> {
        current_state(&self.inner)
    }

    /// Turn every button off.
    pub fn clear(&mut self) -> Result<()> {
        set_state(&mut self.inner, None)
    }

    /// Whether one button must always stay on.
    pub fn is_off_toggleable(&self) -> bool {
        !ButtonFieldFlags::from_bits_retain(self.flags()).contains(ButtonFieldFlags::NO_TOGGLE_TO_OFF)
    }
}

/// A push button.
#[derive(Debug)]
pub struct PushButton<'a> {
    inner: FieldMut<'a>,
}

field_view!(PushButton);

impl PushButton<'_> {
    /// Caption of the first widget.
    pub fn caption(&self) -> Option<String> {
        self.widgets().into_iter().find_map(|w| w.caption().map(str::to_string))
    }

    /// Set the caption (`/MK /CA`) of every widget.
    pub fn set_caption(&mut self, caption: &str) -> Result<()> {
        let widgets = self.field().widget_refs().to_vec();
        for widget in widgets {
            let mk = dict_at_mut(self.inner.ctx, widget, &["MK"])
                .ok_or(Error::ObjectNotFound(widget.id, widget.gen))?;
            mk.insert("CA".to_string(), Object::text(caption));
        }
        self.mark_dirty();
        Ok(())
    }
}
