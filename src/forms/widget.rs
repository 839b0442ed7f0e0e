//! Widget annotations: the on-page placements of a field.

use crate::context::PdfContext;
use crate::fonts::FontHandle;
use crate::geometry::{Color, Rect};
use crate::object::{Dict, Object, ObjectRef};

/// Handle to a widget annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetHandle(pub(crate) ObjectRef);

impl WidgetHandle {
    /// The widget annotation dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.0
    }
}

/// A widget as read from its annotation dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Widget {
    reference: ObjectRef,
    rect: Rect,
    page: Option<ObjectRef>,
    border_width: f32,
    border_color: Option<Color>,
    background_color: Option<Color>,
    caption: Option<String>,
    on_state: Option<String>,
    has_normal_appearance: bool,
}

impl Widget {
    /// Read the widget at `reference`; `None` if it is not a dictionary.
    pub(crate) fn read(ctx: &PdfContext, reference: ObjectRef) -> Option<Self> {
        let dict = ctx.lookup(reference)?.as_dict()?;
        let get = |key: &str| dict.get(key).and_then(|v| ctx.resolve(v));

        let rect = get("Rect").and_then(Rect::from_object).unwrap_or(Rect::new(0.0, 0.0, 0.0, 0.0));
        let mk = get("MK").and_then(Object::as_dict);
        let mk_get = |key: &str| mk.and_then(|mk| mk.get(key)).and_then(|v| ctx.resolve(v));

        let border_width = get("BS")
            .and_then(Object::as_dict)
            .and_then(|bs| bs.get("W"))
            .and_then(|w| ctx.resolve(w))
            .and_then(Object::as_number)
            .or_else(|| {
                get("Border")
                    .and_then(Object::as_array)
                    .and_then(|border| border.get(2))
                    .and_then(Object::as_number)
            })
            .unwrap_or(1.0) as f32;

        let normal = get("AP")
            .and_then(Object::as_dict)
            .and_then(|ap| ap.get("N"))
            .and_then(|n| ctx.resolve(n));
        let on_state = match normal {
            Some(Object::Dictionary(states)) => {
                let mut names: Vec<&String> = states.keys().filter(|k| k.as_str() != "Off").collect();
                names.sort();
                names.first().map(|name| name.to_string())
            },
            _ => None,
        }
        .or_else(|| {
            get("AS")
                .and_then(Object::as_name)
                .filter(|state| *state != "Off")
                .map(str::to_string)
        });

        Some(Self {
            reference,
            rect,
            page: dict.get("P").and_then(Object::as_reference),
            border_width,
            border_color: mk_get("BC").and_then(Color::from_object),
            background_color: mk_get("BG").and_then(Color::from_object),
            caption: mk_get("CA").and_then(Object::as_text),
            on_state,
            has_normal_appearance: normal.is_some(),
        })
    }

    /// The annotation dictionary.
    pub fn reference(&self) -> ObjectRef {
        self.reference
    }

    /// Placement on the page.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Page the widget declares with `/P`.
    pub fn page(&self) -> Option<ObjectRef> {
        self.page
    }

    /// Border width from `/BS /W` (default 1).
    pub fn border_width(&self) -> f32 {
        self.border_width
    }

    /// Border color from `/MK /BC`; `None` is transparent.
    pub fn border_color(&self) -> Option<Color> {
        self.border_color
    }

    /// Background color from `/MK /BG`; `None` is transparent.
    pub fn background_color(&self) -> Option<Color> {
        self.background_color
    }

    /// Caption from `/MK /CA`.
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    /// Name of the appearance state that means "on", for check boxes and radios.
    pub fn on_state(&self) -> Option<&str> {
        self.on_state.as_deref()
    }

    pub(crate) fn set_on_state(&mut self, state: String) {
        self.on_state = Some(state);
    }

    /// Whether `/AP /N` is present.
    pub fn has_normal_appearance(&self) -> bool {
        self.has_normal_appearance
    }
}

/// Placement and look of a new widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetOptions {
    /// Placement on the page
    pub rect: Rect,
    /// Border width (default 1)
    pub border_width: f32,
    /// Border color (default black)
    pub border_color: Option<Color>,
    /// Background color (default white)
    pub background_color: Option<Color>,
    /// Caption for push buttons
    pub caption: Option<String>,
    /// On-state name for check boxes (default `Yes`) and radio buttons
    /// (default `Option<n>`)
    pub on_state: Option<String>,
}

impl WidgetOptions {
    /// Options with the defaults and `rect`.
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            border_width: 1.0,
            border_color: Some(Color::black()),
            background_color: Some(Color::white()),
            caption: None,
            on_state: None,
        }
    }

    /// Set the border.
    pub fn border(mut self, width: f32, color: Option<Color>) -> Self {
        self.border_width = width;
        self.border_color = color;
        self
    }

    /// Set the background.
    pub fn background(mut self, color: Option<Color>) -> Self {
        self.background_color = color;
        self
    }

    /// Set the caption.
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Set the on-state name.
    pub fn on_state(mut self, state: impl Into<String>) -> Self {
        self.on_state = Some(state.into());
        self
    }

    /// Build the annotation dictionary. `/Parent` is added by the caller.
    pub(crate) fn to_dict(&self, page: ObjectRef) -> Dict {
        let mut dict = Dict::new();
        dict.insert("Type".to_string(), Object::name("Annot"));
        dict.insert("Subtype".to_string(), Object::name("Widget"));
        dict.insert("Rect".to_string(), self.rect.to_object());
        dict.insert("P".to_string(), Object::Reference(page));
        // Print
        dict.insert("F".to_string(), Object::Integer(4));

        let mut bs = Dict::new();
        bs.insert("W".to_string(), Object::number(self.border_width as f64));
        bs.insert("S".to_string(), Object::name("S"));
        dict.insert("BS".to_string(), Object::Dictionary(bs));

        let mut mk = Dict::new();
        if let Some(color) = self.border_color {
            mk.insert("BC".to_string(), color.to_object());
        }
        if let Some(color) = self.background_color {
            mk.insert("BG".to_string(), color.to_object());
        }
        if let Some(caption) = &self.caption {
            mk.insert("CA".to_string(), Object::text(caption));
        }
        if !mk.is_empty() {
            dict.insert("MK".to_string(), Object::Dictionary(mk));
        }
        dict
    }
}

/// Look of the widget created by
/// [`TextField::add_to_page`](crate::forms::TextField::add_to_page).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFieldAppearanceOptions {
    /// Placement on the page
    pub rect: Rect,
    /// Border width (default 1)
    pub border_width: f32,
    /// Border color (default black)
    pub border_color: Option<Color>,
    /// Background color (default white)
    pub background_color: Option<Color>,
    /// Text color (default black)
    pub text_color: Color,
    /// Font size; 0 fits the text to the widget (default 0)
    pub font_size: f32,
    /// Font; the form's default font when `None`
    pub font: Option<FontHandle>,
}

impl TextFieldAppearanceOptions {
    /// Options with the defaults and `rect`.
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            border_width: 1.0,
            border_color: Some(Color::black()),
            background_color: Some(Color::white()),
            text_color: Color::black(),
            font_size: 0.0,
            font: None,
        }
    }

    pub(crate) fn widget_options(&self) -> WidgetOptions {
        WidgetOptions::new(self.rect)
            .border(self.border_width, self.border_color)
            .background(self.background_color)
    }
}
