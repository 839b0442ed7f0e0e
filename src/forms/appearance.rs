//! Appearance streams for widgets.
//!
//! Regeneration hands a snapshot of the field ([`FieldAppearance`]), the widget
//! and a font to a strategy, and stores whatever content the strategy returns
//! as the widget's Normal appearance. [`default_appearance`] is the strategy
//! used when the caller supplies none.

use super::field::{inherited, Field, FieldKind};
use super::flags::{TextAlignment, TextFieldFlags};
use super::widget::Widget;
use super::PdfForm;
use crate::context::PdfContext;
use crate::error::{Error, Result};
use crate::fonts::PdfFont;
use crate::geometry::{Color, Rect};
use crate::object::{Dict, Object, ObjectRef};
use crate::writer::{format_real, ContentBuilder};
use lazy_static::lazy_static;
use regex::Regex;

/// Gap between the border and the text.
const PADDING: f32 = 2.0;
const MIN_FONT_SIZE: f32 = 4.0;
/// Auto-sized multiline and list text never grows beyond this.
const MAX_AUTO_BLOCK_FONT_SIZE: f32 = 12.0;
const CHECK_MARK: char = '4';
const RADIO_DOT: char = 'l';
const SELECTION_HIGHLIGHT: Color = Color::Rgb(0.6, 0.757, 0.855);

lazy_static! {
    /// `/Font size Tf` in a default appearance string
    static ref RE_TF: Regex =
        Regex::new(r"(/[^\s/\[\]()<>{}%]+\s+)([+-]?(?:\d+\.?\d*|\.\d+))(\s+Tf)").unwrap();
}

/// Parts of a default appearance (`/DA`) string.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct DefaultAppearance {
    pub font: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<Color>,
}

impl DefaultAppearance {
    /// Pick the font, size and fill color out of a `/DA` string. Later
    /// operators win.
    pub fn parse(da: &str) -> Self {
        let tokens: Vec<&str> = da.split_whitespace().collect();
        let number = |i: usize| tokens.get(i).and_then(|t| t.parse::<f32>().ok());
        let mut parsed = Self::default();
        for (i, token) in tokens.iter().enumerate() {
            match *token {
                "Tf" if i >= 2 => {
                    parsed.font = tokens[i - 2].strip_prefix('/').map(str::to_string);
                    parsed.font_size = number(i - 1);
                },
                "g" if i >= 1 => parsed.color = number(i - 1).map(Color::Gray).or(parsed.color),
                "rg" if i >= 3 => {
                    if let (Some(r), Some(g), Some(b)) = (number(i - 3), number(i - 2), number(i - 1)) {
                        parsed.color = Some(Color::Rgb(r, g, b));
                    }
                },
                "k" if i >= 4 => {
                    if let (Some(c), Some(m), Some(y), Some(k)) =
                        (number(i - 4), number(i - 3), number(i - 2), number(i - 1))
                    {
                        parsed.color = Some(Color::Cmyk(c, m, y, k));
                    }
                },
                _ => {},
            }
        }
        parsed
    }

    /// `da` with the size operand of its first `Tf` replaced; `None` without `Tf`.
    pub fn with_font_size(da: &str, size: f32) -> Option<String> {
        if !RE_TF.is_match(da) {
            return None;
        }
        let replaced = RE_TF.replace(da, |caps: &regex::Captures| {
            format!("{}{}{}", &caps[1], format_real(size as f64), &caps[3])
        });
        Some(replaced.into_owned())
    }

    /// A `/DA` string selecting `font` at `size` in `color`.
    pub fn compose(font: &str, size: f32, color: Color) -> String {
        let components: Vec<String> = color.components().iter().map(|c| format_real(*c as f64)).collect();
        let operator = match color {
            Color::Gray(_) => "g",
            Color::Rgb(..) => "rg",
            Color::Cmyk(..) => "k",
        };
        format!("/{} {} Tf {} {}", font, format_real(size as f64), components.join(" "), operator)
    }
}

/// What an appearance strategy knows about a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAppearance {
    /// Qualified name
    pub name: String,
    /// Field kind
    pub kind: FieldKind,
    /// Text value, the first selected choice, or the button state name
    pub value: Option<String>,
    /// Selected choices
    pub selected: Vec<String>,
    /// Choice options (display text)
    pub options: Vec<String>,
    /// Variable text alignment
    pub alignment: TextAlignment,
    /// Font size from the default appearance; 0 means fit to the widget
    pub font_size: f32,
    /// Text color from the default appearance
    pub text_color: Color,
    /// Raw `/Ff`
    pub flags: u32,
    /// `/MaxLen`
    pub max_length: Option<u32>,
}

impl FieldAppearance {
    /// Snapshot `field` for drawing.
    pub(crate) fn capture(ctx: &PdfContext, form: &PdfForm, field: &Field) -> Self {
        let get = |key: &str| inherited(ctx, field.reference(), key);

        let da = get("DA")
            .and_then(Object::as_string)
            .map(|da| String::from_utf8_lossy(da).into_owned())
            .or_else(|| form.default_appearance(ctx))
            .map(|da| DefaultAppearance::parse(&da))
            .unwrap_or_default();

        let selected: Vec<String> = match field.kind() {
            FieldKind::Dropdown | FieldKind::OptionList => match get("V") {
                Some(Object::Array(values)) => values.iter().filter_map(|v| choice_text(ctx, v)).collect(),
                Some(value) => choice_text(ctx, value).into_iter().collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        };
        let value = match field.kind() {
            FieldKind::Text => get("V").and_then(Object::as_text),
            FieldKind::CheckBox | FieldKind::RadioGroup => get("V").and_then(Object::as_name).map(str::to_string),
            FieldKind::Dropdown | FieldKind::OptionList => selected.first().cloned(),
            FieldKind::PushButton | FieldKind::Signature => None,
        };
        let options = get("Opt").map(|opt| option_texts(ctx, opt).into_iter().map(|(_, d)| d).collect());

        Self {
            name: field.name().to_string(),
            kind: field.kind(),
            value,
            selected,
            options: options.unwrap_or_default(),
            alignment: get("Q")
                .and_then(Object::as_integer)
                .or_else(|| form.default_quadding(ctx))
                .map(TextAlignment::from_q)
                .unwrap_or_default(),
            font_size: da.font_size.unwrap_or(0.0).max(0.0),
            text_color: da.color.unwrap_or(Color::black()),
            flags: get("Ff").and_then(Object::as_integer).unwrap_or(0) as u32,
            max_length: get("MaxLen").and_then(Object::as_integer).map(|n| n.max(0) as u32),
        }
    }

    /// Text field flags.
    pub fn text_flags(&self) -> TextFieldFlags {
        TextFieldFlags::from_bits_retain(self.flags)
    }

    /// The value as displayed: masked for password fields.
    pub fn display_text(&self) -> String {
        let value = self.value.clone().unwrap_or_default();
        if self.kind == FieldKind::Text && self.text_flags().contains(TextFieldFlags::PASSWORD) {
            "*".repeat(value.chars().count())
        } else {
            value
        }
    }
}

/// Text of a choice value or option entry.
fn choice_text(ctx: &PdfContext, value: &Object) -> Option<String> {
    let value = ctx.resolve(value)?;
    value.as_text().or_else(|| value.as_name().map(str::to_string))
}

/// `/Opt` entries as (export value, display text) pairs.
pub(crate) fn option_texts(ctx: &PdfContext, opt: &Object) -> Vec<(String, String)> {
    let Some(entries) = opt.as_array() else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match ctx.resolve(entry)? {
            Object::Array(pair) if pair.len() >= 2 => {
                let export = choice_text(ctx, &pair[0])?;
                let display = choice_text(ctx, &pair[1]).unwrap_or_else(|| export.clone());
                Some((export, display))
            },
            other => choice_text(ctx, other).map(|text| (text.clone(), text)),
        })
        .collect()
}

/// Content produced by a strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Appearance {
    /// One Normal stream
    Single(Vec<u8>),
    /// One Normal stream per appearance state, e.g. `Yes` and `Off`
    States(Vec<(String, Vec<u8>)>),
}

/// A function that draws one widget of a field.
pub type AppearanceStrategy<'s> = dyn Fn(&FieldAppearance, &Widget, &PdfFont) -> Result<Appearance> + 's;

/// The built-in strategy.
///
/// Draws the widget's background and border from `/MK`, then the value:
/// comb fields one character per cell, multiline fields word-wrapped,
/// password fields masked, and size 0 fitted to the widget. Check boxes and
/// radio buttons get an on state (ZapfDingbats `4` or `l` in `font`) and an
/// `Off` state.
pub fn default_appearance(field: &FieldAppearance, widget: &Widget, font: &PdfFont) -> Result<Appearance> {
    match field.kind {
        FieldKind::Text => text_appearance(field, widget, font),
        FieldKind::Dropdown => {
            let mut builder = frame(widget, false);
            let text = field.value.clone().unwrap_or_default();
            builder.marked_text(single_line_content(field, widget, font, &text)?);
            Ok(Appearance::Single(builder.build()))
        },
        FieldKind::OptionList => list_appearance(field, widget, font),
        FieldKind::CheckBox => toggle_appearance(field, widget, font, CHECK_MARK, false),
        FieldKind::RadioGroup => toggle_appearance(field, widget, font, RADIO_DOT, true),
        FieldKind::PushButton => {
            let mut builder = frame(widget, false);
            let caption = widget.caption().unwrap_or_default().to_string();
            let centered = FieldAppearance {
                alignment: TextAlignment::Center,
                ..field.clone()
            };
            builder.marked_text(single_line_content(&centered, widget, font, &caption)?);
            Ok(Appearance::Single(builder.build()))
        },
        FieldKind::Signature => Ok(Appearance::Single(frame(widget, false).build())),
    }
}

/// Background and border.
fn frame(widget: &Widget, round: bool) -> ContentBuilder {
    let rect = widget.rect();
    let (width, height) = (rect.width, rect.height);
    let border = widget.border_width();
    let mut builder = ContentBuilder::new();
    if round {
        let (cx, cy) = (width / 2.0, height / 2.0);
        let radius = width.min(height) / 2.0;
        if let Some(color) = widget.background_color() {
            builder.fill_color(color).circle(cx, cy, radius).fill();
        }
        if let Some(color) = widget.border_color().filter(|_| border > 0.0) {
            builder
                .stroke_color(color)
                .set_line_width(border)
                .circle(cx, cy, (radius - border / 2.0).max(0.0))
                .stroke();
        }
    } else {
        if let Some(color) = widget.background_color() {
            builder.fill_color(color).rect(Rect::new(0.0, 0.0, width, height)).fill();
        }
        if let Some(color) = widget.border_color().filter(|_| border > 0.0) {
            builder
                .stroke_color(color)
                .set_line_width(border)
                .rect(Rect::new(border / 2.0, border / 2.0, width - border, height - border))
                .stroke();
        }
    }
    builder
}

/// Area text is laid out in.
fn text_area(widget: &Widget) -> Rect {
    let rect = widget.rect();
    let inset = widget.border_width() + PADDING;
    Rect::new(
        inset,
        inset,
        (rect.width - 2.0 * inset).max(0.0),
        (rect.height - 2.0 * inset).max(0.0),
    )
}

/// Clip to the inside of the border.
fn clip_to_border(builder: &mut ContentBuilder, widget: &Widget) {
    let rect = widget.rect();
    let border = widget.border_width();
    builder
        .rect(Rect::new(
            border,
            border,
            (rect.width - 2.0 * border).max(0.0),
            (rect.height - 2.0 * border).max(0.0),
        ))
        .clip();
}

fn aligned_x(area: Rect, text_width: f32, alignment: TextAlignment) -> f32 {
    match alignment {
        TextAlignment::Left => area.x,
        TextAlignment::Center => area.x + (area.width - text_width) / 2.0,
        TextAlignment::Right => area.right() - text_width,
    }
}

/// Baseline that centers a line of `size` vertically in `area`.
fn centered_baseline(font: &PdfFont, area: Rect, size: f32) -> f32 {
    area.y + (area.height - font.height_at_size(size)) / 2.0 - font.descent(size)
}

/// Largest size at which `text` fits on one line of `area`.
fn fit_single_line(font: &PdfFont, text: &str, area: Rect) -> f32 {
    let mut size = font.size_at_height(area.height);
    let width = font.measure(text, 1.0);
    if width > 0.0 {
        size = size.min(area.width / width);
    }
    size.max(MIN_FONT_SIZE)
}

fn text_appearance(field: &FieldAppearance, widget: &Widget, font: &PdfFont) -> Result<Appearance> {
    let flags = field.text_flags();
    let mut builder = frame(widget, false);
    let comb_cells = field.max_length.filter(|n| *n > 0 && flags.contains(TextFieldFlags::COMB));

    let content = if let Some(cells) = comb_cells {
        draw_comb_dividers(&mut builder, widget, cells);
        comb_content(field, widget, font, cells as usize)?
    } else if flags.contains(TextFieldFlags::MULTILINE) {
        multiline_content(field, widget, font)?
    } else {
        single_line_content(field, widget, font, &field.display_text())?
    };
    builder.marked_text(content);
    Ok(Appearance::Single(builder.build()))
}

fn single_line_content(field: &FieldAppearance, widget: &Widget, font: &PdfFont, text: &str) -> Result<ContentBuilder> {
    let mut content = ContentBuilder::new();
    clip_to_border(&mut content, widget);
    if text.is_empty() {
        return Ok(content);
    }
    let area = text_area(widget);
    let size = if field.font_size > 0.0 {
        field.font_size
    } else {
        fit_single_line(font, text, area)
    };
    let x = aligned_x(area, font.measure(text, size), field.alignment);
    content
        .begin_text()
        .fill_color(field.text_color)
        .set_font(font.resource_name(), size)
        .move_text(x, centered_baseline(font, area, size));
    font.show_text(&mut content, text)?;
    content.end_text();
    Ok(content)
}

fn draw_comb_dividers(builder: &mut ContentBuilder, widget: &Widget, cells: u32) {
    let Some(color) = widget.border_color() else {
        return;
    };
    let rect = widget.rect();
    let border = widget.border_width();
    let cell_width = (rect.width - 2.0 * border) / cells as f32;
    builder.stroke_color(color).set_line_width(border.max(0.5));
    for i in 1..cells {
        let x = border + i as f32 * cell_width;
        builder.move_to(x, border).line_to(x, rect.height - border);
    }
    builder.stroke();
}

fn comb_content(field: &FieldAppearance, widget: &Widget, font: &PdfFont, cells: usize) -> Result<ContentBuilder> {
    let mut content = ContentBuilder::new();
    clip_to_border(&mut content, widget);
    let text = field.display_text();
    if text.is_empty() {
        return Ok(content);
    }

    let rect = widget.rect();
    let border = widget.border_width();
    let area = text_area(widget);
    let cell_width = (rect.width - 2.0 * border) / cells as f32;
    let size = if field.font_size > 0.0 {
        field.font_size
    } else {
        let widest = text.chars().map(|ch| font.char_width(ch)).fold(0.0, f32::max);
        let mut size = font.size_at_height(area.height);
        if widest > 0.0 {
            size = size.min((cell_width - PADDING) * 1000.0 / widest);
        }
        size.max(MIN_FONT_SIZE)
    };
    let baseline = centered_baseline(font, area, size);

    content
        .begin_text()
        .fill_color(field.text_color)
        .set_font(font.resource_name(), size);
    let mut previous_x = 0.0;
    for (i, ch) in text.chars().take(cells).enumerate() {
        let glyph = ch.to_string();
        let x = border + i as f32 * cell_width + (cell_width - font.measure(&glyph, size)) / 2.0;
        if i == 0 {
            content.move_text(x, baseline);
        } else {
            content.move_text(x - previous_x, 0.0);
        }
        previous_x = x;
        font.show_text(&mut content, &glyph)?;
    }
    content.end_text();
    Ok(content)
}

fn multiline_content(field: &FieldAppearance, widget: &Widget, font: &PdfFont) -> Result<ContentBuilder> {
    let mut content = ContentBuilder::new();
    clip_to_border(&mut content, widget);
    let text = field.display_text();
    if text.is_empty() {
        return Ok(content);
    }

    let area = text_area(widget);
    let size = if field.font_size > 0.0 {
        field.font_size
    } else {
        fit_block(font, &text, area)
    };
    let lines = wrap_text(font, &text, area.width, size);
    let line_height = font.height_at_size(size);

    content
        .begin_text()
        .fill_color(field.text_color)
        .set_font(font.resource_name(), size);
    let mut previous_x = 0.0;
    for (i, line) in lines.iter().enumerate() {
        let x = aligned_x(area, font.measure(line, size), field.alignment);
        if i == 0 {
            content.move_text(x, area.top() - font.ascent(size));
        } else {
            content.move_text(x - previous_x, -line_height);
        }
        previous_x = x;
        font.show_text(&mut content, line)?;
    }
    content.end_text();
    Ok(content)
}

/// Largest size (up to 12) at which the wrapped text fits `area`.
fn fit_block(font: &PdfFont, text: &str, area: Rect) -> f32 {
    let mut size = MAX_AUTO_BLOCK_FONT_SIZE.min(font.size_at_height(area.height)).max(MIN_FONT_SIZE);
    while size > MIN_FONT_SIZE {
        let lines = wrap_text(font, text, area.width, size).len();
        if lines as f32 * font.height_at_size(size) <= area.height {
            break;
        }
        size -= 1.0;
    }
    size.max(MIN_FONT_SIZE)
}

/// Break `text` into lines no wider than `max_width`: on newlines, then
/// between words, then inside words that are too long on their own.
pub(crate) fn wrap_text(font: &PdfFont, text: &str, max_width: f32, size: f32) -> Vec<String> {
    let fits = |s: &str| font.measure(s, size) <= max_width;
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut line = String::new();
        for word in paragraph.split(' ') {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if fits(&candidate) {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            line = word.to_string();
            while !fits(&line) && line.chars().count() > 1 {
                let mut head = String::new();
                for ch in line.chars() {
                    head.push(ch);
                    if !fits(&head) {
                        head.pop();
                        break;
                    }
                }
                if head.is_empty() {
                    head = line.chars().take(1).collect();
                }
                line = line[head.len()..].to_string();
                lines.push(head);
            }
        }
        lines.push(line);
    }
    lines
}

fn list_appearance(field: &FieldAppearance, widget: &Widget, font: &PdfFont) -> Result<Appearance> {
    let mut builder = frame(widget, false);
    let rect = widget.rect();
    let border = widget.border_width();
    let area = text_area(widget);
    let size = if field.font_size > 0.0 {
        field.font_size
    } else {
        let widest = field.options.iter().map(|o| font.measure(o, 1.0)).fold(0.0, f32::max);
        let mut size = MAX_AUTO_BLOCK_FONT_SIZE;
        if widest > 0.0 {
            size = size.min(area.width / widest);
        }
        size.max(MIN_FONT_SIZE)
    };
    let line_height = font.height_at_size(size);

    let mut content = ContentBuilder::new();
    clip_to_border(&mut content, widget);
    for (i, option) in field.options.iter().enumerate() {
        if field.selected.contains(option) {
            let top = area.top() - i as f32 * line_height;
            content
                .fill_color(SELECTION_HIGHLIGHT)
                .rect(Rect::new(border, top - line_height, rect.width - 2.0 * border, line_height))
                .fill();
        }
    }
    if !field.options.is_empty() {
        content
            .begin_text()
            .fill_color(field.text_color)
            .set_font(font.resource_name(), size);
        let mut previous_x = 0.0;
        for (i, option) in field.options.iter().enumerate() {
            let x = aligned_x(area, font.measure(option, size), field.alignment);
            if i == 0 {
                content.move_text(x, area.top() - font.ascent(size));
            } else {
                content.move_text(x - previous_x, -line_height);
            }
            previous_x = x;
            font.show_text(&mut content, option)?;
        }
        content.end_text();
    }
    builder.marked_text(content);
    Ok(Appearance::Single(builder.build()))
}

fn toggle_appearance(
    field: &FieldAppearance,
    widget: &Widget,
    font: &PdfFont,
    mark: char,
    round: bool,
) -> Result<Appearance> {
    let on_state = widget.on_state().unwrap_or("Yes").to_string();
    let off = frame(widget, round).build();

    let mut on = frame(widget, round);
    let rect = widget.rect();
    let area = text_area(widget);
    let glyph_width = font.char_width(mark).max(1.0);
    let fraction = if round { 0.5 } else { 1.0 };
    let size = if field.font_size > 0.0 {
        field.font_size
    } else {
        let extent = area.width.min(area.height) * fraction;
        (extent * 1000.0 / glyph_width).min(font.size_at_height(area.height)).max(1.0)
    };
    let x = (rect.width - glyph_width * size / 1000.0) / 2.0;
    let full = Rect::new(0.0, 0.0, rect.width, rect.height);
    on.begin_text()
        .fill_color(field.text_color)
        .set_font(font.resource_name(), size)
        .move_text(x, centered_baseline(font, full, size));
    font.show_text(&mut on, &mark.to_string())?;
    on.end_text();

    Ok(Appearance::States(vec![(on_state, on.build()), ("Off".to_string(), off)]))
}

/// Register `content` as a form XObject sized to the widget.
fn form_xobject(ctx: &mut PdfContext, rect: Rect, content: Vec<u8>, font: &PdfFont) -> ObjectRef {
    let mut fonts = Dict::new();
    fonts.insert(font.resource_name().to_string(), Object::Reference(font.reference()));
    let mut resources = Dict::new();
    resources.insert("Font".to_string(), Object::Dictionary(fonts));

    let mut dict = Dict::new();
    dict.insert("Type".to_string(), Object::name("XObject"));
    dict.insert("Subtype".to_string(), Object::name("Form"));
    dict.insert(
        "BBox".to_string(),
        Object::numbers(&[0.0, 0.0, rect.width as f64, rect.height as f64]),
    );
    dict.insert("Resources".to_string(), Object::Dictionary(resources));
    ctx.register(Object::stream(dict, content))
}

/// Store `appearance` as the widget's `/AP /N`. Other appearance entries
/// such as `/R` and `/D` are kept.
pub(crate) fn install(ctx: &mut PdfContext, widget: &Widget, appearance: Appearance, font: &PdfFont) -> Result<()> {
    let rect = widget.rect();
    let normal = match appearance {
        Appearance::Single(content) => Object::Reference(form_xobject(ctx, rect, content, font)),
        Appearance::States(states) => {
            let mut dict = Dict::new();
            for (state, content) in states {
                dict.insert(state, Object::Reference(form_xobject(ctx, rect, content, font)));
            }
            Object::Dictionary(dict)
        },
    };

    let r = widget.reference();
    let mut ap = ctx
        .lookup(r)
        .and_then(|object| ctx.resolve_key(object, "AP"))
        .and_then(Object::as_dict)
        .cloned()
        .unwrap_or_default();
    let previous = ap.insert("N".to_string(), normal);
    ctx.lookup_mut(r)
        .and_then(Object::as_dict_mut)
        .ok_or(Error::ObjectNotFound(r.id, r.gen))?
        .insert("AP".to_string(), Object::Dictionary(ap));

    // Streams drawn earlier in this session are owned by this widget alone.
    let mut stale = Vec::new();
    if let Some(normal) = &previous {
        match normal {
            Object::Reference(old) => stale.push(*old),
            Object::Dictionary(states) => stale.extend(states.values().filter_map(Object::as_reference)),
            _ => {},
        }
    }
    for old in stale {
        if ctx.is_modified(old.id) {
            ctx.remove(old);
        }
    }
    Ok(())
}
