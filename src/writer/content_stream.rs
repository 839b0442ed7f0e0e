//! Content stream builder.
//!
//! Appearance streams and page content are assembled as a list of typed
//! operators and written out in one pass.

use crate::geometry::{Color, Rect};
use crate::writer::object_serializer::{format_real, write_hex_string, write_literal_string, write_name};

/// Operators that can be added to a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Set transformation matrix (cm)
    Transform(f32, f32, f32, f32, f32, f32),
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(String, f32),
    /// Move text position (Td)
    MoveText(f32, f32),
    /// Set text leading (TL)
    SetTextLeading(f32),
    /// Move to next line (T*)
    NextLine,
    /// Show already-encoded text as a literal string (Tj)
    ShowText(Vec<u8>),
    /// Show already-encoded text as a hex string (Tj), for two-byte codes
    ShowHexText(Vec<u8>),
    /// Set fill color (g, rg or k)
    SetFillColor(Color),
    /// Set stroke color (G, RG or K)
    SetStrokeColor(Color),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Set dash pattern (d)
    SetDashPattern(Vec<f32>, f32),
    /// Move to (m)
    MoveTo(f32, f32),
    /// Line to (l)
    LineTo(f32, f32),
    /// Curve to (c)
    CurveTo(f32, f32, f32, f32, f32, f32),
    /// Rectangle (re)
    Rectangle(f32, f32, f32, f32),
    /// Close path (h)
    ClosePath,
    /// Stroke (S)
    Stroke,
    /// Fill (f)
    Fill,
    /// Fill and stroke (B)
    FillStroke,
    /// End path without painting (n)
    EndPath,
    /// Clip using the non-zero winding rule (W)
    Clip,
    /// Begin marked content (BMC)
    BeginMarkedContent(String),
    /// End marked content (EMC)
    EndMarkedContent,
    /// Paint XObject (Do)
    PaintXObject(String),
    /// Raw operator text, written as-is
    Raw(String),
}

/// Builder for content stream bytes.
///
/// ```
/// use pdf_kiln::writer::ContentBuilder;
///
/// let mut builder = ContentBuilder::new();
/// builder
///     .begin_text()
///     .set_font("Helv", 12.0)
///     .move_text(2.0, 4.5)
///     .show_text(b"Hello")
///     .end_text();
/// assert_eq!(builder.build(), b"BT\n/Helv 12 Tf\n2 4.5 Td\n(Hello) Tj\nET\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ContentBuilder {
    operations: Vec<ContentOp>,
}

impl ContentBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one operator.
    pub fn op(&mut self, op: ContentOp) -> &mut Self {
        self.operations.push(op);
        self
    }

    /// Operators added so far.
    pub fn operations(&self) -> &[ContentOp] {
        &self.operations
    }

    /// Save graphics state.
    pub fn save_state(&mut self) -> &mut Self {
        self.op(ContentOp::SaveState)
    }

    /// Restore graphics state.
    pub fn restore_state(&mut self) -> &mut Self {
        self.op(ContentOp::RestoreState)
    }

    /// Begin a text object.
    pub fn begin_text(&mut self) -> &mut Self {
        self.op(ContentOp::BeginText)
    }

    /// End a text object.
    pub fn end_text(&mut self) -> &mut Self {
        self.op(ContentOp::EndText)
    }

    /// Select a font resource and size.
    pub fn set_font(&mut self, resource: &str, size: f32) -> &mut Self {
        self.op(ContentOp::SetFont(resource.to_string(), size))
    }

    /// Move the text position.
    pub fn move_text(&mut self, tx: f32, ty: f32) -> &mut Self {
        self.op(ContentOp::MoveText(tx, ty))
    }

    /// Show encoded text as a literal string.
    pub fn show_text(&mut self, encoded: &[u8]) -> &mut Self {
        self.op(ContentOp::ShowText(encoded.to_vec()))
    }

    /// Show encoded text as a hex string.
    pub fn show_hex_text(&mut self, encoded: &[u8]) -> &mut Self {
        self.op(ContentOp::ShowHexText(encoded.to_vec()))
    }

    /// Set the fill color.
    pub fn fill_color(&mut self, color: Color) -> &mut Self {
        self.op(ContentOp::SetFillColor(color))
    }

    /// Set the stroke color.
    pub fn stroke_color(&mut self, color: Color) -> &mut Self {
        self.op(ContentOp::SetStrokeColor(color))
    }

    /// Set the line width.
    pub fn set_line_width(&mut self, width: f32) -> &mut Self {
        self.op(ContentOp::SetLineWidth(width))
    }

    /// Append a rectangle path.
    pub fn rect(&mut self, rect: Rect) -> &mut Self {
        self.op(ContentOp::Rectangle(rect.x, rect.y, rect.width, rect.height))
    }

    /// Move to a point.
    pub fn move_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(ContentOp::MoveTo(x, y))
    }

    /// Line to a point.
    pub fn line_to(&mut self, x: f32, y: f32) -> &mut Self {
        self.op(ContentOp::LineTo(x, y))
    }

    /// Stroke the current path.
    pub fn stroke(&mut self) -> &mut Self {
        self.op(ContentOp::Stroke)
    }

    /// Fill the current path.
    pub fn fill(&mut self) -> &mut Self {
        self.op(ContentOp::Fill)
    }

    /// Clip to the current path and end it.
    pub fn clip(&mut self) -> &mut Self {
        self.op(ContentOp::Clip).op(ContentOp::EndPath)
    }

    /// Approximate a circle with four Bézier curves and close the path.
    pub fn circle(&mut self, cx: f32, cy: f32, r: f32) -> &mut Self {
        // Control point distance for a quarter circle
        let k = 0.552_284_8 * r;
        self.move_to(cx + r, cy)
            .op(ContentOp::CurveTo(cx + r, cy + k, cx + k, cy + r, cx, cy + r))
            .op(ContentOp::CurveTo(cx - k, cy + r, cx - r, cy + k, cx - r, cy))
            .op(ContentOp::CurveTo(cx - r, cy - k, cx - k, cy - r, cx, cy - r))
            .op(ContentOp::CurveTo(cx + k, cy - r, cx + r, cy - k, cx + r, cy))
            .op(ContentOp::ClosePath)
    }

    /// Wrap everything added so far in `/Tx BMC ... EMC` plus `q ... Q`,
    /// the marked-content convention for variable text.
    pub fn marked_text(&mut self, inner: ContentBuilder) -> &mut Self {
        self.op(ContentOp::BeginMarkedContent("Tx".to_string())).save_state();
        self.operations.extend(inner.operations);
        self.restore_state().op(ContentOp::EndMarkedContent)
    }

    /// Write the operators, one per line.
    pub fn build(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for op in &self.operations {
            write_op(&mut buf, op);
            buf.push(b'\n');
        }
        buf
    }
}

fn push_numbers(out: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        out.extend_from_slice(format_real(*value as f64).as_bytes());
        out.push(b' ');
    }
}

fn color_op(out: &mut Vec<u8>, color: &Color, stroke: bool) {
    push_numbers(out, &color.components());
    let op: &[u8] = match (color, stroke) {
        (Color::Gray(_), false) => b"g",
        (Color::Gray(_), true) => b"G",
        (Color::Rgb(..), false) => b"rg",
        (Color::Rgb(..), true) => b"RG",
        (Color::Cmyk(..), false) => b"k",
        (Color::Cmyk(..), true) => b"K",
    };
    out.extend_from_slice(op);
}

/// Write a single operator without a trailing newline.
fn write_op(out: &mut Vec<u8>, op: &ContentOp) {
    let operator = |out: &mut Vec<u8>, operands: &[f32], name: &str| {
        push_numbers(out, operands);
        out.extend_from_slice(name.as_bytes());
    };
    match op {
        ContentOp::SaveState => out.push(b'q'),
        ContentOp::RestoreState => out.push(b'Q'),
        ContentOp::Transform(a, b, c, d, e, f) => operator(out, &[*a, *b, *c, *d, *e, *f], "cm"),
        ContentOp::BeginText => out.extend_from_slice(b"BT"),
        ContentOp::EndText => out.extend_from_slice(b"ET"),
        ContentOp::SetFont(name, size) => {
            write_name(out, name);
            out.push(b' ');
            operator(out, &[*size], "Tf");
        },
        ContentOp::MoveText(tx, ty) => operator(out, &[*tx, *ty], "Td"),
        ContentOp::SetTextLeading(leading) => operator(out, &[*leading], "TL"),
        ContentOp::NextLine => out.extend_from_slice(b"T*"),
        ContentOp::ShowText(text) => {
            write_literal_string(out, text);
            out.extend_from_slice(b" Tj");
        },
        ContentOp::ShowHexText(text) => {
            write_hex_string(out, text);
            out.extend_from_slice(b" Tj");
        },
        ContentOp::SetFillColor(color) => color_op(out, color, false),
        ContentOp::SetStrokeColor(color) => color_op(out, color, true),
        ContentOp::SetLineWidth(width) => operator(out, &[*width], "w"),
        ContentOp::SetDashPattern(pattern, phase) => {
            out.push(b'[');
            let parts: Vec<String> = pattern.iter().map(|p| format_real(*p as f64)).collect();
            out.extend_from_slice(parts.join(" ").as_bytes());
            out.extend_from_slice(b"] ");
            operator(out, &[*phase], "d");
        },
        ContentOp::MoveTo(x, y) => operator(out, &[*x, *y], "m"),
        ContentOp::LineTo(x, y) => operator(out, &[*x, *y], "l"),
        ContentOp::CurveTo(x1, y1, x2, y2, x3, y3) => operator(out, &[*x1, *y1, *x2, *y2, *x3, *y3], "c"),
        ContentOp::Rectangle(x, y, w, h) => operator(out, &[*x, *y, *w, *h], "re"),
        ContentOp::ClosePath => out.push(b'h'),
        ContentOp::Stroke => out.push(b'S'),
        ContentOp::Fill => out.push(b'f'),
        ContentOp::FillStroke => out.push(b'B'),
        ContentOp::EndPath => out.push(b'n'),
        ContentOp::Clip => out.push(b'W'),
        ContentOp::BeginMarkedContent(tag) => {
            write_name(out, tag);
            out.extend_from_slice(b" BMC");
        },
        ContentOp::EndMarkedContent => out.extend_from_slice(b"EMC"),
        ContentOp::PaintXObject(name) => {
            write_name(out, name);
            out.extend_from_slice(b" Do");
        },
        ContentOp::Raw(raw) => out.extend_from_slice(raw.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(builder: &ContentBuilder) -> String {
        String::from_utf8(builder.build()).unwrap()
    }

    #[test]
    fn test_colors_pick_operator_by_space() {
        let mut builder = ContentBuilder::new();
        builder
            .fill_color(Color::Gray(1.0))
            .stroke_color(Color::Rgb(1.0, 0.0, 0.5))
            .fill_color(Color::Cmyk(0.0, 0.0, 0.0, 1.0));
        assert_eq!(text(&builder), "1 g\n1 0 0.5 RG\n0 0 0 1 k\n");
    }

    #[test]
    fn test_escaped_and_hex_text() {
        let mut builder = ContentBuilder::new();
        builder.show_text(b"a(b)").show_hex_text(&[0x00, 0x2A]);
        assert_eq!(text(&builder), "(a\\(b\\)) Tj\n<002A> Tj\n");
    }

    #[test]
    fn test_marked_text_wraps_inner_ops() {
        let mut inner = ContentBuilder::new();
        inner.begin_text().end_text();
        let mut outer = ContentBuilder::new();
        outer.rect(Rect::new(0.0, 0.0, 10.0, 5.0)).fill().marked_text(inner);
        assert_eq!(text(&outer), "0 0 10 5 re\nf\n/Tx BMC\nq\nBT\nET\nQ\nEMC\n");
    }

    #[test]
    fn test_circle_is_closed_path() {
        let mut builder = ContentBuilder::new();
        builder.circle(5.0, 5.0, 2.0);
        assert_eq!(builder.operations().len(), 6);
        assert_eq!(builder.operations().last(), Some(&ContentOp::ClosePath));
    }

    #[test]
    fn test_dash_and_clip() {
        let mut builder = ContentBuilder::new();
        builder.op(ContentOp::SetDashPattern(vec![3.0, 1.5], 0.0)).clip();
        assert_eq!(text(&builder), "[3 1.5] 0 d\nW\nn\n");
    }
}
