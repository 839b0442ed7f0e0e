//! Geometric and color value types.
//!
//! Coordinates are in PDF user space: the origin is the lower-left corner and
//! y grows upwards.

use crate::object::Object;
use serde::{Deserialize, Serialize};

/// A rectangle in user space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f32,
    /// Y coordinate of the lower-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_kiln::geometry::Rect;
    ///
    /// let rect = Rect::new(10.0, 20.0, 100.0, 50.0);
    /// assert_eq!(rect.right(), 110.0);
    /// assert_eq!(rect.top(), 70.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners in any order.
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Read a `[llx lly urx ury]` array; corners are normalized.
    pub fn from_object(object: &Object) -> Option<Self> {
        let values = object.as_array()?;
        if values.len() != 4 {
            return None;
        }
        let mut coords = [0f32; 4];
        for (slot, value) in coords.iter_mut().zip(values) {
            *slot = value.as_number()? as f32;
        }
        Some(Self::from_points(coords[0], coords[1], coords[2], coords[3]))
    }

    /// The `[llx lly urx ury]` array for this rectangle.
    pub fn to_object(&self) -> Object {
        Object::numbers(&[
            self.x as f64,
            self.y as f64,
            self.right() as f64,
            self.top() as f64,
        ])
    }

    /// Left edge x-coordinate.
    pub fn left(&self) -> f32 {
        self.x
    }

    /// Right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate.
    pub fn bottom(&self) -> f32 {
        self.y
    }

    /// Top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Shrink by `amount` on every side, never below zero size.
    pub fn inset(&self, amount: f32) -> Rect {
        let dx = amount.min(self.width / 2.0);
        let dy = amount.min(self.height / 2.0);
        Rect::new(self.x + dx, self.y + dy, self.width - 2.0 * dx, self.height - 2.0 * dy)
    }
}

/// Device color in one of the three device spaces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    /// DeviceGray
    Gray(f32),
    /// DeviceRGB
    Rgb(f32, f32, f32),
    /// DeviceCMYK
    Cmyk(f32, f32, f32, f32),
}

impl Color {
    /// Black in DeviceGray.
    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    /// White in DeviceGray.
    pub fn white() -> Self {
        Color::Gray(1.0)
    }

    /// Color from 1, 3 or 4 components (as in `/MK /BG` or `/DA`).
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [g] => Some(Color::Gray(g)),
            [r, g, b] => Some(Color::Rgb(r, g, b)),
            [c, m, y, k] => Some(Color::Cmyk(c, m, y, k)),
            _ => None,
        }
    }

    /// Read a component array. An empty array means transparent (`None`).
    pub fn from_object(object: &Object) -> Option<Self> {
        let components: Vec<f32> = object
            .as_array()?
            .iter()
            .map(|c| c.as_number().map(|v| v as f32))
            .collect::<Option<_>>()?;
        Self::from_components(&components)
    }

    /// Components of this color.
    pub fn components(&self) -> Vec<f32> {
        match *self {
            Color::Gray(g) => vec![g],
            Color::Rgb(r, g, b) => vec![r, g, b],
            Color::Cmyk(c, m, y, k) => vec![c, m, y, k],
        }
    }

    /// Component array for `/MK` entries.
    pub fn to_object(&self) -> Object {
        let components: Vec<f64> = self.components().into_iter().map(f64::from).collect();
        Object::numbers(&components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_object_normalizes() {
        let array = Object::numbers(&[100.0, 80.0, 10.0, 20.0]);
        let rect = Rect::from_object(&array).unwrap();
        assert_eq!(rect, Rect::new(10.0, 20.0, 90.0, 60.0));
        assert_eq!(Rect::from_object(&rect.to_object()), Some(rect));
    }

    #[test]
    fn test_rect_from_object_rejects_bad_arrays() {
        assert!(Rect::from_object(&Object::numbers(&[1.0, 2.0])).is_none());
        assert!(Rect::from_object(&Object::Null).is_none());
    }

    #[test]
    fn test_rect_inset() {
        let rect = Rect::new(0.0, 0.0, 10.0, 4.0).inset(3.0);
        assert_eq!(rect, Rect::new(3.0, 2.0, 4.0, 0.0));
    }

    #[test]
    fn test_color_components() {
        assert_eq!(Color::from_components(&[0.5]), Some(Color::Gray(0.5)));
        assert_eq!(Color::from_components(&[1.0, 0.0, 0.0]), Some(Color::Rgb(1.0, 0.0, 0.0)));
        assert_eq!(Color::from_components(&[0.0, 0.0]), None);
        assert_eq!(Color::from_object(&Object::Array(vec![])), None);
        let cmyk = Color::Cmyk(0.0, 0.5, 1.0, 0.0);
        assert_eq!(Color::from_object(&cmyk.to_object()), Some(cmyk));
    }
}
