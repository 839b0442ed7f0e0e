//! The 14 standard Type 1 fonts.
//!
//! Viewers supply these fonts themselves, so no program is embedded; only the
//! metrics are needed for layout. Widths are in 1/1000 em for WinAnsi text.

use crate::fonts::encoding::unicode_to_winansi;
use phf::phf_map;

/// One of the 14 standard fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    /// Helvetica
    Helvetica,
    /// Helvetica-Bold
    HelveticaBold,
    /// Helvetica-Oblique
    HelveticaOblique,
    /// Helvetica-BoldOblique
    HelveticaBoldOblique,
    /// Times-Roman
    TimesRoman,
    /// Times-Bold
    TimesBold,
    /// Times-Italic
    TimesItalic,
    /// Times-BoldItalic
    TimesBoldItalic,
    /// Courier
    Courier,
    /// Courier-Bold
    CourierBold,
    /// Courier-Oblique
    CourierOblique,
    /// Courier-BoldOblique
    CourierBoldOblique,
    /// Symbol
    Symbol,
    /// ZapfDingbats
    ZapfDingbats,
}

/// Vertical metrics and bounding box in 1/1000 em.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardMetrics {
    /// Ascent above the baseline
    pub ascent: f32,
    /// Descent below the baseline (negative)
    pub descent: f32,
    /// Height of capital letters
    pub cap_height: f32,
    /// Font bounding box `[llx lly urx ury]`
    pub bbox: [f32; 4],
}

impl StandardFont {
    /// All standard fonts.
    pub const ALL: [StandardFont; 14] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::TimesRoman,
        StandardFont::TimesBold,
        StandardFont::TimesItalic,
        StandardFont::TimesBoldItalic,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
        StandardFont::Symbol,
        StandardFont::ZapfDingbats,
    ];

    /// PostScript name used as `/BaseFont`.
    pub fn name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::HelveticaOblique => "Helvetica-Oblique",
            StandardFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::TimesBold => "Times-Bold",
            StandardFont::TimesItalic => "Times-Italic",
            StandardFont::TimesBoldItalic => "Times-BoldItalic",
            StandardFont::Courier => "Courier",
            StandardFont::CourierBold => "Courier-Bold",
            StandardFont::CourierOblique => "Courier-Oblique",
            StandardFont::CourierBoldOblique => "Courier-BoldOblique",
            StandardFont::Symbol => "Symbol",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }

    /// Conventional AcroForm resource name (`/Helv`, `/ZaDb`, ...).
    pub fn resource_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helv",
            StandardFont::HelveticaBold => "HeBo",
            StandardFont::HelveticaOblique => "HeOb",
            StandardFont::HelveticaBoldOblique => "HeBO",
            StandardFont::TimesRoman => "TiRo",
            StandardFont::TimesBold => "TiBo",
            StandardFont::TimesItalic => "TiIt",
            StandardFont::TimesBoldItalic => "TiBI",
            StandardFont::Courier => "Cour",
            StandardFont::CourierBold => "CoBo",
            StandardFont::CourierOblique => "CoOb",
            StandardFont::CourierBoldOblique => "CoBO",
            StandardFont::Symbol => "Symb",
            StandardFont::ZapfDingbats => "ZaDb",
        }
    }

    /// Look a font up by PostScript name or resource name.
    pub fn from_name(name: &str) -> Option<StandardFont> {
        let name = name.trim_start_matches('/');
        Self::ALL
            .iter()
            .copied()
            .find(|font| font.name() == name || font.resource_name() == name)
            .or(match name {
                "Arial" | "ArialMT" => Some(StandardFont::Helvetica),
                "Times" | "TimesNewRoman" => Some(StandardFont::TimesRoman),
                _ => None,
            })
    }

    /// Whether the font uses its own built-in encoding instead of WinAnsi.
    pub fn is_symbolic(&self) -> bool {
        matches!(self, StandardFont::Symbol | StandardFont::ZapfDingbats)
    }

    /// Vertical metrics.
    pub fn metrics(&self) -> StandardMetrics {
        let (ascent, descent, cap_height, bbox) = match self {
            StandardFont::Helvetica => (718.0, -207.0, 718.0, [-166.0, -225.0, 1000.0, 931.0]),
            StandardFont::HelveticaBold => (718.0, -207.0, 718.0, [-170.0, -228.0, 1003.0, 962.0]),
            StandardFont::HelveticaOblique => (718.0, -207.0, 718.0, [-170.0, -225.0, 1116.0, 931.0]),
            StandardFont::HelveticaBoldOblique => (718.0, -207.0, 718.0, [-174.0, -228.0, 1114.0, 962.0]),
            StandardFont::TimesRoman => (683.0, -217.0, 662.0, [-168.0, -218.0, 1000.0, 898.0]),
            StandardFont::TimesBold => (683.0, -217.0, 676.0, [-168.0, -218.0, 1000.0, 935.0]),
            StandardFont::TimesItalic => (683.0, -217.0, 653.0, [-169.0, -217.0, 1010.0, 883.0]),
            StandardFont::TimesBoldItalic => (683.0, -217.0, 669.0, [-200.0, -218.0, 996.0, 921.0]),
            StandardFont::Courier => (629.0, -157.0, 562.0, [-23.0, -250.0, 715.0, 805.0]),
            StandardFont::CourierBold => (629.0, -157.0, 562.0, [-113.0, -250.0, 749.0, 801.0]),
            StandardFont::CourierOblique => (629.0, -157.0, 562.0, [-27.0, -250.0, 849.0, 805.0]),
            StandardFont::CourierBoldOblique => (629.0, -157.0, 562.0, [-57.0, -250.0, 869.0, 801.0]),
            StandardFont::Symbol => (1010.0, -293.0, 1010.0, [-180.0, -293.0, 1090.0, 1010.0]),
            StandardFont::ZapfDingbats => (820.0, -143.0, 820.0, [-1.0, -143.0, 981.0, 820.0]),
        };
        StandardMetrics {
            ascent,
            descent,
            cap_height,
            bbox,
        }
    }

    /// Single-byte code for `ch`, or `None` if the font cannot show it.
    pub fn encode_char(&self, ch: char) -> Option<u8> {
        if self.is_symbolic() {
            return (' '..='~').contains(&ch).then_some(ch as u8);
        }
        unicode_to_winansi(ch)
    }

    /// Advance width of `ch` in 1/1000 em.
    pub fn char_width(&self, ch: char) -> u16 {
        let table = match self {
            StandardFont::Courier
            | StandardFont::CourierBold
            | StandardFont::CourierOblique
            | StandardFont::CourierBoldOblique => return 600,
            StandardFont::Symbol => return SYMBOL_WIDTHS.get(&ch).copied().unwrap_or(500),
            StandardFont::ZapfDingbats => return ZAPF_DINGBATS_WIDTHS.get(&ch).copied().unwrap_or(788),
            StandardFont::Helvetica | StandardFont::HelveticaOblique => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold | StandardFont::HelveticaBoldOblique => &HELVETICA_BOLD_WIDTHS,
            StandardFont::TimesRoman => &TIMES_ROMAN_WIDTHS,
            StandardFont::TimesBold => &TIMES_BOLD_WIDTHS,
            StandardFont::TimesItalic => &TIMES_ITALIC_WIDTHS,
            StandardFont::TimesBoldItalic => &TIMES_BOLD_ITALIC_WIDTHS,
        };
        table
            .get(&ch)
            .or_else(|| table.get(&base_letter(ch)))
            .copied()
            .unwrap_or_else(|| table.get(&'n').copied().unwrap_or(500))
    }
}

/// Base letters for U+00C0..=U+00FF; Latin-1 letters take the width of their base letter.
const LATIN1_BASE: &[u8; 64] = b"AAAAAAACEEEEIIIIDNOOOOO*OUUUUYPsaaaaaaaceeeeiiiidnooooo/ouuuuypy";

fn base_letter(ch: char) -> char {
    match ch as u32 {
        code @ 0xC0..=0xFF => LATIN1_BASE[(code - 0xC0) as usize] as char,
        0x0160 => 'S',
        0x0161 => 's',
        0x017D => 'Z',
        0x017E => 'z',
        0x0178 => 'Y',
        0x00A0 => ' ',
        _ => ch,
    }
}

/// Helvetica and Helvetica-Oblique.
static HELVETICA_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 278, '!' => 278, '"' => 355, '#' => 556, '$' => 556, '%' => 889, '&' => 667, '\'' => 191,
    '(' => 333, ')' => 333, '*' => 389, '+' => 584, ',' => 278, '-' => 333, '.' => 278, '/' => 278,
    '0' => 556, '1' => 556, '2' => 556, '3' => 556, '4' => 556, '5' => 556, '6' => 556, '7' => 556,
    '8' => 556, '9' => 556, ':' => 278, ';' => 278, '<' => 584, '=' => 584, '>' => 584, '?' => 556,
    '@' => 1015, 'A' => 667, 'B' => 667, 'C' => 722, 'D' => 722, 'E' => 667, 'F' => 611, 'G' => 778,
    'H' => 722, 'I' => 278, 'J' => 500, 'K' => 667, 'L' => 556, 'M' => 833, 'N' => 722, 'O' => 778,
    'P' => 667, 'Q' => 778, 'R' => 722, 'S' => 667, 'T' => 611, 'U' => 722, 'V' => 667, 'W' => 944,
    'X' => 667, 'Y' => 667, 'Z' => 611, '[' => 278, '\\' => 278, ']' => 278, '^' => 469, '_' => 556,
    '`' => 333, 'a' => 556, 'b' => 556, 'c' => 500, 'd' => 556, 'e' => 556, 'f' => 278, 'g' => 556,
    'h' => 556, 'i' => 222, 'j' => 222, 'k' => 500, 'l' => 222, 'm' => 833, 'n' => 556, 'o' => 556,
    'p' => 556, 'q' => 556, 'r' => 333, 's' => 500, 't' => 278, 'u' => 556, 'v' => 500, 'w' => 722,
    'x' => 500, 'y' => 500, 'z' => 500, '{' => 334, '|' => 260, '}' => 334, '~' => 584,
};

/// Helvetica-Bold and Helvetica-BoldOblique.
static HELVETICA_BOLD_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 278, '!' => 333, '"' => 474, '#' => 556, '$' => 556, '%' => 889, '&' => 722, '\'' => 238,
    '(' => 333, ')' => 333, '*' => 389, '+' => 584, ',' => 278, '-' => 333, '.' => 278, '/' => 278,
    '0' => 556, '1' => 556, '2' => 556, '3' => 556, '4' => 556, '5' => 556, '6' => 556, '7' => 556,
    '8' => 556, '9' => 556, ':' => 333, ';' => 333, '<' => 584, '=' => 584, '>' => 584, '?' => 611,
    '@' => 975, 'A' => 722, 'B' => 722, 'C' => 722, 'D' => 722, 'E' => 667, 'F' => 611, 'G' => 778,
    'H' => 722, 'I' => 278, 'J' => 556, 'K' => 722, 'L' => 611, 'M' => 833, 'N' => 722, 'O' => 778,
    'P' => 667, 'Q' => 778, 'R' => 722, 'S' => 667, 'T' => 611, 'U' => 722, 'V' => 667, 'W' => 944,
    'X' => 667, 'Y' => 667, 'Z' => 611, '[' => 333, '\\' => 278, ']' => 333, '^' => 584, '_' => 556,
    '`' => 333, 'a' => 556, 'b' => 611, 'c' => 556, 'd' => 611, 'e' => 556, 'f' => 333, 'g' => 611,
    'h' => 611, 'i' => 278, 'j' => 278, 'k' => 556, 'l' => 278, 'm' => 889, 'n' => 611, 'o' => 611,
    'p' => 611, 'q' => 611, 'r' => 389, 's' => 556, 't' => 333, 'u' => 611, 'v' => 556, 'w' => 778,
    'x' => 556, 'y' => 556, 'z' => 500, '{' => 389, '|' => 280, '}' => 389, '~' => 584,
};

/// Times-Roman.
static TIMES_ROMAN_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 250, '!' => 333, '"' => 408, '#' => 500, '$' => 500, '%' => 833, '&' => 778, '\'' => 180,
    '(' => 333, ')' => 333, '*' => 500, '+' => 564, ',' => 250, '-' => 333, '.' => 250, '/' => 278,
    '0' => 500, '1' => 500, '2' => 500, '3' => 500, '4' => 500, '5' => 500, '6' => 500, '7' => 500,
    '8' => 500, '9' => 500, ':' => 278, ';' => 278, '<' => 564, '=' => 564, '>' => 564, '?' => 444,
    '@' => 921, 'A' => 722, 'B' => 667, 'C' => 667, 'D' => 722, 'E' => 611, 'F' => 556, 'G' => 722,
    'H' => 722, 'I' => 333, 'J' => 389, 'K' => 722, 'L' => 611, 'M' => 889, 'N' => 722, 'O' => 722,
    'P' => 556, 'Q' => 722, 'R' => 667, 'S' => 556, 'T' => 611, 'U' => 722, 'V' => 722, 'W' => 944,
    'X' => 722, 'Y' => 722, 'Z' => 611, '[' => 333, '\\' => 278, ']' => 333, '^' => 469, '_' => 500,
    '`' => 333, 'a' => 444, 'b' => 500, 'c' => 444, 'd' => 500, 'e' => 444, 'f' => 333, 'g' => 500,
    'h' => 500, 'i' => 278, 'j' => 278, 'k' => 500, 'l' => 278, 'm' => 778, 'n' => 500, 'o' => 500,
    'p' => 500, 'q' => 500, 'r' => 333, 's' => 389, 't' => 278, 'u' => 500, 'v' => 500, 'w' => 722,
    'x' => 500, 'y' => 500, 'z' => 444, '{' => 480, '|' => 200, '}' => 480, '~' => 541,
};

/// Times-Bold.
static TIMES_BOLD_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 250, '!' => 333, '"' => 555, '#' => 500, '$' => 500, '%' => 1000, '&' => 833, '\'' => 278,
    '(' => 333, ')' => 333, '*' => 500, '+' => 570, ',' => 250, '-' => 333, '.' => 250, '/' => 278,
    '0' => 500, '1' => 500, '2' => 500, '3' => 500, '4' => 500, '5' => 500, '6' => 500, '7' => 500,
    '8' => 500, '9' => 500, ':' => 333, ';' => 333, '<' => 570, '=' => 570, '>' => 570, '?' => 500,
    '@' => 930, 'A' => 722, 'B' => 667, 'C' => 722, 'D' => 722, 'E' => 667, 'F' => 611, 'G' => 778,
    'H' => 778, 'I' => 389, 'J' => 500, 'K' => 778, 'L' => 667, 'M' => 944, 'N' => 722, 'O' => 778,
    'P' => 611, 'Q' => 778, 'R' => 722, 'S' => 556, 'T' => 667, 'U' => 722, 'V' => 722, 'W' => 1000,
    'X' => 722, 'Y' => 722, 'Z' => 667, '[' => 333, '\\' => 278, ']' => 333, '^' => 581, '_' => 500,
    '`' => 333, 'a' => 500, 'b' => 556, 'c' => 444, 'd' => 556, 'e' => 444, 'f' => 333, 'g' => 500,
    'h' => 556, 'i' => 278, 'j' => 333, 'k' => 556, 'l' => 278, 'm' => 833, 'n' => 556, 'o' => 500,
    'p' => 556, 'q' => 556, 'r' => 444, 's' => 389, 't' => 333, 'u' => 556, 'v' => 500, 'w' => 722,
    'x' => 500, 'y' => 500, 'z' => 444, '{' => 394, '|' => 220, '}' => 394, '~' => 520,
};

/// Times-Italic.
static TIMES_ITALIC_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 250, '!' => 333, '"' => 420, '#' => 500, '$' => 500, '%' => 833, '&' => 778, '\'' => 214,
    '(' => 333, ')' => 333, '*' => 500, '+' => 675, ',' => 250, '-' => 333, '.' => 250, '/' => 278,
    '0' => 500, '1' => 500, '2' => 500, '3' => 500, '4' => 500, '5' => 500, '6' => 500, '7' => 500,
    '8' => 500, '9' => 500, ':' => 333, ';' => 333, '<' => 675, '=' => 675, '>' => 675, '?' => 500,
    '@' => 920, 'A' => 611, 'B' => 611, 'C' => 667, 'D' => 722, 'E' => 611, 'F' => 611, 'G' => 722,
    'H' => 722, 'I' => 333, 'J' => 444, 'K' => 667, 'L' => 556, 'M' => 833, 'N' => 667, 'O' => 722,
    'P' => 611, 'Q' => 722, 'R' => 611, 'S' => 500, 'T' => 556, 'U' => 722, 'V' => 611, 'W' => 833,
    'X' => 611, 'Y' => 556, 'Z' => 556, '[' => 389, '\\' => 278, ']' => 389, '^' => 422, '_' => 500,
    '`' => 333, 'a' => 500, 'b' => 500, 'c' => 444, 'd' => 500, 'e' => 444, 'f' => 278, 'g' => 500,
    'h' => 500, 'i' => 278, 'j' => 278, 'k' => 444, 'l' => 278, 'm' => 722, 'n' => 500, 'o' => 500,
    'p' => 500, 'q' => 500, 'r' => 389, 's' => 389, 't' => 278, 'u' => 500, 'v' => 444, 'w' => 667,
    'x' => 444, 'y' => 444, 'z' => 389, '{' => 400, '|' => 275, '}' => 400, '~' => 541,
};

/// Times-BoldItalic.
static TIMES_BOLD_ITALIC_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 250, '!' => 389, '"' => 555, '#' => 500, '$' => 500, '%' => 833, '&' => 778, '\'' => 278,
    '(' => 333, ')' => 333, '*' => 500, '+' => 570, ',' => 250, '-' => 333, '.' => 250, '/' => 278,
    '0' => 500, '1' => 500, '2' => 500, '3' => 500, '4' => 500, '5' => 500, '6' => 500, '7' => 500,
    '8' => 500, '9' => 500, ':' => 333, ';' => 333, '<' => 570, '=' => 570, '>' => 570, '?' => 500,
    '@' => 832, 'A' => 667, 'B' => 667, 'C' => 667, 'D' => 722, 'E' => 667, 'F' => 667, 'G' => 722,
    'H' => 778, 'I' => 389, 'J' => 500, 'K' => 667, 'L' => 611, 'M' => 889, 'N' => 722, 'O' => 722,
    'P' => 611, 'Q' => 722, 'R' => 667, 'S' => 556, 'T' => 611, 'U' => 722, 'V' => 667, 'W' => 889,
    'X' => 667, 'Y' => 611, 'Z' => 611, '[' => 333, '\\' => 278, ']' => 333, '^' => 570, '_' => 500,
    '`' => 333, 'a' => 500, 'b' => 500, 'c' => 444, 'd' => 500, 'e' => 444, 'f' => 333, 'g' => 500,
    'h' => 556, 'i' => 278, 'j' => 278, 'k' => 500, 'l' => 278, 'm' => 778, 'n' => 556, 'o' => 500,
    'p' => 500, 'q' => 500, 'r' => 389, 's' => 389, 't' => 278, 'u' => 556, 'v' => 444, 'w' => 667,
    'x' => 500, 'y' => 444, 'z' => 389, '{' => 348, '|' => 220, '}' => 348, '~' => 570,
};

/// Symbol; codes are the font's built-in encoding.
static SYMBOL_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 250, '!' => 333, '(' => 333, ')' => 333, '+' => 549, ',' => 250, '-' => 549, '.' => 250,
    '/' => 278, '0' => 500, '1' => 500, '2' => 500, '3' => 500, '4' => 500, '5' => 500, '6' => 500,
    '7' => 500, '8' => 500, '9' => 500, ':' => 278, ';' => 278, '<' => 549, '=' => 549, '>' => 549,
    '?' => 444,
};

/// ZapfDingbats; codes are the font's built-in encoding.
static ZAPF_DINGBATS_WIDTHS: phf::Map<char, u16> = phf_map! {
    ' ' => 278, '4' => 846, '8' => 776, 'H' => 816, 'l' => 791, 'n' => 761, 'u' => 759,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for font in StandardFont::ALL {
            assert_eq!(StandardFont::from_name(font.name()), Some(font));
            assert_eq!(StandardFont::from_name(font.resource_name()), Some(font));
        }
        assert_eq!(StandardFont::from_name("/Helv"), Some(StandardFont::Helvetica));
        assert_eq!(StandardFont::from_name("Comic"), None);
    }

    #[test]
    fn test_widths() {
        assert_eq!(StandardFont::Helvetica.char_width('A'), 667);
        assert_eq!(StandardFont::HelveticaOblique.char_width('i'), 222);
        assert_eq!(StandardFont::TimesRoman.char_width(' '), 250);
        assert_eq!(StandardFont::Courier.char_width('W'), 600);
        assert_eq!(StandardFont::ZapfDingbats.char_width('4'), 846);
    }

    #[test]
    fn test_accented_letters_use_base_width() {
        assert_eq!(StandardFont::Helvetica.char_width('é'), StandardFont::Helvetica.char_width('e'));
        assert_eq!(StandardFont::TimesBold.char_width('Ü'), StandardFont::TimesBold.char_width('U'));
    }

    #[test]
    fn test_encoding() {
        assert_eq!(StandardFont::Helvetica.encode_char('é'), Some(0xE9));
        assert_eq!(StandardFont::Helvetica.encode_char('Ж'), None);
        assert_eq!(StandardFont::ZapfDingbats.encode_char('4'), Some(b'4'));
        assert_eq!(StandardFont::ZapfDingbats.encode_char('é'), None);
    }

    #[test]
    fn test_metrics() {
        let metrics = StandardFont::Helvetica.metrics();
        assert_eq!(metrics.ascent, 718.0);
        assert!(metrics.descent < 0.0);
    }
}
