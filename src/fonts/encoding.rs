//! WinAnsi (Windows-1252) encoding.
//!
//! Simple fonts in this crate are written with `/Encoding /WinAnsiEncoding`.
//! Codes 0x20-0x7E and 0xA0-0xFF coincide with Unicode; 0x80-0x9F hold the
//! typographic extras below. Control codes are not encodable.

/// Characters at codes 0x80..=0x9F; `None` marks unassigned codes.
const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), // 0x80 Euro sign
    None,
    Some('\u{201A}'), // single low-9 quotation mark
    Some('\u{0192}'), // f with hook
    Some('\u{201E}'), // double low-9 quotation mark
    Some('\u{2026}'), // ellipsis
    Some('\u{2020}'), // dagger
    Some('\u{2021}'), // double dagger
    Some('\u{02C6}'), // circumflex
    Some('\u{2030}'), // per mille
    Some('\u{0160}'), // S caron
    Some('\u{2039}'), // single left angle quote
    Some('\u{0152}'), // OE
    None,
    Some('\u{017D}'), // Z caron
    None,
    None,             // 0x90
    Some('\u{2018}'), // left single quote
    Some('\u{2019}'), // right single quote
    Some('\u{201C}'), // left double quote
    Some('\u{201D}'), // right double quote
    Some('\u{2022}'), // bullet
    Some('\u{2013}'), // en dash
    Some('\u{2014}'), // em dash
    Some('\u{02DC}'), // small tilde
    Some('\u{2122}'), // trade mark
    Some('\u{0161}'), // s caron
    Some('\u{203A}'), // single right angle quote
    Some('\u{0153}'), // oe
    None,
    Some('\u{017E}'), // z caron
    Some('\u{0178}'), // Y diaeresis
];

/// WinAnsi code for a character.
///
/// ```
/// use pdf_kiln::fonts::encoding::unicode_to_winansi;
///
/// assert_eq!(unicode_to_winansi('A'), Some(0x41));
/// assert_eq!(unicode_to_winansi('€'), Some(0x80));
/// assert_eq!(unicode_to_winansi('中'), None);
/// ```
pub fn unicode_to_winansi(ch: char) -> Option<u8> {
    let code = ch as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .position(|c| *c == Some(ch))
            .map(|i| 0x80 + i as u8),
    }
}

/// Character for a WinAnsi code.
pub fn winansi_to_unicode(code: u8) -> Option<char> {
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as char),
        0x80..=0x9F => WIN_ANSI_HIGH[(code - 0x80) as usize],
        _ => None,
    }
}

/// Whether every character of `text` has a WinAnsi code.
pub fn is_winansi_text(text: &str) -> bool {
    text.chars().all(|ch| unicode_to_winansi(ch).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winansi_mapping() {
        assert_eq!(unicode_to_winansi('é'), Some(0xE9));
        assert_eq!(unicode_to_winansi('—'), Some(0x97));
        assert_eq!(unicode_to_winansi('Ÿ'), Some(0x9F));
        assert_eq!(unicode_to_winansi('\n'), None);
        assert_eq!(unicode_to_winansi('\u{0081}'), None);
    }

    #[test]
    fn test_winansi_decode_inverts_encode() {
        for code in 0u8..=255 {
            if let Some(ch) = winansi_to_unicode(code) {
                assert_eq!(unicode_to_winansi(ch), Some(code));
            }
        }
        assert_eq!(winansi_to_unicode(0x8D), None);
    }

    #[test]
    fn test_is_winansi_text() {
        assert!(is_winansi_text("Crème brûlée €5"));
        assert!(!is_winansi_text("Привет"));
    }
}
