//! Field flags (`/Ff`) and variable-text alignment (`/Q`).
//!
//! Bit positions follow ISO 32000-1 Tables 221, 226, 228 and 230. The common
//! bits 1-3 are repeated in each kind-specific set so that a whole `/Ff` value
//! round-trips through any of them.

use bitflags::bitflags;

bitflags! {
    /// Flags common to all field kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FieldFlags: u32 {
        /// Bit 1: the user may not change the value
        const READ_ONLY = 1 << 0;
        /// Bit 2: a value is required before submit
        const REQUIRED = 1 << 1;
        /// Bit 3: not exported by submit-form actions
        const NO_EXPORT = 1 << 2;
    }
}

bitflags! {
    /// Text field flags (`/FT /Tx`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextFieldFlags: u32 {
        /// Bit 1
        const READ_ONLY = 1 << 0;
        /// Bit 2
        const REQUIRED = 1 << 1;
        /// Bit 3
        const NO_EXPORT = 1 << 2;
        /// Bit 13: text may span several lines
        const MULTILINE = 1 << 12;
        /// Bit 14: text is shown as asterisks
        const PASSWORD = 1 << 13;
        /// Bit 21: value is a file path
        const FILE_SELECT = 1 << 20;
        /// Bit 23: no spell checking
        const DO_NOT_SPELL_CHECK = 1 << 22;
        /// Bit 24: no scrolling past the visible area
        const DO_NOT_SCROLL = 1 << 23;
        /// Bit 25: divided into `/MaxLen` equally spaced cells
        const COMB = 1 << 24;
        /// Bit 26: value is rich text
        const RICH_TEXT = 1 << 25;
    }
}

bitflags! {
    /// Button field flags (`/FT /Btn`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ButtonFieldFlags: u32 {
        /// Bit 1
        const READ_ONLY = 1 << 0;
        /// Bit 2
        const REQUIRED = 1 << 1;
        /// Bit 3
        const NO_EXPORT = 1 << 2;
        /// Bit 15: exactly one radio button must stay on
        const NO_TOGGLE_TO_OFF = 1 << 14;
        /// Bit 16: radio button group
        const RADIO = 1 << 15;
        /// Bit 17: push button
        const PUSHBUTTON = 1 << 16;
        /// Bit 26: radios with the same on-state turn on together
        const RADIOS_IN_UNISON = 1 << 25;
    }
}

bitflags! {
    /// Choice field flags (`/FT /Ch`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChoiceFieldFlags: u32 {
        /// Bit 1
        const READ_ONLY = 1 << 0;
        /// Bit 2
        const REQUIRED = 1 << 1;
        /// Bit 3
        const NO_EXPORT = 1 << 2;
        /// Bit 18: combo box (dropdown); otherwise a list box
        const COMBO = 1 << 17;
        /// Bit 19: combo box accepts typed values
        const EDIT = 1 << 18;
        /// Bit 20: options are sorted
        const SORT = 1 << 19;
        /// Bit 22: list box allows several selections
        const MULTI_SELECT = 1 << 21;
        /// Bit 23: no spell checking
        const DO_NOT_SPELL_CHECK = 1 << 22;
        /// Bit 27: commit on selection change
        const COMMIT_ON_SEL_CHANGE = 1 << 26;
    }
}

/// Alignment of variable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlignment {
    /// Q = 0
    #[default]
    Left,
    /// Q = 1
    Center,
    /// Q = 2
    Right,
}

impl TextAlignment {
    /// The `/Q` value.
    ///
    /// ```
    /// use pdf_kiln::forms::TextAlignment;
    ///
    /// assert_eq!(TextAlignment::Right.q_value(), 2);
    /// ```
    pub fn q_value(&self) -> i64 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }

    /// Alignment for a `/Q` value. Out-of-range values mean left.
    pub fn from_q(q: i64) -> Self {
        match q {
            1 => Self::Center,
            2 => Self::Right,
            _ => Self::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_flags_bits() {
        assert_eq!(FieldFlags::READ_ONLY.bits(), 1);
        assert_eq!(FieldFlags::REQUIRED.bits(), 2);
        assert_eq!(FieldFlags::NO_EXPORT.bits(), 4);
    }

    #[test]
    fn test_text_field_flags_bits() {
        assert_eq!(TextFieldFlags::MULTILINE.bits(), 4096);
        assert_eq!(TextFieldFlags::PASSWORD.bits(), 8192);
        assert_eq!(TextFieldFlags::FILE_SELECT.bits(), 1 << 20);
        assert_eq!(TextFieldFlags::COMB.bits(), 1 << 24);
        assert_eq!(TextFieldFlags::RICH_TEXT.bits(), 1 << 25);
    }

    #[test]
    fn test_kind_specific_flags_keep_common_bits() {
        let ff = FieldFlags::READ_ONLY.bits() | ButtonFieldFlags::RADIO.bits();
        let button = ButtonFieldFlags::from_bits_retain(ff);
        assert!(button.contains(ButtonFieldFlags::READ_ONLY | ButtonFieldFlags::RADIO));
        assert_eq!(ChoiceFieldFlags::COMBO.bits(), 1 << 17);
        assert_eq!(ChoiceFieldFlags::MULTI_SELECT.bits(), 1 << 21);
    }

    #[test]
    fn test_alignment_q_values() {
        assert_eq!(TextAlignment::default(), TextAlignment::Left);
        for alignment in [TextAlignment::Left, TextAlignment::Center, TextAlignment::Right] {
            assert_eq!(TextAlignment::from_q(alignment.q_value()), alignment);
        }
        assert_eq!(TextAlignment::from_q(7), TextAlignment::Left);
    }
}
