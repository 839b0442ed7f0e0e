//! Error types for the PDF engine.
//!
//! Structural parse failures abort a load, filter failures are local to one
//! stream, and the field-value family is reported at the offending call with
//! the field's qualified name and the numbers involved. Dangling references are
//! never errors: lookups return `Option`.

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing, mutating or writing a document.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Unrecoverable malformed token stream at a byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for the failure
        reason: String,
    },

    /// Cross-reference data could not be read and repair was disabled or failed
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// Referenced object does not exist in the context
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has the wrong type for the requested operation
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of input
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unsupported feature
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Stream decoding or encoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Stream uses a codec this engine does not implement
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Font program could not be decoded or subset
    #[error("Font error: {0}")]
    Font(String),

    /// Text cannot be represented in the active font
    #[error("Cannot encode character {ch:?} with font '{font}'")]
    Encoding {
        /// Font base name
        font: String,
        /// First character that could not be encoded
        ch: char,
    },

    /// A new value is longer than the field's maximum length
    #[error("Value for field '{name}' has length {len}, exceeding max length {max}")]
    MaxLengthExceeded {
        /// Qualified field name
        name: String,
        /// Length of the rejected value
        len: usize,
        /// Configured maximum length
        max: usize,
    },

    /// A new maximum length is shorter than the field's current value
    #[error("Max length {max} for field '{name}' is shorter than its current value (length {len})")]
    InvalidMaxLength {
        /// Qualified field name
        name: String,
        /// Length of the current value
        len: usize,
        /// Rejected maximum length
        max: usize,
    },

    /// Field holds rich text, which is not read or written
    #[error("Field '{name}' is a rich text field, which is not supported")]
    RichTextUnsupported {
        /// Qualified field name
        name: String,
    },

    /// Default appearance string has no `Tf` operator
    #[error("Default appearance of field '{name}' has no font size operator (Tf)")]
    MissingFontSizeOperator {
        /// Qualified field name
        name: String,
    },

    /// Option value is not offered by a choice or button field
    #[error("Field '{name}' has no option '{value}'")]
    InvalidOption {
        /// Qualified field name
        name: String,
        /// Rejected value
        value: String,
    },

    /// No field with this qualified name
    #[error("No form field named '{0}'")]
    FieldNotFound(String),

    /// A field with this qualified name already exists
    #[error("A form field named '{0}' already exists")]
    DuplicateField(String),

    /// Field exists but is of another kind
    #[error("Field '{name}' is a {found} field, not a {expected} field")]
    FieldKindMismatch {
        /// Qualified field name
        name: String,
        /// Requested kind
        expected: &'static str,
        /// Actual kind
        found: &'static str,
    },

    /// Page index outside the page tree
    #[error("Page index {index} out of range (document has {count} pages)")]
    PageOutOfRange {
        /// Requested index
        index: usize,
        /// Number of pages
        count: usize,
    },

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "invalid token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("invalid token"));
    }

    #[test]
    fn test_object_not_found_error() {
        let err = Error::ObjectNotFound(10, 0);
        assert!(format!("{}", err).contains("10 0 R"));
    }

    #[test]
    fn test_max_length_exceeded_carries_numbers() {
        let err = Error::MaxLengthExceeded {
            name: "person.zip".to_string(),
            len: 10,
            max: 5,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("person.zip"));
        assert!(msg.contains("10"));
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_encoding_error_names_font_and_char() {
        let err = Error::Encoding {
            font: "Helvetica".to_string(),
            ch: '\u{4E2D}',
        };
        let msg = format!("{}", err);
        assert!(msg.contains('\u{4E2D}'));
        assert!(msg.contains("Helvetica"));
    }

    #[test]
    fn test_unsupported_filter_error() {
        let err = Error::UnsupportedFilter("JBIG2Decode".to_string());
        assert!(format!("{}", err).contains("JBIG2Decode"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
