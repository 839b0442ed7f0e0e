//! Parser options controlling strictness, repair and resource limits.
//!
//! ```
//! use pdf_kiln::parser_config::ParserOptions;
//!
//! let strict = ParserOptions::strict();
//! assert!(!strict.allow_repair);
//!
//! let custom = ParserOptions {
//!     max_nesting: 32,
//!     ..ParserOptions::lenient()
//! };
//! assert!(custom.allow_repair);
//! ```

use serde::{Deserialize, Serialize};

/// Options for loading a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Fail on the first structural problem instead of recovering
    pub strict: bool,

    /// Fall back to brute-force `N G obj` scanning when the cross-reference
    /// data cannot be used
    pub allow_repair: bool,

    /// Skip objects that fail to parse instead of aborting the load
    pub skip_invalid_objects: bool,

    /// Maximum number of skipped objects before giving up (0 = unlimited)
    pub max_errors: usize,

    /// Maximum array/dictionary nesting depth
    pub max_nesting: usize,

    /// Accept indirect objects without a closing `endobj`
    pub allow_missing_endobj: bool,

    /// Maximum decompression ratio (decoded:encoded), 0 disables the check
    pub max_decompression_ratio: u32,

    /// Maximum decoded stream size in bytes, 0 disables the check
    pub max_decompressed_size: usize,

    /// Maximum number of `/Prev` cross-reference sections followed
    pub max_prev_chain: usize,

    /// Maximum input size in bytes, 0 disables the check
    pub max_file_size: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ParserOptions {
    /// Strict mode: no repair, no skipped objects, `endobj` required.
    pub fn strict() -> Self {
        Self {
            strict: true,
            allow_repair: false,
            skip_invalid_objects: false,
            max_errors: 1,
            max_nesting: 100,
            allow_missing_endobj: false,
            max_decompression_ratio: 100,
            max_decompressed_size: 100 * 1024 * 1024, // 100 MB
            max_prev_chain: 100,
            max_file_size: 500 * 1024 * 1024, // 500 MB
        }
    }

    /// Lenient mode: repair broken cross-reference data and skip bad objects.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            allow_repair: true,
            skip_invalid_objects: true,
            max_errors: 1000,
            allow_missing_endobj: true,
            ..Self::strict()
        }
    }

    /// Whether loading may continue after `error_count` skipped objects.
    pub(crate) fn should_continue(&self, error_count: usize) -> bool {
        if self.strict || !self.skip_invalid_objects {
            return false;
        }
        self.max_errors == 0 || error_count < self.max_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_mode() {
        let opts = ParserOptions::strict();
        assert!(opts.strict);
        assert!(!opts.allow_repair);
        assert!(!opts.allow_missing_endobj);
    }

    #[test]
    fn test_lenient_is_default() {
        let opts = ParserOptions::default();
        assert_eq!(opts, ParserOptions::lenient());
        assert!(opts.allow_repair);
        assert_eq!(opts.max_nesting, 100);
    }

    #[test]
    fn test_should_continue() {
        assert!(!ParserOptions::strict().should_continue(0));

        let lenient = ParserOptions::lenient();
        assert!(lenient.should_continue(999));
        assert!(!lenient.should_continue(1000));

        let unlimited = ParserOptions {
            max_errors: 0,
            ..ParserOptions::lenient()
        };
        assert!(unlimited.should_continue(1_000_000));
    }
}
