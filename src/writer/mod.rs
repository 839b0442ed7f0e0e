//! PDF writing.
//!
//! ## Architecture
//!
//! ```text
//! PdfContext (object arena)
//!     ↓
//! [PdfWriter] (full rewrite or incremental update)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```
//!
//! [`ContentBuilder`] produces the content-stream programs used for page
//! content and widget appearances.

mod content_stream;
mod object_serializer;
mod pdf_writer;

pub use content_stream::{ContentBuilder, ContentOp};
pub use object_serializer::{format_real, write_hex_string, write_literal_string, write_name, ObjectSerializer};
pub use pdf_writer::{PdfWriter, SaveMode, SaveOptions};
