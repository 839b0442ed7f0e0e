//! Tests for files whose objects live in compressed object streams and whose
//! cross-reference data is a PDF 1.5 xref stream.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use pdf_kiln::forms::FieldKind;
use pdf_kiln::geometry::Rect;
use pdf_kiln::objstm::parse_object_stream;
use pdf_kiln::writer::SaveOptions;
use pdf_kiln::{Dict, Object, ObjectRef, ParserOptions, PdfDocument};
use std::io::Write;

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn object_stream(n: i64, first: i64, data: &[u8]) -> Object {
    let mut dict = Dict::new();
    dict.insert("Type".to_string(), Object::name("ObjStm"));
    dict.insert("N".to_string(), Object::Integer(n));
    dict.insert("First".to_string(), Object::Integer(first));
    dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
    Object::stream(dict, data.to_vec())
}

/// Catalog in a plain object, page tree and a text field inside a deflated
/// object stream, located through a cross-reference stream.
fn compressed_pdf() -> Vec<u8> {
    let mut out = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();

    let catalog_offset = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 3 0 R /AcroForm << /Fields [5 0 R] >> >>\nendobj\n");

    let bodies = [
        "<< /Type /Pages /Kids [4 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 3 0 R /MediaBox [0 0 300 400] /Rotate 90 /Annots [5 0 R] >>",
        "<< /FT /Tx /T (code) /V (XJ-42) /Type /Annot /Subtype /Widget /Rect [10 10 110 30] /P 4 0 R >>",
    ];
    let mut pairs = String::new();
    let mut objects = String::new();
    for (i, body) in bodies.iter().enumerate() {
        pairs.push_str(&format!("{} {} ", i + 3, objects.len()));
        objects.push_str(body);
        objects.push('\n');
    }
    let content = format!("{}{}", pairs, objects);
    let packed = deflate(content.as_bytes());

    let objstm_offset = out.len();
    out.extend_from_slice(
        format!(
            "2 0 obj\n<< /Type /ObjStm /N 3 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            pairs.len(),
            packed.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&packed);
    out.extend_from_slice(b"\nendstream\nendobj\n");

    let xref_offset = out.len();
    let mut rows = Vec::new();
    let mut row = |kind: u8, field2: u32, field3: u16| {
        rows.push(kind);
        rows.extend_from_slice(&field2.to_be_bytes());
        rows.extend_from_slice(&field3.to_be_bytes());
    };
    row(0, 0, 65535);
    row(1, catalog_offset as u32, 0);
    row(1, objstm_offset as u32, 0);
    row(2, 2, 0);
    row(2, 2, 1);
    row(2, 2, 2);
    row(1, xref_offset as u32, 0);

    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());
    out
}

#[test]
fn test_parse_object_stream_basic() {
    let pairs = b"10 0 11 3 ";
    let objects = b"42 /Test";
    let mut data = pairs.to_vec();
    data.extend_from_slice(objects);

    let stream = object_stream(2, pairs.len() as i64, &data);
    let result = parse_object_stream(&stream, &ParserOptions::default()).unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[0], (10, Object::Integer(42)));
    assert_eq!(result[1], (11, Object::name("Test")));
}

#[test]
fn test_parse_object_stream_complex_objects() {
    let pairs = b"20 0 21 10 ";
    let objects = b"[ 1 2 3 ] << /Type /Page /Parent 7 0 R >>";
    let mut data = pairs.to_vec();
    data.extend_from_slice(objects);

    let stream = object_stream(2, pairs.len() as i64, &data);
    let result = parse_object_stream(&stream, &ParserOptions::default()).unwrap();

    let array = result[0].1.as_array().unwrap();
    assert_eq!(array.len(), 3);
    let dict = result[1].1.as_dict().unwrap();
    assert_eq!(dict.get("Parent"), Some(&Object::Reference(ObjectRef::new(7, 0))));
}

#[test]
fn test_parse_object_stream_with_whitespace() {
    let pairs = b"  10   0   11   3  ";
    let objects = b"42 99";
    let mut data = pairs.to_vec();
    data.extend_from_slice(objects);

    let stream = object_stream(2, pairs.len() as i64, &data);
    let result = parse_object_stream(&stream, &ParserOptions::default()).unwrap();
    assert_eq!(result.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![10, 11]);
    assert_eq!(result[1].1.as_integer(), Some(99));
}

#[test]
fn test_load_compressed_objects() {
    let mut doc = PdfDocument::load(&compressed_pdf()).unwrap();
    assert!(!doc.is_repaired());
    assert_eq!(doc.version(), "1.5");
    assert_eq!(doc.page_count(), 1);

    let page = doc.page(0).unwrap();
    assert_eq!(page.media_box, Rect::new(0.0, 0.0, 300.0, 400.0));
    assert_eq!(page.rotation, 90);

    let field = doc.form().field("code").unwrap();
    assert_eq!(field.kind(), FieldKind::Text);
    assert_eq!(field.reference(), ObjectRef::new(5, 0));
    let text = doc.text_field("code").unwrap().get_text().unwrap();
    assert_eq!(text.as_deref(), Some("XJ-42"));
}

#[test]
fn test_incremental_update_on_xref_stream_file() {
    let original = compressed_pdf();
    let mut doc = PdfDocument::load(&original).unwrap();
    doc.text_field("code").unwrap().set_text(Some("XJ-43")).unwrap();
    let updated = doc.save(SaveOptions::incremental()).unwrap();
    assert!(updated.starts_with(&original));

    let mut reloaded = PdfDocument::load(&updated).unwrap();
    assert!(!reloaded.is_repaired());
    assert_eq!(reloaded.page_count(), 1);
    let text = reloaded.text_field("code").unwrap().get_text().unwrap();
    assert_eq!(text.as_deref(), Some("XJ-43"));
}

#[test]
fn test_full_save_flattens_object_streams() {
    let mut doc = PdfDocument::load(&compressed_pdf()).unwrap();
    let bytes = doc.save(SaveOptions::full()).unwrap();
    let text = String::from_utf8_lossy(&bytes);
    assert!(!text.contains("/ObjStm"));
    assert!(text.contains("4 0 obj"));

    let reloaded = PdfDocument::load(&bytes).unwrap();
    assert_eq!(reloaded.page(0).unwrap().rotation, 90);
}
