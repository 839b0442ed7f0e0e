//! Integration tests for interactive form fields.
//!
//! Covers:
//! - Text field value rules (max length, unset vs empty, rich text)
//! - Flag interactions (comb, alignment)
//! - Button and choice fields
//! - The Clean/Dirty appearance cycle and custom strategies
//! - Values surviving a save/load round trip

use pdf_kiln::error::Error;
use pdf_kiln::forms::{
    Appearance, AppearanceState, FieldAppearance, FieldKind, TextAlignment, TextFieldAppearanceOptions, Widget,
    WidgetOptions,
};
use pdf_kiln::fonts::{PdfFont, StandardFont};
use pdf_kiln::geometry::{Color, Rect};
use pdf_kiln::writer::SaveOptions;
use pdf_kiln::{Object, PageSize, PdfDocument};

fn document_with_text_field(name: &str) -> PdfDocument {
    let mut doc = PdfDocument::create(PageSize::LETTER);
    doc.add_page(612.0, 792.0).unwrap();
    doc.create_field(FieldKind::Text, name).unwrap();
    doc
}

fn page(doc: &PdfDocument) -> pdf_kiln::ObjectRef {
    doc.page_ref(0).unwrap()
}

#[test]
fn test_max_length_five() {
    let mut doc = document_with_text_field("code");
    let mut field = doc.text_field("code").unwrap();
    field.set_max_length(Some(5)).unwrap();

    field.set_text(Some("Hello")).unwrap();
    let err = field.set_text(Some("HelloWorld")).unwrap_err();
    assert!(matches!(err, Error::MaxLengthExceeded { len: 10, max: 5, .. }));
    assert!(err.to_string().contains("code"));
    assert_eq!(field.get_text().unwrap().as_deref(), Some("Hello"));
}

#[test]
fn test_alignment_right_is_q_two() {
    let mut doc = document_with_text_field("total");
    let mut field = doc.text_field("total").unwrap();
    field.set_alignment(TextAlignment::Right).unwrap();
    assert_eq!(field.alignment(), TextAlignment::Right);
    let reference = field.reference();
    drop(field);

    let q = doc
        .context()
        .lookup(reference)
        .and_then(Object::as_dict)
        .and_then(|d| d.get("Q"))
        .cloned();
    assert_eq!(q, Some(Object::Integer(2)));
}

#[test]
fn test_comb_clears_multiline_password_file_select() {
    let mut doc = document_with_text_field("pin");
    let mut field = doc.text_field("pin").unwrap();
    field.set_multiline(true).unwrap();
    field.set_password(true).unwrap();
    field.set_file_select(true).unwrap();
    field.set_max_length(Some(6)).unwrap();

    field.set_comb(true).unwrap();
    assert!(field.is_comb());
    assert!(!field.is_multiline());
    assert!(!field.is_password());
    assert!(!field.is_file_select());
}

#[test]
fn test_unset_text_is_not_empty_text() {
    let mut doc = document_with_text_field("memo");
    let mut field = doc.text_field("memo").unwrap();
    field.set_text(Some("")).unwrap();
    assert_eq!(field.get_text().unwrap(), Some(String::new()));

    field.set_text(Some("draft")).unwrap();
    field.set_text(None).unwrap();
    assert_eq!(field.get_text().unwrap(), None);
}

#[test]
fn test_font_size_needs_tf_operator() {
    let mut doc = document_with_text_field("size");
    let mut field = doc.text_field("size").unwrap();
    field.set_font_size(14.0).unwrap();
    assert_eq!(field.font_size(), Some(14.0));

    field.set_default_appearance("0 g").unwrap();
    assert!(matches!(
        field.set_font_size(10.0),
        Err(Error::MissingFontSizeOperator { .. })
    ));
}

#[test]
fn test_add_to_page_leaves_field_clean() {
    let mut doc = document_with_text_field("name");
    let page = page(&doc);
    let mut field = doc.text_field("name").unwrap();
    field.set_text(Some("Ada Lovelace")).unwrap();
    assert_eq!(field.state(), AppearanceState::Dirty);

    let widget = field
        .add_to_page(page, &TextFieldAppearanceOptions::new(Rect::new(50.0, 700.0, 200.0, 24.0)))
        .unwrap();
    assert_eq!(field.state(), AppearanceState::Clean);

    let widgets = field.widgets();
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].reference(), widget.reference());
    assert!(widgets[0].has_normal_appearance());
    assert_eq!(widgets[0].border_width(), 1.0);
    assert_eq!(widgets[0].border_color(), Some(Color::black()));
    assert_eq!(widgets[0].background_color(), Some(Color::white()));
    assert_eq!(widgets[0].page(), Some(page));
}

#[test]
fn test_second_sweep_draws_nothing() {
    let mut doc = document_with_text_field("a");
    doc.create_field(FieldKind::CheckBox, "b").unwrap();
    let a = doc.form().field("a").unwrap().handle();
    let b = doc.form().field("b").unwrap().handle();
    doc.add_widget(a, 0, &WidgetOptions::new(Rect::new(10.0, 10.0, 120.0, 20.0)))
        .unwrap();
    doc.add_widget(b, 0, &WidgetOptions::new(Rect::new(10.0, 40.0, 14.0, 14.0)))
        .unwrap();
    doc.text_field("a").unwrap().set_text(Some("value")).unwrap();

    let font = doc.standard_font(StandardFont::Helvetica);
    assert_eq!(doc.update_appearances(font, None).unwrap(), 2);
    assert_eq!(doc.update_appearances(font, None).unwrap(), 0);
    assert!(!doc.form().need_appearances(doc.context()));

    doc.check_box("b").unwrap().check().unwrap();
    assert!(doc.form().need_appearances(doc.context()));
    assert_eq!(doc.update_appearances(font, None).unwrap(), 1);
}

#[test]
fn test_strategy_receives_field_snapshot() {
    let mut doc = document_with_text_field("city");
    let city = doc.form().field("city").unwrap().handle();
    doc.add_widget(city, 0, &WidgetOptions::new(Rect::new(0.0, 0.0, 80.0, 16.0)))
        .unwrap();
    doc.text_field("city").unwrap().set_text(Some("Lyon")).unwrap();

    let strategy = |field: &FieldAppearance, widget: &Widget, font: &PdfFont| -> pdf_kiln::Result<Appearance> {
        assert_eq!(field.name, "city");
        assert_eq!(field.value.as_deref(), Some("Lyon"));
        assert_eq!(widget.rect().width, 80.0);
        Ok(Appearance::Single(format!("% {}", font.name()).into_bytes()))
    };
    let font = doc.standard_font(StandardFont::TimesRoman);
    assert_eq!(doc.update_appearances(font, Some(&strategy)).unwrap(), 1);
}

#[test]
fn test_unencodable_value_fails_regeneration() {
    let mut doc = document_with_text_field("greek");
    let greek = doc.form().field("greek").unwrap().handle();
    doc.add_widget(greek, 0, &WidgetOptions::new(Rect::new(0.0, 0.0, 80.0, 16.0)))
        .unwrap();
    doc.text_field("greek").unwrap().set_text(Some("αβγ")).unwrap();

    let font = doc.standard_font(StandardFont::Helvetica);
    let err = doc.update_appearances(font, None).unwrap_err();
    assert!(matches!(err, Error::Encoding { ch: 'α', .. }));
}

#[test]
fn test_radio_group_options_and_selection() {
    let mut doc = PdfDocument::create(PageSize::LETTER);
    doc.add_page(612.0, 792.0).unwrap();
    let group = doc.create_field(FieldKind::RadioGroup, "shipping").unwrap();
    for (i, option) in ["ground", "air"].iter().enumerate() {
        let options = WidgetOptions::new(Rect::new(50.0 + 30.0 * i as f32, 500.0, 14.0, 14.0)).on_state(*option);
        doc.add_widget(group, 0, &options).unwrap();
    }

    let mut radio = doc.radio_group("shipping").unwrap();
    assert_eq!(radio.options(), vec!["ground", "air"]);
    assert_eq!(radio.selected(), None);
    radio.select("air").unwrap();
    assert!(matches!(
        radio.select("sea"),
        Err(Error::InvalidOption { ref value, .. }) if value == "sea"
    ));

    let bytes = doc.save(SaveOptions::full()).unwrap();
    let mut reloaded = PdfDocument::load(&bytes).unwrap();
    let radio = reloaded.radio_group("shipping").unwrap();
    assert_eq!(radio.selected().as_deref(), Some("air"));
    assert_eq!(radio.options(), vec!["ground", "air"]);
}

#[test]
fn test_push_button_caption() {
    let mut doc = PdfDocument::create(PageSize::LETTER);
    doc.add_page(612.0, 792.0).unwrap();
    let button = doc.create_field(FieldKind::PushButton, "submit").unwrap();
    doc.add_widget(button, 0, &WidgetOptions::new(Rect::new(0.0, 0.0, 60.0, 20.0)).caption("Send"))
        .unwrap();

    let mut push = doc.push_button("submit").unwrap();
    assert_eq!(push.caption().as_deref(), Some("Send"));
    push.set_caption("Submit").unwrap();
    assert_eq!(push.caption().as_deref(), Some("Submit"));
    assert_eq!(push.state(), AppearanceState::Dirty);
}

#[test]
fn test_dropdown_round_trip() {
    let mut doc = PdfDocument::create(PageSize::LETTER);
    doc.add_page(612.0, 792.0).unwrap();
    let handle = doc.create_field(FieldKind::Dropdown, "country").unwrap();
    doc.add_widget(handle, 0, &WidgetOptions::new(Rect::new(0.0, 0.0, 100.0, 18.0)))
        .unwrap();
    let mut dropdown = doc.choice_field("country").unwrap();
    dropdown.set_options(&["France", "Japan", "Peru"]).unwrap();
    dropdown.select(&["Japan"]).unwrap();

    let bytes = doc.save(SaveOptions::full()).unwrap();
    let mut reloaded = PdfDocument::load(&bytes).unwrap();
    let field = reloaded.form().field("country").unwrap();
    assert_eq!(field.kind(), FieldKind::Dropdown);
    assert_eq!(field.state(), AppearanceState::Clean);
    let dropdown = reloaded.choice_field("country").unwrap();
    assert!(dropdown.is_dropdown());
    assert_eq!(dropdown.options(), vec!["France", "Japan", "Peru"]);
    assert_eq!(dropdown.selected(), vec!["Japan"]);
}

#[test]
fn test_values_and_geometry_survive_round_trip() {
    let mut doc = document_with_text_field("person.name");
    let page = page(&doc);
    doc.create_field(FieldKind::CheckBox, "person.adult").unwrap();
    let mut name = doc.text_field("person.name").unwrap();
    name.set_max_length(Some(40)).unwrap();
    name.set_text(Some("Émile Zola")).unwrap();
    name.add_to_page(page, &TextFieldAppearanceOptions::new(Rect::new(72.0, 600.0, 180.0, 22.0)))
        .unwrap();
    let adult = doc.form().field("person.adult").unwrap().handle();
    doc.add_widget(adult, 0, &WidgetOptions::new(Rect::new(72.0, 560.0, 14.0, 14.0)))
        .unwrap();
    doc.check_box("person.adult").unwrap().check().unwrap();

    let bytes = doc.save(SaveOptions::full()).unwrap();
    let mut reloaded = PdfDocument::load(&bytes).unwrap();
    let names: Vec<&str> = reloaded.form().field_names().collect();
    assert_eq!(names, vec!["person.name", "person.adult"]);

    let name = reloaded.text_field("person.name").unwrap();
    assert_eq!(name.get_text().unwrap().as_deref(), Some("Émile Zola"));
    assert_eq!(name.max_length(), Some(40));
    let widget = &name.widgets()[0];
    assert_eq!(widget.rect(), Rect::new(72.0, 600.0, 180.0, 22.0));
    assert!(widget.has_normal_appearance());
    drop(name);

    let adult = reloaded.check_box("person.adult").unwrap();
    assert!(adult.is_checked());
    assert_eq!(adult.on_state(), "Yes");
}

#[test]
fn test_remove_field_unregisters_widgets() {
    let mut doc = document_with_text_field("temp");
    let temp = doc.form().field("temp").unwrap().handle();
    doc.add_widget(temp, 0, &WidgetOptions::new(Rect::new(0.0, 0.0, 10.0, 10.0)))
        .unwrap();
    doc.remove_field("temp").unwrap();
    assert!(doc.form().is_empty());

    let bytes = doc.save(SaveOptions::full()).unwrap();
    let reloaded = PdfDocument::load(&bytes).unwrap();
    assert!(reloaded.form().is_empty());
    let page = reloaded.page(0).unwrap();
    let annots = reloaded
        .context()
        .lookup(page.reference)
        .and_then(Object::as_dict)
        .and_then(|d| d.get("Annots"))
        .and_then(Object::as_array)
        .map(Vec::len);
    assert_eq!(annots, Some(0));
}

#[test]
fn test_duplicate_field_name() {
    let mut doc = document_with_text_field("dup");
    assert!(matches!(
        doc.create_field(FieldKind::CheckBox, "dup"),
        Err(Error::DuplicateField(ref name)) if name == "dup"
    ));
}
