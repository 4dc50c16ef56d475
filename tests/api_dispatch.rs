mod common;

use std::path::Path;

use common::{minimal_docx, minimal_pptx, minimal_xlsx};
use oxcompare::api::{compare, resolve_family, CompareSettings, Family};
use oxcompare::config::{PmlSettings, SmlSettings, WmlSettings};
use oxcompare::error::CompareError;

#[test]
fn mismatched_extensions_are_rejected_before_any_bytes_are_read() {
    let err = resolve_family(Path::new("old.docx"), Path::new("new.xlsx")).unwrap_err();
    assert!(matches!(err, CompareError::UnsupportedFileType(_)));
}

#[test]
fn word_family_dispatches_through_the_unified_entry_point() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>same text</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>changed text</w:t></w:r></w:p>"#]);
    let settings = CompareSettings::Word(WmlSettings::default());
    let result = compare(&old, &new, &settings).unwrap();
    assert_eq!(settings.family(), Family::Word);
    assert!(result.counters.insertions > 0 || result.counters.format_changes > 0);
    assert!(!result.document.is_empty());
}

#[test]
fn excel_family_dispatches_through_the_unified_entry_point() {
    let old = minimal_xlsx("Sheet1", "1");
    let new = minimal_xlsx("Sheet1", "2");
    let settings = CompareSettings::Excel(SmlSettings::default());
    let result = compare(&old, &new, &settings).unwrap();
    assert_eq!(settings.family(), Family::Excel);
    assert!(result.counters.format_changes > 0 || !result.changes.is_empty());
}

#[test]
fn powerpoint_family_dispatches_through_the_unified_entry_point() {
    let old = minimal_pptx(&["Hello"]);
    let new = minimal_pptx(&["Goodbye"]);
    let settings = CompareSettings::PowerPoint(PmlSettings::default());
    let result = compare(&old, &new, &settings).unwrap();
    assert_eq!(settings.family(), Family::PowerPoint);
    assert!(!result.changes.is_empty());
}

#[test]
fn identical_inputs_have_zero_total_changes_across_every_family() {
    let docx = minimal_docx(&[r#"<w:p><w:r><w:t>same</w:t></w:r></w:p>"#]);
    let xlsx = minimal_xlsx("Sheet1", "1");
    let pptx = minimal_pptx(&["Same"]);

    for (bytes, settings) in [
        (docx, CompareSettings::Word(WmlSettings::default())),
        (xlsx, CompareSettings::Excel(SmlSettings::default())),
        (pptx, CompareSettings::PowerPoint(PmlSettings::default())),
    ] {
        let result = compare(&bytes, &bytes, &settings).unwrap();
        assert!(result.changes.is_empty(), "family {:?} reported changes on identical input", settings.family());
        assert_eq!(result.counters, oxcompare::api::Counters::default());
    }
}

#[test]
fn comparing_twice_with_identical_inputs_is_deterministic() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>The very quick brown fox</w:t></w:r></w:p>"#]);
    let settings = CompareSettings::Word(WmlSettings {
        date_for_revisions: Some("2024-01-01T00:00:00Z".to_string()),
        ..WmlSettings::default()
    });

    let first = compare(&old, &new, &settings).unwrap();
    let second = compare(&old, &new, &settings).unwrap();

    assert_eq!(first.document, second.document, "emitted bytes must be deterministic given a pinned revision date");
    assert_eq!(first.counters, second.counters);
}
