mod common;

use common::{docx_with_drawing, minimal_docx};
use oxcompare::config::WmlSettings;
use oxcompare::opc::OpcPackage;
use oxcompare::wml::{compare_docx, WmlChangeKind};

#[test]
fn identical_documents_are_reported_as_unchanged() {
    let bytes = minimal_docx(&[r#"<w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p>"#]);
    let settings = WmlSettings::default();
    let result = compare_docx(&bytes, &bytes, &settings).unwrap();
    assert!(result.changes.is_empty());
    assert_eq!(result.insertions, 0);
    assert_eq!(result.deletions, 0);
}

#[test]
fn single_word_insertion_is_reported_as_one_insertion() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>The very quick brown fox</w:t></w:r></w:p>"#]);
    let settings = WmlSettings::default();
    let result = compare_docx(&old, &new, &settings).unwrap();

    let insertions: Vec<_> = result.changes.iter().filter(|c| c.kind == WmlChangeKind::Insertion).collect();
    assert_eq!(insertions.len(), 1, "expected exactly one insertion, got {:?}", result.changes);
    assert_eq!(insertions[0].new_text.as_deref(), Some("very"));
    assert_eq!(insertions[0].location.paragraph_index, 0);
}

#[test]
fn dissimilar_paragraph_is_a_whole_replacement_not_inline_edits() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>Alpha beta gamma delta</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>Zulu yankee xray whiskey</w:t></w:r></w:p>"#]);
    let settings = WmlSettings::default();
    let result = compare_docx(&old, &new, &settings).unwrap();

    let deletions = result.changes.iter().filter(|c| c.kind == WmlChangeKind::Deletion).count();
    let insertions = result.changes.iter().filter(|c| c.kind == WmlChangeKind::Insertion).count();
    // Below the match threshold, the whole paragraph is one deleted run and
    // one inserted run, not a token-by-token diff of four words each.
    assert_eq!(deletions, 1, "changes: {:?}", result.changes);
    assert_eq!(insertions, 1, "changes: {:?}", result.changes);
}

#[test]
fn unchanged_drawing_produces_no_text_changes_and_survives_in_output() {
    let image = b"not a real png but a stable byte sequence".to_vec();
    let bytes = docx_with_drawing("Caption text", &image);
    let settings = WmlSettings::default();
    let result = compare_docx(&bytes, &bytes, &settings).unwrap();

    assert!(result.changes.is_empty());

    let pkg = OpcPackage::open(&result.document_bytes).unwrap();
    let image_uri = oxcompare::opc::PackUri::new("/word/media/image1.png".to_string()).unwrap();
    let part = pkg.part(&image_uri).expect("image part survives untouched");
    assert_eq!(part.blob(), image.as_slice());
}

#[test]
fn revision_count_matches_insertions_plus_deletions_plus_format_changes() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>The very quick brown fox</w:t></w:r></w:p>"#]);
    let settings = WmlSettings::default();
    let result = compare_docx(&old, &new, &settings).unwrap();

    assert_eq!(result.revision_count as usize, result.insertions + result.deletions + result.format_changes);
}

#[test]
fn output_package_opens_cleanly() {
    let old = minimal_docx(&[r#"<w:p><w:r><w:t>same text</w:t></w:r></w:p>"#]);
    let new = minimal_docx(&[r#"<w:p><w:r><w:t>different text</w:t></w:r></w:p>"#]);
    let settings = WmlSettings::default();
    let result = compare_docx(&old, &new, &settings).unwrap();
    OpcPackage::open(&result.document_bytes).expect("emitted package must open as a valid OOXML package");
}
