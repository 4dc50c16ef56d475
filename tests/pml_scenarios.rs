mod common;

use common::minimal_pptx;
use oxcompare::config::PmlSettings;
use oxcompare::opc::OpcPackage;
use oxcompare::pml::{compare_pptx, PmlChangeKind};

#[test]
fn identical_presentations_are_reported_as_unchanged() {
    let bytes = minimal_pptx(&["Intro"]);
    let settings = PmlSettings::default();
    let result = compare_pptx(&bytes, &bytes, &settings).unwrap();
    assert!(result.changes.is_empty());
}

#[test]
fn unchanged_slide_among_others_produces_zero_changes_for_it() {
    let old = minimal_pptx(&["Intro", "Unchanged", "Closing"]);
    let new = minimal_pptx(&["Intro (revised)", "Unchanged", "Closing (revised)"]);
    let settings = PmlSettings::default();
    let result = compare_pptx(&old, &new, &settings).unwrap();

    assert!(!result.changes.iter().any(|c| c.location.slide_index == 1), "slide 1 (\"Unchanged\") should have no changes: {:?}", result.changes);
}

#[test]
fn reordering_two_slides_produces_two_slide_moved_changes_and_no_insert_delete() {
    let old = minimal_pptx(&["S1", "S2", "S3"]);
    let new = minimal_pptx(&["S1", "S3", "S2"]);
    let settings = PmlSettings::default();
    let result = compare_pptx(&old, &new, &settings).unwrap();

    let moved = result.changes.iter().filter(|c| c.kind == PmlChangeKind::SlideMoved).count();
    let inserted = result.changes.iter().filter(|c| c.kind == PmlChangeKind::SlideInserted).count();
    let deleted = result.changes.iter().filter(|c| c.kind == PmlChangeKind::SlideDeleted).count();

    assert_eq!(moved, 2, "changes: {:?}", result.changes);
    assert_eq!(inserted, 0, "changes: {:?}", result.changes);
    assert_eq!(deleted, 0, "changes: {:?}", result.changes);
}

#[test]
fn text_change_and_output_opens_cleanly() {
    let old = minimal_pptx(&["Hello"]);
    let new = minimal_pptx(&["Goodbye"]);
    let settings = PmlSettings::default();
    let result = compare_pptx(&old, &new, &settings).unwrap();

    assert!(result.changes.iter().any(|c| c.kind == PmlChangeKind::TextChanged));
    OpcPackage::open(&result.document_bytes).expect("emitted presentation must open as a valid OOXML package");
}
