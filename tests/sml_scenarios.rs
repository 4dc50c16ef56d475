mod common;

use common::{minimal_xlsx, minimal_xlsx_rows};
use oxcompare::config::SmlSettings;
use oxcompare::opc::OpcPackage;
use oxcompare::sml::{compare_xlsx, SmlChangeKind};

#[test]
fn identical_workbooks_are_reported_as_unchanged() {
    let bytes = minimal_xlsx("Sheet1", "1");
    let settings = SmlSettings::default();
    let result = compare_xlsx(&bytes, &bytes, &settings).unwrap();
    assert!(result.changes.is_empty());
}

#[test]
fn sheet_rename_is_reported_with_both_names_and_no_spurious_rows() {
    let old = minimal_xlsx("Q1", "100");
    let new = minimal_xlsx("Q1-2024", "100");
    let settings = SmlSettings::default();
    let result = compare_xlsx(&old, &new, &settings).unwrap();

    let renamed: Vec<_> = result.changes.iter().filter(|c| c.kind == SmlChangeKind::SheetRenamed).collect();
    assert_eq!(renamed.len(), 1, "changes: {:?}", result.changes);
    assert_eq!(renamed[0].old_sheet_name.as_deref(), Some("Q1"));
    assert_eq!(renamed[0].new_sheet_name.as_deref(), Some("Q1-2024"));

    assert!(!result.changes.iter().any(|c| matches!(c.kind, SmlChangeKind::RowAdded | SmlChangeKind::RowDeleted)));
}

#[test]
fn renamed_sheet_with_changed_content_is_diffed_under_its_new_name() {
    // Nine rows shared plus one changed value keeps row-hash Jaccard
    // similarity (9/11 ~= 0.82) above the default 0.8 rename threshold, so
    // the rename is still detected even though content also changed.
    let shared = ["1", "2", "3", "4", "5", "6", "7", "8", "9"];
    let mut old_rows = shared.to_vec();
    old_rows.push("100");
    let mut new_rows = shared.to_vec();
    new_rows.push("200");

    let old = minimal_xlsx_rows("Q1", &old_rows);
    let new = minimal_xlsx_rows("Q1-2024", &new_rows);
    let settings = SmlSettings::default();
    let result = compare_xlsx(&old, &new, &settings).unwrap();

    assert!(result.changes.iter().any(|c| c.kind == SmlChangeKind::SheetRenamed), "changes: {:?}", result.changes);
    let value_change = result.changes.iter().find(|c| c.kind == SmlChangeKind::ValueChanged).expect("value change reported");
    assert_eq!(value_change.location.sheet, "Q1-2024");
}

#[test]
fn value_change_is_reported_and_output_opens_cleanly() {
    let old = minimal_xlsx("Sheet1", "1");
    let new = minimal_xlsx("Sheet1", "2");
    let settings = SmlSettings::default();
    let result = compare_xlsx(&old, &new, &settings).unwrap();

    assert!(result.changes.iter().any(|c| c.kind == SmlChangeKind::ValueChanged));
    OpcPackage::open(&result.document_bytes).expect("emitted workbook must open as a valid OOXML package");
}
