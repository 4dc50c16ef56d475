mod common;

use std::process::Command;

use common::minimal_docx;
use pretty_assertions::assert_eq;

#[test]
fn compare_subcommand_writes_output_and_reports_counts() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old.docx");
    let new_path = dir.path().join("new.docx");
    let out_path = dir.path().join("result.docx");

    std::fs::write(&old_path, minimal_docx(&[r#"<w:p><w:r><w:t>The quick brown fox</w:t></w:r></w:p>"#])).unwrap();
    std::fs::write(&new_path, minimal_docx(&[r#"<w:p><w:r><w:t>The very quick brown fox</w:t></w:r></w:p>"#])).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_oxcompare"))
        .args(["compare", old_path.to_str().unwrap(), new_path.to_str().unwrap(), "-o", out_path.to_str().unwrap()])
        .output()
        .expect("binary runs");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 insertions"), "stdout was: {stdout}");
    assert!(out_path.is_file());
}

#[test]
fn compare_subcommand_rejects_mismatched_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old.docx");
    let new_path = dir.path().join("new.xlsx");
    std::fs::write(&old_path, minimal_docx(&[r#"<w:p><w:r><w:t>x</w:t></w:r></w:p>"#])).unwrap();
    std::fs::write(&new_path, b"not even a zip").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_oxcompare"))
        .args(["compare", old_path.to_str().unwrap(), new_path.to_str().unwrap()])
        .output()
        .expect("binary runs");

    assert_eq!(output.status.success(), false);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("mismatched file types"), "stderr was: {stderr}");
}
