//! Per-family settings, with defaults matching the external-interfaces
//! contract. Settings are plain serde-derived structs so a CLI or host
//! binding can load them from JSON without the core depending on either.

use serde::{Deserialize, Serialize};

fn now_iso8601() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WmlSettings {
    pub author_for_revisions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_for_revisions: Option<String>,
    pub detail_threshold: f64,
    pub match_threshold: f64,
    pub compare_paragraph_properties: bool,
    pub compare_run_properties: bool,
    pub compare_section_properties: bool,
}

impl Default for WmlSettings {
    fn default() -> Self {
        Self {
            author_for_revisions: "Comparer".to_string(),
            date_for_revisions: None,
            detail_threshold: 0.15,
            match_threshold: 0.4,
            compare_paragraph_properties: true,
            compare_run_properties: true,
            compare_section_properties: true,
        }
    }
}

impl WmlSettings {
    /// The effective ISO-8601 timestamp: the configured date, or "now".
    pub fn effective_date(&self) -> String {
        self.date_for_revisions.clone().unwrap_or_else(now_iso8601)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmlSettings {
    pub compare_values: bool,
    pub compare_formulas: bool,
    pub compare_formatting: bool,
    pub enable_row_alignment: bool,
    pub enable_sheet_rename_detection: bool,
    pub sheet_rename_similarity_threshold: f64,
    pub case_insensitive_values: bool,
    pub numeric_tolerance: f64,
    pub compare_named_ranges: bool,
    pub compare_merged_cells: bool,
    pub compare_hyperlinks: bool,
    pub compare_data_validation: bool,
    pub compare_comments: bool,
    pub author_for_comments: String,
}

impl Default for SmlSettings {
    fn default() -> Self {
        Self {
            compare_values: true,
            compare_formulas: true,
            compare_formatting: true,
            enable_row_alignment: true,
            enable_sheet_rename_detection: true,
            sheet_rename_similarity_threshold: 0.8,
            case_insensitive_values: false,
            numeric_tolerance: 0.0,
            compare_named_ranges: true,
            compare_merged_cells: true,
            compare_hyperlinks: true,
            compare_data_validation: true,
            compare_comments: true,
            author_for_comments: "Comparer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PmlSettings {
    pub compare_slide_structure: bool,
    pub compare_shape_structure: bool,
    pub compare_text_content: bool,
    pub compare_text_formatting: bool,
    pub compare_shape_transforms: bool,
    pub compare_shape_styles: bool,
    pub compare_image_content: bool,
    pub compare_charts: bool,
    pub compare_tables: bool,
    pub compare_notes: bool,
    pub compare_transitions: bool,
    pub enable_fuzzy_shape_matching: bool,
    pub slide_similarity_threshold: f64,
    pub shape_similarity_threshold: f64,
    /// EMU tolerance below which a transform delta is not reported as a move/resize/rotate.
    pub position_tolerance: i64,
    pub use_slide_alignment_lcs: bool,
    pub author_for_changes: String,
    pub add_summary_slide: bool,
    pub add_notes_annotations: bool,
    pub inserted_color: RgbColor,
    pub deleted_color: RgbColor,
    pub modified_color: RgbColor,
    pub moved_color: RgbColor,
    pub formatting_color: RgbColor,
}

impl Default for PmlSettings {
    fn default() -> Self {
        Self {
            compare_slide_structure: true,
            compare_shape_structure: true,
            compare_text_content: true,
            compare_text_formatting: true,
            compare_shape_transforms: true,
            compare_shape_styles: true,
            compare_image_content: true,
            compare_charts: true,
            compare_tables: true,
            compare_notes: true,
            compare_transitions: true,
            enable_fuzzy_shape_matching: true,
            slide_similarity_threshold: 0.5,
            shape_similarity_threshold: 0.5,
            position_tolerance: 12700 * 2, // 2pt, in EMU
            use_slide_alignment_lcs: true,
            author_for_changes: "Comparer".to_string(),
            add_summary_slide: false,
            add_notes_annotations: false,
            inserted_color: RgbColor::new(0x00, 0xB0, 0x50),
            deleted_color: RgbColor::new(0xC0, 0x00, 0x00),
            modified_color: RgbColor::new(0xFF, 0xC0, 0x00),
            moved_color: RgbColor::new(0x00, 0x70, 0xC0),
            formatting_color: RgbColor::new(0x7F, 0x7F, 0x7F),
        }
    }
}

/// A settings-facing RGB color: plain enough to round-trip through JSON
/// without pulling in any display/parsing helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wml_defaults_match_external_interface_contract() {
        let s = WmlSettings::default();
        assert_eq!(s.author_for_revisions, "Comparer");
        assert_eq!(s.detail_threshold, 0.15);
        assert_eq!(s.match_threshold, 0.4);
    }

    #[test]
    fn sml_defaults_are_all_true_except_thresholds() {
        let s = SmlSettings::default();
        assert!(s.compare_values);
        assert!(s.enable_sheet_rename_detection);
        assert_eq!(s.sheet_rename_similarity_threshold, 0.8);
        assert_eq!(s.numeric_tolerance, 0.0);
    }

    #[test]
    fn pml_settings_round_trip_through_json() {
        let s = PmlSettings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: PmlSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.slide_similarity_threshold, s.slide_similarity_threshold);
    }
}
