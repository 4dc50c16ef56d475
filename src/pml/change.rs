//! Change records the PML engine returns to callers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PmlChangeKind {
    SlideInserted,
    SlideDeleted,
    SlideMoved,
    ShapeInserted,
    ShapeDeleted,
    TextChanged,
    ShapeMoved,
    ShapeResized,
    ShapeRotated,
    ShapeStyleChanged,
    ImageReplaced,
    RunFormatChanged,
    ChartChanged,
    TableChanged,
    TransitionChanged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PmlLocation {
    pub slide_index: usize,
    pub shape_id: Option<String>,
    pub shape_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmlChange {
    pub kind: PmlChangeKind,
    pub summary: String,
    pub old_text: Option<String>,
    pub new_text: Option<String>,
    pub location: PmlLocation,
    /// Set for `SlideMoved`: (old_index, new_index).
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
}
