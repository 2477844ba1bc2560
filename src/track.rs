use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};

/// Snapshot of a persistent track as seen by callers.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: u64,
    pub class: String,
    pub confidence: f32,
    pub bbox: BBox<Ltwh>,

    // in frames
    pub age: u32,
    pub total_visible_count: u32,
    pub consecutive_invisible_count: u32,
}
