use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltwh};

/// Single detector observation: left-top-width-height box in pixels,
/// class label and score. Lives for one frame only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: BBox<Ltwh>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class: String,
}

impl Detection {
    pub fn new<S: Into<String>>(bbox: BBox<Ltwh>, class: S, confidence: f32) -> Self {
        Self {
            bbox,
            confidence,
            class: class.into(),
        }
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Ltwh> {
        self.bbox
    }
}
