use serde::{Deserialize, Serialize};

/// A single entry of a viewability-changed batch from the list surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewabilityRecord {
    pub item_id: String,
    pub index: usize,
    pub is_viewable: bool,
    /// Fraction of the item's render area on screen, `0.0..=1.0`.
    #[serde(default = "full_fraction")]
    pub visible_fraction: f32,
}

fn full_fraction() -> f32 {
    1.0
}

impl ViewabilityRecord {
    pub fn visible(item_id: impl Into<String>, index: usize, visible_fraction: f32) -> Self {
        Self {
            item_id: item_id.into(),
            index,
            is_viewable: true,
            visible_fraction,
        }
    }

    pub fn hidden(item_id: impl Into<String>, index: usize) -> Self {
        Self {
            item_id: item_id.into(),
            index,
            is_viewable: false,
            visible_fraction: 0.0,
        }
    }

    pub fn crosses(&self, threshold: f32) -> bool {
        self.is_viewable && self.visible_fraction >= threshold
    }
}
