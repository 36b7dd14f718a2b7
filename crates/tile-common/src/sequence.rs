//! Acquisition metadata: view setups and timepoints.

use serde::{Deserialize, Serialize};

/// One angle/view of a multi-view acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewSetup {
    pub id: usize,
    pub label: String,
}

impl ViewSetup {
    pub fn new(id: usize, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }
}

/// The view setups of an acquisition plus its number of timepoints.
///
/// Loaded once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceDescription {
    setups: Vec<ViewSetup>,
    num_timepoints: usize,
}

impl SequenceDescription {
    pub fn new(setups: Vec<ViewSetup>, num_timepoints: usize) -> Self {
        Self {
            setups,
            num_timepoints: num_timepoints.max(1),
        }
    }

    pub fn setups(&self) -> &[ViewSetup] {
        &self.setups
    }

    pub fn num_setups(&self) -> usize {
        self.setups.len()
    }

    pub fn num_timepoints(&self) -> usize {
        self.num_timepoints
    }

    pub fn setup(&self, id: usize) -> Option<&ViewSetup> {
        self.setups.iter().find(|s| s.id == id)
    }
}
