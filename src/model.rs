use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single animation frame: an ordered list of pattern lines.
///
/// Fields the engine does not interpret (frame name, state type, ...) are
/// kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub lines: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Frame {
    pub fn from_lines<S: Into<String>>(lines: Vec<S>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            extra: Map::new(),
        }
    }
}

/// One design document: the ordered frame sequence under mutation, plus any
/// document-level fields (name, fps, description, ...) preserved verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    pub frames: Vec<Frame>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DesignDocument {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse design document")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize design document")
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Snapshot of a design the operator chose to keep. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovedRecord {
    pub iteration: usize,
    pub timestamp: DateTime<Utc>,
    pub frame_count: usize,
    pub data: DesignDocument,
}
