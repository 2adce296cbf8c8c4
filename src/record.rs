//! Input records and the persisted layout descriptor.
//!
//! A thread arrives either as the bare message list or as the full thread
//! object (`{id, title, created_at, messages}`) a backend returns. Every
//! field besides `id`, `parent_id` and `layout_data` is payload and passes
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LayoutError;
use crate::layout::variation::GenerationParams;

/// One message of a conversation thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Persisted `LayoutDescriptor`: a JSON string (as stored in a text
    /// column) or an inline object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_data: Option<Value>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl MessageRecord {
    pub fn new(id: i64, parent_id: Option<i64>) -> Self {
        Self { id, parent_id, layout_data: None, payload: Map::new() }
    }

    /// Attach a descriptor as an inline object.
    pub fn with_descriptor(mut self, descriptor: &LayoutDescriptor) -> Self {
        self.layout_data = serde_json::to_value(descriptor).ok();
        self
    }

    /// Parse the stored descriptor. `None` when nothing is stored.
    pub fn descriptor(&self) -> Option<Result<LayoutDescriptor, LayoutError>> {
        let raw = self.layout_data.as_ref()?;
        let parsed = match raw {
            Value::Null => return None,
            Value::String(s) => serde_json::from_str(s),
            other => LayoutDescriptor::deserialize(other),
        };
        Some(parsed.map_err(|source| LayoutError::InvalidDescriptor { id: self.id, source }))
    }
}

/// Minimal parameter set that regenerates a node's exact spiral.
///
/// Wire shape: `{offsetX, offsetY, startAngle, overrides: {curvatureSign,
/// lengthScale, curvatureScale, angleOffset}}`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDescriptor {
    /// Curve origin relative to the canvas center.
    pub offset_x: f64,
    pub offset_y: f64,
    /// Start angle before the override's angle offset (radians).
    pub start_angle: f64,
    pub overrides: GenerationParams,
}

impl LayoutDescriptor {
    pub fn to_json(&self) -> Result<String, LayoutError> {
        serde_json::to_string(self).map_err(LayoutError::Serialize)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ThreadSnapshot {
    messages: Vec<MessageRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ThreadInput {
    Messages(Vec<MessageRecord>),
    Thread(ThreadSnapshot),
}

/// Read a message list or a thread object.
pub fn parse_thread(json: &str) -> Result<Vec<MessageRecord>, LayoutError> {
    let input: ThreadInput = serde_json::from_str(json).map_err(LayoutError::InvalidInput)?;
    Ok(match input {
        ThreadInput::Messages(messages) => messages,
        ThreadInput::Thread(thread) => thread.messages,
    })
}

/// Drop every stored descriptor so the next layout searches from scratch.
pub fn clear_layouts(records: &mut [MessageRecord]) {
    for record in records {
        record.layout_data = None;
    }
}
