//! Output types for the JavaScript frontend.
//!
//! These structs are serialized to JSON and handed to the renderer, which
//! draws the curves and stores `layouts` through its own backend.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::LayoutError;
use crate::layout::{LayoutResult, PlacementStatus, SpiralGeometry};

/// A message with its spiral, ready to draw.
#[derive(Debug, Clone, Serialize)]
pub struct NodeOutput {
    pub id: i64,
    pub parent_id: Option<i64>,
    /// Message fields besides the ids (writer, content, ...).
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    pub geometry: SpiralGeometry,
    /// Whether `layout_data` should be written back to storage.
    pub needs_persist: bool,
    pub status: PlacementStatus,
    /// Serialized descriptor, present when `needs_persist` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout_data: Option<String>,
}

/// Error information for the caller's console.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// The combined output sent to the frontend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreadLayoutOutput {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<NodeOutput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// `{message_id: layout_data}` for a bulk layout update.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub layouts: BTreeMap<i64, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ThreadLayoutOutput {
    pub fn from_result(result: &LayoutResult<'_>) -> Result<Self, LayoutError> {
        let layouts = result.persistable_layouts()?;
        let nodes = result
            .nodes
            .iter()
            .map(|n| -> Result<NodeOutput, LayoutError> {
                // From the node's own descriptor; `layouts` is keyed by id
                // and cannot tell duplicate ids apart.
                let layout_data = if n.needs_persist { Some(n.geometry.descriptor.to_json()?) } else { None };
                Ok(NodeOutput {
                    id: n.record.id,
                    parent_id: n.record.parent_id,
                    payload: n.record.payload.clone(),
                    geometry: n.geometry.clone(),
                    needs_persist: n.needs_persist,
                    status: n.status,
                    layout_data,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            nodes,
            warnings: result.warnings.iter().map(ToString::to_string).collect(),
            layouts,
            error: None,
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(ErrorInfo { message: message.into() }),
            ..Self::default()
        }
    }
}
