use thiserror::Error;

/// Failures at the JSON boundary. The layout itself never fails.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The thread or message list could not be deserialized.
    #[error("invalid thread input: {0}")]
    InvalidInput(#[source] serde_json::Error),
    /// A message's stored layout data is not a layout descriptor.
    #[error("invalid layout data for message {id}: {source}")]
    InvalidDescriptor {
        id: i64,
        #[source]
        source: serde_json::Error,
    },
    /// A descriptor or result could not be written out.
    #[error("could not serialize layout: {0}")]
    Serialize(#[source] serde_json::Error),
}
