use crate::core::io::record::StructureRecord;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Image rendering failed: {0}")]
pub struct RenderError(pub String);

/// Draws a picture of an evaluated structure.
///
/// Rendering is best effort: a failure is logged by the caller and never fails a task.
pub trait ImageRenderer: Send + Sync {
    fn render(&self, record: &StructureRecord, path: &Path) -> Result<(), RenderError>;
}
