//! Error taxonomy for engine operations.
//!
//! Every variant is recovered locally by the caller: the operation that
//! produced it leaves the composition untouched.

use crate::elements::ElementId;
use thiserror::Error;

/// Engine errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("Element not found: {0}")]
    NotFound(ElementId),
    #[error("Image {0} is still loading")]
    PendingResource(ElementId),
    #[error("Degenerate transform: {width}x{height}")]
    DegenerateTransform { width: f64, height: f64 },
    #[error("No element is selected")]
    NoSelection,
    #[error("Patch does not match the kind of element {0}")]
    KindMismatch(ElementId),
    #[error("Text content is empty")]
    EmptyText,
    #[error("Invalid container width: {0}")]
    InvalidWidth(f64),
    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
