//! Error types for the editor

use pagecraft_model::{ElementId, ElementKind, SectionId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document store must be created inside a tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Unmet operation precondition.
///
/// Store operations never return these to the caller; they are logged and
/// the operation becomes a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No active page")]
    NoActivePage,

    #[error("Section not found: {0}")]
    SectionNotFound(SectionId),

    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Element is locked: {0}")]
    ElementLocked(ElementId),

    #[error("Need at least {required} elements, got {actual}")]
    TooFewElements { required: usize, actual: usize },

    #[error("Elements span more than one section")]
    CrossSection,

    #[error("Element is not a container: {0}")]
    NotAContainer(ElementId),

    #[error("Element {id} is a {from}, content of kind {to} does not apply")]
    KindChange {
        id: ElementId,
        from: ElementKind,
        to: ElementKind,
    },

    #[error("Container {container} cannot reference {child}")]
    InvalidChildReference {
        container: ElementId,
        child: ElementId,
    },

    #[error("Section index out of range: {index} (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Clipboard is empty")]
    EmptyClipboard,
}
