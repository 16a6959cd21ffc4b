//! Error types for BPMN XML import and export.

use std::io;

use thiserror::Error;

use bpmnio_core::GraphError;

/// The main error type for BPMN XML operations.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed or unreadable XML input. No partial graph is surfaced.
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    /// Input contained no root element at all.
    #[error("document has no root element")]
    EmptyDocument,

    /// Non-numeric geometry in a `Bounds` or `waypoint` element.
    #[error("invalid {attribute} value {value:?} in {element}")]
    Format {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    /// Graph invariant violated while building, e.g. a duplicate node id.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Output encoding label not recognized.
    #[error("unsupported encoding: {0}")]
    Encoding(String),
}

impl From<quick_xml::events::attributes::AttrError> for XmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Self::Parse(quick_xml::Error::InvalidAttr(err))
    }
}
