//! Flow (arc) types for the BPMN graph model.

use std::fmt;

use crate::identifier::Id;

/// The kind of connection a flow represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    /// Ordered control flow inside a single process
    Sequence,
    /// Cross-process message exchange, owned by the enclosing collaboration
    Message,
    /// Non-control association, e.g. to a text annotation
    Association,
}

/// A directed arc between two registered nodes.
///
/// Both endpoints must already exist in the graph when the flow is added;
/// see [`Graph::add_flow`](crate::graph::Graph::add_flow).
#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    id: Id,
    name: String,
    kind: FlowKind,
    source: Id,
    target: Id,
    process: Id,
}

impl Flow {
    /// Create a new Flow.
    ///
    /// For `FlowKind::Message` the `process` is the enclosing
    /// collaboration's id rather than either endpoint's process.
    pub fn new(
        id: Id,
        name: impl Into<String>,
        kind: FlowKind,
        source: Id,
        target: Id,
        process: Id,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            source,
            target,
            process,
        }
    }

    /// Get the flow identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the flow name (empty when the source document had none).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the flow kind.
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    /// Get the source node id.
    pub fn source(&self) -> Id {
        self.source
    }

    /// Get the target node id.
    pub fn target(&self) -> Id {
        self.target
    }

    /// Get the owning process id.
    pub fn process(&self) -> Id {
        self.process
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
