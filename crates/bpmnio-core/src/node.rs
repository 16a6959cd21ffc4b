//! Node types for the BPMN graph model.
//!
//! A [`Node`] carries the fields every BPMN element shares (id, name, owning
//! process, arc-id lists) while [`NodeKind`] is a closed set of variants
//! holding only kind-specific payload. Import and export each dispatch on
//! [`NodeKind`] exhaustively, so adding a kind forces both sides to be
//! updated at compile time.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::identifier::Id;

/// Event sub-variant selected by a nested `*EventDefinition` child.
///
/// `None` covers plain (untyped) events. Each event class only admits a
/// subset of triggers; importers narrow to the legal subset and fall back to
/// `None` for anything else.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTrigger {
    /// No event definition present
    #[default]
    None,
    Message,
    Error,
    Cancel,
    Terminate,
}

/// The concrete task flavor, matching the `task`/`userTask`/`sendTask` tags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    #[default]
    Generic,
    User,
    Send,
}

/// Branching/merging gateway flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayKind {
    Exclusive,
    Parallel,
    Inclusive,
    EventBased,
}

/// The `gatewayDirection` attribute of a gateway.
///
/// A missing or unrecognized attribute value imports as `Unspecified`
/// rather than failing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayDirection {
    #[default]
    Unspecified,
    Diverging,
    Converging,
    Mixed,
}

impl FromStr for GatewayDirection {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "unspecified" => Ok(Self::Unspecified),
            "diverging" => Ok(Self::Diverging),
            "converging" => Ok(Self::Converging),
            "mixed" => Ok(Self::Mixed),
            _ => Err("Unknown gateway direction"),
        }
    }
}

impl From<GatewayDirection> for &'static str {
    fn from(val: GatewayDirection) -> Self {
        match val {
            GatewayDirection::Unspecified => "Unspecified",
            GatewayDirection::Diverging => "Diverging",
            GatewayDirection::Converging => "Converging",
            GatewayDirection::Mixed => "Mixed",
        }
    }
}

impl Display for GatewayDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &'static str = (*self).into();
        write!(f, "{s}")
    }
}

/// Closed set of BPMN node variants with kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    StartEvent {
        trigger: EventTrigger,
    },
    EndEvent {
        trigger: EventTrigger,
    },
    IntermediateCatchEvent {
        trigger: EventTrigger,
    },
    IntermediateThrowEvent {
        trigger: EventTrigger,
    },
    /// An event attached to the boundary of an activity.
    BoundaryEvent {
        trigger: EventTrigger,
        /// The `attachedToRef` activity, when declared.
        attached_to: Option<Id>,
    },
    Task(TaskKind),
    /// Sub-process invocation; `depth` is the XML nesting depth at which it
    /// was found.
    SubProcess {
        depth: u32,
    },
    Gateway {
        kind: GatewayKind,
        direction: GatewayDirection,
    },
    TextAnnotation {
        text: String,
    },
    /// Container grouping multiple participant processes.
    Collaboration,
    /// A named process lane within a collaboration.
    Participant {
        /// The `processRef` this participant points at, when declared.
        process_ref: Option<Id>,
    },
}

/// A BPMN diagram node.
///
/// Common fields are factored here; the variant-specific payload lives in
/// [`NodeKind`]. Arc-id lists are ordered and maintained by
/// [`Graph::add_flow`](crate::graph::Graph::add_flow).
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: Id,
    name: String,
    process: Id,
    kind: NodeKind,
    incoming: Vec<Id>,
    outgoing: Vec<Id>,
}

impl Node {
    /// Create a new Node with empty arc lists.
    pub fn new(id: Id, name: impl Into<String>, process: Id, kind: NodeKind) -> Self {
        Self {
            id,
            name: name.into(),
            process,
            kind,
            incoming: Vec::new(),
            outgoing: Vec::new(),
        }
    }

    /// Get the node identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the node name (empty when the source document had none).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the owning process id.
    ///
    /// For `Collaboration` nodes this is the collaboration's own id; for
    /// `Participant` nodes it is the enclosing collaboration's id.
    pub fn process(&self) -> Id {
        self.process
    }

    /// Borrow the node's kind-specific payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Ordered ids of flows targeting this node.
    pub fn incoming(&self) -> &[Id] {
        &self.incoming
    }

    /// Ordered ids of flows originating at this node.
    pub fn outgoing(&self) -> &[Id] {
        &self.outgoing
    }

    pub(crate) fn push_incoming(&mut self, flow: Id) {
        self.incoming.push(flow);
    }

    pub(crate) fn push_outgoing(&mut self, flow: Id) {
        self.outgoing.push(flow);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn gateway_direction_parses_case_insensitively() {
        assert_eq!(
            "DIVERGING".parse::<GatewayDirection>(),
            Ok(GatewayDirection::Diverging)
        );
        assert_eq!(
            "converging".parse::<GatewayDirection>(),
            Ok(GatewayDirection::Converging)
        );
        assert_eq!(
            "Mixed".parse::<GatewayDirection>(),
            Ok(GatewayDirection::Mixed)
        );
        assert!("sideways".parse::<GatewayDirection>().is_err());
    }

    #[test]
    fn gateway_direction_display_uses_bpmn_capitalization() {
        assert_eq!(GatewayDirection::Unspecified.to_string(), "Unspecified");
        assert_eq!(GatewayDirection::Diverging.to_string(), "Diverging");
    }

    proptest! {
        #[test]
        fn gateway_direction_display_round_trips(dir in prop_oneof![
            Just(GatewayDirection::Unspecified),
            Just(GatewayDirection::Diverging),
            Just(GatewayDirection::Converging),
            Just(GatewayDirection::Mixed),
        ]) {
            let parsed: GatewayDirection = dir.to_string().parse().unwrap();
            prop_assert_eq!(parsed, dir);
        }
    }

    #[test]
    fn node_starts_with_empty_arc_lists() {
        let node = Node::new(
            Id::new("Task_1"),
            "Review order",
            Id::new("Process_1"),
            NodeKind::Task(TaskKind::User),
        );
        assert!(node.incoming().is_empty());
        assert!(node.outgoing().is_empty());
        assert_eq!(node.name(), "Review order");
    }
}
