//! The BPMN graph container and its construction invariants.

use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::{flow::Flow, identifier::Id, layout::Layout, node::Node};

/// Errors raised while building a [`Graph`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate node id: {0}")]
    DuplicateId(Id),

    #[error("flow {flow} references unregistered node {node}")]
    UnresolvedReference { flow: Id, node: Id },
}

/// An in-memory BPMN process diagram.
///
/// Owns the full set of nodes and flows, the diagram-interchange [`Layout`],
/// the set of distinct process ids referenced, and an optional diagram name.
///
/// A graph is populated by a single importer pass and treated as read-only
/// afterwards. Node and flow iteration follows insertion order, which is
/// what makes repeated exports byte-identical.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    name: Option<String>,
    nodes: IndexMap<Id, Node>,
    flows: IndexMap<Id, Flow>,
    processes: IndexSet<Id>,
    layout: Layout,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the diagram name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Get the diagram name, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Register a node.
    ///
    /// The node's process id is added to the tracked process set.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateId`] if a node with the same id is
    /// already registered.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id()) {
            return Err(GraphError::DuplicateId(node.id()));
        }
        self.processes.insert(node.process());
        self.nodes.insert(node.id(), node);
        Ok(())
    }

    /// Register a flow between two already-registered nodes.
    ///
    /// Appends the flow id to the source node's outgoing arc list and the
    /// target node's incoming arc list, and tracks the flow's process id.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnresolvedReference`] if either endpoint is not
    /// a registered node.
    pub fn add_flow(&mut self, flow: Flow) -> Result<(), GraphError> {
        for endpoint in [flow.source(), flow.target()] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::UnresolvedReference {
                    flow: flow.id(),
                    node: endpoint,
                });
            }
        }

        if let Some(source) = self.nodes.get_mut(&flow.source()) {
            source.push_outgoing(flow.id());
        }
        if let Some(target) = self.nodes.get_mut(&flow.target()) {
            target.push_incoming(flow.id());
        }

        self.processes.insert(flow.process());
        self.flows.insert(flow.id(), flow);
        Ok(())
    }

    /// Track a process id even before any node references it.
    ///
    /// Used by the importer when it encounters a `process` element.
    pub fn mark_process(&mut self, process: Id) {
        self.processes.insert(process);
    }

    /// Look up a node by id.
    pub fn node(&self, id: Id) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Look up a flow by id.
    pub fn flow(&self, id: Id) -> Option<&Flow> {
        self.flows.get(&id)
    }

    /// Iterate nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Iterate flows in insertion order.
    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered flows.
    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    /// Iterate the distinct process ids referenced, in first-seen order.
    pub fn process_ids(&self) -> impl Iterator<Item = Id> {
        self.processes.iter().copied()
    }

    /// Borrow the diagram layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Mutably borrow the diagram layout, for attaching bounds and
    /// waypoints during import.
    pub fn layout_mut(&mut self) -> &mut Layout {
        &mut self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        flow::FlowKind,
        node::{NodeKind, TaskKind},
    };

    fn task(id: &str, process: &str) -> Node {
        Node::new(
            Id::new(id),
            "",
            Id::new(process),
            NodeKind::Task(TaskKind::Generic),
        )
    }

    fn seq_flow(id: &str, source: &str, target: &str, process: &str) -> Flow {
        Flow::new(
            Id::new(id),
            "",
            FlowKind::Sequence,
            Id::new(source),
            Id::new(target),
            Id::new(process),
        )
    }

    #[test]
    fn duplicate_node_id_is_rejected() {
        let mut graph = Graph::new();
        graph.add_node(task("a", "p")).unwrap();

        let err = graph.add_node(task("a", "p")).unwrap_err();
        assert_eq!(err, GraphError::DuplicateId(Id::new("a")));
    }

    #[test]
    fn flow_requires_registered_endpoints() {
        let mut graph = Graph::new();
        graph.add_node(task("a", "p")).unwrap();

        let err = graph.add_flow(seq_flow("f", "a", "ghost", "p")).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnresolvedReference {
                flow: Id::new("f"),
                node: Id::new("ghost"),
            }
        );
        assert_eq!(graph.flow_count(), 0);
    }

    #[test]
    fn add_flow_maintains_ordered_arc_lists() {
        let mut graph = Graph::new();
        graph.add_node(task("a", "p")).unwrap();
        graph.add_node(task("b", "p")).unwrap();
        graph.add_node(task("c", "p")).unwrap();
        graph.add_flow(seq_flow("f1", "a", "b", "p")).unwrap();
        graph.add_flow(seq_flow("f2", "a", "c", "p")).unwrap();

        let a = graph.node(Id::new("a")).unwrap();
        assert_eq!(a.outgoing(), &[Id::new("f1"), Id::new("f2")]);
        assert_eq!(graph.node(Id::new("b")).unwrap().incoming(), &[Id::new("f1")]);
    }

    #[test]
    fn processes_tracked_from_nodes_flows_and_marks() {
        let mut graph = Graph::new();
        graph.mark_process(Id::new("p1"));
        graph.add_node(task("a", "p1")).unwrap();
        graph.add_node(task("b", "p2")).unwrap();
        graph.add_flow(seq_flow("f", "a", "b", "collab")).unwrap();

        let ids: Vec<Id> = graph.process_ids().collect();
        assert_eq!(ids, vec![Id::new("p1"), Id::new("p2"), Id::new("collab")]);
    }

    #[test]
    fn nodes_iterate_in_insertion_order() {
        let mut graph = Graph::new();
        graph.add_node(task("z", "p")).unwrap();
        graph.add_node(task("a", "p")).unwrap();
        graph.add_node(task("m", "p")).unwrap();

        let ids: Vec<String> = graph.nodes().map(|n| n.id().to_string()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }
}
