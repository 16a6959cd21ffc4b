//! BPMNIO Core Types and Definitions
//!
//! This crate provides the in-memory graph model for BPMN 2.0 process
//! diagrams. It includes:
//!
//! - **Identifiers**: Efficient string-interned identifiers ([`identifier::Id`])
//! - **Nodes**: Typed diagram nodes such as events, tasks, and gateways ([`node`] module)
//! - **Flows**: Sequence flows, message flows, and associations ([`flow`] module)
//! - **Layout**: Diagram-interchange bounds and edge waypoints ([`layout`] module)
//! - **Graph**: The container owning nodes, flows, and layout ([`graph::Graph`])
//!
//! A [`graph::Graph`] is built once by an importer pass and then treated as
//! read-only by exporters and downstream consumers.

pub mod flow;
pub mod graph;
pub mod identifier;
pub mod layout;
pub mod node;

pub use flow::{Flow, FlowKind};
pub use graph::{Graph, GraphError};
pub use identifier::Id;
pub use layout::{Bounds, Layout, Point};
pub use node::{EventTrigger, GatewayDirection, GatewayKind, Node, NodeKind, TaskKind};
