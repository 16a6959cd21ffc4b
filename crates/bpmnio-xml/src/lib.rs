//! BPMN 2.0 XML import and export for the bpmnio graph model.
//!
//! This crate converts between BPMN 2.0 XML documents (including the
//! diagram-interchange layout extension) and the in-memory
//! [`Graph`](bpmnio_core::Graph) from `bpmnio-core`.
//!
//! # Pipeline
//!
//! ```text
//! BPMN XML bytes
//!     ↓ tree        owned element tree (quick-xml)
//!     ↓ import      recursive classification + deferred arc resolution
//! Graph + Layout
//!     ↓ export      deterministic document assembly
//! BPMN XML bytes
//! ```
//!
//! Import is tolerant: unknown tags are recursed into but otherwise
//! ignored, and arc ids that cannot be resolved into a flow are dropped.
//! Export is deterministic: repeated exports of an unmodified graph are
//! byte-identical.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bpmnio_xml::{ExportOptions, read_file, write_file};
//!
//! let graph = read_file("order.bpmn").expect("Failed to import");
//! println!("{} nodes, {} flows", graph.node_count(), graph.flow_count());
//!
//! write_file(&graph, "normalized.bpmn", &ExportOptions::default())
//!     .expect("Failed to export");
//! ```

mod error;
mod export;
mod import;
mod tree;

pub use error::XmlError;
pub use export::{ExportOptions, serialize, write_file};
pub use import::{read_file, read_str};
