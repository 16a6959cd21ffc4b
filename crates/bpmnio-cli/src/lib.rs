//! bpmnio CLI library
//!
//! This module contains the core CLI logic for the bpmnio round-trip tool:
//! import a BPMN document, report what was found, and re-export it as
//! normalized XML.

mod args;
mod config;

pub use args::Args;
pub use config::{AppConfig, ConfigError, load_config};

use log::info;
use thiserror::Error;

use bpmnio_xml::{XmlError, read_file, write_file};

/// Errors surfaced by the CLI pipeline.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Xml(#[from] XmlError),
}

/// Run the bpmnio CLI application
///
/// Imports the input BPMN document, logs a summary of the resulting graph,
/// and re-exports it to the output path using the configured export options.
///
/// # Errors
///
/// Returns [`CliError`] for:
/// - Configuration loading errors
/// - File I/O errors
/// - Import errors (malformed XML, bad geometry, duplicate ids)
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing BPMN document"
    );

    let app_config = load_config(args.config.as_ref())?;

    let graph = read_file(&args.input)?;

    let processes = graph.process_ids().count();
    info!(
        nodes = graph.node_count(),
        flows = graph.flow_count(),
        processes = processes;
        "Graph imported"
    );

    write_file(&graph, &args.output, &app_config.export)?;

    info!(output_file = args.output; "BPMN exported successfully");

    Ok(())
}
