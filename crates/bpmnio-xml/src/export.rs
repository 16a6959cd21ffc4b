//! BPMN XML exporter.
//!
//! Inverse of the importer: assembles a `definitions` document from the
//! graph's nodes, flows, and layout. All iteration follows the graph's
//! insertion order and every synthesized id is derived deterministically,
//! so exporting an unmodified graph twice produces byte-identical output.

use std::{fs, io, path::Path};

use indexmap::IndexSet;
use log::info;
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use serde::Deserialize;

use bpmnio_core::{EventTrigger, Flow, FlowKind, GatewayKind, Graph, Id, Node, NodeKind, TaskKind};

use crate::error::XmlError;

const MODEL_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
const DI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
const DD_DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";
const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Output settings for the exporter.
///
/// `encoding` is an encoding label (e.g. `UTF-8`, `ISO-8859-1`) written
/// into the XML declaration and used to transcode the output; `indent` is
/// the pretty-print indentation width in spaces.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub encoding: String,
    pub indent: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            encoding: "UTF-8".to_string(),
            indent: 2,
        }
    }
}

/// Export a graph to a BPMN file.
///
/// # Errors
///
/// Returns [`XmlError::Io`] for write failures and [`XmlError::Encoding`]
/// for unknown encoding labels; a structurally valid graph never fails to
/// serialize.
pub fn write_file(
    graph: &Graph,
    path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<(), XmlError> {
    let bytes = serialize(graph, options)?;
    fs::write(&path, bytes)?;
    info!(path = path.as_ref().display().to_string(); "BPMN document exported");
    Ok(())
}

/// Serialize a graph to BPMN XML bytes in the configured encoding.
pub fn serialize(graph: &Graph, options: &ExportOptions) -> Result<Vec<u8>, XmlError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', options.indent);
    writer.write_event(Event::Decl(BytesDecl::new(
        "1.0",
        Some(&options.encoding),
        None,
    )))?;

    write_definitions(&mut writer, graph)?;

    let utf8 = writer.into_inner();
    encode(utf8, &options.encoding)
}

fn write_definitions(writer: &mut Writer<Vec<u8>>, graph: &Graph) -> Result<(), io::Error> {
    let mut definitions = BytesStart::new("bpmn:definitions");
    definitions.push_attribute(("xmlns:bpmn", MODEL_NS));
    definitions.push_attribute(("xmlns:bpmndi", DI_NS));
    definitions.push_attribute(("xmlns:omgdc", DC_NS));
    definitions.push_attribute(("xmlns:omgdi", DD_DI_NS));
    definitions.push_attribute(("xmlns:xsi", XSI_NS));
    definitions.push_attribute(("targetNamespace", "http://www.signavio.com/bpmn20"));
    definitions.push_attribute(("typeLanguage", XSD_NS));
    definitions.push_attribute(("expressionLanguage", "http://www.w3.org/1999/XPath"));
    definitions.push_attribute(("xmlns:xsd", XSD_NS));
    writer.write_event(Event::Start(definitions))?;

    let mut all_processes: IndexSet<Id> = IndexSet::new();
    for node in graph.nodes() {
        all_processes.insert(node.process());
    }
    for flow in graph.flows() {
        all_processes.insert(flow.process());
    }

    // Several processes share one collaboration wrapper and one BPMN plane;
    // a single process is itself the diagram root.
    let multi = all_processes.len() > 1;
    let root_id = if multi {
        graph
            .nodes()
            .find(|node| matches!(node.kind(), NodeKind::Collaboration))
            .map(Node::id)
            .unwrap_or_else(|| Id::new("Collaboration_1"))
    } else {
        all_processes
            .first()
            .copied()
            .unwrap_or_else(|| Id::new("Process_1"))
    };

    if multi {
        let mut collaboration = BytesStart::new("bpmn:collaboration");
        collaboration.push_attribute(("id", root_id.to_string().as_str()));
        writer.write_event(Event::Start(collaboration))?;

        let participants: Vec<&Node> = graph
            .nodes()
            .filter(|node| matches!(node.kind(), NodeKind::Participant { .. }))
            .collect();
        if participants.is_empty() {
            // No explicit participants: synthesize one lane per process.
            for process in all_processes.clone() {
                if process == root_id {
                    continue;
                }
                let mut participant = BytesStart::new("bpmn:participant");
                participant.push_attribute(("id", format!("Participant_{process}").as_str()));
                participant.push_attribute(("name", process.to_string().as_str()));
                participant.push_attribute(("processRef", process.to_string().as_str()));
                writer.write_event(Event::Empty(participant))?;
            }
        } else {
            for node in &participants {
                let mut participant = BytesStart::new("bpmn:participant");
                participant.push_attribute(("id", node.id().to_string().as_str()));
                participant.push_attribute(("name", node.name()));
                if let NodeKind::Participant {
                    process_ref: Some(process_ref),
                } = node.kind()
                {
                    participant.push_attribute(("processRef", process_ref.to_string().as_str()));
                    all_processes.insert(*process_ref);
                }
                writer.write_event(Event::Empty(participant))?;
            }
        }

        // Elements owned by the collaboration itself: message flows plus
        // any stray semantic nodes scoped to it.
        for node in graph.nodes().filter(|node| node.process() == root_id) {
            write_node(writer, node)?;
        }
        for flow in graph.flows().filter(|flow| flow.process() == root_id) {
            write_flow(writer, flow)?;
        }

        writer.write_event(Event::End(BytesEnd::new("bpmn:collaboration")))?;
    }

    // One process element per process id; the collaboration root is the
    // wrapper above, not a process.
    for process in &all_processes {
        if multi && *process == root_id {
            continue;
        }
        let mut start = BytesStart::new("bpmn:process");
        start.push_attribute(("id", process.to_string().as_str()));
        start.push_attribute(("isClosed", "false"));
        start.push_attribute(("isExecutable", "false"));
        start.push_attribute(("processType", "None"));
        writer.write_event(Event::Start(start))?;

        for node in graph.nodes().filter(|node| node.process() == *process) {
            write_node(writer, node)?;
        }
        for flow in graph.flows().filter(|flow| flow.process() == *process) {
            write_flow(writer, flow)?;
        }

        writer.write_event(Event::End(BytesEnd::new("bpmn:process")))?;
    }

    write_diagram(writer, graph, root_id)?;

    writer.write_event(Event::End(BytesEnd::new("bpmn:definitions")))?;
    Ok(())
}

/// A single diagram/plane pair shared by all processes.
fn write_diagram(writer: &mut Writer<Vec<u8>>, graph: &Graph, root_id: Id) -> Result<(), io::Error> {
    let diagram_name = match graph.name() {
        Some(name) if !name.is_empty() => name,
        _ => "diagram",
    };
    let mut diagram = BytesStart::new("bpmndi:BPMNDiagram");
    diagram.push_attribute(("id", "BPMNDiagram_1"));
    diagram.push_attribute(("name", diagram_name));
    writer.write_event(Event::Start(diagram))?;

    let mut plane = BytesStart::new("bpmndi:BPMNPlane");
    plane.push_attribute(("bpmnElement", root_id.to_string().as_str()));
    plane.push_attribute(("id", "BPMNPlane_1"));
    writer.write_event(Event::Start(plane))?;

    for node in graph.nodes() {
        if node.id() == root_id {
            continue;
        }
        let Some(bounds) = graph.layout().bounds(node.id()) else {
            // No recorded geometry: the semantic element alone suffices.
            continue;
        };
        let node_id = node.id().to_string();
        let mut shape = BytesStart::new("bpmndi:BPMNShape");
        shape.push_attribute(("bpmnElement", node_id.as_str()));
        shape.push_attribute(("id", format!("{node_id}_gui").as_str()));
        writer.write_event(Event::Start(shape))?;

        let mut rect = BytesStart::new("omgdc:Bounds");
        rect.push_attribute(("height", bounds.height.to_string().as_str()));
        rect.push_attribute(("width", bounds.width.to_string().as_str()));
        rect.push_attribute(("x", bounds.x.to_string().as_str()));
        rect.push_attribute(("y", bounds.y.to_string().as_str()));
        writer.write_event(Event::Empty(rect))?;

        writer.write_event(Event::End(BytesEnd::new("bpmndi:BPMNShape")))?;
    }

    for flow in graph.flows() {
        let flow_id = flow.id().to_string();
        let mut edge = BytesStart::new("bpmndi:BPMNEdge");
        edge.push_attribute(("bpmnElement", flow_id.as_str()));
        edge.push_attribute(("id", format!("{flow_id}_gui").as_str()));
        writer.write_event(Event::Start(edge))?;

        for point in graph.layout().waypoints(flow.id()).unwrap_or_default() {
            let mut waypoint = BytesStart::new("omgdi:waypoint");
            waypoint.push_attribute(("x", point.x.to_string().as_str()));
            waypoint.push_attribute(("y", point.y.to_string().as_str()));
            writer.write_event(Event::Empty(waypoint))?;
        }

        writer.write_event(Event::End(BytesEnd::new("bpmndi:BPMNEdge")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("bpmndi:BPMNPlane")))?;
    writer.write_event(Event::End(BytesEnd::new("bpmndi:BPMNDiagram")))?;
    Ok(())
}

/// Emit a node's semantic element: tag and attributes follow its variant,
/// then an optional `*EventDefinition` child, then the recorded arc ids.
fn write_node(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), io::Error> {
    let id = node.id().to_string();

    let (tag, trigger): (&str, EventTrigger) = match node.kind() {
        // The collaboration wrapper and its participants are emitted by the
        // definitions assembly, not as process children.
        NodeKind::Collaboration | NodeKind::Participant { .. } => return Ok(()),
        NodeKind::TextAnnotation { text } => {
            let mut start = BytesStart::new("bpmn:textAnnotation");
            start.push_attribute(("id", id.as_str()));
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("bpmn:text")))?;
            writer.write_event(Event::Text(BytesText::new(text)))?;
            writer.write_event(Event::End(BytesEnd::new("bpmn:text")))?;
            write_arcs(writer, node)?;
            writer.write_event(Event::End(BytesEnd::new("bpmn:textAnnotation")))?;
            return Ok(());
        }
        NodeKind::StartEvent { trigger } => ("bpmn:startEvent", *trigger),
        NodeKind::EndEvent { trigger } => ("bpmn:endEvent", *trigger),
        NodeKind::IntermediateCatchEvent { trigger } => ("bpmn:intermediateCatchEvent", *trigger),
        NodeKind::IntermediateThrowEvent { trigger } => ("bpmn:intermediateThrowEvent", *trigger),
        NodeKind::BoundaryEvent { trigger, .. } => ("bpmn:boundaryEvent", *trigger),
        NodeKind::Task(TaskKind::Generic) => ("bpmn:task", EventTrigger::None),
        NodeKind::Task(TaskKind::User) => ("bpmn:userTask", EventTrigger::None),
        NodeKind::Task(TaskKind::Send) => ("bpmn:sendTask", EventTrigger::None),
        NodeKind::SubProcess { .. } => ("bpmn:subProcess", EventTrigger::None),
        NodeKind::Gateway { kind, .. } => (gateway_tag(*kind), EventTrigger::None),
    };

    let mut start = BytesStart::new(tag);
    start.push_attribute(("id", id.as_str()));
    if let NodeKind::Gateway { direction, .. } = node.kind() {
        start.push_attribute(("gatewayDirection", direction.to_string().as_str()));
    }
    start.push_attribute(("name", node.name()));
    if let NodeKind::BoundaryEvent {
        attached_to: Some(activity),
        ..
    } = node.kind()
    {
        start.push_attribute(("attachedToRef", activity.to_string().as_str()));
    }
    writer.write_event(Event::Start(start))?;

    if let Some(definition) = event_definition_tag(trigger) {
        writer.write_event(Event::Empty(BytesStart::new(definition)))?;
    }
    write_arcs(writer, node)?;

    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_arcs(writer: &mut Writer<Vec<u8>>, node: &Node) -> Result<(), io::Error> {
    for arc in node.incoming() {
        writer.write_event(Event::Start(BytesStart::new("bpmn:incoming")))?;
        writer.write_event(Event::Text(BytesText::new(&arc.to_string())))?;
        writer.write_event(Event::End(BytesEnd::new("bpmn:incoming")))?;
    }
    for arc in node.outgoing() {
        writer.write_event(Event::Start(BytesStart::new("bpmn:outgoing")))?;
        writer.write_event(Event::Text(BytesText::new(&arc.to_string())))?;
        writer.write_event(Event::End(BytesEnd::new("bpmn:outgoing")))?;
    }
    Ok(())
}

fn write_flow(writer: &mut Writer<Vec<u8>>, flow: &Flow) -> Result<(), io::Error> {
    let tag = match flow.kind() {
        FlowKind::Sequence => "bpmn:sequenceFlow",
        FlowKind::Message => "bpmn:messageFlow",
        FlowKind::Association => "bpmn:association",
    };
    let mut start = BytesStart::new(tag);
    start.push_attribute(("id", flow.id().to_string().as_str()));
    start.push_attribute(("name", flow.name()));
    start.push_attribute(("sourceRef", flow.source().to_string().as_str()));
    start.push_attribute(("targetRef", flow.target().to_string().as_str()));
    writer.write_event(Event::Empty(start))?;
    Ok(())
}

fn gateway_tag(kind: GatewayKind) -> &'static str {
    match kind {
        GatewayKind::Exclusive => "bpmn:exclusiveGateway",
        GatewayKind::Parallel => "bpmn:parallelGateway",
        GatewayKind::Inclusive => "bpmn:inclusiveGateway",
        GatewayKind::EventBased => "bpmn:eventBasedGateway",
    }
}

fn event_definition_tag(trigger: EventTrigger) -> Option<&'static str> {
    match trigger {
        EventTrigger::None => None,
        EventTrigger::Message => Some("bpmn:messageEventDefinition"),
        EventTrigger::Error => Some("bpmn:errorEventDefinition"),
        EventTrigger::Cancel => Some("bpmn:cancelEventDefinition"),
        EventTrigger::Terminate => Some("bpmn:terminateEventDefinition"),
    }
}

fn encode(utf8: Vec<u8>, label: &str) -> Result<Vec<u8>, XmlError> {
    if label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8") {
        return Ok(utf8);
    }
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| XmlError::Encoding(label.to_string()))?;
    // Writer output is valid UTF-8 by construction.
    let text = String::from_utf8(utf8)
        .map_err(|err| XmlError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))?;
    let (encoded, _, _) = encoding.encode(&text);
    Ok(encoded.into_owned())
}
