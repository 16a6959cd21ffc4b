//! BPMN XML importer.
//!
//! Import runs in three stages: the document is materialized into an owned
//! element tree, a recursive walk classifies every known element and records
//! arc references that cannot be resolved yet, and a finalization pass turns
//! the accumulated walker state into flows and layout entries.
//!
//! Dispatch is by lowercased tag suffix, so namespace prefixes and unknown
//! wrapper elements are tolerated: anything unrecognized is skipped but
//! still recursed into.

use std::{fs, path::Path};

use indexmap::IndexMap;
use log::{debug, info};

use bpmnio_core::{
    Bounds, EventTrigger, Flow, FlowKind, GatewayDirection, GatewayKind, Graph, Id, Node,
    NodeKind, Point, TaskKind,
};

use crate::{error::XmlError, tree::Element};

/// Import a BPMN diagram from a file.
///
/// The document encoding is taken from its XML declaration (or BOM).
///
/// # Errors
///
/// Returns [`XmlError`] for unreadable files, malformed XML, non-numeric
/// geometry, or duplicate node ids. No partial graph is surfaced.
pub fn read_file(path: impl AsRef<Path>) -> Result<Graph, XmlError> {
    let bytes = fs::read(path)?;
    let root = Element::parse_bytes(&bytes)?;
    import_tree(&root)
}

/// Import a BPMN diagram from a string.
///
/// # Errors
///
/// Same failure modes as [`read_file`], minus file I/O.
pub fn read_str(source: &str) -> Result<Graph, XmlError> {
    let root = Element::parse_str(source)?;
    import_tree(&root)
}

fn import_tree(root: &Element) -> Result<Graph, XmlError> {
    let mut graph = Graph::new();
    let mut walker = Walker::default();
    walker.walk(root, Context::default(), &mut graph)?;
    walker.finish(&mut graph)?;

    info!(
        nodes = graph.node_count(),
        flows = graph.flow_count();
        "BPMN document imported"
    );
    Ok(graph)
}

/// One side of a deferred arc reference.
///
/// `endpoint` stays a raw id string until finalization, when it is resolved
/// against the registered nodes.
#[derive(Debug, Clone)]
struct ArcRecord {
    endpoint: String,
    process: Option<Id>,
    tag: String,
    name: String,
    collaboration: Option<Id>,
}

/// Mutable state accumulated across the recursive walk.
///
/// `incoming`/`outgoing` map arc ids to the reference recorded on each side;
/// a flow is constructible only when an id appears in both. Bounds and
/// waypoints are keyed by the raw element ids the DI section points at.
#[derive(Debug, Default)]
struct Walker {
    incoming: IndexMap<String, ArcRecord>,
    outgoing: IndexMap<String, ArcRecord>,
    bounds: IndexMap<String, Bounds>,
    waypoints: IndexMap<String, Vec<Point>>,
}

/// Per-branch context threaded down the recursion.
#[derive(Debug, Clone, Default)]
struct Context {
    /// Nearest ancestor process or subprocess id.
    process: Option<Id>,
    /// Most recently constructed node, the owner of `incoming`/`outgoing`
    /// children.
    node: Option<Id>,
    /// Nearest ancestor collaboration id, the owner of message flows.
    collaboration: Option<Id>,
    /// Element the current `BPMNShape` points at, the owner of `Bounds`.
    shape_ref: Option<String>,
    /// Element the current `BPMNEdge` points at, the owner of waypoints.
    edge_ref: Option<String>,
    /// XML nesting depth, recorded on subprocess nodes.
    depth: u32,
}

impl Walker {
    fn walk(&mut self, el: &Element, mut ctx: Context, graph: &mut Graph) -> Result<(), XmlError> {
        let tag = el.tag.to_ascii_lowercase();

        // Branch order matters for suffix matching: subprocess before
        // process, the task flavors inside the task branch.
        if tag.ends_with("collaboration") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                graph.add_node(Node::new(id, "", id, NodeKind::Collaboration))?;
                ctx.collaboration = Some(id);
            }
        } else if tag.ends_with("participant") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let process = ctx.collaboration.unwrap_or(id);
                let process_ref = el.attr("processRef").map(Id::new);
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    process,
                    NodeKind::Participant { process_ref },
                ))?;
            }
        } else if tag.ends_with("textannotation") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                // The annotation text lives in a nested <text> child.
                let text = el
                    .children
                    .last()
                    .map(|child| child.text.clone())
                    .unwrap_or_default();
                graph.add_node(Node::new(
                    id,
                    "",
                    owning_process(&ctx, id),
                    NodeKind::TextAnnotation { text },
                ))?;
            }
        } else if tag.ends_with("subprocess") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::SubProcess { depth: ctx.depth },
                ))?;
                ctx.node = Some(id);
                ctx.process = Some(id);
            }
        } else if tag.ends_with("process") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                ctx.process = Some(id);
                graph.mark_process(id);
                graph.set_name(clean_name(el.attr("name")));
            }
        } else if tag.ends_with("shape") {
            ctx.shape_ref = el.attr("bpmnElement").map(str::to_owned);
        } else if tag.ends_with("task") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let kind = if tag.ends_with("usertask") {
                    TaskKind::User
                } else if tag.ends_with("sendtask") {
                    TaskKind::Send
                } else {
                    TaskKind::Generic
                };
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::Task(kind),
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("startevent") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let trigger = narrow(event_trigger(el), &[EventTrigger::Message]);
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::StartEvent { trigger },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("endevent") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let trigger = narrow(
                    event_trigger(el),
                    &[
                        EventTrigger::Message,
                        EventTrigger::Terminate,
                        EventTrigger::Error,
                        EventTrigger::Cancel,
                    ],
                );
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::EndEvent { trigger },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("intermediatecatchevent") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let trigger = narrow(
                    event_trigger(el),
                    &[EventTrigger::Message, EventTrigger::Error, EventTrigger::Cancel],
                );
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::IntermediateCatchEvent { trigger },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("intermediatethrowevent") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let trigger = narrow(event_trigger(el), &[EventTrigger::Message]);
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::IntermediateThrowEvent { trigger },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("boundaryevent") {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                let trigger = narrow(
                    event_trigger(el),
                    &[EventTrigger::Message, EventTrigger::Error, EventTrigger::Cancel],
                );
                let attached_to = el.attr("attachedToRef").map(Id::new);
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::BoundaryEvent { trigger, attached_to },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("edge") {
            ctx.edge_ref = el.attr("bpmnElement").map(str::to_owned);
        } else if let Some(kind) = gateway_kind(&tag) {
            if let Some(id) = el.attr("id") {
                let id = Id::new(id);
                // Missing or unrecognized direction defaults to Unspecified.
                let direction = el
                    .attr("gatewayDirection")
                    .and_then(|value| value.parse::<GatewayDirection>().ok())
                    .unwrap_or_default();
                graph.add_node(Node::new(
                    id,
                    clean_name(el.attr("name")),
                    owning_process(&ctx, id),
                    NodeKind::Gateway { kind, direction },
                ))?;
                ctx.node = Some(id);
            }
        } else if tag.ends_with("incoming") {
            if let Some(node) = ctx.node {
                self.record_arc(true, el, &tag, node, &ctx);
            }
        } else if tag.ends_with("outgoing") {
            if let Some(node) = ctx.node {
                self.record_arc(false, el, &tag, node, &ctx);
            }
        } else if tag.ends_with("sequenceflow")
            || tag.ends_with("messageflow")
            || tag.ends_with("association")
        {
            if let (Some(id), Some(source), Some(target)) =
                (el.attr("id"), el.attr("sourceRef"), el.attr("targetRef"))
            {
                let name = clean_name(el.attr("name"));
                self.incoming.insert(
                    id.to_owned(),
                    ArcRecord {
                        endpoint: target.to_owned(),
                        process: ctx.process,
                        tag: tag.clone(),
                        name: name.clone(),
                        collaboration: ctx.collaboration,
                    },
                );
                self.outgoing.insert(
                    id.to_owned(),
                    ArcRecord {
                        endpoint: source.to_owned(),
                        process: ctx.process,
                        tag: tag.clone(),
                        name,
                        collaboration: ctx.collaboration,
                    },
                );
            }
        } else if tag.ends_with("waypoint") {
            if let Some(flow) = ctx.edge_ref.clone() {
                let x = numeric_attr(el, "waypoint", "x")?;
                let y = numeric_attr(el, "waypoint", "y")?;
                self.waypoints.entry(flow).or_default().push(Point::new(x, y));
            }
        } else if tag.ends_with("label") {
            // A label closes the geometry scope of the preceding shape.
            ctx.shape_ref = None;
        } else if tag.ends_with("bounds") {
            if let Some(shape) = ctx.shape_ref.clone() {
                let bounds = Bounds::new(
                    numeric_attr(el, "bounds", "x")?,
                    numeric_attr(el, "bounds", "y")?,
                    numeric_attr(el, "bounds", "width")?,
                    numeric_attr(el, "bounds", "height")?,
                );
                self.bounds.insert(shape, bounds);
            }
        }
        // Unknown tags fall through: not an error, and their children may
        // still contain known elements.

        for child in &el.children {
            let mut child_ctx = ctx.clone();
            child_ctx.depth = ctx.depth + 1;
            self.walk(child, child_ctx, graph)?;
        }
        Ok(())
    }

    /// Record an `<incoming>`/`<outgoing>` child of a node. Only the first
    /// occurrence of an arc id is kept.
    fn record_arc(&mut self, is_incoming: bool, el: &Element, tag: &str, node: Id, ctx: &Context) {
        let arc = el.text.trim();
        if arc.is_empty() {
            return;
        }
        let side = if is_incoming {
            &mut self.incoming
        } else {
            &mut self.outgoing
        };
        side.entry(arc.to_owned()).or_insert_with(|| ArcRecord {
            endpoint: node.to_string(),
            process: ctx.process,
            tag: tag.to_owned(),
            name: clean_name(el.attr("name")),
            collaboration: ctx.collaboration,
        });
    }

    /// Resolve the accumulated state into flows and layout entries.
    ///
    /// An arc id present on only one side never becomes a flow (it may be a
    /// non-flow textual reference); ids whose endpoints don't resolve to
    /// registered nodes are dropped with a diagnostic.
    fn finish(self, graph: &mut Graph) -> Result<(), XmlError> {
        let constructible: Vec<&String> = self
            .outgoing
            .keys()
            .filter(|id| self.incoming.contains_key(*id))
            .collect();

        for id in constructible {
            let out_rec = &self.outgoing[id];
            let in_rec = &self.incoming[id];

            let source = Id::new(&out_rec.endpoint);
            let target = Id::new(&in_rec.endpoint);
            let (Some(source_node), Some(_)) = (graph.node(source), graph.node(target)) else {
                debug!(flow = id.as_str(); "dropping flow with unresolvable endpoint");
                continue;
            };
            let source_process = source_node.process();
            let fallback_process = out_rec.process.unwrap_or(source_process);

            // Message flows belong to the enclosing collaboration, not to
            // either endpoint's process.
            let (kind, process) = if out_rec.tag.ends_with("messageflow") {
                (
                    FlowKind::Message,
                    out_rec.collaboration.unwrap_or(fallback_process),
                )
            } else if out_rec.tag.ends_with("association") {
                (FlowKind::Association, fallback_process)
            } else {
                (FlowKind::Sequence, fallback_process)
            };

            let flow_id = Id::new(id);
            graph.add_flow(Flow::new(
                flow_id,
                out_rec.name.clone(),
                kind,
                source,
                target,
                process,
            ))?;

            // Every constructed flow gets a layout entry, even an empty one.
            let layout = graph.layout_mut();
            layout.reset_waypoints(flow_id);
            if let Some(points) = self.waypoints.get(id) {
                for point in points {
                    layout.add_waypoint(flow_id, *point);
                }
            }
        }

        for (raw_id, bounds) in &self.bounds {
            let id = Id::new(raw_id);
            if graph.node(id).is_some() {
                graph.layout_mut().set_bounds(id, *bounds);
            }
        }
        Ok(())
    }
}

/// The process a node belongs to: nearest process/subprocess ancestor,
/// then the enclosing collaboration, then the node's own id for elements
/// floating outside any container.
fn owning_process(ctx: &Context, own_id: Id) -> Id {
    ctx.process.or(ctx.collaboration).unwrap_or(own_id)
}

fn gateway_kind(tag: &str) -> Option<GatewayKind> {
    if tag.ends_with("exclusivegateway") {
        Some(GatewayKind::Exclusive)
    } else if tag.ends_with("parallelgateway") {
        Some(GatewayKind::Parallel)
    } else if tag.ends_with("inclusivegateway") {
        Some(GatewayKind::Inclusive)
    } else if tag.ends_with("eventbasedgateway") {
        Some(GatewayKind::EventBased)
    } else {
        None
    }
}

/// Classify the first `*EventDefinition` child, if any.
fn event_trigger(el: &Element) -> EventTrigger {
    let Some(definition) = el
        .children
        .iter()
        .find(|child| child.tag.to_ascii_lowercase().ends_with("eventdefinition"))
    else {
        return EventTrigger::None;
    };

    let tag = definition.tag.to_ascii_lowercase();
    let stem = tag.trim_end_matches("eventdefinition");
    if stem.ends_with("message") {
        EventTrigger::Message
    } else if stem.ends_with("error") {
        EventTrigger::Error
    } else if stem.ends_with("cancel") {
        EventTrigger::Cancel
    } else if stem.ends_with("terminate") {
        EventTrigger::Terminate
    } else {
        EventTrigger::None
    }
}

/// Narrow a trigger to the subset an event class supports.
fn narrow(trigger: EventTrigger, allowed: &[EventTrigger]) -> EventTrigger {
    if allowed.contains(&trigger) {
        trigger
    } else {
        EventTrigger::None
    }
}

/// Names are single-line in the model; stray CR/LF from the document is
/// stripped.
fn clean_name(attr: Option<&str>) -> String {
    attr.map(|name| name.replace(['\r', '\n'], ""))
        .unwrap_or_default()
}

fn numeric_attr(el: &Element, element: &'static str, attribute: &'static str) -> Result<f64, XmlError> {
    let value = el.attr(attribute).unwrap_or_default();
    value.parse::<f64>().map_err(|_| XmlError::Format {
        element,
        attribute,
        value: value.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_trigger_reads_first_definition_child() {
        let el = Element::parse_str(
            "<bpmn:endEvent id=\"e\">\
               <bpmn:terminateEventDefinition/>\
               <bpmn:messageEventDefinition/>\
             </bpmn:endEvent>",
        )
        .unwrap();
        assert_eq!(event_trigger(&el), EventTrigger::Terminate);
    }

    #[test]
    fn event_trigger_without_definition_is_none() {
        let el = Element::parse_str("<bpmn:startEvent id=\"s\"/>").unwrap();
        assert_eq!(event_trigger(&el), EventTrigger::None);
    }

    #[test]
    fn narrow_rejects_illegal_triggers() {
        // A terminate definition on a start event falls back to plain.
        assert_eq!(
            narrow(EventTrigger::Terminate, &[EventTrigger::Message]),
            EventTrigger::None
        );
        assert_eq!(
            narrow(EventTrigger::Message, &[EventTrigger::Message]),
            EventTrigger::Message
        );
    }

    #[test]
    fn clean_name_strips_line_breaks() {
        assert_eq!(clean_name(Some("multi\nline\rname")), "multilinename");
        assert_eq!(clean_name(None), "");
    }

    #[test]
    fn numeric_attr_rejects_garbage() {
        let el = Element::parse_str(r#"<Bounds x="abc" y="1"/>"#).unwrap();
        let err = numeric_attr(&el, "bounds", "x").unwrap_err();
        assert!(matches!(err, XmlError::Format { attribute: "x", .. }));
        assert_eq!(numeric_attr(&el, "bounds", "y").unwrap(), 1.0);
    }
}
