//! Diagram-interchange layout: node bounds and flow waypoints.
//!
//! Layout entries are optional; a node or flow without an entry simply has
//! no recorded geometry. For flows, an empty waypoint list is meaningful:
//! it distinguishes "flow exists, no geometry" from "no flow".

use indexmap::IndexMap;

use crate::identifier::Id;

/// A 2D waypoint along a drawn flow's path.
///
/// The coordinate system matches BPMN DI: origin at the top-left,
/// Y increasing downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node's rectangular bounds in diagram coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Creates new bounds with the specified position and size
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Per-entity layout information for a diagram.
///
/// Keyed by node id (bounds) and flow id (waypoints). Iteration follows
/// insertion order so exports are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    bounds: IndexMap<Id, Bounds>,
    waypoints: IndexMap<Id, Vec<Point>>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the bounds for a node, replacing any previous entry.
    pub fn set_bounds(&mut self, node: Id, bounds: Bounds) {
        self.bounds.insert(node, bounds);
    }

    /// Get the recorded bounds for a node, if any.
    pub fn bounds(&self, node: Id) -> Option<&Bounds> {
        self.bounds.get(&node)
    }

    /// Clear any stale geometry for a flow, leaving an empty entry.
    pub fn reset_waypoints(&mut self, flow: Id) {
        self.waypoints.insert(flow, Vec::new());
    }

    /// Append a waypoint to a flow's path.
    pub fn add_waypoint(&mut self, flow: Id, point: Point) {
        self.waypoints.entry(flow).or_default().push(point);
    }

    /// Get the ordered waypoints recorded for a flow, if an entry exists.
    pub fn waypoints(&self, flow: Id) -> Option<&[Point]> {
        self.waypoints.get(&flow).map(Vec::as_slice)
    }
}
