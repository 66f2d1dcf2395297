//! Collaborator interface toward the GUI layer.
//!
//! The graph never talks to a concrete widget toolkit; it only notifies a
//! [`Painter`] about structural changes. Every method has a no-op default so
//! a headless graph degrades gracefully; [`NullPainter`] is exactly that.
//!
//! Threading rule: [`Painter::repaint`]/[`Painter::update`] are only invoked
//! from the owning thread via [`Graph::update`](crate::graph::Graph::update).
//! Background tasks (the status listener) signal through the graph's
//! one-shot repaint flag instead, which the UI's poll cycle consumes.

use crate::graph::Graph;
use crate::node::GraphNode;

/// Notification sink for graph changes that warrant redrawing.
pub trait Painter: Send + Sync {
    /// A graph adopted this painter. Gives stateful painters a chance to
    /// pick up nodes that already exist.
    fn register_graph(&self, graph: &Graph) {
        let _ = graph;
    }

    /// A node was spawned. `silent` suppresses any user-visible feedback
    /// (used during batch reconstruction from a save state).
    fn register_node(&self, node: &GraphNode, silent: bool) {
        let _ = (node, silent);
    }

    /// Redraw the canvas.
    fn repaint(&self) {}

    /// Refresh derived UI state.
    fn update(&self) {}
}

/// Headless painter: ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPainter;

impl Painter for NullPainter {}
