//! Directed edges between node pins.

use crate::types::{NodeId, PinId};

/// A directed edge from one node's named output to another node's named
/// input.
///
/// Connections are stored in two set-valued indices on the graph (the
/// outgoing set of the source node and the incoming set of the destination
/// node), so `Eq`/`Hash` must treat the four endpoint fields as the
/// identity. An edge is either present in both indices or in neither.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Connection {
    pub output_node: NodeId,
    pub output_name: String,
    pub input_node: NodeId,
    pub input_name: String,
}

impl Connection {
    pub fn new(
        output_node: NodeId,
        output_name: impl Into<String>,
        input_node: NodeId,
        input_name: impl Into<String>,
    ) -> Self {
        Self {
            output_node,
            output_name: output_name.into(),
            input_node,
            input_name: input_name.into(),
        }
    }

    /// Pin key of the source endpoint.
    #[must_use]
    pub fn source_pin(&self) -> PinId {
        PinId::output(self.output_node, self.output_name.clone())
    }

    /// Pin key of the destination endpoint.
    #[must_use]
    pub fn dest_pin(&self) -> PinId {
        PinId::input(self.input_node, self.input_name.clone())
    }
}
