//! The graph aggregate: nodes, the connection registry, persistence, and
//! execution dispatch.
//!
//! [`Graph`] owns every spawned node and the two set-valued connection
//! indices (outgoing per source node, incoming per destination node). All
//! wiring rules live here: type compatibility, the
//! at-most-one-incoming-edge-per-input invariant and its `Control`
//! exception, and the transitive severing performed by node deletion.
//!
//! Execution has two strategies. The canonical path serializes the graph to
//! JSON and dispatches it to a remote runner process over a
//! [`RunnerSession`]; the degenerate path ([`Graph::execute_local`]) runs a
//! fixed-point loop in-process with no process boundary.
//!
//! # Examples
//!
//! ```rust
//! use patchbay::graph::Graph;
//! use patchbay::node::{NodeCatalog, NodeTemplate};
//! use patchbay::pins::PinDef;
//! use patchbay::types::{Position, VarType};
//!
//! let mut catalog = NodeCatalog::new();
//! catalog.register(
//!     NodeTemplate::new("Source").with_output(PinDef::new("value", VarType::Float)),
//! );
//! catalog.register(
//!     NodeTemplate::new("Sink").with_input(PinDef::new("value", VarType::Float)),
//! );
//!
//! let mut graph = Graph::new(catalog);
//! let src = graph.spawn_node("Source", None, Position::ORIGIN, false).unwrap();
//! let dst = graph.spawn_node("Sink", None, Position(120.0, 0.0), false).unwrap();
//! graph.connect(src, "value", dst, "value").unwrap();
//! ```

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use crate::connection::Connection;
use crate::node::{GraphNode, NodeCatalog, NodeRecord, NodeRunError, PinValues};
use crate::painter::{NullPainter, Painter};
use crate::pins::{InputPin, OutputPin};
use crate::runtime::{RunnerSession, SessionConfig, SessionError, SessionShared};
use crate::types::{MalformedPinId, NodeId, PinDirection, PinId, Position, VarType, CONTROL_PIN};

/// Errors raised by graph mutation, persistence, and dispatch.
///
/// Mutation errors abort only the single requested operation and leave the
/// graph otherwise consistent.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("output {output} ({output_type}) and input {input} ({input_type}) don't match")]
    #[diagnostic(
        code(patchbay::graph::type_mismatch),
        help("A connection is legal only when one declared type is a sub- or supertype of the other.")
    )]
    TypeMismatch {
        output: PinId,
        output_type: VarType,
        input: PinId,
        input_type: VarType,
    },

    #[error("unknown node: {id}")]
    #[diagnostic(code(patchbay::graph::unknown_node))]
    UnknownNode { id: NodeId },

    #[error("unknown pin: {pin}")]
    #[diagnostic(code(patchbay::graph::unknown_pin))]
    UnknownPin { pin: PinId },

    #[error("unknown node class: {class:?}")]
    #[diagnostic(
        code(patchbay::graph::unknown_class),
        help("Register the class in the graph's NodeCatalog before spawning it.")
    )]
    UnknownClass { class: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedPinId(#[from] MalformedPinId),

    #[error("malformed save state: {detail}")]
    #[diagnostic(code(patchbay::graph::malformed_save_state))]
    MalformedSaveState { detail: String },

    #[error("node {node} failed during local execution")]
    #[diagnostic(code(patchbay::graph::node_run))]
    NodeRun {
        node: NodeId,
        #[source]
        source: NodeRunError,
    },

    #[error("no runner session attached")]
    #[diagnostic(
        code(patchbay::graph::no_session),
        help("Call Graph::attach_runner or Graph::spawn_runner before dispatching.")
    )]
    NoSession,

    #[error(transparent)]
    #[diagnostic(code(patchbay::graph::session))]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(code(patchbay::graph::serde_json))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(patchbay::graph::io))]
    Io(#[from] std::io::Error),
}

/// Reference to a node at the graph API boundary.
///
/// Callers hold `NodeId`s rather than node references; `NodeRef` exists so
/// every entry point resolves identifiers exactly once instead of core
/// logic comparing reference kinds ad hoc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeRef(NodeId);

impl NodeRef {
    pub fn id(&self) -> NodeId {
        self.0
    }
}

impl From<NodeId> for NodeRef {
    fn from(id: NodeId) -> Self {
        NodeRef(id)
    }
}

impl From<u64> for NodeRef {
    fn from(raw: u64) -> Self {
        NodeRef(NodeId(raw))
    }
}

impl From<&GraphNode> for NodeRef {
    fn from(node: &GraphNode) -> Self {
        NodeRef(node.id())
    }
}

/// Initial connections requested alongside a spawn.
///
/// Output entries wire one of the new node's outputs to an existing input;
/// input entries wire an existing output to one of the new node's inputs.
/// Outputs are applied before inputs: during batch reconstruction an input
/// connection may reference a sibling that only exists once the outputs of
/// earlier spawns are in place.
#[derive(Clone, Debug, Default)]
pub struct SpawnConnections {
    outputs: Vec<(String, NodeRef, String)>,
    inputs: Vec<(String, NodeRef, String)>,
}

impl SpawnConnections {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the new node's `own_output` to `dest_input` on `dest`.
    #[must_use]
    pub fn output(
        mut self,
        own_output: impl Into<String>,
        dest: impl Into<NodeRef>,
        dest_input: impl Into<String>,
    ) -> Self {
        self.outputs
            .push((own_output.into(), dest.into(), dest_input.into()));
        self
    }

    /// Wire `source_output` on `source` to the new node's `own_input`.
    #[must_use]
    pub fn input(
        mut self,
        own_input: impl Into<String>,
        source: impl Into<NodeRef>,
        source_output: impl Into<String>,
    ) -> Self {
        self.inputs
            .push((own_input.into(), source.into(), source_output.into()));
        self
    }
}

/// Aggregate root for a node graph.
///
/// Owns the node map, both connection indices, the monotonic ID counter,
/// the painter handle, and (once attached to a runner) the live session
/// with its background status listener.
pub struct Graph {
    catalog: NodeCatalog,
    nodes: FxHashMap<NodeId, GraphNode>,
    connections: FxHashMap<NodeId, FxHashSet<Connection>>,
    reverse_connections: FxHashMap<NodeId, FxHashSet<Connection>>,
    next_id: u64,
    newest_node: Option<NodeId>,
    painter: Arc<dyn Painter>,
    shared: Arc<SessionShared>,
    session: Option<RunnerSession>,
}

impl Graph {
    /// Create an empty graph with its own catalog and freshly initialized
    /// containers. No state is shared between graph instances.
    #[must_use]
    pub fn new(catalog: NodeCatalog) -> Self {
        Self {
            catalog,
            nodes: FxHashMap::default(),
            connections: FxHashMap::default(),
            reverse_connections: FxHashMap::default(),
            next_id: 0,
            newest_node: None,
            painter: Arc::new(NullPainter),
            shared: Arc::new(SessionShared::new(SessionConfig::DEFAULT_HISTORY_CAPACITY)),
            session: None,
        }
    }

    /// Attach a painter. Absent one, all UI notifications are no-ops.
    #[must_use]
    pub fn with_painter(mut self, painter: Arc<dyn Painter>) -> Self {
        self.painter = painter;
        self.painter.register_graph(&self);
        self
    }

    pub fn catalog(&self) -> &NodeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut NodeCatalog {
        &mut self.catalog
    }

    /// Hand out the next free node ID.
    fn allocate_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn resolve(&self, node: NodeRef) -> Result<NodeId, GraphError> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            Ok(id)
        } else {
            Err(GraphError::UnknownNode { id })
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node created last, if it still exists.
    pub fn newest_node(&self) -> Option<NodeId> {
        self.newest_node
    }

    fn sorted_node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    // ------------------------------------------------------------------
    // Spawning and deletion
    // ------------------------------------------------------------------

    /// Spawn a new node of a registered class.
    ///
    /// Allocates the next ID, materializes the template's pins, registers
    /// empty connection sets, applies any requested initial connections
    /// (outputs first, then inputs), and notifies the painter unless
    /// `silent`.
    pub fn spawn_node(
        &mut self,
        class: &str,
        connections: Option<&SpawnConnections>,
        position: Position,
        silent: bool,
    ) -> Result<NodeId, GraphError> {
        let template = self
            .catalog
            .get(class)
            .cloned()
            .ok_or_else(|| GraphError::UnknownClass {
                class: class.to_string(),
            })?;
        let id = self.allocate_node_id();
        let node = GraphNode::instantiate(template, id, position);
        self.connections.insert(id, FxHashSet::default());
        self.reverse_connections.insert(id, FxHashSet::default());
        self.nodes.insert(id, node);

        if let Some(requested) = connections {
            for (own_output, dest, dest_input) in &requested.outputs {
                self.connect(id, own_output, *dest, dest_input)?;
            }
            for (own_input, source, source_output) in &requested.inputs {
                self.connect(*source, source_output, id, own_input)?;
            }
        }

        if let Some(node) = self.nodes.get(&id) {
            self.painter.register_node(node, silent);
        }
        self.newest_node = Some(id);
        tracing::debug!(node = %id, class, "spawned node");
        Ok(id)
    }

    /// Delete a node, first severing every connection touching any of its
    /// pins. Callers must not retain references to the node across this
    /// call.
    pub fn delete_node(&mut self, node: impl Into<NodeRef>) -> Result<(), GraphError> {
        let id = self.resolve(node.into())?;

        let outgoing = self.connections.remove(&id).unwrap_or_default();
        for conn in &outgoing {
            if let Some(rev) = self.reverse_connections.get_mut(&conn.input_node) {
                rev.remove(conn);
            }
            self.refresh_connected_flag(conn.input_node, &conn.input_name);
        }

        let incoming = self.reverse_connections.remove(&id).unwrap_or_default();
        for conn in &incoming {
            if let Some(fwd) = self.connections.get_mut(&conn.output_node) {
                fwd.remove(conn);
            }
        }

        self.nodes.remove(&id);
        if self.newest_node == Some(id) {
            self.newest_node = None;
        }
        tracing::debug!(node = %id, "deleted node");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connection registry
    // ------------------------------------------------------------------

    /// Create a logical connection from `out_name` on `from` to `in_name`
    /// on `to`.
    ///
    /// Fails with [`GraphError::TypeMismatch`], leaving both indices
    /// untouched, when neither declared type is assignable to the other.
    /// A prior connection targeting the same input is displaced atomically
    /// from both indices, unless the target is the reserved `Control` input
    /// on a control-flow node, which accepts multiple sequencing edges.
    pub fn connect(
        &mut self,
        from: impl Into<NodeRef>,
        out_name: &str,
        to: impl Into<NodeRef>,
        in_name: &str,
    ) -> Result<(), GraphError> {
        let out_id = self.resolve(from.into())?;
        let in_id = self.resolve(to.into())?;

        let (output_type, input_type, control_input) = {
            let out_node = &self.nodes[&out_id];
            let output = out_node.output(out_name).ok_or_else(|| GraphError::UnknownPin {
                pin: PinId::output(out_id, out_name),
            })?;
            let in_node = &self.nodes[&in_id];
            let input = in_node.input(in_name).ok_or_else(|| GraphError::UnknownPin {
                pin: PinId::input(in_id, in_name),
            })?;
            (
                output.var_type().clone(),
                input.var_type().clone(),
                in_node.is_control() && in_name == CONTROL_PIN,
            )
        };

        if !output_type.compatible_with(&input_type) {
            return Err(GraphError::TypeMismatch {
                output: PinId::output(out_id, out_name),
                output_type,
                input: PinId::input(in_id, in_name),
                input_type,
            });
        }

        tracing::debug!(
            output = %PinId::output(out_id, out_name),
            input = %PinId::input(in_id, in_name),
            "connecting pins"
        );

        // At most one incoming edge per data input: displace the old edge
        // from both indices before inserting the new one.
        if !control_input {
            let displaced = self
                .reverse_connections
                .get(&in_id)
                .and_then(|rev| rev.iter().find(|c| c.input_name == in_name).cloned());
            if let Some(old) = displaced {
                if let Some(rev) = self.reverse_connections.get_mut(&in_id) {
                    rev.remove(&old);
                }
                if let Some(fwd) = self.connections.get_mut(&old.output_node) {
                    fwd.remove(&old);
                }
            }
        }

        if let Some(pin) = self.nodes.get_mut(&in_id).and_then(|n| n.input_mut(in_name)) {
            pin.set_connected(true);
        }
        let conn = Connection::new(out_id, out_name, in_id, in_name);
        self.connections.entry(out_id).or_default().insert(conn.clone());
        self.reverse_connections.entry(in_id).or_default().insert(conn);
        Ok(())
    }

    /// All connections leaving `node`'s outputs.
    pub fn connections_from(
        &self,
        node: impl Into<NodeRef>,
    ) -> Result<&FxHashSet<Connection>, GraphError> {
        let id = self.resolve(node.into())?;
        self.connections
            .get(&id)
            .ok_or(GraphError::UnknownNode { id })
    }

    /// All connections entering `node`'s inputs.
    pub fn connections_to(
        &self,
        node: impl Into<NodeRef>,
    ) -> Result<&FxHashSet<Connection>, GraphError> {
        let id = self.resolve(node.into())?;
        self.reverse_connections
            .get(&id)
            .ok_or(GraphError::UnknownNode { id })
    }

    /// The connection targeting an input pin, if any.
    pub fn connection_of_input(&self, pin: &PinId) -> Result<Option<&Connection>, GraphError> {
        let incoming = self.connections_to(pin.node)?;
        Ok(incoming.iter().find(|c| c.input_name == pin.name))
    }

    /// All connections leaving an output pin.
    pub fn connections_of_output(&self, pin: &PinId) -> Result<Vec<&Connection>, GraphError> {
        let outgoing = self.connections_from(pin.node)?;
        Ok(outgoing
            .iter()
            .filter(|c| c.output_name == pin.name)
            .collect())
    }

    /// Remove the first connection involving the given pin from both
    /// indices. Silently does nothing when no matching connection exists.
    pub fn remove_connection(&mut self, pin: &PinId) {
        let node_id = pin.node;
        match pin.direction {
            PinDirection::Input => {
                let Some(conn) = self
                    .reverse_connections
                    .get(&node_id)
                    .and_then(|rev| rev.iter().find(|c| c.input_name == pin.name).cloned())
                else {
                    return;
                };
                if let Some(rev) = self.reverse_connections.get_mut(&node_id) {
                    rev.remove(&conn);
                }
                if let Some(fwd) = self.connections.get_mut(&conn.output_node) {
                    fwd.remove(&conn);
                }
                self.refresh_connected_flag(node_id, &pin.name);
            }
            PinDirection::Output => {
                let Some(conn) = self
                    .connections
                    .get(&node_id)
                    .and_then(|fwd| fwd.iter().find(|c| c.output_name == pin.name).cloned())
                else {
                    return;
                };
                if let Some(fwd) = self.connections.get_mut(&node_id) {
                    fwd.remove(&conn);
                }
                if let Some(rev) = self.reverse_connections.get_mut(&conn.input_node) {
                    rev.remove(&conn);
                }
                self.refresh_connected_flag(conn.input_node, &conn.input_name);
            }
        }
    }

    /// Re-derive an input's connected flag from the reverse index.
    fn refresh_connected_flag(&mut self, node_id: NodeId, input_name: &str) {
        let still_connected = self
            .reverse_connections
            .get(&node_id)
            .is_some_and(|rev| rev.iter().any(|c| c.input_name == input_name));
        if let Some(pin) = self
            .nodes
            .get_mut(&node_id)
            .and_then(|n| n.input_mut(input_name))
        {
            pin.set_connected(still_connected);
        }
    }

    // ------------------------------------------------------------------
    // Pin lookup
    // ------------------------------------------------------------------

    /// The node owning the pin with the given key.
    pub fn node_of_pin(&self, pin: &PinId) -> Result<&GraphNode, GraphError> {
        self.nodes
            .get(&pin.node)
            .ok_or(GraphError::UnknownNode { id: pin.node })
    }

    /// Resolve an input pin by key.
    pub fn input_pin(&self, pin: &PinId) -> Result<&InputPin, GraphError> {
        self.node_of_pin(pin)?
            .input(&pin.name)
            .ok_or_else(|| GraphError::UnknownPin { pin: pin.clone() })
    }

    /// Resolve an output pin by key.
    pub fn output_pin(&self, pin: &PinId) -> Result<&OutputPin, GraphError> {
        self.node_of_pin(pin)?
            .output(&pin.name)
            .ok_or_else(|| GraphError::UnknownPin { pin: pin.clone() })
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persisted record of one node, including its connection endpoints.
    fn node_record(&self, id: NodeId) -> NodeRecord {
        let node = &self.nodes[&id];

        let inputs = node
            .sorted_input_names()
            .into_iter()
            .filter_map(|name| node.input(name))
            .map(|pin| {
                (
                    pin.name().to_string(),
                    pin.var_type().clone(),
                    pin.value().cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        let outputs = node
            .sorted_output_names()
            .into_iter()
            .filter_map(|name| node.output(name))
            .map(|pin| {
                (
                    pin.name().to_string(),
                    pin.var_type().clone(),
                    pin.value().cloned().unwrap_or(Value::Null),
                )
            })
            .collect();

        let mut input_connections = FxHashMap::default();
        if let Some(incoming) = self.reverse_connections.get(&id) {
            for conn in incoming {
                input_connections.insert(conn.input_name.clone(), conn.source_pin().to_string());
            }
        }
        let mut output_connections: FxHashMap<String, Vec<String>> = FxHashMap::default();
        if let Some(outgoing) = self.connections.get(&id) {
            for conn in outgoing {
                output_connections
                    .entry(conn.output_name.clone())
                    .or_default()
                    .push(conn.dest_pin().to_string());
            }
        }
        for dests in output_connections.values_mut() {
            dests.sort_unstable();
        }

        NodeRecord {
            class: node.class_name().to_string(),
            position: node.position(),
            inputs,
            outputs,
            input_connections,
            output_connections,
        }
    }

    /// Encode the graph as a JSON object keyed by stringified node ID.
    pub fn to_json(&self) -> Result<String, GraphError> {
        let mut state = serde_json::Map::new();
        for id in self.sorted_node_ids() {
            state.insert(id.to_string(), serde_json::to_value(self.node_record(id))?);
        }
        Ok(serde_json::to_string(&Value::Object(state))?)
    }

    /// Serialized payload sent to the runner. Currently identical to
    /// [`to_json`](Self::to_json).
    pub fn serialize(&self) -> Result<String, GraphError> {
        self.to_json()
    }

    /// Save the graph as a JSON string to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let state = self.to_json()?;
        std::fs::write(path, state)?;
        Ok(())
    }

    /// Load a save state from disk into this graph.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<FxHashMap<NodeId, NodeId>, GraphError> {
        let raw = std::fs::read_to_string(path)?;
        let saved: FxHashMap<String, NodeRecord> = serde_json::from_str(&raw)?;
        self.load_state(&saved)
    }

    /// Reconstruct nodes and connections from a save state produced by
    /// [`to_json`](Self::to_json).
    ///
    /// Two passes. Pass 1 silently spawns every node at its saved position
    /// and applies saved pin values as defaults, building an old-ID → new-ID
    /// map (re-spawning reassigns IDs). Pass 2 re-establishes data edges
    /// from each record's `inputConnections` (skipping `Control` entries)
    /// and control edges from `outputConnections` only, so no edge is
    /// established twice. Triggers one repaint at the end, not one per
    /// connection.
    pub fn load_state(
        &mut self,
        saved: &FxHashMap<String, NodeRecord>,
    ) -> Result<FxHashMap<NodeId, NodeId>, GraphError> {
        let mut entries: Vec<(NodeId, &NodeRecord)> = Vec::with_capacity(saved.len());
        for (raw_id, record) in saved {
            let old_id: u64 = raw_id
                .parse()
                .map_err(|_| GraphError::MalformedSaveState {
                    detail: format!("node key {raw_id:?} is not a decimal id"),
                })?;
            entries.push((NodeId(old_id), record));
        }
        entries.sort_by_key(|(id, _)| *id);

        let mut id_map: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        for (old_id, record) in &entries {
            let new_id = self.spawn_node(&record.class, None, record.position, true)?;
            id_map.insert(*old_id, new_id);
            let node = self
                .nodes
                .get_mut(&new_id)
                .ok_or(GraphError::UnknownNode { id: new_id })?;
            for (name, _ty, value) in &record.inputs {
                if value.is_null() {
                    continue;
                }
                match node.input_mut(name) {
                    Some(pin) => pin.set_default(value.clone()),
                    None => tracing::warn!(node = %new_id, pin = %name, "saved input not on class"),
                }
            }
            for (name, _ty, value) in &record.outputs {
                if value.is_null() {
                    continue;
                }
                match node.output_mut(name) {
                    Some(pin) => pin.set_default(value.clone()),
                    None => tracing::warn!(node = %new_id, pin = %name, "saved output not on class"),
                }
            }
        }

        let remap = |map: &FxHashMap<NodeId, NodeId>, old: NodeId| {
            map.get(&old)
                .copied()
                .ok_or(GraphError::UnknownNode { id: old })
        };

        for (old_id, record) in &entries {
            let new_id = remap(&id_map, *old_id)?;

            // Data edges, from the input side.
            let mut input_names: Vec<&String> = record.input_connections.keys().collect();
            input_names.sort_unstable();
            for input_name in input_names {
                if input_name == CONTROL_PIN {
                    continue;
                }
                let source: PinId = record.input_connections[input_name].parse()?;
                if source.direction != PinDirection::Output {
                    return Err(GraphError::MalformedSaveState {
                        detail: format!("input connection source {source} is not an output pin"),
                    });
                }
                let source_node = remap(&id_map, source.node)?;
                self.connect(source_node, &source.name, new_id, input_name)?;
            }

            // Control edges, from the output side only.
            let mut output_names: Vec<&String> = record.output_connections.keys().collect();
            output_names.sort_unstable();
            for output_name in output_names {
                for raw_dest in &record.output_connections[output_name] {
                    let dest: PinId = raw_dest.parse()?;
                    if dest.name != CONTROL_PIN {
                        continue;
                    }
                    let dest_node = remap(&id_map, dest.node)?;
                    self.connect(new_id, output_name, dest_node, CONTROL_PIN)?;
                }
            }
        }

        self.update();
        Ok(id_map)
    }

    // ------------------------------------------------------------------
    // Painter interaction
    // ------------------------------------------------------------------

    /// Repaint and refresh the painter. Owning-thread only; background
    /// tasks use [`request_repaint`](Self::request_repaint) instead.
    pub fn update(&self) {
        self.painter.repaint();
        self.painter.update();
    }

    /// Flag that a redraw is warranted. Safe from any thread.
    pub fn request_repaint(&self) {
        self.shared.request_repaint();
    }

    /// Consume the repaint flag. Called periodically by the UI poller.
    pub fn needs_repaint(&self) -> bool {
        self.shared.take_repaint()
    }

    // ------------------------------------------------------------------
    // Local execution (degenerate strategy, no process boundary)
    // ------------------------------------------------------------------

    /// Run the graph in-process with a fixed-point loop.
    ///
    /// Repeatedly scans all nodes in ID order; every node whose readiness
    /// predicate holds is run once via its class behavior, its outputs
    /// propagated along connections. The loop terminates when a full pass
    /// runs nothing. Returns the node IDs in execution order.
    ///
    /// [`NodeRunError::MissingArtifact`] is recoverable: the node's outputs
    /// keep their defaults and execution continues. Any other behavior
    /// error aborts with [`GraphError::NodeRun`].
    ///
    /// Must not be interleaved with an active runner session driving the
    /// same graph.
    pub async fn execute_local(&mut self) -> Result<Vec<NodeId>, GraphError> {
        let mut order = Vec::new();
        let mut ran: FxHashSet<NodeId> = FxHashSet::default();
        let ids = self.sorted_node_ids();
        loop {
            let mut progress = false;
            for &id in &ids {
                if ran.contains(&id) || !self.nodes.get(&id).is_some_and(GraphNode::check) {
                    continue;
                }
                self.run_node(id).await?;
                self.propagate_outputs(id);
                ran.insert(id);
                order.push(id);
                progress = true;
            }
            if !progress {
                break;
            }
        }
        tracing::info!(executed = order.len(), "local execution finished");
        Ok(order)
    }

    async fn run_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        let (behavior, inputs) = {
            let node = &self.nodes[&id];
            let Some(behavior) = node.template().behavior().cloned() else {
                return Ok(());
            };
            let mut inputs = PinValues::default();
            for pin in node.inputs() {
                if let Some(value) = pin.value() {
                    inputs.insert(pin.name().to_string(), value.clone());
                }
            }
            (behavior, inputs)
        };

        match behavior.run(inputs).await {
            Ok(outputs) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    for (name, value) in outputs {
                        match node.output_mut(&name) {
                            Some(pin) => pin.set_value(value),
                            None => {
                                tracing::warn!(node = %id, pin = %name, "behavior produced unknown output")
                            }
                        }
                    }
                }
                Ok(())
            }
            Err(NodeRunError::MissingArtifact { path }) => {
                tracing::warn!(node = %id, %path, "artifact missing; substituting defaults");
                Ok(())
            }
            Err(source) => Err(GraphError::NodeRun { node: id, source }),
        }
    }

    /// Copy a node's output values into the inputs connected to them.
    fn propagate_outputs(&mut self, id: NodeId) {
        let Some(outgoing) = self.connections.get(&id) else {
            return;
        };
        let mut writes: Vec<(NodeId, String, Value)> = Vec::new();
        for conn in outgoing {
            let value = self.nodes[&id]
                .output(&conn.output_name)
                .and_then(|pin| pin.value().cloned());
            if let Some(value) = value {
                writes.push((conn.input_node, conn.input_name.clone(), value));
            }
        }
        for (dest, input_name, value) in writes {
            if let Some(pin) = self.nodes.get_mut(&dest).and_then(|n| n.input_mut(&input_name)) {
                pin.set_value(value);
            }
        }
    }

    // ------------------------------------------------------------------
    // Runner session dispatch
    // ------------------------------------------------------------------

    /// Connect to an already-running runner.
    pub async fn attach_runner(&mut self, config: SessionConfig) -> Result<(), GraphError> {
        let session = RunnerSession::connect(config, self.shared.clone()).await?;
        self.session = Some(session);
        Ok(())
    }

    /// Spawn a local runner process and connect to it ("slave" mode).
    pub async fn spawn_runner(&mut self, config: SessionConfig) -> Result<(), GraphError> {
        let session = RunnerSession::spawn_local(config, self.shared.clone()).await?;
        self.session = Some(session);
        Ok(())
    }

    pub fn session(&self) -> Option<&RunnerSession> {
        self.session.as_ref()
    }

    fn session_mut(&mut self) -> Result<&mut RunnerSession, GraphError> {
        self.session.as_mut().ok_or(GraphError::NoSession)
    }

    /// Execute the graph on the attached runner: serialize, pause, push the
    /// framed payload, tell the runner to load it, and unpause after a
    /// short settle delay.
    pub async fn execute(&mut self) -> Result<(), GraphError> {
        let payload = self.serialize()?;
        self.session_mut()?.dispatch(&payload).await?;
        Ok(())
    }

    /// Push the current graph state to the runner without unpausing.
    /// Clears the execution history first.
    pub async fn push_update(&mut self) -> Result<(), GraphError> {
        let payload = self.serialize()?;
        self.session_mut()?.push_update(&payload).await?;
        Ok(())
    }

    pub async fn pause_runner(&mut self) -> Result<(), GraphError> {
        self.session_mut()?.pause().await?;
        Ok(())
    }

    pub async fn unpause_runner(&mut self) -> Result<(), GraphError> {
        self.session_mut()?.unpause().await?;
        Ok(())
    }

    pub async fn step_runner(&mut self) -> Result<(), GraphError> {
        self.session_mut()?.step().await?;
        Ok(())
    }

    pub async fn goto_runner(&mut self, next: NodeId) -> Result<(), GraphError> {
        self.session_mut()?.goto(next).await?;
        Ok(())
    }

    /// Terminate a runner this graph spawned; no-op without a slave
    /// session. Releases the session so a later execute can respawn.
    pub async fn kill_runner(&mut self) -> Result<(), GraphError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        session.kill_runner().await?;
        let slave = session.is_slave();
        if slave {
            self.session = None;
        }
        Ok(())
    }

    /// Detach from the runner, stopping the listener and closing the
    /// socket. The runner process itself is left alone.
    pub async fn detach_runner(&mut self) -> Result<(), GraphError> {
        if let Some(mut session) = self.session.take() {
            session.close().await?;
        }
        Ok(())
    }

    /// Snapshot of node IDs in the order the runner executed them.
    pub fn execution_history(&self) -> Vec<NodeId> {
        self.shared.history_snapshot()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(NodeCatalog::default())
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("next_id", &self.next_id)
            .field("session", &self.session)
            .finish()
    }
}
