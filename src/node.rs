//! Node templates, the class catalog, and spawned node instances.
//!
//! A [`NodeTemplate`] describes a node *class*: its named, typed pins and an
//! optional [`NodeBehavior`] used by the local execution loop. Templates are
//! registered in a per-graph [`NodeCatalog`] (never shared global state) and
//! materialized into [`GraphNode`] instances by
//! [`Graph::spawn_node`](crate::graph::Graph::spawn_node).
//!
//! Concrete node logic (the scientific operations the editor composes) is
//! an external collaborator behind the [`NodeBehavior`] trait. The remote
//! runner executes graphs from their serialized form and never touches these
//! behaviors.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::pins::{InputPin, OutputPin, PinDef};
use crate::types::{NodeId, PinDirection, PinId, Position, VarType, CONTROL_PIN};

/// Named pin values passed into and out of a node behavior.
pub type PinValues = FxHashMap<String, Value>;

/// Errors surfaced by concrete node logic during local execution.
#[derive(Debug, Error, Diagnostic)]
pub enum NodeRunError {
    /// A required input value was absent at run time.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(patchbay::node::missing_input),
        help("Check that the upstream node produced the required value.")
    )]
    MissingInput { what: String },

    /// An expected artifact (e.g. an output file from a subprocess-backed
    /// node) was absent. Recoverable: the executor substitutes empty
    /// outputs instead of aborting the graph.
    #[error("missing artifact: {path}")]
    #[diagnostic(code(patchbay::node::missing_artifact))]
    MissingArtifact { path: String },

    /// Any other fatal behavior failure.
    #[error("node execution failed: {0}")]
    #[diagnostic(code(patchbay::node::failed))]
    Failed(String),
}

/// Collaborator seam for concrete node logic.
///
/// Implementations receive the current values of the node's available
/// inputs keyed by pin name and return the values to store on its outputs.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use patchbay::node::{NodeBehavior, NodeRunError, PinValues};
/// use serde_json::json;
///
/// struct Doubler;
///
/// #[async_trait]
/// impl NodeBehavior for Doubler {
///     async fn run(&self, inputs: PinValues) -> Result<PinValues, NodeRunError> {
///         let x = inputs
///             .get("x")
///             .and_then(|v| v.as_f64())
///             .ok_or_else(|| NodeRunError::MissingInput { what: "x".into() })?;
///         Ok(PinValues::from_iter([("y".to_string(), json!(x * 2.0))]))
///     }
/// }
/// ```
#[async_trait]
pub trait NodeBehavior: Send + Sync {
    async fn run(&self, inputs: PinValues) -> Result<PinValues, NodeRunError>;
}

/// Declaration of a node class: pins, control-flow status, and local logic.
#[derive(Clone)]
pub struct NodeTemplate {
    class_name: String,
    inputs: Vec<PinDef>,
    outputs: Vec<PinDef>,
    control: bool,
    behavior: Option<Arc<dyn NodeBehavior>>,
}

impl NodeTemplate {
    #[must_use]
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            control: false,
            behavior: None,
        }
    }

    #[must_use]
    pub fn with_input(mut self, def: PinDef) -> Self {
        self.inputs.push(def);
        self
    }

    #[must_use]
    pub fn with_output(mut self, def: PinDef) -> Self {
        self.outputs.push(def);
        self
    }

    /// Mark this class as a control-flow node and declare the reserved
    /// `Control` input, which accepts multiple incoming sequencing edges.
    #[must_use]
    pub fn control(mut self) -> Self {
        self.control = true;
        if !self.inputs.iter().any(|d| d.name == CONTROL_PIN) {
            self.inputs
                .push(PinDef::new(CONTROL_PIN, VarType::Control).optional());
        }
        self
    }

    #[must_use]
    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn is_control(&self) -> bool {
        self.control
    }

    pub fn behavior(&self) -> Option<&Arc<dyn NodeBehavior>> {
        self.behavior.as_ref()
    }
}

impl std::fmt::Debug for NodeTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTemplate")
            .field("class_name", &self.class_name)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("control", &self.control)
            .field("has_behavior", &self.behavior.is_some())
            .finish()
    }
}

/// Per-graph registry mapping class names to templates.
///
/// Each graph owns its catalog; there is no process-global class table.
#[derive(Clone, Debug, Default)]
pub struct NodeCatalog {
    templates: FxHashMap<String, Arc<NodeTemplate>>,
}

impl NodeCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous class of the same name.
    pub fn register(&mut self, template: NodeTemplate) {
        self.templates
            .insert(template.class_name.clone(), Arc::new(template));
    }

    pub fn get(&self, class_name: &str) -> Option<&Arc<NodeTemplate>> {
        self.templates.get(class_name)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.templates.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A spawned node instance, owned exclusively by the graph that spawned it.
#[derive(Clone, Debug)]
pub struct GraphNode {
    id: NodeId,
    position: Position,
    template: Arc<NodeTemplate>,
    inputs: FxHashMap<String, InputPin>,
    outputs: FxHashMap<String, OutputPin>,
}

impl GraphNode {
    pub(crate) fn instantiate(template: Arc<NodeTemplate>, id: NodeId, position: Position) -> Self {
        let inputs = template
            .inputs
            .iter()
            .map(|def| (def.name.clone(), InputPin::from_def(def.clone())))
            .collect();
        let outputs = template
            .outputs
            .iter()
            .map(|def| (def.name.clone(), OutputPin::from_def(def.clone())))
            .collect();
        Self {
            id,
            position,
            template,
            inputs,
            outputs,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn class_name(&self) -> &str {
        self.template.class_name()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Whether this node is a control-flow node owning the reserved
    /// `Control` input.
    pub fn is_control(&self) -> bool {
        self.template.is_control()
    }

    pub(crate) fn template(&self) -> &Arc<NodeTemplate> {
        &self.template
    }

    pub fn input(&self, name: &str) -> Option<&InputPin> {
        self.inputs.get(name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut InputPin> {
        self.inputs.get_mut(name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputPin> {
        self.outputs.get(name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut OutputPin> {
        self.outputs.get_mut(name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &InputPin> {
        self.inputs.values()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputPin> {
        self.outputs.values()
    }

    /// Composite key for one of this node's pins.
    pub fn pin_id(&self, direction: PinDirection, name: &str) -> PinId {
        PinId::new(self.id, direction, name)
    }

    /// Readiness predicate for local execution: every input must be
    /// available and the class must carry a behavior.
    pub fn check(&self) -> bool {
        self.template.behavior().is_some() && self.inputs.values().all(InputPin::is_available)
    }

    /// Input pin names in sorted order, for deterministic serialization.
    pub(crate) fn sorted_input_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn sorted_output_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.outputs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Persisted form of one node, as stored in the graph's JSON save state.
///
/// Pin entries are `[name, type, value]` triples; readers take the first
/// element as the name and the last as the value, so the tuple may grow in
/// the middle without breaking old readers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub class: String,
    pub position: Position,
    pub inputs: Vec<(String, VarType, Value)>,
    pub outputs: Vec<(String, VarType, Value)>,
    /// Input name → pin-ID string of the connected source output.
    /// For the multi-edge `Control` input only one entry survives here;
    /// control edges are reconstructed from `outputConnections` instead.
    pub input_connections: FxHashMap<String, String>,
    /// Output name → pin-ID strings of all connected destination inputs.
    pub output_connections: FxHashMap<String, Vec<String>>,
}
