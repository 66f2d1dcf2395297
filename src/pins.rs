//! Typed input/output endpoints belonging to a node.
//!
//! A pin stores the data side of a connection endpoint: its declaration
//! ([`PinDef`]), its current value, and (for inputs) whether a connection
//! currently targets it. The connection topology itself lives in the
//! [`Graph`](crate::graph::Graph); pins only track enough state for a node's
//! readiness predicate to work.
//!
//! Values are untyped [`serde_json::Value`]s. The declared [`VarType`] is
//! enforced when *wiring* pins together, not when storing values.

use serde_json::Value;

use crate::types::VarType;

/// Declaration of a pin: name, declared type, and default behavior.
///
/// Templates hold one `PinDef` per pin; spawning a node materializes them
/// into [`InputPin`]/[`OutputPin`] instances.
#[derive(Clone, Debug)]
pub struct PinDef {
    pub name: String,
    pub var_type: VarType,
    /// Inputs only: whether the owning node needs this pin satisfied
    /// (connected or defaulted) before it is eligible to run.
    pub required: bool,
    pub default: Option<Value>,
}

impl PinDef {
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            name: name.into(),
            var_type,
            required: true,
            default: None,
        }
    }

    /// Mark the pin as optional: the node may run without it being satisfied.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// An input endpoint on a spawned node.
///
/// At most one incoming connection may target an input (the reserved
/// `Control` input on control-flow nodes excepted); the `connected` flag
/// mirrors that wiring state and is maintained by the graph's
/// connect/disconnect operations.
#[derive(Clone, Debug)]
pub struct InputPin {
    def: PinDef,
    value: Option<Value>,
    connected: bool,
}

impl InputPin {
    pub(crate) fn from_def(def: PinDef) -> Self {
        Self {
            def,
            value: None,
            connected: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn var_type(&self) -> &VarType {
        &self.def.var_type
    }

    pub fn is_required(&self) -> bool {
        self.def.required
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Mark the wiring state of this input. Called by the graph layer.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Replace the fallback value used when no connection supplies one.
    pub fn set_default(&mut self, default: Value) {
        self.def.default = Some(default);
    }

    /// Store the current value, e.g. propagated from an upstream output.
    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Current value, falling back to the declared default.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref().or(self.def.default.as_ref())
    }

    /// Readiness query used by the owning node's `check()` predicate.
    ///
    /// An input is available when it holds a value (set directly or via
    /// default), or when it is not required at all. A connected input with
    /// no propagated value yet is *not* available; the upstream node has
    /// not produced anything.
    pub fn is_available(&self) -> bool {
        self.value().is_some() || !self.def.required
    }
}

/// An output endpoint on a spawned node.
#[derive(Clone, Debug)]
pub struct OutputPin {
    def: PinDef,
    value: Option<Value>,
}

impl OutputPin {
    pub(crate) fn from_def(def: PinDef) -> Self {
        Self { def, value: None }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn var_type(&self) -> &VarType {
        &self.def.var_type
    }

    pub fn set_default(&mut self, default: Value) {
        self.def.default = Some(default);
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    /// Current value, falling back to the declared default.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref().or(self.def.default.as_ref())
    }
}
