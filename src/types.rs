//! Core identifier and type-tag types for the patchbay graph model.
//!
//! This module defines the fundamental types used throughout the system for
//! identifying nodes and pins and for declaring pin value types:
//!
//! - [`NodeId`]: graph-scoped, monotonically assigned node identifier
//! - [`Position`]: 2D placement of a node, persisted as a `[x, y]` array
//! - [`PinId`]: composite pin key with the canonical `<nodeID>:<I|O><pinName>`
//!   string form used by the wire and persistence formats
//! - [`VarType`]: declared pin value type with a subtype relation
//!
//! # Examples
//!
//! ```rust
//! use patchbay::types::{NodeId, PinDirection, PinId, VarType};
//!
//! let pin = PinId::new(NodeId(3), PinDirection::Output, "value");
//! assert_eq!(pin.to_string(), "3:Ovalue");
//! assert_eq!("3:Ovalue".parse::<PinId>().unwrap(), pin);
//!
//! assert!(VarType::Bool.is_subtype_of(&VarType::Int));
//! assert!(VarType::Int.compatible_with(&VarType::Bool));
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Name of the reserved multi-edge input on control-flow nodes.
///
/// Connections targeting this input represent execution-order sequencing
/// rather than data flow and are the only edges exempt from the
/// at-most-one-incoming-edge-per-input rule.
pub const CONTROL_PIN: &str = "Control";

/// Graph-scoped node identifier.
///
/// Assigned monotonically by the owning [`Graph`](crate::graph::Graph);
/// re-spawning a persisted graph reassigns IDs, which is why
/// [`Graph::load_state`](crate::graph::Graph::load_state) returns an
/// old-to-new ID map. The `Display` form is the bare decimal integer used
/// in pin IDs, `GOTO` commands, and status tokens.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        NodeId(raw)
    }
}

/// 2D placement of a node relative to the graph origin.
///
/// Serialized as a two-element JSON array so the persistence format stays
/// `"position": [x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Position(pub f32, pub f32);

impl Position {
    pub const ORIGIN: Position = Position(0.0, 0.0);
}

/// Direction of a pin: data flows out of outputs and into inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    /// One-letter prefix used in the canonical pin ID string form.
    #[must_use]
    pub fn prefix(&self) -> char {
        match self {
            PinDirection::Input => 'I',
            PinDirection::Output => 'O',
        }
    }

    fn from_prefix(c: char) -> Option<Self> {
        match c {
            'I' => Some(PinDirection::Input),
            'O' => Some(PinDirection::Output),
            _ => None,
        }
    }
}

/// Error raised when a pin ID string cannot be parsed.
#[derive(Debug, Error, Diagnostic)]
#[error("malformed pin id: {raw:?}")]
#[diagnostic(
    code(patchbay::types::malformed_pin_id),
    help("pin ids have the form `<nodeID>:<I|O><pinName>`, e.g. `3:Ovalue`")
)]
pub struct MalformedPinId {
    pub raw: String,
}

/// Composite pin key: owning node, direction, and pin name.
///
/// The canonical string form `<nodeID>:<I|O><pinName>` is stable across
/// serialization and the wire protocol; `Display` and `FromStr` round-trip
/// exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PinId {
    pub node: NodeId,
    pub direction: PinDirection,
    pub name: String,
}

impl PinId {
    pub fn new(node: NodeId, direction: PinDirection, name: impl Into<String>) -> Self {
        Self {
            node,
            direction,
            name: name.into(),
        }
    }

    /// Convenience constructor for an input pin key.
    pub fn input(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinDirection::Input, name)
    }

    /// Convenience constructor for an output pin key.
    pub fn output(node: NodeId, name: impl Into<String>) -> Self {
        Self::new(node, PinDirection::Output, name)
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.node, self.direction.prefix(), self.name)
    }
}

impl FromStr for PinId {
    type Err = MalformedPinId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MalformedPinId { raw: s.to_string() };
        let (node_part, pin_part) = s.split_once(':').ok_or_else(malformed)?;
        let node: u64 = node_part.parse().map_err(|_| malformed())?;
        let mut chars = pin_part.chars();
        let direction = chars
            .next()
            .and_then(PinDirection::from_prefix)
            .ok_or_else(malformed)?;
        let name: String = chars.collect();
        if name.is_empty() {
            return Err(malformed());
        }
        Ok(PinId::new(NodeId(node), direction, name))
    }
}

/// Error raised when a var-type string cannot be parsed.
#[derive(Debug, Error, Diagnostic)]
#[error("unknown var type: {raw:?}")]
#[diagnostic(
    code(patchbay::types::unknown_var_type),
    help("expected one of `any`, `bool`, `int`, `float`, `str`, `control`, or `list<T>`")
)]
pub struct UnknownVarType {
    pub raw: String,
}

/// Declared value type of a pin.
///
/// A connection is legal only if the output's type and the input's type are
/// [`compatible_with`](Self::compatible_with) each other. The relation is a
/// *bidirectional* subtype check (`a <: b || b <: a`) rather than the
/// one-directional check that would be sound for producer/consumer roles;
/// callers relying on strict covariance should check
/// [`is_subtype_of`](Self::is_subtype_of) themselves.
///
/// The subtype lattice is small: `Any` is the top type, `Bool <: Int`, and
/// `List` is covariant in its element type. `Control` is only compatible
/// with itself (and `Any`), since control edges carry sequencing, not data.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarType {
    /// Top type: compatible with everything.
    Any,
    Bool,
    Int,
    Float,
    Str,
    /// Sequencing marker carried by control edges.
    Control,
    /// Homogeneous list, covariant in the element type.
    List(Box<VarType>),
}

impl VarType {
    /// Reflexive subtype relation.
    #[must_use]
    pub fn is_subtype_of(&self, other: &VarType) -> bool {
        if self == other || *other == VarType::Any {
            return true;
        }
        match (self, other) {
            (VarType::Bool, VarType::Int) => true,
            (VarType::List(a), VarType::List(b)) => a.is_subtype_of(b),
            _ => false,
        }
    }

    /// Bidirectional compatibility used by `connect`: either side may be the
    /// subtype.
    #[must_use]
    pub fn compatible_with(&self, other: &VarType) -> bool {
        self.is_subtype_of(other) || other.is_subtype_of(self)
    }

    /// Shorthand for `List(elem)`.
    #[must_use]
    pub fn list_of(elem: VarType) -> Self {
        VarType::List(Box::new(elem))
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Any => write!(f, "any"),
            VarType::Bool => write!(f, "bool"),
            VarType::Int => write!(f, "int"),
            VarType::Float => write!(f, "float"),
            VarType::Str => write!(f, "str"),
            VarType::Control => write!(f, "control"),
            VarType::List(elem) => write!(f, "list<{elem}>"),
        }
    }
}

impl FromStr for VarType {
    type Err = UnknownVarType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(VarType::Any),
            "bool" => Ok(VarType::Bool),
            "int" => Ok(VarType::Int),
            "float" => Ok(VarType::Float),
            "str" => Ok(VarType::Str),
            "control" => Ok(VarType::Control),
            other => {
                if let Some(inner) = other.strip_prefix("list<").and_then(|r| r.strip_suffix('>')) {
                    Ok(VarType::list_of(inner.parse()?))
                } else {
                    Err(UnknownVarType {
                        raw: other.to_string(),
                    })
                }
            }
        }
    }
}

impl Serialize for VarType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for VarType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_id_round_trip() {
        let pin = PinId::output(NodeId(42), "result");
        let encoded = pin.to_string();
        assert_eq!(encoded, "42:Oresult");
        assert_eq!(encoded.parse::<PinId>().unwrap(), pin);

        let inp = "7:IControl".parse::<PinId>().unwrap();
        assert_eq!(inp.node, NodeId(7));
        assert_eq!(inp.direction, PinDirection::Input);
        assert_eq!(inp.name, CONTROL_PIN);
    }

    #[test]
    fn pin_id_rejects_garbage() {
        for raw in ["", "3", "3:value", "x:Ovalue", "3:O", "3:Zvalue"] {
            assert!(raw.parse::<PinId>().is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn subtype_lattice() {
        assert!(VarType::Bool.is_subtype_of(&VarType::Int));
        assert!(!VarType::Int.is_subtype_of(&VarType::Bool));
        assert!(VarType::Float.is_subtype_of(&VarType::Any));
        assert!(VarType::list_of(VarType::Bool).is_subtype_of(&VarType::list_of(VarType::Int)));
        assert!(!VarType::Str.is_subtype_of(&VarType::Float));
    }

    #[test]
    fn compatibility_is_bidirectional() {
        // Either side may be the subtype.
        assert!(VarType::Int.compatible_with(&VarType::Bool));
        assert!(VarType::Bool.compatible_with(&VarType::Int));
        assert!(!VarType::Str.compatible_with(&VarType::Float));
        assert!(VarType::Control.compatible_with(&VarType::Control));
        assert!(!VarType::Control.compatible_with(&VarType::Float));
    }

    #[test]
    fn var_type_string_round_trip() {
        for ty in [
            VarType::Any,
            VarType::Float,
            VarType::Control,
            VarType::list_of(VarType::list_of(VarType::Int)),
        ] {
            assert_eq!(ty.to_string().parse::<VarType>().unwrap(), ty);
        }
        assert!("list<frob>".parse::<VarType>().is_err());
    }
}
