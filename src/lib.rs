//! # Patchbay: Node Graph Model and Execution Dispatch
//!
//! Patchbay is the data model and execution-dispatch engine behind a
//! node-based visual dataflow editor. It owns the graph of typed nodes and
//! connections, its JSON persistence format, and the TCP client side of the
//! protocol that hands graphs to a long-running *runner* process and
//! streams execution progress back.
//!
//! ## Core Concepts
//!
//! - **Templates and the catalog**: a [`node::NodeTemplate`] declares a node
//!   class (typed pins plus optional local logic); each graph owns a
//!   [`node::NodeCatalog`] mapping class names to templates
//! - **Graph**: the aggregate root; spawning, wiring, persistence, and
//!   dispatch all go through [`graph::Graph`]
//! - **Typed wiring**: connections are validated against the [`types::VarType`]
//!   subtype lattice; data inputs take at most one incoming edge, with the
//!   reserved `Control` input the multi-edge exception
//! - **Runner session**: [`runtime::RunnerSession`] drives a remote runner
//!   over TCP: unframed command tokens out, length-prefixed graph frames
//!   out, `#`-delimited status IDs in, collected by a background listener
//!
//! ## Quick Start
//!
//! ```
//! use patchbay::graph::Graph;
//! use patchbay::node::{NodeCatalog, NodeTemplate};
//! use patchbay::pins::PinDef;
//! use patchbay::types::{Position, VarType};
//!
//! let mut catalog = NodeCatalog::new();
//! catalog.register(
//!     NodeTemplate::new("Constant").with_output(PinDef::new("value", VarType::Float)),
//! );
//! catalog.register(
//!     NodeTemplate::new("Print").with_input(PinDef::new("value", VarType::Any)),
//! );
//!
//! let mut graph = Graph::new(catalog);
//! let constant = graph
//!     .spawn_node("Constant", None, Position::ORIGIN, false)
//!     .unwrap();
//! let print = graph
//!     .spawn_node("Print", None, Position(140.0, 0.0), false)
//!     .unwrap();
//! graph.connect(constant, "value", print, "value").unwrap();
//!
//! let state = graph.to_json().unwrap();
//! assert!(state.contains("Constant"));
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] - Node/pin identifiers and the `VarType` lattice
//! - [`pins`] - Typed input/output endpoints and readiness state
//! - [`node`] - Templates, the per-graph catalog, and spawned instances
//! - [`connection`] - The directed pin-to-pin edge record
//! - [`graph`] - The graph aggregate: wiring, persistence, execution
//! - [`runtime`] - Runner protocol client: session, commands, listener
//! - [`painter`] - UI notification seam (no-op by default)
//! - [`telemetry`] - Tracing subscriber setup for hosts and tests

pub mod connection;
pub mod graph;
pub mod node;
pub mod painter;
pub mod pins;
pub mod runtime;
pub mod telemetry;
pub mod types;
