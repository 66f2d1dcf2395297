//! Shared fixtures: a small catalog of node classes with local behaviors.

use async_trait::async_trait;
use patchbay::node::{NodeBehavior, NodeCatalog, NodeRunError, NodeTemplate, PinValues};
use patchbay::pins::PinDef;
use patchbay::types::VarType;
use serde_json::json;

pub fn init() {
    patchbay::telemetry::init_tracing();
}

/// Copies its `value` input to its `value` output.
#[derive(Debug, Clone)]
pub struct Forward;

#[async_trait]
impl NodeBehavior for Forward {
    async fn run(&self, inputs: PinValues) -> Result<PinValues, NodeRunError> {
        let value = inputs
            .get("value")
            .cloned()
            .ok_or_else(|| NodeRunError::MissingInput {
                what: "value".into(),
            })?;
        Ok(PinValues::from_iter([("value".to_string(), value)]))
    }
}

#[derive(Debug, Clone)]
pub struct AddFloats;

#[async_trait]
impl NodeBehavior for AddFloats {
    async fn run(&self, inputs: PinValues) -> Result<PinValues, NodeRunError> {
        let get = |name: &str| {
            inputs
                .get(name)
                .and_then(|v| v.as_f64())
                .ok_or_else(|| NodeRunError::MissingInput { what: name.into() })
        };
        let sum = get("a")? + get("b")?;
        Ok(PinValues::from_iter([("sum".to_string(), json!(sum))]))
    }
}

/// Consumes its input and produces nothing.
#[derive(Debug, Clone)]
pub struct Swallow;

#[async_trait]
impl NodeBehavior for Swallow {
    async fn run(&self, _inputs: PinValues) -> Result<PinValues, NodeRunError> {
        Ok(PinValues::default())
    }
}

/// Always reports a missing artifact, the recoverable failure mode.
#[derive(Debug, Clone)]
pub struct MissingFile;

#[async_trait]
impl NodeBehavior for MissingFile {
    async fn run(&self, _inputs: PinValues) -> Result<PinValues, NodeRunError> {
        Err(NodeRunError::MissingArtifact {
            path: "/nonexistent/results.csv".into(),
        })
    }
}

/// Always fails fatally.
#[derive(Debug, Clone)]
pub struct Explode;

#[async_trait]
impl NodeBehavior for Explode {
    async fn run(&self, _inputs: PinValues) -> Result<PinValues, NodeRunError> {
        Err(NodeRunError::Failed("boom".into()))
    }
}

/// Catalog used by most integration tests.
///
/// Arithmetic classes carry behaviors so the local executor can run them;
/// `Gate` is a control-flow class and `Label` exists to provoke type
/// mismatches against the float classes.
pub fn catalog() -> NodeCatalog {
    let mut catalog = NodeCatalog::new();
    catalog.register(
        NodeTemplate::new("Constant")
            .with_input(PinDef::new("value", VarType::Float).with_default(json!(1.0)))
            .with_output(PinDef::new("value", VarType::Float))
            .with_behavior(Forward),
    );
    catalog.register(
        NodeTemplate::new("Add")
            .with_input(PinDef::new("a", VarType::Float))
            .with_input(PinDef::new("b", VarType::Float))
            .with_output(PinDef::new("sum", VarType::Float))
            .with_behavior(AddFloats),
    );
    catalog.register(
        NodeTemplate::new("Collect")
            .with_input(PinDef::new("value", VarType::Any))
            .with_behavior(Swallow),
    );
    catalog.register(
        NodeTemplate::new("Label")
            .with_input(PinDef::new("text", VarType::Str).with_default(json!("hi")))
            .with_output(PinDef::new("text", VarType::Str)),
    );
    catalog.register(
        NodeTemplate::new("Flag").with_output(PinDef::new("flag", VarType::Bool)),
    );
    catalog.register(
        NodeTemplate::new("Tally").with_input(PinDef::new("count", VarType::Int)),
    );
    catalog.register(
        NodeTemplate::new("Gate")
            .control()
            .with_output(PinDef::new("after", VarType::Control)),
    );
    catalog.register(
        NodeTemplate::new("Sample")
            .with_output(
                PinDef::new("rows", VarType::list_of(VarType::Float)).with_default(json!([])),
            )
            .with_behavior(MissingFile),
    );
    catalog.register(NodeTemplate::new("Bomb").with_behavior(Explode));
    catalog
}
