use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::graph::{Graph, GraphError};
use crate::index::IndexError;
use crate::passes::{ExpandComputePass, InferShapePass};
use crate::registry::{OpError, OpRegistry};

/// A named graph-to-graph transformation.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, graph: Graph, cx: &PassContext<'_>) -> Result<Graph, PassError>;
}

/// Services available to a running pass.
pub struct PassContext<'a> {
    pub registry: &'a OpRegistry,
    manager: &'a PassManager,
}

impl PassContext<'_> {
    /// Invokes another registered pass by name on `graph`.
    pub fn apply(&self, graph: Graph, pass: &str) -> Result<Graph, PassError> {
        self.manager.apply(graph, &[pass], self.registry)
    }
}

/// Owns the registered passes and schedules them by name.
///
/// Built explicitly at initialization; there is no ambient global pass
/// table. Registering a name twice keeps the later pass.
pub struct PassManager {
    passes: HashMap<&'static str, Arc<dyn Pass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self {
            passes: HashMap::new(),
        }
    }

    /// A manager pre-loaded with the built-in passes (`InferShape`,
    /// `ExpandCompute`).
    pub fn with_standard_passes() -> Self {
        let mut manager = Self::new();
        manager.register(Arc::new(InferShapePass));
        manager.register(Arc::new(ExpandComputePass::default()));
        manager
    }

    pub fn register(&mut self, pass: Arc<dyn Pass>) {
        self.passes.insert(pass.name(), pass);
    }

    /// Runs the named passes in order, feeding each the previous result.
    pub fn apply(
        &self,
        mut graph: Graph,
        names: &[&str],
        registry: &OpRegistry,
    ) -> Result<Graph, PassError> {
        for &name in names {
            let pass = self
                .passes
                .get(name)
                .ok_or_else(|| PassError::UnknownPass {
                    name: name.to_string(),
                })?;
            let nodes_before = graph.len();
            let cx = PassContext {
                registry,
                manager: self,
            };
            graph = pass.run(graph, &cx)?;
            debug!(
                pass = name,
                nodes_before,
                nodes_after = graph.len(),
                "pass applied"
            );
        }
        Ok(graph)
    }
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors surfaced by pass invocations.
#[derive(Debug, Error, PartialEq)]
pub enum PassError {
    #[error("no pass registered under the name `{name}`")]
    UnknownPass { name: String },
    #[error("input `{input}` as input to `{consumer}` does not exist")]
    MissingShape { input: String, consumer: String },
    #[error("expansion of `{node}` produced {got} outputs, expected {expected}")]
    ExpansionArity {
        node: String,
        expected: usize,
        got: usize,
    },
    #[error("shape function of `{node}` returned {got} shapes, expected {expected}")]
    ShapeArity {
        node: String,
        expected: usize,
        got: usize,
    },
    #[error("expansion did not converge after {limit} rounds")]
    ExpansionLimit { limit: usize },
    #[error("operator `{op}` failed on node `{node}`: {source}")]
    Op {
        node: String,
        op: String,
        #[source]
        source: OpError,
    },
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Index(#[from] IndexError),
}
