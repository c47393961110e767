use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;
use thiserror::Error;

use crate::graph::{Node, NodeEntry};
use crate::shape::Shape;
use crate::transform::GraphBuilder;

/// Per-output shapes produced by a shape function.
pub type OutputShapes = SmallVec<[Shape; 2]>;

/// Infers per-output shapes for a node from its input shapes.
pub type ShapeFn = Arc<dyn Fn(&Node, &[Shape]) -> Result<OutputShapes, OpError> + Send + Sync>;

/// Rewrites a node into a subgraph of directly realizable operators.
///
/// Receives the node, its already-remapped inputs and their shapes, plus a
/// builder over the graph under construction. Returns one replacement
/// entry per output slot of the original node. Must be pure: the same
/// arguments always produce an isomorphic subgraph.
pub type ExpandFn =
    Arc<dyn Fn(&ExpandArgs<'_>, &mut GraphBuilder) -> Result<Vec<NodeEntry>, OpError> + Send + Sync>;

/// Arguments handed to an [`ExpandFn`].
pub struct ExpandArgs<'a> {
    pub node: &'a Node,
    pub inputs: &'a [NodeEntry],
    pub input_shapes: &'a [Shape],
    pub registry: &'a OpRegistry,
}

/// Immutable operator descriptor.
///
/// An operator without an expansion function is directly realizable and is
/// never rewritten; one without a shape function defaults to producing its
/// first input's shape on every output.
pub struct Operator {
    name: String,
    shape_fn: Option<ShapeFn>,
    expand_fn: Option<ExpandFn>,
}

impl Operator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape_fn: None,
            expand_fn: None,
        }
    }

    pub fn with_shape_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Node, &[Shape]) -> Result<OutputShapes, OpError> + Send + Sync + 'static,
    {
        self.shape_fn = Some(Arc::new(f));
        self
    }

    pub fn with_expansion<F>(mut self, f: F) -> Self
    where
        F: Fn(&ExpandArgs<'_>, &mut GraphBuilder) -> Result<Vec<NodeEntry>, OpError>
            + Send
            + Sync
            + 'static,
    {
        self.expand_fn = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_expansion(&self) -> bool {
        self.expand_fn.is_some()
    }

    pub fn expansion(&self) -> Option<&ExpandFn> {
        self.expand_fn.as_ref()
    }

    /// Applies the shape function, falling back to replicating the first
    /// input's shape across all declared outputs.
    pub fn infer_shapes(&self, node: &Node, input_shapes: &[Shape]) -> Result<OutputShapes, OpError> {
        if let Some(shape_fn) = &self.shape_fn {
            return shape_fn(node, input_shapes);
        }
        let first = input_shapes.first().cloned().unwrap_or_default();
        Ok(std::iter::repeat(first)
            .take(node.num_outputs as usize)
            .collect())
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("has_expansion", &self.has_expansion())
            .finish_non_exhaustive()
    }
}

/// Accumulates operator registrations before freezing them into an
/// [`OpRegistry`]. Registering a name twice keeps the later descriptor.
#[derive(Debug, Default)]
pub struct OpRegistryBuilder {
    ops: HashMap<String, Arc<Operator>>,
}

impl OpRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, op: Operator) -> Arc<Operator> {
        let op = Arc::new(op);
        self.ops.insert(op.name().to_string(), Arc::clone(&op));
        op
    }

    pub fn finish(self) -> OpRegistry {
        OpRegistry { ops: self.ops }
    }
}

/// Immutable operator registry, built once at initialization and threaded
/// through every pass invocation.
#[derive(Debug, Default)]
pub struct OpRegistry {
    ops: HashMap<String, Arc<Operator>>,
}

impl OpRegistry {
    pub fn get(&self, name: &str) -> Option<&Arc<Operator>> {
        self.ops.get(name)
    }

    pub fn expect(&self, name: &str) -> Result<&Arc<Operator>, OpError> {
        self.get(name).ok_or_else(|| OpError::UnknownOp {
            name: name.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Errors raised by operator shape and expansion functions.
#[derive(Debug, Error, PartialEq)]
pub enum OpError {
    #[error("operator `{name}` is not registered")]
    UnknownOp { name: String },
    #[error("operator `{op}` requires parameter `{param}`")]
    MissingParam { op: String, param: String },
    #[error("operator `{op}` parameter `{param}` has an invalid value")]
    BadParam { op: String, param: String },
    #[error("operator `{op}` expects {expected} input(s), got {got}")]
    InputArity { op: String, expected: usize, got: usize },
    #[error("operator `{op}` input shapes {lhs} and {rhs} do not match")]
    ShapeMismatch { op: String, lhs: Shape, rhs: Shape },
    #[error("operator `{op}` axis {axis} is out of bounds for rank {rank}")]
    AxisOutOfBounds { op: String, axis: i64, rank: usize },
    #[error("operator `{op}` cannot divide extent {extent} into {sections} sections")]
    UnevenSplit {
        op: String,
        extent: usize,
        sections: usize,
    },
}
