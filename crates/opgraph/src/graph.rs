use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::registry::Operator;
use crate::shape::ShapeVector;

/// Attribute key holding the graph's flat [`ShapeVector`].
pub const SHAPE_ATTR: &str = "shape";

/// Attribute key holding the ordered shapes of the graph's input nodes.
pub const SHAPE_INPUTS_ATTR: &str = "shape_inputs";

/// Arena index of a node within a single graph revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Reference to one output slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeEntry {
    pub node: NodeId,
    pub output: u32,
}

impl NodeEntry {
    pub fn new(node: NodeId, output: u32) -> Self {
        Self { node, output }
    }
}

/// Scalar operator parameter attached to a node (e.g. `axis` on `split`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Int(i64),
    Float(f64),
    Str(String),
    IntList(Vec<i64>),
}

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }
}

/// A single operation in the graph.
///
/// `op == None` marks a graph-input placeholder: it consumes nothing,
/// produces exactly one output, and is never rewritten.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub op: Option<Arc<Operator>>,
    pub inputs: SmallVec<[NodeEntry; 2]>,
    pub num_outputs: u32,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Node {
    pub fn new(
        name: impl Into<String>,
        op: Arc<Operator>,
        inputs: impl IntoIterator<Item = NodeEntry>,
        num_outputs: u32,
    ) -> Self {
        Self {
            name: name.into(),
            op: Some(op),
            inputs: inputs.into_iter().collect(),
            num_outputs,
            attrs: BTreeMap::new(),
        }
    }

    /// Creates a graph-input placeholder.
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op: None,
            inputs: SmallVec::new(),
            num_outputs: 1,
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: AttrValue) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn is_input(&self) -> bool {
        self.op.is_none()
    }

    /// Operator name, or `"input"` for placeholders.
    pub fn op_name(&self) -> &str {
        self.op.as_ref().map(|op| op.name()).unwrap_or("input")
    }
}

/// Type-erased, string-keyed attribute table attached to a graph.
#[derive(Default, Clone)]
pub struct AttrMap {
    entries: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl AttrMap {
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(key.into(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.entries.get(key).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }
}

impl fmt::Debug for AttrMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Errors surfaced when reading graph attributes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph attribute `{name}` is missing")]
    MissingAttr { name: String },
    #[error("graph attribute `{name}` has an unexpected type")]
    AttrType { name: String },
}

/// An owned directed acyclic graph of operator nodes.
///
/// Nodes live in an arena ordered topologically: every [`NodeEntry`] held
/// by a node or by the graph's output list references an earlier arena
/// slot. Rewrites never mutate an existing arena; they build a fresh one
/// (see [`crate::transform`]).
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    outputs: Vec<NodeEntry>,
    pub attrs: AttrMap,
}

impl Graph {
    pub(crate) fn from_parts(nodes: Vec<Node>, outputs: Vec<NodeEntry>) -> Self {
        Self {
            nodes,
            outputs,
            attrs: AttrMap::default(),
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn outputs(&self) -> &[NodeEntry] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Arena id of the first node with the given name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(|pos| NodeId(pos as u32))
    }

    /// Typed attribute accessor distinguishing missing keys from payloads
    /// of the wrong type.
    pub fn attr<T: Any + Send + Sync>(&self, name: &str) -> Result<&T, GraphError> {
        match self.attrs.get::<T>(name) {
            Some(value) => Ok(value),
            None if self.attrs.contains(name) => Err(GraphError::AttrType {
                name: name.to_string(),
            }),
            None => Err(GraphError::MissingAttr {
                name: name.to_string(),
            }),
        }
    }

    /// Records the ordered shapes of the graph's input nodes under
    /// [`SHAPE_INPUTS_ATTR`].
    pub fn set_input_shapes(&mut self, shapes: ShapeVector) {
        self.attrs.insert(SHAPE_INPUTS_ATTR, shapes);
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, node) in self.nodes.iter().enumerate() {
            write!(f, "#{pos} {} = {}(", node.name, node.op_name())?;
            for (i, input) in node.inputs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}:{}", self.node(input.node).name, input.output)?;
            }
            writeln!(f, ")")?;
        }
        write!(f, "outputs:")?;
        for output in &self.outputs {
            write!(f, " {}:{}", self.node(output.node).name, output.output)?;
        }
        Ok(())
    }
}
