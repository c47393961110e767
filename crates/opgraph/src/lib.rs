//! Named-node computation graph IR with a shape-inference pass and a
//! compute-expansion pass.
//!
//! A [`Graph`] is an arena of operator [`Node`]s in topological order.
//! Operators are immutable descriptors held in an explicit [`OpRegistry`];
//! an operator may carry an expansion function rewriting its nodes into
//! subgraphs of directly realizable operators. The [`PassManager`]
//! schedules the built-in passes by name:
//!
//! ```
//! use opgraph::{PassManager, Shape};
//! use opgraph::transform::GraphBuilder;
//!
//! let registry = opgraph::OpRegistryBuilder::new().finish();
//! let mut builder = GraphBuilder::new();
//! let x = builder.input("x");
//! let mut graph = builder.finish(vec![x]);
//! graph.set_input_shapes(vec![Shape::new([4, 8])]);
//!
//! let manager = PassManager::with_standard_passes();
//! let graph = manager
//!     .apply(graph, &["InferShape", "ExpandCompute"], &registry)
//!     .unwrap();
//! assert_eq!(graph.len(), 1);
//! ```

pub mod graph;
pub mod index;
pub mod pass;
pub mod passes;
pub mod registry;
pub mod shape;
pub mod topology;
pub mod transform;

pub use graph::{AttrMap, AttrValue, Graph, GraphError, Node, NodeEntry, NodeId};
pub use graph::{SHAPE_ATTR, SHAPE_INPUTS_ATTR};
pub use index::{IndexError, IndexedGraph};
pub use pass::{Pass, PassContext, PassError, PassManager};
pub use passes::{ExpandComputePass, InferShapePass};
pub use registry::{ExpandArgs, OpError, OpRegistry, OpRegistryBuilder, Operator};
pub use shape::{Shape, ShapeVector};
pub use transform::{transform_nodes, GraphBuilder, Rewrite};
