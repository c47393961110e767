use std::collections::HashMap;

use tracing::{debug, trace};

use crate::graph::{Graph, SHAPE_ATTR, SHAPE_INPUTS_ATTR};
use crate::index::IndexedGraph;
use crate::pass::{Pass, PassContext, PassError};
use crate::registry::ExpandArgs;
use crate::shape::{Shape, ShapeVector};
use crate::transform::{transform_nodes, Rewrite};

use super::infer_shape::InferShapePass;

const DEFAULT_MAX_ROUNDS: usize = 32;

/// Maps node names to the shape of their first output.
///
/// Walks nodes in topological order with a cursor into the flat shape
/// vector, consuming `num_outputs` entries per node and recording the
/// first. A name occurring twice keeps the later shape; the historical
/// pipeline tolerated duplicate names this way and downstream consumers
/// rely on the permissive lookup.
pub(crate) fn build_shape_index(graph: &Graph, shapes: &[Shape]) -> HashMap<String, Shape> {
    let mut index = HashMap::with_capacity(graph.len());
    let mut cursor = 0usize;
    for node in graph.nodes() {
        if node.num_outputs > 0 {
            if let Some(shape) = shapes.get(cursor) {
                index.insert(node.name.clone(), shape.clone());
            }
        }
        cursor += node.num_outputs as usize;
    }
    index
}

/// Rewrites every node whose operator carries an expansion function into a
/// subgraph of directly realizable operators.
///
/// Each round reads the graph's `"shape"` vector, substitutes expandable
/// nodes (rewiring consumers slot for slot), and records the rewritten
/// graph's input shapes under `"shape_inputs"`. When a round substituted
/// anything, shapes are re-inferred and the next round picks up operators
/// the previous expansion exposed. Rounds are capped: a chain that keeps
/// producing expandable operators fails with
/// [`PassError::ExpansionLimit`].
pub struct ExpandComputePass {
    max_rounds: usize,
}

impl ExpandComputePass {
    pub const NAME: &'static str = "ExpandCompute";

    pub fn new() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(max_rounds: usize) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
        }
    }
}

impl Default for ExpandComputePass {
    fn default() -> Self {
        Self::new()
    }
}

impl Pass for ExpandComputePass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, graph: Graph, cx: &PassContext<'_>) -> Result<Graph, PassError> {
        let mut graph = graph;
        for round in 0..self.max_rounds {
            let (next, expanded) = expand_once(graph, cx)?;
            if !expanded {
                debug!(rounds = round + 1, "expansion reached fixed point");
                return Ok(next);
            }
            graph = cx.apply(next, InferShapePass::NAME)?;
        }
        Err(PassError::ExpansionLimit {
            limit: self.max_rounds,
        })
    }
}

/// One expansion traversal. Returns the rewritten graph and whether any
/// node was substituted.
fn expand_once(graph: Graph, cx: &PassContext<'_>) -> Result<(Graph, bool), PassError> {
    IndexedGraph::build(&graph)?;
    let shape_vec = graph.attr::<ShapeVector>(SHAPE_ATTR)?;
    let name2shape = build_shape_index(&graph, shape_vec);

    let (mut out, expanded) = transform_nodes(&graph, |_, node, inputs, builder| {
        let Some(op) = node.op.as_ref() else {
            return Ok(Rewrite::Keep);
        };
        let Some(expand) = op.expansion() else {
            return Ok(Rewrite::Keep);
        };

        let mut input_shapes = Vec::with_capacity(node.inputs.len());
        for input in &node.inputs {
            let producer = &graph.node(input.node).name;
            let shape = name2shape
                .get(producer)
                .ok_or_else(|| PassError::MissingShape {
                    input: producer.clone(),
                    consumer: node.name.clone(),
                })?;
            input_shapes.push(shape.clone());
        }

        let args = ExpandArgs {
            node,
            inputs,
            input_shapes: &input_shapes,
            registry: cx.registry,
        };
        let replacement = expand(&args, builder).map_err(|source| PassError::Op {
            node: node.name.clone(),
            op: op.name().to_string(),
            source,
        })?;
        if replacement.len() != node.num_outputs as usize {
            return Err(PassError::ExpansionArity {
                node: node.name.clone(),
                expected: node.num_outputs as usize,
                got: replacement.len(),
            });
        }
        trace!(node = %node.name, op = op.name(), "node expanded");
        Ok(Rewrite::Replace(replacement))
    })?;

    // Preserve input shapes for whatever pass runs next. An input
    // introduced by an expansion is unknown to the old index and seeds as
    // the unknown shape.
    let out_idx = IndexedGraph::build(&out)?;
    let mut input_shapes: ShapeVector = Vec::with_capacity(out_idx.input_nodes().len());
    for &input in out_idx.input_nodes() {
        let name = &out.node(input).name;
        input_shapes.push(name2shape.get(name).cloned().unwrap_or_default());
    }

    if !expanded {
        out.attrs = graph.attrs;
    }
    out.attrs.insert(SHAPE_INPUTS_ATTR, input_shapes);
    Ok((out, expanded))
}

#[cfg(test)]
mod tests {
    use super::build_shape_index;
    use crate::graph::Node;
    use crate::shape::Shape;
    use crate::transform::GraphBuilder;

    fn node_with_outputs(name: &str, num_outputs: u32) -> Node {
        let mut node = Node::input(name);
        node.num_outputs = num_outputs;
        node
    }

    #[test]
    fn cursor_advances_by_declared_outputs() {
        let mut builder = GraphBuilder::new();
        builder.input("a");
        builder.add(node_with_outputs("fan", 3));
        builder.input("tail");
        let graph = builder.finish(vec![]);

        let shapes = vec![
            Shape::new([1]),
            Shape::new([2]),
            Shape::new([3]),
            Shape::new([4]),
            Shape::new([5]),
        ];
        let index = build_shape_index(&graph, &shapes);
        assert_eq!(index["a"], Shape::new([1]));
        assert_eq!(index["fan"], Shape::new([2]));
        assert_eq!(index["tail"], Shape::new([5]));
    }

    #[test]
    fn later_duplicate_name_overwrites_earlier() {
        let mut builder = GraphBuilder::new();
        builder.input("x");
        builder.input("x");
        let graph = builder.finish(vec![]);

        let shapes = vec![Shape::new([7]), Shape::new([9])];
        let index = build_shape_index(&graph, &shapes);
        assert_eq!(index.len(), 1);
        assert_eq!(index["x"], Shape::new([9]));
    }

    #[test]
    fn zero_output_node_records_nothing() {
        let mut builder = GraphBuilder::new();
        builder.add(node_with_outputs("sink", 0));
        builder.input("y");
        let graph = builder.finish(vec![]);

        let shapes = vec![Shape::new([2, 2])];
        let index = build_shape_index(&graph, &shapes);
        assert!(!index.contains_key("sink"));
        assert_eq!(index["y"], Shape::new([2, 2]));
    }
}
