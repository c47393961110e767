use tracing::debug;

use crate::graph::{Graph, NodeId, SHAPE_ATTR, SHAPE_INPUTS_ATTR};
use crate::index::IndexedGraph;
use crate::pass::{Pass, PassContext, PassError};
use crate::shape::{Shape, ShapeVector};

/// Propagates shapes from graph inputs to every output slot.
///
/// Seeds input-node shapes from the `"shape_inputs"` attribute (ordered to
/// match the indexed graph's input list; a short list pads with unknown),
/// then walks nodes topologically applying operator shape functions, and
/// writes the flat `"shape"` vector — one entry per output slot.
///
/// Unknown input shapes flow through as unknown outputs rather than
/// failing: a rewrite may introduce inputs whose extents nobody knows yet.
#[derive(Debug, Default)]
pub struct InferShapePass;

impl InferShapePass {
    pub const NAME: &'static str = "InferShape";
}

impl Pass for InferShapePass {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self, mut graph: Graph, _cx: &PassContext<'_>) -> Result<Graph, PassError> {
        let idx = IndexedGraph::build(&graph)?;
        let seeds = graph.attr::<ShapeVector>(SHAPE_INPUTS_ATTR)?.clone();
        let mut shapes: ShapeVector = vec![Shape::unknown(); idx.num_entries()];

        let mut next_input = 0usize;
        for (pos, node) in graph.nodes().iter().enumerate() {
            let base = idx.entry_offset(NodeId(pos as u32));

            if node.is_input() {
                shapes[base] = seeds.get(next_input).cloned().unwrap_or_default();
                next_input += 1;
                continue;
            }

            let input_shapes: Vec<Shape> = node
                .inputs
                .iter()
                .map(|entry| shapes[idx.entry_index(*entry)].clone())
                .collect();
            if input_shapes.iter().any(Shape::is_unknown) {
                continue;
            }

            let op = node.op.as_ref().expect("non-input nodes carry an operator");
            let outputs = op
                .infer_shapes(node, &input_shapes)
                .map_err(|source| PassError::Op {
                    node: node.name.clone(),
                    op: op.name().to_string(),
                    source,
                })?;
            if outputs.len() != node.num_outputs as usize {
                return Err(PassError::ShapeArity {
                    node: node.name.clone(),
                    expected: node.num_outputs as usize,
                    got: outputs.len(),
                });
            }
            for (slot, shape) in outputs.into_iter().enumerate() {
                shapes[base + slot] = shape;
            }
        }

        debug!(nodes = graph.len(), entries = shapes.len(), "shapes inferred");
        graph.attrs.insert(SHAPE_ATTR, shapes);
        Ok(graph)
    }
}
