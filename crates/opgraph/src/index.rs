use thiserror::Error;

use crate::graph::{Graph, NodeEntry, NodeId};

/// Structural index over a graph's topologically ordered node list.
///
/// Built once per pass invocation. Building validates every edge: an input
/// must reference a node earlier in the arena and an output slot the
/// producer actually declares. The flat entry offsets align node outputs
/// with the graph's [`crate::shape::ShapeVector`].
#[derive(Debug, Clone)]
pub struct IndexedGraph {
    entry_offsets: Vec<usize>,
    input_nodes: Vec<NodeId>,
    num_entries: usize,
}

impl IndexedGraph {
    pub fn build(graph: &Graph) -> Result<Self, IndexError> {
        let mut entry_offsets = Vec::with_capacity(graph.len());
        let mut input_nodes = Vec::new();
        let mut offset = 0usize;

        for (pos, node) in graph.nodes().iter().enumerate() {
            for input in &node.inputs {
                if input.node.0 as usize >= pos {
                    return Err(IndexError::ForwardReference {
                        node: node.name.clone(),
                        entry: *input,
                    });
                }
                let producer = graph.node(input.node);
                if input.output >= producer.num_outputs {
                    return Err(IndexError::BadOutputSlot {
                        node: node.name.clone(),
                        producer: producer.name.clone(),
                        slot: input.output,
                    });
                }
            }
            if node.is_input() {
                input_nodes.push(NodeId(pos as u32));
            }
            entry_offsets.push(offset);
            offset += node.num_outputs as usize;
        }

        for output in graph.outputs() {
            if output.node.0 as usize >= graph.len() {
                return Err(IndexError::DanglingOutput { entry: *output });
            }
            let producer = graph.node(output.node);
            if output.output >= producer.num_outputs {
                return Err(IndexError::BadGraphOutput {
                    producer: producer.name.clone(),
                    slot: output.output,
                });
            }
        }

        Ok(Self {
            entry_offsets,
            input_nodes,
            num_entries: offset,
        })
    }

    /// Offset of the node's first output slot in the flat shape vector.
    pub fn entry_offset(&self, node: NodeId) -> usize {
        self.entry_offsets[node.0 as usize]
    }

    /// Flat shape-vector position of an output slot.
    pub fn entry_index(&self, entry: NodeEntry) -> usize {
        self.entry_offsets[entry.node.0 as usize] + entry.output as usize
    }

    /// Graph-input placeholders in topological order.
    pub fn input_nodes(&self) -> &[NodeId] {
        &self.input_nodes
    }

    /// Total number of output slots across all nodes.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }
}

/// Errors surfaced while indexing a graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("node `{node}` references {entry:?} before it is defined")]
    ForwardReference { node: String, entry: NodeEntry },
    #[error("node `{node}` references output {slot} of `{producer}`, which declares fewer outputs")]
    BadOutputSlot {
        node: String,
        producer: String,
        slot: u32,
    },
    #[error("graph output references {entry:?}, which does not exist")]
    DanglingOutput { entry: NodeEntry },
    #[error("graph output references output {slot} of `{producer}`, which declares fewer outputs")]
    BadGraphOutput { producer: String, slot: u32 },
}
