use smallvec::SmallVec;

use crate::graph::{Graph, Node, NodeEntry, NodeId};

/// Arena under construction for a rewritten graph.
///
/// Nodes are appended in dependency order: a producer is always added
/// before any node consuming one of its entries, so the finished arena is
/// topologically ordered by construction.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<Node>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its arena id.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Appends a node and returns the entry for its first output.
    pub fn add_entry(&mut self, node: Node) -> NodeEntry {
        NodeEntry::new(self.add(node), 0)
    }

    /// Appends a graph-input placeholder.
    pub fn input(&mut self, name: impl Into<String>) -> NodeEntry {
        self.add_entry(Node::input(name))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finish(self, outputs: Vec<NodeEntry>) -> Graph {
        Graph::from_parts(self.nodes, outputs)
    }
}

/// Outcome of a per-node rewrite callback.
pub enum Rewrite {
    /// Keep the node, remapping its inputs into the new arena.
    Keep,
    /// Substitute the node's output slots with the given entries, in slot
    /// order. The entries must reference nodes the callback added through
    /// the builder.
    Replace(Vec<NodeEntry>),
}

/// Rebuilds `graph` into a fresh arena, letting `rewrite` substitute any
/// node's outputs with entries it created through the builder.
///
/// The callback sees each node once, in topological order, together with
/// its inputs already remapped into the new arena. Downstream consumers of
/// a replaced node — including the graph's output list — are rewired slot
/// for slot. Returns the rebuilt graph and whether any substitution
/// occurred.
///
/// The source graph must be topologically valid; build an
/// [`crate::index::IndexedGraph`] first to check.
pub fn transform_nodes<F, E>(graph: &Graph, mut rewrite: F) -> Result<(Graph, bool), E>
where
    F: FnMut(NodeId, &Node, &[NodeEntry], &mut GraphBuilder) -> Result<Rewrite, E>,
{
    let mut builder = GraphBuilder::new();
    let mut remap: Vec<Option<SmallVec<[NodeEntry; 2]>>> = vec![None; graph.len()];
    let mut changed = false;

    for (pos, node) in graph.nodes().iter().enumerate() {
        let inputs: SmallVec<[NodeEntry; 2]> = node
            .inputs
            .iter()
            .map(|entry| lookup(&remap, *entry))
            .collect();

        match rewrite(NodeId(pos as u32), node, &inputs, &mut builder)? {
            Rewrite::Keep => {
                let mut kept = node.clone();
                kept.inputs = inputs;
                let new_id = builder.add(kept);
                remap[pos] = Some(
                    (0..node.num_outputs)
                        .map(|slot| NodeEntry::new(new_id, slot))
                        .collect(),
                );
            }
            Rewrite::Replace(entries) => {
                changed = true;
                remap[pos] = Some(entries.into_iter().collect());
            }
        }
    }

    let outputs = graph
        .outputs()
        .iter()
        .map(|entry| lookup(&remap, *entry))
        .collect();

    Ok((builder.finish(outputs), changed))
}

fn lookup(remap: &[Option<SmallVec<[NodeEntry; 2]>>], entry: NodeEntry) -> NodeEntry {
    let slots = remap[entry.node.0 as usize]
        .as_ref()
        .expect("topological order remaps producers before consumers");
    slots[entry.output as usize]
}
