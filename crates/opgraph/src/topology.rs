use std::fmt;

use crate::graph::Graph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyError {
    pub node: String,
    pub reference: u32,
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node `{}` uses node #{} before it is defined",
            self.node, self.reference
        )
    }
}

/// Checks that every reference in the graph points at an earlier node.
pub fn validate_topology(graph: &Graph) -> Result<(), TopologyError> {
    for (pos, node) in graph.nodes().iter().enumerate() {
        for input in &node.inputs {
            if input.node.0 as usize >= pos {
                return Err(TopologyError {
                    node: node.name.clone(),
                    reference: input.node.0,
                });
            }
        }
    }

    for output in graph.outputs() {
        if output.node.0 as usize >= graph.len() {
            return Err(TopologyError {
                node: "<graph output>".to_string(),
                reference: output.node.0,
            });
        }
    }

    Ok(())
}
