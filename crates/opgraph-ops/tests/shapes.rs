use opgraph::graph::{AttrValue, Node, NodeEntry, SHAPE_ATTR};
use opgraph::transform::GraphBuilder;
use opgraph::{Graph, IndexedGraph, NodeId, OpError, PassError, PassManager, Shape, ShapeVector};

fn infer(graph: Graph) -> Result<Graph, PassError> {
    let registry = opgraph_ops::standard_registry();
    let manager = PassManager::with_standard_passes();
    manager.apply(graph, &["InferShape"], &registry)
}

fn split_concat_graph(sections: i64, axis: i64) -> (Graph, NodeId, NodeId) {
    let registry = opgraph_ops::standard_registry();
    let mut builder = GraphBuilder::new();
    let x = builder.input("x");
    let split = builder.add(
        Node::new(
            "s",
            registry.get("split").unwrap().clone(),
            [x],
            sections as u32,
        )
        .with_attr("sections", AttrValue::Int(sections))
        .with_attr("axis", AttrValue::Int(axis)),
    );
    let pieces: Vec<NodeEntry> = (0..sections as u32)
        .map(|slot| NodeEntry::new(split, slot))
        .collect();
    let concat = builder.add(
        Node::new("c", registry.get("concat").unwrap().clone(), pieces, 1)
            .with_attr("axis", AttrValue::Int(axis)),
    );
    let graph = builder.finish(vec![NodeEntry::new(concat, 0)]);
    (graph, split, concat)
}

#[test]
fn split_then_concat_roundtrips_the_shape() {
    let (mut graph, split, concat) = split_concat_graph(3, 1);
    graph.set_input_shapes(vec![Shape::new([2, 6])]);

    let out = infer(graph).unwrap();
    let idx = IndexedGraph::build(&out).unwrap();
    let shapes = out.attr::<ShapeVector>(SHAPE_ATTR).unwrap();

    for slot in 0..3 {
        assert_eq!(
            shapes[idx.entry_index(NodeEntry::new(split, slot))],
            Shape::new([2, 2])
        );
    }
    assert_eq!(
        shapes[idx.entry_index(NodeEntry::new(concat, 0))],
        Shape::new([2, 6])
    );
}

#[test]
fn split_accepts_negative_axis() {
    let (mut graph, split, _) = split_concat_graph(2, -1);
    graph.set_input_shapes(vec![Shape::new([4, 10])]);

    let out = infer(graph).unwrap();
    let idx = IndexedGraph::build(&out).unwrap();
    let shapes = out.attr::<ShapeVector>(SHAPE_ATTR).unwrap();
    assert_eq!(
        shapes[idx.entry_index(NodeEntry::new(split, 0))],
        Shape::new([4, 5])
    );
}

#[test]
fn split_uneven_extent_errors() {
    let (mut graph, _, _) = split_concat_graph(4, 1);
    graph.set_input_shapes(vec![Shape::new([2, 6])]);

    let err = infer(graph).unwrap_err();
    assert_eq!(
        err,
        PassError::Op {
            node: "s".to_string(),
            op: "split".to_string(),
            source: OpError::UnevenSplit {
                op: "split".to_string(),
                extent: 6,
                sections: 4,
            },
        }
    );
}

#[test]
fn split_axis_out_of_bounds_errors() {
    let (mut graph, _, _) = split_concat_graph(2, 5);
    graph.set_input_shapes(vec![Shape::new([2, 6])]);

    let err = infer(graph).unwrap_err();
    assert_eq!(
        err,
        PassError::Op {
            node: "s".to_string(),
            op: "split".to_string(),
            source: OpError::AxisOutOfBounds {
                op: "split".to_string(),
                axis: 5,
                rank: 2,
            },
        }
    );
}

#[test]
fn split_missing_sections_param_errors() {
    let registry = opgraph_ops::standard_registry();
    let mut builder = GraphBuilder::new();
    let x = builder.input("x");
    builder.add(Node::new(
        "s",
        registry.get("split").unwrap().clone(),
        [x],
        2,
    ));
    let mut graph = builder.finish(vec![]);
    graph.set_input_shapes(vec![Shape::new([2, 6])]);

    let err = infer(graph).unwrap_err();
    assert_eq!(
        err,
        PassError::Op {
            node: "s".to_string(),
            op: "split".to_string(),
            source: OpError::MissingParam {
                op: "split".to_string(),
                param: "sections".to_string(),
            },
        }
    );
}

#[test]
fn concat_shape_mismatch_errors() {
    let registry = opgraph_ops::standard_registry();
    let mut builder = GraphBuilder::new();
    let a = builder.input("a");
    let b = builder.input("b");
    builder.add(
        Node::new("c", registry.get("concat").unwrap().clone(), [a, b], 1)
            .with_attr("axis", AttrValue::Int(0)),
    );
    let mut graph = builder.finish(vec![]);
    graph.set_input_shapes(vec![Shape::new([2, 3]), Shape::new([2, 4])]);

    let err = infer(graph).unwrap_err();
    assert_eq!(
        err,
        PassError::Op {
            node: "c".to_string(),
            op: "concat".to_string(),
            source: OpError::ShapeMismatch {
                op: "concat".to_string(),
                lhs: Shape::new([2, 3]),
                rhs: Shape::new([2, 4]),
            },
        }
    );
}
