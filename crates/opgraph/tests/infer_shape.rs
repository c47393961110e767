use smallvec::smallvec;

use opgraph::graph::{Node, NodeEntry, SHAPE_ATTR, SHAPE_INPUTS_ATTR};
use opgraph::registry::{OpError, OpRegistry, OpRegistryBuilder, Operator, OutputShapes};
use opgraph::transform::GraphBuilder;
use opgraph::{GraphError, IndexedGraph, PassError, PassManager, Shape, ShapeVector};

fn same_shape(_node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    Ok(smallvec![inputs[0].clone()])
}

fn dup_shape(_node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    Ok(smallvec![inputs[0].clone(), inputs[0].clone()])
}

fn test_registry() -> OpRegistry {
    let mut builder = OpRegistryBuilder::new();
    builder.register(Operator::new("copy").with_shape_fn(same_shape));
    builder.register(Operator::new("dup").with_shape_fn(dup_shape));
    builder.register(Operator::new("defaulted"));
    builder.register(Operator::new("narrow").with_shape_fn(same_shape));
    builder.finish()
}

#[test]
fn propagates_through_multi_output_nodes() {
    let registry = test_registry();
    let mut builder = GraphBuilder::new();
    let a = builder.input("A");
    let dup = builder.add(Node::new(
        "D",
        registry.get("dup").unwrap().clone(),
        [a],
        2,
    ));
    let second = NodeEntry::new(dup, 1);
    let c = builder.add_entry(Node::new(
        "C",
        registry.get("copy").unwrap().clone(),
        [second],
        1,
    ));
    let mut graph = builder.finish(vec![c]);
    graph.set_input_shapes(vec![Shape::new([2, 4])]);

    let manager = PassManager::with_standard_passes();
    let out = manager.apply(graph, &["InferShape"], &registry).unwrap();

    let idx = IndexedGraph::build(&out).unwrap();
    let shapes = out.attr::<ShapeVector>(SHAPE_ATTR).unwrap();
    assert_eq!(shapes.len(), 4);
    assert_eq!(shapes[idx.entry_index(NodeEntry::new(dup, 0))], Shape::new([2, 4]));
    assert_eq!(shapes[idx.entry_index(NodeEntry::new(dup, 1))], Shape::new([2, 4]));
    assert_eq!(shapes[idx.entry_index(c)], Shape::new([2, 4]));
}

#[test]
fn missing_shape_inputs_attr_errors() {
    let registry = test_registry();
    let mut builder = GraphBuilder::new();
    builder.input("A");
    let graph = builder.finish(vec![]);

    let manager = PassManager::with_standard_passes();
    let err = manager.apply(graph, &["InferShape"], &registry).unwrap_err();
    assert_eq!(
        err,
        PassError::Graph(GraphError::MissingAttr {
            name: SHAPE_INPUTS_ATTR.to_string(),
        })
    );
}

#[test]
fn short_seed_list_pads_with_unknown() {
    let registry = test_registry();
    let mut builder = GraphBuilder::new();
    let a = builder.input("A");
    let b = builder.input("B");
    let c = builder.add_entry(Node::new(
        "C",
        registry.get("copy").unwrap().clone(),
        [b],
        1,
    ));
    let d = builder.add_entry(Node::new(
        "D",
        registry.get("copy").unwrap().clone(),
        [a],
        1,
    ));
    let mut graph = builder.finish(vec![c, d]);
    graph.set_input_shapes(vec![Shape::new([8])]);

    let manager = PassManager::with_standard_passes();
    let out = manager.apply(graph, &["InferShape"], &registry).unwrap();

    let idx = IndexedGraph::build(&out).unwrap();
    let shapes = out.attr::<ShapeVector>(SHAPE_ATTR).unwrap();
    // B had no seed: it and its consumer stay unknown.
    assert!(shapes[idx.entry_index(c)].is_unknown());
    assert_eq!(shapes[idx.entry_index(d)], Shape::new([8]));
}

#[test]
fn operators_without_shape_fn_default_to_first_input() {
    let registry = test_registry();
    let mut builder = GraphBuilder::new();
    let a = builder.input("A");
    let b = builder.input("B");
    let c = builder.add_entry(Node::new(
        "C",
        registry.get("defaulted").unwrap().clone(),
        [a, b],
        1,
    ));
    let mut graph = builder.finish(vec![c]);
    graph.set_input_shapes(vec![Shape::new([3, 3]), Shape::new([9])]);

    let manager = PassManager::with_standard_passes();
    let out = manager.apply(graph, &["InferShape"], &registry).unwrap();

    let idx = IndexedGraph::build(&out).unwrap();
    let shapes = out.attr::<ShapeVector>(SHAPE_ATTR).unwrap();
    assert_eq!(shapes[idx.entry_index(c)], Shape::new([3, 3]));
}

#[test]
fn shape_fn_arity_mismatch_errors() {
    let registry = test_registry();
    let mut builder = GraphBuilder::new();
    let a = builder.input("A");
    // Declares two outputs but `narrow` only ever produces one shape.
    builder.add(Node::new(
        "N",
        registry.get("narrow").unwrap().clone(),
        [a],
        2,
    ));
    let mut graph = builder.finish(vec![]);
    graph.set_input_shapes(vec![Shape::new([4])]);

    let manager = PassManager::with_standard_passes();
    let err = manager.apply(graph, &["InferShape"], &registry).unwrap_err();
    assert_eq!(
        err,
        PassError::ShapeArity {
            node: "N".to_string(),
            expected: 2,
            got: 1,
        }
    );
}
