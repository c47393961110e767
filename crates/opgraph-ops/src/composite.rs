use smallvec::smallvec;

use opgraph::graph::{AttrValue, Node, NodeEntry};
use opgraph::registry::{ExpandArgs, OpError, Operator, OutputShapes};
use opgraph::transform::GraphBuilder;
use opgraph::{OpRegistryBuilder, Shape};

use crate::param;

pub(crate) fn register(builder: &mut OpRegistryBuilder) {
    builder.register(
        Operator::new("glu")
            .with_shape_fn(glu_shape)
            .with_expansion(glu_expand),
    );
}

/// `glu(x) = a * sigmoid(b)` with `a, b = split(x, 2, axis)`. The result
/// halves the split axis; `axis` defaults to the last one.
fn glu_shape(node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    let op = node.op_name();
    let [x] = inputs else {
        return Err(OpError::InputArity {
            op: op.to_string(),
            expected: 1,
            got: inputs.len(),
        });
    };
    let axis = param::resolve_axis(op, param::int_or(node, "axis", -1)?, x.rank())?;
    let extent = x.dims()[axis];
    if extent % 2 != 0 {
        return Err(OpError::UnevenSplit {
            op: op.to_string(),
            extent,
            sections: 2,
        });
    }
    let mut dims = x.dims().to_vec();
    dims[axis] /= 2;
    Ok(smallvec![Shape::new(dims)])
}

fn glu_expand(args: &ExpandArgs<'_>, builder: &mut GraphBuilder) -> Result<Vec<NodeEntry>, OpError> {
    let node = args.node;
    let [x] = args.inputs else {
        return Err(OpError::InputArity {
            op: node.op_name().to_string(),
            expected: 1,
            got: args.inputs.len(),
        });
    };

    let split = args.registry.expect("split")?.clone();
    let sigmoid = args.registry.expect("sigmoid")?.clone();
    let mul = args.registry.expect("mul")?.clone();

    let axis = param::int_or(node, "axis", -1)?;
    let split_id = builder.add(
        Node::new(format!("{}_split", node.name), split, [*x], 2)
            .with_attr("axis", AttrValue::Int(axis))
            .with_attr("sections", AttrValue::Int(2)),
    );
    let lhs = NodeEntry::new(split_id, 0);
    let gated = NodeEntry::new(split_id, 1);
    let gate = builder.add_entry(Node::new(
        format!("{}_gate", node.name),
        sigmoid,
        [gated],
        1,
    ));
    let out = builder.add_entry(Node::new(format!("{}_mul", node.name), mul, [lhs, gate], 1));
    Ok(vec![out])
}
