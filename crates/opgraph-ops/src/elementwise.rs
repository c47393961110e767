use smallvec::smallvec;

use opgraph::graph::Node;
use opgraph::registry::{OpError, Operator, OutputShapes};
use opgraph::{OpRegistryBuilder, Shape};

pub(crate) fn register(builder: &mut OpRegistryBuilder) {
    for name in ["relu", "sigmoid", "exp", "tanh"] {
        builder.register(Operator::new(name).with_shape_fn(unary_shape));
    }
    for name in ["add", "mul", "sub", "max"] {
        builder.register(Operator::new(name).with_shape_fn(binary_shape));
    }
}

fn unary_shape(node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    let [x] = inputs else {
        return Err(OpError::InputArity {
            op: node.op_name().to_string(),
            expected: 1,
            got: inputs.len(),
        });
    };
    Ok(smallvec![x.clone()])
}

fn binary_shape(node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    let [lhs, rhs] = inputs else {
        return Err(OpError::InputArity {
            op: node.op_name().to_string(),
            expected: 2,
            got: inputs.len(),
        });
    };
    if lhs != rhs {
        return Err(OpError::ShapeMismatch {
            op: node.op_name().to_string(),
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        });
    }
    Ok(smallvec![lhs.clone()])
}
