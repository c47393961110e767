use smallvec::smallvec;

use opgraph::graph::Node;
use opgraph::registry::{OpError, Operator, OutputShapes};
use opgraph::{OpRegistryBuilder, Shape};

use crate::param;

pub(crate) fn register(builder: &mut OpRegistryBuilder) {
    builder.register(Operator::new("split").with_shape_fn(split_shape));
    builder.register(Operator::new("concat").with_shape_fn(concat_shape));
}

/// Divides the `axis` extent into `sections` equal pieces, one output per
/// piece.
fn split_shape(node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    let op = node.op_name();
    let [x] = inputs else {
        return Err(OpError::InputArity {
            op: op.to_string(),
            expected: 1,
            got: inputs.len(),
        });
    };
    let sections = param::int(node, "sections")?;
    if sections <= 0 {
        return Err(OpError::BadParam {
            op: op.to_string(),
            param: "sections".to_string(),
        });
    }
    let sections = sections as usize;
    let axis = param::resolve_axis(op, param::int_or(node, "axis", 0)?, x.rank())?;
    let extent = x.dims()[axis];
    if extent % sections != 0 {
        return Err(OpError::UnevenSplit {
            op: op.to_string(),
            extent,
            sections,
        });
    }
    let mut dims = x.dims().to_vec();
    dims[axis] = extent / sections;
    let piece = Shape::new(dims);
    Ok((0..sections).map(|_| piece.clone()).collect())
}

/// Concatenates along `axis`; extents on every other axis must agree.
fn concat_shape(node: &Node, inputs: &[Shape]) -> Result<OutputShapes, OpError> {
    let op = node.op_name();
    let Some(first) = inputs.first() else {
        return Err(OpError::InputArity {
            op: op.to_string(),
            expected: 1,
            got: 0,
        });
    };
    let axis = param::resolve_axis(op, param::int_or(node, "axis", 0)?, first.rank())?;
    let mut dims = first.dims().to_vec();
    for other in &inputs[1..] {
        let compatible = other.rank() == first.rank()
            && first
                .dims()
                .iter()
                .zip(other.dims())
                .enumerate()
                .all(|(d, (a, b))| d == axis || a == b);
        if !compatible {
            return Err(OpError::ShapeMismatch {
                op: op.to_string(),
                lhs: first.clone(),
                rhs: other.clone(),
            });
        }
        dims[axis] += other.dims()[axis];
    }
    Ok(smallvec![Shape::new(dims)])
}
