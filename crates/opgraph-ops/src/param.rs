use opgraph::graph::Node;
use opgraph::registry::OpError;

/// Required integer parameter.
pub(crate) fn int(node: &Node, key: &str) -> Result<i64, OpError> {
    match node.attrs.get(key) {
        Some(value) => value.as_int().ok_or_else(|| OpError::BadParam {
            op: node.op_name().to_string(),
            param: key.to_string(),
        }),
        None => Err(OpError::MissingParam {
            op: node.op_name().to_string(),
            param: key.to_string(),
        }),
    }
}

/// Integer parameter with a default when absent.
pub(crate) fn int_or(node: &Node, key: &str, default: i64) -> Result<i64, OpError> {
    match node.attrs.get(key) {
        Some(value) => value.as_int().ok_or_else(|| OpError::BadParam {
            op: node.op_name().to_string(),
            param: key.to_string(),
        }),
        None => Ok(default),
    }
}

/// Resolves a possibly negative axis against `rank`.
pub(crate) fn resolve_axis(op: &str, axis: i64, rank: usize) -> Result<usize, OpError> {
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if resolved < 0 || resolved >= rank as i64 {
        return Err(OpError::AxisOutOfBounds {
            op: op.to_string(),
            axis,
            rank,
        });
    }
    Ok(resolved as usize)
}
