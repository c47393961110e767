use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Static extents of a tensor-valued output.
///
/// The default value is the *unknown* shape (rank zero). It stands in for
/// outputs whose extents have not been inferred yet and for graph inputs
/// that no longer resolve after a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: SmallVec<[usize; 4]>,
}

/// Flat per-output-slot shapes, one entry per node output in topological
/// order. Its length equals the sum of `num_outputs` over all nodes.
pub type ShapeVector = Vec<Shape>;

impl Shape {
    pub fn new(dims: impl IntoIterator<Item = usize>) -> Self {
        Self {
            dims: dims.into_iter().collect(),
        }
    }

    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn is_unknown(&self) -> bool {
        self.dims.is_empty()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "[?]");
        }
        write!(f, "[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self::new(dims)
    }
}
