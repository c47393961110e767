//! Standard operator set for [`opgraph`] graphs.
//!
//! Elementwise and movement operators are directly realizable and only
//! carry shape functions; composite operators (currently `glu`) also carry
//! an expansion function and are lowered away by the `ExpandCompute` pass.

mod composite;
mod elementwise;
mod movement;
mod param;

use opgraph::{OpRegistry, OpRegistryBuilder};

/// Registers the standard operators into `builder`, composing with any
/// caller-defined operators.
pub fn register(builder: &mut OpRegistryBuilder) {
    elementwise::register(builder);
    movement::register(builder);
    composite::register(builder);
}

/// A registry containing exactly the standard operator set.
pub fn standard_registry() -> OpRegistry {
    let mut builder = OpRegistryBuilder::new();
    register(&mut builder);
    builder.finish()
}
