//! Material module - the renderer-neutral material model.
//!
//! Every source network (VOP snapshot, traversal dump, USD material prim) is
//! standardized into [`MaterialData`] before being recreated for a target.
//!
//! ## Key Concepts
//!
//! - **NodeInfo**: a node with a generic type, generic parameters and the
//!   connections into the node that reached it during traversal
//! - **OutputConnection**: which node drives a surface or displacement terminal
//! - **ParamValue**: a typed parameter value with a natural JSON form

mod schema;
mod value;

pub use schema::*;
pub use value::*;
pub(crate) use value::widen;

/// Prefix used for standardized output terminal keys.
pub const OUTPUT_PREFIX: &str = "GENERIC::output_";
