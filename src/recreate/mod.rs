//! Recreation of generic materials for a target renderer.
//!
//! - [`NodeRecreator`] - builds a VOP network (`arnold_materialbuilder`,
//!   MaterialX subnet, Redshift vopnet or a principled shader)
//! - [`UsdMaterialRecreator`] - builds a `Material` prim with shaders on a stage

mod usd;
mod vop;

pub use usd::*;
pub use vop::*;
