//! USD layer: stage model, USDA text I/O and material passes on a stage.
//!
//! The stage is a single in-memory layer, enough to read and write shading
//! networks and bindings without a USD runtime:
//!
//! - [`Stage`] / [`Prim`] / [`Attribute`] - path-keyed scene description
//! - [`parse_usda`] / [`write_usda`] - USDA text subset
//! - [`UsdShadersIngest`] - UsdPreview texture sets and bound prims
//! - [`UsdTraverser`] - material prims as traversal trees for standardization
//! - [`CollectMaterialBuilder`] - `mat_<name>_collect` materials from texture sets
//! - [`reassign_bindings`] - move bindings from one material to another
//!
//! # Example
//!
//! ```ignore
//! use material_processor::usd::{Stage, UsdShadersIngest};
//!
//! let stage = Stage::open("shot.usda")?;
//! for material in UsdShadersIngest::new(&stage).run() {
//!     println!("{}: {} texture(s)", material.material_name, material.textures.len());
//! }
//! ```

mod assign;
mod collect;
mod ingest;
mod parser;
mod stage;
mod traverse;
mod writer;

pub use assign::*;
pub use collect::*;
pub use ingest::*;
pub use parser::parse_usda;
pub use stage::*;
pub use traverse::*;
pub use writer::{escape_string, format_real, format_value, write_usda};
