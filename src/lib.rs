//! # Material Processor
//!
//! Converts shader networks between Arnold, MaterialX, Redshift, Houdini's
//! Principled Shader and UsdPreviewSurface through a renderer-neutral
//! generic form.
//!
//! Sources are Houdini VOP builders (as JSON snapshots exported by a host
//! script), traversal dumps and USD stages in USDA text form. Each source is
//! traversed into a node tree, standardized into a [`MaterialData`] and
//! recreated for the target renderer, either as a new VOP builder snapshot
//! or as `Material`/`Shader` prims on the stage.
//!
//! ## Modules
//!
//! - [`util`] - Errors and JSON helpers
//! - [`material`] - Generic material model and parameter values
//! - [`taxonomy`] - Renderer, node type and parameter name tables
//! - [`network`] - VOP builder snapshots, type detection and traversal
//! - [`standardize`] - Renderer nodes to generic nodes
//! - [`recreate`] - Generic nodes to VOP builders or USD prims
//! - [`usd`] - Stage model, USDA I/O, ingest, collect materials, bindings
//! - [`pipeline`] - End-to-end passes
//! - [`config`] - Persistent settings
//!
//! ## Example
//!
//! ```ignore
//! use material_processor::prelude::*;
//!
//! let network = VopNetwork::load("arnold_materialbuilder1.json")?;
//! let converted = pipeline::convert_network(&network, Renderer::Mtlx, &Settings::load())?;
//! converted.network.save("wood_mtlx.json")?;
//! ```

pub mod util;
pub mod material;
pub mod taxonomy;
pub mod network;
pub mod standardize;
pub mod recreate;
pub mod usd;
pub mod pipeline;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};
pub use material::{MaterialData, NodeInfo, ParamValue};
pub use taxonomy::{GenericNodeType, Renderer, SourceType};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::material::{MaterialData, NodeInfo, NodeParameter, OutputKind, ParamValue, TextureSlot};
    pub use crate::network::{NodeTraverser, TraversalDump, VopNetwork};
    pub use crate::pipeline;
    pub use crate::recreate::{NodeRecreator, UsdMaterialRecreator};
    pub use crate::standardize::NodeStandardizer;
    pub use crate::taxonomy::{GenericNodeType, Renderer, SourceType};
    pub use crate::usd::{Stage, UsdShadersIngest, UsdTraverser};
    pub use crate::util::{Error, Result};
}
