//! Renderer taxonomy - how vendor node and parameter names map onto generic ones.
//!
//! Every renderer-specific network is first standardized into
//! [`GenericNodeType`]s and generic parameter names, then recreated from
//! those for the target renderer. The tables live in three submodules:
//!
//! - [`nodes`] - node type tables per renderer and source type
//! - [`params`] - parameter name tables per renderer node type
//! - [`usd`] - USD `info:id`s, material terminals and VOP output slots

pub mod nodes;
pub mod params;
pub mod usd;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::Error;

/// Prefix shared by all generic node type names.
pub const GENERIC_PREFIX: &str = "GENERIC::";

/// Renderer (material flavour) a network is authored for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Renderer {
    #[serde(rename = "arnold")]
    Arnold,
    #[serde(rename = "mtlx", alias = "materialx")]
    Mtlx,
    #[serde(rename = "rs_usd_material_builder", alias = "redshift")]
    Redshift,
    #[serde(rename = "principledshader", alias = "principled")]
    PrincipledShader,
    #[serde(rename = "usdpreview")]
    UsdPreview,
}

impl Renderer {
    /// All known renderers.
    pub const ALL: [Renderer; 5] = [
        Renderer::Arnold,
        Renderer::Mtlx,
        Renderer::Redshift,
        Renderer::PrincipledShader,
        Renderer::UsdPreview,
    ];

    /// Stable key used in files and on the command line.
    pub fn key(&self) -> &'static str {
        match self {
            Renderer::Arnold => "arnold",
            Renderer::Mtlx => "mtlx",
            Renderer::Redshift => "rs_usd_material_builder",
            Renderer::PrincipledShader => "principledshader",
            Renderer::UsdPreview => "usdpreview",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Renderer::Arnold => "Arnold",
            Renderer::Mtlx => "MTLX",
            Renderer::Redshift => "Redshift USD Material Builder",
            Renderer::PrincipledShader => "Principled Shader",
            Renderer::UsdPreview => "USD Preview Surface",
        }
    }
}

impl fmt::Display for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Renderer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arnold" | "ai" => Ok(Renderer::Arnold),
            "mtlx" | "materialx" => Ok(Renderer::Mtlx),
            "rs_usd_material_builder" | "redshift" | "rs" => Ok(Renderer::Redshift),
            "principledshader" | "principled" => Ok(Renderer::PrincipledShader),
            "usdpreview" | "usdpreviewsurface" | "usd_preview" => Ok(Renderer::UsdPreview),
            _ => Err(Error::UnsupportedRenderer(s.to_string())),
        }
    }
}

/// Where a network was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// Houdini VOP nodes (node type names like `arnold::image`).
    #[serde(rename = "hou_vop_nodes")]
    HouVopNodes,
    /// USD shader prims (node type is the `info:id`).
    #[serde(rename = "usd_prims")]
    UsdPrims,
}

impl SourceType {
    pub fn key(&self) -> &'static str {
        match self {
            SourceType::HouVopNodes => "hou_vop_nodes",
            SourceType::UsdPrims => "usd_prims",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hou_vop_nodes" => Ok(SourceType::HouVopNodes),
            "usd_prims" => Ok(SourceType::UsdPrims),
            _ => Err(Error::UnsupportedSourceType(s.to_string())),
        }
    }
}

/// Renderer-neutral node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenericNodeType {
    #[serde(rename = "GENERIC::standard_surface")]
    StandardSurface,
    #[serde(rename = "GENERIC::image")]
    Image,
    #[serde(rename = "GENERIC::range")]
    Range,
    #[serde(rename = "GENERIC::color_correct")]
    ColorCorrect,
    #[serde(rename = "GENERIC::curvature")]
    Curvature,
    #[serde(rename = "GENERIC::mix_rgba")]
    MixRgba,
    #[serde(rename = "GENERIC::mix_layer")]
    MixLayer,
    #[serde(rename = "GENERIC::layer_rgba")]
    LayerRgba,
    #[serde(rename = "GENERIC::ramp_rgb")]
    RampRgb,
    #[serde(rename = "GENERIC::ramp_float")]
    RampFloat,
    #[serde(rename = "GENERIC::displacement")]
    Displacement,
    #[serde(rename = "GENERIC::output_node")]
    OutputNode,
    #[serde(rename = "GENERIC::shader_node")]
    ShaderNode,
    #[serde(rename = "GENERIC::null")]
    Null,
}

impl GenericNodeType {
    /// Name without the `GENERIC::` prefix.
    pub fn name(&self) -> &'static str {
        match self {
            GenericNodeType::StandardSurface => "standard_surface",
            GenericNodeType::Image => "image",
            GenericNodeType::Range => "range",
            GenericNodeType::ColorCorrect => "color_correct",
            GenericNodeType::Curvature => "curvature",
            GenericNodeType::MixRgba => "mix_rgba",
            GenericNodeType::MixLayer => "mix_layer",
            GenericNodeType::LayerRgba => "layer_rgba",
            GenericNodeType::RampRgb => "ramp_rgb",
            GenericNodeType::RampFloat => "ramp_float",
            GenericNodeType::Displacement => "displacement",
            GenericNodeType::OutputNode => "output_node",
            GenericNodeType::ShaderNode => "shader_node",
            GenericNodeType::Null => "null",
        }
    }

    /// Full `GENERIC::<name>` form.
    pub fn as_string(&self) -> String {
        format!("{}{}", GENERIC_PREFIX, self.name())
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, GenericNodeType::OutputNode)
    }
}

impl fmt::Display for GenericNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", GENERIC_PREFIX, self.name())
    }
}

impl FromStr for GenericNodeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(GENERIC_PREFIX).unwrap_or(s);
        let ty = match name {
            "standard_surface" => GenericNodeType::StandardSurface,
            "image" => GenericNodeType::Image,
            "range" => GenericNodeType::Range,
            "color_correct" => GenericNodeType::ColorCorrect,
            "curvature" => GenericNodeType::Curvature,
            "mix_rgba" => GenericNodeType::MixRgba,
            "mix_layer" => GenericNodeType::MixLayer,
            "layer_rgba" => GenericNodeType::LayerRgba,
            "ramp_rgb" => GenericNodeType::RampRgb,
            "ramp_float" => GenericNodeType::RampFloat,
            "displacement" => GenericNodeType::Displacement,
            "output_node" => GenericNodeType::OutputNode,
            "shader_node" => GenericNodeType::ShaderNode,
            "null" => GenericNodeType::Null,
            _ => return Err(Error::other(format!("Unknown generic node type: {}", s))),
        };
        Ok(ty)
    }
}
