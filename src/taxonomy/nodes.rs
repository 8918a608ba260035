//! Node type tables.
//!
//! Forward tables map a renderer node type (VOP type name or USD `info:id`)
//! to a [`GenericNodeType`]. Reverse lookups scan the same tables, so when
//! several specific types share a generic one the last entry wins.

use super::{GenericNodeType, Renderer, SourceType};
use GenericNodeType::*;

type NodeTable = &'static [(&'static str, GenericNodeType)];

const ARNOLD_VOP: NodeTable = &[
    ("arnold::standard_surface", StandardSurface),
    ("arnold::image", Image),
    ("arnold::range", Range),
    ("arnold::color_correct", ColorCorrect),
    ("arnold::curvature", Curvature),
    ("arnold::mix_rgba", MixRgba),
    ("arnold::mix_layer", MixLayer),
    ("arnold::layer_rgba", LayerRgba),
    ("arnold::ramp_rgb::2", RampRgb),
    ("arnold::ramp_float::2", RampFloat),
    ("arnold::bump2d", Displacement),
    ("arnold_material", OutputNode),
    ("null", Null),
];

const ARNOLD_USD: NodeTable = &[
    ("arnold:standard_surface", StandardSurface),
    ("arnold:image", Image),
    ("arnold:range", Range),
    ("arnold:color_correct", ColorCorrect),
    ("arnold:curvature", Curvature),
    ("arnold:mix_rgba", MixRgba),
    ("arnold:mix_layer", MixLayer),
    ("arnold:layer_rgba", LayerRgba),
    ("arnold:ramp_rgb::2", RampRgb),
    ("arnold:ramp_float::2", RampFloat),
    ("arnold:bump2d", Displacement),
    ("arnold_material", OutputNode),
    ("Material", OutputNode),
    ("null", Null),
];

const MTLX_VOP: NodeTable = &[
    ("mtlxstandard_surface", StandardSurface),
    ("mtlximage", Image),
    ("mtlxrange", Range),
    ("mtlxcolorcorrect", ColorCorrect),
    // mtlxmix stands for both mix_rgba and mix_layer
    ("mtlxmix", MixRgba),
    ("mtlxdisplacement", Displacement),
    ("subnetconnector", OutputNode),
    ("null", Null),
];

const MTLX_USD: NodeTable = &[
    ("ND_standard_surface_surfaceshader", StandardSurface),
    ("ND_image_float", Image),
    ("ND_image_color3", Image),
    ("ND_colorcorrect_color3", ColorCorrect),
    ("ND_range_float", Range),
    ("ND_range_color3", Range),
    ("ND_displacement_float", Displacement),
    ("ND_bump_vector3", Displacement),
    ("Material", OutputNode),
];

const REDSHIFT_VOP: NodeTable = &[
    ("redshift::StandardMaterial", StandardSurface),
    ("redshift::TextureSampler", Image),
    ("redshift::RSColorRange", Range),
    ("redshift::RSColorCorrection", ColorCorrect),
    ("redshift::Displacement", Displacement),
    ("redshift_material", OutputNode),
    ("redshift_usd_material", ShaderNode),
    ("null", Null),
];

const REDSHIFT_USD: NodeTable = &[
    ("redshift::StandardMaterial", StandardSurface),
    ("redshift::TextureSampler", Image),
    ("redshift::RSColorRange", Range),
    ("redshift::RSColorCorrection", ColorCorrect),
    ("redshift::Displacement", Displacement),
    ("redshift_material", OutputNode),
    ("redshift_usd_material", ShaderNode),
    ("Material", OutputNode),
    ("null", Null),
];

// The principled tree is synthetic: the shader itself stands in for the
// surface, an arnold-style output node and image complete it.
const PRINCIPLED_VOP: NodeTable = &[
    ("principledshader::2.0", StandardSurface),
    ("arnold::image", Image),
    ("arnold_material", OutputNode),
    ("null", Null),
];

const PREVIEW_VOP: NodeTable = &[
    ("usdpreviewsurface", StandardSurface),
    ("usduvtexture::2.0", Image),
    ("usduvtexture", Image),
    ("subnetconnector", OutputNode),
    ("null", Null),
];

const PREVIEW_USD: NodeTable = &[
    ("UsdPreviewSurface", StandardSurface),
    ("UsdUVTexture", Image),
    ("Material", OutputNode),
];

/// Forward table for a renderer and source type.
pub fn node_table(renderer: Renderer, source: SourceType) -> &'static [(&'static str, GenericNodeType)] {
    match (renderer, source) {
        (Renderer::Arnold, SourceType::HouVopNodes) => ARNOLD_VOP,
        (Renderer::Arnold, SourceType::UsdPrims) => ARNOLD_USD,
        (Renderer::Mtlx, SourceType::HouVopNodes) => MTLX_VOP,
        (Renderer::Mtlx, SourceType::UsdPrims) => MTLX_USD,
        (Renderer::Redshift, SourceType::HouVopNodes) => REDSHIFT_VOP,
        (Renderer::Redshift, SourceType::UsdPrims) => REDSHIFT_USD,
        (Renderer::PrincipledShader, SourceType::HouVopNodes) => PRINCIPLED_VOP,
        (Renderer::PrincipledShader, SourceType::UsdPrims) => &[],
        (Renderer::UsdPreview, SourceType::HouVopNodes) => PREVIEW_VOP,
        (Renderer::UsdPreview, SourceType::UsdPrims) => PREVIEW_USD,
    }
}

/// Generic type of a renderer node type.
pub fn to_generic(renderer: Renderer, source: SourceType, node_type: &str) -> Option<GenericNodeType> {
    node_table(renderer, source)
        .iter()
        .find(|(name, _)| *name == node_type)
        .map(|(_, generic)| *generic)
}

/// Renderer node type for a generic type, falling back to the table's
/// `GENERIC::null` entry.
pub fn from_generic(renderer: Renderer, source: SourceType, generic: GenericNodeType) -> Option<&'static str> {
    let table = node_table(renderer, source);
    let lookup = |g: GenericNodeType| table.iter().rev().find(|(_, t)| *t == g).map(|(n, _)| *n);
    lookup(generic).or_else(|| lookup(Null))
}

const ARNOLD_RECREATE: NodeTable = &[
    ("arnold::standard_surface", StandardSurface),
    ("arnold::image", Image),
    ("arnold::color_correct", ColorCorrect),
    ("arnold::range", Range),
    ("arnold::curvature", Curvature),
    ("arnold::mix_rgba", MixRgba),
    ("arnold::mix_layer", MixLayer),
    ("arnold::layer_rgba", LayerRgba),
    ("arnold::ramp_rgb::2", RampRgb),
    ("arnold::ramp_float::2", RampFloat),
    ("arnold::bump2d", Displacement),
    ("null", Null),
];

const MTLX_RECREATE: NodeTable = &[
    ("mtlxstandard_surface", StandardSurface),
    ("mtlximage", Image),
    ("mtlxcolorcorrect", ColorCorrect),
    ("mtlxrange", Range),
    ("mtlxmix", MixRgba),
    ("mtlxmix", MixLayer),
    ("mtlxdisplacement", Displacement),
    ("null", Null),
];

const PRINCIPLED_RECREATE: NodeTable = &[("principledshader::2.0", StandardSurface)];

/// VOP node type to create for a generic type, with the `null` fallback.
///
/// Returns `None` for targets that cannot hold child nodes.
pub fn vop_node_type(renderer: Renderer, generic: GenericNodeType) -> Option<&'static str> {
    let table = match renderer {
        Renderer::Arnold => ARNOLD_RECREATE,
        Renderer::Mtlx => MTLX_RECREATE,
        Renderer::Redshift => return from_generic(renderer, SourceType::HouVopNodes, generic),
        Renderer::PrincipledShader => PRINCIPLED_RECREATE,
        Renderer::UsdPreview => return None,
    };
    table
        .iter()
        .find(|(_, t)| *t == generic)
        .or_else(|| table.iter().find(|(_, t)| *t == Null))
        .map(|(n, _)| *n)
}
