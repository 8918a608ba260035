//! USD and VOP output tables: shader ids, material terminals, output slots.

use super::{GenericNodeType, Renderer};
use crate::material::OutputKind;

/// USD prim type for a generic node (`Material` for output nodes).
pub fn usd_prim_type(generic: GenericNodeType) -> &'static str {
    match generic {
        GenericNodeType::OutputNode => "Material",
        _ => "Shader",
    }
}

/// Shader `info:id` for a generic node on a target renderer.
pub fn usd_info_id(generic: GenericNodeType, renderer: Renderer) -> Option<&'static str> {
    use GenericNodeType::*;
    use Renderer::*;

    match (generic, renderer) {
        (StandardSurface | Null, Arnold) => Some("arnold:standard_surface"),
        (StandardSurface | Null, Mtlx) => Some("ND_standard_surface_surfaceshader"),
        (StandardSurface, UsdPreview) => Some("UsdPreviewSurface"),
        (StandardSurface | Null, Redshift) => Some("redshift::StandardMaterial"),

        (Image, Arnold) => Some("arnold:image"),
        (Image, Mtlx) => Some("ND_image_color3"),
        (Image, UsdPreview) => Some("UsdUVTexture"),
        (Image, Redshift) => Some("redshift::TextureSampler"),

        (Range, Arnold) => Some("arnold:range"),
        (Range, Mtlx) => Some("ND_range_color3"),
        (Range, Redshift) => Some("redshift::RSColorRange"),

        (ColorCorrect, Arnold) => Some("arnold:color_correct"),
        (ColorCorrect, Mtlx) => Some("ND_colorcorrect_color3"),
        (ColorCorrect, Redshift) => Some("redshift::RSColorCorrection"),

        (Curvature, Arnold) => Some("arnold:curvature"),
        (MixRgba, Arnold) => Some("arnold:mix_rgba"),
        (MixLayer, Arnold) => Some("arnold:mix_layer"),
        (LayerRgba, Arnold) => Some("arnold:layer_rgba"),
        (RampRgb, Arnold) => Some("arnold:ramp_rgb::2"),
        (RampFloat, Arnold) => Some("arnold:ramp_float::2"),

        (Displacement, Arnold) => Some("arnold:bump2d"),
        (Displacement, Mtlx) => Some("ND_bump_vector3"),
        (Displacement, Redshift) => Some("redshift::Displacement"),

        _ => None,
    }
}

/// How a material terminal is wired on USD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TerminalSpec {
    /// Output name on the `Material` prim (without `outputs:`).
    pub material_output: &'static str,
    /// Output name on the shader that drives it.
    pub shader_output: &'static str,
}

/// Material terminal for a renderer and output kind.
pub fn usd_terminal(renderer: Renderer, kind: OutputKind) -> Option<TerminalSpec> {
    let spec = |material_output, shader_output| {
        Some(TerminalSpec {
            material_output,
            shader_output,
        })
    };
    match (renderer, kind) {
        (Renderer::Arnold, OutputKind::Surface) => spec("arnold:surface", "surface"),
        (Renderer::Arnold, OutputKind::Displacement) => spec("arnold:displacement", "out"),
        (Renderer::Mtlx, OutputKind::Surface) => spec("mtlx:surface", "out"),
        (Renderer::Mtlx, OutputKind::Displacement) => spec("mtlx:displacement", "out"),
        (Renderer::Redshift, OutputKind::Surface) => spec("redshift:surface", "outColor"),
        (Renderer::Redshift, OutputKind::Displacement) => spec("redshift:displacement", "out"),
        (Renderer::UsdPreview, OutputKind::Surface) => spec("surface", "surface"),
        (Renderer::UsdPreview, OutputKind::Displacement) => spec("displacement", "displacement"),
        (Renderer::PrincipledShader, _) => None,
    }
}

/// Renderer and kind of a material output name (`outputs:` already stripped).
pub fn terminal_from_output(name: &str) -> Option<(Renderer, OutputKind)> {
    let (renderer, kind) = match name.split_once(':') {
        Some(("arnold", kind)) => (Renderer::Arnold, kind),
        Some(("mtlx", kind)) => (Renderer::Mtlx, kind),
        Some(("redshift", kind)) => (Renderer::Redshift, kind),
        Some(_) => return None,
        None => (Renderer::UsdPreview, name),
    };
    let kind = match kind {
        "surface" => OutputKind::Surface,
        "displacement" => OutputKind::Displacement,
        _ => return None,
    };
    Some((renderer, kind))
}

/// Type of the output node inside a VOP builder.
pub fn vop_output_node_type(renderer: Renderer) -> Option<&'static str> {
    match renderer {
        Renderer::Arnold => Some("arnold_material"),
        Renderer::Mtlx => Some("subnetconnector"),
        Renderer::Redshift => Some("redshift_material"),
        Renderer::PrincipledShader | Renderer::UsdPreview => None,
    }
}

/// Input index on the VOP output node for an output kind.
pub fn vop_output_index(renderer: Renderer, kind: OutputKind) -> Option<u32> {
    match (renderer, kind) {
        (Renderer::Arnold | Renderer::Redshift, OutputKind::Surface) => Some(0),
        (Renderer::Arnold | Renderer::Redshift, OutputKind::Displacement) => Some(1),
        (Renderer::Mtlx, _) => Some(0),
        _ => None,
    }
}
