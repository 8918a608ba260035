//! Parameter name tables, keyed by renderer node type.
//!
//! Keys use single colons: `arnold::image` and the USD id `arnold:image`
//! share one table. Names missing from a table are not carried over.

type ParamTable = &'static [(&'static str, &'static str)];

const MTLX_STANDARD_SURFACE: ParamTable = &[
    ("base", "base"),
    ("base_color", "base_color"),
    ("diffuse_roughness", "diffuse_roughness"),
    ("metalness", "metalness"),
    ("specular", "specular"),
    ("specular_color", "specular_color"),
    ("specular_roughness", "specular_roughness"),
    ("specular_IOR", "specular_IOR"),
    ("specular_anisotropy", "specular_anisotropy"),
    ("specular_rotation", "specular_rotation"),
    ("coat", "coat"),
    ("coat_color", "coat_color"),
    ("coat_roughness", "coat_roughness"),
    ("transmission", "transmission"),
    ("transmission_color", "transmission_color"),
    ("transmission_extra_roughness", "transmission_extra_roughness"),
    ("subsurface", "subsurface"),
    ("subsurface_color", "subsurface_color"),
    ("emission", "emission"),
    ("emission_color", "emission_color"),
    ("opacity", "opacity"),
    ("normal", "normal"),
    ("thin_walled", "thin_walled"),
    ("out", "surface"),
];

const MTLX_IMAGE: ParamTable = &[("signature", "signature"), ("file", "filename"), ("out", "rgb")];

const MTLX_COLOR_CORRECT: ParamTable = &[
    ("hue", "hue"),
    ("saturation", "saturation"),
    ("gamma", "gamma"),
    ("lift", "lift"),
    ("gain", "gain"),
    ("contrast", "contrast"),
    ("contrastpivot", "contrastpivot"),
    ("exposure", "exposure"),
    ("in", "in"),
    ("out", "rgb"),
];

const MTLX_RANGE: ParamTable = &[
    ("in", "in"),
    ("inlow", "inlow"),
    ("inhigh", "inhigh"),
    ("gamma", "gamma"),
    ("outlow", "outlow"),
    ("outhigh", "outhigh"),
    ("out", "rgb"),
];

const MTLX_MIX: ParamTable = &[
    ("signature", "signature"),
    ("fg_color3r", "fg_color3r"),
    ("fg_color3g", "fg_color3g"),
    ("fg_color3b", "fg_color3b"),
    ("bg_color3r", "bg_color3r"),
    ("bg_color3g", "bg_color3g"),
    ("bg_color3b", "bg_color3b"),
    ("mix", "mix"),
    ("out", "rgb"),
];

const MTLX_DISPLACEMENT: ParamTable = &[
    ("displacement", "displacement"),
    ("scale", "scale"),
    ("out", "displacement"),
];

const ND_STANDARD_SURFACE: ParamTable = &[
    ("base", "base"),
    ("base_color", "base_color"),
    ("diffuse_roughness", "diffuse_roughness"),
    ("metalness", "metalness"),
    ("specular", "specular"),
    ("specular_color", "specular_color"),
    ("specular_roughness", "specular_roughness"),
    ("specular_IOR", "specular_IOR"),
    ("specular_anisotropy", "specular_anisotropy"),
    ("specular_rotation", "specular_rotation"),
    ("coat", "coat"),
    ("coat_color", "coat_color"),
    ("coat_roughness", "coat_roughness"),
    ("transmission", "transmission"),
    ("transmission_color", "transmission_color"),
    ("transmission_extra_roughness", "transmission_extra_roughness"),
    ("subsurface", "subsurface"),
    ("subsurface_color", "subsurface_color"),
    ("emission", "emission"),
    ("emission_color", "emission_color"),
    ("opacity", "opacity"),
    ("normal", "normal"),
    ("thin_walled", "thin_walled"),
    ("out", "surface"),
];

const ND_IMAGE: ParamTable = &[("signature", "signature"), ("file", "filename"), ("out", "rgb")];

const ND_RANGE: ParamTable = &[
    ("in", "in"),
    ("inlow", "inlow"),
    ("inhigh", "inhigh"),
    ("gamma", "gamma"),
    ("outhigh", "outhigh"),
    ("outlow", "outlow"),
    ("out", "rgb"),
];

const ND_COLOR_CORRECT: ParamTable = &[
    ("contrast", "contrast"),
    ("contrastpivot", "contrastpivot"),
    ("exposure", "exposure"),
    ("gain", "gain"),
    ("gamma", "gamma"),
    ("hue", "hue"),
    ("in", "in"),
    ("lift", "lift"),
    ("saturation", "saturation"),
    ("out", "rgb"),
];

const ND_DISPLACEMENT: ParamTable = &[
    ("displacement", "displacement"),
    ("scale", "scale"),
    ("out", "displacement"),
];

const REDSHIFT_STANDARD_MATERIAL: ParamTable = &[
    ("base_color_weight", "base"),
    ("base_color", "base_color"),
    ("diffuse_roughness", "diffuse_roughness"),
    ("metalness", "metalness"),
    ("refl_weight", "specular"),
    ("refl_color", "specular_color"),
    ("refl_roughness", "specular_roughness"),
    ("refl_ior", "specular_IOR"),
    ("refl_aniso", "specular_anisotropy"),
    ("refl_aniso_rotation", "specular_rotation"),
    ("coat_weight", "coat"),
    ("coat_color", "coat_color"),
    ("coat_roughness", "coat_roughness"),
    ("refr_weight", "transmission"),
    ("refr_color", "transmission_color"),
    ("refr_roughness", "transmission_extra_roughness"),
    ("ms_amount", "subsurface"),
    ("ms_color", "subsurface_color"),
    ("emission_weight", "emission"),
    ("emission_color", "emission_color"),
    ("opacity_color", "opacity"),
    ("refr_thin_walled", "thin_walled"),
    ("outColor", "shader"),
];

const REDSHIFT_TEXTURE_SAMPLER: ParamTable = &[("tex0", "filename"), ("outColor", "rgb")];

const REDSHIFT_RANGE: ParamTable = &[
    ("in", "in"),
    ("inlow", "inlow"),
    ("inhigh", "inhigh"),
    ("gamma", "gamma"),
    ("outhigh", "outhigh"),
    ("outlow", "outlow"),
    ("outColor", "rgb"),
];

const REDSHIFT_COLOR_CORRECTION: ParamTable = &[
    ("contrast", "contrast"),
    ("contrastpivot", "contrastpivot"),
    ("exposure", "exposure"),
    ("gain", "gain"),
    ("gamma", "gamma"),
    ("hue", "hue"),
    ("in", "in"),
    ("lift", "lift"),
    ("saturation", "saturation"),
    ("outColor", "rgb"),
];

const REDSHIFT_DISPLACEMENT: ParamTable = &[
    ("texMap", "filename"),
    ("scale", "scale"),
    ("outColor", "rgb"),
];

const ARNOLD_STANDARD_SURFACE: ParamTable = &[
    ("base", "base"),
    ("base_color", "base_color"),
    ("diffuse_roughness", "diffuse_roughness"),
    ("metalness", "metalness"),
    ("specular", "specular"),
    ("specular_color", "specular_color"),
    ("specular_roughness", "specular_roughness"),
    ("specular_IOR", "specular_IOR"),
    ("specular_anisotropy", "specular_anisotropy"),
    ("specular_rotation", "specular_rotation"),
    ("transmission", "transmission"),
    ("transmission_color", "transmission_color"),
    ("transmission_extra_roughness", "transmission_extra_roughness"),
    ("coat", "coat"),
    ("coat_color", "coat_color"),
    ("coat_roughness", "coat_roughness"),
    ("subsurface", "subsurface"),
    ("subsurface_color", "subsurface_color"),
    ("emission", "emission"),
    ("emission_color", "emission_color"),
    ("opacity", "opacity"),
    ("normal", "normal"),
    ("thin_walled", "thin_walled"),
    ("shader", "shader"),
];

const ARNOLD_IMAGE: ParamTable = &[
    ("filename", "filename"),
    ("rgba", "rgba"),
    ("r", "r"),
    ("g", "g"),
    ("b", "b"),
    ("a", "a"),
];

const ARNOLD_COLOR_CORRECT: ParamTable = &[
    ("input", "in"),
    ("gamma", "gamma"),
    ("hue_shift", "hue"),
    ("saturation", "saturation"),
    ("contrast", "contrast"),
    ("contrast_pivot", "contrastpivot"),
    ("exposure", "exposure"),
    ("multiply", "multiply"),
    ("add", "add"),
    ("rgba", "rgba"),
];

const ARNOLD_RANGE: ParamTable = &[
    ("input", "in"),
    ("input_min", "inlow"),
    ("input_max", "inhigh"),
    ("output_min", "outlow"),
    ("output_max", "outhigh"),
    ("contrast", "contrast"),
    ("contrast_pivot", "contrastpivot"),
    ("bias", "bias"),
    ("gain", "gain"),
    ("rgb", "rgb"),
    ("r", "r"),
    ("g", "g"),
    ("b", "b"),
];

const ARNOLD_MIX_RGBA: ParamTable = &[
    ("input1r", "fg_color3r"),
    ("input1g", "fg_color3g"),
    ("input1b", "fg_color3b"),
    ("input2r", "bg_color3r"),
    ("input2g", "bg_color3g"),
    ("input2b", "bg_color3b"),
    ("mix", "mix"),
    ("rgba", "rgba"),
];

const ARNOLD_CURVATURE: ParamTable = &[
    ("radius", "radius"),
    ("spread", "spread"),
    ("threshold", "threshold"),
    ("bias", "bias"),
    ("rgb", "rgb"),
];

const PRINCIPLED: ParamTable = &[
    ("basecolor", "base_color"),
    ("metallic", "metalness"),
    ("rough", "specular_roughness"),
    ("ior", "specular_IOR"),
    ("reflect", "specular"),
    ("difftrans", "transmission"),
    ("emission", "emission"),
    ("opaccolor", "opacity"),
    ("subsurface", "subsurface"),
    ("subtint", "subsurface_color"),
    ("basecolorr", "base_colorr"),
    ("basecolorg", "base_colorg"),
    ("basecolorb", "base_colorb"),
    ("sheen", "sheen"),
    ("sheencolor", "sheen_color"),
    ("coat", "coat"),
    ("coatrough", "coat_roughness"),
    ("coatior", "coat_IOR"),
    ("coatcolor", "coat_color"),
];

const USD_PREVIEW_SURFACE: ParamTable = &[
    ("diffuseColor", "base_color"),
    ("metallic", "metalness"),
    ("roughness", "specular_roughness"),
    ("ior", "specular_IOR"),
    ("opacity", "opacity"),
    ("emissiveColor", "emission_color"),
    ("clearcoat", "coat"),
    ("clearcoatRoughness", "coat_roughness"),
    ("normal", "normal"),
    ("surface", "surface"),
];

const USD_UV_TEXTURE: ParamTable = &[
    ("file", "filename"),
    ("rgb", "rgb"),
    ("r", "r"),
    ("g", "g"),
    ("b", "b"),
    ("a", "a"),
];

const TABLES: &[(&str, ParamTable)] = &[
    ("mtlxstandard_surface", MTLX_STANDARD_SURFACE),
    ("mtlximage", MTLX_IMAGE),
    ("mtlxcolorcorrect", MTLX_COLOR_CORRECT),
    ("mtlxrange", MTLX_RANGE),
    ("mtlxmix", MTLX_MIX),
    ("mtlxdisplacement", MTLX_DISPLACEMENT),
    ("ND_standard_surface_surfaceshader", ND_STANDARD_SURFACE),
    ("ND_image_float", ND_IMAGE),
    ("ND_image_color3", ND_IMAGE),
    ("ND_range_float", ND_RANGE),
    ("ND_range_color3", ND_RANGE),
    ("ND_colorcorrect_color3", ND_COLOR_CORRECT),
    ("ND_displacement_float", ND_DISPLACEMENT),
    ("redshift:StandardMaterial", REDSHIFT_STANDARD_MATERIAL),
    ("redshift:TextureSampler", REDSHIFT_TEXTURE_SAMPLER),
    ("redshift:RSMathRange", REDSHIFT_RANGE),
    ("redshift:RSColorRange", REDSHIFT_RANGE),
    ("redshift:RSColorCorrection", REDSHIFT_COLOR_CORRECTION),
    ("redshift:Displacement", REDSHIFT_DISPLACEMENT),
    ("arnold:standard_surface", ARNOLD_STANDARD_SURFACE),
    ("arnold:image", ARNOLD_IMAGE),
    ("arnold:color_correct", ARNOLD_COLOR_CORRECT),
    ("arnold:range", ARNOLD_RANGE),
    ("arnold:mix_rgba", ARNOLD_MIX_RGBA),
    ("arnold:curvature", ARNOLD_CURVATURE),
    ("principledshader:2.0", PRINCIPLED),
    ("UsdPreviewSurface", USD_PREVIEW_SURFACE),
    ("usdpreviewsurface", USD_PREVIEW_SURFACE),
    ("UsdUVTexture", USD_UV_TEXTURE),
    ("usduvtexture:2.0", USD_UV_TEXTURE),
];

/// Collapse `::` to `:` so VOP type names and USD ids share keys.
pub fn normalize_node_type(node_type: &str) -> String {
    node_type.replace("::", ":")
}

/// Parameter table for a renderer node type.
pub fn param_table(node_type: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let key = normalize_node_type(node_type);
    TABLES.iter().find(|(k, _)| *k == key).map(|(_, t)| *t)
}

/// Generic name of a renderer parameter.
pub fn to_generic_param(node_type: &str, name: &str) -> Option<&'static str> {
    param_table(node_type)?
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, g)| *g)
}

/// First renderer parameter name for a generic name.
///
/// `rgb` and `rgba` outputs stand in for each other when the node only has
/// one of them.
pub fn from_generic_param(node_type: &str, generic: &str) -> Option<&'static str> {
    let table = param_table(node_type)?;
    let lookup = |g: &str| table.iter().find(|(_, v)| *v == g).map(|(k, _)| *k);
    lookup(generic).or_else(|| match generic {
        "rgba" => lookup("rgb"),
        "rgb" => lookup("rgba"),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_keys() {
        assert!(param_table("arnold::image").is_some());
        assert!(param_table("arnold:image").is_some());
        assert!(param_table("redshift::StandardMaterial").is_some());
        assert!(param_table("arnold::ramp_rgb::2").is_none());
    }

    #[test]
    fn test_hue_roundtrip() {
        let generic = to_generic_param("arnold::color_correct", "hue_shift").unwrap();
        assert_eq!(generic, "hue");
        assert_eq!(from_generic_param("mtlxcolorcorrect", generic), Some("hue"));
        assert_eq!(from_generic_param("arnold::color_correct", generic), Some("hue_shift"));
    }

    #[test]
    fn test_reverse_takes_first() {
        // both ids of one table resolve `filename` to `file`
        assert_eq!(from_generic_param("ND_image_color3", "filename"), Some("file"));
        assert_eq!(from_generic_param("redshift::TextureSampler", "filename"), Some("tex0"));
    }

    #[test]
    fn test_rgb_rgba_fallback() {
        assert_eq!(from_generic_param("mtlximage", "rgba"), Some("out"));
        assert_eq!(from_generic_param("arnold::image", "rgb"), Some("rgba"));
        assert_eq!(from_generic_param("mtlximage", "vector"), None);
    }
}
