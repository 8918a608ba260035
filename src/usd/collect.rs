//! Collect materials built from a texture set.
//!
//! A collect material `mat_<name>_collect` holds one shading network per
//! enabled renderer, all driven by the same textures: a nested UsdPreview
//! material, an Arnold `standard_surface` network and a MaterialX
//! `standard_surface` network. Each network gets its shader defaults, the
//! per-slot colour-correct / range / normal-map wiring and, for glass-like
//! names, transmission.

use tracing::{debug, info, warn};

use super::stage::{join_path, sanitize_name, Attribute, Stage, UsdValue};
use crate::material::{MaterialData, OutputKind, TextureSlot};
use crate::taxonomy::usd::usd_terminal;
use crate::taxonomy::Renderer;
use crate::util::Result;

/// What to build into a collect material.
#[derive(Clone, Debug, PartialEq)]
pub struct CollectOptions {
    pub preview: bool,
    /// Replace texture extensions in the preview network (e.g. `png`).
    pub preview_format: Option<String>,
    pub arnold: bool,
    pub mtlx: bool,
    /// Lowercase name fragments that mark a material as transmissive.
    pub transmissive_keywords: Vec<String>,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            preview: true,
            preview_format: None,
            arnold: true,
            mtlx: false,
            transmissive_keywords: vec!["glass".to_string(), "glas".to_string()],
        }
    }
}

/// Whether a material name contains one of the keywords, ignoring case.
pub fn is_transmissive(material_name: &str, keywords: &[String]) -> bool {
    let name = material_name.to_lowercase();
    keywords.iter().any(|k| name.contains(&k.to_lowercase()))
}

/// Swap the extension of the file name in `path`.
pub fn swap_extension(path: &str, extension: &str) -> String {
    let file_start = path.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) => format!("{}.{}", &path[..file_start + dot], extension.trim_start_matches('.')),
        None => path.to_string(),
    }
}

// ============================================================================
// Shader defaults
// ============================================================================

#[derive(Clone, Copy, Debug)]
enum Lit {
    Float(f64),
    Int(i64),
    Bool(bool),
    Str(&'static str),
    Vec(&'static [f64]),
}

impl From<Lit> for UsdValue {
    fn from(lit: Lit) -> Self {
        match lit {
            Lit::Float(v) => UsdValue::Float(v),
            Lit::Int(v) => UsdValue::Int(v),
            Lit::Bool(v) => UsdValue::Bool(v),
            Lit::Str(v) => UsdValue::String(v.to_string()),
            Lit::Vec(v) => UsdValue::Tuple(v.iter().map(|f| UsdValue::Float(*f)).collect()),
        }
    }
}

type Defaults = &'static [(&'static str, &'static str, Lit)];

const ZERO3: Lit = Lit::Vec(&[0.0, 0.0, 0.0]);
const ONE3: Lit = Lit::Vec(&[1.0, 1.0, 1.0]);

const ARNOLD_STANDARD_SURFACE: Defaults = &[
    ("aov_id1", "float3", ZERO3),
    ("aov_id2", "float3", ZERO3),
    ("aov_id3", "float3", ZERO3),
    ("aov_id4", "float3", ZERO3),
    ("aov_id5", "float3", ZERO3),
    ("aov_id6", "float3", ZERO3),
    ("aov_id7", "float3", ZERO3),
    ("aov_id8", "float3", ZERO3),
    ("base", "float", Lit::Float(1.0)),
    ("base_color", "color3f", Lit::Vec(&[0.8, 0.8, 0.8])),
    ("metalness", "float", Lit::Float(0.0)),
    ("specular", "float", Lit::Float(1.0)),
    ("specular_color", "color3f", ONE3),
    ("specular_roughness", "float", Lit::Float(0.2)),
    ("specular_IOR", "float", Lit::Float(1.5)),
    ("specular_anisotropy", "float", Lit::Float(0.0)),
    ("specular_rotation", "float", Lit::Float(0.0)),
    ("caustics", "bool", Lit::Bool(false)),
    ("coat", "float", Lit::Float(0.0)),
    ("coat_color", "color3f", ONE3),
    ("coat_roughness", "float", Lit::Float(0.1)),
    ("coat_IOR", "float", Lit::Float(1.5)),
    ("coat_normal", "vector3f", ZERO3),
    ("coat_affect_color", "float", Lit::Float(0.0)),
    ("coat_affect_roughness", "float", Lit::Float(0.0)),
    ("indirect_diffuse", "float", Lit::Float(1.0)),
    ("indirect_specular", "float", Lit::Float(1.0)),
    ("indirect_reflections", "bool", Lit::Bool(true)),
    ("subsurface", "float", Lit::Float(0.0)),
    ("subsurface_anisotropy", "float", Lit::Float(0.0)),
    ("subsurface_color", "color3f", ONE3),
    ("subsurface_radius", "color3f", ONE3),
    ("subsurface_scale", "float", Lit::Float(1.0)),
    ("subsurface_type", "string", Lit::Str("randomwalk")),
    ("emission", "float", Lit::Float(0.0)),
    ("emission_color", "color3f", ONE3),
    ("normal", "vector3f", ZERO3),
    ("opacity", "color3f", ONE3),
    ("sheen", "float", Lit::Float(0.0)),
    ("sheen_color", "color3f", ONE3),
    ("sheen_roughness", "float", Lit::Float(0.3)),
    ("internal_reflections", "bool", Lit::Bool(true)),
    ("exit_to_background", "bool", Lit::Bool(false)),
    ("tangent", "vector3f", ZERO3),
    ("transmission", "float", Lit::Float(0.0)),
    ("transmission_color", "color3f", ONE3),
    ("transmission_depth", "float", Lit::Float(0.0)),
    ("transmission_scatter", "color3f", ZERO3),
    ("transmission_scatter_anisotropy", "float", Lit::Float(0.0)),
    ("transmission_dispersion", "float", Lit::Float(0.0)),
    ("transmission_extra_roughness", "float", Lit::Float(0.0)),
    ("thin_film_IOR", "float", Lit::Float(1.5)),
    ("thin_film_thickness", "float", Lit::Float(0.0)),
    ("thin_walled", "bool", Lit::Bool(false)),
    ("transmit_aovs", "bool", Lit::Bool(false)),
];

const ARNOLD_IMAGE: Defaults = &[
    ("color_space", "string", Lit::Str("auto")),
    ("filter", "string", Lit::Str("smart_bicubic")),
    ("ignore_missing_textures", "bool", Lit::Bool(false)),
    ("mipmap_bias", "int", Lit::Int(0)),
    ("missing_texture_color", "float4", Lit::Vec(&[0.0, 0.0, 0.0, 0.0])),
    ("multiply", "color3f", ONE3),
    ("offset", "color3f", ZERO3),
    ("sflip", "bool", Lit::Bool(false)),
    ("single_channel", "bool", Lit::Bool(false)),
    ("soffset", "float", Lit::Float(0.0)),
    ("sscale", "float", Lit::Float(1.0)),
    ("start_channel", "int", Lit::Int(0)),
    ("swap_st", "bool", Lit::Bool(false)),
    ("swrap", "string", Lit::Str("periodic")),
    ("tflip", "bool", Lit::Bool(false)),
    ("toffset", "float", Lit::Float(0.0)),
    ("tscale", "float", Lit::Float(1.0)),
    ("twrap", "string", Lit::Str("periodic")),
    ("uvcoords", "float2", Lit::Vec(&[0.0, 0.0])),
    ("uvset", "string", Lit::Str("")),
];

const ARNOLD_COLOR_CORRECT: Defaults = &[
    ("add", "color3f", ZERO3),
    ("contrast", "float", Lit::Float(1.0)),
    ("exposure", "float", Lit::Float(0.0)),
    ("gamma", "float", Lit::Float(1.0)),
    ("hue_shift", "float", Lit::Float(0.0)),
];

const ARNOLD_RANGE: Defaults = &[
    ("bias", "float", Lit::Float(0.5)),
    ("contrast", "float", Lit::Float(1.0)),
    ("contrast_pivot", "float", Lit::Float(0.5)),
    ("gain", "float", Lit::Float(0.5)),
    ("input_min", "float", Lit::Float(0.0)),
    ("input_max", "float", Lit::Float(1.0)),
    ("output_min", "float", Lit::Float(0.0)),
    ("output_max", "float", Lit::Float(1.0)),
    ("smoothstep", "bool", Lit::Bool(false)),
];

const ARNOLD_NORMAL_MAP: Defaults = &[
    ("color_to_signed", "bool", Lit::Bool(true)),
    ("invert_x", "bool", Lit::Bool(false)),
    ("invert_y", "bool", Lit::Bool(false)),
    ("invert_z", "bool", Lit::Bool(false)),
    ("normal", "vector3f", ZERO3),
    ("order", "string", Lit::Str("XYZ")),
    ("strength", "float", Lit::Float(1.0)),
    ("tangent", "vector3f", ZERO3),
    ("tangent_space", "bool", Lit::Bool(true)),
];

const ARNOLD_BUMP2D: Defaults = &[
    ("bump_height", "float", Lit::Float(1.0)),
    ("bump_map", "float", Lit::Float(0.0)),
    ("normal", "vector3f", ZERO3),
];

const MTLX_STANDARD_SURFACE: Defaults = &[
    ("base", "float", Lit::Float(1.0)),
    ("base_color", "color3f", Lit::Vec(&[0.8, 0.8, 0.8])),
    ("coat", "float", Lit::Float(0.0)),
    ("coat_roughness", "float", Lit::Float(0.1)),
    ("emission", "float", Lit::Float(0.0)),
    ("emission_color", "color3f", ONE3),
    ("metalness", "float", Lit::Float(0.0)),
    ("specular", "float", Lit::Float(1.0)),
    ("specular_color", "color3f", ONE3),
    ("specular_IOR", "float", Lit::Float(1.5)),
    ("specular_roughness", "float", Lit::Float(0.2)),
    ("transmission", "float", Lit::Float(0.0)),
    ("thin_walled", "int", Lit::Int(0)),
    ("opacity", "color3f", ONE3),
];

const TRANSMISSION: f64 = 0.9;

// ============================================================================
// Builder
// ============================================================================

/// Writes one collect material onto a stage.
pub struct CollectMaterialBuilder<'a> {
    stage: &'a mut Stage,
    material: &'a MaterialData,
    options: &'a CollectOptions,
    transmissive: bool,
}

impl<'a> CollectMaterialBuilder<'a> {
    pub fn new(stage: &'a mut Stage, material: &'a MaterialData, options: &'a CollectOptions) -> Self {
        let transmissive = is_transmissive(&material.material_name, &options.transmissive_keywords);
        if transmissive {
            debug!("detected transmissive material '{}'", material.material_name);
        }
        Self {
            stage,
            material,
            options,
            transmissive,
        }
    }

    /// Path of the collect material under `parent`.
    pub fn collect_path(&self, parent: &str) -> String {
        join_path(parent, &format!("mat_{}_collect", sanitize_name(&self.material.material_name)))
    }

    /// Build the collect material under `parent_scope` and return its path.
    #[tracing::instrument(skip_all, fields(material = %self.material.material_name))]
    pub fn run(mut self, parent_scope: &str) -> Result<String> {
        if !self.stage.has_prim(parent_scope) {
            self.stage.define_prim(parent_scope, Some("Scope"))?;
        }
        let collect = self.collect_path(parent_scope);
        self.stage.define_prim(&collect, Some("Material"))?;
        self.set_input(&collect, "inputnum", "int", UsdValue::Int(2))?;

        if self.options.preview {
            self.create_preview(&collect)?;
        }
        if self.options.arnold {
            self.create_arnold(&collect)?;
        }
        if self.options.mtlx {
            self.create_mtlx(&collect)?;
        }
        info!("created collect material {}", collect);
        Ok(collect)
    }

    // ------------------------------------------------------------------------
    // UsdPreview
    // ------------------------------------------------------------------------

    fn create_preview(&mut self, collect: &str) -> Result<()> {
        let preview = join_path(collect, "UsdPreviewMaterial");
        let graph = join_path(&preview, "UsdPreviewNodeGraph");
        let surface = join_path(&graph, "UsdPreviewSurface");
        self.stage.define_prim(&preview, Some("Material"))?;
        self.stage.define_prim(&graph, Some("NodeGraph"))?;
        self.shader(&surface, "UsdPreviewSurface")?;
        self.terminal(&preview, Renderer::UsdPreview, &surface)?;
        self.terminal(collect, Renderer::UsdPreview, &surface)?;

        let reader = join_path(&graph, "TexCoordReader");
        let mut reader_created = false;

        let material = self.material;
        for (slot, texture) in &material.textures {
            let (input, type_name, channel) = preview_input(*slot);
            if !reader_created {
                self.shader(&reader, "UsdPrimvarReader_float2")?;
                self.set_input(&reader, "varname", "token", UsdValue::Token("st".into()))?;
                reader_created = true;
            }

            let file = match &self.options.preview_format {
                Some(format) => swap_extension(&texture.file_path, format),
                None => texture.file_path.clone(),
            };
            let tex = join_path(&graph, &format!("{}Texture", slot.token()));
            self.shader(&tex, "UsdUVTexture")?;
            self.set_input(&tex, "file", "asset", UsdValue::Asset(file))?;
            self.set_input(&tex, "wrapS", "token", UsdValue::Token("repeat".into()))?;
            self.set_input(&tex, "wrapT", "token", UsdValue::Token("repeat".into()))?;
            self.connect(&tex, "st", "float2", &reader, "result")?;
            self.connect(&surface, input, type_name, &tex, channel)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Arnold
    // ------------------------------------------------------------------------

    fn create_arnold(&mut self, collect: &str) -> Result<()> {
        let surface = join_path(collect, "arnold_standard_surface1");
        self.shader(&surface, "arnold:standard_surface")?;
        self.set_defaults(&surface, ARNOLD_STANDARD_SURFACE)?;
        self.terminal(collect, Renderer::Arnold, &surface)?;

        let mut bump2d: Option<String> = None;
        let material = self.material;
        for (slot, texture) in &material.textures {
            let slot = *slot;
            let token = slot.token();
            match slot {
                TextureSlot::Occlusion => {
                    warn!("texture type '{}' not supported yet for arnold", token);
                    continue;
                }
                TextureSlot::Metalness if self.transmissive => {
                    debug!("skipping metalness on transmissive material");
                    continue;
                }
                _ => {}
            }

            let tex = join_path(collect, &format!("arnold_{}Texture", token));
            self.shader(&tex, "arnold:image")?;
            self.set_defaults(&tex, ARNOLD_IMAGE)?;
            self.set_input(&tex, "filename", "asset", UsdValue::Asset(texture.file_path.clone()))?;

            match slot {
                TextureSlot::BaseColor => {
                    let cc = join_path(collect, &format!("arnold_{}ColorCorrect", token));
                    self.shader(&cc, "arnold:color_correct")?;
                    self.set_defaults(&cc, ARNOLD_COLOR_CORRECT)?;
                    self.connect(&cc, "input", "color4f", &tex, "rgba")?;
                    self.connect(&surface, "base_color", "color3f", &cc, "rgb")?;
                }
                TextureSlot::Metalness | TextureSlot::Roughness => {
                    let range = self.arnold_range(collect, token, &tex)?;
                    let input = if slot == TextureSlot::Metalness { "metalness" } else { "specular_roughness" };
                    self.connect(&surface, input, "float", &range, "r")?;
                }
                TextureSlot::Height => {
                    let range = self.arnold_range(collect, token, &tex)?;
                    let bump = self.arnold_bump2d(collect, &mut bump2d)?;
                    self.connect(&bump, "bump_map", "float", &range, "r")?;
                }
                TextureSlot::Normal => {
                    let normal_map = join_path(collect, "arnold_NormalMap");
                    self.shader(&normal_map, "arnold:normal_map")?;
                    self.set_defaults(&normal_map, ARNOLD_NORMAL_MAP)?;
                    self.connect(&normal_map, "input", "vector3f", &tex, "vector")?;
                    let bump = self.arnold_bump2d(collect, &mut bump2d)?;
                    self.connect(&bump, "normal", "vector3f", &normal_map, "vector")?;
                }
                TextureSlot::Opacity => {
                    self.connect(&surface, "opacity", "color3f", &tex, "rgb")?;
                }
                TextureSlot::Occlusion => {}
            }
        }

        if let Some(bump) = bump2d {
            self.connect(&surface, "normal", "vector3f", &bump, "vector")?;
        }
        if self.transmissive {
            self.set_input(&surface, "transmission", "float", UsdValue::Float(TRANSMISSION))?;
            self.set_input(&surface, "thin_walled", "bool", UsdValue::Bool(true))?;
        }
        Ok(())
    }

    fn arnold_range(&mut self, collect: &str, token: &str, tex: &str) -> Result<String> {
        let range = join_path(collect, &format!("arnold_{}Range", token));
        self.shader(&range, "arnold:range")?;
        self.set_defaults(&range, ARNOLD_RANGE)?;
        self.connect(&range, "input", "color4f", tex, "rgba")?;
        Ok(range)
    }

    fn arnold_bump2d(&mut self, collect: &str, bump2d: &mut Option<String>) -> Result<String> {
        if let Some(path) = bump2d {
            return Ok(path.clone());
        }
        let path = join_path(collect, "arnold_Bump2d");
        self.shader(&path, "arnold:bump2d")?;
        self.set_defaults(&path, ARNOLD_BUMP2D)?;
        *bump2d = Some(path.clone());
        Ok(path)
    }

    // ------------------------------------------------------------------------
    // MaterialX
    // ------------------------------------------------------------------------

    fn create_mtlx(&mut self, collect: &str) -> Result<()> {
        let surface = join_path(collect, "mtlx_mtlxstandard_surface1");
        self.shader(&surface, "ND_standard_surface_surfaceshader")?;
        self.set_defaults(&surface, MTLX_STANDARD_SURFACE)?;
        self.terminal(collect, Renderer::Mtlx, &surface)?;

        let material = self.material;
        for (slot, texture) in &material.textures {
            let slot = *slot;
            let token = slot.token();
            let signature = match slot {
                TextureSlot::BaseColor | TextureSlot::Opacity => "color3",
                TextureSlot::Normal => "vector3",
                TextureSlot::Metalness if self.transmissive => {
                    debug!("skipping metalness on transmissive material");
                    continue;
                }
                TextureSlot::Metalness | TextureSlot::Roughness => "float",
                TextureSlot::Height | TextureSlot::Occlusion => {
                    warn!("texture type '{}' not supported yet for mtlx", token);
                    continue;
                }
            };

            let tex = join_path(collect, &format!("mtlx_{}Texture", token));
            self.shader(&tex, &format!("ND_image_{}", signature))?;
            self.set_input(&tex, "file", "asset", UsdValue::Asset(texture.file_path.clone()))?;

            match slot {
                TextureSlot::BaseColor => {
                    let cc = join_path(collect, &format!("mtlx_{}ColorCorrect", token));
                    self.shader(&cc, "ND_colorcorrect_color3")?;
                    self.connect(&cc, "in", "color3f", &tex, "out")?;
                    self.connect(&surface, "base_color", "color3f", &cc, "out")?;
                }
                TextureSlot::Metalness | TextureSlot::Roughness => {
                    let range = join_path(collect, &format!("mtlx_{}Range", token));
                    self.shader(&range, "ND_range_float")?;
                    self.connect(&range, "in", "float", &tex, "out")?;
                    let input = if slot == TextureSlot::Metalness { "metalness" } else { "specular_roughness" };
                    self.connect(&surface, input, "float", &range, "out")?;
                }
                TextureSlot::Normal => {
                    let normal_map = join_path(collect, "mtlx_NormalMap");
                    self.shader(&normal_map, "ND_normalmap")?;
                    self.connect(&normal_map, "in", "vector3f", &tex, "out")?;
                    self.connect(&surface, "normal", "vector3f", &normal_map, "out")?;
                }
                TextureSlot::Opacity => {
                    self.connect(&surface, "opacity", "color3f", &tex, "out")?;
                }
                TextureSlot::Height | TextureSlot::Occlusion => {}
            }
        }

        if self.transmissive {
            self.set_input(&surface, "transmission", "float", UsdValue::Float(TRANSMISSION))?;
            self.set_input(&surface, "thin_walled", "int", UsdValue::Int(1))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Stage helpers
    // ------------------------------------------------------------------------

    fn shader(&mut self, path: &str, id: &str) -> Result<()> {
        let prim = self.stage.define_prim(path, Some("Shader"))?;
        let mut info_id = Attribute::new("info:id", "token").with_value(UsdValue::Token(id.to_string()));
        info_id.uniform = true;
        prim.set_attribute(info_id);
        Ok(())
    }

    fn set_input(&mut self, path: &str, name: &str, type_name: &str, value: UsdValue) -> Result<()> {
        let attr = Attribute::new(&format!("inputs:{}", name), type_name).with_value(value);
        self.stage.set_attribute(path, attr)
    }

    fn set_defaults(&mut self, path: &str, defaults: Defaults) -> Result<()> {
        for (name, type_name, value) in defaults {
            self.set_input(path, name, type_name, (*value).into())?;
        }
        Ok(())
    }

    fn connect(&mut self, path: &str, input: &str, type_name: &str, source: &str, output: &str) -> Result<()> {
        self.stage.connect(
            path,
            &format!("inputs:{}", input),
            type_name,
            source,
            &format!("outputs:{}", output),
        )
    }

    /// Wire a material's surface terminal for `renderer` to `shader`.
    fn terminal(&mut self, material: &str, renderer: Renderer, shader: &str) -> Result<()> {
        let Some(spec) = usd_terminal(renderer, OutputKind::Surface) else {
            return Ok(());
        };
        let output = format!("outputs:{}", spec.shader_output);
        if let Some(prim) = self.stage.prim_mut(shader) {
            prim.ensure_attribute(&output, "token");
        }
        self.stage.connect(
            material,
            &format!("outputs:{}", spec.material_output),
            "token",
            shader,
            &output,
        )
    }
}

/// Surface input, its type and the texture channel feeding it.
fn preview_input(slot: TextureSlot) -> (&'static str, &'static str, &'static str) {
    match slot {
        TextureSlot::BaseColor => ("diffuseColor", "color3f", "rgb"),
        TextureSlot::Metalness => ("metallic", "float", "r"),
        TextureSlot::Roughness => ("roughness", "float", "r"),
        TextureSlot::Normal => ("normal", "normal3f", "rgb"),
        TextureSlot::Opacity => ("opacity", "float", "r"),
        TextureSlot::Occlusion => ("occlusion", "float", "r"),
        TextureSlot::Height => ("displacement", "float", "r"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::TextureInfo;

    fn textured(name: &str, slots: &[(TextureSlot, &str)]) -> MaterialData {
        let mut material = MaterialData::new(name);
        for (slot, file) in slots {
            material.textures.insert(
                *slot,
                TextureInfo {
                    file_path: file.to_string(),
                    traversal_path: "UsdUVTexture".into(),
                    connected_input: slot.token().into(),
                },
            );
        }
        material
    }

    fn source(stage: &Stage, path: &str, input: &str) -> Option<(String, String)> {
        let attr = stage.prim(path)?.input(input)?;
        attr.connection_source().map(|(p, o)| (p.to_string(), o.to_string()))
    }

    #[test]
    fn test_helpers() {
        let keywords = CollectOptions::default().transmissive_keywords;
        assert!(is_transmissive("Window_Glass_01", &keywords));
        assert!(is_transmissive("autoglas", &keywords));
        assert!(!is_transmissive("wood", &keywords));

        assert_eq!(swap_extension("/tex/wood.v2.exr", "png"), "/tex/wood.v2.png");
        assert_eq!(swap_extension("C:\\tex.d\\wood", "png"), "C:\\tex.d\\wood");
        assert_eq!(swap_extension("exr/wood.exr", ".jpg"), "exr/wood.jpg");
    }

    #[test]
    fn test_preview_network() {
        let material = textured(
            "wood",
            &[(TextureSlot::BaseColor, "/tex/wood_albedo.exr"), (TextureSlot::Roughness, "/tex/wood_rough.exr")],
        );
        let options = CollectOptions {
            arnold: false,
            preview_format: Some("png".into()),
            ..Default::default()
        };
        let mut stage = Stage::new();
        let collect = CollectMaterialBuilder::new(&mut stage, &material, &options).run("/collect").unwrap();
        assert_eq!(collect, "/collect/mat_wood_collect");
        assert!(stage.prim("/collect").unwrap().is_a("Scope"));

        let graph = "/collect/mat_wood_collect/UsdPreviewMaterial/UsdPreviewNodeGraph";
        let surface = format!("{}/UsdPreviewSurface", graph);
        let tex = format!("{}/basecolorTexture", graph);
        assert_eq!(
            stage.prim(&tex).unwrap().input("file").unwrap().value,
            Some(UsdValue::Asset("/tex/wood_albedo.png".into()))
        );
        assert_eq!(source(&stage, &surface, "diffuseColor"), Some((tex.clone(), "outputs:rgb".into())));
        assert_eq!(
            source(&stage, &surface, "roughness"),
            Some((format!("{}/roughnessTexture", graph), "outputs:r".into()))
        );
        assert_eq!(
            source(&stage, &tex, "st"),
            Some((format!("{}/TexCoordReader", graph), "outputs:result".into()))
        );

        let collect_prim = stage.prim(&collect).unwrap();
        assert_eq!(collect_prim.input("inputnum").unwrap().value, Some(UsdValue::Int(2)));
        let terminal = collect_prim.attribute("outputs:surface").unwrap();
        assert_eq!(terminal.connection_source(), Some((surface.as_str(), "outputs:surface")));
    }

    #[test]
    fn test_arnold_network() {
        let material = textured(
            "rock",
            &[
                (TextureSlot::BaseColor, "rock_albedo.exr"),
                (TextureSlot::Metalness, "rock_metal.exr"),
                (TextureSlot::Normal, "rock_normal.exr"),
                (TextureSlot::Height, "rock_height.exr"),
            ],
        );
        let options = CollectOptions {
            preview: false,
            ..Default::default()
        };
        let mut stage = Stage::new();
        let collect = CollectMaterialBuilder::new(&mut stage, &material, &options).run("/collect").unwrap();
        let at = |name: &str| format!("{}/{}", collect, name);

        let surface = at("arnold_standard_surface1");
        let prim = stage.prim(&surface).unwrap();
        assert_eq!(prim.info_id(), Some("arnold:standard_surface"));
        assert_eq!(prim.input("specular_IOR").unwrap().value, Some(UsdValue::Float(1.5)));
        assert_eq!(
            stage.prim(&collect).unwrap().attribute("outputs:arnold:surface").unwrap().connection_source(),
            Some((surface.as_str(), "outputs:surface"))
        );

        assert_eq!(
            source(&stage, &surface, "base_color"),
            Some((at("arnold_basecolorColorCorrect"), "outputs:rgb".into()))
        );
        assert_eq!(
            source(&stage, &at("arnold_basecolorColorCorrect"), "input"),
            Some((at("arnold_basecolorTexture"), "outputs:rgba".into()))
        );
        assert_eq!(source(&stage, &surface, "metalness"), Some((at("arnold_metalnessRange"), "outputs:r".into())));
        assert_eq!(
            stage.prim(&at("arnold_heightTexture")).unwrap().input("filename").unwrap().value,
            Some(UsdValue::Asset("rock_height.exr".into()))
        );

        // Normal and height share one bump node driving the surface normal.
        let bump = at("arnold_Bump2d");
        assert_eq!(source(&stage, &bump, "bump_map"), Some((at("arnold_heightRange"), "outputs:r".into())));
        assert_eq!(source(&stage, &bump, "normal"), Some((at("arnold_NormalMap"), "outputs:vector".into())));
        assert_eq!(source(&stage, &surface, "normal"), Some((bump, "outputs:vector".into())));
        assert_eq!(prim.input("transmission").unwrap().value, Some(UsdValue::Float(0.0)));
    }

    #[test]
    fn test_glass_gets_transmission() {
        let material = textured(
            "Glass_clear",
            &[(TextureSlot::BaseColor, "albedo.exr"), (TextureSlot::Metalness, "metal.exr")],
        );
        let options = CollectOptions {
            preview: false,
            mtlx: true,
            ..Default::default()
        };
        let mut stage = Stage::new();
        let collect = CollectMaterialBuilder::new(&mut stage, &material, &options).run("/collect").unwrap();

        let arnold = stage.prim(&format!("{}/arnold_standard_surface1", collect)).unwrap();
        assert_eq!(arnold.input("transmission").unwrap().value, Some(UsdValue::Float(0.9)));
        assert_eq!(arnold.input("thin_walled").unwrap().value, Some(UsdValue::Bool(true)));
        assert!(arnold.input("metalness").unwrap().connections.is_empty());
        assert!(!stage.has_prim(&format!("{}/arnold_metalnessTexture", collect)));

        let mtlx = stage.prim(&format!("{}/mtlx_mtlxstandard_surface1", collect)).unwrap();
        assert_eq!(mtlx.input("transmission").unwrap().value, Some(UsdValue::Float(0.9)));
        assert_eq!(mtlx.input("thin_walled").unwrap().value, Some(UsdValue::Int(1)));
        assert!(!stage.has_prim(&format!("{}/mtlx_metalnessTexture", collect)));
    }

    #[test]
    fn test_mtlx_network() {
        let material = textured("tile", &[(TextureSlot::Roughness, "r.exr"), (TextureSlot::Height, "h.exr")]);
        let options = CollectOptions {
            preview: false,
            arnold: false,
            mtlx: true,
            ..Default::default()
        };
        let mut stage = Stage::new();
        let collect = CollectMaterialBuilder::new(&mut stage, &material, &options).run("/collect").unwrap();
        let surface = format!("{}/mtlx_mtlxstandard_surface1", collect);

        let tex = stage.prim(&format!("{}/mtlx_roughnessTexture", collect)).unwrap();
        assert_eq!(tex.info_id(), Some("ND_image_float"));
        assert_eq!(
            source(&stage, &surface, "specular_roughness"),
            Some((format!("{}/mtlx_roughnessRange", collect), "outputs:out".into()))
        );
        assert!(!stage.has_prim(&format!("{}/mtlx_heightTexture", collect)));
        assert_eq!(
            stage.prim(&collect).unwrap().attribute("outputs:mtlx:surface").unwrap().connection_source(),
            Some((surface.as_str(), "outputs:out"))
        );
    }
}
