//! Texture sets and bindings of UsdPreview materials on a stage.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, warn};

use super::stage::{Prim, Stage};
use crate::material::{MaterialData, TextureInfo, TextureSlot};
use crate::taxonomy::Renderer;
use crate::util::{io, Result};

const PREVIEW_SURFACE: &str = "UsdPreviewSurface";
const UV_TEXTURE: &str = "UsdUVTexture";

/// Reads every `Material` prim into a [`MaterialData`] holding its
/// UsdPreview texture set and the prims bound to it.
pub struct UsdShadersIngest<'a> {
    stage: &'a Stage,
}

impl<'a> UsdShadersIngest<'a> {
    pub fn new(stage: &'a Stage) -> Self {
        Self { stage }
    }

    /// All material prims, depth-first.
    pub fn materials(&self) -> Vec<&'a Prim> {
        self.stage.prims_of_type("Material")
    }

    /// The UsdPreviewSurface driving one of the material outputs.
    pub fn preview_surface(&self, material: &Prim) -> Option<&'a Prim> {
        let stage: &'a Stage = self.stage;
        material
            .outputs()
            .filter_map(|(_, attr)| stage.connected_source(attr))
            .map(|(prim, _)| prim)
            .find(|prim| prim.info_id() == Some(PREVIEW_SURFACE))
    }

    /// Textures reachable from each input of a preview surface.
    pub fn collect_textures(&self, surface: &Prim) -> BTreeMap<TextureSlot, TextureInfo> {
        let mut out = BTreeMap::new();
        let surface_id = surface.info_id().unwrap_or(surface.name()).to_string();

        for (input, attr) in surface.inputs() {
            let Some((source, _)) = self.stage.connected_source(attr) else {
                continue;
            };
            let mut trail = vec![surface_id.clone()];
            let mut visited = BTreeSet::new();
            self.walk(source, input, &mut trail, &mut visited, &mut out);
        }
        out
    }

    fn walk(
        &self,
        shader: &Prim,
        connected_input: &str,
        trail: &mut Vec<String>,
        visited: &mut BTreeSet<String>,
        out: &mut BTreeMap<TextureSlot, TextureInfo>,
    ) {
        if !visited.insert(shader.path.clone()) {
            return;
        }
        trail.push(shader.info_id().unwrap_or(shader.name()).to_string());

        if shader.info_id() == Some(UV_TEXTURE) {
            self.record_texture(shader, connected_input, trail, out);
        }
        for (_, attr) in shader.inputs() {
            if let Some((source, _)) = self.stage.connected_source(attr) {
                self.walk(source, connected_input, trail, visited, out);
            }
        }
        trail.pop();
    }

    fn record_texture(
        &self,
        shader: &Prim,
        connected_input: &str,
        trail: &[String],
        out: &mut BTreeMap<TextureSlot, TextureInfo>,
    ) {
        let file_path = shader
            .input("file")
            .and_then(|attr| self.stage.resolved_value(attr))
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if file_path.is_empty() {
            warn!("empty file path on texture {}", shader.path);
            return;
        }
        let Some(slot) = TextureSlot::from_preview_input(connected_input) else {
            warn!("unknown texture type: {}", connected_input);
            return;
        };
        out.entry(slot).or_insert_with(|| TextureInfo {
            file_path: file_path.to_string(),
            traversal_path: trail.join(" -> "),
            connected_input: connected_input.to_string(),
        });
    }

    /// Prims whose resolved binding is the given material.
    pub fn bound_prims(&self, material_path: &str) -> Vec<String> {
        self.stage
            .traverse()
            .into_iter()
            .filter(|p| self.stage.bound_material(&p.path) == Some(material_path))
            .map(|p| p.path.clone())
            .collect()
    }

    /// Ingest a single material prim.
    pub fn ingest_material(&self, material: &Prim) -> MaterialData {
        let mut data = MaterialData::new(material.name());
        data.material_path = Some(material.path.clone());

        match self.preview_surface(material) {
            Some(surface) => {
                data.material_type = Some(Renderer::UsdPreview);
                data.textures = self.collect_textures(surface);
            }
            None => warn!("no UsdPreviewSurface shader found for material: {}", material.path),
        }
        data.assigned_prims = self.bound_prims(&material.path);
        data
    }

    /// Ingest every material on the stage.
    #[tracing::instrument(skip_all)]
    pub fn run(&self) -> Vec<MaterialData> {
        let materials: Vec<MaterialData> = self.materials().into_iter().map(|m| self.ingest_material(m)).collect();
        debug!("ingested {} material(s)", materials.len());
        materials
    }

    /// Write ingested texture sets as pretty JSON.
    pub fn save_textures(materials: &[MaterialData], path: impl AsRef<Path>) -> Result<()> {
        io::dump_json(materials, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usd::parse_usda;

    const STAGE: &str = r#"#usda 1.0

def Xform "World"
{
    def Xform "geo" (
        prepend apiSchemas = ["MaterialBindingAPI"]
    )
    {
        rel material:binding = </World/Looks/wood>

        def Mesh "plank"
        {
        }
    }

    def Mesh "rock"
    {
    }

    def Scope "Looks"
    {
        def Material "wood"
        {
            asset inputs:albedoFile = @wood_albedo.png@
            token outputs:surface.connect = </World/Looks/wood/preview.outputs:surface>

            def Shader "preview"
            {
                uniform token info:id = "UsdPreviewSurface"
                color3f inputs:diffuseColor.connect = </World/Looks/wood/albedo.outputs:rgb>
                float inputs:roughness.connect = </World/Looks/wood/rough.outputs:r>
                token outputs:surface
            }

            def Shader "albedo"
            {
                uniform token info:id = "UsdUVTexture"
                asset inputs:file.connect = </World/Looks/wood.inputs:albedoFile>
                float2 inputs:st.connect = </World/Looks/wood/uv.outputs:result>
            }

            def Shader "rough"
            {
                uniform token info:id = "UsdUVTexture"
                asset inputs:file = @wood_rough.png@
            }

            def Shader "uv"
            {
                uniform token info:id = "UsdPrimvarReader_float2"
                token inputs:varname = "st"
            }
        }

        def Material "empty"
        {
        }
    }
}
"#;

    #[test]
    fn test_ingest_textures_and_bindings() {
        let stage = parse_usda(STAGE).unwrap();
        let materials = UsdShadersIngest::new(&stage).run();
        assert_eq!(materials.len(), 2);

        let wood = &materials[0];
        assert_eq!(wood.material_name, "wood");
        assert_eq!(wood.material_type, Some(Renderer::UsdPreview));

        let albedo = &wood.textures[&TextureSlot::BaseColor];
        assert_eq!(albedo.file_path, "wood_albedo.png");
        assert_eq!(albedo.connected_input, "diffuseColor");
        assert_eq!(albedo.traversal_path, "UsdPreviewSurface -> UsdUVTexture");
        assert_eq!(wood.textures[&TextureSlot::Roughness].file_path, "wood_rough.png");
        assert_eq!(wood.textures.len(), 2);

        assert_eq!(wood.assigned_prims, vec!["/World/geo", "/World/geo/plank"]);
    }

    #[test]
    fn test_material_without_preview() {
        let stage = parse_usda(STAGE).unwrap();
        let materials = UsdShadersIngest::new(&stage).run();
        let empty = &materials[1];
        assert!(empty.textures.is_empty());
        assert_eq!(empty.material_type, None);
        assert!(empty.assigned_prims.is_empty());
    }

    #[test]
    fn test_save_textures() {
        let stage = parse_usda(STAGE).unwrap();
        let materials = UsdShadersIngest::new(&stage).run();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textures.json");
        UsdShadersIngest::save_textures(&materials, &path).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("wood_albedo.png"));
    }
}
