//! USD material recreation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::material::{Direction, MaterialData, NodeInfo};
use crate::taxonomy::usd::{usd_info_id, usd_terminal};
use crate::taxonomy::{params, GenericNodeType, Renderer};
use crate::usd::{join_path, sanitize_name, Attribute, Stage, UsdValue};
use crate::util::{Error, Result};

/// A recreated material prim and where every source node ended up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecreatedUsdMaterial {
    pub material_path: String,
    /// Source node path -> recreated prim path.
    pub node_map: BTreeMap<String, String>,
}

/// Builds a `Material` prim with one `Shader` per generic node.
pub struct UsdMaterialRecreator<'a> {
    stage: &'a mut Stage,
    material: &'a MaterialData,
    target: Renderer,
    scope: String,
    material_path: String,
    node_map: BTreeMap<String, String>,
}

impl<'a> UsdMaterialRecreator<'a> {
    /// Prepare a recreator that builds under `scope` (e.g. `/materials`).
    pub fn new(stage: &'a mut Stage, material: &'a MaterialData, scope: &str, target: Renderer) -> Self {
        Self {
            stage,
            material,
            target,
            scope: scope.to_string(),
            material_path: String::new(),
            node_map: BTreeMap::new(),
        }
    }

    /// Define the scope and a uniquely named material prim.
    pub fn create_material(&mut self) -> Result<()> {
        if self.target == Renderer::PrincipledShader {
            return Err(Error::UnsupportedTarget(self.target.label().to_string()));
        }
        if !self.stage.has_prim(&self.scope) {
            self.stage.define_prim(&self.scope, Some("Scope"))?;
        }
        let name = self.stage.unique_child_name(&self.scope, &self.material.material_name);
        self.material_path = join_path(&self.scope, &name);
        self.stage.define_prim(&self.material_path, Some("Material"))?;
        debug!("created material {}", self.material_path);

        let material = self.material;
        for conn in material.output_connections.values() {
            self.node_map.insert(conn.node_path.clone(), self.material_path.clone());
        }
        for info in material.all_nodes().into_iter().filter(|n| n.is_output()) {
            self.node_map.insert(info.node_path.clone(), self.material_path.clone());
        }
        Ok(())
    }

    /// Create a shader for every non-output node.
    pub fn create_shaders(&mut self) -> Result<()> {
        let material = self.material;
        for info in material.all_nodes() {
            if info.is_output() || self.node_map.contains_key(&info.node_path) {
                continue;
            }
            let path = self.create_shader(info)?;
            self.node_map.insert(info.node_path.clone(), path);
        }
        Ok(())
    }

    fn create_shader(&mut self, info: &NodeInfo) -> Result<String> {
        let generic = info.node_type.unwrap_or(GenericNodeType::Null);
        let name = self
            .stage
            .unique_child_name(&self.material_path, &sanitize_name(&info.node_name.replace('/', "_")));
        let path = join_path(&self.material_path, &name);
        let prim = self.stage.define_prim(&path, Some("Shader"))?;

        let Some(info_id) = usd_info_id(generic, self.target) else {
            warn!("no {} shader id for {} ('{}')", self.target.label(), generic, info.node_name);
            return Ok(path);
        };
        let mut id = Attribute::new("info:id", "token").with_value(UsdValue::Token(info_id.to_string()));
        id.uniform = true;
        prim.set_attribute(id);

        if params::param_table(info_id).is_none() {
            if !info.parameters.is_empty() {
                warn!("no parameter mapping for shader id {}", info_id);
            }
            return Ok(path);
        }
        for param in info.parameters.iter().filter(|p| p.direction == Direction::Input) {
            let Some(value) = &param.value else {
                continue;
            };
            let Some(input) = params::from_generic_param(info_id, &param.generic_name) else {
                debug!("no {} input for generic '{}' on '{}'", info_id, param.generic_name, name);
                continue;
            };
            let (type_name, mut usd) = UsdValue::from_param(value);
            let type_name = if param.generic_name == "filename" {
                usd = usd.retype("asset");
                "asset"
            } else {
                type_name
            };
            prim.set_attribute(Attribute::new(&format!("inputs:{}", input), type_name).with_value(usd));
        }
        Ok(path)
    }

    /// Wire the material terminals to the shaders driving them.
    pub fn set_output_connections(&mut self) -> Result<()> {
        let material = self.material;
        for (kind, conn) in &material.output_connections {
            let Some(spec) = usd_terminal(self.target, *kind) else {
                debug!("no {} terminal on {}", kind, self.target.label());
                continue;
            };
            let Some(source) = self.node_map.get(&conn.connected_node_path).cloned() else {
                warn!("no recreated shader for '{}' ({})", conn.connected_node_path, kind);
                continue;
            };
            let output = format!("outputs:{}", spec.shader_output);
            if let Some(prim) = self.stage.prim_mut(&source) {
                prim.ensure_attribute(&output, "token");
            }
            let terminal = format!("outputs:{}", spec.material_output);
            self.stage.connect(&self.material_path, &terminal, "token", &source, &output)?;
            debug!("{}: {} <- {}", kind, terminal, source);
        }
        Ok(())
    }

    /// Wire every recorded connection between recreated shaders.
    pub fn set_node_connections(&mut self) -> Result<()> {
        let material = self.material;
        let mut visited = BTreeSet::new();
        for info in &material.nodes {
            self.connect_tree(info, None, &mut visited)?;
        }
        Ok(())
    }

    fn connect_tree(&mut self, info: &NodeInfo, parent: Option<&str>, visited: &mut BTreeSet<String>) -> Result<()> {
        if !visited.insert(info.node_path.clone()) {
            return Ok(());
        }
        for conn in info.connection_info.values() {
            let Some(src) = self.node_map.get(&conn.input.node_path).cloned() else {
                warn!("no recreated shader for '{}'", conn.input.node_path);
                continue;
            };
            let dest = self
                .node_map
                .get(&conn.output.node_path)
                .cloned()
                .or_else(|| parent.map(str::to_string));
            let Some(dest) = dest else {
                warn!("no destination for connection from '{}'", src);
                continue;
            };
            if dest == self.material_path || src == self.material_path {
                continue;
            }
            self.connect_pair(&src, &dest, &conn.input.parm_name, &conn.output.parm_name)?;
        }

        let own = self.node_map.get(&info.node_path).cloned();
        for child in &info.children {
            self.connect_tree(child, own.as_deref(), visited)?;
        }
        Ok(())
    }

    /// Wire `src.src_parm` into `dest.dest_parm`, both generic names.
    fn connect_pair(&mut self, src: &str, dest: &str, src_parm: &str, dest_parm: &str) -> Result<()> {
        let src_id = self.shader_id(src);
        let dest_id = self.shader_id(dest);
        let dest_input = params::from_generic_param(&dest_id, dest_parm).unwrap_or(dest_parm);
        let src_output = params::from_generic_param(&src_id, src_parm).unwrap_or(src_parm);

        let input = format!("inputs:{}", dest_input);
        let type_name = self
            .stage
            .prim(dest)
            .and_then(|p| p.attribute(&input))
            .map(|a| a.type_name.clone())
            .unwrap_or_else(|| channel_type(src_parm).to_string());
        let output = format!("outputs:{}", src_output);
        if let Some(prim) = self.stage.prim_mut(src) {
            prim.ensure_attribute(&output, &type_name);
        }
        self.stage.connect(dest, &input, &type_name, src, &output)?;
        debug!("connected {}.{} -> {}.{}", src, output, dest, input);
        Ok(())
    }

    fn shader_id(&self, path: &str) -> String {
        self.stage
            .prim(path)
            .and_then(|p| p.info_id())
            .unwrap_or_default()
            .to_string()
    }

    /// Build the material.
    #[tracing::instrument(skip_all, fields(material = %self.material.material_name, target = %self.target))]
    pub fn run(mut self) -> Result<RecreatedUsdMaterial> {
        self.create_material()?;
        self.create_shaders()?;
        self.set_output_connections()?;
        self.set_node_connections()?;
        info!(
            "recreated '{}' as {} at {}",
            self.material.material_name,
            self.target.label(),
            self.material_path
        );
        Ok(RecreatedUsdMaterial {
            material_path: self.material_path,
            node_map: self.node_map,
        })
    }
}

/// Attribute type for a connection, guessed from the generic output name.
fn channel_type(generic_output: &str) -> &'static str {
    match generic_output {
        "r" | "g" | "b" | "a" | "float" => "float",
        "rgb" => "color3f",
        "rgba" => "color4f",
        "vector" | "normal" => "vector3f",
        _ => "token",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Connection, NodeParameter, OutputConnection, OutputKind, PortRef};

    fn port(name: &str, parm: &str) -> PortRef {
        PortRef {
            node_name: name.into(),
            node_path: format!("/mat/src/{}", name),
            node_type: None,
            node_index: Some(0),
            parm_name: parm.into(),
        }
    }

    fn wire(src: &str, src_parm: &str, dest: &str, dest_parm: &str) -> BTreeMap<String, Connection> {
        let mut map = BTreeMap::new();
        map.insert(
            "connection_0".to_string(),
            Connection {
                input: port(src, src_parm),
                output: port(dest, dest_parm),
            },
        );
        map
    }

    fn material() -> MaterialData {
        let mut image = NodeInfo::new(Some(GenericNodeType::Image), "image1", "/mat/src/image1");
        image.parameters.push(NodeParameter::new("filename", "wood.exr"));
        image.connection_info = wire("image1", "rgba", "surf", "base_color");

        let mut surf = NodeInfo::new(Some(GenericNodeType::StandardSurface), "surf", "/mat/src/surf");
        surf.parameters.push(NodeParameter::new("specular_roughness", 0.3f32));
        surf.connection_info = wire("surf", "shader", "OUT_material", "surface");
        surf.children.push(image);

        let mut out = NodeInfo::new(Some(GenericNodeType::OutputNode), "OUT_material", "/mat/src/OUT_material");
        out.is_output_node = true;
        out.children.push(surf);

        let mut mat = MaterialData::new("wood");
        mat.material_type = Some(Renderer::Arnold);
        mat.nodes.push(out);
        mat.output_connections.insert(
            OutputKind::Surface,
            OutputConnection {
                node_name: "OUT_material".into(),
                node_path: "/mat/src/OUT_material".into(),
                connected_node_name: "surf".into(),
                connected_node_path: "/mat/src/surf".into(),
                connected_input_index: Some(0),
                connected_input_name: Some("surface".into()),
                connected_output_name: Some("shader".into()),
            },
        );
        mat
    }

    #[test]
    fn test_arnold_material() {
        let mat = material();
        let mut stage = Stage::new();
        let result = UsdMaterialRecreator::new(&mut stage, &mat, "/materials", Renderer::Arnold).run().unwrap();
        assert_eq!(result.material_path, "/materials/wood");
        assert!(stage.prim("/materials").unwrap().is_a("Scope"));

        let surf = stage.prim("/materials/wood/surf").unwrap();
        assert_eq!(surf.info_id(), Some("arnold:standard_surface"));
        assert_eq!(surf.input("specular_roughness").unwrap().value, Some(UsdValue::Float(0.3)));
        let base = surf.input("base_color").unwrap();
        assert_eq!(base.connection_source(), Some(("/materials/wood/image1", "outputs:rgba")));
        assert_eq!(base.type_name, "color4f");

        let image = stage.prim("/materials/wood/image1").unwrap();
        assert_eq!(image.input("filename").unwrap().value, Some(UsdValue::Asset("wood.exr".into())));

        let terminal = stage.prim(&result.material_path).unwrap().attribute("outputs:arnold:surface").unwrap();
        assert_eq!(terminal.connection_source(), Some(("/materials/wood/surf", "outputs:surface")));
        assert_eq!(result.node_map["/mat/src/OUT_material"], "/materials/wood");
    }

    #[test]
    fn test_mtlx_material() {
        let mat = material();
        let mut stage = Stage::new();
        let result = UsdMaterialRecreator::new(&mut stage, &mat, "/materials", Renderer::Mtlx).run().unwrap();
        let surf = stage.prim(&result.node_map["/mat/src/surf"]).unwrap();
        assert_eq!(surf.info_id(), Some("ND_standard_surface_surfaceshader"));
        assert_eq!(
            surf.input("base_color").unwrap().connection_source(),
            Some(("/materials/wood/image1", "outputs:out"))
        );
        let image = stage.prim("/materials/wood/image1").unwrap();
        assert_eq!(image.input("file").unwrap().value, Some(UsdValue::Asset("wood.exr".into())));
        let terminal = stage.prim(&result.material_path).unwrap().attribute("outputs:mtlx:surface").unwrap();
        assert_eq!(terminal.connection_source(), Some(("/materials/wood/surf", "outputs:out")));
    }

    #[test]
    fn test_existing_material_gets_unique_name() {
        let mat = material();
        let mut stage = Stage::new();
        stage.define_prim("/materials/wood", Some("Material")).unwrap();
        let result = UsdMaterialRecreator::new(&mut stage, &mat, "/materials", Renderer::Arnold).run().unwrap();
        assert_ne!(result.material_path, "/materials/wood");
        assert!(stage.prim(&result.material_path).unwrap().is_a("Material"));
    }

    #[test]
    fn test_principled_target_rejected() {
        let mat = material();
        let mut stage = Stage::new();
        let err = UsdMaterialRecreator::new(&mut stage, &mat, "/materials", Renderer::PrincipledShader)
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedTarget(_)));
    }
}
