//! Material prims as traversal trees.
//!
//! Builds the same [`NodeTree`] / [`OutputNodes`] pair a VOP traversal
//! produces, so USD materials go through the standardizer with source type
//! `usd_prims`. Shader `info:id`s are the node types, authored `inputs:*`
//! values the parameters and `.connect` targets the children.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::stage::{Prim, Stage};
use crate::material::{Connection, Direction, OutputConnection, OutputKind, PortRef};
use crate::network::{NodeParms, NodeTree, OutputNodes, RawParm, TraversedNode};
use crate::taxonomy::usd::terminal_from_output;
use crate::taxonomy::Renderer;
use crate::util::{Error, Result};

/// Node type recorded for the material prim itself.
pub const MATERIAL_NODE_TYPE: &str = "Material";

/// Renderer of a material, read from its connected output terminals.
///
/// Renderer-specific terminals win over the plain UsdPreview `surface`.
pub fn detect_usd_material_type(material: &Prim) -> Option<Renderer> {
    let mut found: Vec<Renderer> = material
        .outputs()
        .filter(|(_, attr)| !attr.connections.is_empty())
        .filter_map(|(name, _)| terminal_from_output(name))
        .map(|(renderer, _)| renderer)
        .collect();
    found.sort_by_key(|r| match r {
        Renderer::Arnold => 0,
        Renderer::Mtlx => 1,
        Renderer::Redshift => 2,
        _ => 3,
    });
    found.first().copied()
}

/// A connection between two prims inside a material.
#[derive(Clone, Debug)]
struct Wire {
    source: String,
    source_output: String,
    dest: String,
    dest_input: String,
}

/// Walks one material prim for a given renderer.
pub struct UsdTraverser<'a> {
    stage: &'a Stage,
    material_type: Renderer,
}

impl<'a> UsdTraverser<'a> {
    pub fn new(stage: &'a Stage, material_type: Renderer) -> Self {
        Self { stage, material_type }
    }

    pub fn material_type(&self) -> Renderer {
        self.material_type
    }

    /// Terminals of this renderer and the shaders driving them.
    pub fn detect_output_nodes(&self, material: &Prim) -> OutputNodes {
        let mut outputs = OutputNodes::new();
        for (name, attr) in material.outputs() {
            let Some((renderer, kind)) = terminal_from_output(name) else {
                continue;
            };
            if renderer != self.material_type {
                continue;
            }
            let Some((shader, output)) = self.stage.connected_source(attr) else {
                debug!("{}: terminal '{}' is not connected", material.path, name);
                continue;
            };
            outputs.insert(
                kind.name().to_string(),
                OutputConnection {
                    node_name: material.name().to_string(),
                    node_path: material.path.clone(),
                    connected_node_name: shader.name().to_string(),
                    connected_node_path: shader.path.clone(),
                    connected_input_index: Some(0),
                    connected_input_name: Some(name.to_string()),
                    connected_output_name: Some(output),
                },
            );
        }
        outputs
    }

    /// Traverse a material prim.
    #[tracing::instrument(skip_all, fields(material = %material.path))]
    pub fn run(&self, material: &Prim) -> Result<(NodeTree, OutputNodes)> {
        let outputs = self.detect_output_nodes(material);
        if outputs.is_empty() {
            return Err(Error::NoOutputNode(self.material_type.label().to_string()));
        }
        let wires = self.wires(material);

        let mut root = TraversedNode::leaf(material.name(), &material.path, MATERIAL_NODE_TYPE);
        root.is_output_node = true;
        root.output_type = outputs
            .contains_key(OutputKind::Surface.name())
            .then(|| OutputKind::Surface.name().to_string())
            .or_else(|| outputs.keys().next().cloned());

        let mut stack = vec![material.path.clone()];
        for kind in OutputKind::ALL {
            let Some(conn) = outputs.get(kind.name()) else {
                continue;
            };
            if root.children_list.iter().any(|c| c.node_path == conn.connected_node_path) {
                continue;
            }
            let child = self.traverse(&conn.connected_node_path, &material.path, &wires, &mut stack)?;
            root.children_list.push(child);
        }

        let mut tree = NodeTree::new();
        tree.insert(material.path.clone(), root);
        Ok((tree, outputs))
    }

    fn traverse(&self, path: &str, parent: &str, wires: &[Wire], stack: &mut Vec<String>) -> Result<TraversedNode> {
        if stack.iter().any(|p| p == path) {
            return Err(Error::Cycle(path.to_string()));
        }
        let prim = self.stage.prim(path).ok_or_else(|| Error::PrimNotFound(path.to_string()))?;
        stack.push(path.to_string());

        let node_type = prim.info_id().unwrap_or_default();
        if node_type.is_empty() {
            warn!("shader {} has no info:id", path);
        }
        let mut entry = TraversedNode::leaf(prim.name(), path, node_type);
        entry.node_parms = NodeParms::Flat(shader_parms(prim));
        entry.connections = self.connections(prim, parent, wires);

        for wire in wires.iter().filter(|w| w.dest == path) {
            if entry.children_list.iter().any(|c| c.node_path == wire.source) {
                continue;
            }
            let child = self.traverse(&wire.source, path, wires, stack)?;
            entry.children_list.push(child);
        }

        stack.pop();
        Ok(entry)
    }

    /// Every connection inside the material, in authored order. Material
    /// terminals of other renderers are left out.
    fn wires(&self, material: &Prim) -> Vec<Wire> {
        let mut prims = vec![material];
        prims.extend(self.stage.descendants(&material.path));

        let mut wires = Vec::new();
        for prim in prims {
            let is_material = prim.path == material.path;
            for attr in prim.attributes.iter().filter(|a| !a.connections.is_empty()) {
                let dest_input = match attr.name.split_once(':') {
                    Some(("inputs", name)) if !is_material => name,
                    Some(("outputs", name)) if is_material => {
                        match terminal_from_output(name) {
                            Some((renderer, _)) if renderer == self.material_type => name,
                            _ => continue,
                        }
                    }
                    _ => continue,
                };
                let Some((source, output)) = self.stage.connected_source(attr) else {
                    continue;
                };
                wires.push(Wire {
                    source: source.path.clone(),
                    source_output: output,
                    dest: prim.path.clone(),
                    dest_input: dest_input.to_string(),
                });
            }
        }
        wires
    }

    /// Connections from `prim` into `parent`, keyed by the index of each
    /// wire among all of `prim`'s outgoing wires.
    fn connections(&self, prim: &Prim, parent: &str, wires: &[Wire]) -> BTreeMap<String, Connection> {
        wires
            .iter()
            .filter(|w| w.source == prim.path)
            .enumerate()
            .filter(|(_, w)| w.dest == parent)
            .map(|(i, w)| {
                let conn = Connection {
                    input: self.port(&w.source, &w.source_output),
                    output: self.port(&w.dest, &w.dest_input),
                };
                (format!("connection_{}", i), conn)
            })
            .collect()
    }

    fn port(&self, path: &str, parm_name: &str) -> PortRef {
        let prim = self.stage.prim(path);
        let node_type = prim.map(|p| {
            if p.is_a("Material") {
                MATERIAL_NODE_TYPE.to_string()
            } else {
                p.info_id().unwrap_or_default().to_string()
            }
        });
        PortRef {
            node_name: super::prim_name(path).to_string(),
            node_path: path.to_string(),
            node_type,
            node_index: Some(0),
            parm_name: parm_name.to_string(),
        }
    }
}

/// Authored input values and declared outputs.
fn shader_parms(prim: &Prim) -> Vec<RawParm> {
    let inputs = prim.inputs().filter_map(|(name, attr)| {
        let value = attr.value.as_ref()?.to_param(&attr.type_name)?;
        let mut parm = RawParm::new(name, Some(value));
        parm.parm_type = Some(attr.type_name.clone());
        Some(parm)
    });
    let outputs = prim.outputs().map(|(name, attr)| {
        let mut parm = RawParm::new(name, None);
        parm.parm_type = Some(attr.type_name.clone());
        parm.direction = Direction::Output;
        parm
    });
    inputs.chain(outputs).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::ParamValue;
    use crate::usd::parse_usda;

    const ARNOLD: &str = r#"#usda 1.0

def Scope "looks"
{
    def Material "metal"
    {
        token outputs:arnold:surface.connect = </looks/metal/surf.outputs:surface>
        token outputs:surface.connect = </looks/metal/preview.outputs:surface>

        def Shader "surf"
        {
            uniform token info:id = "arnold:standard_surface"
            float inputs:metalness = 1
            color3f inputs:base_color.connect = </looks/metal/cc.outputs:rgb>
            float inputs:specular_roughness.connect = </looks/metal/tex.outputs:r>
            token outputs:surface
        }

        def Shader "cc"
        {
            uniform token info:id = "arnold:color_correct"
            float inputs:hue_shift = 0.25
            color4f inputs:input.connect = </looks/metal/tex.outputs:rgba>
        }

        def Shader "tex"
        {
            uniform token info:id = "arnold:image"
            asset inputs:filename = @metal.png@
        }

        def Shader "preview"
        {
            uniform token info:id = "UsdPreviewSurface"
        }
    }
}
"#;

    #[test]
    fn test_detect_type() {
        let stage = parse_usda(ARNOLD).unwrap();
        let material = stage.prim("/looks/metal").unwrap();
        assert_eq!(detect_usd_material_type(material), Some(Renderer::Arnold));
        let preview = stage.prim("/looks/metal/preview").unwrap();
        assert_eq!(detect_usd_material_type(preview), None);
    }

    #[test]
    fn test_tree_shape() {
        let stage = parse_usda(ARNOLD).unwrap();
        let material = stage.prim("/looks/metal").unwrap();
        let (tree, outputs) = UsdTraverser::new(&stage, Renderer::Arnold).run(material).unwrap();

        let surface = &outputs["surface"];
        assert_eq!(surface.connected_node_path, "/looks/metal/surf");
        assert_eq!(surface.connected_input_name.as_deref(), Some("arnold:surface"));
        assert_eq!(surface.connected_output_name.as_deref(), Some("surface"));

        let root = &tree["/looks/metal"];
        assert!(root.is_output_node);
        assert_eq!(root.node_type, "Material");
        assert_eq!(root.children_list.len(), 1);

        let surf = &root.children_list[0];
        assert_eq!(surf.node_type, "arnold:standard_surface");
        assert_eq!(surf.connections["connection_0"].output.parm_name, "arnold:surface");
        let children: Vec<_> = surf.children_list.iter().map(|c| c.node_name.as_str()).collect();
        assert_eq!(children, vec!["cc", "tex"]);

        // surf is authored before cc, so tex's wire into surf comes first.
        let tex = &surf.children_list[1];
        assert_eq!(tex.connections.len(), 1);
        let conn = &tex.connections["connection_0"];
        assert_eq!(conn.input.parm_name, "r");
        assert_eq!(conn.output.parm_name, "specular_roughness");

        let cc = &surf.children_list[0];
        assert!(cc.children_list[0].connections.contains_key("connection_1"));
        let parms = cc.node_parms.ordered();
        assert_eq!(parms[0].generic_name, "hue_shift");
        assert_eq!(parms[0].value, Some(ParamValue::Float(0.25)));
    }

    #[test]
    fn test_no_terminal() {
        let stage = parse_usda(ARNOLD).unwrap();
        let material = stage.prim("/looks/metal").unwrap();
        let err = UsdTraverser::new(&stage, Renderer::Mtlx).run(material).unwrap_err();
        assert!(matches!(err, Error::NoOutputNode(_)));
    }

    #[test]
    fn test_shader_loop_is_cycle() {
        let text = r#"#usda 1.0

def Material "loop"
{
    token outputs:arnold:surface.connect = </loop/surf.outputs:surface>

    def Shader "surf"
    {
        uniform token info:id = "arnold:standard_surface"
        color3f inputs:base_color.connect = </loop/a.outputs:rgb>
        token outputs:surface
    }

    def Shader "a"
    {
        uniform token info:id = "arnold:color_correct"
        color4f inputs:input.connect = </loop/b.outputs:rgba>
    }

    def Shader "b"
    {
        uniform token info:id = "arnold:color_correct"
        color4f inputs:input.connect = </loop/a.outputs:rgba>
    }
}
"#;
        let stage = parse_usda(text).unwrap();
        let material = stage.prim("/loop").unwrap();
        let err = UsdTraverser::new(&stage, Renderer::Arnold).run(material).unwrap_err();
        match err {
            Error::Cycle(path) => assert_eq!(path, "/loop/a"),
            other => panic!("expected cycle, got {:?}", other),
        }
    }
}
