//! VOP network recreation.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::material::{Direction, MaterialData, NodeInfo, NodeParameter, OutputKind};
use crate::network::{default_output_name, VopInput, VopNetwork, VopNode};
use crate::taxonomy::{nodes, params, usd as outputs, GenericNodeType, Renderer};
use crate::util::{Error, Result};

/// Source node types whose single-channel outputs need a separate node on MaterialX.
const MTLX_SPLIT_SOURCES: &[&str] = &["mtlximage", "mtlxrange", "mtlxcolorcorrect"];

/// A recreated builder and where every source node ended up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecreatedNetwork {
    pub network: VopNetwork,
    /// Source node path -> recreated node name.
    pub node_map: BTreeMap<String, String>,
}

impl RecreatedNetwork {
    /// Recreated node for a source node path.
    pub fn node_for(&self, source_path: &str) -> Option<&VopNode> {
        self.network.node(self.node_map.get(source_path)?)
    }
}

/// Builds a VOP network for a target renderer from a generic material.
pub struct NodeRecreator<'a> {
    material: &'a MaterialData,
    target: Renderer,
    context: String,
    network: VopNetwork,
    node_map: BTreeMap<String, String>,
    reused: BTreeSet<String>,
    /// Output kind -> output node name in the new builder.
    created_outputs: BTreeMap<OutputKind, String>,
}

impl<'a> NodeRecreator<'a> {
    /// Prepare a recreator that builds into `context` (e.g. `/mat`).
    pub fn new(material: &'a MaterialData, context: &str, target: Renderer) -> Self {
        Self {
            material,
            target,
            context: context.to_string(),
            network: VopNetwork::default(),
            node_map: BTreeMap::new(),
            reused: BTreeSet::new(),
            created_outputs: BTreeMap::new(),
        }
    }

    /// Create the empty builder for the target with its default nodes.
    pub fn create_init_shader(&mut self) -> Result<()> {
        let name = format!("{}_{}", self.material.material_name, self.target.key());
        let mut outputs = BTreeMap::new();
        let network = match self.target {
            Renderer::Arnold => {
                let mut net = VopNetwork::new(&self.context, &name, "arnold_materialbuilder");
                let out = net.add_node(VopNode::new("OUT_material", "arnold_material"));
                outputs.insert(OutputKind::Surface, out.clone());
                outputs.insert(OutputKind::Displacement, out);
                net
            }
            Renderer::Mtlx => {
                let mut net = VopNetwork::new(&self.context, &name, "subnet");
                let surface = net.add_node(VopNode::new("mtlxstandard_surface", "mtlxstandard_surface"));
                let displacement = net.add_node(VopNode::new("mtlxdisplacement", "mtlxdisplacement"));
                for (kind, source) in [(OutputKind::Surface, surface), (OutputKind::Displacement, displacement)] {
                    let mut connector = VopNode::new(&format!("{}_output", kind.name()), "subnetconnector");
                    connector.set_parm("parmname", kind.name());
                    connector.set_parm("connectorkind", "output");
                    connector.set_input(VopInput::named("suboutput", &source, "out"));
                    outputs.insert(kind, net.add_node(connector));
                }
                net
            }
            Renderer::Redshift => {
                let mut net = VopNetwork::new(&self.context, &name, "redshift_vopnet");
                let out = net.add_node(VopNode::new("redshift_material1", "redshift_material"));
                outputs.insert(OutputKind::Surface, out.clone());
                outputs.insert(OutputKind::Displacement, out);
                net
            }
            Renderer::PrincipledShader => VopNetwork::new(&self.context, &name, "principledshader::2.0"),
            Renderer::UsdPreview => return Err(Error::UnsupportedTarget(self.target.label().to_string())),
        };
        debug!("created {} builder '{}'", self.target, network.path);
        self.network = network;
        self.created_outputs = outputs;
        Ok(())
    }

    /// Map each source output node onto the builder's output node.
    pub fn create_output_nodes(&mut self) {
        let material = self.material;
        for (kind, conn) in &material.output_connections {
            let Some(created) = self.created_outputs.get(kind) else {
                debug!("no {} output on {} builder", kind, self.target);
                continue;
            };
            debug!("reusing output node '{}' for {}", created, kind);
            self.node_map.insert(conn.node_path.clone(), created.clone());
        }
    }

    /// Create every non-output node depth-first.
    pub fn create_nodes(&mut self) {
        let material = self.material;
        let mut processed = BTreeSet::new();
        self.create_nodes_recursive(&material.nodes, &mut processed);
    }

    fn create_nodes_recursive(&mut self, infos: &[NodeInfo], processed: &mut BTreeSet<String>) {
        for info in infos {
            if !processed.insert(info.node_path.clone()) {
                continue;
            }
            if !info.is_output() {
                let name = self.create_node(info);
                self.node_map.insert(info.node_path.clone(), name);
            }
            self.create_nodes_recursive(&info.children, processed);
        }
    }

    /// Create or reuse the node for `info`, returning its name.
    fn create_node(&mut self, info: &NodeInfo) -> String {
        let generic = info.node_type.unwrap_or(GenericNodeType::Null);
        let node_type = nodes::vop_node_type(self.target, generic).unwrap_or("null");

        let existing = self
            .network
            .nodes
            .iter()
            .find(|n| n.node_type == node_type && !self.reused.contains(&n.name))
            .map(|n| n.name.clone());
        let name = match existing {
            Some(name) => {
                debug!("using existing node '{}' of type {}", name, node_type);
                name
            }
            None => self.network.add_node(VopNode::new(&info.node_name, node_type)),
        };

        if let Some(node) = self.network.node_mut(&name) {
            apply_parameters(node, &info.parameters);
        }
        self.reused.insert(name.clone());
        name
    }

    /// Wire the recreated surface and displacement drivers into the output nodes.
    pub fn set_output_connections(&mut self) {
        let material = self.material;
        for (kind, conn) in &material.output_connections {
            let Some(output_name) = self.created_outputs.get(kind) else {
                continue;
            };
            let Some(index) = outputs::vop_output_index(self.target, *kind) else {
                continue;
            };
            let Some(source_name) = self.node_map.get(&conn.connected_node_path).cloned() else {
                warn!("no recreated node for '{}' ({})", conn.connected_node_path, kind);
                continue;
            };
            if source_name == *output_name {
                continue;
            }
            let Some(source) = self.network.node(&source_name) else {
                continue;
            };
            let source_output = default_output_name(&source.node_type).to_string();
            let Some(output) = self.network.node_mut(output_name) else {
                continue;
            };
            let input = VopInput {
                index: Some(index),
                name: output.input_name(&VopInput::indexed(index, &source_name)),
                source: source_name.clone(),
                source_output_index: Some(0),
                source_output: Some(source_output),
            };
            debug!("{}: {}[{}] <- {}", kind, output_name, index, source_name);
            output.set_input(input);
        }
    }

    /// Wire every recorded connection between recreated nodes.
    pub fn set_node_connections(&mut self) {
        let material = self.material;
        for info in &material.nodes {
            self.connect_tree(info, None);
        }
    }

    fn connect_tree(&mut self, info: &NodeInfo, parent: Option<&str>) {
        for conn in info.connection_info.values() {
            let Some(src) = self.node_map.get(&conn.input.node_path).cloned() else {
                warn!("no recreated node for '{}'", conn.input.node_path);
                continue;
            };
            if self.is_output_destination(&conn.output.node_path, &conn.output.node_name) {
                debug!("skipping connection into output node '{}'", conn.output.node_name);
                continue;
            }
            let dest = self
                .node_map
                .get(&conn.output.node_path)
                .cloned()
                .or_else(|| parent.map(str::to_string));
            let Some(dest) = dest else {
                warn!("no destination for connection from '{}'", src);
                continue;
            };
            self.connect_pair(&src, &dest, &conn.input.parm_name, &conn.output.parm_name);
        }

        let own = self.node_map.get(&info.node_path).cloned();
        for child in &info.children {
            self.connect_tree(child, own.as_deref());
        }
    }

    fn is_output_destination(&self, old_path: &str, old_name: &str) -> bool {
        if let Some(info) = self.material.find_node(old_path) {
            if info.is_output() || info.is_output_node {
                return true;
            }
        }
        self.created_outputs.values().any(|n| n == old_name)
    }

    /// Wire `src.src_parm` into `dest.dest_parm`, both generic names.
    fn connect_pair(&mut self, src: &str, dest: &str, src_parm: &str, dest_parm: &str) -> bool {
        let (Some(src_node), Some(dest_node)) = (self.network.node(src), self.network.node(dest)) else {
            warn!("cannot connect '{}' -> '{}': node missing", src, dest);
            return false;
        };
        let src_type = src_node.node_type.clone();
        let dest_input = params::from_generic_param(&dest_node.node_type, dest_parm)
            .unwrap_or(dest_parm)
            .to_string();

        if self.target == Renderer::Mtlx
            && MTLX_SPLIT_SOURCES.contains(&src_type.as_str())
            && src_parm != "rgb"
            && src_parm != "rgba"
        {
            return self.split_vec3(src, dest, src_parm, &dest_input);
        }

        let src_output = params::from_generic_param(&src_type, src_parm)
            .map(str::to_string)
            .unwrap_or_else(|| default_output_name(&src_type).to_string());

        if let Some(dest_node) = self.network.node_mut(dest) {
            dest_node.set_input(VopInput::named(&dest_input, src, &src_output));
            debug!("connected {}.{} -> {}.{}", src, src_output, dest, dest_input);
        }
        true
    }

    /// Route one channel of a color output through a `mtlxseparate3c` node.
    fn split_vec3(&mut self, src: &str, dest: &str, channel: &str, dest_input: &str) -> bool {
        if !matches!(channel, "r" | "g" | "b") {
            warn!("separate3c only splits r, g or b channels, got '{}' on '{}'", channel, src);
            return false;
        }
        let split_name = format!("{}_split_vec3", src);
        if self.network.node(&split_name).is_none() {
            let mut split = VopNode::new(&split_name, "mtlxseparate3c");
            split.set_input(VopInput::named("in", src, "out"));
            self.network.add_node(split);
        }
        if let Some(dest_node) = self.network.node_mut(dest) {
            dest_node.set_input(VopInput::named(dest_input, &split_name, &format!("out{}", channel)));
        }
        info!("split '{}' channel {} into '{}'", src, channel, dest);
        true
    }

    /// Principled targets keep everything on the shader node itself.
    fn apply_principled(&mut self) {
        let material = self.material;
        for info in material.all_nodes() {
            match info.node_type {
                Some(GenericNodeType::StandardSurface) => {
                    for param in &info.parameters {
                        let Some(value) = param_json(param) else {
                            continue;
                        };
                        match params::from_generic_param("principledshader::2.0", &param.generic_name) {
                            Some(name) => {
                                self.network.parms.insert(name.to_string(), value);
                            }
                            None => debug!("no principled parameter for '{}'", param.generic_name),
                        }
                    }
                    self.node_map.insert(info.node_path.clone(), self.network.name.clone());
                }
                Some(GenericNodeType::Image) => {
                    let drives_base_color = info
                        .connection_info
                        .values()
                        .any(|c| c.output.parm_name == "base_color");
                    let file = info.param("filename").and_then(|p| p.value.as_ref()).and_then(|v| v.as_str());
                    if let (true, Some(file)) = (drives_base_color, file) {
                        self.network.parms.insert("basecolor_useTexture".into(), 1.into());
                        self.network.parms.insert("basecolor_texture".into(), file.into());
                    }
                }
                _ => {}
            }
        }
    }

    /// Build the network.
    #[tracing::instrument(skip_all, fields(material = %self.material.material_name, target = %self.target))]
    pub fn run(mut self) -> Result<RecreatedNetwork> {
        self.create_init_shader()?;
        if self.target == Renderer::PrincipledShader {
            self.apply_principled();
        } else {
            self.create_output_nodes();
            self.create_nodes();
            self.set_output_connections();
            self.set_node_connections();
        }
        info!(
            "recreated '{}' as {} ({} nodes)",
            self.material.material_name,
            self.target.label(),
            self.network.nodes.len()
        );
        Ok(RecreatedNetwork {
            network: self.network,
            node_map: self.node_map,
        })
    }
}

fn param_json(param: &NodeParameter) -> Option<serde_json::Value> {
    if param.direction != Direction::Input {
        return None;
    }
    param.value.clone().map(serde_json::Value::from)
}

fn apply_parameters(node: &mut VopNode, parameters: &[NodeParameter]) {
    if parameters.is_empty() {
        return;
    }
    if params::param_table(&node.node_type).is_none() {
        warn!("no parameter mapping for node type {}", node.node_type);
        return;
    }
    for param in parameters {
        let Some(value) = param_json(param) else {
            continue;
        };
        match params::from_generic_param(&node.node_type, &param.generic_name) {
            Some(name) => node.set_parm(name, value),
            None => debug!(
                "no {} parameter for generic '{}' on '{}'",
                node.node_type, param.generic_name, node.name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{Connection, NodeParameter, OutputConnection, ParamValue, PortRef};

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

    /// OUT_material <- surf <- image (base_color), as the standardizer emits it.
    fn arnold_material(image_parm: &str, dest_parm: &str) -> MaterialData {
        let mut image = NodeInfo::new(Some(GenericNodeType::Image), "image1", "/mat/src/image1");
        image.parameters.push(NodeParameter::new("filename", "wood.exr"));
        image.connection_info = wire("image1", image_parm, "surf", dest_parm);

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
    fn test_arnold_to_mtlx() {
        let mat = arnold_material("rgba", "base_color");
        let result = NodeRecreator::new(&mat, "/mat", Renderer::Mtlx).run().unwrap();
        let net = &result.network;
        assert_eq!(net.node_type, "subnet");
        assert_eq!(net.path, "/mat/wood_mtlx");

        // surface reused from the builder defaults
        assert_eq!(result.node_map["/mat/src/surf"], "mtlxstandard_surface");
        let surf = net.node("mtlxstandard_surface").unwrap();
        assert_eq!(surf.parm("specular_roughness"), Some(&serde_json::json!(0.3)));
        let base = surf.inputs.iter().find(|i| i.name.as_deref() == Some("base_color")).unwrap();
        assert_eq!(base.source, "image1");
        assert_eq!(base.source_output.as_deref(), Some("out"));

        let image = net.node("image1").unwrap();
        assert_eq!(image.node_type, "mtlximage");
        assert_eq!(image.parm("file"), Some(&serde_json::json!("wood.exr")));

        let connector = net.node("surface_output").unwrap();
        assert_eq!(connector.inputs[0].source, "mtlxstandard_surface");
    }

    #[test]
    fn test_mtlx_channel_split() {
        let mat = arnold_material("r", "specular_roughness");
        let result = NodeRecreator::new(&mat, "/mat", Renderer::Mtlx).run().unwrap();
        let net = &result.network;
        let split = net.node("image1_split_vec3").unwrap();
        assert_eq!(split.node_type, "mtlxseparate3c");
        assert_eq!(split.inputs[0].source, "image1");

        let surf = net.node("mtlxstandard_surface").unwrap();
        let rough = surf
            .inputs
            .iter()
            .find(|i| i.name.as_deref() == Some("specular_roughness"))
            .unwrap();
        assert_eq!(rough.source, "image1_split_vec3");
        assert_eq!(rough.source_output.as_deref(), Some("outr"));
    }

    #[test]
    fn test_mtlx_split_refuses_alpha() {
        let mat = arnold_material("a", "opacity");
        let result = NodeRecreator::new(&mat, "/mat", Renderer::Mtlx).run().unwrap();
        assert!(result.network.node("image1_split_vec3").is_none());
    }

    #[test]
    fn test_arnold_output_wiring() {
        let mat = arnold_material("rgba", "base_color");
        let result = NodeRecreator::new(&mat, "/mat", Renderer::Arnold).run().unwrap();
        let net = &result.network;
        let out = net.node("OUT_material").unwrap();
        assert_eq!(out.inputs.len(), 1);
        assert_eq!(out.inputs[0].index, Some(0));
        assert_eq!(out.inputs[0].source, "surf");
        assert_eq!(out.inputs[0].source_output.as_deref(), Some("shader"));

        let surf = net.node("surf").unwrap();
        assert_eq!(surf.node_type, "arnold::standard_surface");
        assert_eq!(surf.inputs[0].source_output.as_deref(), Some("rgba"));
    }

    #[test]
    fn test_unknown_types_become_null() {
        let mut mat = arnold_material("rgba", "base_color");
        let mut odd = NodeInfo::new(None, "toon1", "/mat/src/toon1");
        odd.parameters.push(NodeParameter::new("edge", ParamValue::Float(1.0)));
        mat.nodes[0].children[0].children.push(odd);
        let result = NodeRecreator::new(&mat, "/mat", Renderer::Arnold).run().unwrap();
        assert_eq!(result.node_for("/mat/src/toon1").unwrap().node_type, "null");
    }

    #[test]
    fn test_principled_target() {
        let mat = arnold_material("rgba", "base_color");
        let result = NodeRecreator::new(&mat, "/mat", Renderer::PrincipledShader).run().unwrap();
        let net = &result.network;
        assert!(net.nodes.is_empty());
        assert_eq!(net.parms.get("rough"), Some(&serde_json::json!(0.3)));
        assert_eq!(net.parms.get("basecolor_useTexture"), Some(&serde_json::json!(1)));
        assert_eq!(net.parms.get("basecolor_texture"), Some(&serde_json::json!("wood.exr")));
    }

    #[test]
    fn test_preview_target_rejected() {
        let mat = arnold_material("rgba", "base_color");
        let err = NodeRecreator::new(&mat, "/mat", Renderer::UsdPreview).run().unwrap_err();
        assert!(matches!(err, Error::UnsupportedTarget(_)));
    }
}
