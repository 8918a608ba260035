//! Generic material model.
//!
//! A [`MaterialData`] is the renderer-neutral form of one material: a forest
//! of [`NodeInfo`]s rooted at the output nodes, the output terminals, and
//! for USD sources the textures and bound prims.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ParamValue;
use crate::taxonomy::{GenericNodeType, Renderer};
use crate::util::Error;

/// Whether a parameter is read or produced by its node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Input,
    Output,
}

/// Standardized node parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeParameter {
    /// Generic parameter name (e.g. `base_color`).
    pub generic_name: String,
    /// Source data type as reported by the host, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_type: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub value: Option<ParamValue>,
}

impl NodeParameter {
    /// Create an input parameter.
    pub fn new(generic_name: &str, value: impl Into<ParamValue>) -> Self {
        Self {
            generic_name: generic_name.to_string(),
            generic_type: None,
            direction: Direction::Input,
            value: Some(value.into()),
        }
    }

    /// Create an output parameter without a value.
    pub fn output(generic_name: &str) -> Self {
        Self {
            generic_name: generic_name.to_string(),
            generic_type: None,
            direction: Direction::Output,
            value: None,
        }
    }
}

/// One end of a connection.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRef {
    pub node_name: String,
    pub node_path: String,
    /// Source node type; used to look up the parameter table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(default)]
    pub node_index: Option<u32>,
    #[serde(default)]
    pub parm_name: String,
}

/// Edge between two nodes.
///
/// `input` is the upstream node (and its output name), `output` the
/// downstream node (and its input name).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub input: PortRef,
    pub output: PortRef,
}

/// Standardized node. Children are the nodes feeding this one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    /// `None` when the source type has no generic equivalent.
    pub node_type: Option<GenericNodeType>,
    pub node_name: String,
    pub node_path: String,
    #[serde(default)]
    pub parameters: Vec<NodeParameter>,
    /// Connections from this node into its parent, keyed `connection_<i>`.
    #[serde(default)]
    pub connection_info: BTreeMap<String, Connection>,
    #[serde(default, rename = "children_list")]
    pub children: Vec<NodeInfo>,
    #[serde(default)]
    pub is_output_node: bool,
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
}

impl NodeInfo {
    /// Create a node without parameters or connections.
    pub fn new(node_type: Option<GenericNodeType>, node_name: &str, node_path: &str) -> Self {
        Self {
            node_type,
            node_name: node_name.to_string(),
            node_path: node_path.to_string(),
            parameters: Vec::new(),
            connection_info: BTreeMap::new(),
            children: Vec::new(),
            is_output_node: false,
            output_type: node_type.map(|t| t.to_string()),
            position: None,
        }
    }

    /// Get a parameter by generic name.
    pub fn param(&self, generic_name: &str) -> Option<&NodeParameter> {
        self.parameters.iter().find(|p| p.generic_name == generic_name)
    }

    /// Check whether this node is the generic output node.
    #[inline]
    pub fn is_output(&self) -> bool {
        self.node_type.is_some_and(|t| t.is_output())
    }

    /// Visit this node and all descendants depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NodeInfo)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Find a node by path in this subtree.
    pub fn find(&self, node_path: &str) -> Option<&NodeInfo> {
        if self.node_path == node_path {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(node_path))
    }
}

impl fmt::Display for NodeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(node: &NodeInfo, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let ty = node
                .node_type
                .map(|t| t.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            write!(f, "{:indent$}{} ({}) {}", "", node.node_name, ty, node.node_path, indent = depth * 2)?;
            if node.is_output_node {
                write!(f, " [output: {}]", node.output_type.as_deref().unwrap_or("?"))?;
            }
            writeln!(f)?;
            for child in &node.children {
                write_node(child, depth + 1, f)?;
            }
            Ok(())
        }
        write_node(self, 0, f)
    }
}

/// Material terminal kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OutputKind {
    #[serde(rename = "GENERIC::output_surface", alias = "surface")]
    Surface,
    #[serde(rename = "GENERIC::output_displacement", alias = "displacement")]
    Displacement,
}

impl OutputKind {
    pub const ALL: [OutputKind; 2] = [OutputKind::Surface, OutputKind::Displacement];

    /// Short name (`surface`, `displacement`).
    pub fn name(&self) -> &'static str {
        match self {
            OutputKind::Surface => "surface",
            OutputKind::Displacement => "displacement",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GENERIC::output_{}", self.name())
    }
}

impl FromStr for OutputKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("GENERIC::output_").unwrap_or(s) {
            "surface" => Ok(OutputKind::Surface),
            "displacement" => Ok(OutputKind::Displacement),
            _ => Err(Error::other(format!("Unknown output type: {}", s))),
        }
    }
}

/// Which node drives a material terminal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConnection {
    /// The output node itself.
    pub node_name: String,
    pub node_path: String,
    /// The node feeding the output.
    pub connected_node_name: String,
    pub connected_node_path: String,
    #[serde(default)]
    pub connected_input_index: Option<u32>,
    /// Input name on the output node.
    #[serde(default)]
    pub connected_input_name: Option<String>,
    /// Output name on the connected node.
    #[serde(default)]
    pub connected_output_name: Option<String>,
}

/// Texture role on a surface shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    #[serde(alias = "albedo", alias = "basecolor", alias = "diffuseColor")]
    BaseColor,
    #[serde(alias = "metallness", alias = "metallic")]
    Metalness,
    Roughness,
    Normal,
    Opacity,
    Occlusion,
    #[serde(alias = "displacement")]
    Height,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 7] = [
        TextureSlot::BaseColor,
        TextureSlot::Metalness,
        TextureSlot::Roughness,
        TextureSlot::Normal,
        TextureSlot::Opacity,
        TextureSlot::Occlusion,
        TextureSlot::Height,
    ];

    /// Slot for a UsdPreviewSurface input name.
    pub fn from_preview_input(input: &str) -> Option<Self> {
        match input {
            "diffuseColor" => Some(TextureSlot::BaseColor),
            "metallic" => Some(TextureSlot::Metalness),
            "roughness" => Some(TextureSlot::Roughness),
            "normal" => Some(TextureSlot::Normal),
            "opacity" => Some(TextureSlot::Opacity),
            "occlusion" => Some(TextureSlot::Occlusion),
            "displacement" => Some(TextureSlot::Height),
            _ => None,
        }
    }

    /// Lowercase token used in generated prim names (`basecolorTexture`).
    pub fn token(&self) -> &'static str {
        match self {
            TextureSlot::BaseColor => "basecolor",
            TextureSlot::Metalness => "metalness",
            TextureSlot::Roughness => "roughness",
            TextureSlot::Normal => "normal",
            TextureSlot::Opacity => "opacity",
            TextureSlot::Occlusion => "occlusion",
            TextureSlot::Height => "height",
        }
    }
}

impl FromStr for TextureSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(slot) = Self::from_preview_input(s) {
            return Ok(slot);
        }
        match s.to_ascii_lowercase().as_str() {
            "basecolor" | "base_color" | "albedo" | "diffuse" => Ok(TextureSlot::BaseColor),
            "metalness" | "metallness" | "metallic" => Ok(TextureSlot::Metalness),
            "roughness" => Ok(TextureSlot::Roughness),
            "normal" => Ok(TextureSlot::Normal),
            "opacity" => Ok(TextureSlot::Opacity),
            "occlusion" | "ao" => Ok(TextureSlot::Occlusion),
            "height" | "displacement" | "bump" => Ok(TextureSlot::Height),
            _ => Err(Error::other(format!("Unknown texture type: {}", s))),
        }
    }
}

/// A texture found behind a surface shader input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureInfo {
    pub file_path: String,
    /// Shader ids walked to reach the texture, joined with ` -> `.
    pub traversal_path: String,
    /// Surface input the texture ultimately drives.
    pub connected_input: String,
}

/// Renderer-neutral material.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialData {
    pub material_name: String,
    #[serde(default)]
    pub material_path: Option<String>,
    #[serde(default)]
    pub material_type: Option<Renderer>,
    #[serde(default, rename = "nodeinfo_list")]
    pub nodes: Vec<NodeInfo>,
    #[serde(default)]
    pub output_connections: BTreeMap<OutputKind, OutputConnection>,
    #[serde(default)]
    pub textures: BTreeMap<TextureSlot, TextureInfo>,
    #[serde(default, rename = "prims_assigned_to_material")]
    pub assigned_prims: Vec<String>,
}

impl MaterialData {
    /// Create an empty material.
    pub fn new(material_name: &str) -> Self {
        Self {
            material_name: material_name.to_string(),
            ..Default::default()
        }
    }

    /// Find a node by path anywhere in the forest.
    pub fn find_node(&self, node_path: &str) -> Option<&NodeInfo> {
        self.nodes.iter().find_map(|n| n.find(node_path))
    }

    /// All nodes depth-first, output nodes included.
    pub fn all_nodes(&self) -> Vec<&NodeInfo> {
        let mut out = Vec::new();
        for node in &self.nodes {
            node.walk(&mut |n| out.push(n));
        }
        out
    }

    /// Number of distinct node paths.
    pub fn node_count(&self) -> usize {
        let mut paths: Vec<&str> = self.all_nodes().iter().map(|n| n.node_path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();
        paths.len()
    }

    /// Check if the material has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for MaterialData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ty = self.material_type.map(|t| t.label()).unwrap_or("unknown");
        writeln!(f, "Material '{}' ({})", self.material_name, ty)?;
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        for (kind, conn) in &self.output_connections {
            writeln!(f, "{} <- {}", kind, conn.connected_node_path)?;
        }
        for (slot, tex) in &self.textures {
            writeln!(f, "{:?}: {}", slot, tex.file_path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MaterialData {
        let mut image = NodeInfo::new(Some(GenericNodeType::Image), "image1", "/mat/b/image1");
        image.parameters.push(NodeParameter::new("filename", "tex.exr"));
        let mut surface = NodeInfo::new(Some(GenericNodeType::StandardSurface), "surf", "/mat/b/surf");
        surface.children.push(image);
        let mut out = NodeInfo::new(Some(GenericNodeType::OutputNode), "OUT", "/mat/b/OUT");
        out.is_output_node = true;
        out.output_type = Some("surface".into());
        out.children.push(surface);

        let mut mat = MaterialData::new("b");
        mat.nodes.push(out);
        mat
    }

    #[test]
    fn test_find_and_walk() {
        let mat = sample();
        assert_eq!(mat.node_count(), 3);
        let image = mat.find_node("/mat/b/image1").unwrap();
        assert_eq!(image.param("filename").unwrap().value, Some(ParamValue::from("tex.exr")));
        assert!(mat.nodes[0].is_output());
    }

    #[test]
    fn test_output_kind_keys() {
        let mut map = BTreeMap::new();
        map.insert(OutputKind::Surface, OutputConnection::default());
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.contains("GENERIC::output_surface"));
        assert_eq!("displacement".parse::<OutputKind>().unwrap(), OutputKind::Displacement);
        assert_eq!(OutputKind::Surface.to_string(), "GENERIC::output_surface");
    }

    #[test]
    fn test_texture_slot_names() {
        assert_eq!("diffuseColor".parse::<TextureSlot>().unwrap(), TextureSlot::BaseColor);
        assert_eq!("metallness".parse::<TextureSlot>().unwrap(), TextureSlot::Metalness);
        let slot: TextureSlot = serde_json::from_str("\"albedo\"").unwrap();
        assert_eq!(slot, TextureSlot::BaseColor);
    }

    #[test]
    fn test_material_json_roundtrip_shape() {
        let mat = sample();
        let json = serde_json::to_value(&mat).unwrap();
        assert!(json["nodeinfo_list"][0]["children_list"].is_array());
        let back: MaterialData = serde_json::from_value(json).unwrap();
        assert_eq!(back, mat);
    }
}
