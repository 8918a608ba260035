//! VOP network snapshots.
//!
//! A [`VopNetwork`] is the JSON stand-in for a Houdini material builder: its
//! child nodes, their parameter values and their input wiring. Host scripts
//! export one per selected builder and instantiate the recreated ones.
//!
//! - [`detect_material_type`] - which renderer a builder belongs to
//! - [`NodeTraverser`] - builds the nested node tree and output map

mod traverse;

pub use traverse::*;

use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::taxonomy::Renderer;
use crate::util::{io, Result};

/// One input wire: `source`'s output feeds this node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VopInput {
    /// Input index on the destination node.
    #[serde(default)]
    pub index: Option<u32>,
    /// Input name on the destination node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Upstream node name.
    pub source: String,
    #[serde(default)]
    pub source_output_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_output: Option<String>,
}

impl VopInput {
    /// Wire `source`'s output into input `index`.
    pub fn indexed(index: u32, source: &str) -> Self {
        Self {
            index: Some(index),
            source: source.to_string(),
            ..Default::default()
        }
    }

    /// Wire `source.source_output` into the input called `name`.
    pub fn named(name: &str, source: &str, source_output: &str) -> Self {
        Self {
            index: None,
            name: Some(name.to_string()),
            source: source.to_string(),
            source_output_index: None,
            source_output: Some(source_output.to_string()),
        }
    }

    fn same_slot(&self, other: &VopInput) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            _ => self.index.is_some() && self.index == other.index,
        }
    }
}

/// Node inside a material builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VopNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Raw parameter values as exported by the host.
    #[serde(default)]
    pub parms: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub inputs: SmallVec<[VopInput; 4]>,
    /// Input connector names by index, when known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_names: Vec<String>,
    /// Output connector names by index, when known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub output_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
}

impl VopNode {
    /// Create a node with no parms or inputs.
    pub fn new(name: &str, node_type: &str) -> Self {
        Self {
            name: name.to_string(),
            node_type: node_type.to_string(),
            parms: BTreeMap::new(),
            inputs: SmallVec::new(),
            input_names: Vec::new(),
            output_names: Vec::new(),
            position: None,
        }
    }

    /// Set a parameter value.
    pub fn set_parm(&mut self, name: &str, value: impl Into<serde_json::Value>) {
        self.parms.insert(name.to_string(), value.into());
    }

    /// Get a parameter value.
    pub fn parm(&self, name: &str) -> Option<&serde_json::Value> {
        self.parms.get(name)
    }

    /// Connect an input, replacing whatever was wired into the same slot.
    pub fn set_input(&mut self, input: VopInput) {
        self.inputs.retain(|i| !i.same_slot(&input));
        self.inputs.push(input);
    }

    /// Inputs ordered by index; named inputs without an index keep their
    /// authored order after the indexed ones.
    pub fn ordered_inputs(&self) -> Vec<&VopInput> {
        let mut inputs: Vec<&VopInput> = self.inputs.iter().collect();
        inputs.sort_by_key(|i| i.index.unwrap_or(u32::MAX));
        inputs
    }

    /// Name of the input slot a wire lands in.
    pub fn input_name(&self, input: &VopInput) -> Option<String> {
        if let Some(name) = &input.name {
            return Some(name.clone());
        }
        let index = input.index? as usize;
        self.input_names
            .get(index)
            .cloned()
            .or_else(|| default_input_name(&self.node_type, index).map(str::to_string))
    }

    /// Name of an output connector, falling back to the type's main output.
    pub fn output_name(&self, index: Option<u32>) -> String {
        index
            .and_then(|i| self.output_names.get(i as usize).cloned())
            .unwrap_or_else(|| default_output_name(&self.node_type).to_string())
    }
}

/// Known input names of output nodes.
fn default_input_name(node_type: &str, index: usize) -> Option<&'static str> {
    let names: &[&str] = match node_type {
        "arnold_material" => &["surface", "displacement", "volume"],
        "redshift_material" => &["surface", "displacement"],
        "subnetconnector" => &["suboutput"],
        _ => return None,
    };
    names.get(index).copied()
}

/// Main output connector of a node type.
pub fn default_output_name(node_type: &str) -> &'static str {
    match node_type {
        "arnold::standard_surface" => "shader",
        "arnold::range" | "arnold::curvature" => "rgb",
        t if t.starts_with("arnold::") => "rgba",
        t if t.starts_with("redshift::") => "outColor",
        "principledshader::2.0" => "surface",
        "usdpreviewsurface" => "surface",
        t if t.starts_with("usduvtexture") => "rgb",
        _ => "out",
    }
}

/// Snapshot of a material builder node and its children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VopNetwork {
    pub name: String,
    /// Full node path, e.g. `/mat/arnold_materialbuilder1`.
    #[serde(default)]
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Parameters of the builder itself (principled shaders keep theirs here).
    #[serde(default)]
    pub parms: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub nodes: Vec<VopNode>,
}

impl VopNetwork {
    /// Create an empty builder under `context` (e.g. `/mat`).
    pub fn new(context: &str, name: &str, node_type: &str) -> Self {
        Self {
            name: name.to_string(),
            path: format!("{}/{}", context.trim_end_matches('/'), name),
            node_type: node_type.to_string(),
            parms: BTreeMap::new(),
            nodes: Vec::new(),
        }
    }

    /// Load a snapshot from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut network: VopNetwork = io::load_json(path)?;
        if network.path.is_empty() {
            network.path = format!("/mat/{}", network.name);
        }
        Ok(network)
    }

    /// Save the snapshot as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        io::dump_json(self, path)
    }

    /// Context the builder lives in (`/mat` for `/mat/builder`).
    pub fn context(&self) -> &str {
        match self.path.rsplit_once('/') {
            Some(("", _)) | None => "/",
            Some((parent, _)) => parent,
        }
    }

    /// Full path of a child node.
    pub fn node_path(&self, name: &str) -> String {
        format!("{}/{}", self.path, name)
    }

    /// Get a child by name.
    pub fn node(&self, name: &str) -> Option<&VopNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Get a mutable child by name.
    pub fn node_mut(&mut self, name: &str) -> Option<&mut VopNode> {
        self.nodes.iter_mut().find(|n| n.name == name)
    }

    /// Get a child by full path.
    pub fn node_at(&self, path: &str) -> Option<&VopNode> {
        let name = path.strip_prefix(&self.path)?.strip_prefix('/')?;
        self.node(name)
    }

    /// Name not yet used by a child. Clashing names get a numeric suffix.
    pub fn unique_name(&self, base: &str) -> String {
        if self.node(base).is_none() {
            return base.to_string();
        }
        let stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
        (1..)
            .map(|i| format!("{}{}", stem, i))
            .find(|name| self.node(name).is_none())
            .unwrap_or_else(|| base.to_string())
    }

    /// Add a child, renaming it if the name is taken. Returns the final name.
    pub fn add_node(&mut self, mut node: VopNode) -> String {
        node.name = self.unique_name(&node.name);
        let name = node.name.clone();
        self.nodes.push(node);
        name
    }

    /// Nodes that read from `name`.
    pub fn consumers<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a VopNode> + 'a {
        self.nodes
            .iter()
            .filter(move |n| n.inputs.iter().any(|i| i.source == name))
    }

    /// Nodes that feed no other node.
    pub fn roots(&self) -> Vec<&VopNode> {
        self.nodes
            .iter()
            .filter(|n| self.consumers(&n.name).next().is_none())
            .collect()
    }

    /// Check if the builder has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Renderer a material builder was authored for.
pub fn detect_material_type(network: &VopNetwork) -> Option<Renderer> {
    match network.node_type.as_str() {
        "arnold_materialbuilder" => Some(Renderer::Arnold),
        "principledshader::2.0" => Some(Renderer::PrincipledShader),
        "redshift_vopnet" => Some(Renderer::Redshift),
        "subnet" => {
            if network.nodes.iter().any(|n| n.node_type.contains("mtlx")) {
                Some(Renderer::Mtlx)
            } else if network.nodes.iter().any(|n| n.node_type.starts_with("usdpreviewsurface")) {
                Some(Renderer::UsdPreview)
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names() {
        let mut net = VopNetwork::new("/mat", "builder", "arnold_materialbuilder");
        assert_eq!(net.add_node(VopNode::new("image1", "arnold::image")), "image1");
        assert_eq!(net.add_node(VopNode::new("image1", "arnold::image")), "image2");
        assert_eq!(net.add_node(VopNode::new("image", "arnold::image")), "image");
        assert_eq!(net.node_path("image2"), "/mat/builder/image2");
        assert_eq!(net.context(), "/mat");
    }

    #[test]
    fn test_roots_and_consumers() {
        let mut net = VopNetwork::new("/mat", "b", "arnold_materialbuilder");
        let mut out = VopNode::new("OUT_material", "arnold_material");
        out.set_input(VopInput::indexed(0, "surf"));
        net.add_node(out);
        net.add_node(VopNode::new("surf", "arnold::standard_surface"));

        let roots: Vec<_> = net.roots().iter().map(|n| n.name.clone()).collect();
        assert_eq!(roots, vec!["OUT_material"]);
        assert_eq!(net.consumers("surf").count(), 1);
    }

    #[test]
    fn test_set_input_replaces_slot() {
        let mut node = VopNode::new("surf", "mtlxstandard_surface");
        node.set_input(VopInput::named("base_color", "a", "out"));
        node.set_input(VopInput::named("base_color", "b", "out"));
        assert_eq!(node.inputs.len(), 1);
        assert_eq!(node.inputs[0].source, "b");
    }

    #[test]
    fn test_detect_material_type() {
        let mut net = VopNetwork::new("/mat", "m", "subnet");
        assert_eq!(detect_material_type(&net), None);
        net.add_node(VopNode::new("mtlxstandard_surface", "mtlxstandard_surface"));
        assert_eq!(detect_material_type(&net), Some(Renderer::Mtlx));

        let net = VopNetwork::new("/mat", "p", "principledshader::2.0");
        assert_eq!(detect_material_type(&net), Some(Renderer::PrincipledShader));
    }

    #[test]
    fn test_default_names() {
        let out = VopNode::new("OUT", "arnold_material");
        let input = VopInput::indexed(1, "x");
        assert_eq!(out.input_name(&input).as_deref(), Some("displacement"));
        assert_eq!(default_output_name("arnold::image"), "rgba");
        assert_eq!(default_output_name("mtlximage"), "out");
    }
}
