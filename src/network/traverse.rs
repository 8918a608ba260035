//! Network traversal: nested node tree plus detected output nodes.
//!
//! The tree is rooted at the nodes nothing else reads from (normally the
//! output nodes) and each node lists the nodes feeding it as children. This
//! is also the JSON layout of traversal dumps.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::{VopInput, VopNetwork, VopNode};
use crate::material::{Connection, Direction, OutputConnection, ParamValue, PortRef};
use crate::taxonomy::{usd, Renderer};
use crate::util::{io, Error, Result};

/// Raw node parameter as captured during traversal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawParm {
    /// Renderer parameter name (dumps may call it `name`).
    #[serde(alias = "name")]
    pub generic_name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub parm_type: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, deserialize_with = "lenient_value")]
    pub value: Option<ParamValue>,
}

impl RawParm {
    pub fn new(name: &str, value: Option<ParamValue>) -> Self {
        Self {
            generic_name: name.to_string(),
            parm_type: None,
            direction: Direction::Input,
            value,
        }
    }
}

// Values with no parameter form (ramps, dicts) are dropped, not fatal.
fn lenient_value<'de, D>(deserializer: D) -> std::result::Result<Option<ParamValue>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(ParamValue::try_from(value).ok())
}

/// Parameters of a traversed node, either split by direction or flat.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeParms {
    Split {
        #[serde(default)]
        input: Vec<RawParm>,
        #[serde(default)]
        output: Vec<RawParm>,
    },
    Flat(Vec<RawParm>),
}

impl Default for NodeParms {
    fn default() -> Self {
        NodeParms::Flat(Vec::new())
    }
}

impl NodeParms {
    /// Parameters with inputs first, then outputs.
    pub fn ordered(&self) -> Vec<&RawParm> {
        match self {
            NodeParms::Split { input, output } => input.iter().chain(output.iter()).collect(),
            NodeParms::Flat(parms) => {
                let inputs = parms.iter().filter(|p| p.direction == Direction::Input);
                let outputs = parms.iter().filter(|p| p.direction == Direction::Output);
                inputs.chain(outputs).collect()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NodeParms::Split { input, output } => input.is_empty() && output.is_empty(),
            NodeParms::Flat(parms) => parms.is_empty(),
        }
    }
}

/// Node in a traversal tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraversedNode {
    pub node_name: String,
    pub node_path: String,
    pub node_type: String,
    #[serde(default)]
    pub node_parms: NodeParms,
    /// Connections from this node into the node that reached it.
    #[serde(default, rename = "connections_dict")]
    pub connections: BTreeMap<String, Connection>,
    #[serde(default)]
    pub children_list: Vec<TraversedNode>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_output_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default, rename = "node_position", skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec2>,
}

impl TraversedNode {
    pub(crate) fn leaf(name: &str, path: &str, node_type: &str) -> Self {
        Self {
            node_name: name.to_string(),
            node_path: path.to_string(),
            node_type: node_type.to_string(),
            node_parms: NodeParms::default(),
            connections: BTreeMap::new(),
            children_list: Vec::new(),
            is_output_node: false,
            output_type: None,
            position: None,
        }
    }

    /// Number of nodes in this subtree.
    pub fn len(&self) -> usize {
        1 + self.children_list.iter().map(TraversedNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Root node path -> nested node.
pub type NodeTree = BTreeMap<String, TraversedNode>;

/// Output kind (`surface`, `displacement`) -> connection.
pub type OutputNodes = BTreeMap<String, OutputConnection>;

/// A traversal result as written to and read back from disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TraversalDump {
    #[serde(default)]
    pub material_type: Option<Renderer>,
    pub node_tree: NodeTree,
    pub output_nodes: OutputNodes,
}

impl TraversalDump {
    /// Load from the two files a traversal dumps.
    pub fn load(tree_path: impl AsRef<Path>, outputs_path: impl AsRef<Path>) -> Result<Self> {
        // Both files must hold objects at top level.
        let tree = io::load_json_object(tree_path)?;
        let outputs = io::load_json_object(outputs_path)?;
        Ok(Self {
            material_type: None,
            node_tree: serde_json::from_value(serde_json::Value::Object(tree))?,
            output_nodes: serde_json::from_value(serde_json::Value::Object(outputs))?,
        })
    }

    /// Write `traversed_nodes_dict.json` and `output_nodes_dict.json` into `dir`.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        io::dump_json(&self.node_tree, dir.join("traversed_nodes_dict.json"))?;
        io::dump_json(&self.output_nodes, dir.join("output_nodes_dict.json"))?;
        Ok(())
    }
}

/// Walks a material builder into a [`NodeTree`] and its [`OutputNodes`].
pub struct NodeTraverser {
    material_type: Renderer,
    output_nodes: OutputNodes,
}

impl NodeTraverser {
    pub fn new(material_type: Renderer) -> Self {
        Self {
            material_type,
            output_nodes: OutputNodes::new(),
        }
    }

    pub fn material_type(&self) -> Renderer {
        self.material_type
    }

    /// Find the output nodes and what drives them.
    pub fn detect_output_nodes(&self, network: &VopNetwork) -> Result<OutputNodes> {
        debug!("detecting output nodes for {}", network.path);
        match (self.material_type, usd::vop_output_node_type(self.material_type)) {
            (Renderer::Arnold | Renderer::Redshift, Some(node_type)) => {
                indexed_output_nodes(network, node_type, self.material_type)
            }
            (Renderer::PrincipledShader, _) => Ok(principled_output_nodes(network)),
            _ => Ok(connector_output_nodes(network)),
        }
    }

    /// Traverse the builder.
    #[tracing::instrument(skip_all, fields(network = %network.path))]
    pub fn run(&mut self, network: &VopNetwork) -> Result<(NodeTree, OutputNodes)> {
        self.output_nodes = self.detect_output_nodes(network)?;

        if self.material_type == Renderer::PrincipledShader {
            return Ok((principled_entry(network), self.output_nodes.clone()));
        }

        let roots = network.roots();
        if roots.is_empty() && !network.is_empty() {
            return Err(Error::Cycle(network.path.clone()));
        }

        let mut tree = NodeTree::new();
        for root in roots {
            let mut stack = Vec::new();
            let node = self.traverse(network, root, None, &mut stack)?;
            tree.insert(node.node_path.clone(), node);
        }

        // Nodes no root reaches sit on (or feed) a closed loop.
        let mut visited = BTreeSet::new();
        for node in tree.values() {
            collect_names(node, &mut visited);
        }
        if let Some(stray) = network.nodes.iter().find(|n| !visited.contains(n.name.as_str())) {
            warn!("'{}' is not reachable from any root", stray.name);
            return Err(Error::Cycle(network.node_path(&stray.name)));
        }
        Ok((tree, self.output_nodes.clone()))
    }

    fn traverse(
        &self,
        network: &VopNetwork,
        node: &VopNode,
        parent: Option<&VopNode>,
        stack: &mut Vec<String>,
    ) -> Result<TraversedNode> {
        if stack.iter().any(|n| *n == node.name) {
            return Err(Error::Cycle(network.node_path(&node.name)));
        }
        stack.push(node.name.clone());

        let path = network.node_path(&node.name);
        let mut entry = TraversedNode::leaf(&node.name, &path, &node.node_type);
        entry.node_parms = NodeParms::Flat(raw_parms(node));
        entry.position = node.position;
        if let Some(parent) = parent {
            entry.connections = node_connections(network, node, parent);
        }
        if let Some((kind, _)) = self.output_nodes.iter().find(|(_, o)| o.node_path == path) {
            entry.is_output_node = true;
            entry.output_type = Some(kind.clone());
        }

        for input in node.ordered_inputs() {
            let Some(source) = network.node(&input.source) else {
                warn!("{}: input from missing node '{}'", path, input.source);
                continue;
            };
            // Several wires from one source still make one child.
            if entry.children_list.iter().any(|c| c.node_name == source.name) {
                continue;
            }
            let child = self.traverse(network, source, Some(node), stack)?;
            entry.children_list.push(child);
        }

        stack.pop();
        Ok(entry)
    }
}

fn raw_parms(node: &VopNode) -> Vec<RawParm> {
    node.parms
        .iter()
        .map(|(name, value)| {
            let parsed = if value.is_null() {
                None
            } else {
                match ParamValue::try_from(value.clone()) {
                    Ok(v) => Some(v),
                    Err(e) => {
                        debug!("{}.{}: {}", node.name, name, e);
                        None
                    }
                }
            };
            RawParm::new(name, parsed)
        })
        .collect()
}

fn port(network: &VopNetwork, node: &VopNode, index: Option<u32>, parm_name: String) -> PortRef {
    PortRef {
        node_name: node.name.clone(),
        node_path: network.node_path(&node.name),
        node_type: Some(node.node_type.clone()),
        node_index: index,
        parm_name,
    }
}

/// Connections from `node` into `parent`, keyed by the index of each wire
/// among all of `node`'s outgoing wires.
fn node_connections(network: &VopNetwork, node: &VopNode, parent: &VopNode) -> BTreeMap<String, Connection> {
    let outgoing = network
        .nodes
        .iter()
        .flat_map(|dest| dest.inputs.iter().map(move |input| (dest, input)))
        .filter(|(_, input)| input.source == node.name);

    let mut connections = BTreeMap::new();
    for (i, (dest, input)) in outgoing.enumerate() {
        if dest.name != parent.name {
            continue;
        }
        connections.insert(format!("connection_{}", i), wire(network, node, dest, input));
    }
    connections
}

fn wire(network: &VopNetwork, source: &VopNode, dest: &VopNode, input: &VopInput) -> Connection {
    let source_output = input
        .source_output
        .clone()
        .unwrap_or_else(|| source.output_name(input.source_output_index));
    let dest_input = dest
        .input_name(input)
        .unwrap_or_else(|| format!("input{}", input.index.unwrap_or(0)));
    Connection {
        input: port(network, source, input.source_output_index.or(Some(0)), source_output),
        output: port(network, dest, input.index, dest_input),
    }
}

fn output_connection(
    network: &VopNetwork,
    output: &VopNode,
    input: &VopInput,
    source: &VopNode,
) -> OutputConnection {
    let conn = wire(network, source, output, input);
    OutputConnection {
        node_name: output.name.clone(),
        node_path: network.node_path(&output.name),
        connected_node_name: source.name.clone(),
        connected_node_path: network.node_path(&source.name),
        connected_input_index: input.source_output_index.or(Some(0)),
        connected_input_name: Some(conn.output.parm_name),
        connected_output_name: Some(conn.input.parm_name),
    }
}

/// Output node whose input 0 is the surface and input 1 the displacement.
fn indexed_output_nodes(network: &VopNetwork, output_type: &str, renderer: Renderer) -> Result<OutputNodes> {
    let output = network
        .nodes
        .iter()
        .find(|n| n.node_type == output_type)
        .ok_or_else(|| Error::NoOutputNode(renderer.label().to_string()))?;

    let mut outputs = OutputNodes::new();
    for input in &output.inputs {
        let kind = match (input.index, output.input_name(input).as_deref()) {
            (Some(0), _) | (None, Some("surface")) => "surface",
            (Some(1), _) | (None, Some("displacement")) => "displacement",
            _ => continue,
        };
        let Some(source) = network.node(&input.source) else {
            warn!("{}: output input from missing node '{}'", output.name, input.source);
            continue;
        };
        outputs.insert(kind.to_string(), output_connection(network, output, input, source));
    }
    Ok(outputs)
}

fn collect_names<'a>(node: &'a TraversedNode, names: &mut BTreeSet<&'a str>) {
    names.insert(node.node_name.as_str());
    for child in &node.children_list {
        collect_names(child, names);
    }
}

/// Subnet connectors named by their `parmname` parm.
fn connector_output_nodes(network: &VopNetwork) -> OutputNodes {
    let connector_type = usd::vop_output_node_type(Renderer::Mtlx).unwrap_or("subnetconnector");
    let mut outputs = OutputNodes::new();
    for connector in network.nodes.iter().filter(|n| n.node_type == connector_type) {
        let Some(kind) = connector.parm("parmname").and_then(|v| v.as_str()) else {
            continue;
        };
        if kind != "surface" && kind != "displacement" {
            continue;
        }
        // The last wire into the connector wins.
        let Some(input) = connector.inputs.last() else {
            warn!("output connector '{}' has no input, skipping", connector.name);
            continue;
        };
        let Some(source) = network.node(&input.source) else {
            warn!("{}: input from missing node '{}'", connector.name, input.source);
            continue;
        };
        outputs.insert(kind.to_string(), output_connection(network, connector, input, source));
    }
    outputs
}

fn principled_output_nodes(network: &VopNetwork) -> OutputNodes {
    let mut outputs = OutputNodes::new();
    outputs.insert(
        "surface".to_string(),
        OutputConnection {
            node_name: "OUT_material".to_string(),
            node_path: network.node_path("OUT_material"),
            connected_node_name: "standard_surface".to_string(),
            connected_node_path: network.node_path("standard_surface"),
            connected_input_index: Some(0),
            connected_input_name: Some("surface".to_string()),
            connected_output_name: Some("shader".to_string()),
        },
    );
    outputs
}

/// One-surface tree standing in for a principled shader, plus an image when
/// the base color is textured.
fn principled_entry(network: &VopNetwork) -> NodeTree {
    let shader = VopNode {
        parms: network.parms.clone(),
        ..VopNode::new("standard_surface", &network.node_type)
    };
    let surface_path = network.node_path("standard_surface");
    let out_path = network.node_path("OUT_material");

    let mut surface = TraversedNode::leaf("standard_surface", &surface_path, &network.node_type);
    surface.node_parms = NodeParms::Flat(raw_parms(&shader));
    surface.connections.insert(
        "connection_0".to_string(),
        Connection {
            input: PortRef {
                node_name: "standard_surface".to_string(),
                node_path: surface_path.clone(),
                node_type: Some(network.node_type.clone()),
                node_index: Some(0),
                parm_name: "shader".to_string(),
            },
            output: PortRef {
                node_name: "OUT_material".to_string(),
                node_path: out_path.clone(),
                node_type: Some("arnold_material".to_string()),
                node_index: Some(0),
                parm_name: "surface".to_string(),
            },
        },
    );

    let textured = network
        .parms
        .get("basecolor_useTexture")
        .and_then(|v| ParamValue::try_from(v.clone()).ok())
        .is_some_and(|v| v.is_truthy());
    if textured {
        let image_path = network.node_path("image_diffuse");
        let texture = network
            .parms
            .get("basecolor_texture")
            .and_then(|v| ParamValue::try_from(v.clone()).ok());
        let mut image = TraversedNode::leaf("image_diffuse", &image_path, "arnold::image");
        image.node_parms = NodeParms::Flat(vec![RawParm::new("filename", texture)]);
        image.connections.insert(
            "connection_0".to_string(),
            Connection {
                input: PortRef {
                    node_name: "image_diffuse".to_string(),
                    node_path: image_path,
                    node_type: Some("arnold::image".to_string()),
                    node_index: Some(0),
                    parm_name: "rgba".to_string(),
                },
                output: PortRef {
                    node_name: "standard_surface".to_string(),
                    node_path: surface_path.clone(),
                    node_type: Some(network.node_type.clone()),
                    node_index: Some(1),
                    parm_name: "basecolor".to_string(),
                },
            },
        );
        surface.children_list.push(image);
    }

    let mut out = TraversedNode::leaf("OUT_material", &out_path, "arnold_material");
    out.is_output_node = true;
    out.output_type = Some("surface".to_string());
    out.children_list.push(surface);

    let mut tree = NodeTree::new();
    tree.insert(out_path, out);
    tree
}
