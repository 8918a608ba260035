//! Standardization of traversed networks into the generic model.
//!
//! [`NodeStandardizer`] turns a [`NodeTree`] and its [`OutputNodes`] into
//! [`NodeInfo`]s with generic node types, generic parameter names and generic
//! connection endpoints. Anything without a generic counterpart is dropped
//! with a warning rather than failing the material.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::material::{Connection, MaterialData, NodeInfo, NodeParameter, OutputConnection, OutputKind};
use crate::network::{NodeParms, NodeTree, OutputNodes, TraversedNode};
use crate::taxonomy::{nodes, params, Renderer, SourceType};

/// Result of a standardization pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StandardizedMaterial {
    pub nodes: Vec<NodeInfo>,
    pub outputs: BTreeMap<OutputKind, OutputConnection>,
}

impl StandardizedMaterial {
    /// Wrap into a named [`MaterialData`].
    pub fn into_material(self, name: &str, material_type: Renderer) -> MaterialData {
        MaterialData {
            material_type: Some(material_type),
            nodes: self.nodes,
            output_connections: self.outputs,
            ..MaterialData::new(name)
        }
    }
}

/// Maps renderer-specific nodes onto generic ones.
#[derive(Clone, Copy, Debug)]
pub struct NodeStandardizer {
    material_type: Renderer,
    source_type: SourceType,
}

impl NodeStandardizer {
    pub fn new(material_type: Renderer, source_type: SourceType) -> Self {
        Self {
            material_type,
            source_type,
        }
    }

    pub fn material_type(&self) -> Renderer {
        self.material_type
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    /// Keep the parameters that have a generic name, inputs first.
    pub fn standardize_parameters(&self, node_type: &str, parms: &NodeParms) -> Vec<NodeParameter> {
        if params::param_table(node_type).is_none() {
            warn!("no generic parameter mapping for node type '{}'", node_type);
            return Vec::new();
        }

        let mut unsupported = Vec::new();
        let mut out = Vec::new();
        for parm in parms.ordered() {
            let Some(generic) = params::to_generic_param(node_type, &parm.generic_name) else {
                unsupported.push(parm.generic_name.as_str());
                continue;
            };
            out.push(NodeParameter {
                generic_name: generic.to_string(),
                generic_type: parm.parm_type.clone(),
                direction: parm.direction,
                value: parm.value.clone(),
            });
        }

        if !unsupported.is_empty() {
            debug!("unsupported parameters for '{}': {:?}", node_type, unsupported);
        }
        out
    }

    /// Rename connection endpoints to generic parameter names.
    pub fn standardize_connections(&self, connections: &BTreeMap<String, Connection>) -> BTreeMap<String, Connection> {
        connections
            .iter()
            .map(|(key, conn)| {
                let mut conn = conn.clone();
                for port in [&mut conn.input, &mut conn.output] {
                    let Some(node_type) = port.node_type.as_deref() else {
                        continue;
                    };
                    if params::param_table(node_type).is_none() {
                        warn!("no generic parameter mapping for node type '{}'", node_type);
                        continue;
                    }
                    match params::to_generic_param(node_type, &port.parm_name) {
                        Some(generic) => port.parm_name = generic.to_string(),
                        None => warn!(
                            "no generic name for parameter '{}' on node type '{}'",
                            port.parm_name, node_type
                        ),
                    }
                }
                (key.clone(), conn)
            })
            .collect()
    }

    /// Standardize a single traversed node, without its children.
    pub fn create_node_info(&self, node_path: &str, node: &TraversedNode) -> NodeInfo {
        let generic = nodes::to_generic(self.material_type, self.source_type, &node.node_type);
        if generic.is_none() {
            warn!("no generic type for node type '{}'", node.node_type);
        }

        let mut info = NodeInfo::new(generic, &node.node_name, node_path);
        if !node.node_parms.is_empty() {
            info.parameters = self.standardize_parameters(&node.node_type, &node.node_parms);
        }
        info.connection_info = self.standardize_connections(&node.connections);
        info.is_output_node = node.is_output_node;
        info.output_type = if node.is_output_node {
            node.output_type.clone()
        } else {
            generic.map(|g| g.to_string())
        };
        info.position = node.position;
        info
    }

    /// Standardize a tree recursively, keeping child order.
    pub fn standardize_tree(&self, tree: &NodeTree) -> Vec<NodeInfo> {
        tree.iter()
            .map(|(path, node)| self.standardize_node(path, node))
            .collect()
    }

    fn standardize_node(&self, path: &str, node: &TraversedNode) -> NodeInfo {
        let mut info = self.create_node_info(path, node);
        info.children = node
            .children_list
            .iter()
            .map(|child| self.standardize_node(&child.node_path, child))
            .collect();
        info
    }

    /// Key output connections by [`OutputKind`]. Unknown kinds are dropped.
    pub fn standardize_outputs(&self, outputs: &OutputNodes) -> BTreeMap<OutputKind, OutputConnection> {
        outputs
            .iter()
            .filter_map(|(key, conn)| match key.parse::<OutputKind>() {
                Ok(kind) => Some((kind, conn.clone())),
                Err(_) => {
                    warn!("skipping unknown output '{}'", key);
                    None
                }
            })
            .collect()
    }

    /// Standardize a full traversal.
    #[tracing::instrument(skip_all, fields(material_type = %self.material_type))]
    pub fn run(&self, tree: &NodeTree, outputs: &OutputNodes) -> StandardizedMaterial {
        let nodes = self.standardize_tree(tree);
        let outputs = self.standardize_outputs(outputs);
        debug!("standardized {} root(s), {} output(s)", nodes.len(), outputs.len());
        StandardizedMaterial { nodes, outputs }
    }
}
