//! In-memory stage: path-keyed prims with authored child order.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::material::{widen, ParamValue};
use crate::util::{Error, Result};

/// Relationship the material binding lives on.
pub const MATERIAL_BINDING: &str = "material:binding";
/// API schema applied to prims carrying a binding.
pub const BINDING_API: &str = "MaterialBindingAPI";

const MAX_CONNECTION_HOPS: usize = 64;

/// Prim specifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Specifier {
    #[default]
    Def,
    Over,
    Class,
}

impl Specifier {
    pub fn keyword(&self) -> &'static str {
        match self {
            Specifier::Def => "def",
            Specifier::Over => "over",
            Specifier::Class => "class",
        }
    }
}

impl fmt::Display for Specifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// List-op prefix on metadata and relationships (`prepend rel ...`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListOp {
    Prepend,
    Append,
    Add,
    Delete,
    Reorder,
}

impl ListOp {
    pub fn keyword(&self) -> &'static str {
        match self {
            ListOp::Prepend => "prepend",
            ListOp::Append => "append",
            ListOp::Add => "add",
            ListOp::Delete => "delete",
            ListOp::Reorder => "reorder",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "prepend" => Some(ListOp::Prepend),
            "append" => Some(ListOp::Append),
            "add" => Some(ListOp::Add),
            "delete" => Some(ListOp::Delete),
            "reorder" => Some(ListOp::Reorder),
            _ => None,
        }
    }
}

/// Authored value.
#[derive(Clone, Debug, PartialEq)]
pub enum UsdValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Token(String),
    Asset(String),
    Path(String),
    Tuple(Vec<UsdValue>),
    Array(Vec<UsdValue>),
    /// `None`: the opinion is blocked.
    Blocked,
}

impl UsdValue {
    /// Coerce a parsed value to the declared type.
    ///
    /// USDA does not distinguish tokens from strings or `1` from `1.0`
    /// syntactically, so the attribute type decides.
    pub fn retype(self, type_name: &str) -> Self {
        let scalar = type_name.trim_end_matches("[]");
        match self {
            UsdValue::Array(items) if type_name.ends_with("[]") => {
                UsdValue::Array(items.into_iter().map(|v| v.retype(scalar)).collect())
            }
            UsdValue::Tuple(items) => UsdValue::Tuple(items.into_iter().map(|v| v.retype(scalar)).collect()),
            UsdValue::String(s) if scalar == "token" => UsdValue::Token(s),
            UsdValue::String(s) if scalar == "asset" => UsdValue::Asset(s),
            UsdValue::Int(i) if scalar == "bool" => UsdValue::Bool(i != 0),
            UsdValue::Int(i) if is_real_type(scalar) => UsdValue::Float(i as f64),
            other => other,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            UsdValue::Float(v) => Some(*v),
            UsdValue::Int(v) => Some(*v as f64),
            UsdValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Text of string-like values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            UsdValue::String(s) | UsdValue::Token(s) | UsdValue::Asset(s) | UsdValue::Path(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to a parameter value. Blocked and nested values have none.
    pub fn to_param(&self, type_name: &str) -> Option<ParamValue> {
        let scalar = type_name.trim_end_matches("[]");
        let color = scalar.starts_with("color");
        match self {
            UsdValue::Bool(b) => Some(ParamValue::Bool(*b)),
            UsdValue::Int(i) => match scalar {
                "float" | "half" => Some(ParamValue::Float(*i as f32)),
                "double" => Some(ParamValue::Double(*i as f64)),
                _ => i32::try_from(*i).ok().map(ParamValue::Int),
            },
            UsdValue::Float(v) if scalar == "double" => Some(ParamValue::Double(*v)),
            UsdValue::Float(v) => Some(ParamValue::Float(*v as f32)),
            UsdValue::String(s) | UsdValue::Token(s) | UsdValue::Asset(s) => Some(ParamValue::String(s.clone())),
            UsdValue::Tuple(items) => {
                let v: Option<Vec<f32>> = items.iter().map(|i| i.as_f64().map(|f| f as f32)).collect();
                match (v?.as_slice(), color) {
                    (&[x, y], _) => Some(ParamValue::Vec2(glam::Vec2::new(x, y))),
                    (&[x, y, z], true) => Some(ParamValue::Color3(glam::Vec3::new(x, y, z))),
                    (&[x, y, z], false) => Some(ParamValue::Vec3(glam::Vec3::new(x, y, z))),
                    (&[x, y, z, w], true) => Some(ParamValue::Color4(glam::Vec4::new(x, y, z, w))),
                    (&[x, y, z, w], false) => Some(ParamValue::Vec4(glam::Vec4::new(x, y, z, w))),
                    _ => None,
                }
            }
            UsdValue::Array(items) => array_param(items),
            UsdValue::Path(_) | UsdValue::Blocked => None,
        }
    }

    /// Convert a parameter value, returning the USD type name with it.
    pub fn from_param(value: &ParamValue) -> (&'static str, UsdValue) {
        let reals = |v: &[f32]| UsdValue::Tuple(v.iter().map(|f| UsdValue::Float(widen(*f))).collect());
        let usd = match value {
            ParamValue::Bool(b) => UsdValue::Bool(*b),
            ParamValue::Int(i) => UsdValue::Int(*i as i64),
            ParamValue::Float(f) => UsdValue::Float(widen(*f)),
            ParamValue::Double(d) => UsdValue::Float(*d),
            ParamValue::String(s) => UsdValue::String(s.clone()),
            ParamValue::Vec2(v) => reals(&v.to_array()),
            ParamValue::Vec3(v) | ParamValue::Color3(v) => reals(&v.to_array()),
            ParamValue::Vec4(v) | ParamValue::Color4(v) => reals(&v.to_array()),
            ParamValue::FloatArray(v) => UsdValue::Array(v.iter().map(|f| UsdValue::Float(widen(*f))).collect()),
            ParamValue::IntArray(v) => UsdValue::Array(v.iter().map(|i| UsdValue::Int(*i as i64)).collect()),
            ParamValue::StringArray(v) => UsdValue::Array(v.iter().cloned().map(UsdValue::String).collect()),
        };
        (value.usd_type_name(), usd)
    }
}

fn is_real_type(scalar: &str) -> bool {
    ["float", "double", "half", "color", "vector", "normal", "point", "texCoord", "quat", "matrix"]
        .iter()
        .any(|p| scalar.starts_with(p))
}

fn array_param(items: &[UsdValue]) -> Option<ParamValue> {
    if items.iter().all(|i| matches!(i, UsdValue::Int(_))) {
        let ints = items
            .iter()
            .filter_map(|i| match i {
                UsdValue::Int(v) => i32::try_from(*v).ok(),
                _ => None,
            })
            .collect();
        return Some(ParamValue::IntArray(ints));
    }
    if let Some(floats) = items.iter().map(|i| i.as_f64().map(|f| f as f32)).collect::<Option<Vec<_>>>() {
        return Some(ParamValue::FloatArray(floats));
    }
    items
        .iter()
        .map(|i| i.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .map(ParamValue::StringArray)
}

/// Metadata entry on the layer, a prim or an attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadatum {
    pub list_op: Option<ListOp>,
    pub name: String,
    pub value: UsdValue,
}

/// Attribute spec. `name` carries its namespace (`inputs:file`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    pub custom: bool,
    pub uniform: bool,
    pub value: Option<UsdValue>,
    /// Connection targets as `prim.property` paths.
    pub connections: Vec<String>,
    pub metadata: Vec<Metadatum>,
}

impl Attribute {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: UsdValue) -> Self {
        self.value = Some(value);
        self
    }

    /// First connection target split into prim path and property name.
    pub fn connection_source(&self) -> Option<(&str, &str)> {
        let target = self.connections.first()?;
        match split_property_path(target) {
            (prim, Some(prop)) => Some((prim, prop)),
            _ => None,
        }
    }
}

/// Relationship spec.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Relationship {
    pub name: String,
    pub custom: bool,
    pub list_op: Option<ListOp>,
    pub targets: Vec<String>,
}

/// Prim spec. Children are stored by name in authored order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Prim {
    pub path: String,
    pub specifier: Specifier,
    pub type_name: Option<String>,
    pub metadata: Vec<Metadatum>,
    pub attributes: Vec<Attribute>,
    pub relationships: Vec<Relationship>,
    pub children: Vec<String>,
}

impl Prim {
    pub fn new(path: &str, type_name: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            type_name: type_name.map(str::to_string),
            ..Default::default()
        }
    }

    /// Last path element.
    pub fn name(&self) -> &str {
        prim_name(&self.path)
    }

    pub fn is_a(&self, type_name: &str) -> bool {
        self.type_name.as_deref() == Some(type_name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Replace an attribute of the same name, or append it.
    pub fn set_attribute(&mut self, attr: Attribute) {
        match self.attribute_mut(&attr.name) {
            Some(existing) => *existing = attr,
            None => self.attributes.push(attr),
        }
    }

    /// Get or declare an attribute, keeping anything already authored.
    pub fn ensure_attribute(&mut self, name: &str, type_name: &str) -> &mut Attribute {
        let index = match self.attributes.iter().position(|a| a.name == name) {
            Some(i) => i,
            None => {
                self.attributes.push(Attribute::new(name, type_name));
                self.attributes.len() - 1
            }
        };
        &mut self.attributes[index]
    }

    pub fn relationship(&self, name: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == name)
    }

    pub fn set_relationship(&mut self, rel: Relationship) {
        match self.relationships.iter_mut().find(|r| r.name == rel.name) {
            Some(existing) => *existing = rel,
            None => self.relationships.push(rel),
        }
    }

    /// `inputs:<name>` attribute.
    pub fn input(&self, name: &str) -> Option<&Attribute> {
        self.attribute(&format!("inputs:{}", name))
    }

    /// `inputs:*` attributes with the namespace stripped, in authored order.
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.namespaced("inputs:")
    }

    /// `outputs:*` attributes with the namespace stripped, in authored order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.namespaced("outputs:")
    }

    fn namespaced<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a Attribute)> {
        self.attributes
            .iter()
            .filter_map(move |a| a.name.strip_prefix(prefix).map(|n| (n, a)))
    }

    /// Shader identifier.
    pub fn info_id(&self) -> Option<&str> {
        self.attribute("info:id")?.value.as_ref()?.as_str()
    }

    pub fn metadatum(&self, name: &str) -> Option<&Metadatum> {
        self.metadata.iter().find(|m| m.name == name)
    }

    /// Add an API schema name to the prepended `apiSchemas` list.
    pub fn apply_api_schema(&mut self, schema: &str) {
        let entry = match self.metadata.iter_mut().find(|m| m.name == "apiSchemas") {
            Some(m) => m,
            None => {
                self.metadata.push(Metadatum {
                    list_op: Some(ListOp::Prepend),
                    name: "apiSchemas".to_string(),
                    value: UsdValue::Array(Vec::new()),
                });
                let last = self.metadata.len() - 1;
                &mut self.metadata[last]
            }
        };
        match &mut entry.value {
            UsdValue::Array(items) => {
                if !items.iter().any(|i| i.as_str() == Some(schema)) {
                    items.push(UsdValue::String(schema.to_string()));
                }
            }
            other => *other = UsdValue::Array(vec![UsdValue::String(schema.to_string())]),
        }
    }
}

// ============================================================================
// Paths
// ============================================================================

/// Check an absolute prim path (`/a/b`), no property part.
pub fn validate_path(path: &str) -> Result<()> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err(Error::invalid(path));
    };
    if rest.is_empty() {
        return Ok(());
    }
    if rest.split('/').all(is_identifier) {
        Ok(())
    } else {
        Err(Error::invalid(path))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parent prim path; `None` for the pseudo-root.
pub fn parent_path(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

/// Last element of a prim path.
pub fn prim_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a parent path and child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", parent.trim_end_matches('/'), name)
    }
}

/// Split `/a/b.outputs:rgb` into the prim path and property name.
pub fn split_property_path(target: &str) -> (&str, Option<&str>) {
    let last_slash = target.rfind('/').unwrap_or(0);
    match target[last_slash..].find('.') {
        Some(dot) => {
            let i = last_slash + dot;
            (&target[..i], Some(&target[i + 1..]))
        }
        None => (target, None),
    }
}

/// Make a valid prim name: invalid characters become `_`, a leading
/// digit gets a `_` prefix.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

// ============================================================================
// Stage
// ============================================================================

/// A single-layer stage.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stage {
    pub default_prim: Option<String>,
    pub up_axis: Option<String>,
    /// Layer metadata other than `defaultPrim` and `upAxis`.
    pub metadata: Vec<Metadatum>,
    prims: BTreeMap<String, Prim>,
    root_prims: Vec<String>,
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.usda` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        super::parse_usda(&text)
    }

    /// Write the stage as `.usda`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, super::write_usda(self))?;
        Ok(())
    }

    pub fn prim(&self, path: &str) -> Option<&Prim> {
        self.prims.get(path)
    }

    pub fn prim_mut(&mut self, path: &str) -> Option<&mut Prim> {
        self.prims.get_mut(path)
    }

    pub fn has_prim(&self, path: &str) -> bool {
        self.prims.contains_key(path)
    }

    /// Root prim names in authored order.
    pub fn root_prims(&self) -> &[String] {
        &self.root_prims
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }

    /// Define a prim, creating untyped ancestors as needed.
    ///
    /// An existing prim becomes `def`; its type is replaced only when one is
    /// given.
    pub fn define_prim(&mut self, path: &str, type_name: Option<&str>) -> Result<&mut Prim> {
        validate_path(path)?;
        if path == "/" {
            return Err(Error::invalid(path));
        }
        self.insert_spec(path, Specifier::Def, type_name)
    }

    /// Add a spec with an explicit specifier. Used by the parser.
    pub(crate) fn insert_spec(&mut self, path: &str, specifier: Specifier, type_name: Option<&str>) -> Result<&mut Prim> {
        if !self.prims.contains_key(path) {
            let parent = parent_path(path).ok_or_else(|| Error::invalid(path))?;
            if parent != "/" && !self.prims.contains_key(parent) {
                self.insert_spec(parent, Specifier::Def, None)?;
            }
            let name = prim_name(path).to_string();
            if parent == "/" {
                self.root_prims.push(name);
            } else if let Some(p) = self.prims.get_mut(parent) {
                p.children.push(name);
            }
            self.prims.insert(path.to_string(), Prim::new(path, None));
        }
        let prim = self.prims.get_mut(path).ok_or_else(|| Error::PrimNotFound(path.to_string()))?;
        prim.specifier = specifier;
        if let Some(t) = type_name {
            prim.type_name = Some(t.to_string());
        }
        Ok(prim)
    }

    /// Children of a prim (`/` for root prims), in authored order.
    pub fn children(&self, path: &str) -> Vec<&Prim> {
        let names = if path == "/" {
            &self.root_prims
        } else {
            match self.prims.get(path) {
                Some(p) => &p.children,
                None => return Vec::new(),
            }
        };
        names
            .iter()
            .filter_map(|n| self.prims.get(&join_path(path, n)))
            .collect()
    }

    /// All prims depth-first in authored order.
    pub fn traverse(&self) -> Vec<&Prim> {
        self.descendants("/")
    }

    /// Prims below `path` depth-first, `path` itself excluded.
    pub fn descendants(&self, path: &str) -> Vec<&Prim> {
        let mut out = Vec::new();
        let mut stack: Vec<&Prim> = self.children(path).into_iter().rev().collect();
        while let Some(prim) = stack.pop() {
            out.push(prim);
            stack.extend(self.children(&prim.path).into_iter().rev());
        }
        out
    }

    /// Prims of a given type, depth-first.
    pub fn prims_of_type(&self, type_name: &str) -> Vec<&Prim> {
        self.traverse().into_iter().filter(|p| p.is_a(type_name)).collect()
    }

    /// Remove a prim and its subtree.
    pub fn remove_prim(&mut self, path: &str) -> Result<Prim> {
        if !self.prims.contains_key(path) {
            return Err(Error::PrimNotFound(path.to_string()));
        }
        let doomed: Vec<String> = self.descendants(path).iter().map(|p| p.path.clone()).collect();
        for p in doomed {
            self.prims.remove(&p);
        }
        let name = prim_name(path).to_string();
        match parent_path(path) {
            Some("/") => self.root_prims.retain(|n| *n != name),
            Some(parent) => {
                if let Some(p) = self.prims.get_mut(parent) {
                    p.children.retain(|n| *n != name);
                }
            }
            None => {}
        }
        self.prims.remove(path).ok_or_else(|| Error::PrimNotFound(path.to_string()))
    }

    /// Author an attribute on an existing prim.
    pub fn set_attribute(&mut self, path: &str, attr: Attribute) -> Result<()> {
        self.prims
            .get_mut(path)
            .ok_or_else(|| Error::PrimNotFound(path.to_string()))?
            .set_attribute(attr);
        Ok(())
    }

    /// Connect `prim.attr` to `source_prim.source_prop`, declaring the
    /// attribute if needed. Existing values stay.
    pub fn connect(&mut self, path: &str, attr: &str, type_name: &str, source_prim: &str, source_prop: &str) -> Result<()> {
        let prim = self
            .prims
            .get_mut(path)
            .ok_or_else(|| Error::PrimNotFound(path.to_string()))?;
        prim.ensure_attribute(attr, type_name).connections = vec![format!("{}.{}", source_prim, source_prop)];
        Ok(())
    }

    /// Material bound to a prim or its nearest bound ancestor.
    pub fn bound_material(&self, path: &str) -> Option<&str> {
        let mut current = Some(path);
        while let Some(p) = current {
            let target = self
                .prims
                .get(p)
                .and_then(|prim| prim.relationship(MATERIAL_BINDING))
                .and_then(|rel| rel.targets.first());
            if let Some(target) = target {
                return Some(target);
            }
            current = parent_path(p).filter(|p| *p != "/");
        }
        None
    }

    /// Bind a material directly to a prim.
    pub fn bind_material(&mut self, path: &str, material: &str) -> Result<()> {
        if !self.prims.contains_key(material) {
            return Err(Error::PrimNotFound(material.to_string()));
        }
        let prim = self
            .prims
            .get_mut(path)
            .ok_or_else(|| Error::PrimNotFound(path.to_string()))?;
        prim.apply_api_schema(BINDING_API);
        prim.set_relationship(Relationship {
            name: MATERIAL_BINDING.to_string(),
            targets: vec![material.to_string()],
            ..Default::default()
        });
        Ok(())
    }

    /// Shader and output name driving an attribute.
    ///
    /// Looks through node-graph and material interface attributes until it
    /// reaches a shader.
    pub fn connected_source(&self, attr: &Attribute) -> Option<(&Prim, String)> {
        let (mut path, mut prop) = attr.connection_source()?;
        for _ in 0..MAX_CONNECTION_HOPS {
            let prim = self.prim(path)?;
            if prim.is_a("Shader") || prim.info_id().is_some() {
                let output = prop.strip_prefix("outputs:").unwrap_or(prop);
                return Some((prim, output.to_string()));
            }
            (path, prop) = prim.attribute(prop)?.connection_source()?;
        }
        None
    }

    /// Value of an attribute, following connections to interface values.
    pub fn resolved_value<'a>(&'a self, attr: &'a Attribute) -> Option<&'a UsdValue> {
        let mut current = attr;
        for _ in 0..MAX_CONNECTION_HOPS {
            let Some((path, prop)) = current.connection_source() else {
                return current.value.as_ref();
            };
            current = self.prim(path)?.attribute(prop)?;
        }
        None
    }

    /// Child name under `parent` that is not taken yet.
    pub fn unique_child_name(&self, parent: &str, base: &str) -> String {
        let base = sanitize_name(base);
        if !self.has_prim(&join_path(parent, &base)) {
            return base;
        }
        (1..)
            .map(|i| format!("{}{}", base, i))
            .find(|n| !self.has_prim(&join_path(parent, n)))
            .unwrap_or(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert!(validate_path("/materials/wood").is_ok());
        assert!(validate_path("materials").is_err());
        assert!(validate_path("/a/1b").is_err());
        assert_eq!(parent_path("/a/b"), Some("/a"));
        assert_eq!(parent_path("/a"), Some("/"));
        assert_eq!(parent_path("/"), None);
        assert_eq!(prim_name("/a/b"), "b");
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(
            split_property_path("/m/tex.outputs:rgb"),
            ("/m/tex", Some("outputs:rgb"))
        );
        assert_eq!(split_property_path("/m/tex"), ("/m/tex", None));
        assert_eq!(sanitize_name("my mat.01"), "my_mat_01");
        assert_eq!(sanitize_name("1st"), "_1st");
    }

    #[test]
    fn test_define_creates_ancestors() {
        let mut stage = Stage::new();
        stage.define_prim("/World/Looks/wood", Some("Material")).unwrap();
        assert!(stage.prim("/World").unwrap().type_name.is_none());
        assert_eq!(stage.root_prims(), &["World".to_string()]);
        assert_eq!(stage.children("/World/Looks")[0].name(), "wood");

        // Redefining keeps the type unless one is given.
        stage.define_prim("/World/Looks/wood", None).unwrap();
        assert!(stage.prim("/World/Looks/wood").unwrap().is_a("Material"));
        assert!(stage.define_prim("/", None).is_err());
    }

    #[test]
    fn test_traverse_order_and_remove() {
        let mut stage = Stage::new();
        for p in ["/b", "/a", "/a/z", "/a/y", "/c"] {
            stage.define_prim(p, Some("Xform")).unwrap();
        }
        let order: Vec<_> = stage.traverse().iter().map(|p| p.path.as_str()).collect();
        assert_eq!(order, vec!["/b", "/a", "/a/z", "/a/y", "/c"]);

        stage.remove_prim("/a").unwrap();
        assert!(!stage.has_prim("/a/z"));
        assert_eq!(stage.root_prims(), &["b".to_string(), "c".to_string()]);
        assert!(matches!(stage.remove_prim("/a"), Err(Error::PrimNotFound(_))));
    }

    #[test]
    fn test_binding_inherited() {
        let mut stage = Stage::new();
        stage.define_prim("/materials/wood", Some("Material")).unwrap();
        stage.define_prim("/World/geo/mesh", Some("Mesh")).unwrap();
        stage.bind_material("/World/geo", "/materials/wood").unwrap();

        assert_eq!(stage.bound_material("/World/geo/mesh"), Some("/materials/wood"));
        assert_eq!(stage.bound_material("/World"), None);
        let schemas = &stage.prim("/World/geo").unwrap().metadatum("apiSchemas").unwrap().value;
        assert_eq!(schemas, &UsdValue::Array(vec![UsdValue::String(BINDING_API.into())]));
        assert!(stage.bind_material("/World", "/materials/none").is_err());
    }

    #[test]
    fn test_connect_keeps_value() {
        let mut stage = Stage::new();
        stage.define_prim("/m/surf", Some("Shader")).unwrap();
        stage
            .set_attribute("/m/surf", Attribute::new("inputs:base", "float").with_value(UsdValue::Float(1.0)))
            .unwrap();
        stage.connect("/m/surf", "inputs:base", "float", "/m/tex", "outputs:r").unwrap();
        let attr = stage.prim("/m/surf").unwrap().input("base").unwrap();
        assert_eq!(attr.value, Some(UsdValue::Float(1.0)));
        assert_eq!(attr.connection_source(), Some(("/m/tex", "outputs:r")));
    }

    #[test]
    fn test_value_conversions() {
        let v = UsdValue::Tuple(vec![UsdValue::Int(1), UsdValue::Float(0.5), UsdValue::Int(0)]).retype("color3f");
        assert_eq!(v.to_param("color3f"), Some(ParamValue::Color3(glam::Vec3::new(1.0, 0.5, 0.0))));
        assert_eq!(UsdValue::String("a".into()).retype("token"), UsdValue::Token("a".into()));
        assert_eq!(UsdValue::Int(1).retype("bool"), UsdValue::Bool(true));
        assert_eq!(UsdValue::Blocked.to_param("float"), None);

        let (ty, v) = UsdValue::from_param(&ParamValue::Float(0.8));
        assert_eq!(ty, "float");
        assert_eq!(v, UsdValue::Float(0.8));
    }

    #[test]
    fn test_unique_child_name() {
        let mut stage = Stage::new();
        stage.define_prim("/materials/wood", None).unwrap();
        assert_eq!(stage.unique_child_name("/materials", "wood"), "wood1");
        assert_eq!(stage.unique_child_name("/materials", "stone"), "stone");
    }
}
