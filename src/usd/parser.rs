//! USDA text parser.

use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use tracing::trace;

use super::stage::{join_path, validate_path, Attribute, ListOp, Metadatum, Relationship, Specifier, Stage, UsdValue};
use crate::util::{Error, Result};

#[derive(Parser)]
#[grammar = "usd/usda.pest"]
struct UsdaParser;

/// Parse a USDA layer into a [`Stage`].
pub fn parse_usda(text: &str) -> Result<Stage> {
    let mut pairs = UsdaParser::parse(Rule::layer, text).map_err(grammar_error)?;
    let layer = pairs.next().ok_or_else(|| Error::UsdaParse {
        line: 1,
        column: 1,
        message: "empty layer".into(),
    })?;

    let mut stage = Stage::new();
    for pair in layer.into_inner() {
        match pair.as_rule() {
            Rule::metadata_block => {
                for m in parse_metadata(pair)? {
                    match (m.name.as_str(), m.value.as_str()) {
                        ("defaultPrim", Some(v)) => stage.default_prim = Some(v.to_string()),
                        ("upAxis", Some(v)) => stage.up_axis = Some(v.to_string()),
                        _ => stage.metadata.push(m),
                    }
                }
            }
            Rule::prim_spec => parse_prim(&mut stage, "/", pair)?,
            _ => {}
        }
    }
    Ok(stage)
}

fn grammar_error(err: pest::error::Error<Rule>) -> Error {
    let (line, column) = match err.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    Error::UsdaParse {
        line,
        column,
        message: err.variant.message().to_string(),
    }
}

fn error_at(pair: &Pair<Rule>, message: impl Into<String>) -> Error {
    let (line, column) = pair.as_span().start_pos().line_col();
    Error::UsdaParse {
        line,
        column,
        message: message.into(),
    }
}

fn parse_prim(stage: &mut Stage, parent: &str, pair: Pair<Rule>) -> Result<()> {
    let mut specifier = Specifier::Def;
    let mut type_name = None;
    let mut path = None;

    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::specifier => {
                specifier = match item.as_str() {
                    "over" => Specifier::Over,
                    "class" => Specifier::Class,
                    _ => Specifier::Def,
                };
            }
            Rule::prim_type => type_name = Some(item.as_str().to_string()),
            Rule::string => {
                let p = join_path(parent, &unquote(item.as_str()));
                validate_path(&p).map_err(|_| error_at(&item, format!("invalid prim name in '{}'", p)))?;
                stage.insert_spec(&p, specifier, type_name.as_deref())?;
                path = Some(p);
            }
            _ => {
                let Some(path) = path.as_deref() else {
                    return Err(error_at(&item, "prim body before prim name"));
                };
                parse_prim_item(stage, path, item)?;
            }
        }
    }
    Ok(())
}

fn parse_prim_item(stage: &mut Stage, path: &str, item: Pair<Rule>) -> Result<()> {
    match item.as_rule() {
        Rule::prim_spec => parse_prim(stage, path, item),
        Rule::metadata_block => {
            let metadata = parse_metadata(item)?;
            prim_at(stage, path)?.metadata.extend(metadata);
            Ok(())
        }
        Rule::attribute => {
            let attr = parse_attribute(item)?;
            let prim = prim_at(stage, path)?;
            // A value line and a `.connect` line may author the same attribute.
            match prim.attribute_mut(&attr.name) {
                Some(existing) => {
                    if attr.value.is_some() {
                        existing.value = attr.value;
                    }
                    if !attr.connections.is_empty() {
                        existing.connections = attr.connections;
                    }
                    existing.metadata.extend(attr.metadata);
                }
                None => prim.attributes.push(attr),
            }
            Ok(())
        }
        Rule::relationship => {
            let rel = parse_relationship(item)?;
            prim_at(stage, path)?.set_relationship(rel);
            Ok(())
        }
        _ => Err(error_at(&item, format!("unexpected {:?}", item.as_rule()))),
    }
}

fn prim_at<'a>(stage: &'a mut Stage, path: &str) -> Result<&'a mut super::Prim> {
    stage.prim_mut(path).ok_or_else(|| Error::PrimNotFound(path.to_string()))
}

fn parse_attribute(pair: Pair<Rule>) -> Result<Attribute> {
    let mut attr = Attribute::default();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::custom_kw => attr.custom = true,
            Rule::uniform_kw => attr.uniform = true,
            Rule::type_name => attr.type_name = item.as_str().to_string(),
            Rule::prop_name => attr.name = item.as_str().to_string(),
            Rule::value_assign => {
                if let Some(v) = first_value(item)? {
                    attr.value = Some(v.retype(&attr.type_name));
                }
            }
            Rule::connect_assign => {
                if let Some(v) = first_value(item)? {
                    attr.connections = target_paths(v);
                }
            }
            Rule::metadata_block => attr.metadata = parse_metadata(item)?,
            _ => {}
        }
    }
    Ok(attr)
}

fn parse_relationship(pair: Pair<Rule>) -> Result<Relationship> {
    let mut rel = Relationship::default();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::custom_kw => rel.custom = true,
            Rule::list_op => rel.list_op = ListOp::from_keyword(item.as_str()),
            Rule::prop_name => rel.name = item.as_str().to_string(),
            Rule::metadata_block => trace!("skipping relationship metadata on '{}'", rel.name),
            Rule::rel_kw => {}
            _ => {
                if let Some(v) = parse_value(item)? {
                    rel.targets = target_paths(v);
                }
            }
        }
    }
    Ok(rel)
}

fn parse_metadata(pair: Pair<Rule>) -> Result<Vec<Metadatum>> {
    let mut out = Vec::new();
    for entry in pair.into_inner() {
        let mut list_op = None;
        let mut name = None;
        for item in entry.into_inner() {
            match item.as_rule() {
                Rule::string if name.is_none() => out.push(Metadatum {
                    list_op: None,
                    name: "doc".to_string(),
                    value: UsdValue::String(unquote(item.as_str())),
                }),
                Rule::list_op => list_op = ListOp::from_keyword(item.as_str()),
                Rule::identifier => name = Some(item.as_str().to_string()),
                _ => match parse_value(item)? {
                    Some(value) => out.push(Metadatum {
                        list_op,
                        name: name.clone().unwrap_or_default(),
                        value,
                    }),
                    None => trace!("skipping dictionary metadata '{}'", name.as_deref().unwrap_or("")),
                },
            }
        }
    }
    Ok(out)
}

fn first_value(pair: Pair<Rule>) -> Result<Option<UsdValue>> {
    let span = pair.clone();
    let item = pair.into_inner().next().ok_or_else(|| error_at(&span, "missing value"))?;
    parse_value(item)
}

/// Parse a value; dictionaries yield `None`.
fn parse_value(pair: Pair<Rule>) -> Result<Option<UsdValue>> {
    let text = pair.as_str();
    let value = match pair.as_rule() {
        Rule::none => UsdValue::Blocked,
        Rule::boolean => UsdValue::Bool(text == "true"),
        Rule::number => parse_number(text).ok_or_else(|| error_at(&pair, format!("bad number '{}'", text)))?,
        Rule::string => UsdValue::String(unquote(text)),
        Rule::asset => UsdValue::Asset(strip(text, 1).to_string()),
        Rule::path_ref => UsdValue::Path(strip(text, 1).to_string()),
        Rule::bare_token => UsdValue::Token(text.to_string()),
        Rule::tuple | Rule::array => {
            let is_tuple = pair.as_rule() == Rule::tuple;
            let mut items = Vec::new();
            for item in pair.into_inner() {
                if let Some(v) = parse_value(item)? {
                    items.push(v);
                }
            }
            if is_tuple {
                UsdValue::Tuple(items)
            } else {
                UsdValue::Array(items)
            }
        }
        Rule::dictionary => return Ok(None),
        other => return Err(error_at(&pair, format!("unexpected {:?}", other))),
    };
    Ok(Some(value))
}

fn parse_number(text: &str) -> Option<UsdValue> {
    let is_real = text.contains(['.', 'e', 'E', 'n', 'i']);
    if !is_real {
        if let Ok(i) = text.parse::<i64>() {
            return Some(UsdValue::Int(i));
        }
    }
    text.parse::<f64>().ok().map(UsdValue::Float)
}

/// Connection or relationship targets.
fn target_paths(value: UsdValue) -> Vec<String> {
    match value {
        UsdValue::Path(p) => vec![p],
        UsdValue::Array(items) => items
            .into_iter()
            .filter_map(|v| match v {
                UsdValue::Path(p) => Some(p),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn strip(text: &str, n: usize) -> &str {
    text.get(n..text.len().saturating_sub(n)).unwrap_or("")
}

fn unquote(text: &str) -> String {
    if text.starts_with("\"\"\"") && text.len() >= 6 {
        return strip(text, 3).to_string();
    }
    let inner = strip(text, 1);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADERS: &str = r#"#usda 1.0
(
    defaultPrim = "World"
    upAxis = "Y"
    doc = """Written by hand"""
)

def Xform "World" (
    kind = "component"
)
{
    def Mesh "plane" (
        prepend apiSchemas = ["MaterialBindingAPI"]
    )
    {
        rel material:binding = </World/Looks/wood>
        point3f[] points = [(0, 0, 0), (1, 0, 0), (1, 1, 0)]
    }

    def Scope "Looks"
    {
        def Material "wood"
        {
            token outputs:surface.connect = </World/Looks/wood/preview.outputs:surface>

            def Shader "preview"
            {
                uniform token info:id = "UsdPreviewSurface"
                color3f inputs:diffuseColor = (0.8, 0.5, 0.25)
                color3f inputs:diffuseColor.connect = </World/Looks/wood/tex.outputs:rgb>
                float inputs:roughness = 1
                token outputs:surface
            }

            def Shader "tex"
            {
                uniform token info:id = "UsdUVTexture"
                asset inputs:file = @./textures/wood_albedo.png@ # comment
                token inputs:wrapS = "repeat"
                float3 outputs:rgb
            }
        }
    }
}
"#;

    #[test]
    fn test_parse_layer() {
        let stage = parse_usda(SHADERS).unwrap();
        assert_eq!(stage.default_prim.as_deref(), Some("World"));
        assert_eq!(stage.up_axis.as_deref(), Some("Y"));
        assert_eq!(stage.metadata[0].name, "doc");

        let preview = stage.prim("/World/Looks/wood/preview").unwrap();
        assert!(preview.is_a("Shader"));
        assert_eq!(preview.info_id(), Some("UsdPreviewSurface"));
        assert!(preview.attribute("info:id").unwrap().uniform);

        let diffuse = preview.input("diffuseColor").unwrap();
        assert_eq!(
            diffuse.value,
            Some(UsdValue::Tuple(vec![
                UsdValue::Float(0.8),
                UsdValue::Float(0.5),
                UsdValue::Float(0.25)
            ]))
        );
        assert_eq!(diffuse.connection_source(), Some(("/World/Looks/wood/tex", "outputs:rgb")));
        assert_eq!(preview.input("roughness").unwrap().value, Some(UsdValue::Float(1.0)));

        let tex = stage.prim("/World/Looks/wood/tex").unwrap();
        assert_eq!(
            tex.input("file").unwrap().value,
            Some(UsdValue::Asset("./textures/wood_albedo.png".into()))
        );
        assert_eq!(tex.input("wrapS").unwrap().value, Some(UsdValue::Token("repeat".into())));

        assert_eq!(stage.bound_material("/World/plane"), Some("/World/Looks/wood"));
        let schemas = stage.prim("/World/plane").unwrap().metadatum("apiSchemas").unwrap();
        assert_eq!(schemas.list_op, Some(ListOp::Prepend));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_usda("#usda 1.0\ndef Xform \"a\"\n{\n    float x = \n}\n").unwrap_err();
        match err {
            Error::UsdaParse { line, .. } => assert!(line >= 4),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(parse_usda("def \"a\" {}"), Err(Error::UsdaParse { line: 1, .. })));
    }

    #[test]
    fn test_over_and_blocked() {
        let stage = parse_usda("#usda 1.0\nover \"a\"\n{\n    custom float x = None\n    int[] y = [1, -2]\n    double z = -1.5e-3\n}\n").unwrap();
        let a = stage.prim("/a").unwrap();
        assert_eq!(a.specifier, Specifier::Over);
        assert!(a.attribute("x").unwrap().custom);
        assert_eq!(a.attribute("x").unwrap().value, Some(UsdValue::Blocked));
        assert_eq!(
            a.attribute("y").unwrap().value,
            Some(UsdValue::Array(vec![UsdValue::Int(1), UsdValue::Int(-2)]))
        );
        assert_eq!(a.attribute("z").unwrap().value, Some(UsdValue::Float(-1.5e-3)));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""a \"b\"\n""#), "a \"b\"\n");
        assert_eq!(unquote("'x'"), "x");
    }
}
