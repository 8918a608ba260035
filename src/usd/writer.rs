//! USDA text writer.

use super::stage::{Attribute, Metadatum, Prim, Relationship, Stage, UsdValue};

/// Serialize a stage to USDA text.
pub fn write_usda(stage: &Stage) -> String {
    let mut builder = UsdaBuilder::default();
    builder.build(stage);
    builder.output
}

#[derive(Default)]
struct UsdaBuilder {
    output: String,
    indent: usize,
}

impl UsdaBuilder {
    fn build(&mut self, stage: &Stage) {
        self.write_header(stage);
        for prim in stage.children("/") {
            self.output.push('\n');
            self.write_prim(stage, prim);
        }
    }

    fn write_header(&mut self, stage: &Stage) {
        self.write_line("#usda 1.0");
        if stage.default_prim.is_none() && stage.up_axis.is_none() && stage.metadata.is_empty() {
            return;
        }
        self.write_line("(");
        self.indent += 1;
        if let Some(default_prim) = &stage.default_prim {
            self.write_line(&format!("defaultPrim = \"{}\"", escape_string(default_prim)));
        }
        if let Some(up_axis) = &stage.up_axis {
            self.write_line(&format!("upAxis = \"{}\"", escape_string(up_axis)));
        }
        for m in &stage.metadata {
            self.write_metadatum(m);
        }
        self.indent -= 1;
        self.write_line(")");
    }

    fn write_prim(&mut self, stage: &Stage, prim: &Prim) {
        let mut line = prim.specifier.keyword().to_string();
        if let Some(t) = &prim.type_name {
            line.push(' ');
            line.push_str(t);
        }
        line.push_str(&format!(" \"{}\"", prim.name()));

        if prim.metadata.is_empty() {
            self.write_line(&line);
        } else {
            line.push_str(" (");
            self.write_line(&line);
            self.indent += 1;
            for m in &prim.metadata {
                self.write_metadatum(m);
            }
            self.indent -= 1;
            self.write_line(")");
        }

        self.write_line("{");
        self.indent += 1;
        for rel in &prim.relationships {
            self.write_relationship(rel);
        }
        for attr in &prim.attributes {
            self.write_attribute(attr);
        }
        let children = stage.children(&prim.path);
        for (i, child) in children.iter().enumerate() {
            if i > 0 || !prim.attributes.is_empty() || !prim.relationships.is_empty() {
                self.output.push('\n');
            }
            self.write_prim(stage, child);
        }
        self.indent -= 1;
        self.write_line("}");
    }

    fn write_metadatum(&mut self, m: &Metadatum) {
        if m.name == "doc" {
            if let UsdValue::String(s) = &m.value {
                self.write_line(&format!("doc = \"\"\"{}\"\"\"", s));
                return;
            }
        }
        let prefix = m.list_op.map(|op| format!("{} ", op.keyword())).unwrap_or_default();
        self.write_line(&format!("{}{} = {}", prefix, m.name, format_value(&m.value)));
    }

    fn write_relationship(&mut self, rel: &Relationship) {
        let mut line = String::new();
        if rel.custom {
            line.push_str("custom ");
        }
        if let Some(op) = rel.list_op {
            line.push_str(op.keyword());
            line.push(' ');
        }
        line.push_str("rel ");
        line.push_str(&rel.name);
        match rel.targets.as_slice() {
            [] => {}
            [one] => line.push_str(&format!(" = <{}>", one)),
            many => line.push_str(&format!(" = [{}]", path_list(many))),
        }
        self.write_line(&line);
    }

    fn write_attribute(&mut self, attr: &Attribute) {
        let mut decl = String::new();
        if attr.custom {
            decl.push_str("custom ");
        }
        if attr.uniform {
            decl.push_str("uniform ");
        }
        decl.push_str(&attr.type_name);
        decl.push(' ');
        decl.push_str(&attr.name);

        let mut lines = Vec::with_capacity(2);
        match &attr.value {
            Some(v) => lines.push(format!("{} = {}", decl, format_value(v))),
            None if attr.connections.is_empty() => lines.push(decl.clone()),
            None => {}
        }
        match attr.connections.as_slice() {
            [] => {}
            [one] => lines.push(format!("{}.connect = <{}>", decl, one)),
            many => lines.push(format!("{}.connect = [{}]", decl, path_list(many))),
        }

        // Metadata rides on the first line authored for the attribute.
        for (i, line) in lines.into_iter().enumerate() {
            if i == 0 && !attr.metadata.is_empty() {
                self.write_line(&format!("{} (", line));
                self.indent += 1;
                for m in &attr.metadata {
                    self.write_metadatum(m);
                }
                self.indent -= 1;
                self.write_line(")");
            } else {
                self.write_line(&line);
            }
        }
    }

    fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.output.push_str("    ");
        }
        self.output.push_str(line);
        self.output.push('\n');
    }
}

fn path_list(paths: &[String]) -> String {
    paths.iter().map(|p| format!("<{}>", p)).collect::<Vec<_>>().join(", ")
}

/// Format a value in USDA syntax.
pub fn format_value(value: &UsdValue) -> String {
    match value {
        UsdValue::Bool(b) => b.to_string(),
        UsdValue::Int(i) => i.to_string(),
        UsdValue::Float(f) => format_real(*f),
        UsdValue::String(s) | UsdValue::Token(s) => format!("\"{}\"", escape_string(s)),
        UsdValue::Asset(s) => format!("@{}@", s),
        UsdValue::Path(s) => format!("<{}>", s),
        UsdValue::Tuple(items) => format!("({})", join_values(items)),
        UsdValue::Array(items) => format!("[{}]", join_values(items)),
        UsdValue::Blocked => "None".to_string(),
    }
}

fn join_values(items: &[UsdValue]) -> String {
    items.iter().map(format_value).collect::<Vec<_>>().join(", ")
}

/// Shortest readable form of a real.
pub fn format_real(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() < 0.0001 || value.abs() >= 1e6 {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// Escape a string for a double-quoted USDA literal.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usd::parse_usda;

    #[test]
    fn test_format_real() {
        assert_eq!(format_real(0.0), "0");
        assert_eq!(format_real(1.0), "1");
        assert_eq!(format_real(0.8), "0.8");
        assert_eq!(format_real(-0.25), "-0.25");
        assert_eq!(format_real(1e-5), "1e-5");
        assert_eq!(format_real(f64::INFINITY), "inf");
        assert_eq!(format_real(123.4567891), "123.4567891");
        assert_eq!(format_real(0.00012345678), "0.00012345678");
    }

    #[test]
    fn test_roundtrip_keeps_precision() {
        let text = "#usda 1.0\n\ndef Shader \"range\"\n{\n    float inputs:scale = 0.00012345678\n    float inputs:bias = 0.001234567\n    double inputs:gain = 123.4567891\n}\n";
        let stage = parse_usda(text).unwrap();
        let range = stage.prim("/range").unwrap();
        assert_eq!(range.input("scale").and_then(|a| a.value.clone()), Some(UsdValue::Float(0.00012345678)));

        let written = write_usda(&stage);
        assert!(written.contains("inputs:bias = 0.001234567\n"), "{}", written);
        assert_eq!(parse_usda(&written).unwrap(), stage);
    }

    #[test]
    fn test_roundtrip_keeps_attribute_metadata() {
        let text = r#"#usda 1.0

def Shader "albedo"
{
    uniform token info:id = "UsdUVTexture"
    asset inputs:file = @a.png@ (
        colorSpace = "raw"
    )
    float3 inputs:fallback.connect = </uv.outputs:result> (
        doc = """fallback colour"""
    )
}
"#;
        let stage = parse_usda(text).unwrap();
        let file = stage.prim("/albedo").and_then(|p| p.input("file")).unwrap();
        assert_eq!(file.metadata.len(), 1);
        assert_eq!(file.metadata[0].name, "colorSpace");

        let written = write_usda(&stage);
        assert!(written.contains("asset inputs:file = @a.png@ (\n"), "{}", written);
        assert!(written.contains("colorSpace = \"raw\""), "{}", written);
        let reparsed = parse_usda(&written).unwrap();
        assert_eq!(reparsed, stage);
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b"), "a\\\"b");
        assert_eq!(escape_string("c:\\tex"), "c:\\\\tex");
    }

    #[test]
    fn test_write_shader() {
        let mut stage = Stage::new();
        stage.default_prim = Some("materials".into());
        stage.define_prim("/materials/wood", Some("Material")).unwrap();
        let shader = stage.define_prim("/materials/wood/surf", Some("Shader")).unwrap();
        let mut id = Attribute::new("info:id", "token").with_value(UsdValue::Token("UsdPreviewSurface".into()));
        id.uniform = true;
        shader.set_attribute(id);
        shader.set_attribute(Attribute::new("outputs:surface", "token"));
        stage
            .connect("/materials/wood", "outputs:surface", "token", "/materials/wood/surf", "outputs:surface")
            .unwrap();

        let text = write_usda(&stage);
        assert!(text.starts_with("#usda 1.0\n(\n    defaultPrim = \"materials\"\n)\n"));
        assert!(text.contains("    def Material \"wood\"\n    {\n"));
        assert!(text.contains("uniform token info:id = \"UsdPreviewSurface\""));
        assert!(text.contains("            token outputs:surface\n"));
        assert!(text.contains("token outputs:surface.connect = </materials/wood/surf.outputs:surface>"));
    }

    #[test]
    fn test_roundtrip_preserves_specs() {
        let mut stage = Stage::new();
        stage.up_axis = Some("Y".into());
        stage.define_prim("/World/mesh", Some("Mesh")).unwrap();
        stage.define_prim("/materials/m", Some("Material")).unwrap();
        let tex = stage.define_prim("/materials/m/tex", Some("Shader")).unwrap();
        tex.set_attribute(Attribute::new("inputs:file", "asset").with_value(UsdValue::Asset("C:/tex/a b.png".into())));
        tex.set_attribute(
            Attribute::new("inputs:scale", "float4").with_value(UsdValue::Tuple(vec![
                UsdValue::Float(1.0),
                UsdValue::Float(0.5),
                UsdValue::Float(0.25),
                UsdValue::Float(1.0),
            ])),
        );
        tex.set_attribute(Attribute::new("inputs:sourceColorSpace", "token").with_value(UsdValue::Token("sRGB".into())));
        stage.bind_material("/World/mesh", "/materials/m").unwrap();

        let reparsed = parse_usda(&write_usda(&stage)).unwrap();
        assert_eq!(reparsed, stage);
    }
}
