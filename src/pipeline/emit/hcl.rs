//! Minimal HCL writer for flat resource blocks

/// A value on the right-hand side of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum HclValue {
    /// Rendered quoted and escaped
    String(String),
    Number(i64),
    /// Rendered verbatim
    Literal(String),
    /// A `{ key = "value" }` map, rendered over several lines in order
    Map(Vec<(String, String)>),
}

/// One `resource "type" "name" { ... }` block
#[derive(Debug, Clone)]
pub struct HclBlock {
    resource_type: String,
    name: String,
    attributes: Vec<(String, HclValue)>,
}

impl HclBlock {
    pub fn resource(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &str, value: HclValue) -> Self {
        self.attributes.push((key.to_string(), value));
        self
    }

    pub fn string(self, key: &str, value: impl Into<String>) -> Self {
        self.attr(key, HclValue::String(value.into()))
    }

    /// Add a string attribute only when a value is present
    pub fn opt_string(self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.string(key, v),
            None => self,
        }
    }

    pub fn number(self, key: &str, value: i64) -> Self {
        self.attr(key, HclValue::Number(value))
    }

    pub fn render(&self) -> String {
        // terraform fmt aligns the '=' of consecutive single-line attributes
        let width = self
            .attributes
            .iter()
            .filter(|(_, v)| !matches!(v, HclValue::Map(_)))
            .map(|(k, _)| k.len())
            .max()
            .unwrap_or(0);

        let mut out = format!("resource {} {} {{\n", quote(&self.resource_type), quote(&self.name));
        for (key, value) in &self.attributes {
            let rendered = match value {
                HclValue::String(s) => quote(s),
                HclValue::Number(n) => n.to_string(),
                HclValue::Literal(l) => l.clone(),
                HclValue::Map(entries) => {
                    out.push_str(&format!("  {} = {{\n", key));
                    let key_width = entries.iter().map(|(k, _)| map_key(k).len()).max().unwrap_or(0);
                    for (k, v) in entries {
                        out.push_str(&format!("    {:<width$} = {}\n", map_key(k), quote(v), width = key_width));
                    }
                    out.push_str("  }\n");
                    continue;
                }
            };
            out.push_str(&format!("  {:<width$} = {}\n", key, rendered, width = width));
        }
        out.push_str("}\n");
        out
    }
}

/// Quote and escape a string for HCL
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // template sequences are escaped by doubling the introducer
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Map keys stay bare when they are plain identifiers, otherwise quoted
fn map_key(key: &str) -> String {
    let mut chars = key.chars();
    let bare = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    };
    if bare {
        key.to_string()
    } else {
        quote(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_escapes_specials() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(quote("a\\b"), "\"a\\\\b\"");
        assert_eq!(quote("${var}"), "\"$${var}\"");
        assert_eq!(quote("100%"), "\"100%\"");
    }

    #[test]
    fn test_render_aligns_attributes() {
        let block = HclBlock::resource("aws_security_group", "web")
            .string("name", "web")
            .string("vpc_id", "vpc-1")
            .number("port", 22);

        assert_eq!(
            block.render(),
            "resource \"aws_security_group\" \"web\" {\n  name   = \"web\"\n  vpc_id = \"vpc-1\"\n  port   = 22\n}\n"
        );
    }

    #[test]
    fn test_render_map_quotes_non_identifier_keys() {
        let block = HclBlock::resource("t", "n").attr(
            "tags",
            HclValue::Map(vec![
                ("Name".to_string(), "web".to_string()),
                ("aws:team".to_string(), "infra".to_string()),
            ]),
        );

        let rendered = block.render();
        assert!(rendered.contains("  tags = {\n"));
        assert!(rendered.contains("    Name       = \"web\"\n"));
        assert!(rendered.contains("    \"aws:team\" = \"infra\"\n"));
    }

    #[test]
    fn test_render_map_between_scalar_attributes() {
        let block = HclBlock::resource("t", "n")
            .string("name", "web")
            .attr("tags", HclValue::Map(vec![("Env".to_string(), "prod".to_string())]))
            .number("port", 443);

        assert_eq!(
            block.render(),
            "resource \"t\" \"n\" {\n  name = \"web\"\n  tags = {\n    Env = \"prod\"\n  }\n  port = 443\n}\n"
        );
    }

    #[test]
    fn test_opt_string_skips_absent() {
        let rendered = HclBlock::resource("t", "n").opt_string("description", None).render();
        assert_eq!(rendered, "resource \"t\" \"n\" {\n}\n");
    }
}
