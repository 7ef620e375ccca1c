use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{ImporterError, Result};
use crate::types::GroupRecord;

/// Tags of a security group, kept in the order they were written
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet(IndexMap<String, String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A group row with its name normalized and its tags parsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGroup {
    pub name: String,
    pub vpc_id: Option<String>,
    pub description: Option<String>,
    pub tags: TagSet,
}

impl NormalizedGroup {
    /// Normalize one group row; `row` is the 1-based data row for error messages
    pub fn from_record(record: &GroupRecord, row: usize) -> Result<Self> {
        let name = normalize_group_name(&record.group_name).map_err(|e| e.at_row(row))?;
        let tags = parse_tag_set(record.tags.as_deref()).map_err(|e| e.at_row(row))?;
        Ok(Self {
            name,
            vpc_id: non_blank(record.vpc_id.as_deref()).map(str::to_string),
            // kept verbatim: the remote group's description must match exactly
            description: record.description.clone().filter(|d| !d.trim().is_empty()),
            tags,
        })
    }
}

/// Parse a `key:value, key:value` tag string
///
/// Each segment splits on its first colon only, so values may contain colons.
/// A segment without a colon is an error: dropping it would silently change
/// the declared tags.
pub fn parse_tag_set(raw: Option<&str>) -> Result<TagSet> {
    let mut tags = TagSet::new();
    let raw = match raw.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => return Ok(tags),
    };

    for segment in raw.split(',') {
        let (key, value) = segment.split_once(':').ok_or_else(|| {
            ImporterError::malformed(0, "Tags", format!("tag segment '{}' has no ':'", segment.trim()))
        })?;
        tags.insert(key.trim(), value.trim());
    }

    Ok(tags)
}

/// Split `value (annotation)` into its value and the annotation text
///
/// Only applies when both parentheses are present; the annotation ends at the
/// first `)` after the first `(`.
pub fn strip_annotation(raw: &str) -> (String, String) {
    if let Some(open) = raw.find('(') {
        if raw.contains(')') {
            let value = raw[..open].trim().to_string();
            let rest = &raw[open + 1..];
            let annotation = match rest.find(')') {
                Some(close) => rest[..close].to_string(),
                // a ')' exists only before the '(' as in "a) (b"
                None => String::new(),
            };
            return (value, annotation);
        }
    }
    (raw.trim().to_string(), String::new())
}

/// Turn a display group name into the identifier used for names and resources
pub fn normalize_group_name(raw: &str) -> Result<String> {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect::<String>()
        .to_lowercase();

    if name.is_empty() {
        return Err(ImporterError::malformed(0, "GroupName", "group name is empty"));
    }
    Ok(name)
}

/// Parse a port cell; blank is no port, `22` and `22.0` are both port 22
pub fn parse_port(raw: Option<&str>, field: &'static str) -> Result<Option<i32>> {
    let text = match non_blank(raw) {
        Some(t) => t,
        None => return Ok(None),
    };

    if let Ok(port) = text.parse::<i32>() {
        return Ok(Some(port));
    }

    match text.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 => {
            Ok(Some(value as i32))
        }
        _ => Err(ImporterError::malformed(0, field, format!("'{}' is not a port number", text))),
    }
}

/// Trimmed cell text, or None for an absent or whitespace-only cell
pub fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_set_preserves_order() {
        let tags = parse_tag_set(Some("k1:v1, k2:v2")).unwrap();
        let pairs: Vec<_> = tags.iter().collect();
        assert_eq!(pairs, vec![("k1", "v1"), ("k2", "v2")]);
    }

    #[test]
    fn test_parse_tag_set_splits_on_first_colon() {
        let tags = parse_tag_set(Some("k1:a:b")).unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags.get("k1"), Some("a:b"));
    }

    #[test]
    fn test_parse_tag_set_blank_is_empty() {
        assert!(parse_tag_set(None).unwrap().is_empty());
        assert!(parse_tag_set(Some("   ")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tag_set_rejects_segment_without_colon() {
        let err = parse_tag_set(Some("Name:web, broken")).unwrap_err();
        assert!(matches!(err, ImporterError::MalformedInput { field: "Tags", .. }));
    }

    #[test]
    fn test_strip_annotation() {
        assert_eq!(
            strip_annotation("10.0.0.0/16 (office)"),
            ("10.0.0.0/16".to_string(), "office".to_string())
        );
        assert_eq!(strip_annotation("10.0.0.0/16"), ("10.0.0.0/16".to_string(), String::new()));
        assert_eq!(strip_annotation("sg-123 ()"), ("sg-123".to_string(), String::new()));
        // only one parenthesis: nothing is stripped
        assert_eq!(strip_annotation(" pl-1 (open "), ("pl-1 (open".to_string(), String::new()));
    }

    #[test]
    fn test_normalize_group_name() {
        assert_eq!(normalize_group_name(" Web Servers ").unwrap(), "web-servers");
        assert_eq!(normalize_group_name("DB\tTier").unwrap(), "db-tier");
        assert!(normalize_group_name("   ").is_err());
    }

    #[test]
    fn test_normalized_group_from_record() {
        let record = GroupRecord {
            group_name: "Web Servers".to_string(),
            vpc_id: Some("vpc-0abc".to_string()),
            description: Some("  ".to_string()),
            tags: Some("Name:web, Env:prod".to_string()),
        };

        let group = NormalizedGroup::from_record(&record, 3).unwrap();
        assert_eq!(group.name, "web-servers");
        assert_eq!(group.vpc_id.as_deref(), Some("vpc-0abc"));
        assert_eq!(group.description, None);
        assert_eq!(group.tags.get("Env"), Some("prod"));
    }

    #[test]
    fn test_normalized_group_reports_row_of_bad_tags() {
        let record = GroupRecord {
            group_name: "web".to_string(),
            vpc_id: None,
            description: None,
            tags: Some("oops".to_string()),
        };

        let err = NormalizedGroup::from_record(&record, 5).unwrap_err();
        assert!(matches!(err, ImporterError::MalformedInput { row: 5, field: "Tags", .. }));
    }

    #[test]
    fn test_parse_port_handles_spreadsheet_floats() {
        assert_eq!(parse_port(Some("22"), "FromPort").unwrap(), Some(22));
        assert_eq!(parse_port(Some("443.0"), "FromPort").unwrap(), Some(443));
        assert_eq!(parse_port(Some("-1"), "FromPort").unwrap(), Some(-1));
        assert_eq!(parse_port(Some(""), "FromPort").unwrap(), None);
        assert_eq!(parse_port(None, "FromPort").unwrap(), None);
        assert!(parse_port(Some("ssh"), "ToPort").is_err());
        assert!(parse_port(Some("22.5"), "ToPort").is_err());
    }
}
