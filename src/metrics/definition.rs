//! Metric Definition Store
//!
//! Loads the declarative list of metric definitions once at startup. Entries
//! are kept raw and only validated when a scrape reaches them, so one broken
//! entry costs one error in one scrape instead of the whole document.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::ports::QueryParams;

/// Top-level key holding the definition list.
pub const METRICS_KEY: &str = "metrics";

// =============================================================================
// Validated Definition
// =============================================================================

/// One metric definition that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    pub name: String,
    pub help: String,
    pub query: String,
    pub value_field: String,
    pub labels: Vec<String>,
    pub query_params: QueryParams,
}

/// Why a raw entry cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("definition is not a mapping")]
    NotAMapping,

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("field 'name' must not be empty")]
    EmptyName,

    #[error("value_field/value missing")]
    MissingValueField,
}

fn required_string(
    entry: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<String, DefinitionError> {
    match entry.get(field) {
        None | Some(Value::Null) => Err(DefinitionError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DefinitionError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn optional_string(
    entry: &serde_json::Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, DefinitionError> {
    match entry.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(DefinitionError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

impl MetricDefinition {
    /// Validate one raw entry of the definition list.
    pub fn from_raw(raw: &Value) -> Result<Self, DefinitionError> {
        let entry = raw.as_object().ok_or(DefinitionError::NotAMapping)?;

        let name = required_string(entry, "name")?;
        if name.is_empty() {
            return Err(DefinitionError::EmptyName);
        }
        let help = required_string(entry, "help")?;
        let query = required_string(entry, "query")?;

        // `value` is only consulted when the `value_field` key is absent.
        let value_key = if entry.contains_key("value_field") {
            "value_field"
        } else {
            "value"
        };
        let value_field =
            optional_string(entry, value_key)?.ok_or(DefinitionError::MissingValueField)?;

        let labels = match entry.get("labels") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or(DefinitionError::WrongType {
                            field: "labels",
                            expected: "a list of strings",
                        })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(DefinitionError::WrongType {
                    field: "labels",
                    expected: "a list of strings",
                })
            }
        };

        let query_params = match entry.get("query_params") {
            None | Some(Value::Null) => QueryParams::new(),
            Some(Value::Object(params)) => params.clone(),
            Some(other) => {
                debug!(
                    metric = %name,
                    kind = json_kind(other),
                    "Non-mapping 'query_params' ignored"
                );
                QueryParams::new()
            }
        };

        Ok(Self {
            name,
            help,
            query,
            value_field,
            labels,
            query_params,
        })
    }

    pub fn is_labeled(&self) -> bool {
        !self.labels.is_empty()
    }
}

/// Name used in logs for an entry that may not have a usable name.
pub fn display_name(index: usize, raw: &Value) -> String {
    raw.get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Unnamed metric #{}", index))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

// =============================================================================
// Store
// =============================================================================

/// Non-fatal problem found while loading the definition document.
///
/// Any of these leaves the store empty; the exporter keeps serving its
/// built-in metrics.
#[derive(Debug, Error)]
pub enum LoadWarning {
    #[error("{} not found", .0.display())]
    NotFound(PathBuf),

    #[error("{} could not be read: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is invalid ({message})", .path.display())]
    Invalid { path: PathBuf, message: String },
}

/// Document formats the store understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Json,
    Yaml,
}

impl SourceFormat {
    /// Pick the format from the file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SourceFormat::Yaml
            }
            _ => SourceFormat::Json,
        }
    }
}

/// Ordered, read-only list of raw metric definitions.
#[derive(Debug, Clone, Default)]
pub struct DefinitionStore {
    definitions: Vec<Value>,
}

impl DefinitionStore {
    pub fn new(definitions: Vec<Value>) -> Self {
        Self { definitions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Load definitions from a file.
    ///
    /// Never fails: problems come back as a warning next to an empty store.
    pub fn load(path: impl AsRef<Path>) -> (Self, Option<LoadWarning>) {
        let path = path.as_ref();

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return (Self::empty(), Some(LoadWarning::NotFound(path.to_path_buf())))
            }
            Err(e) => {
                return (
                    Self::empty(),
                    Some(LoadWarning::Unreadable {
                        path: path.to_path_buf(),
                        source: e,
                    }),
                )
            }
        };

        match Self::parse(&contents, SourceFormat::from_path(path)) {
            Ok(store) => {
                info!(
                    path = %path.display(),
                    definitions = store.len(),
                    "Loaded metric definitions"
                );
                (store, None)
            }
            Err(message) => (
                Self::empty(),
                Some(LoadWarning::Invalid {
                    path: path.to_path_buf(),
                    message,
                }),
            ),
        }
    }

    /// Parse a definition document held in memory.
    pub fn parse(contents: &str, format: SourceFormat) -> Result<Self, String> {
        let document: Value = match format {
            SourceFormat::Json => serde_json::from_str(contents).map_err(|e| e.to_string())?,
            SourceFormat::Yaml => serde_yaml::from_str(contents).map_err(|e| e.to_string())?,
        };

        match document.get(METRICS_KEY) {
            Some(Value::Array(items)) => Ok(Self::new(items.clone())),
            _ => Err(format!("'{}' key must be a list", METRICS_KEY)),
        }
    }

    /// Raw entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::io::Write;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "neo4j-exporter-{}-{}",
            std::process::id(),
            name.replace('.', "-")
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_full_definition() {
        let raw = json!({
            "name": "people_by_city",
            "help": "People per city",
            "query": "MATCH (p:Person) RETURN p.city AS city, count(p) AS value",
            "value_field": "value",
            "labels": ["city"],
            "query_params": {"limit": 10}
        });

        let def = MetricDefinition::from_raw(&raw).unwrap();
        assert_eq!(def.name, "people_by_city");
        assert_eq!(def.value_field, "value");
        assert_eq!(def.labels, vec!["city".to_string()]);
        assert_eq!(def.query_params.get("limit"), Some(&json!(10)));
        assert!(def.is_labeled());
    }

    #[test]
    fn test_value_fallback_key() {
        let raw = json!({"name": "n", "help": "h", "query": "q", "value": "c"});
        let def = MetricDefinition::from_raw(&raw).unwrap();
        assert_eq!(def.value_field, "c");
        assert!(def.labels.is_empty());
        assert!(def.query_params.is_empty());
    }

    #[test]
    fn test_value_field_wins_over_value() {
        let raw = json!({"name": "n", "help": "h", "query": "q", "value_field": "a", "value": "b"});
        assert_eq!(MetricDefinition::from_raw(&raw).unwrap().value_field, "a");
    }

    #[test]
    fn test_null_value_field_does_not_fall_back() {
        let raw = json!({"name": "n", "help": "h", "query": "q", "value_field": null, "value": "b"});
        assert_eq!(
            MetricDefinition::from_raw(&raw),
            Err(DefinitionError::MissingValueField)
        );
    }

    #[test]
    fn test_missing_fields() {
        let missing_help = json!({"name": "n", "query": "q", "value_field": "c"});
        assert_eq!(
            MetricDefinition::from_raw(&missing_help),
            Err(DefinitionError::MissingField("help"))
        );

        let missing_value = json!({"name": "n", "help": "h", "query": "q"});
        assert_eq!(
            MetricDefinition::from_raw(&missing_value),
            Err(DefinitionError::MissingValueField)
        );

        let empty_name = json!({"name": "", "help": "h", "query": "q", "value": "c"});
        assert_eq!(
            MetricDefinition::from_raw(&empty_name),
            Err(DefinitionError::EmptyName)
        );
    }

    #[test]
    fn test_wrong_types() {
        assert_eq!(
            MetricDefinition::from_raw(&json!("just a string")),
            Err(DefinitionError::NotAMapping)
        );
        assert_matches!(
            MetricDefinition::from_raw(&json!({"name": 5, "help": "h", "query": "q", "value": "c"})),
            Err(DefinitionError::WrongType { field: "name", .. })
        );
        assert_matches!(
            MetricDefinition::from_raw(
                &json!({"name": "n", "help": "h", "query": "q", "value": "c", "labels": "city"})
            ),
            Err(DefinitionError::WrongType { field: "labels", .. })
        );
    }

    #[test]
    fn test_non_mapping_params_are_discarded() {
        let raw = json!({
            "name": "n", "help": "h", "query": "q", "value": "c",
            "query_params": ["not", "a", "map"]
        });
        let def = MetricDefinition::from_raw(&raw).unwrap();
        assert!(def.query_params.is_empty());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(0, &json!({"name": "n"})), "n");
        assert_eq!(display_name(3, &json!({"help": "h"})), "Unnamed metric #3");
        assert_eq!(display_name(1, &json!(42)), "Unnamed metric #1");
    }

    #[test]
    fn test_parse_json_document() {
        let store = DefinitionStore::parse(
            r#"{"metrics": [{"name": "a"}, {"name": "b"}]}"#,
            SourceFormat::Json,
        )
        .unwrap();

        let names: Vec<_> = store.iter().map(|d| d["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("b")]);
    }

    #[test]
    fn test_parse_yaml_document() {
        let yaml = r#"
metrics:
  - name: n_nodes
    help: count
    query: MATCH (n) RETURN count(n) AS c
    value_field: c
"#;
        let store = DefinitionStore::parse(yaml, SourceFormat::Yaml).unwrap();
        assert_eq!(store.len(), 1);
        let def = MetricDefinition::from_raw(store.iter().next().unwrap()).unwrap();
        assert_eq!(def.query, "MATCH (n) RETURN count(n) AS c");
    }

    #[test]
    fn test_parse_rejects_bad_documents() {
        assert!(DefinitionStore::parse("{not json", SourceFormat::Json).is_err());
        assert!(DefinitionStore::parse(r#"{"other": []}"#, SourceFormat::Json).is_err());
        assert!(DefinitionStore::parse(r#"{"metrics": {}}"#, SourceFormat::Json).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("m.yaml")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("m.YML")), SourceFormat::Yaml);
        assert_eq!(SourceFormat::from_path(Path::new("metrics.json")), SourceFormat::Json);
        assert_eq!(SourceFormat::from_path(Path::new("metrics")), SourceFormat::Json);
    }

    #[test]
    fn test_load_missing_file() {
        let (store, warning) = DefinitionStore::load("/nonexistent/metrics.json");
        assert!(store.is_empty());
        assert_matches!(warning, Some(LoadWarning::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_file() {
        let path = temp_file("invalid.json", r#"{"metrics": "nope"}"#);
        let (store, warning) = DefinitionStore::load(&path);
        assert!(store.is_empty());
        assert_matches!(warning, Some(LoadWarning::Invalid { .. }));
    }

    #[test]
    fn test_load_valid_file() {
        let path = temp_file(
            "valid.json",
            r#"{"metrics": [{"name": "n", "help": "h", "query": "q", "value": "c"}]}"#,
        );
        let (store, warning) = DefinitionStore::load(&path);
        assert!(warning.is_none());
        assert_eq!(store.len(), 1);
    }
}
