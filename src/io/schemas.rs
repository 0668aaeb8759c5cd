//! Schema registry
//!
//! - Schemas are JSON Schema (Draft 2020-12) documents indexed by `$id`
//! - Every trusted document declares its kind in a top-level `schema` field
//! - Missing `schema`, unknown ids and violations are hard load failures

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{AuditError, AuditResult};
use crate::observability::{log_event_with_fields, Event};

pub const LABS_PANEL_SCHEMA_V1: &str = "biomed_oracle.labs_panel.v1";
pub const WEARABLE_TIMESERIES_SCHEMA_V1: &str = "biomed_oracle.wearable_timeseries.v1";
pub const SCORE_SCHEMA_V1: &str = "biomed_oracle.score.v1";
pub const RECOVERY_SCHEMA_V1: &str = "biomed_oracle.recovery_report.v1";
pub const PLASTICITY2_SCHEMA_V1: &str = "biomed_oracle.plasticity2_report.v1";
pub const RECIPES_INDEX_SCHEMA_V1: &str = "biomed_oracle.recipes_index.v1";
pub const INTERVENTION_MANIFEST_SCHEMA_V1: &str = "biomed_oracle.intervention_manifest.v1";
pub const SCORE_COMPARE_SCHEMA_V1: &str = "biomed_oracle.audit.score_compare_report.v1";
pub const TOOL_AUDIT_SCHEMA_V1: &str = "biomed_oracle.audit.tool_audit_report.v1";

const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

const BUILTIN_SCHEMAS: &[&str] = &[
    include_str!("../../schemas/biomed_v1/labs_panel.schema.json"),
    include_str!("../../schemas/biomed_v1/wearable_timeseries.schema.json"),
    include_str!("../../schemas/biomed_v1/score.schema.json"),
    include_str!("../../schemas/biomed_v1/recipes_index.schema.json"),
    include_str!("../../schemas/biomed_v1/intervention_manifest.schema.json"),
    include_str!("../../schemas/levelc_v1/recovery_report.schema.json"),
    include_str!("../../schemas/levelc_v1/plasticity2_report.schema.json"),
    include_str!("../../schemas/audit_v1/score_compare_report.schema.json"),
    include_str!("../../schemas/audit_v1/tool_audit_report.schema.json"),
];

/// Schemas indexed by `$id`
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Value>,
    origins: BTreeMap<String, String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The schemas shipped with this crate.
    pub fn builtin() -> AuditResult<Self> {
        let mut registry = Self::new();
        for raw in BUILTIN_SCHEMAS {
            let schema: Value = serde_json::from_str(raw).map_err(|e| AuditError::InvalidJson {
                path: "<builtin schema>".into(),
                reason: e.to_string(),
            })?;
            registry.register(schema, "<builtin>")?;
        }
        Ok(registry)
    }

    /// Indexes every `*.schema.json` under `schemas_dir`, recursively.
    ///
    /// Files that are not JSON or carry no `$id` are skipped.
    pub fn index_dir(schemas_dir: &Path) -> AuditResult<Self> {
        let mut registry = Self::new();
        let mut files = Vec::new();
        collect_schema_files(schemas_dir, &mut files)?;
        files.sort();

        for path in files {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(_) => continue,
            };
            let schema: Value = match serde_json::from_str(&content) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if schema_id_of(&schema).is_none() {
                continue;
            }
            registry.register(schema, &path.display().to_string())?;
        }

        let count = registry.len().to_string();
        let dir = schemas_dir.display().to_string();
        log_event_with_fields(Event::SchemasIndexed, &[("count", &count), ("dir", &dir)]);
        Ok(registry)
    }

    /// Registers a schema document under its `$id`; later registrations win.
    pub fn register(&mut self, schema: Value, origin: &str) -> AuditResult<()> {
        let id = schema_id_of(&schema)
            .ok_or_else(|| AuditError::InvalidJson {
                path: origin.to_string(),
                reason: "schema document has no '$id'".into(),
            })?
            .to_string();
        self.origins.insert(id.clone(), origin.to_string());
        self.schemas.insert(id, schema);
        Ok(())
    }

    pub fn contains(&self, schema_id: &str) -> bool {
        self.schemas.contains_key(schema_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Validates a payload against the schema named by its `schema` field.
    ///
    /// Returns the declared schema id.
    pub fn validate(&self, payload: &Value, path: &str) -> AuditResult<String> {
        let schema_id = declared_schema(payload, path)?;

        let schema = self.schemas.get(&schema_id).ok_or_else(|| AuditError::UnknownSchema {
            schema_id: schema_id.clone(),
        })?;

        // Ids are registry keys, not resolvable URIs
        let mut compiled = schema.clone();
        if let Some(obj) = compiled.as_object_mut() {
            obj.remove("$id");
        }

        let validator = jsonschema::draft202012::options().build(&compiled).map_err(|e| {
            AuditError::SchemaViolation {
                path: self.origins.get(&schema_id).cloned().unwrap_or_default(),
                schema_id: schema_id.clone(),
                reason: format!("invalid JSON Schema: {}", e),
            }
        })?;

        if let Err(e) = validator.validate(payload) {
            return Err(AuditError::SchemaViolation {
                path: path.to_string(),
                schema_id,
                reason: e.to_string(),
            });
        }

        Ok(schema_id)
    }
}

/// Reads the non-empty `schema` field of a payload.
pub fn declared_schema(payload: &Value, path: &str) -> AuditResult<String> {
    match payload.get("schema").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(AuditError::SchemaRequired { path: path.to_string() }),
    }
}

/// Fails unless a payload declares exactly `expected`.
pub fn expect_schema(payload: &Value, expected: &str, path: &str) -> AuditResult<()> {
    let actual = declared_schema(payload, path)?;
    if actual != expected {
        return Err(AuditError::UnexpectedSchema {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn schema_id_of(schema: &Value) -> Option<&str> {
    schema.get("$id").and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn collect_schema_files(dir: &Path, out: &mut Vec<PathBuf>) -> AuditResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| AuditError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| AuditError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_schema_files(&path, out)?;
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SCHEMA_FILE_SUFFIX))
        {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_registry_has_every_kind() {
        let registry = SchemaRegistry::builtin().unwrap();
        for id in [
            LABS_PANEL_SCHEMA_V1,
            WEARABLE_TIMESERIES_SCHEMA_V1,
            SCORE_SCHEMA_V1,
            RECOVERY_SCHEMA_V1,
            PLASTICITY2_SCHEMA_V1,
            RECIPES_INDEX_SCHEMA_V1,
            INTERVENTION_MANIFEST_SCHEMA_V1,
            SCORE_COMPARE_SCHEMA_V1,
            TOOL_AUDIT_SCHEMA_V1,
        ] {
            assert!(registry.contains(id), "missing builtin schema {}", id);
        }
    }

    #[test]
    fn test_missing_schema_field() {
        let registry = SchemaRegistry::builtin().unwrap();
        let err = registry.validate(&json!({"labs": []}), "p.json").unwrap_err();
        assert_eq!(err.code(), "ORACLE_SCHEMA_REQUIRED");
    }

    #[test]
    fn test_unknown_schema_id() {
        let registry = SchemaRegistry::builtin().unwrap();
        let err = registry
            .validate(&json!({"schema": "biomed_oracle.nope.v1"}), "p.json")
            .unwrap_err();
        assert!(matches!(err, AuditError::UnknownSchema { .. }));
    }

    #[test]
    fn test_labs_panel_validates() {
        let registry = SchemaRegistry::builtin().unwrap();
        let ok = json!({
            "schema": LABS_PANEL_SCHEMA_V1,
            "subject_id": "s1",
            "labs": [{"name": "crp", "value": 2.0, "unit": "mg/L"}]
        });
        assert_eq!(registry.validate(&ok, "labs.json").unwrap(), LABS_PANEL_SCHEMA_V1);

        let bad = json!({"schema": LABS_PANEL_SCHEMA_V1, "labs": [{"name": "crp"}]});
        let err = registry.validate(&bad, "labs.json").unwrap_err();
        assert_eq!(err.code(), "ORACLE_SCHEMA_VIOLATION");
    }

    #[test]
    fn test_index_dir_recurses_and_skips_junk() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            nested.join("thing.schema.json"),
            r#"{"$id": "x.thing.v1", "type": "object"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.schema.json"), "{").unwrap();
        std::fs::write(dir.path().join("noid.schema.json"), r#"{"type": "object"}"#).unwrap();
        std::fs::write(dir.path().join("other.json"), r#"{"$id": "x.other.v1"}"#).unwrap();

        let registry = SchemaRegistry::index_dir(dir.path()).unwrap();
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["x.thing.v1"]);
    }

    #[test]
    fn test_expect_schema() {
        let doc = json!({"schema": SCORE_SCHEMA_V1});
        assert!(expect_schema(&doc, SCORE_SCHEMA_V1, "a").is_ok());
        let err = expect_schema(&doc, RECOVERY_SCHEMA_V1, "a").unwrap_err();
        assert!(matches!(err, AuditError::UnexpectedSchema { .. }));
    }
}
