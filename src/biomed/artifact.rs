//! Score artifacts
//!
//! A score artifact is a recipe result plus provenance. `input_hash` is the
//! content hash of the raw payload, so the artifact is a verifiable function
//! of its input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::ProvenanceContext;
use crate::errors::{ensure_finite, AuditError, AuditResult};
use crate::io::SCORE_SCHEMA_V1;
use crate::recipes::{QcReport, ScoreResult};

/// Provenance of a score artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub tool_version: String,
    pub created_utc: String,
    pub input_hash: String,
}

/// Provenance of a derived report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    pub tool_version: String,
    pub created_utc: String,
    pub evidence_hash: String,
}

impl ProvenanceContext {
    pub fn report_provenance(&self, evidence_hash: String) -> ReportProvenance {
        ReportProvenance {
            tool_version: self.tool_version.clone(),
            created_utc: self.stamp(),
            evidence_hash,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreArtifact {
    pub schema: String,
    pub provenance: Provenance,
    pub input_schema: Option<String>,
    #[serde(rename = "recipe")]
    pub recipe_id: String,
    pub score: f64,
    pub features: BTreeMap<String, f64>,
    pub qc: QcReport,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Wraps a recipe result into a score artifact.
///
/// Fails on non-finite score or feature values; nothing else can fail here.
pub fn make_score_artifact(
    input_payload: &Value,
    result: ScoreResult,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoreArtifact> {
    ensure_finite("score", result.score)?;
    for (name, value) in &result.features {
        ensure_finite(&format!("features.{}", name), *value)?;
    }

    let input_hash = ctx.content_hash(input_payload)?;

    Ok(ScoreArtifact {
        schema: SCORE_SCHEMA_V1.to_string(),
        provenance: Provenance {
            tool_version: ctx.tool_version.clone(),
            created_utc: ctx.stamp(),
            input_hash,
        },
        input_schema: input_payload.get("schema").and_then(Value::as_str).map(str::to_string),
        recipe_id: result.recipe_id,
        score: result.score,
        features: result.features,
        qc: result.qc,
        details: result.details,
        extra: None,
    })
}

/// A score artifact together with the exact JSON document it hashes as
///
/// Candidate artifacts are hashed byte-for-byte as loaded, so the typed view
/// never replaces the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreDocument {
    artifact: ScoreArtifact,
    document: Value,
}

impl ScoreDocument {
    /// Reads the typed view of a loaded document.
    pub fn from_document(document: Value, path: &str) -> AuditResult<Self> {
        let artifact: ScoreArtifact =
            serde_json::from_value(document.clone()).map_err(|e| AuditError::InvalidJson {
                path: path.to_string(),
                reason: format!("not a score artifact: {}", e),
            })?;
        Ok(Self { artifact, document })
    }

    pub fn from_artifact(artifact: ScoreArtifact) -> AuditResult<Self> {
        let document = serde_json::to_value(&artifact)?;
        Ok(Self { artifact, document })
    }

    pub fn artifact(&self) -> &ScoreArtifact {
        &self.artifact
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn recipe_id(&self) -> &str {
        &self.artifact.recipe_id
    }

    pub fn score(&self) -> f64 {
        self.artifact.score
    }

    pub fn features(&self) -> &BTreeMap<String, f64> {
        &self.artifact.features
    }

    /// Content hash of the whole artifact document.
    pub fn score_hash(&self, ctx: &ProvenanceContext) -> AuditResult<String> {
        ctx.content_hash(&self.document)
    }
}
