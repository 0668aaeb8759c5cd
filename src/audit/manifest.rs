//! Intervention manifest
//!
//! `{schema, subject_id, baseline: row, posts: [row]}` where every row is
//! `{label, labs_ref, wearable_ref, external_scores: {recipe_id: path}}`.
//! Post order is kept as written; time ordering happens in the recovery
//! analyzer.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::biomed::parse_time_label;
use crate::errors::{AuditError, AuditResult};
use crate::io::{expect_schema, INTERVENTION_MANIFEST_SCHEMA_V1};
use crate::recipes::RecipeKind;

/// One manifest timepoint
#[derive(Debug, Clone, PartialEq)]
pub struct TimepointRef {
    pub label: String,
    pub hours: f64,
    pub labs_ref: String,
    pub wearable_ref: String,
    pub external_scores: BTreeMap<String, String>,
}

impl TimepointRef {
    /// Parses one manifest row.
    pub fn from_row(row: &Value) -> AuditResult<Self> {
        let label = trimmed(row, "label");
        if label.is_empty() {
            return Err(AuditError::malformed_manifest(
                "each timepoint requires non-empty 'label'",
            ));
        }
        let hours = parse_time_label(&label)?;

        let labs_ref = trimmed(row, "labs_ref");
        let wearable_ref = trimmed(row, "wearable_ref");
        if labs_ref.is_empty() || wearable_ref.is_empty() {
            return Err(AuditError::malformed_manifest(format!(
                "[{}] requires both labs_ref and wearable_ref",
                label
            )));
        }

        let external = row
            .get("external_scores")
            .and_then(Value::as_object)
            .filter(|m| !m.is_empty())
            .ok_or_else(|| AuditError::malformed_manifest(format!("[{}] requires external_scores map", label)))?;

        let external_scores: BTreeMap<String, String> = external
            .iter()
            .filter_map(|(k, v)| {
                v.as_str()
                    .filter(|p| !k.is_empty() && !p.is_empty())
                    .map(|p| (k.clone(), p.to_string()))
            })
            .collect();
        if external_scores.is_empty() {
            return Err(AuditError::malformed_manifest(format!(
                "[{}] external_scores must contain recipe->path entries",
                label
            )));
        }

        Ok(Self {
            label,
            hours,
            labs_ref,
            wearable_ref,
            external_scores,
        })
    }

    /// Raw payload ref for a recipe kind.
    pub fn raw_ref(&self, kind: RecipeKind) -> &str {
        match kind {
            RecipeKind::Labs => &self.labs_ref,
            RecipeKind::Wearable => &self.wearable_ref,
        }
    }

    /// Candidate score ref for a recipe.
    pub fn candidate_ref(&self, recipe_id: &str) -> AuditResult<&str> {
        self.external_scores
            .get(recipe_id)
            .map(String::as_str)
            .ok_or_else(|| {
                AuditError::malformed_manifest(format!(
                    "[{}] external_scores missing entry for recipe '{}'",
                    self.label, recipe_id
                ))
            })
    }
}

fn trimmed(row: &Value, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or("").trim().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterventionManifest {
    pub subject_id: Option<String>,
    pub baseline: TimepointRef,
    pub posts: Vec<TimepointRef>,
    document: Value,
}

impl InterventionManifest {
    /// Parses a validated manifest document.
    ///
    /// Labels must be unique across baseline and posts.
    pub fn from_document(document: Value, path: &str) -> AuditResult<Self> {
        expect_schema(&document, INTERVENTION_MANIFEST_SCHEMA_V1, path)?;

        let baseline_row = document
            .get("baseline")
            .filter(|v| v.is_object())
            .ok_or_else(|| AuditError::malformed_manifest("requires 'baseline' object and 'posts' array"))?;
        let post_rows = document
            .get("posts")
            .and_then(Value::as_array)
            .ok_or_else(|| AuditError::malformed_manifest("requires 'baseline' object and 'posts' array"))?;

        let baseline = TimepointRef::from_row(baseline_row)?;
        let posts = post_rows
            .iter()
            .filter(|r| r.is_object())
            .map(TimepointRef::from_row)
            .collect::<AuditResult<Vec<_>>>()?;

        let mut seen = BTreeSet::new();
        for tp in std::iter::once(&baseline).chain(&posts) {
            if !seen.insert(tp.label.as_str()) {
                return Err(AuditError::malformed_manifest(format!(
                    "duplicate timepoint label '{}'",
                    tp.label
                )));
            }
        }

        let subject_id = document.get("subject_id").and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            subject_id,
            baseline,
            posts,
            document,
        })
    }

    /// Baseline first, then posts in manifest order.
    pub fn timepoints(&self) -> impl Iterator<Item = &TimepointRef> {
        std::iter::once(&self.baseline).chain(self.posts.iter())
    }

    pub fn post_labels(&self) -> Vec<String> {
        self.posts.iter().map(|tp| tp.label.clone()).collect()
    }

    /// Fails unless every timepoint names a candidate for every recipe.
    pub fn ensure_covers(&self, recipe_ids: &[String]) -> AuditResult<()> {
        for tp in self.timepoints() {
            for recipe_id in recipe_ids {
                tp.candidate_ref(recipe_id)?;
            }
        }
        Ok(())
    }

    pub fn document(&self) -> &Value {
        &self.document
    }
}
