//! Oracle scoring pipeline
//!
//! payload -> units gate -> recipe -> score artifact

use std::path::Path;

use serde_json::Value;

use super::artifact::{make_score_artifact, ScoreArtifact};
use crate::config::ProvenanceContext;
use crate::errors::AuditResult;
use crate::io::{assert_units, DocumentLoader};
use crate::observability::{log_event_with_fields, Event};
use crate::recipes::RecipeRegistry;

/// Scores an already validated payload.
pub fn score_payload(
    registry: &RecipeRegistry,
    recipe_id: &str,
    payload: &Value,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoreArtifact> {
    score_with_context(registry, recipe_id, payload, &format!("recipe={}", recipe_id), ctx)
}

/// Loads and validates a payload, then scores it.
pub fn score_file(
    loader: &dyn DocumentLoader,
    registry: &RecipeRegistry,
    recipe_id: &str,
    path: &Path,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoreArtifact> {
    let payload = loader.load_document(path)?;
    let context = format!("{} ({})", recipe_id, path.display());
    score_with_context(registry, recipe_id, &payload, &context, ctx)
}

fn score_with_context(
    registry: &RecipeRegistry,
    recipe_id: &str,
    payload: &Value,
    units_context: &str,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoreArtifact> {
    let spec = registry.get(recipe_id)?;
    log_event_with_fields(Event::ScoreStart, &[("recipe", recipe_id), ("kind", spec.kind.as_str())]);

    assert_units(&spec.kind.units_view(payload), &spec.expected_units, units_context)?;

    let artifact = make_score_artifact(payload, spec.run(payload), ctx)?;

    let score = artifact.score.to_string();
    log_event_with_fields(Event::ScoreComplete, &[("recipe", recipe_id), ("score", &score)]);
    Ok(artifact)
}
