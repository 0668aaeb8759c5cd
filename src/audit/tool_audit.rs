//! Tool audit orchestrator
//!
//! Single pass, no retries:
//! 1. Load and parse the intervention manifest
//! 2. Resolve the contract suite
//! 3. Score every (recipe, timepoint) with the oracle and load the matching
//!    candidate artifact
//! 4. Per recipe: score comparisons at every timepoint, recovery and
//!    plasticity2 for both chains, metric diffs under the same tolerance
//! 5. Aggregate, hash the evidence, emit
//!
//! Any failure aborts the run before anything is written.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::manifest::{InterventionManifest, TimepointRef};
use super::score_compare::{score_compare, ScoreCompareReport};
use super::suite::{resolve_suite, ContractSuite};
use crate::biomed::{
    compare_v2, plasticity_v2, score_file, Plasticity2Metrics, RecoveryMetrics, ReportProvenance, ScoreDocument,
};
use crate::config::ProvenanceContext;
use crate::errors::{ensure_finite, ensure_tolerance, AuditError, AuditResult};
use crate::io::{emit_document, expect_schema, ArtifactSink, DocumentLoader, SCORE_SCHEMA_V1, TOOL_AUDIT_SCHEMA_V1};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::recipes::{RecipeKind, RecipeRegistry, RecipeSpec};

/// Inputs of one audit run
#[derive(Debug, Clone)]
pub struct ToolAuditRequest<'a> {
    pub tool_name: &'a str,
    pub manifest_path: &'a Path,
    pub contracts: &'a str,
    pub tolerance_abs: f64,
    pub emit_report: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestSummary {
    #[serde(rename = "ref")]
    pub reference: String,
    pub subject_id: Option<String>,
    pub baseline_label: String,
    pub post_labels: Vec<String>,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimepointAudit {
    pub label: String,
    pub raw_ref: String,
    pub candidate_ref: String,
    pub score_compare: ScoreCompareReport,
}

/// One side (oracle or candidate) of a derived-report comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSummary<M> {
    pub schema: String,
    pub evidence_hash: String,
    pub metrics: M,
}

/// Oracle vs candidate value of one metric
///
/// `abs` is null whenever either side is null. Null on both sides counts as
/// agreement; null on one side does not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDiff {
    pub oracle: Option<f64>,
    pub candidate: Option<f64>,
    pub abs: Option<f64>,
    pub within_tolerance: bool,
}

impl MetricDiff {
    pub fn between(metric: &str, oracle: Option<f64>, candidate: Option<f64>, tolerance_abs: f64) -> AuditResult<Self> {
        let (abs, within_tolerance) = match (oracle, candidate) {
            (Some(a), Some(b)) => {
                let d = ensure_finite(metric, (a - b).abs())?;
                (Some(d), d <= tolerance_abs)
            }
            (None, None) => (None, true),
            _ => (None, false),
        };
        Ok(Self {
            oracle,
            candidate,
            abs,
            within_tolerance,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainComparison<M> {
    pub oracle: ChainSummary<M>,
    pub candidate: ChainSummary<M>,
    pub metric_diffs: BTreeMap<String, MetricDiff>,
    pub within_tolerance: bool,
}

/// Metrics that can be diffed by name
pub trait MetricSet {
    fn named(&self) -> Vec<(&'static str, Option<f64>)>;
}

impl MetricSet for RecoveryMetrics {
    fn named(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("D_peak", Some(self.d_peak)),
            ("t_peak_hours", Some(self.t_peak_hours)),
            ("t_recover_80_hours", self.t_recover_80_hours),
        ]
    }
}

impl MetricSet for Plasticity2Metrics {
    fn named(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("auc_D", Some(self.auc_d)),
            ("mean_R", Some(self.mean_r)),
            ("mean_C", self.mean_c),
        ]
    }
}

impl<M: MetricSet> ChainComparison<M> {
    pub fn new(oracle: ChainSummary<M>, candidate: ChainSummary<M>, tolerance_abs: f64) -> AuditResult<Self> {
        let metric_diffs = oracle
            .metrics
            .named()
            .into_iter()
            .zip(candidate.metrics.named())
            .map(|((name, a), (_, b))| Ok((name.to_string(), MetricDiff::between(name, a, b, tolerance_abs)?)))
            .collect::<AuditResult<BTreeMap<String, MetricDiff>>>()?;
        let within_tolerance = metric_diffs.values().all(|d| d.within_tolerance);
        Ok(Self {
            oracle,
            candidate,
            metric_diffs,
            within_tolerance,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeAudit {
    pub recipe: String,
    pub kind: RecipeKind,
    pub timepoints: Vec<TimepointAudit>,
    pub recovery: ChainComparison<RecoveryMetrics>,
    pub plasticity2: ChainComparison<Plasticity2Metrics>,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSummary {
    pub recipes_total: usize,
    pub recipes_within_tolerance: usize,
    pub within_tolerance: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolAuditReport {
    pub schema: String,
    pub provenance: ReportProvenance,
    pub tool: ToolRef,
    pub contracts: ContractSuite,
    pub manifest: ManifestSummary,
    pub tolerance_abs: f64,
    pub recipes: Vec<RecipeAudit>,
    pub summary: AuditSummary,
}

/// Oracle and candidate scores of one recipe at one timepoint
struct ScoredTimepoint<'m> {
    timepoint: &'m TimepointRef,
    raw_ref: String,
    candidate_ref: String,
    oracle: ScoreDocument,
    candidate: ScoreDocument,
}

/// Runs an audit and writes the report through `sink`.
pub fn run_tool_audit(
    request: &ToolAuditRequest<'_>,
    loader: &dyn DocumentLoader,
    registry: &RecipeRegistry,
    sink: &dyn ArtifactSink,
    ctx: &ProvenanceContext,
) -> AuditResult<ToolAuditReport> {
    let scope = ObservationScope::with_fields(
        "TOOL_AUDIT",
        &[("tool", request.tool_name), ("contracts", request.contracts)],
    );
    let manifest_ref = request.manifest_path.display().to_string();
    log_event_with_fields(
        Event::AuditStart,
        &[("tool", request.tool_name), ("manifest", &manifest_ref)],
    );

    let outcome = build_report(request, loader, registry, ctx).and_then(|report| {
        emit_document(sink, &ctx.canonicalizer, request.emit_report, &report)?;
        Ok(report)
    });

    match outcome {
        Ok(report) => {
            let within = report.summary.within_tolerance.to_string();
            let passed = report.summary.recipes_within_tolerance.to_string();
            log_event_with_fields(
                Event::AuditComplete,
                &[("tool", request.tool_name), ("within_tolerance", &within)],
            );
            scope.complete_with_fields(&[("within_tolerance", &within), ("recipes_within_tolerance", &passed)]);
            Ok(report)
        }
        Err(e) => {
            let reason = e.to_string();
            log_event_with_fields(Event::AuditFailed, &[("code", e.code()), ("reason", &reason)]);
            scope.fail(e.code(), &reason);
            Err(e)
        }
    }
}

fn build_report(
    request: &ToolAuditRequest<'_>,
    loader: &dyn DocumentLoader,
    registry: &RecipeRegistry,
    ctx: &ProvenanceContext,
) -> AuditResult<ToolAuditReport> {
    let tolerance_abs = ensure_tolerance(request.tolerance_abs)?;
    if request.tool_name.trim().is_empty() {
        return Err(AuditError::Config {
            reason: "tool name must be non-empty".into(),
        });
    }

    let manifest_label = request.manifest_path.display().to_string();
    let manifest_doc = loader.load_document(request.manifest_path)?;
    let manifest = InterventionManifest::from_document(manifest_doc, &manifest_label)?;

    let suite = resolve_suite(request.contracts)?;
    manifest.ensure_covers(&suite.recipes)?;

    // Everything is loaded and checked before any comparison runs
    let mut scored: Vec<(&RecipeSpec, Vec<ScoredTimepoint<'_>>)> = Vec::with_capacity(suite.recipes.len());
    for recipe_id in &suite.recipes {
        let spec = registry.get(recipe_id)?;
        let mut rows = Vec::new();
        for tp in manifest.timepoints() {
            rows.push(score_timepoint(spec, tp, loader, registry, ctx)?);
        }
        scored.push((spec, rows));
    }

    let mut recipes = Vec::with_capacity(scored.len());
    for (spec, rows) in &scored {
        recipes.push(audit_recipe(spec, rows, tolerance_abs, ctx)?);
    }

    let mut oracle_scores: BTreeMap<&str, BTreeMap<&str, &Value>> = BTreeMap::new();
    let mut candidate_scores: BTreeMap<&str, BTreeMap<&str, &Value>> = BTreeMap::new();
    for (spec, rows) in &scored {
        for row in rows {
            let label = row.timepoint.label.as_str();
            oracle_scores
                .entry(spec.id.as_str())
                .or_default()
                .insert(label, row.oracle.document());
            candidate_scores
                .entry(spec.id.as_str())
                .or_default()
                .insert(label, row.candidate.document());
        }
    }
    let evidence_hash = ctx.content_hash(&json!({
        "manifest": manifest.document(),
        "oracle_scores": oracle_scores,
        "candidate_scores": candidate_scores,
        "contracts": request.contracts,
        "tolerance_abs": tolerance_abs,
        "tool": request.tool_name,
    }))?;

    let recipes_within_tolerance = recipes.iter().filter(|r| r.within_tolerance).count();
    let summary = AuditSummary {
        recipes_total: suite.recipes.len(),
        recipes_within_tolerance,
        within_tolerance: recipes_within_tolerance == suite.recipes.len(),
    };

    Ok(ToolAuditReport {
        schema: TOOL_AUDIT_SCHEMA_V1.to_string(),
        provenance: ctx.report_provenance(evidence_hash),
        tool: ToolRef {
            name: request.tool_name.to_string(),
        },
        manifest: ManifestSummary {
            reference: manifest_label.replace('\\', "/"),
            subject_id: manifest.subject_id.clone(),
            baseline_label: manifest.baseline.label.clone(),
            post_labels: manifest.post_labels(),
            hash: ctx.content_hash(manifest.document())?,
        },
        contracts: suite,
        tolerance_abs,
        recipes,
        summary,
    })
}

fn score_timepoint<'m>(
    spec: &RecipeSpec,
    timepoint: &'m TimepointRef,
    loader: &dyn DocumentLoader,
    registry: &RecipeRegistry,
    ctx: &ProvenanceContext,
) -> AuditResult<ScoredTimepoint<'m>> {
    let raw_ref = timepoint.raw_ref(spec.kind).to_string();
    let raw_path = loader.resolve(&raw_ref);
    let oracle = ScoreDocument::from_artifact(score_file(loader, registry, &spec.id, &raw_path, ctx)?)?;

    let candidate_ref = timepoint.candidate_ref(&spec.id)?.to_string();
    let candidate_path = loader.resolve(&candidate_ref);
    let candidate_label = candidate_path.display().to_string();
    let document = loader.load_document(&candidate_path)?;
    expect_schema(&document, SCORE_SCHEMA_V1, &candidate_label)?;
    let candidate = ScoreDocument::from_document(document, &candidate_label)?;

    if candidate.recipe_id() != spec.id {
        return Err(AuditError::recipe_mismatch(
            format!("candidate score at {}", timepoint.label),
            spec.id.as_str(),
            candidate.recipe_id(),
        ));
    }
    log_event_with_fields(
        Event::CandidateLoaded,
        &[("recipe", &spec.id), ("label", &timepoint.label), ("path", &candidate_label)],
    );

    Ok(ScoredTimepoint {
        timepoint,
        raw_ref,
        candidate_ref,
        oracle,
        candidate,
    })
}

fn audit_recipe(
    spec: &RecipeSpec,
    rows: &[ScoredTimepoint<'_>],
    tolerance_abs: f64,
    ctx: &ProvenanceContext,
) -> AuditResult<RecipeAudit> {
    let mut timepoints = Vec::with_capacity(rows.len());
    for row in rows {
        timepoints.push(TimepointAudit {
            label: row.timepoint.label.clone(),
            raw_ref: row.raw_ref.clone(),
            candidate_ref: row.candidate_ref.clone(),
            score_compare: score_compare(&row.oracle, &row.candidate, tolerance_abs, ctx)?,
        });
    }
    let scores_ok = timepoints.iter().all(|t| t.score_compare.within_tolerance);

    let (base, posts) = rows
        .split_first()
        .ok_or_else(|| AuditError::malformed_manifest("no timepoints"))?;
    let baseline_label = base.timepoint.label.as_str();
    let oracle_posts: Vec<(&str, &ScoreDocument)> =
        posts.iter().map(|r| (r.timepoint.label.as_str(), &r.oracle)).collect();
    let candidate_posts: Vec<(&str, &ScoreDocument)> =
        posts.iter().map(|r| (r.timepoint.label.as_str(), &r.candidate)).collect();

    let rec_oracle = compare_v2(baseline_label, &base.oracle, &oracle_posts, ctx)?;
    let rec_candidate = compare_v2(baseline_label, &base.candidate, &candidate_posts, ctx)?;
    let pl_oracle = plasticity_v2(&rec_oracle, ctx)?;
    let pl_candidate = plasticity_v2(&rec_candidate, ctx)?;

    let recovery = ChainComparison::new(
        ChainSummary {
            schema: rec_oracle.schema,
            evidence_hash: rec_oracle.provenance.evidence_hash,
            metrics: rec_oracle.metrics,
        },
        ChainSummary {
            schema: rec_candidate.schema,
            evidence_hash: rec_candidate.provenance.evidence_hash,
            metrics: rec_candidate.metrics,
        },
        tolerance_abs,
    )?;
    let plasticity2 = ChainComparison::new(
        ChainSummary {
            schema: pl_oracle.schema,
            evidence_hash: pl_oracle.provenance.evidence_hash,
            metrics: pl_oracle.metrics,
        },
        ChainSummary {
            schema: pl_candidate.schema,
            evidence_hash: pl_candidate.provenance.evidence_hash,
            metrics: pl_candidate.metrics,
        },
        tolerance_abs,
    )?;

    let within_tolerance = scores_ok && recovery.within_tolerance && plasticity2.within_tolerance;
    let within = within_tolerance.to_string();
    log_event_with_fields(Event::RecipeAudited, &[("recipe", &spec.id), ("within_tolerance", &within)]);

    Ok(RecipeAudit {
        recipe: spec.id.clone(),
        kind: spec.kind,
        timepoints,
        recovery,
        plasticity2,
        within_tolerance,
    })
}
