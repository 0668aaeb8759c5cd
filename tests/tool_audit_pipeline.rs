//! Tool audit pipeline tests
//!
//! Runs the full audit over the levelc fixtures, both from the repository on
//! disk and fully in memory. The fixture tool reports scores rounded to 12
//! decimals, so it agrees with the oracle at 1e-9 but not at 0.0.

use std::fs;
use std::path::{Path, PathBuf};

use biomed_oracle::audit::{run_tool_audit, ToolAuditReport, ToolAuditRequest};
use biomed_oracle::config::ProvenanceContext;
use biomed_oracle::errors::AuditError;
use biomed_oracle::io::{
    DocumentLoader, FsSink, MemoryLoader, MemorySink, RepoLoader, SchemaRegistry, TOOL_AUDIT_SCHEMA_V1,
};
use biomed_oracle::recipes::RecipeRegistry;
use serde_json::{json, Value};
use tempfile::TempDir;

const MANIFEST_REF: &str = "tests/fixtures/levelc/intervention_manifest.json";

// =============================================================================
// Test Utilities
// =============================================================================

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

/// Every document the fixture manifest references, loaded into memory.
fn memory_loader() -> MemoryLoader {
    let root = repo_root();
    let manifest = read_json(&root.join(MANIFEST_REF));
    let mut loader = MemoryLoader::new("/mem").with_schemas(SchemaRegistry::builtin().unwrap());

    let mut rows = vec![manifest["baseline"].clone()];
    rows.extend(manifest["posts"].as_array().unwrap().iter().cloned());
    for row in &rows {
        for key in ["labs_ref", "wearable_ref"] {
            let r = row[key].as_str().unwrap();
            loader.insert(r, read_json(&root.join(r)));
        }
        for r in row["external_scores"].as_object().unwrap().values() {
            let r = r.as_str().unwrap();
            loader.insert(r, read_json(&root.join(r)));
        }
    }
    loader.insert(MANIFEST_REF, manifest);
    loader
}

fn request<'a>(manifest: &'a Path, emit: &'a Path, tolerance_abs: f64) -> ToolAuditRequest<'a> {
    ToolAuditRequest {
        tool_name: "fixture_tool",
        manifest_path: manifest,
        contracts: "biomed_v1",
        tolerance_abs,
        emit_report: emit,
    }
}

fn run_in_memory(
    loader: &MemoryLoader,
    req: &ToolAuditRequest<'_>,
    sink: &MemorySink,
) -> Result<ToolAuditReport, AuditError> {
    run_tool_audit(req, loader, RecipeRegistry::global(), sink, &ProvenanceContext::default())
}

// =============================================================================
// Happy path
// =============================================================================

#[test]
fn test_fixture_tool_agrees_with_oracle() {
    let loader = RepoLoader::discover(&repo_root()).unwrap();
    let manifest = repo_root().join(MANIFEST_REF);
    let emit = PathBuf::from("out/tool_subject_01.audit.json");
    let sink = MemorySink::new();
    let ctx = ProvenanceContext::default();

    let report = run_tool_audit(
        &request(&manifest, &emit, 1e-9),
        &loader,
        RecipeRegistry::global(),
        &sink,
        &ctx,
    )
    .unwrap();

    assert_eq!(report.schema, TOOL_AUDIT_SCHEMA_V1);
    assert_eq!(report.summary.recipes_total, 3);
    assert_eq!(report.summary.recipes_within_tolerance, 3);
    assert!(report.summary.within_tolerance);
    assert_eq!(report.manifest.baseline_label, "t0");
    assert_eq!(report.manifest.post_labels, vec!["t72", "t24", "t168"]);
    assert_eq!(report.manifest.subject_id.as_deref(), Some("subject_01"));

    let recipes: Vec<&str> = report.recipes.iter().map(|r| r.recipe.as_str()).collect();
    assert_eq!(recipes, vec!["inflammation_score_v1", "metabolic_score_v1", "circadian_score_v1"]);

    let inflammation = &report.recipes[0];
    assert_eq!(inflammation.timepoints.len(), 4);
    assert_eq!(inflammation.timepoints[0].label, "t0");
    let oracle = &inflammation.recovery.oracle.metrics;
    assert_eq!(oracle.t_peak_hours, 24.0);
    assert_eq!(oracle.t_recover_80_hours, Some(168.0));
    assert!((oracle.d_peak - 0.55).abs() < 1e-9);
    assert_eq!(inflammation.recovery.metric_diffs.len(), 3);
    assert_eq!(inflammation.plasticity2.metric_diffs.len(), 3);

    // Both chains hash different upstream documents
    assert_ne!(
        inflammation.recovery.oracle.evidence_hash,
        inflammation.recovery.candidate.evidence_hash
    );

    let written = sink.get_string(&emit).unwrap();
    assert!(written.ends_with("}\n"));
    let doc: Value = serde_json::from_str(&written).unwrap();
    assert_eq!(doc["summary"]["within_tolerance"], json!(true));
    assert_eq!(doc["tool"]["name"], "fixture_tool");
    assert_eq!(doc["manifest"]["ref"], manifest.display().to_string().replace('\\', "/"));

    // The emitted report satisfies its own schema
    assert_eq!(loader.schemas().validate(&doc, "report").unwrap(), TOOL_AUDIT_SCHEMA_V1);
}

#[test]
fn test_zero_tolerance_reports_false_verdict_without_failing() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let sink = MemorySink::new();

    let report = run_in_memory(&loader, &request(&manifest, &emit, 0.0), &sink).unwrap();

    let metabolic = report.recipes.iter().find(|r| r.recipe == "metabolic_score_v1").unwrap();
    assert!(!metabolic.within_tolerance);
    assert!(!report.summary.within_tolerance);
    assert!(report.summary.recipes_within_tolerance < 3);
    assert!(sink.get(&emit).is_some());
}

#[test]
fn test_runs_are_byte_identical() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");

    let first = MemorySink::new();
    let second = MemorySink::new();
    run_in_memory(&loader, &request(&manifest, &emit, 1e-9), &first).unwrap();
    run_in_memory(&loader, &request(&manifest, &emit, 1e-9), &second).unwrap();
    assert_eq!(first.get(&emit), second.get(&emit));
}

#[test]
fn test_evidence_covers_tool_and_tolerance() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let sink = MemorySink::new();

    let base = run_in_memory(&loader, &request(&manifest, &emit, 1e-9), &sink).unwrap();

    let mut renamed = request(&manifest, &emit, 1e-9);
    renamed.tool_name = "other_tool";
    let other_tool = run_in_memory(&loader, &renamed, &sink).unwrap();

    let looser = run_in_memory(&loader, &request(&manifest, &emit, 1e-6), &sink).unwrap();

    assert_ne!(base.provenance.evidence_hash, other_tool.provenance.evidence_hash);
    assert_ne!(base.provenance.evidence_hash, looser.provenance.evidence_hash);
    assert_eq!(base.manifest.hash, other_tool.manifest.hash);
}

#[test]
fn test_alias_suite_is_echoed() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let sink = MemorySink::new();

    let mut req = request(&manifest, &emit, 1e-9);
    req.contracts = "biomed_levelc_v1";
    let report = run_in_memory(&loader, &req, &sink).unwrap();
    assert_eq!(report.contracts.suite, "biomed_levelc_v1");
    assert_eq!(report.contracts.recipes.len(), 3);
}

#[test]
fn test_fs_sink_writes_report() {
    let tmp = TempDir::new().unwrap();
    let loader = RepoLoader::discover(&repo_root()).unwrap();
    let manifest = repo_root().join(MANIFEST_REF);
    let emit = tmp.path().join("nested").join("audit.json");

    run_tool_audit(
        &request(&manifest, &emit, 1e-9),
        &loader,
        RecipeRegistry::global(),
        &FsSink,
        &ProvenanceContext::default(),
    )
    .unwrap();

    let doc = read_json(&emit);
    assert_eq!(doc["schema"], TOOL_AUDIT_SCHEMA_V1);
}

// =============================================================================
// Failures write nothing
// =============================================================================

fn assert_fails_silently(loader: &MemoryLoader, req: &ToolAuditRequest<'_>) -> AuditError {
    let sink = MemorySink::new();
    let err = run_in_memory(loader, req, &sink).unwrap_err();
    assert!(sink.is_empty(), "nothing may be written on failure");
    err
}

#[test]
fn test_unknown_suite() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let mut req = request(&manifest, &emit, 0.0);
    req.contracts = "biomed_v2";
    let err = assert_fails_silently(&loader, &req);
    assert!(matches!(err, AuditError::UnknownSuite { .. }));
}

#[test]
fn test_invalid_request() {
    let loader = memory_loader();
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");

    let err = assert_fails_silently(&loader, &request(&manifest, &emit, -0.5));
    assert!(matches!(err, AuditError::InvalidTolerance { .. }));

    let mut req = request(&manifest, &emit, 0.0);
    req.tool_name = "  ";
    let err = assert_fails_silently(&loader, &req);
    assert_eq!(err.code(), "ORACLE_CONFIG");
}

#[test]
fn test_candidate_recipe_mismatch() {
    let mut loader = memory_loader();
    let swapped = read_json(&repo_root().join("tests/fixtures/levelc/candidates/metabolic_score_v1_t24.json"));
    loader.insert("tests/fixtures/levelc/candidates/inflammation_score_v1_t24.json", swapped);

    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let err = assert_fails_silently(&loader, &request(&manifest, &emit, 1e-9));
    match err {
        AuditError::RecipeMismatch { expected, actual, .. } => {
            assert_eq!(expected, "inflammation_score_v1");
            assert_eq!(actual, "metabolic_score_v1");
        }
        other => panic!("expected recipe mismatch, got {:?}", other),
    }
}

#[test]
fn test_missing_candidate_entry() {
    let mut loader = memory_loader();
    let mut manifest_doc = read_json(&repo_root().join(MANIFEST_REF));
    manifest_doc["posts"][1]["external_scores"]
        .as_object_mut()
        .unwrap()
        .remove("circadian_score_v1");
    loader.insert(MANIFEST_REF, manifest_doc);

    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let err = assert_fails_silently(&loader, &request(&manifest, &emit, 1e-9));
    assert!(matches!(err, AuditError::MalformedManifest { .. }));
    assert!(err.to_string().contains("circadian_score_v1"));
}

#[test]
fn test_candidate_with_wrong_schema() {
    let mut loader = memory_loader();
    loader.insert(
        "tests/fixtures/levelc/candidates/circadian_score_v1_t72.json",
        read_json(&repo_root().join("tests/fixtures/levelc/wearable_t72.json")),
    );
    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let err = assert_fails_silently(&loader, &request(&manifest, &emit, 1e-9));
    assert!(matches!(err, AuditError::UnexpectedSchema { .. }));
}

#[test]
fn test_raw_payload_units_mismatch() {
    let mut loader = memory_loader();
    let mut labs = read_json(&repo_root().join("tests/fixtures/levelc/labs_t168.json"));
    for row in labs["labs"].as_array_mut().unwrap() {
        if row["name"] == "crp" {
            row["unit"] = json!("mg/dL");
        }
    }
    loader.insert("tests/fixtures/levelc/labs_t168.json", labs);

    let manifest = loader.resolve(MANIFEST_REF);
    let emit = PathBuf::from("audit.json");
    let err = assert_fails_silently(&loader, &request(&manifest, &emit, 1e-9));
    assert_eq!(err.code(), "ORACLE_UNITS_MISMATCH");
    assert!(err.to_string().contains("crp: expected 'mg/L', got 'mg/dL'"));
}
