//! I/O subsystem
//!
//! - Repository root discovery and ref resolution
//! - Schema registry (JSON Schema Draft 2020-12, indexed by `$id`)
//! - Document loaders: parse + validate before anything is trusted
//! - Units gate
//! - Artifact sinks
//!
//! Loaders and sinks are traits so the audit pipeline can run fully in memory.

mod loader;
mod repo;
mod schemas;
mod sink;
mod units;

pub use loader::{DocumentLoader, MemoryLoader, RepoLoader};
pub use repo::{resolve_ref, RepoPaths};
pub use schemas::{
    declared_schema, expect_schema, SchemaRegistry, INTERVENTION_MANIFEST_SCHEMA_V1, LABS_PANEL_SCHEMA_V1,
    PLASTICITY2_SCHEMA_V1, RECIPES_INDEX_SCHEMA_V1, RECOVERY_SCHEMA_V1, SCORE_COMPARE_SCHEMA_V1,
    SCORE_SCHEMA_V1, TOOL_AUDIT_SCHEMA_V1, WEARABLE_TIMESERIES_SCHEMA_V1,
};
pub use sink::{emit_document, ArtifactSink, FsSink, MemorySink};
pub use units::{assert_units, labs_units_view, wearable_units_view, UnitsView};
