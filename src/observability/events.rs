//! Observable events
//!
//! Events are explicit and typed. They cover scoring, comparison,
//! recovery/plasticity derivation, tool audits and artifact emission.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration resolved
    ConfigLoaded,
    /// Schema registry indexed
    SchemasIndexed,

    // Scoring
    /// Oracle scoring of one payload started
    ScoreStart,
    /// Oracle score artifact built
    ScoreComplete,
    /// Units gate rejected a payload
    UnitsGateFailed,

    // Comparators
    /// Score comparison produced
    ScoreCompared,
    /// Recovery report derived
    RecoveryComputed,
    /// Plasticity2 report derived
    PlasticityComputed,

    // Tool audit
    /// Tool audit run started
    AuditStart,
    /// Candidate artifact loaded and checked
    CandidateLoaded,
    /// Per-recipe verdict reached
    RecipeAudited,
    /// Tool audit run complete
    AuditComplete,
    /// Tool audit run aborted
    AuditFailed,

    // Output
    /// Artifact written to its sink
    ReportWritten,
}

impl Event {
    /// Returns the event name string
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemasIndexed => "SCHEMAS_INDEXED",
            Event::ScoreStart => "SCORE_START",
            Event::ScoreComplete => "SCORE_COMPLETE",
            Event::UnitsGateFailed => "UNITS_GATE_FAILED",
            Event::ScoreCompared => "SCORE_COMPARED",
            Event::RecoveryComputed => "RECOVERY_COMPUTED",
            Event::PlasticityComputed => "PLASTICITY_COMPUTED",
            Event::AuditStart => "AUDIT_START",
            Event::CandidateLoaded => "CANDIDATE_LOADED",
            Event::RecipeAudited => "RECIPE_AUDITED",
            Event::AuditComplete => "AUDIT_COMPLETE",
            Event::AuditFailed => "AUDIT_FAILED",
            Event::ReportWritten => "REPORT_WRITTEN",
        }
    }

    /// Returns true if this event signals an aborted operation
    pub fn is_failure(&self) -> bool {
        matches!(self, Event::UnitsGateFailed | Event::AuditFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
