//! Recipe registry
//!
//! Built once, sorted by id, never mutated afterwards. Lookups by unknown id
//! fail with `UnknownRecipe`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::base::ScoreResult;
use super::{circadian, inflammation, metabolic};
use crate::config::ProvenanceContext;
use crate::errors::{AuditError, AuditResult};
use crate::io::{labs_units_view, wearable_units_view, UnitsView, RECIPES_INDEX_SCHEMA_V1};

/// Input payload family a recipe consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeKind {
    Labs,
    Wearable,
}

impl RecipeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeKind::Labs => "labs",
            RecipeKind::Wearable => "wearable",
        }
    }

    /// Units declared by a payload of this kind.
    pub fn units_view(&self, payload: &Value) -> UnitsView {
        match self {
            RecipeKind::Labs => labs_units_view(payload),
            RecipeKind::Wearable => wearable_units_view(payload),
        }
    }
}

impl fmt::Display for RecipeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pure scoring function over a validated payload
pub type ScoreFn = fn(&Value) -> ScoreResult;

#[derive(Clone)]
pub struct RecipeSpec {
    pub id: String,
    pub kind: RecipeKind,
    pub expected_units: BTreeMap<String, String>,
    score_fn: ScoreFn,
}

impl RecipeSpec {
    pub fn new(id: &str, kind: RecipeKind, expected_units: &[(&str, &str)], score_fn: ScoreFn) -> Self {
        Self {
            id: id.to_string(),
            kind,
            expected_units: expected_units
                .iter()
                .map(|(k, u)| (k.to_string(), u.to_string()))
                .collect(),
            score_fn,
        }
    }

    pub fn run(&self, payload: &Value) -> ScoreResult {
        (self.score_fn)(payload)
    }
}

impl fmt::Debug for RecipeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipeSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("expected_units", &self.expected_units)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RecipeRegistry {
    recipes: BTreeMap<String, RecipeSpec>,
}

static BUILTIN: OnceLock<RecipeRegistry> = OnceLock::new();

impl RecipeRegistry {
    /// The three shipped recipes.
    pub fn builtin() -> Self {
        Self::from_specs(vec![
            RecipeSpec::new(
                inflammation::RECIPE_ID,
                RecipeKind::Labs,
                inflammation::EXPECTED_UNITS,
                inflammation::run,
            ),
            RecipeSpec::new(
                metabolic::RECIPE_ID,
                RecipeKind::Labs,
                metabolic::EXPECTED_UNITS,
                metabolic::run,
            ),
            RecipeSpec::new(
                circadian::RECIPE_ID,
                RecipeKind::Wearable,
                circadian::EXPECTED_UNITS,
                circadian::run,
            ),
        ])
    }

    /// Process-wide builtin registry, constructed on first use.
    pub fn global() -> &'static RecipeRegistry {
        BUILTIN.get_or_init(Self::builtin)
    }

    /// Later specs with a repeated id replace earlier ones.
    pub fn from_specs(specs: Vec<RecipeSpec>) -> Self {
        let recipes = specs.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self { recipes }
    }

    pub fn get(&self, recipe_id: &str) -> AuditResult<&RecipeSpec> {
        self.recipes.get(recipe_id).ok_or_else(|| AuditError::UnknownRecipe {
            recipe_id: recipe_id.to_string(),
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RecipeSpec> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexProvenance {
    pub tool_version: String,
    pub created_utc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIndexEntry {
    pub recipe_id: String,
    pub kind: RecipeKind,
    pub expected_units: BTreeMap<String, String>,
}

/// Document listing every registered recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipesIndex {
    pub schema: String,
    pub provenance: IndexProvenance,
    pub recipes: Vec<RecipeIndexEntry>,
}

pub fn recipe_index(registry: &RecipeRegistry, ctx: &ProvenanceContext) -> RecipesIndex {
    RecipesIndex {
        schema: RECIPES_INDEX_SCHEMA_V1.to_string(),
        provenance: IndexProvenance {
            tool_version: ctx.tool_version.clone(),
            created_utc: ctx.stamp(),
        },
        recipes: registry
            .iter()
            .map(|spec| RecipeIndexEntry {
                recipe_id: spec.id.clone(),
                kind: spec.kind,
                expected_units: spec.expected_units.clone(),
            })
            .collect(),
    }
}
