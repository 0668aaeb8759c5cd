//! Recipes
//!
//! A recipe is a pure function from a validated payload to a `ScoreResult`.
//! Each biomarker contributes a clamped linear risk ramp; the score is the
//! weight-normalized blend of whichever parts were computable.
//!
//! | Recipe                  | Kind     | Parts (weight)                                  |
//! |-------------------------|----------|-------------------------------------------------|
//! | `inflammation_score_v1` | labs     | crp (0.6), nlr (0.4)                            |
//! | `metabolic_score_v1`    | labs     | glucose (0.4), hba1c (0.4), tg/hdl (0.2)        |
//! | `circadian_score_v1`    | wearable | hr, hrv, sleep, activity (0.25 each)            |

mod base;
mod circadian;
mod inflammation;
mod metabolic;
mod payload;
mod registry;

pub use base::{clamp, mean, pearson, ramp, QcReport, ScoreResult};
pub use payload::{labs_values, numeric, series_values};
pub use registry::{
    recipe_index, IndexProvenance, RecipeIndexEntry, RecipeKind, RecipeRegistry, RecipeSpec, RecipesIndex, ScoreFn,
};

pub const INFLAMMATION_SCORE_V1: &str = inflammation::RECIPE_ID;
pub const METABOLIC_SCORE_V1: &str = metabolic::RECIPE_ID;
pub const CIRCADIAN_SCORE_V1: &str = circadian::RECIPE_ID;
