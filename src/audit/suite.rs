//! Contract suites: named, ordered recipe lists an audit runs against.

use serde::{Deserialize, Serialize};

use crate::errors::{AuditError, AuditResult};
use crate::recipes::{CIRCADIAN_SCORE_V1, INFLAMMATION_SCORE_V1, METABOLIC_SCORE_V1};

pub const BIOMED_V1: &str = "biomed_v1";
/// Older name of `biomed_v1`
pub const BIOMED_LEVELC_V1: &str = "biomed_levelc_v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSuite {
    /// The name as requested (aliases are echoed, not rewritten)
    pub suite: String,
    pub recipes: Vec<String>,
}

pub fn resolve_suite(name: &str) -> AuditResult<ContractSuite> {
    let recipes = match name.trim() {
        BIOMED_V1 | BIOMED_LEVELC_V1 => vec![INFLAMMATION_SCORE_V1, METABOLIC_SCORE_V1, CIRCADIAN_SCORE_V1],
        _ => {
            return Err(AuditError::UnknownSuite {
                suite: name.to_string(),
            })
        }
    };
    Ok(ContractSuite {
        suite: name.to_string(),
        recipes: recipes.into_iter().map(str::to_string).collect(),
    })
}
