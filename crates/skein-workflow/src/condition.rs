//! `continue_if` evaluation.
//!
//! All listed conditions must hold for a workflow to move past a step:
//! - `equals`: the step result equals the expected value exactly
//! - `contains`: the expected value's text is a substring of the result's text
//! - `success`: the expected boolean matches the truthiness of the result
//!
//! Evaluation never fails outward. Anything that cannot be evaluated is
//! treated as "stop here".

use serde_json::Value;
use thiserror::Error;
use tracing::{error, warn};

use crate::definition::Conditions;

/// Why a condition set could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConditionError {
    #[error("condition '{0}' expects a boolean, got {1}")]
    NotBoolean(String, Value),

    #[error("unknown condition '{0}'")]
    Unknown(String),
}

/// Text form used by `contains`: strings as-is, everything else as JSON.
pub fn text_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Truthiness used by `success`: null, false, zero and empty values are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Evaluate every condition against a step result.
///
/// Unknown keys are skipped with a warning, or rejected when `strict`.
pub fn evaluate(
    conditions: &Conditions,
    result: &Value,
    strict: bool,
) -> Result<bool, ConditionError> {
    for (condition, expected) in conditions {
        let holds = match condition.as_str() {
            "equals" => result == expected,
            "contains" => text_form(result).contains(&text_form(expected)),
            "success" => {
                let Value::Bool(want) = expected else {
                    return Err(ConditionError::NotBoolean(condition.clone(), expected.clone()));
                };
                *want == is_truthy(result)
            }
            other if strict => return Err(ConditionError::Unknown(other.to_string())),
            other => {
                warn!(condition = other, "Ignoring unknown continue_if condition");
                true
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether a workflow should continue after a step. Evaluation errors stop it.
pub fn should_continue(
    step: &str,
    conditions: Option<&Conditions>,
    result: &Value,
    strict: bool,
) -> bool {
    let Some(conditions) = conditions.filter(|c| !c.is_empty()) else {
        return true;
    };
    match evaluate(conditions, result, strict) {
        Ok(holds) => holds,
        Err(e) => {
            error!(step, error = %e, "Failed to evaluate workflow conditions");
            false
        }
    }
}
