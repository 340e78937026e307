//! Condition evaluation for conditional nodes
//!
//! Evaluation never propagates an error: operand coercion failures and bad
//! regex patterns downgrade to `false` and are logged.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators for conditional nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
    Exists,
    Regex,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "equals" => Some(Operator::Equals),
            "not_equals" => Some(Operator::NotEquals),
            "contains" => Some(Operator::Contains),
            "greater_than" => Some(Operator::GreaterThan),
            "less_than" => Some(Operator::LessThan),
            "exists" => Some(Operator::Exists),
            "regex" => Some(Operator::Regex),
            _ => None,
        }
    }
}

/// Render a context value as the string used for comparison
fn coerce_str(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Parse a comparison operand as a number
fn coerce_num(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Evaluate `actual <operator> expected`
///
/// - equals / not_equals / contains compare string renderings
/// - greater_than / less_than parse both operands as numbers; parse failure
///   yields `false`, not an error
/// - exists is true iff the variable is bound and non-empty
/// - regex treats the expected value as the pattern and searches the actual
///   value for a match
pub fn evaluate_condition(actual: Option<&Value>, operator: Operator, expected: &str) -> bool {
    let bound = actual.map(coerce_str);

    match operator {
        Operator::Exists => match &bound {
            Some(s) => !s.is_empty() && actual != Some(&Value::Null),
            None => false,
        },
        Operator::Equals => bound.as_deref() == Some(expected),
        Operator::NotEquals => bound.as_deref() != Some(expected),
        Operator::Contains => bound
            .as_deref()
            .map(|s| s.contains(expected))
            .unwrap_or(false),
        Operator::GreaterThan => match (bound.as_deref().and_then(coerce_num), coerce_num(expected))
        {
            (Some(a), Some(b)) => a > b,
            _ => {
                tracing::debug!(
                    ?bound,
                    expected,
                    "greater_than operands not numeric, evaluating to false"
                );
                false
            }
        },
        Operator::LessThan => match (bound.as_deref().and_then(coerce_num), coerce_num(expected)) {
            (Some(a), Some(b)) => a < b,
            _ => {
                tracing::debug!(
                    ?bound,
                    expected,
                    "less_than operands not numeric, evaluating to false"
                );
                false
            }
        },
        Operator::Regex => {
            let Some(haystack) = bound else {
                return false;
            };
            match Regex::new(expected) {
                Ok(re) => re.is_match(&haystack),
                Err(e) => {
                    tracing::warn!(pattern = expected, error = %e, "Invalid condition regex");
                    false
                }
            }
        }
    }
}
