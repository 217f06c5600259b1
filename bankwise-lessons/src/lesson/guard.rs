//! Value guards attached to conditions.
//!
//! A guard is a map from parameter name to the value the incoming action
//! must carry. Plain literals use exact equality with no coercion between
//! JSON kinds. Comparison objects (`{ op = ">=", value = 100 }`) allow
//! ordered checks on numeric parameters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters carried by an action event.
pub type ActionParams = Map<String, Value>;

/// Build [`ActionParams`] from a JSON value.
///
/// Non-object values yield an empty parameter map.
pub fn action_params(value: Value) -> ActionParams {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Comparison operator for explicit guard comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
}

impl CompareOp {
    /// Symbol as written in lesson definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    fn is_ordered(&self) -> bool {
        matches!(
            self,
            CompareOp::Gt | CompareOp::Ge | CompareOp::Lt | CompareOp::Le
        )
    }
}

/// An explicit comparison against an action parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Comparison {
    pub op: CompareOp,
    pub value: Value,
}

/// One entry of a guard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GuardValue {
    /// `{ op, value }` comparison.
    Compare(Comparison),
    /// Literal that must be equal.
    Exact(Value),
}

impl GuardValue {
    fn matches(&self, actual: &Value) -> Result<(), MismatchReason> {
        match self {
            GuardValue::Exact(expected) => {
                if values_equal(expected, actual) {
                    Ok(())
                } else {
                    Err(MismatchReason::NotEqual)
                }
            }
            GuardValue::Compare(cmp) => compare(cmp, actual),
        }
    }
}

/// Why a guard did not match. Not an error: the condition is simply not met yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchReason {
    /// Parameter absent from the action.
    Missing,
    /// Literal differs.
    NotEqual,
    /// Comparison evaluated to false.
    OutOfRange,
    /// Ordered comparison on a non-numeric value.
    NotComparable,
}

/// A guard entry that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardMismatch {
    pub key: String,
    pub reason: MismatchReason,
}

impl fmt::Display for GuardMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            MismatchReason::Missing => "missing",
            MismatchReason::NotEqual => "not equal",
            MismatchReason::OutOfRange => "out of range",
            MismatchReason::NotComparable => "not comparable",
        };
        write!(f, "guard on '{}' {}", self.key, reason)
    }
}

/// Value guard of a condition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard {
    entries: BTreeMap<String, GuardValue>,
}

impl Guard {
    /// Create an empty guard (always satisfied).
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `key` to equal `value` exactly.
    #[must_use]
    pub fn exact(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries
            .insert(key.into(), GuardValue::Exact(value.into()));
        self
    }

    /// Require `key` to satisfy `op value`.
    #[must_use]
    pub fn compare(mut self, key: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        self.entries.insert(
            key.into(),
            GuardValue::Compare(Comparison {
                op,
                value: value.into(),
            }),
        );
        self
    }

    /// Number of guarded parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the guard has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Guard entries by parameter name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &GuardValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Evaluate the guard against action parameters.
    ///
    /// Every key must be present and match; the first failing key is reported.
    pub fn evaluate(&self, params: &ActionParams) -> Result<(), GuardMismatch> {
        for (key, expected) in &self.entries {
            let Some(actual) = params.get(key) else {
                return Err(GuardMismatch {
                    key: key.clone(),
                    reason: MismatchReason::Missing,
                });
            };
            expected.matches(actual).map_err(|reason| GuardMismatch {
                key: key.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Rewrite numeric literals for `*_above` / `*_below` condition types.
    ///
    /// Condition types such as `checking_balance_above` encode their operator
    /// in the name. Literal numeric entries become `>` or `<` comparisons.
    /// Returns the number of rewritten entries.
    pub fn normalize_for(&mut self, condition_type: &str) -> usize {
        let op = if condition_type.ends_with("_above") {
            CompareOp::Gt
        } else if condition_type.ends_with("_below") {
            CompareOp::Lt
        } else {
            return 0;
        };

        let mut rewritten = 0;
        for value in self.entries.values_mut() {
            let GuardValue::Exact(literal @ Value::Number(_)) = value else {
                continue;
            };
            let literal = literal.clone();
            *value = GuardValue::Compare(Comparison { op, value: literal });
            rewritten += 1;
        }
        rewritten
    }
}

impl From<BTreeMap<String, GuardValue>> for Guard {
    fn from(entries: BTreeMap<String, GuardValue>) -> Self {
        Self { entries }
    }
}

/// Strict equality between JSON values.
///
/// Numbers compare by value so `100` equals `100.0`; every other kind must
/// match exactly, so `"100"` never equals `100`.
pub fn values_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64()) {
                return a == b;
            }
            if let (Some(a), Some(b)) = (a.as_u64(), b.as_u64()) {
                return a == b;
            }
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => expected == actual,
    }
}

fn compare(cmp: &Comparison, actual: &Value) -> Result<(), MismatchReason> {
    let numbers = (cmp.value.as_f64(), actual.as_f64());
    if cmp.op.is_ordered() && !matches!(numbers, (Some(_), Some(_))) {
        return Err(MismatchReason::NotComparable);
    }

    let ordered = |check: fn(f64, f64) -> bool| match numbers {
        (Some(expected), Some(actual)) => check(actual, expected),
        _ => false,
    };
    let holds = match cmp.op {
        CompareOp::Eq => values_equal(&cmp.value, actual),
        CompareOp::Ne => !values_equal(&cmp.value, actual),
        CompareOp::Gt => ordered(|a, e| a > e),
        CompareOp::Ge => ordered(|a, e| a >= e),
        CompareOp::Lt => ordered(|a, e| a < e),
        CompareOp::Le => ordered(|a, e| a <= e),
    };
    if holds {
        Ok(())
    } else {
        Err(MismatchReason::OutOfRange)
    }
}
