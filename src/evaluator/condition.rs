use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::VariableStore;
use crate::error::NodeResult;
use crate::value::{to_display_string, to_number, NumberLocale, ValueRef};

/// Branch comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "includes")]
    Includes,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

/// One `{value1, value2, operator}` condition of an `i_branch` node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub value1: ValueRef,
    pub value2: ValueRef,
    pub operator: ConditionOperator,
}

/// AND over every condition. All conditions are evaluated and logged even
/// after one has failed. An empty list is `true`.
pub fn evaluate_conditions(
    conditions: &[BranchCondition],
    prev: &Value,
    store: &VariableStore,
    locale: &NumberLocale,
) -> bool {
    let mut result = true;
    for (index, cond) in conditions.iter().enumerate() {
        let passed = match evaluate_condition(cond, prev, store, locale) {
            Ok(passed) => passed,
            Err(e) => {
                tracing::debug!(index, error = %e, "condition operands not comparable");
                false
            }
        };
        tracing::debug!(index, operator = ?cond.operator, passed, "branch condition evaluated");
        if !passed {
            result = false;
        }
    }
    result
}

/// Evaluate one condition. String operators compare display forms,
/// relational operators compare numbers.
pub fn evaluate_condition(
    cond: &BranchCondition,
    prev: &Value,
    store: &VariableStore,
    locale: &NumberLocale,
) -> NodeResult<bool> {
    let left = cond.value1.resolve_or_null(prev, store);
    let right = cond.value2.resolve_or_null(prev, store);

    let passed = match cond.operator {
        ConditionOperator::Equal => to_display_string(&left) == to_display_string(&right),
        ConditionOperator::NotEqual => to_display_string(&left) != to_display_string(&right),
        ConditionOperator::Includes => {
            to_display_string(&left).contains(&to_display_string(&right))
        }
        ConditionOperator::GreaterThan => to_number(&left, locale)? > to_number(&right, locale)?,
        ConditionOperator::LessThan => to_number(&left, locale)? < to_number(&right, locale)?,
        ConditionOperator::GreaterOrEqual => {
            to_number(&left, locale)? >= to_number(&right, locale)?
        }
        ConditionOperator::LessOrEqual => to_number(&left, locale)? <= to_number(&right, locale)?,
    };
    Ok(passed)
}
