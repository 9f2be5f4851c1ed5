//! Pure evaluation rules behind the control-flow and arithmetic nodes.

pub mod arithmetic;
pub mod condition;
pub mod switch;

pub use arithmetic::{apply_arithmetic, round_to, ArithmeticOp};
pub use condition::{evaluate_condition, evaluate_conditions, BranchCondition, ConditionOperator};
pub use split_test::{cumulative_ladder, find_sticky_split, pick_split, sticky_key, Split};
pub use switch::{select_case, SwitchCase, SEGMENT_ID_FIELD};
