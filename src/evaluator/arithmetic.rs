use crate::flow::OpTag;

/// Binary arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
}

impl ArithmeticOp {
    pub fn from_op(op: OpTag) -> Option<Self> {
        match op {
            OpTag::Add => Some(ArithmeticOp::Add),
            OpTag::Subtract => Some(ArithmeticOp::Subtract),
            OpTag::Multiply => Some(ArithmeticOp::Multiply),
            OpTag::Divide => Some(ArithmeticOp::Divide),
            OpTag::Power => Some(ArithmeticOp::Power),
            OpTag::Modulo => Some(ArithmeticOp::Modulo),
            _ => None,
        }
    }
}

/// Plain IEEE-754 arithmetic. Division and modulo by zero are not guarded:
/// they yield infinity or NaN.
pub fn apply_arithmetic(op: ArithmeticOp, a: f64, b: f64) -> f64 {
    match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Subtract => a - b,
        ArithmeticOp::Multiply => a * b,
        ArithmeticOp::Divide => a / b,
        ArithmeticOp::Power => a.powf(b),
        ArithmeticOp::Modulo => a % b,
    }
}

/// Round half away from zero to `digits` decimals.
pub fn round_to(value: f64, digits: i32) -> f64 {
    if digits <= 0 {
        return value.round();
    }
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_ops() {
        assert_eq!(apply_arithmetic(ArithmeticOp::Add, 2.0, 3.0), 5.0);
        assert_eq!(apply_arithmetic(ArithmeticOp::Subtract, 2.0, 3.0), -1.0);
        assert_eq!(apply_arithmetic(ArithmeticOp::Multiply, 2.5, 4.0), 10.0);
        assert_eq!(apply_arithmetic(ArithmeticOp::Divide, 9.0, 2.0), 4.5);
        assert_eq!(apply_arithmetic(ArithmeticOp::Power, 2.0, 10.0), 1024.0);
        assert_eq!(apply_arithmetic(ArithmeticOp::Modulo, 7.0, 3.0), 1.0);
    }

    #[test]
    fn test_division_by_zero_is_not_guarded() {
        assert_eq!(apply_arithmetic(ArithmeticOp::Divide, 1.0, 0.0), f64::INFINITY);
        assert_eq!(apply_arithmetic(ArithmeticOp::Divide, -1.0, 0.0), f64::NEG_INFINITY);
        assert!(apply_arithmetic(ArithmeticOp::Divide, 0.0, 0.0).is_nan());
        assert!(apply_arithmetic(ArithmeticOp::Modulo, 5.0, 0.0).is_nan());
    }

    #[test]
    fn test_from_op() {
        assert_eq!(ArithmeticOp::from_op(OpTag::Power), Some(ArithmeticOp::Power));
        assert_eq!(ArithmeticOp::from_op(OpTag::Ceil), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(2.346, 2), 2.35);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
    }
}
