//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates measure formula ASTs against the values of one pivot cell.
//! CONTEXT: The parser produces an `Expression`; this module walks it,
//! asking a `MeasureResolver` for every `[AGG(field)]` reference. The
//! evaluator never executes user text: only the four arithmetic operators
//! and numeric literals exist in the tree.
//!
//! FAILURE MODES (all reported as `EvalError`):
//! - a reference to a measure that is not configured
//! - division by zero
//! - any non-finite intermediate or final result

use parser::{BinaryOperator, Expression, MeasureRef, UnaryOperator};
use thiserror::Error;

/// How a measure reference resolved against the current cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// The measure is configured and has a value in this cell.
    Value(f64),
    /// The measure is configured but has no value here; reads as 0.
    Missing,
    /// No configured measure matches the reference.
    Unknown,
}

/// Supplies values for measure references during evaluation.
pub trait MeasureResolver {
    fn resolve(&self, measure: &MeasureRef) -> Resolution;
}

impl<F> MeasureResolver for F
where
    F: Fn(&MeasureRef) -> Resolution,
{
    fn resolve(&self, measure: &MeasureRef) -> Resolution {
        self(measure)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unknown measure {0}")]
    UnknownMeasure(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

pub type EvalResult = Result<f64, EvalError>;

/// Walks an expression tree using one resolver.
pub struct Evaluator<'a, R: MeasureResolver + ?Sized> {
    resolver: &'a R,
}

impl<'a, R: MeasureResolver + ?Sized> Evaluator<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Evaluator { resolver }
    }

    pub fn evaluate(&self, expr: &Expression) -> EvalResult {
        let value = match expr {
            Expression::Number(n) => *n,
            Expression::MeasureRef(measure) => match self.resolver.resolve(measure) {
                Resolution::Value(v) => v,
                Resolution::Missing => 0.0,
                Resolution::Unknown => return Err(EvalError::UnknownMeasure(measure.to_string())),
            },
            Expression::UnaryOp { op, operand } => {
                let v = self.evaluate(operand)?;
                match op {
                    UnaryOperator::Negate => -v,
                    UnaryOperator::Plus => v,
                }
            }
            Expression::BinaryOp { left, op, right } => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                self.eval_binary_op(l, *op, r)?
            }
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(EvalError::NonFinite)
        }
    }

    fn eval_binary_op(&self, left: f64, op: BinaryOperator, right: f64) -> EvalResult {
        match op {
            BinaryOperator::Add => Ok(left + right),
            BinaryOperator::Subtract => Ok(left - right),
            BinaryOperator::Multiply => Ok(left * right),
            BinaryOperator::Divide if right == 0.0 => Err(EvalError::DivisionByZero),
            BinaryOperator::Divide => Ok(left / right),
        }
    }
}

/// Convenience function to evaluate an expression with a resolver.
pub fn evaluate<R: MeasureResolver + ?Sized>(expr: &Expression, resolver: &R) -> EvalResult {
    Evaluator::new(resolver).evaluate(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parser::parse;

    fn sales_and_cost(measure: &MeasureRef) -> Resolution {
        match (measure.aggregation.as_str(), measure.field.as_str()) {
            ("SUM", "Sales") => Resolution::Value(100.0),
            ("SUM", "Cost") => Resolution::Value(40.0),
            ("AVERAGE", "Cost") => Resolution::Missing,
            _ => Resolution::Unknown,
        }
    }

    #[test]
    fn evaluates_measure_difference() {
        let expr = parse("[SUM(Sales)] - [SUM(Cost)]").unwrap();
        assert_eq!(evaluate(&expr, &sales_and_cost), Ok(60.0));
    }

    #[test]
    fn missing_measures_read_as_zero() {
        let expr = parse("[SUM(Sales)] - [AVERAGE(Cost)]").unwrap();
        assert_eq!(evaluate(&expr, &sales_and_cost), Ok(100.0));
    }

    #[test]
    fn unknown_measures_fail() {
        let expr = parse("[SUM(Sales)] + [MAX(Profit)]").unwrap();
        assert_eq!(
            evaluate(&expr, &sales_and_cost),
            Err(EvalError::UnknownMeasure("[MAX(Profit)]".to_string()))
        );
    }

    #[test]
    fn division_by_zero_fails() {
        let expr = parse("[SUM(Sales)] / ([SUM(Cost)] - 40)").unwrap();
        assert_eq!(evaluate(&expr, &sales_and_cost), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn overflow_is_not_finite() {
        let expr = parse("1e308 * 10").unwrap();
        assert_eq!(evaluate(&expr, &sales_and_cost), Err(EvalError::NonFinite));
    }

    #[test]
    fn respects_precedence_and_unary_minus() {
        let expr = parse("-(2 + 3) * 4 / [SUM(Cost)]").unwrap();
        assert_eq!(evaluate(&expr, &sales_and_cost), Ok(-0.5));
    }
}
