//! FILENAME: parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for measure formulas.
//! CONTEXT: After the Lexer tokenizes a formula string, the Parser converts
//! those tokens into this tree structure. The evaluator in the `engine`
//! crate then traverses the tree, resolving measure references against the
//! aggregated values of one pivot cell.
//!
//! SUPPORTED EXPRESSIONS:
//! - Numeric literals: 42, 0.5, 1e3
//! - Measure references: [SUM(Sales)], [COUNT(Order Id)]
//! - Binary operations: +, -, *, /
//! - Unary operations: - and +

/// Represents a parsed measure formula.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// A numeric literal.
    Number(f64),

    /// A reference to an aggregated value field of the same cell.
    MeasureRef(MeasureRef),

    /// A binary operation: left op right.
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., -5).
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

/// A bracketed `[AGG(field)]` reference.
/// The aggregation keyword is normalized to upper case; the field name is
/// kept as written (trimmed).
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct MeasureRef {
    pub aggregation: String,
    pub field: String,
}

impl MeasureRef {
    pub fn new(aggregation: impl Into<String>, field: impl Into<String>) -> Self {
        MeasureRef {
            aggregation: aggregation.into().to_uppercase(),
            field: field.into(),
        }
    }
}

/// Binary operators, in two precedence groups.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    // Additive (lower precedence)
    Add,      // +
    Subtract, // -

    // Multiplicative
    Multiply, // *
    Divide,   // /
}

/// Unary operators.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Negate, // -
    Plus,   // +
}

impl Expression {
    /// Collects every measure reference in evaluation order (duplicates kept).
    pub fn measure_refs(&self) -> Vec<&MeasureRef> {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        refs
    }

    fn collect_refs<'a>(&'a self, refs: &mut Vec<&'a MeasureRef>) {
        match self {
            Expression::Number(_) => {}
            Expression::MeasureRef(r) => refs.push(r),
            Expression::BinaryOp { left, right, .. } => {
                left.collect_refs(refs);
                right.collect_refs(refs);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_refs(refs),
        }
    }
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Add => write!(f, "+"),
            BinaryOperator::Subtract => write!(f, "-"),
            BinaryOperator::Multiply => write!(f, "*"),
            BinaryOperator::Divide => write!(f, "/"),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Negate => write!(f, "-"),
            UnaryOperator::Plus => write!(f, "+"),
        }
    }
}

impl std::fmt::Display for MeasureRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}({})]", self.aggregation, self.field)
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Number(n) => write!(f, "{}", n),
            Expression::MeasureRef(r) => write!(f, "{}", r),
            Expression::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expression::UnaryOp { op, operand } => write!(f, "{}{}", op, operand),
        }
    }
}
