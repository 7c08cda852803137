//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the tabular data engine.
//! CONTEXT: Re-exports the source data model (`Table`, `CellValue`), the
//! value coercions shared by every pivot stage, and the formula evaluator
//! used for calculated measures.

pub mod cell;
pub mod evaluator;
pub mod table;

// Re-export commonly used types at the crate root
pub use cell::{parse_float_prefix, CellValue};
pub use evaluator::{evaluate, EvalError, EvalResult, Evaluator, MeasureResolver, Resolution};
pub use parser::{Expression, MeasureRef};
pub use table::{FieldIndex, RowIndex, Table};
