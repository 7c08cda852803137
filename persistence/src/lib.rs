//! FILENAME: persistence/src/lib.rs
//! Pivot Persistence Module
//!
//! Exports computed pivots as XLSX spreadsheets. The layout step
//! (`build_export_sheet`) is pure; the writer maps it onto `rust_xlsxwriter`.

mod error;
mod pivot_export;
mod xlsx_writer;

pub use error::PersistenceError;
pub use pivot_export::{build_export_sheet, ExportCell, ExportSheet, MergeRange, RowKind};
pub use xlsx_writer::{
    export_pivot_to_buffer, export_pivot_to_xlsx, save_sheet, MAX_COLUMNS, MAX_ROWS,
};
