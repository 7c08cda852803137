//! FILENAME: persistence/src/xlsx_writer.rs

use crate::pivot_export::{build_export_sheet, ExportCell, ExportSheet, RowKind};
use crate::PersistenceError;
use pivot_engine::{DisplayOptions, PivotConfig, PivotResult};
use rust_xlsxwriter::{Format, FormatAlign, Workbook, Worksheet};
use rustc_hash::FxHashSet;
use std::path::Path;

/// Excel's worksheet bounds.
pub const MAX_ROWS: usize = 1_048_576;
pub const MAX_COLUMNS: usize = 16_384;

/// Writes `result` as an `.xlsx` file at `path`.
pub fn export_pivot_to_xlsx(
    result: &PivotResult,
    config: &PivotConfig,
    options: &DisplayOptions,
    path: &Path,
) -> Result<(), PersistenceError> {
    let sheet = build_export_sheet(result, config, options);
    save_sheet(&sheet, path)
}

/// Renders `result` as `.xlsx` bytes.
pub fn export_pivot_to_buffer(
    result: &PivotResult,
    config: &PivotConfig,
    options: &DisplayOptions,
) -> Result<Vec<u8>, PersistenceError> {
    let sheet = build_export_sheet(result, config, options);
    let mut workbook = build_workbook(&sheet)?;
    Ok(workbook.save_to_buffer()?)
}

/// Writes an already laid out sheet to `path`.
pub fn save_sheet(sheet: &ExportSheet, path: &Path) -> Result<(), PersistenceError> {
    let outcome = build_workbook(sheet)
        .and_then(|mut workbook| workbook.save(path).map_err(PersistenceError::from));

    match &outcome {
        Ok(()) => log::info!(
            target: "export",
            "wrote pivot sheet {}x{} to {}",
            sheet.height(),
            sheet.width(),
            path.display()
        ),
        Err(e) => log::error!(target: "export", "failed to write {}: {}", path.display(), e),
    }
    outcome
}

fn build_workbook(sheet: &ExportSheet) -> Result<Workbook, PersistenceError> {
    if sheet.height() > MAX_ROWS || sheet.width() > MAX_COLUMNS {
        return Err(PersistenceError::SheetTooLarge {
            rows: sheet.height(),
            columns: sheet.width(),
        });
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet.name)?;

    let header_format = Format::new().set_bold().set_align(FormatAlign::Center);
    let total_format = Format::new().set_bold();

    // Merged header cells are written once, through merge_range
    let mut merged = FxHashSet::default();
    for merge in &sheet.merges {
        let label = sheet
            .cell(merge.row, merge.first_column)
            .as_text()
            .unwrap_or_default();
        worksheet.merge_range(
            merge.row as u32,
            merge.first_column as u16,
            merge.row as u32,
            merge.last_column as u16,
            label,
            &header_format,
        )?;
        merged.extend((merge.first_column..=merge.last_column).map(|c| (merge.row, c)));
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        let format = match sheet.row_kinds.get(r) {
            Some(RowKind::Header) => Some(&header_format),
            Some(RowKind::Subtotal | RowKind::GrandTotal) => Some(&total_format),
            _ => None,
        };

        for (c, cell) in row.iter().enumerate() {
            if merged.contains(&(r, c)) {
                continue;
            }
            write_cell(worksheet, r as u32, c as u16, cell, format)?;
        }
    }

    if sheet.header_rows > 0 {
        worksheet.set_freeze_panes(sheet.header_rows as u32, sheet.label_columns as u16)?;
    }

    Ok(workbook)
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &ExportCell,
    format: Option<&Format>,
) -> Result<(), PersistenceError> {
    match (cell, format) {
        // cells without source rows stay blank
        (ExportCell::Empty, _) => {}
        (ExportCell::Text(s), Some(fmt)) => {
            worksheet.write_string_with_format(row, col, s, fmt)?;
        }
        (ExportCell::Text(s), None) => {
            worksheet.write_string(row, col, s)?;
        }
        (ExportCell::Number(n), Some(fmt)) => {
            worksheet.write_number_with_format(row, col, *n, fmt)?;
        }
        (ExportCell::Number(n), None) => {
            worksheet.write_number(row, col, *n)?;
        }
    }
    Ok(())
}
