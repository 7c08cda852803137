//! FILENAME: engine/src/table.rs
//! PURPOSE: The in-memory source table consumed by the pivot engine.
//! CONTEXT: Rows are stored positionally against one shared field list, so a
//! field lookup is a name -> index resolution done once per computation
//! followed by indexed reads. Rows missing a field read as `CellValue::Empty`.

use crate::cell::CellValue;
use serde_json::Value as JsonValue;

/// Index of a field (column) in a `Table`.
pub type FieldIndex = usize;

/// Index of a row in a `Table`.
pub type RowIndex = usize;

static EMPTY: CellValue = CellValue::Empty;

/// An ordered sequence of rows sharing one field list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    fields: Vec<String>,
    records: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(fields: Vec<String>) -> Self {
        Table {
            fields,
            records: Vec::new(),
        }
    }

    /// Builds a table from a field list and positional rows.
    pub fn from_rows(fields: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let mut table = Table::new(fields);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Builds a table from a JSON array of objects, e.g.
    /// `[{"region": "East", "sales": 10}, {"region": null}]`.
    ///
    /// Fields are registered in the order they are first met. Nested arrays
    /// and objects are kept as their JSON text.
    pub fn from_json_rows(json: &str) -> Result<Self, serde_json::Error> {
        let objects: Vec<serde_json::Map<String, JsonValue>> = serde_json::from_str(json)?;
        let mut table = Table::default();

        for object in objects {
            let mut row = vec![CellValue::Empty; table.fields.len()];
            for (name, value) in object {
                let index = match table.field_index(&name) {
                    Some(index) => index,
                    None => table.add_field(name),
                };
                if row.len() <= index {
                    row.resize(index + 1, CellValue::Empty);
                }
                row[index] = json_to_cell(value);
            }
            table.push_row(row);
        }

        Ok(table)
    }

    /// Appends a field and returns its index. Existing rows read it as empty.
    pub fn add_field(&mut self, name: impl Into<String>) -> FieldIndex {
        self.fields.push(name.into());
        self.fields.len() - 1
    }

    /// Appends a row. Short rows are padded with empties, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<CellValue>) {
        row.resize(self.fields.len(), CellValue::Empty);
        self.records.push(row);
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<FieldIndex> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn row(&self, row: RowIndex) -> Option<&[CellValue]> {
        self.records.get(row).map(Vec::as_slice)
    }

    /// Reads one value. Out-of-range rows or fields read as empty.
    pub fn value(&self, row: RowIndex, field: FieldIndex) -> &CellValue {
        self.records
            .get(row)
            .and_then(|r| r.get(field))
            .unwrap_or(&EMPTY)
    }

    /// Reads one value by optional field index; an unresolved field is empty.
    pub fn value_opt(&self, row: RowIndex, field: Option<FieldIndex>) -> &CellValue {
        match field {
            Some(field) => self.value(row, field),
            None => &EMPTY,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &[CellValue]> {
        self.records.iter().map(Vec::as_slice)
    }
}

fn json_to_cell(value: JsonValue) -> CellValue {
    match value {
        JsonValue::Null => CellValue::Empty,
        JsonValue::Bool(b) => CellValue::Boolean(b),
        JsonValue::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        JsonValue::String(s) => CellValue::Text(s),
        nested => CellValue::Text(nested.to_string()),
    }
}
