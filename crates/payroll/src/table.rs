use std::collections::HashMap;

use crate::schema::{self, same_column};
use crate::value::{CellValue, EMPTY};

// ---------------------------------------------------------------------------
// RawTable
// ---------------------------------------------------------------------------

/// Cells of one sheet with no header applied. Row indices are absolute
/// sheet rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, idx: usize) -> &[CellValue] {
        self.rows.get(idx).map(|r| r.as_slice()).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One data row, addressed by column name.
///
/// Lookups compare trimmed names and return the `Empty` sentinel for columns
/// the row does not have.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Vec<(String, CellValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K: Into<String>>(pairs: Vec<(K, CellValue)>) -> Self {
        let mut record = Self::new();
        for (k, v) in pairs {
            let k: String = k.into();
            record.set(&k, v);
        }
        record
    }

    pub fn get(&self, column: &str) -> &CellValue {
        self.cells
            .iter()
            .find(|(name, _)| same_column(name, column))
            .map(|(_, v)| v)
            .unwrap_or(&EMPTY)
    }

    /// Trimmed string form of a cell; empty for blank cells.
    pub fn text(&self, column: &str) -> String {
        let value = self.get(column);
        if value.is_blank() {
            String::new()
        } else {
            value.to_text().trim().to_string()
        }
    }

    pub fn set(&mut self, column: &str, value: CellValue) {
        match self.cells.iter_mut().find(|(name, _)| same_column(name, column)) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((column.to_string(), value)),
        }
    }

    pub fn has(&self, column: &str) -> bool {
        self.cells.iter().any(|(name, _)| same_column(name, column))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn month(&self) -> String {
        self.text(schema::MONTH)
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header-applied rows. A loaded month table carries `Source_File` and
/// `Month` on every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Load a source sheet: apply the header, drop blank and GRAND TOTAL
    /// rows, and stamp every record with its file and month.
    pub fn from_raw(raw: &RawTable, header_row: usize, source_file: &str, month: &str) -> Self {
        let mut table = Self::with_header(raw, header_row);
        table.drop_grand_total();
        table.stamp(source_file, month);
        table
    }

    /// Apply `header_row` as column names and keep the non-blank rows below it.
    pub fn with_header(raw: &RawTable, header_row: usize) -> Self {
        let width = raw
            .rows
            .iter()
            .skip(header_row)
            .map(|r| r.len())
            .max()
            .unwrap_or(0);
        let columns = header_names(raw.row(header_row), width);

        let records = raw
            .rows
            .iter()
            .skip(header_row + 1)
            .map(|row| {
                let cells = columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| (name.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect();
                Record { cells }
            })
            .filter(|r| !r.is_blank())
            .collect();

        Self { columns, records }
    }

    /// Remove trailing "Grand Total" rows, identified by their `SR.NO` cell.
    pub fn drop_grand_total(&mut self) {
        let before = self.records.len();
        self.records
            .retain(|r| !r.text(schema::SR_NO).eq_ignore_ascii_case("GRAND TOTAL"));
        let dropped = before - self.records.len();
        if dropped > 0 {
            log::debug!("dropped {dropped} grand total row(s)");
        }
    }

    pub fn stamp(&mut self, source_file: &str, month: &str) {
        self.add_column(schema::SOURCE_FILE);
        self.add_column(schema::MONTH);
        for record in &mut self.records {
            record.set(schema::SOURCE_FILE, CellValue::text(source_file));
            record.set(schema::MONTH, CellValue::text(month));
        }
    }

    /// Set `column` to `value` on every record where it is blank.
    pub fn fill_blank(&mut self, column: &str, value: &str) {
        self.add_column(column);
        for record in &mut self.records {
            if record.get(column).is_blank() {
                record.set(column, CellValue::text(value));
            }
        }
    }

    /// Concatenate: columns become the union in first-appearance order,
    /// records keep their order.
    pub fn append(&mut self, other: Table) {
        for col in &other.columns {
            self.add_column(col);
        }
        self.records.extend(other.records);
    }

    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Self {
        let mut out = Self::default();
        for table in tables {
            out.append(table);
        }
        out
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| same_column(c, column))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }
}

/// Trimmed header names. Blank cells become `Unnamed: {idx}`, repeats get a
/// `.{n}` suffix.
fn header_names(header: &[CellValue], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..width.max(header.len()))
        .map(|idx| {
            let base = match header.get(idx) {
                Some(v) if !v.is_blank() => v.to_text().trim().to_string(),
                _ => format!("Unnamed: {idx}"),
            };
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}
