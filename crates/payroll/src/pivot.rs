use std::collections::{BTreeMap, BTreeSet};

use crate::error::PayrollError;
use crate::projection::{forced_columns, project_terminal_row};
use crate::schema::{self, same_column, Schema};
use crate::table::{Record, Table};
use crate::totals::{compute_totals, Totals};
use crate::value::CellValue;

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// All rows of one employee, in merged-table order.
#[derive(Debug, Clone)]
pub struct EmployeeRecords {
    pub name: String,
    pub rows: Vec<Record>,
}

/// Trimmed, upper-cased employee name.
pub fn normalize_name(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        other => other.to_text().trim().to_uppercase(),
    }
}

/// Blank, "NAN" and grand-total rows never name an employee.
pub fn is_employee_name(name: &str) -> bool {
    !name.is_empty() && name != "NAN" && !name.contains("GRAND TOTAL")
}

/// Group the merged table by normalized employee name, sorted by name.
pub fn partition_employees(table: &Table, schema: &Schema) -> Vec<EmployeeRecords> {
    let mut groups: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    let mut unknown_months: BTreeSet<String> = BTreeSet::new();
    let mut skipped = 0usize;

    for record in &table.records {
        let name = normalize_name(record.get(schema::EMPLOYEE_NAME));
        if !is_employee_name(&name) {
            skipped += 1;
            continue;
        }
        let month = record.month();
        if !schema.is_known_month(&month) {
            unknown_months.insert(month);
        }
        groups.entry(name).or_default().push(record.clone());
    }

    for month in &unknown_months {
        log::warn!("unrecognized month '{month}': sorted last, shown verbatim");
    }
    if skipped > 0 {
        log::debug!("{skipped} row(s) without an employee name");
    }

    groups
        .into_iter()
        .map(|(name, rows)| EmployeeRecords { name, rows })
        .collect()
}

// ---------------------------------------------------------------------------
// Per-employee preparation
// ---------------------------------------------------------------------------

/// One employee's rows ready for rendering.
#[derive(Debug, Clone)]
pub struct EmployeeSheet {
    pub name: String,
    /// Sorted by month order, terminal-month `INCOME TAX` zeroed.
    pub rows: Vec<Record>,
    /// Synthesized terminal row when the cycle stops at the source month.
    pub projected: Option<Record>,
    /// Active columns in canonical order.
    pub active_columns: Vec<String>,
    /// Totals over the active columns.
    pub totals: Totals,
}

impl EmployeeSheet {
    /// First row after sorting; source of gender and school name.
    pub fn first_row(&self) -> Option<&Record> {
        self.rows.first()
    }
}

impl EmployeeRecords {
    /// Sort, guard, project and total.
    ///
    /// `columns` are the report columns of the merged data
    /// (`Schema::report_columns`).
    pub fn prepare(&self, schema: &Schema, columns: &[String]) -> Result<EmployeeSheet, PayrollError> {
        let rows = self.sorted_rows(schema)?;
        let projected = projection_for(&rows, schema);

        let mut active: Vec<&String> = columns
            .iter()
            .filter(|c| schema.is_always_active(c) || rows.iter().any(|r| !r.get(c).is_zero_or_empty()))
            .collect();
        if let Some(ref p) = projected {
            let forced = forced_columns(p, schema);
            active = columns
                .iter()
                .filter(|c| active.contains(c) || forced.iter().any(|f| same_column(f, c)))
                .collect();
        }
        let active_columns: Vec<String> = active.into_iter().cloned().collect();

        let totals = compute_totals(&rows, projected.as_ref(), &active_columns, schema);
        check_totals(&self.name, &totals)?;

        Ok(EmployeeSheet {
            name: self.name.clone(),
            rows,
            projected,
            active_columns,
            totals,
        })
    }

    /// Totals over every report column, for the summary workbook.
    pub fn summary_totals(&self, schema: &Schema, columns: &[String]) -> Result<Totals, PayrollError> {
        let rows = self.sorted_rows(schema)?;
        let projected = projection_for(&rows, schema);
        let totals = compute_totals(&rows, projected.as_ref(), columns, schema);
        check_totals(&self.name, &totals)?;
        Ok(totals)
    }

    fn sorted_rows(&self, schema: &Schema) -> Result<Vec<Record>, PayrollError> {
        if self.rows.is_empty() {
            return Err(PayrollError::EmployeeReport {
                employee: self.name.clone(),
                message: "no rows".into(),
            });
        }
        let mut rows = self.rows.clone();
        rows.sort_by_key(|r| schema.month_order(&r.month()));
        for row in &mut rows {
            if schema.is_terminal_month(&row.month()) {
                row.set(schema::INCOME_TAX, CellValue::Number(0.0));
            }
        }
        Ok(rows)
    }
}

/// The projected terminal row, when a source-month row exists and no
/// terminal-month row does. The first source-month row in sorted order wins.
fn projection_for(rows: &[Record], schema: &Schema) -> Option<Record> {
    if rows.iter().any(|r| schema.is_terminal_month(&r.month())) {
        return None;
    }
    rows.iter()
        .find(|r| schema.is_projection_source(&r.month()))
        .map(|source| project_terminal_row(source, schema))
}

fn check_totals(employee: &str, totals: &Totals) -> Result<(), PayrollError> {
    match totals.iter().find(|(_, v)| !v.is_finite()) {
        Some((column, _)) => Err(PayrollError::EmployeeReport {
            employee: employee.to_string(),
            message: format!("total for '{column}' is not a finite number"),
        }),
        None => Ok(()),
    }
}
