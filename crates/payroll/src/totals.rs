use serde::Serialize;

use crate::schema::{same_column, Schema, INCOME_TAX};
use crate::table::Record;

/// Column-wise sums for one employee (or the grand total).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub columns: Vec<String>,
    pub values: Vec<f64>,
}

impl Totals {
    pub fn get(&self, column: &str) -> f64 {
        self.columns
            .iter()
            .position(|c| same_column(c, column))
            .map(|i| self.values[i])
            .unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns.iter().map(|c| c.as_str()).zip(self.values.iter().copied())
    }

    /// Add another row of totals column by column.
    pub fn accumulate(&mut self, other: &Totals) {
        for (column, value) in other.iter() {
            match self.columns.iter().position(|c| same_column(c, column)) {
                Some(i) => self.values[i] += value,
                None => {
                    self.columns.push(column.to_string());
                    self.values.push(value);
                }
            }
        }
    }
}

/// Guarded sum of `column`.
///
/// Missing, NaN and non-numeric cells add nothing. `INCOME TAX` on a
/// terminal-month row adds nothing, whether the row is real or projected.
pub fn column_total(
    rows: &[Record],
    projected: Option<&Record>,
    column: &str,
    schema: &Schema,
) -> f64 {
    let guard_terminal = same_column(column, INCOME_TAX);
    rows.iter()
        .chain(projected)
        .filter(|row| !(guard_terminal && schema.is_terminal_month(&row.month())))
        .map(|row| row.get(column).sum_value())
        .sum()
}

pub fn compute_totals(
    rows: &[Record],
    projected: Option<&Record>,
    columns: &[String],
    schema: &Schema,
) -> Totals {
    Totals {
        columns: columns.to_vec(),
        values: columns
            .iter()
            .map(|c| column_total(rows, projected, c, schema))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MONTH, PT};
    use crate::value::CellValue;

    fn row(month: &str, pt: f64, tax: f64) -> Record {
        Record::from_pairs(vec![
            (MONTH, CellValue::text(month)),
            (PT, CellValue::Number(pt)),
            (INCOME_TAX, CellValue::Number(tax)),
        ])
    }

    #[test]
    fn terminal_income_tax_never_counts() {
        let schema = Schema::default();
        let rows = vec![row("jan26", 200.0, 1000.0), row("FEB 26", 300.0, 2500.0)];
        assert_eq!(column_total(&rows, None, INCOME_TAX, &schema), 1000.0);
        assert_eq!(column_total(&rows, None, PT, &schema), 500.0);
    }

    #[test]
    fn projected_row_contributes() {
        let schema = Schema::default();
        let rows = vec![row("apr 25", 200.0, 0.0)];
        let projected = row("feb 26", 300.0, 999.0);
        assert_eq!(column_total(&rows, Some(&projected), PT, &schema), 500.0);
        assert_eq!(column_total(&rows, Some(&projected), INCOME_TAX, &schema), 0.0);
    }

    #[test]
    fn non_numeric_cells_are_skipped() {
        let schema = Schema::default();
        let rows = vec![
            row("apr 25", 200.0, 0.0),
            Record::from_pairs(vec![(MONTH, CellValue::text("may 25")), (PT, CellValue::text("n/a"))]),
            Record::from_pairs(vec![(MONTH, CellValue::text("jun 25"))]),
        ];
        assert_eq!(column_total(&rows, None, PT, &schema), 200.0);
    }

    #[test]
    fn accumulate_sums_by_column() {
        let mut grand = Totals::default();
        grand.accumulate(&Totals {
            columns: vec!["PT".into(), "HRA".into()],
            values: vec![700.0, 10.0],
        });
        grand.accumulate(&Totals {
            columns: vec!["PT".into()],
            values: vec![300.0],
        });
        assert_eq!(grand.get("PT"), 1000.0);
        assert_eq!(grand.get("HRA"), 10.0);
        assert_eq!(grand.get("GPF"), 0.0);
    }
}
