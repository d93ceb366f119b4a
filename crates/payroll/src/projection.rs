//! Terminal-month synthesis.
//!
//! When an employee's data stops at the projection source month (Jan), the
//! terminal month (Feb) is synthesized from it: a copy of the source row with
//! a handful of columns forced by rule.

use serde::Deserialize;

use crate::schema::{self, Schema};
use crate::table::Record;
use crate::value::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideRule {
    /// Always this value.
    Constant(f64),
    /// This value when the source is non-zero, otherwise 0.
    NonZeroTo(f64),
}

impl OverrideRule {
    pub fn apply(&self, source: &CellValue) -> f64 {
        match self {
            Self::Constant(v) => *v,
            Self::NonZeroTo(v) => {
                if source.is_zero_or_empty() {
                    0.0
                } else {
                    *v
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColumnOverride {
    pub column: String,
    pub rule: OverrideRule,
}

impl ColumnOverride {
    pub fn new(column: &str, rule: OverrideRule) -> Self {
        Self {
            column: column.to_string(),
            rule,
        }
    }
}

/// Build the projected terminal row from `source`.
///
/// Pure: `source` is untouched and the result owns its cells. Columns without
/// an override carry over unchanged; `Month` becomes the terminal month key.
pub fn project_terminal_row(source: &Record, schema: &Schema) -> Record {
    let mut projected = source.clone();
    for ov in &schema.projection {
        let value = ov.rule.apply(source.get(&ov.column));
        projected.set(&ov.column, CellValue::Number(value));
    }
    if let Some(terminal) = schema.terminal_month() {
        projected.set(schema::MONTH, CellValue::text(terminal.key.clone()));
    }
    projected
}

/// Columns the projection forces into the active set: every overridden
/// column whose projected value is non-zero.
pub fn forced_columns(projected: &Record, schema: &Schema) -> Vec<String> {
    schema
        .projection
        .iter()
        .filter(|ov| !projected.get(&ov.column).is_zero_or_empty())
        .map(|ov| ov.column.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GROUP_ACCIDENTAL_POLICY, INCOME_TAX, MONTH, PT};
    use crate::table::Record;

    fn jan_row(pt: CellValue) -> Record {
        Record::from_pairs(vec![
            (MONTH, CellValue::text("jan26")),
            (PT, pt),
            ("BASIC PAY", CellValue::Number(42000.0)),
            (INCOME_TAX, CellValue::Number(1500.0)),
        ])
    }

    #[test]
    fn pt_200_becomes_300() {
        let schema = Schema::default();
        let projected = project_terminal_row(&jan_row(CellValue::Number(200.0)), &schema);
        assert_eq!(projected.get(PT), &CellValue::Number(300.0));
        assert_eq!(projected.get(GROUP_ACCIDENTAL_POLICY), &CellValue::Number(531.0));
        assert_eq!(projected.get(INCOME_TAX), &CellValue::Number(0.0));
        assert_eq!(projected.get("BASIC PAY"), &CellValue::Number(42000.0));
        assert_eq!(projected.get(MONTH), &CellValue::text("feb 26"));
    }

    #[test]
    fn any_nonzero_pt_becomes_300() {
        let schema = Schema::default();
        for pt in [100.0, 175.0, 500.0] {
            let projected = project_terminal_row(&jan_row(CellValue::Number(pt)), &schema);
            assert_eq!(projected.get(PT), &CellValue::Number(300.0));
        }
    }

    #[test]
    fn zero_or_blank_pt_stays_zero() {
        let schema = Schema::default();
        for pt in [CellValue::Number(0.0), CellValue::Empty, CellValue::text("nan")] {
            let projected = project_terminal_row(&jan_row(pt), &schema);
            assert_eq!(projected.get(PT), &CellValue::Number(0.0));
        }
    }

    #[test]
    fn source_row_is_not_mutated() {
        let schema = Schema::default();
        let source = jan_row(CellValue::Number(200.0));
        let before = source.clone();
        let _ = project_terminal_row(&source, &schema);
        assert_eq!(source, before);
    }

    #[test]
    fn forced_columns_follow_projected_values() {
        let schema = Schema::default();
        let projected = project_terminal_row(&jan_row(CellValue::Number(200.0)), &schema);
        assert_eq!(forced_columns(&projected, &schema), vec![PT, GROUP_ACCIDENTAL_POLICY]);

        let projected = project_terminal_row(&jan_row(CellValue::Empty), &schema);
        assert_eq!(forced_columns(&projected, &schema), vec![GROUP_ACCIDENTAL_POLICY]);
    }
}
