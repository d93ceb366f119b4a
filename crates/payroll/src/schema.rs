use std::collections::HashMap;

use serde::Deserialize;

use crate::error::PayrollError;
use crate::projection::{ColumnOverride, OverrideRule};

// ---------------------------------------------------------------------------
// Well-known columns
// ---------------------------------------------------------------------------

pub const SR_NO: &str = "SR.NO";
pub const EMPLOYEE_NAME: &str = "EMPLOYEE NAME";
pub const GENDER: &str = "GENDER M/F";
pub const SCHOOL_NAME: &str = "NAME OF SCHOOL";
pub const SOURCE_FILE: &str = "Source_File";
pub const MONTH: &str = "Month";
pub const PT: &str = "PT";
pub const GROUP_ACCIDENTAL_POLICY: &str = "GROUP ACCIDENTAL POLICY";
pub const INCOME_TAX: &str = "INCOME TAX";

/// Sort key for month tokens the schema does not know.
pub const UNKNOWN_MONTH_ORDER: u32 = 99;

const DEFAULT_MONTHS: &[(&str, &str)] = &[
    ("mar 25", "Mar-2025"),
    ("apr 25", "Apr-2025"),
    ("may 25", "May-2025"),
    ("jun 25", "Jun-2025"),
    ("jul 25", "Jul-2025"),
    ("aug 25", "Aug-2025"),
    ("sep 25", "Sep-2025"),
    ("oct 25", "Oct-2025"),
    ("nov 25", "Nov-2025"),
    ("dec 25", "Dec-2025"),
    ("jan 26", "Jan-2026"),
    ("feb 26", "Feb-2026"),
];

const DEFAULT_EXCLUDED: &[&str] = &[
    "Unnamed: 0",
    SR_NO,
    SOURCE_FILE,
    MONTH,
    "Month_Order",
    EMPLOYEE_NAME,
    GENDER,
    SCHOOL_NAME,
    "GROSS AFTER DEDUCTING FA",
    "GROSS PAYMENT AFTER GOVT DEDUCTIONS",
    "GROSS PAYMENT AFTER NPS DEDUCTIONS",
    "NGR(TOTAL DEDUCTIONS)",
    "EMPLOYEE NET SALARY",
    "TOTAL GOVT DEDUCTIONS",
    "NPS TOTAL",
];

const DEFAULT_INFO: &[&str] = &[
    "BLOCK / TALUKA",
    "SCHOOL UDISE CODE",
    "SCHOOL SHALARTH DDO CODE",
    "S.R NO OF EMPL",
    "SHALARTH ID",
    "DESIGNATION",
    "GPF NO",
    "DCPS NO",
    "PRAN NO",
    "PAN NO",
    "ADHAR NO",
    "MOB NO",
    "EMAIL ID",
    "DDO BANK NAME",
    "DDO BANK ACCOUNT NUMBER",
    "DDO BANK IFSC CODE",
    "BANK NAME",
    "BANK ACCOUNT NUMBER",
    "BANK IFSC CODE",
    "BRANCH NAME",
    "PAY MATRIX",
    "REMARKS",
];

const DEFAULT_NUMERIC: &[&str] = &[
    "BASIC PAY",
    "D.A",
    "HRA",
    "T.A",
    "T.A ARREARS",
    "TRIBAL ALLOWANCE",
    "WASHING ALLOWANCE",
    "DA ARREARS",
    "HRA ARREARS",
    "BASIC ARREARS",
    "CLA",
    "NPS EMPR ALLOW",
    "TOTAL PAY",
    "F A",
    "GPF",
    "GPF ADV",
    PT,
    "GIS(ZP)",
    "GIS SCOUT",
    "DCPS REGULAR",
    "DCPS DELAYED",
    "DCPS PAY ARREARS RECOVERY",
    "REVENUE STAMP",
    "DCPS DA ARREARS RECOVERY",
    GROUP_ACCIDENTAL_POLICY,
    "NAA",
    "TOTAL GOVT DEDUCTIONS",
    "NPS EMPR CONTRI",
    "NPS EMP CONTRI",
    "NPS EMPR CONTRI ARR",
    "NPS EMP CONTRI ARR",
    "NPS TOTAL",
    INCOME_TAX,
    "CO-OP BANK",
    "NGR(LIC)",
    "NGR(SOCIETY LOAN)",
    "NGR(MISC)",
    "NGR(OTHER RECOVERY)",
    "NGR(RD)",
    "NGR(OTHER DEDUCTION)",
];

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// One month of the annual cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct MonthEntry {
    /// Canonical token, e.g. `"apr 25"`.
    pub key: String,
    /// Display label, e.g. `"Apr-2025"`.
    pub label: String,
    /// Extra accepted spellings. Matching is already case and whitespace
    /// insensitive, so these are only needed for genuinely different words.
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Immutable lookup tables for the payroll layout.
///
/// Built once at startup (`Schema::default()` or `Schema::from_toml`) and
/// passed by reference to every stage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Months in cycle order. The last entry is the terminal month and the
    /// one before it is the projection source.
    pub months: Vec<MonthEntry>,
    pub excluded_columns: Vec<String>,
    /// Personal and bank identifiers. Reserved, never rendered.
    pub info_columns: Vec<String>,
    /// Candidate report columns in canonical order.
    pub numeric_columns: Vec<String>,
    /// Columns kept in every statement even when all values are zero.
    pub always_active: Vec<String>,
    /// Overrides applied when the terminal month is synthesized.
    pub projection: Vec<ColumnOverride>,
    #[serde(skip)]
    month_index: HashMap<String, usize>,
}

impl Default for Schema {
    fn default() -> Self {
        let months = DEFAULT_MONTHS
            .iter()
            .map(|(key, label)| MonthEntry {
                key: key.to_string(),
                label: label.to_string(),
                variants: vec![key.replace(' ', ""), key.to_uppercase()],
            })
            .collect();

        let mut schema = Self {
            months,
            excluded_columns: to_strings(DEFAULT_EXCLUDED),
            info_columns: to_strings(DEFAULT_INFO),
            numeric_columns: to_strings(DEFAULT_NUMERIC),
            always_active: vec![INCOME_TAX.to_string()],
            projection: vec![
                ColumnOverride::new(PT, OverrideRule::NonZeroTo(300.0)),
                ColumnOverride::new(GROUP_ACCIDENTAL_POLICY, OverrideRule::Constant(531.0)),
                ColumnOverride::new(INCOME_TAX, OverrideRule::Constant(0.0)),
            ],
            month_index: HashMap::new(),
        };
        schema.build_index();
        schema
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Month lookup key: whitespace removed, ASCII lower-cased.
/// `"Apr 25"`, `"apr25"` and `" APR  25 "` all map to `"apr25"`.
pub fn normalize_month(token: &str) -> String {
    token
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Column names are compared trimmed; source headers carry stray spaces.
pub fn same_column(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

impl Schema {
    pub fn from_toml(input: &str) -> Result<Self, PayrollError> {
        let mut schema: Schema =
            toml::from_str(input).map_err(|e| PayrollError::ConfigParse(e.to_string()))?;
        schema.trim_columns();
        schema.build_index();
        schema.validate()?;
        Ok(schema)
    }

    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.months.len() < 2 {
            return Err(PayrollError::ConfigValidation(
                "at least 2 months are required (projection source and terminal month)".into(),
            ));
        }

        let mut seen: HashMap<String, &str> = HashMap::new();
        for month in &self.months {
            if month.label.trim().is_empty() {
                return Err(PayrollError::ConfigValidation(format!(
                    "month '{}' has an empty label",
                    month.key
                )));
            }
            for token in std::iter::once(&month.key).chain(&month.variants) {
                let norm = normalize_month(token);
                if norm.is_empty() {
                    return Err(PayrollError::ConfigValidation(format!(
                        "month '{}' has an empty token",
                        month.key
                    )));
                }
                if let Some(other) = seen.insert(norm, &month.key) {
                    if other != month.key {
                        return Err(PayrollError::ConfigValidation(format!(
                            "token '{token}' is claimed by both '{other}' and '{}'",
                            month.key
                        )));
                    }
                }
            }
        }

        if self.numeric_columns.is_empty() {
            return Err(PayrollError::ConfigValidation(
                "numeric_columns must not be empty".into(),
            ));
        }

        for rule in &self.projection {
            if !self.numeric_columns.iter().any(|c| same_column(c, &rule.column)) {
                return Err(PayrollError::ConfigValidation(format!(
                    "projection column '{}' is not a numeric column",
                    rule.column
                )));
            }
        }

        Ok(())
    }

    fn trim_columns(&mut self) {
        for list in [
            &mut self.excluded_columns,
            &mut self.info_columns,
            &mut self.numeric_columns,
            &mut self.always_active,
        ] {
            for col in list.iter_mut() {
                *col = col.trim().to_string();
            }
        }
    }

    fn build_index(&mut self) {
        self.month_index.clear();
        for (idx, month) in self.months.iter().enumerate() {
            for token in std::iter::once(&month.key).chain(&month.variants) {
                self.month_index.entry(normalize_month(token)).or_insert(idx);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Months
    // -----------------------------------------------------------------------

    /// Position of `token` in the cycle.
    pub fn month_index(&self, token: &str) -> Option<usize> {
        self.month_index.get(&normalize_month(token)).copied()
    }

    /// Sort key: 0-based cycle position, `UNKNOWN_MONTH_ORDER` if unrecognized.
    pub fn month_order(&self, token: &str) -> u32 {
        self.month_index(token)
            .map(|i| i as u32)
            .unwrap_or(UNKNOWN_MONTH_ORDER)
    }

    /// Display label, or the raw token when unrecognized.
    pub fn month_label<'a>(&'a self, token: &'a str) -> &'a str {
        match self.month_index(token) {
            Some(i) => &self.months[i].label,
            None => token,
        }
    }

    pub fn is_known_month(&self, token: &str) -> bool {
        self.month_index(token).is_some()
    }

    pub fn terminal_month(&self) -> Option<&MonthEntry> {
        self.months.last()
    }

    pub fn is_terminal_month(&self, token: &str) -> bool {
        match self.month_index(token) {
            Some(i) => i + 1 == self.months.len(),
            None => false,
        }
    }

    pub fn is_projection_source(&self, token: &str) -> bool {
        match self.month_index(token) {
            Some(i) => i + 2 == self.months.len(),
            None => false,
        }
    }

    // -----------------------------------------------------------------------
    // Columns
    // -----------------------------------------------------------------------

    pub fn is_excluded(&self, column: &str) -> bool {
        self.excluded_columns.iter().any(|c| same_column(c, column))
    }

    pub fn is_info(&self, column: &str) -> bool {
        self.info_columns.iter().any(|c| same_column(c, column))
    }

    pub fn is_always_active(&self, column: &str) -> bool {
        self.always_active.iter().any(|c| same_column(c, column))
    }

    /// Numeric columns that are not excluded and are present in `present`,
    /// in canonical order.
    pub fn report_columns<S: AsRef<str>>(&self, present: &[S]) -> Vec<String> {
        self.numeric_columns
            .iter()
            .filter(|c| !self.is_excluded(c))
            .filter(|c| present.iter().any(|p| same_column(p.as_ref(), c)))
            .cloned()
            .collect()
    }

    pub fn override_for(&self, column: &str) -> Option<&OverrideRule> {
        self.projection
            .iter()
            .find(|o| same_column(&o.column, column))
            .map(|o| &o.rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_is_valid() {
        let schema = Schema::default();
        schema.validate().unwrap();
        assert_eq!(schema.months.len(), 12);
        assert_eq!(schema.numeric_columns.len(), 40);
    }

    #[test]
    fn all_spellings_share_a_label() {
        let schema = Schema::default();
        for token in ["apr 25", "apr25", "APR 25", " Apr 25 ", "apr  25"] {
            assert_eq!(schema.month_label(token), "Apr-2025", "token {token:?}");
        }
    }

    #[test]
    fn thirty_six_builtin_tokens_are_recognized() {
        let schema = Schema::default();
        let mut count = 0;
        for (key, _) in DEFAULT_MONTHS {
            for token in [key.to_string(), key.replace(' ', ""), key.to_uppercase()] {
                assert!(schema.is_known_month(&token));
                count += 1;
            }
        }
        assert_eq!(count, 36);
    }

    #[test]
    fn unknown_month_sorts_last_and_displays_verbatim() {
        let schema = Schema::default();
        assert_eq!(schema.month_order("mar 25"), 0);
        assert_eq!(schema.month_order("feb26"), 11);
        assert_eq!(schema.month_order("Sept 2025"), UNKNOWN_MONTH_ORDER);
        assert_eq!(schema.month_label("Sept 2025"), "Sept 2025");
    }

    #[test]
    fn terminal_and_projection_source() {
        let schema = Schema::default();
        assert!(schema.is_terminal_month("FEB 26"));
        assert!(schema.is_terminal_month("feb26"));
        assert!(!schema.is_terminal_month("jan26"));
        assert!(schema.is_projection_source("jan 26"));
        assert!(!schema.is_projection_source("dec 25"));
        assert_eq!(schema.terminal_month().unwrap().label, "Feb-2026");
    }

    #[test]
    fn report_columns_skip_excluded_and_absent() {
        let schema = Schema::default();
        let present = ["EMPLOYEE NAME", "PT", "NPS TOTAL", "BASIC PAY ", "INCOME TAX"];
        assert_eq!(
            schema.report_columns(&present),
            vec!["BASIC PAY", "PT", "INCOME TAX"]
        );
    }

    #[test]
    fn from_toml_overrides_tables() {
        let input = r#"
numeric_columns = ["BASIC PAY", "PT "]

[[months]]
key = "jan 26"
label = "Jan-2026"

[[months]]
key = "feb 26"
label = "Feb-2026"
variants = ["february"]

[[projection]]
column = "PT"
rule = { non_zero_to = 250 }
"#;
        let schema = Schema::from_toml(input).unwrap();
        assert_eq!(schema.months.len(), 2);
        assert!(schema.is_terminal_month("February"));
        assert_eq!(schema.numeric_columns, vec!["BASIC PAY", "PT"]);
        assert_eq!(schema.override_for("PT"), Some(&OverrideRule::NonZeroTo(250.0)));
        // untouched tables keep their defaults
        assert!(schema.is_excluded("EMPLOYEE NAME"));
    }

    #[test]
    fn rejects_duplicate_tokens() {
        let input = r#"
[[months]]
key = "jan 26"
label = "Jan-2026"

[[months]]
key = "JAN26"
label = "Feb-2026"
"#;
        let err = Schema::from_toml(input).unwrap_err();
        assert!(matches!(err, PayrollError::ConfigValidation(_)));
    }

    #[test]
    fn rejects_projection_on_unknown_column() {
        let input = r#"
[[projection]]
column = "BONUS"
rule = { constant = 1 }
"#;
        assert!(Schema::from_toml(input).is_err());
    }

    #[test]
    fn parse_error_is_reported() {
        let err = Schema::from_toml("months = 3").unwrap_err();
        assert!(matches!(err, PayrollError::ConfigParse(_)));
    }
}
