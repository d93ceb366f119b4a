use std::fmt;

use serde::Serialize;

/// One cell as the engine sees it.
///
/// Readers map every spreadsheet value onto these three cases. `Empty` is
/// the sentinel returned for missing, blank and NaN cells so that row access
/// never fails.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
}

pub static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// True for `Empty`, whitespace-only text, NaN and the literal "nan".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Number(n) => n.is_nan(),
            Self::Text(s) => {
                let t = s.trim();
                t.is_empty() || t.eq_ignore_ascii_case("nan")
            }
        }
    }

    /// Numeric coercion. Text is parsed after trimming; NaN and infinities
    /// coerce to `None`.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Empty => return None,
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Blank or numerically zero. Non-numeric text counts as a value.
    pub fn is_zero_or_empty(&self) -> bool {
        if self.is_blank() {
            return true;
        }
        matches!(self.as_number(), Some(n) if n == 0.0)
    }

    /// Contribution to a column sum: non-numeric values add nothing.
    pub fn sum_value(&self) -> f64 {
        self.as_number().unwrap_or(0.0)
    }

    /// String coercion used for header matching and name normalization.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Whole numbers print without a fractional part ("200", not "200.0").
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}
