use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub enum PayrollError {
    /// No `SR.NO` marker in the scanned prefix of a source sheet.
    HeaderNotFound { scanned: usize },
    /// Any other per-file read failure.
    FileLoad { file: String, message: String },
    /// Computation or rendering failure for one employee.
    EmployeeReport { employee: String, message: String },
    /// Merged workbook or output directory missing at a later stage.
    MissingArtifact { what: String, path: String },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Schema validation error (duplicate month key, empty table, etc.).
    ConfigValidation(String),
    /// IO error (file read, write, etc.).
    Io(String),
}

impl fmt::Display for PayrollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaderNotFound { scanned } => {
                write!(f, "header marker SR.NO not found in the first {scanned} rows")
            }
            Self::FileLoad { file, message } => write!(f, "{file}: {message}"),
            Self::EmployeeReport { employee, message } => {
                write!(f, "employee '{employee}': {message}")
            }
            Self::MissingArtifact { what, path } => write!(f, "{what} not found: {path}"),
            Self::ConfigParse(msg) => write!(f, "schema parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "schema validation error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for PayrollError {}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Unit of failure isolation. A warning names the item that was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningScope {
    File,
    Month,
    Employee,
    Output,
}

impl fmt::Display for WarningScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Month => write!(f, "month"),
            Self::Employee => write!(f, "employee"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// A skipped item and the reason, surfaced alongside a completed batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Warning {
    pub scope: WarningScope,
    pub subject: String,
    pub message: String,
}

impl Warning {
    pub fn new(scope: WarningScope, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope,
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Build a warning from an isolated error and log it.
    pub fn from_error(scope: WarningScope, subject: &str, err: &PayrollError) -> Self {
        log::warn!("skipping {scope} '{subject}': {err}");
        Self::new(scope, subject, err.to_string())
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.scope, self.subject, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_subject() {
        let err = PayrollError::EmployeeReport {
            employee: "JOHN DOE".into(),
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "employee 'JOHN DOE': boom");

        let w = Warning::from_error(WarningScope::Employee, "JOHN DOE", &err);
        assert_eq!(w.to_string(), "[employee] JOHN DOE: employee 'JOHN DOE': boom");
    }

    #[test]
    fn header_not_found_mentions_scan_limit() {
        let err = PayrollError::HeaderNotFound { scanned: 40 };
        assert!(err.to_string().contains("40"));
    }
}
