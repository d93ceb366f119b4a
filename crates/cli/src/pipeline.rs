// Batch pipeline: discover -> load -> merge -> reload -> statements ->
// summary -> PDF. Each stage records what it produced in a `RunReport`;
// per-file and per-employee failures become warnings, anything else aborts.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use taxsheet_config::{ScanSettings, Settings};
use taxsheet_io::{
    load_donor, load_source, reload_merged, write_merged_workbook, write_statement, write_summary,
};
use taxsheet_payroll::statement::sanitize_file_name;
use taxsheet_payroll::{
    build_summary, partition_employees, EmployeeRecords, MonthGroups, PayrollError, ReportLabels,
    Schema, Statement, Table, Warning, WarningScope,
};

use crate::discover::{discover_months, REPORTS_SUFFIX};
use crate::pdf::PdfExporter;
use crate::CliError;

// ============================================================================
// Progress
// ============================================================================

/// Receives `(done, total)` counts as a stage advances. Called from worker
/// threads during statement generation.
pub trait Progress: Sync {
    fn step(&self, stage: &str, done: usize, total: usize);
}

/// Logs progress at info level, roughly every tenth of the way.
pub struct LogProgress;

impl Progress for LogProgress {
    fn step(&self, stage: &str, done: usize, total: usize) {
        let every = (total / 10).max(1);
        if done == total || done % every == 0 {
            log::info!("{stage}: {done}/{total}");
        }
    }
}

// ============================================================================
// Run report
// ============================================================================

#[derive(Debug, Default, Clone, Serialize)]
pub struct Outputs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub school: String,
    /// RFC 3339 start time.
    pub started_at: String,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub months: usize,
    pub employees: usize,
    pub reports_written: usize,
    pub summary_rows: usize,
    pub outputs: Outputs,
    pub warnings: Vec<Warning>,
}

impl RunReport {
    pub fn new(school: &str) -> Self {
        Self {
            school: school.to_string(),
            started_at: chrono::Local::now().to_rfc3339(),
            files_loaded: 0,
            files_skipped: 0,
            months: 0,
            employees: 0,
            reports_written: 0,
            summary_rows: 0,
            outputs: Outputs::default(),
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn warn(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Where a school's inputs live and where its outputs go.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub out: PathBuf,
}

impl Layout {
    pub fn school_dir(&self, school: &str) -> PathBuf {
        self.root.join(school)
    }

    pub fn merged_path(&self, school: &str) -> PathBuf {
        self.out.join(format!("{school}_Merged_Monthly.xlsx"))
    }

    pub fn reports_dir(&self, school: &str) -> PathBuf {
        self.out.join(format!("{school}{REPORTS_SUFFIX}"))
    }

    pub fn summary_path(&self, school: &str) -> PathBuf {
        self.out.join(format!("{school}_Summary_Totals.xlsx"))
    }

    pub fn pdf_path(&self, school: &str) -> PathBuf {
        self.reports_dir(school)
            .join(format!("{school}_All_Reports_Consolidated.pdf"))
    }
}

pub struct Pipeline {
    pub layout: Layout,
    pub schema: Schema,
    pub labels: ReportLabels,
    pub source_scan_rows: usize,
    pub merged_scan_rows: usize,
    pub parallel: bool,
}

/// Statement labels: built-in wording with any settings overrides applied.
pub fn labels_from(settings: &Settings) -> ReportLabels {
    let report = &settings.report;
    let mut labels = match &report.fiscal_year {
        Some(year) => ReportLabels::for_fiscal_year(year),
        None => ReportLabels::default(),
    };
    if let Some(title) = &report.title {
        labels.title = title.clone();
    }
    if let Some(disclaimer) = &report.disclaimer {
        labels.disclaimer = disclaimer.clone();
    }
    if let Some(signature) = &report.employee_signature {
        labels.employee_signature = signature.clone();
    }
    if let Some(signature) = &report.headmaster_signature {
        labels.headmaster_signature = signature.clone();
    }
    labels
}

/// The merged header lands one row below the donor's header plus a
/// separator, so the reload window must reach past the source window.
fn merged_scan_rows(scan: &ScanSettings) -> usize {
    scan.merged_header_rows.max(scan.source_header_rows + 2)
}

fn create_dir(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path)
        .map_err(|e| CliError::io(format!("cannot create {}: {}", path.display(), e)))
}

impl Pipeline {
    pub fn new(layout: Layout, schema: Schema, settings: &Settings) -> Self {
        Self {
            layout,
            schema,
            labels: labels_from(settings),
            source_scan_rows: settings.scan.source_header_rows,
            merged_scan_rows: merged_scan_rows(&settings.scan),
            parallel: settings.parallel,
        }
    }

    /// Discover and load every source file of the school, then write the
    /// merged monthly workbook.
    pub fn merge(&self, school: &str, report: &mut RunReport, progress: &dyn Progress) -> Result<(), CliError> {
        let school_dir = self.layout.school_dir(school);
        if !school_dir.is_dir() {
            return Err(CliError::args(format!("school folder not found: {}", school_dir.display()))
                .with_hint("run `taxsheet schools` to list the folders under the root"));
        }

        let months = discover_months(&school_dir).map_err(CliError::io)?;
        let total: usize = months.iter().map(|m| m.files.len()).sum();
        if total == 0 {
            return Err(CliError::no_input(format!(
                "no .xls/.xlsx files under {}",
                school_dir.display()
            )));
        }

        // First file in sorted month/file order donates the heading block.
        let donor = months
            .iter()
            .flat_map(|m| m.files.first())
            .next()
            .and_then(|path| match load_donor(path) {
                Ok(donor) => Some(donor),
                Err(message) => {
                    let file = taxsheet_io::source::file_name(path);
                    log::warn!("style donor {file} unreadable, merging without heading: {message}");
                    report.warn(Warning::new(WarningScope::File, file, format!("style donor: {message}")));
                    None
                }
            });

        let mut groups = MonthGroups::new();
        let mut done = 0;
        for month in &months {
            if month.files.is_empty() {
                log::warn!("[{}] no source files", month.month);
                report.warn(Warning::new(WarningScope::Month, &month.month, "no source files"));
                continue;
            }
            if !self.schema.is_known_month(&month.month) {
                log::warn!("[{}] not in the month table; sorted last", month.month);
            }
            for path in &month.files {
                let file = taxsheet_io::source::file_name(path);
                match load_source(path, &month.month, self.source_scan_rows) {
                    Ok(table) => {
                        groups.add(&month.month, &file, table);
                        report.files_loaded += 1;
                    }
                    Err(e) => {
                        report.warn(Warning::from_error(WarningScope::File, &file, &e));
                        report.files_skipped += 1;
                    }
                }
                done += 1;
                progress.step("load", done, total);
            }
        }

        if groups.is_empty() {
            return Err(CliError::no_input("no source file could be loaded")
                .with_hint("every file was skipped; see the warnings above"));
        }

        let tables = groups.into_month_tables();
        report.months = tables.len();

        create_dir(&self.layout.out)?;
        let merged_path = self.layout.merged_path(school);
        let written = write_merged_workbook(&tables, donor.as_ref(), &merged_path)
            .map_err(PayrollError::Io)?;
        log::info!(
            "merged {} row(s) into {} sheet(s): {}",
            written.rows,
            written.sheets,
            merged_path.display()
        );
        report.outputs.merged = Some(merged_path);
        Ok(())
    }

    /// Read the merged workbook written by `merge`.
    pub fn load_merged(&self, school: &str) -> Result<Table, CliError> {
        let path = self.layout.merged_path(school);
        if !path.is_file() {
            return Err(CliError::from(PayrollError::MissingArtifact {
                what: "merged workbook".to_string(),
                path: path.display().to_string(),
            })
            .with_hint(format!("run `taxsheet merge \"{school}\"` first")));
        }
        let table = reload_merged(&path, self.merged_scan_rows).map_err(PayrollError::Io)?;
        Ok(table)
    }

    /// One statement workbook per employee. Returns the written paths in
    /// employee order.
    pub fn reports(
        &self,
        school: &str,
        table: &Table,
        report: &mut RunReport,
        progress: &dyn Progress,
    ) -> Result<Vec<PathBuf>, CliError> {
        let columns = self.schema.report_columns(&table.columns);
        let employees = partition_employees(table, &self.schema);
        report.employees = employees.len();
        if employees.is_empty() {
            return Err(CliError::no_input("merged workbook has no employee rows"));
        }

        let reports_dir = self.layout.reports_dir(school);
        create_dir(&reports_dir)?;
        report.outputs.reports_dir = Some(reports_dir.clone());

        let names = assign_file_names(&employees, report);
        let jobs: Vec<(&EmployeeRecords, PathBuf)> = employees
            .iter()
            .zip(names)
            .map(|(e, name)| (e, reports_dir.join(format!("{name}.xlsx"))))
            .collect();

        let total = jobs.len();
        let done = AtomicUsize::new(0);
        let render = |(employee, path): &(&EmployeeRecords, PathBuf)| -> Result<PathBuf, PayrollError> {
            let sheet = employee.prepare(&self.schema, &columns)?;
            let statement = Statement::build(&sheet, &self.schema, &self.labels);
            write_statement(&statement, path).map_err(|message| PayrollError::EmployeeReport {
                employee: employee.name.clone(),
                message,
            })?;
            progress.step("statements", done.fetch_add(1, Ordering::Relaxed) + 1, total);
            Ok(path.clone())
        };

        // Indexed collect keeps results in employee order.
        let results: Vec<Result<PathBuf, PayrollError>> = if self.parallel {
            jobs.par_iter().map(render).collect()
        } else {
            jobs.iter().map(render).collect()
        };

        let mut written = Vec::with_capacity(results.len());
        for ((employee, _), result) in jobs.iter().zip(results) {
            match result {
                Ok(path) => written.push(path),
                Err(e) => report.warn(Warning::from_error(WarningScope::Employee, &employee.name, &e)),
            }
        }
        report.reports_written = written.len();
        log::info!("{} statement(s) in {}", written.len(), reports_dir.display());
        Ok(written)
    }

    /// Totals per employee and the grand total.
    pub fn summary(&self, school: &str, table: &Table, report: &mut RunReport) -> Result<(), CliError> {
        let columns = self.schema.report_columns(&table.columns);
        let employees = partition_employees(table, &self.schema);
        let summary = build_summary(&employees, &self.schema, &columns);
        report.summary_rows = summary.rows.len();
        report.warnings.extend(summary.warnings.iter().cloned());

        create_dir(&self.layout.out)?;
        let path = self.layout.summary_path(school);
        write_summary(&summary, school, &self.labels.fiscal_year, &path).map_err(PayrollError::Io)?;
        report.outputs.summary = Some(path);
        Ok(())
    }

    /// Consolidated PDF of the written statements. Failure is a warning.
    pub fn pdf(&self, school: &str, statements: &[PathBuf], exporter: &dyn PdfExporter, report: &mut RunReport) {
        let out = self.layout.pdf_path(school);
        match exporter.export(statements, &out) {
            Ok(()) => report.outputs.pdf = Some(out),
            Err(message) => {
                log::warn!("consolidated PDF skipped: {message}");
                report.warn(Warning::new(WarningScope::Output, out.display().to_string(), message));
            }
        }
    }
}

/// Sanitized, unique file stems in employee order. A clash gets ` (2)`,
/// ` (3)`, ... and a warning.
pub fn assign_file_names(employees: &[EmployeeRecords], report: &mut RunReport) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    employees
        .iter()
        .map(|employee| {
            let base = sanitize_file_name(&employee.name);
            let count = seen.entry(base.to_lowercase()).or_insert(0);
            *count += 1;
            if *count == 1 {
                return base;
            }
            let name = format!("{base} ({count})");
            log::warn!("file name '{base}' already used; writing '{name}'");
            report.warn(Warning::new(
                WarningScope::Employee,
                &employee.name,
                format!("file name clash, written as '{name}.xlsx'"),
            ));
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee(name: &str) -> EmployeeRecords {
        EmployeeRecords {
            name: name.to_string(),
            rows: vec![],
        }
    }

    #[test]
    fn output_layout() {
        let layout = Layout {
            root: PathBuf::from("/data"),
            out: PathBuf::from("/out"),
        };
        assert_eq!(layout.school_dir("ZP"), PathBuf::from("/data/ZP"));
        assert_eq!(layout.merged_path("ZP"), PathBuf::from("/out/ZP_Merged_Monthly.xlsx"));
        assert_eq!(layout.summary_path("ZP"), PathBuf::from("/out/ZP_Summary_Totals.xlsx"));
        assert_eq!(
            layout.pdf_path("ZP"),
            PathBuf::from("/out/ZP_income_tax_reports/ZP_All_Reports_Consolidated.pdf")
        );
    }

    #[test]
    fn clashing_file_names_get_suffixes() {
        let mut report = RunReport::new("ZP");
        let names = assign_file_names(
            &[employee("A/B"), employee("A:B"), employee("C"), employee("A*B")],
            &mut report,
        );
        assert_eq!(names, vec!["A_B", "A_B (2)", "C", "A_B (3)"]);
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].subject, "A:B");
    }

    #[test]
    fn merged_scan_window_covers_source_window() {
        let mut scan = ScanSettings {
            source_header_rows: 40,
            merged_header_rows: 20,
        };
        assert_eq!(merged_scan_rows(&scan), 42);
        scan.source_header_rows = 10;
        assert_eq!(merged_scan_rows(&scan), 20);
        assert_eq!(merged_scan_rows(&ScanSettings::default()), 42);
    }

    #[test]
    fn settings_override_labels() {
        let mut settings = Settings::default();
        settings.report.fiscal_year = Some("2026-27".into());
        let labels = labels_from(&settings);
        assert_eq!(labels.fiscal_year, "2026-27");
        assert_eq!(labels.title, "INCOME TAX DETAILS 2026-27");
        assert_eq!(labels.disclaimer, ReportLabels::default().disclaimer);

        settings.report.title = Some("FORM 16 WORKSHEET".into());
        assert_eq!(labels_from(&settings).title, "FORM 16 WORKSHEET");
    }

    #[test]
    fn report_serializes_counts_and_warnings() {
        let mut report = RunReport::new("ZP");
        report.files_loaded = 3;
        report.warn(Warning::new(WarningScope::File, "x.xls", "header marker SR.NO not found"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["school"], "ZP");
        assert_eq!(json["files_loaded"], 3);
        assert_eq!(json["warnings"][0]["scope"], "file");
        assert!(json["outputs"].get("merged").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(json["started_at"].as_str().unwrap()).is_ok());
    }
}
