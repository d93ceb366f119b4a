// taxsheet - payroll consolidation and income-tax statements
//
// Reads monthly pay bills from <root>/<school>/<month>/*.xls[x], merges
// them into one workbook, and writes a statement per employee plus a
// school summary.

mod discover;
mod exit_codes;
mod pdf;
mod pipeline;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use taxsheet_config::Settings;
use taxsheet_payroll::{locate_header, PayrollError, Schema, Warning, WarningScope};
use tracing_subscriber::EnvFilter;

use exit_codes::{
    EXIT_IO, EXIT_MISSING_ARTIFACT, EXIT_NO_INPUT, EXIT_PARSE, EXIT_PARTIAL, EXIT_SUCCESS,
    EXIT_USAGE,
};
use pdf::OfficePdfExporter;
use pipeline::{Layout, LogProgress, Pipeline, RunReport};

#[derive(Parser)]
#[command(name = "taxsheet")]
#[command(about = "Merge monthly pay bills and produce income-tax statements")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Data root: one folder per school, one sub-folder per month
    #[arg(long, global = true, env = "TAXSHEET_ROOT")]
    root: Option<PathBuf>,

    /// Output directory (defaults to the data root)
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Schema overrides (TOML); missing tables keep the built-in layout
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log debug detail
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Print the run report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Exit with code 3 when any file or employee was skipped
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every month folder of a school and write the merged workbook
    #[command(after_help = "\
Examples:
  taxsheet merge \"ZP School\" --root /data/payroll
  TAXSHEET_ROOT=/data/payroll taxsheet merge \"ZP School\" --out /tmp/out")]
    Merge {
        /// School folder name under the root
        school: String,
    },

    /// Write one income-tax statement per employee from the merged workbook
    Report {
        school: String,

        /// Generate statements on one thread
        #[arg(long)]
        sequential: bool,
    },

    /// Write the per-employee totals workbook from the merged workbook
    Summary {
        school: String,
    },

    /// Merge, report and summarize in one go
    #[command(after_help = "\
Examples:
  taxsheet run \"ZP School\"
  taxsheet run \"ZP School\" --pdf --json > run.json")]
    Run {
        school: String,

        /// Also produce the consolidated PDF (needs LibreOffice and pdfunite)
        #[arg(long)]
        pdf: bool,

        #[arg(long)]
        sequential: bool,
    },

    /// List school folders under the root
    Schools,

    /// Print the month table of the active schema
    Months,

    /// Show where the SR.NO header sits in a source workbook
    Locate {
        file: PathBuf,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let default = if quiet {
        "taxsheet=warn"
    } else if verbose {
        "taxsheet=debug"
    } else {
        "taxsheet=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match &cli.command {
        Commands::Schools => cmd_schools(&cli),
        Commands::Months => cmd_months(&cli),
        Commands::Locate { file } => cmd_locate(&cli, file),
        Commands::Merge { school } => cmd_stage(&cli, school, Stage::Merge),
        Commands::Report { school, sequential } => {
            cmd_stage(&cli, school, Stage::Report { sequential: *sequential })
        }
        Commands::Summary { school } => cmd_stage(&cli, school, Stage::Summary),
        Commands::Run { school, pdf, sequential } => cmd_stage(
            &cli,
            school,
            Stage::Run { pdf: *pdf, sequential: *sequential },
        ),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    pub fn missing(msg: impl Into<String>) -> Self {
        Self { code: EXIT_MISSING_ARTIFACT, message: msg.into(), hint: None }
    }

    pub fn partial(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARTIAL, message: msg.into(), hint: None }
    }

    pub fn no_input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_NO_INPUT, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<PayrollError> for CliError {
    fn from(err: PayrollError) -> Self {
        let message = err.to_string();
        match err {
            PayrollError::MissingArtifact { .. } => Self::missing(message),
            PayrollError::ConfigParse(_)
            | PayrollError::ConfigValidation(_)
            | PayrollError::HeaderNotFound { .. } => Self::parse(message),
            PayrollError::FileLoad { .. }
            | PayrollError::EmployeeReport { .. }
            | PayrollError::Io(_) => Self::io(message),
        }
    }
}

// ============================================================================
// Shared setup
// ============================================================================

fn load_schema(path: Option<&Path>) -> Result<Schema, CliError> {
    let Some(path) = path else {
        return Ok(Schema::default());
    };
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read schema {}: {}", path.display(), e)))?;
    let schema = Schema::from_toml(&text)
        .map_err(|e| CliError::from(e).with_hint(format!("check {}", path.display())))?;
    log::debug!("schema overrides from {}", path.display());
    Ok(schema)
}

/// `--root` / `TAXSHEET_ROOT`, then `settings.root`.
fn resolve_root(cli: &Cli, settings: &Settings) -> Result<PathBuf, CliError> {
    let root = cli
        .root
        .clone()
        .or_else(|| settings.root.clone())
        .ok_or_else(|| {
            CliError::args("no data root given").with_hint(format!(
                "pass --root, set TAXSHEET_ROOT, or set \"root\" in {}",
                Settings::path_display()
            ))
        })?;
    if !root.is_dir() {
        return Err(CliError::args(format!("data root not found: {}", root.display())));
    }
    Ok(root)
}

// ============================================================================
// schools / months / locate
// ============================================================================

fn cmd_schools(cli: &Cli) -> Result<(), CliError> {
    let settings = Settings::load();
    let root = resolve_root(cli, &settings)?;
    let schools = discover::list_schools(&root).map_err(CliError::io)?;

    if cli.json {
        println!("{}", serde_json::json!({ "root": root, "schools": schools }));
    } else if schools.is_empty() {
        eprintln!("no school folders under {}", root.display());
    } else {
        for school in &schools {
            println!("{}", school);
        }
    }
    Ok(())
}

fn cmd_months(cli: &Cli) -> Result<(), CliError> {
    let schema = load_schema(cli.schema.as_deref())?;

    if cli.json {
        let months: Vec<_> = schema
            .months
            .iter()
            .map(|m| serde_json::json!({ "key": m.key, "label": m.label, "variants": m.variants }))
            .collect();
        println!("{}", serde_json::Value::Array(months));
        return Ok(());
    }

    let last = schema.months.len().saturating_sub(1);
    for (i, month) in schema.months.iter().enumerate() {
        let role = if i == last {
            "  (terminal)"
        } else if i + 1 == last {
            "  (projection source)"
        } else {
            ""
        };
        println!("{:<10} {}{}", month.key, month.label, role);
    }
    Ok(())
}

fn cmd_locate(cli: &Cli, file: &Path) -> Result<(), CliError> {
    let settings = Settings::load();
    let (sheet, raw) = taxsheet_io::read_first_sheet(file).map_err(CliError::io)?;
    let scan = settings.scan.source_header_rows;
    let row = locate_header(&raw, scan).map_err(|e| {
        CliError::from(e).with_hint("raise scan.sourceHeaderRows in settings.json if the header sits lower")
    })?;

    if cli.json {
        println!(
            "{}",
            serde_json::json!({ "file": file, "sheet": sheet, "header_row": row, "scanned": scan })
        );
    } else {
        println!("{}: sheet '{}', header at row {} (1-based {})", file.display(), sheet, row, row + 1);
    }
    Ok(())
}

// ============================================================================
// merge / report / summary / run
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Stage {
    Merge,
    Report { sequential: bool },
    Summary,
    Run { pdf: bool, sequential: bool },
}

fn cmd_stage(cli: &Cli, school: &str, stage: Stage) -> Result<(), CliError> {
    let settings = Settings::load();
    let root = resolve_root(cli, &settings)?;
    let schema = load_schema(cli.schema.as_deref())?;
    let layout = Layout {
        out: cli.out.clone().unwrap_or_else(|| root.clone()),
        root,
    };

    let mut pipeline = Pipeline::new(layout, schema, &settings);
    if let Stage::Report { sequential: true } | Stage::Run { sequential: true, .. } = stage {
        pipeline.parallel = false;
    }

    let progress = LogProgress;
    let mut report = RunReport::new(school);

    match stage {
        Stage::Merge => pipeline.merge(school, &mut report, &progress)?,
        Stage::Report { .. } => {
            let table = pipeline.load_merged(school)?;
            pipeline.reports(school, &table, &mut report, &progress)?;
        }
        Stage::Summary => {
            let table = pipeline.load_merged(school)?;
            pipeline.summary(school, &table, &mut report)?;
        }
        Stage::Run { pdf, .. } => {
            pipeline.merge(school, &mut report, &progress)?;
            let table = pipeline.load_merged(school)?;
            let statements = pipeline.reports(school, &table, &mut report, &progress)?;
            pipeline.summary(school, &table, &mut report)?;
            if pdf || settings.pdf.enabled {
                match OfficePdfExporter::locate(
                    settings.pdf.office_binary.as_deref(),
                    settings.pdf.merge_binary.as_deref(),
                ) {
                    Ok(exporter) => pipeline.pdf(school, &statements, &exporter, &mut report),
                    Err(message) => {
                        log::warn!("consolidated PDF skipped: {message}");
                        report.warnings.push(Warning::new(WarningScope::Output, "pdf", message));
                    }
                }
            }
        }
    }

    print_report(&report, cli.json)?;

    if cli.strict && report.has_warnings() {
        return Err(CliError::partial(format!(
            "{} item(s) skipped",
            report.warnings.len()
        ))
        .with_hint("rerun without --strict to accept a partial result"));
    }
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<(), CliError> {
    if json {
        let text = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::io(format!("cannot serialize run report: {}", e)))?;
        println!("{}", text);
        return Ok(());
    }

    println!("school:    {}", report.school);
    if report.files_loaded + report.files_skipped > 0 {
        println!(
            "files:     {} loaded, {} skipped ({} month(s))",
            report.files_loaded, report.files_skipped, report.months
        );
    }
    if report.employees > 0 {
        println!("employees: {} ({} statement(s))", report.employees, report.reports_written);
    }
    if report.summary_rows > 0 {
        println!("summary:   {} row(s)", report.summary_rows);
    }
    let outputs = &report.outputs;
    for (label, path) in [
        ("merged", &outputs.merged),
        ("reports", &outputs.reports_dir),
        ("summary", &outputs.summary),
        ("pdf", &outputs.pdf),
    ] {
        if let Some(path) = path {
            println!("{:<10} {}", format!("{}:", label), path.display());
        }
    }

    if report.has_warnings() {
        println!();
        println!("skipped ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  {}", warning);
        }
    }
    Ok(())
}
