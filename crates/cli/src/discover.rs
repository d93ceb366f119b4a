// Input discovery: `<root>/<school>/<month folder>/*.xls[x]`.

use std::path::{Path, PathBuf};

/// Suffix of the per-school report folder written next to the schools.
pub const REPORTS_SUFFIX: &str = "_income_tax_reports";

/// Source files of one month folder, in name order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthFolder {
    /// Folder name, exactly as on disk.
    pub month: String,
    pub files: Vec<PathBuf>,
}

/// Office lock files (`~$name.xlsx`) are never sources.
fn is_lock_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with("~$"))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

/// `[` `]` `*` `?` in a real directory name must not act as glob syntax.
fn glob_base(dir: &Path) -> String {
    glob::Pattern::escape(&dir.to_string_lossy())
}

/// Month folders under a school directory, sorted by name, each with its
/// sorted source workbooks. Folders without sources are kept with an empty
/// file list so the caller can report them.
pub fn discover_months(school_dir: &Path) -> Result<Vec<MonthFolder>, String> {
    let pattern = format!("{}/*", glob_base(school_dir));
    let mut dirs: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| format!("invalid path '{}': {}", school_dir.display(), e))?
        .filter_map(Result::ok)
        .filter(|p| p.is_dir() && !is_hidden(p))
        .collect();
    dirs.sort();

    let mut months = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let month = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let files = source_files(&dir)?;
        months.push(MonthFolder { month, files });
    }
    Ok(months)
}

/// `*.xls` and `*.xlsx` directly inside `dir`, lock files excluded.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    let options = glob::MatchOptions {
        case_sensitive: false,
        ..glob::MatchOptions::new()
    };
    for ext in ["xls", "xlsx"] {
        let pattern = format!("{}/*.{}", glob_base(dir), ext);
        let matches = glob::glob_with(&pattern, options)
            .map_err(|e| format!("invalid path '{}': {}", dir.display(), e))?;
        files.extend(matches.filter_map(Result::ok).filter(|p| p.is_file() && !is_lock_file(p)));
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// School folders under the data root, skipping report output folders and
/// hidden directories.
pub fn list_schools(root: &Path) -> Result<Vec<String>, String> {
    let pattern = format!("{}/*", glob_base(root));
    let mut schools: Vec<String> = glob::glob(&pattern)
        .map_err(|e| format!("invalid root '{}': {}", root.display(), e))?
        .filter_map(Result::ok)
        .filter(|p| p.is_dir() && !is_hidden(p))
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .filter(|name| !name.ends_with(REPORTS_SUFFIX))
        .collect();
    schools.sort();
    Ok(schools)
}
