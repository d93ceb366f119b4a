use std::collections::BTreeMap;

use crate::table::Table;

/// Excel's sheet-name length limit.
pub const MAX_SHEET_NAME: usize = 31;

/// All files of one month folder, concatenated.
#[derive(Debug, Clone)]
pub struct MonthTable {
    /// Raw folder token, exactly as found in the path.
    pub month: String,
    pub sheet_name: String,
    pub files: Vec<String>,
    pub table: Table,
}

/// Loaded tables grouped by month folder. Months iterate in sorted folder
/// order; tables within a month keep discovery order.
#[derive(Debug, Default)]
pub struct MonthGroups {
    groups: BTreeMap<String, Vec<(String, Table)>>,
}

impl MonthGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, month: &str, file: &str, table: Table) {
        self.groups
            .entry(month.to_string())
            .or_default()
            .push((file.to_string(), table));
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_month_tables(self) -> Vec<MonthTable> {
        let mut used: Vec<String> = Vec::new();
        self.groups
            .into_iter()
            .map(|(month, entries)| {
                let sheet_name = unique_sheet_name(&month, &used);
                used.push(sheet_name.to_lowercase());
                let (files, tables): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
                let table = Table::concat(tables);
                log::info!("[{month}] {} file(s), {} rows", files.len(), table.len());
                MonthTable {
                    month,
                    sheet_name,
                    files,
                    table,
                }
            })
            .collect()
    }
}

/// Sheet name for a month token: invalid characters replaced with `_`,
/// truncated to 31 characters.
pub fn sheet_name(month: &str) -> String {
    let cleaned: String = month
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            c => c,
        })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.trim().is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

// Excel compares sheet names case-insensitively.
fn unique_sheet_name(month: &str, used_lower: &[String]) -> String {
    let base = sheet_name(month);
    if !used_lower.contains(&base.to_lowercase()) {
        return base;
    }
    (2..)
        .map(|n| {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME.saturating_sub(suffix.chars().count());
            let stem: String = base.chars().take(keep).collect();
            format!("{stem}{suffix}")
        })
        .find(|candidate| !used_lower.contains(&candidate.to_lowercase()))
        .unwrap_or(base)
}
