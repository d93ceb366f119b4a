// Application settings
// Loaded from ~/.config/taxsheet/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed texts printed on statements and the summary. `None` keeps the
/// built-in wording.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReportSettings {
    pub title: Option<String>,
    pub fiscal_year: Option<String>,
    pub disclaimer: Option<String>,
    pub employee_signature: Option<String>,
    pub headmaster_signature: Option<String>,
}

/// How many leading rows are searched for the `SR.NO` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanSettings {
    pub source_header_rows: usize,
    pub merged_header_rows: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            source_header_rows: 40,
            merged_header_rows: 42,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PdfSettings {
    /// Produce the consolidated PDF at the end of `run`.
    pub enabled: bool,
    /// LibreOffice binary; searched on PATH when unset.
    pub office_binary: Option<String>,
    /// PDF concatenation tool (pdfunite); searched on PATH when unset.
    pub merge_binary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Data root holding one folder per school.
    pub root: Option<PathBuf>,

    pub report: ReportSettings,

    pub scan: ScanSettings,

    pub pdf: PdfSettings,

    /// Generate employee statements on all cores.
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: None,
            report: ReportSettings::default(),
            scan: ScanSettings::default(),
            pdf: PdfSettings::default(),
            parallel: true,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Data root: one folder per school, one sub-folder per month.
    // Overridden by TAXSHEET_ROOT and --root.
    "root": null,

    // Statement texts (null = built-in wording)
    "report": {
        "title": null,
        "fiscalYear": null,
        "disclaimer": null,
        "employeeSignature": null,
        "headmasterSignature": null
    },

    // Rows searched for the SR.NO header
    "scan": {
        "sourceHeaderRows": 40,
        "mergedHeaderRows": 42
    },

    // Consolidated PDF (needs LibreOffice and pdfunite)
    "pdf": {
        "enabled": false,
        "officeBinary": null,
        "mergeBinary": null
    },

    "parallel": true
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("taxsheet")
            .join("settings.json")
    }

    /// Load settings from the default location, creating a commented
    /// default file on first use.
    pub fn load() -> Self {
        let path = Self::path();
        if !path.exists() {
            Self::create_default_file(&path);
            return Self::default();
        }
        Self::load_from(&path)
    }

    /// Load settings from `path`, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    eprintln!("Error parsing {}: {}", path.display(), e);
                    eprintln!("Using default settings");
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON; lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn create_default_file(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating config directory: {}", e);
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            eprintln!("Error writing default settings.json: {}", e);
        }
    }

    /// Get the config file path for display
    pub fn path_display() -> String {
        Self::path().to_string_lossy().to_string()
    }
}
