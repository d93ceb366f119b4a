// Consolidated PDF of all statement workbooks.
//
// Conversion is delegated to LibreOffice (headless) and concatenation to
// pdfunite (poppler-utils). Both are optional at runtime: when missing, the
// caller records a warning and the run still succeeds.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Turns a set of workbooks into one PDF.
pub trait PdfExporter {
    fn export(&self, workbooks: &[PathBuf], out: &Path) -> Result<(), String>;
}

pub struct OfficePdfExporter {
    office: PathBuf,
    merge: PathBuf,
}

impl OfficePdfExporter {
    /// Resolve the tools from explicit settings or PATH.
    pub fn locate(office_binary: Option<&str>, merge_binary: Option<&str>) -> Result<Self, String> {
        let office = match office_binary {
            Some(bin) => which::which(bin),
            None => which::which("soffice").or_else(|_| which::which("libreoffice")),
        }
        .map_err(|_| "LibreOffice not installed (soffice/libreoffice not found)".to_string())?;

        let merge = which::which(merge_binary.unwrap_or("pdfunite"))
            .map_err(|_| "pdfunite not installed (poppler-utils)".to_string())?;

        Ok(Self { office, merge })
    }

    fn convert(&self, workbook: &Path, out_dir: &Path) -> Result<PathBuf, String> {
        let output = Command::new(&self.office)
            .arg("--headless")
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(workbook)
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.office.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "conversion of {} failed (exit {}): {}",
                workbook.display(),
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            ));
        }

        let pdf = out_dir.join(pdf_name(workbook));
        if !pdf.exists() {
            return Err(format!("no PDF produced for {}", workbook.display()));
        }
        Ok(pdf)
    }

    fn concatenate(&self, pdfs: &[PathBuf], out: &Path) -> Result<(), String> {
        if let [single] = pdfs {
            return std::fs::copy(single, out)
                .map(|_| ())
                .map_err(|e| format!("cannot write {}: {}", out.display(), e));
        }

        let output = Command::new(&self.merge)
            .args(pdfs)
            .arg(out)
            .output()
            .map_err(|e| format!("failed to run {}: {}", self.merge.display(), e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "pdfunite failed (exit {}): {}",
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            ));
        }
        Ok(())
    }
}

impl PdfExporter for OfficePdfExporter {
    fn export(&self, workbooks: &[PathBuf], out: &Path) -> Result<(), String> {
        if workbooks.is_empty() {
            return Err("no workbooks to convert".to_string());
        }
        let tmp = tempfile::tempdir().map_err(|e| format!("cannot create temp dir: {}", e))?;

        let mut pdfs = Vec::with_capacity(workbooks.len());
        for workbook in sorted_by_name(workbooks) {
            pdfs.push(self.convert(&workbook, tmp.path())?);
            log::debug!("converted {}", workbook.display());
        }

        self.concatenate(&pdfs, out)?;
        log::info!("consolidated PDF: {} ({} workbook(s))", out.display(), pdfs.len());
        Ok(())
    }
}

/// `JOHN DOE.xlsx` -> `JOHN DOE.pdf`
fn pdf_name(workbook: &Path) -> String {
    let stem = workbook
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    format!("{}.pdf", stem)
}

fn sorted_by_name(workbooks: &[PathBuf]) -> Vec<PathBuf> {
    let mut sorted = workbooks.to_vec();
    sorted.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    sorted
}
