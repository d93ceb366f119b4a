// Style donor: the heading block and header-row styles of the first source
// file, replayed onto every month sheet of the merged workbook.
//
// Legacy .xls donors are decoded from their BIFF8 records (biff.rs); .xlsx
// donors from styles.xml and the worksheet part (xlsx_styles.rs). Both land
// in the same `SheetStyles` model.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use taxsheet_payroll::header::{locate_header, SOURCE_SCAN_ROWS};
use taxsheet_payroll::{CellValue, RawTable};

use crate::{biff, source, xlsx_styles};

pub const DEFAULT_FONT: &str = "Calibri";
pub const DEFAULT_FONT_SIZE: f64 = 11.0;
/// Smaller donor fonts are unreadable in print and fall back to the default.
pub const MIN_FONT_SIZE: f64 = 8.0;

// =============================================================================
// Style model
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub name: String,
    /// Points.
    pub size: f64,
    pub bold: bool,
    pub italic: bool,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
        }
    }
}

impl FontSpec {
    /// Whole-point size with the readability floor applied.
    pub fn print_size(&self) -> f64 {
        let size = self.size.floor();
        if size < MIN_FONT_SIZE {
            DEFAULT_FONT_SIZE
        } else {
            size
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font: FontSpec,
    pub align: HAlign,
    pub wrap: bool,
    /// Solid background, 0xRRGGBB.
    pub fill: Option<u32>,
}

/// Inclusive, 0-based merged range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u16,
    pub last_col: u16,
}

impl MergeRange {
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }

    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }
}

/// Formatting of one sheet, independent of the file format it came from.
#[derive(Debug, Clone, Default)]
pub struct SheetStyles {
    pub cell_styles: HashMap<(u32, u16), CellStyle>,
    pub merges: Vec<MergeRange>,
    /// Character units.
    pub col_widths: BTreeMap<u16, f64>,
    /// Points.
    pub row_heights: BTreeMap<u32, f64>,
}

impl SheetStyles {
    pub fn style_at(&self, row: u32, col: u16) -> CellStyle {
        self.cell_styles.get(&(row, col)).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Donor
// =============================================================================

#[derive(Debug, Clone)]
pub struct HeadingCell {
    pub row: u32,
    pub col: u16,
    pub value: CellValue,
    pub style: CellStyle,
}

#[derive(Debug, Clone, Default)]
pub struct StyleDonor {
    pub file_name: String,
    /// Header row of the donor sheet; also the height of the heading block.
    pub header_row: usize,
    pub heading: Vec<HeadingCell>,
    /// Merges starting above the header row, clipped to the heading block.
    pub merges: Vec<MergeRange>,
    pub col_widths: BTreeMap<u16, f64>,
    /// Heading-block rows only.
    pub row_heights: BTreeMap<u32, f64>,
    /// Styles of the donor's header row, by column.
    pub header_styles: Vec<CellStyle>,
}

impl StyleDonor {
    pub fn header_style(&self, col: usize) -> Option<&CellStyle> {
        self.header_styles.get(col)
    }

    /// Combine the donor's cell values with its formatting.
    pub fn from_parts(file_name: &str, raw: &RawTable, header_row: usize, styles: &SheetStyles) -> Self {
        let width = raw.rows.iter().map(|r| r.len()).max().unwrap_or(0);

        let mut heading = Vec::new();
        for row in 0..header_row {
            for (col, value) in raw.row(row).iter().enumerate() {
                if value.is_blank() {
                    continue;
                }
                heading.push(HeadingCell {
                    row: row as u32,
                    col: col as u16,
                    value: value.clone(),
                    style: styles.style_at(row as u32, col as u16),
                });
            }
        }

        let merges = clip_merges(&styles.merges, header_row as u32);

        let row_heights = styles
            .row_heights
            .range(..header_row as u32)
            .map(|(r, h)| (*r, *h))
            .collect();

        let header_styles = (0..width)
            .map(|col| styles.style_at(header_row as u32, col as u16))
            .collect();

        Self {
            file_name: file_name.to_string(),
            header_row,
            heading,
            merges,
            col_widths: styles.col_widths.clone(),
            row_heights,
            header_styles,
        }
    }
}

/// Keep merges that start above `header_row`, cut off at the row before it.
/// Single cells and overlaps are dropped; the writer rejects both.
pub fn clip_merges(merges: &[MergeRange], header_row: u32) -> Vec<MergeRange> {
    let mut out: Vec<MergeRange> = Vec::new();
    for m in merges {
        if header_row == 0 || m.first_row >= header_row {
            continue;
        }
        let clipped = MergeRange {
            last_row: m.last_row.min(header_row - 1),
            ..*m
        };
        if clipped.is_single_cell() || out.iter().any(|o| o.overlaps(&clipped)) {
            continue;
        }
        out.push(clipped);
    }
    out
}

/// Read the donor's first sheet: values through calamine, formatting from
/// the file's own style records.
pub fn load_donor(path: &Path) -> Result<StyleDonor, String> {
    let (sheet_name, raw) = source::read_first_sheet(path)?;
    let header_row = locate_header(&raw, SOURCE_SCAN_ROWS).map_err(|e| e.to_string())?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let styles = match ext.as_str() {
        "xls" => biff::read_sheet_styles(path)?,
        "xlsx" | "xlsm" => xlsx_styles::read_sheet_styles(path, &sheet_name)?,
        other => return Err(format!("unsupported donor format '.{other}'")),
    };

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let donor = StyleDonor::from_parts(&file_name, &raw, header_row, &styles);
    log::info!(
        "style donor {}: {} heading cell(s), {} merge(s), header at row {}",
        donor.file_name,
        donor.heading.len(),
        donor.merges.len(),
        header_row
    );
    Ok(donor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(r0: u32, r1: u32, c0: u16, c1: u16) -> MergeRange {
        MergeRange {
            first_row: r0,
            last_row: r1,
            first_col: c0,
            last_col: c1,
        }
    }

    #[test]
    fn merges_are_clipped_to_heading_block() {
        let clipped = clip_merges(&[m(0, 0, 0, 8), m(1, 5, 0, 2), m(4, 4, 0, 3)], 3);
        assert_eq!(clipped, vec![m(0, 0, 0, 8), m(1, 2, 0, 2)]);
    }

    #[test]
    fn clipping_drops_single_cells_and_overlaps() {
        let clipped = clip_merges(&[m(2, 6, 1, 1), m(0, 1, 0, 3), m(1, 1, 2, 5)], 3);
        assert_eq!(clipped, vec![m(0, 1, 0, 3)]);
        assert!(clip_merges(&[m(0, 1, 0, 3)], 0).is_empty());
    }

    #[test]
    fn tiny_fonts_fall_back_to_default() {
        let font = FontSpec {
            size: 6.0,
            ..FontSpec::default()
        };
        assert_eq!(font.print_size(), 11.0);
        let font = FontSpec {
            size: 12.5,
            ..FontSpec::default()
        };
        assert_eq!(font.print_size(), 12.0);
    }

    #[test]
    fn donor_collects_heading_and_header_styles() {
        let raw = RawTable::new(vec![
            vec![CellValue::text("ZP SCHOOL"), CellValue::Empty],
            vec![CellValue::Empty, CellValue::text("APRIL 2025")],
            vec![CellValue::text("SR.NO"), CellValue::text("EMPLOYEE NAME")],
        ]);
        let mut styles = SheetStyles::default();
        let bold = CellStyle {
            font: FontSpec {
                bold: true,
                ..FontSpec::default()
            },
            fill: Some(0xFFFF00),
            ..CellStyle::default()
        };
        styles.cell_styles.insert((0, 0), bold.clone());
        styles.cell_styles.insert((2, 1), bold.clone());
        styles.merges.push(m(0, 0, 0, 1));
        styles.row_heights.insert(0, 30.0);
        styles.row_heights.insert(2, 45.0);

        let donor = StyleDonor::from_parts("a.xls", &raw, 2, &styles);
        assert_eq!(donor.heading.len(), 2);
        assert_eq!(donor.heading[0].style, bold);
        assert_eq!(donor.heading[1].row, 1);
        assert_eq!(donor.merges, vec![m(0, 0, 0, 1)]);
        assert_eq!(donor.row_heights.len(), 1);
        assert_eq!(donor.header_styles.len(), 2);
        assert_eq!(donor.header_style(1), Some(&bold));
        assert_eq!(donor.header_style(0), Some(&CellStyle::default()));
    }
}
