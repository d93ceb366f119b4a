// BIFF8 style records of a legacy .xls workbook.
//
// calamine reads cell values but not formatting, so the donor's fonts, XFs,
// palette, merges, column widths and row heights are decoded here directly
// from the "Workbook" stream of the compound document. Only the first
// worksheet is scanned.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::donor::{CellStyle, FontSpec, HAlign, MergeRange, SheetStyles, DEFAULT_FONT};

const BOF: u16 = 0x0809;
const EOF: u16 = 0x000A;
const FONT: u16 = 0x0031;
const XF: u16 = 0x00E0;
const PALETTE: u16 = 0x0092;
const BOUNDSHEET: u16 = 0x0085;
const MERGEDCELLS: u16 = 0x00E5;
const ROW: u16 = 0x0208;
const COLINFO: u16 = 0x007D;
const MULRK: u16 = 0x00BD;
const MULBLANK: u16 = 0x00BE;

// =============================================================================
// Record iteration
// =============================================================================

#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub id: u16,
    pub offset: usize,
    pub data: &'a [u8],
}

/// Iterate `[id: u16][len: u16][data]` records from `offset`. A truncated
/// trailing record ends the iteration.
pub fn records(stream: &[u8], offset: usize) -> impl Iterator<Item = Record<'_>> {
    let mut pos = offset;
    std::iter::from_fn(move || {
        let header = stream.get(pos..pos + 4)?;
        let id = u16::from_le_bytes([header[0], header[1]]);
        let len = u16::from_le_bytes([header[2], header[3]]) as usize;
        let data = stream.get(pos + 4..pos + 4 + len)?;
        let record = Record { id, offset: pos, data };
        pos += 4 + len;
        Some(record)
    })
}

fn u16_at(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn u32_at(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

// =============================================================================
// Workbook globals
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Globals {
    pub fonts: Vec<FontSpec>,
    pub xfs: Vec<XfEntry>,
    /// Custom palette entries for indices 8.., when a PALETTE record exists.
    pub palette: Vec<[u8; 3]>,
    /// Stream offsets of worksheet substreams, in workbook order.
    pub sheet_offsets: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XfEntry {
    pub font: u16,
    pub h_align: u8,
    pub wrap: bool,
    pub fill_pattern: u8,
    pub fill_color: u16,
}

pub fn parse_globals(stream: &[u8]) -> Globals {
    let mut globals = Globals::default();
    for record in records(stream, 0) {
        match record.id {
            FONT => {
                if let Some(font) = parse_font(record.data) {
                    globals.fonts.push(font);
                }
            }
            XF => {
                if let Some(xf) = parse_xf(record.data) {
                    globals.xfs.push(xf);
                }
            }
            PALETTE => globals.palette = parse_palette(record.data),
            BOUNDSHEET => {
                // dt (byte 5) == 0 is a worksheet; charts and macros are skipped
                if let (Some(pos), Some(&dt)) = (u32_at(record.data, 0), record.data.get(5)) {
                    if dt == 0 {
                        globals.sheet_offsets.push(pos as usize);
                    }
                }
            }
            EOF => break,
            _ => {}
        }
    }
    globals
}

fn parse_font(data: &[u8]) -> Option<FontSpec> {
    let height = u16_at(data, 0)?;
    let grbit = u16_at(data, 2)?;
    let weight = u16_at(data, 6)?;
    let name = parse_short_string(data, 14).unwrap_or_default();
    Some(FontSpec {
        name: if name.is_empty() {
            DEFAULT_FONT.to_string()
        } else {
            name
        },
        size: f64::from(height / 20),
        bold: weight >= 700,
        italic: grbit & 0x0002 != 0,
    })
}

/// ShortXLUnicodeString: cch (u8), flags (bit 0 = UTF-16), characters.
fn parse_short_string(data: &[u8], at: usize) -> Option<String> {
    let cch = *data.get(at)? as usize;
    let flags = *data.get(at + 1)?;
    let chars = &data[at + 2..];
    if flags & 0x01 != 0 {
        let units: Vec<u16> = chars
            .chunks_exact(2)
            .take(cch)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Some(String::from_utf16_lossy(&units))
    } else {
        Some(chars.iter().take(cch).map(|&b| b as char).collect())
    }
}

fn parse_xf(data: &[u8]) -> Option<XfEntry> {
    let font = u16_at(data, 0)?;
    let align = *data.get(6)?;
    let border_fill = u32_at(data, 14)?;
    let colors = u16_at(data, 18)?;
    Some(XfEntry {
        font,
        h_align: align & 0x07,
        wrap: align & 0x08 != 0,
        fill_pattern: (border_fill >> 26) as u8 & 0x3F,
        fill_color: colors & 0x7F,
    })
}

fn parse_palette(data: &[u8]) -> Vec<[u8; 3]> {
    let count = u16_at(data, 0).unwrap_or(0) as usize;
    data.get(2..)
        .unwrap_or(&[])
        .chunks_exact(4)
        .take(count)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

impl Globals {
    /// FONT index 4 does not exist in BIFF; later indices shift down by one.
    pub fn font_for(&self, ifnt: u16) -> FontSpec {
        let idx = if ifnt >= 4 { ifnt - 1 } else { ifnt } as usize;
        self.fonts.get(idx).cloned().unwrap_or_default()
    }

    pub fn color(&self, icv: u16) -> Option<u32> {
        let rgb = match icv {
            8..=63 => match self.palette.get(icv as usize - 8) {
                Some(c) => *c,
                None => default_palette(icv as u8)?,
            },
            0..=7 => default_palette(icv as u8)?,
            // 64/65 are the system window colors: no explicit fill
            _ => return None,
        };
        Some(u32::from(rgb[0]) << 16 | u32::from(rgb[1]) << 8 | u32::from(rgb[2]))
    }

    pub fn style_for(&self, ixfe: u16) -> CellStyle {
        let Some(xf) = self.xfs.get(ixfe as usize) else {
            return CellStyle::default();
        };
        CellStyle {
            font: self.font_for(xf.font),
            align: match xf.h_align {
                1 => HAlign::Left,
                2 => HAlign::Center,
                3 => HAlign::Right,
                _ => HAlign::General,
            },
            wrap: xf.wrap,
            fill: if xf.fill_pattern != 0 {
                self.color(xf.fill_color)
            } else {
                None
            },
        }
    }
}

/// Default BIFF8 color palette (indices 0-63).
fn default_palette(idx: u8) -> Option<[u8; 3]> {
    let rgb = match idx {
        0 | 8 => [0, 0, 0],
        1 | 9 => [255, 255, 255],
        2 | 10 => [255, 0, 0],
        3 | 11 => [0, 255, 0],
        4 | 12 => [0, 0, 255],
        5 | 13 => [255, 255, 0],
        6 | 14 => [255, 0, 255],
        7 | 15 => [0, 255, 255],
        16 => [128, 0, 0],
        17 => [0, 128, 0],
        18 => [0, 0, 128],
        19 => [128, 128, 0],
        20 => [128, 0, 128],
        21 => [0, 128, 128],
        22 => [192, 192, 192],
        23 => [128, 128, 128],
        24 => [153, 153, 255],
        25 => [153, 51, 102],
        26 => [255, 255, 204],
        27 => [204, 255, 255],
        28 => [102, 0, 102],
        29 => [255, 128, 128],
        30 => [0, 102, 204],
        31 => [204, 204, 255],
        32 => [0, 0, 128],
        33 => [255, 0, 255],
        34 => [255, 255, 0],
        35 => [0, 255, 255],
        36 => [128, 0, 128],
        37 => [128, 0, 0],
        38 => [0, 128, 128],
        39 => [0, 0, 255],
        40 => [0, 204, 255],
        41 => [204, 255, 255],
        42 => [204, 255, 204],
        43 => [255, 255, 153],
        44 => [153, 204, 255],
        45 => [255, 153, 204],
        46 => [204, 153, 255],
        47 => [255, 204, 153],
        48 => [51, 102, 255],
        49 => [51, 204, 204],
        50 => [153, 204, 0],
        51 => [255, 204, 0],
        52 => [255, 153, 0],
        53 => [255, 102, 0],
        54 => [102, 102, 153],
        55 => [150, 150, 150],
        56 => [0, 51, 102],
        57 => [51, 153, 102],
        58 => [0, 51, 0],
        59 => [51, 51, 0],
        60 => [153, 51, 0],
        61 => [153, 51, 51],
        62 => [51, 51, 153],
        63 => [51, 51, 51],
        _ => return None,
    };
    Some(rgb)
}

// =============================================================================
// Worksheet substream
// =============================================================================

/// Scan one worksheet substream starting at its BOF record.
pub fn parse_sheet(stream: &[u8], start: usize, globals: &Globals) -> SheetStyles {
    let mut styles = SheetStyles::default();
    let mut xf_by_cell: HashMap<(u32, u16), u16> = HashMap::new();

    for record in records(stream, start) {
        // The next substream's BOF ends this one even without an EOF.
        if record.offset != start && record.id == BOF {
            break;
        }
        let data = record.data;
        match record.id {
            // FORMULA, BLANK, NUMBER, LABEL, BOOLERR, RK, RSTRING, LABELSST
            0x0006 | 0x0201 | 0x0203 | 0x0204 | 0x0205 | 0x027E | 0x00D6 | 0x00FD => {
                if let (Some(row), Some(col), Some(xf)) =
                    (u16_at(data, 0), u16_at(data, 2), u16_at(data, 4))
                {
                    xf_by_cell.insert((u32::from(row), col), xf);
                }
            }
            MULRK | MULBLANK => {
                let chunk = if record.id == MULRK { 6 } else { 2 };
                let (Some(row), Some(first)) = (u16_at(data, 0), u16_at(data, 2)) else {
                    continue;
                };
                if data.len() < 6 {
                    continue;
                }
                let body = &data[4..data.len() - 2];
                for (i, c) in body.chunks_exact(chunk).enumerate() {
                    let xf = u16::from_le_bytes([c[0], c[1]]);
                    xf_by_cell.insert((u32::from(row), first.saturating_add(i as u16)), xf);
                }
            }
            MERGEDCELLS => {
                let count = u16_at(data, 0).unwrap_or(0) as usize;
                for r in data.get(2..).unwrap_or(&[]).chunks_exact(8).take(count) {
                    styles.merges.push(MergeRange {
                        first_row: u32::from(u16::from_le_bytes([r[0], r[1]])),
                        last_row: u32::from(u16::from_le_bytes([r[2], r[3]])),
                        first_col: u16::from_le_bytes([r[4], r[5]]),
                        last_col: u16::from_le_bytes([r[6], r[7]]),
                    });
                }
            }
            ROW => {
                if let (Some(row), Some(height)) = (u16_at(data, 0), u16_at(data, 6)) {
                    let twips = height & 0x7FFF;
                    if twips > 0 {
                        styles.row_heights.insert(u32::from(row), f64::from(twips) / 20.0);
                    }
                }
            }
            COLINFO => {
                if let (Some(first), Some(last), Some(width)) =
                    (u16_at(data, 0), u16_at(data, 2), u16_at(data, 4))
                {
                    if width > 0 {
                        for col in first..=last.min(255) {
                            styles.col_widths.insert(col, f64::from(width) / 256.0);
                        }
                    }
                }
            }
            EOF => break,
            _ => {}
        }
    }

    styles.cell_styles = xf_by_cell
        .into_iter()
        .map(|(pos, xf)| (pos, globals.style_for(xf)))
        .collect();
    styles
}

// =============================================================================
// Entry point
// =============================================================================

/// Read the workbook stream out of the compound document.
pub fn read_workbook_stream(path: &Path) -> Result<Vec<u8>, String> {
    let mut comp = cfb::open(path)
        .map_err(|e| format!("Failed to open compound document: {}", e))?;
    let stream_path = ["/Workbook", "/Book"]
        .into_iter()
        .find(|p| comp.is_stream(p))
        .ok_or_else(|| "No Workbook stream in .xls file".to_string())?;
    let mut stream = comp
        .open_stream(stream_path)
        .map_err(|e| format!("Failed to open '{}': {}", stream_path, e))?;
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|e| format!("Failed to read '{}': {}", stream_path, e))?;
    Ok(bytes)
}

/// Formatting of the first worksheet of a legacy .xls file.
pub fn read_sheet_styles(path: &Path) -> Result<SheetStyles, String> {
    let stream = read_workbook_stream(path)?;
    let globals = parse_globals(&stream);
    let start = *globals
        .sheet_offsets
        .first()
        .ok_or_else(|| "Workbook has no worksheets".to_string())?;
    Ok(parse_sheet(&stream, start, &globals))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u16, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + data.len());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    fn font(height: u16, italic: bool, weight: u16, name: &str) -> Vec<u8> {
        let mut d = vec![0u8; 14];
        d[0..2].copy_from_slice(&height.to_le_bytes());
        d[2..4].copy_from_slice(&(if italic { 2u16 } else { 0 }).to_le_bytes());
        d[6..8].copy_from_slice(&weight.to_le_bytes());
        d.push(name.len() as u8);
        d.push(0);
        d.extend_from_slice(name.as_bytes());
        d
    }

    fn xf(font: u16, align: u8, pattern: u8, color: u16) -> Vec<u8> {
        let mut d = vec![0u8; 20];
        d[0..2].copy_from_slice(&font.to_le_bytes());
        d[6] = align;
        d[14..18].copy_from_slice(&(u32::from(pattern) << 26).to_le_bytes());
        d[18..20].copy_from_slice(&color.to_le_bytes());
        d
    }

    fn cell(id: u16, row: u16, col: u16, xf: u16) -> Vec<u8> {
        let mut d = Vec::new();
        d.extend_from_slice(&row.to_le_bytes());
        d.extend_from_slice(&col.to_le_bytes());
        d.extend_from_slice(&xf.to_le_bytes());
        d.extend_from_slice(&[0u8; 8]);
        record(id, &d)
    }

    fn workbook() -> Vec<u8> {
        let fonts: Vec<Vec<u8>> = vec![
            record(FONT, &font(220, false, 400, "Arial")),
            record(FONT, &font(220, false, 400, "Arial")),
            record(FONT, &font(220, false, 400, "Arial")),
            record(FONT, &font(220, false, 400, "Arial")),
            // index 5 after the missing 4
            record(FONT, &font(320, true, 700, "Times New Roman")),
            // 6pt
            record(FONT, &font(120, false, 400, "")),
        ];
        let xfs = vec![
            record(XF, &xf(0, 0, 0, 64)),
            // bold 16pt centered + wrap, solid fill palette index 13 (yellow)
            record(XF, &xf(5, 0x02 | 0x08, 1, 13)),
            record(XF, &xf(6, 3, 0, 13)),
        ];

        let mut globals = [record(BOF, &[0u8; 16])].concat();
        globals.extend(fonts.concat());
        globals.extend(xfs.concat());
        // BOUNDSHEET placeholder: offset patched once the globals length is known
        let boundsheet_at = globals.len();
        globals.extend(record(BOUNDSHEET, &[0, 0, 0, 0, 0, 0, 1, 0, b'S']));
        globals.extend(record(EOF, &[]));

        let sheet_start = globals.len() as u32;
        globals[boundsheet_at + 4..boundsheet_at + 8].copy_from_slice(&sheet_start.to_le_bytes());

        let mut merged = vec![1u8, 0];
        for v in [0u16, 1, 0, 5] {
            merged.extend_from_slice(&v.to_le_bytes());
        }
        let mut row = vec![0u8; 16];
        row[6..8].copy_from_slice(&600u16.to_le_bytes());
        let mut colinfo = vec![0u8; 12];
        colinfo[0..2].copy_from_slice(&1u16.to_le_bytes());
        colinfo[2..4].copy_from_slice(&2u16.to_le_bytes());
        colinfo[4..6].copy_from_slice(&(20u16 * 256).to_le_bytes());
        let mut mulblank = Vec::new();
        for v in [3u16, 0, 2, 2, 2] {
            mulblank.extend_from_slice(&v.to_le_bytes());
        }

        let sheet = [
            record(BOF, &[0u8; 16]),
            record(ROW, &row),
            record(COLINFO, &colinfo),
            cell(0x00FD, 0, 0, 1),
            cell(0x0203, 2, 1, 2),
            record(MULBLANK, &mulblank),
            record(MERGEDCELLS, &merged),
            record(EOF, &[]),
        ]
        .concat();

        [globals, sheet].concat()
    }

    #[test]
    fn globals_are_decoded() {
        let stream = workbook();
        let globals = parse_globals(&stream);
        assert_eq!(globals.fonts.len(), 6);
        assert_eq!(globals.xfs.len(), 3);
        assert_eq!(globals.sheet_offsets.len(), 1);

        let title = globals.font_for(5);
        assert_eq!(title.name, "Times New Roman");
        assert_eq!(title.size, 16.0);
        assert!(title.bold);
        assert!(title.italic);
        assert_eq!(globals.font_for(6).name, "Calibri");
    }

    #[test]
    fn sheet_styles_are_decoded() {
        let stream = workbook();
        let globals = parse_globals(&stream);
        let styles = parse_sheet(&stream, globals.sheet_offsets[0], &globals);

        let title = styles.style_at(0, 0);
        assert!(title.font.bold);
        assert_eq!(title.align, HAlign::Center);
        assert!(title.wrap);
        assert_eq!(title.fill, Some(0xFFFF00));

        let small = styles.style_at(2, 1);
        assert_eq!(small.align, HAlign::Right);
        assert_eq!(small.fill, None);
        assert_eq!(small.font.print_size(), 11.0);

        // MULBLANK row 3, cols 0..=2, xf 2
        assert_eq!(styles.style_at(3, 2).align, HAlign::Right);

        assert_eq!(
            styles.merges,
            vec![MergeRange {
                first_row: 0,
                last_row: 1,
                first_col: 0,
                last_col: 5
            }]
        );
        assert_eq!(styles.row_heights.get(&0), Some(&30.0));
        assert_eq!(styles.col_widths.get(&1), Some(&20.0));
        assert_eq!(styles.col_widths.get(&2), Some(&20.0));
        assert_eq!(styles.col_widths.get(&3), None);
    }

    #[test]
    fn custom_palette_overrides_defaults() {
        let mut data = vec![1u8, 0];
        data.extend_from_slice(&[0x44, 0x72, 0xC4, 0]);
        let globals = Globals {
            palette: parse_palette(&data),
            ..Globals::default()
        };
        assert_eq!(globals.color(8), Some(0x4472C4));
        assert_eq!(globals.color(13), Some(0xFFFF00));
        assert_eq!(globals.color(64), None);
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut stream = record(EOF, &[]);
        stream.extend_from_slice(&[0x31, 0x00, 0x10]);
        assert_eq!(records(&stream, 0).count(), 1);
    }
}
