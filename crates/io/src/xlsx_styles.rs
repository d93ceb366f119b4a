//! XLSX style reader: fonts, fills and alignment from styles.xml, per-cell
//! style ids, merges and dimensions from the worksheet part.
//!
//! Only what the merged workbook replays from its style donor is decoded;
//! borders and number formats are ignored.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::donor::{CellStyle, FontSpec, HAlign, MergeRange, SheetStyles, DEFAULT_FONT_SIZE};

// =============================================================================
// Colors
// =============================================================================

/// Standard Excel indexed color palette, 0xRRGGBB.
fn indexed_color(idx: u8) -> Option<u32> {
    let rgb = match idx {
        0 | 8 => 0x000000,
        1 | 9 => 0xFFFFFF,
        2 | 10 => 0xFF0000,
        3 | 11 => 0x00FF00,
        4 | 12 => 0x0000FF,
        5 | 13 => 0xFFFF00,
        6 | 14 => 0xFF00FF,
        7 | 15 => 0x00FFFF,
        16 => 0x800000,
        17 => 0x008000,
        18 => 0x000080,
        19 => 0x808000,
        20 => 0x800080,
        21 => 0x008080,
        22 => 0xC0C0C0,
        23 => 0x808080,
        24 => 0x9999FF,
        25 => 0x993366,
        26 => 0xFFFFCC,
        27 => 0xCCFFFF,
        28 => 0x660066,
        29 => 0xFF8080,
        30 => 0x0066CC,
        31 => 0xCCCCFF,
        32 => 0x000080,
        33 => 0xFF00FF,
        34 => 0xFFFF00,
        35 => 0x00FFFF,
        36 => 0x800080,
        37 => 0x800000,
        38 => 0x008080,
        39 => 0x0000FF,
        40 => 0x00CCFF,
        41 => 0xCCFFFF,
        42 => 0xCCFFCC,
        43 => 0xFFFF99,
        44 => 0x99CCFF,
        45 => 0xFF99CC,
        46 => 0xCC99FF,
        47 => 0xFFCC99,
        48 => 0x3366FF,
        49 => 0x33CCCC,
        50 => 0x99CC00,
        51 => 0xFFCC00,
        52 => 0xFF9900,
        53 => 0xFF6600,
        54 => 0x666699,
        55 => 0x969696,
        56 => 0x003366,
        57 => 0x339966,
        58 => 0x003300,
        59 => 0x333300,
        60 => 0x993300,
        61 => 0x993333,
        62 => 0x333399,
        63 => 0x333333,
        _ => return None,
    };
    Some(rgb)
}

/// Flat theme color defaults (no tint math).
fn theme_color_default(idx: u8) -> Option<u32> {
    let rgb = match idx {
        0 => 0xFFFFFF,
        1 => 0x000000,
        2 => 0xEEECE1,
        3 => 0x1F497D,
        4 => 0x4F81BD,
        5 => 0xC0504D,
        6 => 0x9BBB59,
        7 => 0x8064A2,
        8 => 0x4BACC6,
        9 => 0xF79646,
        _ => return None,
    };
    Some(rgb)
}

/// Color from rgb, indexed or theme attributes, in that order of preference.
fn parse_color_attrs(e: &BytesStart) -> Option<u32> {
    let mut rgb = None;
    let mut indexed = None;
    let mut theme = None;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"rgb" => rgb = parse_argb_hex(&attr.value),
            b"indexed" => indexed = parse_attr::<u8>(&attr.value),
            b"theme" => theme = parse_attr::<u8>(&attr.value),
            _ => {}
        }
    }
    rgb.or_else(|| indexed.and_then(indexed_color))
        .or_else(|| theme.and_then(theme_color_default))
}

/// AARRGGBB or RRGGBB hex; alpha is dropped.
fn parse_argb_hex(hex: &[u8]) -> Option<u32> {
    let s = std::str::from_utf8(hex).ok()?.trim_start_matches('#');
    let rgb = match s.len() {
        8 => &s[2..],
        6 => s,
        _ => return None,
    };
    u32::from_str_radix(rgb, 16).ok()
}

fn parse_attr<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

fn is_true(value: &[u8]) -> bool {
    value == b"1" || value == b"true"
}

/// `<b/>` is on; `<b val="0"/>` is off.
fn toggle_on(e: &BytesStart) -> bool {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"val")
        .map_or(true, |a| is_true(&a.value))
}

// =============================================================================
// styles.xml
// =============================================================================

fn parse_fonts(xml: &str) -> Vec<FontSpec> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = FontSpec::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = FontSpec::default();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"b" => current.bold = toggle_on(e),
                b"i" => current.italic = toggle_on(e),
                b"sz" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.size = parse_attr(&attr.value).unwrap_or(DEFAULT_FONT_SIZE);
                        }
                    }
                }
                b"name" | b"rFont" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.name = String::from_utf8_lossy(&attr.value).to_string();
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(current.clone());
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fonts
}

/// Solid fill color per <fill>; `None` for pattern "none" and gradients.
fn parse_fills(xml: &str) -> Vec<Option<u32>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fills>, 2 = inside <fill>
    let mut in_pattern_fill = false;
    let mut current: Option<u32> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fills" if depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    current = None;
                }
                b"patternFill" if depth == 2 => in_pattern_fill = true,
                b"fgColor" if in_pattern_fill => current = parse_color_attrs(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"fgColor" && in_pattern_fill {
                    current = parse_color_attrs(e);
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"patternFill" => in_pattern_fill = false,
                b"fill" if depth == 2 => {
                    fills.push(current);
                    depth = 1;
                    in_pattern_fill = false;
                }
                b"fills" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

#[derive(Debug, Default)]
struct XfEntry {
    font_id: Option<usize>,
    fill_id: Option<usize>,
    h_align: Option<String>,
    wrap_text: bool,
}

impl XfEntry {
    fn from_attrs(e: &BytesStart) -> Self {
        let mut xf = XfEntry::default();
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"fontId" => xf.font_id = parse_attr(&attr.value),
                b"fillId" => xf.fill_id = parse_attr(&attr.value),
                _ => {}
            }
        }
        xf
    }

    fn read_alignment(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"horizontal" => {
                    self.h_align = Some(String::from_utf8_lossy(&attr.value).to_string())
                }
                b"wrapText" => self.wrap_text = is_true(&attr.value),
                _ => {}
            }
        }
    }

    fn resolve(&self, fonts: &[FontSpec], fills: &[Option<u32>]) -> CellStyle {
        CellStyle {
            font: self
                .font_id
                .and_then(|id| fonts.get(id))
                .cloned()
                .unwrap_or_default(),
            align: match self.h_align.as_deref() {
                Some("left") => HAlign::Left,
                Some("center") | Some("centerContinuous") => HAlign::Center,
                Some("right") => HAlign::Right,
                _ => HAlign::General,
            },
            wrap: self.wrap_text,
            fill: self.fill_id.and_then(|id| fills.get(id).copied().flatten()),
        }
    }
}

/// cellXfs index -> resolved style.
pub fn parse_styles_xml(xml: &str) -> Vec<CellStyle> {
    let fonts = parse_fonts(xml);
    let fills = parse_fills(xml);

    let mut styles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut current: Option<XfEntry> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => current = Some(XfEntry::from_attrs(e)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                // Self-closing <xf .../>
                b"xf" if in_cell_xfs => styles.push(XfEntry::from_attrs(e).resolve(&fonts, &fills)),
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"xf" => {
                    if let Some(xf) = current.take() {
                        styles.push(xf.resolve(&fonts, &fills));
                    }
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    styles
}

// =============================================================================
// Worksheet XML
// =============================================================================

/// Per-cell style ids and layout of one worksheet.
#[derive(Debug, Default)]
pub struct SheetFormatting {
    /// (row, col, style_id)
    pub cell_styles: Vec<(u32, u16, usize)>,
    pub col_widths: HashMap<u16, f64>,
    pub row_heights: HashMap<u32, f64>,
    pub merges: Vec<MergeRange>,
}

pub fn parse_sheet_formatting(xml: &str) -> SheetFormatting {
    let mut formatting = SheetFormatting::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"row" => {
                    let mut row: Option<u32> = None;
                    let mut ht: Option<f64> = None;
                    let mut custom_height = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => row = parse_attr::<u32>(&attr.value).map(|r| r.saturating_sub(1)),
                            b"ht" => ht = parse_attr(&attr.value),
                            b"customHeight" => custom_height = is_true(&attr.value),
                            _ => {}
                        }
                    }
                    if custom_height {
                        if let (Some(row), Some(height)) = (row, ht) {
                            formatting.row_heights.insert(row, height);
                        }
                    }
                }
                b"c" => {
                    let mut style_id: Option<usize> = None;
                    let mut cell_ref: Option<(u32, u16)> = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"s" => style_id = parse_attr(&attr.value),
                            b"r" => cell_ref = parse_cell_ref(&String::from_utf8_lossy(&attr.value)),
                            _ => {}
                        }
                    }
                    // style 0 is the default
                    if let (Some(style_id), Some((row, col))) = (style_id, cell_ref) {
                        if style_id > 0 {
                            formatting.cell_styles.push((row, col, style_id));
                        }
                    }
                }
                b"col" => {
                    let mut min: Option<u16> = None;
                    let mut max: Option<u16> = None;
                    let mut width: Option<f64> = None;
                    let mut custom_width = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"min" => min = parse_attr::<u16>(&attr.value).map(|c| c.saturating_sub(1)),
                            b"max" => max = parse_attr::<u16>(&attr.value).map(|c| c.saturating_sub(1)),
                            b"width" => width = parse_attr(&attr.value),
                            b"customWidth" => custom_width = is_true(&attr.value),
                            _ => {}
                        }
                    }
                    if custom_width {
                        if let (Some(min), Some(max), Some(w)) = (min, max, width) {
                            // <col> spans can run to column XFD
                            for col in min..=max.min(min.saturating_add(255)) {
                                formatting.col_widths.insert(col, w);
                            }
                        }
                    }
                }
                b"mergeCell" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            if let Some(range) = parse_merge_ref(&String::from_utf8_lossy(&attr.value)) {
                                formatting.merges.push(range);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    formatting
}

/// "A1:C3" -> inclusive 0-based range.
pub fn parse_merge_ref(r: &str) -> Option<MergeRange> {
    let (start, end) = r.split_once(':')?;
    let (first_row, first_col) = parse_cell_ref(start)?;
    let (last_row, last_col) = parse_cell_ref(end)?;
    Some(MergeRange {
        first_row,
        last_row,
        first_col,
        last_col,
    })
}

/// "B5" -> (4, 1).
fn parse_cell_ref(r: &str) -> Option<(u32, u16)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .chars()
        .fold(0u32, |acc, ch| acc * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, u16::try_from(col.checked_sub(1)?).ok()?))
}

// =============================================================================
// Entry point
// =============================================================================

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Worksheet part for a sheet name, via workbook.xml and its relationships.
fn resolve_worksheet_path(workbook_xml: &str, rels_xml: &str, sheet_name: &str) -> Option<String> {
    let mut rid = None;
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut id = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"r:id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if name.as_deref() == Some(sheet_name) {
                    rid = id;
                    break;
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    let rid = rid?;

    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        b"Target" => target = Some(String::from_utf8_lossy(&attr.value).to_string()),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rid.as_str()) {
                    return target.map(|t| match t.strip_prefix('/') {
                        Some(absolute) => absolute.to_string(),
                        None => format!("xl/{}", t),
                    });
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    None
}

/// Formatting of the named worksheet of an .xlsx file.
pub fn read_sheet_styles(path: &Path, sheet_name: &str) -> Result<SheetStyles, String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open XLSX file for styles: {}", e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("Failed to read XLSX as ZIP for styles: {}", e))?;

    let styles = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles_xml(&xml),
        Err(_) => Vec::new(),
    };

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let ws_path = resolve_worksheet_path(&workbook_xml, &rels_xml, sheet_name)
        .ok_or_else(|| format!("Worksheet '{}' not found in XLSX", sheet_name))?;
    let formatting = parse_sheet_formatting(&read_zip_file(&mut archive, &ws_path)?);

    Ok(SheetStyles {
        cell_styles: formatting
            .cell_styles
            .into_iter()
            .filter_map(|(row, col, id)| styles.get(id).map(|s| ((row, col), s.clone())))
            .collect(),
        merges: formatting.merges,
        col_widths: formatting.col_widths.into_iter().collect(),
        row_heights: formatting.row_heights.into_iter().collect(),
    })
}
