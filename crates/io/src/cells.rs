// Shared rust_xlsxwriter helpers for the three workbooks this crate writes.

use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Worksheet};
use taxsheet_payroll::CellValue;

use crate::donor::{CellStyle, HAlign};

/// Format carrying a donor cell's font, alignment, wrap and fill.
pub fn donor_format(style: &CellStyle) -> Format {
    let mut format = Format::new()
        .set_font_name(&style.font.name)
        .set_font_size(style.font.print_size());
    if style.font.bold {
        format = format.set_bold();
    }
    if style.font.italic {
        format = format.set_italic();
    }
    format = match style.align {
        HAlign::General => format,
        HAlign::Left => format.set_align(FormatAlign::Left),
        HAlign::Center => format.set_align(FormatAlign::Center),
        HAlign::Right => format.set_align(FormatAlign::Right),
    };
    if style.wrap {
        format = format.set_text_wrap();
    }
    if let Some(rgb) = style.fill {
        format = format.set_background_color(Color::RGB(rgb));
    }
    format
}

pub fn bordered() -> Format {
    Format::new().set_border(FormatBorder::Thin)
}

/// Numbers as numbers, text as text, everything else as a formatted blank.
pub fn write_value(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    format: &Format,
) -> Result<(), String> {
    let written = match value {
        CellValue::Number(n) if n.is_finite() => worksheet.write_number_with_format(row, col, *n, format),
        CellValue::Text(s) if !s.is_empty() => worksheet.write_string_with_format(row, col, s, format),
        _ => worksheet.write_blank(row, col, format),
    };
    written
        .map(|_| ())
        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}

/// Display width of a value in character units.
pub fn display_len(value: &CellValue) -> usize {
    match value {
        CellValue::Empty => 0,
        other => other.to_text().chars().count(),
    }
}
