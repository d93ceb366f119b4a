use crate::error::PayrollError;
use crate::schema::SR_NO;
use crate::table::RawTable;

/// Rows scanned in a raw source sheet.
pub const SOURCE_SCAN_ROWS: usize = 40;
/// Rows scanned when reloading the merged workbook. The merged header sits
/// one separator row below the donor's, so it can be up to two rows lower
/// than any source header.
pub const MERGED_SCAN_ROWS: usize = SOURCE_SCAN_ROWS + 2;

/// Find the header row: the first row within `scan_limit` holding a cell
/// equal to `SR.NO` (trimmed, case-insensitive).
pub fn locate_header(raw: &RawTable, scan_limit: usize) -> Result<usize, PayrollError> {
    let scanned = scan_limit.min(raw.len());
    (0..scanned)
        .find(|&idx| is_header_row(raw.row(idx)))
        .ok_or(PayrollError::HeaderNotFound { scanned })
}

/// Merged-workbook variant: falls back to row 0 when no marker is found.
pub fn locate_header_or_first(raw: &RawTable, scan_limit: usize) -> usize {
    locate_header(raw, scan_limit).unwrap_or(0)
}

fn is_header_row(row: &[crate::value::CellValue]) -> bool {
    row.iter()
        .any(|cell| cell.to_text().trim().eq_ignore_ascii_case(SR_NO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CellValue;

    fn raw_with_header_at(idx: usize) -> RawTable {
        let mut rows = vec![vec![CellValue::text("letterhead")]; idx];
        rows.push(vec![
            CellValue::Empty,
            CellValue::Empty,
            CellValue::text(" sr.no "),
            CellValue::text("EMPLOYEE NAME"),
        ]);
        rows.push(vec![CellValue::Number(1.0)]);
        RawTable::new(rows)
    }

    #[test]
    fn finds_header_after_preamble() {
        let raw = raw_with_header_at(5);
        assert_eq!(locate_header(&raw, SOURCE_SCAN_ROWS).unwrap(), 5);
        // idempotent
        assert_eq!(locate_header(&raw, SOURCE_SCAN_ROWS).unwrap(), 5);
    }

    #[test]
    fn first_match_wins() {
        let mut raw = raw_with_header_at(2);
        raw.rows.push(vec![CellValue::text("SR.NO")]);
        assert_eq!(locate_header(&raw, SOURCE_SCAN_ROWS).unwrap(), 2);
    }

    #[test]
    fn header_beyond_scan_limit_is_not_found() {
        let raw = raw_with_header_at(45);
        assert_eq!(
            locate_header(&raw, SOURCE_SCAN_ROWS),
            Err(PayrollError::HeaderNotFound { scanned: 40 })
        );
        assert_eq!(locate_header_or_first(&raw, MERGED_SCAN_ROWS), 0);
    }

    #[test]
    fn similar_tokens_do_not_match() {
        let raw = RawTable::new(vec![vec![CellValue::text("SR.NO.")], vec![CellValue::text("SR NO")]]);
        assert!(locate_header(&raw, SOURCE_SCAN_ROWS).is_err());
    }
}
