// Workbook I/O: source reading, style donor extraction and the three
// generated workbooks (merged monthly, per-employee statement, summary).

pub mod biff;
pub mod cells;
pub mod donor;
pub mod merged;
pub mod source;
pub mod statement;
pub mod summary;
pub mod xlsx_styles;

pub use donor::{load_donor, StyleDonor};
pub use merged::{reload_merged, write_merged_workbook};
pub use source::{load_source, read_first_sheet};
pub use statement::write_statement;
pub use summary::write_summary;
