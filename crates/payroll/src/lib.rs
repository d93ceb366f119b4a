//! `taxsheet-payroll` - payroll consolidation and income-tax statement engine.
//!
//! Pure engine crate: receives raw sheet cells, returns merged month tables,
//! per-employee statements and summary totals. No file or workbook IO.

pub mod error;
pub mod header;
pub mod merge;
pub mod pivot;
pub mod projection;
pub mod schema;
pub mod statement;
pub mod summary;
pub mod table;
pub mod totals;
pub mod value;

pub use error::{PayrollError, Warning, WarningScope};
pub use header::locate_header;
pub use merge::{MonthGroups, MonthTable};
pub use pivot::{partition_employees, EmployeeRecords, EmployeeSheet};
pub use schema::Schema;
pub use statement::{ReportLabels, Statement};
pub use summary::{build_summary, Summary};
pub use table::{RawTable, Record, Table};
pub use totals::Totals;
pub use value::CellValue;
