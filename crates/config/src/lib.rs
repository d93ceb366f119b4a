// Configuration loading

pub mod settings;

pub use settings::{PdfSettings, ReportSettings, ScanSettings, Settings};
