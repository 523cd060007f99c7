pub mod sqlite;

pub use sqlite::{ReportSummary, Storage};
