pub mod write_csv;
pub mod write_snapshot;

pub use write_csv::CsvWriter;
pub use write_snapshot::{load_snapshot, save_snapshot};
