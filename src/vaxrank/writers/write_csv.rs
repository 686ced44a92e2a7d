//! Defines the `CsvWriter` struct for exporting ranked vaccine peptides as CSV.
//!

use crate::utils::Result;
use crate::vaxrank::result::RankedResult;
use std::{fs::File, io::Write};

/// Writes one CSV row per selected vaccine peptide.
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvWriter<File> {
    /// Creates a writer for the CSV file at `output_path`, truncating it.
    pub fn new(output_path: &str) -> Result<CsvWriter<File>> {
        let writer = csv::Writer::from_path(output_path)
            .map_err(|e| format!("Invalid CSV output path {}: {}", output_path, e))?;
        Ok(CsvWriter { writer })
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn from_writer(writer: W) -> CsvWriter<W> {
        CsvWriter {
            writer: csv::Writer::from_writer(writer),
        }
    }

    /// Writes the header and every peptide row of `result` in rank order.
    ///
    /// A result without peptides still produces the header line.
    pub fn write(&mut self, result: &RankedResult) -> Result<()> {
        let rows = result.rows();
        if rows.is_empty() {
            self.writer
                .write_record(HEADER)
                .map_err(|e| format!("Error writing CSV header: {}", e))?;
        }
        for row in &rows {
            self.writer
                .serialize(row)
                .map_err(|e| format!("Error writing CSV row for {}: {}", row.peptide, e))?;
        }
        self.writer
            .flush()
            .map_err(|e| format!("Error flushing CSV output: {}", e))
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| format!("Error finishing CSV output: {}", e))
    }
}

/// Column names, matching the field names of `WindowRow`.
const HEADER: [&str; 15] = [
    "patient_id",
    "variant_rank",
    "variant",
    "gene",
    "peptide_rank",
    "peptide",
    "start",
    "mutation_start",
    "mutation_end",
    "score",
    "sequence_alt_reads",
    "variant_alt_reads",
    "variant_ref_reads",
    "num_epitopes",
    "top_epitopes",
];
