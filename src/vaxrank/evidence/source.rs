//! Providers of per-variant read evidence.
//!

use super::observation::CodingSequenceObservation;
use crate::utils::{open_text_reader, Result};
use crate::vaxrank::variant::Variant;
use std::{
    collections::HashMap,
    io::BufRead,
    path::Path,
    sync::Mutex,
};

/// One-pass stream of observations for a variant. `Err` items are malformed
/// observations that the consumer skips.
pub type ObservationStream<'a> = Box<dyn Iterator<Item = Result<CodingSequenceObservation>> + Send + 'a>;

/// Source of read-derived coding sequence evidence.
///
/// The stream returned for a variant is consumed exactly once and cannot be
/// replayed. An `Err` from `observations` means the source itself failed.
pub trait ReadEvidenceSource: Sync {
    fn observations(&self, variant: &Variant) -> Result<ObservationStream<'_>>;
}

const EXPECTED_FIELD_COUNT: usize = 8;

/// Evidence loaded from a tab-separated table with the columns
/// `variant allele type sequence frame mutation_start mutation_end reads`.
///
/// Lines are grouped by variant at load time and parsed lazily when the
/// variant's stream is drained. Each variant's lines are handed out once.
pub struct EvidenceTable {
    lines_by_variant: Mutex<HashMap<String, Vec<(usize, String)>>>,
}

impl EvidenceTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        log::info!("Loading read evidence from {}", path.display());
        let reader = open_text_reader(path)?;
        Self::from_reader(reader)
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines_by_variant: HashMap<String, Vec<(usize, String)>> = HashMap::new();
        let mut num_lines = 0;
        for (line_number, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| format!("Error reading evidence line {}: {}", line_number + 1, e))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let key = line.split('\t').next().unwrap_or_default().to_string();
            lines_by_variant
                .entry(key)
                .or_default()
                .push((line_number + 1, line));
            num_lines += 1;
        }
        log::debug!(
            "Loaded {} evidence lines for {} variants",
            num_lines,
            lines_by_variant.len()
        );
        Ok(EvidenceTable {
            lines_by_variant: Mutex::new(lines_by_variant),
        })
    }

    /// Number of variants whose evidence has not been consumed yet.
    pub fn num_pending(&self) -> usize {
        self.lines_by_variant
            .lock()
            .map(|lines| lines.len())
            .unwrap_or(0)
    }
}

impl ReadEvidenceSource for EvidenceTable {
    fn observations(&self, variant: &Variant) -> Result<ObservationStream<'_>> {
        let lines = self
            .lines_by_variant
            .lock()
            .map_err(|_| "Evidence table lock poisoned".to_string())?
            .remove(&variant.key())
            .unwrap_or_default();
        Ok(Box::new(lines.into_iter().map(|(line_number, line)| {
            parse_observation(&line).map_err(|e| format!("Evidence line {}: {}", line_number, e))
        })))
    }
}

fn parse_observation(line: &str) -> Result<CodingSequenceObservation> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != EXPECTED_FIELD_COUNT {
        return Err(format!(
            "Expected {} tab-separated fields, found {}",
            EXPECTED_FIELD_COUNT,
            fields.len()
        ));
    }

    let parse_usize = |name: &str, value: &str| {
        value
            .parse::<usize>()
            .map_err(|_| format!("Invalid {}: '{}'", name, value))
    };

    Ok(CodingSequenceObservation {
        allele: fields[1].parse()?,
        kind: fields[2].parse()?,
        sequence: fields[3].to_string(),
        reading_frame: fields[4]
            .parse()
            .map_err(|_| format!("Invalid reading frame: '{}'", fields[4]))?,
        mutation_start: parse_usize("mutation start", fields[5])?,
        mutation_end: parse_usize("mutation end", fields[6])?,
        read_count: parse_usize("read count", fields[7])?,
    })
}
