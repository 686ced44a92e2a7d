use crate::utils::Result;
use crate::vaxrank::ranking::WindowScoring;
use serde::{Deserialize, Serialize};

/// Settings for one ranking run, shared read-only by all variant pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub vaccine_peptide_length: usize,
    pub padding_around_mutation: usize,
    pub max_vaccine_peptides_per_mutation: usize,
    pub max_mutations_in_report: usize,
    pub min_reads_supporting_cdna_sequence: usize,
    pub min_epitope_score: f64,
    pub window_scoring: WindowScoring,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            vaccine_peptide_length: 25,
            padding_around_mutation: 0,
            max_vaccine_peptides_per_mutation: 1,
            max_mutations_in_report: 10,
            min_reads_supporting_cdna_sequence: 2,
            min_epitope_score: 0.0001,
            window_scoring: WindowScoring::ReadFraction,
        }
    }
}

impl Params {
    /// Rejects settings that could never produce a ranked peptide with the
    /// given predictor epitope lengths.
    pub fn validate(&self, epitope_lengths: &[usize]) -> Result<()> {
        if self.vaccine_peptide_length == 0 {
            return Err("Vaccine peptide length must be positive".to_string());
        }
        let shortest_epitope = epitope_lengths
            .iter()
            .min()
            .ok_or_else(|| "Binding predictor supports no epitope lengths".to_string())?;
        if self.vaccine_peptide_length < *shortest_epitope {
            return Err(format!(
                "Vaccine peptide length {} is shorter than the shortest epitope length {}",
                self.vaccine_peptide_length, shortest_epitope
            ));
        }
        if self.min_reads_supporting_cdna_sequence == 0 {
            return Err("Minimum reads supporting a coding sequence must be at least 1".to_string());
        }
        if self.max_vaccine_peptides_per_mutation == 0 {
            return Err("Maximum vaccine peptides per mutation must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_epitope_score) {
            return Err(format!(
                "Minimum epitope score must be between 0.0 and 1.0, got: {}",
                self.min_epitope_score
            ));
        }
        Ok(())
    }
}
