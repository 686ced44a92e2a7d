//! MHC binding predictors and score normalization.
//!

mod external;
mod normalize;
mod table;

pub use external::ExternalPredictor;
pub use normalize::{logistic_ic50_score, AffinityKind};
pub use table::AffinityTable;

use crate::utils::Result;
use std::collections::HashMap;

/// A raw binding value for one (peptide, allele) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPrediction {
    pub peptide: String,
    pub allele: String,
    pub value: f64,
}

/// An MHC binding predictor queried in batches.
pub trait BindingPredictor: Sync {
    /// Peptide lengths the predictor accepts, ascending.
    fn epitope_lengths(&self) -> &[usize];

    /// Units of the values returned by `predict`.
    fn affinity_kind(&self) -> AffinityKind;

    /// Predicts every peptide against every allele.
    fn predict(&self, peptides: &[String], alleles: &[String]) -> Result<Vec<BindingPrediction>>;
}

/// Raw predictions keyed by (peptide, allele).
pub type PredictionLookup = HashMap<(String, String), f64>;

/// Runs one batched prediction and checks that every requested pair was answered.
pub fn predict_all(
    predictor: &dyn BindingPredictor,
    peptides: &[String],
    alleles: &[String],
) -> Result<PredictionLookup> {
    if peptides.is_empty() {
        return Ok(PredictionLookup::new());
    }
    let predictions = predictor.predict(peptides, alleles)?;
    let lookup: PredictionLookup = predictions
        .into_iter()
        .map(|p| ((p.peptide, p.allele), p.value))
        .collect();

    for peptide in peptides {
        for allele in alleles {
            if !lookup.contains_key(&(peptide.clone(), allele.clone())) {
                return Err(format!(
                    "Binding predictor returned no prediction for {} with {}",
                    peptide, allele
                ));
            }
        }
    }
    Ok(lookup)
}

/// Sorts and deduplicates configured epitope lengths, rejecting an empty set
/// or a zero length.
pub fn normalize_epitope_lengths(mut lengths: Vec<usize>) -> Result<Vec<usize>> {
    if lengths.is_empty() {
        return Err("No epitope lengths specified".to_string());
    }
    if lengths.contains(&0) {
        return Err("Epitope lengths must be positive".to_string());
    }
    lengths.sort_unstable();
    lengths.dedup();
    Ok(lengths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_epitope_lengths() {
        assert_eq!(normalize_epitope_lengths(vec![10, 8, 9, 9]).unwrap(), vec![8, 9, 10]);
        assert!(normalize_epitope_lengths(Vec::new()).is_err());
        assert!(normalize_epitope_lengths(vec![0, 9]).is_err());
    }

    #[test]
    fn test_predict_all_detects_missing_pairs() {
        let table = AffinityTable::from_entries(
            vec![("SIINFEKL".to_string(), "HLA-A*02:01".to_string(), 20.0)],
            AffinityKind::Ic50,
            vec![8],
        )
        .unwrap();
        let alleles = vec!["HLA-A*02:01".to_string(), "HLA-B*07:02".to_string()];
        let peptides = vec!["SIINFEKL".to_string()];
        let err = predict_all(&table, &peptides, &alleles).unwrap_err();
        assert!(err.contains("SIINFEKL"));

        let lookup = predict_all(&table, &peptides, &alleles[..1]).unwrap();
        assert_eq!(
            lookup[&("SIINFEKL".to_string(), "HLA-A*02:01".to_string())],
            20.0
        );
    }

    #[test]
    fn test_predict_all_skips_empty_batch() {
        let table = AffinityTable::from_entries(Vec::new(), AffinityKind::Ic50, vec![8]).unwrap();
        let alleles = vec!["HLA-A*02:01".to_string()];
        assert!(predict_all(&table, &[], &alleles).unwrap().is_empty());
    }
}
