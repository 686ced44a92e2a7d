use super::window::{overlaps_mutation, CandidateWindow};
use crate::utils::Result;
use crate::vaxrank::predict::{AffinityKind, PredictionLookup};
use serde::{Deserialize, Serialize};

/// A mutation-overlapping subsequence of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpitopeSlice<'a> {
    pub sequence: &'a str,
    /// Offset within the window.
    pub offset: usize,
}

/// A predicted epitope that passed the score filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEpitope {
    pub sequence: String,
    pub offset: usize,
    pub allele: String,
    /// Raw predictor value in the predictor's own units.
    pub affinity: f64,
    /// Normalized score in (0, 1], higher binding stronger.
    pub score: f64,
}

/// Enumerates every subsequence of the given lengths that overlaps the
/// window's mutation, ordered by length and then offset.
pub fn mutant_epitopes<'a>(window: &CandidateWindow<'a>, lengths: &[usize]) -> Vec<EpitopeSlice<'a>> {
    let window_len = window.sequence.len();
    let mut epitopes = Vec::new();
    for &length in lengths {
        if length == 0 || length > window_len {
            continue;
        }
        for offset in 0..=(window_len - length) {
            if overlaps_mutation(
                offset,
                offset + length,
                window.mutation_start,
                window.mutation_end,
            ) {
                epitopes.push(EpitopeSlice {
                    sequence: &window.sequence[offset..offset + length],
                    offset,
                });
            }
        }
    }
    epitopes
}

/// Scores a window's epitopes against every allele, dropping any whose
/// normalized score is not positive or falls below `min_epitope_score`.
pub fn score_epitopes(
    window: &CandidateWindow,
    lengths: &[usize],
    alleles: &[String],
    predictions: &PredictionLookup,
    kind: AffinityKind,
    min_epitope_score: f64,
) -> Result<Vec<ScoredEpitope>> {
    let mut scored = Vec::new();
    for epitope in mutant_epitopes(window, lengths) {
        for allele in alleles {
            let affinity = *predictions
                .get(&(epitope.sequence.to_string(), allele.clone()))
                .ok_or_else(|| {
                    format!(
                        "Missing binding prediction for {} with {}",
                        epitope.sequence, allele
                    )
                })?;
            let score = kind.normalize(affinity);
            if score <= 0.0 || score < min_epitope_score {
                continue;
            }
            scored.push(ScoredEpitope {
                sequence: epitope.sequence.to_string(),
                offset: epitope.offset,
                allele: allele.clone(),
                affinity,
                score,
            });
        }
    }
    Ok(scored)
}
