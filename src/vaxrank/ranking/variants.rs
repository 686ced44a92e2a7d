use super::windows::ScoredWindow;
use crate::vaxrank::variant::Variant;
use serde::{Deserialize, Serialize};

/// A variant with its selected vaccine peptides, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedVariant {
    pub variant: Variant,
    pub windows: Vec<ScoredWindow>,
    /// Alt reads over all admitted coding sequences.
    pub num_alt_reads: usize,
    pub num_ref_reads: usize,
}

impl RankedVariant {
    /// Rank key: the score of the best window, 0 if none survived.
    pub fn score(&self) -> f64 {
        self.windows.first().map_or(0.0, |w| w.score)
    }
}

/// Orders variants by their best window, drops those without windows and
/// keeps the first `max_variants`. Window order inside a variant is untouched.
pub fn rank_variants(mut variants: Vec<RankedVariant>, max_variants: usize) -> Vec<RankedVariant> {
    variants.retain(|v| !v.windows.is_empty());
    variants.sort_by(|a, b| {
        b.score()
            .total_cmp(&a.score())
            .then_with(|| a.variant.cmp(&b.variant))
    });
    variants.truncate(max_variants);
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranked(position: u32, scores: &[f64]) -> RankedVariant {
        RankedVariant {
            variant: Variant::new("chr1", position, "A", "T"),
            windows: scores
                .iter()
                .enumerate()
                .map(|(i, &score)| ScoredWindow {
                    sequence: format!("PEPTIDE{}", i),
                    start: i,
                    mutation_start: 0,
                    mutation_end: 1,
                    score,
                    num_alt_reads: 10,
                    num_ref_reads: 0,
                    reading_frame: 0,
                    coding_sequence: String::new(),
                    epitopes: Vec::new(),
                })
                .collect(),
            num_alt_reads: 10,
            num_ref_reads: 0,
        }
    }

    #[test]
    fn test_report_limit_keeps_best_variant() {
        let variants = vec![ranked(100, &[0.4]), ranked(200, &[0.9])];
        let result = rank_variants(variants, 1);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].variant.position, 200);
        assert_eq!(result[0].score(), 0.9);
    }

    #[test]
    fn test_variants_without_windows_are_excluded() {
        let variants = vec![ranked(100, &[]), ranked(200, &[0.1])];
        let result = rank_variants(variants, 10);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].variant.position, 200);
    }

    #[test]
    fn test_ties_broken_by_locus() {
        let variants = vec![ranked(300, &[0.5]), ranked(100, &[0.5]), ranked(200, &[0.7])];
        let positions: Vec<u32> = rank_variants(variants, 10)
            .iter()
            .map(|v| v.variant.position)
            .collect();
        assert_eq!(positions, vec![200, 100, 300]);
    }

    #[test]
    fn test_window_order_is_preserved() {
        let variants = vec![ranked(100, &[0.8, 0.6, 0.3])];
        let result = rank_variants(variants, 10);
        let scores: Vec<f64> = result[0].windows.iter().map(|w| w.score).collect();
        assert_eq!(scores, vec![0.8, 0.6, 0.3]);
    }
}
