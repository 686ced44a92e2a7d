use crate::vaxrank::peptides::{CandidateWindow, ScoredEpitope};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashSet};

/// A candidate vaccine peptide with its aggregate score and the epitopes behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredWindow {
    pub sequence: String,
    /// Offset of the peptide in its coding sequence.
    pub start: usize,
    /// Mutated residues within the peptide.
    pub mutation_start: usize,
    pub mutation_end: usize,
    pub score: f64,
    /// Alt reads supporting the coding sequence the peptide was cut from.
    pub num_alt_reads: usize,
    pub num_ref_reads: usize,
    pub reading_frame: u8,
    pub coding_sequence: String,
    pub epitopes: Vec<ScoredEpitope>,
}

impl ScoredWindow {
    pub fn new(window: &CandidateWindow, score: f64, epitopes: Vec<ScoredEpitope>) -> Self {
        ScoredWindow {
            sequence: window.sequence.to_string(),
            start: window.start,
            mutation_start: window.mutation_start,
            mutation_end: window.mutation_end,
            score,
            num_alt_reads: window.source.num_alt_reads,
            num_ref_reads: window.source.num_ref_reads,
            reading_frame: window.source.reading_frame,
            coding_sequence: window.source.amino_acids.clone(),
            epitopes,
        }
    }

    /// Epitopes by descending score; ties by sequence, then allele.
    pub fn top_epitopes(&self, n: usize) -> Vec<&ScoredEpitope> {
        let mut epitopes: Vec<&ScoredEpitope> = self.epitopes.iter().collect();
        epitopes.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.sequence.cmp(&b.sequence))
                .then_with(|| a.allele.cmp(&b.allele))
        });
        epitopes.truncate(n);
        epitopes
    }
}

/// Ranking order: score descending, then peptide sequence, then read support
/// descending, then start offset.
pub fn compare_windows(a: &ScoredWindow, b: &ScoredWindow) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.sequence.cmp(&b.sequence))
        .then_with(|| b.num_alt_reads.cmp(&a.num_alt_reads))
        .then_with(|| a.start.cmp(&b.start))
}

/// Picks a variant's best `max_windows` peptides.
///
/// Windows without epitopes are dropped. A peptide reachable from several
/// coding sequences is kept once, at its best rank.
pub fn rank_windows(mut windows: Vec<ScoredWindow>, max_windows: usize) -> Vec<ScoredWindow> {
    windows.retain(|w| !w.epitopes.is_empty());
    windows.sort_by(compare_windows);

    let mut seen = HashSet::new();
    windows.retain(|w| seen.insert(w.sequence.clone()));
    windows.truncate(max_windows);
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epitope(sequence: &str, allele: &str, score: f64) -> ScoredEpitope {
        ScoredEpitope {
            sequence: sequence.to_string(),
            offset: 0,
            allele: allele.to_string(),
            affinity: 100.0,
            score,
        }
    }

    fn window(sequence: &str, start: usize, score: f64, reads: usize, num_epitopes: usize) -> ScoredWindow {
        ScoredWindow {
            sequence: sequence.to_string(),
            start,
            mutation_start: 0,
            mutation_end: 1,
            score,
            num_alt_reads: reads,
            num_ref_reads: 0,
            reading_frame: 0,
            coding_sequence: sequence.to_string(),
            epitopes: (0..num_epitopes)
                .map(|_| epitope(sequence, "HLA-A*02:01", 0.5))
                .collect(),
        }
    }

    #[test]
    fn test_rank_windows_descending() {
        let windows = vec![
            window("AAAA", 0, 0.2, 5, 1),
            window("CCCC", 1, 0.9, 5, 1),
            window("DDDD", 2, 0.5, 5, 1),
        ];
        let ranked = rank_windows(windows, 10);
        let scores: Vec<f64> = ranked.iter().map(|w| w.score).collect();
        assert_eq!(scores, vec![0.9, 0.5, 0.2]);
    }

    #[test]
    fn test_rank_windows_drops_windows_without_epitopes() {
        let windows = vec![window("AAAA", 0, 0.0, 5, 0), window("CCCC", 1, 0.1, 5, 1)];
        let ranked = rank_windows(windows, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].sequence, "CCCC");
    }

    #[test]
    fn test_rank_windows_truncates() {
        let windows = vec![
            window("AAAA", 0, 0.2, 5, 1),
            window("CCCC", 1, 0.9, 5, 1),
            window("DDDD", 2, 0.5, 5, 1),
        ];
        let ranked = rank_windows(windows, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].sequence, "CCCC");
        assert!(rank_windows(Vec::new(), 3).is_empty());
    }

    #[test]
    fn test_tie_breaks() {
        let windows = vec![
            window("DDDD", 0, 0.5, 5, 1),
            window("AAAA", 3, 0.5, 5, 1),
            window("AAAA", 1, 0.5, 9, 1),
            window("AAAA", 2, 0.5, 5, 1),
        ];
        let mut sorted = windows.clone();
        sorted.sort_by(compare_windows);
        let order: Vec<(&str, usize)> = sorted.iter().map(|w| (w.sequence.as_str(), w.start)).collect();
        assert_eq!(order, vec![("AAAA", 1), ("AAAA", 2), ("AAAA", 3), ("DDDD", 0)]);

        let ranked = rank_windows(windows, 10);
        let order: Vec<(&str, usize)> = ranked.iter().map(|w| (w.sequence.as_str(), w.start)).collect();
        assert_eq!(order, vec![("AAAA", 1), ("DDDD", 0)]);
    }

    #[test]
    fn test_top_epitopes() {
        let mut w = window("AAAA", 0, 1.0, 5, 0);
        w.epitopes = vec![
            epitope("AAA", "HLA-B*07:02", 0.4),
            epitope("AAA", "HLA-A*02:01", 0.4),
            epitope("AAAA", "HLA-A*02:01", 0.9),
            epitope("AA", "HLA-A*02:01", 0.1),
        ];
        let top: Vec<(&str, &str)> = w
            .top_epitopes(3)
            .iter()
            .map(|e| (e.sequence.as_str(), e.allele.as_str()))
            .collect();
        assert_eq!(
            top,
            vec![
                ("AAAA", "HLA-A*02:01"),
                ("AAA", "HLA-A*02:01"),
                ("AAA", "HLA-B*07:02")
            ]
        );
    }
}
