use super::Params;
use crate::utils::Result;
use crate::vaxrank::{
    evidence::{aggregate_sequences, ReadEvidenceSource, VariantSequences},
    peptides::{enumerate_windows, mutant_epitopes, score_epitopes, CandidateWindow},
    predict::{predict_all, BindingPredictor},
    ranking::{rank_variants, rank_windows, RankedVariant, ReadSupport, ScoredWindow},
    variant::Variant,
};
use itertools::Itertools;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Ranks vaccine peptides for every variant and orders the variants.
///
/// Variants are processed in parallel on the current rayon pool. Variants
/// without usable evidence or peptides are left out of the result. Any
/// predictor or evidence source failure aborts the whole ranking.
pub fn rank_vaccine_peptides(
    variants: &[Variant],
    evidence: &dyn ReadEvidenceSource,
    predictor: &dyn BindingPredictor,
    alleles: &[String],
    params: &Params,
) -> Result<Vec<RankedVariant>> {
    params.validate(predictor.epitope_lengths())?;

    let ranked = variants
        .par_iter()
        .map(|variant| rank_variant(variant, evidence, predictor, alleles, params))
        .collect::<Result<Vec<_>>>()?;

    let num_with_peptides = ranked.iter().filter(|v| !v.windows.is_empty()).count();
    log::info!(
        "{} of {} variants have at least one vaccine peptide",
        num_with_peptides,
        variants.len()
    );

    Ok(rank_variants(ranked, params.max_mutations_in_report))
}

/// Runs the per-variant pipeline: aggregate evidence, cut windows, score
/// epitopes with a single batched prediction, and keep the best windows.
pub fn rank_variant(
    variant: &Variant,
    evidence: &dyn ReadEvidenceSource,
    predictor: &dyn BindingPredictor,
    alleles: &[String],
    params: &Params,
) -> Result<RankedVariant> {
    let key = variant.key();
    let sequences = collect_sequences(variant, evidence, params)?;
    let windows = candidate_windows(&sequences, params);
    if windows.is_empty() {
        log::debug!("{}: no candidate vaccine peptides", key);
        return Ok(RankedVariant {
            variant: variant.clone(),
            windows: Vec::new(),
            num_alt_reads: sequences.num_alt_reads,
            num_ref_reads: sequences.num_ref_reads,
        });
    }

    let lengths = predictor.epitope_lengths();
    let peptides = candidate_epitopes(&windows, lengths);
    let predictions = predict_all(predictor, &peptides, alleles)
        .map_err(|e| format!("{}: {}", key, e))?;

    let mut scored = Vec::with_capacity(windows.len());
    for window in &windows {
        let epitopes = score_epitopes(
            window,
            lengths,
            alleles,
            &predictions,
            predictor.affinity_kind(),
            params.min_epitope_score,
        )?;
        if epitopes.is_empty() {
            continue;
        }
        let support = ReadSupport {
            sequence_reads: window.source.num_alt_reads,
            variant_reads: sequences.num_alt_reads,
        };
        let score = params
            .window_scoring
            .score(epitopes.iter().map(|e| e.score), support);
        scored.push(ScoredWindow::new(window, score, epitopes));
    }

    let num_scored = scored.len();
    let windows = rank_windows(scored, params.max_vaccine_peptides_per_mutation);
    log::debug!(
        "{}: kept {} of {} scored windows ({} candidate epitopes)",
        key,
        windows.len(),
        num_scored,
        peptides.len()
    );

    Ok(RankedVariant {
        variant: variant.clone(),
        windows,
        num_alt_reads: sequences.num_alt_reads,
        num_ref_reads: sequences.num_ref_reads,
    })
}

/// Distinct epitope peptides the ranking of this variant would send to a
/// binding predictor, sorted.
pub fn epitope_queries(
    variant: &Variant,
    evidence: &dyn ReadEvidenceSource,
    epitope_lengths: &[usize],
    params: &Params,
) -> Result<Vec<String>> {
    let sequences = collect_sequences(variant, evidence, params)?;
    let windows = candidate_windows(&sequences, params);
    Ok(candidate_epitopes(&windows, epitope_lengths))
}

fn collect_sequences(
    variant: &Variant,
    evidence: &dyn ReadEvidenceSource,
    params: &Params,
) -> Result<VariantSequences> {
    let key = variant.key();
    let observations = evidence
        .observations(variant)
        .map_err(|e| format!("{}: {}", key, e))?;
    Ok(aggregate_sequences(
        &key,
        observations,
        params.min_reads_supporting_cdna_sequence,
    ))
}

fn candidate_windows<'a>(sequences: &'a VariantSequences, params: &Params) -> Vec<CandidateWindow<'a>> {
    sequences
        .sequences
        .iter()
        .flat_map(|seq| {
            enumerate_windows(
                seq,
                params.vaccine_peptide_length,
                params.padding_around_mutation,
            )
        })
        .collect_vec()
}

fn candidate_epitopes(windows: &[CandidateWindow], lengths: &[usize]) -> Vec<String> {
    windows
        .iter()
        .flat_map(|w| mutant_epitopes(w, lengths))
        .map(|e| e.sequence)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vaxrank::evidence::EvidenceTable;
    use crate::vaxrank::predict::{AffinityKind, BindingPrediction};
    use crate::vaxrank::ranking::WindowScoring;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores each peptide with a fixed function and counts batched calls.
    struct FnPredictor<F: Fn(&str, &str) -> f64 + Sync> {
        lengths: Vec<usize>,
        score: F,
        calls: AtomicUsize,
    }

    impl<F: Fn(&str, &str) -> f64 + Sync> FnPredictor<F> {
        fn new(lengths: Vec<usize>, score: F) -> Self {
            FnPredictor {
                lengths,
                score,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl<F: Fn(&str, &str) -> f64 + Sync> BindingPredictor for FnPredictor<F> {
        fn epitope_lengths(&self) -> &[usize] {
            &self.lengths
        }

        fn affinity_kind(&self) -> AffinityKind {
            AffinityKind::Score
        }

        fn predict(&self, peptides: &[String], alleles: &[String]) -> Result<Vec<BindingPrediction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(peptides
                .iter()
                .cartesian_product(alleles.iter())
                .map(|(p, a)| BindingPrediction {
                    peptide: p.clone(),
                    allele: a.clone(),
                    value: (self.score)(p, a),
                })
                .collect())
        }
    }

    struct FailingPredictor;

    impl BindingPredictor for FailingPredictor {
        fn epitope_lengths(&self) -> &[usize] {
            &[9]
        }

        fn affinity_kind(&self) -> AffinityKind {
            AffinityKind::Ic50
        }

        fn predict(&self, _peptides: &[String], _alleles: &[String]) -> Result<Vec<BindingPrediction>> {
            Err("predictor timed out".to_string())
        }
    }

    fn alleles() -> Vec<String> {
        vec!["HLA-A*02:01".to_string()]
    }

    fn params(length: usize) -> Params {
        Params {
            vaccine_peptide_length: length,
            padding_around_mutation: 0,
            max_vaccine_peptides_per_mutation: 3,
            max_mutations_in_report: 10,
            min_reads_supporting_cdna_sequence: 5,
            min_epitope_score: 0.01,
            window_scoring: WindowScoring::ReadFraction,
        }
    }

    fn evidence(lines: &[&str]) -> EvidenceTable {
        EvidenceTable::from_reader(Cursor::new(lines.join("\n"))).unwrap()
    }

    #[test]
    fn test_single_window_scenario() {
        let variant = Variant::new("chr1", 100, "A", "T");
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t20"]);
        let predictor = FnPredictor::new(vec![9], |_: &str, _: &str| 0.8);
        let ranked = rank_variant(&variant, &evidence, &predictor, &alleles(), &params(9)).unwrap();

        assert_eq!(ranked.windows.len(), 1);
        let window = &ranked.windows[0];
        assert_eq!(window.sequence, "SIINFEKLV");
        assert_eq!(window.epitopes.len(), 1);
        assert_eq!(window.epitopes[0].sequence, "SIINFEKLV");
        assert_eq!(window.score, 0.8);
        assert_eq!(window.num_alt_reads, 20);
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_short_sequence_scenario() {
        let variants = vec![Variant::new("chr1", 100, "A", "T")];
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tSIINFEKL\t0\t4\t5\t20"]);
        let predictor = FnPredictor::new(vec![8, 9], |_: &str, _: &str| 0.8);
        let ranked =
            rank_vaccine_peptides(&variants, &evidence, &predictor, &alleles(), &params(9)).unwrap();
        assert!(ranked.is_empty());
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_low_read_support_excludes_variant() {
        let variants = vec![
            Variant::new("chr1", 100, "A", "T"),
            Variant::new("chr2", 200, "C", "G"),
        ];
        let evidence = evidence(&[
            "chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t4",
            "chr1:100:A>T\talt\tprotein\tSIINFEKLA\t0\t4\t5\t3",
            "chr2:200:C>G\talt\tprotein\tGILGFVFTL\t0\t4\t5\t6",
        ]);
        let predictor = FnPredictor::new(vec![9], |_: &str, _: &str| 0.5);
        let ranked =
            rank_vaccine_peptides(&variants, &evidence, &predictor, &alleles(), &params(9)).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].variant.contig, "chr2");
    }

    #[test]
    fn test_report_limit_scenario() {
        let variants = vec![
            Variant::new("chr1", 100, "A", "T"),
            Variant::new("chr2", 200, "C", "G"),
        ];
        let evidence = evidence(&[
            "chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t20",
            "chr2:200:C>G\talt\tprotein\tGILGFVFTL\t0\t4\t5\t20",
        ]);
        let predictor = FnPredictor::new(vec![9], |p: &str, _: &str| if p == "SIINFEKLV" { 0.4 } else { 0.9 });
        let params = Params {
            max_mutations_in_report: 1,
            ..params(9)
        };
        let ranked =
            rank_vaccine_peptides(&variants, &evidence, &predictor, &alleles(), &params).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].variant.contig, "chr2");
        assert_eq!(ranked[0].score(), 0.9);
    }

    #[test]
    fn test_read_fraction_weights_windows() {
        let variant = Variant::new("chr1", 100, "A", "T");
        let evidence = evidence(&[
            "chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t30",
            "chr1:100:A>T\talt\tprotein\tSIINWEKLV\t0\t4\t5\t10",
            "chr1:100:A>T\tref\tprotein\tSIINAEKLV\t0\t4\t5\t12",
        ]);
        let predictor = FnPredictor::new(vec![9], |_: &str, _: &str| 0.8);
        let ranked = rank_variant(&variant, &evidence, &predictor, &alleles(), &params(9)).unwrap();

        assert_eq!(ranked.num_alt_reads, 40);
        assert_eq!(ranked.num_ref_reads, 12);
        let scores: Vec<(String, f64)> = ranked
            .windows
            .iter()
            .map(|w| (w.sequence.clone(), w.score))
            .collect();
        assert_eq!(
            scores,
            vec![
                ("SIINFEKLV".to_string(), 0.8 * 0.75),
                ("SIINWEKLV".to_string(), 0.8 * 0.25)
            ]
        );
    }

    #[test]
    fn test_epitope_filter_and_window_limit() {
        let variant = Variant::new("chr1", 100, "A", "T");
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tMASIINFEKLVQRT\t0\t6\t7\t20"]);
        let predictor = FnPredictor::new(vec![8, 9], |p: &str, _: &str| {
            if p.starts_with('S') {
                0.9
            } else if p.starts_with('A') {
                0.005
            } else {
                0.3
            }
        });
        let params = Params {
            max_vaccine_peptides_per_mutation: 2,
            min_epitope_score: 0.01,
            ..params(10)
        };
        let ranked = rank_variant(&variant, &evidence, &predictor, &alleles(), &params).unwrap();

        assert_eq!(ranked.windows.len(), 2);
        assert!(ranked.windows[0].score >= ranked.windows[1].score);
        for window in &ranked.windows {
            assert!(window.epitopes.iter().all(|e| e.score >= params.min_epitope_score));
            assert!(window.epitopes.iter().all(|e| e.offset <= window.mutation_start
                && e.offset + e.sequence.len() > window.mutation_start));
        }
    }

    #[test]
    fn test_predictor_failure_is_fatal() {
        let variants = vec![Variant::new("chr1", 100, "A", "T")];
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t20"]);
        let result =
            rank_vaccine_peptides(&variants, &evidence, &FailingPredictor, &alleles(), &params(9));
        assert_eq!(
            result,
            Err("chr1:100:A>T: predictor timed out".to_string())
        );
    }

    #[test]
    fn test_invalid_config_detected_before_ranking() {
        let variants = vec![Variant::new("chr1", 100, "A", "T")];
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t20"]);
        let predictor = FnPredictor::new(vec![9, 10], |_: &str, _: &str| 0.8);
        let result = rank_vaccine_peptides(&variants, &evidence, &predictor, &alleles(), &params(8));
        assert!(result.is_err());
        assert_eq!(predictor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(evidence.num_pending(), 1);
    }

    #[test]
    fn test_epitope_queries() {
        let variant = Variant::new("chr1", 100, "A", "T");
        let evidence = evidence(&["chr1:100:A>T\talt\tprotein\tSIINFEKLV\t0\t4\t5\t20"]);
        let queries = epitope_queries(&variant, &evidence, &[8, 9], &params(9)).unwrap();
        assert_eq!(queries, vec!["IINFEKLV", "SIINFEKL", "SIINFEKLV"]);
    }

    fn random_protein(rng: &mut StdRng, len: usize) -> String {
        const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";
        (0..len)
            .map(|_| AMINO_ACIDS[rng.random_range(0..AMINO_ACIDS.len())] as char)
            .collect()
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut variants = Vec::new();
        let mut lines = Vec::new();
        for i in 0..30 {
            let variant = Variant::new("chr1", 1000 + i, "A", "T");
            for _ in 0..3 {
                let len = rng.random_range(20..40);
                let mutation = rng.random_range(0..len);
                let reads = rng.random_range(1..30);
                lines.push(format!(
                    "{}\talt\tprotein\t{}\t0\t{}\t{}\t{}",
                    variant.key(),
                    random_protein(&mut rng, len),
                    mutation,
                    mutation + 1,
                    reads
                ));
            }
            variants.push(variant);
        }
        let lines: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();

        let score = |p: &str, a: &str| {
            let h = p.bytes().chain(a.bytes()).fold(7u64, |h, b| h.wrapping_mul(31).wrapping_add(b as u64));
            (h % 1000) as f64 / 1000.0
        };
        let alleles = vec!["HLA-A*02:01".to_string(), "HLA-B*07:02".to_string()];
        let params = Params {
            max_vaccine_peptides_per_mutation: 3,
            max_mutations_in_report: 20,
            min_reads_supporting_cdna_sequence: 5,
            min_epitope_score: 0.2,
            padding_around_mutation: 2,
            ..params(15)
        };

        let run = || {
            let predictor = FnPredictor::new(vec![8, 9, 10, 11], score);
            rank_vaccine_peptides(&variants, &evidence(&lines), &predictor, &alleles, &params).unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first, second);

        assert!(first.len() <= params.max_mutations_in_report);
        assert!(first.windows(2).all(|w| w[0].score() >= w[1].score()));
        for ranked in &first {
            assert!(ranked.windows.len() <= params.max_vaccine_peptides_per_mutation);
            assert!(ranked.windows.windows(2).all(|w| w[0].score >= w[1].score));
            assert!(ranked
                .windows
                .iter()
                .flat_map(|w| w.epitopes.iter())
                .all(|e| e.score >= params.min_epitope_score));
        }
    }
}
