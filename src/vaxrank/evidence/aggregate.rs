use super::observation::{AlleleSupport, CodingSequenceObservation, TranslatedSequence};
use crate::utils::Result;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{hash_map::Entry, HashMap};

/// A distinct mutant protein sequence reconstructed from reads, with the read
/// support accumulated over all observations of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingSequence {
    pub amino_acids: String,
    pub cdna: Option<String>,
    pub reading_frame: u8,
    /// Half-open residue interval of the mutation; empty for a deletion junction.
    pub mutation_start: usize,
    pub mutation_end: usize,
    pub num_alt_reads: usize,
    /// Reads supporting the reference allele at the same variant.
    pub num_ref_reads: usize,
}

/// Coding sequences that passed the read filter, with variant-level read totals.
#[derive(Debug, Clone, Default)]
pub struct VariantSequences {
    pub sequences: Vec<CodingSequence>,
    /// Alt reads summed over the admitted sequences.
    pub num_alt_reads: usize,
    pub num_ref_reads: usize,
}

impl VariantSequences {
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

/// Collapses a variant's observations into distinct coding sequences.
///
/// Alt observations are merged by amino acid sequence and reading frame with
/// their read counts summed; ref observations only add to the reference
/// count. Malformed observations are logged and skipped. Sequences with fewer
/// than `min_reads` supporting reads are dropped.
pub fn aggregate_sequences<I>(variant_key: &str, observations: I, min_reads: usize) -> VariantSequences
where
    I: IntoIterator<Item = Result<CodingSequenceObservation>>,
{
    let mut merged: HashMap<(String, u8), (TranslatedSequence, usize)> = HashMap::new();
    let mut num_ref_reads = 0;

    for observation in observations {
        let observation = match observation {
            Ok(observation) => observation,
            Err(e) => {
                log::warn!("{}: skipping malformed observation: {}", variant_key, e);
                continue;
            }
        };

        if observation.allele == AlleleSupport::Ref {
            num_ref_reads += observation.read_count;
            continue;
        }

        let translated = match observation.translate() {
            Ok(translated) => translated,
            Err(e) => {
                log::warn!("{}: skipping observation: {}", variant_key, e);
                continue;
            }
        };

        let key = (translated.amino_acids.clone(), translated.reading_frame);
        match merged.entry(key) {
            Entry::Occupied(mut entry) => {
                let (existing, count) = entry.get_mut();
                if (existing.mutation_start, existing.mutation_end)
                    != (translated.mutation_start, translated.mutation_end)
                {
                    log::warn!(
                        "{}: skipping observation with conflicting mutation interval {}-{} (expected {}-{})",
                        variant_key,
                        translated.mutation_start,
                        translated.mutation_end,
                        existing.mutation_start,
                        existing.mutation_end
                    );
                    continue;
                }
                if existing.cdna.is_none() {
                    existing.cdna = translated.cdna;
                }
                *count += observation.read_count;
            }
            Entry::Vacant(entry) => {
                entry.insert((translated, observation.read_count));
            }
        }
    }

    let num_observed = merged.len();
    let sequences = merged
        .into_values()
        .filter(|(_, count)| *count >= min_reads)
        .map(|(translated, count)| CodingSequence {
            amino_acids: translated.amino_acids,
            cdna: translated.cdna,
            reading_frame: translated.reading_frame,
            mutation_start: translated.mutation_start,
            mutation_end: translated.mutation_end,
            num_alt_reads: count,
            num_ref_reads,
        })
        .sorted_by(|a, b| {
            b.num_alt_reads
                .cmp(&a.num_alt_reads)
                .then_with(|| a.amino_acids.cmp(&b.amino_acids))
                .then_with(|| a.reading_frame.cmp(&b.reading_frame))
        })
        .collect_vec();

    log::debug!(
        "{}: {} of {} distinct sequences have at least {} reads",
        variant_key,
        sequences.len(),
        num_observed,
        min_reads
    );

    let num_alt_reads = sequences.iter().map(|s| s.num_alt_reads).sum();
    VariantSequences {
        sequences,
        num_alt_reads,
        num_ref_reads,
    }
}
