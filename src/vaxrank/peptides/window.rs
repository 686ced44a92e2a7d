use crate::vaxrank::evidence::CodingSequence;

/// A fixed-length peptide cut from a coding sequence around its mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateWindow<'a> {
    pub source: &'a CodingSequence,
    /// Offset of the window in the source amino acid sequence.
    pub start: usize,
    pub sequence: &'a str,
    /// Mutation interval relative to the window start, clipped to the window.
    pub mutation_start: usize,
    pub mutation_end: usize,
}

/// True if `[start, end)` covers a mutated residue of `[mutation_start, mutation_end)`.
/// An empty mutation interval marks a deletion junction, which is covered only
/// when residues on both sides of it are included.
pub fn overlaps_mutation(start: usize, end: usize, mutation_start: usize, mutation_end: usize) -> bool {
    if mutation_start == mutation_end {
        start < mutation_start && end > mutation_start
    } else {
        start < mutation_end && end > mutation_start
    }
}

/// Generates the candidate windows of length `length` around a sequence's mutation.
///
/// Window starts run from `mutation_start - (length - 1)` up to
/// `mutation_start + padding`; windows that would run off either end of the
/// sequence or miss the mutation are discarded. Windows are returned in
/// increasing order of start.
pub fn enumerate_windows(
    sequence: &CodingSequence,
    length: usize,
    padding: usize,
) -> Vec<CandidateWindow<'_>> {
    let amino_acids = &sequence.amino_acids;
    if length == 0 || amino_acids.len() < length {
        return Vec::new();
    }

    let first_start = sequence.mutation_start.saturating_sub(length - 1);
    let last_start = std::cmp::min(
        sequence.mutation_start.saturating_add(padding),
        amino_acids.len() - length,
    );

    (first_start..=last_start)
        .filter(|&start| {
            overlaps_mutation(
                start,
                start + length,
                sequence.mutation_start,
                sequence.mutation_end,
            )
        })
        .map(|start| {
            let end = start + length;
            CandidateWindow {
                source: sequence,
                start,
                sequence: &amino_acids[start..end],
                mutation_start: sequence.mutation_start.clamp(start, end) - start,
                mutation_end: sequence.mutation_end.clamp(start, end) - start,
            }
        })
        .collect()
}
