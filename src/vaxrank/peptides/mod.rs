mod epitope;
mod window;

pub use epitope::{mutant_epitopes, score_epitopes, EpitopeSlice, ScoredEpitope};
pub use window::{enumerate_windows, overlaps_mutation, CandidateWindow};
