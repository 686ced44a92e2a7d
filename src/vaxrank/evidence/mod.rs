//! Read evidence: observations, providers and per-variant aggregation.
//!

mod aggregate;
mod observation;
mod source;

pub use aggregate::{aggregate_sequences, CodingSequence, VariantSequences};
pub use observation::{
    translate, AlleleSupport, CodingSequenceObservation, SequenceKind, TranslatedSequence,
};
pub use source::{EvidenceTable, ObservationStream, ReadEvidenceSource};
