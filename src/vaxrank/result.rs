//! The assembled ranking result and its flat per-peptide view.
//!

use crate::vaxrank::{predict::AffinityKind, ranking::RankedVariant, workflows::Params};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Version of the snapshot layout of `RankedResult`.
pub const FORMAT_VERSION: &str = "1.0.0";

/// Epitopes listed per peptide in tabular exports.
pub const NUM_TOP_EPITOPES: usize = 3;

/// Patient identifier used when none is supplied.
pub const UNKNOWN_PATIENT: &str = "UNKNOWN";

/// Provenance of a ranking run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub tool_version: String,
    pub patient_id: String,
    pub alleles: Vec<String>,
    pub epitope_lengths: Vec<usize>,
    pub affinity_kind: AffinityKind,
    pub params: Params,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub final_review: Option<String>,
}

/// Ranked variants with every selected peptide and its epitopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub format_version: String,
    pub metadata: RunMetadata,
    pub variants: Vec<RankedVariant>,
}

/// One selected vaccine peptide, flattened for tabular output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow<'a> {
    pub patient_id: &'a str,
    pub variant_rank: usize,
    pub variant: String,
    pub gene: &'a str,
    pub peptide_rank: usize,
    pub peptide: &'a str,
    pub start: usize,
    pub mutation_start: usize,
    pub mutation_end: usize,
    pub score: f64,
    pub sequence_alt_reads: usize,
    pub variant_alt_reads: usize,
    pub variant_ref_reads: usize,
    pub num_epitopes: usize,
    pub top_epitopes: String,
}

impl RankedResult {
    pub fn new(metadata: RunMetadata, variants: Vec<RankedVariant>) -> Self {
        RankedResult {
            format_version: FORMAT_VERSION.to_string(),
            metadata,
            variants,
        }
    }

    pub fn num_peptides(&self) -> usize {
        self.variants.iter().map(|v| v.windows.len()).sum()
    }

    /// Rows in rank order; ranks are 1-based.
    pub fn rows(&self) -> Vec<WindowRow<'_>> {
        let mut rows = Vec::with_capacity(self.num_peptides());
        for (variant_index, ranked) in self.variants.iter().enumerate() {
            let variant_key = ranked.variant.key();
            let gene = ranked.variant.gene.as_deref().unwrap_or("");
            for (window_index, window) in ranked.windows.iter().enumerate() {
                let top_epitopes = window
                    .top_epitopes(NUM_TOP_EPITOPES)
                    .iter()
                    .map(|e| format!("{}|{}|{:.4}", e.sequence, e.allele, e.score))
                    .join(";");
                rows.push(WindowRow {
                    patient_id: &self.metadata.patient_id,
                    variant_rank: variant_index + 1,
                    variant: variant_key.clone(),
                    gene,
                    peptide_rank: window_index + 1,
                    peptide: &window.sequence,
                    start: window.start,
                    mutation_start: window.mutation_start,
                    mutation_end: window.mutation_end,
                    score: window.score,
                    sequence_alt_reads: window.num_alt_reads,
                    variant_alt_reads: ranked.num_alt_reads,
                    variant_ref_reads: ranked.num_ref_reads,
                    num_epitopes: window.epitopes.len(),
                    top_epitopes,
                });
            }
        }
        rows
    }
}
