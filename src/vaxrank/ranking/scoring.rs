use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Read support behind a window: reads for its coding sequence and for all
/// admitted sequences of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSupport {
    pub sequence_reads: usize,
    pub variant_reads: usize,
}

/// Combination function turning epitope scores and read support into a window score.
///
/// Every variant computes `weight(reads) * sum(epitope scores)`:
/// * `ReadFraction`: weight is the fraction of the variant's admitted alt reads
///   that support the window's coding sequence.
/// * `SqrtReads`: weight is the square root of the coding sequence's alt reads.
///
/// Both weights are non-decreasing in the sequence's read count, and the sum
/// is non-decreasing in every epitope score and in the number of epitopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowScoring {
    ReadFraction,
    SqrtReads,
}

impl FromStr for WindowScoring {
    type Err = &'static str;
    fn from_str(scoring: &str) -> Result<Self, Self::Err> {
        match scoring {
            "read-fraction" => Ok(WindowScoring::ReadFraction),
            "sqrt-reads" => Ok(WindowScoring::SqrtReads),
            _ => Err("Invalid window scoring. Options are: read-fraction, sqrt-reads"),
        }
    }
}

impl WindowScoring {
    pub fn read_weight(&self, support: ReadSupport) -> f64 {
        match self {
            WindowScoring::ReadFraction => {
                if support.variant_reads == 0 {
                    0.0
                } else {
                    support.sequence_reads as f64 / support.variant_reads as f64
                }
            }
            WindowScoring::SqrtReads => (support.sequence_reads as f64).sqrt(),
        }
    }

    pub fn score<I>(&self, epitope_scores: I, support: ReadSupport) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        let epitope_sum: f64 = epitope_scores.into_iter().sum();
        self.read_weight(support) * epitope_sum
    }
}
