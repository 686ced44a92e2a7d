//! Window and variant ranking.
//!

mod scoring;
mod variants;
mod windows;

pub use scoring::{ReadSupport, WindowScoring};
pub use variants::{rank_variants, RankedVariant};
pub use windows::{compare_windows, rank_windows, ScoredWindow};
