//! End-to-end ranking of vaccine peptides across variants.
//!

mod params;
mod pipeline;

pub use params::Params;
pub use pipeline::{epitope_queries, rank_vaccine_peptides, rank_variant};
