use crate::cli::EpitopesArgs;
use crate::utils::{load_alleles, Result};
use crate::vaxrank::{
    evidence::EvidenceTable,
    predict::normalize_epitope_lengths,
    variant::load_variants,
    workflows::{epitope_queries, Params},
};
use std::{collections::BTreeSet, io::Write};

/// Writes the (peptide, allele) pairs a ranking of the same inputs would
/// query, one tab-separated pair per line. Appending a value column yields a
/// table accepted by `rank --predictions`.
pub fn epitopes(args: EpitopesArgs) -> Result<()> {
    let alleles = load_alleles(&args.mhc_alleles, args.mhc_alleles_file.as_deref())?;
    let epitope_lengths = normalize_epitope_lengths(args.epitope_lengths)?;
    let params = Params {
        vaccine_peptide_length: args.vaccine_peptide_length,
        padding_around_mutation: args.padding_around_mutation,
        min_reads_supporting_cdna_sequence: args.min_reads_supporting_cdna_sequence,
        ..Params::default()
    };
    params.validate(&epitope_lengths)?;

    let variants = load_variants(&args.vcf_path)?;
    let evidence = EvidenceTable::from_path(&args.evidence_path)?;

    let mut peptides = BTreeSet::new();
    for variant in &variants {
        peptides.extend(epitope_queries(variant, &evidence, &epitope_lengths, &params)?);
    }
    log::info!(
        "Found {} candidate epitopes across {} variants",
        peptides.len(),
        variants.len()
    );

    let file = std::fs::File::create(&args.output_path)
        .map_err(|e| format!("Invalid output path {}: {}", args.output_path, e))?;
    write_queries(file, &peptides, &alleles)?;
    log::info!(
        "Wrote {} epitope queries to {}",
        peptides.len() * alleles.len(),
        args.output_path
    );
    Ok(())
}

fn write_queries<W: Write>(writer: W, peptides: &BTreeSet<String>, alleles: &[String]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);
    for peptide in peptides {
        for allele in alleles {
            writer
                .write_record([peptide, allele])
                .map_err(|e| format!("Error writing epitope query: {}", e))?;
        }
    }
    writer
        .flush()
        .map_err(|e| format!("Error flushing epitope queries: {}", e))
}
