use crate::cli::{RankArgs, FULL_VERSION};
use crate::utils::{load_alleles, Result};
use crate::vaxrank::{
    evidence::EvidenceTable,
    predict::{normalize_epitope_lengths, AffinityTable, BindingPredictor, ExternalPredictor},
    result::{RankedResult, RunMetadata, UNKNOWN_PATIENT},
    variant::load_variants,
    workflows::{rank_vaccine_peptides, Params},
    writers::{load_snapshot, save_snapshot, CsvWriter},
};
use rayon::ThreadPoolBuilder;
use std::path::{Path, PathBuf};

pub fn rank(args: RankArgs) -> Result<()> {
    let result = match &args.input_snapshot {
        Some(path) => restore_ranking(path, &args)?,
        None => compute_ranking(&args)?,
    };

    log::info!(
        "Selected {} vaccine peptides for {} variants",
        result.num_peptides(),
        result.variants.len()
    );

    if let Some(path) = &args.output_csv {
        let mut writer = CsvWriter::new(path)?;
        writer.write(&result)?;
        log::info!("Wrote ranked peptides to {}", path);
    }
    if let Some(path) = &args.output_snapshot {
        save_snapshot(Path::new(path), &result)?;
        log::info!("Saved ranking snapshot to {}", path);
    }
    Ok(())
}

fn compute_ranking(args: &RankArgs) -> Result<RankedResult> {
    let vcf_path = required_path(&args.vcf_path, "--vcf")?;
    let evidence_path = required_path(&args.evidence_path, "--evidence")?;

    let alleles = load_alleles(&args.mhc_alleles, args.mhc_alleles_file.as_deref())?;
    let epitope_lengths = normalize_epitope_lengths(args.epitope_lengths.clone())?;
    let params = Params {
        vaccine_peptide_length: args.vaccine_peptide_length,
        padding_around_mutation: args.padding_around_mutation,
        max_vaccine_peptides_per_mutation: args.max_vaccine_peptides_per_mutation,
        max_mutations_in_report: args.max_mutations_in_report,
        min_reads_supporting_cdna_sequence: args.min_reads_supporting_cdna_sequence,
        min_epitope_score: args.min_epitope_score,
        window_scoring: args.window_scoring,
    };
    params.validate(&epitope_lengths)?;

    let predictor = create_predictor(args, epitope_lengths.clone())?;
    let variants = load_variants(vcf_path)?;
    let evidence = EvidenceTable::from_path(evidence_path)?;

    log::debug!(
        "Initializing thread pool with {} threads...",
        args.num_threads
    );
    let pool = initialize_thread_pool(args.num_threads)?;
    let ranked = pool.install(|| {
        rank_vaccine_peptides(&variants, &evidence, predictor.as_ref(), &alleles, &params)
    })?;

    let pending = evidence.num_pending();
    if pending > 0 {
        log::debug!("Evidence for {} variants not in the VCF was ignored", pending);
    }

    let mut metadata = RunMetadata {
        tool_version: FULL_VERSION.to_string(),
        patient_id: UNKNOWN_PATIENT.to_string(),
        alleles,
        epitope_lengths,
        affinity_kind: args.affinity_kind,
        params,
        reviewers: Vec::new(),
        final_review: None,
    };
    update_report_metadata(&mut metadata, args);
    if args.patient_id.is_none() {
        log::warn!("No patient ID specified, reporting as {}", UNKNOWN_PATIENT);
    }

    Ok(RankedResult::new(metadata, ranked))
}

/// Loads a saved ranking for re-export. Report fields come from the snapshot;
/// any given on the command line are ignored.
fn restore_ranking(path: &Path, args: &RankArgs) -> Result<RankedResult> {
    log::info!("Restoring ranking from {}", path.display());
    let result = load_snapshot(path)?;
    if args.patient_id.is_some() || !args.reviewed_by.is_empty() || args.final_review.is_some() {
        log::warn!(
            "Ignoring report options: using patient and review fields saved in {}",
            path.display()
        );
    }
    Ok(result)
}

fn update_report_metadata(metadata: &mut RunMetadata, args: &RankArgs) {
    if let Some(patient_id) = &args.patient_id {
        metadata.patient_id = patient_id.clone();
    }
    if !args.reviewed_by.is_empty() {
        metadata.reviewers = args.reviewed_by.clone();
    }
    if args.final_review.is_some() {
        metadata.final_review = args.final_review.clone();
    }
}

fn create_predictor(args: &RankArgs, epitope_lengths: Vec<usize>) -> Result<Box<dyn BindingPredictor>> {
    match (&args.predictions_path, &args.predictor_cmd) {
        (Some(path), _) => Ok(Box::new(AffinityTable::from_path(
            path,
            args.affinity_kind,
            epitope_lengths,
        )?)),
        (None, Some(program)) => {
            log::info!("Using external binding predictor {}", program.display());
            Ok(Box::new(ExternalPredictor::new(
                program.clone(),
                args.affinity_kind,
                epitope_lengths,
                args.predictor_retries,
            )))
        }
        (None, None) => Err("A binding predictor is required: use --predictions or --predictor-cmd".into()),
    }
}

fn required_path<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .ok_or_else(|| format!("{} is required unless --input-snapshot is given", flag))
}

fn initialize_thread_pool(num_threads: usize) -> Result<rayon::ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(|i| format!("vaxrank-{}", i))
        .build()
        .map_err(|e| format!("Failed to initialize thread pool: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use crate::vaxrank::result::tests::sample_result;
    use clap::Parser;

    #[test]
    fn test_restore_keeps_saved_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = dir.path().join("result.json");
        let saved = sample_result();
        save_snapshot(&snapshot, &saved).unwrap();

        let snapshot_arg = snapshot.to_str().unwrap();
        let cli = Cli::try_parse_from([
            "vaxrank",
            "rank",
            "--input-snapshot",
            snapshot_arg,
            "--output-csv",
            "out.csv",
            "--output-patient-id",
            "patient-9",
            "--output-reviewed-by",
            "reviewer-b,reviewer-c",
        ])
        .unwrap();
        let Command::Rank(args) = cli.command else {
            panic!("expected rank subcommand");
        };

        let restored = restore_ranking(&snapshot, &args).unwrap();
        assert_eq!(restored.metadata.patient_id, "patient-7");
        assert_eq!(restored.metadata.reviewers, vec!["reviewer-a"]);
        assert_eq!(restored, saved);
    }
}
