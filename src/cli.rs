use crate::utils::Result;
use crate::vaxrank::{predict::AffinityKind, ranking::WindowScoring};
use chrono::Datelike;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="vaxrank",
          version=&**FULL_VERSION,
          long_about = None,
          disable_help_subcommand = true,
          after_help = format!("Copyright (C) 2016-{}     The vaxrank developers.
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Rank vaccine peptides for somatic variants")]
    Rank(RankArgs),
    #[clap(about = "List the epitope queries a ranking would send to a binding predictor")]
    Epitopes(EpitopesArgs),
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("rank")))]
#[command(group(ArgGroup::new("outputs").required(true).multiple(true).args(["output_csv", "output_snapshot"])))]
#[command(arg_required_else_help(true))]
pub struct RankArgs {
    #[clap(required_unless_present = "input_snapshot")]
    #[clap(long = "vcf")]
    #[clap(help = "VCF file with somatic variants")]
    #[clap(value_name = "VCF")]
    #[arg(value_parser = check_file_exists)]
    pub vcf_path: Option<PathBuf>,

    #[clap(required_unless_present = "input_snapshot")]
    #[clap(short = 'e')]
    #[clap(long = "evidence")]
    #[clap(help = "Table of coding sequences assembled from reads overlapping each variant")]
    #[clap(value_name = "EVIDENCE")]
    #[arg(value_parser = check_file_exists)]
    pub evidence_path: Option<PathBuf>,

    #[clap(short = 'a')]
    #[clap(long = "mhc-alleles")]
    #[clap(help = "Comma-separated MHC alleles of the patient")]
    #[clap(value_name = "ALLELES")]
    #[clap(value_delimiter = ',')]
    pub mhc_alleles: Vec<String>,

    #[clap(long = "mhc-alleles-file")]
    #[clap(help = "File listing MHC alleles of the patient")]
    #[clap(value_name = "FILE")]
    #[arg(value_parser = check_file_exists)]
    pub mhc_alleles_file: Option<PathBuf>,

    #[clap(short = 'p')]
    #[clap(long = "predictions")]
    #[clap(help = "Table of precomputed binding predictions (peptide allele value)")]
    #[clap(value_name = "PREDICTIONS")]
    #[clap(conflicts_with = "predictor_cmd")]
    #[arg(value_parser = check_file_exists)]
    pub predictions_path: Option<PathBuf>,

    #[clap(long = "predictor-cmd")]
    #[clap(help = "External binding predictor program")]
    #[clap(value_name = "PROGRAM")]
    pub predictor_cmd: Option<PathBuf>,

    #[clap(long = "input-snapshot")]
    #[clap(help = "Re-export a previously saved ranking instead of computing one (report fields are taken from the snapshot)")]
    #[clap(value_name = "JSON")]
    #[clap(conflicts_with_all = ["vcf_path", "evidence_path", "predictions_path", "predictor_cmd"])]
    #[arg(value_parser = check_file_exists)]
    pub input_snapshot: Option<PathBuf>,

    #[clap(short = 't')]
    #[clap(long = "threads")]
    #[clap(help = "Number of threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    #[arg(value_parser = threads_in_range)]
    pub num_threads: usize,

    #[clap(help_heading("Output"))]
    #[clap(short = 'o')]
    #[clap(long = "output-csv")]
    #[clap(help = "Write ranked vaccine peptides as CSV")]
    #[clap(value_name = "CSV")]
    #[arg(value_parser = check_prefix_path)]
    pub output_csv: Option<String>,

    #[clap(help_heading("Output"))]
    #[clap(long = "output-snapshot")]
    #[clap(help = "Save the complete ranking as JSON")]
    #[clap(value_name = "JSON")]
    #[arg(value_parser = check_prefix_path)]
    pub output_snapshot: Option<String>,

    #[clap(help_heading("Output"))]
    #[clap(long = "output-patient-id")]
    #[clap(help = "Patient identifier to include in reports")]
    #[clap(value_name = "PATIENT_ID")]
    #[arg(value_parser = check_nonempty)]
    pub patient_id: Option<String>,

    #[clap(help_heading("Output"))]
    #[clap(long = "output-reviewed-by")]
    #[clap(help = "Comma-separated names of the reviewers of this report")]
    #[clap(value_name = "REVIEWERS")]
    #[clap(value_delimiter = ',')]
    pub reviewed_by: Vec<String>,

    #[clap(help_heading("Output"))]
    #[clap(long = "output-final-review")]
    #[clap(help = "Name of the final reviewer of this report")]
    #[clap(value_name = "REVIEWER")]
    #[arg(value_parser = check_nonempty)]
    pub final_review: Option<String>,

    #[clap(help_heading("Prediction"))]
    #[clap(long = "affinity-kind")]
    #[clap(value_name = "KIND")]
    #[clap(help = "Units of the binding values (ic50 or score)")]
    #[clap(default_value = "ic50")]
    pub affinity_kind: AffinityKind,

    #[clap(help_heading("Prediction"))]
    #[clap(long = "epitope-lengths")]
    #[clap(value_name = "LENGTHS")]
    #[clap(help = "Comma-separated epitope lengths to predict")]
    #[clap(value_delimiter = ',')]
    #[clap(default_value = "8,9,10,11")]
    #[arg(value_parser = positive_length)]
    pub epitope_lengths: Vec<usize>,

    #[clap(help_heading("Prediction"))]
    #[clap(long = "predictor-retries")]
    #[clap(value_name = "RETRIES")]
    #[clap(help = "Number of times a failed external predictor call is retried")]
    #[clap(default_value = "2")]
    pub predictor_retries: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "vaccine-peptide-length")]
    #[clap(value_name = "LENGTH")]
    #[clap(help = "Length of vaccine peptides in amino acids")]
    #[clap(default_value = "25")]
    #[arg(value_parser = positive_length)]
    pub vaccine_peptide_length: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "padding-around-mutation")]
    #[clap(value_name = "PADDING")]
    #[clap(help = "Extra residues past the mutation start that a vaccine peptide may start at")]
    #[clap(default_value = "0")]
    pub padding_around_mutation: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "max-vaccine-peptides-per-mutation")]
    #[clap(value_name = "COUNT")]
    #[clap(help = "Number of vaccine peptides to report per mutation")]
    #[clap(default_value = "1")]
    #[arg(value_parser = positive_length)]
    pub max_vaccine_peptides_per_mutation: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "max-mutations-in-report")]
    #[clap(value_name = "COUNT")]
    #[clap(help = "Number of mutations to report")]
    #[clap(default_value = "10")]
    pub max_mutations_in_report: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "min-reads-supporting-cdna-sequence")]
    #[clap(value_name = "READS")]
    #[clap(help = "Minimum number of reads supporting a coding sequence")]
    #[clap(default_value = "2")]
    #[arg(value_parser = positive_length)]
    pub min_reads_supporting_cdna_sequence: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "min-epitope-score")]
    #[clap(value_name = "SCORE")]
    #[clap(help = "Ignore epitopes whose normalized score falls below this value")]
    #[clap(default_value = "0.0001")]
    #[arg(value_parser = ensure_unit_float)]
    pub min_epitope_score: f64,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "window-scoring")]
    #[clap(value_name = "SCORING")]
    #[clap(help = "Combination of epitope scores and read support (read-fraction or sqrt-reads)")]
    #[clap(default_value = "read-fraction")]
    pub window_scoring: WindowScoring,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("epitopes")))]
#[command(arg_required_else_help(true))]
pub struct EpitopesArgs {
    #[clap(required = true)]
    #[clap(long = "vcf")]
    #[clap(help = "VCF file with somatic variants")]
    #[clap(value_name = "VCF")]
    #[arg(value_parser = check_file_exists)]
    pub vcf_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'e')]
    #[clap(long = "evidence")]
    #[clap(help = "Table of coding sequences assembled from reads overlapping each variant")]
    #[clap(value_name = "EVIDENCE")]
    #[arg(value_parser = check_file_exists)]
    pub evidence_path: PathBuf,

    #[clap(short = 'a')]
    #[clap(long = "mhc-alleles")]
    #[clap(help = "Comma-separated MHC alleles of the patient")]
    #[clap(value_name = "ALLELES")]
    #[clap(value_delimiter = ',')]
    pub mhc_alleles: Vec<String>,

    #[clap(long = "mhc-alleles-file")]
    #[clap(help = "File listing MHC alleles of the patient")]
    #[clap(value_name = "FILE")]
    #[arg(value_parser = check_file_exists)]
    pub mhc_alleles_file: Option<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output table of peptide and allele pairs")]
    #[clap(value_name = "TSV")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: String,

    #[clap(long = "epitope-lengths")]
    #[clap(value_name = "LENGTHS")]
    #[clap(help = "Comma-separated epitope lengths to predict")]
    #[clap(value_delimiter = ',')]
    #[clap(default_value = "8,9,10,11")]
    #[arg(value_parser = positive_length)]
    pub epitope_lengths: Vec<usize>,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "vaccine-peptide-length")]
    #[clap(value_name = "LENGTH")]
    #[clap(help = "Length of vaccine peptides in amino acids")]
    #[clap(default_value = "25")]
    #[arg(value_parser = positive_length)]
    pub vaccine_peptide_length: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "padding-around-mutation")]
    #[clap(value_name = "PADDING")]
    #[clap(help = "Extra residues past the mutation start that a vaccine peptide may start at")]
    #[clap(default_value = "0")]
    pub padding_around_mutation: usize,

    #[clap(help_heading("Ranking"))]
    #[clap(long = "min-reads-supporting-cdna-sequence")]
    #[clap(value_name = "READS")]
    #[clap(help = "Minimum number of reads supporting a coding sequence")]
    #[clap(default_value = "2")]
    #[arg(value_parser = positive_length)]
    pub min_reads_supporting_cdna_sequence: usize,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn threads_in_range(s: &str) -> Result<usize> {
    let thread: usize = s
        .parse()
        .map_err(|_| format!("`{}` is not a valid thread number", s))?;
    if thread >= 1 {
        Ok(thread)
    } else {
        Err("Number of threads must be at least 1".into())
    }
}

fn positive_length(s: &str) -> Result<usize> {
    let value: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("`{}` is not a valid count", s))?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("Value must be at least 1".into())
    }
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_nonempty(s: &str) -> Result<String> {
    if s.trim().is_empty() {
        Err("Value cannot be an empty string".to_string())
    } else {
        Ok(s.trim().to_string())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}
