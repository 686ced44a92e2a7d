use super::{table::parse_entry, AffinityKind, BindingPrediction, BindingPredictor};
use crate::utils::{normalize_allele, Result};
use itertools::Itertools;
use std::{
    io::Write,
    path::PathBuf,
    process::{Command, Stdio},
    thread,
    time::Duration,
};

const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Binding predictor backed by an external program.
///
/// The program is run as `PROGRAM --alleles A,B --lengths 8,9`, receives one
/// peptide per line on stdin and must print `peptide allele value` lines on
/// stdout. Failed invocations are retried up to `retries` more times.
pub struct ExternalPredictor {
    program: PathBuf,
    kind: AffinityKind,
    epitope_lengths: Vec<usize>,
    retries: usize,
}

impl ExternalPredictor {
    pub fn new(
        program: PathBuf,
        kind: AffinityKind,
        epitope_lengths: Vec<usize>,
        retries: usize,
    ) -> Self {
        ExternalPredictor {
            program,
            kind,
            epitope_lengths,
            retries,
        }
    }

    fn run_once(&self, peptides: &[String], alleles: &[String]) -> Result<String> {
        let mut child = Command::new(&self.program)
            .arg("--alleles")
            .arg(alleles.join(","))
            .arg("--lengths")
            .arg(self.epitope_lengths.iter().join(","))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("Failed to start {}: {}", self.program.display(), e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| "Predictor stdin unavailable".to_string())?;
        let input = peptides.iter().map(|p| format!("{}\n", p)).collect::<String>();
        let feeder = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .map_err(|e| format!("Predictor did not finish: {}", e))?;
        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        feeder
            .join()
            .map_err(|_| "Predictor input thread panicked".to_string())?
            .map_err(|e| format!("Failed to send peptides to predictor: {}", e))?;
        String::from_utf8(output.stdout).map_err(|e| format!("Predictor output is not UTF-8: {}", e))
    }
}

impl BindingPredictor for ExternalPredictor {
    fn epitope_lengths(&self) -> &[usize] {
        &self.epitope_lengths
    }

    fn affinity_kind(&self) -> AffinityKind {
        self.kind
    }

    fn predict(&self, peptides: &[String], alleles: &[String]) -> Result<Vec<BindingPrediction>> {
        let mut attempt = 0;
        let stdout = loop {
            match self.run_once(peptides, alleles) {
                Ok(stdout) => break stdout,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    log::warn!(
                        "Binding prediction failed (attempt {} of {}): {}",
                        attempt,
                        self.retries + 1,
                        e
                    );
                    thread::sleep(RETRY_DELAY * attempt as u32);
                }
                Err(e) => return Err(e),
            }
        };
        parse_predictor_output(&stdout)
    }
}

fn parse_predictor_output(stdout: &str) -> Result<Vec<BindingPrediction>> {
    stdout
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| -> Result<BindingPrediction> {
            let (peptide, allele, value) = parse_entry(line)
                .map_err(|e| format!("Predictor output line {}: {}", line_number + 1, e))?;
            Ok(BindingPrediction {
                peptide: peptide.to_uppercase(),
                allele: normalize_allele(&allele)?,
                value,
            })
        })
        .collect()
}
