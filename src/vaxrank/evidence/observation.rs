//! Read-derived coding sequence observations and their translation to protein.
//!

use crate::utils::Result;
use std::str::FromStr;

/// Which allele the reads behind an observation carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlleleSupport {
    Alt,
    Ref,
}

impl FromStr for AlleleSupport {
    type Err = String;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "alt" => Ok(AlleleSupport::Alt),
            "ref" => Ok(AlleleSupport::Ref),
            _ => Err(format!("Invalid allele support '{}', expected alt or ref", s)),
        }
    }
}

/// The molecule an observed sequence is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Protein,
    Cdna,
}

impl FromStr for SequenceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "protein" => Ok(SequenceKind::Protein),
            "cdna" => Ok(SequenceKind::Cdna),
            _ => Err(format!(
                "Invalid sequence type '{}', expected protein or cdna",
                s
            )),
        }
    }
}

/// One sequence assembled from reads overlapping a variant.
///
/// For `SequenceKind::Cdna` the mutation interval is in nucleotides and the
/// reading frame is the offset of the first complete codon. For
/// `SequenceKind::Protein` the interval is in residues.
#[derive(Debug, Clone, PartialEq)]
pub struct CodingSequenceObservation {
    pub allele: AlleleSupport,
    pub kind: SequenceKind,
    pub sequence: String,
    pub reading_frame: u8,
    pub mutation_start: usize,
    pub mutation_end: usize,
    pub read_count: usize,
}

/// A mutant protein sequence derived from an observation.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedSequence {
    pub amino_acids: String,
    pub cdna: Option<String>,
    pub reading_frame: u8,
    pub mutation_start: usize,
    pub mutation_end: usize,
}

impl CodingSequenceObservation {
    /// Checks the observation metadata and produces its protein form.
    pub fn translate(&self) -> Result<TranslatedSequence> {
        if self.mutation_start > self.mutation_end {
            return Err(format!(
                "Mutation start {} is past mutation end {}",
                self.mutation_start, self.mutation_end
            ));
        }
        if self.mutation_end > self.sequence.len() {
            return Err(format!(
                "Mutation end {} is past sequence length {}",
                self.mutation_end,
                self.sequence.len()
            ));
        }

        match self.kind {
            SequenceKind::Protein => {
                if !is_protein(&self.sequence) {
                    return Err(format!("Invalid amino acid sequence: {}", self.sequence));
                }
                Ok(TranslatedSequence {
                    amino_acids: self.sequence.to_uppercase(),
                    cdna: None,
                    reading_frame: self.reading_frame,
                    mutation_start: self.mutation_start,
                    mutation_end: self.mutation_end,
                })
            }
            SequenceKind::Cdna => self.translate_cdna(),
        }
    }

    fn translate_cdna(&self) -> Result<TranslatedSequence> {
        let cdna = self.sequence.to_uppercase();
        if !cdna.bytes().all(|b| b"ACGTN".contains(&b)) {
            return Err(format!("Invalid cDNA sequence: {}", self.sequence));
        }
        let frame = self.reading_frame as usize;
        if frame > 2 {
            return Err(format!("Invalid reading frame: {}", self.reading_frame));
        }
        if self.mutation_start < frame {
            return Err(format!(
                "Mutation at {} precedes reading frame {}",
                self.mutation_start, frame
            ));
        }

        let amino_acids = translate(&cdna.as_bytes()[frame..]);
        let (mutation_start, mutation_end) =
            residue_interval(self.mutation_start - frame, self.mutation_end - frame);
        let has_stop = mutation_end > amino_acids.len()
            || (mutation_start == mutation_end && mutation_start >= amino_acids.len());
        if has_stop {
            return Err(format!(
                "Stop codon before mutation at residue {} in translated length {}",
                mutation_start,
                amino_acids.len()
            ));
        }

        Ok(TranslatedSequence {
            amino_acids,
            cdna: Some(cdna),
            reading_frame: self.reading_frame,
            mutation_start,
            mutation_end,
        })
    }
}

/// Maps a nucleotide interval (relative to the first codon) to the residues it touches.
///
/// An empty interval on a codon boundary stays empty; one inside a codon marks
/// that codon as mutated.
fn residue_interval(nt_start: usize, nt_end: usize) -> (usize, usize) {
    if nt_start == nt_end {
        if nt_start % 3 == 0 {
            (nt_start / 3, nt_start / 3)
        } else {
            (nt_start / 3, nt_start / 3 + 1)
        }
    } else {
        (nt_start / 3, nt_end.div_ceil(3))
    }
}

fn is_protein(seq: &str) -> bool {
    !seq.is_empty()
        && seq
            .bytes()
            .all(|b| b"ACDEFGHIKLMNPQRSTVWYX".contains(&b.to_ascii_uppercase()))
}

/// Translates complete codons with the standard genetic code, stopping before
/// the first stop codon. Codons with ambiguous bases become `X`.
pub fn translate(cdna: &[u8]) -> String {
    let mut protein = String::with_capacity(cdna.len() / 3);
    for codon in cdna.chunks_exact(3) {
        match translate_codon(codon) {
            '*' => break,
            aa => protein.push(aa),
        }
    }
    protein
}

fn translate_codon(codon: &[u8]) -> char {
    match codon {
        b"TTT" | b"TTC" => 'F',
        b"TTA" | b"TTG" | b"CTT" | b"CTC" | b"CTA" | b"CTG" => 'L',
        b"ATT" | b"ATC" | b"ATA" => 'I',
        b"ATG" => 'M',
        b"GTT" | b"GTC" | b"GTA" | b"GTG" => 'V',
        b"TCT" | b"TCC" | b"TCA" | b"TCG" | b"AGT" | b"AGC" => 'S',
        b"CCT" | b"CCC" | b"CCA" | b"CCG" => 'P',
        b"ACT" | b"ACC" | b"ACA" | b"ACG" => 'T',
        b"GCT" | b"GCC" | b"GCA" | b"GCG" => 'A',
        b"TAT" | b"TAC" => 'Y',
        b"TAA" | b"TAG" | b"TGA" => '*',
        b"CAT" | b"CAC" => 'H',
        b"CAA" | b"CAG" => 'Q',
        b"AAT" | b"AAC" => 'N',
        b"AAA" | b"AAG" => 'K',
        b"GAT" | b"GAC" => 'D',
        b"GAA" | b"GAG" => 'E',
        b"TGT" | b"TGC" => 'C',
        b"TGG" => 'W',
        b"CGT" | b"CGC" | b"CGA" | b"CGG" | b"AGA" | b"AGG" => 'R',
        b"GGT" | b"GGC" | b"GGA" | b"GGG" => 'G',
        _ => 'X',
    }
}
