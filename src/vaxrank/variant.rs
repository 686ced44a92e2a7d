//! Somatic variants and the VCF-backed variant collection.
//!

use crate::utils::Result;
use rust_htslib::bcf::{self, Read};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, path::Path, str};

/// A single somatic alteration.
///
/// Equality and ordering consider only the locus and alleles; annotations are
/// carried along for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Contig name as it appears in the call set.
    pub contig: String,
    /// 1-based position of the first reference base.
    pub position: u32,
    pub ref_allele: String,
    pub alt_allele: String,
    pub gene: Option<String>,
    pub transcript: Option<String>,
}

impl Variant {
    pub fn new(
        contig: impl Into<String>,
        position: u32,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
    ) -> Self {
        Variant {
            contig: contig.into(),
            position,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
            gene: None,
            transcript: None,
        }
    }

    pub fn with_gene(mut self, gene: impl Into<String>) -> Self {
        self.gene = Some(gene.into());
        self
    }

    /// Key used to join variants with read evidence: `contig:position:REF>ALT`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}>{}",
            self.contig, self.position, self.ref_allele, self.alt_allele
        )
    }

    pub fn from_key(encoding: &str) -> Result<Self> {
        let error_msg = || format!("Invalid variant key: {}", encoding);
        let (locus, alleles) = encoding.rsplit_once(':').ok_or_else(error_msg)?;
        let (contig, position) = locus.rsplit_once(':').ok_or_else(error_msg)?;
        let (ref_allele, alt_allele) = alleles.split_once('>').ok_or_else(error_msg)?;
        let position: u32 = position.parse().map_err(|_| error_msg())?;
        if contig.is_empty() || ref_allele.is_empty() || alt_allele.is_empty() || position == 0 {
            return Err(error_msg());
        }
        Ok(Variant::new(contig, position, ref_allele, alt_allele))
    }

    fn sort_key(&self) -> (&str, u32, &str, &str) {
        (
            &self.contig,
            self.position,
            &self.ref_allele,
            &self.alt_allele,
        )
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}

impl Eq for Variant {}

impl std::hash::Hash for Variant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sort_key().hash(state);
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.gene {
            Some(gene) => write!(f, "{} ({})", self.key(), gene),
            None => write!(f, "{}", self.key()),
        }
    }
}

/// Loads every ALT allele of a VCF/BCF file as a separate variant, in file order.
///
/// Symbolic and missing ALT alleles cannot be translated and are skipped.
/// Repeated variants are kept once.
pub fn load_variants(path: &Path) -> Result<Vec<Variant>> {
    log::info!("Loading variants from {}", path.display());
    let mut reader = bcf::Reader::from_path(path)
        .map_err(|e| format!("Failed to open VCF file {}: {}", path.display(), e))?;

    let mut seen = HashSet::new();
    let mut variants = Vec::new();
    for (record_index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| format!("Error at VCF record {}: {}", record_index + 1, e))?;
        for variant in variants_from_record(&record)? {
            if seen.insert(variant.clone()) {
                variants.push(variant);
            } else {
                log::warn!("Skipping duplicate variant {}", variant.key());
            }
        }
    }
    log::info!("Loaded {} variants", variants.len());
    Ok(variants)
}

fn variants_from_record(record: &bcf::Record) -> Result<Vec<Variant>> {
    let rid = record
        .rid()
        .ok_or_else(|| "VCF record without a contig".to_string())?;
    let contig = record
        .header()
        .rid2name(rid)
        .map_err(|e| format!("Unknown contig id {}: {}", rid, e))
        .and_then(|name| str::from_utf8(name).map_err(|e| e.to_string()))?
        .to_string();
    let position = u32::try_from(record.pos() + 1)
        .map_err(|_| format!("Invalid VCF position {} on {}", record.pos(), contig))?;

    let gene = get_info_string(record, b"GENE");
    let transcript = get_info_string(record, b"TRANSCRIPT");

    let alleles = record.alleles();
    let (ref_allele, alt_alleles) = alleles
        .split_first()
        .ok_or_else(|| format!("VCF record {}:{} has no alleles", contig, position))?;
    let ref_allele = str::from_utf8(ref_allele)
        .map_err(|e| e.to_string())?
        .to_uppercase();

    let mut variants = Vec::new();
    for alt in alt_alleles {
        let alt = str::from_utf8(alt).map_err(|e| e.to_string())?.to_uppercase();
        if !is_translatable_allele(&alt) {
            log::warn!(
                "Skipping untranslatable ALT allele {}:{} {}",
                contig,
                position,
                alt
            );
            continue;
        }
        variants.push(Variant {
            contig: contig.clone(),
            position,
            ref_allele: ref_allele.clone(),
            alt_allele: alt,
            gene: gene.clone(),
            transcript: transcript.clone(),
        });
    }
    Ok(variants)
}

fn is_translatable_allele(allele: &str) -> bool {
    !allele.is_empty() && allele.bytes().all(|b| b"ACGTN".contains(&b))
}

fn get_info_string(record: &bcf::Record, tag: &[u8]) -> Option<String> {
    match record.info(tag).string() {
        Ok(Some(values)) => values
            .first()
            .map(|v| String::from_utf8_lossy(v).into_owned()),
        _ => None,
    }
}
