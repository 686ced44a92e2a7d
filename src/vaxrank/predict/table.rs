use super::{AffinityKind, BindingPrediction, BindingPredictor};
use crate::utils::{normalize_allele, open_text_reader, Result};
use std::{collections::HashMap, io::BufRead, path::Path};

/// Precomputed binding values read from a `peptide allele value` table.
pub struct AffinityTable {
    values: HashMap<(String, String), f64>,
    kind: AffinityKind,
    epitope_lengths: Vec<usize>,
}

impl AffinityTable {
    pub fn from_path(path: &Path, kind: AffinityKind, epitope_lengths: Vec<usize>) -> Result<Self> {
        log::info!("Loading binding predictions from {}", path.display());
        let reader = open_text_reader(path)?;
        Self::from_reader(reader, kind, epitope_lengths)
    }

    pub fn from_reader<R: BufRead>(
        reader: R,
        kind: AffinityKind,
        epitope_lengths: Vec<usize>,
    ) -> Result<Self> {
        let mut entries = Vec::new();
        for (line_number, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let entry = parse_entry(&line)
                .map_err(|e| format!("Error at prediction line {}: {}", line_number + 1, e))?;
            entries.push(entry);
        }
        Self::from_entries(entries, kind, epitope_lengths)
    }

    pub fn from_entries(
        entries: Vec<(String, String, f64)>,
        kind: AffinityKind,
        epitope_lengths: Vec<usize>,
    ) -> Result<Self> {
        let mut values = HashMap::with_capacity(entries.len());
        for (peptide, allele, value) in entries {
            let key = (peptide.to_uppercase(), normalize_allele(&allele)?);
            if let Some(previous) = values.insert(key, value) {
                if previous != value {
                    return Err(format!(
                        "Conflicting predictions for {} with {}: {} and {}",
                        peptide, allele, previous, value
                    ));
                }
            }
        }
        log::debug!("Loaded {} binding predictions", values.len());
        Ok(AffinityTable {
            values,
            kind,
            epitope_lengths,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl BindingPredictor for AffinityTable {
    fn epitope_lengths(&self) -> &[usize] {
        &self.epitope_lengths
    }

    fn affinity_kind(&self) -> AffinityKind {
        self.kind
    }

    fn predict(&self, peptides: &[String], alleles: &[String]) -> Result<Vec<BindingPrediction>> {
        let mut predictions = Vec::with_capacity(peptides.len() * alleles.len());
        for peptide in peptides {
            for allele in alleles {
                if let Some(&value) = self.values.get(&(peptide.clone(), allele.clone())) {
                    predictions.push(BindingPrediction {
                        peptide: peptide.clone(),
                        allele: allele.clone(),
                        value,
                    });
                }
            }
        }
        Ok(predictions)
    }
}

pub(super) fn parse_entry(line: &str) -> Result<(String, String, f64)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    match &fields[..] {
        [peptide, allele, value] => {
            let value: f64 = value
                .parse()
                .map_err(|_| format!("Invalid binding value: '{}'", value))?;
            Ok((peptide.to_string(), allele.to_string(), value))
        }
        _ => Err(format!(
            "Expected 3 fields in the format 'peptide allele value', found {}: {}",
            fields.len(),
            line
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_table_from_reader() {
        let data = "\
# peptide allele ic50
SIINFEKL\tHLA-A*02:01\t25.0
siinfekl\tB*07:02\t3000
";
        let table =
            AffinityTable::from_reader(Cursor::new(data), AffinityKind::Ic50, vec![8]).unwrap();
        assert_eq!(table.len(), 2);
        let predictions = table
            .predict(
                &["SIINFEKL".to_string()],
                &["HLA-A*02:01".to_string(), "HLA-B*07:02".to_string()],
            )
            .unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(predictions[1].allele, "HLA-B*07:02");
        assert_eq!(predictions[1].value, 3000.0);
    }

    #[test]
    fn test_table_conflicting_entries_err() {
        let data = "SIINFEKL A0201 25.0\nSIINFEKL HLA-A*02:01 30.0\n";
        assert!(AffinityTable::from_reader(Cursor::new(data), AffinityKind::Ic50, vec![8]).is_err());
    }

    #[test]
    fn test_parse_entry_errors() {
        assert_eq!(
            parse_entry("SIINFEKL HLA-A*02:01"),
            Err(
                "Expected 3 fields in the format 'peptide allele value', found 2: SIINFEKL HLA-A*02:01"
                    .to_string()
            )
        );
        assert_eq!(
            parse_entry("SIINFEKL HLA-A*02:01 strong"),
            Err("Invalid binding value: 'strong'".to_string())
        );
    }
}
