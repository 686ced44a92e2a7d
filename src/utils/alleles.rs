use super::{open_text_reader, Result};
use std::{collections::BTreeSet, io::BufRead, path::Path};

const HLA_PREFIX: &str = "HLA-";
const CLASS_I_GENES: [&str; 6] = ["A", "B", "C", "E", "F", "G"];

/// Normalizes an MHC allele name so that equivalent spellings compare equal.
///
/// Classical class I names are rewritten to `HLA-<gene>*<group>:<protein>`;
/// `A*02:01`, `HLA-A0201` and `a0201` all become `HLA-A*02:01`. Anything that
/// does not look like a class I HLA name is uppercased and kept as is.
pub fn normalize_allele(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Empty MHC allele name".to_string());
    }
    let upper = name.to_uppercase();
    let body = upper.strip_prefix(HLA_PREFIX).unwrap_or(&upper);

    let gene_len = body.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    let (gene, fields) = body.split_at(gene_len);
    if !CLASS_I_GENES.contains(&gene) {
        return Ok(upper);
    }

    let fields = fields.strip_prefix('*').unwrap_or(fields);
    let digits: Vec<&str> = if fields.contains(':') {
        fields.split(':').collect()
    } else if fields.len() == 4 && fields.chars().all(|c| c.is_ascii_digit()) {
        vec![&fields[..2], &fields[2..]]
    } else {
        return Err(format!("Unrecognized HLA allele: {}", name));
    };

    if digits.len() < 2
        || digits
            .iter()
            .any(|d| d.is_empty() || !d.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(format!("Unrecognized HLA allele: {}", name));
    }

    Ok(format!(
        "{}{}*{}:{}",
        HLA_PREFIX, gene, digits[0], digits[1]
    ))
}

/// Resolves the final patient allele set: normalized, deduplicated and sorted.
pub fn resolve_alleles<S: AsRef<str>>(names: &[S]) -> Result<Vec<String>> {
    let alleles = names
        .iter()
        .map(|n| normalize_allele(n.as_ref()))
        .collect::<Result<BTreeSet<_>>>()?;
    if alleles.is_empty() {
        return Err("No MHC alleles specified".to_string());
    }
    Ok(alleles.into_iter().collect())
}

/// Combines alleles given on the command line with those listed in a file.
pub fn load_alleles(names: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut all_names = names.to_vec();
    if let Some(path) = file {
        all_names.extend(read_alleles_file(path)?);
    }
    let alleles = resolve_alleles(&all_names)?;
    log::info!("Using {} MHC alleles: {}", alleles.len(), alleles.join(","));
    Ok(alleles)
}

/// Reads allele names from a file, one or more per line separated by commas or
/// whitespace. Lines starting with `#` are ignored.
pub fn read_alleles_file(path: &Path) -> Result<Vec<String>> {
    let reader = open_text_reader(path)?;
    let mut names = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Error reading line {}: {}", line_number + 1, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        names.extend(
            line.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string()),
        );
    }
    Ok(names)
}
