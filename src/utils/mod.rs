mod alleles;
mod readers;
mod util;

pub use alleles::{load_alleles, normalize_allele, read_alleles_file, resolve_alleles};
pub use readers::{is_gzipped, open_text_reader};
pub use util::{handle_error_and_exit, Result};
