//! Grammar for amino-acid keyed modification maps.
//!
//! A key is one residue, one positional symbol, or a positional symbol
//! followed by a residue (e.g. `^Q`).

use std::collections::BTreeMap;

use crate::error::{Error, Result};

pub const RESIDUES: &str = "ACDEFGHIKLMNPQRSTVWY";

/// `^` peptide N-term, `$` peptide C-term, `[` protein N-term, `]` protein C-term.
pub const POSITIONAL: &str = "^$[]";

pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, None) => RESIDUES.contains(c) || POSITIONAL.contains(c),
        (Some(site), Some(residue), None) => {
            POSITIONAL.contains(site) && RESIDUES.contains(residue)
        }
        _ => false,
    }
}

/// Reject the whole map on the first invalid key.
pub fn validate_keys<V>(label: &str, map: &BTreeMap<String, V>) -> Result<()> {
    match map.keys().find(|key| !is_valid_key(key)) {
        Some(key) => Err(Error::Validation(format!(
            "invalid {} key '{}': expected a residue of {}, a terminus of {}, \
             or a terminus followed by a residue",
            label, key, RESIDUES, POSITIONAL
        ))),
        None => Ok(()),
    }
}
