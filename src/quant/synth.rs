//! Synthetic inputs for exercising codebook dequantization
//!
//! Generates index sequences within their configured cardinalities and a
//! repeating `0..period` codebook, reproducibly from a seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::quant::config::CodebookConfig;

/// Row indices, column indices and codebook for one dequantization call
#[derive(Debug, Clone, PartialEq)]
pub struct CodebookInputs {
    pub row_idx: Vec<u8>,
    pub col_idx: Vec<u8>,
    pub codebook: Vec<f32>,
}

impl CodebookInputs {
    /// Random indices for `num_groups` groups over an arange codebook.
    ///
    /// Row indices are drawn from `[0, row_cardinality)`; when the config
    /// leaves rows unconstrained, from the rows that fit in `codebook_len`.
    /// Column indices are drawn from `[0, col_cardinality)`. Combined
    /// addresses are not checked against `codebook_len`, so a short codebook
    /// yields inputs the dequantizer rejects.
    ///
    /// # Errors
    ///
    /// - If the config is invalid or `num_groups` is zero
    /// - If a cardinality does not fit in `u8`
    /// - If the codebook cannot hold a single row
    pub fn random(
        config: &CodebookConfig,
        num_groups: usize,
        codebook_len: usize,
        seed: u64,
    ) -> Result<Self> {
        config.validate()?;
        if num_groups == 0 {
            return Err(Error::InvalidArgument {
                arg: "num_groups",
                reason: "must be > 0".into(),
            });
        }

        let rows = config
            .row_cardinality
            .unwrap_or(codebook_len / config.col_cardinality);
        if rows == 0 {
            return Err(Error::InvalidArgument {
                arg: "codebook_len",
                reason: format!(
                    "{} entries cannot hold a row of {}",
                    codebook_len, config.col_cardinality
                ),
            });
        }
        let max_row = max_index("row_cardinality", rows)?;
        let max_col = max_index("col_cardinality", config.col_cardinality)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let row_idx = (0..num_groups)
            .map(|_| rng.gen_range(0..=max_row))
            .collect();
        let col_idx = (0..num_groups * config.group_size)
            .map(|_| rng.gen_range(0..=max_col))
            .collect();

        Ok(Self {
            row_idx,
            col_idx,
            codebook: arange_codebook(codebook_len, config.address_space().unwrap_or(codebook_len)),
        })
    }
}

/// Largest index value for a cardinality, as a `u8`.
fn max_index(arg: &'static str, cardinality: usize) -> Result<u8> {
    // u8 indices can address up to 256 distinct values
    if cardinality > 256 {
        return Err(Error::InvalidArgument {
            arg,
            reason: format!("{} does not fit in u8 indices", cardinality),
        });
    }
    Ok((cardinality - 1) as u8)
}

/// Codebook whose entry `i` is `i % period` (an arange that repeats).
pub fn arange_codebook(len: usize, period: usize) -> Vec<f32> {
    let period = period.max(1);
    (0..len).map(|i| (i % period) as f32).collect()
}
