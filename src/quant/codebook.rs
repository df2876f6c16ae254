//! Indexed codebook dequantization on host slices
//!
//! Each output element is a two-level gather: a row index shared by a group of
//! `group_size` consecutive positions and a per-position column index combine
//! into one flat codebook address,
//!
//! ```text
//! address(i) = col_idx[i] + row_idx[i / group_size] * col_cardinality
//! output[i]  = codebook[address(i)]
//! ```
//!
//! All checks run before any output is produced: a call either returns the
//! complete output or an error, never a partially filled buffer.

use half::bf16;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::quant::config::{CodebookConfig, CodebookShape};
use crate::quant::cpu::kernels::codebook as kernels;

/// Unsigned integer types usable as row/column indices.
pub trait CodebookIndex: Copy + Send + Sync {
    fn to_usize(self) -> usize;
}

macro_rules! impl_codebook_index {
    ($($t:ty),*) => {
        $(
            impl CodebookIndex for $t {
                #[inline]
                fn to_usize(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_codebook_index!(u8, u16, u32, usize);

/// Combined codebook address `col + row * col_cardinality`, or `None` on overflow.
#[inline]
pub fn codebook_address(row: usize, col: usize, col_cardinality: usize) -> Option<usize> {
    row.checked_mul(col_cardinality)?.checked_add(col)
}

/// Resolve the address for one (row, col) pair, rejecting indices outside
/// their cardinality and addresses past the end of the codebook.
#[inline]
pub(crate) fn resolve_address(
    row: usize,
    col: usize,
    config: &CodebookConfig,
    codebook_len: usize,
) -> Option<usize> {
    if col >= config.col_cardinality {
        return None;
    }
    if config.row_cardinality.is_some_and(|rows| row >= rows) {
        return None;
    }
    codebook_address(row, col, config.col_cardinality).filter(|&address| address < codebook_len)
}

/// Verify every position resolves to a codebook entry.
///
/// Checks shapes with [`CodebookConfig::check_shapes`] first, then returns
/// [`Error::IndexOutOfRange`] for the lowest offending position.
pub fn check_addresses<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook_len: usize,
    config: &CodebookConfig,
) -> Result<CodebookShape> {
    let shape = config.check_shapes(row_idx.len(), col_idx.len(), codebook_len)?;
    scan_addresses(row_idx, col_idx, codebook_len, config)?;
    Ok(shape)
}

/// Address scan over inputs whose shapes are already checked.
fn scan_addresses<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook_len: usize,
    config: &CodebookConfig,
) -> Result<()> {
    debug_assert_eq!(row_idx.len() * config.group_size, col_idx.len());

    let group_size = config.group_size;
    let fault = col_idx
        .par_iter()
        .enumerate()
        .find_map_first(|(position, &col)| {
            let row = row_idx[position / group_size].to_usize();
            let col = col.to_usize();
            resolve_address(row, col, config, codebook_len)
                .is_none()
                .then_some((position, row, col))
        });

    match fault {
        None => Ok(()),
        Some((position, row, col)) => Err(Error::IndexOutOfRange {
            position,
            row_index: row,
            col_index: col,
            address: codebook_address(row, col, config.col_cardinality).unwrap_or(usize::MAX),
            codebook_len,
        }),
    }
}

fn check_inputs<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    config: &CodebookConfig,
) -> Result<CodebookShape> {
    let shape = check_addresses(row_idx, col_idx, codebook.len(), config)?;
    tracing::debug!(
        num_elements = shape.num_elements,
        num_groups = shape.num_groups,
        codebook_len = shape.codebook_len,
        group_size = config.group_size,
        col_cardinality = config.col_cardinality,
        "codebook dequant"
    );
    Ok(shape)
}

/// Dequantize: `output[i] = codebook[col_idx[i] + row_idx[i / group_size] * col_cardinality]`.
///
/// # Errors
///
/// - [`Error::InvalidArgument`] if the configuration is invalid
/// - [`Error::ShapeMismatch`] if `col_idx` is not a positive multiple of
///   `group_size` or `row_idx` does not hold one entry per group
/// - [`Error::IndexOutOfRange`] if any index exceeds its cardinality or any
///   address falls outside the codebook
pub fn dequantize<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    config: &CodebookConfig,
) -> Result<Vec<f32>> {
    let shape = check_inputs(row_idx, col_idx, codebook, config)?;
    let mut output = vec![0.0f32; shape.num_elements];
    kernels::codebook_gather_f32(
        row_idx,
        col_idx,
        codebook,
        config.group_size,
        config.col_cardinality,
        &mut output,
    );
    Ok(output)
}

/// Dequantize with a per-group scale:
/// `output[i] = codebook[address(i)] * scales[i / group_size]`.
///
/// `scales` must hold exactly one value per group.
pub fn dequantize_scaled<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    scales: &[f32],
    config: &CodebookConfig,
) -> Result<Vec<f32>> {
    let shape = check_inputs(row_idx, col_idx, codebook, config)?;
    if scales.len() != shape.num_groups {
        return Err(Error::ShapeMismatch {
            reason: format!(
                "scales length {} does not match {} groups",
                scales.len(),
                shape.num_groups
            ),
        });
    }
    let mut output = vec![0.0f32; shape.num_elements];
    kernels::codebook_gather_scaled_f32(
        row_idx,
        col_idx,
        codebook,
        scales,
        config.group_size,
        config.col_cardinality,
        &mut output,
    );
    Ok(output)
}

/// Dequantize into bf16 storage, rounding each codebook value to nearest-even.
pub fn dequantize_bf16<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    config: &CodebookConfig,
) -> Result<Vec<bf16>> {
    let shape = check_inputs(row_idx, col_idx, codebook, config)?;
    let mut output = vec![bf16::ZERO; shape.num_elements];
    kernels::codebook_gather_bf16(
        row_idx,
        col_idx,
        codebook,
        config.group_size,
        config.col_cardinality,
        &mut output,
    );
    Ok(output)
}
