//! CPU codebook gather kernels
//!
//! Output position `i` reads `codebook[col_idx[i] + row_idx[i / group_size] * col_cardinality]`.
//! The output is split into group-aligned chunks so each task loads its shared
//! row index once; chunks run in parallel with rayon and write disjoint ranges.
//!
//! These kernels index without range checks beyond the slice bounds. Callers
//! validate shapes and addresses first (see `quant::codebook::check_addresses`).

use half::bf16;
use rayon::prelude::*;

use crate::quant::codebook::CodebookIndex;

/// Groups handed to a rayon task at minimum; one group is only a few lookups.
const MIN_GROUPS_PER_TASK: usize = 64;

/// Gather codebook entries into `output`.
///
/// `row_idx`: one row index per group, length `col_idx.len() / group_size`.
/// `col_idx`: one column index per output element.
/// `output`: length `col_idx.len()`.
pub fn codebook_gather_f32<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    group_size: usize,
    col_cardinality: usize,
    output: &mut [f32],
) {
    gather_groups(
        row_idx,
        col_idx,
        group_size,
        col_cardinality,
        output,
        |_, address| codebook[address],
    );
}

/// Gather codebook entries scaled by a per-group factor.
///
/// Formula: `output[i] = codebook[address(i)] * scales[i / group_size]`
pub fn codebook_gather_scaled_f32<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    scales: &[f32],
    group_size: usize,
    col_cardinality: usize,
    output: &mut [f32],
) {
    debug_assert_eq!(scales.len(), row_idx.len());
    gather_groups(
        row_idx,
        col_idx,
        group_size,
        col_cardinality,
        output,
        |group, address| codebook[address] * scales[group],
    );
}

/// Gather codebook entries into a bf16 buffer (round-to-nearest-even).
pub fn codebook_gather_bf16<I: CodebookIndex>(
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    group_size: usize,
    col_cardinality: usize,
    output: &mut [bf16],
) {
    gather_groups(
        row_idx,
        col_idx,
        group_size,
        col_cardinality,
        output,
        |_, address| bf16::from_f32(codebook[address]),
    );
}

fn gather_groups<I, T, F>(
    row_idx: &[I],
    col_idx: &[I],
    group_size: usize,
    col_cardinality: usize,
    output: &mut [T],
    lookup: F,
) where
    I: CodebookIndex,
    T: Send,
    F: Fn(usize, usize) -> T + Sync,
{
    debug_assert!(group_size > 0);
    debug_assert_eq!(output.len(), col_idx.len());
    debug_assert_eq!(row_idx.len() * group_size, col_idx.len());

    output
        .par_chunks_mut(group_size)
        .zip(col_idx.par_chunks(group_size))
        .zip(row_idx.par_iter())
        .enumerate()
        .with_min_len(MIN_GROUPS_PER_TASK)
        .for_each(|(group, ((out, cols), &row))| {
            let row_base = row.to_usize() * col_cardinality;
            for (o, &col) in out.iter_mut().zip(cols) {
                *o = lookup(group, row_base + col.to_usize());
            }
        });
}
