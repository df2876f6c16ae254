//! Codebook dequantization operations trait

use crate::error::Result;
use crate::quant::CodebookConfig;
use numr::dtype::DType;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// Indexed codebook dequantization on a runtime client
pub trait CodebookDequantOps<R: Runtime> {
    /// Two-level gather: row index per group + column index per element → codebook value
    ///
    /// # Contract
    ///
    /// - `row_idx`: `[N / group_size]` integer indices (U8, U32 or I32), one per group
    /// - `col_idx`: any shape with `N` elements, integer indices (U8, U32 or I32)
    /// - `codebook`: 1-D floating point table (F32, F16, BF16 or F64)
    /// - Output: shape of `col_idx`, dtype `target_dtype` (must be floating point)
    ///
    /// Dequant: `output[i] = codebook[col_idx[i] + row_idx[i / group_size] * col_cardinality]`
    ///
    /// Fails without producing output if any address is out of range.
    fn codebook_dequant(
        &self,
        row_idx: &Tensor<R>,
        col_idx: &Tensor<R>,
        codebook: &Tensor<R>,
        config: &CodebookConfig,
        target_dtype: DType,
    ) -> Result<Tensor<R>>;

    /// Codebook gather with a per-group scale
    ///
    /// # Contract
    ///
    /// As [`codebook_dequant`](Self::codebook_dequant), plus:
    ///
    /// - `scales`: `[N / group_size]` floating point (F32, F16, BF16 or F64), one per group
    ///
    /// Dequant: `output[i] = codebook[address(i)] * scales[i / group_size]`
    fn codebook_dequant_scaled(
        &self,
        row_idx: &Tensor<R>,
        col_idx: &Tensor<R>,
        codebook: &Tensor<R>,
        scales: &Tensor<R>,
        config: &CodebookConfig,
        target_dtype: DType,
    ) -> Result<Tensor<R>>;
}
