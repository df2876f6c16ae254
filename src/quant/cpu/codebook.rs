//! CPU implementation of CodebookDequantOps

use crate::error::{Error, Result};
use crate::quant::codebook::{dequantize, dequantize_scaled};
use crate::quant::traits::CodebookDequantOps;
use crate::quant::CodebookConfig;
use numr::dtype::DType;
use numr::ops::TypeConversionOps;
use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

impl CodebookDequantOps<CpuRuntime> for CpuClient {
    fn codebook_dequant(
        &self,
        row_idx: &Tensor<CpuRuntime>,
        col_idx: &Tensor<CpuRuntime>,
        codebook: &Tensor<CpuRuntime>,
        config: &CodebookConfig,
        target_dtype: DType,
    ) -> Result<Tensor<CpuRuntime>> {
        check_target_dtype(target_dtype)?;
        let rows = host_indices(row_idx, "row_idx")?;
        let cols = host_indices(col_idx, "col_idx")?;
        let table = host_values(self, codebook, "codebook")?;

        let output = dequantize(&rows, &cols, &table, config)?;
        finish(self, &output, col_idx, target_dtype)
    }

    fn codebook_dequant_scaled(
        &self,
        row_idx: &Tensor<CpuRuntime>,
        col_idx: &Tensor<CpuRuntime>,
        codebook: &Tensor<CpuRuntime>,
        scales: &Tensor<CpuRuntime>,
        config: &CodebookConfig,
        target_dtype: DType,
    ) -> Result<Tensor<CpuRuntime>> {
        check_target_dtype(target_dtype)?;
        let rows = host_indices(row_idx, "row_idx")?;
        let cols = host_indices(col_idx, "col_idx")?;
        let table = host_values(self, codebook, "codebook")?;
        let scale_values = host_values(self, scales, "scales")?;

        let output = dequantize_scaled(&rows, &cols, &table, &scale_values, config)?;
        finish(self, &output, col_idx, target_dtype)
    }
}

/// Float tensor contents as host f32, casting narrower or wider floats first.
fn host_values(
    client: &CpuClient,
    tensor: &Tensor<CpuRuntime>,
    arg: &'static str,
) -> Result<Vec<f32>> {
    match tensor.dtype() {
        DType::F32 => Ok(tensor.to_vec::<f32>()),
        DType::F16 | DType::BF16 | DType::F64 => {
            let cast = client.cast(tensor, DType::F32).map_err(Error::Numr)?;
            Ok(cast.to_vec::<f32>())
        }
        other => Err(Error::InvalidArgument {
            arg,
            reason: format!("expected a floating point tensor, got {:?}", other),
        }),
    }
}

/// Wrap the f32 result in the shape of `col_idx` and cast to `target_dtype`.
fn finish(
    client: &CpuClient,
    output: &[f32],
    col_idx: &Tensor<CpuRuntime>,
    target_dtype: DType,
) -> Result<Tensor<CpuRuntime>> {
    let f32_tensor = Tensor::<CpuRuntime>::from_slice(output, col_idx.shape(), col_idx.device());
    if target_dtype == DType::F32 {
        Ok(f32_tensor)
    } else {
        client.cast(&f32_tensor, target_dtype).map_err(Error::Numr)
    }
}

fn check_target_dtype(target_dtype: DType) -> Result<()> {
    if !matches!(
        target_dtype,
        DType::F32 | DType::F16 | DType::BF16 | DType::F64
    ) {
        return Err(Error::InvalidArgument {
            arg: "target_dtype",
            reason: format!("codebook dequant target must be float, got {:?}", target_dtype),
        });
    }
    Ok(())
}

/// Index tensor contents as host u32.
fn host_indices(tensor: &Tensor<CpuRuntime>, arg: &'static str) -> Result<Vec<u32>> {
    match tensor.dtype() {
        DType::U8 => Ok(tensor.to_vec::<u8>().into_iter().map(u32::from).collect()),
        DType::U32 => Ok(tensor.to_vec::<u32>()),
        DType::I32 => tensor
            .to_vec::<i32>()
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                u32::try_from(v).map_err(|_| Error::InvalidArgument {
                    arg,
                    reason: format!("negative index {} at position {}", v, i),
                })
            })
            .collect(),
        other => Err(Error::InvalidArgument {
            arg,
            reason: format!("expected U8, U32 or I32 indices, got {:?}", other),
        }),
    }
}
