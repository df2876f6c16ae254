//! # codebookr
//!
//! **Indexed codebook dequantization built on numr — gather kernels and a reference validator.**
//!
//! A codebook-quantized tensor stores two small integer indices per value: a
//! coarse row index shared by each group of consecutive elements and a fine
//! column index per element. Dequantization is a two-level gather into a
//! shared table:
//!
//! ```text
//! address(i) = col_idx[i] + row_idx[i / group_size] * col_cardinality
//! output[i]  = codebook[address(i)]
//! ```
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │   CodebookDequantOps (numr clients: Tensor in/out)      │
//! └──────────────────────────┬──────────────────────────────┘
//! ┌──────────────────────────▼──────────────────────────────┐
//! │   quant::codebook (host slices: shape + address checks) │
//! └──────────────────────────┬──────────────────────────────┘
//! ┌──────────────────────────▼──────────────────────────────┐
//! │   quant::cpu::kernels (rayon gather over groups)        │
//! └─────────────────────────────────────────────────────────┘
//!            quant::validate (f64 reference + report)
//! ```
//!
//! ## Design
//!
//! - **Explicit configuration**: `CodebookConfig` carries group size and index
//!   cardinalities and checks sequence lengths once at the boundary
//! - **No partial output**: shape and address faults abort before any element is written
//! - **Lenient validation**: the validator scans everything and aggregates mismatches

pub mod error;
pub mod quant;

pub use error::{Error, Result};
pub use quant::{
    dequantize, dequantize_bf16, dequantize_scaled, validate, validate_scaled, CodebookConfig,
    CodebookDequantOps, CodebookIndex, CodebookInputs, ValidationReport, ValidatorConfig,
};

// Re-export numr types that users will commonly need
pub use numr::dtype::DType;
pub use numr::runtime::Runtime;
pub use numr::tensor::Tensor;
