pub mod codebook;
pub mod config;
pub mod cpu;
pub mod synth;
pub mod traits;
pub mod validate;

pub use codebook::{dequantize, dequantize_bf16, dequantize_scaled, CodebookIndex};
pub use config::{CodebookConfig, CodebookShape};
pub use synth::CodebookInputs;
pub use traits::CodebookDequantOps;
pub use validate::{validate, validate_scaled, Mismatch, ValidationReport, ValidatorConfig};
