pub mod codebook;

pub use codebook::CodebookDequantOps;
