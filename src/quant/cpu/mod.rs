pub mod codebook;
pub mod kernels;
