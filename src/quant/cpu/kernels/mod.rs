pub mod codebook;
