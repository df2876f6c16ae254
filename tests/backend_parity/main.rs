
mod codebook;
