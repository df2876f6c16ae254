//! Codebook addressing configuration
//!
//! A codebook lookup combines a per-group row index with a per-element column
//! index: `address = col + row * col_cardinality`. The configuration carries
//! the group size and the index cardinalities, and checks incoming sequence
//! lengths once at the boundary before any kernel runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Elements sharing one row index.
pub const DEFAULT_GROUP_SIZE: usize = 16;
/// Distinct column index values (and the codebook row stride).
pub const DEFAULT_COL_CARDINALITY: usize = 16;
/// Distinct row index values.
pub const DEFAULT_ROW_CARDINALITY: usize = 4;

/// Addressing configuration for codebook dequantization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodebookConfig {
    /// Number of consecutive output positions that share one row index
    pub group_size: usize,
    /// Number of distinct column index values. Also the stride between
    /// codebook rows in the combined address.
    pub col_cardinality: usize,
    /// Number of distinct row index values. `None` leaves row indices
    /// constrained only by the codebook length.
    pub row_cardinality: Option<usize>,
}

impl Default for CodebookConfig {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            col_cardinality: DEFAULT_COL_CARDINALITY,
            row_cardinality: Some(DEFAULT_ROW_CARDINALITY),
        }
    }
}

/// Lengths derived from a validated set of inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodebookShape {
    /// Output (and column index) length
    pub num_elements: usize,
    /// Row index length
    pub num_groups: usize,
    /// Codebook length
    pub codebook_len: usize,
}

impl CodebookConfig {
    /// Config with unconstrained row indices.
    pub fn new(group_size: usize, col_cardinality: usize) -> Self {
        Self {
            group_size,
            col_cardinality,
            row_cardinality: None,
        }
    }

    /// Set the number of positions sharing one row index.
    pub fn with_group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    /// Set the column cardinality, which is also the row stride.
    pub fn with_col_cardinality(mut self, col_cardinality: usize) -> Self {
        self.col_cardinality = col_cardinality;
        self
    }

    /// Set the row cardinality; `None` leaves rows bounded only by the codebook.
    pub fn with_row_cardinality(mut self, row_cardinality: Option<usize>) -> Self {
        self.row_cardinality = row_cardinality;
        self
    }

    /// Validate configuration constraints
    pub fn validate(&self) -> Result<()> {
        if self.group_size == 0 {
            return Err(Error::InvalidArgument {
                arg: "group_size",
                reason: "must be > 0".into(),
            });
        }
        if self.col_cardinality == 0 {
            return Err(Error::InvalidArgument {
                arg: "col_cardinality",
                reason: "must be > 0".into(),
            });
        }
        if let Some(rows) = self.row_cardinality {
            if rows == 0 {
                return Err(Error::InvalidArgument {
                    arg: "row_cardinality",
                    reason: "must be > 0".into(),
                });
            }
            if rows.checked_mul(self.col_cardinality).is_none() {
                return Err(Error::InvalidArgument {
                    arg: "row_cardinality",
                    reason: format!(
                        "{} rows x {} cols overflows the address space",
                        rows, self.col_cardinality
                    ),
                });
            }
        }
        Ok(())
    }

    /// Number of addressable codebook entries, `rows * cols`, when the row
    /// cardinality is known.
    pub fn address_space(&self) -> Option<usize> {
        self.row_cardinality
            .and_then(|rows| rows.checked_mul(self.col_cardinality))
    }

    /// Check sequence lengths against the configuration.
    ///
    /// The column index length must be a positive multiple of `group_size`
    /// and there must be exactly one row index per group. A codebook smaller
    /// than [`address_space`](Self::address_space) is accepted with a
    /// warning: whether a given lookup is in range is decided per element.
    pub fn check_shapes(
        &self,
        row_len: usize,
        col_len: usize,
        codebook_len: usize,
    ) -> Result<CodebookShape> {
        self.validate()?;

        if col_len == 0 || col_len % self.group_size != 0 {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "col_idx length {} is not a positive multiple of group_size {}",
                    col_len, self.group_size
                ),
            });
        }
        let num_groups = col_len / self.group_size;
        if row_len != num_groups {
            return Err(Error::ShapeMismatch {
                reason: format!(
                    "row_idx length {} does not match {} groups of {} (col_idx length {})",
                    row_len, num_groups, self.group_size, col_len
                ),
            });
        }
        if codebook_len == 0 {
            return Err(Error::ShapeMismatch {
                reason: "codebook is empty".into(),
            });
        }

        if let Some(space) = self.address_space() {
            if codebook_len < space {
                tracing::warn!(
                    codebook_len,
                    address_space = space,
                    "codebook is smaller than the configured address space"
                );
            } else if codebook_len > space {
                tracing::debug!(
                    codebook_len,
                    address_space = space,
                    "codebook entries beyond the address space are unreachable"
                );
            }
        }

        Ok(CodebookShape {
            num_elements: col_len,
            num_groups,
            codebook_len,
        })
    }

    /// Load and validate a config from a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::ConfigError {
            reason: format!("IO error: {e}"),
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| Error::ConfigError {
            reason: format!("JSON parse error: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a YAML file.
    pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::ConfigError {
            reason: format!("IO error: {e}"),
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| Error::ConfigError {
            reason: format!("YAML parse error: {e}"),
        })?;
        config.validate()?;
        Ok(config)
    }
}
