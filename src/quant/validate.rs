//! Reference validation for codebook dequantization
//!
//! Recomputes every lookup on the host in f64 and compares it against a
//! produced output within an absolute tolerance. Unlike the dequantizer,
//! validation does not stop at the first problem: all positions are scanned,
//! mismatches are counted, and the first few are kept as samples. Positions
//! whose address cannot be resolved are logged and skipped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quant::codebook::{codebook_address, resolve_address, CodebookIndex};
use crate::quant::config::CodebookConfig;

/// Default absolute tolerance. Outputs are often stored as bf16, so
/// bit-exact comparison is not expected.
pub const DEFAULT_TOLERANCE: f32 = 1e-2;
/// Default number of mismatch samples kept in a report.
pub const DEFAULT_MAX_REPORTED: usize = 5;

/// Comparison settings for [`validate`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Maximum allowed `|expected - actual|`
    pub tolerance: f32,
    /// Mismatch samples kept in the report (lowest positions first)
    pub max_reported: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            max_reported: DEFAULT_MAX_REPORTED,
        }
    }
}

impl ValidatorConfig {
    /// Set the absolute tolerance.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set how many mismatch samples the report keeps.
    pub fn with_max_reported(mut self, max_reported: usize) -> Self {
        self.max_reported = max_reported;
        self
    }
}

/// One output element outside tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub position: usize,
    /// Reference value computed in f64
    pub expected: f64,
    /// Produced value, widened to f64
    pub actual: f64,
    pub row_index: usize,
    pub col_index: usize,
    pub address: usize,
}

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Elements scanned
    pub checked: usize,
    /// Elements outside tolerance
    pub mismatch_count: usize,
    /// Elements whose address could not be resolved (skipped)
    pub out_of_range_count: usize,
    /// First mismatches by position, at most `max_reported`
    pub mismatches: Vec<Mismatch>,
    /// Tolerance the comparison used
    pub tolerance: f32,
}

impl ValidationReport {
    /// True when no element mismatched and every address resolved.
    pub fn passed(&self) -> bool {
        self.mismatch_count == 0 && self.out_of_range_count == 0
    }

    /// Turn a failed report into [`Error::ToleranceExceeded`].
    pub fn into_result(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(Error::ToleranceExceeded {
                mismatches: self.mismatch_count,
                out_of_range: self.out_of_range_count,
                checked: self.checked,
                tolerance: self.tolerance,
            })
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(
                f,
                "PASS: {} elements within tolerance {}",
                self.checked, self.tolerance
            );
        }
        write!(
            f,
            "FAIL: {} of {} elements exceed tolerance {}, {} out of range",
            self.mismatch_count, self.checked, self.tolerance, self.out_of_range_count
        )?;
        for m in &self.mismatches {
            write!(
                f,
                "\n  [{}] expected {:.4}, got {:.4} (row {}, col {}, address {})",
                m.position, m.expected, m.actual, m.row_index, m.col_index, m.address
            )?;
        }
        Ok(())
    }
}

/// Validate `output` against a host recomputation of the codebook lookup.
///
/// `output` may hold any element that widens to f64, so both the f32 and
/// the bf16 dequantizer results are accepted as they are.
///
/// # Errors
///
/// Only shape problems are errors ([`Error::ShapeMismatch`],
/// [`Error::InvalidArgument`]); value mismatches and unresolvable addresses
/// are reported in the returned [`ValidationReport`].
pub fn validate<I, O>(
    output: &[O],
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    config: &CodebookConfig,
    validator: &ValidatorConfig,
) -> Result<ValidationReport>
where
    I: CodebookIndex,
    O: Copy + Into<f64>,
{
    check_output_len(output.len(), row_idx, col_idx, codebook, config)?;
    let reference = |_: usize, address: usize| codebook.get(address).map(|&v| f64::from(v));
    Ok(compare(
        output,
        row_idx,
        col_idx,
        codebook.len(),
        config,
        validator,
        reference,
    ))
}

/// Validate the output of a scaled dequantization.
pub fn validate_scaled<I, O>(
    output: &[O],
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    scales: &[f32],
    config: &CodebookConfig,
    validator: &ValidatorConfig,
) -> Result<ValidationReport>
where
    I: CodebookIndex,
    O: Copy + Into<f64>,
{
    let num_groups = check_output_len(output.len(), row_idx, col_idx, codebook, config)?;
    if scales.len() != num_groups {
        return Err(Error::ShapeMismatch {
            reason: format!(
                "scales length {} does not match {} groups",
                scales.len(),
                num_groups
            ),
        });
    }
    let reference = |group: usize, address: usize| {
        codebook
            .get(address)
            .map(|&v| f64::from(v) * f64::from(scales[group]))
    };
    Ok(compare(
        output,
        row_idx,
        col_idx,
        codebook.len(),
        config,
        validator,
        reference,
    ))
}

/// Returns the number of groups.
fn check_output_len<I: CodebookIndex>(
    output_len: usize,
    row_idx: &[I],
    col_idx: &[I],
    codebook: &[f32],
    config: &CodebookConfig,
) -> Result<usize> {
    let shape = config.check_shapes(row_idx.len(), col_idx.len(), codebook.len())?;
    if output_len != shape.num_elements {
        return Err(Error::ShapeMismatch {
            reason: format!(
                "output length {} does not match col_idx length {}",
                output_len,
                shape.num_elements
            ),
        });
    }
    Ok(shape.num_groups)
}

fn compare<I, O, F>(
    output: &[O],
    row_idx: &[I],
    col_idx: &[I],
    codebook_len: usize,
    config: &CodebookConfig,
    validator: &ValidatorConfig,
    reference: F,
) -> ValidationReport
where
    I: CodebookIndex,
    O: Copy + Into<f64>,
    F: Fn(usize, usize) -> Option<f64>,
{
    let tolerance = f64::from(validator.tolerance);
    let mut report = ValidationReport {
        checked: output.len(),
        mismatch_count: 0,
        out_of_range_count: 0,
        mismatches: Vec::with_capacity(validator.max_reported),
        tolerance: validator.tolerance,
    };

    for (position, (&actual, &col)) in output.iter().zip(col_idx).enumerate() {
        let group = position / config.group_size;
        let row = row_idx[group].to_usize();
        let col = col.to_usize();
        let actual: f64 = actual.into();

        let expected = resolve_address(row, col, config, codebook_len)
            .and_then(|address| reference(group, address).map(|v| (address, v)));
        let Some((address, expected)) = expected else {
            if report.out_of_range_count < validator.max_reported {
                tracing::warn!(
                    position,
                    row_index = row,
                    col_index = col,
                    address = ?codebook_address(row, col, config.col_cardinality),
                    codebook_len,
                    "codebook address out of range, skipping"
                );
            }
            report.out_of_range_count += 1;
            continue;
        };

        // NaN on either side never compares within tolerance
        let within = (expected - actual).abs() <= tolerance;
        if !within {
            if report.mismatches.len() < validator.max_reported {
                tracing::warn!(
                    position,
                    expected,
                    actual,
                    row_index = row,
                    col_index = col,
                    address,
                    "result mismatch"
                );
                report.mismatches.push(Mismatch {
                    position,
                    expected,
                    actual,
                    row_index: row,
                    col_index: col,
                    address,
                });
            }
            report.mismatch_count += 1;
        }
    }

    tracing::info!(
        checked = report.checked,
        mismatches = report.mismatch_count,
        out_of_range = report.out_of_range_count,
        passed = report.passed(),
        "codebook validation finished"
    );
    report
}
