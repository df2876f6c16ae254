//! Parity between the CPU client and the host-slice dequantizer

use super::helpers::*;
use codebookr::quant::synth::arange_codebook;
use codebookr::{
    dequantize, dequantize_bf16, dequantize_scaled, validate, validate_scaled, CodebookConfig,
    CodebookDequantOps, CodebookInputs, DType, Error, ValidatorConfig,
};
use numr::ops::TypeConversionOps;
use numr::runtime::cpu::CpuRuntime;
use numr::tensor::Tensor;

#[test]
fn test_codebook_dequant_matches_host() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();

    let groups = 96;
    let rows = det_indices(groups, 4, 3);
    let cols = det_indices(groups * 16, 16, 5);
    let codebook = det_codebook(64);

    let host = dequantize(&rows, &cols, &codebook, &config).unwrap();
    let result = client
        .codebook_dequant(
            &u8_tensor(&rows, &[groups], &device),
            &u8_tensor(&cols, &[groups, 16], &device),
            &f32_tensor(&codebook, &device),
            &config,
            DType::F32,
        )
        .unwrap();
    assert_eq!(result.shape(), &[groups, 16]);
    assert_parity_f32(&result.to_vec::<f32>(), &host, "codebook_dequant CPU vs host");
}

#[test]
fn test_codebook_dequant_scaled_matches_host() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();

    let groups = 8;
    let rows = det_indices(groups, 4, 1);
    let cols = det_indices(groups * 16, 16, 7);
    let codebook = det_codebook(64);
    let scales: Vec<f32> = (0..groups).map(|g| 0.5 + g as f32 * 0.25).collect();

    let host = dequantize_scaled(&rows, &cols, &codebook, &scales, &config).unwrap();
    let result = client
        .codebook_dequant_scaled(
            &u8_tensor(&rows, &[groups], &device),
            &u8_tensor(&cols, &[groups * 16], &device),
            &f32_tensor(&codebook, &device),
            &f32_tensor(&scales, &device),
            &config,
            DType::F32,
        )
        .unwrap();
    let data = result.to_vec::<f32>();
    assert_parity_f32(&data, &host, "codebook_dequant_scaled CPU vs host");

    let report = validate_scaled(
        &data,
        &rows,
        &cols,
        &codebook,
        &scales,
        &config,
        &ValidatorConfig::default(),
    )
    .unwrap();
    assert!(report.passed(), "{report}");
}

#[test]
fn test_codebook_dequant_bf16_target_matches_host() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();
    let inputs = CodebookInputs::random(&config, 16, 64, 11).unwrap();

    let result = client
        .codebook_dequant(
            &u8_tensor(&inputs.row_idx, &[16], &device),
            &u8_tensor(&inputs.col_idx, &[256], &device),
            &f32_tensor(&inputs.codebook, &device),
            &config,
            DType::BF16,
        )
        .unwrap();
    assert_eq!(result.dtype(), DType::BF16);

    let host_bf16 = dequantize_bf16(&inputs.row_idx, &inputs.col_idx, &inputs.codebook, &config)
        .unwrap()
        .iter()
        .map(|v| v.to_f32())
        .collect::<Vec<_>>();
    let back = to_f32_vec(&client, &result);
    assert_parity_f32_tol(&back, &host_bf16, "bf16 CPU vs host", 0.0);
}

#[test]
fn test_codebook_dequant_bf16_codebook_input() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();
    let codebook = arange_codebook(64, 64);

    let codebook_bf16 = client
        .cast(&f32_tensor(&codebook, &device), DType::BF16)
        .unwrap();

    let rows = [3u8];
    let cols: Vec<u8> = (0..16).collect();
    let result = client
        .codebook_dequant(
            &u8_tensor(&rows, &[1], &device),
            &u8_tensor(&cols, &[16], &device),
            &codebook_bf16,
            &config,
            DType::F32,
        )
        .unwrap();
    let expected: Vec<f32> = (48..64).map(|v| v as f32).collect();
    assert_eq!(result.to_vec::<f32>(), expected);
}

#[test]
fn test_codebook_dequant_f16_target() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();

    let groups = 32;
    let rows = det_indices(groups, 4, 3);
    let cols = det_indices(groups * 16, 16, 5);
    let codebook = det_codebook(64);

    let host = dequantize(&rows, &cols, &codebook, &config).unwrap();
    let result = client
        .codebook_dequant(
            &u8_tensor(&rows, &[groups], &device),
            &u8_tensor(&cols, &[groups, 16], &device),
            &f32_tensor(&codebook, &device),
            &config,
            DType::F16,
        )
        .unwrap();
    assert_eq!(result.dtype(), DType::F16);
    assert_eq!(result.shape(), &[groups, 16]);
    // |v| <= 0.5, so f16 rounding stays well under 1e-3
    assert_parity_f32_tol(&to_f32_vec(&client, &result), &host, "f16 target vs host", 1e-3);
}

#[test]
fn test_codebook_dequant_f64_codebook() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();

    let groups = 16;
    let rows = det_indices(groups, 4, 1);
    let cols = det_indices(groups * 16, 16, 3);
    let codebook = det_codebook(64);
    let codebook_f64: Vec<f64> = codebook.iter().map(|&v| f64::from(v)).collect();

    let host = dequantize(&rows, &cols, &codebook, &config).unwrap();
    let result = client
        .codebook_dequant(
            &u8_tensor(&rows, &[groups], &device),
            &u8_tensor(&cols, &[groups * 16], &device),
            &Tensor::<CpuRuntime>::from_slice(&codebook_f64, &[64], &device),
            &config,
            DType::F64,
        )
        .unwrap();
    assert_eq!(result.dtype(), DType::F64);
    let back: Vec<f32> = result.to_vec::<f64>().iter().map(|&v| v as f32).collect();
    assert_parity_f32(&back, &host, "f64 codebook vs host");
}

#[test]
fn test_codebook_dequant_half_precision_scales() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();

    let groups = 8;
    let rows = det_indices(groups, 4, 1);
    let cols = det_indices(groups * 16, 16, 7);
    let codebook = det_codebook(64);
    // quarter steps are exact in both bf16 and f16
    let scales: Vec<f32> = (0..groups).map(|g| 0.5 + g as f32 * 0.25).collect();
    let host = dequantize_scaled(&rows, &cols, &codebook, &scales, &config).unwrap();

    for dtype in [DType::BF16, DType::F16] {
        let scales_tensor = client.cast(&f32_tensor(&scales, &device), dtype).unwrap();
        let result = client
            .codebook_dequant_scaled(
                &u8_tensor(&rows, &[groups], &device),
                &u8_tensor(&cols, &[groups * 16], &device),
                &f32_tensor(&codebook, &device),
                &scales_tensor,
                &config,
                DType::F32,
            )
            .unwrap();
        assert_parity_f32(
            &result.to_vec::<f32>(),
            &host,
            &format!("{:?} scales vs host", dtype),
        );
    }
}

#[test]
fn test_codebook_dequant_out_of_range_fails() {
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default().with_group_size(1);
    let codebook: Vec<f32> = (0..63).map(|v| v as f32).collect();

    let result = client.codebook_dequant(
        &u8_tensor(&[3], &[1], &device),
        &u8_tensor(&[15], &[1], &device),
        &f32_tensor(&codebook, &device),
        &config,
        DType::F32,
    );
    match result {
        Err(Error::IndexOutOfRange {
            position: 0,
            row_index: 3,
            col_index: 15,
            address: 63,
            codebook_len: 63,
        }) => {}
        Err(other) => panic!("expected IndexOutOfRange, got {other}"),
        Ok(_) => panic!("expected IndexOutOfRange, got output"),
    }
}

#[test]
fn test_harness_round_trip() {
    // Seeded random inputs over several tiles' worth of elements
    let (client, device) = setup_cpu();
    let config = CodebookConfig::default();
    let num_groups = 4 * 1024 / config.group_size;
    let inputs = CodebookInputs::random(&config, num_groups, 64, 2024).unwrap();

    let result = client
        .codebook_dequant(
            &u8_tensor(&inputs.row_idx, &[num_groups], &device),
            &u8_tensor(&inputs.col_idx, &[4, 32, 32], &device),
            &f32_tensor(&inputs.codebook, &device),
            &config,
            DType::BF16,
        )
        .unwrap();
    let output = to_f32_vec(&client, &result);

    let report = validate(
        &output,
        &inputs.row_idx,
        &inputs.col_idx,
        &inputs.codebook,
        &config,
        &ValidatorConfig::default(),
    )
    .unwrap();
    assert!(report.passed(), "{report}");
    assert_eq!(report.checked, 4096);
}
