//! End-to-end scenarios through the public API.

use half::bf16;
use rastersimd_core::difference::abs_difference_sum;
use rastersimd_core::neural::{
    convolution::{add_convolution_forward, ConvolutionCore},
    neural_relu,
};
use rastersimd_core::statistic::{get_statistic, square_sum, value_sum};
use rastersimd_core::synet::{
    AddParam, ScaleParam, SynetAdd16b, SynetScale16b, TensorData, TensorFormat, TensorMut, TensorRef,
};
use rastersimd_core::{Raster, RasterMut, Statistic};
use tracing_subscriber::EnvFilter;

/// Routes kernel logs to the test output; `RUST_LOG=rastersimd_core=trace` shows dispatch decisions.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_constant_gray_image_statistic() {
    let pixels = vec![128u8; 64];
    let image = Raster::packed(&pixels, 8, 8).unwrap();
    assert_eq!(
        get_statistic(&image),
        Statistic {
            min: 128,
            max: 128,
            average: 128
        }
    );
}

#[test]
fn test_constant_images_of_every_value() {
    for value in [0u8, 1, 77, 254, 255] {
        let pixels = vec![value; 37 * 5];
        let image = Raster::packed(&pixels, 37, 5).unwrap();
        let stats = get_statistic(&image);
        assert_eq!((stats.min, stats.max, stats.average), (value, value, value));
    }
}

#[test]
fn test_zero_image_sums() {
    let pixels = vec![0u8; 100 * 3];
    let image = Raster::packed(&pixels, 100, 3).unwrap();
    assert_eq!(value_sum(&image), 0);
    assert_eq!(square_sum(&image), 0);
}

#[test]
fn test_abs_difference_of_ramp_against_zeros() {
    let ramp: Vec<u8> = (0..=16).collect();
    let zeros = vec![0u8; 17];
    let a = Raster::packed(&ramp, 17, 1).unwrap();
    let b = Raster::packed(&zeros, 17, 1).unwrap();
    assert_eq!(abs_difference_sum(&a, &b), 136);
    assert_eq!(abs_difference_sum(&a, &a), 0);
}

#[test]
fn test_relu_with_zero_slope() {
    let src = [-2.0f32, -1.0, 0.0, 1.0, 2.0];
    let mut dst = [9.0f32; 5];
    neural_relu(&src, 0.0, &mut dst);
    assert_eq!(dst, [0.0, 0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_convolution_3x3_edge_detector() {
    // Horizontal gradient: each column holds its index.
    let (width, height) = (10, 4);
    let src: Vec<f32> = (0..(width + 2) * (height + 2)).map(|i| (i % (width + 2)) as f32).collect();
    let weights = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    let mut out = vec![0.0f32; width * height];
    add_convolution_forward(
        ConvolutionCore::Core3x3,
        &Raster::packed(&src, width + 2, height + 2).unwrap(),
        &weights,
        &mut RasterMut::packed(&mut out, width, height).unwrap(),
    );
    // Sobel response to a unit slope is 2 * (1 + 2 + 1).
    assert!(out.iter().all(|&v| v == 8.0));
}

#[test]
fn test_bf16_layer_normalization_then_residual_add() {
    init_tracing();
    // Two channels of four pixels in NCHW, stored as bf16.
    let input: Vec<bf16> = [1.0f32, 2.0, 3.0, 4.0, -1.0, -2.0, -3.0, -4.0]
        .iter()
        .map(|&v| bf16::from_f32(v))
        .collect();
    let scale = SynetScale16b::new(ScaleParam {
        channels: 2,
        spatial: 4,
        src_type: TensorData::Bf16,
        dst_type: TensorData::F32,
        format: TensorFormat::Nchw,
        norm: true,
        bias: true,
    })
    .unwrap();
    let mut scaled = vec![0.0f32; 8];
    scale
        .forward(TensorRef::Bf16(&input), &[0.5, 2.0], &[1.0, 0.0], TensorMut::F32(&mut scaled))
        .unwrap();
    assert_eq!(scaled, [1.5, 2.0, 2.5, 3.0, -2.0, -4.0, -6.0, -8.0]);

    let residual = AddParam::from_shapes(
        &[1, 2, 2, 2],
        &[1, 2, 1, 1],
        TensorFormat::Nchw,
        TensorData::F32,
        TensorData::F32,
        TensorData::Bf16,
    )
    .and_then(SynetAdd16b::new)
    .unwrap();
    let mut out = vec![bf16::ZERO; 8];
    residual
        .forward(TensorRef::F32(&scaled), TensorRef::F32(&[10.0, 20.0]), TensorMut::Bf16(&mut out))
        .unwrap();
    let out: Vec<f32> = out.iter().map(|v| v.to_f32()).collect();
    assert_eq!(out, [11.5, 12.0, 12.5, 13.0, 18.0, 16.0, 14.0, 12.0]);
}

#[test]
fn test_unsupported_synet_parameters_are_rejected() {
    init_tracing();
    let param = ScaleParam {
        channels: 3,
        spatial: 5,
        src_type: TensorData::F32,
        dst_type: TensorData::F32,
        format: TensorFormat::Nhwc,
        norm: false,
        bias: false,
    };
    assert!(SynetScale16b::new(param).is_none());
    assert!(AddParam::from_shapes(
        &[1, 3, 4, 4],
        &[1, 3, 4, 1],
        TensorFormat::Nchw,
        TensorData::F32,
        TensorData::F32,
        TensorData::F32,
    )
    .is_none());
}
