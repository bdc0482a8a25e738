//! Aligned and deliberately misaligned copies of the same raster must give
//! bit-identical results from every kernel family.

mod common;

use common::Image;
use proptest::{
    collection::vec,
    prelude::{prop_assert_eq, prop_oneof, Just, Strategy},
    proptest,
    test_runner::{Config as ProptestConfig, FileFailurePersistence},
};
use rastersimd_core::{difference, interference, neural, statistic};

const ALIGNMENT_PROP_CASES: u32 = 128;

fn width_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![
        Just(1_usize),
        Just(15_usize),
        Just(16_usize),
        Just(17_usize),
        Just(31_usize),
        Just(32_usize),
        Just(33_usize),
        Just(63_usize),
        Just(64_usize),
        Just(65_usize),
        Just(129_usize),
        1_usize..=300,
    ]
}

/// `(width, height, a, b)` byte rasters of the same size.
fn byte_pair_strategy() -> impl Strategy<Value = (usize, usize, Vec<u8>, Vec<u8>)> {
    (width_strategy(), 1_usize..=5).prop_flat_map(|(width, height)| {
        let len = width * height;
        (Just(width), Just(height), vec(proptest::num::u8::ANY, len), vec(proptest::num::u8::ANY, len))
    })
}

fn float_strategy() -> impl Strategy<Value = Vec<f32>> {
    width_strategy().prop_flat_map(|len| vec(-8.0_f32..8.0_f32, len))
}

fn alignment_proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: ALIGNMENT_PROP_CASES,
        // Integration tests do not have a nearby lib.rs/main.rs, so set an
        // explicit persistence root for reproducible counterexamples.
        failure_persistence: Some(Box::new(FileFailurePersistence::WithSource(
            "alignment-regressions",
        ))),
        ..ProptestConfig::default()
    }
}

proptest! {
    #![proptest_config(alignment_proptest_config())]

    #[test]
    fn test_statistics_ignore_alignment((width, height, a, b) in byte_pair_strategy()) {
        let (a0, a1) = (Image::aligned(width, height, &a), Image::unaligned(width, height, &a));
        let (b0, b1) = (Image::aligned(width, height, &b), Image::unaligned(width, height, &b));

        prop_assert_eq!(statistic::get_statistic(&a0.view()), statistic::get_statistic(&a1.view()));
        prop_assert_eq!(statistic::value_square_sum(&a0.view()), statistic::value_square_sum(&a1.view()));
        prop_assert_eq!(
            statistic::correlation_sum(&a0.view(), &b0.view()),
            statistic::correlation_sum(&a1.view(), &b1.view())
        );

        let mut rows = (vec![0u32; height], vec![0u32; height]);
        statistic::get_row_sums(&a0.view(), &mut rows.0);
        statistic::get_row_sums(&a1.view(), &mut rows.1);
        prop_assert_eq!(rows.0, rows.1);

        let mut cols = (vec![0u32; width], vec![0u32; width]);
        statistic::get_col_sums(&a0.view(), &mut cols.0);
        statistic::get_col_sums(&a1.view(), &mut cols.1);
        prop_assert_eq!(cols.0, cols.1);
    }

    #[test]
    fn test_differences_ignore_alignment((width, height, a, b) in byte_pair_strategy()) {
        let (a0, a1) = (Image::aligned(width, height, &a), Image::unaligned(width, height, &a));
        let (b0, b1) = (Image::aligned(width, height, &b), Image::unaligned(width, height, &b));
        let mask: Vec<u8> = a.iter().map(|v| v & 1).collect();
        let (m0, m1) = (Image::aligned(width, height, &mask), Image::unaligned(width, height, &mask));

        prop_assert_eq!(
            difference::abs_difference_sum(&a0.view(), &b0.view()),
            difference::abs_difference_sum(&a1.view(), &b1.view())
        );
        prop_assert_eq!(
            difference::abs_difference_sum_masked(&a0.view(), &b0.view(), &m0.view(), 1),
            difference::abs_difference_sum_masked(&a1.view(), &b1.view(), &m1.view(), 1)
        );
        if width > 2 && height > 2 {
            prop_assert_eq!(
                difference::abs_difference_sums_3x3(&a0.view(), &b0.view()),
                difference::abs_difference_sums_3x3(&a1.view(), &b1.view())
            );
        }
    }

    #[test]
    fn test_interference_ignores_alignment((width, height, a, b) in byte_pair_strategy()) {
        let start: Vec<i16> = a.iter().map(|&v| i16::from(v) * 8 - 1000).collect();
        let mut s0 = Image::aligned(width, height, &start);
        let mut s1 = Image::unaligned(width, height, &start);
        let (m0, m1) = (Image::aligned(width, height, &b), Image::unaligned(width, height, &b));

        interference::interference_increment(&mut s0.view_mut(), 200, 1200);
        interference::interference_increment(&mut s1.view_mut(), 200, 1200);
        interference::interference_decrement_masked(&mut s0.view_mut(), 37, -900, &m0.view(), b[0]);
        interference::interference_decrement_masked(&mut s1.view_mut(), 37, -900, &m1.view(), b[0]);
        prop_assert_eq!(s0.pixels(), s1.pixels());
    }

    #[test]
    fn test_neural_ignores_alignment(values in float_strategy()) {
        let len = values.len();
        let src0 = Image::aligned(len, 1, &values);
        let src1 = Image::unaligned(len, 1, &values);
        let (s0, s1) = (src0.view().row(0), src1.view().row(0));

        for slope in [0.0_f32, 0.25, 1.5] {
            let mut d0 = Image::aligned(len, 1, &vec![0.0; len]);
            let mut d1 = Image::unaligned(len, 1, &vec![0.0; len]);
            neural::neural_rough_sigmoid(s0, slope, d0.view_mut().row_mut(0));
            neural::neural_rough_sigmoid(s1, slope, d1.view_mut().row_mut(0));
            prop_assert_eq!(d0.pixels(), d1.pixels());

            neural::neural_relu(s0, slope.min(1.0), d0.view_mut().row_mut(0));
            neural::neural_relu(s1, slope.min(1.0), d1.view_mut().row_mut(0));
            prop_assert_eq!(d0.pixels(), d1.pixels());
        }
        prop_assert_eq!(
            neural::neural_product_sum(s0, s0).to_bits(),
            neural::neural_product_sum(s1, s1).to_bits()
        );
    }

    #[test]
    fn test_convert_ignores_alignment((width, height, a, _b) in byte_pair_strategy()) {
        let (a0, a1) = (Image::aligned(width, height, &a), Image::unaligned(width, height, &a));
        for inversion in [false, true] {
            let zeros = vec![0.0_f32; width * height];
            let mut d0 = Image::aligned(width, height, &zeros);
            let mut d1 = Image::unaligned(width, height, &zeros);
            neural::neural_convert(&a0.view(), &mut d0.view_mut(), inversion);
            neural::neural_convert(&a1.view(), &mut d1.view_mut(), inversion);
            prop_assert_eq!(d0.pixels(), d1.pixels());
        }
    }
}
