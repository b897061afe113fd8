use approx::assert_relative_eq;
use ndarray::{Array2, Array3, Axis};
use nimbus_extrapolation::{
    ExtrapolationMethod, OutsideFill, SemiLagrangianConfig, build_extrapolator,
};

fn gaussian_cell(h: usize, w: usize, ci: f64, cj: f64) -> Array2<f64> {
    Array2::from_shape_fn((h, w), |(i, j)| {
        let d2 = (i as f64 - ci).powi(2) + (j as f64 - cj).powi(2);
        10.0 * (-d2 / 18.0).exp()
    })
}

#[test]
fn cell_moves_with_uniform_motion() {
    let field = gaussian_cell(30, 30, 10.0, 8.0);
    let mut motion = Array3::zeros((2, 30, 30));
    motion.index_axis_mut(Axis(0), 0).fill(1.5);
    motion.index_axis_mut(Axis(0), 1).fill(0.5);

    let scheme =
        build_extrapolator(ExtrapolationMethod::SemiLagrangian, &SemiLagrangianConfig::new())
            .unwrap();
    let out = scheme
        .extrapolate(Some(&field), &motion, &[2.0, 4.0], OutsideFill::Min, None)
        .unwrap();

    // After 4 time units the centre is at (12, 14).
    let last = &out.fields()[1];
    assert_relative_eq!(last[[12, 14]], 10.0, epsilon = 1e-9);
    assert_relative_eq!(out.displacement()[[0, 5, 5]], 6.0, epsilon = 1e-12);
    assert_relative_eq!(out.displacement()[[1, 5, 5]], 2.0, epsilon = 1e-12);
}

#[test]
fn split_calls_match_single_call() {
    let field = gaussian_cell(20, 20, 8.0, 8.0);
    let motion = Array3::from_shape_fn((2, 20, 20), |(c, i, j)| {
        if c == 0 { 0.3 + 0.02 * i as f64 } else { -0.2 + 0.01 * j as f64 }
    });
    let scheme = build_extrapolator(
        ExtrapolationMethod::SemiLagrangian,
        &SemiLagrangianConfig::new().with_n_iter(2),
    )
    .unwrap();

    let whole = scheme
        .extrapolate(Some(&field), &motion, &[1.0, 2.0], OutsideFill::Nan, None)
        .unwrap();
    let first = scheme
        .extrapolate(None, &motion, &[1.0], OutsideFill::Nan, None)
        .unwrap();
    let second = scheme
        .extrapolate(Some(&field), &motion, &[1.0], OutsideFill::Nan, Some(first.displacement()))
        .unwrap();

    for (a, b) in whole.fields()[1].iter().zip(second.fields()[0].iter()) {
        if a.is_nan() {
            assert!(b.is_nan());
        } else {
            assert_relative_eq!(a, b, epsilon = 1e-12);
        }
    }
}

#[test]
fn eulerian_ignores_motion() {
    let field = gaussian_cell(10, 10, 5.0, 5.0);
    let motion = Array3::from_elem((2, 10, 10), 3.0);
    let scheme =
        build_extrapolator(ExtrapolationMethod::Eulerian, &SemiLagrangianConfig::new()).unwrap();
    let out = scheme
        .extrapolate(Some(&field), &motion, &[5.0], OutsideFill::Nan, None)
        .unwrap();
    assert_eq!(out.fields()[0], field);
}
