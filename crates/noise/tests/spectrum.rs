use ndarray::Array2;
use nimbus_cascade::Fft2;
use nimbus_noise::{NoiseConfig, NoiseGenerator, NoiseMethod};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn smooth_field(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| {
        let a = (i as f64 - 20.0).powi(2) + (j as f64 - 24.0).powi(2);
        let b = (i as f64 - 40.0).powi(2) + (j as f64 - 12.0).powi(2);
        6.0 * (-a / 50.0).exp() + 3.0 * (-b / 120.0).exp()
    })
}

fn lag1_spatial_correlation(field: &Array2<f64>) -> f64 {
    let (h, w) = field.dim();
    let mut a = Vec::new();
    let mut b = Vec::new();
    for i in 0..h {
        for j in 0..w - 1 {
            a.push(field[[i, j]]);
            b.push(field[[i, j + 1]]);
        }
    }
    nimbus_stats::pearson_correlation(&a, &b, None).unwrap()
}

#[test]
fn filtered_noise_inherits_spatial_correlation() {
    let fft = Fft2::new((64, 64)).unwrap();
    let frames = vec![smooth_field(64)];
    let mut rng = StdRng::seed_from_u64(2024);
    for method in [NoiseMethod::Nonparametric, NoiseMethod::Parametric] {
        let generator =
            NoiseGenerator::initialize(method, &frames, &fft, &NoiseConfig::new()).unwrap();
        let noise = generator.generate(&mut rng, &fft).unwrap();
        let r = lag1_spatial_correlation(&noise);
        assert!(r > 0.5, "{method:?}: lag-1 correlation {r}");
    }
}

#[test]
fn consecutive_draws_differ() {
    let fft = Fft2::new((32, 32)).unwrap();
    let generator = NoiseGenerator::initialize(
        NoiseMethod::Nonparametric,
        &[smooth_field(32)],
        &fft,
        &NoiseConfig::new(),
    )
    .unwrap();
    let mut rng = StdRng::seed_from_u64(9);
    let a = generator.generate(&mut rng, &fft).unwrap();
    let b = generator.generate(&mut rng, &fft).unwrap();
    assert_ne!(a, b);
}
