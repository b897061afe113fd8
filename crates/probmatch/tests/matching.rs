use ndarray::Array2;
use nimbus_probmatch::match_empirical_cdf;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_field(rng: &mut StdRng, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |_| {
        let v: f64 = rng.random();
        if v < 0.4 { 0.0 } else { v * 8.0 }
    })
}

#[test]
fn matching_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(17);
    let field = random_field(&mut rng, 20);
    let reference = random_field(&mut rng, 20);
    let once = match_empirical_cdf(&field, &reference).unwrap();
    let twice = match_empirical_cdf(&once, &reference).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn matching_preserves_rank_order() {
    let mut rng = StdRng::seed_from_u64(3);
    let field = Array2::from_shape_fn((16, 16), |_| rng.random::<f64>());
    let reference = random_field(&mut rng, 16);
    let out = match_empirical_cdf(&field, &reference).unwrap();
    let f: Vec<f64> = field.iter().copied().collect();
    let o: Vec<f64> = out.iter().copied().collect();
    for i in 0..f.len() {
        for j in 0..f.len() {
            if f[i] < f[j] {
                assert!(o[i] <= o[j], "rank order broken at {i}, {j}");
            }
        }
    }
}

#[test]
fn matched_field_has_reference_distribution() {
    let mut rng = StdRng::seed_from_u64(8);
    let field = Array2::from_shape_fn((12, 12), |_| rng.random::<f64>() + 1.0);
    let reference = random_field(&mut rng, 12);
    let out = match_empirical_cdf(&field, &reference).unwrap();
    let mut a: Vec<f64> = out.iter().copied().collect();
    let mut b: Vec<f64> = reference.iter().copied().collect();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    assert_eq!(a, b);
}
