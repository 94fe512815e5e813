//! Small in-memory datasets for demos and tests. Real inputs are expected to
//! arrive already shaped `(n_x, m)` and normalized.

use ndarray::prelude::*;
use rand::prelude::*;
use rand_distr::Normal;

/// Four points, `(0,0)->0, (1,0)->1, (0,1)->1, (1,1)->0`.
pub fn xor() -> (Array2<f64>, Array2<f64>) {
    let x = array![[0.0, 1.0, 0.0, 1.0], [0.0, 0.0, 1.0, 1.0]];
    let y = array![[0.0, 1.0, 1.0, 0.0]];
    (x, y)
}

/// Two-class "flower": `petals` radial arms per class in the plane.
/// Returns `x` of shape `(2, m)` and `y` of shape `(1, m)` with `m` rounded
/// down to an even count.
pub fn planar(m: usize, seed: u64) -> (Array2<f64>, Array2<f64>) {
    const RADIUS: f64 = 4.0;
    const SPAN: f64 = 3.12;

    let mut rng = StdRng::seed_from_u64(seed);
    // std dev is a positive constant
    let noise = Normal::new(0.0, 0.2).unwrap();
    let per_class = m / 2;
    let mut x = Array2::zeros((2, per_class * 2));
    let mut y = Array2::zeros((1, per_class * 2));

    for class in 0..2 {
        let start = class as f64 * SPAN;
        let angles = Array1::linspace(start, start + SPAN, per_class);
        for (i, &angle) in angles.iter().enumerate() {
            let t = angle + noise.sample(&mut rng);
            let r = RADIUS * (4.0 * t).sin() + noise.sample(&mut rng);
            let col = class * per_class + i;
            x[[0, col]] = r * t.sin();
            x[[1, col]] = r * t.cos();
            y[[0, col]] = class as f64;
        }
    }
    (x, y)
}
