/// Shared montage and signal builders for the integration tests.
use eegrasp::SensorSet;
use ndarray::Array2;

#[allow(unused)]
pub fn names(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("E{i}")).collect()
}

#[allow(unused)]
/// Corners (0,0), (1,0), (0,1), (1,1).
pub fn unit_square() -> SensorSet {
    let pos = ndarray::array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    SensorSet::new(names(4), pos).unwrap()
}

#[allow(unused)]
/// `n` electrodes on a ring of radius 1 plus a centre electrode (index n),
/// on the z = 0 plane.
pub fn ring_montage(n: usize) -> SensorSet {
    let mut pos = Array2::<f64>::zeros((n + 1, 3));
    for i in 0..n {
        let a = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
        pos[[i, 0]] = a.cos();
        pos[[i, 1]] = a.sin();
    }
    SensorSet::new(names(n + 1), pos).unwrap()
}

#[allow(unused)]
/// Deterministic scattered 3-D montage (linear congruential jitter).
pub fn scattered_montage(n: usize, seed: u64) -> SensorSet {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let mut next = || {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 1.0
    };
    let pos = Array2::from_shape_fn((n, 3), |_| next());
    SensorSet::new(names(n), pos).unwrap()
}

#[allow(unused)]
/// `[C, T]` signal that varies smoothly with electrode position:
/// `x_c(t) = p_c · (sin t, cos t, 0.5)`.
pub fn spatial_signal(sensors: &SensorSet, n_t: usize) -> Array2<f64> {
    let pos = sensors.positions();
    Array2::from_shape_fn((sensors.len(), n_t), |(c, t)| {
        let tt = t as f64 * 0.05;
        let coef = [tt.sin(), tt.cos(), 0.5];
        (0..pos.ncols()).map(|d| pos[[c, d]] * coef[d]).sum()
    })
}

#[allow(unused)]
/// Copy of `data` with `rows` set to NaN.
pub fn mask(data: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    let mut out = data.clone();
    for &r in rows {
        out.row_mut(r).fill(f64::NAN);
    }
    out
}

#[allow(unused)]
/// Maximum absolute difference between two arrays.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}
