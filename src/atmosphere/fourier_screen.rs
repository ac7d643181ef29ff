use std::f64::consts::PI;

use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::fourier::Fourier;

/// Square von Karman phase screen in radians drawn in the Fourier domain
///
/// * `r0`: Fried parameter [m]
/// * `n`: screen size [px]
/// * `pixel_scale`: pixel size [m]
/// * `oscale`: outer scale [m]
/// * `iscale`: inner scale [m]
pub fn fourier_phase_screen<R, F>(
    r0: f64,
    n: usize,
    pixel_scale: f64,
    oscale: f64,
    iscale: f64,
    rng: &mut R,
    fourier: &mut F,
) -> DMatrix<f64>
where
    R: Rng + ?Sized,
    F: Fourier + ?Sized,
{
    let delta_f = 1f64 / (n as f64 * pixel_scale);
    let f_m = 5.92 / iscale / (2f64 * PI);
    let f_0 = 1f64 / oscale;
    let frequency = |k: usize| (k as f64 - n as f64 / 2f64) * delta_f;

    // drawn in fftshift order, the ifftshift is applied when taking the real part
    let shifted = |i: usize| (i + n - n / 2) % n;
    let mut screen = DMatrix::from_fn(n, n, |i, j| {
        let (k, l) = (shifted(i), shifted(j));
        if k == n / 2 && l == n / 2 {
            return Complex64::new(0f64, 0f64);
        }
        let f = frequency(l).hypot(frequency(k));
        let psd = 0.023 * r0.powf(-5f64 / 3f64) * (-(f / f_m).powi(2)).exp()
            / (f * f + f_0 * f_0).powf(11f64 / 6f64);
        let noise = Complex64::new(
            rng.sample::<f64, _>(StandardNormal),
            rng.sample::<f64, _>(StandardNormal),
        );
        noise * psd.sqrt() * delta_f
    });
    fourier.ifft2(&mut screen);
    // undoes the 1/n² of the inverse transform
    let scale = (n as f64).powi(2);
    let unshifted = |i: usize| (i + n / 2) % n;
    DMatrix::from_fn(n, n, |i, j| screen[(unshifted(i), unshifted(j))].re * scale)
}
