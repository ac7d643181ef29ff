//!
//! # Numeric backend
//!
//! The pipeline only needs 2D Fourier transforms of complex fields, the [`Fourier`] trait
//! is the seam between the optics and the FFT library.
//! [`RustFft`] is the CPU implementation based on [rustfft](https://docs.rs/rustfft).

use nalgebra::{DMatrix, Scalar};
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftDirection, FftPlanner};

/// 2D discrete Fourier transforms
///
/// The normalization follows numpy: the forward transform is unnormalized
/// and the inverse transform is scaled by `1/(rows x cols)`.
pub trait Fourier {
    /// In-place forward 2D FFT
    fn fft2(&mut self, field: &mut DMatrix<Complex64>);
    /// In-place inverse 2D FFT
    fn ifft2(&mut self, field: &mut DMatrix<Complex64>);
}

/// CPU FFT backend
///
/// FFT plans are cached for all the sizes that have been used once.
pub struct RustFft {
    planner: FftPlanner<f64>,
}
impl Default for RustFft {
    fn default() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }
}
impl RustFft {
    pub fn new() -> Self {
        Default::default()
    }
    fn transform(&mut self, field: &mut DMatrix<Complex64>, direction: FftDirection) {
        let (n_rows, n_cols) = field.shape();
        if n_rows == 0 || n_cols == 0 {
            return;
        }
        // columns are contiguous in memory, rows are processed as the columns of the transpose
        let fft = self.planner.plan_fft(n_rows, direction);
        process_columns(fft.as_ref(), field);
        let fft = self.planner.plan_fft(n_cols, direction);
        if n_rows == n_cols {
            field.transpose_mut();
            process_columns(fft.as_ref(), field);
            field.transpose_mut();
        } else {
            let mut transposed = field.transpose();
            process_columns(fft.as_ref(), &mut transposed);
            *field = transposed.transpose();
        }
    }
}
impl Fourier for RustFft {
    fn fft2(&mut self, field: &mut DMatrix<Complex64>) {
        self.transform(field, FftDirection::Forward);
    }
    fn ifft2(&mut self, field: &mut DMatrix<Complex64>) {
        self.transform(field, FftDirection::Inverse);
        let scale = 1f64 / field.len() as f64;
        field.iter_mut().for_each(|z| *z *= scale);
    }
}

fn process_columns(fft: &dyn Fft<f64>, field: &mut DMatrix<Complex64>) {
    let n = fft.len();
    field
        .as_mut_slice()
        .par_chunks_mut(n)
        .for_each(|column| fft.process(column));
}

/// Shifts the zero-frequency component to the center of the array
pub fn fftshift<T: Scalar>(field: &DMatrix<T>) -> DMatrix<T> {
    let (n_rows, n_cols) = field.shape();
    roll(field, n_rows / 2, n_cols / 2)
}
/// Inverse of [`fftshift`], the two differ for odd sizes
pub fn ifftshift<T: Scalar>(field: &DMatrix<T>) -> DMatrix<T> {
    let (n_rows, n_cols) = field.shape();
    roll(field, n_rows - n_rows / 2, n_cols - n_cols / 2)
}
fn roll<T: Scalar>(field: &DMatrix<T>, row_shift: usize, col_shift: usize) -> DMatrix<T> {
    let (n_rows, n_cols) = field.shape();
    DMatrix::from_fn(n_rows, n_cols, |i, j| {
        field[(
            (i + n_rows - row_shift) % n_rows,
            (j + n_cols - col_shift) % n_cols,
        )]
        .clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, b: Complex64) -> bool {
        (a - b).norm() < 1e-9
    }

    #[test]
    fn delta_transforms_to_ones() {
        let mut field = DMatrix::<Complex64>::zeros(6, 5);
        field[(0, 0)] = Complex64::new(1.0, 0.0);
        RustFft::new().fft2(&mut field);
        assert!(field.iter().all(|z| close(*z, Complex64::new(1.0, 0.0))));
    }

    #[test]
    fn inverse_of_ones_is_delta() {
        let mut field = DMatrix::from_element(4, 4, Complex64::new(1.0, 0.0));
        RustFft::new().ifft2(&mut field);
        assert!(close(field[(0, 0)], Complex64::new(1.0, 0.0)));
        assert!(field.iter().skip(1).all(|z| close(*z, Complex64::new(0.0, 0.0))));
    }

    #[test]
    fn forward_then_inverse() {
        let field = DMatrix::from_fn(7, 4, |i, j| Complex64::new(i as f64 - j as f64, (i * j) as f64));
        let mut fourier = RustFft::new();
        let mut round_trip = field.clone();
        fourier.fft2(&mut round_trip);
        fourier.ifft2(&mut round_trip);
        field
            .iter()
            .zip(round_trip.iter())
            .for_each(|(a, b)| assert!(close(*a, *b)));
    }

    #[test]
    fn single_frequency() {
        let n = 8;
        let field = DMatrix::from_fn(n, n, |_, j| {
            Complex64::from_polar(1.0, 2.0 * std::f64::consts::PI * j as f64 / n as f64)
        });
        let mut spectrum = field.clone();
        RustFft::new().fft2(&mut spectrum);
        assert!(close(spectrum[(0, 1)], Complex64::new((n * n) as f64, 0.0)));
        assert!((spectrum.iter().map(|z| z.norm()).sum::<f64>() - (n * n) as f64).abs() < 1e-6);
    }

    #[test]
    fn shifts() {
        let even = DMatrix::from_fn(1, 4, |_, j| j);
        assert_eq!(fftshift(&even).as_slice(), &[2, 3, 0, 1]);
        let odd = DMatrix::from_fn(1, 5, |_, j| j);
        assert_eq!(fftshift(&odd).as_slice(), &[3, 4, 0, 1, 2]);
        assert_eq!(ifftshift(&odd).as_slice(), &[2, 3, 4, 0, 1]);
        assert_eq!(ifftshift(&fftshift(&odd)), odd);
    }
}
