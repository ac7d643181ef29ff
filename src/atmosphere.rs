//!
//! # Kolmogorov infinite phase screen
//!
//! [`Atmosphere`] is a phase screen that can be extended indefinitely, one row at a time,
//! following the method of Fried & Clark (2008) and Assémat et al. (2006).
//!
//! The screen is `2^n+1` pixels wide and it is `stencil_length_factor` times longer than it is wide.
//! Each new row `x` is drawn from the phase values `z` of a sparse stencil in the existing screen:
//! `x = A·z + B·w` where `w` is a vector of standard normal deviates, `A = Cxz·Czz⁻¹` and
//! `B·Bᵀ = Cxx - A·Czx`.
//! The covariances are derived from the Kolmogorov structure function relative to a reference
//! point of the screen that prevents the screen from drifting away.
//!
//! The row that is added is the top row of the screen, the last row is discarded.

use nalgebra::{DMatrix, DVector};
use rand::{rngs::StdRng, Rng};
use rand_distr::StandardNormal;

mod builder;
mod fourier_screen;
mod stencil;
pub use builder::{AtmosphereBuilder, AtmosphereBuilderError};
pub(crate) use fourier_screen::fourier_phase_screen;

use crate::FromBuilder;

/// Screen coordinates (row,column) of the point the covariances are referred to
pub const REFERENCE: (usize, usize) = (1, 1);

#[derive(Debug, thiserror::Error)]
pub enum AtmosphereError {
    #[error("cannot create `::atmospheric_distortion::AtmosphereBuilder`")]
    Builder(#[from] AtmosphereBuilderError),
    #[error("invalid atmosphere parameter {0}: {1}")]
    Parameter(&'static str, f64),
    #[error("the stencil covariance matrix ({0}x{0}) is not positive definite, try a larger pixel scale")]
    Covariance(usize),
    #[error("the SVD of the new row covariance matrix ({0}x{0}) did not converge")]
    Svd(usize),
}
pub type Result<T> = std::result::Result<T, AtmosphereError>;

/// Kolmogorov phase structure function `D(r) = 2(24/5 Γ(6/5))^(5/6) (r/r0)^(5/3)`
pub fn structure_function(r: f64, r0: f64) -> f64 {
    let coefficient = 2f64 * (24f64 / 5f64 * libm::tgamma(6f64 / 5f64)).powf(5f64 / 6f64);
    coefficient * (r / r0).powf(5f64 / 3f64)
}

/// Covariance of the phase at `p` and `q` relative to the phase at `reference`
///
/// All the coordinates are in meters.
pub fn phase_covariance(p: (f64, f64), q: (f64, f64), reference: (f64, f64), r0: f64) -> f64 {
    let distance = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).hypot(a.1 - b.1);
    0.5 * (structure_function(distance(p, reference), r0)
        + structure_function(distance(q, reference), r0)
        - structure_function(distance(p, q), r0))
}

/// Returns the smallest screen width `2^n+1` that is not less than `n_px`
pub fn allowed_size(n_px: usize) -> usize {
    let mut n = 0u32;
    while 2usize.pow(n) + 1 < n_px {
        n += 1;
    }
    2usize.pow(n) + 1
}

/// Kolmogorov infinite phase screen
pub struct Atmosphere {
    pub(crate) n_px: usize,
    pub(crate) pixel_scale: f64,
    pub(crate) r0: f64,
    pub(crate) oscale: f64,
    pub(crate) stencil: Vec<(usize, usize)>,
    pub(crate) a_mat: DMatrix<f64>,
    pub(crate) b_mat: DMatrix<f64>,
    pub(crate) screen: DMatrix<f64>,
    pub(crate) rng: StdRng,
    pub(crate) n_row: u64,
}
impl FromBuilder for Atmosphere {
    type ComponentBuilder = AtmosphereBuilder;
}
impl std::fmt::Debug for Atmosphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atmosphere")
            .field("n_px", &self.n_px)
            .field("width", &self.width())
            .field("stencil_length", &self.stencil_length())
            .field("n_stencil", &self.stencil.len())
            .field("pixel_scale", &self.pixel_scale)
            .field("r0", &self.r0)
            .field("oscale", &self.oscale)
            .field("n_row", &self.n_row)
            .finish()
    }
}
impl Atmosphere {
    /// Size in pixels of the returned phase screens
    pub fn n_px(&self) -> usize {
        self.n_px
    }
    /// Width in pixels of the internal screen (`2^n+1`)
    pub fn width(&self) -> usize {
        self.screen.ncols()
    }
    /// Length in pixels of the internal screen
    pub fn stencil_length(&self) -> usize {
        self.screen.nrows()
    }
    /// Number of phase points the new rows are derived from
    pub fn n_stencil(&self) -> usize {
        self.stencil.len()
    }
    /// Pixel size in meters
    pub fn pixel_scale(&self) -> f64 {
        self.pixel_scale
    }
    /// Fried parameter in meters
    pub fn r0(&self) -> f64 {
        self.r0
    }
    /// Outer scale in meters
    pub fn oscale(&self) -> f64 {
        self.oscale
    }
    /// Number of rows added since the screen was created
    pub fn n_row(&self) -> u64 {
        self.n_row
    }
    fn new_row(&mut self) -> DVector<f64> {
        let reference = self.screen[REFERENCE];
        let stencil_data = DVector::from_iterator(
            self.stencil.len(),
            self.stencil.iter().map(|&ij| self.screen[ij] - reference),
        );
        let rng = &mut self.rng;
        let random_data = DVector::from_iterator(
            self.b_mat.ncols(),
            (0..self.b_mat.ncols()).map(|_| rng.sample::<f64, _>(StandardNormal)),
        );
        (&self.a_mat * stencil_data + &self.b_mat * random_data).add_scalar(reference)
    }
    /// Adds a new row at the top of the screen and discards the last one
    pub fn add_row(&mut self) {
        let row = self.new_row();
        let n_rows = self.screen.nrows();
        self.screen
            .as_mut_slice()
            .chunks_mut(n_rows)
            .zip(row.iter())
            .for_each(|(column, &value)| {
                column.copy_within(0..n_rows - 1, 1);
                column[0] = value;
            });
        self.n_row += 1;
    }
    /// Returns the `n_px x n_px` phase screen in radians
    pub fn phase_screen(&self) -> DMatrix<f64> {
        self.screen.view((0, 0), (self.n_px, self.n_px)).into_owned()
    }
}

/// Mean square phase difference between adjacent pixels within the given rows
#[cfg(test)]
pub(crate) fn adjacent_phase_difference(screen: &DMatrix<f64>, rows: std::ops::Range<usize>) -> f64 {
    let n_cols = screen.ncols();
    let mut sum = 0f64;
    let mut count = 0usize;
    for i in rows.clone() {
        for j in 0..n_cols {
            if j + 1 < n_cols {
                sum += (screen[(i, j + 1)] - screen[(i, j)]).powi(2);
                count += 1;
            }
            if i + 1 < rows.end {
                sum += (screen[(i + 1, j)] - screen[(i, j)]).powi(2);
                count += 1;
            }
        }
    }
    sum / count as f64
}
