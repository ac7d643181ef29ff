//!
//! # Point spread function
//!
//! Instantaneous PSF of the aperture seen through a phase screen: `|IFFT(mask·exp(iφ))|²`

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::fourier::Fourier;

#[derive(Debug, thiserror::Error)]
pub enum PsfError {
    #[error("the aperture mask ({0:?}) and the phase screen ({1:?}) do not have the same shape")]
    Shape((usize, usize), (usize, usize)),
}
pub type Result<T> = std::result::Result<T, PsfError>;

/// Complex field `mask·exp(iφ)` at the aperture
pub fn pupil_field(mask: &DMatrix<f64>, phase_screen: &DMatrix<f64>) -> Result<DMatrix<Complex64>> {
    if mask.shape() != phase_screen.shape() {
        return Err(PsfError::Shape(mask.shape(), phase_screen.shape()));
    }
    Ok(mask.zip_map(phase_screen, |m, phase| {
        Complex64::from_polar(1f64, phase) * m
    }))
}

/// Computes the PSF from the aperture `mask` and the `phase_screen` in radians
pub fn synthesize<F: Fourier + ?Sized>(
    fourier: &mut F,
    mask: &DMatrix<f64>,
    phase_screen: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let mut field = pupil_field(mask, phase_screen)?;
    fourier.ifft2(&mut field);
    Ok(field.map(|z| z.norm_sqr().abs()))
}
