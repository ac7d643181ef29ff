//!
//! # Frequency domain convolution
//!
//! Circular convolution of an image channel with a PSF through the convolution theorem,
//! followed by a rescaling of the result to the `[0,255]` intensity range.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::fourier::Fourier;

/// Maximum intensity of the distorted channel
pub const MAX_INTENSITY: f64 = 255.;

#[derive(Debug, thiserror::Error)]
pub enum ConvolutionError {
    #[error("the image channel ({0:?}) and the PSF ({1:?}) do not have the same shape")]
    Shape((usize, usize), (usize, usize)),
}
pub type Result<T> = std::result::Result<T, ConvolutionError>;

/// Circular convolution `real(IFFT(FFT(psf)·FFT(channel)))`
pub fn convolve<F: Fourier + ?Sized>(
    fourier: &mut F,
    channel: &DMatrix<f64>,
    psf: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    if channel.shape() != psf.shape() {
        return Err(ConvolutionError::Shape(channel.shape(), psf.shape()));
    }
    let mut psf_spectrum = psf.map(|x| Complex64::new(x, 0f64));
    fourier.fft2(&mut psf_spectrum);
    let mut spectrum = channel.map(|x| Complex64::new(x, 0f64));
    fourier.fft2(&mut spectrum);
    spectrum.component_mul_assign(&psf_spectrum);
    fourier.ifft2(&mut spectrum);
    Ok(spectrum.map(|z| z.re))
}

/// Convolves the `channel` with the `psf` and scales the result such that its maximum is 255
///
/// The minimum is not subtracted, so negative values remain negative.
/// If the maximum of the convolution is not strictly positive and finite, the channel is set to zero.
pub fn convolve_and_normalize<F: Fourier + ?Sized>(
    fourier: &mut F,
    channel: &DMatrix<f64>,
    psf: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let mut result = convolve(fourier, channel, psf)?;
    let max = result.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !(max.is_finite() && max > 0f64) {
        log::warn!("degenerate convolution (max: {max}), the distorted channel is set to 0");
        result.fill(0f64);
        return Ok(result);
    }
    result /= max;
    result *= MAX_INTENSITY;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RustFft;

    #[test]
    fn delta_psf_is_identity() {
        let channel = DMatrix::from_fn(6, 6, |i, j| (i * 6 + j) as f64);
        let mut psf = DMatrix::zeros(6, 6);
        psf[(0, 0)] = 1f64;
        let result = convolve(&mut RustFft::new(), &channel, &psf).unwrap();
        channel
            .iter()
            .zip(result.iter())
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-9));
    }

    #[test]
    fn shifted_delta_rolls_the_channel() {
        let channel = DMatrix::from_fn(4, 5, |i, j| (i * 5 + j) as f64);
        let mut psf = DMatrix::zeros(4, 5);
        psf[(1, 2)] = 1f64;
        let result = convolve(&mut RustFft::new(), &channel, &psf).unwrap();
        for i in 0..4 {
            for j in 0..5 {
                let expected = channel[((i + 3) % 4, (j + 3) % 5)];
                assert!((result[(i, j)] - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn normalized_maximum() {
        let channel = DMatrix::from_fn(16, 16, |i, j| if (4..12).contains(&i) && (4..12).contains(&j) { 255. } else { 0. });
        let psf = DMatrix::from_fn(16, 16, |i, j| 1f64 / (1 + i + j) as f64);
        let result = convolve_and_normalize(&mut RustFft::new(), &channel, &psf).unwrap();
        let max = result.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(max, MAX_INTENSITY);
        assert!(result.iter().all(|&x| x <= MAX_INTENSITY));
    }

    #[test]
    fn degenerate_psf() {
        let channel = DMatrix::from_element(8, 8, 10f64);
        let psf = DMatrix::zeros(8, 8);
        let result = convolve_and_normalize(&mut RustFft::new(), &channel, &psf).unwrap();
        assert!(result.iter().all(|&x| x == 0f64));
    }

    #[test]
    fn shape_mismatch() {
        let channel = DMatrix::zeros(8, 8);
        let psf = DMatrix::zeros(8, 4);
        assert!(matches!(
            convolve(&mut RustFft::new(), &channel, &psf),
            Err(ConvolutionError::Shape((8, 8), (8, 4)))
        ));
    }
}
