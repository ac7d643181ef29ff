//!
//! # Image distortion
//!
//! The [`Distorter`] runs the atmospheric distortion pipeline on images:
//!  1. the annular aperture mask is built for the image size,
//!  2. the session atmosphere is moved and a new phase screen is drawn,
//!  3. the PSF of the aperture seen through the phase screen is computed,
//!  4. one channel of the image is convolved with the PSF and rescaled to `[0,255]`.
//!
//! The simulation is monochromatic: the distorted channel is replicated on the 3 channels
//! of the [`DistortedImage`].
//!
//! Files and directories of files are processed with [`Distorter::distort_file`] and
//! [`Distorter::distort_directory`].

use std::path::PathBuf;

use image::{ImageError, Rgb, RgbImage};
use nalgebra::DMatrix;

use crate::{
    aperture::{build_aperture, ApertureError},
    convolution::{convolve_and_normalize, ConvolutionError, MAX_INTENSITY},
    fourier::Fourier,
    psf::{synthesize, PsfError},
    session::SessionError,
    FromBuilder, TurbulenceSession,
};

mod batch;
mod builder;
mod config;
pub use batch::{distorted_file_name, BatchReport};
pub use builder::DistorterBuilder;
pub use config::{ConfigError, DistortionConfig, GREEN_CHANNEL};

#[derive(Debug, thiserror::Error)]
pub enum DistortionError {
    #[error("Error! Height does not equal width! ({height}x{width}px)")]
    NotSquare { height: usize, width: usize },
    #[error("cannot build the aperture")]
    Aperture(#[from] ApertureError),
    #[error("cannot generate the phase screen")]
    Session(#[from] SessionError),
    #[error("cannot compute the PSF")]
    Psf(#[from] PsfError),
    #[error("cannot convolve the image with the PSF")]
    Convolution(#[from] ConvolutionError),
    #[error("cannot open image {1:?}")]
    Open(#[source] ImageError, PathBuf),
    #[error("cannot save image {1:?}")]
    Save(#[source] ImageError, PathBuf),
    #[error("cannot create directory {1:?}")]
    CreateDir(#[source] std::io::Error, PathBuf),
    #[error("{0:?} has no file name")]
    FileName(PathBuf),
    #[error("{0:?} is not a valid UTF-8 glob pattern")]
    Pattern(PathBuf),
    #[error("invalid glob pattern")]
    Glob(#[from] glob::PatternError),
}
pub type Result<T> = std::result::Result<T, DistortionError>;

/// Distorted image
///
/// The single distorted channel stands for the 3 color channels of the image.
#[derive(Debug, Clone, PartialEq)]
pub struct DistortedImage {
    channel: DMatrix<f64>,
}
impl DistortedImage {
    /// Number of color channels
    pub const N_CHANNEL: usize = 3;
    pub fn height(&self) -> usize {
        self.channel.nrows()
    }
    pub fn width(&self) -> usize {
        self.channel.ncols()
    }
    pub fn channel_count(&self) -> usize {
        Self::N_CHANNEL
    }
    /// Distorted intensities, the maximum is 255
    pub fn channel(&self) -> &DMatrix<f64> {
        &self.channel
    }
    pub fn into_inner(self) -> DMatrix<f64> {
        self.channel
    }
    /// 8 bits RGB image with the same values on all the channels
    ///
    /// Intensities are rounded and clamped to `[0,255]`.
    pub fn to_rgb8(&self) -> RgbImage {
        RgbImage::from_fn(self.width() as u32, self.height() as u32, |x, y| {
            let value = self.channel[(y as usize, x as usize)]
                .round()
                .clamp(0f64, MAX_INTENSITY) as u8;
            Rgb([value; 3])
        })
    }
}

/// Atmospheric distortion pipeline
pub struct Distorter {
    pub(crate) config: DistortionConfig,
    pub(crate) fourier: Box<dyn Fourier>,
    pub(crate) session: TurbulenceSession,
}
impl FromBuilder for Distorter {
    type ComponentBuilder = DistorterBuilder;
}
impl Distorter {
    pub fn config(&self) -> &DistortionConfig {
        &self.config
    }
    pub fn session(&self) -> &TurbulenceSession {
        &self.session
    }
    /// Distorts a single square image channel
    pub fn distort_channel(&mut self, channel: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let (height, width) = channel.shape();
        if height != width {
            return Err(DistortionError::NotSquare { height, width });
        }
        let mask = build_aperture(height, width)?;
        let phase_screen = self.session.advance(height, &mut *self.fourier)?;
        let psf = synthesize(&mut *self.fourier, &mask, &phase_screen)?;
        Ok(convolve_and_normalize(&mut *self.fourier, channel, &psf)?)
    }
    /// Distorts a square RGB image
    ///
    /// Only the channel selected in the [`DistortionConfig`] is distorted.
    pub fn distort(&mut self, image: &RgbImage) -> Result<DistortedImage> {
        let (width, height) = (image.width() as usize, image.height() as usize);
        if height != width {
            return Err(DistortionError::NotSquare { height, width });
        }
        // checked by the builder
        let index = self.config.channel;
        let channel = DMatrix::from_fn(height, width, |i, j| {
            image.get_pixel(j as u32, i as u32)[index] as f64
        });
        Ok(DistortedImage {
            channel: self.distort_channel(&channel)?,
        })
    }
}
