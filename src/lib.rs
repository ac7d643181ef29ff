//!
//! # Atmospheric distortion
//!
//! Simulates the blur that atmospheric turbulence imprints on an image seen
//! through a telescope with a central obstruction.
//!
//! The pipeline is made of the following elements:
//!  * [`aperture`]: the annular pupil mask of the primary and secondary mirrors,
//!  * [`Atmosphere`]: a Kolmogorov infinite phase screen that evolves row by row,
//!  * [`TurbulenceSession`]: the long lived owner of the atmosphere, shared by all the images of a run,
//!  * [`psf`]: the instantaneous point spread function `|IFFT(mask·exp(iφ))|²`,
//!  * [`convolution`]: the frequency domain convolution of the PSF with an image channel,
//!  * [`Distorter`]: the orchestrator that runs the elements above on images, files and directories.
//!
//! Components with parameters are created with their builder:
//! ```no_run
//! use atmospheric_distortion::{Builder, DistortionConfig, Distorter, FromBuilder};
//!
//! let mut distorter = Distorter::builder()
//!     .config(DistortionConfig::default().fried_param(0.1))
//!     .build()?;
//! let image = image::open("star.png")?.to_rgb8();
//! let distorted = distorter.distort(&image)?;
//! distorted.to_rgb8().save("star_distorted.png")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aperture;
pub mod atmosphere;
pub mod convolution;
pub mod distortion;
pub mod error;
pub mod fourier;
pub mod psf;
pub mod session;

#[doc(inline)]
pub use self::atmosphere::{Atmosphere, AtmosphereBuilder};
#[doc(inline)]
pub use self::distortion::{BatchReport, DistortedImage, DistortionConfig, Distorter};
#[doc(inline)]
pub use self::error::Error;
#[doc(inline)]
pub use self::fourier::{Fourier, RustFft};
#[doc(inline)]
pub use self::session::{
    FixedStepper, RandomStepper, TurbulenceParameters, TurbulenceSession, TurbulenceStepper,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Component builder type trait
pub trait Builder: Default {
    type Component;
    fn new() -> Self {
        Default::default()
    }
    fn build(self) -> Result<Self::Component>;
}

/// Links a component to its builder
pub trait FromBuilder {
    type ComponentBuilder: Builder;
    /// Returns the component default builder
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::default()
    }
}
