#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot build the aperture mask")]
    Aperture(#[from] crate::aperture::ApertureError),
    #[error("cannot build `::atmospheric_distortion::Atmosphere`")]
    Atmosphere(#[from] crate::atmosphere::AtmosphereError),
    #[error("turbulence session failed")]
    Session(#[from] crate::session::SessionError),
    #[error("cannot compute the point spread function")]
    Psf(#[from] crate::psf::PsfError),
    #[error("cannot convolve the image with the point spread function")]
    Convolution(#[from] crate::convolution::ConvolutionError),
    #[error("image distortion failed")]
    Distortion(#[from] crate::distortion::DistortionError),
    #[error("invalid distortion configuration")]
    Config(#[from] crate::distortion::ConfigError),
}
