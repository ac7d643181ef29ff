use crate::{
    fourier::Fourier, session::TurbulenceStepper, Builder, RustFft, TurbulenceSession,
};

use super::{DistortionConfig, Distorter};

/// [`Distorter`] builder
///
/// Default properties:
///  * config  : [`DistortionConfig::default`]
///  * fourier : [`RustFft`]
///  * stepper : [`RandomStepper`](crate::RandomStepper), seeded if the config has a seed
#[derive(Default)]
pub struct DistorterBuilder {
    config: DistortionConfig,
    fourier: Option<Box<dyn Fourier>>,
    stepper: Option<Box<dyn TurbulenceStepper>>,
}
impl DistorterBuilder {
    /// Set the distortion parameters
    pub fn config(self, config: DistortionConfig) -> Self {
        Self { config, ..self }
    }
    /// Set the Fourier transform backend
    pub fn fourier(self, fourier: impl Fourier + 'static) -> Self {
        Self {
            fourier: Some(Box::new(fourier)),
            ..self
        }
    }
    /// Set the source of the number of rows the atmosphere moves by between images
    pub fn stepper(self, stepper: impl TurbulenceStepper + 'static) -> Self {
        Self {
            stepper: Some(Box::new(stepper)),
            ..self
        }
    }
}
impl Builder for DistorterBuilder {
    type Component = Distorter;
    fn build(self) -> crate::Result<Distorter> {
        self.config.validate()?;
        let mut session = TurbulenceSession::new(self.config.turbulence());
        if let Some(stepper) = self.stepper {
            session = session.stepper(stepper);
        }
        log::debug!("{:#?}", self.config);
        Ok(Distorter {
            config: self.config,
            fourier: self
                .fourier
                .unwrap_or_else(|| Box::new(RustFft::new()) as Box<dyn Fourier>),
            session,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{distortion::ConfigError, DistortedImage, Error, FromBuilder};

    #[test]
    fn invalid_config() {
        let result = Distorter::builder()
            .config(DistortionConfig::default().outer_scale(0.))
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Parameter("outer_scale", _)))
        ));
    }

    #[test]
    fn session_parameters() {
        let config = DistortionConfig::default().fried_param(0.1).seed(3);
        let distorter = Distorter::builder().config(config.clone()).build().unwrap();
        assert_eq!(distorter.session().parameters(), &config.turbulence());
        assert_eq!(distorter.config(), &config);
    }

    #[test]
    fn channel_out_of_range() {
        let result = Distorter::builder()
            .config(DistortionConfig::default().channel(DistortedImage::N_CHANNEL))
            .build();
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::Channel(3)))
        ));
    }
}
