use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{DistortedImage, TurbulenceParameters};

/// Index of the green channel of RGB (and BGR) images
pub const GREEN_CHANNEL: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot open `::atmospheric_distortion::DistortionConfig` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::atmospheric_distortion::DistortionConfig` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::atmospheric_distortion::DistortionConfig` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::atmospheric_distortion::DistortionConfig` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::atmospheric_distortion::DistortionConfig` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::atmospheric_distortion::DistortionConfig` into toml")]
    Save(#[from] toml::ser::Error),
    #[error("invalid distortion parameter {0}: {1}")]
    Parameter(&'static str, f64),
    #[error("invalid image channel index {0}, RGB images have 3 channels")]
    Channel(usize),
}

/// Distortion parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistortionConfig {
    /// telescope aperture size [m]
    pub aperture_size: f64,
    /// Fried parameter [m]
    pub fried_param: f64,
    /// outer scale [m]
    pub outer_scale: f64,
    /// phase screen random generator seed
    pub seed: Option<u64>,
    /// length of the phase screen stencil in units of the phase screen width
    pub stencil_length_factor: usize,
    /// index of the image channel that is distorted
    pub channel: usize,
}
/// Default properties:
///  * aperture size         : 8m
///  * Fried parameter       : 16.4cm
///  * outer scale           : 100m
///  * seed                  : none
///  * stencil length factor : 32
///  * channel               : 1 (green)
impl Default for DistortionConfig {
    fn default() -> Self {
        let TurbulenceParameters {
            aperture_size,
            fried_param,
            outer_scale,
            seed,
            stencil_length_factor,
        } = TurbulenceParameters::default();
        Self {
            aperture_size,
            fried_param,
            outer_scale,
            seed,
            stencil_length_factor,
            channel: GREEN_CHANNEL,
        }
    }
}
impl DistortionConfig {
    /// Load the configuration from a toml
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut file =
            File::open(&path).map_err(|e| ConfigError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| ConfigError::Read(e, path.as_ref().to_path_buf()))?;
        Ok(toml::from_str(&toml)?)
    }
    /// Save the configuration to a toml
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file =
            File::create(&path).map_err(|e| ConfigError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::atmospheric_distortion::DistortionConfig\n\n{}", toml)
            .map_err(|e| ConfigError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    /// Set the telescope aperture size in meters
    pub fn aperture_size(self, aperture_size: f64) -> Self {
        Self {
            aperture_size,
            ..self
        }
    }
    /// Set the Fried parameter in meters
    pub fn fried_param(self, fried_param: f64) -> Self {
        Self {
            fried_param,
            ..self
        }
    }
    /// Set the outer scale in meters
    pub fn outer_scale(self, outer_scale: f64) -> Self {
        Self {
            outer_scale,
            ..self
        }
    }
    /// Set the phase screen random generator seed
    pub fn seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
    /// Set the stencil length factor of the phase screen
    pub fn stencil_length_factor(self, stencil_length_factor: usize) -> Self {
        Self {
            stencil_length_factor,
            ..self
        }
    }
    /// Set the index of the image channel that is distorted
    pub fn channel(self, channel: usize) -> Self {
        Self { channel, ..self }
    }
    /// Checks the parameters before any image is processed
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("aperture_size", self.aperture_size),
            ("fried_param", self.fried_param),
            ("outer_scale", self.outer_scale),
        ] {
            if !(value.is_finite() && value > 0f64) {
                return Err(ConfigError::Parameter(name, value));
            }
        }
        if self.stencil_length_factor == 0 {
            return Err(ConfigError::Parameter("stencil_length_factor", 0f64));
        }
        if self.channel >= DistortedImage::N_CHANNEL {
            return Err(ConfigError::Channel(self.channel));
        }
        Ok(())
    }
    /// Turbulence parameters of the session
    pub fn turbulence(&self) -> TurbulenceParameters {
        TurbulenceParameters {
            aperture_size: self.aperture_size,
            fried_param: self.fried_param,
            outer_scale: self.outer_scale,
            seed: self.seed,
            stencil_length_factor: self.stencil_length_factor,
        }
    }
    /// Suffix `_{aperture_size}_{fried_param}_{outer_scale}_{stencil_length_factor}` of the distorted image files
    pub fn file_suffix(&self) -> String {
        format!(
            "_{}_{}_{}_{}",
            self.aperture_size, self.fried_param, self.outer_scale, self.stencil_length_factor
        )
    }
}
