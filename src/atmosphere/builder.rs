use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use nalgebra::{linalg::SVD, DMatrix};
use rand::{rngs::StdRng, SeedableRng};

use crate::{fourier::Fourier, Builder, RustFft};

use super::{
    allowed_size, fourier_phase_screen, phase_covariance, stencil::stencil_coordinates,
    Atmosphere, AtmosphereError, REFERENCE,
};

/// Inner scale of the initial Fourier phase screen in meters
const INNER_SCALE: f64 = 1e-10;

/// [`Atmosphere`] builder type
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AtmosphereBuilder {
    pub n_px: usize,
    pub pixel_scale: f64,
    pub r0: f64,
    pub oscale: f64,
    pub seed: Option<u64>,
    pub stencil_length_factor: usize,
}
/// Default properties:
///  * size                  : 64px
///  * pixel scale           : 12.5cm
///  * r0                    : 16.4cm
///  * L0                    : 100m
///  * seed                  : none
///  * stencil length factor : 32
impl Default for AtmosphereBuilder {
    fn default() -> Self {
        AtmosphereBuilder {
            n_px: 64,
            pixel_scale: 8. / 64.,
            r0: 0.164,
            oscale: 100.,
            seed: None,
            stencil_length_factor: 32,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AtmosphereBuilderError {
    #[error("cannot open `::atmospheric_distortion::AtmosphereBuilder` toml file: {1}")]
    Open(#[source] std::io::Error, PathBuf),
    #[error("cannot create `::atmospheric_distortion::AtmosphereBuilder` toml file: {1}")]
    Create(#[source] std::io::Error, PathBuf),
    #[error("cannot read `::atmospheric_distortion::AtmosphereBuilder` toml file: {1}")]
    Read(#[source] std::io::Error, PathBuf),
    #[error("cannot write `::atmospheric_distortion::AtmosphereBuilder` toml file: {1}")]
    Write(#[source] std::io::Error, PathBuf),
    #[error("cannot deserialize `::atmospheric_distortion::AtmosphereBuilder` from toml")]
    Load(#[from] toml::de::Error),
    #[error("cannot serialize `::atmospheric_distortion::AtmosphereBuilder` into toml")]
    Save(#[from] toml::ser::Error),
}

/// ## `Atmosphere` builder
impl AtmosphereBuilder {
    /// Load the atmospheric builder from a toml
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, AtmosphereBuilderError> {
        let mut file = File::open(&path)
            .map_err(|e| AtmosphereBuilderError::Open(e, path.as_ref().to_path_buf()))?;
        let mut toml = String::new();
        file.read_to_string(&mut toml)
            .map_err(|e| AtmosphereBuilderError::Read(e, path.as_ref().to_path_buf()))?;
        let builder: AtmosphereBuilder = toml::from_str(&toml)?;
        Ok(builder)
    }
    /// Save the atmospheric builder to a toml
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), AtmosphereBuilderError> {
        let toml = toml::to_string_pretty(self)?;
        let mut file = File::create(&path)
            .map_err(|e| AtmosphereBuilderError::Create(e, path.as_ref().to_path_buf()))?;
        write!(file, "# ::atmospheric_distortion::AtmosphereBuilder\n\n{}", toml)
            .map_err(|e| AtmosphereBuilderError::Write(e, path.as_ref().to_path_buf()))?;
        Ok(())
    }
    /// Set the size in pixels of the phase screens
    pub fn n_px(self, n_px: usize) -> Self {
        Self { n_px, ..self }
    }
    /// Set the pixel size in meters
    pub fn pixel_scale(self, pixel_scale: f64) -> Self {
        Self {
            pixel_scale,
            ..self
        }
    }
    /// Set the Fried parameter in meters
    pub fn r0(self, r0: f64) -> Self {
        Self { r0, ..self }
    }
    /// Set outer scale value in meters
    pub fn oscale(self, oscale: f64) -> Self {
        Self { oscale, ..self }
    }
    /// Set the random generator seed
    pub fn seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
    /// Set how many times longer than wide is the stencil
    pub fn stencil_length_factor(self, stencil_length_factor: usize) -> Self {
        Self {
            stencil_length_factor,
            ..self
        }
    }
    fn check(&self) -> std::result::Result<(), AtmosphereError> {
        if self.n_px == 0 {
            return Err(AtmosphereError::Parameter("n_px", 0f64));
        }
        if self.stencil_length_factor == 0 {
            return Err(AtmosphereError::Parameter("stencil_length_factor", 0f64));
        }
        for (name, value) in [
            ("pixel_scale", self.pixel_scale),
            ("r0", self.r0),
            ("oscale", self.oscale),
        ] {
            if !(value.is_finite() && value > 0f64) {
                return Err(AtmosphereError::Parameter(name, value));
            }
        }
        Ok(())
    }
    /// Build the `Atmosphere` with the given Fourier transform backend
    pub fn build_with<F: Fourier + ?Sized>(
        self,
        fourier: &mut F,
    ) -> std::result::Result<Atmosphere, AtmosphereError> {
        self.check()?;
        let now = Instant::now();
        let width = allowed_size(self.n_px);
        let stencil_length = self.stencil_length_factor * width;
        let stencil = stencil_coordinates(width, self.stencil_length_factor);
        let n_stencil = stencil.len();

        let position = |(i, j): (usize, usize)| (i as f64 * self.pixel_scale, j as f64 * self.pixel_scale);
        let reference = position(REFERENCE);
        let new_row: Vec<_> = (0..width)
            .map(|j| (-self.pixel_scale, j as f64 * self.pixel_scale))
            .collect();
        let stencil_positions: Vec<_> = stencil.iter().map(|&ij| position(ij)).collect();
        let covariance = |p: &[(f64, f64)], q: &[(f64, f64)]| {
            DMatrix::from_fn(p.len(), q.len(), |i, j| {
                phase_covariance(p[i], q[j], reference, self.r0)
            })
        };
        let cov_zz = covariance(&stencil_positions, &stencil_positions);
        let cov_zx = covariance(&stencil_positions, &new_row);
        let cov_xx = covariance(&new_row, &new_row);

        // A = Cxz Czz^-1
        let a_mat = cov_zz
            .cholesky()
            .ok_or(AtmosphereError::Covariance(n_stencil))?
            .solve(&cov_zx)
            .transpose();
        // B Bt = Cxx - A Czx
        let bbt = cov_xx - &a_mat * &cov_zx;
        let svd = SVD::try_new(bbt, true, false, f64::EPSILON, 0)
            .ok_or(AtmosphereError::Svd(width))?;
        let mut b_mat = svd.u.ok_or(AtmosphereError::Svd(width))?;
        b_mat
            .column_iter_mut()
            .zip(svd.singular_values.iter())
            .for_each(|(mut column, w)| column *= w.sqrt());

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let screen = fourier_phase_screen(
            self.r0,
            stencil_length,
            self.pixel_scale,
            self.oscale,
            INNER_SCALE,
            &mut rng,
            fourier,
        )
        .columns(0, width)
        .into_owned();
        log::info!(
            "Kolmogorov phase screen ({}x{}px, {} stencil points) set up in {:.3}s",
            stencil_length,
            width,
            n_stencil,
            now.elapsed().as_secs_f64()
        );

        Ok(Atmosphere {
            n_px: self.n_px,
            pixel_scale: self.pixel_scale,
            r0: self.r0,
            oscale: self.oscale,
            stencil,
            a_mat,
            b_mat,
            screen,
            rng,
            n_row: 0,
        })
    }
}
impl Builder for AtmosphereBuilder {
    type Component = Atmosphere;
    /// Build the `Atmosphere`
    fn build(self) -> crate::Result<Atmosphere> {
        Ok(self.build_with(&mut RustFft::new())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("atm_builder.toml");
        let builder = AtmosphereBuilder::default().r0(0.2).seed(1234);
        builder.save(&path)?;
        assert_eq!(AtmosphereBuilder::load(&path)?, builder);
        Ok(())
    }

    #[test]
    fn invalid_parameters() {
        assert!(matches!(
            AtmosphereBuilder::default().r0(0.).build_with(&mut RustFft::new()),
            Err(AtmosphereError::Parameter("r0", _))
        ));
        assert!(matches!(
            AtmosphereBuilder::default()
                .stencil_length_factor(0)
                .build_with(&mut RustFft::new()),
            Err(AtmosphereError::Parameter("stencil_length_factor", _))
        ));
        assert!(matches!(
            AtmosphereBuilder::default()
                .oscale(f64::NAN)
                .build_with(&mut RustFft::new()),
            Err(AtmosphereError::Parameter("oscale", _))
        ));
    }

    #[test]
    fn matrices() {
        let atm = AtmosphereBuilder::default()
            .n_px(8)
            .pixel_scale(1.)
            .stencil_length_factor(4)
            .seed(0)
            .build()
            .unwrap();
        assert_eq!(atm.width(), 9);
        assert_eq!(atm.stencil_length(), 36);
        assert_eq!(atm.a_mat.shape(), (9, atm.n_stencil()));
        assert_eq!(atm.b_mat.shape(), (9, 9));
        assert!(atm.a_mat.iter().chain(atm.b_mat.iter()).all(|x| x.is_finite()));
        assert_eq!(atm.n_row(), 0);
    }
}
