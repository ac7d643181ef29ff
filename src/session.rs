//!
//! # Turbulence session
//!
//! A [`TurbulenceSession`] owns the [`Atmosphere`] that all the images of a run are seen through.
//! The atmosphere is created the first time a phase screen is requested, with the session
//! parameters and a pixel scale matching the size of that first request.
//! The session parameters cannot be changed afterwards.
//!
//! Between two phase screens the atmosphere is moved by a number of rows given by a
//! [`TurbulenceStepper`], mimicking the wind blowing the turbulence across the aperture.

use std::time::Instant;

use nalgebra::DMatrix;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    atmosphere::{AtmosphereBuilder, AtmosphereError},
    fourier::Fourier,
    Atmosphere,
};

/// Largest number of rows the atmosphere is moved by at once
pub const MAX_ROW_STEP: usize = 75;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("cannot set up the session atmosphere")]
    Atmosphere(#[from] AtmosphereError),
    #[error("the session phase screens are {expected}x{expected}px, requested {found}x{found}px")]
    SizeMismatch { expected: usize, found: usize },
}
pub type Result<T> = std::result::Result<T, SessionError>;

/// Source of the number of rows the atmosphere is moved by
pub trait TurbulenceStepper {
    fn next_row_count(&mut self) -> usize;
}
impl<T: TurbulenceStepper + ?Sized> TurbulenceStepper for Box<T> {
    fn next_row_count(&mut self) -> usize {
        (**self).next_row_count()
    }
}

/// Uniformly random row counts in `[1, MAX_ROW_STEP]`
pub struct RandomStepper {
    rng: StdRng,
}
impl Default for RandomStepper {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}
impl RandomStepper {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}
impl TurbulenceStepper for RandomStepper {
    fn next_row_count(&mut self) -> usize {
        self.rng.gen_range(1..=MAX_ROW_STEP)
    }
}

/// Replays a sequence of row counts, starting over when the end is reached
///
/// An empty sequence moves the atmosphere by one row.
#[derive(Debug, Clone, Default)]
pub struct FixedStepper {
    steps: Vec<usize>,
    index: usize,
}
impl FixedStepper {
    pub fn new(steps: impl Into<Vec<usize>>) -> Self {
        Self {
            steps: steps.into(),
            index: 0,
        }
    }
}
impl TurbulenceStepper for FixedStepper {
    fn next_row_count(&mut self) -> usize {
        if self.steps.is_empty() {
            return 1;
        }
        let step = self.steps[self.index % self.steps.len()];
        self.index += 1;
        step
    }
}

/// Physical parameters of the turbulence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurbulenceParameters {
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
}
/// Default properties:
///  * aperture size         : 8m
///  * Fried parameter       : 16.4cm
///  * outer scale           : 100m
///  * seed                  : none
///  * stencil length factor : 32
impl Default for TurbulenceParameters {
    fn default() -> Self {
        Self {
            aperture_size: 8.,
            fried_param: 0.164,
            outer_scale: 100.,
            seed: None,
            stencil_length_factor: 32,
        }
    }
}
impl TurbulenceParameters {
    /// Returns the builder of the atmosphere sampled with `n_px` pixels across the aperture
    pub fn atmosphere(&self, n_px: usize) -> AtmosphereBuilder {
        AtmosphereBuilder {
            n_px,
            pixel_scale: self.aperture_size / n_px as f64,
            r0: self.fried_param,
            oscale: self.outer_scale,
            seed: self.seed,
            stencil_length_factor: self.stencil_length_factor,
        }
    }
}

/// Owner of the atmosphere shared by the images of a run
pub struct TurbulenceSession {
    parameters: TurbulenceParameters,
    stepper: Box<dyn TurbulenceStepper>,
    atmosphere: Option<Atmosphere>,
}
impl TurbulenceSession {
    /// Creates a session with a [`RandomStepper`]
    ///
    /// If the parameters have a seed, the stepper is seeded as well.
    pub fn new(parameters: TurbulenceParameters) -> Self {
        let stepper = match parameters.seed {
            Some(seed) => RandomStepper::seeded(seed.wrapping_add(1)),
            None => RandomStepper::new(),
        };
        Self {
            parameters,
            stepper: Box::new(stepper),
            atmosphere: None,
        }
    }
    /// Replaces the stepper
    pub fn stepper(self, stepper: impl TurbulenceStepper + 'static) -> Self {
        Self {
            stepper: Box::new(stepper),
            ..self
        }
    }
    pub fn parameters(&self) -> &TurbulenceParameters {
        &self.parameters
    }
    /// Returns the atmosphere if it has been created
    pub fn atmosphere(&self) -> Option<&Atmosphere> {
        self.atmosphere.as_ref()
    }
    /// Total number of rows the atmosphere has been moved by
    pub fn rows_advanced(&self) -> u64 {
        self.atmosphere.as_ref().map_or(0, |atm| atm.n_row())
    }
    /// Moves the atmosphere and returns the `n_px x n_px` phase screen in radians
    pub fn advance<F: Fourier + ?Sized>(
        &mut self,
        n_px: usize,
        fourier: &mut F,
    ) -> Result<DMatrix<f64>> {
        let now = Instant::now();
        let atmosphere = match self.atmosphere.take() {
            Some(atm) if atm.n_px() != n_px => {
                let expected = atm.n_px();
                self.atmosphere = Some(atm);
                return Err(SessionError::SizeMismatch {
                    expected,
                    found: n_px,
                });
            }
            Some(atm) => atm,
            None => self.parameters.atmosphere(n_px).build_with(fourier)?,
        };
        let atmosphere = self.atmosphere.insert(atmosphere);
        let n_row = self.stepper.next_row_count();
        for _ in 0..n_row {
            atmosphere.add_row();
        }
        log::info!(
            "phase screen generated in {:.3}s ({} new rows)",
            now.elapsed().as_secs_f64(),
            n_row
        );
        Ok(atmosphere.phase_screen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{atmosphere::adjacent_phase_difference, RustFft};

    fn parameters() -> TurbulenceParameters {
        TurbulenceParameters {
            aperture_size: 4.,
            stencil_length_factor: 4,
            seed: Some(11),
            ..Default::default()
        }
    }

    #[test]
    fn random_steps_in_range() {
        let mut stepper = RandomStepper::seeded(0);
        let steps: Vec<_> = (0..2000).map(|_| stepper.next_row_count()).collect();
        assert!(steps.iter().all(|&n| (1..=MAX_ROW_STEP).contains(&n)));
        assert!(steps.contains(&1));
        assert!(steps.contains(&MAX_ROW_STEP));
    }

    #[test]
    fn fixed_steps_cycle() {
        let mut stepper = FixedStepper::new([1, 3]);
        let steps: Vec<_> = (0..5).map(|_| stepper.next_row_count()).collect();
        assert_eq!(steps, vec![1, 3, 1, 3, 1]);
        assert_eq!(FixedStepper::default().next_row_count(), 1);
    }

    #[test]
    fn lazy_atmosphere() {
        let mut fourier = RustFft::new();
        let mut session = TurbulenceSession::new(parameters()).stepper(FixedStepper::new([2, 5]));
        assert!(session.atmosphere().is_none());
        assert_eq!(session.rows_advanced(), 0);
        let screen = session.advance(16, &mut fourier).unwrap();
        assert_eq!(screen.shape(), (16, 16));
        let atm = session.atmosphere().unwrap();
        assert_eq!(atm.pixel_scale(), 0.25);
        assert_eq!(session.rows_advanced(), 2);
        session.advance(16, &mut fourier).unwrap();
        assert_eq!(session.rows_advanced(), 7);
    }

    #[test]
    fn evolving_screens() {
        let mut fourier = RustFft::new();
        let mut session = TurbulenceSession::new(parameters()).stepper(FixedStepper::new([1]));
        let first = session.advance(16, &mut fourier).unwrap();
        let second = session.advance(16, &mut fourier).unwrap();
        // the screen moves by one row
        assert_eq!(
            first.rows(0, 15).into_owned(),
            second.rows(1, 15).into_owned()
        );
    }

    #[test]
    fn size_mismatch() {
        let mut fourier = RustFft::new();
        let mut session = TurbulenceSession::new(parameters()).stepper(FixedStepper::new([3]));
        session.advance(16, &mut fourier).unwrap();
        let err = session.advance(32, &mut fourier).unwrap_err();
        assert!(matches!(
            err,
            SessionError::SizeMismatch {
                expected: 16,
                found: 32
            }
        ));
        assert_eq!(session.rows_advanced(), 3);
        assert!(session.atmosphere().is_some());
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let run = || {
            let mut fourier = RustFft::new();
            let mut session = TurbulenceSession::new(parameters());
            (0..3)
                .map(|_| session.advance(16, &mut fourier).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn uniform_first_screen() {
        let mut fourier = RustFft::new();
        let parameters = TurbulenceParameters {
            stencil_length_factor: 4,
            seed: Some(5),
            ..Default::default()
        };
        let mut session = TurbulenceSession::new(parameters).stepper(FixedStepper::new([32]));
        let screen = session.advance(64, &mut fourier).unwrap();
        // the top half is made of new rows, the bottom half comes from the initial screen
        let top = adjacent_phase_difference(&screen, 0..32);
        let bottom = adjacent_phase_difference(&screen, 32..64);
        let ratio = top / bottom;
        assert!((0.5..2.0).contains(&ratio), "top: {top}, bottom: {bottom}");
    }
}
