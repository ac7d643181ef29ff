//!
//! # Telescope aperture
//!
//! Annular pupil of a primary mirror with a centered secondary mirror obstruction.
//!
//! The primary mirror is a disk that spans half of the frame and the secondary obstruction
//! is a disk with a diameter of 9.375% of the frame, both are centered in the frame.
//! The mask is normalized such that the sum of its squared values is equal to the square of the frame height.

use nalgebra::DMatrix;

/// Ratio of the secondary obstruction diameter to the frame size
pub const SECONDARY_OBSTRUCTION_RATIO: f64 = 0.09375;

#[derive(Debug, thiserror::Error)]
pub enum ApertureError {
    #[error("the aperture frame is empty ({0}x{1}px)")]
    Empty(usize, usize),
    #[error("the primary mirror of a {0}x{1}px frame has a null radius")]
    NullRadius(usize, usize),
    #[error("the aperture mask does not transmit any light")]
    Opaque,
}
pub type Result<T> = std::result::Result<T, ApertureError>;

/// Binary disk mask of size `height x width`
///
/// The `center` is given as (x,y) i.e. (column,row) and defaults to the middle of the frame.
/// The `radius` defaults to the smallest distance between the center and the frame edges.
/// A pixel belongs to the disk if its distance to the center is less or equal to the radius.
pub fn circular_mask(
    height: usize,
    width: usize,
    center: Option<(usize, usize)>,
    radius: Option<f64>,
) -> DMatrix<f64> {
    let (cx, cy) = center.unwrap_or((width / 2, height / 2));
    let radius = radius.unwrap_or_else(|| {
        cx.min(cy)
            .min(width.saturating_sub(cx))
            .min(height.saturating_sub(cy)) as f64
    });
    DMatrix::from_fn(height, width, |i, j| {
        let x = j as f64 - cx as f64;
        let y = i as f64 - cy as f64;
        if x.hypot(y) <= radius {
            1f64
        } else {
            0f64
        }
    })
}

/// Builds the normalized annular aperture mask of a `height x width` frame
pub fn build_aperture(height: usize, width: usize) -> Result<DMatrix<f64>> {
    if height == 0 || width == 0 {
        return Err(ApertureError::Empty(height, width));
    }
    let (primary_height, primary_width) = (height / 2, width / 2);
    let primary_radius = primary_height / 2;
    if primary_radius == 0 {
        return Err(ApertureError::NullRadius(height, width));
    }
    let secondary_height = (height as f64 * SECONDARY_OBSTRUCTION_RATIO) as usize;
    let secondary_width = (width as f64 * SECONDARY_OBSTRUCTION_RATIO) as usize;

    let mut pupil = circular_mask(
        primary_height,
        primary_width,
        None,
        Some(primary_radius as f64),
    );
    let secondary = circular_mask(
        secondary_height,
        secondary_width,
        None,
        Some((secondary_height / 2) as f64),
    );
    let row_offset = (primary_height - secondary_height) / 2;
    let col_offset = (primary_width - secondary_width) / 2;
    pupil
        .view_mut((row_offset, col_offset), secondary.shape())
        .zip_apply(&secondary, |p, s| *p -= s);

    // zero padding back to the frame size, odd leftovers go at the end
    let mut mask = DMatrix::<f64>::zeros(height, width);
    mask.view_mut(
        ((height - primary_height) / 2, (width - primary_width) / 2),
        pupil.shape(),
    )
    .copy_from(&pupil);

    let energy = mask.norm_squared();
    if energy == 0f64 {
        return Err(ApertureError::Opaque);
    }
    mask *= height as f64 / energy.sqrt();
    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_normalization() {
        for n in [4usize, 17, 64, 65, 128, 224] {
            let mask = build_aperture(n, n).unwrap();
            assert_eq!(mask.shape(), (n, n));
            let energy = mask.norm_squared();
            assert!(
                (energy - (n * n) as f64).abs() < 1e-9 * (n * n) as f64,
                "{n}: {energy}"
            );
        }
    }

    #[test]
    fn deterministic() {
        let a = build_aperture(96, 96).unwrap();
        let b = build_aperture(96, 96).unwrap();
        assert!(a
            .iter()
            .zip(b.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn annulus() {
        let n = 224;
        let mask = build_aperture(n, n).unwrap();
        // secondary obstruction
        assert_eq!(mask[(n / 2, n / 2)], 0f64);
        // inside the annulus
        let transmission = mask[(n / 2, n / 2 + 30)];
        assert!(transmission > 0f64);
        // outside the primary
        assert_eq!(mask[(0, 0)], 0f64);
        assert_eq!(mask[(n / 2, n / 2 + 60)], 0f64);
        // uniform transmission
        assert!(mask
            .iter()
            .all(|&m| m == 0f64 || (m - transmission).abs() < 1e-12));
        let n_open = mask.iter().filter(|&&m| m > 0f64).count();
        assert!((transmission - n as f64 / (n_open as f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn circle() {
        let disk = circular_mask(5, 5, None, None);
        assert_eq!(disk.sum(), 13f64);
        assert_eq!(disk[(2, 2)], 1f64);
        assert_eq!(disk[(0, 0)], 0f64);
        let offset = circular_mask(4, 4, Some((0, 0)), Some(1.0));
        assert_eq!(offset.sum(), 3f64);
    }

    #[test]
    fn invalid_frames() {
        assert!(matches!(build_aperture(0, 0), Err(ApertureError::Empty(0, 0))));
        assert!(matches!(
            build_aperture(3, 3),
            Err(ApertureError::NullRadius(3, 3))
        ));
    }
}
