use nalgebra::DMatrix;

use super::REFERENCE;

/// Screen coordinates (row,column) of the stencil, ordered row by row
///
/// The head of the stencil samples the rows `0, 1, 2, 4, 8, ...` with a decreasing number of
/// evenly spaced points and the tail samples the central column every `width` rows.
/// The reference point is not part of the stencil.
pub fn stencil_coordinates(width: usize, stencil_length_factor: usize) -> Vec<(usize, usize)> {
    let stencil_length = stencil_length_factor * width;
    let mut stencil = DMatrix::from_element(stencil_length, width, false);

    let max_n = stencil_length.ilog2();
    for n in 0..=max_n {
        let row = if n == 0 { 0 } else { 2usize.pow(n - 1) };
        let n_point = 2usize.pow(max_n - n) + 1;
        let step = (width - 1) as f64 / (n_point - 1) as f64;
        for k in 0..n_point {
            let col = (k as f64 * step).round_ties_even() as usize;
            stencil[(row, col)] = true;
        }
    }
    for n in 1..=stencil_length_factor {
        stencil[(n * width - 1, width / 2)] = true;
    }
    stencil[REFERENCE] = false;

    (0..stencil_length)
        .flat_map(|i| (0..width).map(move |j| (i, j)))
        .filter(|&ij| stencil[ij])
        .collect()
}
