use atmospheric_distortion::{
    aperture::build_aperture, convolution::convolve_and_normalize, psf::synthesize, Atmosphere,
    Builder, FromBuilder, RustFft,
};
use criterion::*;
use nalgebra::DMatrix;

pub fn psf_vs_n(c: &mut Criterion) {
    let mut fourier = RustFft::new();
    let mut group = c.benchmark_group("psf_vs_n");
    for n in [64usize, 128, 256, 512] {
        let mask = build_aperture(n, n).unwrap();
        let phase = DMatrix::from_fn(n, n, |i, j| ((i * 7 + j * 3) % 11) as f64 * 0.3);
        let channel = DMatrix::from_fn(n, n, |i, j| ((i + j) % 256) as f64);
        group.bench_with_input(BenchmarkId::new("PSF", n), &n, |b, _| {
            b.iter(|| synthesize(&mut fourier, &mask, &phase).unwrap())
        });
        let psf = synthesize(&mut fourier, &mask, &phase).unwrap();
        group.bench_with_input(BenchmarkId::new("Convolution", n), &n, |b, _| {
            b.iter(|| convolve_and_normalize(&mut fourier, &channel, &psf).unwrap())
        });
    }
    group.finish();
}

pub fn phase_screen_row(c: &mut Criterion) {
    let mut atm = Atmosphere::builder()
        .n_px(128)
        .stencil_length_factor(8)
        .seed(1)
        .build()
        .unwrap();
    c.bench_function("phase_screen_row", |b| b.iter(|| atm.add_row()));
}

criterion_group!(benches, psf_vs_n, phase_screen_row);
criterion_main!(benches);
