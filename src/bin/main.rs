use std::path::PathBuf;

use anyhow::Context;
use atmospheric_distortion::{Builder, DistortionConfig, Distorter, FromBuilder};
use clap::Parser;

#[derive(Parser)]
#[command(name = "atmospheric-distortion")]
#[command(about = "Apply atmospheric turbulence distortion to the images of a directory")]
struct Args {
    /// Directory with the images
    input_dir: PathBuf,
    /// Glob pattern of the image files relative to the input directory, e.g. "**/*.png"
    pattern: String,
    /// Directory where the distorted images are written
    output_dir: PathBuf,
    /// Distortion parameters toml file, the command line options take precedence
    #[arg(long)]
    config: Option<PathBuf>,
    /// Telescope aperture size [m]
    #[arg(long)]
    aperture_size: Option<f64>,
    /// Fried parameter [m]
    #[arg(long)]
    fried_param: Option<f64>,
    /// Outer scale [m]
    #[arg(long)]
    outer_scale: Option<f64>,
    /// Random generator seed
    #[arg(long)]
    seed: Option<u64>,
    /// Length of the phase screen stencil in units of the phase screen width
    #[arg(long)]
    stencil_length_factor: Option<usize>,
    /// Index of the image channel that is distorted
    #[arg(long)]
    channel: Option<usize>,
}
impl Args {
    fn distortion_config(&self) -> anyhow::Result<DistortionConfig> {
        let mut config = match &self.config {
            Some(path) => DistortionConfig::load(path)?,
            None => DistortionConfig::default(),
        };
        if let Some(aperture_size) = self.aperture_size {
            config = config.aperture_size(aperture_size);
        }
        if let Some(fried_param) = self.fried_param {
            config = config.fried_param(fried_param);
        }
        if let Some(outer_scale) = self.outer_scale {
            config = config.outer_scale(outer_scale);
        }
        if let Some(seed) = self.seed {
            config = config.seed(seed);
        }
        if let Some(stencil_length_factor) = self.stencil_length_factor {
            config = config.stencil_length_factor(stencil_length_factor);
        }
        if let Some(channel) = self.channel {
            config = config.channel(channel);
        }
        Ok(config)
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = args.distortion_config()?;
    let mut distorter = Distorter::builder().config(config).build()?;
    let report = distorter
        .distort_directory(&args.input_dir, &args.pattern, &args.output_dir)
        .with_context(|| format!("cannot process directory {:?}", args.input_dir))?;
    println!(
        "{} image(s) distorted in {:.2}s",
        report.outputs.len(),
        report.elapsed.as_secs_f64()
    );
    if !report.is_success() {
        for (path, reason) in &report.failures {
            eprintln!("  {:?}: {}", path, reason);
        }
        anyhow::bail!("{} image(s) could not be distorted", report.failures.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => {
            println!("Completed applying distortion to images");
            Ok(())
        }
        Err(e) => {
            println!("Failed to apply distortion to images -- {e}");
            Err(e)
        }
    }
}
