use std::{
    error::Error as _,
    fs::create_dir_all,
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use indicatif::{ProgressBar, ProgressStyle};

use super::{DistortionConfig, DistortionError, Distorter, Result};

/// Outcome of the distortion of a directory of images
#[derive(Debug, Default)]
pub struct BatchReport {
    /// paths to the distorted images
    pub outputs: Vec<PathBuf>,
    /// paths to the images that could not be distorted with the reason
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed: Duration,
}
impl BatchReport {
    /// Number of images that were attempted
    pub fn len(&self) -> usize {
        self.outputs.len() + self.failures.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Returns true if all the images have been distorted
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Name of the distorted image file
///
/// The name is `<stem>_<aperture_size>_<fried_param>_<outer_scale>_<stencil_length_factor><.ext>`
pub fn distorted_file_name(path: &Path, config: &DistortionConfig) -> Result<String> {
    let stem = path
        .file_stem()
        .ok_or_else(|| DistortionError::FileName(path.to_path_buf()))?
        .to_string_lossy();
    let suffix = config.file_suffix();
    Ok(match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    })
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    ) {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

impl Distorter {
    /// Distorts the image file at `path` and writes the result under `output_root`
    ///
    /// The distorted image has the same path relative to `output_root` as
    /// the original image relative to `input_root`, the missing directories are created.
    /// Returns the path to the distorted image.
    pub fn distort_file(
        &mut self,
        input_root: impl AsRef<Path>,
        path: impl AsRef<Path>,
        output_root: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|e| DistortionError::Open(e, path.to_path_buf()))?
            .to_rgb8();
        let distorted = self.distort(&image)?;

        let relative_dir = path
            .strip_prefix(input_root.as_ref())
            .ok()
            .and_then(|relative| relative.parent())
            .unwrap_or_else(|| Path::new(""));
        let output_dir = output_root.as_ref().join(relative_dir);
        create_dir_all(&output_dir).map_err(|e| DistortionError::CreateDir(e, output_dir.clone()))?;
        let output = output_dir.join(distorted_file_name(path, &self.config)?);
        distorted
            .to_rgb8()
            .save(&output)
            .map_err(|e| DistortionError::Save(e, output.clone()))?;
        Ok(output)
    }
    /// Distorts all the files in `input_root` matching the glob `pattern`
    ///
    /// The files are processed one after the other in alphabetical order.
    /// A file that cannot be distorted is logged and reported and the batch carries on.
    pub fn distort_directory(
        &mut self,
        input_root: impl AsRef<Path>,
        pattern: &str,
        output_root: impl AsRef<Path>,
    ) -> Result<BatchReport> {
        let input_root = input_root.as_ref();
        let output_root = output_root.as_ref();
        let root = input_root
            .to_str()
            .ok_or_else(|| DistortionError::Pattern(input_root.to_path_buf()))?;
        let full_pattern = Path::new(&glob::Pattern::escape(root)).join(pattern);
        let full_pattern = full_pattern
            .to_str()
            .ok_or_else(|| DistortionError::Pattern(full_pattern.clone()))?;

        let now = Instant::now();
        let mut report = BatchReport::default();
        let mut paths = vec![];
        for entry in glob::glob(full_pattern)? {
            match entry {
                Ok(path) if path.is_file() => paths.push(path),
                Ok(_) => (),
                Err(e) => {
                    log::error!("cannot read {:?}: {}", e.path(), e.error());
                    report
                        .failures
                        .push((e.path().to_path_buf(), e.error().to_string()));
                }
            }
        }
        paths.sort();
        log::info!("{} images matching {:?}", paths.len(), full_pattern);

        let pb = progress_bar(paths.len());
        pb.set_message("Distorting images");
        for path in paths {
            log::info!("attempting to distort image at: {:?}", path);
            let start = Instant::now();
            match self.distort_file(input_root, &path, output_root) {
                Ok(output) => {
                    log::info!(
                        "distorted image created ({:.3}s) at: {:?}",
                        start.elapsed().as_secs_f64(),
                        output
                    );
                    report.outputs.push(output);
                }
                Err(e) => {
                    let mut reason = e.to_string();
                    let mut source = e.source();
                    while let Some(cause) = source {
                        reason = format!("{reason}: {cause}");
                        source = cause.source();
                    }
                    log::error!(
                        "unable to apply atmospheric distortion to file at: {:?} -- {}",
                        path,
                        reason
                    );
                    report.failures.push((path, reason));
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("Distortion completed");
        report.elapsed = now.elapsed();
        Ok(report)
    }
}
