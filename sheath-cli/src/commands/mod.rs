// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use kdam::TqdmParallelIterator;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;

use sheath_core::constant;
use sheath_core::engine::MaskSuffixes;
use sheath_core::error::SheathError;
use sheath_core::layer::Session;
use sheath_core::plugin;
use sheath_core::ut;

pub mod colorize;
pub mod fill;
pub mod models;
pub mod morphometrics;
pub mod pixel_size;
pub mod segment;

/// Print an error tagged with the command name and exit
pub(crate) fn fail(command: &str, message: impl std::fmt::Display) -> ! {
    eprintln!("[sheath::{}] ERROR: {}", command, message);
    std::process::exit(1);
}

/// Size the global rayon pool when a thread count is given
pub(crate) fn configure_threads(command: &str, threads: Option<usize>) {
    let Some(threads) = threads else {
        return;
    };

    if threads < 1 {
        fail(
            command,
            "Threads must be set to a positive integer if provided.",
        );
    }

    if let Err(err) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        fail(command, err);
    }
}

/// Whether a file name looks like a mask written next to an image
fn is_mask_file(path: &Path, suffixes: &MaskSuffixes) -> bool {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    [&suffixes.axon, &suffixes.myelin, &suffixes.axonmyelin]
        .iter()
        .any(|suffix| name.ends_with(suffix.as_str()))
}

/// Images named by an input path
///
/// A file is taken as is. A directory contributes every supported image
/// that is not itself a mask output.
pub(crate) fn collect_images(
    input: &Path,
    suffixes: &MaskSuffixes,
    substring: Option<String>,
) -> Result<Vec<PathBuf>, SheathError> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    if !input.is_dir() {
        return Err(SheathError::NoFileError(input.display().to_string()));
    }

    let mut images = ut::path::collect_file_paths(
        input,
        constant::IMAGE_DYNAMIC_FORMATS.as_slice(),
        substring,
    )?;

    images.retain(|path| !is_mask_file(path, suffixes));

    Ok(images)
}

/// A session holding one image and the masks saved next to it
///
/// Separate axon and myelin masks are preferred over the merged one.
pub(crate) fn open_segmented(image: &Path, suffixes: &MaskSuffixes) -> Result<Session, SheathError> {
    let mut session = Session::new();
    plugin::load_image(&mut session, image)?;

    let paths = suffixes.beside(image);

    if paths.axon.is_file() && paths.myelin.is_file() {
        plugin::load_masks(&mut session, &paths.axon, &paths.myelin)?;
    } else if paths.axonmyelin.is_file() {
        plugin::load_mask(&mut session, &paths.axonmyelin)?;
    } else {
        return Err(SheathError::NoFileError(format!(
            "No masks found for {}",
            image.display()
        )));
    }

    Ok(session)
}

/// One image that could not be processed
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub image: String,
    pub error: String,
}

/// Outcome of a batch run, optionally written as JSON
#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub command: String,
    pub succeeded: usize,
    pub failed: Vec<Failure>,
}

impl BatchReport {
    pub fn write(&self, path: &Path) -> Result<(), SheathError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| SheathError::OtherError(err.to_string()))?;

        std::fs::write(path, json)
            .map_err(|err| SheathError::OtherError(format!("{} ({})", path.display(), err)))
    }
}

// A panicking worker poisons the lock but the failures recorded so far stay valid
fn record_failure(failures: &Mutex<Vec<Failure>>, failure: Failure) {
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(failure);
}

fn take_failures(failures: Mutex<Vec<Failure>>) -> Vec<Failure> {
    failures.into_inner().unwrap_or_else(PoisonError::into_inner)
}

/// Run an action over images in parallel, collecting failures
pub(crate) fn run_batch<F>(
    command: &str,
    images: &[PathBuf],
    desc: &str,
    verbose: bool,
    action: F,
) -> BatchReport
where
    F: Fn(&Path) -> Result<(), SheathError> + Sync,
{
    ut::track::progress_log(
        &format!(
            "Detected {} images.",
            ut::track::thousands_format(images.len())
        ),
        verbose,
    );

    let pb = ut::track::progress_bar(images.len(), desc, verbose);

    let failures: Mutex<Vec<Failure>> = Mutex::new(Vec::new());

    images
        .par_iter()
        .tqdm_with_bar(pb)
        .for_each(|image| {
            if let Err(err) = action(image) {
                record_failure(
                    &failures,
                    Failure {
                        image: image.display().to_string(),
                        error: err.to_string(),
                    },
                );
            }
        });

    let mut failed = take_failures(failures);
    failed.sort_by(|a, b| a.image.cmp(&b.image));

    if verbose {
        println!()
    }

    let report = BatchReport {
        command: command.to_string(),
        succeeded: images.len() - failed.len(),
        failed,
    };

    let message = if report.failed.is_empty() {
        format!(
            "Complete. {} images processed successfully.",
            ut::track::thousands_format(report.succeeded)
        )
    } else {
        format!(
            "Complete. {} images processed successfully. {} images failed.",
            ut::track::thousands_format(report.succeeded),
            ut::track::thousands_format(report.failed.len())
        )
    };

    ut::track::progress_log(&message, verbose);

    for failure in report.failed.iter() {
        ut::track::progress_warn(&format!("{}\t{}", failure.image, failure.error));
    }

    report
}

/// Finish a batch: write the report if asked and exit on total failure
pub(crate) fn finish_batch(command: &str, report: &BatchReport, output: Option<&String>) {
    if let Some(output) = output {
        if let Err(err) = report.write(Path::new(output)) {
            fail(command, err);
        }
    }

    if report.succeeded == 0 && !report.failed.is_empty() {
        fail(
            command,
            format!("All images failed. First error: {}", report.failed[0].error),
        );
    }
}
