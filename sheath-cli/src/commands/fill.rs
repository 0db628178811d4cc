// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};

use clap::Args;

use sheath_core::engine::MaskSuffixes;
use sheath_core::error::SheathError;
use sheath_core::plugin;

use super::{collect_images, configure_threads, fail, finish_batch, open_segmented, run_batch};

const COMMAND: &str = "fill-axons";

#[derive(Debug, Args)]
#[command(about = "Fill axon interiors enclosed by myelin.")]
pub struct FillArgs {
    #[arg(
        short = 'i',
        long,
        help = "Image or image directory with masks saved next to each image.",
        required = true
    )]
    pub input: Option<String>,

    #[arg(short = 'o', long, help = "Output directory (defaults to the image directory).")]
    pub output: Option<String>,

    #[arg(long, help = "Substring specifying images (e.g. _sem).")]
    pub image_substring: Option<String>,

    #[arg(long, help = "Write a JSON report of the run.")]
    pub report: Option<String>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,
}

pub fn fill_axons(args: &FillArgs) {
    configure_threads(COMMAND, args.threads);

    let suffixes = MaskSuffixes::default();
    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());

    let output = args.output.to_owned().map(PathBuf::from);

    if let Some(output) = &output {
        if !output.is_dir() {
            fail(COMMAND, "Output directory does not exist.");
        }
    }

    let images = collect_images(&input, &suffixes, args.image_substring.to_owned())
        .unwrap_or_else(|err| fail(COMMAND, err));

    if images.is_empty() {
        fail(
            COMMAND,
            "No images were detected. Please check your path and/or substring identifier.",
        );
    }

    let report = run_batch(COMMAND, &images, "Filling axons", args.verbose, |image| {
        fill_image(image, output.as_deref(), &suffixes).map(|_| ())
    });

    finish_batch(COMMAND, &report, args.report.as_ref());
}

/// Fill one image's axons and save all masks; returns pixels changed
fn fill_image(
    image: &Path,
    output: Option<&Path>,
    suffixes: &MaskSuffixes,
) -> Result<usize, SheathError> {
    let mut session = open_segmented(image, suffixes)?;
    let changed = plugin::fill_axons(&mut session)?;

    let directory = output
        .or_else(|| image.parent())
        .unwrap_or_else(|| Path::new(""));

    plugin::save_segmentation(&session, directory, suffixes)?;

    Ok(changed)
}
