// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};

use clap::Args;

use sheath_core::constant;
use sheath_core::engine::{FiberCounts, MaskSuffixes, image_stem};
use sheath_core::error::SheathError;
use sheath_core::io::TableFormat;
use sheath_core::layer::LayerStore;
use sheath_core::plugin;

use super::{collect_images, configure_threads, fail, finish_batch, open_segmented, run_batch};

const COMMAND: &str = "morphometrics";

#[derive(Debug, Args)]
#[command(about = "Compute per-axon morphometrics from saved masks.")]
pub struct MorphometricsArgs {
    #[arg(
        short = 'i',
        long,
        help = "Image or image directory with masks saved next to each image.",
        required = true
    )]
    pub input: Option<String>,

    #[arg(
        short = 'o',
        long,
        help = "Output table (.csv, .tsv, .txt, .parquet, .pq) or, for directories, output directory.",
        required = true
    )]
    pub output: Option<String>,

    #[arg(long, help = "Table extension used for directory input.", default_value = "csv")]
    pub extension: String,

    #[arg(long, help = "Also save the axon index raster next to each table.")]
    pub save_index: bool,

    #[arg(long, help = "Substring specifying images (e.g. _sem).")]
    pub image_substring: Option<String>,

    #[arg(long, help = "Write a JSON report of the run.")]
    pub report: Option<String>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,
}

pub fn morphometrics(args: &MorphometricsArgs) {
    configure_threads(COMMAND, args.threads);

    let suffixes = MaskSuffixes::default();
    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());
    let output = PathBuf::from(args.output.to_owned().unwrap_or_default());

    if input.is_dir() {
        if !output.is_dir() {
            fail(
                COMMAND,
                "If input is a directory, then output must be an existing directory.",
            );
        }

        let extension = args.extension.to_lowercase();
        if !constant::SUPPORTED_TABLE_FORMATS.contains(&extension.as_str()) {
            fail(
                COMMAND,
                format!(
                    "Invalid table extension {}. Must be one of: {:?}.",
                    extension,
                    constant::SUPPORTED_TABLE_FORMATS
                ),
            );
        }

        let images = collect_images(&input, &suffixes, args.image_substring.to_owned())
            .unwrap_or_else(|err| fail(COMMAND, err));

        if images.is_empty() {
            fail(
                COMMAND,
                "No images were detected. Please check your path and/or substring identifier.",
            );
        }

        let report = run_batch(COMMAND, &images, "Measuring", args.verbose, |image| {
            let table = output.join(format!("{}_morphometrics.{}", image_stem(image), extension));
            measure_image(image, &table, &suffixes, args.save_index)
        });

        finish_batch(COMMAND, &report, args.report.as_ref());
    } else {
        if TableFormat::from_path(&output).is_none() {
            fail(
                COMMAND,
                format!(
                    "Invalid output extension. Must be one of: {:?}.",
                    constant::SUPPORTED_TABLE_FORMATS
                ),
            );
        }

        measure_image(&input, &output, &suffixes, args.save_index)
            .unwrap_or_else(|err| fail(COMMAND, err));
    }
}

/// Measure one image, writing its table and optionally its index raster
fn measure_image(
    image: &Path,
    table: &Path,
    suffixes: &MaskSuffixes,
    save_index: bool,
) -> Result<(), SheathError> {
    let mut session = open_segmented(image, suffixes)?;
    let index = plugin::compute_morphometrics(&mut session, &FiberCounts, table)?;

    if save_index {
        let path = table.with_file_name(format!("{}_index.png", image_stem(table)));

        session
            .find_item_by_name(&index)
            .and_then(|layer| layer.mask())
            .ok_or_else(|| SheathError::LayerError(format!("Layer '{}' is not a mask", index)))?
            .save(path)?;
    }

    Ok(())
}
