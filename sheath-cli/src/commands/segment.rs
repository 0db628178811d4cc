// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::{Path, PathBuf};

use clap::Args;

use sheath_core::constant;
use sheath_core::engine::{CommandSegmenter, MaskSuffixes, SegmentationSettings};
use sheath_core::error::SheathError;
use sheath_core::io;
use sheath_core::layer::Session;
use sheath_core::plugin;
use sheath_core::ut;

use super::{collect_images, configure_threads, fail, finish_batch, run_batch};

const COMMAND: &str = "segment";

#[derive(Debug, Args)]
#[command(about = "Segment axons and myelin with an external model.")]
pub struct SegmentArgs {
    #[arg(short = 'i', long, help = "Image or image directory.", required = true)]
    pub input: Option<String>,

    #[arg(short = 'm', long, help = "Model name (with --models) or model path.", required = true)]
    pub model: Option<String>,

    #[arg(long, help = "Directory holding one sub-directory per model.")]
    pub models: Option<String>,

    #[arg(short = 's', long, help = "Segmentation settings file (.json).")]
    pub settings: Option<String>,

    #[arg(long, help = "Pixel size in micrometers, written next to each image.")]
    pub pixel_size: Option<f64>,

    #[arg(long, help = "Overlap in pixels between patches.")]
    pub overlap: Option<u32>,

    #[arg(short = 'z', long, help = "Zoom factor applied before inference.")]
    pub zoom_factor: Option<f64>,

    #[arg(long, help = "GPU index.")]
    pub gpu_id: Option<i32>,

    #[arg(long, help = "Segment whole images instead of patches.")]
    pub no_patch: bool,

    #[arg(long, help = "Fill axon interiors enclosed by myelin after segmenting.")]
    pub fill: bool,

    #[arg(long, help = "Segmentation program.", default_value = constant::SEGMENTATION_PROGRAM)]
    pub program: String,

    #[arg(
        long = "program-arg",
        help = "Argument placed before the generated ones (repeatable).",
        allow_hyphen_values = true
    )]
    pub program_args: Vec<String>,

    #[arg(long, help = "Substring specifying images (e.g. _sem).")]
    pub image_substring: Option<String>,

    #[arg(long, help = "Write a JSON report of the run.")]
    pub report: Option<String>,

    #[arg(short = 'v', long, help = "Verbose output.")]
    pub verbose: bool,

    #[arg(short = 't', long, help = "Number of threads.")]
    pub threads: Option<usize>,
}

impl SegmentArgs {
    /// Settings from file, then command line overrides
    fn settings(&self) -> Result<SegmentationSettings, SheathError> {
        let mut settings = match &self.settings {
            Some(path) => SegmentationSettings::from_json(path)?,
            None => SegmentationSettings::default(),
        };

        if let Some(overlap) = self.overlap {
            settings.overlap = overlap;
        }

        if let Some(zoom_factor) = self.zoom_factor {
            settings.zoom_factor = zoom_factor;
        }

        if let Some(gpu_id) = self.gpu_id {
            settings.gpu_id = gpu_id;
        }

        settings.no_patch |= self.no_patch;
        settings.validate()?;

        Ok(settings)
    }

    fn model_path(&self) -> Result<PathBuf, SheathError> {
        let model = self.model.to_owned().unwrap_or_default();

        match &self.models {
            Some(models) => ut::path::resolve_model(models, &model),
            None => {
                let path = PathBuf::from(&model);
                if !path.exists() {
                    return Err(SheathError::NoFileError(format!("Model {}", path.display())));
                }
                Ok(path)
            }
        }
    }
}

pub fn segment(args: &SegmentArgs) {
    configure_threads(COMMAND, args.threads);

    let settings = args.settings().unwrap_or_else(|err| fail(COMMAND, err));
    let model_path = args.model_path().unwrap_or_else(|err| fail(COMMAND, err));
    let suffixes = MaskSuffixes::default();

    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());

    let images = collect_images(&input, &suffixes, args.image_substring.to_owned())
        .unwrap_or_else(|err| fail(COMMAND, err));

    if images.is_empty() {
        fail(
            COMMAND,
            "No images were detected. Please check your path and/or substring identifier.",
        );
    }

    if let Some(pixel_size) = args.pixel_size {
        for image in images.iter() {
            io::write_pixel_size(image, pixel_size).unwrap_or_else(|err| fail(COMMAND, err));
        }
    }

    let engine = CommandSegmenter::new(&args.program).with_args(args.program_args.iter());

    let report = run_batch(COMMAND, &images, "Segmenting", args.verbose, |image| {
        segment_image(image, &engine, &model_path, &settings, &suffixes, args.fill)
    });

    finish_batch(COMMAND, &report, args.report.as_ref());
}

/// Segment one image and optionally fill and save its axons
fn segment_image(
    image: &Path,
    engine: &CommandSegmenter,
    model_path: &Path,
    settings: &SegmentationSettings,
    suffixes: &MaskSuffixes,
    fill: bool,
) -> Result<(), SheathError> {
    let mut session = Session::new();
    plugin::load_image(&mut session, image)?;
    plugin::apply_model(&mut session, engine, model_path, settings, suffixes)?;

    if fill && plugin::fill_axons(&mut session)? > 0 {
        let directory = image.parent().unwrap_or_else(|| Path::new(""));
        plugin::save_segmentation(&session, directory, suffixes)?;
    }

    Ok(())
}
