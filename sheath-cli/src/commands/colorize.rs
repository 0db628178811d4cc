// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;

use clap::Args;

use sheath_core::constant;
use sheath_core::engine::MaskSuffixes;
use sheath_core::plugin;

use super::{fail, open_segmented};

const COMMAND: &str = "colorize";

#[derive(Debug, Args)]
#[command(about = "Overlay axon and myelin masks on their image.")]
pub struct ColorizeArgs {
    #[arg(short = 'i', long, help = "Image with masks saved next to it.", required = true)]
    pub input: Option<String>,

    #[arg(short = 'o', long, help = "Output RGB image.", required = true)]
    pub output: Option<String>,

    #[arg(long, help = "Mask opacity between 0 and 1.", default_value_t = constant::OVERLAY_OPACITY)]
    pub opacity: f32,
}

pub fn colorize(args: &ColorizeArgs) {
    if !(0.0..=1.0).contains(&args.opacity) {
        fail(COMMAND, "Opacity must be between 0 and 1.");
    }

    let input = PathBuf::from(args.input.to_owned().unwrap_or_default());
    let output = PathBuf::from(args.output.to_owned().unwrap_or_default());

    let session =
        open_segmented(&input, &MaskSuffixes::default()).unwrap_or_else(|err| fail(COMMAND, err));

    let overlay =
        plugin::colorize_selection(&session, args.opacity).unwrap_or_else(|err| fail(COMMAND, err));

    overlay.save(&output).unwrap_or_else(|err| fail(COMMAND, err));
}
