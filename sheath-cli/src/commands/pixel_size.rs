// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::path::PathBuf;

use clap::Args;

use sheath_core::io;

use super::fail;

const COMMAND: &str = "pixel-size";

#[derive(Debug, Args)]
#[command(about = "Read or write the pixel size stored next to an image.")]
pub struct PixelSizeArgs {
    #[arg(short = 'i', long, help = "Image path.", required = true)]
    pub input: Option<String>,

    #[arg(long, help = "Pixel size in micrometers to write.")]
    pub set: Option<f64>,
}

pub fn pixel_size(args: &PixelSizeArgs) {
    let image = PathBuf::from(args.input.to_owned().unwrap_or_default());

    if let Some(value) = args.set {
        io::write_pixel_size(&image, value).unwrap_or_else(|err| fail(COMMAND, err));
    }

    let value = io::read_pixel_size(&image).unwrap_or_else(|err| fail(COMMAND, err));
    println!("{}", value);
}
